// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Text-safe structured encoding: CBOR wrapped in padded base64url.
//!
//! Caveats travel in a form field and blessings travel in a response body,
//! so both use the URL-safe alphabet without line wrapping.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Serialize;

#[derive(Debug)]
pub enum CodecError {
    /// CBOR serialization failed.
    Encode(String),
    /// The text was not valid base64url.
    Base64(base64::DecodeError),
    /// The bytes were not a CBOR encoding of the expected type.
    Decode(String),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encode(msg) => write!(f, "encode: {msg}"),
            Self::Base64(e) => write!(f, "base64: {e}"),
            Self::Decode(msg) => write!(f, "decode: {msg}"),
        }
    }
}

impl std::error::Error for CodecError {}

/// Serialize `value` to CBOR bytes.
pub fn to_cbor<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CodecError> {
    let mut buf = Vec::new();
    ciborium::ser::into_writer(value, &mut buf).map_err(|e| CodecError::Encode(e.to_string()))?;
    Ok(buf)
}

/// Encode `value` as base64url(CBOR(value)).
pub fn to_base64_cbor<T: Serialize + ?Sized>(value: &T) -> Result<String, CodecError> {
    Ok(URL_SAFE.encode(to_cbor(value)?))
}

/// Inverse of [`to_base64_cbor`]. Surrounding ASCII whitespace is ignored.
pub fn from_base64_cbor<T: DeserializeOwned>(text: impl AsRef<[u8]>) -> Result<T, CodecError> {
    let bytes = URL_SAFE.decode(text.as_ref().trim_ascii()).map_err(CodecError::Base64)?;
    ciborium::de::from_reader(bytes.as_slice()).map_err(|e| CodecError::Decode(e.to_string()))
}
