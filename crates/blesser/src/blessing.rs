// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Blessings: certificate chains binding a public key to a name.
//!
//! The first certificate is self-signed by the root (the issuer's identity).
//! Every later certificate binds a new key to `parent:extension` and is
//! signed by the key of the certificate before it. Each signature also
//! covers the parent's signature, so certificates cannot be spliced between
//! chains.

use std::fmt;
use std::time::SystemTime;

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};

use crate::caveat::Caveat;
use crate::codec;

/// Separator between extensions in a blessing name.
pub const CHAIN_SEPARATOR: &str = ":";

const SIGNATURE_DOMAIN: &str = "blesser/certificate/v1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    pub extension: String,
    /// Raw 32-byte ed25519 public key.
    pub public_key: Vec<u8>,
    #[serde(default)]
    pub caveats: Vec<Caveat>,
    pub signature: Vec<u8>,
}

/// The bytes a certificate signature covers.
#[derive(Serialize)]
struct SignedContent<'a> {
    domain: &'a str,
    extension: &'a str,
    public_key: &'a [u8],
    caveats: &'a [Caveat],
    parent_signature: &'a [u8],
}

impl Certificate {
    fn sign(
        signer: &SigningKey,
        extension: &str,
        subject: &VerifyingKey,
        caveats: Vec<Caveat>,
        parent_signature: &[u8],
    ) -> Result<Self, BlessingError> {
        validate_extension(extension)?;
        let public_key = subject.to_bytes().to_vec();
        let message = signed_message(extension, &public_key, &caveats, parent_signature)?;
        let signature = signer.sign(&message).to_bytes().to_vec();
        Ok(Self { extension: extension.to_owned(), public_key, caveats, signature })
    }

    pub fn verifying_key(&self) -> Result<VerifyingKey, BlessingError> {
        let bytes: [u8; 32] =
            self.public_key.as_slice().try_into().map_err(|_| BlessingError::InvalidKey)?;
        VerifyingKey::from_bytes(&bytes).map_err(|_| BlessingError::InvalidKey)
    }
}

fn signed_message(
    extension: &str,
    public_key: &[u8],
    caveats: &[Caveat],
    parent_signature: &[u8],
) -> Result<Vec<u8>, BlessingError> {
    let content =
        SignedContent { domain: SIGNATURE_DOMAIN, extension, public_key, caveats, parent_signature };
    codec::to_cbor(&content).map_err(|e| BlessingError::Encode(e.to_string()))
}

fn validate_extension(extension: &str) -> Result<(), BlessingError> {
    if extension.is_empty() || extension.contains(CHAIN_SEPARATOR) {
        return Err(BlessingError::InvalidExtension(extension.to_owned()));
    }
    Ok(())
}

/// A certificate chain. Decoded from issuer responses and installed as a
/// principal's default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blessings {
    chain: Vec<Certificate>,
}

impl Blessings {
    /// A single self-signed certificate naming `key` as `name`.
    pub fn self_signed(
        key: &SigningKey,
        name: &str,
        caveats: Vec<Caveat>,
    ) -> Result<Self, BlessingError> {
        let root = Certificate::sign(key, name, &key.verifying_key(), caveats, &[])?;
        Ok(Self { chain: vec![root] })
    }

    /// Extend this chain, binding `subject` to `<self.name()>:<extension>`.
    ///
    /// `signer` must hold the private half of [`Blessings::public_key`].
    pub fn bless(
        &self,
        signer: &SigningKey,
        subject: &VerifyingKey,
        extension: &str,
        caveats: Vec<Caveat>,
    ) -> Result<Self, BlessingError> {
        let last = self.chain.last().ok_or(BlessingError::EmptyChain)?;
        if last.verifying_key()? != signer.verifying_key() {
            return Err(BlessingError::SignerMismatch);
        }
        let cert = Certificate::sign(signer, extension, subject, caveats, &last.signature)?;
        let mut chain = self.chain.clone();
        chain.push(cert);
        Ok(Self { chain })
    }

    pub fn certificates(&self) -> &[Certificate] {
        &self.chain
    }

    /// Human-readable name, e.g. `dev.v.io:u:alice@example.com`.
    pub fn name(&self) -> String {
        let extensions: Vec<&str> = self.chain.iter().map(|c| c.extension.as_str()).collect();
        extensions.join(CHAIN_SEPARATOR)
    }

    /// The key these blessings are bound to.
    pub fn public_key(&self) -> Result<VerifyingKey, BlessingError> {
        self.chain.last().ok_or(BlessingError::EmptyChain)?.verifying_key()
    }

    /// Root certificate: identifies who issued the chain.
    pub fn root(&self) -> Option<&Certificate> {
        self.chain.first()
    }

    /// Earliest expiry caveat anywhere in the chain.
    pub fn expiry(&self) -> Option<SystemTime> {
        self.chain
            .iter()
            .flat_map(|c| c.caveats.iter())
            .map(|c| match c {
                Caveat::Expiry { .. } => c.not_after(),
            })
            .min()
    }

    /// Check every signature in the chain.
    pub fn verify(&self) -> Result<(), BlessingError> {
        let mut parent: Option<&Certificate> = None;
        for (index, cert) in self.chain.iter().enumerate() {
            validate_extension(&cert.extension)?;
            let (signer, parent_signature) = match parent {
                Some(p) => (p.verifying_key()?, p.signature.as_slice()),
                None => (cert.verifying_key()?, &[][..]),
            };
            let message =
                signed_message(&cert.extension, &cert.public_key, &cert.caveats, parent_signature)?;
            let signature = Signature::from_slice(&cert.signature)
                .map_err(|_| BlessingError::BadSignature { index })?;
            signer
                .verify_strict(&message, &signature)
                .map_err(|_| BlessingError::BadSignature { index })?;
            parent = Some(cert);
        }
        if parent.is_none() {
            return Err(BlessingError::EmptyChain);
        }
        Ok(())
    }
}

impl fmt::Display for Blessings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

#[derive(Debug)]
pub enum BlessingError {
    EmptyChain,
    InvalidExtension(String),
    InvalidKey,
    /// The signing key does not own the chain being extended.
    SignerMismatch,
    BadSignature { index: usize },
    Encode(String),
}

impl fmt::Display for BlessingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyChain => f.write_str("empty certificate chain"),
            Self::InvalidExtension(ext) => write!(f, "invalid extension {ext:?}"),
            Self::InvalidKey => f.write_str("invalid public key"),
            Self::SignerMismatch => f.write_str("signer does not own the blessings"),
            Self::BadSignature { index } => write!(f, "bad signature on certificate {index}"),
            Self::Encode(msg) => write!(f, "encode certificate: {msg}"),
        }
    }
}

impl std::error::Error for BlessingError {}

#[cfg(test)]
#[path = "blessing_tests.rs"]
mod tests;
