// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Blessing exchange: swaps an OAuth access token for blessings.
//!
//! The request carries the principal's public key, the token, and one expiry
//! caveat. Network failures and non-200 responses are retried with a fixed
//! delay; a malformed request or an unusable response is not.

pub mod install;
pub mod tls;

use std::fmt;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::{debug, info, warn};

use crate::blessing::Blessings;
use crate::caveat::{encode_expiry_caveat, CaveatError, CAVEAT_TTL};
use crate::codec::CodecError;
use crate::error::ErrorCode;
use crate::issuer::tls::{pinned_http_client, TlsError, TrustRoots};
use crate::principal::{Principal, PrincipalError};

/// Default issuance endpoint (Google OAuth blesser).
pub const DEFAULT_ISSUER_URL: &str = "https://dev.v.io/auth/google/bless";

/// Response encoding requested from the issuer.
pub const OUTPUT_FORMAT: &str = "base64vom";

pub const MAX_ATTEMPTS: u32 = 5;
pub const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Issuance endpoint and retry policy.
#[derive(Debug, Clone)]
pub struct ExchangeConfig {
    pub endpoint: String,
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Sleep before every attempt after the first.
    pub retry_delay: Duration,
    /// Lifetime of the expiry caveat attached to each request.
    pub caveat_ttl: Duration,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ISSUER_URL.to_owned(),
            max_attempts: MAX_ATTEMPTS,
            retry_delay: RETRY_DELAY,
            caveat_ttl: CAVEAT_TTL,
        }
    }
}

#[derive(Debug)]
pub enum ExchangeError {
    /// Public key could not be marshaled. Not retried.
    PublicKey(PrincipalError),
    /// Expiry caveat could not be built or encoded. Not retried.
    Caveat(CaveatError),
    /// Every attempt failed; carries the last observed failure.
    Exhausted { attempts: u32, last: String },
    /// The 200 response body was not encoded blessings. Not retried.
    Decode(CodecError),
    /// The principal refused the blessings. Not retried.
    Install(PrincipalError),
    /// The HTTP client could not be constructed.
    Client(TlsError),
}

impl ExchangeError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::PublicKey(_) | Self::Caveat(_) => ErrorCode::MalformedRequest,
            Self::Exhausted { .. } => ErrorCode::Exhausted,
            Self::Decode(_) | Self::Install(_) => ErrorCode::Protocol,
            Self::Client(_) => ErrorCode::Internal,
        }
    }
}

impl fmt::Display for ExchangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PublicKey(e) => write!(f, "public key: {e}"),
            Self::Caveat(e) => write!(f, "caveat: {e}"),
            Self::Exhausted { attempts, last } => {
                write!(f, "blessing request failed after {attempts} attempts: {last}")
            }
            Self::Decode(e) => write!(f, "decode blessings: {e}"),
            Self::Install(e) => write!(f, "install blessings: {e}"),
            Self::Client(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ExchangeError {}

/// One failed issuance attempt. Always retried.
#[derive(Debug)]
enum AttemptError {
    Http(reqwest::Error),
    Status(reqwest::StatusCode),
}

impl fmt::Display for AttemptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(e) => write!(f, "HTTP error: {e}"),
            Self::Status(status) => write!(f, "got {status}"),
        }
    }
}

/// Client for the blessing issuance endpoint.
pub struct Exchanger {
    config: ExchangeConfig,
    http: reqwest::Client,
}

impl Exchanger {
    /// Build an exchanger whose transport trusts only `roots`.
    pub fn new(config: ExchangeConfig, roots: &TrustRoots) -> Result<Self, ExchangeError> {
        let http = pinned_http_client(roots).map_err(ExchangeError::Client)?;
        Ok(Self { config, http })
    }

    /// Build an exchanger over a caller-supplied transport.
    pub fn with_client(config: ExchangeConfig, http: reqwest::Client) -> Self {
        Self { config, http }
    }

    /// Exchange `token` for blessings and install them as `principal`'s default.
    pub async fn exchange(
        &self,
        token: &str,
        principal: &dyn Principal,
    ) -> Result<Blessings, ExchangeError> {
        let public_key = principal.public_key().map_err(ExchangeError::PublicKey)?;
        let caveats =
            encode_expiry_caveat(self.config.caveat_ttl).map_err(ExchangeError::Caveat)?;
        let public_key = STANDARD.encode(public_key);
        let form = [
            ("public_key", public_key.as_str()),
            ("token", token),
            ("caveats", caveats.as_str()),
            ("output_format", OUTPUT_FORMAT),
        ];

        let body = self.post_with_retries(&form).await?;
        install::install(&body, principal)
    }

    async fn post_with_retries(&self, form: &[(&str, &str)]) -> Result<Vec<u8>, ExchangeError> {
        let attempts = self.config.max_attempts.max(1);
        let mut last = String::new();

        for attempt in 1..=attempts {
            if attempt > 1 {
                debug!(attempt, "retrying blessing request");
                tokio::time::sleep(self.config.retry_delay).await;
            }
            match self.post_bless_request(form).await {
                Ok(body) => {
                    info!(attempt, bytes = body.len(), "blessing request succeeded");
                    return Ok(body);
                }
                Err(e) => {
                    warn!(attempt, max = attempts, err = %e, "blessing request failed");
                    last = e.to_string();
                }
            }
        }

        Err(ExchangeError::Exhausted { attempts, last })
    }

    async fn post_bless_request(&self, form: &[(&str, &str)]) -> Result<Vec<u8>, AttemptError> {
        let resp = self
            .http
            .post(&self.config.endpoint)
            .form(form)
            .send()
            .await
            .map_err(AttemptError::Http)?;

        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            return Err(AttemptError::Status(status));
        }
        let body = resp.bytes().await.map_err(AttemptError::Http)?;
        Ok(body.to_vec())
    }
}

#[cfg(test)]
#[path = "exchange_tests.rs"]
mod tests;

#[cfg(test)]
pub(crate) mod mock_server;
