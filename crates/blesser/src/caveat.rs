// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Caveats: machine-checked restrictions attached to blessings.
//!
//! The only caveat this client creates is an expiry. Blessing requests carry
//! a single expiry caveat `CAVEAT_TTL` past the moment the exchange started,
//! encoded with [`crate::codec`] so it fits in a form field.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::codec::{self, CodecError};

/// Lifetime requested for issued blessings.
pub const CAVEAT_TTL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Caveat {
    /// Invalid at or after `not_after_ms` (milliseconds since the Unix epoch).
    Expiry { not_after_ms: u64 },
}

impl Caveat {
    /// Expiry caveat `horizon` from now.
    pub fn expiry_after(horizon: Duration) -> Result<Self, CaveatError> {
        Self::expiry_from(SystemTime::now(), horizon)
    }

    /// Expiry caveat `horizon` past `start`.
    pub fn expiry_from(start: SystemTime, horizon: Duration) -> Result<Self, CaveatError> {
        if horizon.is_zero() {
            return Err(CaveatError::InvalidHorizon);
        }
        let at = start.checked_add(horizon).ok_or(CaveatError::OutOfRange)?;
        Self::expiry_at(at)
    }

    /// Expiry caveat at an absolute instant.
    pub fn expiry_at(at: SystemTime) -> Result<Self, CaveatError> {
        let since_epoch = at.duration_since(UNIX_EPOCH).map_err(|_| CaveatError::OutOfRange)?;
        let not_after_ms =
            u64::try_from(since_epoch.as_millis()).map_err(|_| CaveatError::OutOfRange)?;
        Ok(Self::Expiry { not_after_ms })
    }

    pub fn not_after(&self) -> SystemTime {
        match self {
            Self::Expiry { not_after_ms } => UNIX_EPOCH + Duration::from_millis(*not_after_ms),
        }
    }

    /// Check the caveat against the given wall-clock instant.
    pub fn validate(&self, now: SystemTime) -> Result<(), CaveatError> {
        match self {
            Self::Expiry { not_after_ms } => {
                if now >= self.not_after() {
                    return Err(CaveatError::Expired { not_after_ms: *not_after_ms });
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug)]
pub enum CaveatError {
    /// Expiry horizons must be positive.
    InvalidHorizon,
    /// The expiry instant is before the epoch or past what fits in `u64` ms.
    OutOfRange,
    Expired { not_after_ms: u64 },
    Codec(CodecError),
}

impl fmt::Display for CaveatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidHorizon => f.write_str("expiry horizon must be positive"),
            Self::OutOfRange => f.write_str("expiry instant out of range"),
            Self::Expired { not_after_ms } => write!(f, "expired at {not_after_ms} ms"),
            Self::Codec(e) => write!(f, "caveat codec: {e}"),
        }
    }
}

impl std::error::Error for CaveatError {}

/// Encode a caveat list for the `caveats` form field.
pub fn encode_caveats(caveats: &[Caveat]) -> Result<String, CaveatError> {
    codec::to_base64_cbor(caveats).map_err(CaveatError::Codec)
}

/// Inverse of [`encode_caveats`].
pub fn decode_caveats(text: &str) -> Result<Vec<Caveat>, CaveatError> {
    codec::from_base64_cbor(text).map_err(CaveatError::Codec)
}

/// Build a single expiry caveat `horizon` from now and encode it.
pub fn encode_expiry_caveat(horizon: Duration) -> Result<String, CaveatError> {
    let expiry = Caveat::expiry_after(horizon)?;
    encode_caveats(&[expiry])
}

#[cfg(test)]
#[path = "caveat_tests.rs"]
mod tests;
