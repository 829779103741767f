// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};
use std::fmt;

/// Machine-readable failure classes reported to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    /// The blessing request could not be built (public key, caveats).
    MalformedRequest,
    /// Every issuance attempt failed with a network error or non-200 status.
    Exhausted,
    /// The issuer answered but the blessings could not be decoded or installed.
    Protocol,
    /// The namespace rejected the glob before any reply was streamed.
    Discovery,
    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MalformedRequest => "MALFORMED_REQUEST",
            Self::Exhausted => "EXHAUSTED",
            Self::Protocol => "PROTOCOL",
            Self::Discovery => "DISCOVERY",
            Self::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
