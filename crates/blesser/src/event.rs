// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound notifications written back to the host, one JSON object per line.

use serde::{Deserialize, Serialize};

use crate::namespace::discovery::DiscoveryResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// New default blessings were installed.
    Blessed {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expires_at_ms: Option<u64>,
    },
    /// A discovered name.
    Entry { name: String },
    /// A name discovery matched but could not resolve.
    EntryError { name: String, error: String },
    /// A discovery finished (stream closed or deadline passed).
    DiscoveryDone { pattern: String, count: usize },
    /// A command failed.
    Failed { code: String, message: String },
}

impl From<DiscoveryResult> for Event {
    fn from(result: DiscoveryResult) -> Self {
        match result {
            DiscoveryResult::Entry { name } => Self::Entry { name },
            DiscoveryResult::Error { name, cause } => Self::EntryError { name, error: cause },
        }
    }
}
