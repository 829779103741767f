// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::caveat::CAVEAT_TTL;
use crate::issuer::{ExchangeConfig, DEFAULT_ISSUER_URL};

/// Exchanges OAuth tokens for blessings and discovers what they unlock.
///
/// Reads `{"type": ..., "data": ...}` commands from stdin, one per line, and
/// writes events to stdout as JSON lines.
#[derive(Debug, Parser)]
#[command(name = "blesser", version, about)]
pub struct Config {
    /// Blessing issuance endpoint.
    #[arg(long, env = "BLESSER_ISSUER_URL", default_value = DEFAULT_ISSUER_URL)]
    pub issuer_url: String,

    /// PEM file of trusted root certificates (replaces the embedded root).
    #[arg(long, env = "BLESSER_ROOT_CERT")]
    pub root_cert: Option<PathBuf>,

    /// JSON mount table to glob against.
    #[arg(long, env = "BLESSER_MOUNTS")]
    pub mounts: Option<PathBuf>,

    /// Issuance attempts per token, including the first.
    #[arg(long, env = "BLESSER_MAX_ATTEMPTS", default_value = "5")]
    pub max_attempts: u32,

    /// Delay between issuance attempts in ms.
    #[arg(long, env = "BLESSER_RETRY_DELAY_MS", default_value = "1000")]
    pub retry_delay_ms: u64,

    /// Discovery deadline in ms.
    #[arg(long, env = "BLESSER_GLOB_TIMEOUT_MS", default_value = "5000")]
    pub glob_timeout_ms: u64,

    /// Log format (json or text).
    #[arg(long, env = "BLESSER_LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "BLESSER_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Config {
    /// Validate the configuration after parsing.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_attempts == 0 {
            anyhow::bail!("--max-attempts must be at least 1");
        }
        if self.glob_timeout_ms == 0 {
            anyhow::bail!("--glob-timeout-ms must be positive");
        }
        if !matches!(self.log_format.as_str(), "json" | "text") {
            anyhow::bail!("invalid log format: {}", self.log_format);
        }
        // Tokens must never travel in the clear, except to a local test issuer.
        if !self.issuer_url.starts_with("https://") && !is_loopback_http(&self.issuer_url) {
            anyhow::bail!("issuer URL must use https: {}", self.issuer_url);
        }
        Ok(())
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn glob_timeout(&self) -> Duration {
        Duration::from_millis(self.glob_timeout_ms)
    }

    /// Exchange settings. The caveat lifetime is always [`CAVEAT_TTL`].
    pub fn exchange_config(&self) -> ExchangeConfig {
        ExchangeConfig {
            endpoint: self.issuer_url.clone(),
            max_attempts: self.max_attempts,
            retry_delay: self.retry_delay(),
            caveat_ttl: CAVEAT_TTL,
        }
    }
}

fn is_loopback_http(url: &str) -> bool {
    ["http://127.0.0.1", "http://localhost", "http://[::1]"].iter().any(|prefix| {
        url.strip_prefix(prefix).is_some_and(|rest| rest.is_empty() || rest.starts_with([':', '/']))
    })
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
