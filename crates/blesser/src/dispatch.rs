// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command dispatch.
//!
//! Inbound messages are `{"type": ..., "data": ...}` objects:
//! - `token` → exchange the OAuth token for blessings, install them, then
//!   glob the namespace
//! - `url` → glob the namespace (the payload is not used as the pattern)
//!
//! Anything else, including malformed JSON, is dropped.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

use futures_util::StreamExt;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::error::ErrorCode;
use crate::event::Event;
use crate::issuer::{ExchangeError, Exchanger};
use crate::namespace::discovery::{discover, DiscoveryError, DiscoveryResult, GLOB_TIMEOUT};
use crate::namespace::Namespace;
use crate::principal::Principal;

/// Pattern every discovery runs with.
pub const DISCOVERY_PATTERN: &str = "*";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Token,
    UrlQuery,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub kind: CommandKind,
    pub payload: String,
}

#[derive(Deserialize)]
struct Message {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: String,
}

impl Command {
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        let msg: Message = serde_json::from_str(raw)?;
        let kind = match msg.kind.as_str() {
            "token" => CommandKind::Token,
            "url" => CommandKind::UrlQuery,
            _ => CommandKind::Unknown,
        };
        Ok(Self { kind, payload: msg.data })
    }
}

#[derive(Debug)]
pub enum DispatchError {
    Exchange(ExchangeError),
    Discovery(DiscoveryError),
}

impl DispatchError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Exchange(e) => e.code(),
            Self::Discovery(e) => e.code(),
        }
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exchange(e) => write!(f, "{e}"),
            Self::Discovery(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for DispatchError {}

impl From<ExchangeError> for DispatchError {
    fn from(e: ExchangeError) -> Self {
        Self::Exchange(e)
    }
}

impl From<DiscoveryError> for DispatchError {
    fn from(e: DiscoveryError) -> Self {
        Self::Discovery(e)
    }
}

/// Routes commands to the exchange and discovery pipeline.
///
/// Commands are handled one at a time; `dispatch` returns only after every
/// step of the command has finished.
pub struct Dispatcher {
    principal: Arc<dyn Principal>,
    exchanger: Exchanger,
    namespace: Arc<dyn Namespace>,
    glob_timeout: Duration,
    event_tx: mpsc::Sender<Event>,
}

impl Dispatcher {
    pub fn new(
        principal: Arc<dyn Principal>,
        exchanger: Exchanger,
        namespace: Arc<dyn Namespace>,
        event_tx: mpsc::Sender<Event>,
    ) -> Self {
        Self { principal, exchanger, namespace, glob_timeout: GLOB_TIMEOUT, event_tx }
    }

    pub fn with_glob_timeout(mut self, timeout: Duration) -> Self {
        self.glob_timeout = timeout;
        self
    }

    /// Handle one raw inbound message.
    pub async fn dispatch(&self, raw: &str) -> Result<(), DispatchError> {
        let command = match Command::parse(raw) {
            Ok(c) => c,
            Err(e) => {
                warn!(err = %e, "dropping malformed command");
                return Ok(());
            }
        };

        match command.kind {
            CommandKind::Token => self.bless(&command.payload).await,
            CommandKind::UrlQuery => {
                debug!(url = %command.payload, "url command");
                self.glob(DISCOVERY_PATTERN).await.map(|_| ())
            }
            CommandKind::Unknown => {
                trace!("ignoring unknown command type");
                Ok(())
            }
        }
    }

    /// Exchange `token`, install the result, then discover.
    async fn bless(&self, token: &str) -> Result<(), DispatchError> {
        let blessings = self.exchanger.exchange(token, self.principal.as_ref()).await?;
        let expires_at_ms = blessings
            .expiry()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .and_then(|d| u64::try_from(d.as_millis()).ok());
        self.emit(Event::Blessed { name: blessings.name(), expires_at_ms }).await;
        self.glob(DISCOVERY_PATTERN).await.map(|_| ())
    }

    /// Glob the namespace, forwarding each result as it arrives. Returns the
    /// number of results forwarded.
    pub async fn glob(&self, pattern: &str) -> Result<usize, DispatchError> {
        let mut discovery = discover(self.namespace.as_ref(), pattern, self.glob_timeout).await?;
        let mut count = 0;
        while let Some(result) = discovery.next().await {
            match &result {
                DiscoveryResult::Entry { name } => info!(name = %name, "discovered"),
                DiscoveryResult::Error { name, cause } => {
                    warn!(name = %name, err = %cause, "glob entry error")
                }
            }
            count += 1;
            self.emit(result.into()).await;
        }
        self.emit(Event::DiscoveryDone { pattern: pattern.to_owned(), count }).await;
        Ok(count)
    }

    /// Send an event to the host. A closed channel only means nobody listens.
    pub async fn emit(&self, event: Event) {
        let _ = self.event_tx.send(event).await;
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
