// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Namespace resolution: the glob interface discovery runs against.

pub mod discovery;
pub mod mount_table;

use std::fmt;

use futures_util::future::BoxFuture;
use futures_util::stream::{self, BoxStream, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// One reply streamed back from a glob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GlobReply {
    /// A resolved name and the servers mounted at it (empty for interior nodes).
    Entry { name: String, servers: Vec<String> },
    /// A name that matched but could not be resolved.
    Error { name: String, error: String },
}

impl GlobReply {
    pub fn name(&self) -> &str {
        match self {
            Self::Entry { name, .. } | Self::Error { name, .. } => name,
        }
    }
}

pub type GlobStream = BoxStream<'static, GlobReply>;

/// A name resolution service that supports streaming glob queries.
pub trait Namespace: Send + Sync {
    /// Root addresses queries start from.
    fn roots(&self) -> Vec<String>;

    /// Start a glob. Replies stream until the namespace is done or `cancel`
    /// fires; implementations must close the stream once `cancel` fires.
    fn glob<'a>(
        &'a self,
        pattern: &'a str,
        cancel: CancellationToken,
    ) -> BoxFuture<'a, Result<GlobStream, NamespaceError>>;
}

#[derive(Debug)]
pub enum NamespaceError {
    BadPattern { pattern: String, reason: String },
    Unavailable(String),
}

impl fmt::Display for NamespaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadPattern { pattern, reason } => write!(f, "bad pattern {pattern:?}: {reason}"),
            Self::Unavailable(msg) => write!(f, "namespace unavailable: {msg}"),
        }
    }
}

impl std::error::Error for NamespaceError {}

/// Adapt a reply channel into a [`GlobStream`]. The stream ends when every
/// sender is dropped.
pub fn channel_stream(rx: mpsc::Receiver<GlobReply>) -> GlobStream {
    stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|reply| (reply, rx)) }).boxed()
}
