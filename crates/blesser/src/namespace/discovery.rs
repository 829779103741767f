// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timeout-bounded namespace discovery.
//!
//! [`discover`] starts a glob and hands back a [`Discovery`] stream that
//! forwards replies as they arrive. The deadline covers both starting the glob
//! and consuming it; when it passes the stream simply ends.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::time::{Instant, Sleep};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::ErrorCode;
use crate::namespace::{GlobReply, GlobStream, Namespace, NamespaceError};

/// How long a discovery may run.
pub const GLOB_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiscoveryResult {
    Entry { name: String },
    Error { name: String, cause: String },
}

impl From<GlobReply> for DiscoveryResult {
    fn from(reply: GlobReply) -> Self {
        match reply {
            GlobReply::Entry { name, .. } => Self::Entry { name },
            GlobReply::Error { name, error } => Self::Error { name, cause: error },
        }
    }
}

#[derive(Debug)]
pub enum DiscoveryError {
    /// The namespace rejected the glob.
    Initiate(NamespaceError),
    /// The glob did not start before the deadline.
    TimedOut,
}

impl DiscoveryError {
    pub fn code(&self) -> ErrorCode {
        ErrorCode::Discovery
    }
}

impl fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initiate(e) => write!(f, "glob: {e}"),
            Self::TimedOut => f.write_str("glob: timed out before streaming began"),
        }
    }
}

impl std::error::Error for DiscoveryError {}

/// Start a glob of `pattern` bounded by `timeout` from now.
pub async fn discover(
    namespace: &dyn Namespace,
    pattern: &str,
    timeout: Duration,
) -> Result<Discovery, DiscoveryError> {
    let deadline = Instant::now() + timeout;
    let cancel = CancellationToken::new();
    debug!(roots = ?namespace.roots(), pattern, "glob");

    let started = tokio::time::timeout_at(deadline, namespace.glob(pattern, cancel.clone())).await;
    let inner = match started {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => {
            cancel.cancel();
            return Err(DiscoveryError::Initiate(e));
        }
        Err(_) => {
            cancel.cancel();
            return Err(DiscoveryError::TimedOut);
        }
    };

    Ok(Discovery {
        inner,
        deadline: Box::pin(tokio::time::sleep_until(deadline)),
        cancel,
        done: false,
    })
}

/// Replies from one glob, in arrival order, until the namespace closes the
/// stream or the deadline passes. Dropping it cancels the glob.
pub struct Discovery {
    inner: GlobStream,
    deadline: Pin<Box<Sleep>>,
    cancel: CancellationToken,
    done: bool,
}

impl Discovery {
    fn finish(&mut self) {
        self.done = true;
        self.cancel.cancel();
    }
}

impl Stream for Discovery {
    type Item = DiscoveryResult;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.done {
            return Poll::Ready(None);
        }
        if self.deadline.as_mut().poll(cx).is_ready() {
            debug!("glob deadline reached");
            self.finish();
            return Poll::Ready(None);
        }
        match self.inner.poll_next_unpin(cx) {
            Poll::Ready(Some(reply)) => Poll::Ready(Some(reply.into())),
            Poll::Ready(None) => {
                self.finish();
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for Discovery {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
#[path = "discovery_tests.rs"]
mod tests;
