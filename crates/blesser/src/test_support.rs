// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test doubles for the principal and namespace seams.

use std::time::Duration;

use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::blessing::Blessings;
use crate::namespace::{channel_stream, GlobReply, GlobStream, Namespace, NamespaceError};
use crate::principal::{Principal, PrincipalError};

/// Assert that an expression evaluates to `Err` whose Display output
/// contains the given substring.
#[macro_export]
macro_rules! assert_err_contains {
    ($expr:expr, $substr:expr) => {{
        let result = $expr;
        let err = result.expect_err(concat!("expected Err for: ", stringify!($expr)));
        let msg = err.to_string();
        assert!(msg.contains($substr), "expected error containing {:?}, got: {msg:?}", $substr);
    }};
}

/// A principal that accepts any blessings and records every install.
pub struct MockPrincipal {
    public_key: Vec<u8>,
    fail_public_key: bool,
    refuse_install: bool,
    installed: Mutex<Vec<Blessings>>,
}

impl MockPrincipal {
    pub fn new() -> Self {
        Self {
            public_key: vec![0xab; 32],
            fail_public_key: false,
            refuse_install: false,
            installed: Mutex::new(Vec::new()),
        }
    }

    /// `public_key()` fails.
    pub fn failing_public_key() -> Self {
        Self { fail_public_key: true, ..Self::new() }
    }

    /// `set_default()` fails.
    pub fn refusing_install() -> Self {
        Self { refuse_install: true, ..Self::new() }
    }

    pub fn install_count(&self) -> usize {
        self.installed.lock().len()
    }
}

impl Default for MockPrincipal {
    fn default() -> Self {
        Self::new()
    }
}

impl Principal for MockPrincipal {
    fn public_key(&self) -> Result<Vec<u8>, PrincipalError> {
        if self.fail_public_key {
            return Err(PrincipalError::Marshal("mock key is not marshalable".to_owned()));
        }
        Ok(self.public_key.clone())
    }

    fn set_default(&self, blessings: Blessings) -> Result<(), PrincipalError> {
        if self.refuse_install {
            return Err(PrincipalError::KeyMismatch);
        }
        self.installed.lock().push(blessings);
        Ok(())
    }

    fn default_blessings(&self) -> Option<Blessings> {
        self.installed.lock().last().cloned()
    }

    fn debug_string(&self) -> String {
        format!("mock principal ({} installs)", self.install_count())
    }
}

/// A namespace that replays a fixed script of `(delay, reply)` steps.
pub struct ScriptedNamespace {
    script: Vec<(Duration, GlobReply)>,
    hold_open: bool,
    reject: Option<String>,
    patterns: Mutex<Vec<String>>,
    cancels: Mutex<Vec<CancellationToken>>,
}

impl ScriptedNamespace {
    /// Emit `replies` immediately, then close.
    pub fn replies(replies: Vec<GlobReply>) -> Self {
        Self::scripted(replies.into_iter().map(|r| (Duration::ZERO, r)).collect())
    }

    /// Emit each reply after its delay, then close.
    pub fn scripted(script: Vec<(Duration, GlobReply)>) -> Self {
        Self {
            script,
            hold_open: false,
            reject: None,
            patterns: Mutex::new(Vec::new()),
            cancels: Mutex::new(Vec::new()),
        }
    }

    /// Keep the stream open after the script until cancelled.
    pub fn hold_open(mut self) -> Self {
        self.hold_open = true;
        self
    }

    /// Fail every glob before streaming begins.
    pub fn rejecting(reason: &str) -> Self {
        Self { reject: Some(reason.to_owned()), ..Self::replies(vec![]) }
    }

    /// Patterns globbed so far.
    pub fn patterns(&self) -> Vec<String> {
        self.patterns.lock().clone()
    }

    /// Whether every glob issued so far has been cancelled.
    pub fn all_cancelled(&self) -> bool {
        self.cancels.lock().iter().all(CancellationToken::is_cancelled)
    }
}

impl Namespace for ScriptedNamespace {
    fn roots(&self) -> Vec<String> {
        vec!["/scripted".to_owned()]
    }

    fn glob<'a>(
        &'a self,
        pattern: &'a str,
        cancel: CancellationToken,
    ) -> BoxFuture<'a, Result<GlobStream, NamespaceError>> {
        Box::pin(async move {
            self.patterns.lock().push(pattern.to_owned());
            if let Some(ref reason) = self.reject {
                return Err(NamespaceError::Unavailable(reason.clone()));
            }
            self.cancels.lock().push(cancel.clone());

            let (tx, rx) = mpsc::channel(16);
            let script = self.script.clone();
            let hold_open = self.hold_open;
            tokio::spawn(async move {
                for (delay, reply) in script {
                    tokio::select! {
                        _ = cancel.cancelled() => return,
                        _ = tokio::time::sleep(delay) => {}
                    }
                    if tx.send(reply).await.is_err() {
                        return;
                    }
                }
                if hold_open {
                    cancel.cancelled().await;
                }
            });
            Ok(channel_stream(rx))
        })
    }
}

pub fn entry(name: &str) -> GlobReply {
    GlobReply::Entry { name: name.to_owned(), servers: vec![format!("/{name}.server:1")] }
}

pub fn entry_error(name: &str, error: &str) -> GlobReply {
    GlobReply::Error { name: name.to_owned(), error: error.to_owned() }
}
