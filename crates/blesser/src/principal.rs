// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Principal: the key pair and blessing store blessings are installed into.
//!
//! Shared as `Arc<dyn Principal>` between the dispatcher and the installer.
//! [`KeyPrincipal`] guards its store with a mutex so installation stays
//! last-writer-wins atomic even if commands are dispatched concurrently.

use std::collections::BTreeMap;
use std::fmt::{self, Write as _};
use std::time::{SystemTime, UNIX_EPOCH};

use ed25519_dalek::{SigningKey, VerifyingKey};
use parking_lot::Mutex;
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::blessing::{BlessingError, Blessings};
use crate::caveat::CaveatError;

/// Capabilities the exchange needs from the identity subsystem.
pub trait Principal: Send + Sync {
    /// Marshaled public key, sent to the issuer.
    fn public_key(&self) -> Result<Vec<u8>, PrincipalError>;

    /// Replace the default blessings. Must leave the store untouched on error.
    fn set_default(&self, blessings: Blessings) -> Result<(), PrincipalError>;

    fn default_blessings(&self) -> Option<Blessings>;

    /// Multi-line description of the blessing store, for logs only.
    fn debug_string(&self) -> String;
}

#[derive(Debug)]
pub enum PrincipalError {
    /// The public key could not be marshaled.
    Marshal(String),
    /// The blessings are bound to a different public key.
    KeyMismatch,
    /// The blessings failed chain verification.
    Untrusted(BlessingError),
    /// A caveat in the chain is no longer satisfied.
    Expired(CaveatError),
}

impl fmt::Display for PrincipalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Marshal(msg) => write!(f, "marshal public key: {msg}"),
            Self::KeyMismatch => f.write_str("blessings do not match the principal's public key"),
            Self::Untrusted(e) => write!(f, "untrusted blessings: {e}"),
            Self::Expired(e) => write!(f, "unusable blessings: {e}"),
        }
    }
}

impl std::error::Error for PrincipalError {}

/// Short hex fingerprint of a public key (first 16 bytes of its SHA-256).
pub fn fingerprint(key: &VerifyingKey) -> String {
    let digest = Sha256::digest(key.as_bytes());
    let mut out = String::with_capacity(47);
    for (i, byte) in digest.iter().take(16).enumerate() {
        if i > 0 {
            out.push(':');
        }
        let _ = write!(out, "{byte:02x}");
    }
    out
}

#[derive(Default)]
struct BlessingStore {
    default: Option<Blessings>,
    /// Recognized roots: root key fingerprint → root name.
    roots: BTreeMap<String, String>,
}

/// An in-memory principal backed by an ed25519 key.
pub struct KeyPrincipal {
    key: SigningKey,
    store: Mutex<BlessingStore>,
}

impl KeyPrincipal {
    /// Generate a fresh random key.
    pub fn generate() -> Self {
        let mut seed = [0u8; 32];
        rand::rng().fill(&mut seed);
        Self::from_signing_key(SigningKey::from_bytes(&seed))
    }

    pub fn from_signing_key(key: SigningKey) -> Self {
        Self { key, store: Mutex::new(BlessingStore::default()) }
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.key.verifying_key()
    }

    pub fn fingerprint(&self) -> String {
        fingerprint(&self.verifying_key())
    }

    /// Fingerprints and names of roots recognized through installed blessings.
    pub fn roots(&self) -> Vec<(String, String)> {
        self.store.lock().roots.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

impl Principal for KeyPrincipal {
    fn public_key(&self) -> Result<Vec<u8>, PrincipalError> {
        Ok(self.key.verifying_key().to_bytes().to_vec())
    }

    fn set_default(&self, blessings: Blessings) -> Result<(), PrincipalError> {
        let bound = blessings.public_key().map_err(PrincipalError::Untrusted)?;
        if bound != self.verifying_key() {
            return Err(PrincipalError::KeyMismatch);
        }
        blessings.verify().map_err(PrincipalError::Untrusted)?;
        let now = SystemTime::now();
        for caveat in blessings.certificates().iter().flat_map(|c| c.caveats.iter()) {
            caveat.validate(now).map_err(PrincipalError::Expired)?;
        }
        let root = match blessings.root() {
            Some(cert) => {
                let key = cert.verifying_key().map_err(PrincipalError::Untrusted)?;
                (fingerprint(&key), cert.extension.clone())
            }
            None => return Err(PrincipalError::Untrusted(BlessingError::EmptyChain)),
        };

        let mut store = self.store.lock();
        store.roots.insert(root.0, root.1);
        store.default = Some(blessings);
        Ok(())
    }

    fn default_blessings(&self) -> Option<Blessings> {
        self.store.lock().default.clone()
    }

    fn debug_string(&self) -> String {
        let store = self.store.lock();
        let mut out = String::new();
        let _ = writeln!(out, "Public key       : {}", self.fingerprint());
        match &store.default {
            Some(b) => {
                let _ = writeln!(out, "Default blessings: {}", b.name());
                let expiry = b
                    .expiry()
                    .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                    .map(|d| format!("{} ms", d.as_millis()))
                    .unwrap_or_else(|| "never".to_owned());
                let _ = writeln!(out, "Expires          : {expiry}");
            }
            None => {
                let _ = writeln!(out, "Default blessings: <none>");
            }
        }
        let _ = writeln!(out, "Roots:");
        for (fp, name) in &store.roots {
            let _ = writeln!(out, "  {fp}  {name}");
        }
        out
    }
}

#[cfg(test)]
#[path = "principal_tests.rs"]
mod tests;
