// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory mount table.
//!
//! Names are `/`-separated. Interior nodes (prefixes of mounted names) are
//! listed as entries without servers; a name mounted with an empty server
//! list is reported as a per-entry error.

use std::collections::BTreeMap;
use std::path::Path;

use futures_util::future::BoxFuture;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::namespace::{channel_stream, GlobReply, GlobStream, Namespace, NamespaceError};

/// Pattern element matching any number of trailing name elements.
pub const RECURSIVE: &str = "...";

const REPLY_BUFFER: usize = 16;

/// On-disk mount table description (`--mounts`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MountTableConfig {
    #[serde(default)]
    pub roots: Vec<String>,
    #[serde(default)]
    pub mounts: Vec<Mount>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mount {
    pub name: String,
    #[serde(default)]
    pub servers: Vec<String>,
}

#[derive(Debug, Default)]
pub struct MountTable {
    roots: Vec<String>,
    mounts: BTreeMap<String, Vec<String>>,
}

impl MountTable {
    pub fn new(config: MountTableConfig) -> Self {
        let mut table = Self { roots: config.roots, mounts: BTreeMap::new() };
        for m in config.mounts {
            table.mount(&m.name, m.servers);
        }
        table
    }

    /// Load a [`MountTableConfig`] from a JSON file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: MountTableConfig = serde_json::from_str(&contents)?;
        Ok(Self::new(config))
    }

    /// Mount `servers` at `name`, replacing any previous mount.
    pub fn mount(&mut self, name: &str, servers: Vec<String>) {
        let name = name.trim_matches('/');
        if name.is_empty() {
            return;
        }
        self.mounts.insert(name.to_owned(), servers);
    }

    /// Every node in the table: mounted names plus their interior prefixes.
    fn nodes(&self) -> BTreeMap<String, Option<&Vec<String>>> {
        let mut nodes = BTreeMap::new();
        for (name, servers) in &self.mounts {
            let mut prefix = String::new();
            for element in name.split('/') {
                if !prefix.is_empty() {
                    prefix.push('/');
                }
                prefix.push_str(element);
                nodes.entry(prefix.clone()).or_insert(None);
            }
            nodes.insert(name.clone(), Some(servers));
        }
        nodes
    }

    fn matching(&self, pattern: &GlobPattern) -> Vec<GlobReply> {
        self.nodes()
            .into_iter()
            .filter(|(name, _)| pattern.matches(name))
            .map(|(name, servers)| match servers {
                Some(s) if s.is_empty() => {
                    GlobReply::Error { name, error: "no servers mounted".to_owned() }
                }
                Some(s) => GlobReply::Entry { name, servers: s.clone() },
                None => GlobReply::Entry { name, servers: vec![] },
            })
            .collect()
    }
}

impl Namespace for MountTable {
    fn roots(&self) -> Vec<String> {
        self.roots.clone()
    }

    fn glob<'a>(
        &'a self,
        pattern: &'a str,
        cancel: CancellationToken,
    ) -> BoxFuture<'a, Result<GlobStream, NamespaceError>> {
        Box::pin(async move {
            let matcher = GlobPattern::parse(pattern)?;
            let replies = self.matching(&matcher);
            let (tx, rx) = mpsc::channel(REPLY_BUFFER);
            tokio::spawn(async move {
                for reply in replies {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        sent = tx.send(reply) => {
                            if sent.is_err() {
                                break;
                            }
                        }
                    }
                }
            });
            Ok(channel_stream(rx))
        })
    }
}

/// A compiled glob: one regex per name element, optionally followed by `...`.
#[derive(Debug)]
pub struct GlobPattern {
    elements: Vec<Regex>,
    recursive: bool,
}

impl GlobPattern {
    pub fn parse(pattern: &str) -> Result<Self, NamespaceError> {
        let bad = |reason: &str| NamespaceError::BadPattern {
            pattern: pattern.to_owned(),
            reason: reason.to_owned(),
        };

        let trimmed = pattern.trim_matches('/');
        if trimmed.is_empty() {
            return Err(bad("empty pattern"));
        }
        let parts: Vec<&str> = trimmed.split('/').collect();
        let mut elements = Vec::with_capacity(parts.len());
        let mut recursive = false;
        for (i, part) in parts.iter().enumerate() {
            if *part == RECURSIVE {
                if i + 1 != parts.len() {
                    return Err(bad("\"...\" must be the last element"));
                }
                recursive = true;
                continue;
            }
            if part.is_empty() {
                return Err(bad("empty element"));
            }
            elements.push(element_regex(part).map_err(|e| bad(&e.to_string()))?);
        }
        Ok(Self { elements, recursive })
    }

    pub fn matches(&self, name: &str) -> bool {
        let parts: Vec<&str> = name.split('/').collect();
        let depth_ok = if self.recursive {
            parts.len() >= self.elements.len()
        } else {
            parts.len() == self.elements.len()
        };
        depth_ok && self.elements.iter().zip(&parts).all(|(re, part)| re.is_match(part))
    }
}

fn element_regex(element: &str) -> Result<Regex, regex::Error> {
    let mut re = String::with_capacity(element.len() + 2);
    re.push('^');
    for c in element.chars() {
        match c {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            _ => re.push_str(&regex::escape(&c.to_string())),
        }
    }
    re.push('$');
    Regex::new(&re)
}

#[cfg(test)]
#[path = "mount_table_tests.rs"]
mod tests;
