// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test harness for end-to-end binary smoke tests.
//!
//! Spawns the real `blesser` binary, feeds it commands on stdin and collects
//! the events it writes to stdout.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

/// Resolve the path to the compiled `blesser` binary.
pub fn blesser_binary() -> PathBuf {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    // tests/specs → tests → workspace root
    let workspace = manifest.parent().and_then(|p| p.parent()).unwrap_or(manifest);
    workspace.join("target").join("debug").join("blesser")
}

/// Find a free TCP port by binding to :0 then releasing.
pub fn free_port() -> anyhow::Result<u16> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

/// Output of one `blesser` run.
#[derive(Debug)]
pub struct Outcome {
    pub status: ExitStatus,
    pub events: Vec<serde_json::Value>,
}

/// Builder for a single `blesser` invocation.
#[derive(Default)]
pub struct BlesserRun {
    args: Vec<String>,
    mounts: Option<tempfile::NamedTempFile>,
}

impl BlesserRun {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a raw command-line argument.
    pub fn arg(mut self, arg: &str) -> Self {
        self.args.push(arg.to_owned());
        self
    }

    /// Write `table` to a temp file and pass it as `--mounts`.
    pub fn mounts(mut self, table: serde_json::Value) -> anyhow::Result<Self> {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(table.to_string().as_bytes())?;
        self.mounts = Some(file);
        Ok(self)
    }

    /// Run with `input` on stdin and wait for exit.
    pub async fn run(self, input: &str, timeout: Duration) -> anyhow::Result<Outcome> {
        let binary = blesser_binary();
        anyhow::ensure!(binary.exists(), "blesser binary not found at {}", binary.display());

        let mut cmd = Command::new(&binary);
        cmd.args(&self.args)
            .env("BLESSER_LOG_LEVEL", "debug")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        if let Some(ref file) = self.mounts {
            cmd.arg("--mounts").arg(file.path());
        }
        let mut child = cmd.spawn()?;

        let mut stdin = child.stdin.take().ok_or_else(|| anyhow::anyhow!("no stdin"))?;
        stdin.write_all(input.as_bytes()).await?;
        drop(stdin);

        let mut stdout = child.stdout.take().ok_or_else(|| anyhow::anyhow!("no stdout"))?;
        let mut out = String::new();
        let status = tokio::time::timeout(timeout, async {
            stdout.read_to_string(&mut out).await?;
            child.wait().await
        })
        .await??;

        let events = out
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(serde_json::from_str)
            .collect::<Result<_, _>>()?;
        Ok(Outcome { status, events })
    }
}
