// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Line-oriented host adapter: commands in on stdin, events out on stdout.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::event::Event;
use crate::issuer::tls::{ensure_crypto_provider, TrustRoots};
use crate::issuer::Exchanger;
use crate::namespace::mount_table::MountTable;
use crate::namespace::Namespace;
use crate::principal::{KeyPrincipal, Principal};

const EVENT_BUFFER: usize = 64;

/// Build the pipeline from `config` and serve stdin until EOF.
pub async fn run(config: Config) -> anyhow::Result<()> {
    ensure_crypto_provider();

    let roots = match config.root_cert {
        Some(ref path) => TrustRoots::from_pem(&std::fs::read(path)?)?,
        None => TrustRoots::embedded()?,
    };
    info!(roots = roots.len(), endpoint = %config.issuer_url, "issuer trust configured");
    let exchanger = Exchanger::new(config.exchange_config(), &roots)?;

    let namespace: Arc<dyn Namespace> = match config.mounts {
        Some(ref path) => Arc::new(MountTable::load(path)?),
        None => Arc::new(MountTable::default()),
    };

    let principal = KeyPrincipal::generate();
    info!(key = %principal.fingerprint(), "principal ready");
    let principal: Arc<dyn Principal> = Arc::new(principal);

    let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
    let dispatcher = Dispatcher::new(principal, exchanger, namespace, event_tx)
        .with_glob_timeout(config.glob_timeout());
    let writer = tokio::spawn(write_events(tokio::io::stdout(), event_rx));

    serve(&dispatcher, BufReader::new(tokio::io::stdin())).await?;

    // Closing the last sender lets the writer drain and exit.
    drop(dispatcher);
    writer.await??;
    Ok(())
}

/// Dispatch each non-blank line of `reader` to completion, in order.
///
/// A failed command is reported as a `failed` event; serving continues.
pub async fn serve<R>(dispatcher: &Dispatcher, mut reader: R) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line.trim(),
            Err(e) => {
                warn!(err = %e, "dropping non-UTF-8 command");
                continue;
            }
        };
        if line.is_empty() {
            continue;
        }
        if let Err(e) = dispatcher.dispatch(line).await {
            let code = e.code();
            error!(code = %code, err = %e, "command failed");
            let failed = Event::Failed { code: code.as_str().to_owned(), message: e.to_string() };
            dispatcher.emit(failed).await;
        }
    }
    debug!("input closed");
    Ok(())
}

/// Write events as JSON lines until every sender is dropped.
pub async fn write_events<W>(mut out: W, mut rx: mpsc::Receiver<Event>) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(event) = rx.recv().await {
        let mut line = serde_json::to_vec(&event)?;
        line.push(b'\n');
        out.write_all(&line).await?;
        out.flush().await?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "host_tests.rs"]
mod tests;
