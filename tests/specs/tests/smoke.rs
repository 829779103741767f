// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end smoke tests that spawn the real `blesser` binary.

use std::time::Duration;

use serde_json::json;

use blesser_specs::{free_port, BlesserRun};

const TIMEOUT: Duration = Duration::from_secs(20);

fn mount_table() -> serde_json::Value {
    json!({
        "roots": ["/ns.example:8101"],
        "mounts": [
            {"name": "identity", "servers": ["/id.example:8101"]},
            {"name": "apps/todos", "servers": ["/todos:1"]},
            {"name": "offline", "servers": []},
        ]
    })
}

#[tokio::test]
async fn url_command_lists_top_level_names() -> anyhow::Result<()> {
    let input = concat!(
        "{\"type\":\"url\",\"data\":\"https://example.com/app\"}\n",
        "{\"type\":\"bogus\",\"data\":\"x\"}\n",
        "this is not json\n",
        "\n",
    );
    let outcome = BlesserRun::new().mounts(mount_table())?.run(input, TIMEOUT).await?;

    assert!(outcome.status.success(), "status {:?}", outcome.status);
    assert_eq!(
        outcome.events,
        vec![
            json!({"event": "entry", "name": "apps"}),
            json!({"event": "entry", "name": "identity"}),
            json!({"event": "entry_error", "name": "offline", "error": "no servers mounted"}),
            json!({"event": "discovery_done", "pattern": "*", "count": 3}),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn unreachable_issuer_reports_failure_and_keeps_serving() -> anyhow::Result<()> {
    let issuer = format!("http://127.0.0.1:{}/bless", free_port()?);
    let input = "{\"type\":\"token\",\"data\":\"tok1\"}\n{\"type\":\"url\"}\n";
    let outcome = BlesserRun::new()
        .arg("--issuer-url")
        .arg(&issuer)
        .arg("--retry-delay-ms")
        .arg("10")
        .mounts(json!({"mounts": [{"name": "identity", "servers": ["/id:1"]}]}))?
        .run(input, TIMEOUT)
        .await?;

    assert!(outcome.status.success(), "status {:?}", outcome.status);
    assert_eq!(outcome.events.len(), 3, "events {:?}", outcome.events);
    assert_eq!(outcome.events[0]["event"], "failed");
    assert_eq!(outcome.events[0]["code"], "EXHAUSTED");
    assert_eq!(outcome.events[1], json!({"event": "entry", "name": "identity"}));
    assert_eq!(outcome.events[2], json!({"event": "discovery_done", "pattern": "*", "count": 1}));
    Ok(())
}

#[tokio::test]
async fn empty_input_exits_cleanly() -> anyhow::Result<()> {
    let outcome = BlesserRun::new().run("", TIMEOUT).await?;
    assert!(outcome.status.success());
    assert!(outcome.events.is_empty());
    Ok(())
}

#[tokio::test]
async fn invalid_config_exits_with_usage_error() -> anyhow::Result<()> {
    let outcome = BlesserRun::new().arg("--max-attempts").arg("0").run("", TIMEOUT).await?;
    assert_eq!(outcome.status.code(), Some(2));
    assert!(outcome.events.is_empty());
    Ok(())
}

#[tokio::test]
async fn missing_mount_file_is_fatal() -> anyhow::Result<()> {
    let outcome =
        BlesserRun::new().arg("--mounts").arg("/nonexistent/mounts.json").run("", TIMEOUT).await?;
    assert_eq!(outcome.status.code(), Some(1));
    Ok(())
}
