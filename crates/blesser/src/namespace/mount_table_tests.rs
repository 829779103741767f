// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

use super::*;

fn table() -> MountTable {
    MountTable::new(MountTableConfig {
        roots: vec!["/ns.dev.v.io:8101".to_owned()],
        mounts: vec![
            Mount { name: "apps/chat".to_owned(), servers: vec!["/127.0.0.1:9000".to_owned()] },
            Mount { name: "apps/todos".to_owned(), servers: vec![] },
            Mount { name: "/identity/".to_owned(), servers: vec!["/10.0.0.1:8200".to_owned()] },
            Mount { name: "users/alice/devices/phone".to_owned(), servers: vec!["/p".to_owned()] },
        ],
    })
}

async fn names(table: &MountTable, pattern: &str) -> anyhow::Result<Vec<String>> {
    let stream = table.glob(pattern, CancellationToken::new()).await?;
    Ok(stream.map(|r| r.name().to_owned()).collect::<Vec<_>>().await)
}

#[yare::parameterized(
    star            = { "*", &["apps", "identity", "users"] },
    nested_star     = { "apps/*", &["apps/chat", "apps/todos"] },
    question        = { "apps/cha?", &["apps/chat"] },
    prefix_star     = { "apps/t*", &["apps/todos"] },
    literal         = { "identity", &["identity"] },
    recursive       = { "users/...", &["users", "users/alice", "users/alice/devices", "users/alice/devices/phone"] },
    everything      = { "...", &["apps", "apps/chat", "apps/todos", "identity", "users", "users/alice", "users/alice/devices", "users/alice/devices/phone"] },
    no_match        = { "nothing/*", &[] },
    dot_is_literal  = { "app.", &[] },
)]
#[test_macro(tokio::test)]
async fn glob_matches(pattern: &str, expected: &[&str]) -> anyhow::Result<()> {
    assert_eq!(names(&table(), pattern).await?, expected);
    Ok(())
}

#[tokio::test]
async fn interior_nodes_have_no_servers_and_empty_mounts_are_errors() -> anyhow::Result<()> {
    let stream = table().glob("apps/...", CancellationToken::new()).await?;
    let replies: Vec<GlobReply> = stream.collect().await;
    assert_eq!(
        replies,
        vec![
            GlobReply::Entry { name: "apps".to_owned(), servers: vec![] },
            GlobReply::Entry {
                name: "apps/chat".to_owned(),
                servers: vec!["/127.0.0.1:9000".to_owned()],
            },
            GlobReply::Error { name: "apps/todos".to_owned(), error: "no servers mounted".to_owned() },
        ]
    );
    Ok(())
}

#[yare::parameterized(
    empty          = { "", "empty pattern" },
    slashes        = { "//", "empty pattern" },
    empty_element  = { "apps//chat", "empty element" },
    inner_dots     = { ".../chat", "must be the last element" },
)]
fn bad_patterns(pattern: &str, reason: &str) {
    match GlobPattern::parse(pattern) {
        Err(NamespaceError::BadPattern { reason: got, .. }) => {
            assert!(got.contains(reason), "expected {reason:?}, got {got:?}")
        }
        other => panic!("expected BadPattern, got {other:?}"),
    }
}

#[tokio::test]
async fn cancelled_glob_stops_streaming() -> anyhow::Result<()> {
    let mut table = MountTable::default();
    for i in 0..100 {
        table.mount(&format!("n{i:03}"), vec!["/s".to_owned()]);
    }
    let cancel = CancellationToken::new();
    let mut stream = table.glob("*", cancel.clone()).await?;
    assert!(stream.next().await.is_some());
    cancel.cancel();
    let rest: Vec<GlobReply> = stream.collect().await;
    assert!(rest.len() < 99, "stream kept going after cancel: {}", rest.len());
    Ok(())
}

#[test]
fn load_reads_json() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("mounts.json");
    std::fs::write(
        &path,
        r#"{"roots": ["/root:1"], "mounts": [{"name": "a/b", "servers": ["/x"]}, {"name": "c"}]}"#,
    )?;
    let table = MountTable::load(&path)?;
    assert_eq!(table.roots(), vec!["/root:1"]);
    assert!(table.mounts.contains_key("a/b"));
    assert_eq!(table.mounts.get("c"), Some(&vec![]));
    Ok(())
}

#[test]
fn load_rejects_missing_file() {
    assert!(MountTable::load(std::path::Path::new("/nonexistent/mounts.json")).is_err());
}
