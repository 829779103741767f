// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local stand-in for the issuance endpoint, for unit tests.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::Form;
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use ed25519_dalek::{SigningKey, VerifyingKey};
use parking_lot::Mutex;
use tokio::net::TcpListener;

use crate::blessing::Blessings;
use crate::caveat::{Caveat, CAVEAT_TTL};
use crate::codec;
use crate::issuer::ExchangeConfig;

pub struct MockIssuer {
    pub addr: SocketAddr,
    calls: Arc<AtomicU32>,
    forms: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

impl MockIssuer {
    /// Serve `responses` in order, repeating the last one once exhausted.
    pub async fn spawn(responses: Vec<(u16, String)>) -> anyhow::Result<Self> {
        let calls = Arc::new(AtomicU32::new(0));
        let forms = Arc::new(Mutex::new(Vec::new()));
        let responses = Arc::new(responses);

        let handler_calls = Arc::clone(&calls);
        let handler_forms = Arc::clone(&forms);
        let app = Router::new().route(
            "/bless",
            post(move |Form(form): Form<HashMap<String, String>>| {
                let calls = Arc::clone(&handler_calls);
                let forms = Arc::clone(&handler_forms);
                let resps = Arc::clone(&responses);
                async move {
                    let idx = calls.fetch_add(1, Ordering::Relaxed) as usize;
                    forms.lock().push(form);
                    let (status, body) = resps
                        .get(idx)
                        .or_else(|| resps.last())
                        .cloned()
                        .unwrap_or((500, String::new()));
                    (
                        StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                        body,
                    )
                }
            }),
        );

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });
        Ok(Self { addr, calls, forms })
    }

    pub fn url(&self) -> String {
        format!("http://{}/bless", self.addr)
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn forms(&self) -> Vec<HashMap<String, String>> {
        self.forms.lock().clone()
    }
}

/// An endpoint nothing listens on.
pub async fn dead_endpoint() -> anyhow::Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(format!("http://{addr}/bless"))
}

/// Fast-retrying config pointed at `url`.
pub fn test_config(url: &str) -> ExchangeConfig {
    ExchangeConfig {
        endpoint: url.to_owned(),
        retry_delay: Duration::from_millis(10),
        ..ExchangeConfig::default()
    }
}

/// Response body the issuer would send for `subject`.
pub fn issued_body(subject: &VerifyingKey, extension: &str) -> anyhow::Result<String> {
    let issuer = SigningKey::from_bytes(&[42; 32]);
    let root = Blessings::self_signed(&issuer, "dev.v.io", vec![])?;
    let expiry = Caveat::expiry_after(CAVEAT_TTL)?;
    let blessings = root.bless(&issuer, subject, extension, vec![expiry])?;
    Ok(codec::to_base64_cbor(&blessings)?)
}

pub fn http_client() -> reqwest::Client {
    crate::issuer::tls::ensure_crypto_provider();
    reqwest::Client::new()
}
