// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

pub mod blessing;
pub mod caveat;
pub mod codec;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod host;
pub mod issuer;
pub mod namespace;
pub mod principal;
pub mod test_support;
