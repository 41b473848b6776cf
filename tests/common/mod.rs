//! Shared helpers for the enrichment integration tests

#![allow(dead_code)]

use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use treescape::{EnrichmentEngine, MockClient, OpenStore, RetryPolicy, SqliteStore};

/// In-memory store with the default taxonomies installed.
pub fn seeded_store() -> Arc<SqliteStore> {
    let store = Arc::new(SqliteStore::open_in_memory().expect("open in-memory store"));
    store.seed_default_categories().expect("seed categories");
    store
}

/// Engine over `store` answering from `client`, limited to `attempts`.
pub fn engine_with(store: &Arc<SqliteStore>, client: &Arc<MockClient>, attempts: u32) -> EnrichmentEngine {
    EnrichmentEngine::new(store.clone(), store.clone(), client.clone()).with_policy(RetryPolicy {
        max_attempts: attempts,
        ..RetryPolicy::default()
    })
}

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).expect("decimal literal")
}
