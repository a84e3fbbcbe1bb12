//! Throwaway-database harness for Postgres-backed tests.
//!
//! Tests call `test_store().await`; when `TEST_DATABASE_URL` is unset they
//! get `None` and skip, so the suite stays green on machines without a
//! database. When it is set, each call creates a uniquely named database
//! under that server and migrates it, giving every test full isolation.
//! Test databases are left behind for postmortem inspection; point
//! `TEST_DATABASE_URL` at a disposable server.

use std::time::{SystemTime, UNIX_EPOCH};

use sqlx::postgres::PgPoolOptions;

use crate::Store;

pub struct TestStore {
    pub store: Store,
    pub dbname: String,
}

/// Create and migrate a fresh database. `None` means "skip this test".
pub async fn test_store() -> Option<TestStore> {
    let admin_url = std::env::var("TEST_DATABASE_URL").ok()?;

    let admin = PgPoolOptions::new()
        .max_connections(1)
        .connect(&admin_url)
        .await
        .expect("TEST_DATABASE_URL is set but unreachable");

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before epoch")
        .as_nanos();
    let dbname = format!("rinkwire_test_{}_{}", std::process::id(), nanos);

    sqlx::query(&format!(r#"CREATE DATABASE "{dbname}""#))
        .execute(&admin)
        .await
        .expect("create test database");

    let base = admin_url
        .rsplit_once('/')
        .map(|(prefix, _)| prefix.to_string())
        .unwrap_or(admin_url);
    let store = Store::connect(&format!("{base}/{dbname}"))
        .await
        .expect("connect to test database");
    store.migrate().await.expect("migrate test database");

    Some(TestStore { store, dbname })
}
