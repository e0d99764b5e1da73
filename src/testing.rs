//! Shared fixtures for unit tests

use crate::config::AuthConfig;
use crate::database::Database;

use std::time::Duration;
use tempfile::TempDir;

const SCHEMA: &[&str] = &[
    r#"CREATE TABLE auth_credentials (
        email TEXT PRIMARY KEY,
        password_hash BLOB NOT NULL,
        password_salt BLOB NOT NULL
    )"#,
    r#"CREATE TABLE users (
        user_id INTEGER PRIMARY KEY AUTOINCREMENT,
        first_name TEXT NOT NULL CHECK (length(first_name) <= 50),
        last_name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        gender TEXT NOT NULL,
        active INTEGER NOT NULL
    )"#,
    r#"CREATE TABLE posts (
        post_id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        post_title TEXT NOT NULL,
        post_content TEXT NOT NULL,
        post_created INTEGER NOT NULL,
        post_updated INTEGER NOT NULL
    )"#,
];

/// Configuration with a cheap iteration count
pub(crate) fn config() -> AuthConfig {
    AuthConfig {
        password_key: "test-pepper".to_string(),
        token_key: "t".repeat(64),
        database_url: "sqlite::memory:".to_string(),
        hash_iterations: 1_000,
        storage_timeout_secs: 5,
        max_connections: 1,
    }
}

/// Fresh single-connection SQLite database with the schema installed.
///
/// Keep the returned directory alive for as long as the database is used.
pub(crate) async fn database() -> (TempDir, Database) {
    database_with(1).await
}

/// Like [`database`] with a pool of `connections`
pub(crate) async fn database_with(connections: u32) -> (TempDir, Database) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let url = format!(
        "sqlite://{}?mode=rwc",
        dir.path().join("auth.db").display()
    );

    let db = Database::connect_with(&url, connections, Duration::from_secs(5))
        .await
        .expect("connect test database");

    for statement in SCHEMA {
        db.execute(statement, &[]).await.expect("install schema");
    }

    (dir, db)
}
