//! SQLite persistence for the keygate trust core.
//!
//! The pool is created once at startup. Repository functions take
//! `&mut SqliteConnection` so callers decide the transaction boundary: every
//! mutating request path runs on a single `pool.begin()` transaction and the
//! repositories compose inside it.

pub mod access_keys;
pub mod credentials;
pub mod grants;
pub mod groups;
pub mod identities;
pub mod organizations;
pub mod provider_users;
pub mod providers;
pub mod schema;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::time::Duration;

/// Open the database at `path`, creating it if missing.
///
/// `:memory:` is supported for tests; it is pinned to a single connection so
/// every acquire sees the same database.
pub async fn connect(path: &str) -> Result<SqlitePool, sqlx::Error> {
    let in_memory = path == ":memory:";

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(if in_memory {
            SqliteJournalMode::Memory
        } else {
            SqliteJournalMode::Wal
        })
        .busy_timeout(Duration::from_secs(5));

    SqlitePoolOptions::new()
        .max_connections(if in_memory { 1 } else { 5 })
        .connect_with(options)
        .await
}

/// Apply the embedded schema. Safe to run repeatedly.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(schema::SCHEMA).execute(pool).await?;
    tracing::debug!("database schema applied");
    Ok(())
}
