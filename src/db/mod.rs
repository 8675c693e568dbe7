// Database module - provides data access layer

use std::{str::FromStr, time::Duration};

use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    Sqlite, SqlitePool, Transaction,
};

use crate::error::{Error, Result};

pub mod models;

mod analytics;
mod hierarchy;
mod import;
mod migrations;
mod module;
mod question;
mod subject;
mod submodule;

pub use hierarchy::Cascade;

/// Row filter for listings: rows with the flag unset predate it and count as active.
pub(crate) fn visible(alias: &str) -> String {
    format!("({alias}.active IS NULL OR {alias}.active = 1)")
}

// Main database handle
#[derive(Clone)]
pub struct Db {
    pool: SqlitePool,
}

impl Db {
    pub async fn new(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        // Verify connection
        let one: i64 = sqlx::query_scalar("SELECT 1").fetch_one(&pool).await?;
        if one != 1 {
            return Err(Error::Storage(sqlx::Error::Protocol(
                "connection check failed".to_string(),
            )));
        }

        migrations::run(&pool).await?;

        tracing::info!("database connection has been verified");

        Ok(Self { pool })
    }

    /// Opens a transaction that holds the write lock from its first
    /// statement, so reads inside it never need a lock upgrade. Concurrent
    /// writers queue on the busy timeout.
    pub(crate) async fn begin_write(&self) -> Result<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin_with("BEGIN IMMEDIATE").await?)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn migration_applied(&self, version: &str) -> Result<bool> {
        let applied: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM schema_migrations WHERE version = ?)",
        )
        .bind(version)
        .fetch_one(&self.pool)
        .await?;

        Ok(applied)
    }
}

/// Commits on success. On failure rolls back and returns the original error;
/// a failed rollback is logged, never returned.
pub(crate) async fn finish<T>(tx: Transaction<'_, Sqlite>, result: Result<T>) -> Result<T> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            match tx.rollback().await {
                Ok(()) => tracing::warn!(error = %err, "transaction rolled back"),
                Err(rollback_err) => tracing::error!(
                    error = %err,
                    rollback_error = %rollback_err,
                    "failed to roll back transaction"
                ),
            }
            Err(err)
        }
    }
}
