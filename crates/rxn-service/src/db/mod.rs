//! # Database Persistence Layer
//!
//! Postgres implementations of the repositories via SQLx.
//!
//! ## Architecture
//!
//! The database layer is **optional**. When `DATABASE_URL` is set, the
//! services persist membership, root history, nullifiers, tallies and the
//! audit log to PostgreSQL. When absent, they run over
//! [`MemoryStore`](crate::store::MemoryStore) (development and tests).
//!
//! ## Concurrency
//!
//! - Membership mutations take `pg_advisory_xact_lock` keyed by feed, then
//!   re-read the active set inside the same transaction before computing
//!   the root they append.
//! - Tally writes are conditional on the version read (`WHERE version = $n`);
//!   zero affected rows is a [`StorageError::Conflict`].

pub mod membership;
pub mod reactions;

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};

use rxn_core::{BlockHeight, FeedId};

use crate::config::ServiceConfig;
use crate::error::StorageError;

/// Postgres-backed implementation of every repository.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap a connected, migrated pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Initialize the connection pool and run migrations.
///
/// Returns `None` if no database URL is configured (in-memory mode).
/// Returns `Err` if the URL is set but connection or migration fails.
pub async fn init_pool(config: &ServiceConfig) -> Result<Option<PgPool>, StorageError> {
    let Some(url) = config.database_url.as_deref() else {
        tracing::warn!(
            "DATABASE_URL not set, running in-memory only mode. \
             State will not survive restarts."
        );
        return Ok(None);
    };

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(5))
        .connect(url)
        .await?;
    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(Some(pool))
}

/// Advisory lock key of a feed: the first eight UUID bytes.
pub(crate) fn feed_lock_key(feed_id: &FeedId) -> i64 {
    let bytes = feed_id.as_bytes();
    let mut head = [0u8; 8];
    head.copy_from_slice(&bytes[..8]);
    i64::from_be_bytes(head)
}

pub(crate) fn height_to_db(height: BlockHeight) -> Result<i64, StorageError> {
    i64::try_from(height.value())
        .map_err(|_| StorageError::Corrupt(format!("block height {height} exceeds BIGINT")))
}

pub(crate) fn height_from_db(raw: i64) -> Result<BlockHeight, StorageError> {
    u64::try_from(raw)
        .map(BlockHeight)
        .map_err(|_| StorageError::Corrupt(format!("negative block height {raw}")))
}

pub(crate) fn count_to_db(value: u64, column: &str) -> Result<i64, StorageError> {
    i64::try_from(value).map_err(|_| StorageError::Corrupt(format!("{column} {value} exceeds BIGINT")))
}

pub(crate) fn count_from_db(raw: i64, column: &str) -> Result<u64, StorageError> {
    u64::try_from(raw).map_err(|_| StorageError::Corrupt(format!("negative {column} {raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn lock_key_is_stable_per_feed() {
        let feed = FeedId(Uuid::from_bytes([0xab; 16]));
        assert_eq!(feed_lock_key(&feed), feed_lock_key(&feed));
        let other = FeedId(Uuid::from_bytes([0x01; 16]));
        assert_ne!(feed_lock_key(&feed), feed_lock_key(&other));
    }

    #[test]
    fn negative_height_is_corrupt() {
        assert!(matches!(height_from_db(-1), Err(StorageError::Corrupt(_))));
        assert_eq!(height_from_db(7).unwrap(), BlockHeight(7));
    }

    #[test]
    fn oversized_height_is_rejected() {
        assert!(height_to_db(BlockHeight(u64::MAX)).is_err());
        assert_eq!(height_to_db(BlockHeight(12)).unwrap(), 12);
    }

    #[tokio::test]
    async fn no_database_url_means_memory_mode() {
        let pool = init_pool(&ServiceConfig::default()).await.unwrap();
        assert!(pool.is_none());
    }
}
