//! Best-effort snapshot persistence.
//!
//! `append` returns nothing: a failed insert is logged here and never reaches
//! the request that produced the snapshot.

use async_trait::async_trait;
use sqlx::SqlitePool;

use super::queries;
use crate::services::snapshot::EnvironmentSnapshot;

/// Append-only sink for normalized snapshots.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn append(&self, snapshot: &EnvironmentSnapshot);
}

/// `SnapshotStore` backed by the `air_quality` table.
#[derive(Debug, Clone)]
pub struct SqliteSnapshotStore {
    pool: SqlitePool,
}

impl SqliteSnapshotStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SnapshotStore for SqliteSnapshotStore {
    async fn append(&self, snapshot: &EnvironmentSnapshot) {
        match queries::insert_snapshot(&self.pool, snapshot).await {
            Ok(id) => {
                tracing::debug!(
                    "Stored snapshot {} for ({}, {})",
                    id,
                    snapshot.location.latitude,
                    snapshot.location.longitude
                );
            }
            Err(e) => {
                tracing::error!(
                    "Failed to store snapshot for ({}, {}): {}",
                    snapshot.location.latitude,
                    snapshot.location.longitude,
                    e
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;
    use crate::services::testing::sample_snapshot;

    #[tokio::test]
    async fn test_append_writes_one_row() {
        let pool = memory_pool().await;
        let store = SqliteSnapshotStore::new(pool.clone());

        store.append(&sample_snapshot()).await;

        let rows = queries::recent_snapshots(&pool, 10).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_append_swallows_storage_failure() {
        let pool = memory_pool().await;
        let store = SqliteSnapshotStore::new(pool.clone());
        pool.close().await;

        // Must return normally even though the insert cannot run.
        store.append(&sample_snapshot()).await;
    }
}
