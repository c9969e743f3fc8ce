//! Tracked-record store
//!
//! Holds every package the mirror follows and the versions already mirrored.
//! Recording a version for an unknown package starts tracking it, so
//! transitive dependencies are followed once they have been mirrored.

use crate::db::{create_pool, run_migrations};
use async_trait::async_trait;
use npmirror_errors::Error;
use npmirror_types::TrackedPackage;
use sqlx::{query, Pool, Row, Sqlite};
use std::collections::BTreeMap;
use std::path::Path;

/// Persistent record of tracked packages
#[async_trait]
pub trait TrackedStore: Send + Sync {
    /// All tracked packages, sorted by name
    async fn find_all(&self) -> Result<Vec<TrackedPackage>, Error>;

    /// Mark `name@version` as mirrored; idempotent
    async fn record_version(&self, name: &str, version: &str) -> Result<(), Error>;

    /// Start tracking `name`; returns false if it was already tracked
    async fn track(&self, name: &str) -> Result<bool, Error>;

    /// Stop tracking `name` and forget its versions; returns false if unknown
    async fn untrack(&self, name: &str) -> Result<bool, Error>;
}

/// `TrackedStore` backed by an `SQLite` database
#[derive(Clone)]
pub struct SqliteTrackedStore {
    pool: Pool<Sqlite>,
}

impl SqliteTrackedStore {
    /// Open (creating if needed) the database at `db_path` and migrate it
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub async fn open(db_path: &Path) -> Result<Self, Error> {
        let pool = create_pool(db_path).await?;
        run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    #[must_use]
    pub fn from_pool(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TrackedStore for SqliteTrackedStore {
    async fn find_all(&self) -> Result<Vec<TrackedPackage>, Error> {
        let rows = query(
            "SELECT p.name AS name, v.version AS version
             FROM tracked_packages p
             LEFT JOIN tracked_versions v ON v.name = p.name
             ORDER BY p.name",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut packages: BTreeMap<String, TrackedPackage> = BTreeMap::new();
        for row in rows {
            let name: String = row.get("name");
            let version: Option<String> = row.get("version");
            let entry = packages
                .entry(name.clone())
                .or_insert_with(|| TrackedPackage::new(name));
            if let Some(version) = version {
                entry.versions.insert(version);
            }
        }
        Ok(packages.into_values().collect())
    }

    async fn record_version(&self, name: &str, version: &str) -> Result<(), Error> {
        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        query("INSERT OR IGNORE INTO tracked_packages (name, added_at) VALUES (?1, ?2)")
            .bind(name)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        query(
            "INSERT OR IGNORE INTO tracked_versions (name, version, recorded_at)
             VALUES (?1, ?2, ?3)",
        )
        .bind(name)
        .bind(version)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn track(&self, name: &str) -> Result<bool, Error> {
        let now = chrono::Utc::now().timestamp();
        let result =
            query("INSERT OR IGNORE INTO tracked_packages (name, added_at) VALUES (?1, ?2)")
                .bind(name)
                .bind(now)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn untrack(&self, name: &str) -> Result<bool, Error> {
        let mut tx = self.pool.begin().await?;
        query("DELETE FROM tracked_versions WHERE name = ?1")
            .bind(name)
            .execute(&mut *tx)
            .await?;
        let result = query("DELETE FROM tracked_packages WHERE name = ?1")
            .bind(name)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}
