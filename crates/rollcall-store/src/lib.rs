//! Identity persistence for Rollcall.
//!
//! A single `identities` table keyed by member id holds the collected
//! (first name, last name, external id) tuple. Upserts fully replace any
//! prior row; no history is retained. Every mutating call commits before
//! returning, so a completed upsert is visible to any later lookup from
//! any task.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "persistence-sqlx")]
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

use rollcall_protocol::MemberId;

/// Database connection pool type used by identity persistence.
#[cfg(feature = "persistence-sqlx")]
pub type DatabasePool = PgPool;

/// Placeholder pool type when SQLx persistence is disabled.
#[cfg(not(feature = "persistence-sqlx"))]
#[derive(Debug, Clone, Copy, Default)]
pub struct DatabasePool;

/// SQL schema for the `identities` table.
pub const IDENTITIES_TABLE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS identities (
    member_id TEXT PRIMARY KEY,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    external_id TEXT NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);"#;

/// Error type returned by identity store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database query failed.
    #[cfg(feature = "persistence-sqlx")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    /// Underlying storage is unavailable or rejected the call.
    #[error("storage error: {0}")]
    Storage(String),
    /// A persisted row no longer parses as a valid record.
    #[error("corrupt record: {0}")]
    Corrupt(String),
    /// SQLx persistence feature is disabled.
    #[error("persistence-sqlx feature is disabled")]
    SqlxDisabled,
}

/// The persisted (first name, last name, external id) tuple for a member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub member_id: MemberId,
    pub first_name: String,
    pub last_name: String,
    pub external_id: String,
    pub updated_at: DateTime<Utc>,
}

impl IdentityRecord {
    pub fn new(
        member_id: MemberId,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        external_id: impl Into<String>,
    ) -> Self {
        Self {
            member_id,
            first_name: first_name.into(),
            last_name: last_name.into(),
            external_id: external_id.into(),
            updated_at: Utc::now(),
        }
    }
}

/// Persistence operations for identity records.
///
/// Implementations must serialize writes so that a completed `upsert` is
/// visible to any `lookup` issued afterward, including from another task.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Atomic replace-or-insert keyed by member id.
    async fn upsert(&self, record: IdentityRecord) -> Result<(), StoreError>;
    /// Load one record. Absence is `Ok(None)`, not an error.
    async fn lookup(&self, member_id: &MemberId) -> Result<Option<IdentityRecord>, StoreError>;
    /// List every record in persistence-native order.
    async fn list_all(&self) -> Result<Vec<IdentityRecord>, StoreError>;
    /// Unconditionally delete every record. Confirmation is the caller's job.
    async fn wipe_all(&self) -> Result<(), StoreError>;
}

/// In-memory identity store. The default backend and the test double.
#[derive(Debug, Default, Clone)]
pub struct InMemoryIdentityStore {
    records: Arc<RwLock<HashMap<MemberId, IdentityRecord>>>,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn upsert(&self, record: IdentityRecord) -> Result<(), StoreError> {
        self.records
            .write()
            .await
            .insert(record.member_id.clone(), record);
        Ok(())
    }

    async fn lookup(&self, member_id: &MemberId) -> Result<Option<IdentityRecord>, StoreError> {
        Ok(self.records.read().await.get(member_id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<IdentityRecord>, StoreError> {
        let mut records = self
            .records
            .read()
            .await
            .values()
            .cloned()
            .collect::<Vec<_>>();
        records.sort_by_key(|record| record.updated_at);
        Ok(records)
    }

    async fn wipe_all(&self) -> Result<(), StoreError> {
        self.records.write().await.clear();
        Ok(())
    }
}

/// Create a PostgreSQL connection pool for identity persistence.
#[cfg(feature = "persistence-sqlx")]
pub async fn init_pool(database_url: &str) -> Result<DatabasePool, StoreError> {
    Ok(PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?)
}

/// Create a PostgreSQL connection pool for identity persistence.
#[cfg(not(feature = "persistence-sqlx"))]
pub async fn init_pool(_database_url: &str) -> Result<DatabasePool, StoreError> {
    Err(StoreError::SqlxDisabled)
}

/// Initialize the identities table if it does not exist.
#[cfg(feature = "persistence-sqlx")]
pub async fn initialize_schema(pool: &DatabasePool) -> Result<(), StoreError> {
    sqlx::query(IDENTITIES_TABLE_SCHEMA).execute(pool).await?;
    Ok(())
}

/// Initialize the identities table if it does not exist.
#[cfg(not(feature = "persistence-sqlx"))]
pub async fn initialize_schema(_pool: &DatabasePool) -> Result<(), StoreError> {
    Err(StoreError::SqlxDisabled)
}

/// SQLx/PostgreSQL implementation of [`IdentityStore`].
#[cfg(feature = "persistence-sqlx")]
#[derive(Debug, Clone)]
pub struct SqlxIdentityStore {
    pool: DatabasePool,
}

#[cfg(feature = "persistence-sqlx")]
impl SqlxIdentityStore {
    /// Build a store over an existing pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    fn record_from_row(row: &sqlx::postgres::PgRow) -> Result<IdentityRecord, StoreError> {
        let member_id: String = row.get("member_id");
        let member_id = member_id
            .parse::<MemberId>()
            .map_err(|err| StoreError::Corrupt(format!("member_id {member_id:?}: {err}")))?;
        Ok(IdentityRecord {
            member_id,
            first_name: row.get("first_name"),
            last_name: row.get("last_name"),
            external_id: row.get("external_id"),
            updated_at: row.get("updated_at"),
        })
    }
}

#[cfg(feature = "persistence-sqlx")]
#[async_trait]
impl IdentityStore for SqlxIdentityStore {
    async fn upsert(&self, record: IdentityRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO identities (member_id, first_name, last_name, external_id, updated_at) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (member_id) DO UPDATE SET \
                 first_name = EXCLUDED.first_name, \
                 last_name = EXCLUDED.last_name, \
                 external_id = EXCLUDED.external_id, \
                 updated_at = EXCLUDED.updated_at",
        )
        .bind(record.member_id.to_string())
        .bind(&record.first_name)
        .bind(&record.last_name)
        .bind(&record.external_id)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn lookup(&self, member_id: &MemberId) -> Result<Option<IdentityRecord>, StoreError> {
        let row = sqlx::query(
            "SELECT member_id, first_name, last_name, external_id, updated_at \
             FROM identities WHERE member_id = $1",
        )
        .bind(member_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::record_from_row).transpose()
    }

    async fn list_all(&self) -> Result<Vec<IdentityRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT member_id, first_name, last_name, external_id, updated_at \
             FROM identities ORDER BY updated_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::record_from_row).collect()
    }

    async fn wipe_all(&self) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM identities")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
