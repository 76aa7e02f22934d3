//! Relational Credential Backend (SQLite)
//!
//! Stores credentials in the `users` table defined by
//! [`SQLITE_INIT`](crate::store::SQLITE_INIT). Username uniqueness is a
//! storage-layer UNIQUE constraint: a racing duplicate insert fails
//! atomically inside the database and is surfaced as
//! [`StoreError::DuplicateUsername`], so the insert path never depends on
//! a separate existence check.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};
use tracing::debug;

use crate::store::schema::SQLITE_INIT;
use crate::store::{CredentialRecord, CredentialStore, NewCredential, StoreError, DEFAULT_ROLE};

pub type SqlitePool = Pool<Sqlite>;

/// Credential store backed by the relational `users` table.
#[derive(Clone)]
pub struct SqliteCredentialStore {
    pool: SqlitePool,
}

impl SqliteCredentialStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Initialize the schema by executing the bundled DDL.
    pub async fn init_schema(&self) -> Result<(), StoreError> {
        // sqlx::query executes one statement at a time.
        for stmt in SQLITE_INIT.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s)
                .execute(&self.pool)
                .await
                .map_err(db_err)?;
        }
        Ok(())
    }

    /// Authoritative record count, used by migration read-back
    /// verification.
    pub async fn count(&self) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(count as u64)
    }

    /// Id-ordered `id`/`username`/`role` listing for operator
    /// verification after a migration. Password hashes are deliberately
    /// not part of this view.
    pub async fn summaries(&self) -> Result<Vec<UserSummary>, StoreError> {
        let rows = sqlx::query("SELECT id, username, role FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.into_iter()
            .map(|row| {
                Ok(UserSummary {
                    id: row.try_get("id").map_err(db_err)?,
                    username: row.try_get("username").map_err(db_err)?,
                    role: row
                        .try_get::<Option<String>, _>("role")
                        .map_err(db_err)?
                        .unwrap_or_else(|| DEFAULT_ROLE.to_string()),
                })
            })
            .collect()
    }

    fn row_to_record(row: SqliteRow) -> Result<CredentialRecord, StoreError> {
        let username: String = row.try_get("username").map_err(db_err)?;
        let password_hash: String = row.try_get("password_hash").map_err(db_err)?;
        let role: Option<String> = row.try_get("role").map_err(db_err)?;
        let created_at: Option<NaiveDateTime> = row.try_get("created_at").map_err(db_err)?;

        Ok(CredentialRecord {
            username,
            password_hash,
            role: role.unwrap_or_else(|| DEFAULT_ROLE.to_string()),
            created_at: created_at.map(|t| DateTime::<Utc>::from_naive_utc_and_offset(t, Utc)),
        })
    }
}

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    async fn exists(&self, username: &str) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT 1 FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.is_some())
    }

    async fn insert(&self, credential: NewCredential) -> Result<CredentialRecord, StoreError> {
        let result = sqlx::query(
            "INSERT INTO users (username, password_hash, role) VALUES (?, ?, ?)",
        )
        .bind(&credential.username)
        .bind(&credential.password_hash)
        .bind(&credential.role)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {}
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                return Err(StoreError::DuplicateUsername(credential.username));
            }
            Err(e) => return Err(db_err(e)),
        }

        debug!(username = %credential.username, "credential row inserted");

        // Read back so the caller sees the database-assigned timestamp.
        self.find(&credential.username).await?.ok_or_else(|| {
            StoreError::Unavailable(format!(
                "row for '{}' vanished after insert",
                credential.username
            ))
        })
    }

    async fn find(&self, username: &str) -> Result<Option<CredentialRecord>, StoreError> {
        let row = sqlx::query(
            "SELECT username, password_hash, role, created_at FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(Self::row_to_record).transpose()
    }

    async fn list_all(&self) -> Result<Vec<CredentialRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT username, password_hash, role, created_at FROM users ORDER BY id DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(Self::row_to_record).collect()
    }
}

/// One row of the operator verification listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub role: String,
}

fn db_err(err: sqlx::Error) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

// ============================================================================
// Tests
// ============================================================================
