//! Credential Store Contract
//!
//! One capability interface over two interchangeable backends: the legacy
//! append-only flat file ([`FlatFileCredentialStore`]) and the relational
//! `users` table ([`SqliteCredentialStore`]). Registration, login, and
//! migration code depend only on [`CredentialStore`].
//!
//! # Uniqueness Contract
//!
//! `insert` guarantees that no two inserts for the same username both
//! succeed, even under concurrent callers. Each backend enforces this at
//! the storage layer (a UNIQUE constraint for SQLite, a single-writer
//! critical section for the flat file), never solely by a caller-side
//! `exists` check.

mod flat_file;
mod schema;
mod sqlite;

pub use flat_file::{FileScan, FlatFileCredentialStore};
pub use schema::SQLITE_INIT;
pub use sqlite::{SqliteCredentialStore, SqlitePool, UserSummary};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role assigned when a caller does not specify one.
pub const DEFAULT_ROLE: &str = "user";

// ============================================================================
// Records
// ============================================================================

/// A stored credential: username, opaque password hash, role, creation
/// time. The hash is a self-contained PHC token; plaintext passwords
/// never reach a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    /// Unique, case-sensitive username
    pub username: String,
    /// PHC-format password hash token
    pub password_hash: String,
    /// Single role string, defaults to `"user"`
    pub role: String,
    /// Set by the relational backend at insertion and never mutated.
    /// `None` for legacy flat-file records, whose line format carries no
    /// timestamp.
    pub created_at: Option<DateTime<Utc>>,
}

/// Insertion payload for [`CredentialStore::insert`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCredential {
    pub username: String,
    pub password_hash: String,
    pub role: String,
}

impl NewCredential {
    /// New credential with the default role.
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password_hash: password_hash.into(),
            role: DEFAULT_ROLE.to_string(),
        }
    }

    /// Override the role.
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = role.into();
        self
    }
}

// ============================================================================
// Store Contract
// ============================================================================

/// Capability interface implemented by every credential backend.
///
/// Ordering note for [`list_all`](CredentialStore::list_all): the flat
/// file yields insertion order, the relational backend reverse-id order.
/// Callers must not depend on cross-backend ordering equivalence.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Whether a record for `username` exists.
    async fn exists(&self, username: &str) -> Result<bool, StoreError>;

    /// Insert a new credential, returning the stored record.
    ///
    /// Fails with [`StoreError::DuplicateUsername`] if the username is
    /// already present; at most one concurrent insert for a given
    /// username can succeed.
    async fn insert(&self, credential: NewCredential) -> Result<CredentialRecord, StoreError>;

    /// Look up a record by exact username.
    async fn find(&self, username: &str) -> Result<Option<CredentialRecord>, StoreError>;

    /// All records, in the backend's native order.
    async fn list_all(&self) -> Result<Vec<CredentialRecord>, StoreError>;
}

// ============================================================================
// Errors
// ============================================================================

/// Credential store failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A record for this username already exists. Recoverable: callers
    /// report it, they do not retry.
    DuplicateUsername(String),
    /// A record cannot be represented in (or parsed from) the backend's
    /// storage format.
    MalformedRecord(String),
    /// The backing file or database is unreachable or failed mid
    /// operation. Fatal to the calling operation; never retried here.
    Unavailable(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateUsername(username) => {
                write!(f, "username '{}' already exists", username)
            }
            Self::MalformedRecord(msg) => write!(f, "malformed credential record: {}", msg),
            Self::Unavailable(msg) => write!(f, "credential store unavailable: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}
