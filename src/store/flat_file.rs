//! Flat-File Credential Backend (legacy)
//!
//! The original operator list: UTF-8 text, one `username,password_hash`
//! record per line, append-only. After migration to the relational
//! backend this store is read-only legacy data, but it implements the
//! full [`CredentialStore`] contract so the service layer can run
//! against either backend.
//!
//! # Uniqueness Without a Constraint
//!
//! The file format has no native uniqueness primitive, so `insert`
//! serializes its check-then-append through a per-instance mutex. Two
//! concurrent registrations for the same username therefore cannot both
//! pass the existence check before either writes.
//!
//! # Format Notes
//!
//! The line format cannot represent a comma or line break inside a
//! field, and carries no role or timestamp. Writes reject unencodable
//! fields up front; reads report records with the default role and no
//! creation time. Lines that do not parse are counted, logged, and
//! skipped; one bad line never poisons the rest of the file.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

use crate::store::{CredentialRecord, CredentialStore, NewCredential, StoreError, DEFAULT_ROLE};

/// Credential store backed by an append-only `username,password_hash`
/// file.
#[derive(Debug)]
pub struct FlatFileCredentialStore {
    path: PathBuf,
    // Single-writer discipline: held across the exists-check and the
    // append so the two act as one atomic unit per store instance.
    write_lock: Mutex<()>,
}

/// Result of a full file scan: parsed records in insertion order plus
/// the number of lines that did not parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileScan {
    pub records: Vec<CredentialRecord>,
    pub malformed_lines: usize,
}

impl FlatFileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse the whole file. A missing file reads as empty; the legacy
    /// tool created it lazily, so absence just means no one registered
    /// yet.
    pub async fn scan(&self) -> Result<FileScan, StoreError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(FileScan {
                    records: Vec::new(),
                    malformed_lines: 0,
                })
            }
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        let mut malformed_lines = 0;

        for (idx, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match line.split_once(',') {
                Some((username, hash)) if !username.is_empty() && !hash.is_empty() => {
                    records.push(CredentialRecord {
                        username: username.to_string(),
                        password_hash: hash.to_string(),
                        role: DEFAULT_ROLE.to_string(),
                        created_at: None,
                    });
                }
                _ => {
                    warn!(
                        path = %self.path.display(),
                        line = idx + 1,
                        "skipping malformed credential line"
                    );
                    malformed_lines += 1;
                }
            }
        }

        Ok(FileScan {
            records,
            malformed_lines,
        })
    }

    /// Reject fields the `username,password_hash` line format cannot
    /// represent. Most hash encodings avoid commas, but that is an
    /// assumption about the encoder, not a guarantee, so it is checked
    /// here, at write time.
    fn validate_encodable(credential: &NewCredential) -> Result<(), StoreError> {
        if credential.username.is_empty() || credential.password_hash.is_empty() {
            return Err(StoreError::MalformedRecord(
                "username and password hash must be non-empty".into(),
            ));
        }
        for (field, value) in [
            ("username", &credential.username),
            ("password hash", &credential.password_hash),
        ] {
            if value.contains(',') {
                return Err(StoreError::MalformedRecord(format!(
                    "{} contains a comma, which the line format cannot represent",
                    field
                )));
            }
            if value.contains('\n') || value.contains('\r') {
                return Err(StoreError::MalformedRecord(format!(
                    "{} contains a line break",
                    field
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for FlatFileCredentialStore {
    async fn exists(&self, username: &str) -> Result<bool, StoreError> {
        Ok(self
            .scan()
            .await?
            .records
            .iter()
            .any(|r| r.username == username))
    }

    async fn insert(&self, credential: NewCredential) -> Result<CredentialRecord, StoreError> {
        Self::validate_encodable(&credential)?;

        let _guard = self.write_lock.lock().await;

        // Re-check under the lock; an unlocked pre-check could race.
        if self
            .scan()
            .await?
            .records
            .iter()
            .any(|r| r.username == credential.username)
        {
            return Err(StoreError::DuplicateUsername(credential.username));
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(
            format!("{},{}\n", credential.username, credential.password_hash).as_bytes(),
        )
        .await?;
        file.flush().await?;

        Ok(CredentialRecord {
            username: credential.username,
            password_hash: credential.password_hash,
            role: credential.role,
            created_at: None,
        })
    }

    async fn find(&self, username: &str) -> Result<Option<CredentialRecord>, StoreError> {
        Ok(self
            .scan()
            .await?
            .records
            .into_iter()
            .find(|r| r.username == username))
    }

    async fn list_all(&self) -> Result<Vec<CredentialRecord>, StoreError> {
        let scan = self.scan().await?;
        if scan.malformed_lines > 0 {
            warn!(
                path = %self.path.display(),
                malformed_lines = scan.malformed_lines,
                "credential file contains unparseable lines"
            );
        }
        Ok(scan.records)
    }
}

// ============================================================================
// Tests
// ============================================================================
