//! Legacy Credential Migration
//!
//! Reconciles the legacy `username,password_hash` file with the
//! relational `users` table. Hashes are carried over verbatim: the
//! plaintext passwords are long gone, and re-hashing a hash would
//! silently lock every migrated operator out.
//!
//! # Idempotence
//!
//! Each record is offered to the destination as a plain constrained
//! insert; the UNIQUE constraint decides. Running the migration twice
//! over the same file migrates everything once and counts everything as
//! a duplicate the second time. Records that already exist keep their
//! original hash untouched.
//!
//! # Fault Tolerance
//!
//! A malformed source line (no hash field) is counted and skipped; it
//! never aborts the run. An unreachable destination does abort; that
//! error propagates unmodified.
//!
//! # Usage
//!
//! ```ignore
//! use palisade::migrate;
//!
//! let report = migrate::migrate(&legacy, &db).await?;
//! println!("{}", report);
//! println!("{}", migrate::format_roster(&migrate::verify_users(&db).await?));
//! ```

use serde::Serialize;
use std::fmt;

use crate::observability::SecurityEvent;
use crate::security_event;
use crate::store::{
    CredentialStore, FlatFileCredentialStore, NewCredential, SqliteCredentialStore, StoreError,
    UserSummary,
};

// ============================================================================
// Migration Report
// ============================================================================

/// Outcome of one migration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    /// Parseable source records offered to the destination
    pub attempted: usize,
    /// Records newly inserted by this run
    pub migrated: usize,
    /// Records already present in the destination
    pub skipped_duplicates: usize,
    /// Source lines that did not parse
    pub malformed_lines: usize,
    /// Destination record count after the run, from read-back
    /// verification
    pub verified_total: u64,
}

impl fmt::Display for MigrationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "migrated {} of {} record(s) ({} duplicate(s) skipped, {} malformed line(s)); \
             destination now holds {} user(s)",
            self.migrated,
            self.attempted,
            self.skipped_duplicates,
            self.malformed_lines,
            self.verified_total
        )
    }
}

// ============================================================================
// Migration
// ============================================================================

/// Migrate every parseable record from the legacy file into the
/// relational store, then verify by reading the destination back.
pub async fn migrate(
    source: &FlatFileCredentialStore,
    dest: &SqliteCredentialStore,
) -> Result<MigrationReport, StoreError> {
    security_event!(
        SecurityEvent::MigrationStarted,
        source = %source.path().display(),
        "Credential migration started"
    );

    let scan = source.scan().await?;
    let attempted = scan.records.len();
    let malformed_lines = scan.malformed_lines;

    let mut migrated = 0usize;
    let mut skipped_duplicates = 0usize;

    for record in scan.records {
        let credential = NewCredential::new(record.username.clone(), record.password_hash)
            .with_role(record.role);

        match dest.insert(credential).await {
            Ok(_) => migrated += 1,
            Err(StoreError::DuplicateUsername(username)) => {
                skipped_duplicates += 1;
                security_event!(
                    SecurityEvent::MigrationRecordSkipped,
                    username = %username,
                    reason = "duplicate_username",
                    "Record already present in destination"
                );
            }
            // Anything else is fatal: a half-reachable destination must
            // abort the run, not thin it out silently.
            Err(e) => return Err(e),
        }
    }

    let verified_total = dest.count().await?;

    let report = MigrationReport {
        attempted,
        migrated,
        skipped_duplicates,
        malformed_lines,
        verified_total,
    };

    security_event!(
        SecurityEvent::MigrationCompleted,
        attempted = report.attempted,
        migrated = report.migrated,
        skipped_duplicates = report.skipped_duplicates,
        malformed_lines = report.malformed_lines,
        verified_total = report.verified_total,
        "Credential migration finished"
    );

    Ok(report)
}

/// Read back the destination's authoritative user listing, in id order.
pub async fn verify_users(
    dest: &SqliteCredentialStore,
) -> Result<Vec<UserSummary>, StoreError> {
    dest.summaries().await
}

/// Render a verification listing the way operators expect to read it.
pub fn format_roster(users: &[UserSummary]) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:<5} {:<15} {:<10}\n", "ID", "Username", "Role"));
    out.push_str(&format!("{}\n", "-".repeat(35)));
    for user in users {
        out.push_str(&format!(
            "{:<5} {:<15} {:<10}\n",
            user.id, user.username, user.role
        ));
    }
    out.push_str(&format!("\nTotal users: {}", users.len()));
    out
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;
    use tempfile::tempdir;

    async fn sqlite_store() -> SqliteCredentialStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SqliteCredentialStore::new(pool);
        store.init_schema().await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_migration_moves_missing_records_only() {
        let dir = tempdir().unwrap();
        let source = FlatFileCredentialStore::new(dir.path().join("users.txt"));
        std::fs::write(
            source.path(),
            "alice,$argon2id$v=19$hash-a\nbob,$argon2id$v=19$hash-b\n",
        )
        .unwrap();

        let dest = sqlite_store().await;
        // alice is already in the destination, under a different hash.
        dest.insert(NewCredential::new("alice", "$argon2id$v=19$hash-original"))
            .await
            .unwrap();

        let report = migrate(&source, &dest).await.unwrap();
        assert_eq!(report.attempted, 2);
        assert_eq!(report.migrated, 1);
        assert_eq!(report.skipped_duplicates, 1);
        assert_eq!(report.malformed_lines, 0);
        assert_eq!(report.verified_total, 2);

        // The pre-existing record kept its original hash.
        let alice = dest.find("alice").await.unwrap().unwrap();
        assert_eq!(alice.password_hash, "$argon2id$v=19$hash-original");

        // The migrated record carried its hash over verbatim.
        let bob = dest.find("bob").await.unwrap().unwrap();
        assert_eq!(bob.password_hash, "$argon2id$v=19$hash-b");
        assert_eq!(bob.role, "user");
    }

    #[tokio::test]
    async fn test_migration_is_idempotent() {
        let dir = tempdir().unwrap();
        let source = FlatFileCredentialStore::new(dir.path().join("users.txt"));
        std::fs::write(
            source.path(),
            "alice,$argon2id$v=19$hash-a\nbob,$argon2id$v=19$hash-b\ncarol,$argon2id$v=19$hash-c\n",
        )
        .unwrap();

        let dest = sqlite_store().await;

        let first = migrate(&source, &dest).await.unwrap();
        assert_eq!(first.migrated, 3);
        assert_eq!(first.skipped_duplicates, 0);
        assert_eq!(first.verified_total, 3);

        let second = migrate(&source, &dest).await.unwrap();
        assert_eq!(second.migrated, 0);
        assert_eq!(second.skipped_duplicates, 3);
        assert_eq!(second.verified_total, 3);
    }

    #[tokio::test]
    async fn test_malformed_lines_are_counted_and_skipped() {
        let dir = tempdir().unwrap();
        let source = FlatFileCredentialStore::new(dir.path().join("users.txt"));
        std::fs::write(
            source.path(),
            "alice,$argon2id$v=19$hash-a\nbroken-line-without-hash\nbob,$argon2id$v=19$hash-b\n",
        )
        .unwrap();

        let dest = sqlite_store().await;
        let report = migrate(&source, &dest).await.unwrap();

        assert_eq!(report.attempted, 2);
        assert_eq!(report.migrated, 2);
        assert_eq!(report.malformed_lines, 1);
        assert_eq!(report.verified_total, 2);
    }

    #[tokio::test]
    async fn test_empty_or_missing_source_is_a_clean_no_op() {
        let dir = tempdir().unwrap();
        let source = FlatFileCredentialStore::new(dir.path().join("does-not-exist.txt"));
        let dest = sqlite_store().await;

        let report = migrate(&source, &dest).await.unwrap();
        assert_eq!(report.attempted, 0);
        assert_eq!(report.migrated, 0);
        assert_eq!(report.verified_total, 0);
    }

    #[tokio::test]
    async fn test_unreachable_destination_aborts() {
        let dir = tempdir().unwrap();
        let source = FlatFileCredentialStore::new(dir.path().join("users.txt"));
        std::fs::write(source.path(), "alice,$argon2id$v=19$hash-a\n").unwrap();

        let dest = sqlite_store().await;
        dest.pool().close().await;

        let err = migrate(&source, &dest).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_roster_formatting() {
        let dir = tempdir().unwrap();
        let source = FlatFileCredentialStore::new(dir.path().join("users.txt"));
        std::fs::write(source.path(), "alice,$argon2id$v=19$hash-a\n").unwrap();

        let dest = sqlite_store().await;
        migrate(&source, &dest).await.unwrap();

        let users = verify_users(&dest).await.unwrap();
        let roster = format_roster(&users);

        assert!(roster.contains("Username"));
        assert!(roster.contains("alice"));
        assert!(roster.ends_with("Total users: 1"));
        // Hashes never appear in the operator listing.
        assert!(!roster.contains("argon2id"));
    }

    #[test]
    fn test_report_display() {
        let report = MigrationReport {
            attempted: 3,
            migrated: 2,
            skipped_duplicates: 1,
            malformed_lines: 1,
            verified_total: 5,
        };
        let line = report.to_string();
        assert!(line.contains("migrated 2 of 3"));
        assert!(line.contains("1 duplicate(s)"));
        assert!(line.contains("5 user(s)"));
    }
}
