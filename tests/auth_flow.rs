//! End-to-end flows: register → login, duplicate handling under
//! concurrency, and legacy-file migration against a real database file.

use std::sync::Arc;

use palisade::migrate;
use palisade::prelude::*;
use sqlx::sqlite::SqlitePoolOptions;
use tempfile::tempdir;

async fn memory_store() -> SqliteCredentialStore {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    let store = SqliteCredentialStore::new(pool);
    store.init_schema().await.unwrap();
    store
}

fn fast_hasher() -> CredentialHasher {
    CredentialHasher::new(HasherConfig::fast_insecure()).unwrap()
}

#[tokio::test]
async fn register_login_round_trip_on_both_backends() {
    let dir = tempdir().unwrap();

    let sqlite_auth = AuthService::new(memory_store().await).with_hasher(fast_hasher());
    let file_auth = AuthService::new(FlatFileCredentialStore::new(dir.path().join("users.txt")))
        .with_hasher(fast_hasher());

    sqlite_auth
        .register("alice", "Password1", "Password1")
        .await
        .unwrap();
    assert_eq!(sqlite_auth.login("alice", "Password1").await.unwrap(), "user");
    assert_eq!(
        sqlite_auth.login("alice", "wrong").await.unwrap_err(),
        LoginError::InvalidCredentials
    );

    file_auth
        .register("alice", "Password1", "Password1")
        .await
        .unwrap();
    assert_eq!(file_auth.login("alice", "Password1").await.unwrap(), "user");
    assert_eq!(
        file_auth.login("alice", "wrong").await.unwrap_err(),
        LoginError::InvalidCredentials
    );
}

#[tokio::test]
async fn rejection_scenarios_match_policy() {
    let auth = AuthService::new(memory_store().await).with_hasher(fast_hasher());

    assert!(matches!(
        auth.register("ab", "Password1", "Password1").await,
        Err(RegisterError::InvalidUsername(_))
    ));
    assert!(matches!(
        auth.register("alice", "weak", "weak").await,
        Err(RegisterError::WeakPassword(_))
    ));
    assert!(matches!(
        auth.register("alice", "Password1", "Password2").await,
        Err(RegisterError::PasswordMismatch)
    ));

    // Nothing above may have touched the store.
    assert!(auth.store().list_all().await.unwrap().is_empty());

    auth.register("alice", "Password1", "Password1")
        .await
        .unwrap();
    assert!(matches!(
        auth.register("alice", "Password1", "Password1").await,
        Err(RegisterError::DuplicateUsername(_))
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_registration_has_exactly_one_winner() {
    // A file-backed database shared by a multi-connection pool, so both
    // registrations genuinely race at the storage layer.
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("platform.db");
    let config = StoreConfig::builder(format!("sqlite://{}", db_path.display()))
        .max_connections(4)
        .build();
    let pool = create_pool(&config).await.unwrap();
    let store = SqliteCredentialStore::new(pool);
    store.init_schema().await.unwrap();

    let auth = Arc::new(AuthService::new(store).with_hasher(fast_hasher()));

    let mut handles = Vec::new();
    for _ in 0..2 {
        let auth = Arc::clone(&auth);
        handles.push(tokio::spawn(async move {
            auth.register("alice", "Password1", "Password1").await
        }));
    }

    let mut successes = 0;
    let mut duplicates = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => successes += 1,
            Err(RegisterError::DuplicateUsername(_)) => duplicates += 1,
            Err(e) => panic!("unexpected registration error: {}", e),
        }
    }
    assert_eq!(successes, 1);
    assert_eq!(duplicates, 1);

    // One record, and it still authenticates.
    assert_eq!(auth.store().list_all().await.unwrap().len(), 1);
    assert_eq!(auth.login("alice", "Password1").await.unwrap(), "user");
}

#[tokio::test]
async fn migrated_operators_keep_their_passwords() {
    let dir = tempdir().unwrap();
    let hasher = fast_hasher();

    // Operators registered through the legacy file-backed flow.
    let legacy = FlatFileCredentialStore::new(dir.path().join("users.txt"));
    let legacy_auth = AuthService::new(legacy).with_hasher(hasher.clone());
    legacy_auth
        .register("alice", "Password1", "Password1")
        .await
        .unwrap();
    legacy_auth
        .register("bob", "Hunter2hunter", "Hunter2hunter")
        .await
        .unwrap();

    // Migrate into the relational store.
    let dest = memory_store().await;
    let source = FlatFileCredentialStore::new(dir.path().join("users.txt"));
    let report = migrate::migrate(&source, &dest).await.unwrap();
    assert_eq!(report.migrated, 2);
    assert_eq!(report.verified_total, 2);

    // Same passwords authenticate against the new backend: hashes were
    // carried over verbatim, never re-hashed.
    let db_auth = AuthService::new(dest).with_hasher(hasher);
    assert_eq!(db_auth.login("alice", "Password1").await.unwrap(), "user");
    assert_eq!(
        db_auth.login("bob", "Hunter2hunter").await.unwrap(),
        "user"
    );

    // Re-running the migration changes nothing.
    let again = migrate::migrate(&source, db_auth.store()).await.unwrap();
    assert_eq!(again.migrated, 0);
    assert_eq!(again.skipped_duplicates, 2);

    let roster = migrate::format_roster(&migrate::verify_users(db_auth.store()).await.unwrap());
    assert!(roster.contains("alice"));
    assert!(roster.contains("bob"));
    assert!(roster.contains("Total users: 2"));
}
