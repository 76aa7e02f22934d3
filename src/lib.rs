//! # Palisade
//!
//! Credential authentication and legacy-store migration for
//! intelligence-platform operator accounts.
//!
//! This crate is the account subsystem of a small intelligence-platform
//! tool: it registers usernames with salted Argon2id password hashes,
//! verifies credentials at login, and migrates the legacy
//! `username,password_hash` flat file into the relational `users` table
//! without creating duplicates. It is a library invoked in-process;
//! there is no network surface here.
//!
//! ## Components
//!
//! - **Hashing** (IA-5): [`hashing::CredentialHasher`], salted one-way
//!   hashing with tunable cost, constant-time verification
//! - **Policy** (IA-5, SI-10): [`policy`], username rules and a
//!   configurable password policy
//! - **Stores**: [`store::CredentialStore`] implemented by the legacy
//!   flat file and the SQLite `users` table; duplicate prevention lives
//!   at the storage layer in both
//! - **Service** (IA-2): [`service::AuthService`], registration and
//!   login over either backend
//! - **Migration**: [`migrate`], idempotent flat-file reconciliation
//!   with read-back verification
//! - **Observability** (AU-2, AU-3): structured security events via
//!   [`security_event!`]
//!
//! ## Quick Start
//!
//! ```ignore
//! use palisade::prelude::*;
//!
//! // Pool and schema
//! let config = StoreConfig::from_env();
//! let pool = create_pool(&config).await?;
//! let store = SqliteCredentialStore::new(pool);
//! store.init_schema().await?;
//!
//! // One-time legacy migration
//! if let Some(path) = &config.legacy_users_file {
//!     let legacy = FlatFileCredentialStore::new(path);
//!     let report = palisade::migrate::migrate(&legacy, &store).await?;
//!     info!(%report, "legacy credentials reconciled");
//! }
//!
//! // Day-to-day auth
//! let auth = AuthService::new(store);
//! auth.register("alice", "Password1", "Password1").await?;
//! let role = auth.login("alice", "Password1").await?;
//! ```

pub mod config;
pub mod hashing;
pub mod migrate;
pub mod observability;
pub mod policy;
pub mod prelude;
pub mod service;
pub mod store;

// Re-exports
pub use config::{create_pool, health_check, StoreConfig, StoreConfigBuilder};
pub use hashing::{CredentialHasher, HashError, HasherConfig};
pub use migrate::MigrationReport;
pub use policy::{PasswordPolicy, PasswordPolicyBuilder};
pub use service::{AuthService, LoginError, RegisterError};
pub use store::{
    CredentialRecord, CredentialStore, FlatFileCredentialStore, NewCredential,
    SqliteCredentialStore, StoreError,
};
