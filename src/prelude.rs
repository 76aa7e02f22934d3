//! Palisade Prelude - Common imports for embedding applications
//!
//! Re-exports the types an application touches when wiring up
//! registration, login, and legacy migration, so one import covers the
//! usual surface.
//!
//! # Usage
//!
//! ```ignore
//! use palisade::prelude::*;
//!
//! let pool = create_pool(&StoreConfig::from_env()).await?;
//! let store = SqliteCredentialStore::new(pool);
//! store.init_schema().await?;
//!
//! let auth = AuthService::new(store);
//! auth.register("alice", "Password1", "Password1").await?;
//! ```

// =============================================================================
// Store Configuration
// =============================================================================

pub use crate::config::{create_pool, health_check, HealthStatus, StoreConfig, StoreConfigBuilder};

// =============================================================================
// Credential Stores
// =============================================================================

pub use crate::store::{
    CredentialRecord, CredentialStore, FlatFileCredentialStore, NewCredential,
    SqliteCredentialStore, StoreError, DEFAULT_ROLE,
};

// =============================================================================
// Hashing & Policy (IA-5)
// =============================================================================

pub use crate::hashing::{CredentialHasher, HashError, HasherConfig};
pub use crate::policy::{validate_username, PasswordPolicy, PasswordRule, UsernameRule};

// =============================================================================
// Registration & Login (IA-2)
// =============================================================================

pub use crate::service::{AuthService, LoginError, RegisterError};

// =============================================================================
// Migration
// =============================================================================

pub use crate::migrate::{migrate, verify_users, MigrationReport};

// =============================================================================
// Observability (AU-2, AU-3)
// =============================================================================

pub use crate::observability::{
    init_tracing, ObservabilityConfig, SecurityEvent, Severity,
};

// Re-export the tracing macros applications use alongside security events
pub use tracing::{debug, error, info, instrument, trace, warn};
