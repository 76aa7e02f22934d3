//! Registration & Login Service (IA-2, IA-5)
//!
//! Orchestrates input policy, hashing, and store access on top of any
//! [`CredentialStore`] backend.
//!
//! # Registration
//!
//! All input validation (username rules, password policy, confirmation
//! match) runs before anything is hashed or written; a rejected
//! registration leaves no partial state anywhere. Duplicate detection is
//! the store's job, not a pre-check here: the backend's atomic insert is
//! what closes the check-then-act race.
//!
//! # Login
//!
//! Lookup, then constant-time verification, then the stored role.
//! An unknown username and a wrong password both come back as
//! [`LoginError::InvalidCredentials`]: the two cases are deliberately
//! indistinguishable to the caller so login cannot be used to enumerate
//! usernames. The audit log keeps the distinction in its `reason` field.
//! A structurally corrupt stored hash is also reported as
//! `InvalidCredentials` (and logged as critical) rather than leaking
//! storage-corruption detail to an unauthenticated caller.

use std::fmt;

use crate::hashing::{CredentialHasher, HashError};
use crate::observability::SecurityEvent;
use crate::policy::{validate_username, PasswordPolicy, PasswordRule, UsernameRule};
use crate::security_event;
use crate::store::{CredentialStore, NewCredential, StoreError};

// ============================================================================
// Service
// ============================================================================

/// Registration and login over a credential store backend.
pub struct AuthService<S> {
    store: S,
    hasher: CredentialHasher,
    policy: PasswordPolicy,
}

impl<S: CredentialStore> AuthService<S> {
    /// Create a service with the default hasher and password policy.
    pub fn new(store: S) -> Self {
        Self {
            store,
            hasher: CredentialHasher::default(),
            policy: PasswordPolicy::default(),
        }
    }

    /// Replace the password hasher (e.g. tuned cost parameters).
    pub fn with_hasher(mut self, hasher: CredentialHasher) -> Self {
        self.hasher = hasher;
        self
    }

    /// Replace the password policy.
    pub fn with_policy(mut self, policy: PasswordPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Access the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Register a new operator account.
    ///
    /// Validation order: username rules, password policy (first failing
    /// rule reported), confirmation match. Only after all three pass is
    /// the password hashed and handed to the store.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<(), RegisterError> {
        if let Err(rule) = validate_username(username) {
            security_event!(
                SecurityEvent::RegistrationRejected,
                username = %username,
                reason = "invalid_username",
                "Registration rejected"
            );
            return Err(RegisterError::InvalidUsername(rule));
        }

        if let Err(rule) = self.policy.validate(password) {
            security_event!(
                SecurityEvent::RegistrationRejected,
                username = %username,
                reason = "weak_password",
                "Registration rejected"
            );
            return Err(RegisterError::WeakPassword(rule));
        }

        if password != confirm_password {
            security_event!(
                SecurityEvent::RegistrationRejected,
                username = %username,
                reason = "password_mismatch",
                "Registration rejected"
            );
            return Err(RegisterError::PasswordMismatch);
        }

        let password_hash = self.hasher.hash(password)?;

        match self
            .store
            .insert(NewCredential::new(username, password_hash))
            .await
        {
            Ok(_) => {
                security_event!(
                    SecurityEvent::UserRegistered,
                    username = %username,
                    "New operator registered"
                );
                Ok(())
            }
            Err(StoreError::DuplicateUsername(username)) => {
                security_event!(
                    SecurityEvent::RegistrationRejected,
                    username = %username,
                    reason = "duplicate_username",
                    "Registration rejected"
                );
                Err(RegisterError::DuplicateUsername(username))
            }
            Err(e) => {
                security_event!(
                    SecurityEvent::StoreUnavailable,
                    username = %username,
                    error = %e,
                    "Registration aborted by store failure"
                );
                Err(RegisterError::Store(e))
            }
        }
    }

    /// Authenticate an operator, returning the stored role on success.
    pub async fn login(&self, username: &str, password: &str) -> Result<String, LoginError> {
        let record = match self.store.find(username).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                security_event!(
                    SecurityEvent::AuthenticationFailure,
                    username = %username,
                    reason = "unknown_username",
                    "Login rejected"
                );
                return Err(LoginError::InvalidCredentials);
            }
            Err(e) => {
                security_event!(
                    SecurityEvent::StoreUnavailable,
                    username = %username,
                    error = %e,
                    "Login aborted by store failure"
                );
                return Err(LoginError::Store(e));
            }
        };

        match self.hasher.verify(password, &record.password_hash) {
            Ok(true) => {
                security_event!(
                    SecurityEvent::AuthenticationSuccess,
                    username = %username,
                    role = %record.role,
                    "Operator authenticated"
                );
                Ok(record.role)
            }
            Ok(false) => {
                security_event!(
                    SecurityEvent::AuthenticationFailure,
                    username = %username,
                    reason = "password_mismatch",
                    "Login rejected"
                );
                Err(LoginError::InvalidCredentials)
            }
            Err(e) => {
                // The stored token is broken. To the caller this is just
                // a failed login; operators find it in the audit log.
                security_event!(
                    SecurityEvent::CredentialCorrupt,
                    username = %username,
                    error = %e,
                    "Stored credential hash is unverifiable"
                );
                Err(LoginError::InvalidCredentials)
            }
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Registration failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterError {
    /// Username failed a validation rule
    InvalidUsername(UsernameRule),
    /// Password failed the policy; carries the first failing rule
    WeakPassword(PasswordRule),
    /// Password and confirmation differ
    PasswordMismatch,
    /// Username is already taken; recoverable, choose another
    DuplicateUsername(String),
    /// Password hashing failed
    Hashing(HashError),
    /// Store failure, fatal to this registration
    Store(StoreError),
}

impl fmt::Display for RegisterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUsername(rule) => write!(f, "{}", rule),
            Self::WeakPassword(rule) => write!(f, "{}", rule),
            Self::PasswordMismatch => write!(f, "Passwords do not match"),
            Self::DuplicateUsername(username) => {
                write!(f, "Username '{}' already exists", username)
            }
            Self::Hashing(err) => write!(f, "{}", err),
            Self::Store(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for RegisterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Hashing(err) => Some(err),
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<HashError> for RegisterError {
    fn from(err: HashError) -> Self {
        RegisterError::Hashing(err)
    }
}

/// Login failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginError {
    /// Unknown username or wrong password, intentionally not saying
    /// which
    InvalidCredentials,
    /// Store failure, fatal to this login
    Store(StoreError),
}

impl fmt::Display for LoginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCredentials => write!(f, "Invalid username or password"),
            Self::Store(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for LoginError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::HasherConfig;
    use crate::policy::{PasswordRule, UsernameRule};
    use crate::store::{SqliteCredentialStore, StoreError};
    use sqlx::sqlite::SqlitePoolOptions;

    async fn service() -> AuthService<SqliteCredentialStore> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SqliteCredentialStore::new(pool);
        store.init_schema().await.unwrap();

        AuthService::new(store)
            .with_hasher(CredentialHasher::new(HasherConfig::fast_insecure()).unwrap())
    }

    #[tokio::test]
    async fn test_register_then_login_returns_role() {
        let service = service().await;

        service
            .register("alice", "Password1", "Password1")
            .await
            .unwrap();

        let role = service.login("alice", "Password1").await.unwrap();
        assert_eq!(role, "user");
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_user_look_identical() {
        let service = service().await;
        service
            .register("alice", "Password1", "Password1")
            .await
            .unwrap();

        let wrong_password = service.login("alice", "wrong").await.unwrap_err();
        let unknown_user = service.login("mallory", "Password1").await.unwrap_err();

        assert_eq!(wrong_password, LoginError::InvalidCredentials);
        assert_eq!(unknown_user, LoginError::InvalidCredentials);
    }

    #[tokio::test]
    async fn test_duplicate_registration_keeps_original_hash() {
        let service = service().await;

        service
            .register("alice", "Password1", "Password1")
            .await
            .unwrap();
        let original = service.store().find("alice").await.unwrap().unwrap();

        let err = service
            .register("alice", "Different2", "Different2")
            .await
            .unwrap_err();
        assert_eq!(err, RegisterError::DuplicateUsername("alice".into()));

        let after = service.store().find("alice").await.unwrap().unwrap();
        assert_eq!(after.password_hash, original.password_hash);

        // The original password still works.
        assert_eq!(service.login("alice", "Password1").await.unwrap(), "user");
    }

    #[tokio::test]
    async fn test_validation_rejects_before_any_mutation() {
        let service = service().await;

        let err = service.register("ab", "Password1", "Password1").await;
        assert!(matches!(
            err,
            Err(RegisterError::InvalidUsername(UsernameRule::TooShort {
                min: 3,
                actual: 2
            }))
        ));

        let err = service.register("alice", "weak", "weak").await;
        assert!(matches!(
            err,
            Err(RegisterError::WeakPassword(PasswordRule::TooShort { .. }))
        ));

        let err = service.register("alice", "Password1", "Password2").await;
        assert!(matches!(err, Err(RegisterError::PasswordMismatch)));

        // None of the rejected attempts touched the store.
        assert!(!service.store().exists("ab").await.unwrap());
        assert!(!service.store().exists("alice").await.unwrap());
    }

    #[tokio::test]
    async fn test_corrupt_stored_hash_is_a_failed_login() {
        let service = service().await;

        // A record written behind the service's back with a broken token.
        service
            .store()
            .insert(crate::store::NewCredential::new("legacy", "not-a-phc-token"))
            .await
            .unwrap();

        let err = service.login("legacy", "Password1").await.unwrap_err();
        assert_eq!(err, LoginError::InvalidCredentials);
    }

    #[tokio::test]
    async fn test_custom_policy_is_enforced() {
        let service = service().await;
        let strict = AuthService::new(
            SqliteCredentialStore::new(service.store().pool().clone()),
        )
        .with_hasher(CredentialHasher::new(HasherConfig::fast_insecure()).unwrap())
        .with_policy(
            crate::policy::PasswordPolicy::builder()
                .min_length(12)
                .build(),
        );

        let err = strict.register("alice", "Password1", "Password1").await;
        assert!(matches!(
            err,
            Err(RegisterError::WeakPassword(PasswordRule::TooShort {
                min: 12,
                ..
            }))
        ));
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let service = service().await;
        service.store().pool().close().await;

        let err = service
            .register("alice", "Password1", "Password1")
            .await
            .unwrap_err();
        assert!(matches!(err, RegisterError::Store(StoreError::Unavailable(_))));

        let err = service.login("alice", "Password1").await.unwrap_err();
        assert!(matches!(err, LoginError::Store(StoreError::Unavailable(_))));
    }
}
