//! Password Hashing Service (IA-5(1))
//!
//! Salted one-way password hashing with Argon2id and constant-time
//! verification.
//!
//! # Design
//!
//! - [`CredentialHasher::hash`] generates a fresh random salt per call and
//!   returns a self-contained PHC-format token (e.g.
//!   `$argon2id$v=19$m=19456,t=2,p=1$...`) encoding the algorithm,
//!   version, cost parameters, salt, and digest. The token is what gets
//!   stored in the credential store, never the plaintext.
//! - [`CredentialHasher::verify`] re-derives the digest from the salt and
//!   parameters embedded in the token and compares digests in constant
//!   time. A wrong password is `Ok(false)`, never an error; only a
//!   structurally broken token is an error ([`HashError::CorruptHash`]).
//!
//! # Work Factor
//!
//! The memory/iteration/parallelism parameters are tunable via
//! [`HasherConfig`]. The defaults are the `argon2` crate's recommended
//! parameters, which keep an interactive login comfortably sub-second on
//! commodity hardware.
//!
//! # Usage
//!
//! ```ignore
//! use palisade::hashing::CredentialHasher;
//!
//! let hasher = CredentialHasher::default();
//! let token = hasher.hash("S3curePassword")?;
//! assert!(hasher.verify("S3curePassword", &token)?);
//! assert!(!hasher.verify("wrong", &token)?);
//! ```

use argon2::password_hash::{PasswordHash, PasswordHasher, SaltString};
use argon2::{Argon2, Params};
use rand::rngs::OsRng;
use std::fmt;
use subtle::ConstantTimeEq;

// ============================================================================
// Constant-Time Comparison
// ============================================================================

/// Performs constant-time comparison of two byte slices.
///
/// Standard `==` on byte slices short-circuits at the first mismatching
/// byte, which leaks where the inputs diverge through response timing.
/// Digest comparisons during verification must go through this helper.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

// ============================================================================
// Hasher Configuration
// ============================================================================

/// Argon2id cost parameters for [`CredentialHasher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HasherConfig {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of iterations (time cost)
    pub iterations: u32,
    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for HasherConfig {
    /// Default parameters per the `argon2` crate (OWASP-recommended),
    /// sized for interactive login latency.
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

impl HasherConfig {
    /// Reduced-cost parameters for test suites.
    ///
    /// Never use these for real credentials.
    pub fn fast_insecure() -> Self {
        Self {
            memory_kib: Params::MIN_M_COST,
            iterations: 1,
            parallelism: 1,
        }
    }
}

// ============================================================================
// Credential Hasher
// ============================================================================

/// Salted password hashing and verification service.
///
/// Stateless apart from its cost parameters; `hash` draws salt randomness
/// from the operating system.
#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }
}

impl CredentialHasher {
    /// Create a hasher with explicit cost parameters.
    ///
    /// Fails only if the parameters are outside the ranges the algorithm
    /// accepts (e.g. zero iterations).
    pub fn new(config: HasherConfig) -> Result<Self, HashError> {
        let params = Params::new(
            config.memory_kib,
            config.iterations,
            config.parallelism,
            None,
        )
        .map_err(|e| HashError::Hashing(format!("invalid cost parameters: {}", e)))?;

        Ok(Self {
            argon2: Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params),
        })
    }

    /// Hash a plaintext password into a self-contained PHC-format token.
    ///
    /// Generates a fresh random salt per call, so hashing the same
    /// password twice yields different tokens. Never fails for any valid
    /// input string.
    pub fn hash(&self, plaintext: &str) -> Result<String, HashError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| HashError::Hashing(e.to_string()))?;
        Ok(hash.to_string())
    }

    /// Verify a plaintext password against a stored PHC-format token.
    ///
    /// Re-derives the digest using the salt and cost parameters embedded
    /// in the token (not this hasher's own parameters, so tokens written
    /// under older cost settings keep verifying) and compares digests in
    /// constant time.
    ///
    /// Returns `Ok(false)` on any mismatch. Returns
    /// [`HashError::CorruptHash`] only when the token itself is
    /// structurally invalid; callers on authentication paths must treat
    /// that as a failed verification, not as a crash.
    pub fn verify(&self, plaintext: &str, token: &str) -> Result<bool, HashError> {
        let parsed = PasswordHash::new(token)
            .map_err(|e| HashError::CorruptHash(format!("unparseable token: {}", e)))?;

        let expected = parsed
            .hash
            .ok_or_else(|| HashError::CorruptHash("token is missing its digest".into()))?;
        let salt = parsed
            .salt
            .ok_or_else(|| HashError::CorruptHash("token is missing its salt".into()))?;
        let params = Params::try_from(&parsed)
            .map_err(|e| HashError::CorruptHash(format!("bad token parameters: {}", e)))?;

        // Re-derive with the token's own algorithm/version/params/salt.
        let derived = self
            .argon2
            .hash_password_customized(
                plaintext.as_bytes(),
                Some(parsed.algorithm),
                parsed.version,
                params,
                salt,
            )
            .map_err(|e| HashError::CorruptHash(format!("digest derivation failed: {}", e)))?;

        let derived_digest = derived
            .hash
            .ok_or_else(|| HashError::Hashing("derivation produced no digest".into()))?;

        Ok(constant_time_eq(
            derived_digest.as_bytes(),
            expected.as_bytes(),
        ))
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Hashing service errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashError {
    /// The hashing primitive itself failed (bad parameters, salt
    /// plumbing). Does not occur for any valid input string under valid
    /// parameters.
    Hashing(String),
    /// A stored token is structurally invalid and cannot be verified.
    /// Authentication callers treat this as verification failure.
    CorruptHash(String),
}

impl fmt::Display for HashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hashing(msg) => write!(f, "password hashing failed: {}", msg),
            Self::CorruptHash(msg) => write!(f, "corrupt credential hash: {}", msg),
        }
    }
}

impl std::error::Error for HashError {}

// ============================================================================
// Tests
// ============================================================================
