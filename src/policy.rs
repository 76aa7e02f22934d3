//! Credential Input Policy (IA-5, SI-10)
//!
//! Validation rules applied to usernames and candidate passwords before
//! any hashing or store access happens. Validation failures carry the
//! first rule that failed so callers can show an actionable message.
//!
//! # Usage
//!
//! ```ignore
//! use palisade::policy::{validate_username, PasswordPolicy};
//!
//! validate_username("alice")?;
//!
//! let policy = PasswordPolicy::default();
//! policy.validate("Password1")?;
//! ```

use std::fmt;

/// Minimum username length accepted at registration.
pub const MIN_USERNAME_LEN: usize = 3;

// ============================================================================
// Username Validation
// ============================================================================

/// Validate a username: non-empty and at least [`MIN_USERNAME_LEN`]
/// characters. Usernames are compared case-sensitively everywhere, so no
/// normalization happens here.
pub fn validate_username(username: &str) -> Result<(), UsernameRule> {
    if username.is_empty() {
        return Err(UsernameRule::Empty);
    }
    if username.len() < MIN_USERNAME_LEN {
        return Err(UsernameRule::TooShort {
            min: MIN_USERNAME_LEN,
            actual: username.len(),
        });
    }
    Ok(())
}

/// The username rule that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsernameRule {
    /// Username is empty
    Empty,
    /// Username is shorter than the minimum
    TooShort { min: usize, actual: usize },
}

impl fmt::Display for UsernameRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Username cannot be empty"),
            Self::TooShort { min, actual } => write!(
                f,
                "Username must be at least {} characters (got {})",
                min, actual
            ),
        }
    }
}

impl std::error::Error for UsernameRule {}

// ============================================================================
// Password Policy
// ============================================================================

/// Password composition policy.
///
/// The default requires at least 8 characters with one uppercase letter,
/// one lowercase letter, and one digit. Rules are checked in a fixed
/// order and the first failure is reported.
#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    /// Minimum password length
    pub min_length: usize,
    /// Require at least one ASCII uppercase letter
    pub require_uppercase: bool,
    /// Require at least one ASCII lowercase letter
    pub require_lowercase: bool,
    /// Require at least one ASCII digit
    pub require_digit: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            require_uppercase: true,
            require_lowercase: true,
            require_digit: true,
        }
    }
}

impl PasswordPolicy {
    /// Create a new builder for custom policy configuration.
    pub fn builder() -> PasswordPolicyBuilder {
        PasswordPolicyBuilder::default()
    }

    /// Validate a candidate password, reporting the first failing rule.
    pub fn validate(&self, password: &str) -> Result<(), PasswordRule> {
        if password.len() < self.min_length {
            return Err(PasswordRule::TooShort {
                min: self.min_length,
                actual: password.len(),
            });
        }
        if self.require_uppercase && !password.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(PasswordRule::MissingUppercase);
        }
        if self.require_lowercase && !password.chars().any(|c| c.is_ascii_lowercase()) {
            return Err(PasswordRule::MissingLowercase);
        }
        if self.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
            return Err(PasswordRule::MissingDigit);
        }
        Ok(())
    }
}

/// Builder for [`PasswordPolicy`].
#[derive(Debug, Clone, Default)]
pub struct PasswordPolicyBuilder {
    policy: PasswordPolicy,
}

impl PasswordPolicyBuilder {
    /// Set minimum password length
    pub fn min_length(mut self, len: usize) -> Self {
        self.policy.min_length = len;
        self
    }

    /// Enable/disable the uppercase-letter requirement
    pub fn require_uppercase(mut self, require: bool) -> Self {
        self.policy.require_uppercase = require;
        self
    }

    /// Enable/disable the lowercase-letter requirement
    pub fn require_lowercase(mut self, require: bool) -> Self {
        self.policy.require_lowercase = require;
        self
    }

    /// Enable/disable the digit requirement
    pub fn require_digit(mut self, require: bool) -> Self {
        self.policy.require_digit = require;
        self
    }

    /// Build the policy
    pub fn build(self) -> PasswordPolicy {
        self.policy
    }
}

/// The password rule that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordRule {
    /// Password is shorter than the minimum
    TooShort { min: usize, actual: usize },
    /// Password has no uppercase letter
    MissingUppercase,
    /// Password has no lowercase letter
    MissingLowercase,
    /// Password has no digit
    MissingDigit,
}

impl fmt::Display for PasswordRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort { min, actual } => write!(
                f,
                "Password must be at least {} characters (got {})",
                min, actual
            ),
            Self::MissingUppercase => write!(f, "Password must contain an uppercase letter"),
            Self::MissingLowercase => write!(f, "Password must contain a lowercase letter"),
            Self::MissingDigit => write!(f, "Password must contain a digit"),
        }
    }
}

impl std::error::Error for PasswordRule {}

// ============================================================================
// Tests
// ============================================================================
