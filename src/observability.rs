//! Security Event Logging (AU-2, AU-3)
//!
//! Structured logging for the security-relevant events this crate
//! emits: authentication outcomes, registrations, credential-corruption
//! detections, and migration runs. Events go through `tracing` with a
//! consistent field set so a log aggregator can filter on
//! `security_event`, `category`, and `severity`.
//!
//! Password hashes and plaintext passwords are never valid event fields.
//!
//! # Usage
//!
//! ```ignore
//! use palisade::observability::SecurityEvent;
//! use palisade::security_event;
//!
//! security_event!(
//!     SecurityEvent::AuthenticationFailure,
//!     username = %username,
//!     reason = "password_mismatch",
//!     "Login rejected"
//! );
//! ```

use std::fmt;
use tracing_subscriber::{fmt as tracing_fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// ============================================================================
// Security Events
// ============================================================================

/// Security event categories for audit logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityEvent {
    // Authentication events
    /// Successful operator authentication
    AuthenticationSuccess,
    /// Failed authentication attempt
    AuthenticationFailure,

    // Account events
    /// New operator account registered
    UserRegistered,
    /// Registration rejected before any store mutation
    RegistrationRejected,

    // Integrity events
    /// A stored credential hash failed structural parsing
    CredentialCorrupt,
    /// A credential store is unreachable or failed mid-operation
    StoreUnavailable,

    // Migration events
    /// Legacy-file migration started
    MigrationStarted,
    /// Legacy-file migration finished, with counts
    MigrationCompleted,
    /// A legacy record was skipped during migration
    MigrationRecordSkipped,
}

impl SecurityEvent {
    /// Get the event category for filtering/grouping
    pub fn category(&self) -> &'static str {
        match self {
            Self::AuthenticationSuccess | Self::AuthenticationFailure => "authentication",

            Self::UserRegistered | Self::RegistrationRejected => "user_management",

            Self::CredentialCorrupt | Self::StoreUnavailable => "integrity",

            Self::MigrationStarted | Self::MigrationCompleted | Self::MigrationRecordSkipped => {
                "migration"
            }
        }
    }

    /// Get the severity level for the event
    pub fn severity(&self) -> Severity {
        match self {
            // Critical - corruption or an unreachable store needs
            // immediate attention
            Self::CredentialCorrupt | Self::StoreUnavailable => Severity::Critical,

            // High - security-relevant failures
            Self::AuthenticationFailure => Severity::High,

            // Medium - important state changes
            Self::AuthenticationSuccess | Self::UserRegistered | Self::MigrationCompleted => {
                Severity::Medium
            }

            // Low - routine bookkeeping
            Self::RegistrationRejected
            | Self::MigrationStarted
            | Self::MigrationRecordSkipped => Severity::Low,
        }
    }

    /// Get the event name as a string
    pub fn name(&self) -> &'static str {
        match self {
            Self::AuthenticationSuccess => "authentication_success",
            Self::AuthenticationFailure => "authentication_failure",
            Self::UserRegistered => "user_registered",
            Self::RegistrationRejected => "registration_rejected",
            Self::CredentialCorrupt => "credential_corrupt",
            Self::StoreUnavailable => "store_unavailable",
            Self::MigrationStarted => "migration_started",
            Self::MigrationCompleted => "migration_completed",
            Self::MigrationRecordSkipped => "migration_record_skipped",
        }
    }
}

impl fmt::Display for SecurityEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Event severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Routine operations
    Low,
    /// Important state changes
    Medium,
    /// Security-relevant failures
    High,
    /// Immediate attention required
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// Log a security event with structured fields.
///
/// The macro automatically attaches `security_event`, `category`, and
/// `severity` fields, and picks the `tracing` level from the event's
/// severity.
#[macro_export]
macro_rules! security_event {
    ($event:expr, $($field:tt)*) => {{
        let event = $event;
        let severity = event.severity();
        let category = event.category();
        let event_name = event.name();

        match severity {
            $crate::observability::Severity::Critical => {
                ::tracing::error!(
                    security_event = event_name,
                    category = category,
                    severity = "critical",
                    $($field)*
                );
            }
            $crate::observability::Severity::High => {
                ::tracing::warn!(
                    security_event = event_name,
                    category = category,
                    severity = "high",
                    $($field)*
                );
            }
            $crate::observability::Severity::Medium => {
                ::tracing::info!(
                    security_event = event_name,
                    category = category,
                    severity = "medium",
                    $($field)*
                );
            }
            $crate::observability::Severity::Low => {
                ::tracing::debug!(
                    security_event = event_name,
                    category = category,
                    severity = "low",
                    $($field)*
                );
            }
        }
    }};
}

pub use security_event;

// ============================================================================
// Subscriber Configuration
// ============================================================================

/// Log output format
#[derive(Debug, Clone, Default)]
pub enum LogFormat {
    /// Human-readable format for development
    #[default]
    Pretty,
    /// JSON format for production/log aggregation
    Json,
    /// Compact single-line format
    Compact,
}

/// Logging configuration for embedding applications.
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Log output format
    pub log_format: LogFormat,
    /// Log level filter (e.g. "info", "palisade=debug")
    pub log_filter: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::default(),
            log_filter: "info".to_string(),
        }
    }
}

impl ObservabilityConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `LOG_FORMAT`: "pretty", "json", or "compact" (default: "pretty")
    /// - `RUST_LOG`: log filter directive (default: "info")
    pub fn from_env() -> Self {
        let log_format = std::env::var("LOG_FORMAT")
            .map(|s| match s.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "compact" => LogFormat::Compact,
                _ => LogFormat::Pretty,
            })
            .unwrap_or_default();

        let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Self {
            log_format,
            log_filter,
        }
    }
}

/// Observability setup errors.
#[derive(Debug, Clone)]
pub enum ObservabilityError {
    /// Invalid configuration value
    Config(String),
    /// Subscriber installation failed (usually: already initialized)
    Subscriber(String),
}

impl fmt::Display for ObservabilityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "observability configuration error: {}", msg),
            Self::Subscriber(msg) => write!(f, "failed to install subscriber: {}", msg),
        }
    }
}

impl std::error::Error for ObservabilityError {}

/// Initialize the tracing subscriber based on configuration.
///
/// Call once at application startup. Library code only emits events; it
/// never installs a subscriber on its own.
pub fn init_tracing(config: &ObservabilityConfig) -> Result<(), ObservabilityError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .map_err(|e| ObservabilityError::Config(format!("invalid log filter: {}", e)))?;

    let subscriber = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Pretty => subscriber
            .with(tracing_fmt::layer().pretty().with_target(true))
            .try_init(),
        LogFormat::Json => subscriber
            .with(tracing_fmt::layer().json().with_target(true))
            .try_init(),
        LogFormat::Compact => subscriber
            .with(tracing_fmt::layer().compact().with_target(true))
            .try_init(),
    }
    .map_err(|e| ObservabilityError::Subscriber(e.to_string()))
}

// ============================================================================
// Tests
// ============================================================================
