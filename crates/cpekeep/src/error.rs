//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use cpekeep_config::ConfigError;
use cpekeep_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const UNSUPPORTED: i32 = 5;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not reach the ACS: {reason}")]
    #[diagnostic(
        code(cpekeep::connection_failed),
        help(
            "Check that the northbound interface is running and accessible.\n\
             Try: cpekeep device list --insecure"
        )
    )]
    ConnectionFailed { reason: String },

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(cpekeep::timeout),
        help("Increase timeout with --timeout or check ACS responsiveness.")
    )]
    Timeout { seconds: u64 },

    // ── Authentication ───────────────────────────────────────────────

    #[error("The ACS refused the credentials (HTTP {status})")]
    #[diagnostic(
        code(cpekeep::auth_failed),
        help("Verify username and password of profile '{profile}'.")
    )]
    AuthFailed { status: u16, profile: String },

    #[error("No password configured for profile '{profile}'")]
    #[diagnostic(
        code(cpekeep::no_credentials),
        help(
            "Set password_env or password in the profile, store it in the\n\
             system keyring, or set CPEKEEP_PASSWORD."
        )
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(cpekeep::not_found),
        help("Run: cpekeep {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("Device '{device_id}' reports no serial number")]
    #[diagnostic(
        code(cpekeep::missing_serial),
        help("Backups are keyed by serial number; this device cannot be backed up.")
    )]
    MissingSerial { device_id: String },

    #[error("Setting '{logical}' has no writable path on a {dialect} device")]
    #[diagnostic(code(cpekeep::unsupported))]
    Unsupported { logical: String, dialect: String },

    // ── ACS ──────────────────────────────────────────────────────────

    #[error("ACS error: {message}")]
    #[diagnostic(code(cpekeep::acs_error))]
    AcsError { message: String },

    #[error("Restore of {serial} failed: {detail}")]
    #[diagnostic(
        code(cpekeep::restore_failed),
        help("The reset event stays recorded. Run: cpekeep events list --serial {serial}")
    )]
    RestoreFailed { serial: String, detail: String },

    // ── Storage ──────────────────────────────────────────────────────

    #[error("Backup store error: {message}")]
    #[diagnostic(
        code(cpekeep::store),
        help("Check the file given by --data-file (or CPEKEEP_DATA_FILE).")
    )]
    Store { message: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(cpekeep::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(cpekeep::profile_not_found),
        help("Available profiles: {available}")
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No ACS configured")]
    #[diagnostic(
        code(cpekeep::no_config),
        help(
            "Pass --acs-url (or CPEKEEP_ACS_URL), or add a profile to\n\
             {path}"
        )
    )]
    NoConfig { path: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(code(cpekeep::config))]
    Config { message: String },

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    #[diagnostic(code(cpekeep::json), help("Check the JSON file contents and try again."))]
    Json(#[from] serde_json::Error),

    #[error("YAML rendering failed: {0}")]
    #[diagnostic(code(cpekeep::yaml))]
    Yaml(#[from] serde_yaml::Error),

    #[error("Internal error: {0}")]
    #[diagnostic(code(cpekeep::internal))]
    Internal(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Unsupported { .. } | Self::MissingSerial { .. } => exit_code::UNSUPPORTED,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::UnknownLogicalPath { name } => CliError::NotFound {
                resource_type: "logical path".into(),
                identifier: name,
                list_command: "paths list".into(),
            },

            CoreError::UnsupportedSetting { logical, dialect } => CliError::Unsupported {
                logical,
                dialect: dialect.to_string(),
            },

            CoreError::MissingSerial { device_id } => CliError::MissingSerial { device_id },

            CoreError::DeviceNotFound { identifier } => CliError::NotFound {
                resource_type: "device".into(),
                identifier,
                list_command: "device list".into(),
            },

            CoreError::ConnectionFailed { reason } => CliError::ConnectionFailed { reason },

            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },

            CoreError::Acs {
                status: Some(status @ (401 | 403)),
                ..
            } => CliError::AuthFailed {
                status,
                profile: "current".into(),
            },

            CoreError::Acs { message, .. } => CliError::AcsError { message },

            CoreError::Store { message } => CliError::Store { message },

            CoreError::Config { message } => CliError::Config { message },

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::UnknownProfile { profile } => CliError::ProfileNotFound {
                name: profile,
                available: "(none)".into(),
            },
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config {
                message: other.to_string(),
            },
        }
    }
}
