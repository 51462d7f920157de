// ── Core error types ──
//
// User-facing errors from cpekeep-core. Consumers never see HTTP status
// codes or JSON parse failures directly: the `From<cpekeep_acs::Error>`
// impl translates transport-layer errors into domain variants.
//
// Resolution gaps and malformed trees are not errors. Reads return `None`;
// only a write with no usable path surfaces `UnsupportedSetting`.

use thiserror::Error;

use crate::normalize::Dialect;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Resolution errors ────────────────────────────────────────────
    #[error("Unknown logical path: {name}")]
    UnknownLogicalPath { name: String },

    #[error("Setting {logical} has no writable path on a {dialect} device")]
    UnsupportedSetting { logical: String, dialect: Dialect },

    // ── Device errors ────────────────────────────────────────────────
    #[error("Device {device_id} reports no serial number")]
    MissingSerial { device_id: String },

    #[error("Device not found: {identifier}")]
    DeviceNotFound { identifier: String },

    // ── ACS errors (wrapped, not exposed raw) ────────────────────────
    #[error("Cannot reach ACS: {reason}")]
    ConnectionFailed { reason: String },

    #[error("ACS request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("ACS error: {message}")]
    Acs {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Persistence errors ───────────────────────────────────────────
    #[error("Backup store error: {message}")]
    Store { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether retrying the failed operation could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ConnectionFailed { .. } | Self::Timeout { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<cpekeep_acs::Error> for CoreError {
    fn from(err: cpekeep_acs::Error) -> Self {
        match err {
            cpekeep_acs::Error::Timeout { timeout_secs } => Self::Timeout { timeout_secs },
            cpekeep_acs::Error::DeviceNotFound { device_id } => Self::DeviceNotFound {
                identifier: device_id,
            },
            cpekeep_acs::Error::Transport(ref e) if e.is_connect() => Self::ConnectionFailed {
                reason: e.to_string(),
            },
            cpekeep_acs::Error::Tls(reason) => Self::ConnectionFailed { reason },
            cpekeep_acs::Error::InvalidUrl(e) => Self::Config {
                message: format!("invalid ACS URL: {e}"),
            },
            cpekeep_acs::Error::Rejected { status, message } => Self::Acs {
                message: format!("rejected (HTTP {status}): {message}"),
                status: Some(status),
            },
            other => Self::Acs {
                status: other.status(),
                message: other.to_string(),
            },
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Store {
            message: err.to_string(),
        }
    }
}
