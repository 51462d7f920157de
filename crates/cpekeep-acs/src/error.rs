use thiserror::Error;

/// Top-level error type for the `cpekeep-acs` crate.
///
/// Covers every failure mode of the northbound interface: transport,
/// ACS rejection, missing devices and malformed payloads.
/// `cpekeep-core` maps these into domain errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── ACS ────────────────────────────────────────────────────────────
    /// The ACS answered with a non-2xx status.
    #[error("ACS rejected the request (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    /// No device document matched the query.
    #[error("Device not found on ACS: {device_id}")]
    DeviceNotFound { device_id: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    ///
    /// Only timeouts and connection failures qualify. An explicit
    /// rejection by the ACS is terminal.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } => true,
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::DeviceNotFound { .. } | Self::Rejected { status: 404, .. } => true,
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            _ => false,
        }
    }

    /// HTTP status of a rejection, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_transient() {
        assert!(Error::Timeout { timeout_secs: 5 }.is_transient());
    }

    #[test]
    fn rejection_is_terminal() {
        let err = Error::Rejected {
            status: 400,
            message: "bad task".into(),
        };
        assert!(!err.is_transient());
        assert_eq!(err.status(), Some(400));
    }

    #[test]
    fn missing_device_is_not_found() {
        let err = Error::DeviceNotFound {
            device_id: "00259E-EG8145V5-48575443".into(),
        };
        assert!(err.is_not_found());
        assert!(!err.is_transient());
    }
}
