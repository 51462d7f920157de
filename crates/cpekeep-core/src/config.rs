// ── Runtime engine configuration ──
//
// These types describe how the engine talks to the ACS and how cautious
// it is about resets and restores. They never touch disk: the CLI builds
// an `EngineConfig` (via cpekeep-config) and hands it in.

use std::time::Duration;

use cpekeep_acs::{BasicAuth, NbiClient, TlsMode, TransportConfig};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use url::Url;

use crate::error::CoreError;

/// How to reach the ACS northbound interface.
#[derive(Debug, Clone)]
pub struct AcsConfig {
    /// NBI root (e.g., `http://acs.local:7557`).
    pub url: Url,
    pub username: Option<String>,
    pub password: Option<SecretString>,
    pub tls: TlsMode,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
}

impl AcsConfig {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            username: None,
            password: None,
            tls: TlsMode::System,
            timeout: Duration::from_secs(30),
        }
    }

    /// Build an authenticated NBI client.
    pub fn build_client(&self) -> Result<NbiClient, CoreError> {
        let transport = TransportConfig {
            tls: self.tls.clone(),
            timeout: self.timeout,
        };
        let client = NbiClient::new(self.url.clone(), &transport)?;
        Ok(match (&self.username, &self.password) {
            (Some(username), Some(password)) => client.with_auth(BasicAuth {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => client,
        })
    }
}

/// Retry and submission behaviour of the restore orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestorePolicy {
    /// Retries after the first attempt, transient failures only.
    pub max_retries: u32,
    /// Delay before retry `n` is `backoff_base * 2^n`.
    pub backoff_base: Duration,
    /// Upper bound on one task submission.
    pub submit_timeout: Duration,
    /// Ask the ACS to poke the device immediately.
    pub connection_request: bool,
}

impl Default for RestorePolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff_base: Duration::from_secs(2),
            submit_timeout: Duration::from_secs(60),
            connection_request: true,
        }
    }
}

impl RestorePolicy {
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_base
            .saturating_mul(2_u32.saturating_pow(attempt))
    }
}

/// How many independent signals a reset needs before it is acted on.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Corroboration {
    /// Any signal is enough.
    #[default]
    Single,
    /// Uptime regression alone, or default SSID together with credential loss.
    Corroborated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetPolicy {
    /// Uptime below which a device counts as freshly booted.
    pub uptime_threshold: Duration,
    pub corroboration: Corroboration,
}

impl Default for ResetPolicy {
    fn default() -> Self {
        Self {
            uptime_threshold: Duration::from_secs(600),
            corroboration: Corroboration::Single,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanPolicy {
    /// Devices processed in parallel during a fleet scan.
    pub concurrency: usize,
}

impl Default for ScanPolicy {
    fn default() -> Self {
        Self { concurrency: 8 }
    }
}

/// Everything the engine needs at runtime.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub acs: AcsConfig,
    pub restore: RestorePolicy,
    pub reset: ResetPolicy,
    pub scan: ScanPolicy,
}

impl EngineConfig {
    pub fn new(acs: AcsConfig) -> Self {
        Self {
            acs,
            restore: RestorePolicy::default(),
            reset: ResetPolicy::default(),
            scan: ScanPolicy::default(),
        }
    }
}
