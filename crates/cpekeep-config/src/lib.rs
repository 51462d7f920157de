//! Configuration for cpekeep.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext), and
//! translation to `cpekeep_core::EngineConfig`. The CLI layers its
//! `GlobalOpts` overrides on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use cpekeep_acs::TlsMode;
use cpekeep_core::{
    AcsConfig, Corroboration, EngineConfig, ResetPolicy, RestorePolicy, ScanPolicy,
};

const KEYRING_SERVICE: &str = "cpekeep";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{profile}' not found")]
    UnknownProfile { profile: String },

    #[error("no password configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named ACS profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Backup file; defaults to the platform data dir.
    pub data_file: Option<PathBuf>,

    #[serde(default)]
    pub restore: RestoreDefaults,

    #[serde(default)]
    pub reset: ResetDefaults,

    #[serde(default)]
    pub scan: ScanDefaults,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
            data_file: None,
            restore: RestoreDefaults::default(),
            reset: ResetDefaults::default(),
            scan: ScanDefaults::default(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RestoreDefaults {
    pub max_retries: u32,
    pub backoff_secs: u64,
    pub submit_timeout_secs: u64,
    pub connection_request: bool,
}

impl Default for RestoreDefaults {
    fn default() -> Self {
        let policy = RestorePolicy::default();
        Self {
            max_retries: policy.max_retries,
            backoff_secs: policy.backoff_base.as_secs(),
            submit_timeout_secs: policy.submit_timeout.as_secs(),
            connection_request: policy.connection_request,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResetDefaults {
    pub uptime_threshold_secs: u64,
    /// "single" or "corroborated".
    pub corroboration: String,
}

impl Default for ResetDefaults {
    fn default() -> Self {
        let policy = ResetPolicy::default();
        Self {
            uptime_threshold_secs: policy.uptime_threshold.as_secs(),
            corroboration: policy.corroboration.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScanDefaults {
    pub concurrency: usize,
}

impl Default for ScanDefaults {
    fn default() -> Self {
        Self {
            concurrency: ScanPolicy::default().concurrency,
        }
    }
}

/// A named ACS profile.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// NBI base URL (e.g., "http://acs.local:7557").
    pub acs_url: String,

    /// Username for HTTP basic auth.
    pub username: Option<String>,

    /// Password (plaintext; prefer keyring or env var).
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,

    /// Look the password up in the system keyring (default true).
    pub keyring: Option<bool>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    pub insecure: Option<bool>,

    /// Override timeout.
    pub timeout: Option<u64>,
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("io", "cpekeep", "cpekeep")
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback(".config").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Default location of the backup file.
pub fn data_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback(".local/share").join("backups.json"),
        |dirs| dirs.data_dir().join("backups.json"),
    )
}

fn dirs_fallback(sub: &str) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(sub);
    p.push("cpekeep");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file, overlaid with `CPEKEEP_` variables
/// (`CPEKEEP_DEFAULTS__TIMEOUT=10`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("CPEKEEP_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

/// Serialize config to TOML and write it to `path`.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

/// Serialize config to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

// ── Profile selection ───────────────────────────────────────────────

/// Pick `requested`, else the config's default profile.
pub fn select_profile<'a>(
    cfg: &'a Config,
    requested: Option<&str>,
) -> Result<(String, &'a Profile), ConfigError> {
    let name = requested
        .map(String::from)
        .or_else(|| cfg.default_profile.clone())
        .unwrap_or_else(|| "default".into());
    cfg.profiles
        .get(&name)
        .map(|p| (name.clone(), p))
        .ok_or(ConfigError::UnknownProfile { profile: name })
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the basic-auth password of a profile.
///
/// `Ok(None)` when the profile has no username (anonymous NBI). Otherwise
/// tries, in order: the profile's `password_env`, `CPEKEEP_PASSWORD`, the
/// system keyring, plaintext in the config.
pub fn resolve_password(
    profile: &Profile,
    profile_name: &str,
) -> Result<Option<SecretString>, ConfigError> {
    if profile.username.is_none() {
        return Ok(None);
    }

    // 1. Profile's password_env → env var lookup
    if let Some(ref env_name) = profile.password_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(Some(SecretString::from(val)));
        }
    }

    // 2. Global env var
    if let Ok(pw) = std::env::var("CPEKEEP_PASSWORD") {
        return Ok(Some(SecretString::from(pw)));
    }

    // 3. System keyring
    if profile.keyring.unwrap_or(true) {
        if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/password")) {
            if let Ok(pw) = entry.get_password() {
                return Ok(Some(SecretString::from(pw)));
            }
        }
    }

    // 4. Plaintext in config
    if let Some(ref pw) = profile.password {
        return Ok(Some(SecretString::from(pw.clone())));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Store a profile's password in the system keyring.
pub fn store_password(profile_name: &str, password: &str) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/password"))?;
    entry.set_password(password)?;
    Ok(())
}

// ── Translation to engine config ────────────────────────────────────

/// Build an `AcsConfig` from a profile and the global defaults.
pub fn profile_to_acs_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<AcsConfig, ConfigError> {
    let url: url::Url = profile
        .acs_url
        .parse()
        .map_err(|_| ConfigError::Validation {
            field: "acs_url".into(),
            reason: format!("invalid URL: {}", profile.acs_url),
        })?;

    let tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsMode::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsMode::CustomCa(ca_path.clone())
    } else {
        TlsMode::System
    };

    let mut acs = AcsConfig::new(url);
    acs.username.clone_from(&profile.username);
    acs.password = resolve_password(profile, profile_name)?;
    acs.tls = tls;
    acs.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    Ok(acs)
}

/// Build the full `EngineConfig` for a profile.
pub fn profile_to_engine_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<EngineConfig, ConfigError> {
    let acs = profile_to_acs_config(profile, profile_name, defaults)?;

    let corroboration: Corroboration =
        defaults
            .reset
            .corroboration
            .parse()
            .map_err(|_| ConfigError::Validation {
                field: "defaults.reset.corroboration".into(),
                reason: format!(
                    "expected 'single' or 'corroborated', got '{}'",
                    defaults.reset.corroboration
                ),
            })?;
    if defaults.scan.concurrency == 0 {
        return Err(ConfigError::Validation {
            field: "defaults.scan.concurrency".into(),
            reason: "must be at least 1".into(),
        });
    }

    Ok(EngineConfig {
        acs,
        restore: RestorePolicy {
            max_retries: defaults.restore.max_retries,
            backoff_base: Duration::from_secs(defaults.restore.backoff_secs),
            submit_timeout: Duration::from_secs(defaults.restore.submit_timeout_secs),
            connection_request: defaults.restore.connection_request,
        },
        reset: ResetPolicy {
            uptime_threshold: Duration::from_secs(defaults.reset.uptime_threshold_secs),
            corroboration,
        },
        scan: ScanPolicy {
            concurrency: defaults.scan.concurrency,
        },
    })
}
