//! Resolve the runtime configuration from the config file, the selected
//! profile, and `GlobalOpts` overrides.

use std::path::PathBuf;
use std::time::Duration;

use cpekeep_acs::TlsMode;
use cpekeep_config::{Config, ConfigError, Profile};
use cpekeep_core::EngineConfig;
use tracing::debug;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Build the `EngineConfig` for commands that talk to the ACS.
///
/// A profile from the config file is used when one matches; otherwise the
/// ACS is described by `--acs-url` and friends alone.
pub fn engine_config(global: &GlobalOpts, cfg: &Config) -> Result<EngineConfig, CliError> {
    let mut engine = match cpekeep_config::select_profile(cfg, global.profile.as_deref()) {
        Ok((name, profile)) => {
            debug!(profile = %name, "using configured profile");
            let mut profile = profile.clone();
            if global.username.is_some() {
                profile.username.clone_from(&global.username);
            }
            if global.password.is_some() {
                profile.password.clone_from(&global.password);
            }
            cpekeep_config::profile_to_engine_config(&profile, &name, &cfg.defaults)?
        }
        Err(ConfigError::UnknownProfile { profile: name })
            if global.profile.is_none() || global.acs_url.is_some() =>
        {
            let url = global.acs_url.clone().ok_or_else(|| CliError::NoConfig {
                path: cpekeep_config::config_path().display().to_string(),
            })?;
            let profile = Profile {
                acs_url: url,
                username: global.username.clone(),
                password: global.password.clone(),
                keyring: Some(false),
                ..Profile::default()
            };
            cpekeep_config::profile_to_engine_config(&profile, &name, &cfg.defaults)?
        }
        Err(ConfigError::UnknownProfile { profile: name }) => {
            return Err(CliError::ProfileNotFound {
                name,
                available: available_profiles(cfg),
            });
        }
        Err(e) => return Err(e.into()),
    };

    if let Some(ref raw) = global.acs_url {
        engine.acs.url = raw.parse().map_err(|_| CliError::Validation {
            field: "acs-url".into(),
            reason: format!("invalid URL: {raw}"),
        })?;
    }
    if global.insecure {
        engine.acs.tls = TlsMode::DangerAcceptInvalid;
    }
    if let Some(secs) = global.timeout {
        engine.acs.timeout = Duration::from_secs(secs);
    }
    Ok(engine)
}

/// Backup file: `--data-file`, else `defaults.data_file`, else the
/// platform data directory.
pub fn data_file(global: &GlobalOpts, cfg: &Config) -> PathBuf {
    global
        .data_file
        .clone()
        .or_else(|| cfg.defaults.data_file.clone())
        .unwrap_or_else(cpekeep_config::data_path)
}

fn available_profiles(cfg: &Config) -> String {
    let mut names: Vec<&str> = cfg.profiles.keys().map(String::as_str).collect();
    if names.is_empty() {
        return "(none)".into();
    }
    names.sort_unstable();
    names.join(", ")
}
