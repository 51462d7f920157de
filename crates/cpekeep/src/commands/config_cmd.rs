//! Config subcommand handlers.

use std::io::BufRead;
use std::path::PathBuf;

use serde::Serialize;
use tabled::Tabled;

use cpekeep_config::{Config, Profile};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

// ── Rows ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ProfileEntry {
    name: String,
    acs_url: String,
    username: Option<String>,
    default: bool,
}

#[derive(Tabled)]
struct ProfileRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "NBI URL")]
    acs_url: String,
    #[tabled(rename = "User")]
    username: String,
    #[tabled(rename = "Default")]
    default: &'static str,
}

impl From<&ProfileEntry> for ProfileRow {
    fn from(p: &ProfileEntry) -> Self {
        Self {
            name: p.name.clone(),
            acs_url: p.acs_url.clone(),
            username: output::or_dash(p.username.as_deref()),
            default: if p.default { "*" } else { "" },
        }
    }
}

#[derive(Debug, Serialize)]
struct Saved {
    profile: String,
    path: PathBuf,
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Copy of the config with plaintext passwords masked.
fn redacted(cfg: &Config) -> Config {
    let mut out = cfg.clone();
    for profile in out.profiles.values_mut() {
        if profile.password.is_some() {
            profile.password = Some("****".into());
        }
    }
    out
}

fn format_config(cfg: &Config) -> String {
    use std::fmt::Write;
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let d = &cfg.defaults;
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", d.output);
    let _ = writeln!(out, "insecure = {}", d.insecure);
    let _ = writeln!(out, "timeout = {}", d.timeout);
    if let Some(ref file) = d.data_file {
        let _ = writeln!(out, "data_file = \"{}\"", file.display());
    }
    let _ = writeln!(
        out,
        "restore: {} retries, {}s backoff, {}s submit timeout",
        d.restore.max_retries, d.restore.backoff_secs, d.restore.submit_timeout_secs
    );
    let _ = writeln!(
        out,
        "reset: {}s uptime threshold, {} corroboration",
        d.reset.uptime_threshold_secs, d.reset.corroboration
    );
    let _ = writeln!(out, "scan: {} at a time", d.scan.concurrency);

    let mut names: Vec<_> = cfg.profiles.keys().collect();
    names.sort();
    for name in names {
        let p = &cfg.profiles[name];
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        let _ = writeln!(out, "acs_url = \"{}\"", p.acs_url);
        if let Some(ref u) = p.username {
            let _ = writeln!(out, "username = \"{u}\"");
        }
        if let Some(ref pw) = p.password {
            let _ = writeln!(out, "password = \"{pw}\"");
        }
        if let Some(ref env) = p.password_env {
            let _ = writeln!(out, "password_env = \"{env}\"");
        }
        if let Some(ref ca) = p.ca_cert {
            let _ = writeln!(out, "ca_cert = \"{}\"", ca.display());
        }
        if let Some(insecure) = p.insecure {
            let _ = writeln!(out, "insecure = {insecure}");
        }
        if let Some(timeout) = p.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
    }

    out.trim_end().to_owned()
}

fn profile_names(cfg: &Config) -> String {
    let mut names: Vec<&str> = cfg.profiles.keys().map(String::as_str).collect();
    if names.is_empty() {
        return "(none)".into();
    }
    names.sort_unstable();
    names.join(", ")
}

fn ensure_profile(cfg: &Config, name: &str) -> Result<(), CliError> {
    if cfg.profiles.contains_key(name) {
        Ok(())
    } else {
        Err(CliError::ProfileNotFound {
            name: name.to_owned(),
            available: profile_names(cfg),
        })
    }
}

fn read_password() -> Result<String, CliError> {
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']).to_owned();
    if password.is_empty() {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: "empty password on stdin".into(),
        });
    }
    Ok(password)
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            let out = output::render_single(&global.output, &redacted(cfg), format_config, |c| {
                c.default_profile.clone().unwrap_or_default()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(
                &cpekeep_config::config_path().display().to_string(),
                global.quiet,
            );
            Ok(())
        }

        ConfigCommand::Profiles => {
            let mut entries: Vec<ProfileEntry> = cfg
                .profiles
                .iter()
                .map(|(name, p)| ProfileEntry {
                    name: name.clone(),
                    acs_url: p.acs_url.clone(),
                    username: p.username.clone(),
                    default: cfg.default_profile.as_deref() == Some(name.as_str()),
                })
                .collect();
            entries.sort_by(|a, b| a.name.cmp(&b.name));

            let out = output::render_list(
                &global.output,
                &entries,
                |p| ProfileRow::from(p),
                |p| p.name.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Add {
            name,
            url,
            ca_cert,
            default,
        } => {
            url::Url::parse(&url).map_err(|e| CliError::Validation {
                field: "url".into(),
                reason: format!("invalid URL '{url}': {e}"),
            })?;

            let mut cfg = cfg.clone();
            let profile = Profile {
                acs_url: url,
                username: global.username.clone(),
                ca_cert,
                insecure: global.insecure.then_some(true),
                timeout: global.timeout,
                ..Profile::default()
            };
            let first = cfg.profiles.is_empty();
            cfg.profiles.insert(name.clone(), profile);
            let default_missing = cfg
                .default_profile
                .as_ref()
                .is_none_or(|d| !cfg.profiles.contains_key(d));
            if default || first || default_missing {
                cfg.default_profile = Some(name.clone());
            }
            cpekeep_config::save_config(&cfg)?;

            let saved = Saved {
                profile: name,
                path: cpekeep_config::config_path(),
            };
            let out = output::render_single(
                &global.output,
                &saved,
                |s| format!("Profile {} saved to {}", s.profile, s.path.display()),
                |s| s.profile.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Use { name } => {
            ensure_profile(cfg, &name)?;
            let mut cfg = cfg.clone();
            cfg.default_profile = Some(name.clone());
            cpekeep_config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("Default profile set to {name}");
            }
            Ok(())
        }

        ConfigCommand::SetPassword => {
            let name = global
                .profile
                .clone()
                .or_else(|| cfg.default_profile.clone())
                .unwrap_or_else(|| "default".into());
            ensure_profile(cfg, &name)?;
            let password = read_password()?;
            cpekeep_config::store_password(&name, &password)?;
            if !global.quiet {
                eprintln!("Password for {name} stored in the system keyring");
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn config() -> Config {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "lab".into(),
            Profile {
                acs_url: "http://acs.lab:7557".into(),
                username: Some("nbi".into()),
                password: Some("hunter2".into()),
                ..Profile::default()
            },
        );
        cfg
    }

    #[test]
    fn passwords_are_masked() {
        let shown = format_config(&redacted(&config()));
        assert!(shown.contains("[profiles.lab]"));
        assert!(shown.contains("password = \"****\""));
        assert!(!shown.contains("hunter2"));
    }

    #[test]
    fn unknown_profile_lists_the_known_ones() {
        let err = ensure_profile(&config(), "prod").unwrap_err();
        assert!(err.to_string().contains("prod"));
        assert!(matches!(
            err,
            CliError::ProfileNotFound { ref available, .. } if available == "lab"
        ));
    }
}
