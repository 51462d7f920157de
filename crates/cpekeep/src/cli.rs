//! Clap derive structures for the `cpekeep` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use cpekeep_core::{Band, Dialect};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// cpekeep -- configuration backup and auto-restore for TR-069 CPEs
#[derive(Debug, Parser)]
#[command(
    name = "cpekeep",
    version,
    about = "Back up CPE configuration and restore it after factory resets",
    long_about = "Keeps a backup of every CPE's Wi-Fi, PPPoE and LAN settings as read\n\
        through a GenieACS-compatible northbound interface, notices when a\n\
        device comes back factory-reset, and pushes the backup back to it.\n\n\
        Handles both TR-098 (InternetGatewayDevice) and TR-181 (Device) trees.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// ACS profile to use
    #[arg(long, short = 'p', env = "CPEKEEP_PROFILE", global = true)]
    pub profile: Option<String>,

    /// NBI base URL (overrides profile)
    #[arg(long, short = 'a', env = "CPEKEEP_ACS_URL", global = true)]
    pub acs_url: Option<String>,

    /// NBI basic-auth username (overrides profile)
    #[arg(long, short = 'u', env = "CPEKEEP_USERNAME", global = true)]
    pub username: Option<String>,

    /// NBI basic-auth password
    #[arg(long, env = "CPEKEEP_PASSWORD", global = true, hide_env_values = true)]
    pub password: Option<String>,

    /// Backup file (defaults to the platform data directory)
    #[arg(long, env = "CPEKEEP_DATA_FILE", global = true)]
    pub data_file: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "CPEKEEP_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "CPEKEEP_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "CPEKEEP_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Inspect the logical-to-physical path table
    Paths(PathsArgs),

    /// Analyse a device document offline (no ACS needed)
    Inspect(InspectArgs),

    /// Read, back up and process devices on the ACS
    #[command(alias = "dev", alias = "d")]
    Device(DeviceArgs),

    /// Push a device's active backup back to it
    Restore(RestoreArgs),

    /// Manage stored configuration backups
    #[command(alias = "b")]
    Backups(BackupsArgs),

    /// Show detected factory resets and their restore outcome
    #[command(alias = "ev")]
    Events(EventsArgs),

    /// Manage ACS profiles in the config file
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  PATHS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct PathsArgs {
    #[command(subcommand)]
    pub command: PathsCommand,
}

#[derive(Debug, Subcommand)]
pub enum PathsCommand {
    /// List logical setting names and their templates
    #[command(alias = "ls")]
    List {
        /// Only names in this category (wifi, wan, lan, device)
        #[arg(long, short = 'c')]
        category: Option<String>,
    },

    /// Show both physical paths of a logical name
    Resolve {
        /// Logical name, e.g. wifi.ssid
        logical: String,

        /// Placeholder value, e.g. --var ssid=2 (repeatable)
        #[arg(long = "var", value_name = "NAME=VALUE", value_parser = parse_var)]
        vars: Vec<(String, String)>,

        /// Print only this dialect's path (tr098, tr181)
        #[arg(long, short = 'd')]
        dialect: Option<Dialect>,
    },
}

fn parse_var(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_owned(), value.to_owned())),
        _ => Err(format!("expected NAME=VALUE, got '{raw}'")),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  INSPECT
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Device document as returned by the NBI (object, or array of one)
    pub file: PathBuf,

    /// Also read these logical settings (repeatable)
    #[arg(long = "get", value_name = "LOGICAL")]
    pub get: Vec<String>,

    /// Band used for wifi.* reads
    #[arg(long, default_value = "2.4GHz")]
    pub band: Band,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  DEVICE
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct DeviceArgs {
    #[command(subcommand)]
    pub command: DeviceCommand,
}

#[derive(Debug, Subcommand)]
pub enum DeviceCommand {
    /// List device ids known to the ACS
    #[command(alias = "ls")]
    List,

    /// Show what the engine sees on a device
    Show {
        /// ACS device id or serial number
        device: String,
    },

    /// Refresh a device's backup without reset detection
    Backup {
        /// ACS device id
        device: String,
    },

    /// Run the full pass: detect resets, restore, back up
    Process {
        /// ACS device ids
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        devices: Vec<String>,

        /// Process every device on the ACS
        #[arg(long)]
        all: bool,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  RESTORE
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct RestoreArgs {
    /// Serial number of the device
    pub serial: String,

    /// Send the task to this ACS device id instead
    #[arg(long, short = 'd')]
    pub device: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  BACKUPS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct BackupsArgs {
    #[command(subcommand)]
    pub command: BackupsCommand,
}

#[derive(Debug, Subcommand)]
pub enum BackupsCommand {
    /// List backups, newest first
    #[command(alias = "ls")]
    List {
        /// Only this serial number
        #[arg(long, short = 's')]
        serial: Option<String>,

        /// Include superseded backups
        #[arg(long)]
        all: bool,
    },

    /// Show a device's active backup and its write instructions
    Show {
        /// Serial number of the device
        serial: String,
    },

    /// Turn automatic restore on or off for a device
    Toggle {
        /// Serial number of the device
        serial: String,

        /// Enable automatic restore
        #[arg(long, conflicts_with = "disable", required_unless_present = "disable")]
        enable: bool,

        /// Disable automatic restore
        #[arg(long)]
        disable: bool,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  EVENTS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct EventsArgs {
    #[command(subcommand)]
    pub command: EventsCommand,
}

#[derive(Debug, Subcommand)]
pub enum EventsCommand {
    /// List reset events, newest first
    #[command(alias = "ls")]
    List {
        /// Only this serial number
        #[arg(long, short = 's')]
        serial: Option<String>,

        /// Max events to show
        #[arg(long, short = 'l', default_value = "25")]
        limit: usize,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display the resolved configuration, secrets masked
    Show,

    /// Print the config file location
    Path,

    /// List configured profiles
    Profiles,

    /// Add or replace a profile
    ///
    /// Takes --username, --insecure and --timeout from the global flags.
    Add {
        /// Profile name
        name: String,

        /// NBI base URL, e.g. http://acs.local:7557
        url: String,

        /// Custom CA certificate (PEM)
        #[arg(long)]
        ca_cert: Option<PathBuf>,

        /// Make this the default profile
        #[arg(long)]
        default: bool,
    },

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store the --profile password in the system keyring, read from stdin
    SetPassword,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn var_needs_name_and_equals() {
        assert_eq!(parse_var("ssid=2"), Ok(("ssid".into(), "2".into())));
        assert_eq!(parse_var("x=a=b"), Ok(("x".into(), "a=b".into())));
        assert!(parse_var("ssid").is_err());
        assert!(parse_var("=2").is_err());
    }
}
