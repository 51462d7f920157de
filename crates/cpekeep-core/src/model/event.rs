// ── Reset events ──
//
// One record per suspected factory reset. Created by the reset detector,
// updated only by the restore orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Why a device was considered reset, in priority order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ResetReason {
    /// Uptime went backwards since the previous observation.
    UptimeRegression,
    /// Primary SSID looks like a factory default.
    DefaultSsid,
    /// A previously known PPPoE username is gone.
    CredentialLoss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum RestoreOutcome {
    Pending,
    Success,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetEvent {
    pub id: Uuid,
    pub serial_number: String,
    pub device_id: Option<String>,
    /// Highest-priority signal that fired.
    pub reason: ResetReason,
    /// Every signal that fired, in priority order.
    pub signals: Vec<ResetReason>,
    pub detected_at: DateTime<Utc>,
    pub outcome: RestoreOutcome,
    pub detail: Option<String>,
    pub uptime: Option<u64>,
    pub previous_uptime: Option<u64>,
    /// Hash of the configuration the device reported when the reset was seen.
    pub config_hash: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl ResetEvent {
    pub fn is_pending(&self) -> bool {
        self.outcome == RestoreOutcome::Pending
    }
}
