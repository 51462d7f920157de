// ── Factory-reset detection ──
//
// Compares each observation of a device against its stored history. The
// signals are heuristics; every event records which of them fired so a
// misfire can be audited later.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::{Corroboration, ResetPolicy};
use crate::error::CoreError;
use crate::model::{Band, DeviceHistory, ParamValue, ResetEvent, ResetReason, RestoreOutcome};
use crate::normalize::{Accessor, IndexVars};
use crate::store::BackupStore;

/// What one inform told us about the device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Observation {
    /// Seconds since boot.
    pub uptime: Option<u64>,
    /// Primary SSID: 2.4 GHz when present, else 5 GHz.
    pub ssid: Option<String>,
    pub pppoe_username: Option<String>,
}

impl Observation {
    pub fn from_accessor(acc: &Accessor<'_>) -> Self {
        let none = IndexVars::new();
        let ssid = [Band::Ghz24, Band::Ghz5]
            .into_iter()
            .find_map(|band| acc.get_band(&["wifi.ssid"], band))
            .map(ParamValue::as_text);
        Self {
            uptime: acc.get("device.uptime", &none).and_then(ParamValue::as_u64),
            ssid,
            pppoe_username: acc.get("wan.ppp.username", &none).map(ParamValue::as_text),
        }
    }
}

// ── Default SSID heuristics ──────────────────────────────────────────

/// Which default-SSID rule matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "rule", content = "fragment", rename_all = "kebab-case")]
pub enum DefaultSsidRule {
    VendorFragment(&'static str),
    FactoryToken(&'static str),
    EmbedsSerial,
    ShortOrNumeric,
}

/// Vendor and model fragments that show up in factory SSIDs.
const VENDOR_FRAGMENTS: &[&str] = &[
    "tp-link", "tplink", "archer", "deco", "intelbras", "twibi", "wi-force", "action", "zte",
    "zxhn", "f670", "f680", "huawei", "hg8", "eg8", "ont", "fiberhome", "an55", "hg6",
    "multilaser",
];

const FACTORY_TOKENS: &[&str] = &["default", "setup", "wireless"];

/// Match `ssid` against the default-SSID rules, in order.
pub fn match_default_ssid(ssid: &str, serial: Option<&str>) -> Option<DefaultSsidRule> {
    let lower = ssid.trim().to_lowercase();

    if let Some(f) = VENDOR_FRAGMENTS.iter().copied().find(|f| lower.contains(f)) {
        return Some(DefaultSsidRule::VendorFragment(f));
    }
    if let Some(t) = FACTORY_TOKENS.iter().copied().find(|t| lower.contains(t)) {
        return Some(DefaultSsidRule::FactoryToken(t));
    }
    if let Some(serial) = serial.map(str::trim).filter(|s| !s.is_empty()) {
        if lower.contains(&serial.to_lowercase()) {
            return Some(DefaultSsidRule::EmbedsSerial);
        }
    }
    if lower.chars().count() < 4 || lower.chars().all(|c| c.is_ascii_digit()) {
        return Some(DefaultSsidRule::ShortOrNumeric);
    }
    None
}

// ── Detector ─────────────────────────────────────────────────────────

/// Outcome of evaluating one observation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Verdict {
    /// Fired signals, highest priority first.
    pub signals: Vec<ResetReason>,
    pub default_ssid: Option<DefaultSsidRule>,
    pub triggered: bool,
}

impl Verdict {
    /// Primary reason for the event.
    pub fn reason(&self) -> Option<ResetReason> {
        self.signals.first().copied()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResetDetector {
    policy: ResetPolicy,
}

impl ResetDetector {
    pub fn new(policy: ResetPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ResetPolicy {
        &self.policy
    }

    /// Evaluate an observation against the device's history. Pure.
    ///
    /// A device that was never seen before produces no signals.
    pub fn evaluate(
        &self,
        obs: &Observation,
        serial: &str,
        history: Option<&DeviceHistory>,
    ) -> Verdict {
        let Some(history) = history else {
            return Verdict::default();
        };
        let mut verdict = Verdict::default();

        if let (Some(prev), Some(now)) = (history.last_uptime, obs.uptime) {
            if now < prev {
                verdict.signals.push(ResetReason::UptimeRegression);
            }
        }

        let threshold = self.policy.uptime_threshold.as_secs();
        if obs.uptime.is_some_and(|u| u < threshold) {
            verdict.default_ssid = obs
                .ssid
                .as_deref()
                .and_then(|s| match_default_ssid(s, Some(serial)));
            if verdict.default_ssid.is_some() {
                verdict.signals.push(ResetReason::DefaultSsid);
            }

            let had_username = history
                .last_pppoe_username
                .as_deref()
                .is_some_and(|u| !u.trim().is_empty());
            let has_username = obs
                .pppoe_username
                .as_deref()
                .is_some_and(|u| !u.trim().is_empty());
            if had_username && !has_username {
                verdict.signals.push(ResetReason::CredentialLoss);
            }
        }

        verdict.signals.sort();
        verdict.triggered = match self.policy.corroboration {
            Corroboration::Single => !verdict.signals.is_empty(),
            Corroboration::Corroborated => {
                verdict.signals.contains(&ResetReason::UptimeRegression)
                    || (verdict.signals.contains(&ResetReason::DefaultSsid)
                        && verdict.signals.contains(&ResetReason::CredentialLoss))
            }
        };
        verdict
    }

    /// Evaluate an observation, record a pending event when it triggers,
    /// and fold the observation into the device's history.
    ///
    /// The caller must hold the serial's lock. A second observation of the
    /// same boot (an event already exists since the device came up) does
    /// not create another event, but the returned check still reports the
    /// boot as reset.
    pub fn observe(
        &self,
        store: &dyn BackupStore,
        serial: &str,
        device_id: Option<&str>,
        obs: &Observation,
        config_hash: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<ResetCheck, CoreError> {
        let history = store.device_history(serial)?;
        let verdict = self.evaluate(obs, serial, history.as_ref());
        let boot_event = event_this_boot(store, serial, obs, now)?;

        let mut check = ResetCheck {
            unresolved: boot_event
                .as_ref()
                .is_some_and(|e| e.outcome != RestoreOutcome::Success),
            event: None,
            verdict,
        };

        match check.verdict.reason() {
            Some(reason) if check.verdict.triggered => {
                if boot_event.is_some() {
                    debug!(serial, "reset already recorded for this boot");
                } else {
                    let event = ResetEvent {
                        id: Uuid::new_v4(),
                        serial_number: serial.to_owned(),
                        device_id: device_id.map(String::from),
                        reason,
                        signals: check.verdict.signals.clone(),
                        detected_at: now,
                        outcome: RestoreOutcome::Pending,
                        detail: None,
                        uptime: obs.uptime,
                        previous_uptime: history.as_ref().and_then(|h| h.last_uptime),
                        config_hash: config_hash.map(String::from),
                        resolved_at: None,
                    };
                    warn!(
                        serial,
                        reason = %reason,
                        signals = ?check.verdict.signals,
                        uptime = ?obs.uptime,
                        "factory reset suspected"
                    );
                    store.insert_event(event.clone())?;
                    check.event = Some(event);
                    check.unresolved = true;
                }
            }
            Some(_) => {
                debug!(serial, signals = ?check.verdict.signals, "uncorroborated reset signal ignored");
            }
            None => {}
        }

        let updated = DeviceHistory::observe(
            history.as_ref(),
            obs.uptime,
            obs.pppoe_username.as_deref(),
            now,
        );
        store.record_history(serial, updated)?;
        Ok(check)
    }
}

/// Result of [`ResetDetector::observe`].
#[derive(Debug, Clone, Default)]
pub struct ResetCheck {
    pub verdict: Verdict,
    /// Event created by this observation.
    pub event: Option<ResetEvent>,
    /// The current boot has a reset event that was not restored
    /// successfully.
    pub unresolved: bool,
}

impl ResetCheck {
    /// Whether the tree may hold factory settings rather than the
    /// customer's. Backing it up would replace the snapshot a restore needs.
    pub fn suppresses_backup(&self) -> bool {
        self.verdict.triggered || self.unresolved
    }
}

/// Most recent event recorded since the device last booted.
fn event_this_boot(
    store: &dyn BackupStore,
    serial: &str,
    obs: &Observation,
    now: DateTime<Utc>,
) -> Result<Option<ResetEvent>, CoreError> {
    let Some(uptime) = obs.uptime.and_then(|u| i64::try_from(u).ok()) else {
        return Ok(None);
    };
    let booted_at = now - Duration::seconds(uptime);
    Ok(store
        .events(Some(serial), 1)?
        .into_iter()
        .next()
        .filter(|e| e.detected_at >= booted_at))
}
