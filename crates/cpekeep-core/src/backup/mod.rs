// ── Backup and reset detection ──
//
// Snapshot extraction turns a tree into a canonical record; the reset
// detector decides when a device has lost that configuration.

pub mod extract;
pub mod reset;

pub use extract::{extract, extract_with};
pub use reset::{
    DefaultSsidRule, Observation, ResetCheck, ResetDetector, Verdict, match_default_ssid,
};
