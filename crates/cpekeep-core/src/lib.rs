//! Dialect normalization and configuration lifecycle for TR-069 CPEs.
//!
//! This crate owns everything between the raw parameter trees the ACS
//! hands out and the backups kept for each physical device:
//!
//! - **Normalization** ([`normalize`]): [`detect`] decides whether a tree
//!   is TR-098 or TR-181, the path table maps logical names such as
//!   `wifi.ssid` onto physical paths, [`resolve_bands`] finds which radio
//!   and SSID serve 2.4 GHz and 5 GHz, and the [`Accessor`] reads values
//!   and builds write instructions on top of all of it. Pure and
//!   synchronous.
//!
//! - **Backup** ([`backup`]): [`extract`] turns a tree into a canonical
//!   [`ConfigSnapshot`]; the [`ResetDetector`] compares each observation
//!   with the device's history to spot factory resets.
//!
//! - **Persistence** ([`store`]): the [`BackupStore`] trait plus a
//!   file-backed in-memory implementation. At most one snapshot per serial
//!   number is active.
//!
//! - **Restore** ([`RestoreOrchestrator`]): submits the active snapshot's
//!   write instructions as one batched task, with bounded retries.
//!
//! - **[`DeviceLifecycle`]**: the per-device pass tying the above
//!   together, and a bounded-parallel fleet scan.

pub mod backup;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod model;
pub mod normalize;
pub mod restore;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use backup::{Observation, ResetDetector, extract};
pub use config::{AcsConfig, Corroboration, EngineConfig, ResetPolicy, RestorePolicy, ScanPolicy};
pub use error::CoreError;
pub use lifecycle::{DeviceLifecycle, ProcessReport};
pub use restore::{RestoreOrchestrator, RestoreReport};
pub use store::{BackupStore, CommitOutcome, MemoryBackupStore, SerialLocks, commit_snapshot};

pub use model::{
    Band, ConfigSnapshot, DeviceHistory, DeviceTree, ParamValue, ResetEvent, ResetReason,
    RestoreOutcome, WriteInstruction,
};
pub use normalize::{Accessor, Detection, Dialect, IndexVars, PathResolver, detect, resolve_bands};
