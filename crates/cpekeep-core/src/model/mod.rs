// ── Domain model ──
//
// Device trees as read from the ACS, and the records the engine persists
// about them.

pub mod event;
pub mod history;
pub mod snapshot;
pub mod tree;
pub mod value;

pub use event::{ResetEvent, ResetReason, RestoreOutcome};
pub use history::DeviceHistory;
pub use snapshot::{
    Band, ConfigSnapshot, LanConfig, WanConfig, WifiConfig, WriteInstruction, content_hash,
};
pub use tree::{DeviceTree, Leaf, Node};
pub use value::ParamValue;
