// ── Dialect normalization ──
//
// Pure, synchronous resolution of vendor-neutral setting names against a
// device tree. Everything here is read-only and safe to call from any
// number of tasks at once.

pub mod accessor;
pub mod detect;
pub mod radio;
pub mod resolve;
pub mod table;

pub use accessor::{Accessor, infer_wire_type};
pub use detect::{Detection, DetectionRule, Dialect, detect, detect_dialect};
pub use radio::{BandIndex, BandLayout, resolve_bands};
pub use resolve::{IndexVars, PathResolver, resolve_pair};
pub use table::{PathTemplate, VendorOverride, list_paths};
