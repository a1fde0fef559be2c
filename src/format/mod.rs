//! Speech storage format support
//!
//! Header detection and the per-codec frame size tables used by both the
//! reframer and the seek index builder.

pub mod detect;
pub mod tables;

pub use detect::{DetectedFormat, FormatDetector, PROBE_LEN};
