//! Source-tree fingerprinting.

mod fingerprint;

pub use fingerprint::{primary_language, scan_tree, MARKER_DIRS, MARKER_FILES};
