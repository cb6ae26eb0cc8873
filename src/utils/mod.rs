//! Utility modules.

pub mod file;
pub mod text;

pub use file::{base_name, sanitize_filename};
pub use text::{normalize_blank_lines, preview};
