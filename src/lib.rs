use std::sync::OnceLock;

pub mod commands;
pub mod correlate;
pub mod dump;
pub mod error;
pub mod fields;
pub mod identifier;
pub mod key_index;
pub mod meta;
pub mod patch;
pub mod render_data;

/// Application-level verbosity
pub static VERBOSE: OnceLock<bool> = OnceLock::new();
