pub mod analyzer;
pub mod config;
pub mod export;
pub mod library;
pub mod sequence;

/// Application name for XDG paths
pub const APP_NAME: &str = "phaseline";
