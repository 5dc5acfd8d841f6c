//! File inputs: library manifests and detector configuration.

pub mod config;
pub mod manifest;

pub use config::load_config;
pub use manifest::load_manifest;
