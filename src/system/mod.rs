//! Detector orchestration.
//!
//! This module contains the top-level `PhotoDetector`, which owns the
//! reference library and the injected capabilities, along with its
//! configuration.

pub mod config;
mod photo_detector;

pub use config::DetectorConfig;
pub use photo_detector::PhotoDetector;
