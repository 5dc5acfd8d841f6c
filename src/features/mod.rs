//! Feature extraction: keypoints, binary descriptors and the extraction backend.
//!
//! Detection and description are provided by an external capability behind
//! [`FeatureBackend`]. This module only defines the data that flows out of it
//! and the ranking step applied between detection and description.

pub mod memory;
#[cfg(feature = "opencv")]
pub mod orb;
pub mod ranking;

use std::path::Path;

use anyhow::Result;
use nalgebra::Point2;

pub use memory::{InMemoryBackend, SyntheticImage, seeded_descriptor};
#[cfg(feature = "opencv")]
pub use orb::OrbBackend;
pub use ranking::{KeypointSupply, top_keypoints};

/// Length in bytes of an ORB descriptor (256 bits).
pub const DESCRIPTOR_BYTES: usize = 32;

/// ORB binary descriptor.
pub type OrbDescriptor = [u8; DESCRIPTOR_BYTES];

/// A detected, scored image location.
///
/// Mirrors the fields of an OpenCV keypoint so backends can convert losslessly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    /// Pixel coordinates (image frame).
    pub pt: Point2<f32>,
    pub size: f32,
    pub angle: f32,
    /// Detector response; larger is stronger.
    pub response: f32,
    pub octave: i32,
    pub class_id: i32,
}

impl Keypoint {
    /// Keypoint at `(x, y)` with the given response and neutral remaining fields.
    pub fn new(x: f32, y: f32, response: f32) -> Self {
        Self {
            pt: Point2::new(x, y),
            size: 7.0,
            angle: -1.0,
            response,
            octave: 0,
            class_id: -1,
        }
    }
}

/// Keypoints and their descriptors, aligned 1:1.
#[derive(Debug, Clone, Default)]
pub struct FeatureSet {
    pub keypoints: Vec<Keypoint>,
    pub descriptors: Vec<OrbDescriptor>,
}

impl FeatureSet {
    /// Number of described features.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// External detection / description capability.
///
/// Chosen once when the detector is constructed. Implementations must be
/// shareable across the worker threads used for bulk library construction.
pub trait FeatureBackend: Send + Sync {
    /// Decoded image type handed between the calls below.
    type Image;

    /// Decode the image at `path`. An unreadable file is an error.
    fn load_image(&self, path: &Path) -> Result<Self::Image>;

    /// Downscale so that the longest side is at most `max_side` pixels.
    /// Images already within bounds are returned unchanged.
    fn resize(&self, image: Self::Image, max_side: u32) -> Result<Self::Image>;

    /// Detect raw keypoints.
    fn detect(&self, image: &Self::Image) -> Result<Vec<Keypoint>>;

    /// Compute descriptors for `keypoints`.
    ///
    /// The backend may drop keypoints it cannot describe (e.g. too close to
    /// the border); the returned set is always aligned 1:1.
    fn describe(&self, image: &Self::Image, keypoints: Vec<Keypoint>) -> Result<FeatureSet>;
}

/// Target size of a `width` x `height` image whose longest side must not
/// exceed `max_side`, and the scale factor applied. `None` if it already fits.
pub(crate) fn downscaled_size(width: u32, height: u32, max_side: u32) -> Option<(u32, u32, f64)> {
    let longest = width.max(height);
    if longest <= max_side || longest == 0 {
        return None;
    }
    let scale = f64::from(max_side) / f64::from(longest);
    let scaled = |side: u32| ((f64::from(side) * scale).round() as u32).max(1);
    Some((scaled(width), scaled(height), scale))
}
