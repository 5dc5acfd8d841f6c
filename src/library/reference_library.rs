//! Ordered collection of indexed reference images.

use std::path::{Path, PathBuf};

use tracing::info;

use super::types::{GeoPoint, GroupId, ReferenceHandle};
use crate::features::{FeatureSet, OrbDescriptor};

/// An indexed reference image. Owns its features.
#[derive(Debug, Clone)]
pub struct ReferenceImage {
    pub handle: ReferenceHandle,
    pub group: GroupId,
    pub source_path: PathBuf,
    pub location: Option<GeoPoint>,
    pub features: FeatureSet,
}

impl ReferenceImage {
    /// Lightweight copy without the feature payload.
    pub fn info(&self) -> ReferenceInfo {
        ReferenceInfo {
            handle: self.handle,
            group: self.group,
            source_path: self.source_path.clone(),
            location: self.location,
            n_features: self.features.len(),
        }
    }
}

/// Identity of a reference image, as reported in results.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceInfo {
    pub handle: ReferenceHandle,
    pub group: GroupId,
    pub source_path: PathBuf,
    pub location: Option<GeoPoint>,
    pub n_features: usize,
}

/// Reference images in insertion order.
///
/// The position of an image in the library is its *slot*; correspondences
/// address reference images by slot. Slots are only invalidated by `clear`.
pub struct ReferenceLibrary {
    images: Vec<ReferenceImage>,
    next_handle: u64,
}

impl ReferenceLibrary {
    pub fn new() -> Self {
        Self {
            images: Vec::new(),
            next_handle: 0,
        }
    }

    /// Append a reference image and return its handle.
    pub fn push(
        &mut self,
        group: GroupId,
        source_path: &Path,
        location: Option<GeoPoint>,
        features: FeatureSet,
    ) -> ReferenceHandle {
        let handle = ReferenceHandle::new(self.next_handle);
        self.next_handle += 1;
        self.images.push(ReferenceImage {
            handle,
            group,
            source_path: source_path.to_path_buf(),
            location,
            features,
        });
        handle
    }

    /// Remove every reference image. Handles keep increasing afterwards.
    pub fn clear(&mut self) {
        info!(removed = self.images.len(), "reference library cleared");
        self.images.clear();
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Reference image stored at `slot`.
    pub fn get(&self, slot: usize) -> Option<&ReferenceImage> {
        self.images.get(slot)
    }

    /// Slot currently holding `handle`, if it is still in the library.
    pub fn slot_of(&self, handle: ReferenceHandle) -> Option<usize> {
        // handles are strictly increasing in slot order
        self.images
            .binary_search_by_key(&handle, |img| img.handle)
            .ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReferenceImage> {
        self.images.iter()
    }

    /// Descriptors of every slot, in slot order, for the matcher.
    pub fn descriptor_pool(&self) -> Vec<&[OrbDescriptor]> {
        self.images
            .iter()
            .map(|img| img.features.descriptors.as_slice())
            .collect()
    }
}

impl Default for ReferenceLibrary {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(byte: u8, n: usize) -> FeatureSet {
        FeatureSet {
            keypoints: vec![crate::features::Keypoint::new(0.0, 0.0, 1.0); n],
            descriptors: vec![[byte; 32]; n],
        }
    }

    #[test]
    fn test_push_preserves_order() {
        let mut lib = ReferenceLibrary::new();
        let a = lib.push(GroupId::new(1), Path::new("a.jpg"), None, features(1, 2));
        let b = lib.push(GroupId::new(2), Path::new("b.jpg"), None, features(2, 3));

        assert_eq!(lib.len(), 2);
        assert_eq!(lib.slot_of(a), Some(0));
        assert_eq!(lib.slot_of(b), Some(1));

        let pool = lib.descriptor_pool();
        assert_eq!(pool.len(), 2);
        assert_eq!(pool[0].len(), 2);
        assert_eq!(pool[1][0], [2u8; 32]);
    }

    #[test]
    fn test_clear_keeps_handles_unique() {
        let mut lib = ReferenceLibrary::new();
        let first = lib.push(GroupId::new(1), Path::new("a.jpg"), None, features(1, 1));
        lib.clear();
        assert!(lib.is_empty());
        assert!(lib.descriptor_pool().is_empty());
        assert_eq!(lib.slot_of(first), None);

        let second = lib.push(GroupId::new(1), Path::new("a.jpg"), None, features(1, 1));
        assert_ne!(first, second);
        assert_eq!(lib.slot_of(second), Some(0));
    }

    #[test]
    fn test_info_drops_features() {
        let mut lib = ReferenceLibrary::new();
        let location = Some(GeoPoint::new(48.85, 2.35));
        lib.push(GroupId::new(9), Path::new("x.jpg"), location, features(3, 4));
        let info = lib.get(0).unwrap().info();
        assert_eq!(info.group, GroupId::new(9));
        assert_eq!(info.location, location);
        assert_eq!(info.n_features, 4);
    }
}
