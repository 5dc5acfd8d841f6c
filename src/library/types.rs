//! Identifier and location types for reference images.

use std::path::PathBuf;

use serde::Deserialize;

/// Stable handle of a reference image, returned when it is added.
///
/// Handles are assigned sequentially and never reused, even across library
/// resets, so a stale handle can never alias a newer image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReferenceHandle(pub u64);

impl ReferenceHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ReferenceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "REF{}", self.0)
    }
}

/// Opaque group a reference image belongs to (a place, a tour item, ...).
///
/// Several reference images may share a group; a query is identified by group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub u64);

impl GroupId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// WGS84 position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// A reference image waiting to be added to the library.
#[derive(Debug, Clone, PartialEq)]
pub struct LibraryEntry {
    pub path: PathBuf,
    pub group: GroupId,
    pub location: Option<GeoPoint>,
}

impl LibraryEntry {
    pub fn new(path: impl Into<PathBuf>, group: GroupId, location: Option<GeoPoint>) -> Self {
        Self {
            path: path.into(),
            group,
            location,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_display() {
        assert_eq!(format!("{}", ReferenceHandle::new(7)), "REF7");
    }

    #[test]
    fn test_group_as_hashmap_key() {
        use std::collections::HashMap;

        let mut groups: HashMap<GroupId, &str> = HashMap::new();
        groups.insert(GroupId::new(1), "museum");
        groups.insert(GroupId::new(2), "bridge");

        assert_eq!(groups.get(&GroupId::new(2)), Some(&"bridge"));
        assert_eq!(groups.get(&GroupId::new(3)), None);
    }
}
