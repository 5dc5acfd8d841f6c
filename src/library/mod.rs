//! Reference library: the indexed images a query is identified against.
//!
//! - [`types`] - handles, group ids, geolocation and pending entries
//! - [`reference_library`] - the ordered image store

pub mod reference_library;
pub mod types;

pub use reference_library::{ReferenceImage, ReferenceInfo, ReferenceLibrary};
pub use types::{GeoPoint, GroupId, LibraryEntry, ReferenceHandle};
