pub mod error;
pub mod features;
pub mod io;
pub mod library;
pub mod matching;
pub mod recognition;
pub mod system;

pub use error::DetectorError;
pub use library::{GeoPoint, GroupId, LibraryEntry, ReferenceHandle};
pub use recognition::{Decision, IdentifyOutcome, NoMatchReason};
pub use system::{DetectorConfig, PhotoDetector};
