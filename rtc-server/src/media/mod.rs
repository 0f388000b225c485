//! Media resolution from the on-disk faces/interactions tree

pub mod locator;
pub mod probe;

pub use locator::{content_type_for, select_closest, MediaFile, MediaLocator};
pub use probe::{DurationProbe, FfprobeProbe};
