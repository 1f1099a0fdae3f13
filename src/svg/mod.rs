//! Vector documents as level sources
//!
//! Levels are authored as vector drawings: named groups become layers,
//! labelled rects/circles/arcs mark spawn points and regions, and filled
//! paths become static collision geometry.

pub mod document;
pub mod layer;
pub mod path_data;
pub mod transform;

pub use document::VectorElement;
pub use layer::{ATTR_LABEL, Arc, Circle, Labeled, VectorLayer};
pub use path_data::parse_path_data;
pub use transform::parse_transform;
