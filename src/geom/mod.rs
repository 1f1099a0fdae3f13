//! Level-load geometry: curve flattening, triangulation and shape compilation

pub mod compiler;
pub mod flatten;
pub mod shape;
pub mod triangulate;

pub use compiler::{CompiledGeometry, Degeneracy, GeometryCompiler, parse_physical_props};
pub use flatten::{FlatSegment, PathSegment, flatten};
pub use shape::{Aabb, PhysicalProps, Shape, ShapeDescriptor, polygon_signed_area};
pub use triangulate::EarClipper;
