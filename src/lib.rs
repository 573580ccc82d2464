//! Geometry preprocessing for mesh shading pipelines.
//!
//! The pipeline runs in three steps, each usable on its own:
//!
//! 1. [`generate_point_reps`] welds coincident vertices into point
//!    representatives without renumbering the mesh.
//! 2. [`convert_point_reps_to_adjacency`] finds, for every triangle edge, the
//!    triangle on the other side.
//! 3. [`compute_meshlets`] greedily groups the triangles of one or more face
//!    subsets into meshlets with bounded vertex and triangle counts.
//!
//! All functions are synchronous and keep no state between calls.

pub mod adjacency;
pub mod bounds;
pub mod clusterize;
pub mod error;
pub mod index;
pub mod packing;
pub mod partition;
pub mod utilities;
pub mod validate;
pub mod weld;

pub use crate::adjacency::*;
pub use crate::bounds::*;
pub use crate::clusterize::*;
pub use crate::error::*;
pub use crate::index::{MeshIndex, UNUSED32};
pub use crate::packing::*;
pub use crate::partition::*;
pub use crate::utilities::*;
pub use crate::validate::*;
pub use crate::weld::*;
