//! Vizij Composition Core
//!
//! Typed composition scene graphs and the optimizer that turns one into a minimal,
//! deduplicated equivalent:
//!
//! - [`graph`] indexes the objects reachable from a root,
//! - [`canonicalize`] groups structurally equal objects,
//! - [`optimize`] copies one object per group into a fresh graph, dropping defaults,
//! - [`reduce`] removes and flattens redundant containers and transforms,
//! - [`naming`] assigns stable names for code generation.
//!
//! [`pipeline::optimize`] runs the stages in order. [`render::evaluate`] samples the
//! visible output of a graph and is used to check that optimization never changes it.

pub mod canonicalize;
pub mod config;
pub mod disjoint_set;
pub mod error;
pub mod graph;
pub mod ids;
pub mod math;
pub mod naming;
pub mod object;
pub mod optimize;
pub mod pipeline;
pub mod reduce;
pub mod render;
pub mod scene;

// Re-exports for consumers (code generators)
pub use canonicalize::CanonicalGraph;
pub use config::OptimizerConfig;
pub use error::{CompositionError, Result};
pub use graph::ObjectGraph;
pub use ids::{GraphId, ObjectId};
pub use math::{Color, Matrix3x2, Matrix4x4, Vector2, Vector3, Vector4};
pub use naming::{name_nodes, NodeNames};
pub use object::{Object, ObjectKind};
pub use pipeline::{optimize, OptimizeStats, Optimized};
pub use reduce::ReductionStats;
pub use scene::SceneGraph;
