//! Error types for the composition pipeline.
//!
//! Every error is fatal for the run that produced it; there is no partial output.

use thiserror::Error;

use crate::ids::ObjectId;
use crate::object::{AnimationValueKind, ObjectKind};

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum CompositionError {
    /// The graph's root id does not name an object.
    #[error("root object {root} does not exist")]
    MissingRoot { root: ObjectId },

    /// An object references an id outside the arena.
    #[error("object {from} references missing object {missing}")]
    DanglingReference { from: ObjectId, missing: ObjectId },

    /// The object graph is not acyclic.
    #[error("cycle detected: object {from} references its ancestor {to}")]
    Cycle { from: ObjectId, to: ObjectId },

    /// A literal keyframe value does not match the animation's value kind.
    #[error("keyframe {index} of animation {animation} does not hold a {expected:?} value")]
    KeyFrameKindMismatch {
        animation: ObjectId,
        index: usize,
        expected: AnimationValueKind,
    },

    /// The object category has no handler in this stage.
    #[error("unsupported object {id} of type '{type_name}' in {stage}")]
    Unsupported {
        id: ObjectId,
        type_name: String,
        stage: &'static str,
    },

    /// Mutation was attempted on an object frozen for sharing.
    #[error("object {id} ({kind}) is frozen")]
    Frozen { id: ObjectId, kind: ObjectKind },

    /// An internal consistency check failed.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

pub type Result<T, E = CompositionError> = std::result::Result<T, E>;
