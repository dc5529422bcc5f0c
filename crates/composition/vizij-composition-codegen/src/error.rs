use thiserror::Error;
use vizij_composition_core::{CompositionError, ObjectId};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CodegenError {
    /// Graph validation or optimization failed.
    #[error(transparent)]
    Composition(#[from] CompositionError),

    /// A reachable object has no entry in the supplied name table.
    #[error("object {0} has no generated name")]
    Unnamed(ObjectId),

    #[error("formatting generated source failed")]
    Format(#[from] std::fmt::Error),
}

pub type Result<T, E = CodegenError> = std::result::Result<T, E>;
