//! Vizij Composition Codegen
//!
//! Turns an optimized composition graph into instantiator source code. The walk lives
//! in [`emit`]; everything language-specific is delegated to a [`Stringifier`], with
//! C# and C++/CX provided.
//!
//! [`generate`] runs the whole pipeline: optimize, name, emit.

pub mod config;
pub mod emit;
pub mod error;
pub mod stringify;
pub mod writer;

pub use config::CodegenConfig;
pub use emit::{emit, EmittedNode, GeneratedCode};
pub use error::{CodegenError, Result};
pub use stringify::{CSharpStringifier, CppCxStringifier, Stringifier};

use vizij_composition_core::{name_nodes, optimize, OptimizerConfig, SceneGraph};

/// Optimize `input` and emit source for the result. The input is never modified.
pub fn generate(
    input: &SceneGraph,
    optimizer: &OptimizerConfig,
    config: &CodegenConfig,
    stringifier: &dyn Stringifier,
) -> Result<GeneratedCode> {
    let optimized = optimize(input, optimizer)?;
    let names = name_nodes(&optimized.graph);
    log::info!(
        "generating {} for {} objects ({} input)",
        stringifier.language(),
        optimized.stats.output_objects,
        optimized.stats.input_objects
    );
    emit(&optimized.graph, &names, config, stringifier)
}
