//! Runs the optimizer stages in order over one input graph.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::canonicalize::canonicalize;
use crate::config::OptimizerConfig;
use crate::error::Result;
use crate::graph::ObjectGraph;
use crate::object::ObjectKind;
use crate::optimize::copy_canonical;
use crate::reduce::{reduce, ReductionStats};
use crate::scene::SceneGraph;

/// Per-stage counts for one optimizer run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizeStats {
    /// Objects reachable from the input root.
    pub input_objects: usize,
    /// Canonical groups found.
    pub canonical_objects: usize,
    pub merged: BTreeMap<ObjectKind, usize>,
    pub reduction: ReductionStats,
    /// Objects reachable from the output root.
    pub output_objects: usize,
}

#[derive(Clone, Debug)]
pub struct Optimized {
    pub graph: SceneGraph,
    pub stats: OptimizeStats,
}

/// Build, canonicalize, copy and reduce `input`. The input is never modified.
pub fn optimize(input: &SceneGraph, config: &OptimizerConfig) -> Result<Optimized> {
    let graph = ObjectGraph::build(input)?;
    let input_objects = graph.len();
    let canon = canonicalize(graph, config);
    let mut output = copy_canonical(&canon, config)?;

    let reduction = if config.disable_tree_reduction {
        ReductionStats::default()
    } else {
        reduce(&mut output)?
    };

    let stats = OptimizeStats {
        input_objects,
        canonical_objects: canon.canonical_count(),
        merged: canon.merged().clone(),
        reduction,
        output_objects: output.reachable().len(),
    };
    log::debug!(
        "optimized {} -> {} objects",
        stats.input_objects,
        stats.output_objects
    );
    Ok(Optimized {
        graph: output,
        stats,
    })
}
