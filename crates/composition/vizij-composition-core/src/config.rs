//! Pipeline configuration for vizij-composition-core.

use serde::{Deserialize, Serialize};

/// Flags controlling the optimizer.
/// All flags default to off, which is the normal production setting.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Treat objects carrying comments or descriptions as eligible for merging.
    pub ignore_comments: bool,

    /// Keep properties that equal their category default (mainly for tests).
    pub disable_default_elision: bool,

    /// Skip the structural rewrites after copying.
    pub disable_tree_reduction: bool,
}
