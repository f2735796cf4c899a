//! Pass trait for the rewrite pipeline.
//!
//! Every rewrite and cleanup step implements [`ScriptPass`]. Passes do not
//! declare their own order; the engine runs them in the fixed order the
//! pipeline defines:
//!
//! 1. **Decoder call resolution**: replace decoder calls with table entries
//! 2. **Constant folding**: replace statically known expressions
//! 3. **Alias inlining**: copy literal constants into their references
//! 4. **Property normalization**: `obj["name"]` to `obj.name`
//!
//! After the loop reaches a fixed point (or its bound), the dead code pass runs
//! exactly once.

use swc_core::ecma::ast::Script;

use crate::deobfuscation::{changes::EventLog, state::IterationState};

/// A rewrite over the whole script tree.
///
/// Passes must be thread-safe (Send + Sync) so an engine can be shared, but
/// each run is sequential. A pass collects any binding information it needs
/// fresh at the start of `run`; it must not keep tree-derived data between
/// calls.
pub trait ScriptPass: Send + Sync {
    /// Unique name for logging and debugging.
    fn name(&self) -> &'static str;

    /// Get a description of what this pass does.
    fn description(&self) -> &'static str {
        "No description available"
    }

    /// Should this pass run in the current iteration?
    ///
    /// Override to skip iterations where the pass has nothing to work with
    /// (e.g. decoder resolution before the decoder is found).
    fn should_run(&self, _state: &IterationState<'_>) -> bool {
        true
    }

    /// Runs the pass on the tree.
    ///
    /// # Arguments
    ///
    /// * `script` - The tree to rewrite in place.
    /// * `state` - The snapshot for the current iteration.
    ///
    /// # Returns
    ///
    /// The rewrites performed; an empty log means nothing changed.
    fn run(&self, script: &mut Script, state: &IterationState<'_>) -> EventLog;
}
