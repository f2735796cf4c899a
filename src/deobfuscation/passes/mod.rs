//! Built-in rewrite passes.
//!
//! Each pass rewrites the script tree in place and returns an
//! [`EventLog`](crate::deobfuscation::EventLog) describing what it changed.
//!
//! # Rewrite Loop
//!
//! The [`DeobfuscationEngine`](crate::deobfuscation::DeobfuscationEngine) runs
//! these passes in this order on every iteration, until an iteration leaves the
//! rendered script unchanged or the iteration bound is reached.
//!
//! | Pass | Description |
//! |------|-------------|
//! | [`DecoderCallResolutionPass`] | Replaces decoder calls (and calls through aliases) with table entries |
//! | [`ConstantFoldingPass`] | Replaces statically known expressions with literals |
//! | [`AliasInliningPass`] | Copies literal initializers of constant bindings into their reads |
//! | [`PropertyAccessNormalizationPass`] | Rewrites `obj["name"]` as `obj.name` |
//!
//! # Cleanup
//!
//! | Pass | Description |
//! |------|-------------|
//! | [`DeadCodeEliminationPass`] | Removes unreferenced declarations and guard stubs, once |
//!
//! Every pass collects the bindings it needs at the start of its run. Binding
//! information is never carried from one pass to the next, since every pass
//! may invalidate it.

mod constant_folding;
mod dead_code;
mod decoder_calls;
mod inlining;
mod property_access;
pub(crate) mod utils;

pub use self::constant_folding::ConstantFoldingPass;
pub use self::dead_code::{is_guard_stub, DeadCodeEliminationPass};
pub use self::decoder_calls::DecoderCallResolutionPass;
pub use self::inlining::AliasInliningPass;
pub use self::property_access::{is_dot_accessible, PropertyAccessNormalizationPass};

#[cfg(test)]
pub(crate) mod testing {
    //! Helpers for running a single pass over a source snippet.

    use crate::{
        deobfuscation::{
            changes::EventLog,
            detection::{find_decoder, find_loader},
            pass::ScriptPass,
            state::PipelineState,
        },
        script::JsScript,
    };

    /// A loader for `["hello", "world", "log"]` and its decoder `B`, offset 5.
    pub const PRELUDE: &str = "
        function A() {
            var d = ['hello', 'world', 'log'];
            A = function () { return d; };
            return A();
        }
        function B(e, f) {
            var c = A();
            return B = function (g, h) {
                g = g - 5;
                var i = c[g];
                return i;
            }, B(e, f);
        }
    ";

    /// Runs `pass` once over `source`, with loader and decoder discovered if
    /// present, and returns the rendered result.
    pub fn apply(pass: &dyn ScriptPass, source: &str) -> (String, EventLog) {
        let mut script = JsScript::parse(source).expect("test source parses");
        let events = script.enter(|ast, env| {
            let mut state = PipelineState::new();
            if let Some(loader) = find_loader(ast) {
                if let Some(decoder) = find_decoder(ast, &loader.name) {
                    state.latch_decoder(decoder);
                }
                state.latch_loader(loader);
            }
            pass.run(ast, &state.snapshot(env.unresolved_ctxt))
        });
        (script.render().expect("renders"), events)
    }

    /// Renders `source` unchanged, for comparison with pass output.
    pub fn canonical(source: &str) -> String {
        JsScript::parse(source)
            .and_then(|script| script.render())
            .expect("expected source parses")
    }
}
