//! Decoder call resolution pass.
//!
//! Replaces every call of the string decoder (or of an alias of it) whose
//! argument evaluates to a number with the table entry it selects:
//!
//! ```text
//! var A = B;            var A = B;
//! log(A(0x1a3 - 0x19e)) log("hello")
//! ```
//!
//! The table index is `argument - offset`, where the offset is the constant the
//! decoder subtracts from its parameter. Calls whose argument is not statically
//! known, or whose index falls outside the table, are left untouched.
//!
//! Calls are resolved bottom-up, so a decoder call nested inside the argument
//! of another is replaced first.

use log::debug;
use swc_core::ecma::{
    ast::{Expr, Script},
    visit::{VisitMut, VisitMutWith},
};

use crate::deobfuscation::{
    alias::DecoderAliasResolver,
    bindings::BindingTable,
    changes::{EventKind, EventLog},
    detection::StringTable,
    evaluate::{Evaluator, JsValue},
    pass::ScriptPass,
    passes::utils::str_expr,
    state::IterationState,
};

/// Replaces decoder calls with the decoded string.
pub struct DecoderCallResolutionPass;

impl Default for DecoderCallResolutionPass {
    fn default() -> Self {
        Self::new()
    }
}

impl DecoderCallResolutionPass {
    /// Creates a new decoder call resolution pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ScriptPass for DecoderCallResolutionPass {
    fn name(&self) -> &'static str {
        "decoder_call_resolution"
    }

    fn description(&self) -> &'static str {
        "Replace calls of the string decoder and its aliases with string literals"
    }

    fn should_run(&self, state: &IterationState<'_>) -> bool {
        state.decoder.is_some()
    }

    fn run(&self, script: &mut Script, state: &IterationState<'_>) -> EventLog {
        let events = EventLog::new();
        let Some(decoder) = state.decoder else {
            return events;
        };

        let bindings = BindingTable::collect(script);
        let resolver = DecoderAliasResolver::new(&bindings, decoder.info);
        let mut visitor = CallResolver {
            resolver,
            evaluator: Evaluator::new(&bindings, state.unresolved_ctxt).with_decoder(resolver),
            table: decoder.table,
            offset: decoder.info.offset(),
            events: &events,
            pass: self.name(),
        };
        script.visit_mut_with(&mut visitor);

        events
    }
}

struct CallResolver<'a> {
    resolver: DecoderAliasResolver<'a>,
    evaluator: Evaluator<'a>,
    table: &'a StringTable,
    offset: i64,
    events: &'a EventLog,
    pass: &'static str,
}

impl CallResolver<'_> {
    /// Maps a decoder argument to its table entry.
    fn lookup(&self, argument: f64) -> Option<&str> {
        #[allow(clippy::cast_precision_loss)]
        let index = argument - self.offset as f64;
        if index.fract() != 0.0 || index < 0.0 || index >= self.table.len() as f64 {
            debug!(
                "Decoder argument {argument} maps to index {index}, outside table of {}",
                self.table.len()
            );
            return None;
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let index = index as usize;
        self.table.get(index)
    }
}

impl VisitMut for CallResolver<'_> {
    fn visit_mut_expr(&mut self, expr: &mut Expr) {
        expr.visit_mut_children_with(self);

        let Expr::Call(call) = expr else {
            return;
        };
        if !self.resolver.is_alias_callee(&call.callee) {
            return;
        }
        let [argument] = call.args.as_slice() else {
            return;
        };
        if argument.spread.is_some() {
            return;
        }

        let Some(JsValue::Number(value)) = self.evaluator.evaluate(&argument.expr).known() else {
            return;
        };
        let Some(entry) = self.lookup(value) else {
            return;
        };

        self.events
            .record(EventKind::StringDecoded)
            .message(format!("{value} -> {entry:?}"))
            .pass(self.pass);
        *expr = str_expr(entry);
    }
}
