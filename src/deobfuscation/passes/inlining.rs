//! Alias inlining pass.
//!
//! Copies the initializer of every constant variable initialized with a literal
//! into each place that reads it:
//!
//! ```text
//! var z = 7;            var z = 7;
//! use(z, { z });   ->   use(7, { z: 7 });
//! ```
//!
//! The declaration itself is left in place; once nothing reads it, the dead code
//! pass removes it. References that precede the declaration in the same
//! function observe the variable before initialization and are not replaced.
//! Reads inside an earlier nested function run later and are replaced.

use rustc_hash::FxHashMap;
use swc_core::{
    common::Span,
    ecma::{
        ast::{Expr, Id, IdentName, KeyValueProp, Prop, PropName, Script, UnaryExpr, UnaryOp},
        visit::{VisitMut, VisitMutWith},
    },
};

use crate::deobfuscation::{
    bindings::BindingTable,
    changes::{EventKind, EventLog},
    pass::ScriptPass,
    state::IterationState,
};

/// Inlines constant bindings that hold a literal.
pub struct AliasInliningPass;

impl Default for AliasInliningPass {
    fn default() -> Self {
        Self::new()
    }
}

impl AliasInliningPass {
    /// Creates a new alias inlining pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ScriptPass for AliasInliningPass {
    fn name(&self) -> &'static str {
        "alias_inlining"
    }

    fn description(&self) -> &'static str {
        "Replace reads of constant literal bindings with the literal"
    }

    fn run(&self, script: &mut Script, _state: &IterationState<'_>) -> EventLog {
        let events = EventLog::new();
        let bindings = BindingTable::collect(script);

        let literals: FxHashMap<Id, Expr> = bindings
            .iter()
            .filter(|binding| binding.is_referenced())
            .filter_map(|binding| {
                binding
                    .literal_init()
                    .map(|literal| (binding.id().clone(), literal.clone()))
            })
            .collect();
        if literals.is_empty() {
            return events;
        }

        let mut inliner = Inliner {
            bindings: &bindings,
            literals,
            events: &events,
            pass: self.name(),
        };
        script.visit_mut_with(&mut inliner);

        events
    }
}

struct Inliner<'a> {
    bindings: &'a BindingTable,
    literals: FxHashMap<Id, Expr>,
    events: &'a EventLog,
    pass: &'static str,
}

impl Inliner<'_> {
    /// The literal to put in place of a read of `id` at `site`, if any.
    fn replacement(&self, id: &Id, site: Span) -> Option<Expr> {
        let literal = self.literals.get(id)?;
        let binding = self.bindings.get_by_id(id)?;
        if binding.is_referenced_before_declaration(site) {
            return None;
        }

        self.events
            .record(EventKind::ReferenceInlined)
            .message(format!("inlined `{}`", binding.name()))
            .pass(self.pass);
        Some(literal.clone())
    }
}

impl VisitMut for Inliner<'_> {
    fn visit_mut_expr(&mut self, expr: &mut Expr) {
        if let Expr::Ident(ident) = expr {
            if let Some(literal) = self.replacement(&ident.to_id(), ident.span) {
                *expr = literal;
            }
            return;
        }

        expr.visit_mut_children_with(self);
    }

    fn visit_mut_prop(&mut self, prop: &mut Prop) {
        if let Prop::Shorthand(ident) = prop {
            if let Some(literal) = self.replacement(&ident.to_id(), ident.span) {
                *prop = Prop::KeyValue(KeyValueProp {
                    key: PropName::Ident(IdentName::new(ident.sym.clone(), ident.span)),
                    value: Box::new(literal),
                });
            }
            return;
        }

        prop.visit_mut_children_with(self);
    }

    fn visit_mut_unary_expr(&mut self, unary: &mut UnaryExpr) {
        if unary.op == UnaryOp::Delete && matches!(&*unary.arg, Expr::Ident(_)) {
            return;
        }

        unary.visit_mut_children_with(self);
    }
}
