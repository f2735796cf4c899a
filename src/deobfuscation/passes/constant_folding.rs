//! Constant folding pass.
//!
//! Replaces call, binary and member expressions, and variable initializers,
//! whose value the [`Evaluator`] knows with the equivalent literal:
//!
//! ```text
//! var n = 0x1f4 * 0x2 - 0x3e8;   ->   var n = 0;
//! f("ab" + "cd", "abc".length);  ->   f("abcd", 3);
//! ```
//!
//! Only finite numbers, strings and booleans are written back. Folding is
//! top-down: once an expression is replaced its children are not visited.
//! Decoder calls are never evaluated here; resolving them is the decoder pass's
//! job. Operands of `++`, `--` and `delete` are never replaced, since they are
//! references rather than values.

use swc_core::ecma::{
    ast::{Expr, Lit, Script, UnaryExpr, UnaryOp, UpdateExpr, VarDeclarator},
    visit::{VisitMut, VisitMutWith},
};

use crate::deobfuscation::{
    alias::DecoderAliasResolver,
    bindings::BindingTable,
    changes::{EventKind, EventLog},
    evaluate::{Evaluator, JsValue},
    pass::ScriptPass,
    passes::utils::{bool_expr, num_expr, str_expr},
    state::IterationState,
};

/// Folds statically known expressions into literals.
pub struct ConstantFoldingPass;

impl Default for ConstantFoldingPass {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstantFoldingPass {
    /// Creates a new constant folding pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ScriptPass for ConstantFoldingPass {
    fn name(&self) -> &'static str {
        "constant_folding"
    }

    fn description(&self) -> &'static str {
        "Replace calls, binary and member expressions with known values by literals"
    }

    fn run(&self, script: &mut Script, state: &IterationState<'_>) -> EventLog {
        let events = EventLog::new();
        let bindings = BindingTable::collect(script);

        let resolver = state
            .decoder
            .map(|decoder| DecoderAliasResolver::new(&bindings, decoder.info));
        let mut evaluator = Evaluator::new(&bindings, state.unresolved_ctxt);
        if let Some(resolver) = resolver {
            evaluator = evaluator.with_decoder(resolver);
        }

        let mut folder = Folder {
            evaluator,
            resolver,
            events: &events,
            pass: self.name(),
        };
        script.visit_mut_with(&mut folder);

        events
    }
}

/// Returns `true` if `expr` is already the literal the folder would produce.
fn is_canonical_literal(expr: &Expr) -> bool {
    match expr {
        Expr::Lit(Lit::Str(_) | Lit::Num(_) | Lit::Bool(_)) => true,
        Expr::Unary(UnaryExpr {
            op: UnaryOp::Minus,
            arg,
            ..
        }) => matches!(&**arg, Expr::Lit(Lit::Num(_))),
        _ => false,
    }
}

fn literal_for(value: &JsValue) -> Option<Expr> {
    match value {
        JsValue::Number(n) if n.is_finite() => Some(num_expr(*n)),
        JsValue::Number(_) => None,
        JsValue::String(s) => Some(str_expr(s)),
        JsValue::Bool(b) => Some(bool_expr(*b)),
    }
}

struct Folder<'a> {
    evaluator: Evaluator<'a>,
    resolver: Option<DecoderAliasResolver<'a>>,
    events: &'a EventLog,
    pass: &'static str,
}

impl Folder<'_> {
    /// Replaces `expr` if its value is known. Returns `true` on replacement.
    fn fold(&self, expr: &mut Expr) -> bool {
        let Some(value) = self.evaluator.evaluate(expr).known() else {
            return false;
        };
        let Some(literal) = literal_for(&value) else {
            return false;
        };

        self.events
            .record(EventKind::ConstantFolded)
            .message(format!("folded to {value}"))
            .pass(self.pass);
        *expr = literal;
        true
    }
}

impl VisitMut for Folder<'_> {
    fn visit_mut_expr(&mut self, expr: &mut Expr) {
        let candidate = match expr {
            Expr::Call(call) => !self
                .resolver
                .is_some_and(|resolver| resolver.is_alias_callee(&call.callee)),
            Expr::Bin(_) | Expr::Member(_) => true,
            _ => false,
        };
        if candidate && self.fold(expr) {
            return;
        }

        expr.visit_mut_children_with(self);
    }

    fn visit_mut_var_declarator(&mut self, declarator: &mut VarDeclarator) {
        if let Some(init) = declarator.init.as_deref_mut() {
            if !is_canonical_literal(init) && self.fold(init) {
                return;
            }
        }

        declarator.visit_mut_children_with(self);
    }

    fn visit_mut_update_expr(&mut self, update: &mut UpdateExpr) {
        update.arg.visit_mut_children_with(self);
    }

    fn visit_mut_unary_expr(&mut self, unary: &mut UnaryExpr) {
        if unary.op == UnaryOp::Delete {
            unary.arg.visit_mut_children_with(self);
        } else {
            unary.visit_mut_children_with(self);
        }
    }
}
