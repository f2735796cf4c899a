//! Dead code elimination pass.
//!
//! Runs once, after the rewrite loop has settled, on freshly collected
//! bindings. It removes:
//!
//! - variable declarators nothing reads, when their initializer is absent or
//!   free of side effects
//! - function declarations nothing reads
//! - anti-analysis guard stubs: expression statements calling a function
//!   expression whose first statement is a `while` loop
//!
//! A declaration that is assigned anywhere outside its own declaring node is
//! kept, since removing it would turn the assignment into an implicit global.
//! `var` statements left without declarators are dropped.

use log::debug;
use swc_core::ecma::{
    ast::{Decl, Expr, FnDecl, Pat, Script, Stmt, VarDeclarator},
    visit::{VisitMut, VisitMutWith},
};

use crate::deobfuscation::{
    bindings::BindingTable,
    changes::{EventKind, EventLog},
    config::CleanupConfig,
    evaluate::Evaluator,
    pass::ScriptPass,
    passes::utils::{callee_expr, unparen},
    state::IterationState,
};

/// Removes unreferenced declarations and guard stubs.
pub struct DeadCodeEliminationPass {
    config: CleanupConfig,
}

impl Default for DeadCodeEliminationPass {
    fn default() -> Self {
        Self::new()
    }
}

impl DeadCodeEliminationPass {
    /// Creates a new dead code elimination pass with every removal enabled.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(CleanupConfig::default())
    }

    /// Creates a pass performing only the removals `config` enables.
    #[must_use]
    pub fn with_config(config: CleanupConfig) -> Self {
        Self { config }
    }
}

impl ScriptPass for DeadCodeEliminationPass {
    fn name(&self) -> &'static str {
        "dead_code_elimination"
    }

    fn description(&self) -> &'static str {
        "Remove unreferenced declarations and while-loop guard stubs"
    }

    fn should_run(&self, _state: &IterationState<'_>) -> bool {
        self.config.any_enabled()
    }

    fn run(&self, script: &mut Script, state: &IterationState<'_>) -> EventLog {
        let events = EventLog::new();
        let bindings = BindingTable::collect(script);

        let mut eliminator = Eliminator {
            config: &self.config,
            bindings: &bindings,
            evaluator: Evaluator::new(&bindings, state.unresolved_ctxt),
            events: &events,
            pass: self.name(),
        };
        script.visit_mut_with(&mut eliminator);

        events
    }
}

/// Returns `true` if `expr` calls a function expression whose body starts
/// with a `while` loop.
#[must_use]
pub fn is_guard_stub(expr: &Expr) -> bool {
    let Expr::Call(call) = unparen(expr) else {
        return false;
    };
    let Some(Expr::Fn(callee)) = callee_expr(&call.callee) else {
        return false;
    };

    matches!(
        callee.function.body.as_ref().and_then(|body| body.stmts.first()),
        Some(Stmt::While(_))
    )
}

struct Eliminator<'a> {
    config: &'a CleanupConfig,
    bindings: &'a BindingTable,
    evaluator: Evaluator<'a>,
    events: &'a EventLog,
    pass: &'static str,
}

impl Eliminator<'_> {
    fn is_unused_declarator(&self, declarator: &VarDeclarator) -> bool {
        let Pat::Ident(name) = &declarator.name else {
            return false;
        };
        let Some(binding) = self.bindings.get(&name.id) else {
            return false;
        };
        if binding.is_referenced() || binding.is_reassigned_externally() {
            return false;
        }

        match declarator.init.as_deref() {
            None => true,
            Some(init) if self.evaluator.is_side_effect_free(init) => true,
            Some(_) => {
                debug!(
                    "Keeping unreferenced `{}`: initializer may have side effects",
                    name.id.sym
                );
                false
            }
        }
    }

    fn is_unused_function(&self, decl: &FnDecl) -> bool {
        self.bindings
            .get(&decl.ident)
            .is_some_and(|binding| !binding.is_referenced() && !binding.is_reassigned_externally())
    }

    /// Returns `true` if `stmt` should be removed from its statement list.
    fn prune(&self, stmt: &mut Stmt) -> bool {
        match stmt {
            Stmt::Decl(Decl::Fn(decl))
                if self.config.remove_unreferenced && self.is_unused_function(decl) =>
            {
                self.events
                    .record(EventKind::DeclarationRemoved)
                    .message(format!("function `{}`", decl.ident.sym))
                    .pass(self.pass);
                true
            }
            Stmt::Decl(Decl::Var(var)) if self.config.remove_unreferenced => {
                let before = var.decls.len();
                var.decls.retain(|declarator| {
                    if !self.is_unused_declarator(declarator) {
                        return true;
                    }
                    if let Pat::Ident(name) = &declarator.name {
                        self.events
                            .record(EventKind::DeclarationRemoved)
                            .message(format!("variable `{}`", name.id.sym))
                            .pass(self.pass);
                    }
                    false
                });
                before > 0 && var.decls.is_empty()
            }
            Stmt::Expr(expr) if self.config.remove_guard_stubs && is_guard_stub(&expr.expr) => {
                self.events
                    .record(EventKind::GuardRemoved)
                    .message("while-loop guard IIFE")
                    .pass(self.pass);
                true
            }
            _ => false,
        }
    }
}

impl VisitMut for Eliminator<'_> {
    fn visit_mut_stmts(&mut self, stmts: &mut Vec<Stmt>) {
        stmts.visit_mut_children_with(self);
        stmts.retain_mut(|stmt| !self.prune(stmt));
    }
}

#[cfg(test)]
mod tests {
    use swc_core::common::SyntaxContext;

    use super::*;
    use crate::deobfuscation::passes::testing::{apply, canonical};

    fn eliminate(source: &str) -> (String, EventLog) {
        apply(&DeadCodeEliminationPass::new(), source)
    }

    #[test]
    fn test_removes_unreferenced_function() {
        let (code, events) = eliminate("function dead() {} function live() {} live();");
        assert_eq!(code, canonical("function live() {} live();"));
        assert_eq!(events.count_kind(EventKind::DeclarationRemoved), 1);
    }

    #[test]
    fn test_removes_unreferenced_declarators() {
        let (code, _) = eliminate("var a = 1, b = 2; var c = function () {}; var d; use(b);");
        assert_eq!(code, canonical("var b = 2; use(b);"));
    }

    #[test]
    fn test_keeps_side_effecting_initializers() {
        let source = "var a = f(); var b = x + 1;";
        let (code, events) = eliminate(source);
        assert_eq!(code, canonical(source));
        assert!(events.is_empty());
    }

    #[test]
    fn test_keeps_externally_assigned_declarations() {
        let source = "var a; a = 3; function g() {} g = null;";
        let (code, events) = eliminate(source);
        assert_eq!(code, canonical(source));
        assert!(events.is_empty());
    }

    #[test]
    fn test_removes_in_nested_blocks() {
        let (code, _) = eliminate("function f() { var unused = 1; return 2; } f();");
        assert_eq!(code, canonical("function f() { return 2; } f();"));
    }

    #[test]
    fn test_removes_guard_stubs() {
        let (code, events) = eliminate(
            "(function () { while (true) {} })(); !function () { while (true) {} }(); (function () { go(); })();",
        );
        assert_eq!(
            code,
            canonical("!function () { while (true) {} }(); (function () { go(); })();")
        );
        assert_eq!(events.count_kind(EventKind::GuardRemoved), 1);
    }

    #[test]
    fn test_respects_cleanup_config() {
        let pass = DeadCodeEliminationPass::with_config(CleanupConfig {
            remove_unreferenced: false,
            remove_guard_stubs: true,
        });
        let (code, _) = apply(&pass, "function dead() {} (function () { while (1) {} })();");
        assert_eq!(code, canonical("function dead() {}"));

        assert!(!DeadCodeEliminationPass::with_config(CleanupConfig::disabled())
            .should_run(&IterationState::without_decoder(1, SyntaxContext::empty())));
    }
}
