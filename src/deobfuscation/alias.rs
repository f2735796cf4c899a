//! Decoder alias resolution.
//!
//! Obfuscated code rarely calls the decoder by its declared name. It copies
//! the function into local variables (`var _0x1f = _0x2b;`), sometimes
//! through several hops. [`DecoderAliasResolver::is_alias`] follows such
//! chains through constant variable bindings whose initializer is a plain
//! identifier.
//!
//! The chain walk is iterative with an explicit visited set, so a cyclic chain
//! (`var a = b; var b = a;`) terminates and resolves to "not an alias".

use log::debug;
use rustc_hash::FxHashSet;
use swc_core::ecma::ast::{Callee, Expr, Id, Ident};

use crate::deobfuscation::{
    bindings::BindingTable, detection::DecoderInfo, passes::utils::callee_expr,
};

/// Tests identifiers for being the decoder or an alias of it.
#[derive(Clone, Copy)]
pub struct DecoderAliasResolver<'a> {
    bindings: &'a BindingTable,
    decoder: &'a DecoderInfo,
}

impl<'a> DecoderAliasResolver<'a> {
    /// Creates a resolver over one snapshot of the script's bindings.
    #[must_use]
    pub fn new(bindings: &'a BindingTable, decoder: &'a DecoderInfo) -> Self {
        Self { bindings, decoder }
    }

    /// Returns `true` if `ident` refers to the decoder, directly or through a
    /// chain of constant aliases.
    #[must_use]
    pub fn is_alias(&self, ident: &Ident) -> bool {
        let mut visited: FxHashSet<Id> = FxHashSet::default();
        let mut current = ident;

        loop {
            if self.decoder.is_decoder(current) {
                return true;
            }
            if !visited.insert(current.to_id()) {
                debug!("Alias chain through `{}` is cyclic", current.sym);
                return false;
            }

            let Some(target) = self
                .bindings
                .get(current)
                .and_then(|binding| binding.alias_target())
            else {
                return false;
            };
            current = target;
        }
    }

    /// Returns `true` if `callee` is the decoder or an alias of it.
    #[must_use]
    pub fn is_alias_callee(&self, callee: &Callee) -> bool {
        matches!(callee_expr(callee), Some(Expr::Ident(ident)) if self.is_alias(ident))
    }
}

#[cfg(test)]
mod tests {
    use swc_core::ecma::{
        ast::{CallExpr, Script},
        visit::{Visit, VisitWith},
    };

    use super::*;
    use crate::{deobfuscation::detection::find_decoder_named, script::JsScript};

    /// Collects `(callee name, is alias)` for every call in the script.
    fn classify(source: &str) -> Vec<(String, bool)> {
        struct Calls<'r>(DecoderAliasResolver<'r>, Vec<(String, bool)>);
        impl Visit for Calls<'_> {
            fn visit_call_expr(&mut self, call: &CallExpr) {
                if let Some(Expr::Ident(ident)) = callee_expr(&call.callee) {
                    self.1.push((ident.sym.to_string(), self.0.is_alias(ident)));
                }
                call.visit_children_with(self);
            }
        }

        let script = JsScript::parse(source).expect("valid script");
        let ast: &Script = script.ast();
        let bindings = BindingTable::collect(ast);
        let decoder = find_decoder_named(ast, "B").expect("decoder declared");
        let mut calls = Calls(DecoderAliasResolver::new(&bindings, &decoder), Vec::new());
        ast.visit_with(&mut calls);
        calls.1
    }

    #[test]
    fn follows_alias_chains() {
        let calls = classify("function B(x) {} var k = B; var j = k; B(1); k(2); j(3); other(4);");
        assert_eq!(
            calls,
            vec![
                ("B".to_string(), true),
                ("k".to_string(), true),
                ("j".to_string(), true),
                ("other".to_string(), false),
            ]
        );
    }

    #[test]
    fn reassigned_aliases_are_not_followed() {
        let calls = classify("function B(x) {} var k = B; k = other; k(1);");
        assert_eq!(calls, vec![("k".to_string(), false)]);
    }

    #[test]
    fn shadowing_name_is_not_the_decoder() {
        let calls = classify("function B(x) {} function f(B) { B(1); }");
        assert_eq!(calls, vec![("B".to_string(), false)]);
    }

    #[test]
    fn cycles_resolve_to_false() {
        let calls = classify("function B(x) {} var p = q; var q = p; p(1);");
        assert_eq!(calls, vec![("p".to_string(), false)]);
    }
}
