//! Recognition of the string-table loader and decoder shapes.
//!
//! The obfuscation scheme emits two cooperating function declarations:
//!
//! ```text
//! function _0x4e() {                       // loader
//!     var t = ["log", "Hello", ...];
//!     _0x4e = function () { return t; };
//!     return _0x4e();
//! }
//! function _0x2b(a, b) {                   // decoder
//!     var t = _0x4e();
//!     return _0x2b = function (i, k) {
//!         i = i - 0x1a3;
//!         var s = t[i];
//!         return s;
//!     }, _0x2b(a, b);
//! }
//! ```
//!
//! Each shape is an independent predicate over a single [`FnDecl`] returning
//! a [`ShapeMatch`]. The `find_*` functions apply a predicate to every function
//! declaration of a script in pre-order and return the first match.
//! Parenthesized expressions are transparent to every predicate.

use std::fmt;

use swc_core::ecma::{
    ast::{
        AssignExpr, AssignOp, AssignTarget, BinaryOp, Decl, Expr, FnDecl, Function, Id, Ident, Lit,
        Script, SimpleAssignTarget, Stmt,
    },
    visit::{Visit, VisitWith},
};

use crate::deobfuscation::passes::utils::{callee_expr, integer_literal, unparen};

/// Result of testing a node against a shape.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeMatch<T> {
    /// The node does not have the shape.
    NoMatch,
    /// The node has the shape; the captured data is attached.
    Match(T),
}

impl<T> ShapeMatch<T> {
    /// Converts into an `Option` of the captured data.
    pub fn into_option(self) -> Option<T> {
        match self {
            ShapeMatch::Match(value) => Some(value),
            ShapeMatch::NoMatch => None,
        }
    }

    /// Returns `true` on a match.
    pub fn is_match(&self) -> bool {
        matches!(self, ShapeMatch::Match(_))
    }
}

/// The captured string table.
///
/// Ordered and zero-indexed; never modified after capture.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringTable {
    entries: Vec<String>,
}

impl StringTable {
    /// Returns the entry at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(String::as_str)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the entries in index order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}

impl From<Vec<String>> for StringTable {
    fn from(entries: Vec<String>) -> Self {
        Self { entries }
    }
}

/// A recognized string-table loader.
#[derive(Debug, Clone, PartialEq)]
pub struct LoaderShape {
    /// Declared name of the loader function
    pub name: String,
    /// The literal pool it returns
    pub table: StringTable,
}

/// A recognized decoder.
#[derive(Debug, Clone, PartialEq)]
pub struct DecoderInfo {
    id: Id,
    offset: i64,
}

impl DecoderInfo {
    fn new(ident: &Ident, offset: i64) -> Self {
        Self {
            id: ident.to_id(),
            offset,
        }
    }

    /// Declared name of the decoder function.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.id.0
    }

    /// Constant subtracted from the argument before indexing the table.
    #[must_use]
    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// Returns `true` if `ident` resolves to the decoder declaration itself.
    #[must_use]
    pub fn is_decoder(&self, ident: &Ident) -> bool {
        ident.sym == self.id.0 && ident.ctxt == self.id.1
    }
}

impl fmt::Display for DecoderInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (offset {})", self.name(), self.offset)
    }
}

/// Tests a function declaration against the loader shape.
///
/// The body must be exactly three statements: a variable declaration whose
/// first initializer is an array of string literals, an expression statement
/// assigning a function expression to the function's own name, and a return.
#[must_use]
pub fn match_loader(decl: &FnDecl) -> ShapeMatch<LoaderShape> {
    let Some(body) = &decl.function.body else {
        return ShapeMatch::NoMatch;
    };
    let [Stmt::Decl(Decl::Var(var)), Stmt::Expr(reassign), Stmt::Return(_)] = body.stmts.as_slice()
    else {
        return ShapeMatch::NoMatch;
    };

    let Some(Expr::Array(array)) = var.decls.first().and_then(|d| d.init.as_deref()).map(unparen)
    else {
        return ShapeMatch::NoMatch;
    };
    let mut entries = Vec::with_capacity(array.elems.len());
    for elem in &array.elems {
        match elem {
            Some(elem) if elem.spread.is_none() => match unparen(&elem.expr) {
                Expr::Lit(Lit::Str(s)) => entries.push(s.value.to_string()),
                _ => return ShapeMatch::NoMatch,
            },
            _ => return ShapeMatch::NoMatch,
        }
    }

    if !is_self_reassignment(unparen(&reassign.expr), &decl.ident) {
        return ShapeMatch::NoMatch;
    }

    ShapeMatch::Match(LoaderShape {
        name: decl.ident.sym.to_string(),
        table: StringTable::from(entries),
    })
}

/// Tests a function declaration against the decoder shape.
///
/// The body must be exactly two statements: a variable declaration initialized
/// by a call to the loader, and a return of a sequence expression whose first
/// element assigns a function expression to the function's own name. The
/// offset is taken from that inner function; without it there is no match.
#[must_use]
pub fn match_decoder(decl: &FnDecl, loader_name: &str) -> ShapeMatch<DecoderInfo> {
    if &*decl.ident.sym == loader_name {
        return ShapeMatch::NoMatch;
    }
    let Some(body) = &decl.function.body else {
        return ShapeMatch::NoMatch;
    };
    let [Stmt::Decl(Decl::Var(var)), Stmt::Return(ret)] = body.stmts.as_slice() else {
        return ShapeMatch::NoMatch;
    };

    let calls_loader = match var.decls.first().and_then(|d| d.init.as_deref()).map(unparen) {
        Some(Expr::Call(call)) => {
            matches!(callee_expr(&call.callee), Some(Expr::Ident(callee)) if &*callee.sym == loader_name)
        }
        _ => false,
    };
    if !calls_loader {
        return ShapeMatch::NoMatch;
    }

    let Some(Expr::Seq(seq)) = ret.arg.as_deref().map(unparen) else {
        return ShapeMatch::NoMatch;
    };
    let Some(Expr::Assign(first)) = seq.exprs.first().map(|e| unparen(e)) else {
        return ShapeMatch::NoMatch;
    };
    if first.op != AssignOp::Assign || !targets_ident(&first.left, &decl.ident) {
        return ShapeMatch::NoMatch;
    }
    let Expr::Fn(inner) = unparen(&first.right) else {
        return ShapeMatch::NoMatch;
    };

    match find_offset(&inner.function) {
        Some(offset) => ShapeMatch::Match(DecoderInfo::new(&decl.ident, offset)),
        None => ShapeMatch::NoMatch,
    }
}

/// Finds the first `x = x - <integer literal>` inside `function`, pre-order,
/// and returns the literal.
#[must_use]
pub fn find_offset(function: &Function) -> Option<i64> {
    struct OffsetSearch(Option<i64>);

    impl Visit for OffsetSearch {
        fn visit_assign_expr(&mut self, assign: &AssignExpr) {
            if self.0.is_some() {
                return;
            }
            if assign.op == AssignOp::Assign {
                if let AssignTarget::Simple(SimpleAssignTarget::Ident(target)) = &assign.left {
                    if let Expr::Bin(bin) = unparen(&assign.right) {
                        let same_var = matches!(
                            unparen(&bin.left),
                            Expr::Ident(left) if left.sym == target.id.sym
                        );
                        let literal = match unparen(&bin.right) {
                            lit @ Expr::Lit(Lit::Num(_)) => integer_literal(lit),
                            _ => None,
                        };
                        if bin.op == BinaryOp::Sub && same_var {
                            if let Some(offset) = literal {
                                self.0 = Some(offset);
                                return;
                            }
                        }
                    }
                }
            }
            assign.visit_children_with(self);
        }
    }

    let mut search = OffsetSearch(None);
    function.visit_with(&mut search);
    search.0
}

/// Returns the first function declaration of `script` with the loader shape.
#[must_use]
pub fn find_loader(script: &Script) -> Option<LoaderShape> {
    first_match(script, match_loader)
}

/// Returns the first function declaration of `script` with the decoder shape
/// for the given loader.
#[must_use]
pub fn find_decoder(script: &Script, loader_name: &str) -> Option<DecoderInfo> {
    first_match(script, |decl| match_decoder(decl, loader_name))
}

fn first_match<T>(script: &Script, matcher: impl Fn(&FnDecl) -> ShapeMatch<T>) -> Option<T> {
    struct Search<T, F> {
        matcher: F,
        found: Option<T>,
    }

    impl<T, F: Fn(&FnDecl) -> ShapeMatch<T>> Visit for Search<T, F> {
        fn visit_fn_decl(&mut self, decl: &FnDecl) {
            if self.found.is_some() {
                return;
            }
            if let ShapeMatch::Match(found) = (self.matcher)(decl) {
                self.found = Some(found);
                return;
            }
            decl.visit_children_with(self);
        }
    }

    let mut search = Search {
        matcher,
        found: None,
    };
    script.visit_with(&mut search);
    search.found
}

fn targets_ident(target: &AssignTarget, ident: &Ident) -> bool {
    matches!(
        target,
        AssignTarget::Simple(SimpleAssignTarget::Ident(binding)) if binding.id.sym == ident.sym
    )
}

fn is_self_reassignment(expr: &Expr, ident: &Ident) -> bool {
    match expr {
        Expr::Assign(assign) => {
            assign.op == AssignOp::Assign
                && targets_ident(&assign.left, ident)
                && matches!(unparen(&assign.right), Expr::Fn(_))
        }
        _ => false,
    }
}

/// Builds decoder info for the function declared as `name`, without checking
/// its shape.
#[cfg(test)]
pub(crate) fn find_decoder_named(script: &Script, name: &str) -> Option<DecoderInfo> {
    first_match(script, |decl| {
        if &*decl.ident.sym == name {
            ShapeMatch::Match(DecoderInfo::new(&decl.ident, 0))
        } else {
            ShapeMatch::NoMatch
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::JsScript;

    const LOADER: &str = r#"function A() { var d = ["x", "y"]; A = function () { return d; }; return A(); }"#;
    const DECODER: &str =
        "function B(a, b) { var c = A(); return B = function (e, f) { e = e - 5; var g = c[e]; return g; }, B(a, b); }";

    fn parse(source: &str) -> JsScript {
        JsScript::parse(source).expect("valid script")
    }

    #[test]
    fn recognizes_loader() {
        let script = parse(LOADER);
        let loader = find_loader(script.ast()).expect("loader");
        assert_eq!(loader.name, "A");
        assert_eq!(loader.table.len(), 2);
        assert_eq!(loader.table.get(1), Some("y"));
        assert_eq!(loader.table.get(2), None);
    }

    #[test]
    fn loader_requires_only_string_literals() {
        let script =
            parse("function A() { var d = ['x', 1]; A = function () { return d; }; return A(); }");
        assert!(find_loader(script.ast()).is_none());
    }

    #[test]
    fn loader_requires_self_reassignment() {
        let script =
            parse("function A() { var d = ['x']; C = function () { return d; }; return A(); }");
        assert!(find_loader(script.ast()).is_none());
    }

    #[test]
    fn recognizes_decoder_and_offset() {
        let script = parse(&format!("{LOADER}\n{DECODER}"));
        let decoder = find_decoder(script.ast(), "A").expect("decoder");
        assert_eq!(decoder.name(), "B");
        assert_eq!(decoder.offset(), 5);
    }

    #[test]
    fn parenthesized_forms_are_transparent() {
        let script = parse(
            "function B(a) { var c = (A()); return ((B = (function (e) { e = (e - (0x1a)); return c[e]; })), B(a)); }",
        );
        let decoder = find_decoder(script.ast(), "A").expect("decoder");
        assert_eq!(decoder.offset(), 26);
    }

    #[test]
    fn decoder_without_offset_does_not_match() {
        let script = parse(
            "function B(a) { var c = A(); return B = function (e) { return c[e]; }, B(a); }",
        );
        assert!(find_decoder(script.ast(), "A").is_none());
    }

    #[test]
    fn first_offset_wins() {
        let script = parse(
            "function B(a) { var c = A(); return B = function (e) { e = e - 3; e = e - 9; return c[e]; }, B(a); }",
        );
        assert_eq!(find_decoder(script.ast(), "A").map(|d| d.offset()), Some(3));
    }

    #[test]
    fn nested_declarations_are_searched() {
        let script = parse(&format!("(function () {{ {LOADER} }})();"));
        assert_eq!(find_loader(script.ast()).map(|l| l.name), Some("A".to_string()));
    }

    #[test]
    fn shape_match_helpers() {
        let hit: ShapeMatch<u8> = ShapeMatch::Match(1);
        assert!(hit.is_match());
        assert_eq!(hit.into_option(), Some(1));
        assert_eq!(ShapeMatch::<u8>::NoMatch.into_option(), None);
    }
}
