//! Binding resolution over a scope-resolved script.
//!
//! After scope resolution every identifier carries the syntax context of the
//! scope that declared it, so `(symbol, context)` pairs identify bindings
//! exactly, shadowing included. [`BindingTable::collect`] walks the tree once and
//! records, per binding:
//!
//! - its declaration (kind, span, initializer snapshot)
//! - every read reference site, and which of them run before the declaration
//! - every constant violation (assignment or update after declaration)
//!
//! A table describes the tree as it was when collected. Any mutation of the tree
//! invalidates it; passes collect a fresh table before they look at bindings.

use rustc_hash::FxHashMap;
use swc_core::{
    common::{Span, Spanned},
    ecma::{
        ast::{
            ArrowExpr, AssignExpr, AssignOp, AssignTarget, CatchClause, ClassDecl, ClassExpr,
            Constructor, Expr, FnDecl, FnExpr, ForHead, ForInStmt, ForOfStmt, Function,
            GetterProp, Id, Ident, Lit, ObjectPatProp, Param, Pat, Prop, Script, SetterProp,
            SimpleAssignTarget, UpdateExpr, VarDecl, VarDeclKind,
        },
        visit::{Visit, VisitWith},
    },
};

use crate::deobfuscation::passes::utils::unparen;

/// How a binding was introduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    /// `var` declarator
    Var,
    /// `let` declarator
    Let,
    /// `const` declarator
    Const,
    /// Function declaration
    Function,
    /// Name of a named function expression, visible only inside it
    FunctionExpressionName,
    /// Function or arrow parameter
    Param,
    /// Class declaration or named class expression
    Class,
    /// `catch` clause parameter
    CatchParam,
}

impl BindingKind {
    /// Returns `true` for bindings introduced by a variable declarator.
    #[must_use]
    pub fn is_variable(self) -> bool {
        matches!(self, BindingKind::Var | BindingKind::Let | BindingKind::Const)
    }
}

impl From<VarDeclKind> for BindingKind {
    fn from(kind: VarDeclKind) -> Self {
        match kind {
            VarDeclKind::Var => BindingKind::Var,
            VarDeclKind::Let => BindingKind::Let,
            VarDeclKind::Const => BindingKind::Const,
        }
    }
}

/// A single binding and everything known about its uses.
#[derive(Debug, Clone)]
pub struct Binding {
    id: Id,
    kind: BindingKind,
    decl_span: Span,
    /// Span of the innermost function enclosing the declaration, `None` at top level.
    scope: Option<Span>,
    init: Option<Box<Expr>>,
    declarations: usize,
    references: Vec<Span>,
    early_references: Vec<Span>,
    violations: Vec<Span>,
}

impl Binding {
    fn new(
        id: Id,
        kind: BindingKind,
        decl_span: Span,
        scope: Option<Span>,
        init: Option<Box<Expr>>,
    ) -> Self {
        Self {
            id,
            kind,
            decl_span,
            scope,
            init,
            declarations: 0,
            references: Vec::new(),
            early_references: Vec::new(),
            violations: Vec::new(),
        }
    }

    /// The resolved identity of this binding.
    #[must_use]
    pub fn id(&self) -> &Id {
        &self.id
    }

    /// The declared name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.id.0
    }

    /// How the binding was introduced.
    #[must_use]
    pub fn kind(&self) -> BindingKind {
        self.kind
    }

    /// Span of the declaring node (declarator, function or parameter).
    #[must_use]
    pub fn decl_span(&self) -> Span {
        self.decl_span
    }

    /// The declarator initializer, as it was when the table was collected.
    #[must_use]
    pub fn init(&self) -> Option<&Expr> {
        self.init.as_deref()
    }

    /// A binding is constant when it is declared exactly once and never
    /// reassigned or updated afterwards.
    #[must_use]
    pub fn is_constant(&self) -> bool {
        self.declarations == 1 && self.violations.is_empty()
    }

    /// Read reference sites.
    #[must_use]
    pub fn references(&self) -> &[Span] {
        &self.references
    }

    /// Number of read references.
    #[must_use]
    pub fn reference_count(&self) -> usize {
        self.references.len()
    }

    /// Returns `true` if the binding is read anywhere.
    #[must_use]
    pub fn is_referenced(&self) -> bool {
        !self.references.is_empty()
    }

    /// Sites that assign to or update the binding after its declaration.
    #[must_use]
    pub fn violations(&self) -> &[Span] {
        &self.violations
    }

    /// Returns `true` if some assignment to this binding happens outside its own
    /// declaring node (e.g. outside the body of the function it names).
    #[must_use]
    pub fn is_reassigned_externally(&self) -> bool {
        self.violations
            .iter()
            .any(|site| !contains(self.decl_span, *site))
    }

    /// If this is a constant variable initialized with a plain identifier,
    /// returns that identifier.
    #[must_use]
    pub fn alias_target(&self) -> Option<&Ident> {
        if !self.kind.is_variable() || !self.is_constant() {
            return None;
        }
        match unparen(self.init()?) {
            Expr::Ident(target) => Some(target),
            _ => None,
        }
    }

    /// If this is a constant variable initialized with a literal, returns it.
    #[must_use]
    pub fn literal_init(&self) -> Option<&Expr> {
        if !self.kind.is_variable() || !self.is_constant() {
            return None;
        }
        let init = self.init()?;
        is_inlinable_literal(init).then_some(init)
    }

    /// Returns `true` if the read at `site` lies before the end of the
    /// declaration, in the same function as the declaration.
    ///
    /// Such a reference observes the binding before its initializer ran (or, for
    /// hoisted `var`, as `undefined`). Reads inside a nested function run when
    /// that function is called and are not early. Synthetic spans never precede
    /// anything.
    #[must_use]
    pub fn is_referenced_before_declaration(&self, site: Span) -> bool {
        !site.is_dummy() && self.early_references.contains(&site)
    }

    fn is_early(&self, site: Span, scope: Option<Span>) -> bool {
        if site.is_dummy() || self.decl_span.is_dummy() || scope != self.scope {
            return false;
        }
        site.lo < self.decl_span.hi && !contains(self.decl_span, site)
    }
}

/// Returns `true` for literal forms that may be copied into reference sites:
/// string, number (optionally negated), boolean, null and bigint literals.
#[must_use]
pub fn is_inlinable_literal(expr: &Expr) -> bool {
    match expr {
        Expr::Lit(Lit::Str(_) | Lit::Num(_) | Lit::Bool(_) | Lit::Null(_) | Lit::BigInt(_)) => {
            true
        }
        Expr::Unary(unary) if unary.op == swc_core::ecma::ast::UnaryOp::Minus => {
            matches!(&*unary.arg, Expr::Lit(Lit::Num(_)))
        }
        _ => false,
    }
}

fn contains(outer: Span, inner: Span) -> bool {
    outer.lo <= inner.lo && inner.hi <= outer.hi
}

/// All bindings of a script, keyed by resolved identity.
#[derive(Debug, Default)]
pub struct BindingTable {
    bindings: FxHashMap<Id, Binding>,
}

impl BindingTable {
    /// Collects the bindings of `script` as it is right now.
    #[must_use]
    pub fn collect(script: &Script) -> Self {
        let mut collector = Collector::default();
        script.visit_with(&mut collector);
        collector.finish()
    }

    /// Looks up the binding an identifier resolves to.
    #[must_use]
    pub fn get(&self, ident: &Ident) -> Option<&Binding> {
        self.bindings.get(&ident.to_id())
    }

    /// Looks up a binding by resolved identity.
    #[must_use]
    pub fn get_by_id(&self, id: &Id) -> Option<&Binding> {
        self.bindings.get(id)
    }

    /// Iterates over all bindings in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.values()
    }

    /// Number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns `true` if the script declares nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// A read site and the innermost function enclosing it.
type Site = (Span, Option<Span>);

#[derive(Default)]
struct Collector {
    bindings: FxHashMap<Id, Binding>,
    references: FxHashMap<Id, Vec<Site>>,
    violations: FxHashMap<Id, Vec<Span>>,
    scopes: Vec<Span>,
}

impl Collector {
    fn scope(&self) -> Option<Span> {
        self.scopes.last().copied()
    }

    fn in_scope(&mut self, span: Span, f: impl FnOnce(&mut Self)) {
        self.scopes.push(span);
        f(self);
        self.scopes.pop();
    }

    fn declare(&mut self, ident: &Ident, kind: BindingKind, span: Span, init: Option<Box<Expr>>) {
        let scope = self.scope();
        let binding = self
            .bindings
            .entry(ident.to_id())
            .or_insert_with(|| Binding::new(ident.to_id(), kind, span, scope, init));
        binding.declarations += 1;
    }

    fn declare_pattern(&mut self, pat: &Pat, kind: BindingKind) {
        let mut idents = Vec::new();
        pattern_idents(pat, &mut idents);
        for ident in idents {
            self.declare(ident, kind, ident.span, None);
        }
    }

    fn reference(&mut self, ident: &Ident) {
        let scope = self.scope();
        self.references
            .entry(ident.to_id())
            .or_default()
            .push((ident.span, scope));
    }

    fn violate(&mut self, ident: &Ident) {
        self.violations
            .entry(ident.to_id())
            .or_default()
            .push(ident.span);
    }

    fn violate_pattern(&mut self, pat: &Pat) {
        let mut idents = Vec::new();
        pattern_idents(pat, &mut idents);
        for ident in idents {
            self.violate(ident);
        }
    }

    fn violate_for_head(&mut self, head: &ForHead) {
        match head {
            ForHead::VarDecl(decl) => {
                for declarator in &decl.decls {
                    self.violate_pattern(&declarator.name);
                }
            }
            ForHead::Pat(pat) => self.violate_pattern(pat),
            ForHead::UsingDecl(_) => {}
        }
    }

    fn finish(mut self) -> BindingTable {
        for (id, sites) in self.references {
            if let Some(binding) = self.bindings.get_mut(&id) {
                binding.early_references = sites
                    .iter()
                    .filter(|&&(site, scope)| binding.is_early(site, scope))
                    .map(|&(site, _)| site)
                    .collect();
                binding.references = sites.into_iter().map(|(site, _)| site).collect();
            }
        }
        for (id, sites) in self.violations {
            if let Some(binding) = self.bindings.get_mut(&id) {
                binding.violations = sites;
            }
        }
        BindingTable {
            bindings: self.bindings,
        }
    }
}

impl Visit for Collector {
    fn visit_var_decl(&mut self, decl: &VarDecl) {
        let kind = BindingKind::from(decl.kind);
        for declarator in &decl.decls {
            match &declarator.name {
                Pat::Ident(name) => {
                    self.declare(&name.id, kind, declarator.span, declarator.init.clone());
                }
                pat => self.declare_pattern(pat, kind),
            }
        }
        decl.visit_children_with(self);
    }

    fn visit_fn_decl(&mut self, decl: &FnDecl) {
        self.declare(&decl.ident, BindingKind::Function, decl.function.span, None);
        decl.visit_children_with(self);
    }

    fn visit_fn_expr(&mut self, expr: &FnExpr) {
        if let Some(ident) = &expr.ident {
            self.declare(
                ident,
                BindingKind::FunctionExpressionName,
                expr.function.span,
                None,
            );
        }
        expr.visit_children_with(self);
    }

    fn visit_class_decl(&mut self, decl: &ClassDecl) {
        self.declare(&decl.ident, BindingKind::Class, decl.class.span, None);
        decl.visit_children_with(self);
    }

    fn visit_class_expr(&mut self, expr: &ClassExpr) {
        if let Some(ident) = &expr.ident {
            self.declare(ident, BindingKind::Class, expr.class.span, None);
        }
        expr.visit_children_with(self);
    }

    fn visit_param(&mut self, param: &Param) {
        self.declare_pattern(&param.pat, BindingKind::Param);
        param.visit_children_with(self);
    }

    fn visit_function(&mut self, function: &Function) {
        self.in_scope(function.span, |c| function.visit_children_with(c));
    }

    fn visit_arrow_expr(&mut self, arrow: &ArrowExpr) {
        self.in_scope(arrow.span, |c| {
            for pat in &arrow.params {
                c.declare_pattern(pat, BindingKind::Param);
            }
            arrow.visit_children_with(c);
        });
    }

    fn visit_constructor(&mut self, ctor: &Constructor) {
        self.in_scope(ctor.span, |c| ctor.visit_children_with(c));
    }

    fn visit_getter_prop(&mut self, getter: &GetterProp) {
        self.in_scope(getter.span, |c| getter.visit_children_with(c));
    }

    fn visit_setter_prop(&mut self, setter: &SetterProp) {
        self.in_scope(setter.span, |c| setter.visit_children_with(c));
    }

    fn visit_catch_clause(&mut self, clause: &CatchClause) {
        if let Some(param) = &clause.param {
            self.declare_pattern(param, BindingKind::CatchParam);
        }
        clause.visit_children_with(self);
    }

    fn visit_for_in_stmt(&mut self, stmt: &ForInStmt) {
        self.violate_for_head(&stmt.left);
        stmt.visit_children_with(self);
    }

    fn visit_for_of_stmt(&mut self, stmt: &ForOfStmt) {
        self.violate_for_head(&stmt.left);
        stmt.visit_children_with(self);
    }

    fn visit_assign_expr(&mut self, assign: &AssignExpr) {
        match &assign.left {
            AssignTarget::Simple(SimpleAssignTarget::Ident(target)) => {
                self.violate(&target.id);
                // Compound assignments read the old value.
                if assign.op != AssignOp::Assign {
                    self.reference(&target.id);
                }
            }
            // The wrapped identifier is also visited below as a read.
            AssignTarget::Simple(SimpleAssignTarget::Paren(paren)) => {
                if let Expr::Ident(target) = unparen(&paren.expr) {
                    self.violate(target);
                }
            }
            AssignTarget::Pat(pat) => {
                let mut idents = Vec::new();
                match pat {
                    swc_core::ecma::ast::AssignTargetPat::Array(array) => {
                        for elem in array.elems.iter().flatten() {
                            pattern_idents(elem, &mut idents);
                        }
                    }
                    swc_core::ecma::ast::AssignTargetPat::Object(object) => {
                        for prop in &object.props {
                            object_prop_idents(prop, &mut idents);
                        }
                    }
                    swc_core::ecma::ast::AssignTargetPat::Invalid(_) => {}
                }
                for ident in idents {
                    self.violate(ident);
                }
            }
            AssignTarget::Simple(_) => {}
        }
        assign.visit_children_with(self);
    }

    fn visit_update_expr(&mut self, update: &UpdateExpr) {
        if let Expr::Ident(target) = unparen(&update.arg) {
            self.violate(target);
        }
        update.visit_children_with(self);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        if let Expr::Ident(ident) = expr {
            self.reference(ident);
        }
        expr.visit_children_with(self);
    }

    fn visit_prop(&mut self, prop: &Prop) {
        if let Prop::Shorthand(ident) = prop {
            self.reference(ident);
        }
        prop.visit_children_with(self);
    }
}

/// Collects the identifiers bound by a pattern, left to right.
fn pattern_idents<'a>(pat: &'a Pat, out: &mut Vec<&'a Ident>) {
    match pat {
        Pat::Ident(binding) => out.push(&binding.id),
        Pat::Array(array) => {
            for elem in array.elems.iter().flatten() {
                pattern_idents(elem, out);
            }
        }
        Pat::Rest(rest) => pattern_idents(&rest.arg, out),
        Pat::Object(object) => {
            for prop in &object.props {
                object_prop_idents(prop, out);
            }
        }
        Pat::Assign(assign) => pattern_idents(&assign.left, out),
        Pat::Invalid(_) | Pat::Expr(_) => {}
    }
}

fn object_prop_idents<'a>(prop: &'a ObjectPatProp, out: &mut Vec<&'a Ident>) {
    match prop {
        ObjectPatProp::KeyValue(kv) => pattern_idents(&kv.value, out),
        ObjectPatProp::Assign(assign) => out.push(&assign.key.id),
        ObjectPatProp::Rest(rest) => pattern_idents(&rest.arg, out),
    }
}

impl Spanned for Binding {
    fn span(&self) -> Span {
        self.decl_span
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::JsScript;

    fn table(source: &str) -> BindingTable {
        let script = JsScript::parse(source).expect("valid script");
        BindingTable::collect(script.ast())
    }

    fn by_name<'a>(table: &'a BindingTable, name: &str) -> &'a Binding {
        table
            .iter()
            .find(|b| b.name() == name)
            .unwrap_or_else(|| panic!("no binding named {name}"))
    }

    #[test]
    fn counts_reads_but_not_declarations() {
        let table = table("var z = 7; use(z); use(z);");
        let z = by_name(&table, "z");
        assert_eq!(z.kind(), BindingKind::Var);
        assert!(z.is_constant());
        assert_eq!(z.reference_count(), 2);
        assert!(z.literal_init().is_some());
    }

    #[test]
    fn assignments_break_constness() {
        let table = table("var a = 1; a = 2; var b = 1; b++; var c = 1; var c = 2;");
        assert!(!by_name(&table, "a").is_constant());
        assert!(!by_name(&table, "b").is_constant());
        assert!(!by_name(&table, "c").is_constant());
    }

    #[test]
    fn compound_assignment_is_a_read() {
        let table = table("var total = 0; total += 1;");
        let total = by_name(&table, "total");
        assert!(total.is_referenced());
        assert!(!total.is_constant());
    }

    #[test]
    fn shadowed_names_are_distinct_bindings() {
        let table = table("var x = 1; function f(x) { return x; } f(2);");
        let xs: Vec<&Binding> = table.iter().filter(|b| b.name() == "x").collect();
        assert_eq!(xs.len(), 2);

        let outer = xs.iter().find(|b| b.kind() == BindingKind::Var).unwrap();
        let param = xs.iter().find(|b| b.kind() == BindingKind::Param).unwrap();
        assert_eq!(outer.reference_count(), 0);
        assert_eq!(param.reference_count(), 1);
    }

    #[test]
    fn self_reassignment_stays_internal() {
        let table = table("function A() { A = function () { return 1; }; return A(); }");
        let a = by_name(&table, "A");
        assert!(!a.is_constant());
        assert!(!a.is_reassigned_externally());
        assert!(a.is_referenced());
    }

    #[test]
    fn external_reassignment_is_detected() {
        let table = table("function g() {} g = null;");
        assert!(by_name(&table, "g").is_reassigned_externally());
    }

    #[test]
    fn alias_target_requires_identifier_initializer() {
        let table = table("function B() {} var k = B; var j = (k); var n = B();");
        assert_eq!(
            by_name(&table, "k").alias_target().map(|i| i.sym.as_ref()),
            Some("B")
        );
        assert_eq!(
            by_name(&table, "j").alias_target().map(|i| i.sym.as_ref()),
            Some("k")
        );
        assert!(by_name(&table, "n").alias_target().is_none());
    }

    #[test]
    fn shorthand_properties_are_reads() {
        let table = table("var z = 1; var o = { z };");
        assert_eq!(by_name(&table, "z").reference_count(), 1);
    }

    #[test]
    fn for_in_heads_are_violations() {
        let table = table("for (var k in o) { use(k); }");
        assert!(!by_name(&table, "k").is_constant());
    }

    #[test]
    fn detects_reference_before_declaration() {
        let table = table("use(v); var v = 1;");
        let v = by_name(&table, "v");
        let site = v.references()[0];
        assert!(v.is_referenced_before_declaration(site));
    }

    #[test]
    fn reads_in_nested_functions_are_not_early() {
        let table = table("function f() { use(v); } use(v); var v = 1; use(v);");
        let v = by_name(&table, "v");
        let early: Vec<bool> = v
            .references()
            .iter()
            .map(|&site| v.is_referenced_before_declaration(site))
            .collect();
        assert_eq!(early, vec![false, true, false]);
    }

    #[test]
    fn parenthesized_assignment_targets_are_violations() {
        let table = table("var z = 7; (z) = 1; ((z)) += 2; use(z);");
        let z = by_name(&table, "z");
        assert!(!z.is_constant());
        assert_eq!(z.violations().len(), 2);
    }
}
