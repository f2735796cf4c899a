//! Static evaluation of expressions.
//!
//! The [`Evaluator`] computes the value of an expression without running any
//! code, following ECMAScript semantics for the forms it understands. The
//! result is three-valued:
//!
//! - [`Evaluation::Known`] when the value is certain and is a number, string
//!   or boolean
//! - [`Evaluation::Unknown`] when the value cannot be determined
//! - [`Evaluation::SideEffecting`] when evaluating the expression would run code
//!   with observable effects (calls, assignments, `new`, ...)
//!
//! Callers replace an expression only on `Known`. A call whose callee is an
//! alias of the string decoder is never evaluated.
//!
//! Identifiers are resolved through a [`BindingTable`]: a reference to a
//! constant variable evaluates to its initializer, unless the reference comes
//! before the declaration in the same function. Globals such as `Math` or `String`
//! are used only when they are not shadowed by a local binding.

mod builtins;
mod value;

pub use value::JsValue;

use std::cell::RefCell;

use rustc_hash::FxHashMap;
use swc_core::{
    common::SyntaxContext,
    ecma::ast::{
        ArrayLit, BinExpr, BinaryOp, CallExpr, Expr, ExprOrSpread, Id, Ident, Lit, MemberExpr,
        MemberProp, OptChainBase, Prop, PropName, PropOrSpread, UnaryExpr, UnaryOp,
    },
};

use crate::deobfuscation::{
    alias::DecoderAliasResolver,
    bindings::BindingTable,
    passes::utils::{callee_expr, unparen},
};

use value::{exponentiate, to_int32, to_uint32, utf16, Value};

/// Outcome of statically evaluating an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    /// The value is statically known.
    Known(JsValue),
    /// The value cannot be determined statically.
    Unknown,
    /// Evaluating the expression would have observable effects.
    SideEffecting,
}

impl Evaluation {
    /// Returns the known value, if any.
    #[must_use]
    pub fn known(self) -> Option<JsValue> {
        match self {
            Evaluation::Known(value) => Some(value),
            _ => None,
        }
    }

    /// Returns `true` if the value is statically known.
    #[must_use]
    pub fn is_known(&self) -> bool {
        matches!(self, Evaluation::Known(_))
    }
}

/// Why evaluation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    Unknown,
    SideEffecting,
}

type Eval = Result<Value, Stop>;

/// Merges independent evaluations; side effects win over unknown values.
fn join(results: impl IntoIterator<Item = Eval>) -> Result<Vec<Value>, Stop> {
    let mut values = Vec::new();
    let mut stop = None;
    for result in results {
        match result {
            Ok(value) => values.push(value),
            Err(Stop::SideEffecting) => stop = Some(Stop::SideEffecting),
            Err(Stop::Unknown) => {
                stop.get_or_insert(Stop::Unknown);
            }
        }
    }
    match stop {
        Some(stop) => Err(stop),
        None => Ok(values),
    }
}

/// A static evaluator bound to one snapshot of the script's bindings.
///
/// The value of each constant binding's initializer is computed at most once
/// per evaluator.
pub struct Evaluator<'a> {
    bindings: &'a BindingTable,
    unresolved_ctxt: SyntaxContext,
    decoder: Option<DecoderAliasResolver<'a>>,
    initializers: RefCell<FxHashMap<Id, Eval>>,
}

impl<'a> Evaluator<'a> {
    /// Creates an evaluator.
    ///
    /// # Arguments
    ///
    /// * `bindings` - Bindings of the script the expressions belong to.
    /// * `unresolved_ctxt` - Syntax context of identifiers that resolve to globals.
    #[must_use]
    pub fn new(bindings: &'a BindingTable, unresolved_ctxt: SyntaxContext) -> Self {
        Self {
            bindings,
            unresolved_ctxt,
            decoder: None,
            initializers: RefCell::default(),
        }
    }

    /// Refuses to evaluate calls through any alias of the decoder.
    #[must_use]
    pub fn with_decoder(mut self, resolver: DecoderAliasResolver<'a>) -> Self {
        self.decoder = Some(resolver);
        self
    }

    /// Evaluates `expr`.
    #[must_use]
    pub fn evaluate(&self, expr: &Expr) -> Evaluation {
        match self.eval(expr, &mut Vec::new()) {
            Ok(value) => value.into_public().map_or(Evaluation::Unknown, Evaluation::Known),
            Err(Stop::Unknown) => Evaluation::Unknown,
            Err(Stop::SideEffecting) => Evaluation::SideEffecting,
        }
    }

    /// Returns `true` if evaluating `expr` can neither run user code nor throw.
    ///
    /// This is stricter than "not `SideEffecting`": function and object
    /// literals are free of effects even though their value is unknown, while an
    /// arithmetic expression over unknown operands may call `valueOf`.
    #[must_use]
    pub fn is_side_effect_free(&self, expr: &Expr) -> bool {
        match unparen(expr) {
            Expr::Lit(_) | Expr::Fn(_) | Expr::Arrow(_) | Expr::This(_) => true,
            Expr::Ident(ident) => {
                ident.ctxt != self.unresolved_ctxt
                    || matches!(&*ident.sym, "undefined" | "NaN" | "Infinity")
            }
            Expr::Array(array) => array
                .elems
                .iter()
                .flatten()
                .all(|elem| elem.spread.is_none() && self.is_side_effect_free(&elem.expr)),
            Expr::Object(object) => object.props.iter().all(|prop| match prop {
                PropOrSpread::Spread(_) => false,
                PropOrSpread::Prop(prop) => match &**prop {
                    Prop::Shorthand(ident) => ident.ctxt != self.unresolved_ctxt,
                    Prop::KeyValue(kv) => {
                        is_static_key(&kv.key) && self.is_side_effect_free(&kv.value)
                    }
                    Prop::Method(method) => is_static_key(&method.key),
                    Prop::Getter(getter) => is_static_key(&getter.key),
                    Prop::Setter(setter) => is_static_key(&setter.key),
                    Prop::Assign(_) => false,
                },
            }),
            Expr::Tpl(tpl) => tpl.exprs.is_empty(),
            Expr::Unary(unary) if matches!(unary.op, UnaryOp::Bang | UnaryOp::Void) => {
                self.is_side_effect_free(&unary.arg)
            }
            Expr::Unary(UnaryExpr {
                op: UnaryOp::TypeOf,
                arg,
                ..
            }) => matches!(unparen(arg), Expr::Ident(_)) || self.is_side_effect_free(arg),
            Expr::Cond(cond) => {
                self.is_side_effect_free(&cond.test)
                    && self.is_side_effect_free(&cond.cons)
                    && self.is_side_effect_free(&cond.alt)
            }
            Expr::Seq(seq) => seq.exprs.iter().all(|e| self.is_side_effect_free(e)),
            Expr::Bin(bin)
                if matches!(
                    bin.op,
                    BinaryOp::LogicalAnd
                        | BinaryOp::LogicalOr
                        | BinaryOp::NullishCoalescing
                        | BinaryOp::EqEqEq
                        | BinaryOp::NotEqEq
                ) =>
            {
                self.is_side_effect_free(&bin.left) && self.is_side_effect_free(&bin.right)
            }
            other => self.evaluate(other).is_known(),
        }
    }

    fn is_global(&self, ident: &Ident) -> bool {
        ident.ctxt == self.unresolved_ctxt
    }

    fn eval(&self, expr: &Expr, visiting: &mut Vec<Id>) -> Eval {
        match expr {
            Expr::Paren(paren) => self.eval(&paren.expr, visiting),
            Expr::Lit(lit) => eval_lit(lit),
            Expr::Ident(ident) => self.eval_ident(ident, visiting),
            Expr::Unary(unary) => self.eval_unary(unary, visiting),
            Expr::Bin(bin) => self.eval_bin(bin, visiting),
            Expr::Cond(cond) => {
                if self.eval(&cond.test, visiting)?.truthy() {
                    self.eval(&cond.cons, visiting)
                } else {
                    self.eval(&cond.alt, visiting)
                }
            }
            Expr::Seq(seq) => {
                let values = join(seq.exprs.iter().map(|e| self.eval(e, visiting)))?;
                values.into_iter().last().ok_or(Stop::Unknown)
            }
            Expr::Tpl(tpl) => {
                let values = join(tpl.exprs.iter().map(|e| self.eval(e, visiting)))?;
                let mut out = Vec::new();
                for (i, quasi) in tpl.quasis.iter().enumerate() {
                    let cooked = quasi.cooked.as_ref().ok_or(Stop::Unknown)?;
                    out.extend(cooked.encode_utf16());
                    if let Some(value) = values.get(i) {
                        out.extend(value.to_js_string());
                    }
                }
                Ok(Value::String(out))
            }
            Expr::Member(member) => self.eval_member(member, visiting),
            Expr::Call(call) => self.eval_call(call, visiting),
            Expr::OptChain(chain) => match &*chain.base {
                OptChainBase::Call(_) => Err(Stop::SideEffecting),
                OptChainBase::Member(_) => Err(Stop::Unknown),
            },
            Expr::Assign(_)
            | Expr::Update(_)
            | Expr::New(_)
            | Expr::Await(_)
            | Expr::Yield(_)
            | Expr::TaggedTpl(_) => Err(Stop::SideEffecting),
            _ => Err(Stop::Unknown),
        }
    }

    fn eval_ident(&self, ident: &Ident, visiting: &mut Vec<Id>) -> Eval {
        if self.is_global(ident) {
            return match &*ident.sym {
                "undefined" => Ok(Value::Undefined),
                "NaN" => Ok(Value::Number(f64::NAN)),
                "Infinity" => Ok(Value::Number(f64::INFINITY)),
                _ => Err(Stop::Unknown),
            };
        }

        let binding = self.bindings.get(ident).ok_or(Stop::Unknown)?;
        if !binding.kind().is_variable()
            || !binding.is_constant()
            || binding.is_referenced_before_declaration(ident.span)
        {
            return Err(Stop::Unknown);
        }
        let init = binding.init().ok_or(Stop::Unknown)?;

        let id = ident.to_id();
        if let Some(cached) = self.initializers.borrow().get(&id) {
            return cached.clone();
        }
        if visiting.contains(&id) {
            return Err(Stop::Unknown);
        }
        visiting.push(id.clone());
        let result = self.eval(init, visiting);
        visiting.pop();

        // Effects of the initializer ran at the declaration, not here.
        let result = result.map_err(|_| Stop::Unknown);
        self.initializers.borrow_mut().insert(id, result.clone());
        result
    }

    fn eval_unary(&self, unary: &UnaryExpr, visiting: &mut Vec<Id>) -> Eval {
        if unary.op == UnaryOp::Delete {
            return Err(Stop::SideEffecting);
        }

        let operand = self.eval(&unary.arg, visiting)?;
        let value = match unary.op {
            UnaryOp::Minus => Value::Number(-operand.to_number()),
            UnaryOp::Plus => Value::Number(operand.to_number()),
            UnaryOp::Bang => Value::Bool(!operand.truthy()),
            UnaryOp::Tilde => Value::Number(f64::from(!to_int32(operand.to_number()))),
            UnaryOp::TypeOf => Value::string(operand.type_of()),
            UnaryOp::Void => Value::Undefined,
            UnaryOp::Delete => return Err(Stop::SideEffecting),
        };
        Ok(value)
    }

    fn eval_bin(&self, bin: &BinExpr, visiting: &mut Vec<Id>) -> Eval {
        match bin.op {
            BinaryOp::LogicalAnd => {
                let left = self.eval(&bin.left, visiting)?;
                if left.truthy() {
                    self.eval(&bin.right, visiting)
                } else {
                    Ok(left)
                }
            }
            BinaryOp::LogicalOr => {
                let left = self.eval(&bin.left, visiting)?;
                if left.truthy() {
                    Ok(left)
                } else {
                    self.eval(&bin.right, visiting)
                }
            }
            BinaryOp::NullishCoalescing => {
                let left = self.eval(&bin.left, visiting)?;
                if left.is_nullish() {
                    self.eval(&bin.right, visiting)
                } else {
                    Ok(left)
                }
            }
            op => {
                let left = self.eval(&bin.left, visiting);
                let right = self.eval(&bin.right, visiting);
                let mut operands = join([left, right])?.into_iter();
                match (operands.next(), operands.next()) {
                    (Some(l), Some(r)) => binary(op, &l, &r),
                    _ => Err(Stop::Unknown),
                }
            }
        }
    }

    fn eval_member(&self, member: &MemberExpr, visiting: &mut Vec<Id>) -> Eval {
        if let (Expr::Ident(object), MemberProp::Ident(prop)) = (unparen(&member.obj), &member.prop)
        {
            if self.is_global(object) {
                return builtins::static_property(&object.sym, &prop.sym).ok_or(Stop::Unknown);
            }
        }

        if let Expr::Array(array) = unparen(&member.obj) {
            let elements = self.eval_array(array, visiting);
            let key = self.property_key(&member.prop, visiting);
            return match (elements, key) {
                (Ok(elements), Ok(Value::String(key))) => array_member(&elements, &key),
                (Err(Stop::SideEffecting), _) | (_, Err(Stop::SideEffecting)) => {
                    Err(Stop::SideEffecting)
                }
                _ => Err(Stop::Unknown),
            };
        }

        let object = self.eval(&member.obj, visiting);
        let key = self.property_key(&member.prop, visiting);
        let mut parts = join([object, key])?.into_iter();
        match (parts.next(), parts.next()) {
            (Some(Value::String(s)), Some(Value::String(key))) => string_member(&s, &key),
            _ => Err(Stop::Unknown),
        }
    }

    fn eval_array(&self, array: &ArrayLit, visiting: &mut Vec<Id>) -> Result<Vec<Value>, Stop> {
        let mut results = Vec::with_capacity(array.elems.len());
        for elem in &array.elems {
            results.push(match elem {
                None => Ok(Value::Undefined),
                Some(ExprOrSpread {
                    spread: Some(_), ..
                }) => Err(Stop::Unknown),
                Some(ExprOrSpread { expr, .. }) => self.eval(expr, visiting),
            });
        }
        join(results)
    }

    /// Evaluates a member key to its string form.
    fn property_key(&self, prop: &MemberProp, visiting: &mut Vec<Id>) -> Eval {
        match prop {
            MemberProp::Ident(name) => Ok(Value::string(&name.sym)),
            MemberProp::Computed(computed) => self
                .eval(&computed.expr, visiting)
                .map(|key| Value::String(key.to_js_string())),
            MemberProp::PrivateName(_) => Err(Stop::Unknown),
        }
    }

    fn eval_call(&self, call: &CallExpr, visiting: &mut Vec<Id>) -> Eval {
        let Some(callee) = callee_expr(&call.callee) else {
            return Err(Stop::SideEffecting);
        };

        if let (Some(resolver), Expr::Ident(ident)) = (&self.decoder, callee) {
            if resolver.is_alias(ident) {
                return Err(Stop::SideEffecting);
            }
        }

        let mut args = Vec::with_capacity(call.args.len());
        for arg in &call.args {
            if arg.spread.is_some() {
                return Err(Stop::SideEffecting);
            }
            args.push(self.eval(&arg.expr, visiting));
        }

        let result = match callee {
            Expr::Ident(function) if self.is_global(function) => {
                let args = join(args)?;
                builtins::call_global(&function.sym, &args)
            }
            Expr::Member(member) => {
                let Some(method) = static_member_name(&member.prop) else {
                    return Err(Stop::SideEffecting);
                };
                match unparen(&member.obj) {
                    Expr::Ident(object) if self.is_global(object) => {
                        let args = join(args)?;
                        builtins::call_static(&object.sym, &method, &args)
                    }
                    receiver => match self.eval(receiver, visiting) {
                        Ok(Value::String(s)) => {
                            let args = join(args)?;
                            builtins::call_string_method(&s, &method, &args)
                        }
                        _ => None,
                    },
                }
            }
            _ => None,
        };

        result.ok_or(Stop::SideEffecting)
    }
}

fn eval_lit(lit: &Lit) -> Eval {
    match lit {
        Lit::Str(s) => Ok(Value::string(&s.value)),
        Lit::Num(n) => Ok(Value::Number(n.value)),
        Lit::Bool(b) => Ok(Value::Bool(b.value)),
        Lit::Null(_) => Ok(Value::Null),
        _ => Err(Stop::Unknown),
    }
}

fn is_static_key(key: &PropName) -> bool {
    !matches!(key, PropName::Computed(_))
}

/// Name of a member accessed as `.name` or `["name"]`.
fn static_member_name(prop: &MemberProp) -> Option<String> {
    match prop {
        MemberProp::Ident(name) => Some(name.sym.to_string()),
        MemberProp::Computed(computed) => match unparen(&computed.expr) {
            Expr::Lit(Lit::Str(s)) => Some(s.value.to_string()),
            _ => None,
        },
        MemberProp::PrivateName(_) => None,
    }
}

/// Parses a canonical array index (`"0"`, `"17"`, not `"01"` or `"1.0"`).
fn array_index(key: &[u16]) -> Option<usize> {
    let key = String::from_utf16(key).ok()?;
    if key.is_empty() || (key.len() > 1 && key.starts_with('0')) {
        return None;
    }
    if !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    key.parse().ok()
}

fn string_member(s: &[u16], key: &[u16]) -> Eval {
    if key == utf16("length").as_slice() {
        #[allow(clippy::cast_precision_loss)]
        return Ok(Value::Number(s.len() as f64));
    }
    match array_index(key) {
        Some(idx) => Ok(s
            .get(idx)
            .map_or(Value::Undefined, |unit| Value::String(vec![*unit]))),
        None => Err(Stop::Unknown),
    }
}

fn array_member(elements: &[Value], key: &[u16]) -> Eval {
    if key == utf16("length").as_slice() {
        #[allow(clippy::cast_precision_loss)]
        return Ok(Value::Number(elements.len() as f64));
    }
    match array_index(key) {
        Some(idx) => Ok(elements.get(idx).cloned().unwrap_or(Value::Undefined)),
        None => Err(Stop::Unknown),
    }
}

/// `a < b` per the abstract relational comparison; `None` means undefined.
fn less_than(a: &Value, b: &Value) -> Option<bool> {
    if let (Value::String(a), Value::String(b)) = (a, b) {
        return Some(a < b);
    }
    let (a, b) = (a.to_number(), b.to_number());
    if a.is_nan() || b.is_nan() {
        None
    } else {
        Some(a < b)
    }
}

fn binary(op: BinaryOp, l: &Value, r: &Value) -> Eval {
    let number = |f: fn(f64, f64) -> f64| Ok(Value::Number(f(l.to_number(), r.to_number())));
    let int32 = |f: fn(i32, i32) -> i32| {
        Ok(Value::Number(f64::from(f(
            to_int32(l.to_number()),
            to_int32(r.to_number()),
        ))))
    };
    let shift = to_uint32(r.to_number()) & 31;

    match op {
        BinaryOp::Add => {
            if matches!(l, Value::String(_)) || matches!(r, Value::String(_)) {
                let mut out = l.to_js_string();
                out.extend(r.to_js_string());
                Ok(Value::String(out))
            } else {
                number(|a, b| a + b)
            }
        }
        BinaryOp::Sub => number(|a, b| a - b),
        BinaryOp::Mul => number(|a, b| a * b),
        BinaryOp::Div => number(|a, b| a / b),
        BinaryOp::Mod => number(|a, b| a % b),
        BinaryOp::Exp => number(exponentiate),
        BinaryOp::BitAnd => int32(|a, b| a & b),
        BinaryOp::BitOr => int32(|a, b| a | b),
        BinaryOp::BitXor => int32(|a, b| a ^ b),
        BinaryOp::LShift => Ok(Value::Number(f64::from(
            to_int32(l.to_number()) << shift,
        ))),
        BinaryOp::RShift => Ok(Value::Number(f64::from(
            to_int32(l.to_number()) >> shift,
        ))),
        BinaryOp::ZeroFillRShift => Ok(Value::Number(f64::from(
            to_uint32(l.to_number()) >> shift,
        ))),
        BinaryOp::EqEq => Ok(Value::Bool(l.loose_equals(r))),
        BinaryOp::NotEq => Ok(Value::Bool(!l.loose_equals(r))),
        BinaryOp::EqEqEq => Ok(Value::Bool(l.strict_equals(r))),
        BinaryOp::NotEqEq => Ok(Value::Bool(!l.strict_equals(r))),
        BinaryOp::Lt => Ok(Value::Bool(less_than(l, r).unwrap_or(false))),
        BinaryOp::Gt => Ok(Value::Bool(less_than(r, l).unwrap_or(false))),
        BinaryOp::LtEq => Ok(Value::Bool(less_than(r, l).is_some_and(|gt| !gt))),
        BinaryOp::GtEq => Ok(Value::Bool(less_than(l, r).is_some_and(|lt| !lt))),
        _ => Err(Stop::Unknown),
    }
}

#[cfg(test)]
mod tests {
    use swc_core::ecma::ast::Stmt;

    use super::*;
    use crate::script::JsScript;

    fn eval_last(source: &str) -> Evaluation {
        let script = JsScript::parse(source).expect("valid script");
        let bindings = BindingTable::collect(script.ast());
        let evaluator = Evaluator::new(&bindings, script.unresolved_ctxt());
        let Some(Stmt::Expr(stmt)) = script.ast().body.last() else {
            panic!("last statement must be an expression");
        };
        evaluator.evaluate(&stmt.expr)
    }

    fn known(source: &str) -> JsValue {
        eval_last(source)
            .known()
            .unwrap_or_else(|| panic!("expected a known value for {source}"))
    }

    fn s(value: &str) -> JsValue {
        JsValue::String(value.to_string())
    }

    #[test]
    fn arithmetic_and_concatenation() {
        assert_eq!(known("(1 + 2) * 3;"), JsValue::Number(9.0));
        assert_eq!(known("'a' + 1 + 2;"), s("a12"));
        assert_eq!(known("1 + 2 + 'a';"), s("3a"));
        assert_eq!(known("7 % -3;"), JsValue::Number(1.0));
        assert_eq!(known("2 ** 10;"), JsValue::Number(1024.0));
        assert_eq!(known("0.1 + 0.2 + '';"), s("0.30000000000000004"));
        assert_eq!(known("'' + 1e21;"), s("1e+21"));
    }

    #[test]
    fn bitwise_and_shifts() {
        assert_eq!(known("~5;"), JsValue::Number(-6.0));
        assert_eq!(known("1 << 31;"), JsValue::Number(-2_147_483_648.0));
        assert_eq!(known("-1 >>> 0;"), JsValue::Number(4_294_967_295.0));
        assert_eq!(known("-16 >> 2;"), JsValue::Number(-4.0));
        assert_eq!(known("0xff & 0x0f;"), JsValue::Number(15.0));
    }

    #[test]
    fn comparisons_and_logic() {
        assert_eq!(known("'1' == 1;"), JsValue::Bool(true));
        assert_eq!(known("'1' === 1;"), JsValue::Bool(false));
        assert_eq!(known("null == undefined;"), JsValue::Bool(true));
        assert_eq!(known("'b' > 'a';"), JsValue::Bool(true));
        assert_eq!(known("NaN <= NaN;"), JsValue::Bool(false));
        assert_eq!(known("!'';"), JsValue::Bool(true));
        assert_eq!(known("0 || 'x';"), s("x"));
        assert_eq!(known("null ?? 4;"), JsValue::Number(4.0));
        assert_eq!(known("true ? 'y' : f();"), s("y"));
        assert_eq!(known("typeof 'a';"), s("string"));
    }

    #[test]
    fn short_circuit_skips_side_effects() {
        assert_eq!(known("false && f();"), JsValue::Bool(false));
        assert_eq!(eval_last("true && f();"), Evaluation::SideEffecting);
    }

    #[test]
    fn nullish_results_are_unknown() {
        assert_eq!(eval_last("void 0;"), Evaluation::Unknown);
        assert_eq!(eval_last("null;"), Evaluation::Unknown);
        assert_eq!(known("typeof void 0;"), s("undefined"));
    }

    #[test]
    fn constant_bindings_are_followed() {
        assert_eq!(known("var a = 2; var b = a * 3; b + 1;"), JsValue::Number(7.0));
        assert_eq!(eval_last("var a = 2; a = 5; a;"), Evaluation::Unknown);
        assert_eq!(eval_last("var b = a; var a = 2; b;"), Evaluation::Unknown);
        assert_eq!(eval_last("var p = q; var q = p; p;"), Evaluation::Unknown);
    }

    #[test]
    fn globals_only_when_unshadowed() {
        assert_eq!(known("String.fromCharCode(72, 105);"), s("Hi"));
        assert_eq!(known("Math.floor(7.8) + Math.max(1, 2);"), JsValue::Number(9.0));
        assert_eq!(known("parseInt('0x1f');"), JsValue::Number(31.0));
        assert_eq!(
            eval_last("var Math = { floor: g }; Math.floor(1.5);"),
            Evaluation::SideEffecting
        );
        assert_eq!(eval_last("Math.random();"), Evaluation::SideEffecting);
        assert_eq!(
            eval_last("var parseInt = g; parseInt('1');"),
            Evaluation::SideEffecting
        );
    }

    #[test]
    fn string_and_array_literals() {
        assert_eq!(known("'hello'.length;"), JsValue::Number(5.0));
        assert_eq!(known("'hello'[1];"), s("e"));
        assert_eq!(known("['a', 'b', 'c'][2];"), s("c"));
        assert_eq!(known("[1, 2, 3].length;"), JsValue::Number(3.0));
        assert_eq!(known("'abc'.charCodeAt(0);"), JsValue::Number(97.0));
        assert_eq!(known("'abc'['toUpperCase']();"), s("ABC"));
        assert_eq!(known("`a${1 + 1}b`;"), s("a2b"));
        assert_eq!(eval_last("'abc'.foo;"), Evaluation::Unknown);
    }

    #[test]
    fn effects_are_reported() {
        assert_eq!(eval_last("f();"), Evaluation::SideEffecting);
        assert_eq!(eval_last("new Date();"), Evaluation::SideEffecting);
        assert_eq!(eval_last("var x; x = 1;"), Evaluation::SideEffecting);
        assert_eq!(eval_last("var o = {}; delete o.k;"), Evaluation::SideEffecting);
        assert_eq!(eval_last("1 + f();"), Evaluation::SideEffecting);
        assert_eq!(eval_last("unknownGlobal;"), Evaluation::Unknown);
    }

    #[test]
    fn purity() {
        let script = JsScript::parse(
            "function f() {} [1, 'a', function () {}, { k: 1 }, !0, f]; [f()]; x + 1; ({ [k]: 1 });",
        )
        .expect("valid script");
        let bindings = BindingTable::collect(script.ast());
        let evaluator = Evaluator::new(&bindings, script.unresolved_ctxt());

        let verdicts: Vec<bool> = script.ast().body[1..]
            .iter()
            .map(|stmt| match stmt {
                Stmt::Expr(stmt) => evaluator.is_side_effect_free(&stmt.expr),
                _ => panic!("expression expected"),
            })
            .collect();
        assert_eq!(verdicts, vec![true, false, false, false]);
    }

    #[test]
    fn long_constant_chains_evaluate_each_binding_once() {
        let mut source = String::from("var a1 = 1;\n");
        for i in 2..=48 {
            source.push_str(&format!("var a{i} = a{p} + a{p};\n", p = i - 1));
        }
        source.push_str("a48;");

        assert_eq!(known(&source), JsValue::Number(2f64.powi(47)));
    }

    #[test]
    fn cyclic_initializers_stay_unknown() {
        assert_eq!(eval_last("var a = b; var b = a; a;"), Evaluation::Unknown);
        assert_eq!(eval_last("var a = b; var b = a; b;"), Evaluation::Unknown);
    }
}
