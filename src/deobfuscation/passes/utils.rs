//! Shared utilities for rewrite passes.
//!
//! Tree helpers used by more than one pass: parenthesis stripping, literal
//! construction and a few structural queries.

use swc_core::{
    common::DUMMY_SP,
    ecma::ast::{Bool, Callee, Expr, Lit, Number, Str, UnaryExpr, UnaryOp},
};

/// Strips any number of enclosing parentheses.
///
/// The parser preserves parenthesized expressions as distinct nodes; every
/// structural match must look through them.
#[must_use]
pub fn unparen(mut expr: &Expr) -> &Expr {
    while let Expr::Paren(paren) = expr {
        expr = &paren.expr;
    }
    expr
}

/// Returns the callee expression of a call, if it is an ordinary expression.
#[must_use]
pub fn callee_expr(callee: &Callee) -> Option<&Expr> {
    match callee {
        Callee::Expr(expr) => Some(unparen(expr)),
        Callee::Super(_) | Callee::Import(_) => None,
    }
}

/// Builds a string literal expression.
#[must_use]
pub fn str_expr(value: &str) -> Expr {
    Expr::Lit(Lit::Str(Str {
        span: DUMMY_SP,
        value: value.into(),
        raw: None,
    }))
}

/// Builds a boolean literal expression.
#[must_use]
pub fn bool_expr(value: bool) -> Expr {
    Expr::Lit(Lit::Bool(Bool {
        span: DUMMY_SP,
        value,
    }))
}

/// Builds a numeric expression for a finite value.
///
/// Negative values (and negative zero) become a unary minus over a
/// non-negative literal, which is how they are written in source.
#[must_use]
pub fn num_expr(value: f64) -> Expr {
    let literal = |v: f64| {
        Expr::Lit(Lit::Num(Number {
            span: DUMMY_SP,
            value: v,
            raw: None,
        }))
    };

    if value.is_sign_negative() {
        Expr::Unary(UnaryExpr {
            span: DUMMY_SP,
            op: UnaryOp::Minus,
            arg: Box::new(literal(-value)),
        })
    } else {
        literal(value)
    }
}

/// Reads a numeric literal, optionally negated, as written in source.
#[must_use]
pub fn numeric_literal(expr: &Expr) -> Option<f64> {
    match unparen(expr) {
        Expr::Lit(Lit::Num(num)) => Some(num.value),
        Expr::Unary(UnaryExpr {
            op: UnaryOp::Minus,
            arg,
            ..
        }) => match unparen(arg) {
            Expr::Lit(Lit::Num(num)) => Some(-num.value),
            _ => None,
        },
        _ => None,
    }
}

/// Returns the value of `expr` if it is an integer-valued numeric literal.
#[must_use]
pub fn integer_literal(expr: &Expr) -> Option<i64> {
    let value = numeric_literal(expr)?;
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 9_007_199_254_740_992.0 {
        #[allow(clippy::cast_possible_truncation)]
        Some(value as i64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swc_core::ecma::ast::ParenExpr;

    fn paren(expr: Expr) -> Expr {
        Expr::Paren(ParenExpr {
            span: DUMMY_SP,
            expr: Box::new(expr),
        })
    }

    #[test]
    fn unparen_strips_nested_parentheses() {
        let expr = paren(paren(str_expr("x")));
        assert!(matches!(unparen(&expr), Expr::Lit(Lit::Str(_))));
    }

    #[test]
    fn negative_numbers_are_unary_minus() {
        let expr = num_expr(-3.0);
        assert!(matches!(
            &expr,
            Expr::Unary(UnaryExpr {
                op: UnaryOp::Minus,
                ..
            })
        ));
        assert_eq!(numeric_literal(&expr), Some(-3.0));
        assert_eq!(integer_literal(&expr), Some(-3));
    }

    #[test]
    fn integer_literal_rejects_fractions() {
        assert_eq!(integer_literal(&num_expr(1.5)), None);
        assert_eq!(integer_literal(&str_expr("1")), None);
        assert_eq!(integer_literal(&paren(num_expr(0x1a as f64))), Some(26));
    }
}
