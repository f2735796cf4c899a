//! Pure built-ins the evaluator is allowed to call.
//!
//! Only functions whose result depends on nothing but their arguments are
//! listed. Callers must make sure the global they name is not shadowed.

use super::value::{
    is_js_whitespace, parse_float, parse_int, to_int32, to_integer_or_infinity, utf16, Value,
};

/// Global functions callable as `name(...)`.
pub(crate) fn call_global(name: &str, args: &[Value]) -> Option<Value> {
    let arg = |i: usize| args.get(i).cloned().unwrap_or(Value::Undefined);

    let value = match name {
        "String" => match args.first() {
            Some(v) => Value::String(v.to_js_string()),
            None => Value::String(Vec::new()),
        },
        "Number" => match args.first() {
            Some(v) => Value::Number(v.to_number()),
            None => Value::Number(0.0),
        },
        "Boolean" => Value::Bool(arg(0).truthy()),
        "parseInt" => {
            let text = String::from_utf16_lossy(&arg(0).to_js_string());
            Value::Number(parse_int(&text, to_int32(arg(1).to_number())))
        }
        "parseFloat" => {
            let text = String::from_utf16_lossy(&arg(0).to_js_string());
            Value::Number(parse_float(&text))
        }
        _ => return None,
    };
    Some(value)
}

/// Static members callable as `object.method(...)`, e.g. `Math.floor`.
pub(crate) fn call_static(object: &str, method: &str, args: &[Value]) -> Option<Value> {
    match object {
        "Math" => math(method, args).map(Value::Number),
        "String" if method == "fromCharCode" => {
            #[allow(clippy::cast_possible_truncation)]
            let units = args
                .iter()
                .map(|v| to_int32(v.to_number()) as u16)
                .collect();
            Some(Value::String(units))
        }
        _ => None,
    }
}

/// Constant static properties such as `Math.PI`.
pub(crate) fn static_property(object: &str, property: &str) -> Option<Value> {
    use std::f64::consts;

    if object != "Math" {
        return None;
    }
    let value = match property {
        "PI" => consts::PI,
        "E" => consts::E,
        "LN2" => consts::LN_2,
        "LN10" => consts::LN_10,
        "LOG2E" => consts::LOG2_E,
        "LOG10E" => consts::LOG10_E,
        "SQRT2" => consts::SQRT_2,
        "SQRT1_2" => consts::FRAC_1_SQRT_2,
        _ => return None,
    };
    Some(Value::Number(value))
}

fn math(method: &str, args: &[Value]) -> Option<f64> {
    let nums: Vec<f64> = args.iter().map(Value::to_number).collect();
    let x = nums.first().copied().unwrap_or(f64::NAN);
    let y = nums.get(1).copied().unwrap_or(f64::NAN);

    let value = match method {
        "abs" => x.abs(),
        "floor" => x.floor(),
        "ceil" => x.ceil(),
        "trunc" => x.trunc(),
        "round" => round(x),
        "sign" => {
            if x.is_nan() || x == 0.0 {
                x
            } else {
                x.signum()
            }
        }
        "sqrt" => x.sqrt(),
        "cbrt" => x.cbrt(),
        "exp" => x.exp(),
        "log" => x.ln(),
        "log2" => x.log2(),
        "log10" => x.log10(),
        "pow" => super::value::exponentiate(x, y),
        // +0 beats -0 for max, -0 beats +0 for min
        "max" => extremum(&nums, f64::NEG_INFINITY, |a, b| {
            a > b || (a == 0.0 && b == 0.0 && b.is_sign_negative())
        }),
        "min" => extremum(&nums, f64::INFINITY, |a, b| {
            a < b || (a == 0.0 && b == 0.0 && a.is_sign_negative())
        }),
        _ => return None,
    };
    Some(value)
}

fn round(x: f64) -> f64 {
    if !x.is_finite() || x == 0.0 {
        return x;
    }
    if (-0.5..0.0).contains(&x) {
        return -0.0;
    }
    let floor = x.floor();
    if x - floor >= 0.5 {
        floor + 1.0
    } else {
        floor
    }
}

fn extremum(nums: &[f64], init: f64, prefer: impl Fn(f64, f64) -> bool) -> f64 {
    let mut best = init;
    for &n in nums {
        if n.is_nan() {
            return f64::NAN;
        }
        if prefer(n, best) {
            best = n;
        }
    }
    best
}

/// Methods callable on a string primitive.
pub(crate) fn call_string_method(receiver: &[u16], method: &str, args: &[Value]) -> Option<Value> {
    let arg = |i: usize| args.get(i).cloned().unwrap_or(Value::Undefined);
    let position = |i: usize| to_integer_or_infinity(arg(i).to_number());

    let value = match method {
        "charAt" => {
            let pos = position(0);
            match index_in(receiver, pos) {
                Some(idx) => Value::String(vec![receiver[idx]]),
                None => Value::String(Vec::new()),
            }
        }
        "charCodeAt" => {
            let pos = position(0);
            match index_in(receiver, pos) {
                Some(idx) => Value::Number(f64::from(receiver[idx])),
                None => Value::Number(f64::NAN),
            }
        }
        "indexOf" => {
            let needle = arg(0).to_js_string();
            #[allow(clippy::cast_precision_loss)]
            let len = receiver.len() as f64;
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let start = position(1).clamp(0.0, len) as usize;
            #[allow(clippy::cast_precision_loss)]
            let found = find(receiver, &needle, start).map_or(-1.0, |idx| idx as f64);
            Value::Number(found)
        }
        "toUpperCase" => Value::string(&String::from_utf16(receiver).ok()?.to_uppercase()),
        "toLowerCase" => Value::string(&String::from_utf16(receiver).ok()?.to_lowercase()),
        "trim" => {
            let start = receiver.iter().position(|u| !is_js_whitespace(*u));
            let end = receiver.iter().rposition(|u| !is_js_whitespace(*u));
            match (start, end) {
                (Some(start), Some(end)) => Value::String(receiver[start..=end].to_vec()),
                _ => Value::String(utf16("")),
            }
        }
        _ => return None,
    };
    Some(value)
}

/// Maps an integral position onto an index of `units`, if in range.
pub(crate) fn index_in(units: &[u16], pos: f64) -> Option<usize> {
    #[allow(clippy::cast_precision_loss)]
    let len = units.len() as f64;
    if pos >= 0.0 && pos < len {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Some(pos as usize)
    } else {
        None
    }
}

fn find(haystack: &[u16], needle: &[u16], start: usize) -> Option<usize> {
    if needle.is_empty() {
        return Some(start);
    }
    if needle.len() > haystack.len() {
        return None;
    }
    (start..=haystack.len() - needle.len()).find(|&i| haystack[i..].starts_with(needle))
}
