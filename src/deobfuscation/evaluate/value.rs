//! Primitive values and the ECMAScript conversions between them.
//!
//! Strings are kept as UTF-16 code units, which is what `length`, indexing and
//! `charCodeAt` observe. A value only leaves the evaluator as a [`JsValue`] when
//! it is a number, boolean or a string that is valid UTF-16.

use std::fmt;

/// A statically known primitive value.
#[derive(Debug, Clone, PartialEq)]
pub enum JsValue {
    /// IEEE-754 double
    Number(f64),
    /// String without lone surrogates
    String(String),
    /// Boolean
    Bool(bool),
}

impl JsValue {
    /// Returns the numeric value, if this is a number.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            JsValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the string value, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            JsValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for JsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsValue::Number(n) => f.write_str(&number_to_string(*n)),
            JsValue::String(s) => write!(f, "{s:?}"),
            JsValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// Internal value model, including the primitives that never surface.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Vec<u16>),
}

impl Value {
    pub(crate) fn string(s: &str) -> Self {
        Value::String(s.encode_utf16().collect())
    }

    pub(crate) fn into_public(self) -> Option<JsValue> {
        match self {
            Value::Bool(b) => Some(JsValue::Bool(b)),
            Value::Number(n) => Some(JsValue::Number(n)),
            Value::String(units) => String::from_utf16(&units).ok().map(JsValue::String),
            Value::Undefined | Value::Null => None,
        }
    }

    pub(crate) fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub(crate) fn truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => !(*n == 0.0 || n.is_nan()),
            Value::String(s) => !s.is_empty(),
        }
    }

    pub(crate) fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
        }
    }

    pub(crate) fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::String(s) => string_to_number(&String::from_utf16_lossy(s)),
        }
    }

    pub(crate) fn to_js_string(&self) -> Vec<u16> {
        match self {
            Value::String(s) => s.clone(),
            Value::Undefined => utf16("undefined"),
            Value::Null => utf16("null"),
            Value::Bool(b) => utf16(if *b { "true" } else { "false" }),
            Value::Number(n) => utf16(&number_to_string(*n)),
        }
    }

    pub(crate) fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            _ => self == other,
        }
    }

    pub(crate) fn loose_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined | Value::Null, Value::Undefined | Value::Null) => true,
            (Value::Undefined | Value::Null, _) | (_, Value::Undefined | Value::Null) => false,
            (Value::Number(_), Value::String(_)) => {
                self.strict_equals(&Value::Number(other.to_number()))
            }
            (Value::String(_), Value::Number(_)) => {
                Value::Number(self.to_number()).strict_equals(other)
            }
            (Value::Bool(_), _) => Value::Number(self.to_number()).loose_equals(other),
            (_, Value::Bool(_)) => self.loose_equals(&Value::Number(other.to_number())),
            _ => self.strict_equals(other),
        }
    }
}

pub(crate) fn utf16(s: &str) -> Vec<u16> {
    s.encode_utf16().collect()
}

/// ECMAScript `ToInt32`.
pub(crate) fn to_int32(n: f64) -> i32 {
    #[allow(clippy::cast_possible_truncation)]
    {
        to_uint32(n) as i32
    }
}

/// ECMAScript `ToUint32`.
pub(crate) fn to_uint32(n: f64) -> u32 {
    if !n.is_finite() {
        return 0;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    {
        n.trunc().rem_euclid(4_294_967_296.0) as u32
    }
}

/// ECMAScript `ToIntegerOrInfinity`.
pub(crate) fn to_integer_or_infinity(n: f64) -> f64 {
    if n.is_nan() {
        0.0
    } else {
        n.trunc() + 0.0
    }
}

/// Returns `true` for the code units `String.prototype.trim` strips.
pub(crate) fn is_js_whitespace(unit: u16) -> bool {
    matches!(
        unit,
        0x09 | 0x0A
            | 0x0B
            | 0x0C
            | 0x0D
            | 0x20
            | 0xA0
            | 0x1680
            | 0x2000..=0x200A
            | 0x2028
            | 0x2029
            | 0x202F
            | 0x205F
            | 0x3000
            | 0xFEFF
    )
}

fn trim_js(s: &str) -> &str {
    s.trim_matches(|c: char| {
        u16::try_from(u32::from(c)).is_ok_and(is_js_whitespace)
    })
}

fn trim_js_start(s: &str) -> &str {
    s.trim_start_matches(|c: char| {
        u16::try_from(u32::from(c)).is_ok_and(is_js_whitespace)
    })
}

/// ECMAScript `StringToNumber`.
pub(crate) fn string_to_number(s: &str) -> f64 {
    let s = trim_js(s);
    if s.is_empty() {
        return 0.0;
    }

    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(digits) = s.strip_prefix(prefix) {
            return parse_radix_digits(digits, radix).unwrap_or(f64::NAN);
        }
    }

    match decimal_prefix_len(s) {
        Some(len) if len == s.len() => parse_decimal(s),
        _ => f64::NAN,
    }
}

fn parse_radix_digits(digits: &str, radix: u32) -> Option<f64> {
    if digits.is_empty() {
        return None;
    }
    let mut value = 0.0_f64;
    for c in digits.chars() {
        value = value * f64::from(radix) + f64::from(c.to_digit(radix)?);
    }
    Some(value)
}

fn parse_decimal(s: &str) -> f64 {
    let unsigned = s.trim_start_matches(['+', '-']);
    let negative = s.starts_with('-');
    let magnitude = if unsigned == "Infinity" {
        f64::INFINITY
    } else {
        unsigned.parse::<f64>().unwrap_or(f64::NAN)
    };
    if negative {
        -magnitude
    } else {
        magnitude
    }
}

/// Length of the longest prefix of `s` that is a `StrDecimalLiteral`.
fn decimal_prefix_len(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut i = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i += 1;
    }
    if s[i..].starts_with("Infinity") {
        return Some(i + "Infinity".len());
    }

    let int_start = i;
    while bytes.get(i).is_some_and(u8::is_ascii_digit) {
        i += 1;
    }
    let mut digits = i - int_start;

    if bytes.get(i) == Some(&b'.') {
        let frac_start = i + 1;
        let mut j = frac_start;
        while bytes.get(j).is_some_and(u8::is_ascii_digit) {
            j += 1;
        }
        if digits > 0 || j > frac_start {
            digits += j - frac_start;
            i = j;
        }
    }

    if digits == 0 {
        return None;
    }

    if matches!(bytes.get(i), Some(b'e' | b'E')) {
        let mut j = i + 1;
        if matches!(bytes.get(j), Some(b'+' | b'-')) {
            j += 1;
        }
        let exp_start = j;
        while bytes.get(j).is_some_and(u8::is_ascii_digit) {
            j += 1;
        }
        if j > exp_start {
            i = j;
        }
    }

    Some(i)
}

/// ECMAScript `parseFloat`.
pub(crate) fn parse_float(s: &str) -> f64 {
    let s = trim_js_start(s);
    match decimal_prefix_len(s) {
        Some(len) => parse_decimal(&s[..len]),
        None => f64::NAN,
    }
}

/// ECMAScript `parseInt`.
pub(crate) fn parse_int(s: &str, radix: i32) -> f64 {
    let mut s = trim_js_start(s);
    let mut sign = 1.0;
    if let Some(rest) = s.strip_prefix('-') {
        sign = -1.0;
        s = rest;
    } else if let Some(rest) = s.strip_prefix('+') {
        s = rest;
    }

    let mut radix = radix;
    let mut strip_prefix = true;
    if radix != 0 {
        if !(2..=36).contains(&radix) {
            return f64::NAN;
        }
        if radix != 16 {
            strip_prefix = false;
        }
    } else {
        radix = 10;
    }

    if strip_prefix {
        if let Some(rest) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            s = rest;
            radix = 16;
        }
    }

    #[allow(clippy::cast_sign_loss)]
    let radix = radix as u32;
    let end = s
        .char_indices()
        .find(|(_, c)| c.to_digit(radix).is_none())
        .map_or(s.len(), |(idx, _)| idx);

    match parse_radix_digits(&s[..end], radix) {
        Some(value) => sign * value,
        None => f64::NAN,
    }
}

/// ECMAScript `Number::toString` in radix 10.
pub(crate) fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n < 0.0 {
        return format!("-{}", number_to_string(-n));
    }

    // Shortest round-trip digits, e.g. "1.2345e3".
    let sci = format!("{n:e}");
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((&sci, "0"));
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    let exponent: i32 = exponent.parse().unwrap_or(0);

    #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
    let k = digits.len() as i32;
    let point = exponent + 1;

    if k <= point && point <= 21 {
        #[allow(clippy::cast_sign_loss)]
        let zeros = "0".repeat((point - k) as usize);
        format!("{digits}{zeros}")
    } else if 0 < point && point <= 21 {
        #[allow(clippy::cast_sign_loss)]
        let (int, frac) = digits.split_at(point as usize);
        format!("{int}.{frac}")
    } else if -6 < point && point <= 0 {
        #[allow(clippy::cast_sign_loss)]
        let zeros = "0".repeat((-point) as usize);
        format!("0.{zeros}{digits}")
    } else {
        let sign = if point - 1 < 0 { '-' } else { '+' };
        let exp = (point - 1).abs();
        let (first, rest) = digits.split_at(1);
        if rest.is_empty() {
            format!("{first}e{sign}{exp}")
        } else {
            format!("{first}.{rest}e{sign}{exp}")
        }
    }
}

/// The `**` operator.
pub(crate) fn exponentiate(base: f64, exponent: f64) -> f64 {
    if exponent.is_nan() {
        return f64::NAN;
    }
    if exponent == 0.0 {
        return 1.0;
    }
    if base.is_nan() || (base.abs() == 1.0 && exponent.is_infinite()) {
        return f64::NAN;
    }
    base.powf(exponent)
}
