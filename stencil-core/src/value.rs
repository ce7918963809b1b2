//! Dynamic values consumed by `pack`/`sprintf` and produced by `unpack`
//!
//! `Value` stands in for the host runtime's object model. Its coercion
//! methods follow the duck-typed conversion protocol the directives rely on:
//!
//! - [`Value::to_int`] / [`Value::to_f64`] / [`Value::to_str`]: implicit
//!   conversions used by pack directives.
//! - [`Value::to_integer_strict`] / [`Value::to_f64_strict`]: the stricter
//!   `Integer()` / `Float()` style conversions used by printf, which also
//!   parse numeric strings.
//! - [`Value::to_s`] and [`Value::inspect`]: textual renderings used by
//!   `%s`, `%p` and `M`.

use crate::error::FormatError;
use crate::Result;
use bytes::Bytes;
use core::fmt::Write as _;
use num_bigint::BigInt;
use num_traits::{FromPrimitive, ToPrimitive};

/// A dynamically typed argument or result value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absence of a value
    Nil,
    /// Boolean
    Bool(bool),
    /// Machine-width integer
    Integer(i64),
    /// Integer outside the `i64` range
    BigInteger(BigInt),
    /// IEEE-754 double
    Float(f64),
    /// Byte string (not necessarily valid UTF-8)
    Str(Bytes),
    /// Interned name, used as hash key for named printf references
    Symbol(String),
    /// Ordered list
    Array(Vec<Value>),
    /// Ordered key/value pairs
    Hash(Vec<(Value, Value)>),
}

impl Value {
    /// Build a string value
    pub fn str(bytes: impl Into<Bytes>) -> Self {
        Value::Str(bytes.into())
    }

    /// Build a symbol value
    pub fn symbol(name: impl Into<String>) -> Self {
        Value::Symbol(name.into())
    }

    /// Build a hash keyed by symbols
    pub fn hash<K, I>(pairs: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Hash(
            pairs
                .into_iter()
                .map(|(k, v)| (Value::Symbol(k.into()), v))
                .collect(),
        )
    }

    /// Normalize a big integer, keeping it machine-width when it fits
    pub fn from_bigint(value: BigInt) -> Self {
        match value.to_i64() {
            Some(small) => Value::Integer(small),
            None => Value::BigInteger(value),
        }
    }

    /// Build an integer value from an unsigned 64-bit quantity
    pub fn from_u64(value: u64) -> Self {
        match i64::try_from(value) {
            Ok(small) => Value::Integer(small),
            Err(_) => Value::BigInteger(BigInt::from(value)),
        }
    }

    /// Name of this value's type, as used in diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(true) => "true",
            Value::Bool(false) => "false",
            Value::Integer(_) | Value::BigInteger(_) => "Integer",
            Value::Float(_) => "Float",
            Value::Str(_) => "String",
            Value::Symbol(_) => "Symbol",
            Value::Array(_) => "Array",
            Value::Hash(_) => "Hash",
        }
    }

    /// Whether this is `Nil`
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Borrow the bytes of a string value
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Str(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Look up a symbol or string key in a hash value
    pub fn hash_get(&self, key: &str) -> Option<&Value> {
        let Value::Hash(pairs) = self else {
            return None;
        };
        pairs.iter().find_map(|(k, v)| match k {
            Value::Symbol(name) if name == key => Some(v),
            Value::Str(bytes) if bytes.as_ref() == key.as_bytes() => Some(v),
            _ => None,
        })
    }

    /// Implicit integer conversion; floats are truncated toward zero
    pub fn to_int(&self) -> Result<BigInt> {
        match self {
            Value::Integer(i) => Ok(BigInt::from(*i)),
            Value::BigInteger(b) => Ok(b.clone()),
            Value::Float(f) => float_to_bigint(*f).ok_or_else(|| FormatError::conversion(self, "Integer")),
            _ => Err(FormatError::conversion(self, "Integer")),
        }
    }

    /// Low 64 bits of the implicit integer conversion, two's complement
    pub fn to_packed_bits(&self) -> Result<u64> {
        match self {
            Value::Integer(i) => Ok(*i as u64),
            Value::Float(f) if f.is_finite() && f.abs() < 9.0e18 => Ok(f.trunc() as i64 as u64),
            _ => Ok(low_u64(&self.to_int()?)),
        }
    }

    /// Strict integer conversion; numeric strings are parsed
    pub fn to_integer_strict(&self) -> Result<BigInt> {
        match self {
            Value::Str(bytes) => core::str::from_utf8(bytes)
                .ok()
                .and_then(parse_integer_literal)
                .ok_or_else(|| FormatError::conversion(self, "Integer")),
            _ => self.to_int(),
        }
    }

    /// Implicit float conversion
    pub fn to_f64(&self) -> Result<f64> {
        match self {
            Value::Integer(i) => Ok(*i as f64),
            Value::BigInteger(b) => b.to_f64().ok_or_else(|| FormatError::conversion(self, "Float")),
            Value::Float(f) => Ok(*f),
            _ => Err(FormatError::conversion(self, "Float")),
        }
    }

    /// Strict float conversion; numeric strings are parsed
    pub fn to_f64_strict(&self) -> Result<f64> {
        match self {
            Value::Str(bytes) => core::str::from_utf8(bytes)
                .ok()
                .and_then(parse_float_literal)
                .ok_or_else(|| FormatError::conversion(self, "Float")),
            _ => self.to_f64(),
        }
    }

    /// Implicit string conversion; only strings convert
    pub fn to_str(&self) -> Result<Bytes> {
        match self {
            Value::Str(bytes) => Ok(bytes.clone()),
            _ => Err(FormatError::conversion(self, "String")),
        }
    }

    /// Plain textual rendering
    pub fn to_s(&self) -> Bytes {
        match self {
            Value::Nil => Bytes::new(),
            Value::Str(bytes) => bytes.clone(),
            Value::Symbol(name) => Bytes::from(name.clone()),
            Value::Bool(b) => Bytes::from_static(if *b { b"true" } else { b"false" }),
            Value::Integer(i) => Bytes::from(i.to_string()),
            Value::BigInteger(b) => Bytes::from(b.to_string()),
            Value::Float(f) => Bytes::from(float_to_s(*f)),
            Value::Array(_) | Value::Hash(_) => Bytes::from(self.inspect()),
        }
    }

    /// Debug-style rendering (`"text"`, `:sym`, `[1, 2]`, `{key: 1}`)
    pub fn inspect(&self) -> String {
        match self {
            Value::Nil => "nil".to_string(),
            Value::Str(bytes) => inspect_bytes(bytes),
            Value::Symbol(name) => format!(":{}", name),
            Value::Array(items) => {
                let inner: Vec<String> = items.iter().map(Value::inspect).collect();
                format!("[{}]", inner.join(", "))
            }
            Value::Hash(pairs) => {
                if pairs.is_empty() {
                    return "{}".to_string();
                }
                let inner: Vec<String> = pairs
                    .iter()
                    .map(|(k, v)| match k {
                        Value::Symbol(name) => format!("{}: {}", name, v.inspect()),
                        _ => format!("{} => {}", k.inspect(), v.inspect()),
                    })
                    .collect();
                format!("{{{}}}", inner.join(", "))
            }
            _ => String::from_utf8_lossy(&self.to_s()).into_owned(),
        }
    }
}

macro_rules! impl_from_small_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Integer(i64::from(v))
            }
        })*
    };
}

impl_from_small_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::from_u64(v)
    }
}

impl From<i128> for Value {
    fn from(v: i128) -> Self {
        Value::from_bigint(BigInt::from(v))
    }
}

impl From<BigInt> for Value {
    fn from(v: BigInt) -> Self {
        Value::from_bigint(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(Bytes::copy_from_slice(v.as_bytes()))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(Bytes::from(v))
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Str(Bytes::copy_from_slice(v))
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Str(Bytes::from(v))
    }
}

impl From<Bytes> for Value {
    fn from(v: Bytes) -> Self {
        Value::Str(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Nil, Into::into)
    }
}

fn float_to_bigint(f: f64) -> Option<BigInt> {
    if f.is_finite() {
        BigInt::from_f64(f.trunc())
    } else {
        None
    }
}

fn low_u64(value: &BigInt) -> u64 {
    let mask = BigInt::from(u64::MAX);
    (value & &mask).to_u64().unwrap_or(0)
}

/// Parse an integer literal the way `Integer("...")` does
///
/// Accepts surrounding whitespace, a sign, `0x`/`0b`/`0o`/`0d` prefixes, a
/// leading `0` for octal, and single underscores between digits.
pub(crate) fn parse_integer_literal(text: &str) -> Option<BigInt> {
    let text = text.trim();
    let (negative, rest) = match text.as_bytes().first()? {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };

    let lower = rest.to_ascii_lowercase();
    let (radix, digits) = if let Some(d) = lower.strip_prefix("0x") {
        (16, d)
    } else if let Some(d) = lower.strip_prefix("0b") {
        (2, d)
    } else if let Some(d) = lower.strip_prefix("0o") {
        (8, d)
    } else if let Some(d) = lower.strip_prefix("0d") {
        (10, d)
    } else if lower.len() > 1 && lower.starts_with('0') {
        (8, &lower[1..])
    } else {
        (10, lower.as_str())
    };

    let cleaned = strip_underscores(digits)?;
    if !cleaned.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return None;
    }
    let magnitude = BigInt::parse_bytes(cleaned.as_bytes(), radix)?;
    Some(if negative { -magnitude } else { magnitude })
}

/// Parse a float literal the way `Float("...")` does
///
/// The accepted shape is `[sign] digits [. digits] [e [sign] digits]`, or a
/// signed hex integer.
pub(crate) fn parse_float_literal(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    let unsigned = trimmed.strip_prefix(['+', '-']).unwrap_or(trimmed);
    if unsigned.starts_with("0x") || unsigned.starts_with("0X") {
        return parse_integer_literal(trimmed).and_then(|b| b.to_f64());
    }

    let bytes = trimmed.as_bytes();
    let mut pos = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    pos = digit_run(bytes, pos)?;
    if bytes.get(pos) == Some(&b'.') {
        pos = digit_run(bytes, pos + 1)?;
    }
    if matches!(bytes.get(pos), Some(b'e' | b'E')) {
        pos += 1;
        if matches!(bytes.get(pos), Some(b'+' | b'-')) {
            pos += 1;
        }
        pos = digit_run(bytes, pos)?;
    }
    if pos != bytes.len() {
        return None;
    }
    trimmed.replace('_', "").parse::<f64>().ok()
}

/// End of a run of digits starting at `start`; underscores only between digits
fn digit_run(bytes: &[u8], start: usize) -> Option<usize> {
    let mut pos = start;
    while pos < bytes.len() {
        match bytes[pos] {
            b'0'..=b'9' => pos += 1,
            b'_' if pos > start
                && bytes[pos - 1].is_ascii_digit()
                && bytes.get(pos + 1).is_some_and(u8::is_ascii_digit) =>
            {
                pos += 1
            }
            _ => break,
        }
    }
    (pos > start).then_some(pos)
}

fn strip_underscores(digits: &str) -> Option<String> {
    if digits.is_empty() || digits.starts_with('_') || digits.ends_with('_') || digits.contains("__") {
        return None;
    }
    Some(digits.replace('_', ""))
}

/// Shortest round-trip rendering in `Float#to_s` style (`1.0`, `1.0e+20`, `1.0e-05`)
pub(crate) fn float_to_s(f: f64) -> String {
    if f.is_nan() {
        return "NaN".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if f == 0.0 {
        return if f.is_sign_negative() { "-0.0" } else { "0.0" }.to_string();
    }

    let sci = format!("{:e}", f.abs());
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    let decpt = exponent + 1;

    let mut out = String::new();
    if f < 0.0 {
        out.push('-');
    }

    if decpt > 0 && decpt <= 16 {
        let point = decpt as usize;
        if digits.len() <= point {
            out.push_str(&digits);
            out.extend(core::iter::repeat('0').take(point - digits.len()));
            out.push_str(".0");
        } else {
            out.push_str(&digits[..point]);
            out.push('.');
            out.push_str(&digits[point..]);
        }
    } else if decpt <= 0 && decpt > -4 {
        out.push_str("0.");
        out.extend(core::iter::repeat('0').take((-decpt) as usize));
        out.push_str(&digits);
    } else {
        out.push_str(&digits[..1]);
        out.push('.');
        if digits.len() > 1 {
            out.push_str(&digits[1..]);
        } else {
            out.push('0');
        }
        let _ = write!(out, "e{:+03}", decpt - 1);
    }
    out
}

fn inspect_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() + 2);
    out.push('"');
    match core::str::from_utf8(bytes) {
        Ok(text) => {
            for c in text.chars() {
                push_escaped(&mut out, c);
            }
        }
        Err(_) => {
            for &b in bytes {
                if b.is_ascii() {
                    push_escaped(&mut out, b as char);
                } else {
                    let _ = write!(out, "\\x{:02X}", b);
                }
            }
        }
    }
    out.push('"');
    out
}

fn push_escaped(out: &mut String, c: char) {
    match c {
        '"' => out.push_str("\\\""),
        '\\' => out.push_str("\\\\"),
        '\n' => out.push_str("\\n"),
        '\t' => out.push_str("\\t"),
        '\r' => out.push_str("\\r"),
        '\x1b' => out.push_str("\\e"),
        '\x07' => out.push_str("\\a"),
        '\x08' => out.push_str("\\b"),
        '\x0b' => out.push_str("\\v"),
        '\x0c' => out.push_str("\\f"),
        c if (c as u32) < 0x20 || c == '\x7f' => {
            let _ = write!(out, "\\x{:02X}", c as u32);
        }
        c => out.push(c),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_to_s_forms() {
        assert_eq!(float_to_s(1.0), "1.0");
        assert_eq!(float_to_s(1.5), "1.5");
        assert_eq!(float_to_s(-2.25), "-2.25");
        assert_eq!(float_to_s(100.0), "100.0");
        assert_eq!(float_to_s(1e15), "1000000000000000.0");
        assert_eq!(float_to_s(1e16), "1.0e+16");
        assert_eq!(float_to_s(1e20), "1.0e+20");
        assert_eq!(float_to_s(0.0001), "0.0001");
        assert_eq!(float_to_s(0.00001), "1.0e-05");
        assert_eq!(float_to_s(1.25e-7), "1.25e-07");
        assert_eq!(float_to_s(f64::INFINITY), "Infinity");
        assert_eq!(float_to_s(f64::NAN), "NaN");
        assert_eq!(float_to_s(-0.0), "-0.0");
    }

    #[test]
    fn test_inspect() {
        assert_eq!(Value::Nil.inspect(), "nil");
        assert_eq!(Value::from("a\"b\n").inspect(), "\"a\\\"b\\n\"");
        assert_eq!(Value::from(&b"\xff"[..]).inspect(), "\"\\xFF\"");
        assert_eq!(Value::symbol("k").inspect(), ":k");
        assert_eq!(
            Value::from(vec![Value::from(1), Value::from("x")]).inspect(),
            "[1, \"x\"]"
        );
        assert_eq!(Value::hash([("a", Value::from(1))]).inspect(), "{a: 1}");
    }

    #[test]
    fn test_to_s() {
        assert_eq!(Value::Nil.to_s(), Bytes::new());
        assert_eq!(Value::from(42).to_s(), Bytes::from("42"));
        assert_eq!(Value::symbol("sym").to_s(), Bytes::from("sym"));
        assert_eq!(Value::from(true).to_s(), Bytes::from("true"));
    }

    #[test]
    fn test_to_packed_bits_wraps() {
        assert_eq!(Value::from(-1).to_packed_bits().unwrap(), u64::MAX);
        assert_eq!(Value::from(2.9).to_packed_bits().unwrap(), 2);
        let big = Value::from_bigint(BigInt::from(u64::MAX) + 5);
        assert_eq!(big.to_packed_bits().unwrap(), 4);
        assert!(Value::Nil.to_packed_bits().is_err());
        assert!(Value::from(f64::NAN).to_packed_bits().is_err());
    }

    #[test]
    fn test_strict_integer_parsing() {
        assert_eq!(parse_integer_literal("42"), Some(BigInt::from(42)));
        assert_eq!(parse_integer_literal(" -0x1f "), Some(BigInt::from(-31)));
        assert_eq!(parse_integer_literal("0b101"), Some(BigInt::from(5)));
        assert_eq!(parse_integer_literal("017"), Some(BigInt::from(15)));
        assert_eq!(parse_integer_literal("1_000"), Some(BigInt::from(1000)));
        assert_eq!(parse_integer_literal("1__0"), None);
        assert_eq!(parse_integer_literal("abc"), None);
        assert_eq!(parse_integer_literal(""), None);
    }

    #[test]
    fn test_integer_rejects_repeated_signs() {
        for text in ["--5", "+-5", "-+5", "0x-5", "-0x-5", "0b+1", "0o-7", "0-7", "+"] {
            assert_eq!(parse_integer_literal(text), None, "{}", text);
        }
    }

    #[test]
    fn test_strict_float_parsing() {
        assert_eq!(parse_float_literal("1.5"), Some(1.5));
        assert_eq!(parse_float_literal("-2e3"), Some(-2000.0));
        assert_eq!(parse_float_literal("1_000.5"), Some(1000.5));
        assert_eq!(parse_float_literal("inf"), None);
        assert_eq!(parse_float_literal("1."), None);
        assert_eq!(parse_float_literal("0x10"), Some(16.0));
        assert_eq!(parse_float_literal("-0x10"), Some(-16.0));
        assert_eq!(parse_float_literal("2.5E-1"), Some(0.25));
    }

    #[test]
    fn test_float_rejects_malformed_shapes() {
        for text in ["1.e5", ".5", "--1.5", "+-1", "1e", "1e+", "1_.5", "1._5", "1.5e5.0", "-0x-1", "1e5_"] {
            assert_eq!(parse_float_literal(text), None, "{}", text);
        }
    }

    #[test]
    fn test_conversion_error_carries_value_and_target() {
        let err = Value::Nil.to_str().unwrap_err();
        assert_eq!(
            err,
            FormatError::Conversion {
                value: "nil".to_string(),
                target: "String"
            }
        );
    }

    #[test]
    fn test_normalization() {
        assert_eq!(Value::from(u64::MAX), Value::BigInteger(BigInt::from(u64::MAX)));
        assert_eq!(Value::from_bigint(BigInt::from(7)), Value::Integer(7));
        assert_eq!(
            Value::hash([("name", Value::from("x"))]).hash_get("name"),
            Some(&Value::from("x"))
        );
    }
}
