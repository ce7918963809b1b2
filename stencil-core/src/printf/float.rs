//! Floating-point conversions: `f e E g G a A`

use super::parser::{Flags, FloatStyle};
use crate::constants::DEFAULT_FLOAT_PRECISION;

/// Render `value` the way C `printf` does
///
/// Infinity and NaN print as `Inf`/`NaN` and are always padded with spaces.
pub(super) fn format_float(
    value: f64,
    style: FloatStyle,
    upper: bool,
    flags: Flags,
    width: Option<usize>,
    precision: Option<usize>,
) -> Vec<u8> {
    let sign = if value.is_sign_negative() && !value.is_nan() {
        "-"
    } else if flags.plus {
        "+"
    } else if flags.space {
        " "
    } else {
        ""
    };

    if !value.is_finite() {
        let body = if value.is_nan() { "NaN" } else { "Inf" };
        return pad(sign, "", body, flags.minus, false, width);
    }

    let abs = value.abs();
    let (prefix, body) = match style {
        FloatStyle::Fixed => ("", fixed(abs, precision.unwrap_or(DEFAULT_FLOAT_PRECISION), flags.alt)),
        FloatStyle::Exponent => (
            "",
            exponent(abs, precision.unwrap_or(DEFAULT_FLOAT_PRECISION), flags.alt, upper),
        ),
        FloatStyle::General => ("", general(abs, precision, flags.alt, upper)),
        FloatStyle::Hex => (if upper { "0X" } else { "0x" }, hex(abs, precision, flags.alt, upper)),
    };

    pad(sign, prefix, &body, flags.minus, flags.zero, width)
}

fn pad(sign: &str, prefix: &str, body: &str, left: bool, zero: bool, width: Option<usize>) -> Vec<u8> {
    let len = sign.len() + prefix.len() + body.len();
    let gap = width.unwrap_or(0).saturating_sub(len);
    let mut out = Vec::with_capacity(len + gap);

    if left {
        out.extend_from_slice(sign.as_bytes());
        out.extend_from_slice(prefix.as_bytes());
        out.extend_from_slice(body.as_bytes());
        out.resize(out.len() + gap, b' ');
    } else if zero {
        out.extend_from_slice(sign.as_bytes());
        out.extend_from_slice(prefix.as_bytes());
        out.resize(out.len() + gap, b'0');
        out.extend_from_slice(body.as_bytes());
    } else {
        out.resize(gap, b' ');
        out.extend_from_slice(sign.as_bytes());
        out.extend_from_slice(prefix.as_bytes());
        out.extend_from_slice(body.as_bytes());
    }
    out
}

fn fixed(abs: f64, precision: usize, alt: bool) -> String {
    let mut s = format!("{:.*}", precision, abs);
    if alt && precision == 0 {
        s.push('.');
    }
    s
}

/// Split Rust's `1.5e3` rendering into mantissa and exponent
fn scientific(abs: f64, precision: usize) -> (String, i32) {
    let s = format!("{:.*e}", precision, abs);
    match s.split_once('e') {
        Some((mantissa, exp)) => (mantissa.to_string(), exp.parse().unwrap_or(0)),
        None => (s, 0),
    }
}

fn exponent_suffix(exp: i32, upper: bool) -> String {
    let e = if upper { 'E' } else { 'e' };
    let sign = if exp < 0 { '-' } else { '+' };
    format!("{}{}{:02}", e, sign, exp.unsigned_abs())
}

fn exponent(abs: f64, precision: usize, alt: bool, upper: bool) -> String {
    let (mut mantissa, exp) = scientific(abs, precision);
    if alt && precision == 0 {
        mantissa.push('.');
    }
    mantissa + &exponent_suffix(exp, upper)
}

fn strip_fraction_zeros(s: &mut String) {
    if s.contains('.') {
        let trimmed = s.trim_end_matches('0').trim_end_matches('.').len();
        s.truncate(trimmed);
    }
}

fn general(abs: f64, precision: Option<usize>, alt: bool, upper: bool) -> String {
    let p = match precision.unwrap_or(DEFAULT_FLOAT_PRECISION) {
        0 => 1,
        p => p,
    };
    let x = if abs == 0.0 { 0 } else { scientific(abs, p - 1).1 };

    if x >= -4 && (x as i64) < p as i64 {
        let mut s = format!("{:.*}", (p as i64 - 1 - x as i64) as usize, abs);
        if alt {
            if !s.contains('.') {
                s.push('.');
            }
        } else {
            strip_fraction_zeros(&mut s);
        }
        s
    } else {
        let (mut mantissa, exp) = scientific(abs, p - 1);
        if alt {
            if !mantissa.contains('.') {
                mantissa.push('.');
            }
        } else {
            strip_fraction_zeros(&mut mantissa);
        }
        mantissa + &exponent_suffix(exp, upper)
    }
}

/// `%a` body without the `0x` prefix, e.g. `1.8p+1`
fn hex(abs: f64, precision: Option<usize>, alt: bool, upper: bool) -> String {
    const FRACTION_DIGITS: usize = 13;
    const FRACTION_MASK: u64 = (1 << 52) - 1;

    let bits = abs.to_bits();
    let biased = ((bits >> 52) & 0x7ff) as i32;
    let fraction = bits & FRACTION_MASK;

    let (lead, exp) = match (biased, fraction) {
        (0, 0) => (0u64, 0),
        (0, _) => (0, -1022),
        _ => (1, biased - 1023),
    };

    let mut mantissa = (lead << 52) | fraction;
    let digits = match precision {
        None => {
            let mut digits = FRACTION_DIGITS;
            while digits > 0 && mantissa & 0xf == 0 {
                mantissa >>= 4;
                digits -= 1;
            }
            digits
        }
        Some(p) if p < FRACTION_DIGITS => {
            let shift = (FRACTION_DIGITS - p) * 4;
            let rem = mantissa & ((1u64 << shift) - 1);
            let half = 1u64 << (shift - 1);
            mantissa >>= shift;
            if rem > half || (rem == half && mantissa & 1 == 1) {
                mantissa += 1;
            }
            p
        }
        Some(p) => p,
    };

    let (int_part, frac_part) = if digits <= FRACTION_DIGITS {
        (mantissa >> (digits * 4), mantissa & ((1u64 << (digits * 4)) - 1))
    } else {
        (mantissa >> 52, mantissa & FRACTION_MASK)
    };

    let mut out = format!("{:x}", int_part);
    if digits > 0 || alt {
        out.push('.');
    }
    if digits > 0 {
        let shown = digits.min(FRACTION_DIGITS);
        out.push_str(&format!("{:0width$x}", frac_part, width = shown));
        out.extend(core::iter::repeat('0').take(digits - shown));
    }
    out.push('p');
    out.push_str(&format!("{:+}", exp));
    if upper {
        out.make_ascii_uppercase();
    }
    out
}
