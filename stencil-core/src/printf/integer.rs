//! Integer conversions: `d i u b B o x X`

use super::parser::{Flags, Radix};
use num_bigint::BigInt;
use num_traits::{Signed, Zero};

/// Render `value` with flags, a resolved width and an optional precision
///
/// Negative values in a non-decimal base without `+` or space are printed as
/// two's-complement digits behind a `..` marker (`-255` in hex is `..f01`);
/// padding those uses the base's highest digit.
pub(super) fn format_integer(
    value: &BigInt,
    radix: Radix,
    upper: bool,
    flags: Flags,
    width: Option<usize>,
    precision: Option<usize>,
) -> Vec<u8> {
    let negative = value.is_negative();
    let dots = negative && radix != Radix::Decimal && !flags.plus && !flags.space;

    let sign = if negative && !dots {
        "-"
    } else if flags.plus && !negative {
        "+"
    } else if flags.space && !negative {
        " "
    } else {
        ""
    };

    let mut digits = if dots {
        twos_complement_digits(value, radix.base())
    } else {
        value.magnitude().to_str_radix(radix.base())
    };
    if upper {
        digits.make_ascii_uppercase();
    }
    if flags.group && radix == Radix::Decimal {
        digits = group_thousands(&digits);
    }

    let mut prefix = match (flags.alt && !value.is_zero(), radix) {
        (false, _) | (true, Radix::Decimal) => "",
        (true, Radix::Hex) => {
            if upper {
                "0X"
            } else {
                "0x"
            }
        }
        (true, Radix::Binary) => {
            if upper {
                "0B"
            } else {
                "0b"
            }
        }
        (true, Radix::Octal) => "0",
    };
    if radix == Radix::Octal && (dots || precision.is_some_and(|p| p > digits.len())) {
        prefix = "";
    }
    if precision == Some(0) && value.is_zero() {
        digits.clear();
    }

    let marker = if dots { ".." } else { "" };
    let mut pad = width
        .unwrap_or(0)
        .saturating_sub(sign.len() + prefix.len() + marker.len());
    let target = match precision {
        None if flags.zero && !flags.minus => core::mem::take(&mut pad),
        None => 0,
        Some(p) => p.saturating_sub(marker.len()),
    };
    let fill_count = target.saturating_sub(digits.len());
    pad = pad.saturating_sub(digits.len() + fill_count);
    let fill = if dots { max_digit(radix, upper) } else { b'0' };

    let mut out = Vec::with_capacity(pad + sign.len() + prefix.len() + 2 + fill_count + digits.len());
    if !flags.minus {
        out.resize(pad, b' ');
    }
    out.extend_from_slice(sign.as_bytes());
    out.extend_from_slice(prefix.as_bytes());
    out.extend_from_slice(marker.as_bytes());
    out.resize(out.len() + fill_count, fill);
    out.extend_from_slice(digits.as_bytes());
    if flags.minus {
        out.resize(out.len() + pad, b' ');
    }
    out
}

fn max_digit(radix: Radix, upper: bool) -> u8 {
    match radix {
        Radix::Binary => b'1',
        Radix::Octal => b'7',
        Radix::Decimal => b'9',
        Radix::Hex if upper => b'F',
        Radix::Hex => b'f',
    }
}

/// Shortest digit string `s` of length `d` with `value + base^d == s`
/// whose first digit is the highest digit of the base
fn twos_complement_digits(value: &BigInt, base: u32) -> String {
    let top = char::from_digit(base - 1, base).unwrap_or('f');
    let mut d = value.magnitude().to_str_radix(base).len().saturating_sub(1).max(1);
    loop {
        let shifted = value + BigInt::from(base).pow(d as u32);
        if !shifted.is_negative() {
            let raw = shifted.to_str_radix(base);
            let digits = format!("{}{}", "0".repeat(d.saturating_sub(raw.len())), raw);
            if digits.starts_with(top) {
                return digits;
            }
        }
        d += 1;
    }
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
