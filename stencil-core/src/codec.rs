//! Byte-level text codecs behind the string directives
//!
//! `u` (UU), `m` (base64), `M` (quoted-printable), `w` (BER), `B b H h`
//! (bit and hex strings) and `U` (UTF-8, extended up to six bytes).

use crate::constants::MAX_UTF8_CODEPOINT;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use num_bigint::{BigInt, Sign};
use num_traits::{ToPrimitive, Zero};

const UU_TABLE: &[u8; 64] = b"`!\"#$%&'()*+,-./0123456789:;<=>?@ABCDEFGHIJKLMNOPQRSTUVWXYZ[\\]^_";
const HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";
const HEX_LOWER: &[u8; 16] = b"0123456789abcdef";

/// Tolerates missing padding and stray low bits in the final quantum
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

fn uu_groups(out: &mut Vec<u8>, chunk: &[u8]) {
    for group in chunk.chunks(3) {
        let b0 = group[0];
        let b1 = group.get(1).copied().unwrap_or(0);
        let b2 = group.get(2).copied().unwrap_or(0);
        out.push(UU_TABLE[usize::from(b0 >> 2)]);
        out.push(UU_TABLE[usize::from(((b0 << 4) & 0x30) | (b1 >> 4))]);
        match group.len() {
            1 => out.extend_from_slice(&[b'`', b'`']),
            2 => {
                out.push(UU_TABLE[usize::from((b1 << 2) & 0x3c)]);
                out.push(b'`');
            }
            _ => {
                out.push(UU_TABLE[usize::from(((b1 << 2) & 0x3c) | (b2 >> 6))]);
                out.push(UU_TABLE[usize::from(b2 & 0x3f)]);
            }
        }
    }
}

/// UU-encode `data` in lines of `line_bytes` input bytes
pub fn uu_encode(data: &[u8], line_bytes: usize, out: &mut Vec<u8>) {
    for line in data.chunks(line_bytes.max(1)) {
        // length prefix is at most 63 + 32, always printable
        out.push(line.len() as u8 + b' ');
        uu_groups(out, line);
        out.push(b'\n');
    }
}

/// Decode UU text; stops quietly at the first line that is not UU data
///
/// Returns the decoded bytes and the number of input bytes consumed.
pub fn uu_decode(data: &[u8]) -> (Vec<u8>, usize) {
    let sixbit = |c: Option<&u8>| match c {
        Some(&c) if (b' '..b'a').contains(&c) => (c - b' ') & 0x3f,
        _ => 0,
    };

    let mut out = Vec::with_capacity(data.len() * 3 / 4);
    let mut pos = 0;

    while let Some(&head) = data.get(pos).filter(|&&c| c > b' ' && c < b'a') {
        pos += 1;
        let mut len = usize::from((head - b' ') & 0x3f);
        while len > 0 {
            let take = len.min(3);
            let mut quad = [0u8; 4];
            for q in quad.iter_mut() {
                let c = data.get(pos);
                *q = sixbit(c);
                if c.is_some_and(|&c| (b' '..b'a').contains(&c)) {
                    pos += 1;
                }
            }
            let hunk = [
                (quad[0] << 2) | (quad[1] >> 4),
                (quad[1] << 4) | (quad[2] >> 2),
                (quad[2] << 6) | quad[3],
            ];
            out.extend_from_slice(&hunk[..take]);
            len -= take;
        }
        match data.get(pos) {
            Some(b'\r') | Some(b'\n') => pos += 1,
            Some(_) if pos + 1 == data.len() || data.get(pos + 1) == Some(&b'\n') => {
                pos = (pos + 2).min(data.len());
            }
            _ => {}
        }
    }

    (out, pos)
}

/// Base64-encode `data`
///
/// With `Some(n)` the output is split into newline-terminated lines of `n`
/// input bytes; `None` is strict RFC 4648 output without line feeds.
pub fn base64_encode(data: &[u8], line_bytes: Option<usize>, out: &mut Vec<u8>) {
    match line_bytes {
        None => out.extend_from_slice(STANDARD.encode(data).as_bytes()),
        Some(n) => {
            for line in data.chunks(n.max(1)) {
                out.extend_from_slice(STANDARD.encode(line).as_bytes());
                out.push(b'\n');
            }
        }
    }
}

/// Lenient base64 decode: characters outside the alphabet are skipped and
/// the first `=` ends the data
pub fn base64_decode(data: &[u8]) -> Vec<u8> {
    let mut sextets: Vec<u8> = data
        .iter()
        .copied()
        .take_while(|&c| c != b'=')
        .filter(|&c| c.is_ascii_alphanumeric() || c == b'+' || c == b'/')
        .collect();
    // a lone trailing sextet carries no whole byte
    if sextets.len() % 4 == 1 {
        sextets.pop();
    }
    LENIENT_BASE64.decode(&sextets).unwrap_or_default()
}

/// Strict RFC 4648 decode; `None` on any deviation
///
/// The length must be a multiple of four, padding may only close the final
/// quantum and the unused bits of a padded quantum must be zero.
pub fn base64_decode_strict(data: &[u8]) -> Option<Vec<u8>> {
    STANDARD.decode(data).ok()
}

/// Quoted-printable encode (RFC 2045) with soft breaks after `line_max` columns
pub fn qp_encode(data: &[u8], line_max: usize, out: &mut Vec<u8>) {
    let mut line_len = 0usize;
    let mut prev: Option<u8> = None;

    for &c in data {
        if c > 126 || (c < 32 && c != b'\n' && c != b'\t') || c == b'=' {
            out.extend_from_slice(&[b'=', HEX_UPPER[usize::from(c >> 4)], HEX_UPPER[usize::from(c & 15)]]);
            line_len += 3;
            prev = None;
        } else if c == b'\n' {
            if matches!(prev, Some(b' ') | Some(b'\t')) {
                out.extend_from_slice(b"=\n");
            }
            out.push(b'\n');
            line_len = 0;
            prev = Some(c);
        } else {
            out.push(c);
            line_len += 1;
            prev = Some(c);
        }
        if line_len > line_max {
            out.extend_from_slice(b"=\n");
            line_len = 0;
            prev = Some(b'\n');
        }
    }

    if line_len > 0 {
        out.extend_from_slice(b"=\n");
    }
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Quoted-printable decode; a malformed escape ends the data
pub fn qp_decode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut pos = 0;

    while pos < data.len() {
        if data[pos] == b'=' {
            pos += 1;
            if pos == data.len() {
                break;
            }
            if data[pos] == b'\r' && data.get(pos + 1) == Some(&b'\n') {
                pos += 1;
            }
            if data[pos] != b'\n' {
                let Some(hi) = hex_value(data[pos]) else {
                    break;
                };
                pos += 1;
                let Some(lo) = data.get(pos).copied().and_then(hex_value) else {
                    break;
                };
                out.push((hi << 4) | lo);
            }
        } else {
            out.push(data[pos]);
        }
        pos += 1;
    }
    out
}

/// BER-compress a non-negative integer; `None` for negative input
pub fn ber_encode(value: &BigInt) -> Option<Vec<u8>> {
    if value.sign() == Sign::Minus {
        return None;
    }
    if value.is_zero() {
        return Some(vec![0]);
    }
    let mut out = value.to_radix_le(128).1;
    out.reverse();
    let last = out.len() - 1;
    for b in &mut out[..last] {
        *b |= 0x80;
    }
    Some(out)
}

/// Decode one BER-compressed integer from the front of `data`
///
/// Returns the value and the bytes consumed, or `None` if the data ends
/// before a terminating byte.
pub fn ber_decode(data: &[u8]) -> Option<(BigInt, usize)> {
    let end = data.iter().position(|b| b & 0x80 == 0)?;
    let digits: Vec<u8> = data[..=end].iter().map(|b| b & 0x7f).collect();
    let value = BigInt::from_radix_be(Sign::Plus, &digits, 128).unwrap_or_default();
    Some((value, end + 1))
}

/// Pack a `0`/`1` string into bytes, using the low bit of each character
///
/// The output holds `ceil(bits / 8)` bytes; bits past the end of `text` are zero.
pub fn bits_to_bytes(text: &[u8], bits: usize, msb_first: bool) -> Vec<u8> {
    let mut out = vec![0u8; bits.div_ceil(8)];
    for (i, &c) in text.iter().take(bits).enumerate() {
        if c & 1 == 1 {
            let shift = if msb_first { 7 - (i % 8) } else { i % 8 };
            out[i / 8] |= 1 << shift;
        }
    }
    out
}

/// Render the first `bits` bits of `data` as a `0`/`1` string
pub fn bytes_to_bits(data: &[u8], bits: usize, msb_first: bool) -> Vec<u8> {
    let bits = bits.min(data.len() * 8);
    (0..bits)
        .map(|i| {
            let shift = if msb_first { 7 - (i % 8) } else { i % 8 };
            if (data[i / 8] >> shift) & 1 == 1 {
                b'1'
            } else {
                b'0'
            }
        })
        .collect()
}

/// Pack a hex digit string into bytes
///
/// Letters map through `((c & 15) + 9) & 15` so `a`..`f` and `A`..`F` both
/// work; other characters contribute their low nibble.
pub fn hex_to_bytes(text: &[u8], nibbles: usize, high_first: bool) -> Vec<u8> {
    let mut out = vec![0u8; nibbles.div_ceil(2)];
    for (i, &c) in text.iter().take(nibbles).enumerate() {
        let nibble = if c.is_ascii_alphabetic() {
            ((c & 15) + 9) & 15
        } else {
            c & 15
        };
        let first = i % 2 == 0;
        let shift = if first == high_first { 4 } else { 0 };
        out[i / 2] |= nibble << shift;
    }
    out
}

/// Render the first `nibbles` nibbles of `data` as lowercase hex
pub fn bytes_to_hex(data: &[u8], nibbles: usize, high_first: bool) -> Vec<u8> {
    let nibbles = nibbles.min(data.len() * 2);
    (0..nibbles)
        .map(|i| {
            let byte = data[i / 2];
            let first = i % 2 == 0;
            let nibble = if first == high_first { byte >> 4 } else { byte & 15 };
            HEX_LOWER[usize::from(nibble)]
        })
        .collect()
}

/// Encode a codepoint as UTF-8, allowing the historical five and six byte forms
///
/// `None` when the value is negative or above `0x7FFF_FFFF`.
pub fn utf8_encode(value: &BigInt) -> Option<Vec<u8>> {
    let cp = value.to_u64().filter(|&cp| cp <= MAX_UTF8_CODEPOINT)?;
    let cp = cp as u32;

    let len = match cp {
        0..=0x7f => return Some(vec![cp as u8]),
        0x80..=0x7ff => 2,
        0x800..=0xffff => 3,
        0x1_0000..=0x1f_ffff => 4,
        0x20_0000..=0x3ff_ffff => 5,
        _ => 6,
    };
    const LEAD: [u8; 7] = [0, 0, 0xc0, 0xe0, 0xf0, 0xf8, 0xfc];

    let mut out = vec![0u8; len];
    let mut rest = cp;
    for b in out[1..].iter_mut().rev() {
        *b = 0x80 | (rest & 0x3f) as u8;
        rest >>= 6;
    }
    out[0] = LEAD[len] | rest as u8;
    Some(out)
}

/// Decode one extended UTF-8 character from the front of `data`
///
/// Returns the codepoint and byte length, or a description of the defect.
pub fn utf8_decode(data: &[u8]) -> Result<(u32, usize), &'static str> {
    let lead = *data.first().ok_or("malformed UTF-8 character")?;
    if lead < 0x80 {
        return Ok((u32::from(lead), 1));
    }

    let (len, bits) = match lead {
        0xc0..=0xdf => (2, lead & 0x1f),
        0xe0..=0xef => (3, lead & 0x0f),
        0xf0..=0xf7 => (4, lead & 0x07),
        0xf8..=0xfb => (5, lead & 0x03),
        0xfc..=0xfd => (6, lead & 0x01),
        _ => return Err("malformed UTF-8 character"),
    };
    if data.len() < len {
        return Err("malformed UTF-8 character (truncated)");
    }

    let mut cp = u32::from(bits);
    for &b in &data[1..len] {
        if b & 0xc0 != 0x80 {
            return Err("malformed UTF-8 character");
        }
        cp = (cp << 6) | u32::from(b & 0x3f);
    }

    const MIN: [u32; 7] = [0, 0, 0x80, 0x800, 0x1_0000, 0x20_0000, 0x400_0000];
    if cp < MIN[len] {
        return Err("redundant UTF-8 sequence");
    }
    Ok((cp, len))
}
