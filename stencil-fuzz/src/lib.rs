//! Fuzz entry points for stencil-core
//!
//! To use with cargo-fuzz:
//! 1. Install cargo-fuzz: cargo install cargo-fuzz
//! 2. Run fuzzer: cargo fuzz run fuzz_pack
//!
//! Each entry point splits its input at the first NUL byte into a template
//! and a payload. Templates with a count above five digits, or more than
//! eight count digits in total, are skipped so `@99999999` or nested
//! repeats cannot exhaust memory.

use stencil_core::{pack, sprintf, unpack, Value};

const MAX_TEMPLATE_LEN: usize = 256;
const MAX_DIGIT_RUN: usize = 5;
const MAX_DIGITS: usize = 8;

fn split(data: &[u8]) -> Option<(String, &[u8])> {
    let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
    let template = String::from_utf8_lossy(&data[..end]).into_owned();
    if template.len() > MAX_TEMPLATE_LEN {
        return None;
    }

    let mut run = 0;
    let mut total = 0;
    for b in template.bytes() {
        run = if b.is_ascii_digit() { run + 1 } else { 0 };
        total += usize::from(b.is_ascii_digit());
        if run > MAX_DIGIT_RUN || total > MAX_DIGITS {
            return None;
        }
    }

    Some((template, data.get(end + 1..).unwrap_or(&[])))
}

/// Arguments derived from raw bytes: alternating integers, floats and strings
///
/// Integers come from at most two bytes so a `*` width stays small.
fn arguments(payload: &[u8]) -> Vec<Value> {
    payload
        .chunks(4)
        .enumerate()
        .map(|(i, chunk)| match i % 3 {
            0 => Value::from(chunk.iter().take(2).fold(0i64, |acc, &b| (acc << 8) | i64::from(b))),
            1 => Value::from(f64::from(chunk[0]) / 3.0),
            _ => Value::from(chunk),
        })
        .collect()
}

pub fn fuzz_pack(data: &[u8]) {
    if let Some((template, payload)) = split(data) {
        // Should either succeed or return an error, never panic
        let _ = pack(&template, &arguments(payload));
    }
}

pub fn fuzz_unpack(data: &[u8]) {
    if let Some((template, payload)) = split(data) {
        let _ = unpack(&template, payload);
    }
}

pub fn fuzz_sprintf(data: &[u8]) {
    if let Some((template, payload)) = split(data) {
        let _ = sprintf(&template, &arguments(payload));
    }
}
