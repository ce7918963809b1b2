//! Library entry for stencil-cli used by integration tests and embedding.

pub mod commands;

/// Which template language a command targets
#[derive(Copy, Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Frontend {
    /// Pack directives
    Pack,
    /// Unpack directives
    Unpack,
    /// Printf conversions
    Printf,
}

use anyhow::{bail, Context, Result};
use serde_json::{Map, Number, Value as Json};
use std::fs;
use stencil_core::{CompileOptions, Value};

/// Compile options from an optional JSON config file plus flag overrides
pub fn load_options(
    config: Option<&str>,
    no_loop_recovery: bool,
    unroll_limit: Option<usize>,
) -> Result<CompileOptions> {
    let mut options = match config {
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path))?
        }
        None => CompileOptions::default(),
    };

    if no_loop_recovery {
        options.loop_recovery = false;
    }
    if let Some(limit) = unroll_limit {
        options.unroll_limit = limit;
    }
    Ok(options)
}

/// Convert a JSON document into an argument value
///
/// Objects become hashes keyed by symbols so `%<name>` and `%{name}` can
/// look them up.
pub fn json_to_value(json: &Json) -> Value {
    match json {
        Json::Null => Value::Nil,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else if let Some(u) = n.as_u64() {
                Value::from_u64(u)
            } else {
                Value::Float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Json::String(s) => Value::from(s.as_str()),
        Json::Array(items) => Value::Array(items.iter().map(json_to_value).collect()),
        Json::Object(map) => Value::Hash(
            map.iter()
                .map(|(k, v)| (Value::symbol(k.as_str()), json_to_value(v)))
                .collect(),
        ),
    }
}

/// Parse a JSON array of arguments
pub fn parse_values(text: &str) -> Result<Vec<Value>> {
    let json: Json = serde_json::from_str(text).with_context(|| "Failed to parse JSON values")?;
    match json {
        Json::Array(items) => Ok(items.iter().map(json_to_value).collect()),
        other => bail!("Expected a JSON array of values, got {}", other),
    }
}

/// Parse one command-line argument as JSON, falling back to a plain string
pub fn parse_arg(text: &str) -> Value {
    serde_json::from_str::<Json>(text)
        .map(|json| json_to_value(&json))
        .unwrap_or_else(|_| Value::from(text))
}

/// Render an unpacked value as JSON
///
/// Byte strings that are not valid UTF-8 become `{"hex": "..."}` and
/// integers outside the JSON number range become decimal strings.
pub fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Nil => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Integer(i) => Json::from(*i),
        Value::BigInteger(b) => {
            let text = b.to_string();
            text.parse::<u64>().map_or(Json::String(text), Json::from)
        }
        Value::Float(f) => Number::from_f64(*f).map_or_else(|| Json::String(f.to_string()), Json::Number),
        Value::Str(bytes) => match std::str::from_utf8(bytes) {
            Ok(text) => Json::String(text.to_string()),
            Err(_) => {
                let mut map = Map::new();
                map.insert("hex".to_string(), Json::String(hex::encode(bytes)));
                Json::Object(map)
            }
        },
        Value::Symbol(name) => Json::String(name.clone()),
        Value::Array(items) => Json::Array(items.iter().map(value_to_json).collect()),
        Value::Hash(pairs) => Json::Object(
            pairs
                .iter()
                .map(|(k, v)| (String::from_utf8_lossy(&k.to_s()).into_owned(), value_to_json(v)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_round_trip() {
        let values = parse_values(r#"[1, -2, 2.5, "hi", null, true, {"k": 3}]"#).unwrap();
        assert_eq!(values[0], Value::Integer(1));
        assert_eq!(values[2], Value::Float(2.5));
        assert_eq!(values[3], Value::from("hi"));
        assert_eq!(values[6].hash_get("k"), Some(&Value::Integer(3)));

        let json: Vec<Json> = values.iter().map(value_to_json).collect();
        assert_eq!(
            Json::Array(json).to_string(),
            r#"[1,-2,2.5,"hi",null,true,{"k":3}]"#
        );
    }

    #[test]
    fn test_binary_strings_render_as_hex() {
        let json = value_to_json(&Value::from(vec![0xffu8, 0x00]));
        assert_eq!(json.to_string(), r#"{"hex":"ff00"}"#);
    }

    #[test]
    fn test_big_integers() {
        assert_eq!(value_to_json(&Value::from_u64(u64::MAX)).to_string(), "18446744073709551615");
        let wide = Value::from(i128::from(u64::MAX) + 1);
        assert_eq!(value_to_json(&wide).to_string(), "\"18446744073709551616\"");
    }

    #[test]
    fn test_parse_arg_falls_back_to_string() {
        assert_eq!(parse_arg("42"), Value::Integer(42));
        assert_eq!(parse_arg("hello"), Value::from("hello"));
        assert_eq!(parse_arg("\"quoted\""), Value::from("quoted"));
    }

    #[test]
    fn test_rejects_non_array_values() {
        assert!(parse_values(r#"{"a": 1}"#).is_err());
    }
}
