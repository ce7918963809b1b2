use anyhow::{bail, Context, Result};
use serde_json::Value as Json;
use std::fs;
use std::io::{self, Read};
use stencil_core::{CompileOptions, UnpackProgram};
use tracing::info;

use crate::value_to_json;

/// Compile `template` with `options` and unpack `data` into a JSON array
pub fn run(template: &str, data: &[u8], options: &CompileOptions) -> Result<Json> {
    let program = UnpackProgram::compile_with(template, options)
        .with_context(|| format!("Failed to compile unpack template: {}", template))?;
    let values = program
        .execute(data)
        .with_context(|| "Failed to unpack input")?;
    Ok(Json::Array(values.iter().map(value_to_json).collect()))
}

pub fn execute(
    template: &str,
    input: Option<&str>,
    hex_input: Option<&str>,
    options: &CompileOptions,
) -> Result<()> {
    let data = match (input, hex_input) {
        (Some("-"), None) => {
            let mut buf = Vec::new();
            io::stdin().read_to_end(&mut buf)?;
            buf
        }
        (Some(path), None) => {
            fs::read(path).with_context(|| format!("Failed to read input file: {}", path))?
        }
        (None, Some(text)) => hex::decode(text.trim()).with_context(|| "Failed to decode --hex input")?,
        _ => bail!("Provide exactly one of --input or --hex"),
    };

    info!("Unpacking {} bytes with template {:?}", data.len(), template);
    let json = run(template, &data, options)?;
    println!("{}", serde_json::to_string_pretty(&json)?);

    Ok(())
}
