use anyhow::{bail, Context, Result};
use std::fs;
use stencil_core::{CompileOptions, PackProgram, Packed, Value};
use tracing::info;

use crate::parse_values;

/// Compile `template` with `options` and pack `values`
pub fn run(template: &str, values: &[Value], options: &CompileOptions) -> Result<Packed> {
    let program = PackProgram::compile_with(template, options)
        .with_context(|| format!("Failed to compile pack template: {}", template))?;
    let packed = program
        .execute(values)
        .with_context(|| "Failed to pack values")?;
    Ok(packed)
}

pub fn execute(
    template: &str,
    values: Option<&str>,
    input: Option<&str>,
    output: Option<&str>,
    options: &CompileOptions,
) -> Result<()> {
    let text = match (values, input) {
        (Some(json), None) => json.to_string(),
        (None, Some(path)) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file: {}", path))?,
        _ => bail!("Provide exactly one of --values or --input"),
    };
    let values = parse_values(&text)?;

    info!("Packing {} values with template {:?}", values.len(), template);
    let packed = run(template, &values, options)?;

    match output {
        Some(path) => {
            fs::write(path, &packed.bytes)
                .with_context(|| format!("Failed to write output file: {}", path))?;
            info!(
                "Wrote {} bytes ({}) to {}",
                packed.len(),
                packed.encoding,
                path
            );
        }
        None => println!("{}", hex::encode(&packed.bytes)),
    }

    Ok(())
}
