use anyhow::{Context, Result};
use bytes::Bytes;
use std::io::{self, Write};
use stencil_core::{Encoding, PrintfProgram, Value};
use tracing::debug;

use crate::parse_arg;

/// Format `args` (each parsed as JSON, else taken as a string) with `template`
pub fn run(template: &str, args: &[String]) -> Result<Bytes> {
    let values: Vec<Value> = args.iter().map(|a| parse_arg(a)).collect();
    debug!("Formatting {} arguments", values.len());

    let program = PrintfProgram::compile(template.as_bytes(), Encoding::Utf8)
        .with_context(|| format!("Failed to compile printf template: {}", template))?;
    let text = program
        .execute(&values)
        .with_context(|| "Failed to format arguments")?;
    Ok(text)
}

pub fn execute(template: &str, args: &[String], newline: bool) -> Result<()> {
    let text = run(template, args)?;

    let mut stdout = io::stdout().lock();
    stdout.write_all(&text)?;
    if newline {
        stdout.write_all(b"\n")?;
    }
    stdout.flush()?;

    Ok(())
}
