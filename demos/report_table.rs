//! Formatting a text report with sprintf

use stencil_core::{sprintf, Encoding, PrintfProgram, Value};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Stencil Report Example\n");

    let rows = [
        ("widgets", 1_250_000, 0.125),
        ("gadgets", 42, 99.5),
        ("überdings", -7, -0.003),
    ];

    // One program, many executions
    let row = PrintfProgram::compile(b"%-10s|%'12d|%+9.3f|%#8x\n", Encoding::Utf8)?;
    let header = sprintf(
        "%-10s|%12s|%9s|%8s\n",
        &["name".into(), "count".into(), "ratio".into(), "hex".into()],
    )?;
    print!("{}", String::from_utf8_lossy(&header));
    for (name, count, ratio) in rows {
        let line = row.execute(&[name.into(), count.into(), ratio.into(), count.into()])?;
        print!("{}", String::from_utf8_lossy(&line));
    }

    // Named references read from a single hash argument
    let summary = Value::hash([
        ("total", Value::from(1_250_035)),
        ("mean", Value::from(33.207)),
        ("unit", Value::from("items")),
    ]);
    let text = sprintf("\ntotal %<total>d %{unit}, mean %<mean>.2e\n", &[summary])?;
    print!("{}", String::from_utf8_lossy(&text));

    // Floating forms and two's-complement hex
    let forms = sprintf(
        "%g %G %a %x %o\n",
        &[0.0001.into(), 1e20.into(), 1.0.into(), (-255).into(), (-8).into()],
    )?;
    print!("{}", String::from_utf8_lossy(&forms));

    Ok(())
}
