//! Packing and unpacking a fixed-layout record

use stencil_core::{pack, unpack, CompileOptions, PackProgram, Value};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Stencil Record Packing Example\n");

    // id (u16 BE), flags (u8), name (8 bytes, space padded), reading (f64 LE), label (UTF-8)
    let template = "n C A8 E U*";
    let values = vec![
        Value::from(513),
        Value::from(0b1010),
        Value::from("sensor"),
        Value::from(21.75),
        Value::from(0x2603),
        Value::from(0x2614),
    ];

    let packed = pack(template, &values)?;
    println!("Template:  {}", template);
    println!("Bytes:     {} ({})", packed.len(), packed.encoding);
    println!("Hex:       {}", hex_string(&packed.bytes));

    let decoded = unpack(template, &packed.bytes)?;
    println!("\nUnpacked:");
    for value in &decoded {
        println!("  {}", value.inspect());
    }

    // A long unrolled template compiles to a small repeat tree
    let unrolled = "n".repeat(1000);
    let recovered = PackProgram::compile(&unrolled)?;
    let naive = PackProgram::compile_with(&unrolled, &CompileOptions::without_loop_recovery())?;
    println!("\nLoop recovery on {:?}...:", &unrolled[..8]);
    println!("  recovered nodes: {}", recovered.node_count());
    println!("  naive nodes:     {}", naive.node_count());

    let samples: Vec<Value> = (0..1000).map(Value::from).collect();
    assert_eq!(recovered.execute(&samples)?, naive.execute(&samples)?);
    println!("  outputs match");

    Ok(())
}

fn hex_string(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect::<Vec<_>>().join(" ")
}
