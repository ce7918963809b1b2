use anyhow::{Context, Result};
use colored::*;
use serde::Serialize;
use std::fmt::Debug;
use stencil_core::node::FormatNode;
use stencil_core::{loop_recovery, CompileOptions, Encoding, PackProgram, PrintfProgram, UnpackProgram};

use crate::Frontend;

/// What a template compiles to
#[derive(Debug, Serialize)]
pub struct Explanation {
    pub frontend: String,
    pub template: String,
    /// Template after loop recovery (pack and unpack only)
    pub recovered: String,
    pub node_count: usize,
    pub encoding: Option<String>,
    /// One line per node, indented by depth
    pub tree: Vec<String>,
}

fn render<I: Debug>(node: &FormatNode<I>, depth: usize, out: &mut Vec<String>) {
    let indent = "  ".repeat(depth);
    match node {
        FormatNode::Sequence(children) => {
            out.push(format!("{}sequence", indent));
            for child in children {
                render(child, depth + 1, out);
            }
        }
        FormatNode::FixedRepeat { count, body } => {
            out.push(format!("{}repeat {}", indent, count));
            render(body, depth + 1, out);
        }
        FormatNode::StarRepeat(body) => {
            out.push(format!("{}repeat *", indent));
            render(body, depth + 1, out);
        }
        FormatNode::SetSourcePosition(offset) => out.push(format!("{}seek source {}", indent, offset)),
        FormatNode::SetOutputPosition(offset) => out.push(format!("{}seek output {}", indent, offset)),
        FormatNode::AdvanceSourcePosition { to_end: false } => out.push(format!("{}skip source", indent)),
        FormatNode::AdvanceSourcePosition { to_end: true } => {
            out.push(format!("{}skip source to end", indent))
        }
        FormatNode::ReverseSourcePosition { remaining: false } => out.push(format!("{}back source", indent)),
        FormatNode::ReverseSourcePosition { remaining: true } => {
            out.push(format!("{}back source by remaining", indent))
        }
        FormatNode::ReverseOutputPosition => out.push(format!("{}back output", indent)),
        FormatNode::Op(op) => out.push(format!("{}{:?}", indent, op)),
    }
}

fn tree<I: Debug>(root: &FormatNode<I>) -> Vec<String> {
    let mut out = Vec::new();
    render(root, 0, &mut out);
    out
}

/// Compile `template` for `frontend` and describe the result
pub fn run(template: &str, frontend: Frontend, options: &CompileOptions) -> Result<Explanation> {
    let context = || format!("Failed to compile template: {}", template);
    let (node_count, encoding, lines): (usize, Option<Encoding>, Vec<String>) = match frontend {
        Frontend::Pack => {
            let program = PackProgram::compile_with(template, options).with_context(context)?;
            (program.node_count(), Some(program.encoding()), tree(program.root()))
        }
        Frontend::Unpack => {
            let program = UnpackProgram::compile_with(template, options).with_context(context)?;
            (program.node_count(), None, tree(program.root()))
        }
        Frontend::Printf => {
            let program =
                PrintfProgram::compile(template.as_bytes(), Encoding::Utf8).with_context(context)?;
            (program.node_count(), Some(program.encoding()), tree(program.root()))
        }
    };

    let recovered = match frontend {
        Frontend::Printf => template.to_string(),
        _ => loop_recovery::recover(template, options).into_owned(),
    };

    Ok(Explanation {
        frontend: format!("{:?}", frontend).to_lowercase(),
        template: template.to_string(),
        recovered,
        node_count,
        encoding: encoding.map(|e| e.to_string()),
        tree: lines,
    })
}

pub fn execute(template: &str, frontend: Frontend, json: bool, options: &CompileOptions) -> Result<()> {
    let explanation = run(template, frontend, options)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&explanation)?);
        return Ok(());
    }

    println!("\n=== {} template ===", explanation.frontend);
    println!("Template:   {}", explanation.template);
    if explanation.recovered != explanation.template {
        println!("Recovered:  {}", explanation.recovered.green());
    }
    println!("Nodes:      {}", explanation.node_count);
    if let Some(encoding) = &explanation.encoding {
        println!("Encoding:   {}", encoding);
    }

    println!("\n=== Tree ===");
    for line in &explanation.tree {
        println!("{}", line);
    }

    Ok(())
}
