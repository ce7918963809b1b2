use anyhow::Result;
use clap::{Parser, Subcommand};
use stencil_cli::{commands, load_options, Frontend};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "stencil")]
#[command(about = "Stencil - pack, unpack and format values with templates", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON file with compile options
    #[arg(long, global = true)]
    config: Option<String>,

    /// Compile templates exactly as written
    #[arg(long, global = true)]
    no_loop_recovery: bool,

    /// Largest repeat count expanded inline
    #[arg(long, global = true)]
    unroll_limit: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pack a JSON array of values into bytes
    Pack {
        /// Pack template
        #[arg(short, long)]
        template: String,

        /// Values as an inline JSON array
        #[arg(long, conflicts_with = "input")]
        values: Option<String>,

        /// File holding a JSON array of values
        #[arg(short, long)]
        input: Option<String>,

        /// Write raw bytes here instead of printing hex
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Unpack bytes into a JSON array
    Unpack {
        /// Unpack template
        #[arg(short, long)]
        template: String,

        /// Input file ("-" for stdin)
        #[arg(short, long, conflicts_with = "hex")]
        input: Option<String>,

        /// Input bytes as hex
        #[arg(long)]
        hex: Option<String>,
    },

    /// Format arguments with a printf template
    Printf {
        /// Printf template
        #[arg(short, long)]
        template: String,

        /// Do not print a trailing newline
        #[arg(short = 'n', long)]
        no_newline: bool,

        /// Arguments, each parsed as JSON or taken as a string
        #[arg(allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Show how a template compiles
    Explain {
        /// Template to compile
        #[arg(short, long)]
        template: String,

        /// Template language
        #[arg(long, value_enum, default_value = "pack")]
        frontend: Frontend,

        /// Print the explanation as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let options = load_options(cli.config.as_deref(), cli.no_loop_recovery, cli.unroll_limit)?;

    // Execute command
    match cli.command {
        Commands::Pack {
            template,
            values,
            input,
            output,
        } => commands::pack::execute(
            &template,
            values.as_deref(),
            input.as_deref(),
            output.as_deref(),
            &options,
        ),

        Commands::Unpack {
            template,
            input,
            hex,
        } => commands::unpack::execute(&template, input.as_deref(), hex.as_deref(), &options),

        Commands::Printf {
            template,
            no_newline,
            args,
        } => commands::printf::execute(&template, &args, !no_newline),

        Commands::Explain {
            template,
            frontend,
            json,
        } => commands::explain::execute(&template, frontend, json, &options),
    }
}
