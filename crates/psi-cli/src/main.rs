//! PsiScript Command-Line Interface
//!
//! The main entry point for the `psi` tool.
//!
//! ```text
//! source.psi ──► psi compile ──► circuit (JSON / listing)
//!                           └──► pulse schedule (table / JSON / replay)
//! ```

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::compile::{CompileArgs, OutputFormat};
use commands::{check, compile, parse, version};

/// psi - lowering compiler for PsiScript
#[derive(Parser)]
#[command(name = "psi")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a PsiScript program into gate and pulse IR
    Compile {
        /// Input file
        #[arg(short, long)]
        input: String,

        /// Write the circuit here instead of printing it
        #[arg(short, long)]
        output: Option<String>,

        /// Circuit output format
        #[arg(short, long, value_enum, default_value = "listing")]
        format: OutputFormat,

        /// Compiler configuration (YAML or JSON)
        #[arg(short, long, env = "PSI_CONFIG")]
        config: Option<String>,

        /// Coupling topology (full, linear, star, or edges like 0-1,1-2,a0-2)
        #[arg(short, long)]
        topology: Option<String>,

        /// Ancilla pool capacity
        #[arg(long)]
        ancillas: Option<usize>,

        /// Emit negative-polarity controls instead of X brackets
        #[arg(long)]
        native_negative_controls: bool,

        /// Skip failing statements and report them instead of stopping
        #[arg(long)]
        collect: bool,

        /// Print the pulse schedule as a table
        #[arg(long)]
        pulse_table: bool,

        /// Write the pulse schedule as JSON ("-" for stdout)
        #[arg(long)]
        pulse_json: Option<String>,

        /// Replay the pulse schedule through a recording device
        #[arg(long)]
        simulate_pulses: bool,
    },

    /// Compile without output and report every diagnostic
    Check {
        /// Input file
        #[arg(short, long)]
        input: String,

        /// Compiler configuration (YAML or JSON)
        #[arg(short, long, env = "PSI_CONFIG")]
        config: Option<String>,
    },

    /// Print the syntax tree of a program as JSON
    Parse {
        /// Input file
        #[arg(short, long)]
        input: String,
    },

    /// Show version information
    Version,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Compile {
            input,
            output,
            format,
            config,
            topology,
            ancillas,
            native_negative_controls,
            collect,
            pulse_table,
            pulse_json,
            simulate_pulses,
        } => compile::execute(&CompileArgs {
            input,
            output,
            format,
            config,
            topology,
            ancillas,
            native_negative_controls,
            collect,
            pulse_table,
            pulse_json,
            simulate_pulses,
        }),

        Commands::Check { input, config } => check::execute(&input, config.as_deref()),

        Commands::Parse { input } => parse::execute(&input),

        Commands::Version => {
            version::execute();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}
