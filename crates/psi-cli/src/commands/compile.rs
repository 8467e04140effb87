//! Compile command implementation.

use std::fs;

use anyhow::{Context, Result};
use clap::ValueEnum;
use console::style;
use tracing::debug;

use psi_compile::{CompiledProgram, Compiler, ErrorPolicy};
use psi_ir::{Circuit, InstructionKind, Polarity};
use psi_pulse::{RecordingDevice, replay};

use super::common::{load_config, load_source, parse_topology, print_diagnostics, render_error};

/// How the compiled circuit is written out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One instruction per line.
    Listing,
    /// The serialized circuit IR.
    Json,
}

/// Options of the compile command.
#[derive(Debug, Clone)]
pub struct CompileArgs {
    pub input: String,
    pub output: Option<String>,
    pub format: OutputFormat,
    pub config: Option<String>,
    pub topology: Option<String>,
    pub ancillas: Option<usize>,
    pub native_negative_controls: bool,
    pub collect: bool,
    pub pulse_table: bool,
    pub pulse_json: Option<String>,
    pub simulate_pulses: bool,
}

/// Execute the compile command.
pub fn execute(args: &CompileArgs) -> Result<()> {
    eprintln!(
        "{} Compiling {}",
        style("→").cyan().bold(),
        style(&args.input).green()
    );

    let source = load_source(&args.input)?;
    let mut config = load_config(args.config.as_deref())?;
    if let Some(topology) = &args.topology {
        config = config.with_topology(parse_topology(topology)?);
    }
    if let Some(capacity) = args.ancillas {
        config = config.with_ancilla_capacity(capacity);
    }
    if args.native_negative_controls {
        config = config.with_native_negative_controls(true);
    }
    if args.collect {
        config = config.with_error_policy(ErrorPolicy::Collect);
    }
    debug!(?config, "effective compiler configuration");

    let program = Compiler::new(config)
        .compile_source(&source)
        .map_err(|e| anyhow::anyhow!(render_error(&source, &args.input, &e)))?;
    print_diagnostics(&source, &args.input, &program.diagnostics);
    print_summary(&program);

    let rendered = match args.format {
        OutputFormat::Listing => listing(&program.circuit),
        OutputFormat::Json => program.circuit.to_json()?,
    };
    match &args.output {
        Some(path) => {
            fs::write(path, rendered).with_context(|| format!("Failed to write file: {path}"))?;
            eprintln!("  Output: {}", style(path).green());
        }
        None => println!("{rendered}"),
    }

    if args.pulse_table {
        println!("{}", program.schedule.to_table());
    }
    if let Some(path) = &args.pulse_json {
        let json = program.schedule.to_json()?;
        if path == "-" {
            println!("{json}");
        } else {
            fs::write(path, json).with_context(|| format!("Failed to write file: {path}"))?;
            eprintln!("  Pulses: {}", style(path).green());
        }
    }
    if args.simulate_pulses {
        let mut device = RecordingDevice::new();
        let summary = replay(&program.schedule, &mut device)?;
        eprintln!(
            "{} Replayed {} pulse instructions on {} ({} ns)",
            style("✓").green().bold(),
            summary.applied,
            summary.device,
            summary.duration
        );
        for (kind, count) in &summary.per_kind {
            eprintln!("  {:<12} {}", kind, count);
        }
    }

    if program.diagnostics.is_empty() {
        Ok(())
    } else {
        anyhow::bail!("{} statements were skipped", program.diagnostics.len())
    }
}

fn print_summary(program: &CompiledProgram) {
    let stats = program.stats();
    eprintln!("{} Compilation complete", style("✓").green().bold());
    eprintln!(
        "  Circuit: {} wires, {} clbits, {} ops, depth {}",
        stats.wires, stats.clbits, stats.instructions, stats.depth
    );
    eprintln!(
        "  Ancillas: {} checkouts, peak {}",
        stats.ancilla_checkouts, stats.peak_ancillas
    );
    if let Some(routing) = &program.routing {
        eprintln!(
            "  Routing: {} gates routed, {} swaps inserted",
            routing.routed_gates,
            style(routing.inserted_swaps).yellow()
        );
        if routing.unroutable > 0 {
            eprintln!(
                "  Routing: {} statements had no coupling path",
                style(routing.unroutable).red()
            );
        }
    }
    eprintln!(
        "  Pulses: {} instructions, {} ns",
        stats.pulses, stats.pulse_duration
    );
}

/// Render a circuit one instruction per line, using source wire labels.
pub fn listing(circuit: &Circuit) -> String {
    let mut lines = Vec::with_capacity(circuit.num_ops());
    for inst in circuit.instructions() {
        let mut line = inst.name();
        if let Some(theta) = inst.base_gate().and_then(|g| g.angle()) {
            line.push_str(&format!("({theta:.6})"));
        }
        let operands: Vec<String> = inst
            .controls
            .iter()
            .map(|c| match c.polarity {
                Polarity::Positive => circuit.wire_label(c.wire),
                Polarity::Negative => format!("!{}", circuit.wire_label(c.wire)),
            })
            .chain(inst.targets.iter().map(|&w| circuit.wire_label(w)))
            .collect();
        if !operands.is_empty() {
            line.push(' ');
            line.push_str(&operands.join(", "));
        }
        match &inst.kind {
            InstructionKind::Measure => {
                let bits: Vec<String> = inst.clbits.iter().map(|c| format!("c{}", c.0)).collect();
                line.push_str(&format!(" -> {}", bits.join(", ")));
            }
            InstructionKind::Unsupported { reason } => line.push_str(&format!(" ; {reason}")),
            InstructionKind::Gate(_) => {}
        }
        if !inst.conditions.is_empty() {
            let guards: Vec<String> = inst
                .conditions
                .iter()
                .map(|c| {
                    let bits: Vec<String> = c.bits.iter().map(|b| format!("c{}", b.0)).collect();
                    format!("[{}] == {}", bits.join(", "), c.value)
                })
                .collect();
            line.push_str(&format!(" if {}", guards.join(" && ")));
        }
        if let Some(origin) = inst.origin {
            line = format!("{line:<40} @ {origin}");
        }
        lines.push(line);
    }
    lines.join("\n")
}
