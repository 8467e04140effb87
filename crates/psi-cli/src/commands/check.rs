//! Check command implementation.

use anyhow::Result;
use console::style;

use psi_compile::{Compiler, ErrorPolicy};

use super::common::{load_config, load_source, print_diagnostics, render_error};

/// Execute the check command.
///
/// Compiles with the collect policy so every failing statement is reported,
/// not just the first.
pub fn execute(input: &str, config: Option<&str>) -> Result<()> {
    let source = load_source(input)?;
    let config = load_config(config)?.with_error_policy(ErrorPolicy::Collect);

    let program = Compiler::new(config)
        .compile_source(&source)
        .map_err(|e| anyhow::anyhow!(render_error(&source, input, &e)))?;
    print_diagnostics(&source, input, &program.diagnostics);

    if program.diagnostics.is_empty() {
        eprintln!(
            "{} {}: {} ops, {} pulses",
            style("✓").green().bold(),
            input,
            program.circuit.num_ops(),
            program.schedule.len()
        );
        Ok(())
    } else {
        anyhow::bail!(
            "{}: {} statements failed to lower",
            input,
            program.diagnostics.len()
        )
    }
}
