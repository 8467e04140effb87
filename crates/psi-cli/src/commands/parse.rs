//! Parse command implementation.

use anyhow::Result;

use super::common::load_source;

/// Execute the parse command.
pub fn execute(input: &str) -> Result<()> {
    let source = load_source(input)?;
    let program = psi_lang::parse(&source).map_err(|e| anyhow::anyhow!("{input}:{e}"))?;
    println!("{}", serde_json::to_string_pretty(&program)?);
    Ok(())
}
