//! Shared helpers for CLI commands.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use console::style;

use psi_compile::{CompileError, CompilerConfig, Topology};
use psi_ir::Span;

/// Read a PsiScript source file.
pub fn load_source(path: &str) -> Result<String> {
    if !Path::new(path).exists() {
        anyhow::bail!("File not found: {path}");
    }
    fs::read_to_string(path).with_context(|| format!("Failed to read file: {path}"))
}

/// Load a compiler configuration, or the defaults when `path` is `None`.
///
/// `.json` files are read as JSON; anything else as YAML.
pub fn load_config(path: Option<&str>) -> Result<CompilerConfig> {
    let Some(path) = path else {
        return Ok(CompilerConfig::default());
    };
    let text =
        fs::read_to_string(path).with_context(|| format!("Failed to read config: {path}"))?;
    parse_config(&text, path)
}

/// Parse configuration text; `name` picks the format by extension.
pub fn parse_config(text: &str, name: &str) -> Result<CompilerConfig> {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");
    if ext.eq_ignore_ascii_case("json") {
        serde_json::from_str(text).with_context(|| format!("Invalid JSON config: {name}"))
    } else {
        serde_yaml_ng::from_str(text).with_context(|| format!("Invalid YAML config: {name}"))
    }
}

/// Parse a topology name: `full`, `linear`, `star`, or an edge list such as
/// `0-1,1-2`. Ancilla pool slots are attached with `a<slot>-<position>`,
/// e.g. `0-1,1-2,a0-2`.
pub fn parse_topology(name: &str) -> Result<Topology> {
    match name.to_lowercase().as_str() {
        "full" | "all" => Ok(Topology::Full),
        "linear" | "line" => Ok(Topology::Linear),
        "star" => Ok(Topology::Star),
        other => {
            let number = |text: &str| {
                text.trim()
                    .parse::<u32>()
                    .with_context(|| unknown_topology(name))
            };
            let mut edges = vec![];
            let mut ancilla_edges = vec![];
            for edge in other.split(',') {
                let (a, b) = edge
                    .trim()
                    .split_once('-')
                    .ok_or_else(|| anyhow::anyhow!("Invalid edge '{edge}'"))
                    .with_context(|| unknown_topology(name))?;
                let b = number(b)?;
                match a.trim().strip_prefix('a') {
                    Some(slot) => ancilla_edges.push((number(slot)?, b)),
                    None => edges.push((number(a)?, b)),
                }
            }
            Ok(Topology::edges(edges).with_ancilla_edges(ancilla_edges))
        }
    }
}

fn unknown_topology(name: &str) -> String {
    format!("Unknown topology: '{name}'. Available: full, linear, star, or edges like 0-1,1-2,a0-2")
}

/// Render an error with the offending source line underneath it.
pub fn render_error(source: &str, path: &str, err: &CompileError) -> String {
    match err.span() {
        Some(span) => format!("{path}:{span}: {err}{}", snippet(source, span)),
        None => format!("{path}: {err}"),
    }
}

fn snippet(source: &str, span: Span) -> String {
    let Some(line) = (span.line as usize)
        .checked_sub(1)
        .and_then(|i| source.lines().nth(i))
    else {
        return String::new();
    };
    let column = (span.column as usize).saturating_sub(1);
    let width = (span.end - span.start).clamp(1, line.len().saturating_sub(column).max(1));
    format!(
        "\n  {} {}\n  {} {}{}",
        style("|").blue(),
        line,
        style("|").blue(),
        " ".repeat(column),
        style("^".repeat(width)).red().bold()
    )
}

/// Print collected diagnostics as warnings.
pub fn print_diagnostics(source: &str, path: &str, diagnostics: &[CompileError]) {
    for diagnostic in diagnostics {
        eprintln!(
            "{} {}",
            style("warning:").yellow().bold(),
            render_error(source, path, diagnostic)
        );
    }
}
