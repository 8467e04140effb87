//! Version command implementation.

use console::style;

/// Execute the version command.
pub fn execute() {
    let version = env!("CARGO_PKG_VERSION");

    println!(
        "{} {} - lowering compiler for PsiScript",
        style("psi").cyan().bold(),
        style(format!("v{version}")).yellow()
    );
    println!();
    println!("Components:");
    println!("  psi-ir       Gate and pulse intermediate representation");
    println!("  psi-lang     PsiScript lexer and parser");
    println!("  psi-pulse    Pulse scheduling and replay");
    println!("  psi-compile  Predicate synthesis, routing and lowering");
    println!("  psi-cli      Command-line interface");
    println!();
    println!("License: {}", style("Apache-2.0").dim());
}
