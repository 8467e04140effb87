//! Pass trait and types for post-lowering passes.

use psi_ir::Circuit;

use crate::error::CompileResult;
use crate::property::PropertySet;

/// The kind of compilation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    /// Reads the circuit and writes to the `PropertySet`.
    Analysis,
    /// Rewrites the circuit.
    Transformation,
}

/// A pass over a lowered circuit.
///
/// Passes run after every statement has been lowered. Each one either
/// inspects the circuit and records its findings in the [`PropertySet`],
/// or rewrites the instruction stream.
pub trait Pass: Send + Sync {
    /// Get the name of this pass.
    fn name(&self) -> &str;

    /// Get the kind of this pass.
    fn kind(&self) -> PassKind;

    /// Run the pass on the given circuit.
    ///
    /// Analysis passes must leave the circuit untouched.
    fn run(&self, circuit: &mut Circuit, properties: &mut PropertySet) -> CompileResult<()>;

    /// Check if this pass should run based on current state.
    fn should_run(&self, _circuit: &Circuit, _properties: &PropertySet) -> bool {
        true
    }
}
