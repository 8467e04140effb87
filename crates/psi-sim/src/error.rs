//! Error types for the reference simulator.

use psi_ir::WireId;
use thiserror::Error;

/// Errors that can occur during simulation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SimError {
    /// The circuit is wider than the simulator allows.
    #[error("Circuit needs {required} wires, simulator supports at most {max}")]
    TooManyWires { required: usize, max: usize },

    /// An operand points past the end of the state.
    #[error("Wire {wire} out of range for a {num_wires}-wire state")]
    WireOutOfRange { wire: WireId, num_wires: usize },

    /// A measurement appeared in a unitary-only run.
    #[error("Measurement is not allowed in a unitary run")]
    NonUnitary,

    /// The circuit carries a marker for a statement that was never lowered.
    #[error("Cannot simulate unsupported statement: {0}")]
    Unsupported(String),
}

/// Result type for simulation.
pub type SimResult<T> = Result<T, SimError>;
