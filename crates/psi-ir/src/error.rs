//! Error types for the IR crate.

use thiserror::Error;

use crate::wire::{ClbitId, WireId};

/// Errors that can occur in IR operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IrError {
    /// Wire not found in circuit.
    #[error("Wire {wire} not found in circuit{}", format_gate_context(.gate_name))]
    WireNotFound {
        /// The wire that was not found.
        wire: WireId,
        /// Optional gate name for context.
        gate_name: Option<String>,
    },

    /// Classical bit not found in circuit.
    #[error("Classical bit {clbit} not found in circuit")]
    ClbitNotFound {
        /// The classical bit that was not found.
        clbit: ClbitId,
    },

    /// Same wire used twice by one instruction.
    #[error("Duplicate wire {wire} in operation{}", format_gate_context(.gate_name))]
    DuplicateWire {
        /// The duplicate wire.
        wire: WireId,
        /// Optional gate name for context.
        gate_name: Option<String>,
    },

    /// Gate requires a different number of targets.
    #[error("Gate '{gate_name}' requires {expected} targets, got {got}")]
    TargetCountMismatch {
        /// Name of the gate.
        gate_name: String,
        /// Expected number of targets.
        expected: u32,
        /// Actual number of targets.
        got: u32,
    },

    /// Measurement with mismatched wire and bit counts.
    #[error("Measurement of {wires} wires into {clbits} bits")]
    MeasureArity {
        /// Number of measured wires.
        wires: usize,
        /// Number of destination bits.
        clbits: usize,
    },

    /// A register name was declared twice.
    #[error("Register '{0}' is already declared")]
    DuplicateRegister(String),

    /// JSON (de)serialization failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[allow(clippy::ref_option)]
fn format_gate_context(gate_name: &Option<String>) -> String {
    match gate_name {
        Some(name) => format!(" (gate: {name})"),
        None => String::new(),
    }
}

/// Result type for IR operations.
pub type IrResult<T> = Result<T, IrError>;
