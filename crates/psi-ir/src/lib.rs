//! PsiScript intermediate representations
//!
//! Two IRs come out of the compiler:
//!
//! - **Logic layer**: a [`Circuit`], an ordered list of [`Instruction`]s over
//!   quantum wires with explicit control polarity, classical guards and the
//!   ancilla allocation table.
//! - **Pulse layer**: a [`PulseSchedule`], timestamped per-wire
//!   [`PulseInstruction`]s carrying frame snapshots and Align branch labels.
//!
//! Every instruction keeps the [`Span`] of the statement it came from so that
//! diagnostics and downstream emitters can point back at the source.
//!
//! # Example
//!
//! ```rust
//! use psi_ir::{Circuit, WireId};
//!
//! let mut circuit = Circuit::new("bell");
//! let q = circuit.add_qreg("q", 2).unwrap();
//! circuit.h(q[0]).unwrap().cx(q[0], q[1]).unwrap();
//!
//! assert_eq!(circuit.num_wires(), 2);
//! assert_eq!(circuit.depth(), 2);
//! assert_eq!(circuit.wire_label(WireId(1)), "q[1]");
//! ```

pub mod circuit;
pub mod error;
pub mod gate;
pub mod instruction;
pub mod pulse;
pub mod span;
pub mod wire;

pub use circuit::{ANCILLA_REGISTER, AncillaAllocation, AncillaId, Checkpoint, Circuit};
pub use error::{IrError, IrResult};
pub use gate::{ClassicalCondition, Control, Polarity, StandardGate};
pub use instruction::{Instruction, InstructionKind};
pub use pulse::{Frame, PulseInstruction, PulseKind, PulseSchedule, RotationAxis, Time};
pub use span::{LineIndex, Span};
pub use wire::{ClassicalRegister, Clbit, ClbitId, Register, Wire, WireId, WireRole};
