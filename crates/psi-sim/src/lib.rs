//! Reference statevector simulator for PsiScript circuits
//!
//! Lowered circuits are checked against an independent model of what they
//! should do. This crate is that model: a dense statevector with
//! polarity-aware controls, classical feedback and seeded sampling. It is a
//! checking tool, not a teaching front end, and makes no attempt to scale.
//!
//! # Memory
//!
//! | Wires | Amplitudes | Memory |
//! |-------|------------|--------|
//! | 10 | 1 024 | ~16 KB |
//! | 16 | 65 536 | ~1 MB |
//! | 20 | ~1 M | ~16 MB |
//! | 24 | ~16 M | ~256 MB |
//!
//! # Example
//!
//! ```rust
//! use psi_ir::Circuit;
//! use psi_sim::Simulator;
//!
//! let mut circuit = Circuit::new("bell");
//! let q = circuit.add_qreg("q", 2).unwrap();
//! circuit.h(q[0]).unwrap().cx(q[0], q[1]).unwrap();
//!
//! let state = Simulator::with_seed(1).statevector(&circuit).unwrap();
//! assert!((state.probability(0b11) - 0.5).abs() < 1e-10);
//! ```

mod error;
mod simulator;
mod statevector;

pub use error::{SimError, SimResult};
pub use simulator::{Counts, DEFAULT_MAX_WIRES, Execution, Simulator};
pub use statevector::Statevector;
