//! PsiScript lowering compiler
//!
//! This crate turns a parsed PsiScript program into two IRs: a gate-level
//! [`Circuit`](psi_ir::Circuit) for logic operations and a timestamped
//! [`PulseSchedule`](psi_ir::PulseSchedule) for pulse operations.
//!
//! # Pipeline
//!
//! ```text
//! source ──► psi_lang::parse ──► Program
//!                                   │
//!                                   ▼
//!                          ┌──────────────────┐
//!                          │     Lowering     │ ◄── CompilerConfig
//!                          └──────────────────┘
//!                            │              │
//!           predicate ► synthesis      PulseScheduler
//!                 (AncillaPool)              │
//!                            │               ▼
//!                            ▼         PulseSchedule
//!                      ┌─────────────┐
//!                      │ PassManager │ ◄── PropertySet (coupling map, layout)
//!                      └─────────────┘
//!                            │
//!                            ├── TrivialLayout
//!                            ├── SwapRouting
//!                            └── AncillaAudit
//!                            ▼
//!                         Circuit
//! ```
//!
//! # Predicate synthesis
//!
//! `where:` predicates are normalized into conjunctions of wire literals and
//! synthesized by literal count:
//!
//! | Literals | `Phase` | `Flip` |
//! |----------|---------|--------|
//! | 0 | global phase | X |
//! | 1 | P | CX |
//! | 2 | CP | CCX |
//! | ≥3 | Toffoli ladder into a result ancilla / P / ladder back | Toffoli ladder onto the target |
//!
//! A ladder over `k` literals borrows `k - 2` scratch ancillas and emits no
//! gate with more than two controls. Every ancilla is verified clean before it is returned to the pool, and
//! the final circuit is audited again after routing.
//!
//! # Example
//!
//! ```rust
//! use psi_compile::{CompilerConfig, compile};
//!
//! let source = r"
//!     let q = Register(3);
//!     q.Superpose(targets: ALL);
//!     q.Phase(angle: PI, where: q[0] == 1 && q[1] == 0 && q[2] == 1);
//!     q.Reflect(axis: MEAN);
//! ";
//!
//! let program = compile(source, &CompilerConfig::default()).unwrap();
//! assert!(program.is_clean());
//! assert_eq!(program.peak_ancillas, 2);
//! assert_eq!(program.circuit.count_ops().get("ccx"), Some(&12));
//! assert_eq!(program.circuit.count_ops().get("mcx"), None);
//! ```

pub mod ancilla;
pub mod config;
pub mod error;
pub mod lowering;
pub mod manager;
pub mod pass;
pub mod predicate;
pub mod property;
pub mod synthesis;

// Built-in passes
pub mod passes;

pub use ancilla::{AncillaPool, Verification, verify_clean};
pub use config::{CompilerConfig, ErrorPolicy, Topology};
pub use error::{CompileError, CompileResult};
pub use lowering::{CompileStats, CompiledProgram, Compiler, compile};
pub use manager::{PassManager, PassManagerBuilder};
pub use pass::{Pass, PassKind};
pub use passes::{AncillaAuditReport, RoutingReport};
pub use predicate::{ControlLiteral, ControlSet, Operand, normalize};
pub use property::{CouplingMap, Layout, PropertySet};
