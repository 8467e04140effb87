//! Pulse-layer scheduling for PsiScript
//!
//! The [`PulseScheduler`] turns pulse operations into a timestamped
//! [`PulseSchedule`](psi_ir::PulseSchedule). Each wire keeps its own time
//! cursor and reference frame:
//!
//! | Operation | Cursor | Frame |
//! |-----------|--------|-------|
//! | `Rotate` | advances by duration | snapshotted |
//! | `Wait` | advances by duration | unchanged |
//! | `ShiftPhase` | unchanged | phase += angle |
//! | `SetFreq` | unchanged | frequency = hz |
//! | `Play` | advances by optional duration | snapshotted |
//! | `Acquire` | advances by duration | unchanged |
//!
//! Align blocks reconcile branches to the latest branch end, padding shorter
//! branches with idles. Open Analog scopes and branches make their wire
//! unavailable to predicate-guarded logic operations.
//!
//! # Example
//!
//! ```rust
//! use psi_ir::{Span, WireId};
//! use psi_pulse::{PulseOp, PulseScheduler};
//!
//! let mut sched = PulseScheduler::new();
//! let (a, b) = (WireId(0), WireId(1));
//! let wires = vec![(a, "q[0]".to_string()), (b, "q[1]".to_string())];
//!
//! sched.begin_align(&wires, Span::default()).unwrap();
//! sched.begin_branch(a, Span::default()).unwrap();
//! sched.emit(a, "q[0]", PulseOp::Wait { duration: 100.0 }, Span::default(), vec![]).unwrap();
//! sched.end_branch(a).unwrap();
//! sched.begin_branch(b, Span::default()).unwrap();
//! sched.emit(b, "q[1]", PulseOp::Wait { duration: 60.0 }, Span::default(), vec![]).unwrap();
//! sched.end_branch(b).unwrap();
//! let summary = sched.end_align().unwrap();
//!
//! assert_eq!(summary.end, 100.0);
//! assert_eq!(sched.cursor(b), 100.0);
//! ```

mod device;
mod error;
mod scheduler;

pub use device::{PulseDevice, RecordingDevice, ReplaySummary, replay};
pub use error::{PulseError, PulseResult};
pub use scheduler::{AlignSummary, OpenScope, PulseCheckpoint, PulseOp, PulseScheduler, ScopeKind};
