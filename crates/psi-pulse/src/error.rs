//! Error handling for the pulse scheduler.

use psi_ir::{Span, Time};
use thiserror::Error;

/// Result type for pulse scheduling operations.
pub type PulseResult<T> = Result<T, PulseError>;

/// Errors that can occur while scheduling or replaying pulses.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum PulseError {
    /// A `where:`-guarded logic operation touched a wire with an open pulse scope.
    #[error("{usage}: wire {wire} is inside the pulse scope opened at {scope}")]
    ScopeConflict {
        wire: String,
        scope: Span,
        usage: Span,
    },

    /// The same wire appears in two branches of one Align block.
    #[error("{span}: wire {wire} already has a branch in this Align block")]
    DuplicateBranch { wire: String, span: Span },

    /// A branch was opened for a wire the Align block was not declared over.
    #[error("{span}: wire {wire} is not part of the enclosing Align block")]
    BranchWireMismatch { wire: String, span: Span },

    /// Durations must be finite and non-negative.
    #[error("{span}: invalid duration {duration} ns")]
    InvalidDuration { duration: Time, span: Span },

    /// Scope or Align bookkeeping did not nest.
    #[error("unbalanced pulse scope: {0}")]
    UnbalancedScope(String),

    /// The replay device rejected an instruction.
    #[error("device error: {0}")]
    Device(String),
}
