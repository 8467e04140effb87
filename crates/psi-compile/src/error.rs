//! Error types for the compilation crate.

use psi_ir::{AncillaId, IrError, Span};
use psi_lang::ParseError;
use psi_pulse::PulseError;
use thiserror::Error;

/// Errors that can occur during compilation.
///
/// Everything except the variants reported by [`CompileError::is_internal`]
/// is a user-facing diagnostic tied to a source location, and aborts only
/// the statement it was raised in.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CompileError {
    /// Malformed source text.
    #[error("syntax error at {0}")]
    Parse(#[from] ParseError),

    /// A `where:` predicate outside the conjunctive-literal subset.
    #[error("{span}: unsupported predicate: {reason}")]
    UnsupportedPredicate { reason: String, span: Span },

    /// An ancilla failed its clean-state post-condition.
    #[error("internal error: ancilla {ancilla} (slot {slot}) left dirty: {detail}")]
    AncillaLeak {
        ancilla: AncillaId,
        slot: usize,
        detail: String,
    },

    /// Not enough free pool slots for a synthesis step.
    #[error(
        "{span}: predicate needs {requested} ancillas but only {available} of {capacity} are free"
    )]
    AncillaExhausted {
        requested: usize,
        available: usize,
        capacity: usize,
        span: Span,
    },

    /// Ancillas were released out of stack order.
    #[error("internal error: released ancilla {got} while {expected} is outstanding on top")]
    ReleaseOrder { expected: AncillaId, got: AncillaId },

    /// An explicit edge list leaves ancilla pool wires with no coupling.
    #[error(
        "ancilla wires {} have no coupling edge; place them with ancilla_edges",
        format_slots(.slots)
    )]
    UnplacedAncillas { slots: Vec<usize> },

    /// No path exists between two wires of a required interaction.
    #[error("no coupling path between {} and {}{}", .wires.0, .wires.1, format_span(.span))]
    Topology {
        wires: (String, String),
        span: Option<Span>,
    },

    /// A predicate-guarded operation touched a wire with an open pulse scope.
    #[error("{usage}: wire {wire} is inside the pulse scope opened at {scope}")]
    ScopeConflict {
        wire: String,
        scope: Span,
        usage: Span,
    },

    /// Pulse scheduling error other than a scope conflict.
    #[error("pulse error: {0}")]
    Pulse(#[source] PulseError),

    /// Reference to an undeclared register.
    #[error("{span}: unknown register '{name}'")]
    UnknownRegister { name: String, span: Span },

    /// Wire index outside `0..size`.
    #[error("{span}: index {index} out of bounds for register '{register}' of size {size}")]
    IndexOutOfBounds {
        register: String,
        index: i64,
        size: usize,
        span: Span,
    },

    /// A register name declared twice.
    #[error("{span}: register '{name}' is already declared")]
    DuplicateRegister { name: String, span: Span },

    /// Call to a primitive that does not exist.
    #[error("{span}: unknown operation '{name}'")]
    UnknownOperation { name: String, span: Span },

    /// Argument the primitive does not accept.
    #[error("{span}: {operation} does not take an argument '{argument}'")]
    UnknownArgument {
        operation: String,
        argument: String,
        span: Span,
    },

    /// Required argument absent.
    #[error("{span}: {operation} requires '{argument}'")]
    MissingArgument {
        operation: String,
        argument: String,
        span: Span,
    },

    /// Classical guard outside the supported forms.
    #[error("{span}: unsupported classical guard: {reason}")]
    UnsupportedGuard { reason: String, span: Span },

    /// `Reflect` around anything but the mean.
    #[error("{span}: unsupported reflection axis '{axis}'")]
    UnsupportedAxis { axis: String, span: Span },

    /// A `Flip` whose target also appears in its own predicate.
    #[error("{span}: flip target {wire} also appears in its predicate")]
    TargetInPredicate { wire: String, span: Span },

    /// A classical bit referenced in a quantum predicate.
    #[error("{span}: classical bit '{name}' cannot appear in a where: predicate")]
    ClassicalBitInPredicate { name: String, span: Span },

    /// A pulse call with no wire to act on.
    #[error("{span}: {operation} needs a target wire outside Analog and branch blocks")]
    MissingPulseTarget { operation: String, span: Span },

    /// Loop unrolling exceeded the configured budget.
    #[error("{span}: loop unrolling exceeded {limit} iterations")]
    UnrollLimit { limit: usize, span: Span },

    /// An expression that does not evaluate to the required type.
    #[error("{span}: {reason}")]
    InvalidExpression { reason: String, span: Span },

    /// Missing coupling map for routing.
    #[error("Missing coupling map for routing")]
    MissingCouplingMap,

    /// Missing layout for routing.
    #[error("Missing layout for routing")]
    MissingLayout,

    /// Circuit too large for target.
    #[error("Circuit requires {required} wires but target only has {available}")]
    CircuitTooLarge { required: usize, available: u32 },

    /// A pass broke one of its own post-conditions.
    #[error("internal error: pass {name} failed: {reason}")]
    PassFailed { name: String, reason: String },

    /// Error from the IR crate.
    #[error("IR error: {0}")]
    Ir(#[from] IrError),
}

impl From<PulseError> for CompileError {
    fn from(err: PulseError) -> Self {
        match err {
            PulseError::ScopeConflict { wire, scope, usage } => {
                CompileError::ScopeConflict { wire, scope, usage }
            }
            other => CompileError::Pulse(other),
        }
    }
}

impl CompileError {
    /// Whether this is a compiler defect rather than a problem with the input.
    ///
    /// Internal errors are never collected as diagnostics.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            CompileError::AncillaLeak { .. }
                | CompileError::ReleaseOrder { .. }
                | CompileError::PassFailed { .. }
                | CompileError::Ir(_)
        )
    }

    /// Source location of the failure, if it has one.
    pub fn span(&self) -> Option<Span> {
        match self {
            CompileError::Parse(err) => Some(err.span()),
            CompileError::UnsupportedPredicate { span, .. }
            | CompileError::AncillaExhausted { span, .. }
            | CompileError::UnknownRegister { span, .. }
            | CompileError::IndexOutOfBounds { span, .. }
            | CompileError::DuplicateRegister { span, .. }
            | CompileError::UnknownOperation { span, .. }
            | CompileError::UnknownArgument { span, .. }
            | CompileError::MissingArgument { span, .. }
            | CompileError::UnsupportedGuard { span, .. }
            | CompileError::UnsupportedAxis { span, .. }
            | CompileError::TargetInPredicate { span, .. }
            | CompileError::ClassicalBitInPredicate { span, .. }
            | CompileError::MissingPulseTarget { span, .. }
            | CompileError::UnrollLimit { span, .. }
            | CompileError::InvalidExpression { span, .. } => Some(*span),
            CompileError::ScopeConflict { usage, .. } => Some(*usage),
            CompileError::Topology { span, .. } => *span,
            CompileError::Pulse(
                PulseError::DuplicateBranch { span, .. }
                | PulseError::BranchWireMismatch { span, .. }
                | PulseError::InvalidDuration { span, .. },
            ) => Some(*span),
            _ => None,
        }
    }
}

#[allow(clippy::ref_option)]
fn format_span(span: &Option<Span>) -> String {
    match span {
        Some(span) => format!(" (at {span})"),
        None => String::new(),
    }
}

fn format_slots(slots: &[usize]) -> String {
    slots
        .iter()
        .map(|slot| format!("anc[{slot}]"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for compilation operations.
pub type CompileResult<T> = Result<T, CompileError>;
