//! Gate synthesis for the logic-layer primitives.
//!
//! - [`oracle`]: predicate-guarded phase tags and flips.
//! - [`diffusion`]: reflection about the mean.
//! - [`ladder`]: Toffoli ladders behind every many-controlled X.
//!
//! Both share one phase convention: a tag by `θ` multiplies the amplitude of
//! every satisfying basis state by `e^{iθ}` and leaves the rest untouched, with
//! no stray global phase. `θ = π` is emitted as Z so sign flips read as such.

pub mod diffusion;
pub mod ladder;
pub mod oracle;

use std::f64::consts::PI;

use psi_ir::{Circuit, ClassicalCondition, Instruction, Span, StandardGate, WireId};

use crate::error::CompileResult;

pub use diffusion::reflect_mean;
pub use ladder::multi_controlled_x;
pub use oracle::{flip, phase_oracle};

/// Per-statement settings shared by every gate a synthesizer emits.
#[derive(Debug, Clone, Default)]
pub struct SynthesisContext {
    /// Statement the gates are lowered from.
    pub origin: Span,
    /// Classical guards attached to every emitted gate.
    pub conditions: Vec<ClassicalCondition>,
    /// Emit `== 0` literals as negative-polarity controls.
    pub native_negative_controls: bool,
}

impl SynthesisContext {
    /// Context for the statement at `origin`.
    pub fn new(origin: Span) -> Self {
        Self {
            origin,
            ..Self::default()
        }
    }

    /// Attach classical guards.
    #[must_use]
    pub fn with_conditions(mut self, conditions: Vec<ClassicalCondition>) -> Self {
        self.conditions = conditions;
        self
    }

    /// Use native negative controls.
    #[must_use]
    pub fn with_native_negative_controls(mut self, enabled: bool) -> Self {
        self.native_negative_controls = enabled;
        self
    }

    /// Push `instruction` tagged with this statement's origin and guards.
    pub fn emit(&self, circuit: &mut Circuit, instruction: Instruction) -> CompileResult<()> {
        circuit.push(
            instruction
                .with_origin(self.origin)
                .with_conditions(self.conditions.iter().cloned()),
        )?;
        Ok(())
    }

    /// X on every wire in `wires`.
    pub(crate) fn invert(&self, circuit: &mut Circuit, wires: &[WireId]) -> CompileResult<()> {
        for &wire in wires {
            self.emit(circuit, Instruction::single(StandardGate::X, wire))?;
        }
        Ok(())
    }

    /// H on every wire in `wires`.
    pub(crate) fn hadamard(&self, circuit: &mut Circuit, wires: &[WireId]) -> CompileResult<()> {
        for &wire in wires {
            self.emit(circuit, Instruction::single(StandardGate::H, wire))?;
        }
        Ok(())
    }
}

/// The phase gate for angle `theta`; a half turn is emitted as Z.
pub fn phase_gate(theta: f64) -> StandardGate {
    if (theta - PI).abs() < 1e-12 {
        StandardGate::Z
    } else {
        StandardGate::P(theta)
    }
}
