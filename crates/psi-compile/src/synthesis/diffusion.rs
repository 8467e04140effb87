//! Reflection about the mean.

use std::f64::consts::PI;

use tracing::debug;

use psi_ir::{Circuit, Instruction, StandardGate, WireId};

use super::{SynthesisContext, phase_oracle};
use crate::ancilla::AncillaPool;
use crate::error::CompileResult;
use crate::predicate::ControlSet;

/// Reflect the amplitudes of `wires` about their mean.
///
/// Emits `H^n X^n (sign flip on |1...1⟩) X^n H^n`. The sign flip goes through
/// [`phase_oracle`] with angle π, so a tag followed by a reflection composes
/// with one phase convention regardless of register size. A single wire
/// reduces to `H Z H`.
pub fn reflect_mean(
    circuit: &mut Circuit,
    pool: &mut AncillaPool,
    ctx: &SynthesisContext,
    wires: &[WireId],
) -> CompileResult<()> {
    debug!("reflect about the mean over {} wires", wires.len());
    match wires {
        [] => Ok(()),
        [wire] => {
            ctx.emit(circuit, Instruction::single(StandardGate::H, *wire))?;
            ctx.emit(circuit, Instruction::single(StandardGate::Z, *wire))?;
            ctx.emit(circuit, Instruction::single(StandardGate::H, *wire))
        }
        _ => {
            ctx.hadamard(circuit, wires)?;
            ctx.invert(circuit, wires)?;
            phase_oracle(circuit, pool, ctx, &ControlSet::all_ones(wires), PI, wires[0])?;
            ctx.invert(circuit, wires)?;
            ctx.hadamard(circuit, wires)
        }
    }
}
