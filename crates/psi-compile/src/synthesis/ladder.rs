//! Toffoli ladders for many-controlled X.
//!
//! A conjunction of `k ≥ 3` controls is accumulated pairwise into `k - 2`
//! scratch ancillas: rung 0 writes `c0 ∧ c1`, every further rung ANDs one
//! more control into the next scratch wire, and the top rung writes the
//! target. The compute rungs are then replayed in reverse, so every scratch
//! wire returns to |0⟩ and no emitted gate has more than two controls.

use psi_ir::{Circuit, Control, Instruction, StandardGate, WireId};

use super::SynthesisContext;
use crate::ancilla::AncillaPool;
use crate::error::CompileResult;

/// Number of scratch ancillas [`multi_controlled_x`] borrows for `controls`.
pub fn scratch_needed(controls: usize) -> usize {
    controls.saturating_sub(2)
}

/// Invert `target` when every control fires.
///
/// Up to two controls are emitted as one gate. Beyond that the ladder runs
/// in its own [`AncillaPool::scoped`] block, stacked above whatever the
/// caller already holds.
pub fn multi_controlled_x(
    circuit: &mut Circuit,
    pool: &mut AncillaPool,
    ctx: &SynthesisContext,
    controls: &[Control],
    target: WireId,
) -> CompileResult<()> {
    if controls.len() <= 2 {
        return ctx.emit(
            circuit,
            Instruction::controlled(StandardGate::X, controls.iter().copied(), target),
        );
    }

    pool.scoped(
        scratch_needed(controls.len()),
        circuit,
        ctx.origin,
        |_, circuit, scratch| {
            let rungs = compute_rungs(controls, scratch);
            for rung in &rungs {
                ctx.emit(circuit, rung.clone())?;
            }
            let last = controls.len() - 1;
            ctx.emit(
                circuit,
                toffoli(controls[last], Control::positive(scratch[last - 2]), target),
            )?;
            for rung in rungs.iter().rev() {
                ctx.emit(circuit, rung.clone())?;
            }
            Ok(())
        },
    )
}

fn compute_rungs(controls: &[Control], scratch: &[WireId]) -> Vec<Instruction> {
    let mut rungs = vec![toffoli(controls[0], controls[1], scratch[0])];
    for i in 2..controls.len() - 1 {
        rungs.push(toffoli(
            controls[i],
            Control::positive(scratch[i - 2]),
            scratch[i - 1],
        ));
    }
    rungs
}

fn toffoli(a: Control, b: Control, target: WireId) -> Instruction {
    Instruction::controlled(StandardGate::X, [a, b], target)
}
