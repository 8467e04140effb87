//! Predicate-guarded phase tags and flips.
//!
//! Strategy by literal count `k`:
//!
//! | k | Phase | Flip |
//! |---|-------|------|
//! | 0 | global `e^{iθ}` on the fallback wire | X |
//! | 1 | P on the literal's wire | CX |
//! | 2 | CP | CCX |
//! | ≥3 | ladder into a result ancilla, P on it, ladder back | ladder onto the target |
//!
//! `== 0` literals are bracketed by X on both sides unless negative controls
//! are native. A ladder is the Toffoli chain of [`super::ladder`] and borrows
//! `k - 2` scratch ancillas; the phase path holds one more for the result,
//! so it peaks at `k - 1`. Every k ≥ 3 path runs inside
//! [`AncillaPool::scoped`], so each ancilla is verified clean before it goes
//! back to the pool.

use tracing::debug;

use psi_ir::{Circuit, Control, Instruction, StandardGate, WireId};

use super::ladder::multi_controlled_x;
use super::{SynthesisContext, phase_gate};
use crate::ancilla::AncillaPool;
use crate::error::CompileResult;
use crate::predicate::ControlSet;

/// Multiply the amplitude of every basis state satisfying `controls` by
/// `e^{iθ}`.
///
/// `fallback` carries the global phase when there are no literals.
pub fn phase_oracle(
    circuit: &mut Circuit,
    pool: &mut AncillaPool,
    ctx: &SynthesisContext,
    controls: &ControlSet<WireId>,
    theta: f64,
    fallback: WireId,
) -> CompileResult<()> {
    let gate = phase_gate(theta);
    debug!(
        "phase oracle: {} literals, {} inversions, angle {}",
        controls.len(),
        controls.inversions.len(),
        theta
    );

    match controls.literals.as_slice() {
        [] => {
            // X P X P is diag(e^{iθ}, e^{iθ}).
            ctx.emit(circuit, Instruction::single(StandardGate::X, fallback))?;
            ctx.emit(circuit, Instruction::single(gate, fallback))?;
            ctx.emit(circuit, Instruction::single(StandardGate::X, fallback))?;
            ctx.emit(circuit, Instruction::single(gate, fallback))
        }
        [literal] => {
            let bracket: &[WireId] = if literal.value { &[] } else { &[literal.wire] };
            ctx.invert(circuit, bracket)?;
            ctx.emit(circuit, Instruction::single(gate, literal.wire))?;
            ctx.invert(circuit, bracket)
        }
        [first, second] => {
            // A phase is symmetric in its wires: put the target on a |1⟩
            // literal so native mode needs no bracket at all.
            let (control, target) = if second.value || !first.value {
                (first, second)
            } else {
                (second, first)
            };
            let native = ctx.native_negative_controls;
            let bracket: Vec<WireId> = if native {
                (!target.value).then_some(target.wire).into_iter().collect()
            } else {
                controls.inversions.clone()
            };
            ctx.invert(circuit, &bracket)?;
            ctx.emit(
                circuit,
                Instruction::controlled(gate, [control.to_control(native)], target.wire),
            )?;
            ctx.invert(circuit, &bracket)
        }
        literals => {
            let native = ctx.native_negative_controls;
            let bracket = brackets(ctx, controls);
            let mcx: Vec<Control> = literals.iter().map(|l| l.to_control(native)).collect();
            ctx.invert(circuit, &bracket)?;
            pool.scoped(1, circuit, ctx.origin, |pool, circuit, ancillas| {
                let result = ancillas[0];
                multi_controlled_x(circuit, pool, ctx, &mcx, result)?;
                ctx.emit(circuit, Instruction::single(gate, result))?;
                multi_controlled_x(circuit, pool, ctx, &mcx, result)
            })?;
            ctx.invert(circuit, &bracket)
        }
    }
}

/// Invert `target` on every basis state satisfying `controls`.
pub fn flip(
    circuit: &mut Circuit,
    pool: &mut AncillaPool,
    ctx: &SynthesisContext,
    controls: &ControlSet<WireId>,
    target: WireId,
) -> CompileResult<()> {
    debug!(
        "flip {}: {} literals, {} inversions",
        target,
        controls.len(),
        controls.inversions.len()
    );
    let native = ctx.native_negative_controls;
    let bracket = brackets(ctx, controls);
    let mcx: Vec<Control> = controls
        .literals
        .iter()
        .map(|l| l.to_control(native))
        .collect();

    ctx.invert(circuit, &bracket)?;
    multi_controlled_x(circuit, pool, ctx, &mcx, target)?;
    ctx.invert(circuit, &bracket)
}

fn brackets(ctx: &SynthesisContext, controls: &ControlSet<WireId>) -> Vec<WireId> {
    if ctx.native_negative_controls {
        vec![]
    } else {
        controls.inversions.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::ControlLiteral;
    use psi_ir::Span;
    use std::f64::consts::PI;

    fn set(literals: &[(WireId, bool)]) -> ControlSet<WireId> {
        ControlSet {
            literals: literals
                .iter()
                .map(|&(wire, value)| ControlLiteral { wire, value })
                .collect(),
            inversions: literals
                .iter()
                .filter(|(_, v)| !v)
                .map(|&(w, _)| w)
                .collect(),
        }
    }

    fn names(circuit: &Circuit) -> Vec<String> {
        circuit.instructions().iter().map(|i| i.name()).collect()
    }

    #[test]
    fn test_two_literals_with_inversion() {
        let mut circuit = Circuit::new("o");
        let q = circuit.add_qreg("q", 2).unwrap();
        let mut pool = AncillaPool::new(1);
        let ctx = SynthesisContext::new(Span::default());
        let controls = set(&[(q[0], true), (q[1], false)]);

        phase_oracle(&mut circuit, &mut pool, &ctx, &controls, PI, q[0]).unwrap();
        assert_eq!(names(&circuit), vec!["x", "cz", "x"]);
        assert_eq!(circuit.instructions()[0].targets, vec![q[1]]);
        assert_eq!(circuit.instructions()[2].targets, vec![q[1]]);
        assert!(circuit.ancillas().is_empty());
    }

    #[test]
    fn test_native_negative_controls() {
        let mut circuit = Circuit::new("o");
        let q = circuit.add_qreg("q", 2).unwrap();
        let mut pool = AncillaPool::new(1);
        let ctx = SynthesisContext::new(Span::default()).with_native_negative_controls(true);
        let controls = set(&[(q[0], true), (q[1], false)]);

        phase_oracle(&mut circuit, &mut pool, &ctx, &controls, PI, q[0]).unwrap();
        assert_eq!(names(&circuit), vec!["cz"]);
        let inst = &circuit.instructions()[0];
        assert!(inst.has_negative_controls());
        assert_eq!(inst.targets, vec![q[0]]);
    }

    #[test]
    fn test_three_literals_ladder_into_a_result_ancilla() {
        let mut circuit = Circuit::new("o");
        let q = circuit.add_qreg("q", 3).unwrap();
        let mut pool = AncillaPool::new(2);
        let ctx = SynthesisContext::new(Span::default());
        let controls = set(&[(q[0], true), (q[1], false), (q[2], true)]);

        phase_oracle(&mut circuit, &mut pool, &ctx, &controls, PI / 2.0, q[0]).unwrap();
        assert_eq!(
            names(&circuit),
            vec!["x", "ccx", "ccx", "ccx", "p", "ccx", "ccx", "ccx", "x"]
        );
        // Result slot 0 once, scratch slot 1 once per ladder.
        let slots: Vec<usize> = circuit.ancillas().iter().map(|a| a.slot).collect();
        assert_eq!(slots, vec![0, 1, 1]);
        assert_eq!(pool.peak(), 2);
        assert_eq!(pool.outstanding(), 0);

        let result = circuit.ancillas()[0].wire;
        assert_eq!(circuit.instructions()[4].targets, vec![result]);
        assert!(circuit.instructions().iter().all(|i| i.controls.len() <= 2));
    }

    #[test]
    fn test_phase_ladder_needs_scratch_beyond_the_result() {
        let mut circuit = Circuit::new("o");
        let q = circuit.add_qreg("q", 3).unwrap();
        let mut pool = AncillaPool::new(1);
        let ctx = SynthesisContext::new(Span::default());
        let controls = set(&[(q[0], true), (q[1], true), (q[2], true)]);

        let err = phase_oracle(&mut circuit, &mut pool, &ctx, &controls, PI, q[0]).unwrap_err();
        assert!(matches!(
            err,
            crate::error::CompileError::AncillaExhausted { requested: 1, available: 0, .. }
        ));
        assert_eq!(pool.outstanding(), 0);
    }

    #[test]
    fn test_exhausted_pool_is_reported() {
        let mut circuit = Circuit::new("o");
        let q = circuit.add_qreg("q", 3).unwrap();
        let mut pool = AncillaPool::new(0);
        let ctx = SynthesisContext::new(Span::default());
        let controls = set(&[(q[0], true), (q[1], true), (q[2], true)]);

        let err = flip(&mut circuit, &mut pool, &ctx, &controls, q[0]).unwrap_err();
        assert!(matches!(
            err,
            crate::error::CompileError::AncillaExhausted { requested: 1, .. }
        ));
    }

    #[test]
    fn test_flip_shapes() {
        let mut circuit = Circuit::new("f");
        let q = circuit.add_qreg("q", 5).unwrap();
        let mut pool = AncillaPool::new(2);
        let ctx = SynthesisContext::new(Span::default());

        flip(&mut circuit, &mut pool, &ctx, &set(&[]), q[4]).unwrap();
        flip(&mut circuit, &mut pool, &ctx, &set(&[(q[0], false)]), q[4]).unwrap();
        flip(
            &mut circuit,
            &mut pool,
            &ctx,
            &set(&[(q[0], true), (q[1], true), (q[2], true), (q[3], true)]),
            q[4],
        )
        .unwrap();
        assert_eq!(
            names(&circuit),
            vec!["x", "x", "cx", "x", "ccx", "ccx", "ccx", "ccx", "ccx"]
        );
        assert_eq!(circuit.instructions()[6].targets, vec![q[4]]);
        assert_eq!(pool.peak(), 2);
        assert_eq!(pool.outstanding(), 0);
    }
}
