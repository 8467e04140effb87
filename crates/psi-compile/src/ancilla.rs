//! Ancilla pool and the clean-state check.
//!
//! Synthesis borrows scratch wires from a bounded [`AncillaPool`]. Slots are
//! handed out as a stack: a checkout takes the lowest free slot, which is
//! always the current depth, and releases must come back in reverse order.
//! [`AncillaPool::scoped`] wraps a synthesis step so that its ancillas are
//! checked out, verified clean against the emitted gates, and released even
//! when the step fails.
//!
//! [`verify_clean`] decides whether a gate sequence returns every ancilla it
//! touches to |0⟩. Small sequences are checked by classical simulation over
//! every basis input; larger ones must decompose into mirrored
//! compute/uncompute blocks.

use serde::{Deserialize, Serialize};
use tracing::debug;

use psi_ir::{AncillaAllocation, AncillaId, Circuit, Instruction, InstructionKind, Span, WireId};

use crate::error::{CompileError, CompileResult};

/// Largest number of input wires checked exhaustively.
pub const EXHAUSTIVE_INPUT_LIMIT: usize = 16;

#[derive(Debug, Clone)]
struct Held {
    id: AncillaId,
    slot: usize,
    wire: WireId,
    dirty: bool,
}

/// Restore point for [`AncillaPool::rollback`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolCheckpoint {
    held: usize,
    next_id: u32,
}

/// Bounded stack of ancilla slots.
#[derive(Debug, Clone)]
pub struct AncillaPool {
    capacity: usize,
    held: Vec<Held>,
    next_id: u32,
    peak: usize,
}

impl AncillaPool {
    /// Create a pool with `capacity` slots.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            held: vec![],
            next_id: 0,
            peak: 0,
        }
    }

    /// Total number of slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently checked out.
    pub fn outstanding(&self) -> usize {
        self.held.len()
    }

    /// Slots currently free.
    pub fn available(&self) -> usize {
        self.capacity.saturating_sub(self.held.len())
    }

    /// Largest number of slots ever held at once.
    pub fn peak(&self) -> usize {
        self.peak
    }

    /// Check out one ancilla for the statement at `origin`.
    ///
    /// The allocation is recorded in the circuit's ancilla table.
    pub fn checkout(&mut self, circuit: &mut Circuit, origin: Span) -> CompileResult<(AncillaId, WireId)> {
        if self.held.len() >= self.capacity {
            return Err(CompileError::AncillaExhausted {
                requested: 1,
                available: 0,
                capacity: self.capacity,
                span: origin,
            });
        }
        // Held slots are exactly 0..len.
        let slot = self.held.len();
        let wire = circuit.ancilla_wire(slot);
        let id = AncillaId(self.next_id);
        self.next_id += 1;
        circuit.record_ancilla(AncillaAllocation {
            id,
            slot,
            wire,
            origin: Some(origin),
        });
        self.held.push(Held {
            id,
            slot,
            wire,
            dirty: false,
        });
        self.peak = self.peak.max(self.held.len());
        debug!("checked out ancilla {} in slot {} ({})", id, slot, wire);
        Ok((id, wire))
    }

    fn find_mut(&mut self, id: AncillaId) -> CompileResult<&mut Held> {
        self.held
            .iter_mut()
            .find(|h| h.id == id)
            .ok_or_else(|| not_held(id))
    }

    /// Mark an ancilla as possibly entangled.
    pub fn mark_dirty(&mut self, id: AncillaId) -> CompileResult<()> {
        self.find_mut(id)?.dirty = true;
        Ok(())
    }

    /// Mark an ancilla as verified back in |0⟩.
    pub fn mark_clean(&mut self, id: AncillaId) -> CompileResult<()> {
        self.find_mut(id)?.dirty = false;
        Ok(())
    }

    /// Return an ancilla to the pool. Only the most recent checkout may be
    /// released, and only once it is clean.
    pub fn release(&mut self, id: AncillaId) -> CompileResult<()> {
        let top = self.held.last().ok_or_else(|| not_held(id))?;
        if top.id != id {
            if self.held.iter().any(|h| h.id == id) {
                return Err(CompileError::ReleaseOrder {
                    expected: top.id,
                    got: id,
                });
            }
            return Err(not_held(id));
        }
        if top.dirty {
            return Err(CompileError::AncillaLeak {
                ancilla: id,
                slot: top.slot,
                detail: "released while still marked dirty".into(),
            });
        }
        self.held.pop();
        debug!("released ancilla {}", id);
        Ok(())
    }

    /// Snapshot the pool state.
    pub fn checkpoint(&self) -> PoolCheckpoint {
        PoolCheckpoint {
            held: self.held.len(),
            next_id: self.next_id,
        }
    }

    /// Forget every checkout made after `checkpoint`.
    pub fn rollback(&mut self, checkpoint: PoolCheckpoint) {
        self.held.truncate(checkpoint.held);
        self.next_id = checkpoint.next_id;
    }

    /// Run `f` with `count` freshly checked-out ancillas.
    ///
    /// `f` receives the pool back so it can open nested scopes on the slots
    /// above its own. On success the gates `f` emitted are checked with [`verify_clean`]
    /// and the ancillas are released in reverse order. On failure of `f`
    /// the ancillas are released without verification and the error is
    /// returned unchanged.
    pub fn scoped<T>(
        &mut self,
        count: usize,
        circuit: &mut Circuit,
        origin: Span,
        f: impl FnOnce(&mut Self, &mut Circuit, &[WireId]) -> CompileResult<T>,
    ) -> CompileResult<T> {
        let available = self.available();
        if count > available {
            return Err(CompileError::AncillaExhausted {
                requested: count,
                available,
                capacity: self.capacity,
                span: origin,
            });
        }

        let depth = self.held.len();
        let start = circuit.checkpoint();
        let mut ids = Vec::with_capacity(count);
        let mut wires = Vec::with_capacity(count);
        for _ in 0..count {
            let (id, wire) = match self.checkout(circuit, origin) {
                Ok(checked_out) => checked_out,
                Err(err) => {
                    self.held.truncate(depth);
                    return Err(err);
                }
            };
            self.mark_dirty(id)?;
            ids.push(id);
            wires.push(wire);
        }

        let value = match f(self, circuit, &wires) {
            Ok(value) => value,
            Err(err) => {
                self.held.truncate(depth);
                return Err(err);
            }
        };

        if ids.is_empty() {
            return Ok(value);
        }
        let verdict = verify_clean(circuit.since(start), &wires);
        if let Err(leak) = verdict {
            let held = self.held.iter().find(|h| h.wire == leak.wire);
            let (ancilla, slot) = held.map_or((ids[0], depth), |h| (h.id, h.slot));
            self.held.truncate(depth);
            return Err(CompileError::AncillaLeak {
                ancilla,
                slot,
                detail: leak.detail,
            });
        }

        for &id in ids.iter().rev() {
            self.mark_clean(id)?;
            self.release(id)?;
        }
        Ok(value)
    }
}

fn not_held(id: AncillaId) -> CompileError {
    CompileError::PassFailed {
        name: "ancilla_pool".into(),
        reason: format!("ancilla {id} is not checked out"),
    }
}

/// How a clean-state check was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verification {
    /// Simulated over every basis assignment of the input wires.
    Exhaustive { inputs: usize },
    /// Too many inputs to enumerate; accepted because the sequence splits
    /// into mirrored compute/uncompute blocks.
    Structural,
}

/// A failed clean-state check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leak {
    /// The offending ancilla wire.
    pub wire: WireId,
    /// What went wrong.
    pub detail: String,
}

/// Check that `instructions` leave every wire in `ancillas` in |0⟩, given
/// that they all start there.
///
/// Classical conditions are ignored: a block emitted for one statement
/// shares one guard, so it either runs whole or not at all.
pub fn verify_clean(instructions: &[Instruction], ancillas: &[WireId]) -> Result<Verification, Leak> {
    let fallback = ancillas.first().copied().unwrap_or(WireId(0));
    let mut inputs: Vec<WireId> = vec![];
    for inst in instructions {
        match &inst.kind {
            InstructionKind::Gate(gate) if gate.is_classical() => {}
            InstructionKind::Gate(gate) => {
                let wire = inst
                    .wires()
                    .find(|w| ancillas.contains(w))
                    .unwrap_or(fallback);
                return Err(Leak {
                    wire,
                    detail: format!("non-classical gate {} inside an ancilla block", gate.name()),
                });
            }
            InstructionKind::Measure | InstructionKind::Unsupported { .. } => {
                return Err(Leak {
                    wire: fallback,
                    detail: format!("{} inside an ancilla block", inst.name()),
                });
            }
        }
        for wire in inst.wires() {
            if !ancillas.contains(&wire) && !inputs.contains(&wire) {
                inputs.push(wire);
            }
        }
    }

    if inputs.len() <= EXHAUSTIVE_INPUT_LIMIT {
        exhaustive(instructions, ancillas, &inputs)?;
        Ok(Verification::Exhaustive {
            inputs: inputs.len(),
        })
    } else {
        structural(instructions, ancillas, fallback)?;
        Ok(Verification::Structural)
    }
}

fn exhaustive(instructions: &[Instruction], ancillas: &[WireId], inputs: &[WireId]) -> Result<(), Leak> {
    // Local bit positions: inputs first, then ancillas.
    let position = |wire: WireId| -> Option<usize> {
        inputs
            .iter()
            .position(|&w| w == wire)
            .or_else(|| ancillas.iter().position(|&w| w == wire).map(|i| i + inputs.len()))
    };

    for assignment in 0u64..(1u64 << inputs.len()) {
        let mut bits: Vec<bool> = (0..inputs.len() + ancillas.len())
            .map(|i| i < inputs.len() && (assignment >> i) & 1 == 1)
            .collect();

        for inst in instructions {
            let Some(gate) = inst.base_gate() else {
                continue;
            };
            if gate.is_diagonal() {
                continue;
            }
            let fires = inst
                .controls
                .iter()
                .all(|c| position(c.wire).is_some_and(|i| bits[i] == c.fires_on()));
            if !fires {
                continue;
            }
            let targets: Vec<usize> = inst.targets.iter().filter_map(|&t| position(t)).collect();
            match targets.as_slice() {
                [t] => bits[*t] = !bits[*t],
                [a, b] => bits.swap(*a, *b),
                _ => {}
            }
        }

        for (i, &wire) in ancillas.iter().enumerate() {
            if bits[inputs.len() + i] {
                let input: String = (0..inputs.len())
                    .map(|j| if (assignment >> j) & 1 == 1 { '1' } else { '0' })
                    .collect();
                return Err(Leak {
                    wire,
                    detail: format!("reads 1 on input {input}"),
                });
            }
        }
    }
    Ok(())
}

/// Accept the sequence if its basis-changing gates split into consecutive
/// mirrored blocks `G1..Gm [M] Gm..G1`, where the optional middle `M`
/// targets a wire nothing else in the block touches.
fn structural(instructions: &[Instruction], ancillas: &[WireId], fallback: WireId) -> Result<(), Leak> {
    let seq: Vec<&Instruction> = instructions
        .iter()
        .filter(|inst| inst.base_gate().is_some_and(|g| !g.is_diagonal()))
        .collect();

    let mut start = 0;
    while start < seq.len() {
        let closed = (start + 1..=seq.len()).find(|&end| is_mirrored(&seq[start..end], ancillas));
        match closed {
            Some(end) => start = end,
            None => {
                let wire = seq[start]
                    .targets
                    .iter()
                    .copied()
                    .find(|t| ancillas.contains(t))
                    .unwrap_or(fallback);
                return Err(Leak {
                    wire,
                    detail: "compute block is never mirrored by its uncompute".into(),
                });
            }
        }
    }
    Ok(())
}

fn is_mirrored(block: &[&Instruction], ancillas: &[WireId]) -> bool {
    let n = block.len();
    if (0..n / 2).any(|i| block[i] != block[n - 1 - i]) {
        return false;
    }
    if n % 2 == 0 {
        return true;
    }
    let middle = block[n / 2];
    let others = block[..n / 2].iter().flat_map(|inst| inst.wires());
    let mut touched: Vec<WireId> = others.collect();
    touched.extend(middle.controls.iter().map(|c| c.wire));
    middle
        .targets
        .iter()
        .all(|t| !ancillas.contains(t) && !touched.contains(t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use psi_ir::{Control, StandardGate};

    fn circuit_with(n: u32) -> (Circuit, Vec<WireId>) {
        let mut circuit = Circuit::new("pool");
        let q = circuit.add_qreg("q", n).unwrap();
        (circuit, q)
    }

    fn ccx(a: WireId, b: WireId, t: WireId) -> Instruction {
        Instruction::controlled(StandardGate::X, [Control::positive(a), Control::positive(b)], t)
    }

    #[test]
    fn test_checkout_is_a_stack() {
        let (mut circuit, _) = circuit_with(1);
        let mut pool = AncillaPool::new(2);
        let (a, wa) = pool.checkout(&mut circuit, Span::default()).unwrap();
        let (b, wb) = pool.checkout(&mut circuit, Span::default()).unwrap();
        assert_ne!(wa, wb);
        assert_eq!(pool.available(), 0);
        assert!(matches!(
            pool.checkout(&mut circuit, Span::default()),
            Err(CompileError::AncillaExhausted { capacity: 2, .. })
        ));

        assert!(matches!(
            pool.release(a),
            Err(CompileError::ReleaseOrder { expected, got }) if expected == b && got == a
        ));
        pool.release(b).unwrap();
        pool.release(a).unwrap();
        assert_eq!(pool.outstanding(), 0);
        assert_eq!(pool.peak(), 2);
        assert_eq!(circuit.ancillas().len(), 2);

        // Slot 0 is reused.
        let (_, again) = pool.checkout(&mut circuit, Span::default()).unwrap();
        assert_eq!(again, wa);
    }

    #[test]
    fn test_nested_checkouts_take_the_slot_at_depth() {
        let (mut circuit, _) = circuit_with(1);
        let mut pool = AncillaPool::new(3);
        let mut wires = vec![];
        for depth in 0..3 {
            let (id, wire) = pool.checkout(&mut circuit, Span::default()).unwrap();
            assert_eq!(circuit.ancillas()[id.0 as usize].slot, depth);
            assert_eq!(circuit.ancilla_wire(depth), wire);
            assert!(!wires.contains(&wire));
            wires.push(wire);
        }
        assert_eq!(pool.outstanding(), 3);

        // Releasing the top frees exactly its slot for the next checkout.
        let top = circuit.ancillas()[2].id;
        pool.release(top).unwrap();
        let (_, reused) = pool.checkout(&mut circuit, Span::default()).unwrap();
        assert_eq!(reused, wires[2]);
        assert_eq!(circuit.ancillas().last().map(|a| a.slot), Some(2));
    }

    #[test]
    fn test_nested_scopes_verify_each_level() {
        let (mut circuit, q) = circuit_with(4);
        let mut pool = AncillaPool::new(2);
        pool.scoped(1, &mut circuit, Span::default(), |pool, circuit, outer| {
            let result = outer[0];
            for _ in 0..2 {
                pool.scoped(1, circuit, Span::default(), |_, circuit, inner| {
                    assert_ne!(inner[0], result);
                    circuit.push(ccx(q[0], q[1], inner[0]))?;
                    circuit.push(ccx(q[2], inner[0], result))?;
                    circuit.push(ccx(q[0], q[1], inner[0]))?;
                    Ok(())
                })?;
            }
            assert_eq!(pool.outstanding(), 1);
            Ok(())
        })
        .unwrap();
        assert_eq!(pool.outstanding(), 0);
        assert_eq!(pool.peak(), 2);
        assert_eq!(circuit.ancillas().len(), 3);
    }

    #[test]
    fn test_dirty_release_is_a_leak() {
        let (mut circuit, _) = circuit_with(1);
        let mut pool = AncillaPool::new(1);
        let (a, _) = pool.checkout(&mut circuit, Span::default()).unwrap();
        pool.mark_dirty(a).unwrap();
        assert!(matches!(pool.release(a), Err(CompileError::AncillaLeak { .. })));
        pool.mark_clean(a).unwrap();
        pool.release(a).unwrap();
    }

    #[test]
    fn test_scoped_compute_uncompute() {
        let (mut circuit, q) = circuit_with(3);
        let mut pool = AncillaPool::new(1);
        pool.scoped(1, &mut circuit, Span::default(), |_, circuit, anc| {
            circuit.push(ccx(q[0], q[1], anc[0]))?;
            circuit.cx(anc[0], q[2])?;
            circuit.push(ccx(q[0], q[1], anc[0]))?;
            Ok(())
        })
        .unwrap();
        assert_eq!(pool.outstanding(), 0);
        assert_eq!(circuit.num_ops(), 3);
    }

    #[test]
    fn test_scoped_detects_missing_uncompute() {
        let (mut circuit, q) = circuit_with(2);
        let mut pool = AncillaPool::new(1);
        let err = pool
            .scoped(1, &mut circuit, Span::default(), |_, circuit, anc| {
                circuit.push(ccx(q[0], q[1], anc[0]))?;
                Ok(())
            })
            .unwrap_err();
        let CompileError::AncillaLeak { detail, .. } = err else {
            panic!("expected leak");
        };
        assert_eq!(detail, "reads 1 on input 11");
        assert_eq!(pool.outstanding(), 0);
    }

    #[test]
    fn test_scoped_releases_on_error() {
        let (mut circuit, _) = circuit_with(1);
        let mut pool = AncillaPool::new(3);
        let result: CompileResult<()> = pool.scoped(2, &mut circuit, Span::default(), |_, _, _| {
            Err(CompileError::MissingLayout)
        });
        assert!(matches!(result, Err(CompileError::MissingLayout)));
        assert_eq!(pool.outstanding(), 0);
        assert!(matches!(
            pool.scoped(4, &mut circuit, Span::default(), |_, _, _| Ok(())),
            Err(CompileError::AncillaExhausted { requested: 4, available: 3, .. })
        ));
    }

    #[test]
    fn test_rollback_restores_ids() {
        let (mut circuit, _) = circuit_with(1);
        let mut pool = AncillaPool::new(2);
        let mark = pool.checkpoint();
        let (first, _) = pool.checkout(&mut circuit, Span::default()).unwrap();
        pool.rollback(mark);
        let (second, _) = pool.checkout(&mut circuit, Span::default()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_structural_check_on_wide_ladder() {
        // 18 inputs force the structural path.
        let (mut circuit, q) = circuit_with(20);
        let a0 = circuit.ancilla_wire(0);
        let mut seq = vec![];
        for pair in q[..18].chunks(2) {
            seq.push(ccx(pair[0], pair[1], a0));
            seq.push(Instruction::controlled(StandardGate::X, [Control::positive(a0)], q[19]));
            seq.push(ccx(pair[0], pair[1], a0));
        }
        assert_eq!(verify_clean(&seq, &[a0]), Ok(Verification::Structural));

        seq.pop();
        assert!(verify_clean(&seq, &[a0]).is_err());
    }

    #[test]
    fn test_negative_controls_are_simulated() {
        let (mut circuit, q) = circuit_with(1);
        let a0 = circuit.ancilla_wire(0);
        let seq = [
            Instruction::controlled(StandardGate::X, [Control::negative(q[0])], a0),
            Instruction::single(StandardGate::X, a0),
        ];
        let leak = verify_clean(&seq, &[a0]).unwrap_err();
        assert_eq!(leak.detail, "reads 1 on input 1");
    }

    #[test]
    fn test_hadamard_is_rejected() {
        let (mut circuit, _) = circuit_with(1);
        let a0 = circuit.ancilla_wire(0);
        let seq = [Instruction::single(StandardGate::H, a0)];
        assert!(verify_clean(&seq, &[a0]).is_err());
    }
}
