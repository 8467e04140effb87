//! Gate-level circuit IR.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{IrError, IrResult};
use crate::gate::{Control, StandardGate};
use crate::instruction::{Instruction, InstructionKind};
use crate::span::Span;
use crate::wire::{ClassicalRegister, Clbit, ClbitId, Register, Wire, WireId, WireRole};

/// Name of the register that holds ancilla pool wires.
pub const ANCILLA_REGISTER: &str = "anc";

/// Identifier of one ancilla checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AncillaId(pub u32);

impl fmt::Display for AncillaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a{}", self.0)
    }
}

/// One row of the ancilla allocation table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AncillaAllocation {
    /// Checkout identifier.
    pub id: AncillaId,
    /// Pool slot the checkout was served from.
    pub slot: usize,
    /// Wire backing the slot.
    pub wire: WireId,
    /// Statement that requested the ancilla.
    pub origin: Option<Span>,
}

/// Position in a circuit that can be restored with [`Circuit::rollback`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    instructions: usize,
    ancillas: usize,
    clbits: usize,
    classical_registers: usize,
}

/// An ordered gate-level circuit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Circuit {
    /// Name of the circuit.
    name: String,
    /// All quantum wires, indexed by [`WireId`].
    wires: Vec<Wire>,
    /// All classical bits, indexed by [`ClbitId`].
    clbits: Vec<Clbit>,
    /// Declared quantum registers.
    registers: Vec<Register>,
    /// Classical registers produced by measurement.
    classical_registers: Vec<ClassicalRegister>,
    /// Wires backing ancilla pool slots, indexed by slot.
    ancilla_wires: Vec<WireId>,
    /// Ancilla allocation table.
    ancillas: Vec<AncillaAllocation>,
    /// Instructions in program order.
    instructions: Vec<Instruction>,
}

impl Circuit {
    /// Create a new empty circuit.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Name of the circuit.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a quantum register with `size` wires.
    pub fn add_qreg(&mut self, name: impl Into<String>, size: u32) -> IrResult<Vec<WireId>> {
        let name = name.into();
        if name == ANCILLA_REGISTER || self.register(&name).is_some() {
            return Err(IrError::DuplicateRegister(name));
        }
        let ids: Vec<_> = (0..size)
            .map(|i| self.add_wire(&name, i, WireRole::Data))
            .collect();
        self.registers.push(Register {
            name,
            wires: ids.clone(),
        });
        Ok(ids)
    }

    fn add_wire(&mut self, register: &str, index: u32, role: WireRole) -> WireId {
        let id = WireId(u32::try_from(self.wires.len()).unwrap_or(u32::MAX));
        self.wires.push(Wire {
            id,
            register: register.to_string(),
            index,
            role,
        });
        id
    }

    /// Add a classical register with `size` bits.
    pub fn add_creg(&mut self, name: impl Into<String>, size: u32) -> IrResult<Vec<ClbitId>> {
        let name = name.into();
        if self.classical_register(&name).is_some() {
            return Err(IrError::DuplicateRegister(name));
        }
        let ids: Vec<_> = (0..size)
            .map(|i| self.push_clbit(Some(name.clone()), Some(i)))
            .collect();
        self.classical_registers.push(ClassicalRegister {
            name,
            bits: ids.clone(),
        });
        Ok(ids)
    }

    /// Add a single anonymous classical bit.
    pub fn add_clbit(&mut self) -> ClbitId {
        self.push_clbit(None, None)
    }

    fn push_clbit(&mut self, register: Option<String>, index: Option<u32>) -> ClbitId {
        let id = ClbitId(u32::try_from(self.clbits.len()).unwrap_or(u32::MAX));
        self.clbits.push(Clbit {
            id,
            register,
            index,
        });
        id
    }

    /// The wire backing ancilla pool `slot`, created on first use.
    pub fn ancilla_wire(&mut self, slot: usize) -> WireId {
        while self.ancilla_wires.len() <= slot {
            let index = u32::try_from(self.ancilla_wires.len()).unwrap_or(u32::MAX);
            let id = self.add_wire(ANCILLA_REGISTER, index, WireRole::Ancilla);
            self.ancilla_wires.push(id);
        }
        self.ancilla_wires[slot]
    }

    /// Wires backing the ancilla pool, indexed by slot.
    pub fn ancilla_wires(&self) -> &[WireId] {
        &self.ancilla_wires
    }

    /// Register wires in declaration order, excluding the ancilla pool.
    pub fn data_wires(&self) -> Vec<WireId> {
        self.registers
            .iter()
            .flat_map(|r| r.wires.iter().copied())
            .collect()
    }

    /// Record an ancilla checkout in the allocation table.
    pub fn record_ancilla(&mut self, allocation: AncillaAllocation) {
        self.ancillas.push(allocation);
    }

    /// The ancilla allocation table.
    pub fn ancillas(&self) -> &[AncillaAllocation] {
        &self.ancillas
    }

    /// Whether `wire` backs an ancilla slot.
    pub fn is_ancilla(&self, wire: WireId) -> bool {
        self.wire(wire).is_some_and(|w| w.role == WireRole::Ancilla)
    }

    /// Look up a quantum register by name.
    pub fn register(&self, name: &str) -> Option<&Register> {
        self.registers.iter().find(|r| r.name == name)
    }

    /// Look up a classical register by name.
    pub fn classical_register(&self, name: &str) -> Option<&ClassicalRegister> {
        self.classical_registers.iter().find(|r| r.name == name)
    }

    /// Declared quantum registers in declaration order.
    pub fn registers(&self) -> &[Register] {
        &self.registers
    }

    /// Classical registers in creation order.
    pub fn classical_registers(&self) -> &[ClassicalRegister] {
        &self.classical_registers
    }

    /// Wire metadata.
    pub fn wire(&self, id: WireId) -> Option<&Wire> {
        self.wires.get(id.index())
    }

    /// All wires.
    pub fn wires(&self) -> &[Wire] {
        &self.wires
    }

    /// Classical bit metadata.
    pub fn clbit(&self, id: ClbitId) -> Option<&Clbit> {
        self.clbits.get(id.index())
    }

    /// Number of quantum wires, ancillas included.
    pub fn num_wires(&self) -> usize {
        self.wires.len()
    }

    /// Number of classical bits.
    pub fn num_clbits(&self) -> usize {
        self.clbits.len()
    }

    /// Append an instruction after validating its operands.
    pub fn push(&mut self, instruction: Instruction) -> IrResult<()> {
        self.validate(&instruction)?;
        self.instructions.push(instruction);
        Ok(())
    }

    fn validate(&self, instruction: &Instruction) -> IrResult<()> {
        let gate_name = || Some(instruction.name());
        let mut seen = Vec::with_capacity(instruction.num_wires());
        for wire in instruction.wires() {
            if wire.index() >= self.wires.len() {
                return Err(IrError::WireNotFound {
                    wire,
                    gate_name: gate_name(),
                });
            }
            if seen.contains(&wire) {
                return Err(IrError::DuplicateWire {
                    wire,
                    gate_name: gate_name(),
                });
            }
            seen.push(wire);
        }
        let bits = instruction
            .clbits
            .iter()
            .chain(instruction.conditions.iter().flat_map(|c| c.bits.iter()));
        for &clbit in bits {
            if clbit.index() >= self.clbits.len() {
                return Err(IrError::ClbitNotFound { clbit });
            }
        }
        match &instruction.kind {
            InstructionKind::Gate(gate) => {
                let got = u32::try_from(instruction.targets.len()).unwrap_or(u32::MAX);
                if got != gate.num_targets() {
                    return Err(IrError::TargetCountMismatch {
                        gate_name: instruction.name(),
                        expected: gate.num_targets(),
                        got,
                    });
                }
            }
            InstructionKind::Measure => {
                if instruction.targets.len() != instruction.clbits.len() {
                    return Err(IrError::MeasureArity {
                        wires: instruction.targets.len(),
                        clbits: instruction.clbits.len(),
                    });
                }
            }
            InstructionKind::Unsupported { .. } => {}
        }
        Ok(())
    }

    /// Instructions in program order.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Remove and return all instructions, leaving wires and bits in place.
    pub fn take_instructions(&mut self) -> Vec<Instruction> {
        std::mem::take(&mut self.instructions)
    }

    /// Number of instructions.
    pub fn num_ops(&self) -> usize {
        self.instructions.len()
    }

    /// Snapshot the current end of the circuit.
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            instructions: self.instructions.len(),
            ancillas: self.ancillas.len(),
            clbits: self.clbits.len(),
            classical_registers: self.classical_registers.len(),
        }
    }

    /// Drop everything appended after `checkpoint`.
    ///
    /// Ancilla wires stay allocated; they are reused by later checkouts.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        self.instructions.truncate(checkpoint.instructions);
        self.ancillas.truncate(checkpoint.ancillas);
        self.clbits.truncate(checkpoint.clbits);
        self.classical_registers
            .truncate(checkpoint.classical_registers);
    }

    /// Instructions appended since `checkpoint`.
    pub fn since(&self, checkpoint: Checkpoint) -> &[Instruction] {
        &self.instructions[checkpoint.instructions.min(self.instructions.len())..]
    }

    /// Circuit depth: the longest chain of instructions sharing a wire.
    pub fn depth(&self) -> usize {
        let mut layer: FxHashMap<WireId, usize> = FxHashMap::default();
        let mut depth = 0;
        for inst in &self.instructions {
            if inst.is_unsupported() {
                continue;
            }
            let level = inst
                .wires()
                .map(|w| layer.get(&w).copied().unwrap_or(0))
                .max()
                .unwrap_or(0)
                + 1;
            for wire in inst.wires() {
                layer.insert(wire, level);
            }
            depth = depth.max(level);
        }
        depth
    }

    /// Instruction counts keyed by name.
    pub fn count_ops(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for inst in &self.instructions {
            *counts.entry(inst.name()).or_insert(0) += 1;
        }
        counts
    }

    /// Human-readable name of a wire (`q[1]`, `anc[0]`).
    pub fn wire_label(&self, wire: WireId) -> String {
        self.wire(wire)
            .map_or_else(|| wire.to_string(), ToString::to_string)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> IrResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> IrResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    // =========================================================================
    // Builder helpers
    // =========================================================================

    /// Apply Hadamard gate.
    pub fn h(&mut self, wire: WireId) -> IrResult<&mut Self> {
        self.push(Instruction::single(StandardGate::H, wire))?;
        Ok(self)
    }

    /// Apply Pauli-X gate.
    pub fn x(&mut self, wire: WireId) -> IrResult<&mut Self> {
        self.push(Instruction::single(StandardGate::X, wire))?;
        Ok(self)
    }

    /// Apply Pauli-Z gate.
    pub fn z(&mut self, wire: WireId) -> IrResult<&mut Self> {
        self.push(Instruction::single(StandardGate::Z, wire))?;
        Ok(self)
    }

    /// Apply phase gate.
    pub fn p(&mut self, theta: f64, wire: WireId) -> IrResult<&mut Self> {
        self.push(Instruction::single(StandardGate::P(theta), wire))?;
        Ok(self)
    }

    /// Apply CNOT gate.
    pub fn cx(&mut self, control: WireId, target: WireId) -> IrResult<&mut Self> {
        self.push(Instruction::controlled(
            StandardGate::X,
            [Control::positive(control)],
            target,
        ))?;
        Ok(self)
    }

    /// Apply Toffoli gate.
    pub fn ccx(&mut self, c1: WireId, c2: WireId, target: WireId) -> IrResult<&mut Self> {
        self.push(Instruction::controlled(
            StandardGate::X,
            [Control::positive(c1), Control::positive(c2)],
            target,
        ))?;
        Ok(self)
    }

    /// Apply controlled-Z gate.
    pub fn cz(&mut self, control: WireId, target: WireId) -> IrResult<&mut Self> {
        self.push(Instruction::controlled(
            StandardGate::Z,
            [Control::positive(control)],
            target,
        ))?;
        Ok(self)
    }

    /// Apply controlled-phase gate.
    pub fn cp(&mut self, theta: f64, control: WireId, target: WireId) -> IrResult<&mut Self> {
        self.push(Instruction::controlled(
            StandardGate::P(theta),
            [Control::positive(control)],
            target,
        ))?;
        Ok(self)
    }

    /// Apply SWAP gate.
    pub fn swap(&mut self, a: WireId, b: WireId) -> IrResult<&mut Self> {
        self.push(Instruction::swap(a, b))?;
        Ok(self)
    }

    /// Measure a wire into a classical bit.
    pub fn measure(&mut self, wire: WireId, clbit: ClbitId) -> IrResult<&mut Self> {
        self.push(Instruction::measure(wire, clbit))?;
        Ok(self)
    }
}

impl fmt::Display for Circuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for inst in &self.instructions {
            let operands: Vec<_> = inst
                .controls
                .iter()
                .map(|c| {
                    let label = self.wire_label(c.wire);
                    if c.fires_on() { label } else { format!("!{label}") }
                })
                .chain(inst.targets.iter().map(|&w| self.wire_label(w)))
                .collect();
            write!(f, "{}", inst.name())?;
            if let Some(theta) = inst.base_gate().and_then(|g| g.angle()) {
                write!(f, "({theta:.6})")?;
            }
            write!(f, " {}", operands.join(", "))?;
            if !inst.clbits.is_empty() {
                let bits: Vec<_> = inst.clbits.iter().map(ToString::to_string).collect();
                write!(f, " -> {}", bits.join(", "))?;
            }
            for cond in &inst.conditions {
                write!(f, " if {cond}")?;
            }
            if let InstructionKind::Unsupported { reason } = &inst.kind {
                write!(f, "// {reason}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registers_and_wires() {
        let mut circuit = Circuit::new("test");
        let q = circuit.add_qreg("q", 3).unwrap();
        assert_eq!(q, vec![WireId(0), WireId(1), WireId(2)]);
        assert_eq!(circuit.register("q").unwrap().len(), 3);
        assert_eq!(circuit.wire_label(WireId(2)), "q[2]");
        assert!(matches!(
            circuit.add_qreg("q", 1),
            Err(IrError::DuplicateRegister(_))
        ));
    }

    #[test]
    fn test_ancilla_wires_are_lazy() {
        let mut circuit = Circuit::new("test");
        circuit.add_qreg("q", 2).unwrap();
        let a1 = circuit.ancilla_wire(1);
        assert_eq!(circuit.num_wires(), 4);
        assert_eq!(circuit.ancilla_wire(0), WireId(2));
        assert_eq!(a1, WireId(3));
        assert!(circuit.is_ancilla(a1));
        assert_eq!(circuit.wire_label(a1), "anc[1]");
    }

    #[test]
    fn test_data_wires_skip_interleaved_ancillas() {
        let mut circuit = Circuit::new("test");
        circuit.add_qreg("a", 1).unwrap();
        let slot = circuit.ancilla_wire(0);
        circuit.add_qreg("b", 2).unwrap();

        assert_eq!(circuit.data_wires(), vec![WireId(0), WireId(2), WireId(3)]);
        assert_eq!(circuit.ancilla_wires(), &[slot]);
    }

    #[test]
    fn test_push_validates_operands() {
        let mut circuit = Circuit::new("test");
        circuit.add_qreg("q", 2).unwrap();
        assert!(matches!(
            circuit.cx(WireId(0), WireId(0)),
            Err(IrError::DuplicateWire { .. })
        ));
        assert!(matches!(
            circuit.h(WireId(7)),
            Err(IrError::WireNotFound { .. })
        ));
        assert!(matches!(
            circuit.push(Instruction::gate(StandardGate::Swap, [WireId(0)])),
            Err(IrError::TargetCountMismatch { .. })
        ));
    }

    #[test]
    fn test_depth_and_counts() {
        let mut circuit = Circuit::new("test");
        let q = circuit.add_qreg("q", 3).unwrap();
        circuit.h(q[0]).unwrap().h(q[1]).unwrap().cx(q[0], q[1]).unwrap();
        circuit.ccx(q[0], q[1], q[2]).unwrap();
        assert_eq!(circuit.depth(), 3);
        let counts = circuit.count_ops();
        assert_eq!(counts["h"], 2);
        assert_eq!(counts["cx"], 1);
        assert_eq!(counts["ccx"], 1);
    }

    #[test]
    fn test_checkpoint_rollback() {
        let mut circuit = Circuit::new("test");
        let q = circuit.add_qreg("q", 1).unwrap();
        circuit.h(q[0]).unwrap();
        let checkpoint = circuit.checkpoint();
        circuit.x(q[0]).unwrap();
        let bits = circuit.add_creg("m", 1).unwrap();
        circuit.measure(q[0], bits[0]).unwrap();
        assert_eq!(circuit.since(checkpoint).len(), 2);

        circuit.rollback(checkpoint);
        assert_eq!(circuit.num_ops(), 1);
        assert_eq!(circuit.num_clbits(), 0);
        assert!(circuit.classical_register("m").is_none());
    }

    #[test]
    fn test_json_roundtrip() {
        let mut circuit = Circuit::new("json");
        let q = circuit.add_qreg("q", 2).unwrap();
        circuit.h(q[0]).unwrap().cp(0.5, q[0], q[1]).unwrap();
        let json = circuit.to_json().unwrap();
        let restored = Circuit::from_json(&json).unwrap();
        assert_eq!(restored, circuit);
    }

    #[test]
    fn test_display() {
        let mut circuit = Circuit::new("show");
        let q = circuit.add_qreg("q", 2).unwrap();
        circuit
            .push(Instruction::controlled(
                StandardGate::X,
                [Control::negative(q[0])],
                q[1],
            ))
            .unwrap();
        assert_eq!(circuit.to_string(), "cx !q[0], q[1]\n");
    }
}
