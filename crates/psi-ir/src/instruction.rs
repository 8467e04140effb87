//! Circuit instructions combining gates with operands.

use serde::{Deserialize, Serialize};

use crate::gate::{ClassicalCondition, Control, Polarity, StandardGate};
use crate::span::Span;
use crate::wire::{ClbitId, WireId};

/// The kind of instruction in a circuit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InstructionKind {
    /// A (possibly controlled) gate.
    Gate(StandardGate),
    /// Measurement of each target into the matching classical bit.
    Measure,
    /// Marker left in place of a statement that could not be lowered.
    Unsupported {
        /// Why the statement was rejected.
        reason: String,
    },
}

/// A complete instruction with operands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    /// The kind of instruction.
    pub kind: InstructionKind,
    /// Control wires with polarity, outermost first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub controls: Vec<Control>,
    /// Target wires.
    pub targets: Vec<WireId>,
    /// Classical bits written by a measurement.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clbits: Vec<ClbitId>,
    /// Classical guards; all must hold for the instruction to act.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<ClassicalCondition>,
    /// Source statement this instruction was lowered from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<Span>,
}

impl Instruction {
    /// Create an uncontrolled gate instruction.
    pub fn gate(gate: StandardGate, targets: impl IntoIterator<Item = WireId>) -> Self {
        Self {
            kind: InstructionKind::Gate(gate),
            controls: vec![],
            targets: targets.into_iter().collect(),
            clbits: vec![],
            conditions: vec![],
            origin: None,
        }
    }

    /// Create a single-wire gate instruction.
    pub fn single(gate: StandardGate, wire: WireId) -> Self {
        Self::gate(gate, [wire])
    }

    /// Create a controlled gate instruction.
    pub fn controlled(
        gate: StandardGate,
        controls: impl IntoIterator<Item = Control>,
        target: WireId,
    ) -> Self {
        Self {
            controls: controls.into_iter().collect(),
            ..Self::single(gate, target)
        }
    }

    /// Create a SWAP instruction.
    pub fn swap(a: WireId, b: WireId) -> Self {
        Self::gate(StandardGate::Swap, [a, b])
    }

    /// Create a measurement instruction.
    pub fn measure(wire: WireId, clbit: ClbitId) -> Self {
        Self {
            kind: InstructionKind::Measure,
            controls: vec![],
            targets: vec![wire],
            clbits: vec![clbit],
            conditions: vec![],
            origin: None,
        }
    }

    /// Create an unsupported-statement marker.
    pub fn unsupported(reason: impl Into<String>, origin: Span) -> Self {
        Self {
            kind: InstructionKind::Unsupported {
                reason: reason.into(),
            },
            controls: vec![],
            targets: vec![],
            clbits: vec![],
            conditions: vec![],
            origin: Some(origin),
        }
    }

    /// Attach the originating source span.
    #[must_use]
    pub fn with_origin(mut self, origin: Span) -> Self {
        self.origin = Some(origin);
        self
    }

    /// Attach classical guards.
    #[must_use]
    pub fn with_conditions(mut self, conditions: impl IntoIterator<Item = ClassicalCondition>) -> Self {
        self.conditions.extend(conditions);
        self
    }

    /// The base gate, for gate instructions.
    pub fn base_gate(&self) -> Option<StandardGate> {
        match self.kind {
            InstructionKind::Gate(gate) => Some(gate),
            _ => None,
        }
    }

    /// Name including the control prefix (`cx`, `ccx`, `mcx`, `cp`, ...).
    pub fn name(&self) -> String {
        match &self.kind {
            InstructionKind::Gate(gate) => match self.controls.len() {
                0 => gate.name().to_string(),
                1 => format!("c{}", gate.name()),
                2 => format!("cc{}", gate.name()),
                _ => format!("mc{}", gate.name()),
            },
            InstructionKind::Measure => "measure".to_string(),
            InstructionKind::Unsupported { .. } => "unsupported".to_string(),
        }
    }

    /// All wires this instruction touches, controls first.
    pub fn wires(&self) -> impl Iterator<Item = WireId> + '_ {
        self.controls
            .iter()
            .map(|c| c.wire)
            .chain(self.targets.iter().copied())
    }

    /// Number of wires this instruction touches.
    pub fn num_wires(&self) -> usize {
        self.controls.len() + self.targets.len()
    }

    /// Whether any control has negative polarity.
    pub fn has_negative_controls(&self) -> bool {
        self.controls
            .iter()
            .any(|c| c.polarity == Polarity::Negative)
    }

    /// The inverse instruction. Measurements and markers have none.
    pub fn inverse(&self) -> Option<Instruction> {
        let gate = self.base_gate()?;
        Some(Instruction {
            kind: InstructionKind::Gate(gate.inverse()),
            ..self.clone()
        })
    }

    /// Rewrite every wire operand through `map`.
    pub fn map_wires(&mut self, mut map: impl FnMut(WireId) -> WireId) {
        for control in &mut self.controls {
            control.wire = map(control.wire);
        }
        for target in &mut self.targets {
            *target = map(*target);
        }
    }

    /// Check if this is a gate instruction.
    pub fn is_gate(&self) -> bool {
        matches!(self.kind, InstructionKind::Gate(_))
    }

    /// Check if this is a measurement.
    pub fn is_measure(&self) -> bool {
        matches!(self.kind, InstructionKind::Measure)
    }

    /// Check if this is an unsupported-statement marker.
    pub fn is_unsupported(&self) -> bool {
        matches!(self.kind, InstructionKind::Unsupported { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_controlled_names() {
        let w = |i| WireId(i);
        assert_eq!(Instruction::single(StandardGate::H, w(0)).name(), "h");
        assert_eq!(
            Instruction::controlled(StandardGate::X, [Control::positive(w(0))], w(1)).name(),
            "cx"
        );
        assert_eq!(
            Instruction::controlled(
                StandardGate::X,
                [Control::positive(w(0)), Control::negative(w(1))],
                w(2)
            )
            .name(),
            "ccx"
        );
        assert_eq!(
            Instruction::controlled(
                StandardGate::P(1.0),
                [0, 1, 2].map(|i| Control::positive(w(i))),
                w(3)
            )
            .name(),
            "mcp"
        );
    }

    #[test]
    fn test_inverse_of_phase() {
        let inst = Instruction::controlled(StandardGate::P(0.25), [Control::positive(WireId(0))], WireId(1));
        let inv = inst.inverse().unwrap();
        assert_eq!(inv.base_gate(), Some(StandardGate::P(-0.25)));
        assert_eq!(inv.controls, inst.controls);
        assert!(Instruction::measure(WireId(0), ClbitId(0)).inverse().is_none());
    }

    #[test]
    fn test_wires_and_mapping() {
        let mut inst = Instruction::controlled(StandardGate::X, [Control::negative(WireId(2))], WireId(5));
        assert!(inst.has_negative_controls());
        assert_eq!(inst.wires().collect::<Vec<_>>(), vec![WireId(2), WireId(5)]);

        inst.map_wires(|w| WireId(w.0 + 1));
        assert_eq!(inst.wires().collect::<Vec<_>>(), vec![WireId(3), WireId(6)]);
    }
}
