//! Gate kinds, control polarity and classical conditions.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::wire::{ClbitId, WireId};

/// Base gates. Controlled forms (CX, CCX, CP, CZ, MCX) are a base gate
/// plus a control list on the [`Instruction`](crate::Instruction).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StandardGate {
    /// Hadamard gate.
    H,
    /// Pauli-X gate.
    X,
    /// Pauli-Z gate.
    Z,
    /// Phase gate `diag(1, e^{iθ})`.
    P(f64),
    /// SWAP gate (two targets).
    Swap,
}

impl StandardGate {
    /// Base name of the gate without control prefix.
    pub fn name(&self) -> &'static str {
        match self {
            StandardGate::H => "h",
            StandardGate::X => "x",
            StandardGate::Z => "z",
            StandardGate::P(_) => "p",
            StandardGate::Swap => "swap",
        }
    }

    /// Number of target wires.
    pub fn num_targets(&self) -> u32 {
        match self {
            StandardGate::Swap => 2,
            _ => 1,
        }
    }

    /// Rotation angle, for parameterized gates.
    pub fn angle(&self) -> Option<f64> {
        match self {
            StandardGate::P(theta) => Some(*theta),
            _ => None,
        }
    }

    /// Whether the gate is diagonal in the computational basis.
    pub fn is_diagonal(&self) -> bool {
        matches!(self, StandardGate::Z | StandardGate::P(_))
    }

    /// Whether the gate maps basis states to basis states.
    pub fn is_classical(&self) -> bool {
        matches!(self, StandardGate::X | StandardGate::Swap) || self.is_diagonal()
    }

    /// The inverse gate.
    #[must_use]
    pub fn inverse(&self) -> StandardGate {
        match self {
            StandardGate::P(theta) => StandardGate::P(-theta),
            other => *other,
        }
    }
}

/// Which basis value of a control wire enables the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    /// Fires when the control is |1⟩.
    Positive,
    /// Fires when the control is |0⟩.
    Negative,
}

/// A control wire with its polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Control {
    /// The control wire.
    pub wire: WireId,
    /// Required basis value.
    pub polarity: Polarity,
}

impl Control {
    /// A control that fires on |1⟩.
    pub fn positive(wire: WireId) -> Self {
        Self {
            wire,
            polarity: Polarity::Positive,
        }
    }

    /// A control that fires on |0⟩.
    pub fn negative(wire: WireId) -> Self {
        Self {
            wire,
            polarity: Polarity::Negative,
        }
    }

    /// The basis value that enables the gate.
    pub fn fires_on(&self) -> bool {
        self.polarity == Polarity::Positive
    }
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.polarity {
            Polarity::Positive => write!(f, "{}", self.wire),
            Polarity::Negative => write!(f, "!{}", self.wire),
        }
    }
}

/// Classical guard: the bits, read as an unsigned integer with the first
/// bit least significant, must equal `value`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassicalCondition {
    /// Bits compared, least significant first.
    pub bits: Vec<ClbitId>,
    /// The value to compare against.
    pub value: u64,
}

impl ClassicalCondition {
    /// Compare a whole group of bits against a value.
    pub fn new(bits: impl IntoIterator<Item = ClbitId>, value: u64) -> Self {
        Self {
            bits: bits.into_iter().collect(),
            value,
        }
    }

    /// Single-bit condition `bit == value`.
    pub fn bit(bit: ClbitId, value: bool) -> Self {
        Self {
            bits: vec![bit],
            value: u64::from(value),
        }
    }

    /// Negation, available for single-bit conditions only.
    pub fn negated(&self) -> Option<Self> {
        match self.bits.as_slice() {
            [bit] => Some(Self::bit(*bit, self.value == 0)),
            _ => None,
        }
    }

    /// Evaluate the condition against a classical bit store.
    pub fn holds(&self, bits: &[bool]) -> bool {
        let observed = self
            .bits
            .iter()
            .enumerate()
            .filter(|&(_, bit)| bits.get(bit.index()).copied().unwrap_or(false))
            .fold(0u64, |acc, (i, _)| acc | (1 << i));
        observed == self.value
    }
}

impl fmt::Display for ClassicalCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.bits.iter().map(ToString::to_string).collect();
        if names.len() == 1 {
            write!(f, "{}=={}", names[0], self.value)
        } else {
            write!(f, "{{{}}}=={}", names.join(","), self.value)
        }
    }
}
