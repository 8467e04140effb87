//! Quantum wires, classical bits and the registers that group them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a quantum wire within a circuit.
///
/// Wire ids are dense and double as physical indices under the trivial
/// layout used by routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WireId(pub u32);

impl WireId {
    /// The id as a vector index.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for WireId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "w{}", self.0)
    }
}

impl From<u32> for WireId {
    fn from(id: u32) -> Self {
        WireId(id)
    }
}

/// Unique identifier for a classical bit within a circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClbitId(pub u32);

impl ClbitId {
    /// The id as a vector index.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ClbitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

impl From<u32> for ClbitId {
    fn from(id: u32) -> Self {
        ClbitId(id)
    }
}

/// What a wire is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireRole {
    /// Declared by the program through `Register(n)`.
    Data,
    /// Backing slot of the ancilla pool.
    Ancilla,
}

/// A quantum wire with its register membership.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Wire {
    /// The unique identifier.
    pub id: WireId,
    /// Register this wire belongs to.
    pub register: String,
    /// Index within the register.
    pub index: u32,
    /// Data or ancilla.
    pub role: WireRole,
}

impl fmt::Display for Wire {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.register, self.index)
    }
}

/// A classical bit with its register membership.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Clbit {
    /// The unique identifier.
    pub id: ClbitId,
    /// Classical register this bit belongs to, if any.
    pub register: Option<String>,
    /// Index within the register, if any.
    pub index: Option<u32>,
}

impl fmt::Display for Clbit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.register, self.index) {
            (Some(reg), Some(idx)) => write!(f, "{reg}[{idx}]"),
            _ => write!(f, "{}", self.id),
        }
    }
}

/// A named, ordered group of quantum wires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Register {
    /// Register name as declared in the source.
    pub name: String,
    /// Wires in index order.
    pub wires: Vec<WireId>,
}

impl Register {
    /// Number of wires.
    pub fn len(&self) -> usize {
        self.wires.len()
    }

    /// Check if the register has no wires.
    pub fn is_empty(&self) -> bool {
        self.wires.is_empty()
    }

    /// Wire at `index`, if in bounds.
    pub fn get(&self, index: usize) -> Option<WireId> {
        self.wires.get(index).copied()
    }
}

/// A named, ordered group of classical bits produced by measurement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassicalRegister {
    /// Register name.
    pub name: String,
    /// Bits in index order, least significant first.
    pub bits: Vec<ClbitId>,
}
