//! Compiler configuration.

use serde::{Deserialize, Serialize};

use psi_ir::Circuit;

use crate::error::{CompileError, CompileResult};
use crate::property::CouplingMap;

/// Wire connectivity of the target.
///
/// Positions are numbered data wires first, in register declaration order,
/// followed by the ancilla pool slots. Linear and star shapes cover every
/// position; an explicit edge list covers data positions, and each pool slot
/// in use must be attached through `ancilla_edges`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Topology {
    /// Every pair of wires may interact; routing is skipped.
    #[default]
    Full,
    /// Chain over every position, pool slots last.
    Linear,
    /// First data wire connected to every other position.
    Star,
    /// Explicit undirected edges.
    Edges {
        /// Pairs of data positions.
        edges: Vec<(u32, u32)>,
        /// `(slot, data position)` pairs coupling pool slots into the graph.
        #[serde(default)]
        ancilla_edges: Vec<(u32, u32)>,
    },
}

impl Topology {
    /// Explicit data edges with no ancilla placement.
    pub fn edges(edges: impl IntoIterator<Item = (u32, u32)>) -> Self {
        Topology::Edges {
            edges: edges.into_iter().collect(),
            ancilla_edges: vec![],
        }
    }

    /// Attach pool slots to data positions. No effect on other shapes.
    #[must_use]
    pub fn with_ancilla_edges(mut self, pairs: impl IntoIterator<Item = (u32, u32)>) -> Self {
        if let Topology::Edges { ancilla_edges, .. } = &mut self {
            ancilla_edges.extend(pairs);
        }
        self
    }

    /// Coupling map over the wires of `circuit`, or `None` when routing is
    /// not needed.
    ///
    /// The map is indexed by wire id so the trivial layout applies as is.
    /// Explicit edges naming a position or slot the circuit does not have
    /// are dropped. A pool slot the circuit uses that no ancilla edge
    /// reaches is an error.
    pub fn coupling_map(&self, circuit: &Circuit) -> CompileResult<Option<CouplingMap>> {
        let data = circuit.data_wires();
        let slots = circuit.ancilla_wires();
        let positions: Vec<u32> = data.iter().chain(slots).map(|w| w.0).collect();
        let num_wires = u32::try_from(circuit.num_wires()).unwrap_or(u32::MAX);
        let data_at = |i: u32| data.get(i as usize).map(|w| w.0);

        let map = match self {
            Topology::Full => return Ok(None),
            Topology::Linear => {
                CouplingMap::from_edges(num_wires, positions.windows(2).map(|w| (w[0], w[1])))
            }
            Topology::Star => match positions.split_first() {
                Some((&hub, leaves)) => {
                    CouplingMap::from_edges(num_wires, leaves.iter().map(|&leaf| (hub, leaf)))
                }
                None => CouplingMap::new(num_wires),
            },
            Topology::Edges {
                edges,
                ancilla_edges,
            } => {
                let data_edges = edges
                    .iter()
                    .filter_map(|&(a, b)| Some((data_at(a)?, data_at(b)?)));
                let slot_edges: Vec<(u32, u32)> = ancilla_edges
                    .iter()
                    .filter_map(|&(slot, b)| Some((slots.get(slot as usize)?.0, data_at(b)?)))
                    .collect();
                let unplaced: Vec<usize> = (0..slots.len())
                    .filter(|&slot| {
                        !slot_edges
                            .iter()
                            .any(|&(wire, _)| wire == slots[slot].0)
                    })
                    .collect();
                if !unplaced.is_empty() {
                    return Err(CompileError::UnplacedAncillas { slots: unplaced });
                }
                CouplingMap::from_edges(num_wires, data_edges.chain(slot_edges))
            }
        };
        Ok(Some(map))
    }
}

/// What to do when a statement fails to lower.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Return the first error.
    #[default]
    Halt,
    /// Roll the statement back, record the diagnostic and continue.
    ///
    /// Internal errors still halt.
    Collect,
}

/// Settings for one compilation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Target connectivity.
    pub topology: Topology,
    /// Number of ancilla pool slots.
    pub ancilla_capacity: usize,
    /// Emit negative-polarity controls instead of X brackets.
    pub native_negative_controls: bool,
    /// Upper bound on statements produced by loop unrolling.
    pub max_unroll: usize,
    /// Halt or collect on statement errors.
    pub error_policy: ErrorPolicy,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            topology: Topology::Full,
            ancilla_capacity: 8,
            native_negative_controls: false,
            max_unroll: 4096,
            error_policy: ErrorPolicy::Halt,
        }
    }
}

impl CompilerConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the target connectivity.
    #[must_use]
    pub fn with_topology(mut self, topology: Topology) -> Self {
        self.topology = topology;
        self
    }

    /// Set the ancilla pool capacity.
    #[must_use]
    pub fn with_ancilla_capacity(mut self, capacity: usize) -> Self {
        self.ancilla_capacity = capacity;
        self
    }

    /// Use negative-polarity controls for `== 0` literals.
    #[must_use]
    pub fn with_native_negative_controls(mut self, enabled: bool) -> Self {
        self.native_negative_controls = enabled;
        self
    }

    /// Set the unroll budget.
    #[must_use]
    pub fn with_max_unroll(mut self, max_unroll: usize) -> Self {
        self.max_unroll = max_unroll;
        self
    }

    /// Set the error policy.
    #[must_use]
    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }
}
