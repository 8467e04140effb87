//! Circuit execution on top of the statevector engine.

use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::BTreeMap;
use tracing::{debug, instrument, warn};

use psi_ir::{Circuit, InstructionKind};

use crate::error::{SimError, SimResult};
use crate::statevector::Statevector;

/// Default wire limit; 2^24 amplitudes is 256 MiB.
pub const DEFAULT_MAX_WIRES: usize = 24;

/// Measurement counts keyed by bitstring.
pub type Counts = BTreeMap<String, usize>;

/// Final state and classical bits of one run.
#[derive(Debug, Clone)]
pub struct Execution {
    /// State after the last instruction.
    pub state: Statevector,
    /// Classical bits, indexed by `ClbitId`.
    pub clbits: Vec<bool>,
    /// Instructions skipped because a classical condition did not hold.
    pub skipped: usize,
}

/// Runs circuits against a [`Statevector`].
#[derive(Debug)]
pub struct Simulator {
    rng: StdRng,
    max_wires: usize,
}

impl Simulator {
    /// Create a simulator seeded from system entropy.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            max_wires: DEFAULT_MAX_WIRES,
        }
    }

    /// Create a simulator with a fixed seed, for reproducible runs.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            max_wires: DEFAULT_MAX_WIRES,
        }
    }

    /// Set the maximum number of wires.
    #[must_use]
    pub fn with_max_wires(mut self, max_wires: usize) -> Self {
        self.max_wires = max_wires;
        self
    }

    fn check_width(&self, circuit: &Circuit) -> SimResult<()> {
        let required = circuit.num_wires();
        if required > self.max_wires {
            return Err(SimError::TooManyWires {
                required,
                max: self.max_wires,
            });
        }
        Ok(())
    }

    /// Apply a measurement-free circuit to `initial`.
    ///
    /// Instructions carrying classical conditions are rejected with
    /// [`SimError::NonUnitary`] since no bits exist to evaluate them.
    pub fn evolve(&self, circuit: &Circuit, initial: Statevector) -> SimResult<Statevector> {
        self.check_width(circuit)?;
        let mut state = initial;
        for inst in circuit.instructions() {
            if !inst.conditions.is_empty() {
                return Err(SimError::NonUnitary);
            }
            state.apply(inst)?;
        }
        Ok(state)
    }

    /// Apply a measurement-free circuit to |0...0⟩.
    pub fn statevector(&self, circuit: &Circuit) -> SimResult<Statevector> {
        self.evolve(circuit, Statevector::new(circuit.num_wires()))
    }

    /// Run a circuit once, collapsing on measurement and honoring
    /// classical conditions.
    #[instrument(skip(self, circuit), fields(circuit = circuit.name()))]
    pub fn run(&mut self, circuit: &Circuit) -> SimResult<Execution> {
        self.check_width(circuit)?;
        let mut state = Statevector::new(circuit.num_wires());
        let mut clbits = vec![false; circuit.num_clbits()];
        let mut skipped = 0;

        for inst in circuit.instructions() {
            if !inst.conditions.iter().all(|c| c.holds(&clbits)) {
                skipped += 1;
                continue;
            }
            match &inst.kind {
                InstructionKind::Gate(_) => state.apply(inst)?,
                InstructionKind::Measure => {
                    for (&wire, &clbit) in inst.targets.iter().zip(&inst.clbits) {
                        let outcome = state.measure(wire, &mut self.rng)?;
                        if let Some(slot) = clbits.get_mut(clbit.index()) {
                            *slot = outcome;
                        }
                    }
                }
                InstructionKind::Unsupported { reason } => {
                    warn!("skipping unsupported statement: {}", reason);
                }
            }
        }

        debug!("run finished, {} conditional instructions skipped", skipped);
        Ok(Execution {
            state,
            clbits,
            skipped,
        })
    }

    /// Run `shots` times and count outcomes.
    ///
    /// Circuits with classical bits are keyed by their bits (bit 0 first);
    /// circuits without are keyed by a sample of the final state.
    pub fn counts(&mut self, circuit: &Circuit, shots: u32) -> SimResult<Counts> {
        let mut counts = Counts::new();
        for _ in 0..shots {
            let execution = self.run(circuit)?;
            let key = if execution.clbits.is_empty() {
                let outcome = execution.state.sample(&mut self.rng);
                execution.state.outcome_to_bitstring(outcome)
            } else {
                execution
                    .clbits
                    .iter()
                    .map(|&b| if b { '1' } else { '0' })
                    .collect()
            };
            *counts.entry(key).or_insert(0) += 1;
        }
        Ok(counts)
    }
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use psi_ir::{ClassicalCondition, Instruction, StandardGate};

    #[test]
    fn test_statevector_of_bell() {
        let mut circuit = Circuit::new("bell");
        let q = circuit.add_qreg("q", 2).unwrap();
        circuit.h(q[0]).unwrap().cx(q[0], q[1]).unwrap();

        let state = Simulator::with_seed(0).statevector(&circuit).unwrap();
        assert!((state.probability(0b00) - 0.5).abs() < 1e-10);
        assert!((state.probability(0b11) - 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_unitary_run_rejects_measurement() {
        let mut circuit = Circuit::new("m");
        let q = circuit.add_qreg("q", 1).unwrap();
        let c = circuit.add_clbit();
        circuit.measure(q[0], c).unwrap();
        assert!(matches!(
            Simulator::with_seed(0).statevector(&circuit),
            Err(SimError::NonUnitary)
        ));
    }

    #[test]
    fn test_classical_feedback() {
        // X, measure, then flip back only if the bit reads 1.
        let mut circuit = Circuit::new("feedback");
        let q = circuit.add_qreg("q", 1).unwrap();
        let c = circuit.add_clbit();
        circuit.x(q[0]).unwrap().measure(q[0], c).unwrap();
        circuit
            .push(
                Instruction::single(StandardGate::X, q[0])
                    .with_conditions([ClassicalCondition::bit(c, true)]),
            )
            .unwrap();

        let execution = Simulator::with_seed(3).run(&circuit).unwrap();
        assert_eq!(execution.clbits, vec![true]);
        assert_eq!(execution.skipped, 0);
        assert!((execution.state.probability(0) - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_counts_without_clbits() {
        let mut circuit = Circuit::new("x");
        let q = circuit.add_qreg("q", 2).unwrap();
        circuit.x(q[1]).unwrap();
        let counts = Simulator::with_seed(5).counts(&circuit, 20).unwrap();
        assert_eq!(counts.get("01"), Some(&20));
    }

    #[test]
    fn test_width_limit() {
        let mut circuit = Circuit::new("wide");
        circuit.add_qreg("q", 5).unwrap();
        let sim = Simulator::with_seed(0).with_max_wires(4);
        assert!(matches!(
            sim.statevector(&circuit),
            Err(SimError::TooManyWires { required: 5, max: 4 })
        ));
    }
}
