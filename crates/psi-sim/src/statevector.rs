//! Statevector simulation engine.
//!
//! Wire `i` of a circuit is bit `i` of the basis-state index.

use num_complex::Complex64;
use rand::Rng;

use psi_ir::{Control, Instruction, InstructionKind, StandardGate, WireId};

use crate::error::{SimError, SimResult};

/// A statevector over `num_wires` wires.
#[derive(Debug, Clone, PartialEq)]
pub struct Statevector {
    /// The state amplitudes (2^n complex numbers).
    amplitudes: Vec<Complex64>,
    /// Number of wires.
    num_wires: usize,
}

/// Control wires folded into a mask and the bit pattern that enables a gate.
#[derive(Debug, Clone, Copy, Default)]
struct ControlMask {
    mask: usize,
    value: usize,
}

impl ControlMask {
    fn new(controls: &[Control]) -> Self {
        controls.iter().fold(Self::default(), |acc, c| {
            let bit = 1 << c.wire.index();
            Self {
                mask: acc.mask | bit,
                value: if c.fires_on() { acc.value | bit } else { acc.value },
            }
        })
    }

    #[inline]
    fn fires(self, index: usize) -> bool {
        index & self.mask == self.value
    }
}

impl Statevector {
    /// Create a new statevector initialized to |0...0⟩.
    pub fn new(num_wires: usize) -> Self {
        Self::basis(num_wires, 0)
    }

    /// Create the computational basis state `|index⟩`.
    pub fn basis(num_wires: usize, index: usize) -> Self {
        let size = 1 << num_wires;
        let mut amplitudes = vec![Complex64::new(0.0, 0.0); size];
        amplitudes[index % size] = Complex64::new(1.0, 0.0);
        Self {
            amplitudes,
            num_wires,
        }
    }

    /// Build a state from raw amplitudes, normalizing them.
    ///
    /// Returns `None` unless the length is a power of two and the norm is
    /// non-zero.
    pub fn from_amplitudes(amplitudes: Vec<Complex64>) -> Option<Self> {
        if !amplitudes.len().is_power_of_two() {
            return None;
        }
        let norm = amplitudes.iter().map(Complex64::norm_sqr).sum::<f64>().sqrt();
        if norm == 0.0 {
            return None;
        }
        let num_wires = amplitudes.len().trailing_zeros() as usize;
        Some(Self {
            amplitudes: amplitudes.into_iter().map(|a| a / norm).collect(),
            num_wires,
        })
    }

    /// Number of wires.
    pub fn num_wires(&self) -> usize {
        self.num_wires
    }

    /// All amplitudes, indexed by basis state.
    pub fn amplitudes(&self) -> &[Complex64] {
        &self.amplitudes
    }

    /// Amplitude of basis state `index`.
    pub fn amplitude(&self, index: usize) -> Complex64 {
        self.amplitudes
            .get(index)
            .copied()
            .unwrap_or(Complex64::new(0.0, 0.0))
    }

    /// Probability of basis state `index`.
    pub fn probability(&self, index: usize) -> f64 {
        self.amplitude(index).norm_sqr()
    }

    /// Probability that `wires`, read least significant first, hold `value`.
    ///
    /// Wires not listed are summed over.
    pub fn probability_of(&self, wires: &[WireId], value: u64) -> f64 {
        self.amplitudes
            .iter()
            .enumerate()
            .filter(|&(index, _)| {
                wires.iter().enumerate().all(|(bit, wire)| {
                    let want = (value >> bit) & 1 == 1;
                    (index >> wire.index()) & 1 == usize::from(want)
                })
            })
            .map(|(_, amp)| amp.norm_sqr())
            .sum()
    }

    /// Probability that a single wire reads |1⟩.
    pub fn probability_one(&self, wire: WireId) -> f64 {
        self.probability_of(&[wire], 1)
    }

    /// ⟨self|other⟩.
    pub fn inner(&self, other: &Statevector) -> Complex64 {
        self.amplitudes
            .iter()
            .zip(&other.amplitudes)
            .map(|(a, b)| a.conj() * b)
            .sum()
    }

    /// |⟨self|other⟩|².
    pub fn fidelity(&self, other: &Statevector) -> f64 {
        self.inner(other).norm_sqr()
    }

    /// Amplitude-wise equality within `tolerance`.
    pub fn approx_eq(&self, other: &Statevector, tolerance: f64) -> bool {
        self.num_wires == other.num_wires
            && self
                .amplitudes
                .iter()
                .zip(&other.amplitudes)
                .all(|(a, b)| (a - b).norm() < tolerance)
    }

    /// Equality up to a global phase factor, within `tolerance`.
    pub fn equals_up_to_global_phase(&self, other: &Statevector, tolerance: f64) -> bool {
        self.num_wires == other.num_wires && (1.0 - self.fidelity(other)).abs() < tolerance
    }

    /// Apply a gate instruction, honoring control polarity.
    ///
    /// Classical conditions are not evaluated here; see [`crate::Simulator`].
    pub fn apply(&mut self, instruction: &Instruction) -> SimResult<()> {
        match &instruction.kind {
            InstructionKind::Gate(gate) => {
                self.apply_gate(*gate, &instruction.controls, &instruction.targets)
            }
            InstructionKind::Measure => Err(SimError::NonUnitary),
            InstructionKind::Unsupported { reason } => Err(SimError::Unsupported(reason.clone())),
        }
    }

    /// Apply a (possibly controlled) gate.
    pub fn apply_gate(
        &mut self,
        gate: StandardGate,
        controls: &[Control],
        targets: &[WireId],
    ) -> SimResult<()> {
        for wire in controls.iter().map(|c| c.wire).chain(targets.iter().copied()) {
            self.check_wire(wire)?;
        }
        let ctrl = ControlMask::new(controls);
        match (gate, targets) {
            (StandardGate::H, [t]) => self.apply_h(t.index(), ctrl),
            (StandardGate::X, [t]) => self.apply_x(t.index(), ctrl),
            (StandardGate::Z, [t]) => self.apply_phase(t.index(), std::f64::consts::PI, ctrl),
            (StandardGate::P(theta), [t]) => self.apply_phase(t.index(), theta, ctrl),
            (StandardGate::Swap, [a, b]) => self.apply_swap(a.index(), b.index(), ctrl),
            _ => {}
        }
        Ok(())
    }

    fn check_wire(&self, wire: WireId) -> SimResult<()> {
        if wire.index() < self.num_wires {
            Ok(())
        } else {
            Err(SimError::WireOutOfRange {
                wire,
                num_wires: self.num_wires,
            })
        }
    }

    // =========================================================================
    // Gate implementations
    // =========================================================================

    fn apply_x(&mut self, wire: usize, ctrl: ControlMask) {
        let mask = 1 << wire;
        for i in 0..self.amplitudes.len() {
            if i & mask == 0 && ctrl.fires(i) {
                self.amplitudes.swap(i, i | mask);
            }
        }
    }

    fn apply_h(&mut self, wire: usize, ctrl: ControlMask) {
        let mask = 1 << wire;
        let sqrt2_inv = 1.0 / 2.0_f64.sqrt();
        for i in 0..self.amplitudes.len() {
            if i & mask == 0 && ctrl.fires(i) {
                let j = i | mask;
                let a = self.amplitudes[i];
                let b = self.amplitudes[j];
                self.amplitudes[i] = sqrt2_inv * (a + b);
                self.amplitudes[j] = sqrt2_inv * (a - b);
            }
        }
    }

    fn apply_phase(&mut self, wire: usize, theta: f64, ctrl: ControlMask) {
        let mask = 1 << wire;
        let phase = Complex64::from_polar(1.0, theta);
        for (i, amp) in self.amplitudes.iter_mut().enumerate() {
            if i & mask != 0 && ctrl.fires(i) {
                *amp *= phase;
            }
        }
    }

    fn apply_swap(&mut self, a: usize, b: usize, ctrl: ControlMask) {
        let (a_mask, b_mask) = (1 << a, 1 << b);
        for i in 0..self.amplitudes.len() {
            if i & a_mask != 0 && i & b_mask == 0 && ctrl.fires(i) {
                let j = (i & !a_mask) | b_mask;
                self.amplitudes.swap(i, j);
            }
        }
    }

    /// Measure one wire, collapsing the state.
    pub fn measure(&mut self, wire: WireId, rng: &mut impl Rng) -> SimResult<bool> {
        self.check_wire(wire)?;
        let p_one = self.probability_one(wire);
        let outcome = rng.r#gen::<f64>() < p_one;
        let norm = if outcome { p_one } else { 1.0 - p_one }.sqrt();
        let mask = 1 << wire.index();
        for (i, amp) in self.amplitudes.iter_mut().enumerate() {
            if (i & mask != 0) == outcome {
                *amp /= norm;
            } else {
                *amp = Complex64::new(0.0, 0.0);
            }
        }
        Ok(outcome)
    }

    /// Sample a basis state without collapsing.
    pub fn sample(&self, rng: &mut impl Rng) -> usize {
        let r: f64 = rng.r#gen();
        let mut cumulative = 0.0;
        for (i, amp) in self.amplitudes.iter().enumerate() {
            cumulative += amp.norm_sqr();
            if r < cumulative {
                return i;
            }
        }
        self.amplitudes.len() - 1
    }

    /// Render a basis state as a bitstring, wire 0 first.
    pub fn outcome_to_bitstring(&self, outcome: usize) -> String {
        format!("{:0width$b}", outcome, width = self.num_wires)
            .chars()
            .rev()
            .collect()
    }
}
