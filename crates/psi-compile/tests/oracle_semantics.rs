//! Basis-state semantics of compiled Phase and Flip statements.

use num_complex::Complex64;
use proptest::prelude::*;
use psi_compile::{CompiledProgram, CompilerConfig, compile};
use psi_sim::{Simulator, Statevector};

/// Render `q[i] == v` literals joined by `&&`.
fn predicate(literals: &[Option<bool>]) -> Option<String> {
    let parts: Vec<String> = literals
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|v| format!("q[{i}] == {}", u8::from(v))))
        .collect();
    (!parts.is_empty()).then(|| parts.join(" && "))
}

fn satisfies(literals: &[Option<bool>], basis: usize) -> bool {
    literals
        .iter()
        .enumerate()
        .all(|(i, v)| v.is_none_or(|v| ((basis >> i) & 1 == 1) == v))
}

fn evolve(program: &CompiledProgram, basis: usize) -> Statevector {
    let initial = Statevector::basis(program.circuit.num_wires(), basis);
    Simulator::with_seed(0)
        .evolve(&program.circuit, initial)
        .unwrap()
}

fn config(native: bool) -> CompilerConfig {
    CompilerConfig::new().with_native_negative_controls(native)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn phase_tags_exactly_the_satisfying_states(
        literals in prop::collection::vec(prop::option::of(any::<bool>()), 4),
        theta in -3.0f64..3.0,
        native in any::<bool>(),
    ) {
        let angle = format!("{theta:.6}");
        let theta: f64 = angle.parse().unwrap();
        let source = match predicate(&literals) {
            Some(p) => format!("let q = Register(4); q.Phase(angle: {angle}, where: {p});"),
            None => format!("let q = Register(4); q.Phase(angle: {angle});"),
        };
        let program = compile(&source, &config(native)).unwrap();
        // A result ancilla plus k - 2 ladder scratch wires.
        let k = literals.iter().flatten().count();
        prop_assert_eq!(program.peak_ancillas, if k >= 3 { k - 1 } else { 0 });

        for basis in 0..16 {
            let state = evolve(&program, basis);
            let expected = if satisfies(&literals, basis) {
                Complex64::from_polar(1.0, theta)
            } else {
                Complex64::new(1.0, 0.0)
            };
            prop_assert!(
                (state.amplitude(basis) - expected).norm() < 1e-9,
                "basis {:04b}: got {}, expected {}", basis, state.amplitude(basis), expected
            );
        }
    }

    #[test]
    fn flip_toggles_exactly_the_satisfying_states(
        literals in prop::collection::vec(prop::option::of(any::<bool>()), 4),
        native in any::<bool>(),
    ) {
        let source = match predicate(&literals) {
            Some(p) => format!("let q = Register(5); q.Flip(target: 4, where: {p});"),
            None => "let q = Register(5); q.Flip(target: 4);".to_string(),
        };
        let program = compile(&source, &config(native)).unwrap();

        for basis in 0..32 {
            let state = evolve(&program, basis);
            let expected = if satisfies(&literals, basis) { basis ^ 0b10000 } else { basis };
            prop_assert!((state.probability(expected) - 1.0).abs() < 1e-9);
            prop_assert!((state.amplitude(expected) - Complex64::new(1.0, 0.0)).norm() < 1e-9);
        }
    }
}

#[test]
fn test_phase_pi_twice_is_identity() {
    for p in ["q[0] == 1", "q[0] == 0 && q[2] == 1", "q[0] && !q[1] && q[2]"] {
        let source = format!(
            "let q = Register(3); q.Phase(angle: PI, where: {p}); q.Phase(angle: PI, where: {p});"
        );
        let program = compile(&source, &CompilerConfig::default()).unwrap();
        for basis in 0..8 {
            let state = evolve(&program, basis);
            assert!(
                state.approx_eq(&Statevector::basis(program.circuit.num_wires(), basis), 1e-9),
                "{p} on {basis:03b}"
            );
        }
    }
}

#[test]
fn test_phase_with_no_literals_is_global() {
    let program = compile(
        "let q = Register(2); q.Superpose(targets: ALL); q.Phase(angle: PI/2);",
        &CompilerConfig::default(),
    )
    .unwrap();
    let state = Simulator::with_seed(0).statevector(&program.circuit).unwrap();
    for basis in 0..4 {
        let expected = Complex64::new(0.0, 0.5);
        assert!((state.amplitude(basis) - expected).norm() < 1e-9);
    }
}

#[test]
fn test_reflect_leaves_uniform_state_alone() {
    for n in 1..=4usize {
        let source = format!("let q = Register({n}); q.Superpose(targets: ALL); q.Reflect(axis: MEAN);");
        let program = compile(&source, &CompilerConfig::default()).unwrap();
        let state = Simulator::with_seed(0).statevector(&program.circuit).unwrap();

        // Ancilla bits, if any, stay 0.
        let width = program.circuit.num_wires();
        let amplitude = 1.0 / ((1usize << n) as f64).sqrt();
        let uniform: Vec<Complex64> = (0..1usize << width)
            .map(|i| if i < 1 << n { Complex64::new(amplitude, 0.0) } else { Complex64::new(0.0, 0.0) })
            .collect();
        let expected = Statevector::from_amplitudes(uniform).unwrap();
        assert!(state.equals_up_to_global_phase(&expected, 1e-9), "n = {n}");
    }
}

#[test]
fn test_reflect_inverts_about_mean() {
    // Mark |11⟩ then reflect: two qubits reach the marked state with certainty.
    let program = compile(
        "let q = Register(2); q.Superpose(targets: ALL); q.Phase(angle: PI, where: q[0] && q[1]); q.Reflect(axis: MEAN);",
        &CompilerConfig::default(),
    )
    .unwrap();
    let state = Simulator::with_seed(0).statevector(&program.circuit).unwrap();
    assert!((state.probability(0b11) - 1.0).abs() < 1e-9);
}
