//! End-to-end Grover search checked against the reference simulator.

use psi_compile::{CompilerConfig, Topology, compile};
use psi_sim::Simulator;

const SEARCH: &str = r"
let q = Register(3);
q.Superpose(targets: ALL);
repeat(1) {
    q.Phase(angle: PI, where: q[0] == 0 && q[1] == 1 && q[2] == 1);
    q.Reflect(axis: MEAN);
}
";

/// Index of |q0=0, q1=1, q2=1⟩ with wire `i` at bit `i`.
const MARKED: usize = 0b110;

fn success_probability(config: &CompilerConfig) -> f64 {
    let program = compile(SEARCH, config).unwrap();
    assert!(program.is_clean());
    let state = Simulator::with_seed(0).statevector(&program.circuit).unwrap();
    state.probability(MARKED)
}

#[test]
fn test_one_iteration_reaches_closed_form() {
    let p = success_probability(&CompilerConfig::default());
    assert!((p - 0.78125).abs() < 1e-9, "got {p}");
}

#[test]
fn test_native_negative_controls_agree() {
    let config = CompilerConfig::new().with_native_negative_controls(true);
    let p = success_probability(&config);
    assert!((p - 0.78125).abs() < 1e-9, "got {p}");
}

#[test]
fn test_linear_topology_agrees() {
    let config = CompilerConfig::new().with_topology(Topology::Linear);
    let program = compile(SEARCH, &config).unwrap();
    let routing = program.routing.as_ref().unwrap();
    assert_eq!(routing.inserted_swaps % 2, 0);

    let state = Simulator::with_seed(0).statevector(&program.circuit).unwrap();
    assert!((state.probability(MARKED) - 0.78125).abs() < 1e-9);
}

#[test]
fn test_ancillas_are_returned_clean() {
    let program = compile(SEARCH, &CompilerConfig::default()).unwrap();
    // Oracle and diffusion each hold a result ancilla and borrow one ladder
    // scratch wire per ladder; the two statements never overlap.
    assert_eq!(program.circuit.ancillas().len(), 6);
    assert_eq!(program.peak_ancillas, 2);
    assert!(program.circuit.instructions().iter().all(|i| i.controls.len() <= 2));

    let audit = program.audit.as_ref().unwrap();
    assert_eq!(audit.segments, 2);
    assert_eq!(audit.exhaustive, 2);

    let state = Simulator::with_seed(0).statevector(&program.circuit).unwrap();
    let ancilla = program.circuit.ancillas()[0].wire;
    assert!(state.probability_one(ancilla) < 1e-12);
}

#[test]
fn test_sampled_counts_favour_marked_state() {
    let source = format!("{SEARCH}\nlet result = q.Measure();");
    let program = compile(&source, &CompilerConfig::default()).unwrap();
    assert!(program.circuit.classical_register("result").is_some());

    let counts = Simulator::with_seed(42).counts(&program.circuit, 2000).unwrap();
    // Keys list bit 0 first: q0=0, q1=1, q2=1.
    let hits = counts.get("011").copied().unwrap_or(0);
    assert!(hits > 1400, "marked state seen {hits} times: {counts:?}");
}

#[test]
fn test_two_iterations_overshoot() {
    let source = SEARCH.replace("repeat(1)", "repeat(2)");
    let program = compile(&source, &CompilerConfig::default()).unwrap();
    let state = Simulator::with_seed(0).statevector(&program.circuit).unwrap();
    let theta = (1.0 / 8.0_f64.sqrt()).asin();
    let expected = (5.0 * theta).sin().powi(2);
    assert!((state.probability(MARKED) - expected).abs() < 1e-9);
}
