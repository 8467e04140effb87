//! Pulse lowering, routing transparency and error policies.

use psi_compile::{CompileError, CompilerConfig, ErrorPolicy, Topology, compile};
use psi_ir::{ClassicalCondition, ClbitId, PulseKind, WireId};
use psi_sim::Simulator;

const HYBRID: &str = r"
let q = Register(2);
Analog(target: q[0]) {
    Rotate(axis: X, angle: PI/2, duration: 10ns, shape: Gaussian(sigma: 2ns));
    Wait(5ns);
    ShiftPhase(angle: PI/4);
    Acquire(duration: 20ns, kernel: boxcar);
}
Align {
    branch q[0] { Play(waveform: Drag(amp: 0.1), channel: d0, duration: 100ns); }
    branch q[1] { Wait(60ns); }
}
let c = Measure(q[1]);
if (c == 1) {
    q.Flip(target: 0);
} else {
    q.Flip(target: 1, when: c);
}
";

#[test]
fn test_hybrid_program() {
    let program = compile(HYBRID, &CompilerConfig::default()).unwrap();
    let schedule = &program.schedule;

    // Analog block: 10 + 5 + 0 + 20 ns on q[0].
    let acquire = &schedule.instructions()[3];
    assert!(matches!(acquire.kind, PulseKind::Acquire { .. }));
    assert_eq!(acquire.start, 15.0);
    assert!((acquire.frame.phase - std::f64::consts::FRAC_PI_4).abs() < 1e-12);

    // Align starts at the latest cursor and pads q[1] up to the Play's end.
    let play = schedule
        .instructions()
        .iter()
        .find(|i| matches!(i.kind, PulseKind::Play { .. }))
        .unwrap();
    assert_eq!(play.start, 35.0);
    assert_eq!(play.duration, 100.0);
    assert!((play.frame.phase - std::f64::consts::FRAC_PI_4).abs() < 1e-12);

    let padding: Vec<_> = schedule
        .instructions()
        .iter()
        .filter(|i| i.kind.is_padding())
        .collect();
    assert!(padding.iter().all(|p| p.wire == WireId(1)));
    assert_eq!(padding.last().map(|p| p.start + p.duration), Some(135.0));
    assert_eq!(schedule.duration(), 135.0);

    // Classical correction.
    let insts = program.circuit.instructions();
    assert_eq!(insts.len(), 3);
    assert!(insts[0].is_measure());
    assert_eq!(insts[1].conditions, vec![ClassicalCondition::bit(ClbitId(0), true)]);
    assert_eq!(
        insts[2].conditions,
        vec![
            ClassicalCondition::bit(ClbitId(0), false),
            ClassicalCondition::bit(ClbitId(0), true),
        ]
    );
}

#[test]
fn test_align_branches_meet() {
    let source = r"
        let q = Register(2);
        Align {
            branch q[0] { Wait(100ns); }
            branch q[1] { Wait(60ns); }
        }
        Rotate(axis: Y, angle: PI, duration: 8ns, target: q[1]);
    ";
    let program = compile(source, &CompilerConfig::default()).unwrap();
    let rotate = program.schedule.instructions().last().unwrap();
    assert_eq!(rotate.start, 100.0);

    let padded: Vec<_> = program
        .schedule
        .instructions()
        .iter()
        .filter(|i| i.kind.is_padding())
        .collect();
    assert_eq!(padded.len(), 1);
    assert_eq!((padded[0].start, padded[0].duration), (60.0, 40.0));
}

#[test]
fn test_guarded_flip_inside_branch_conflicts() {
    let source = r"
        let q = Register(2);
        Align {
            branch q[0] { q.Flip(target: 1, where: q[0]); }
        }
    ";
    let err = compile(source, &CompilerConfig::default()).unwrap_err();
    assert!(matches!(err, CompileError::ScopeConflict { ref wire, .. } if wire == "q[0]"));

    // The same call is fine once the branch has closed.
    let after = r"
        let q = Register(2);
        Align { branch q[0] { Wait(10ns); } }
        q.Flip(target: 1, where: q[0]);
    ";
    assert!(compile(after, &CompilerConfig::default()).is_ok());
}

#[test]
fn test_negative_duration_is_rejected() {
    let err = compile(
        "let q = Register(1); Wait(-5ns, target: q[0]);",
        &CompilerConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, CompileError::Pulse(_)));
    assert!(err.span().is_some());
}

#[test]
fn test_routing_is_transparent() {
    let source = r"
        let q = Register(4);
        q.Superpose(targets: ALL);
        q.Phase(angle: PI/3, where: q[0] && q[3]);
        q.Flip(target: 3, where: q[1] == 0);
        q.Phase(angle: PI/5, where: q[3] == 0 && q[0] == 1);
    ";
    let full = compile(source, &CompilerConfig::default()).unwrap();
    assert!(full.routing.is_none());

    for topology in [Topology::Linear, Topology::Star] {
        let routed = compile(source, &CompilerConfig::new().with_topology(topology.clone())).unwrap();
        let report = routed.routing.as_ref().unwrap();
        assert!(report.routed_gates > 0, "{topology:?}");
        assert_eq!(report.inserted_swaps % 2, 0);

        let a = Simulator::with_seed(0).statevector(&full.circuit).unwrap();
        let b = Simulator::with_seed(0).statevector(&routed.circuit).unwrap();
        assert!(a.approx_eq(&b, 1e-9), "{topology:?}");
    }
}

#[test]
fn test_unreachable_pair() {
    let source = "let q = Register(3); q.Phase(angle: PI, where: q[0] && q[2]); q.Superpose(targets: ALL);";
    let edges = Topology::edges([(0, 1)]);

    let err = compile(source, &CompilerConfig::new().with_topology(edges.clone())).unwrap_err();
    let CompileError::Topology { wires, span } = err else {
        panic!("expected topology error");
    };
    assert_eq!(wires, ("q[0]".to_string(), "q[2]".to_string()));
    assert_eq!(span.map(|s| s.line), Some(1));

    let config = CompilerConfig::new()
        .with_topology(edges)
        .with_error_policy(ErrorPolicy::Collect);
    let program = compile(source, &config).unwrap();
    assert_eq!(program.routing.as_ref().map(|r| r.unroutable), Some(1));
    assert!(program.circuit.instructions()[0].is_unsupported());
    assert_eq!(program.circuit.count_ops().get("h"), Some(&3));
}

#[test]
fn test_collect_rolls_back_partial_statements() {
    let source = r"
        let q = Register(3);
        for i in 0..2 {
            q.Flip(target: i + 1, where: q[i]);
        }
        q.Flip(target: 0, where: q[1] && q[2] && q[7]);
        Analog(target: q[2]) {
            Wait(10ns);
            Teleport();
            Wait(5ns);
        }
        let c = Measure(q[0]);
        if (c || c) { q.Flip(target: 0); }
    ";
    let config = CompilerConfig::new().with_error_policy(ErrorPolicy::Collect);
    let program = compile(source, &config).unwrap();

    assert_eq!(program.diagnostics.len(), 3);
    assert!(matches!(program.diagnostics[0], CompileError::IndexOutOfBounds { index: 7, .. }));
    assert!(matches!(program.diagnostics[1], CompileError::UnknownOperation { .. }));
    assert!(matches!(program.diagnostics[2], CompileError::UnsupportedGuard { .. }));

    // Two loop flips and the measurement survive; nothing of the failed flip does.
    assert_eq!(program.circuit.num_ops(), 3);
    assert!(program.circuit.ancillas().is_empty());
    // The Analog body kept its good statements.
    assert_eq!(program.schedule.len(), 2);
    assert_eq!(program.schedule.duration(), 15.0);
}

#[test]
fn test_ancilla_exhaustion() {
    let source = "let q = Register(4); q.Flip(target: 3, where: q[0] && q[1] && q[2]);";
    let err = compile(source, &CompilerConfig::new().with_ancilla_capacity(0)).unwrap_err();
    assert!(matches!(
        err,
        CompileError::AncillaExhausted {
            requested: 1,
            available: 0,
            capacity: 0,
            ..
        }
    ));
}

#[test]
fn test_parse_errors_surface() {
    let err = compile("let q = Register(2) q.Flip(target: 0);", &CompilerConfig::default()).unwrap_err();
    assert!(matches!(err, CompileError::Parse(_)));
}
