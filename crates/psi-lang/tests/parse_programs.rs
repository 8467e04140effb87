//! Parser integration tests over complete PsiScript programs.

use proptest::prelude::*;
use psi_lang::ast::{ArgValue, Expression, Predicate, StatementKind, WireRef};
use psi_lang::{ParseError, parse};

const GROVER: &str = r"
// Three-wire search for |110>
let q = Register(3);
q.Superpose(targets: ALL);
repeat(1) {
    q.Phase(angle: PI, where: q[0] == 0 && q[1] == 1 && q[2] == 1);
    q.Reflect(axis: MEAN);
}
let result = q.Measure();
";

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
/* classical correction */
let c = Measure(q[1]);
if (c == 1) {
    q.Flip(target: 0);
} else {
    q.Flip(target: 1, when: c);
}
";

#[test]
fn test_grover_program() {
    let program = parse(GROVER).unwrap();
    assert_eq!(program.statements.len(), 4);

    let StatementKind::Repeat { count, body } = &program.statements[2].kind else {
        panic!("expected repeat");
    };
    assert_eq!(count, &Expression::Paren(Box::new(Expression::Int(1))));
    assert_eq!(body.len(), 2);

    let StatementKind::Call(phase) = &body[0].kind else {
        panic!("expected call");
    };
    let ArgValue::Predicate(pred) = &phase.arg("where").unwrap().value else {
        panic!("expected predicate");
    };
    assert_eq!(pred.wires().len(), 3);
    assert_eq!(pred.to_string(), "((q[0]==0 && q[1]==1) && q[2]==1)");

    let StatementKind::Call(measure) = &program.statements[3].kind else {
        panic!("expected call");
    };
    assert_eq!(measure.binding.as_deref(), Some("result"));
    assert_eq!(measure.name, "Measure");
}

#[test]
fn test_hybrid_program() {
    let program = parse(HYBRID).unwrap();
    assert_eq!(program.statements.len(), 5);

    let StatementKind::Analog { target, body } = &program.statements[1].kind else {
        panic!("expected analog block");
    };
    assert_eq!(target.to_string(), "q[0]");
    assert_eq!(body.len(), 4);

    let StatementKind::Call(rotate) = &body[0].kind else {
        panic!("expected call");
    };
    assert!(matches!(
        &rotate.arg("duration").unwrap().value,
        ArgValue::Expr(Expression::Duration(d)) if (*d - 10.0).abs() < 1e-12
    ));

    let StatementKind::Align { branches } = &program.statements[2].kind else {
        panic!("expected align block");
    };
    assert_eq!(branches.len(), 2);
    assert_eq!(branches[1].target.to_string(), "q[1]");

    let StatementKind::If { else_body, .. } = &program.statements[4].kind else {
        panic!("expected if");
    };
    assert_eq!(else_body.as_ref().map(Vec::len), Some(1));
}

#[test]
fn test_for_loop_index_expression() {
    let program = parse("for i in 0..3 { q.Flip(target: i, where: q[i + 1]); }").unwrap();
    let StatementKind::For { var, start, end, body } = &program.statements[0].kind else {
        panic!("expected for");
    };
    assert_eq!(var, "i");
    assert_eq!(start, &Expression::Int(0));
    assert_eq!(end, &Expression::Int(3));
    assert_eq!(body.len(), 1);
}

#[test]
fn test_errors_stop_at_first_failure() {
    let err = parse("let q = Register(2);\nAlign { }\nq.Flip(target: 0").unwrap_err();
    assert!(matches!(err, ParseError::Invalid { span, .. } if span.line == 2));

    let err = parse("q.Phase(angle: PI where: q[0]);").unwrap_err();
    assert!(matches!(err, ParseError::UnexpectedToken { .. }));
}

fn wire(index: u64) -> WireRef {
    WireRef {
        register: "q".into(),
        index: Expression::Int(index),
        span: psi_ir::Span::default(),
    }
}

fn arb_literals() -> impl Strategy<Value = Vec<(u64, bool)>> {
    prop::collection::vec((0_u64..8, any::<bool>()), 1..=6)
}

proptest! {
    #[test]
    fn conjunctions_parse_left_associated(literals in arb_literals()) {
        let source: Vec<String> = literals
            .iter()
            .map(|(i, v)| format!("q[{i}] == {}", u8::from(*v)))
            .collect();
        let source = format!("q.Phase(angle: PI, where: {});", source.join(" && "));

        let program = parse(&source).unwrap();
        let StatementKind::Call(call) = &program.statements[0].kind else {
            panic!("expected call");
        };
        let ArgValue::Predicate(parsed) = &call.arg("where").unwrap().value else {
            panic!("expected predicate");
        };

        let mut expected = Predicate::literal(wire(literals[0].0), literals[0].1);
        for (i, v) in &literals[1..] {
            expected = expected.and(Predicate::literal(wire(*i), *v));
        }
        prop_assert_eq!(parsed.to_string(), expected.to_string());
    }
}
