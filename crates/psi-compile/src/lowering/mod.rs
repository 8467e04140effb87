//! Statement-by-statement lowering of a PsiScript program.
//!
//! The driver walks the AST in source order. Logic calls go through the
//! predicate compiler and the synthesizers into the circuit; pulse calls go
//! to the [`PulseScheduler`]. Loops are unrolled and host `if` blocks become
//! classical conditions on every instruction they produce.
//!
//! Each statement is lowered in isolation: under [`ErrorPolicy::Collect`] a
//! failing statement is rolled back (circuit, schedule, ancilla pool and
//! classical bindings) and its diagnostic recorded, and lowering continues
//! with the next statement. Internal errors always abort.
//!
//! The driver lives here; call binding, classical guards, pulse calls and
//! wire and expression resolution each have a submodule.

use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use psi_ir::{
    ANCILLA_REGISTER, Checkpoint, Circuit, ClassicalCondition, ClbitId, Instruction, PulseSchedule,
    Span, StandardGate, WireId,
};
use psi_lang::ast::{ArgValue, Call, Expression, Program, Statement, StatementKind, WireRef};
use psi_pulse::{PulseCheckpoint, PulseScheduler};

use crate::ancilla::{AncillaPool, PoolCheckpoint};
use crate::config::{CompilerConfig, ErrorPolicy};
use crate::error::{CompileError, CompileResult};
use crate::manager::PassManagerBuilder;
use crate::passes::{AncillaAuditReport, RoutingReport};
use crate::predicate::{ControlSet, Operand, normalize};
use crate::synthesis::{SynthesisContext, flip, phase_oracle, reflect_mean};

mod args;
mod guard;
mod pulse;
mod resolve;

use args::{Args, Operation};
use guard::Guard;
use resolve::symbol;

/// Result of a successful compilation.
#[derive(Debug)]
pub struct CompiledProgram {
    /// Gate-level logic IR.
    pub circuit: Circuit,
    /// Timestamped pulse IR.
    pub schedule: PulseSchedule,
    /// Statements skipped under [`ErrorPolicy::Collect`].
    pub diagnostics: Vec<CompileError>,
    /// What routing did, when a topology was configured.
    pub routing: Option<RoutingReport>,
    /// Outcome of the final ancilla audit.
    pub audit: Option<AncillaAuditReport>,
    /// Largest number of ancillas held at once.
    pub peak_ancillas: usize,
}

impl CompiledProgram {
    /// Whether every statement lowered without a diagnostic.
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Counts worth printing after a compilation.
    pub fn stats(&self) -> CompileStats {
        CompileStats {
            wires: self.circuit.num_wires(),
            clbits: self.circuit.num_clbits(),
            instructions: self.circuit.num_ops(),
            depth: self.circuit.depth(),
            ancilla_checkouts: self.circuit.ancillas().len(),
            peak_ancillas: self.peak_ancillas,
            pulses: self.schedule.len(),
            pulse_duration: self.schedule.duration(),
            diagnostics: self.diagnostics.len(),
        }
    }
}

/// Summary numbers of a [`CompiledProgram`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompileStats {
    pub wires: usize,
    pub clbits: usize,
    pub instructions: usize,
    pub depth: usize,
    pub ancilla_checkouts: usize,
    pub peak_ancillas: usize,
    pub pulses: usize,
    pub pulse_duration: f64,
    pub diagnostics: usize,
}

/// PsiScript compiler.
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    config: CompilerConfig,
}

impl Compiler {
    /// Create a compiler with the given configuration.
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Parse and compile source text.
    pub fn compile_source(&self, source: &str) -> CompileResult<CompiledProgram> {
        let program = psi_lang::parse(source)?;
        self.compile(&program)
    }

    /// Compile a parsed program.
    #[instrument(skip_all, fields(statements = program.statements.len()))]
    pub fn compile(&self, program: &Program) -> CompileResult<CompiledProgram> {
        let mut lowering = Lowering::new(&self.config);
        lowering.block(&program.statements)?;
        let compiled = lowering.finish()?;
        info!(
            "compiled into {} instructions on {} wires and {} pulses, {} diagnostics",
            compiled.circuit.num_ops(),
            compiled.circuit.num_wires(),
            compiled.schedule.len(),
            compiled.diagnostics.len()
        );
        Ok(compiled)
    }
}

/// Compile `source` with `config`.
pub fn compile(source: &str, config: &CompilerConfig) -> CompileResult<CompiledProgram> {
    Compiler::new(config.clone()).compile_source(source)
}

struct Snapshot {
    circuit: Checkpoint,
    pool: PoolCheckpoint,
    pulses: PulseCheckpoint,
    bindings: FxHashMap<String, Vec<ClbitId>>,
    conditions: usize,
    pulse_targets: usize,
    variables: usize,
    unrolled: usize,
}

struct Lowering<'a> {
    config: &'a CompilerConfig,
    circuit: Circuit,
    pool: AncillaPool,
    scheduler: PulseScheduler,
    /// Loop variables, innermost last.
    variables: Vec<(String, i64)>,
    /// Classical names bound by measurements.
    bindings: FxHashMap<String, Vec<ClbitId>>,
    /// Conditions of the enclosing `if` blocks.
    conditions: Vec<ClassicalCondition>,
    /// Wires of the enclosing Analog blocks and branches, innermost last.
    pulse_targets: Vec<Operand>,
    diagnostics: Vec<CompileError>,
    unrolled: usize,
}

impl<'a> Lowering<'a> {
    fn new(config: &'a CompilerConfig) -> Self {
        Self {
            config,
            circuit: Circuit::new("main"),
            pool: AncillaPool::new(config.ancilla_capacity),
            scheduler: PulseScheduler::new(),
            variables: vec![],
            bindings: FxHashMap::default(),
            conditions: vec![],
            pulse_targets: vec![],
            diagnostics: vec![],
            unrolled: 0,
        }
    }

    fn finish(self) -> CompileResult<CompiledProgram> {
        let Lowering {
            config,
            mut circuit,
            pool,
            scheduler,
            diagnostics,
            ..
        } = self;
        let schedule = scheduler.finish()?;

        let mut builder = PassManagerBuilder::new().with_error_policy(config.error_policy);
        if let Some(map) = config.topology.coupling_map(&circuit)? {
            builder = builder.with_coupling_map(map);
        }
        let (pm, mut properties) = builder.build();
        pm.run(&mut circuit, &mut properties)?;

        Ok(CompiledProgram {
            circuit,
            schedule,
            diagnostics,
            routing: properties.remove::<RoutingReport>(),
            audit: properties.remove::<AncillaAuditReport>(),
            peak_ancillas: pool.peak(),
        })
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            circuit: self.circuit.checkpoint(),
            pool: self.pool.checkpoint(),
            pulses: self.scheduler.checkpoint(),
            bindings: self.bindings.clone(),
            conditions: self.conditions.len(),
            pulse_targets: self.pulse_targets.len(),
            variables: self.variables.len(),
            unrolled: self.unrolled,
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.circuit.rollback(snapshot.circuit);
        self.pool.rollback(snapshot.pool);
        self.scheduler.rollback(snapshot.pulses);
        self.bindings = snapshot.bindings;
        self.conditions.truncate(snapshot.conditions);
        self.pulse_targets.truncate(snapshot.pulse_targets);
        self.variables.truncate(snapshot.variables);
        self.unrolled = snapshot.unrolled;
    }

    fn block(&mut self, statements: &[Statement]) -> CompileResult<()> {
        for statement in statements {
            self.statement(statement)?;
        }
        Ok(())
    }

    /// Lower one statement, applying the error policy.
    fn statement(&mut self, statement: &Statement) -> CompileResult<()> {
        if self.config.error_policy == ErrorPolicy::Halt {
            return self.lower_statement(statement);
        }

        let snapshot = self.snapshot();
        match self.lower_statement(statement) {
            Ok(()) => Ok(()),
            Err(err) if err.is_internal() => Err(err),
            Err(err) => {
                self.restore(snapshot);
                warn!("skipping statement: {}", err);
                if let CompileError::UnsupportedPredicate { reason, span } = &err {
                    let marker = Instruction::unsupported(reason.clone(), *span)
                        .with_conditions(self.conditions.iter().cloned());
                    self.circuit.push(marker)?;
                }
                self.diagnostics.push(err);
                Ok(())
            }
        }
    }

    fn lower_statement(&mut self, statement: &Statement) -> CompileResult<()> {
        let span = statement.span;
        match &statement.kind {
            StatementKind::Register { name, size } => self.declare_register(name, *size, span),
            StatementKind::Call(call) => self.call(call, span),
            StatementKind::Analog { target, body } => {
                let operand = self.resolve_wire_ref(target)?;
                debug!("analog block on {} at {}", operand, span);
                self.scheduler
                    .open_scope(operand.wire, operand.label.clone(), span);
                self.pulse_targets.push(operand.clone());
                let result = self.block(body);
                self.pulse_targets.pop();
                result?;
                self.scheduler.close_scope(operand.wire)?;
                Ok(())
            }
            StatementKind::Align { branches } => {
                let mut operands = Vec::with_capacity(branches.len());
                for branch in branches {
                    operands.push(self.resolve_wire_ref(&branch.target)?);
                }
                let wires: Vec<(WireId, String)> = operands
                    .iter()
                    .map(|o| (o.wire, o.label.clone()))
                    .collect();
                self.scheduler.begin_align(&wires, span)?;
                for (branch, operand) in branches.iter().zip(operands) {
                    self.scheduler.begin_branch(operand.wire, branch.span)?;
                    self.pulse_targets.push(operand.clone());
                    let result = self.block(&branch.body);
                    self.pulse_targets.pop();
                    result?;
                    self.scheduler.end_branch(operand.wire)?;
                }
                let summary = self.scheduler.end_align()?;
                debug!(
                    "align at {}: {} -> {}, {} branches padded",
                    span, summary.start, summary.end, summary.padded
                );
                Ok(())
            }
            StatementKind::If {
                condition,
                then_body,
                else_body,
            } => self.lower_if(condition, then_body, else_body.as_deref(), span),
            StatementKind::For {
                var,
                start,
                end,
                body,
            } => {
                let first = self.eval_int(start, span)?;
                let last = self.eval_int(end, span)?;
                let iterations = usize::try_from(last.saturating_sub(first)).unwrap_or(0);
                self.charge_unroll(iterations, body.len(), span)?;
                for i in first..last {
                    self.variables.push((var.clone(), i));
                    let result = self.block(body);
                    self.variables.pop();
                    result?;
                }
                Ok(())
            }
            StatementKind::Repeat { count, body } => {
                let count = self.eval_int(count, span)?;
                let iterations = usize::try_from(count).map_err(|_| CompileError::InvalidExpression {
                    reason: format!("repeat count {count} is negative"),
                    span,
                })?;
                self.charge_unroll(iterations, body.len(), span)?;
                for _ in 0..iterations {
                    self.block(body)?;
                }
                Ok(())
            }
        }
    }

    fn charge_unroll(&mut self, iterations: usize, body: usize, span: Span) -> CompileResult<()> {
        self.unrolled = self
            .unrolled
            .saturating_add(iterations.saturating_mul(body.max(1)));
        if self.unrolled > self.config.max_unroll {
            return Err(CompileError::UnrollLimit {
                limit: self.config.max_unroll,
                span,
            });
        }
        Ok(())
    }

    fn declare_register(&mut self, name: &str, size: u64, span: Span) -> CompileResult<()> {
        if name == ANCILLA_REGISTER
            || self.circuit.register(name).is_some()
            || self.bindings.contains_key(name)
        {
            return Err(CompileError::DuplicateRegister {
                name: name.into(),
                span,
            });
        }
        let size = u32::try_from(size)
            .ok()
            .filter(|&s| s > 0)
            .ok_or_else(|| CompileError::InvalidExpression {
                reason: format!("register size {size} is out of range"),
                span,
            })?;
        self.circuit.add_qreg(name, size)?;
        debug!("register {}[{}]", name, size);
        Ok(())
    }

    fn lower_if(
        &mut self,
        condition: &Expression,
        then_body: &[Statement],
        else_body: Option<&[Statement]>,
        span: Span,
    ) -> CompileResult<()> {
        match self.guard(condition, span)? {
            Guard::Static(true) => self.block(then_body),
            Guard::Static(false) => else_body.map_or(Ok(()), |body| self.block(body)),
            Guard::Conditions(conditions) => {
                let negated = match (else_body, conditions.as_slice()) {
                    (None, _) => None,
                    (Some(_), [single]) => Some(single.negated().ok_or_else(|| {
                        CompileError::UnsupportedGuard {
                            reason: "else needs a single-bit condition".into(),
                            span,
                        }
                    })?),
                    (Some(_), _) => {
                        return Err(CompileError::UnsupportedGuard {
                            reason: "else needs a single-bit condition".into(),
                            span,
                        });
                    }
                };

                let depth = self.conditions.len();
                self.conditions.extend(conditions);
                let result = self.block(then_body);
                self.conditions.truncate(depth);
                result?;

                if let (Some(body), Some(negated)) = (else_body, negated) {
                    self.conditions.push(negated);
                    let result = self.block(body);
                    self.conditions.truncate(depth);
                    result?;
                }
                Ok(())
            }
        }
    }

    fn call(&mut self, call: &Call, span: Span) -> CompileResult<()> {
        let operation =
            Operation::from_name(&call.name).ok_or_else(|| CompileError::UnknownOperation {
                name: call.name.clone(),
                span: call.span,
            })?;
        if call.binding.is_some() && operation != Operation::Measure {
            return Err(CompileError::InvalidExpression {
                reason: format!("the result of {} cannot be bound", operation.name()),
                span,
            });
        }
        let args = Args::bind(operation, call)?;
        debug!("lowering {} at {}", operation.name(), span);

        let guard = match args.expr("when")? {
            Some((expr, at)) => self.guard(expr, at)?,
            None => Guard::Static(true),
        };
        let conditions = match Guard::Conditions(self.conditions.clone()).and(guard) {
            Guard::Static(false) => {
                debug!("{} at {} is statically disabled", operation.name(), span);
                return Ok(());
            }
            Guard::Static(true) => vec![],
            Guard::Conditions(conditions) => conditions,
        };

        if operation.is_pulse() {
            return self.pulse(operation, &args, span, conditions);
        }

        let receiver = call.receiver.as_deref();
        let ctx = SynthesisContext::new(span)
            .with_conditions(conditions)
            .with_native_negative_controls(self.config.native_negative_controls);
        match operation {
            Operation::Superpose => {
                let targets = match args.expr("targets")? {
                    Some((expr, at)) => self.resolve_targets(expr, receiver, at)?,
                    None => self.default_targets(receiver, span)?,
                };
                let wires: Vec<WireId> = targets.iter().map(|o| o.wire).collect();
                for &wire in &wires {
                    ctx.emit(&mut self.circuit, Instruction::single(StandardGate::H, wire))?;
                }
                Ok(())
            }
            Operation::Phase => {
                let (angle, at) = args.require_expr("angle")?;
                let angle = self.eval_number(angle, at)?;
                let controls = self.predicate(&args, span)?;
                let fallback = self
                    .default_targets(receiver, span)?
                    .first()
                    .map(|o| o.wire)
                    .ok_or_else(|| CompileError::InvalidExpression {
                        reason: "Phase needs a declared register".into(),
                        span,
                    })?;
                self.synthesize(|this| {
                    phase_oracle(&mut this.circuit, &mut this.pool, &ctx, &controls, angle, fallback)
                })
            }
            Operation::Reflect => {
                if let Some((expr, at)) = args.expr("axis")? {
                    let axis = symbol(expr);
                    if !axis.to_ascii_uppercase().contains("MEAN") {
                        return Err(CompileError::UnsupportedAxis { axis, span: at });
                    }
                }
                let wires: Vec<WireId> = self
                    .default_targets(receiver, span)?
                    .iter()
                    .map(|o| o.wire)
                    .collect();
                self.synthesize(|this| reflect_mean(&mut this.circuit, &mut this.pool, &ctx, &wires))
            }
            Operation::Flip => {
                let (expr, at) = args.require_expr("target")?;
                let target = match self.resolve_targets(expr, receiver, at)?.as_slice() {
                    [single] => single.clone(),
                    _ => {
                        return Err(CompileError::InvalidExpression {
                            reason: "Flip needs exactly one target wire".into(),
                            span: at,
                        });
                    }
                };
                let controls = self.predicate(&args, span)?;
                if args.get("where").is_some() {
                    if controls.literals.iter().any(|l| l.wire == target.wire) {
                        return Err(CompileError::TargetInPredicate {
                            wire: target.label,
                            span,
                        });
                    }
                    self.scheduler.ensure_unscoped(target.wire, span)?;
                }
                self.synthesize(|this| {
                    flip(&mut this.circuit, &mut this.pool, &ctx, &controls, target.wire)
                })
            }
            Operation::Measure => self.measure(call, &args, receiver, &ctx, span),
            _ => Ok(()),
        }
    }

    /// Run a synthesizer and check the pool is back at its baseline.
    fn synthesize(&mut self, f: impl FnOnce(&mut Self) -> CompileResult<()>) -> CompileResult<()> {
        let baseline = self.pool.outstanding();
        f(self)?;
        if self.pool.outstanding() != baseline {
            return Err(CompileError::PassFailed {
                name: "synthesis".into(),
                reason: format!(
                    "ancilla pool holds {} slots after synthesis, expected {}",
                    self.pool.outstanding(),
                    baseline
                ),
            });
        }
        Ok(())
    }

    /// Resolve and normalize the `where:` predicate, if any.
    fn predicate(&self, args: &Args<'_>, span: Span) -> CompileResult<ControlSet<WireId>> {
        let Some(arg) = args.get("where") else {
            return Ok(ControlSet {
                literals: vec![],
                inversions: vec![],
            });
        };
        let ArgValue::Predicate(predicate) = &arg.value else {
            return Err(CompileError::InvalidExpression {
                reason: "where: expects a quantum predicate".into(),
                span: arg.span,
            });
        };

        let resolved = predicate.try_map(&mut |wire: &WireRef| {
            if self.bindings.contains_key(&wire.register) {
                return Err(CompileError::ClassicalBitInPredicate {
                    name: wire.register.clone(),
                    span: wire.span,
                });
            }
            self.resolve_wire_ref(wire)
        })?;
        let controls = normalize(&resolved, arg.span)?;
        for literal in &controls.literals {
            self.scheduler.ensure_unscoped(literal.wire.wire, span)?;
        }
        debug!(
            "predicate {} -> {} literals",
            resolved,
            controls.literals.len()
        );
        Ok(controls.map(|operand| operand.wire))
    }

    fn measure(
        &mut self,
        call: &Call,
        args: &Args<'_>,
        receiver: Option<&str>,
        ctx: &SynthesisContext,
        span: Span,
    ) -> CompileResult<()> {
        let targets = match args.expr("target")? {
            Some((expr, at)) => self.resolve_targets(expr, receiver, at)?,
            None => match receiver {
                Some(register) => self.register_operands(register, span)?,
                None => {
                    return Err(CompileError::MissingArgument {
                        operation: "Measure".into(),
                        argument: "target".into(),
                        span,
                    });
                }
            },
        };
        let size = u32::try_from(targets.len()).unwrap_or(u32::MAX);

        let clbits = match (&call.binding, targets.as_slice()) {
            (Some(name), _) => {
                if self.circuit.register(name).is_some() {
                    return Err(CompileError::DuplicateRegister {
                        name: name.clone(),
                        span,
                    });
                }
                let creg = self.fresh_creg_name(name);
                let bits = self.circuit.add_creg(creg, size)?;
                self.bindings.insert(name.clone(), bits.clone());
                bits
            }
            (None, [_]) => vec![self.circuit.add_clbit()],
            (None, [first, ..]) => {
                let register = self
                    .circuit
                    .wire(first.wire)
                    .map_or_else(|| "q".to_string(), |w| w.register.clone());
                let creg = self.fresh_creg_name(&format!("meas_{register}"));
                let bits = self.circuit.add_creg(creg.clone(), size)?;
                self.bindings.insert(creg, bits.clone());
                bits
            }
            (None, []) => vec![],
        };

        for (operand, clbit) in targets.iter().zip(clbits) {
            ctx.emit(&mut self.circuit, Instruction::measure(operand.wire, clbit))?;
        }
        Ok(())
    }

    fn fresh_creg_name(&self, base: &str) -> String {
        if self.circuit.classical_register(base).is_none() {
            return base.to_string();
        }
        (1..)
            .map(|n| format!("{base}_{n}"))
            .find(|name| self.circuit.classical_register(name).is_none())
            .unwrap_or_else(|| base.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile_ok(source: &str) -> CompiledProgram {
        compile(source, &CompilerConfig::default()).unwrap()
    }

    fn compile_err(source: &str) -> CompileError {
        compile(source, &CompilerConfig::default()).unwrap_err()
    }

    fn names(circuit: &Circuit) -> Vec<String> {
        circuit.instructions().iter().map(Instruction::name).collect()
    }

    #[test]
    fn test_superpose_forms() {
        let program = compile_ok("let q = Register(3); q.Superpose(targets: ALL); q.Superpose(targets: [0, 2]); Superpose(q[1]);");
        assert_eq!(program.circuit.count_ops().get("h"), Some(&6));
    }

    #[test]
    fn test_phase_two_literals() {
        let program = compile_ok("let q = Register(2); q.Phase(angle: PI, where: q[0] == 1 && q[1] == 0);");
        assert_eq!(names(&program.circuit), vec!["x", "cz", "x"]);
        assert!(program.circuit.ancillas().is_empty());
    }

    #[test]
    fn test_phase_with_loop_variable() {
        let program = compile_ok(
            "let q = Register(4); for i in 0..3 { q.Phase(angle: PI/4, where: q[i] && q[i + 1]); }",
        );
        assert_eq!(program.circuit.count_ops().get("cp"), Some(&3));
    }

    #[test]
    fn test_flip_forms() {
        let program = compile_ok(
            "let q = Register(4); q.Flip(target: 0); q.Flip(target: 3, where: q[0] && q[1] && !q[2]);",
        );
        assert_eq!(names(&program.circuit), vec!["x", "x", "ccx", "ccx", "ccx", "x"]);
        assert_eq!(program.peak_ancillas, 1);
        assert_eq!(program.audit.as_ref().map(|a| a.segments), Some(1));
    }

    #[test]
    fn test_flip_target_in_predicate() {
        let err = compile_err("let q = Register(2); q.Flip(target: 0, where: q[0]);");
        assert!(matches!(err, CompileError::TargetInPredicate { ref wire, .. } if wire == "q[0]"));
    }

    #[test]
    fn test_disjunction_is_rejected() {
        let err = compile_err("let q = Register(2); q.Phase(angle: PI, where: q[0] || q[1]);");
        assert!(matches!(err, CompileError::UnsupportedPredicate { .. }));
        assert_eq!(err.span().map(|s| s.line), Some(1));
    }

    #[test]
    fn test_collect_policy_records_and_continues() {
        let config = CompilerConfig::new().with_error_policy(ErrorPolicy::Collect);
        let source = "let q = Register(2);\nq.Phase(angle: PI, where: q[0] || q[1]);\nq.Flip(target: 5);\nq.Superpose(targets: ALL);";
        let program = compile(source, &config).unwrap();
        assert_eq!(program.diagnostics.len(), 2);
        assert!(matches!(program.diagnostics[1], CompileError::IndexOutOfBounds { index: 5, size: 2, .. }));
        assert_eq!(names(&program.circuit), vec!["unsupported", "h", "h"]);
        assert!(!program.is_clean());
    }

    #[test]
    fn test_measure_bindings_and_guards() {
        let source = r"
            let q = Register(2);
            let c = Measure(q[0]);
            if (c == 1) { q.Flip(target: 1); } else { q.Flip(target: 0); }
            q.Flip(target: 1, when: !c);
            let all = q.Measure();
            Measure(q[1]);
        ";
        let program = compile_ok(source);
        let circuit = &program.circuit;
        assert_eq!(circuit.num_clbits(), 4);
        assert!(circuit.classical_register("c").is_some());
        assert!(circuit.classical_register("all").is_some());

        let insts = circuit.instructions();
        assert_eq!(insts[1].conditions, vec![ClassicalCondition::bit(ClbitId(0), true)]);
        assert_eq!(insts[2].conditions, vec![ClassicalCondition::bit(ClbitId(0), false)]);
        assert_eq!(insts[3].conditions, vec![ClassicalCondition::bit(ClbitId(0), false)]);
        assert!(insts[6].conditions.is_empty());
    }

    #[test]
    fn test_unbound_register_measure_gets_generated_creg() {
        let program = compile_ok("let q = Register(2); q.Measure(); q.Measure();");
        assert!(program.circuit.classical_register("meas_q").is_some());
        assert!(program.circuit.classical_register("meas_q_1").is_some());
    }

    #[test]
    fn test_register_guard() {
        let program = compile_ok(
            "let q = Register(2); let r = q.Measure(); if (r == 2) { q.Flip(target: 0); }",
        );
        let inst = program.circuit.instructions().last().unwrap();
        assert_eq!(inst.conditions, vec![ClassicalCondition::new([ClbitId(0), ClbitId(1)], 2)]);
    }

    #[test]
    fn test_else_on_register_guard_is_rejected() {
        let err = compile_err(
            "let q = Register(2); let r = q.Measure(); if (r == 2) { q.Flip(target: 0); } else { q.Flip(target: 1); }",
        );
        assert!(matches!(err, CompileError::UnsupportedGuard { .. }));
    }

    #[test]
    fn test_classical_bit_in_predicate() {
        let err = compile_err(
            "let q = Register(2); let c = Measure(q[0]); q.Flip(target: 1, where: c[0]);",
        );
        assert!(matches!(err, CompileError::ClassicalBitInPredicate { ref name, .. } if name == "c"));
    }

    #[test]
    fn test_unknown_names() {
        assert!(matches!(
            compile_err("let q = Register(1); q.Teleport();"),
            CompileError::UnknownOperation { .. }
        ));
        assert!(matches!(
            compile_err("let q = Register(1); q.Superpose(speed: 3);"),
            CompileError::UnknownArgument { .. }
        ));
        assert!(matches!(
            compile_err("let q = Register(1); q.Phase(where: q[0]);"),
            CompileError::MissingArgument { .. }
        ));
        assert!(matches!(
            compile_err("r.Superpose(targets: ALL);"),
            CompileError::UnknownRegister { .. }
        ));
        assert!(matches!(
            compile_err("let q = Register(1); let q = Register(2);"),
            CompileError::DuplicateRegister { .. }
        ));
        assert!(matches!(
            compile_err("let q = Register(3); q.Reflect(axis: ORIGIN);"),
            CompileError::UnsupportedAxis { .. }
        ));
    }

    #[test]
    fn test_unroll_limit() {
        let config = CompilerConfig::new().with_max_unroll(10);
        let err = compile(
            "let q = Register(1); repeat(11) { q.Flip(target: 0); }",
            &config,
        )
        .unwrap_err();
        assert!(matches!(err, CompileError::UnrollLimit { limit: 10, .. }));
    }

    #[test]
    fn test_pulse_block() {
        let source = r"
            let q = Register(2);
            Analog(target: q[0]) {
                Rotate(axis: X, angle: PI/2, duration: 10ns);
                ShiftPhase(angle: PI/4);
                Wait(5ns);
            }
            Acquire(duration: 20ns, kernel: boxcar, target: q[1]);
        ";
        let program = compile_ok(source);
        let pulses = program.schedule.instructions();
        assert_eq!(pulses.len(), 4);
        assert!((pulses[2].start - 10.0).abs() < 1e-12);
        assert!((pulses[2].frame.phase - std::f64::consts::FRAC_PI_4).abs() < 1e-12);
        assert_eq!(pulses[3].label, "q[1]");
    }

    #[test]
    fn test_pulse_without_target() {
        let err = compile_err("let q = Register(1); Wait(5ns);");
        assert!(matches!(err, CompileError::MissingPulseTarget { .. }));
    }

    #[test]
    fn test_scope_conflict() {
        let err = compile_err(
            "let q = Register(2);\nAnalog(target: q[0]) {\n  q.Flip(target: 1, where: q[0]);\n}",
        );
        let CompileError::ScopeConflict { wire, scope, usage } = err else {
            panic!("expected scope conflict");
        };
        assert_eq!(wire, "q[0]");
        assert_eq!(scope.line, 2);
        assert_eq!(usage.line, 3);
    }

    #[test]
    fn test_unguarded_logic_inside_analog_is_allowed() {
        let program = compile_ok("let q = Register(1); Analog(target: q[0]) { q.Superpose(targets: ALL); }");
        assert_eq!(program.circuit.num_ops(), 1);
    }

    #[test]
    fn test_static_guards() {
        let program = compile_ok(
            "let q = Register(1); q.Flip(target: 0, when: false); if (true) { q.Flip(target: 0); }",
        );
        assert_eq!(program.circuit.num_ops(), 1);
    }
}
