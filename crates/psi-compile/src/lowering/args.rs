//! Primitive names and argument binding.

use psi_ir::Span;
use psi_lang::ast::{ArgValue, Argument, Call, Expression};

use crate::error::{CompileError, CompileResult};

/// The primitives a call may name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Operation {
    Superpose,
    Phase,
    Reflect,
    Flip,
    Measure,
    Rotate,
    Wait,
    ShiftPhase,
    SetFreq,
    Play,
    Acquire,
}

impl Operation {
    pub(super) fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "Superpose" => Operation::Superpose,
            "Phase" => Operation::Phase,
            "Reflect" => Operation::Reflect,
            "Flip" => Operation::Flip,
            "Measure" => Operation::Measure,
            "Rotate" => Operation::Rotate,
            "Wait" => Operation::Wait,
            "ShiftPhase" => Operation::ShiftPhase,
            "SetFreq" => Operation::SetFreq,
            "Play" => Operation::Play,
            "Acquire" => Operation::Acquire,
            _ => return None,
        })
    }

    pub(super) fn name(self) -> &'static str {
        match self {
            Operation::Superpose => "Superpose",
            Operation::Phase => "Phase",
            Operation::Reflect => "Reflect",
            Operation::Flip => "Flip",
            Operation::Measure => "Measure",
            Operation::Rotate => "Rotate",
            Operation::Wait => "Wait",
            Operation::ShiftPhase => "ShiftPhase",
            Operation::SetFreq => "SetFreq",
            Operation::Play => "Play",
            Operation::Acquire => "Acquire",
        }
    }

    /// Parameters in positional order.
    fn positional(self) -> &'static [&'static str] {
        match self {
            Operation::Superpose => &["targets"],
            Operation::Phase | Operation::ShiftPhase => &["angle"],
            Operation::Reflect => &["axis"],
            Operation::Flip | Operation::Measure => &["target"],
            Operation::Rotate => &["axis", "angle", "duration"],
            Operation::Wait => &["duration"],
            Operation::SetFreq => &["hz"],
            Operation::Play => &["waveform", "channel", "duration"],
            Operation::Acquire => &["duration", "kernel"],
        }
    }

    /// Parameters accepted only by name.
    fn named_only(self) -> &'static [&'static str] {
        match self {
            Operation::Superpose | Operation::Reflect | Operation::Measure => &["when"],
            Operation::Phase | Operation::Flip => &["where", "when"],
            Operation::Rotate => &["shape", "target", "when"],
            Operation::Wait
            | Operation::ShiftPhase
            | Operation::SetFreq
            | Operation::Play
            | Operation::Acquire => &["target", "when"],
        }
    }

    pub(super) fn is_pulse(self) -> bool {
        matches!(
            self,
            Operation::Rotate
                | Operation::Wait
                | Operation::ShiftPhase
                | Operation::SetFreq
                | Operation::Play
                | Operation::Acquire
        )
    }
}

/// Arguments of one call, matched to parameter names.
pub(super) struct Args<'c> {
    pub(super) operation: Operation,
    values: Vec<(&'static str, &'c Argument)>,
    pub(super) span: Span,
}

impl<'c> Args<'c> {
    pub(super) fn bind(operation: Operation, call: &'c Call) -> CompileResult<Self> {
        let mut values: Vec<(&'static str, &'c Argument)> = vec![];
        let mut position = 0;
        for arg in &call.args {
            let param = match &arg.name {
                Some(name) => operation
                    .positional()
                    .iter()
                    .chain(operation.named_only())
                    .copied()
                    .find(|p| *p == name.as_str()),
                None => {
                    position += 1;
                    operation.positional().get(position - 1).copied()
                }
            };
            let Some(param) = param else {
                let argument = arg
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("positional argument {position}"));
                return Err(CompileError::UnknownArgument {
                    operation: operation.name().into(),
                    argument,
                    span: arg.span,
                });
            };
            if values.iter().any(|(p, _)| *p == param) {
                return Err(CompileError::InvalidExpression {
                    reason: format!("argument '{param}' given twice"),
                    span: arg.span,
                });
            }
            values.push((param, arg));
        }
        Ok(Self {
            operation,
            values,
            span: call.span,
        })
    }

    pub(super) fn get(&self, param: &str) -> Option<&'c Argument> {
        self.values
            .iter()
            .find(|(p, _)| *p == param)
            .map(|(_, arg)| *arg)
    }

    pub(super) fn require(&self, param: &str) -> CompileResult<&'c Argument> {
        self.get(param).ok_or_else(|| CompileError::MissingArgument {
            operation: self.operation.name().into(),
            argument: param.into(),
            span: self.span,
        })
    }

    pub(super) fn expr(&self, param: &str) -> CompileResult<Option<(&'c Expression, Span)>> {
        self.get(param).map(expression).transpose()
    }

    pub(super) fn require_expr(&self, param: &str) -> CompileResult<(&'c Expression, Span)> {
        expression(self.require(param)?)
    }
}

pub(super) fn expression(arg: &Argument) -> CompileResult<(&Expression, Span)> {
    match &arg.value {
        ArgValue::Expr(expr) => Ok((expr, arg.span)),
        ArgValue::Predicate(_) => Err(CompileError::InvalidExpression {
            reason: "a quantum predicate is only allowed in where:".into(),
            span: arg.span,
        }),
    }
}
