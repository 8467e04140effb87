//! Pulse calls handed to the scheduler.

use psi_ir::{ClassicalCondition, RotationAxis, Span};
use psi_pulse::PulseOp;

use super::Lowering;
use super::args::{Args, Operation, expression};
use super::resolve::symbol;
use crate::error::{CompileError, CompileResult};

impl Lowering<'_> {
    pub(super) fn pulse(
        &mut self,
        operation: Operation,
        args: &Args<'_>,
        span: Span,
        conditions: Vec<ClassicalCondition>,
    ) -> CompileResult<()> {
        let target = match args.get("target") {
            Some(arg) => {
                let (expr, at) = expression(arg)?;
                match self.resolve_targets(expr, None, at)?.as_slice() {
                    [single] => single.clone(),
                    _ => {
                        return Err(CompileError::InvalidExpression {
                            reason: format!("{} needs exactly one target wire", operation.name()),
                            span: at,
                        });
                    }
                }
            }
            None => self.pulse_targets.last().cloned().ok_or_else(|| {
                CompileError::MissingPulseTarget {
                    operation: operation.name().into(),
                    span,
                }
            })?,
        };

        let number = |this: &Self, param: &str| -> CompileResult<f64> {
            let (expr, at) = args.require_expr(param)?;
            this.eval_number(expr, at)
        };
        let reference = |param: &str| -> CompileResult<Option<String>> {
            Ok(args.expr(param)?.map(|(expr, _)| symbol(expr)))
        };

        let op = match operation {
            Operation::Rotate => {
                let (axis, at) = args.require_expr("axis")?;
                let axis_name = symbol(axis);
                let axis = match axis_name.rsplit('.').next().unwrap_or_default() {
                    "X" | "x" => RotationAxis::X,
                    "Y" | "y" => RotationAxis::Y,
                    "Z" | "z" => RotationAxis::Z,
                    _ => {
                        return Err(CompileError::UnsupportedAxis {
                            axis: axis_name,
                            span: at,
                        });
                    }
                };
                PulseOp::Rotate {
                    axis,
                    angle: number(self, "angle")?,
                    duration: number(self, "duration")?,
                    shape: reference("shape")?,
                }
            }
            Operation::Wait => PulseOp::Wait {
                duration: number(self, "duration")?,
            },
            Operation::ShiftPhase => PulseOp::ShiftPhase {
                angle: number(self, "angle")?,
            },
            Operation::SetFreq => PulseOp::SetFreq {
                hz: number(self, "hz")?,
            },
            Operation::Play => PulseOp::Play {
                waveform: symbol(args.require_expr("waveform")?.0),
                channel: reference("channel")?,
                duration: match args.expr("duration")? {
                    Some((expr, at)) => Some(self.eval_number(expr, at)?),
                    None => None,
                },
            },
            Operation::Acquire => PulseOp::Acquire {
                duration: number(self, "duration")?,
                kernel: reference("kernel")?,
            },
            _ => return Ok(()),
        };

        self.scheduler
            .emit(target.wire, target.label, op, span, conditions)?;
        Ok(())
    }
}
