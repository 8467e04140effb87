//! Wire references and compile-time expressions.

use psi_ir::Span;
use psi_lang::ast::{BinOp, Expression, WireRef};

use super::Lowering;
use crate::error::{CompileError, CompileResult};
use crate::predicate::Operand;

impl Lowering<'_> {
    fn resolve_wire(&self, register: &str, index: i64, span: Span) -> CompileResult<Operand> {
        let reg = self
            .circuit
            .register(register)
            .ok_or_else(|| CompileError::UnknownRegister {
                name: register.into(),
                span,
            })?;
        let wire = usize::try_from(index)
            .ok()
            .and_then(|i| reg.get(i))
            .ok_or_else(|| CompileError::IndexOutOfBounds {
                register: register.into(),
                index,
                size: reg.len(),
                span,
            })?;
        Ok(Operand {
            wire,
            label: format!("{register}[{index}]"),
        })
    }

    pub(super) fn resolve_wire_ref(&self, wire: &WireRef) -> CompileResult<Operand> {
        let index = self.eval_int(&wire.index, wire.span)?;
        self.resolve_wire(&wire.register, index, wire.span)
    }

    pub(super) fn register_operands(&self, register: &str, span: Span) -> CompileResult<Vec<Operand>> {
        let reg = self
            .circuit
            .register(register)
            .ok_or_else(|| CompileError::UnknownRegister {
                name: register.into(),
                span,
            })?;
        Ok(reg
            .wires
            .iter()
            .enumerate()
            .map(|(i, &wire)| Operand {
                wire,
                label: format!("{register}[{i}]"),
            })
            .collect())
    }

    /// The receiver register, or every declared data wire.
    pub(super) fn default_targets(&self, receiver: Option<&str>, span: Span) -> CompileResult<Vec<Operand>> {
        match receiver {
            Some(register) => self.register_operands(register, span),
            None => {
                let mut operands = vec![];
                for reg in self.circuit.registers() {
                    operands.extend(self.register_operands(&reg.name, span)?);
                }
                Ok(operands)
            }
        }
    }

    pub(super) fn resolve_targets(
        &self,
        expr: &Expression,
        receiver: Option<&str>,
        span: Span,
    ) -> CompileResult<Vec<Operand>> {
        match expr {
            Expression::Identifier(name) if name == "ALL" => self.default_targets(receiver, span),
            Expression::Identifier(name) if self.circuit.register(name).is_some() => {
                self.register_operands(name, span)
            }
            Expression::Index { base, index } => {
                let index = self.eval_int(index, span)?;
                Ok(vec![self.resolve_wire(base, index, span)?])
            }
            Expression::List(items) => {
                let mut operands = vec![];
                for item in items {
                    operands.extend(self.resolve_targets(item, receiver, span)?);
                }
                Ok(operands)
            }
            Expression::Paren(inner) => self.resolve_targets(inner, receiver, span),
            other => {
                let Some(register) = receiver else {
                    return Err(CompileError::InvalidExpression {
                        reason: format!("target '{other}' needs a receiver register"),
                        span,
                    });
                };
                let index = self.eval_int(other, span)?;
                Ok(vec![self.resolve_wire(register, index, span)?])
            }
        }
    }

    fn variable(&self, name: &str) -> Option<i64> {
        self.variables
            .iter()
            .rev()
            .find(|(var, _)| var == name)
            .map(|(_, value)| *value)
    }

    pub(super) fn eval_int(&self, expr: &Expression, span: Span) -> CompileResult<i64> {
        let invalid = |reason: String| CompileError::InvalidExpression { reason, span };
        match expr {
            Expression::Int(v) => i64::try_from(*v).map_err(|_| invalid(format!("{v} is too large"))),
            Expression::Identifier(name) => self
                .variable(name)
                .ok_or_else(|| invalid(format!("unknown variable '{name}'"))),
            Expression::Neg(inner) => Ok(-self.eval_int(inner, span)?),
            Expression::Paren(inner) => self.eval_int(inner, span),
            Expression::BinOp { left, op, right } => {
                let a = self.eval_int(left, span)?;
                let b = self.eval_int(right, span)?;
                let value = match op {
                    BinOp::Add => a.checked_add(b),
                    BinOp::Sub => a.checked_sub(b),
                    BinOp::Mul => a.checked_mul(b),
                    BinOp::Div => a.checked_div(b),
                    _ => return Err(invalid(format!("'{expr}' is not an integer expression"))),
                };
                value.ok_or_else(|| invalid(format!("'{expr}' overflows or divides by zero")))
            }
            other => Err(invalid(format!("expected an integer, found '{other}'"))),
        }
    }

    /// Evaluate an angle, frequency or duration. Durations are in ns.
    pub(super) fn eval_number(&self, expr: &Expression, span: Span) -> CompileResult<f64> {
        let invalid = |reason: String| CompileError::InvalidExpression { reason, span };
        #[allow(clippy::cast_precision_loss)]
        let value = match expr {
            Expression::Int(v) => *v as f64,
            Expression::Float(v) | Expression::Duration(v) => *v,
            Expression::Pi => std::f64::consts::PI,
            Expression::Tau => std::f64::consts::TAU,
            Expression::Identifier(name) => self
                .variable(name)
                .map(|v| v as f64)
                .ok_or_else(|| invalid(format!("unknown variable '{name}'")))?,
            Expression::Neg(inner) => -self.eval_number(inner, span)?,
            Expression::Paren(inner) => self.eval_number(inner, span)?,
            Expression::BinOp { left, op, right } => {
                let a = self.eval_number(left, span)?;
                let b = self.eval_number(right, span)?;
                match op {
                    BinOp::Add => a + b,
                    BinOp::Sub => a - b,
                    BinOp::Mul => a * b,
                    BinOp::Div if b == 0.0 => return Err(invalid(format!("division by zero in '{expr}'"))),
                    BinOp::Div => a / b,
                    _ => return Err(invalid(format!("'{expr}' is not a number"))),
                }
            }
            other => return Err(invalid(format!("expected a number, found '{other}'"))),
        };
        Ok(value)
    }
}

pub(super) fn unparen(expr: &Expression) -> &Expression {
    match expr {
        Expression::Paren(inner) => unparen(inner),
        other => other,
    }
}

pub(super) fn is_value(expr: &Expression) -> bool {
    matches!(unparen(expr), Expression::Int(_) | Expression::Bool(_))
}

/// Opaque reference text: strings unquoted, anything else as written.
pub(super) fn symbol(expr: &Expression) -> String {
    match expr {
        Expression::Str(s) => s.clone(),
        other => other.to_string(),
    }
}
