//! Host-side classical guards.

use psi_ir::{ClassicalCondition, ClbitId, Span};
use psi_lang::ast::{BinOp, Expression};

use super::Lowering;
use super::resolve::{is_value, unparen};
use crate::error::{CompileError, CompileResult};

/// A classical guard after evaluation.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum Guard {
    /// Known at compile time.
    Static(bool),
    /// Conjunction of conditions on measured bits.
    Conditions(Vec<ClassicalCondition>),
}

impl Guard {
    pub(super) fn and(self, other: Guard) -> Guard {
        match (self, other) {
            (Guard::Static(false), _) | (_, Guard::Static(false)) => Guard::Static(false),
            (Guard::Static(true), g) | (g, Guard::Static(true)) => g,
            (Guard::Conditions(mut a), Guard::Conditions(b)) => {
                a.extend(b);
                Guard::Conditions(a)
            }
        }
    }
}

impl Lowering<'_> {
    pub(super) fn guard(&self, expr: &Expression, span: Span) -> CompileResult<Guard> {
        let unsupported = |reason: String| CompileError::UnsupportedGuard { reason, span };
        match expr {
            Expression::Bool(value) => Ok(Guard::Static(*value)),
            Expression::Paren(inner) => self.guard(inner, span),
            Expression::Identifier(_) | Expression::Index { .. } => {
                let bits = self.classical_bits(expr, span)?;
                match bits.as_slice() {
                    [bit] => Ok(Guard::Conditions(vec![ClassicalCondition::bit(*bit, true)])),
                    _ => Err(unsupported(format!(
                        "'{expr}' names {} bits; compare it against a value",
                        bits.len()
                    ))),
                }
            }
            Expression::Not(inner) => match self.guard(inner, span)? {
                Guard::Static(value) => Ok(Guard::Static(!value)),
                Guard::Conditions(conditions) => match conditions.as_slice() {
                    [single] => single
                        .negated()
                        .map(|c| Guard::Conditions(vec![c]))
                        .ok_or_else(|| unsupported(format!("cannot negate '{inner}'"))),
                    _ => Err(unsupported(format!("cannot negate '{inner}'"))),
                },
            },
            Expression::BinOp { left, op, right } => match op {
                BinOp::And => Ok(self.guard(left, span)?.and(self.guard(right, span)?)),
                BinOp::Or => Err(unsupported(format!("disjunction in '{expr}'"))),
                BinOp::Eq | BinOp::Ne => {
                    let (bits_expr, value_expr) = if is_value(right) {
                        (left, right)
                    } else {
                        (right, left)
                    };
                    let bits = self.classical_bits(bits_expr, span)?;
                    let value = match unparen(value_expr) {
                        Expression::Bool(b) => u64::from(*b),
                        Expression::Int(v) => *v,
                        _ => return Err(unsupported(format!("'{expr}' is not a bit comparison"))),
                    };
                    if bits.len() < 64 && value >> bits.len() != 0 {
                        return Err(unsupported(format!(
                            "value {value} does not fit in {} bits",
                            bits.len()
                        )));
                    }
                    let condition = ClassicalCondition::new(bits, value);
                    if *op == BinOp::Eq {
                        Ok(Guard::Conditions(vec![condition]))
                    } else {
                        condition
                            .negated()
                            .map(|c| Guard::Conditions(vec![c]))
                            .ok_or_else(|| {
                                unsupported(format!("'!=' on a multi-bit register in '{expr}'"))
                            })
                    }
                }
                _ => Err(unsupported(format!("'{expr}' is not a condition"))),
            },
            _ => Err(unsupported(format!("'{expr}' is not a condition"))),
        }
    }

    fn classical_bits(&self, expr: &Expression, span: Span) -> CompileResult<Vec<ClbitId>> {
        let unknown = |name: &str| CompileError::UnsupportedGuard {
            reason: format!("'{name}' is not a measured classical value"),
            span,
        };
        match unparen(expr) {
            Expression::Identifier(name) => self.bindings.get(name).cloned().ok_or_else(|| unknown(name)),
            Expression::Index { base, index } => {
                let bits = self.bindings.get(base).ok_or_else(|| unknown(base))?;
                let i = self.eval_int(index, span)?;
                usize::try_from(i)
                    .ok()
                    .and_then(|i| bits.get(i))
                    .map(|&bit| vec![bit])
                    .ok_or_else(|| CompileError::IndexOutOfBounds {
                        register: base.clone(),
                        index: i,
                        size: bits.len(),
                        span,
                    })
            }
            other => Err(unknown(&other.to_string())),
        }
    }
}
