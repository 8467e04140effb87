//! Quantum predicate normalization.
//!
//! A `where:` predicate is reduced to an ordered list of control literals
//! `(wire, required value)` plus the helper-inversion set: the wires whose
//! literal requires |0⟩ and therefore need an X on each side of the
//! controlled operation when negative controls are not native.
//!
//! Only conjunctions of (possibly negated) equality literals are accepted:
//!
//! | Shape | Result |
//! |-------|--------|
//! | `w == v` | literal `(w, v)` |
//! | `!(w == v)`, `w != v` | literal `(w, 1 - v)` |
//! | `!!p` | same as `p` |
//! | `p && q` | literals of `p`, then of `q` |
//! | `p \|\| q` | `UnsupportedPredicate` |
//! | `!(p && q)` | `UnsupportedPredicate` |
//!
//! Repeated literals are merged; `w == 0 && w == 1` is rejected.

use serde::{Deserialize, Serialize};
use std::fmt;

use psi_ir::{Control, Span, WireId};
use psi_lang::ast::Predicate;

use crate::error::{CompileError, CompileResult};

/// A resolved wire operand with its source-level label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Operand {
    /// Circuit wire.
    pub wire: WireId,
    /// Label as written, e.g. `q[2]`.
    pub label: String,
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)
    }
}

/// A wire and the basis value that enables the guarded operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlLiteral<W> {
    /// The wire tested.
    pub wire: W,
    /// Required basis value.
    pub value: bool,
}

impl ControlLiteral<WireId> {
    /// The literal as a gate control.
    ///
    /// Without native negative controls every control is positive and the
    /// caller brackets `== 0` wires with X.
    pub fn to_control(&self, native_negative: bool) -> Control {
        if native_negative && !self.value {
            Control::negative(self.wire)
        } else {
            Control::positive(self.wire)
        }
    }
}

impl<W: fmt::Display> fmt::Display for ControlLiteral<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.wire, u8::from(self.value))
    }
}

/// Normalized predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlSet<W> {
    /// Literals in first-mention order.
    pub literals: Vec<ControlLiteral<W>>,
    /// Wires whose literal requires |0⟩, in the same order.
    pub inversions: Vec<W>,
}

impl<W> ControlSet<W> {
    /// Number of literals.
    pub fn len(&self) -> usize {
        self.literals.len()
    }

    /// Whether there are no literals.
    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }

    /// Convert every wire, preserving order.
    pub fn map<V>(self, mut f: impl FnMut(W) -> V) -> ControlSet<V> {
        ControlSet {
            literals: self
                .literals
                .into_iter()
                .map(|l| ControlLiteral {
                    wire: f(l.wire),
                    value: l.value,
                })
                .collect(),
            inversions: self.inversions.into_iter().map(f).collect(),
        }
    }
}

impl<W: Clone> ControlSet<W> {
    /// Control set requiring every wire to be |1⟩.
    pub fn all_ones(wires: &[W]) -> Self {
        Self {
            literals: wires
                .iter()
                .map(|w| ControlLiteral {
                    wire: w.clone(),
                    value: true,
                })
                .collect(),
            inversions: vec![],
        }
    }
}

/// Normalize a predicate into control literals and helper inversions.
///
/// `span` locates the predicate for error reporting.
pub fn normalize<W>(predicate: &Predicate<W>, span: Span) -> CompileResult<ControlSet<W>>
where
    W: Clone + PartialEq + fmt::Display,
{
    let mut literals: Vec<ControlLiteral<W>> = vec![];
    collect(predicate, false, &mut literals, span)?;
    let inversions = literals
        .iter()
        .filter(|l| !l.value)
        .map(|l| l.wire.clone())
        .collect();
    Ok(ControlSet {
        literals,
        inversions,
    })
}

fn collect<W>(
    predicate: &Predicate<W>,
    negated: bool,
    out: &mut Vec<ControlLiteral<W>>,
    span: Span,
) -> CompileResult<()>
where
    W: Clone + PartialEq + fmt::Display,
{
    let unsupported = |reason: String| CompileError::UnsupportedPredicate { reason, span };
    match predicate {
        Predicate::Equality { wire, value } => {
            let value = *value != negated;
            match out.iter().find(|l| l.wire == *wire) {
                Some(existing) if existing.value == value => Ok(()),
                Some(_) => Err(unsupported(format!("contradictory literals on {wire}"))),
                None => {
                    out.push(ControlLiteral {
                        wire: wire.clone(),
                        value,
                    });
                    Ok(())
                }
            }
        }
        Predicate::Not(inner) => collect(inner, !negated, out, span),
        Predicate::And(..) | Predicate::Or(..) if negated => Err(unsupported(format!(
            "negation of a compound expression in {predicate}"
        ))),
        Predicate::And(left, right) => {
            collect(left, false, out, span)?;
            collect(right, false, out, span)
        }
        Predicate::Or(..) => Err(unsupported(format!("disjunction in {predicate}"))),
    }
}
