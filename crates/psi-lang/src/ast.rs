//! Abstract syntax tree for PsiScript.

use psi_ir::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A complete PsiScript program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    /// Top-level statements in source order.
    pub statements: Vec<Statement>,
}

/// A statement with its source location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    /// What the statement is.
    pub kind: StatementKind,
    /// Source location of the whole statement.
    pub span: Span,
}

/// Statement forms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StatementKind {
    /// `let name = Register(size);`
    Register {
        /// Register name.
        name: String,
        /// Number of wires.
        size: u64,
    },
    /// Primitive invocation, method form (`q.Phase(...)`) or free form
    /// (`Measure(q[0])`), optionally bound with `let`.
    Call(Call),
    /// `Analog(target: w) { ... }`
    Analog {
        /// Wire owning the pulse scope.
        target: WireRef,
        /// Pulse-layer body.
        body: Vec<Statement>,
    },
    /// `Align { branch w { ... } ... }`
    Align {
        /// Branches in source order.
        branches: Vec<Branch>,
    },
    /// `if (cond) { ... } else { ... }`
    If {
        /// Classical condition.
        condition: Expression,
        /// Taken branch.
        then_body: Vec<Statement>,
        /// Optional else branch.
        else_body: Option<Vec<Statement>>,
    },
    /// `for i in start..end { ... }` (end exclusive)
    For {
        /// Loop variable.
        var: String,
        /// First value.
        start: Expression,
        /// One past the last value.
        end: Expression,
        /// Loop body.
        body: Vec<Statement>,
    },
    /// `repeat(n) { ... }`
    Repeat {
        /// Iteration count.
        count: Expression,
        /// Loop body.
        body: Vec<Statement>,
    },
}

/// One `branch w { ... }` of an Align block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    /// Wire the branch drives.
    pub target: WireRef,
    /// Pulse-layer body.
    pub body: Vec<Statement>,
    /// Source location of the branch header and body.
    pub span: Span,
}

/// A primitive invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    /// Name bound by `let name = ...`, if any.
    pub binding: Option<String>,
    /// Register the primitive is invoked on (`q` in `q.Phase`).
    pub receiver: Option<String>,
    /// Primitive name.
    pub name: String,
    /// Arguments in source order.
    pub args: Vec<Argument>,
    /// Source location of the call expression.
    pub span: Span,
}

impl Call {
    /// Named argument lookup.
    pub fn arg(&self, name: &str) -> Option<&Argument> {
        self.args
            .iter()
            .find(|a| a.name.as_deref() == Some(name))
    }

    /// Positional argument lookup (unnamed arguments only).
    pub fn positional(&self, index: usize) -> Option<&Argument> {
        self.args.iter().filter(|a| a.name.is_none()).nth(index)
    }

    /// Named argument, falling back to the positional slot `index`.
    pub fn arg_or_positional(&self, name: &str, index: usize) -> Option<&Argument> {
        self.arg(name).or_else(|| self.positional(index))
    }
}

/// A call argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    /// Argument name for `name: value` arguments.
    pub name: Option<String>,
    /// The value.
    pub value: ArgValue,
    /// Source location of the argument.
    pub span: Span,
}

/// Argument payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArgValue {
    /// Any expression.
    Expr(Expression),
    /// A quantum predicate (`where:` arguments).
    Predicate(Predicate<WireRef>),
}

/// A wire reference `register[index]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireRef {
    /// Register name.
    pub register: String,
    /// Index expression; may mention loop variables.
    pub index: Expression,
    /// Source location.
    pub span: Span,
}

impl fmt::Display for WireRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.register, self.index)
    }
}

/// Quantum predicate over wires of type `W`.
///
/// The parser produces `Predicate<WireRef>`; lowering resolves the
/// references with [`Predicate::try_map`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate<W> {
    /// `wire == value`
    Equality {
        /// The wire tested.
        wire: W,
        /// Required basis value.
        value: bool,
    },
    /// Conjunction.
    And(Box<Predicate<W>>, Box<Predicate<W>>),
    /// Disjunction.
    Or(Box<Predicate<W>>, Box<Predicate<W>>),
    /// Negation.
    Not(Box<Predicate<W>>),
}

impl<W> Predicate<W> {
    /// `wire == value`
    pub fn literal(wire: W, value: bool) -> Self {
        Predicate::Equality { wire, value }
    }

    /// `left && right`
    #[must_use]
    pub fn and(self, right: Predicate<W>) -> Self {
        Predicate::And(Box::new(self), Box::new(right))
    }

    /// `left || right`
    #[must_use]
    pub fn or(self, right: Predicate<W>) -> Self {
        Predicate::Or(Box::new(self), Box::new(right))
    }

    /// `!self`
    #[must_use]
    pub fn negate(self) -> Self {
        Predicate::Not(Box::new(self))
    }

    /// Map every wire, stopping at the first error.
    pub fn try_map<V, E>(&self, f: &mut impl FnMut(&W) -> Result<V, E>) -> Result<Predicate<V>, E> {
        Ok(match self {
            Predicate::Equality { wire, value } => Predicate::Equality {
                wire: f(wire)?,
                value: *value,
            },
            Predicate::And(l, r) => Predicate::And(Box::new(l.try_map(f)?), Box::new(r.try_map(f)?)),
            Predicate::Or(l, r) => Predicate::Or(Box::new(l.try_map(f)?), Box::new(r.try_map(f)?)),
            Predicate::Not(inner) => Predicate::Not(Box::new(inner.try_map(f)?)),
        })
    }

    /// Wires mentioned, in left-to-right order.
    pub fn wires(&self) -> Vec<&W> {
        let mut out = vec![];
        self.collect_wires(&mut out);
        out
    }

    fn collect_wires<'a>(&'a self, out: &mut Vec<&'a W>) {
        match self {
            Predicate::Equality { wire, .. } => out.push(wire),
            Predicate::And(l, r) | Predicate::Or(l, r) => {
                l.collect_wires(out);
                r.collect_wires(out);
            }
            Predicate::Not(inner) => inner.collect_wires(out),
        }
    }
}

impl<W: fmt::Display> fmt::Display for Predicate<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Equality { wire, value } => write!(f, "{wire}=={}", u8::from(*value)),
            Predicate::And(l, r) => write!(f, "({l} && {r})"),
            Predicate::Or(l, r) => write!(f, "({l} || {r})"),
            Predicate::Not(inner) => write!(f, "!{inner}"),
        }
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    And,
    Or,
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::And => "&&",
            BinOp::Or => "||",
        };
        write!(f, "{symbol}")
    }
}

/// Expressions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    Int(u64),
    Float(f64),
    /// Time literal, already converted to nanoseconds.
    Duration(f64),
    Bool(bool),
    Str(String),
    Pi,
    Tau,
    Identifier(String),
    /// `base[index]`
    Index {
        base: String,
        index: Box<Expression>,
    },
    /// `base.member`, e.g. `Axis.MEAN`
    Member {
        base: String,
        member: String,
    },
    /// `[a, b, ...]`
    List(Vec<Expression>),
    /// `Name(args)`, e.g. `Gaussian(amp: 0.2)`
    Call {
        name: String,
        args: Vec<(Option<String>, Expression)>,
    },
    Neg(Box<Expression>),
    Not(Box<Expression>),
    BinOp {
        left: Box<Expression>,
        op: BinOp,
        right: Box<Expression>,
    },
    Paren(Box<Expression>),
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Int(v) => write!(f, "{v}"),
            Expression::Float(v) => write!(f, "{v}"),
            Expression::Duration(v) => write!(f, "{v}ns"),
            Expression::Bool(v) => write!(f, "{v}"),
            Expression::Str(s) => write!(f, "{s}"),
            Expression::Pi => write!(f, "PI"),
            Expression::Tau => write!(f, "TAU"),
            Expression::Identifier(name) => write!(f, "{name}"),
            Expression::Index { base, index } => write!(f, "{base}[{index}]"),
            Expression::Member { base, member } => write!(f, "{base}.{member}"),
            Expression::List(items) => {
                let items: Vec<_> = items.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", items.join(", "))
            }
            Expression::Call { name, args } => {
                let args: Vec<_> = args
                    .iter()
                    .map(|(name, value)| match name {
                        Some(name) => format!("{name}: {value}"),
                        None => value.to_string(),
                    })
                    .collect();
                write!(f, "{name}({})", args.join(", "))
            }
            Expression::Neg(inner) => write!(f, "-{inner}"),
            Expression::Not(inner) => write!(f, "!{inner}"),
            Expression::BinOp { left, op, right } => write!(f, "{left} {op} {right}"),
            Expression::Paren(inner) => write!(f, "({inner})"),
        }
    }
}
