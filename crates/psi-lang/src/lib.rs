//! PsiScript front end
//!
//! Lexer, abstract syntax tree and recursive-descent parser for PsiScript, a
//! small geometric notation for quantum programs with a hybrid pulse layer.
//!
//! # Supported Syntax
//!
//! | Construct | Example |
//! |-----------|---------|
//! | Register declaration | `let q = Register(3);` |
//! | Logic primitives | `q.Superpose(targets: ALL);`, `q.Reflect(axis: MEAN);` |
//! | Quantum guard | `q.Phase(angle: PI, where: q[0] == 1 && q[1] == 0);` |
//! | Classical guard | `q.Flip(target: 1, when: c == 1);` |
//! | Measurement | `let c = Measure(q[0]);` |
//! | Pulse scope | `Analog(target: q[0]) { Rotate(axis: X, angle: PI, duration: 20ns); }` |
//! | Branch alignment | `Align { branch q[0] { Wait(100ns); } branch q[1] { Wait(60ns); } }` |
//! | Host control flow | `if (c) { ... } else { ... }`, `for i in 0..3 { ... }`, `repeat(2) { ... }` |
//! | Comments | `// line`, `/* block */` |
//!
//! Parsing performs no semantic validation: register names, argument names and
//! predicate shapes are checked during lowering.
//!
//! # Example
//!
//! ```rust
//! use psi_lang::ast::StatementKind;
//! use psi_lang::parse;
//!
//! let program = parse(r#"
//!     let q = Register(3);
//!     q.Superpose(targets: ALL);
//!     q.Phase(angle: PI, where: q[0] == 1 && q[1] == 1 && q[2] == 0);
//!     q.Reflect(axis: MEAN);
//! "#).unwrap();
//!
//! assert_eq!(program.statements.len(), 4);
//! assert!(matches!(program.statements[0].kind, StatementKind::Register { size: 3, .. }));
//! ```
//!
//! Malformed input fails with the position of the first offending token:
//!
//! ```rust
//! let err = psi_lang::parse("let q = Register(2)\nq.Flip(target: 0);").unwrap_err();
//! assert!(err.to_string().starts_with("2:1"));
//! ```

pub mod ast;
mod error;
mod lexer;
mod parser;

pub use error::{ParseError, ParseResult};
pub use parser::parse;
