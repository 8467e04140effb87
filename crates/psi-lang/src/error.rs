//! Syntax errors.

use psi_ir::Span;
use thiserror::Error;

/// A malformed construct in PsiScript source.
///
/// The parser stops at the first one; there is no recovery.
#[derive(Debug, Clone, Error, PartialEq)]
#[non_exhaustive]
pub enum ParseError {
    /// Lexer error (invalid token).
    #[error("{span}: {message}")]
    LexerError { span: Span, message: String },

    /// Unexpected token.
    #[error("{span}: expected {expected}, found '{found}'")]
    UnexpectedToken {
        span: Span,
        expected: String,
        found: String,
    },

    /// Unexpected end of input.
    #[error("{span}: unexpected end of input, expected {expected}")]
    UnexpectedEof { span: Span, expected: String },

    /// Well-formed tokens that do not form a valid construct.
    #[error("{span}: {message}")]
    Invalid { span: Span, message: String },
}

impl ParseError {
    /// Location of the failure.
    pub fn span(&self) -> Span {
        match self {
            ParseError::LexerError { span, .. }
            | ParseError::UnexpectedToken { span, .. }
            | ParseError::UnexpectedEof { span, .. }
            | ParseError::Invalid { span, .. } => *span,
        }
    }
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;
