//! Parser for PsiScript.

mod expression;
mod statement;

use psi_ir::{LineIndex, Span};

use crate::ast::Program;
use crate::error::{ParseError, ParseResult};
use crate::lexer::{SpannedToken, Token, tokenize};

/// Parse PsiScript source into an AST.
pub fn parse(source: &str) -> ParseResult<Program> {
    let mut parser = Parser::new(source)?;
    parser.parse_program()
}

/// Parser state.
pub(super) struct Parser<'a> {
    pub(super) source: &'a str,
    pub(super) index: LineIndex,
    pub(super) tokens: Vec<SpannedToken>,
    pub(super) pos: usize,
}

impl<'a> Parser<'a> {
    /// Create a new parser from source.
    fn new(source: &'a str) -> ParseResult<Self> {
        let index = LineIndex::new(source);
        let mut tokens = Vec::new();

        for result in tokenize(source) {
            match result {
                Ok(t) => tokens.push(t),
                Err((span, message)) => {
                    return Err(ParseError::LexerError {
                        span: index.span(source, span.start, span.end),
                        message,
                    });
                }
            }
        }

        Ok(Self {
            source,
            index,
            tokens,
            pos: 0,
        })
    }

    /// Check if we've reached the end.
    pub(super) fn is_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Peek at the current token.
    pub(super) fn peek(&self) -> Option<&Token> {
        self.peek_nth(0)
    }

    /// Peek `n` tokens ahead.
    pub(super) fn peek_nth(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.pos + n).map(|t| &t.token)
    }

    /// Advance and return the current token.
    pub(super) fn advance(&mut self) -> Option<Token> {
        if self.is_eof() {
            return None;
        }
        let token = self.tokens[self.pos].token.clone();
        self.pos += 1;
        Some(token)
    }

    /// Span of the current token, or an empty span at the end of input.
    pub(super) fn current_span(&self) -> Span {
        match self.tokens.get(self.pos) {
            Some(t) => self.index.span(self.source, t.span.start, t.span.end),
            None => {
                let end = self.source.len();
                self.index.span(self.source, end, end)
            }
        }
    }

    /// Span of the most recently consumed token.
    pub(super) fn previous_span(&self) -> Span {
        match self.pos.checked_sub(1).and_then(|i| self.tokens.get(i)) {
            Some(t) => self.index.span(self.source, t.span.start, t.span.end),
            None => self.current_span(),
        }
    }

    /// Span from `start` through the most recently consumed token.
    pub(super) fn span_from(&self, start: Span) -> Span {
        start.to(self.previous_span())
    }

    /// Error describing what was expected at the current position.
    pub(super) fn unexpected(&self, expected: impl Into<String>) -> ParseError {
        let span = self.current_span();
        match self.peek() {
            Some(found) => ParseError::UnexpectedToken {
                span,
                expected: expected.into(),
                found: found.to_string(),
            },
            None => ParseError::UnexpectedEof {
                span,
                expected: expected.into(),
            },
        }
    }

    /// Expect a specific token and return its span.
    #[allow(clippy::needless_pass_by_value)]
    pub(super) fn expect(&mut self, expected: Token) -> ParseResult<Span> {
        if self.check(&expected) {
            self.advance();
            Ok(self.previous_span())
        } else {
            Err(self.unexpected(format!("'{expected}'")))
        }
    }

    /// Check if current token matches.
    pub(super) fn check(&self, token: &Token) -> bool {
        self.peek()
            .is_some_and(|t| std::mem::discriminant(t) == std::mem::discriminant(token))
    }

    /// Consume token if it matches.
    pub(super) fn consume(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Parse the entire program.
    fn parse_program(&mut self) -> ParseResult<Program> {
        let mut statements = Vec::new();
        while !self.is_eof() {
            statements.push(self.parse_statement()?);
        }
        Ok(Program { statements })
    }

    /// Parse an identifier.
    pub(super) fn parse_identifier(&mut self) -> ParseResult<String> {
        match self.peek() {
            Some(Token::Identifier(_)) => match self.advance() {
                Some(Token::Identifier(s)) => Ok(s),
                _ => Err(self.unexpected("identifier")),
            },
            _ => Err(self.unexpected("identifier")),
        }
    }

    /// Parse an integer literal.
    pub(super) fn parse_int_literal(&mut self) -> ParseResult<u64> {
        match self.peek() {
            Some(Token::IntLiteral(v)) => {
                let v = *v;
                self.advance();
                Ok(v)
            }
            _ => Err(self.unexpected("integer")),
        }
    }
}
