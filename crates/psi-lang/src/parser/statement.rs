//! Statement parsing for PsiScript.

use super::Parser;
use crate::ast::{ArgValue, Argument, Branch, Call, Statement, StatementKind, WireRef};
use crate::error::{ParseError, ParseResult};
use crate::lexer::Token;

impl Parser<'_> {
    /// Parse a statement.
    pub(super) fn parse_statement(&mut self) -> ParseResult<Statement> {
        let start = self.current_span();
        let kind = match self.peek() {
            Some(Token::Let) => self.parse_let()?,
            Some(Token::Analog) => self.parse_analog()?,
            Some(Token::Align) => self.parse_align()?,
            Some(Token::If) => self.parse_if()?,
            Some(Token::For) => self.parse_for()?,
            Some(Token::Repeat) => self.parse_repeat()?,
            Some(Token::Identifier(_)) => {
                let call = self.parse_call(None)?;
                self.expect(Token::Semicolon)?;
                StatementKind::Call(call)
            }
            _ => return Err(self.unexpected("statement")),
        };
        Ok(Statement {
            kind,
            span: self.span_from(start),
        })
    }

    /// Parse `let name = Register(n);` or `let name = <call>;`.
    fn parse_let(&mut self) -> ParseResult<StatementKind> {
        self.expect(Token::Let)?;
        let name = self.parse_identifier()?;
        self.expect(Token::Eq)?;

        let is_register = matches!(self.peek(), Some(Token::Identifier(s)) if s == "Register")
            && matches!(self.peek_nth(1), Some(Token::LParen));
        if is_register {
            self.advance();
            self.expect(Token::LParen)?;
            let size = self.parse_int_literal()?;
            self.expect(Token::RParen)?;
            self.expect(Token::Semicolon)?;
            return Ok(StatementKind::Register { name, size });
        }

        let call = self.parse_call(Some(name))?;
        self.expect(Token::Semicolon)?;
        Ok(StatementKind::Call(call))
    }

    /// Parse `Name(args)` or `receiver.Name(args)`.
    fn parse_call(&mut self, binding: Option<String>) -> ParseResult<Call> {
        let start = self.current_span();
        let first = self.parse_identifier()?;
        let (receiver, name) = if self.consume(&Token::Dot) {
            (Some(first), self.parse_identifier()?)
        } else {
            (None, first)
        };

        self.expect(Token::LParen)?;
        let args = self.parse_arguments()?;
        self.expect(Token::RParen)?;

        Ok(Call {
            binding,
            receiver,
            name,
            args,
            span: self.span_from(start),
        })
    }

    /// Parse a comma-separated argument list up to `)`.
    fn parse_arguments(&mut self) -> ParseResult<Vec<Argument>> {
        let mut args = vec![];
        while !self.check(&Token::RParen) {
            args.push(self.parse_argument()?);
            if !self.consume(&Token::Comma) {
                break;
            }
        }
        Ok(args)
    }

    /// Parse `name: value` or a positional value.
    fn parse_argument(&mut self) -> ParseResult<Argument> {
        let start = self.current_span();
        let named = matches!(self.peek(), Some(Token::Identifier(_)))
            && matches!(self.peek_nth(1), Some(Token::Colon));

        let name = if named {
            let name = self.parse_identifier()?;
            self.expect(Token::Colon)?;
            Some(name)
        } else {
            None
        };

        let value = if name.as_deref() == Some("where") {
            ArgValue::Predicate(self.parse_predicate()?)
        } else {
            ArgValue::Expr(self.parse_expression()?)
        };

        Ok(Argument {
            name,
            value,
            span: self.span_from(start),
        })
    }

    /// Parse `register[index]`.
    pub(super) fn parse_wire_ref(&mut self) -> ParseResult<WireRef> {
        let start = self.current_span();
        let register = self.parse_identifier()?;
        self.expect(Token::LBracket)?;
        let index = self.parse_expression()?;
        self.expect(Token::RBracket)?;
        Ok(WireRef {
            register,
            index,
            span: self.span_from(start),
        })
    }

    /// Parse `{ statements }`.
    fn parse_block(&mut self) -> ParseResult<Vec<Statement>> {
        self.expect(Token::LBrace)?;
        let mut body = vec![];
        while !self.check(&Token::RBrace) {
            if self.is_eof() {
                return Err(self.unexpected("'}'"));
            }
            body.push(self.parse_statement()?);
        }
        self.expect(Token::RBrace)?;
        Ok(body)
    }

    /// Parse `Analog(target: w) { ... }`.
    fn parse_analog(&mut self) -> ParseResult<StatementKind> {
        self.expect(Token::Analog)?;
        self.expect(Token::LParen)?;
        let named = matches!(self.peek(), Some(Token::Identifier(s)) if s == "target")
            && matches!(self.peek_nth(1), Some(Token::Colon));
        if named {
            self.advance();
            self.advance();
        }
        let target = self.parse_wire_ref()?;
        self.expect(Token::RParen)?;
        let body = self.parse_block()?;
        Ok(StatementKind::Analog { target, body })
    }

    /// Parse `Align { branch w { ... } ... }`.
    fn parse_align(&mut self) -> ParseResult<StatementKind> {
        let start = self.expect(Token::Align)?;
        self.expect(Token::LBrace)?;
        let mut branches = vec![];
        while self.check(&Token::Branch) {
            let branch_start = self.current_span();
            self.advance();
            let target = self.parse_wire_ref()?;
            let body = self.parse_block()?;
            branches.push(Branch {
                target,
                body,
                span: self.span_from(branch_start),
            });
        }
        self.expect(Token::RBrace)?;
        if branches.is_empty() {
            return Err(ParseError::Invalid {
                span: self.span_from(start),
                message: "Align block needs at least one branch".into(),
            });
        }
        Ok(StatementKind::Align { branches })
    }

    /// Parse `if cond { ... } else { ... }`.
    fn parse_if(&mut self) -> ParseResult<StatementKind> {
        self.expect(Token::If)?;
        let condition = self.parse_expression()?;
        let then_body = self.parse_block()?;
        let else_body = if self.consume(&Token::Else) {
            if self.check(&Token::If) {
                Some(vec![self.parse_statement()?])
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };
        Ok(StatementKind::If {
            condition,
            then_body,
            else_body,
        })
    }

    /// Parse `for i in a..b { ... }`.
    fn parse_for(&mut self) -> ParseResult<StatementKind> {
        self.expect(Token::For)?;
        let var = self.parse_identifier()?;
        self.expect(Token::In)?;
        let start = self.parse_expression()?;
        self.expect(Token::DotDot)?;
        let end = self.parse_expression()?;
        let body = self.parse_block()?;
        Ok(StatementKind::For {
            var,
            start,
            end,
            body,
        })
    }

    /// Parse `repeat(n) { ... }`.
    fn parse_repeat(&mut self) -> ParseResult<StatementKind> {
        self.expect(Token::Repeat)?;
        let count = self.parse_expression()?;
        let body = self.parse_block()?;
        Ok(StatementKind::Repeat { count, body })
    }
}
