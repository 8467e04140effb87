//! Expression and predicate parsing for PsiScript.

use super::Parser;
use crate::ast::{BinOp, Expression, Predicate, WireRef};
use crate::error::{ParseError, ParseResult};
use crate::lexer::Token;

/// Get operator precedence (higher = binds tighter).
fn op_precedence(op: BinOp) -> u8 {
    match op {
        BinOp::Or => 1,
        BinOp::And => 2,
        BinOp::Eq | BinOp::Ne => 3,
        BinOp::Add | BinOp::Sub => 4,
        BinOp::Mul | BinOp::Div => 5,
    }
}

impl Parser<'_> {
    /// Parse an expression.
    pub(super) fn parse_expression(&mut self) -> ParseResult<Expression> {
        self.parse_binary_expr(0)
    }

    /// Parse binary expression with precedence climbing.
    fn parse_binary_expr(&mut self, min_prec: u8) -> ParseResult<Expression> {
        let mut left = self.parse_unary_expr()?;

        while let Some(op) = self.peek_binary_op() {
            let prec = op_precedence(op);
            if prec < min_prec {
                break;
            }
            self.advance();

            let right = self.parse_binary_expr(prec + 1)?;
            left = Expression::BinOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// Parse unary expression.
    fn parse_unary_expr(&mut self) -> ParseResult<Expression> {
        if self.consume(&Token::Minus) {
            let expr = self.parse_unary_expr()?;
            return Ok(Expression::Neg(Box::new(expr)));
        }
        if self.consume(&Token::Not) {
            let expr = self.parse_unary_expr()?;
            return Ok(Expression::Not(Box::new(expr)));
        }
        self.parse_primary_expr()
    }

    /// Parse primary expression.
    fn parse_primary_expr(&mut self) -> ParseResult<Expression> {
        let Some(token) = self.peek().cloned() else {
            return Err(self.unexpected("expression"));
        };

        let expr = match token {
            Token::IntLiteral(v) => Expression::Int(v),
            Token::FloatLiteral(v) => Expression::Float(v),
            Token::Duration(v) => Expression::Duration(v),
            Token::StringLiteral(s) => Expression::Str(s),
            Token::Pi => Expression::Pi,
            Token::Tau => Expression::Tau,
            Token::True => Expression::Bool(true),
            Token::False => Expression::Bool(false),
            Token::Identifier(name) => {
                self.advance();
                return self.parse_identifier_suffix(name);
            }
            Token::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(Token::RParen)?;
                return Ok(Expression::Paren(Box::new(expr)));
            }
            Token::LBracket => {
                self.advance();
                let mut items = vec![];
                while !self.check(&Token::RBracket) {
                    items.push(self.parse_expression()?);
                    if !self.consume(&Token::Comma) {
                        break;
                    }
                }
                self.expect(Token::RBracket)?;
                return Ok(Expression::List(items));
            }
            _ => return Err(self.unexpected("expression")),
        };
        self.advance();
        Ok(expr)
    }

    /// Parse what may follow an identifier: `[i]`, `.member` or `(args)`.
    fn parse_identifier_suffix(&mut self, name: String) -> ParseResult<Expression> {
        if self.consume(&Token::LBracket) {
            let index = self.parse_expression()?;
            self.expect(Token::RBracket)?;
            return Ok(Expression::Index {
                base: name,
                index: Box::new(index),
            });
        }
        if self.consume(&Token::Dot) {
            let member = self.parse_identifier()?;
            return Ok(Expression::Member { base: name, member });
        }
        if self.consume(&Token::LParen) {
            let mut args = vec![];
            while !self.check(&Token::RParen) {
                let named = matches!(self.peek(), Some(Token::Identifier(_)))
                    && matches!(self.peek_nth(1), Some(Token::Colon));
                let arg_name = if named {
                    let arg_name = self.parse_identifier()?;
                    self.expect(Token::Colon)?;
                    Some(arg_name)
                } else {
                    None
                };
                args.push((arg_name, self.parse_expression()?));
                if !self.consume(&Token::Comma) {
                    break;
                }
            }
            self.expect(Token::RParen)?;
            return Ok(Expression::Call { name, args });
        }
        Ok(Expression::Identifier(name))
    }

    /// Peek at binary operator.
    fn peek_binary_op(&self) -> Option<BinOp> {
        match self.peek()? {
            Token::Plus => Some(BinOp::Add),
            Token::Minus => Some(BinOp::Sub),
            Token::Star => Some(BinOp::Mul),
            Token::Slash => Some(BinOp::Div),
            Token::EqEq => Some(BinOp::Eq),
            Token::NotEq => Some(BinOp::Ne),
            Token::AndAnd => Some(BinOp::And),
            Token::OrOr => Some(BinOp::Or),
            _ => None,
        }
    }

    // =========================================================================
    // Quantum predicates
    // =========================================================================

    /// Parse a `where:` predicate.
    pub(super) fn parse_predicate(&mut self) -> ParseResult<Predicate<WireRef>> {
        let mut left = self.parse_predicate_and()?;
        while self.consume(&Token::OrOr) {
            let right = self.parse_predicate_and()?;
            left = left.or(right);
        }
        Ok(left)
    }

    fn parse_predicate_and(&mut self) -> ParseResult<Predicate<WireRef>> {
        let mut left = self.parse_predicate_unary()?;
        while self.consume(&Token::AndAnd) {
            let right = self.parse_predicate_unary()?;
            left = left.and(right);
        }
        Ok(left)
    }

    fn parse_predicate_unary(&mut self) -> ParseResult<Predicate<WireRef>> {
        if self.consume(&Token::Not) {
            return Ok(self.parse_predicate_unary()?.negate());
        }
        if self.consume(&Token::LParen) {
            let inner = self.parse_predicate()?;
            self.expect(Token::RParen)?;
            return Ok(inner);
        }

        let wire = self.parse_wire_ref()?;
        if self.consume(&Token::EqEq) {
            let value = self.parse_bit_value()?;
            Ok(Predicate::literal(wire, value))
        } else if self.consume(&Token::NotEq) {
            let value = self.parse_bit_value()?;
            Ok(Predicate::literal(wire, value).negate())
        } else {
            // A bare wire reference tests for |1⟩.
            Ok(Predicate::literal(wire, true))
        }
    }

    /// Parse the right-hand side of a predicate literal: 0, 1, true, false.
    fn parse_bit_value(&mut self) -> ParseResult<bool> {
        let value = match self.peek() {
            Some(Token::IntLiteral(0) | Token::False) => false,
            Some(Token::IntLiteral(1) | Token::True) => true,
            Some(Token::IntLiteral(_)) => {
                return Err(ParseError::Invalid {
                    span: self.current_span(),
                    message: "wire literals compare against 0 or 1".into(),
                });
            }
            _ => return Err(self.unexpected("0 or 1")),
        };
        self.advance();
        Ok(value)
    }
}
