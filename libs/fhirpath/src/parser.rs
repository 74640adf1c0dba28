//! FHIRPath parser.
//!
//! Recursive descent following the operator precedence table (loosest to
//! tightest): `implies`, `or`, `xor`, `and`, membership (`in`/`contains`),
//! equality, inequality, union `|`, type (`is`/`as`), concatenation `&`,
//! additive, multiplicative, unary polarity, indexer/member access, term.

use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;

use crate::ast::{BinaryOp, Expression, Literal, TypeOpKind, TypeSpecifier, UnaryOp};
use crate::error::{Error, Result};
use crate::lexer::tokenize;
use crate::temporal;
use crate::token::{Token, TokenKind};
use crate::value::is_calendar_unit;

const MAX_PARSE_DEPTH: usize = 200;

/// Parse a source string into an expression tree.
pub fn parse(source: &str) -> Result<Expression> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        position: 0,
        depth: 0,
    };
    let expr = parser.parse_expression()?;
    parser.expect_eof()?;
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    position: usize,
    depth: usize,
}

impl Parser {
    fn current(&self) -> &Token {
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    fn kind(&self) -> TokenKind {
        self.current().kind
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.position < self.tokens.len() - 1 {
            self.position += 1;
        }
        token
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.kind() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error_at(&self, message: impl Into<String>) -> Error {
        let span = self.current().span;
        Error::Parse {
            line: span.line,
            column: span.column,
            message: message.into(),
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token> {
        if self.kind() == kind {
            Ok(self.advance())
        } else {
            Err(self.error_at(format!("expected {what}, found '{}'", self.describe_current())))
        }
    }

    fn expect_eof(&self) -> Result<()> {
        if self.kind() == TokenKind::Eof {
            Ok(())
        } else {
            Err(self.error_at(format!("unexpected '{}'", self.describe_current())))
        }
    }

    fn describe_current(&self) -> String {
        let token = self.current();
        if token.kind == TokenKind::Eof {
            "end of input".to_string()
        } else {
            token.text.clone()
        }
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_PARSE_DEPTH {
            return Err(self.error_at(format!(
                "expression too deeply nested (max depth {MAX_PARSE_DEPTH})"
            )));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn parse_expression(&mut self) -> Result<Expression> {
        self.enter()?;
        let expr = self.parse_implies();
        self.leave();
        expr
    }

    fn parse_implies(&mut self) -> Result<Expression> {
        let mut left = self.parse_or()?;
        while self.eat(TokenKind::Implies) {
            let right = self.parse_or()?;
            left = binary(BinaryOp::Implies, left, right);
        }
        Ok(left)
    }

    fn parse_or(&mut self) -> Result<Expression> {
        let mut left = self.parse_xor()?;
        while self.eat(TokenKind::Or) {
            let right = self.parse_xor()?;
            left = binary(BinaryOp::Or, left, right);
        }
        Ok(left)
    }

    fn parse_xor(&mut self) -> Result<Expression> {
        let mut left = self.parse_and()?;
        while self.eat(TokenKind::Xor) {
            let right = self.parse_and()?;
            left = binary(BinaryOp::Xor, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expression> {
        let mut left = self.parse_membership()?;
        while self.eat(TokenKind::And) {
            let right = self.parse_membership()?;
            left = binary(BinaryOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_membership(&mut self) -> Result<Expression> {
        let mut left = self.parse_equality()?;
        loop {
            let op = match self.kind() {
                TokenKind::In => BinaryOp::In,
                TokenKind::Contains => BinaryOp::Contains,
                _ => break,
            };
            self.advance();
            let right = self.parse_equality()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expression> {
        let mut left = self.parse_inequality()?;
        loop {
            let op = match self.kind() {
                TokenKind::Equal => BinaryOp::Equal,
                TokenKind::NotEqual => BinaryOp::NotEqual,
                TokenKind::Equivalent => BinaryOp::Equivalent,
                TokenKind::NotEquivalent => BinaryOp::NotEquivalent,
                _ => break,
            };
            self.advance();
            let right = self.parse_inequality()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_inequality(&mut self) -> Result<Expression> {
        let mut left = self.parse_union()?;
        loop {
            let op = match self.kind() {
                TokenKind::Less => BinaryOp::Less,
                TokenKind::LessEqual => BinaryOp::LessEqual,
                TokenKind::Greater => BinaryOp::Greater,
                TokenKind::GreaterEqual => BinaryOp::GreaterEqual,
                _ => break,
            };
            self.advance();
            let right = self.parse_union()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_union(&mut self) -> Result<Expression> {
        let mut left = self.parse_type()?;
        while self.eat(TokenKind::Pipe) {
            let right = self.parse_type()?;
            left = binary(BinaryOp::Union, left, right);
        }
        Ok(left)
    }

    fn parse_type(&mut self) -> Result<Expression> {
        let mut left = self.parse_concat()?;
        loop {
            let op = match self.kind() {
                TokenKind::Is => TypeOpKind::Is,
                TokenKind::As => TypeOpKind::As,
                _ => break,
            };
            self.advance();
            let specifier = self.parse_type_specifier()?;
            left = Expression::TypeOp {
                op,
                operand: Box::new(left),
                specifier,
            };
        }
        Ok(left)
    }

    fn parse_concat(&mut self) -> Result<Expression> {
        let mut left = self.parse_additive()?;
        while self.eat(TokenKind::Ampersand) {
            let right = self.parse_additive()?;
            left = binary(BinaryOp::Concat, left, right);
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expression> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.kind() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expression> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.kind() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Div => BinaryOp::IntDiv,
                TokenKind::Mod => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expression> {
        let op = match self.kind() {
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Minus => UnaryOp::Minus,
            _ => return self.parse_postfix(),
        };
        self.advance();

        // Fold a directly following number into a signed literal (including
        // quantity literals) so `-5.abs()` and `-3 'mg'` parse as units.
        if matches!(self.kind(), TokenKind::Number | TokenKind::LongNumber) {
            let literal = self.parse_number_literal(op == UnaryOp::Minus)?;
            return self.parse_postfix_from(Expression::Literal(literal));
        }

        self.enter()?;
        let operand = self.parse_unary()?;
        self.leave();
        Ok(Expression::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_postfix(&mut self) -> Result<Expression> {
        let term = self.parse_term()?;
        self.parse_postfix_from(term)
    }

    fn parse_postfix_from(&mut self, mut expr: Expression) -> Result<Expression> {
        loop {
            if self.eat(TokenKind::Dot) {
                let member = self.parse_invocation()?;
                expr = Expression::Member {
                    target: Box::new(expr),
                    member: Box::new(member),
                };
            } else if self.eat(TokenKind::OpenBracket) {
                let index = self.parse_expression()?;
                self.expect(TokenKind::CloseBracket, "']'")?;
                expr = Expression::Indexer {
                    target: Box::new(expr),
                    index: Box::new(index),
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_term(&mut self) -> Result<Expression> {
        match self.kind() {
            TokenKind::OpenParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(TokenKind::CloseParen, "')'")?;
                Ok(expr)
            }
            TokenKind::EnvVariable => {
                let token = self.advance();
                Ok(Expression::EnvVariable(Arc::from(token.text)))
            }
            TokenKind::This => {
                self.advance();
                Ok(Expression::This)
            }
            TokenKind::Index => {
                self.advance();
                Ok(Expression::IndexVar)
            }
            TokenKind::Total => {
                self.advance();
                Ok(Expression::TotalVar)
            }
            TokenKind::True => {
                self.advance();
                Ok(Expression::Literal(Literal::Boolean(true)))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expression::Literal(Literal::Boolean(false)))
            }
            TokenKind::String => {
                let token = self.advance();
                Ok(Expression::Literal(Literal::String(Arc::from(token.text))))
            }
            TokenKind::Number | TokenKind::LongNumber => {
                let literal = self.parse_number_literal(false)?;
                Ok(Expression::Literal(literal))
            }
            TokenKind::Date => {
                let token = self.advance();
                let (value, precision) =
                    temporal::parse_date_parts(&token.text).ok_or_else(|| Error::Parse {
                        line: token.span.line,
                        column: token.span.column,
                        message: format!("invalid date literal '@{}'", token.text),
                    })?;
                Ok(Expression::Literal(Literal::Date(value, precision)))
            }
            TokenKind::DateTime => {
                let token = self.advance();
                let (value, precision, tz) = temporal::parse_datetime_parts(&token.text)
                    .ok_or_else(|| Error::Parse {
                        line: token.span.line,
                        column: token.span.column,
                        message: format!("invalid datetime literal '@{}'", token.text),
                    })?;
                Ok(Expression::Literal(Literal::DateTime(value, precision, tz)))
            }
            TokenKind::Time => {
                let token = self.advance();
                let (value, precision) =
                    temporal::parse_time_parts(&token.text).ok_or_else(|| Error::Parse {
                        line: token.span.line,
                        column: token.span.column,
                        message: format!("invalid time literal '@T{}'", token.text),
                    })?;
                Ok(Expression::Literal(Literal::Time(value, precision)))
            }
            TokenKind::OpenBrace => {
                self.advance();
                if self.eat(TokenKind::CloseBrace) {
                    return Ok(Expression::Literal(Literal::Empty));
                }
                let mut elements = Vec::new();
                loop {
                    elements.push(self.parse_expression()?);
                    if self.eat(TokenKind::Comma) {
                        continue;
                    }
                    self.expect(TokenKind::CloseBrace, "',' or '}'")?;
                    break;
                }
                Ok(Expression::Collection(elements))
            }
            _ => self.parse_invocation(),
        }
    }

    /// An invocation: identifier, function call, or special variable. Keyword
    /// operators double as function names (`contains()`, `is()`, ...).
    fn parse_invocation(&mut self) -> Result<Expression> {
        match self.kind() {
            TokenKind::This => {
                self.advance();
                return Ok(Expression::This);
            }
            TokenKind::Index => {
                self.advance();
                return Ok(Expression::IndexVar);
            }
            TokenKind::Total => {
                self.advance();
                return Ok(Expression::TotalVar);
            }
            TokenKind::Identifier
            | TokenKind::DelimitedIdentifier
            | TokenKind::Contains
            | TokenKind::In
            | TokenKind::As
            | TokenKind::Is
            | TokenKind::Div
            | TokenKind::Mod => {}
            _ => {
                return Err(self.error_at(format!(
                    "expected identifier or function, found '{}'",
                    self.describe_current()
                )));
            }
        }

        let token = self.advance();
        let name: Arc<str> = Arc::from(token.text);

        if !self.eat(TokenKind::OpenParen) {
            return Ok(Expression::Identifier(name));
        }

        let mut args = Vec::new();
        if self.kind() != TokenKind::CloseParen {
            loop {
                args.push(self.parse_expression()?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::CloseParen, "')'")?;
        Ok(Expression::Function { name, args })
    }

    fn parse_number_literal(&mut self, negate: bool) -> Result<Literal> {
        let token = self.advance();
        let is_long = token.kind == TokenKind::LongNumber;
        let digits = token.text.trim_end_matches('L');
        let text = if negate {
            format!("-{digits}")
        } else {
            digits.to_string()
        };

        let number_error = |message: String| Error::Parse {
            line: token.span.line,
            column: token.span.column,
            message,
        };

        // A quantity literal is a number followed by a unit string or a
        // calendar duration keyword.
        if let Some(unit) = self.try_parse_unit() {
            let value = Decimal::from_str(&text)
                .map_err(|e| number_error(format!("invalid number: {e}")))?;
            return Ok(Literal::Quantity {
                value,
                unit: Arc::from(unit),
            });
        }

        if !is_long && text.contains('.') {
            let value = Decimal::from_str(&text)
                .map_err(|e| number_error(format!("invalid number: {e}")))?;
            Ok(Literal::Decimal(value))
        } else {
            let value = i64::from_str(&text)
                .map_err(|e| number_error(format!("invalid integer: {e}")))?;
            Ok(Literal::Integer(value))
        }
    }

    fn try_parse_unit(&mut self) -> Option<String> {
        match self.kind() {
            TokenKind::String => Some(self.advance().text),
            TokenKind::Identifier if is_calendar_unit(&self.current().text) => {
                Some(self.advance().text)
            }
            _ => None,
        }
    }

    fn parse_type_specifier(&mut self) -> Result<TypeSpecifier> {
        let mut parts = Vec::new();
        let first = self.expect_type_segment()?;
        parts.push(first);
        while self.eat(TokenKind::Dot) {
            parts.push(self.expect_type_segment()?);
        }
        Ok(TypeSpecifier::new(parts))
    }

    fn expect_type_segment(&mut self) -> Result<Arc<str>> {
        match self.kind() {
            TokenKind::Identifier | TokenKind::DelimitedIdentifier => {
                Ok(Arc::from(self.advance().text))
            }
            _ => Err(self.error_at(format!(
                "expected type name, found '{}'",
                self.describe_current()
            ))),
        }
    }
}

fn binary(op: BinaryOp, left: Expression, right: Expression) -> Expression {
    Expression::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}
