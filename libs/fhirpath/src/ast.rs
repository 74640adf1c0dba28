//! Abstract syntax tree for FHIRPath expressions.
//!
//! The tree is immutable after parsing and freely shareable across threads
//! (`compile` hands out `Arc<Expression>`). Operator nodes are grouped into a
//! single `Binary` kind carrying an operator tag; the parser alone is
//! responsible for precedence.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use rust_decimal::Decimal;

use crate::value::{DatePrecision, DateTimePrecision, TimePrecision};

/// A parsed FHIRPath expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// A literal value, including the empty collection `{}`.
    Literal(Literal),

    /// `{e1, e2, ...}` — evaluates each element and concatenates.
    Collection(Vec<Expression>),

    /// A bare name: the root type (absorbed), a field access, or — as a
    /// function argument — a type specifier.
    Identifier(Arc<str>),

    /// `%name` external constant.
    EnvVariable(Arc<str>),

    /// `$this`, `$index`, `$total` — resolved against the nearest lambda frame.
    This,
    IndexVar,
    TotalVar,

    /// `target.member` — member is evaluated with focus = target's result.
    Member {
        target: Box<Expression>,
        member: Box<Expression>,
    },

    /// `target[index]`.
    Indexer {
        target: Box<Expression>,
        index: Box<Expression>,
    },

    /// `name(args...)` applied to the current focus.
    Function {
        name: Arc<str>,
        args: Vec<Expression>,
    },

    /// Unary `+`/`-`.
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
    },

    /// All infix operators of the precedence table.
    Binary {
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },

    /// `expr is Type` / `expr as Type`. The specifier is never evaluated.
    TypeOp {
        op: TypeOpKind,
        operand: Box<Expression>,
        specifier: TypeSpecifier,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// `{}`
    Empty,
    Boolean(bool),
    Integer(i64),
    Decimal(Decimal),
    String(Arc<str>),
    Date(NaiveDate, DatePrecision),
    /// Instant, precision, and the literal's timezone offset in seconds east
    /// of UTC (`None` when the literal carried no timezone).
    DateTime(DateTime<FixedOffset>, DateTimePrecision, Option<i32>),
    Time(NaiveTime, TimePrecision),
    Quantity { value: Decimal, unit: Arc<str> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    // Multiplicative
    Mul,
    Div,
    IntDiv,
    Mod,
    // Additive
    Add,
    Sub,
    // Null-safe string concatenation
    Concat,
    // Collection union
    Union,
    // Inequality
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    // Equality
    Equal,
    NotEqual,
    Equivalent,
    NotEquivalent,
    // Membership
    In,
    Contains,
    // Boolean
    And,
    Or,
    Xor,
    Implies,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::IntDiv => "div",
            BinaryOp::Mod => "mod",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Concat => "&",
            BinaryOp::Union => "|",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::Equal => "=",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Equivalent => "~",
            BinaryOp::NotEquivalent => "!~",
            BinaryOp::In => "in",
            BinaryOp::Contains => "contains",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Xor => "xor",
            BinaryOp::Implies => "implies",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeOpKind {
    Is,
    As,
}

/// A (possibly qualified) type name: `Patient`, `System.Integer`, `FHIR.code`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSpecifier {
    pub parts: Vec<Arc<str>>,
}

impl TypeSpecifier {
    pub fn new(parts: Vec<Arc<str>>) -> Self {
        Self { parts }
    }

    pub fn single(name: impl Into<Arc<str>>) -> Self {
        Self {
            parts: vec![name.into()],
        }
    }

    /// The unqualified type name (last segment).
    pub fn name(&self) -> &str {
        self.parts.last().map(|p| p.as_ref()).unwrap_or("")
    }

    /// The namespace qualifier, if present (`System` in `System.Integer`).
    pub fn qualifier(&self) -> Option<&str> {
        if self.parts.len() >= 2 {
            Some(self.parts[0].as_ref())
        } else {
            None
        }
    }
}

impl std::fmt::Display for TypeSpecifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for part in &self.parts {
            if !first {
                f.write_str(".")?;
            }
            f.write_str(part)?;
            first = false;
        }
        Ok(())
    }
}
