//! The tree-walking evaluator.
//!
//! Walks an [`Expression`] with an implicit focus collection threaded through
//! member access. Every node entry polls the cancellation flag and the
//! wall-clock deadline, guards recursion depth, and bounds intermediate
//! collection sizes.

use std::cmp::Ordering;
use std::sync::atomic::Ordering as AtomicOrdering;
use std::time::Instant;

use crate::ast::{BinaryOp, Expression, Literal, TypeOpKind, TypeSpecifier, UnaryOp};
use crate::collection::Collection;
use crate::context::EvalContext;
use crate::error::{Error, Result};
use crate::functions;
use crate::operators;
use crate::value::Value;

/// A lambda frame binding `$this`, `$index`, and `$total`.
pub(crate) struct Frame {
    pub this: Collection,
    pub index: Option<i64>,
    pub total: Option<Collection>,
}

/// One evaluation pass over an expression tree.
pub struct Evaluator<'a> {
    ctx: &'a EvalContext,
    frames: Vec<Frame>,
    depth: usize,
}

impl<'a> Evaluator<'a> {
    pub fn new(ctx: &'a EvalContext) -> Self {
        Self {
            ctx,
            frames: Vec::new(),
            depth: 0,
        }
    }

    /// Evaluate against the context's root resource.
    pub fn evaluate(&mut self, expr: &Expression) -> Result<Collection> {
        let focus = self.ctx.root().clone();
        self.eval(expr, &focus)
    }

    pub(crate) fn ctx(&self) -> &EvalContext {
        self.ctx
    }

    /// Poll cancellation and the deadline; called at every node entry and
    /// inside long-running loops.
    pub(crate) fn tick(&self) -> Result<()> {
        if let Some(cancel) = &self.ctx.cancel {
            if cancel.load(AtomicOrdering::Relaxed) {
                return Err(Error::Cancelled);
            }
        }
        if Instant::now() > self.ctx.deadline {
            return Err(Error::Timeout);
        }
        Ok(())
    }

    pub(crate) fn check_size(&self, collection: &Collection) -> Result<()> {
        if collection.len() > self.ctx.limits.max_collection_size {
            return Err(Error::SizeExceeded(self.ctx.limits.max_collection_size));
        }
        Ok(())
    }

    /// Evaluate a lambda body with `$this`/`$index`/`$total` rebound.
    pub(crate) fn eval_lambda(
        &mut self,
        body: &Expression,
        this: Value,
        index: Option<i64>,
        total: Option<Collection>,
    ) -> Result<Collection> {
        let focus = Collection::singleton(this);
        self.frames.push(Frame {
            this: focus.clone(),
            index,
            total,
        });
        let result = self.eval(body, &focus);
        self.frames.pop();
        result
    }

    /// Evaluate `expr` with the given focus.
    pub(crate) fn eval(&mut self, expr: &Expression, focus: &Collection) -> Result<Collection> {
        self.tick()?;
        self.depth += 1;
        if self.depth > self.ctx.limits.max_depth {
            self.depth -= 1;
            return Err(Error::DepthExceeded(self.ctx.limits.max_depth));
        }
        let result = self.eval_inner(expr, focus);
        self.depth -= 1;
        if let Ok(collection) = &result {
            self.check_size(collection)?;
        }
        result
    }

    fn eval_inner(&mut self, expr: &Expression, focus: &Collection) -> Result<Collection> {
        match expr {
            Expression::Literal(literal) => Ok(eval_literal(literal)),

            Expression::Collection(elements) => {
                let mut out = Collection::empty();
                for element in elements {
                    out.extend(self.eval(element, focus)?);
                    self.check_size(&out)?;
                }
                Ok(out)
            }

            // A bare identifier in first-step position: absorbed when it
            // names the root's inferred type, a field access otherwise.
            Expression::Identifier(name) => {
                if name.as_ref() == self.ctx.root_type() {
                    Ok(focus.clone())
                } else {
                    self.eval_field_access(name, focus)
                }
            }

            Expression::EnvVariable(name) => self
                .ctx
                .variable(name)
                .cloned()
                .ok_or_else(|| Error::UndefinedVariable(name.to_string())),

            Expression::This => Ok(self
                .frames
                .last()
                .map(|frame| frame.this.clone())
                .unwrap_or_else(|| focus.clone())),

            Expression::IndexVar => Ok(self
                .frames
                .last()
                .and_then(|frame| frame.index)
                .map(|i| Collection::singleton(Value::integer(i)))
                .unwrap_or_else(Collection::empty)),

            Expression::TotalVar => Ok(self
                .frames
                .last()
                .and_then(|frame| frame.total.clone())
                .unwrap_or_else(Collection::empty)),

            Expression::Member { target, member } => {
                let inner = self.eval(target, focus)?;
                // Only the first step of a chain may absorb the root type;
                // an identifier to the right of `.` is always a field access.
                match member.as_ref() {
                    Expression::Identifier(name) => self.eval_field_access(name, &inner),
                    other => self.eval(other, &inner),
                }
            }

            Expression::Indexer { target, index } => {
                let collection = self.eval(target, focus)?;
                let index = self.eval(index, focus)?;
                let Some(Value::Integer(i)) = index.singleton_value() else {
                    return Ok(Collection::empty());
                };
                if *i < 0 {
                    return Ok(Collection::empty());
                }
                Ok(collection
                    .get(*i as usize)
                    .cloned()
                    .map(Collection::singleton)
                    .unwrap_or_else(Collection::empty))
            }

            Expression::Function { name, args } => functions::invoke(self, name, args, focus),

            Expression::Unary { op, operand } => {
                let operand = self.eval(operand, focus)?;
                let Some(value) = operand.singleton_value() else {
                    return Ok(Collection::empty());
                };
                match op {
                    UnaryOp::Plus => match value {
                        Value::Integer(_) | Value::Decimal(_) | Value::Quantity { .. } => {
                            Ok(Collection::singleton(value.clone()))
                        }
                        other => Err(Error::type_mismatch(
                            "unary +",
                            "Integer, Decimal, or Quantity",
                            other.type_name(),
                        )),
                    },
                    UnaryOp::Minus => Ok(operators::negate_value(value)?
                        .map(Collection::singleton)
                        .unwrap_or_else(Collection::empty)),
                }
            }

            Expression::Binary { op, left, right } => self.eval_binary(*op, left, right, focus),

            Expression::TypeOp {
                op,
                operand,
                specifier,
            } => {
                let operand = self.eval(operand, focus)?;
                match op {
                    TypeOpKind::Is => {
                        let Some(value) = operand.singleton_value() else {
                            return Ok(Collection::empty());
                        };
                        Ok(Collection::singleton(Value::boolean(matches_type(
                            value, specifier,
                        ))))
                    }
                    // `as` filters: elements whose inferred type matches.
                    TypeOpKind::As => Ok(operand
                        .iter()
                        .filter(|value| matches_type(value, specifier))
                        .cloned()
                        .collect()),
                }
            }
        }
    }

    /// Literal field access: read `name` from each object in the focus,
    /// splicing arrays. Absent fields contribute nothing.
    fn eval_field_access(&mut self, name: &str, focus: &Collection) -> Result<Collection> {
        self.tick()?;
        let mut out = Collection::empty();
        for item in focus.iter() {
            if let Value::Object(obj) = item {
                out.extend(obj.get(name));
                self.check_size(&out)?;
            }
        }
        Ok(out)
    }

    fn eval_binary(
        &mut self,
        op: BinaryOp,
        left: &Expression,
        right: &Expression,
        focus: &Collection,
    ) -> Result<Collection> {
        use BinaryOp::*;

        match op {
            // Boolean operators evaluate lazily so the short-circuits hold
            // regardless of errors or cost on the other side.
            And => {
                let lhs = self.eval(left, focus)?;
                let lhs = operators::boolean_operand(&lhs, "and")?;
                if lhs == Some(false) {
                    return Ok(Collection::singleton(Value::boolean(false)));
                }
                let rhs = self.eval(right, focus)?;
                let rhs = operators::boolean_operand(&rhs, "and")?;
                Ok(boolean_result(operators::three_valued_and(lhs, rhs)))
            }
            Or => {
                let lhs = self.eval(left, focus)?;
                let lhs = operators::boolean_operand(&lhs, "or")?;
                if lhs == Some(true) {
                    return Ok(Collection::singleton(Value::boolean(true)));
                }
                let rhs = self.eval(right, focus)?;
                let rhs = operators::boolean_operand(&rhs, "or")?;
                Ok(boolean_result(operators::three_valued_or(lhs, rhs)))
            }
            Xor => {
                let lhs = self.eval(left, focus)?;
                let lhs = operators::boolean_operand(&lhs, "xor")?;
                let rhs = self.eval(right, focus)?;
                let rhs = operators::boolean_operand(&rhs, "xor")?;
                Ok(boolean_result(operators::three_valued_xor(lhs, rhs)))
            }
            Implies => {
                let lhs = self.eval(left, focus)?;
                let lhs = operators::boolean_operand(&lhs, "implies")?;
                if lhs == Some(false) {
                    return Ok(Collection::singleton(Value::boolean(true)));
                }
                let rhs = self.eval(right, focus)?;
                let rhs = operators::boolean_operand(&rhs, "implies")?;
                Ok(boolean_result(operators::three_valued_implies(lhs, rhs)))
            }

            Equal => {
                let lhs = self.eval(left, focus)?;
                let rhs = self.eval(right, focus)?;
                Ok(boolean_result(operators::collections_equal(&lhs, &rhs)))
            }
            NotEqual => {
                let lhs = self.eval(left, focus)?;
                let rhs = self.eval(right, focus)?;
                Ok(boolean_result(
                    operators::collections_equal(&lhs, &rhs).map(|b| !b),
                ))
            }
            Equivalent => {
                let lhs = self.eval(left, focus)?;
                let rhs = self.eval(right, focus)?;
                Ok(Collection::singleton(Value::boolean(
                    operators::collections_equivalent(&lhs, &rhs),
                )))
            }
            NotEquivalent => {
                let lhs = self.eval(left, focus)?;
                let rhs = self.eval(right, focus)?;
                Ok(Collection::singleton(Value::boolean(
                    !operators::collections_equivalent(&lhs, &rhs),
                )))
            }

            Less | LessEqual | Greater | GreaterEqual => {
                let lhs = self.eval(left, focus)?;
                let rhs = self.eval(right, focus)?;
                let (Some(l), Some(r)) = (lhs.singleton_value(), rhs.singleton_value()) else {
                    return Ok(Collection::empty());
                };
                let ordering = operators::compare_values(op.symbol(), l, r)?;
                Ok(boolean_result(ordering.map(|ord| match op {
                    Less => ord == Ordering::Less,
                    LessEqual => ord != Ordering::Greater,
                    Greater => ord == Ordering::Greater,
                    GreaterEqual => ord != Ordering::Less,
                    _ => unreachable!(),
                })))
            }

            Add | Sub | Mul | Div | IntDiv | Mod => {
                let lhs = self.eval(left, focus)?;
                let rhs = self.eval(right, focus)?;
                let (Some(l), Some(r)) = (lhs.singleton_value(), rhs.singleton_value()) else {
                    return Ok(Collection::empty());
                };
                let result = match op {
                    Add => operators::add_values(l, r)?,
                    Sub => operators::sub_values(l, r)?,
                    Mul => operators::mul_values(l, r)?,
                    Div => operators::div_values(l, r)?,
                    IntDiv => operators::intdiv_values("div", l, r)?,
                    Mod => operators::intdiv_values("mod", l, r)?,
                    _ => unreachable!(),
                };
                Ok(result
                    .map(Collection::singleton)
                    .unwrap_or_else(Collection::empty))
            }

            Concat => {
                let lhs = self.eval(left, focus)?;
                let rhs = self.eval(right, focus)?;
                let (Some(l), Some(r)) = (concat_operand(&lhs)?, concat_operand(&rhs)?) else {
                    return Ok(Collection::empty());
                };
                Ok(Collection::singleton(Value::string(format!("{l}{r}"))))
            }

            Union => {
                let lhs = self.eval(left, focus)?;
                let rhs = self.eval(right, focus)?;
                Ok(operators::union_collections(&lhs, &rhs))
            }

            In => {
                let lhs = self.eval(left, focus)?;
                let rhs = self.eval(right, focus)?;
                let Some(needle) = lhs.singleton_value() else {
                    return Ok(Collection::empty());
                };
                if rhs.is_empty() {
                    return Ok(Collection::empty());
                }
                Ok(Collection::singleton(Value::boolean(
                    operators::collection_contains(&rhs, needle),
                )))
            }
            Contains => {
                let lhs = self.eval(left, focus)?;
                let rhs = self.eval(right, focus)?;
                let Some(needle) = rhs.singleton_value() else {
                    return Ok(Collection::empty());
                };
                if lhs.is_empty() {
                    return Ok(Collection::empty());
                }
                Ok(Collection::singleton(Value::boolean(
                    operators::collection_contains(&lhs, needle),
                )))
            }
        }
    }
}

fn eval_literal(literal: &Literal) -> Collection {
    match literal {
        Literal::Empty => Collection::empty(),
        Literal::Boolean(b) => Collection::singleton(Value::boolean(*b)),
        Literal::Integer(i) => Collection::singleton(Value::integer(*i)),
        Literal::Decimal(d) => Collection::singleton(Value::decimal(*d)),
        Literal::String(s) => Collection::singleton(Value::String(s.clone())),
        Literal::Date(value, precision) => Collection::singleton(Value::date(*value, *precision)),
        Literal::DateTime(value, precision, tz) => {
            Collection::singleton(Value::datetime(*value, *precision, *tz))
        }
        Literal::Time(value, precision) => Collection::singleton(Value::time(*value, *precision)),
        Literal::Quantity { value, unit } => {
            Collection::singleton(Value::quantity(*value, unit.clone()))
        }
    }
}

fn boolean_result(value: Option<bool>) -> Collection {
    match value {
        Some(b) => Collection::singleton(Value::boolean(b)),
        None => Collection::empty(),
    }
}

/// `&` treats empty as the empty string; a multi-element operand has no
/// string reading and makes the whole result empty.
fn concat_operand(collection: &Collection) -> Result<Option<String>> {
    match collection.len() {
        0 => Ok(Some(String::new())),
        1 => match collection.first() {
            Some(Value::String(s)) => Ok(Some(s.to_string())),
            Some(other) => Err(Error::type_mismatch("&", "String", other.type_name())),
            None => Ok(Some(String::new())),
        },
        _ => Ok(None),
    }
}

/// Type-specifier matching for `is`/`as`/`ofType`: the bare name is compared
/// to the value's inferred type; a `System` qualifier restricts to
/// primitives, `FHIR` to complex values.
pub(crate) fn matches_type(value: &Value, specifier: &TypeSpecifier) -> bool {
    let name = specifier.name();
    let type_name = value.type_name();
    match specifier.qualifier() {
        Some("System") => value.is_primitive() && type_name.as_ref() == name,
        Some("FHIR") => !value.is_primitive() && type_name.as_ref() == name,
        _ => type_name.as_ref() == name,
    }
}
