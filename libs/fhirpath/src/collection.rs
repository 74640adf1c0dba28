//! The universal result shape: an ordered, possibly-empty sequence of values.

use smallvec::SmallVec;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::value::Value;
use rust_decimal::Decimal;

/// An ordered collection of [`Value`]s. Every expression evaluates to one;
/// there is no scalar result shape.
#[derive(Debug, Clone, Default)]
pub struct Collection(SmallVec<[Value; 1]>);

impl Collection {
    pub fn empty() -> Self {
        Self(SmallVec::new())
    }

    pub fn singleton(value: Value) -> Self {
        let mut items = SmallVec::new();
        items.push(value);
        Self(items)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self(SmallVec::with_capacity(capacity))
    }

    pub fn push(&mut self, value: Value) {
        self.0.push(value);
    }

    pub fn extend(&mut self, other: Collection) {
        self.0.extend(other.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.0.iter()
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    pub fn first(&self) -> Option<&Value> {
        self.0.first()
    }

    pub fn last(&self) -> Option<&Value> {
        self.0.last()
    }

    /// The sole element, or `None` when the collection is not a singleton.
    pub fn singleton_value(&self) -> Option<&Value> {
        if self.0.len() == 1 {
            self.0.first()
        } else {
            None
        }
    }

    /// Singleton Boolean accessor; errors on non-boolean or non-singleton input.
    pub fn as_boolean(&self) -> Result<bool> {
        match self.singleton_value() {
            Some(Value::Boolean(b)) => Ok(*b),
            Some(other) => Err(Error::type_mismatch(
                "boolean access",
                "Boolean",
                other.type_name(),
            )),
            None => Err(Error::SingletonExpected("boolean access")),
        }
    }

    /// Singleton Integer accessor.
    pub fn as_integer(&self) -> Result<i64> {
        match self.singleton_value() {
            Some(Value::Integer(i)) => Ok(*i),
            Some(other) => Err(Error::type_mismatch(
                "integer access",
                "Integer",
                other.type_name(),
            )),
            None => Err(Error::SingletonExpected("integer access")),
        }
    }

    /// Singleton Decimal accessor (integers promote).
    pub fn as_decimal(&self) -> Result<Decimal> {
        match self.singleton_value() {
            Some(Value::Decimal(d)) => Ok(*d),
            Some(Value::Integer(i)) => Ok(Decimal::from(*i)),
            Some(other) => Err(Error::type_mismatch(
                "decimal access",
                "Decimal",
                other.type_name(),
            )),
            None => Err(Error::SingletonExpected("decimal access")),
        }
    }

    /// Singleton String accessor.
    pub fn as_string(&self) -> Result<Arc<str>> {
        match self.singleton_value() {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(other) => Err(Error::type_mismatch(
                "string access",
                "String",
                other.type_name(),
            )),
            None => Err(Error::SingletonExpected("string access")),
        }
    }
}

impl From<Vec<Value>> for Collection {
    fn from(values: Vec<Value>) -> Self {
        Self(SmallVec::from_vec(values))
    }
}

impl FromIterator<Value> for Collection {
    fn from_iter<T: IntoIterator<Item = Value>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Collection {
    type Item = Value;
    type IntoIter = smallvec::IntoIter<[Value; 1]>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
