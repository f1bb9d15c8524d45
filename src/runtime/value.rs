//! Runtime values.

use std::fmt;
use std::sync::Arc;

use crate::ir::Lowered;

use super::EvalError;

/// A runtime value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<Value>),
    Range(RangeValue),
    Record(Record),
    /// A bound producer call: lazy until something folds it.
    Generator(Generator),
}

impl Value {
    /// Type name used in error messages.
    pub fn type_name(&self) -> String {
        match self {
            Value::Nil => "Nothing".to_string(),
            Value::Bool(_) => "Bool".to_string(),
            Value::Int(_) => "Int".to_string(),
            Value::Str(_) => "String".to_string(),
            Value::List(_) => "List".to_string(),
            Value::Range(_) => "Range".to_string(),
            Value::Record(r) => r.type_name.clone(),
            Value::Generator(g) => format!("Generator({})", g.producer.name),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nothing"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{}", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match item {
                        Value::Str(s) => write!(f, "{:?}", s)?,
                        other => write!(f, "{}", other)?,
                    }
                }
                write!(f, "]")
            }
            Value::Range(r) => write!(f, "{}", r),
            Value::Record(r) => {
                write!(f, "{}(", r.type_name)?;
                for (i, (_, v)) in r.fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, ")")
            }
            Value::Generator(g) => write!(f, "<generator {}>", g.producer.name),
        }
    }
}

// ─── Range ─────────────────────────────────────────────────────────

/// Inclusive integer range `start:step:stop`. Empty when the step points
/// away from `stop`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RangeValue {
    pub start: i64,
    pub stop: i64,
    pub step: i64,
}

impl RangeValue {
    pub fn new(start: i64, stop: i64, step: i64) -> Result<Self, EvalError> {
        if step == 0 {
            return Err(EvalError::ZeroStep);
        }
        Ok(Self { start, stop, step })
    }

    pub fn iter(&self) -> RangeIter {
        RangeIter {
            next: Some(self.start),
            stop: self.stop,
            step: self.step,
        }
    }

    pub fn is_empty(&self) -> bool {
        if self.step > 0 {
            self.start > self.stop
        } else {
            self.start < self.stop
        }
    }
}

impl fmt::Display for RangeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.step == 1 {
            write!(f, "{}:{}", self.start, self.stop)
        } else {
            write!(f, "{}:{}:{}", self.start, self.step, self.stop)
        }
    }
}

/// Iterator over a `RangeValue`. Stops cleanly at the `i64` bounds.
#[derive(Clone, Debug)]
pub struct RangeIter {
    next: Option<i64>,
    stop: i64,
    step: i64,
}

impl Iterator for RangeIter {
    type Item = i64;

    fn next(&mut self) -> Option<i64> {
        let current = self.next?;
        let in_range = if self.step > 0 {
            current <= self.stop
        } else {
            current >= self.stop
        };
        if !in_range {
            self.next = None;
            return None;
        }
        self.next = current.checked_add(self.step);
        Some(current)
    }
}

// ─── Record ────────────────────────────────────────────────────────

/// An instance of a nominal record type; fields in declaration order.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    pub type_name: String,
    pub fields: Vec<(String, Value)>,
}

impl Record {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == field).map(|(_, v)| v)
    }
}

// ─── Generator ─────────────────────────────────────────────────────

/// A producer applied to its arguments. Nothing in the body runs until
/// the value is folded; every fold is a fresh invocation.
#[derive(Clone, Debug)]
pub struct Generator {
    pub producer: Arc<Lowered>,
    pub args: Vec<Value>,
}

impl PartialEq for Generator {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.producer, &other.producer) && self.args == other.args
    }
}
