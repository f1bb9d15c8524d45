//! Expression evaluation against one invocation's locals.

use std::collections::HashMap;

use crate::ast::{BinOp, Expr, FieldInit, UnOp};
use crate::span::Spanned;

use super::{EvalError, Generator, Module, RangeValue, Record, Value};

/// Local bindings of one invocation. Never shared between invocations.
pub type Locals = HashMap<String, Value>;

/// Evaluates expressions for a single frame.
pub struct Evaluator<'a> {
    module: &'a Module,
    locals: &'a mut Locals,
}

impl<'a> Evaluator<'a> {
    pub fn new(module: &'a Module, locals: &'a mut Locals) -> Self {
        Self { module, locals }
    }

    pub fn eval(&mut self, expr: &Spanned<Expr>) -> Result<Value, EvalError> {
        match &expr.node {
            Expr::Nil => Ok(Value::Nil),
            Expr::Bool { value } => Ok(Value::Bool(*value)),
            Expr::Int { value } => Ok(Value::Int(*value)),
            Expr::Str { value } => Ok(Value::Str(value.clone())),
            Expr::Var { name } => self
                .locals
                .get(name)
                .cloned()
                .ok_or_else(|| EvalError::UnboundVariable(name.clone())),
            Expr::Unary { op, operand } => {
                let v = self.eval(operand)?;
                unary(*op, v)
            }
            Expr::Binary { op, lhs, rhs } => match op {
                BinOp::And | BinOp::Or => {
                    let l = self.eval_bool(lhs, op.as_str())?;
                    // Short-circuit: the right side runs only when needed.
                    if l == (*op == BinOp::Or) {
                        return Ok(Value::Bool(l));
                    }
                    Ok(Value::Bool(self.eval_bool(rhs, op.as_str())?))
                }
                _ => {
                    let l = self.eval(lhs)?;
                    let r = self.eval(rhs)?;
                    binary(*op, l, r)
                }
            },
            Expr::Assign { name, value } => {
                let v = self.eval(value)?;
                self.locals.insert(name.clone(), v.clone());
                Ok(v)
            }
            Expr::List { items } => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.eval(item)?);
                }
                Ok(Value::List(out))
            }
            Expr::Range { start, stop, step } => {
                let start = self.eval_int(start, "range")?;
                let stop = self.eval_int(stop, "range")?;
                let step = match step {
                    Some(step) => self.eval_int(step, "range")?,
                    None => 1,
                };
                Ok(Value::Range(RangeValue::new(start, stop, step)?))
            }
            Expr::Call { callee, args } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg)?);
                }
                self.call(callee, values)
            }
            Expr::Record { type_name, fields } => self.record(type_name, fields),
            Expr::Field { object, name } => match self.eval(object)? {
                Value::Record(record) => {
                    record
                        .get(name)
                        .cloned()
                        .ok_or_else(|| EvalError::UnknownField {
                            type_name: record.type_name.clone(),
                            field: name.clone(),
                        })
                }
                other => Err(mismatch(&format!(".{}", name), "record", &other)),
            },
        }
    }

    /// Evaluate a test. Only `Bool` is accepted; there is no truthiness.
    pub fn eval_bool(&mut self, expr: &Spanned<Expr>, op: &str) -> Result<bool, EvalError> {
        match self.eval(expr)? {
            Value::Bool(b) => Ok(b),
            other => Err(mismatch(op, "Bool", &other)),
        }
    }

    fn eval_int(&mut self, expr: &Spanned<Expr>, op: &str) -> Result<i64, EvalError> {
        match self.eval(expr)? {
            Value::Int(n) => Ok(n),
            other => Err(mismatch(op, "Int", &other)),
        }
    }

    /// Producers shadow natives of the same name.
    fn call(&mut self, callee: &str, args: Vec<Value>) -> Result<Value, EvalError> {
        if let Some(producer) = self.module.producer(callee) {
            if producer.params.len() != args.len() {
                return Err(EvalError::Arity {
                    name: callee.to_string(),
                    expected: producer.params.len(),
                    found: args.len(),
                });
            }
            return Ok(Value::Generator(Generator {
                producer: producer.clone(),
                args,
            }));
        }
        match self.module.native(callee) {
            Some(native) => native(self.module, args),
            None => Err(EvalError::UnknownFunction(callee.to_string())),
        }
    }

    fn record(&mut self, type_name: &str, inits: &[FieldInit]) -> Result<Value, EvalError> {
        let def = self
            .module
            .record_def(type_name)
            .ok_or_else(|| EvalError::UnknownType(type_name.to_string()))?;

        let mut given = Vec::with_capacity(inits.len());
        for init in inits {
            if !def.fields.iter().any(|f| f == &init.name) {
                return Err(EvalError::UnknownField {
                    type_name: type_name.to_string(),
                    field: init.name.clone(),
                });
            }
            given.push((init.name.clone(), self.eval(&init.value)?));
        }

        let mut fields = Vec::with_capacity(def.fields.len());
        for field in &def.fields {
            let value = given
                .iter()
                .find(|(n, _)| n == field)
                .map(|(_, v)| v.clone())
                .ok_or_else(|| EvalError::MissingField {
                    type_name: type_name.to_string(),
                    field: field.clone(),
                })?;
            fields.push((field.clone(), value));
        }
        Ok(Value::Record(Record {
            type_name: type_name.to_string(),
            fields,
        }))
    }
}

// ─── Operators ─────────────────────────────────────────────────────

fn mismatch(op: &str, expected: &'static str, found: &Value) -> EvalError {
    EvalError::TypeMismatch {
        op: op.to_string(),
        expected,
        found: found.type_name(),
    }
}

fn unary(op: UnOp, v: Value) -> Result<Value, EvalError> {
    match (op, v) {
        (UnOp::Neg, Value::Int(n)) => n
            .checked_neg()
            .map(Value::Int)
            .ok_or(EvalError::Overflow("-")),
        (UnOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (UnOp::Neg, other) => Err(mismatch("-", "Int", &other)),
        (UnOp::Not, other) => Err(mismatch("!", "Bool", &other)),
    }
}

fn binary(op: BinOp, l: Value, r: Value) -> Result<Value, EvalError> {
    match op {
        BinOp::Eq => return Ok(Value::Bool(l == r)),
        BinOp::Ne => return Ok(Value::Bool(l != r)),
        _ => {}
    }

    if let (BinOp::Add, Value::Str(a), Value::Str(b)) = (op, &l, &r) {
        return Ok(Value::Str(format!("{}{}", a, b)));
    }

    let (a, b) = match (&l, &r) {
        (Value::Int(a), Value::Int(b)) => (*a, *b),
        (Value::Int(_), other) | (other, _) => return Err(mismatch(op.as_str(), "Int", other)),
    };

    let int = |v: Option<i64>| v.map(Value::Int).ok_or(EvalError::Overflow(op.as_str()));
    match op {
        BinOp::Add => int(a.checked_add(b)),
        BinOp::Sub => int(a.checked_sub(b)),
        BinOp::Mul => int(a.checked_mul(b)),
        BinOp::Div | BinOp::Rem if b == 0 => Err(EvalError::DivisionByZero),
        BinOp::Div => int(a.checked_div(b)),
        BinOp::Rem => int(a.checked_rem(b)),
        BinOp::Lt => Ok(Value::Bool(a < b)),
        BinOp::Le => Ok(Value::Bool(a <= b)),
        BinOp::Gt => Ok(Value::Bool(a > b)),
        BinOp::Ge => Ok(Value::Bool(a >= b)),
        BinOp::Eq | BinOp::Ne | BinOp::And | BinOp::Or => {
            unreachable!("handled before integer dispatch")
        }
    }
}
