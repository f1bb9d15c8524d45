//! The trampoline that executes `Lowered` code.
//!
//! One `Frame` per invocation. The program counter walks `CodeId`s, so a
//! loop of any length runs in constant Rust stack; only delegation into
//! another producer recurses.

use tracing::trace;

use crate::ast::Expr;
use crate::ir::{Code, LoopHeader, LoopId, Lowered};
use crate::span::Spanned;

use super::{EvalError, Evaluator, Locals, Module, RangeIter, Reducer, Step, Value};

/// Position-based cursor driving a `for` loop.
///
/// Only sources with a natural position qualify. Generators and retrofit
/// records fold; they do not iterate.
#[derive(Clone, Debug)]
pub enum Cursor {
    Range(RangeIter),
    List { items: Vec<Value>, pos: usize },
}

impl Cursor {
    pub fn new(source: Value) -> Result<Self, EvalError> {
        match source {
            Value::Range(range) => Ok(Cursor::Range(range.iter())),
            Value::List(items) => Ok(Cursor::List { items, pos: 0 }),
            other => Err(EvalError::NotIterable(other.type_name())),
        }
    }
}

impl Iterator for Cursor {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        match self {
            Cursor::Range(iter) => iter.next().map(Value::Int),
            Cursor::List { items, pos } => {
                let item = items.get(*pos).cloned();
                if item.is_some() {
                    *pos += 1;
                }
                item
            }
        }
    }
}

// ─── Frame ─────────────────────────────────────────────────────────

/// Per-invocation storage: local bindings and one cursor slot per
/// iterating loop.
struct Frame {
    locals: Locals,
    cursors: Vec<Option<Cursor>>,
}

impl Frame {
    fn new(lowered: &Lowered, args: Vec<Value>) -> Self {
        let locals = lowered.params.iter().cloned().zip(args).collect();
        Self {
            locals,
            cursors: vec![None; lowered.loop_count as usize],
        }
    }

    fn eval(&mut self, module: &Module, expr: &Spanned<Expr>) -> Result<Value, EvalError> {
        Evaluator::new(module, &mut self.locals).eval(expr)
    }

    fn eval_bool(
        &mut self,
        module: &Module,
        expr: &Spanned<Expr>,
        op: &str,
    ) -> Result<bool, EvalError> {
        Evaluator::new(module, &mut self.locals).eval_bool(expr, op)
    }

    fn advance(&mut self, id: LoopId) -> Option<Value> {
        self.cursors.get_mut(id.index())?.as_mut()?.next()
    }
}

// ─── Folding ───────────────────────────────────────────────────────

impl Module {
    /// Fold any value with the fold protocol.
    pub fn fold<A>(
        &self,
        value: &Value,
        init: A,
        rf: &mut dyn Reducer<A>,
    ) -> Result<Step<A>, EvalError> {
        match value {
            Value::Range(range) => fold_items(range.iter().map(Value::Int), init, rf),
            Value::List(items) => fold_items(items.iter().cloned(), init, rf),
            Value::Generator(generator) => {
                self.invoke(&generator.producer, generator.args.clone(), init, rf)
            }
            Value::Record(record) => match self.retrofit(&record.type_name) {
                Some(lowered) => self.invoke(lowered, vec![value.clone()], init, rf),
                None => Err(EvalError::NotFoldable(record.type_name.clone())),
            },
            other => Err(EvalError::NotFoldable(other.type_name())),
        }
    }

    /// Run one invocation of `lowered` with fresh locals bound to `args`.
    pub fn invoke<A>(
        &self,
        lowered: &Lowered,
        args: Vec<Value>,
        init: A,
        rf: &mut dyn Reducer<A>,
    ) -> Result<Step<A>, EvalError> {
        if lowered.params.len() != args.len() {
            return Err(EvalError::Arity {
                name: lowered.name.clone(),
                expected: lowered.params.len(),
                found: args.len(),
            });
        }
        let mut frame = Frame::new(lowered, args);
        run(self, lowered, &mut frame, init, rf)
    }
}

fn run<A>(
    module: &Module,
    lowered: &Lowered,
    frame: &mut Frame,
    init: A,
    rf: &mut dyn Reducer<A>,
) -> Result<Step<A>, EvalError> {
    let mut acc = init;
    let mut pc = lowered.entry;
    loop {
        match lowered.node(pc) {
            Code::Finish => return Ok(Step::Continue(acc)),

            Code::Reduce { value, next } => {
                let item = frame.eval(module, value)?;
                match rf.step(acc, item)? {
                    Step::Continue(a) => {
                        acc = a;
                        pc = *next;
                    }
                    Step::Stop(a) => {
                        trace!(producer = %lowered.name, at = %pc, "stop-now");
                        return Ok(Step::Stop(a));
                    }
                }
            }

            Code::Delegate { source, next } => {
                let source = frame.eval(module, source)?;
                trace!(producer = %lowered.name, source = %source.type_name(), "delegate");
                match module.fold(&source, acc, &mut *rf)? {
                    Step::Continue(a) => {
                        acc = a;
                        pc = *next;
                    }
                    Step::Stop(a) => {
                        trace!(producer = %lowered.name, at = %pc, "stop-now from delegate");
                        return Ok(Step::Stop(a));
                    }
                }
            }

            Code::Exec { expr, next } => {
                frame.eval(module, expr)?;
                pc = *next;
            }

            Code::Branch {
                test,
                then_to,
                else_to,
            } => {
                pc = if frame.eval_bool(module, test, "if")? {
                    *then_to
                } else {
                    *else_to
                };
            }

            Code::LoopHead {
                id,
                header,
                body,
                exit,
            } => {
                let enter = match header {
                    LoopHeader::Always => true,
                    LoopHeader::Test { test } => frame.eval_bool(module, test, "while")?,
                    LoopHeader::Advance { binding } => match frame.advance(*id) {
                        Some(item) => {
                            frame.locals.insert(binding.clone(), item);
                            true
                        }
                        None => false,
                    },
                };
                pc = if enter { *body } else { *exit };
            }

            Code::LoopInit { id, source, head } => {
                let source = frame.eval(module, source)?;
                let cursor = Cursor::new(source)?;
                if let Some(slot) = frame.cursors.get_mut(id.index()) {
                    *slot = Some(cursor);
                }
                pc = *head;
            }
        }
    }
}

/// Native fold over an in-memory sequence.
pub(crate) fn fold_items<A>(
    items: impl Iterator<Item = Value>,
    init: A,
    rf: &mut dyn Reducer<A>,
) -> Result<Step<A>, EvalError> {
    let mut acc = init;
    for item in items {
        match rf.step(acc, item)? {
            Step::Continue(a) => acc = a,
            Step::Stop(a) => return Ok(Step::Stop(a)),
        }
    }
    Ok(Step::Continue(acc))
}
