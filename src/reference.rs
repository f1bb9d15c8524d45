//! Reference interpreter: runs a producer body by walking the tree
//! directly, with ordinary structured control flow.
//!
//! It is the definitional meaning of a producer. The lowered form must
//! produce the same items, in the same order, with the same side effects,
//! for every item limit. Delegation targets are folded through the module.

use crate::ast::{Expr, LoopKind, ProducerDecl, Stmt};
use crate::runtime::{Cursor, EvalError, Evaluator, Locals, Module, Step, Value};
use crate::span::Spanned;

/// How a statement finished.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Flow {
    Normal,
    Break,
    Continue,
    Return,
    /// The item limit was reached.
    Stop,
}

struct Interpreter<'a> {
    module: &'a Module,
    locals: Locals,
    items: Vec<Value>,
    limit: Option<usize>,
}

/// Collect the items `decl` produces for `args`, stopping after `limit`
/// items when a limit is given.
pub fn interpret(
    module: &Module,
    decl: &ProducerDecl,
    args: Vec<Value>,
    limit: Option<usize>,
) -> Result<Vec<Value>, EvalError> {
    let params = decl.params();
    if params.len() != args.len() {
        return Err(EvalError::Arity {
            name: decl.name(),
            expected: params.len(),
            found: args.len(),
        });
    }
    if limit == Some(0) {
        return Ok(Vec::new());
    }
    let mut interp = Interpreter {
        module,
        locals: params.into_iter().zip(args).collect(),
        items: Vec::new(),
        limit,
    };
    interp.exec(&decl.body)?;
    Ok(interp.items)
}

impl<'a> Interpreter<'a> {
    fn eval(&mut self, expr: &Spanned<Expr>) -> Result<Value, EvalError> {
        Evaluator::new(self.module, &mut self.locals).eval(expr)
    }

    fn test(&mut self, expr: &Spanned<Expr>, op: &str) -> Result<bool, EvalError> {
        Evaluator::new(self.module, &mut self.locals).eval_bool(expr, op)
    }

    fn full(&self) -> bool {
        self.limit.is_some_and(|n| self.items.len() >= n)
    }

    fn exec(&mut self, stmt: &Spanned<Stmt>) -> Result<Flow, EvalError> {
        match &stmt.node {
            Stmt::Sequence { body } => {
                for s in body {
                    let flow = self.exec(s)?;
                    if flow != Flow::Normal {
                        return Ok(flow);
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::Emit { value } => {
                let item = self.eval(value)?;
                self.items.push(item);
                Ok(if self.full() { Flow::Stop } else { Flow::Normal })
            }
            Stmt::Delegate { source } => {
                let source = self.eval(source)?;
                let limit = self.limit;
                let items = std::mem::take(&mut self.items);
                let mut rf = |mut acc: Vec<Value>, item: Value| -> Result<Step<Vec<Value>>, EvalError> {
                    acc.push(item);
                    if limit.is_some_and(|n| acc.len() >= n) {
                        Ok(Step::Stop(acc))
                    } else {
                        Ok(Step::Continue(acc))
                    }
                };
                let step = self.module.fold(&source, items, &mut rf)?;
                let stopped = step.is_stop();
                self.items = step.into_inner();
                Ok(if stopped { Flow::Stop } else { Flow::Normal })
            }
            Stmt::Conditional {
                test,
                then_branch,
                else_branch,
            } => {
                if self.test(test, "if")? {
                    self.exec(then_branch)
                } else if let Some(branch) = else_branch {
                    self.exec(branch)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::Loop { kind, body } => self.exec_loop(kind, body),
            Stmt::Return { value } => {
                if let Some(value) = value {
                    self.eval(value)?;
                }
                Ok(Flow::Return)
            }
            Stmt::Break => Ok(Flow::Break),
            Stmt::Continue => Ok(Flow::Continue),
            Stmt::Other { expr } => {
                self.eval(expr)?;
                Ok(Flow::Normal)
            }
        }
    }

    fn exec_loop(&mut self, kind: &LoopKind, body: &Spanned<Stmt>) -> Result<Flow, EvalError> {
        match kind {
            LoopKind::Indefinite => loop {
                match self.exec(body)? {
                    Flow::Normal | Flow::Continue => {}
                    Flow::Break => return Ok(Flow::Normal),
                    flow => return Ok(flow),
                }
            },
            LoopKind::Tested { test } => {
                while self.test(test, "while")? {
                    match self.exec(body)? {
                        Flow::Normal | Flow::Continue => {}
                        Flow::Break => break,
                        flow => return Ok(flow),
                    }
                }
                Ok(Flow::Normal)
            }
            LoopKind::Iterating { binding, source } => {
                let source = self.eval(source)?;
                for item in Cursor::new(source)? {
                    self.locals.insert(binding.clone(), item);
                    match self.exec(body)? {
                        Flow::Normal | Flow::Continue => {}
                        Flow::Break => break,
                        flow => return Ok(flow),
                    }
                }
                Ok(Flow::Normal)
            }
        }
    }
}
