//! Statement lowering rules.

use crate::ast::{LoopKind, Stmt};
use crate::diagnostic::Diagnostic;
use crate::ir::{Code, CodeId, LoopHeader, LoweredKind};
use crate::span::Spanned;

use super::{LoopScope, Lowerer, MISPLACED_LOOP_CONTROL, MISPLACED_YIELD};

// ─── Statement lowering ───────────────────────────────────────────

impl Lowerer {
    /// Lower `stmt` with continuation `k`; returns the entry node.
    pub fn lower(&mut self, stmt: &Spanned<Stmt>, k: CodeId) -> CodeId {
        match &stmt.node {
            Stmt::Sequence { body } => {
                // Right to left: each statement continues into the
                // lowering of everything after it.
                let mut next = k;
                for s in body.iter().rev() {
                    next = self.lower(s, next);
                }
                next
            }

            Stmt::Emit { value } => {
                self.require_producer(stmt);
                self.push(Code::Reduce {
                    value: value.clone(),
                    next: k,
                })
            }

            Stmt::Delegate { source } => {
                self.require_producer(stmt);
                self.push(Code::Delegate {
                    source: source.clone(),
                    next: k,
                })
            }

            Stmt::Conditional {
                test,
                then_branch,
                else_branch,
            } => {
                // Else first so diagnostics come out in source order.
                let else_to = match else_branch {
                    Some(branch) => self.lower(branch, k),
                    None => k,
                };
                let then_to = self.lower(then_branch, k);
                self.push(Code::Branch {
                    test: test.clone(),
                    then_to,
                    else_to,
                })
            }

            Stmt::Loop { kind, body } => self.lower_loop(kind, body, k),

            Stmt::Return { value } => {
                self.require_producer(stmt);
                // `k` is dropped: whatever follows is dead code.
                let done = self.finish();
                match value {
                    Some(expr) => self.push(Code::Exec {
                        expr: expr.clone(),
                        next: done,
                    }),
                    None => done,
                }
            }

            Stmt::Break => match self.loops.last().copied() {
                Some(scope) => scope.exit,
                None => {
                    self.misplaced_loop_control(stmt);
                    k
                }
            },

            Stmt::Continue => match self.loops.last().copied() {
                Some(scope) => scope.head,
                None => {
                    self.misplaced_loop_control(stmt);
                    k
                }
            },

            Stmt::Other { expr } => self.push(Code::Exec {
                expr: expr.clone(),
                next: k,
            }),
        }
    }

    /// Build a loop step that refers to itself.
    ///
    /// The step's slot is reserved first so the body can be lowered with
    /// the step as its continuation; the slot is filled afterwards.
    fn lower_loop(&mut self, kind: &LoopKind, body: &Spanned<Stmt>, k: CodeId) -> CodeId {
        let id = self.fresh_loop();
        let head = self.reserve();

        self.loops.push(LoopScope { head, exit: k });
        let body_entry = self.lower(body, head);
        self.loops.pop();

        let header = match kind {
            LoopKind::Indefinite => LoopHeader::Always,
            LoopKind::Tested { test } => LoopHeader::Test { test: test.clone() },
            LoopKind::Iterating { binding, .. } => LoopHeader::Advance {
                binding: binding.clone(),
            },
        };
        self.fill(
            head,
            Code::LoopHead {
                id,
                header,
                body: body_entry,
                exit: k,
            },
        );

        match kind {
            LoopKind::Iterating { source, .. } => self.push(Code::LoopInit {
                id,
                source: source.clone(),
                head,
            }),
            _ => head,
        }
    }

    // ─── Context checks ───────────────────────────────────────────

    fn require_producer(&mut self, stmt: &Spanned<Stmt>) {
        if self.kind == LoweredKind::Producer {
            return;
        }
        let construct = match &stmt.node {
            Stmt::Emit { .. } => "@yield",
            Stmt::Delegate { .. } => "@yieldfrom",
            other => other.keyword(),
        };
        self.error(
            Diagnostic::error(
                format!(
                    "yield outside generator context: `{}` is only allowed inside a producer body",
                    construct
                ),
                stmt.span,
            )
            .with_code(MISPLACED_YIELD)
            .with_help("declare a producer and call it from here instead".to_string()),
        );
    }

    fn misplaced_loop_control(&mut self, stmt: &Spanned<Stmt>) {
        self.error(
            Diagnostic::error(
                format!(
                    "misplaced loop control: `{}` outside of a loop",
                    stmt.node.keyword()
                ),
                stmt.span,
            )
            .with_code(MISPLACED_LOOP_CONTROL)
            .with_note(
                "`break` and `continue` bind to the nearest enclosing `while` or `for`".to_string(),
            ),
        );
    }
}
