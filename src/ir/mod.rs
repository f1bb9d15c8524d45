//! Lowered computation: the accumulator-threading form of a producer.
//!
//! A `Lowered` is an arena of `Code` nodes. Every node names its
//! continuation by `CodeId`, so "what runs next" is explicit and a loop
//! step can refer back to itself without a mutable back-pointer. The arena
//! is immutable once built and is shared by every invocation.

pub mod builder;
pub mod hash;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ast::display::format_expr;
use crate::ast::Expr;
use crate::span::Spanned;

pub use builder::{lower_producer, lower_script, Lowerer};
pub use hash::ContentHash;

// ─── Identifiers ──────────────────────────────────────────────────

/// Index of a node in `Lowered::code`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CodeId(pub u32);

/// Index of an iterating-loop cursor slot in the invocation frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LoopId(pub u32);

impl CodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl LoopId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for CodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

// ─── Code ─────────────────────────────────────────────────────────

/// A primitive action of the lowered computation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Code {
    /// The fold is complete: hand back the current accumulator with the
    /// continue flag. Falling off the end and `Return` both land here.
    Finish,
    /// Evaluate `value`, invoke the reducer, stop if it says so,
    /// otherwise run `next`. The only place the reducer is called.
    Reduce { value: Spanned<Expr>, next: CodeId },
    /// Evaluate `source` and fold it with the same reducer, threading the
    /// current accumulator in. Stop-now propagates; otherwise run `next`.
    Delegate { source: Spanned<Expr>, next: CodeId },
    /// Evaluate `expr` for its effect, then run `next`.
    Exec { expr: Spanned<Expr>, next: CodeId },
    /// Two-way dispatch on a boolean test.
    Branch {
        test: Spanned<Expr>,
        then_to: CodeId,
        else_to: CodeId,
    },
    /// Loop step. The body's continuation points back here.
    LoopHead {
        id: LoopId,
        header: LoopHeader,
        body: CodeId,
        exit: CodeId,
    },
    /// Start an iterating loop: evaluate the source, install a fresh
    /// cursor in slot `id`, then enter `head`.
    LoopInit {
        id: LoopId,
        source: Spanned<Expr>,
        head: CodeId,
    },
}

/// What a loop step checks before running the body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "header", rename_all = "snake_case")]
pub enum LoopHeader {
    /// `while true`: always enter the body.
    Always,
    /// `while test`: enter the body while `test` holds.
    Test { test: Spanned<Expr> },
    /// `for binding in ..`: advance the cursor, bind the item, enter the
    /// body; exit on exhaustion.
    Advance { binding: String },
}

/// Whether a lowered unit is a producer body or a top-level script.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoweredKind {
    Producer,
    Script,
}

// ─── Lowered ──────────────────────────────────────────────────────

/// The lowered form of one producer declaration (or the main script).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Lowered {
    pub name: String,
    pub kind: LoweredKind,
    pub params: Vec<String>,
    pub code: Vec<Code>,
    pub entry: CodeId,
    /// Number of iterating-loop cursor slots an invocation needs.
    pub loop_count: u32,
}

impl Lowered {
    pub fn node(&self, id: CodeId) -> &Code {
        &self.code[id.index()]
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Node ids reachable from `entry`, in discovery order.
    ///
    /// Statements after a `Return` are lowered but never referenced;
    /// they show up in `code` yet not here.
    pub fn reachable(&self) -> Vec<CodeId> {
        let mut seen = vec![false; self.code.len()];
        let mut order = Vec::new();
        let mut work = vec![self.entry];
        while let Some(id) = work.pop() {
            if seen[id.index()] {
                continue;
            }
            seen[id.index()] = true;
            order.push(id);
            match self.node(id) {
                Code::Finish => {}
                Code::Reduce { next, .. } | Code::Delegate { next, .. } | Code::Exec { next, .. } => {
                    work.push(*next)
                }
                Code::Branch {
                    then_to, else_to, ..
                } => {
                    work.push(*else_to);
                    work.push(*then_to);
                }
                Code::LoopHead { body, exit, .. } => {
                    work.push(*exit);
                    work.push(*body);
                }
                Code::LoopInit { head, .. } => work.push(*head),
            }
        }
        order
    }

    /// Count of `Reduce` and `Delegate` checkpoints in the arena.
    pub fn checkpoint_count(&self) -> usize {
        self.code
            .iter()
            .filter(|c| matches!(c, Code::Reduce { .. } | Code::Delegate { .. }))
            .count()
    }

    /// BLAKE3 content hash of the lowered code, independent of the name.
    pub fn fingerprint(&self) -> ContentHash {
        hash::hash_lowered(self)
    }
}

// ─── Display ──────────────────────────────────────────────────────

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Code::Finish => write!(f, "finish"),
            Code::Reduce { value, next } => {
                write!(f, "reduce {} -> {}", format_expr(&value.node), next)
            }
            Code::Delegate { source, next } => {
                write!(f, "delegate {} -> {}", format_expr(&source.node), next)
            }
            Code::Exec { expr, next } => write!(f, "exec {} -> {}", format_expr(&expr.node), next),
            Code::Branch {
                test,
                then_to,
                else_to,
            } => write!(
                f,
                "branch {} ? {} : {}",
                format_expr(&test.node),
                then_to,
                else_to
            ),
            Code::LoopHead {
                id,
                header,
                body,
                exit,
            } => {
                let header = match header {
                    LoopHeader::Always => "always".to_string(),
                    LoopHeader::Test { test } => format!("while {}", format_expr(&test.node)),
                    LoopHeader::Advance { binding } => format!("next {}", binding),
                };
                write!(f, "loop#{} {} body {} exit {}", id.0, header, body, exit)
            }
            Code::LoopInit { id, source, head } => write!(
                f,
                "loop#{} init {} -> {}",
                id.0,
                format_expr(&source.node),
                head
            ),
        }
    }
}

impl fmt::Display for Lowered {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            LoweredKind::Producer => "producer",
            LoweredKind::Script => "script",
        };
        writeln!(
            f,
            "{} {}({}) entry {}",
            kind,
            self.name,
            self.params.join(", "),
            self.entry
        )?;
        for (i, code) in self.code.iter().enumerate() {
            writeln!(f, "  @{} {}", i, code)?;
        }
        Ok(())
    }
}
