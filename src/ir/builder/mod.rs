//! Lowerer: rewrites a producer's statement tree into a `Lowered` arena.
//!
//! Lowering is continuation-passing: `lower(stmt, k)` returns the entry of
//! the code that runs `stmt` and then, if it completes normally, `k`.
//! A producer body is lowered once with `k = Finish`.
//!
//! Loop control is resolved positionally through a scope stack: `break`
//! lowers to the innermost loop's exit continuation, `continue` to its
//! loop step. Diagnostics are collected for the whole declaration; any
//! error rejects it, and no partial lowering escapes.

mod stmt;

use tracing::debug;

use crate::ast::{ProducerDecl, Stmt};
use crate::diagnostic::Diagnostic;
use crate::span::Spanned;

use super::{Code, CodeId, LoopId, Lowered, LoweredKind};

/// `break`/`continue` with no enclosing loop.
pub const MISPLACED_LOOP_CONTROL: &str = "E0001";
/// `emit`/`delegate`/`return` outside a producer body.
pub const MISPLACED_YIELD: &str = "E0002";

/// Targets of loop control inside the innermost enclosing loop.
#[derive(Clone, Copy, Debug)]
pub(crate) struct LoopScope {
    /// Loop step: where `continue` and the end of the body go.
    pub(crate) head: CodeId,
    /// What follows the loop: where `break` goes.
    pub(crate) exit: CodeId,
}

// ─── Lowerer ───────────────────────────────────────────────────────

/// Builds one `Lowered` arena.
pub struct Lowerer {
    /// Arena under construction. Slot 0 is the shared `Finish` node.
    pub(crate) code: Vec<Code>,
    /// Enclosing loops, innermost last.
    pub(crate) loops: Vec<LoopScope>,
    /// Next cursor slot.
    pub(crate) loop_count: u32,
    /// Producer body or top-level script.
    pub(crate) kind: LoweredKind,
    /// Errors, in discovery order (right-to-left over the source).
    pub(crate) diagnostics: Vec<Diagnostic>,
}

impl Lowerer {
    pub fn new(kind: LoweredKind) -> Self {
        Self {
            code: vec![Code::Finish],
            loops: Vec::new(),
            loop_count: 0,
            kind,
            diagnostics: Vec::new(),
        }
    }

    /// The completion continuation: end of the fold, continue flag.
    pub fn finish(&self) -> CodeId {
        CodeId(0)
    }

    pub(crate) fn push(&mut self, code: Code) -> CodeId {
        let id = CodeId(self.code.len() as u32);
        self.code.push(code);
        id
    }

    /// Allocate a slot whose contents are filled in later, once the nodes
    /// that refer back to it exist.
    pub(crate) fn reserve(&mut self) -> CodeId {
        self.push(Code::Finish)
    }

    pub(crate) fn fill(&mut self, id: CodeId, code: Code) {
        self.code[id.index()] = code;
    }

    pub(crate) fn fresh_loop(&mut self) -> LoopId {
        let id = LoopId(self.loop_count);
        self.loop_count += 1;
        id
    }

    pub(crate) fn error(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Seal the arena. Fails with every collected diagnostic, in source order.
    pub fn into_lowered(
        self,
        name: String,
        params: Vec<String>,
        entry: CodeId,
    ) -> Result<Lowered, Vec<Diagnostic>> {
        if !self.diagnostics.is_empty() {
            let mut diagnostics = self.diagnostics;
            // Sequences are lowered last-to-first, so discovery order is
            // reversed source order.
            diagnostics.reverse();
            return Err(diagnostics);
        }
        Ok(Lowered {
            name,
            kind: self.kind,
            params,
            code: self.code,
            entry,
            loop_count: self.loop_count,
        })
    }
}

// ─── Entry points ──────────────────────────────────────────────────

/// Lower a producer declaration into its fold form.
pub fn lower_producer(decl: &ProducerDecl) -> Result<Lowered, Vec<Diagnostic>> {
    let mut lowerer = Lowerer::new(LoweredKind::Producer);
    let done = lowerer.finish();
    let entry = lowerer.lower(&decl.body, done);
    let result = lowerer.into_lowered(decl.name(), decl.params(), entry);
    match &result {
        Ok(lowered) => debug!(
            producer = %lowered.name,
            nodes = lowered.len(),
            checkpoints = lowered.checkpoint_count(),
            loops = lowered.loop_count,
            "lowered producer"
        ),
        Err(errors) => debug!(
            producer = %decl.name(),
            errors = errors.len(),
            "rejected producer"
        ),
    }
    result
}

/// Lower a top-level script. Yield points are rejected here.
pub fn lower_script(body: &Spanned<Stmt>) -> Result<Lowered, Vec<Diagnostic>> {
    let mut lowerer = Lowerer::new(LoweredKind::Script);
    let done = lowerer.finish();
    let entry = lowerer.lower(body, done);
    let result = lowerer.into_lowered("main".to_string(), Vec::new(), entry);
    if let Ok(lowered) = &result {
        debug!(nodes = lowered.len(), loops = lowered.loop_count, "lowered script");
    }
    result
}
