//! Fold driver: runs lowered producers against a caller's reducer.
//!
//! The contract is small. A reducing operation takes the running
//! accumulator and one item and answers with a `Step`: `Continue` with the
//! new accumulator, or `Stop` to end the whole fold now. A lowered producer
//! is driven with `(reducer, init)` and answers with the final `Step`.
//!
//! - `Stop` is never cleared once raised; it reaches the outermost caller
//!   untouched, through any number of nested delegations.
//! - A delegated fold uses the very same reducer and starts from the
//!   outer accumulator. Sub-sequences never own an accumulator.
//! - The only checkpoints are emit and delegate. Plain statements, loop
//!   tests and branch tests run to completion without consulting the
//!   reducer.
//!
//! Errors raised by embedded expressions, natives or the reducer itself
//! propagate unchanged; the driver adds no handling of its own.

mod driver;
mod error;
mod eval;
mod module;
pub mod reducers;
#[cfg(test)]
mod tests;
mod value;

pub use driver::Cursor;
pub use error::EvalError;
pub use eval::{Evaluator, Locals};
pub use module::{Module, NativeFn, DUPLICATE_DEFINITION, UNKNOWN_RETROFIT_TYPE};
pub use value::{Generator, RangeIter, RangeValue, Record, Value};

// ─── Accumulator state ─────────────────────────────────────────────

/// Accumulator plus the continue/stop-now flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step<A> {
    Continue(A),
    Stop(A),
}

impl<A> Step<A> {
    pub fn is_stop(&self) -> bool {
        matches!(self, Step::Stop(_))
    }

    pub fn into_inner(self) -> A {
        match self {
            Step::Continue(a) | Step::Stop(a) => a,
        }
    }

    pub fn as_inner(&self) -> &A {
        match self {
            Step::Continue(a) | Step::Stop(a) => a,
        }
    }

    /// Transform the accumulator, keeping the flag.
    pub fn map<B>(self, f: impl FnOnce(A) -> B) -> Step<B> {
        match self {
            Step::Continue(a) => Step::Continue(f(a)),
            Step::Stop(a) => Step::Stop(f(a)),
        }
    }
}

// ─── Reducer ───────────────────────────────────────────────────────

/// A reducing operation: `(accumulator, item) -> Step`.
pub trait Reducer<A> {
    fn step(&mut self, acc: A, item: Value) -> Result<Step<A>, EvalError>;
}

impl<A, F> Reducer<A> for F
where
    F: FnMut(A, Value) -> Result<Step<A>, EvalError>,
{
    fn step(&mut self, acc: A, item: Value) -> Result<Step<A>, EvalError> {
        self(acc, item)
    }
}

// ─── Foldable ──────────────────────────────────────────────────────

/// Anything that can be driven by a reducer: the one capability a
/// delegation target must have.
///
/// `module` supplies producers, retrofit implementations and natives that
/// the fold may need along the way.
pub trait Foldable {
    fn fold_with<A>(
        &self,
        module: &Module,
        init: A,
        rf: &mut dyn Reducer<A>,
    ) -> Result<Step<A>, EvalError>;
}

impl Foldable for Value {
    fn fold_with<A>(
        &self,
        module: &Module,
        init: A,
        rf: &mut dyn Reducer<A>,
    ) -> Result<Step<A>, EvalError> {
        module.fold(self, init, rf)
    }
}

impl Foldable for Generator {
    fn fold_with<A>(
        &self,
        module: &Module,
        init: A,
        rf: &mut dyn Reducer<A>,
    ) -> Result<Step<A>, EvalError> {
        module.invoke(&self.producer, self.args.clone(), init, rf)
    }
}

impl Foldable for RangeValue {
    fn fold_with<A>(
        &self,
        _module: &Module,
        init: A,
        rf: &mut dyn Reducer<A>,
    ) -> Result<Step<A>, EvalError> {
        driver::fold_items(self.iter().map(Value::Int), init, rf)
    }
}

impl Foldable for [Value] {
    fn fold_with<A>(
        &self,
        _module: &Module,
        init: A,
        rf: &mut dyn Reducer<A>,
    ) -> Result<Step<A>, EvalError> {
        driver::fold_items(self.iter().cloned(), init, rf)
    }
}
