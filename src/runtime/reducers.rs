//! Standard fold consumers, usable from Rust and as natives.
//!
//! Each consumer is one reducer plus an initial accumulator. `first` and
//! `take` are the short-circuiting ones: they answer `Stop` as soon as they
//! have what they need, and the producer runs no further.

use super::{EvalError, Foldable, Module, Step, Value};

/// Collect every item, in order.
pub fn collect<F: Foldable + ?Sized>(module: &Module, source: &F) -> Result<Vec<Value>, EvalError> {
    let mut rf = |mut acc: Vec<Value>, item: Value| -> Result<Step<Vec<Value>>, EvalError> {
        acc.push(item);
        Ok(Step::Continue(acc))
    };
    Ok(source.fold_with(module, Vec::new(), &mut rf)?.into_inner())
}

/// Sum of integer items. Overflow is an error.
pub fn sum<F: Foldable + ?Sized>(module: &Module, source: &F) -> Result<i64, EvalError> {
    let mut rf = |acc: i64, item: Value| -> Result<Step<i64>, EvalError> {
        match item {
            Value::Int(n) => acc
                .checked_add(n)
                .map(Step::Continue)
                .ok_or(EvalError::Overflow("sum")),
            other => Err(EvalError::TypeMismatch {
                op: "sum".to_string(),
                expected: "Int",
                found: other.type_name(),
            }),
        }
    };
    Ok(source.fold_with(module, 0, &mut rf)?.into_inner())
}

pub fn count<F: Foldable + ?Sized>(module: &Module, source: &F) -> Result<usize, EvalError> {
    let mut rf = |acc: usize, _: Value| -> Result<Step<usize>, EvalError> { Ok(Step::Continue(acc + 1)) };
    Ok(source.fold_with(module, 0, &mut rf)?.into_inner())
}

/// First item, stopping the producer right after it.
pub fn first<F: Foldable + ?Sized>(module: &Module, source: &F) -> Result<Option<Value>, EvalError> {
    let mut rf = |_: Option<Value>, item: Value| -> Result<Step<Option<Value>>, EvalError> {
        Ok(Step::Stop(Some(item)))
    };
    Ok(source.fold_with(module, None, &mut rf)?.into_inner())
}

/// At most `n` leading items. `take(0)` never starts the producer.
pub fn take<F: Foldable + ?Sized>(
    module: &Module,
    source: &F,
    n: usize,
) -> Result<Vec<Value>, EvalError> {
    if n == 0 {
        return Ok(Vec::new());
    }
    let mut rf = |mut acc: Vec<Value>, item: Value| -> Result<Step<Vec<Value>>, EvalError> {
        acc.push(item);
        if acc.len() >= n {
            Ok(Step::Stop(acc))
        } else {
            Ok(Step::Continue(acc))
        }
    };
    Ok(source.fold_with(module, Vec::new(), &mut rf)?.into_inner())
}

// ─── Natives ───────────────────────────────────────────────────────

/// Install `print`, `collect`, `sum`, `count`, `first` and `take`.
pub fn install_stdlib(module: &mut Module) {
    module.register_native("print", |_, args| {
        let line: Vec<String> = args.iter().map(Value::to_string).collect();
        println!("{}", line.join(" "));
        Ok(Value::Nil)
    });
    module.register_native("collect", |m, args| {
        let [source] = expect_args::<1>("collect", args)?;
        Ok(Value::List(collect(m, &source)?))
    });
    module.register_native("sum", |m, args| {
        let [source] = expect_args::<1>("sum", args)?;
        Ok(Value::Int(sum(m, &source)?))
    });
    module.register_native("count", |m, args| {
        let [source] = expect_args::<1>("count", args)?;
        let n = count(m, &source)?;
        i64::try_from(n)
            .map(Value::Int)
            .map_err(|_| EvalError::Overflow("count"))
    });
    module.register_native("first", |m, args| {
        let [source] = expect_args::<1>("first", args)?;
        Ok(first(m, &source)?.unwrap_or(Value::Nil))
    });
    module.register_native("take", |m, args| {
        let [n, source] = expect_args::<2>("take", args)?;
        let n = match n {
            Value::Int(n) => usize::try_from(n)
                .map_err(|_| EvalError::native("take", format!("negative count {}", n)))?,
            other => {
                return Err(EvalError::TypeMismatch {
                    op: "take".to_string(),
                    expected: "Int",
                    found: other.type_name(),
                })
            }
        };
        Ok(Value::List(take(m, &source, n)?))
    });
}

fn expect_args<const N: usize>(name: &str, args: Vec<Value>) -> Result<[Value; N], EvalError> {
    let found = args.len();
    args.try_into().map_err(|_| EvalError::Arity {
        name: name.to_string(),
        expected: N,
        found,
    })
}
