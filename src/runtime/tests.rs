use std::sync::{Arc, Mutex};
use std::thread;

use super::*;
use crate::ast::build::*;
use crate::ast::{BinOp, Item};
use crate::runtime::reducers::{collect, take};

// ─── Helpers ───────────────────────────────────────────────────────

/// Link `items` into a module that also has a `probe(x)` native: it
/// records `x` in the returned log and evaluates to `x`.
fn with_probe(items: Vec<Item>) -> (Module, Arc<Mutex<Vec<Value>>>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    let mut module = Module::new().with_native("probe", move |_, args| {
        let v = args.into_iter().next().unwrap_or(Value::Nil);
        sink.lock().unwrap().push(v.clone());
        Ok(v)
    });
    module.load(&program(items)).unwrap();
    (module, log)
}

fn link(items: Vec<Item>) -> Module {
    Module::link(&program(items)).unwrap()
}

fn ints(values: &[i64]) -> Vec<Value> {
    values.iter().copied().map(Value::Int).collect()
}

fn run(module: &Module, name: &str, args: Vec<Value>) -> Vec<Value> {
    let generator = module.call(name, args).unwrap();
    collect(module, &generator).unwrap()
}

/// Collect items, answering `Stop` right after the item equal to `last`.
fn collect_through(module: &Module, source: &Value, last: Value) -> Step<Vec<Value>> {
    let mut rf = |mut acc: Vec<Value>, item: Value| -> Result<Step<Vec<Value>>, EvalError> {
        let stop = item == last;
        acc.push(item);
        Ok(if stop { Step::Stop(acc) } else { Step::Continue(acc) })
    };
    source.fold_with(module, Vec::new(), &mut rf).unwrap()
}

fn probe(value: i64) -> crate::span::Spanned<crate::ast::Expr> {
    call("probe", vec![int(value)])
}

// ─── Order ─────────────────────────────────────────────────────────

#[test]
fn test_items_in_textual_order() {
    let body = seq(vec![
        emit(int(1)),
        if_else(boolean(true), emit(int(2)), emit(int(99))),
        if_then(boolean(false), emit(int(98))),
        emit(int(3)),
    ]);
    let module = link(vec![Item::Producer(producer("p", &[], body))]);
    assert_eq!(run(&module, "p", vec![]), ints(&[1, 2, 3]));
}

#[test]
fn test_side_effects_interleave_with_items() {
    // probe(10) runs before item 1 is produced, probe(20) between 1 and 2.
    let body = seq(vec![
        other(probe(10)),
        emit(int(1)),
        other(probe(20)),
        emit(int(2)),
    ]);
    let (module, log) = with_probe(vec![Item::Producer(producer("p", &[], body))]);
    let generator = module.call("p", vec![]).unwrap();

    let step = collect_through(&module, &generator, Value::Int(1));
    assert_eq!(step, Step::Stop(ints(&[1])));
    assert_eq!(*log.lock().unwrap(), ints(&[10]));
}

#[test]
fn test_generator_is_lazy_and_refolds_fresh() {
    let body = seq(vec![other(probe(0)), emit(var("n"))]);
    let (module, log) = with_probe(vec![Item::Producer(producer("p", &["n"], body))]);
    let generator = module.call("p", vec![Value::Int(7)]).unwrap();
    assert!(log.lock().unwrap().is_empty());

    assert_eq!(collect(&module, &generator).unwrap(), ints(&[7]));
    assert_eq!(collect(&module, &generator).unwrap(), ints(&[7]));
    assert_eq!(log.lock().unwrap().len(), 2);
}

// ─── Short-circuit ─────────────────────────────────────────────────

#[test]
fn test_stop_after_third_item_skips_fourth_expression() {
    let body = seq((1..=5).map(|k| emit(probe(k))).collect());
    let (module, log) = with_probe(vec![Item::Producer(producer("five", &[], body))]);
    let generator = module.call("five", vec![]).unwrap();

    let mut combined = Vec::new();
    let mut rf = |acc: i64, item: Value| -> Result<Step<i64>, EvalError> {
        let n = item.as_int().unwrap();
        combined.push(n);
        let acc = acc * 10 + n;
        Ok(if n == 3 { Step::Stop(acc) } else { Step::Continue(acc) })
    };
    let step = generator.fold_with(&module, 0, &mut rf).unwrap();

    assert_eq!(step, Step::Stop(123));
    assert_eq!(combined, vec![1, 2, 3]);
    assert_eq!(*log.lock().unwrap(), ints(&[1, 2, 3]));
}

#[test]
fn test_stop_inside_loop_exits_every_construct() {
    // for i in 1:10 { while true { emit i; break } ; probe(i) }
    let body = for_in(
        "i",
        range(int(1), int(10)),
        seq(vec![
            while_true(seq(vec![emit(var("i")), brk()])),
            other(call("probe", vec![var("i")])),
        ]),
    );
    let (module, log) = with_probe(vec![Item::Producer(producer("p", &[], body))]);
    let generator = module.call("p", vec![]).unwrap();

    let step = collect_through(&module, &generator, Value::Int(2));
    assert_eq!(step, Step::Stop(ints(&[1, 2])));
    // The statement after the inner loop ran for i = 1 only.
    assert_eq!(*log.lock().unwrap(), ints(&[1]));
}

#[test]
fn test_take_zero_never_starts_producer() {
    let body = seq(vec![other(probe(1)), emit(int(1))]);
    let (module, log) = with_probe(vec![Item::Producer(producer("p", &[], body))]);
    let generator = module.call("p", vec![]).unwrap();
    assert!(take(&module, &generator, 0).unwrap().is_empty());
    assert!(log.lock().unwrap().is_empty());
}

// ─── Delegation ────────────────────────────────────────────────────

fn delegation_module() -> (Module, Arc<Mutex<Vec<Value>>>) {
    with_probe(vec![
        Item::Producer(producer("a", &[], seq(vec![emit(int(1)), emit(int(2))]))),
        Item::Producer(producer(
            "b",
            &[],
            seq(vec![other(probe(100)), emit(int(10)), emit(int(20))]),
        )),
        Item::Producer(producer(
            "both",
            &[],
            seq(vec![
                delegate(call("a", vec![])),
                delegate(call("b", vec![])),
            ]),
        )),
    ])
}

#[test]
fn test_delegation_concatenates() {
    let (module, _) = delegation_module();
    assert_eq!(run(&module, "both", vec![]), ints(&[1, 2, 10, 20]));
}

#[test]
fn test_stop_inside_first_delegate_skips_second() {
    let (module, log) = delegation_module();
    let generator = module.call("both", vec![]).unwrap();
    assert_eq!(take(&module, &generator, 1).unwrap(), ints(&[1]));
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn test_delegate_threads_outer_accumulator() {
    let (module, _) = delegation_module();
    let generator = module.call("both", vec![]).unwrap();
    let mut seen_acc = Vec::new();
    let mut rf = |acc: i64, item: Value| -> Result<Step<i64>, EvalError> {
        seen_acc.push(acc);
        Ok(Step::Continue(acc + item.as_int().unwrap()))
    };
    let step = generator.fold_with(&module, 1000, &mut rf).unwrap();
    assert_eq!(step, Step::Continue(1033));
    // Items of `b` see the total accumulated through `a`.
    assert_eq!(seen_acc, vec![1000, 1001, 1003, 1013]);
}

#[test]
fn test_delegate_to_native_sources() {
    let body = seq(vec![
        delegate(range_step(int(6), int(-2), int(2))),
        delegate(list(vec![string("x"), nil()])),
    ]);
    let module = link(vec![Item::Producer(producer("p", &[], body))]);
    let mut expected = ints(&[6, 4, 2]);
    expected.push(Value::from("x"));
    expected.push(Value::Nil);
    assert_eq!(run(&module, "p", vec![]), expected);
}

#[test]
fn test_recursive_delegation() {
    // countdown(n) = if n > 0 { emit n; delegate countdown(n - 1) }
    let body = if_then(
        gt(var("n"), int(0)),
        seq(vec![
            emit(var("n")),
            delegate(call("countdown", vec![sub(var("n"), int(1))])),
        ]),
    );
    let module = link(vec![Item::Producer(producer("countdown", &["n"], body))]);
    assert_eq!(run(&module, "countdown", ints(&[3])), ints(&[3, 2, 1]));

    let generator = module.call("countdown", ints(&[50])).unwrap();
    let step = collect_through(&module, &generator, Value::Int(48));
    assert_eq!(step, Step::Stop(ints(&[50, 49, 48])));
}

#[test]
fn test_delegate_non_foldable_is_error() {
    let body = delegate(int(4));
    let module = link(vec![Item::Producer(producer("p", &[], body))]);
    let generator = module.call("p", vec![]).unwrap();
    let err = collect(&module, &generator).unwrap_err();
    assert_eq!(err, EvalError::NotFoldable("Int".to_string()));
}

// ─── Loops ─────────────────────────────────────────────────────────

#[test]
fn test_while_true_with_break() {
    // i = 1; while true { emit i; if i == 3 break else i += 1 }
    let body = seq(vec![
        other(assign("i", int(1))),
        while_true(seq(vec![
            emit(var("i")),
            if_else(eq(var("i"), int(3)), brk(), incr("i")),
        ])),
    ]);
    let module = link(vec![Item::Producer(producer("p", &[], body))]);
    assert_eq!(run(&module, "p", vec![]), ints(&[1, 2, 3]));
}

#[test]
fn test_continue_skips_evens() {
    let body = for_in(
        "i",
        range(int(1), int(5)),
        seq(vec![
            if_then(eq(rem(var("i"), int(2)), int(0)), cont()),
            emit(var("i")),
        ]),
    );
    let module = link(vec![Item::Producer(producer("odds", &[], body))]);
    assert_eq!(run(&module, "odds", vec![]), ints(&[1, 3, 5]));
}

#[test]
fn test_continue_in_tested_loop_rechecks_test() {
    // i = 0; while i < 6 { i += 1; if i % 3 == 0 continue; emit i }
    let body = seq(vec![
        other(assign("i", int(0))),
        while_loop(
            lt(var("i"), int(6)),
            seq(vec![
                incr("i"),
                if_then(eq(rem(var("i"), int(3)), int(0)), cont()),
                emit(var("i")),
            ]),
        ),
    ]);
    let module = link(vec![Item::Producer(producer("p", &[], body))]);
    assert_eq!(run(&module, "p", vec![]), ints(&[1, 2, 4, 5]));
}

#[test]
fn test_nested_loops_bind_innermost() {
    // for i in 1:3 { for j in 1:3 { if j > i break; emit i*10+j } }
    let body = for_in(
        "i",
        range(int(1), int(3)),
        for_in(
            "j",
            range(int(1), int(3)),
            seq(vec![
                if_then(gt(var("j"), var("i")), brk()),
                emit(add(binary(BinOp::Mul, var("i"), int(10)), var("j"))),
            ]),
        ),
    );
    let module = link(vec![Item::Producer(producer("tri", &[], body))]);
    assert_eq!(
        run(&module, "tri", vec![]),
        ints(&[11, 21, 22, 31, 32, 33])
    );
}

#[test]
fn test_iterating_over_generator_is_rejected() {
    let module = link(vec![
        Item::Producer(producer("a", &[], emit(int(1)))),
        Item::Producer(producer(
            "p",
            &[],
            for_in("x", call("a", vec![]), emit(var("x"))),
        )),
    ]);
    let generator = module.call("p", vec![]).unwrap();
    let err = collect(&module, &generator).unwrap_err();
    assert_eq!(err, EvalError::NotIterable("Generator(a)".to_string()));
}

// ─── Return ────────────────────────────────────────────────────────

#[test]
fn test_return_skips_rest_of_body() {
    let body = seq(vec![emit(int(1)), ret(), other(probe(9)), emit(int(2))]);
    let (module, log) = with_probe(vec![Item::Producer(producer("p", &[], body))]);
    let generator = module.call("p", vec![]).unwrap();
    let mut rf = |acc: Vec<Value>, item: Value| -> Result<Step<Vec<Value>>, EvalError> {
        let mut acc = acc;
        acc.push(item);
        Ok(Step::Continue(acc))
    };
    // Return ends with the continue flag, not stop-now.
    let step = generator.fold_with(&module, Vec::new(), &mut rf).unwrap();
    assert_eq!(step, Step::Continue(ints(&[1])));
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn test_return_from_nested_loop_ends_producer() {
    // for i in 1:5 { for j in 1:5 { if i * j == 6 return probe(i); emit j } }
    let body = for_in(
        "i",
        range(int(1), int(5)),
        for_in(
            "j",
            range(int(1), int(5)),
            seq(vec![
                if_then(
                    eq(binary(BinOp::Mul, var("i"), var("j")), int(6)),
                    ret_value(call("probe", vec![var("i")])),
                ),
                emit(var("j")),
            ]),
        ),
    );
    let (module, log) = with_probe(vec![Item::Producer(producer("p", &[], body))]);
    let items = run(&module, "p", vec![]);
    assert_eq!(items, ints(&[1, 2, 3, 4, 5, 1, 2]));
    // The return value is evaluated once, then discarded.
    assert_eq!(*log.lock().unwrap(), ints(&[2]));
}

// ─── Retrofit ──────────────────────────────────────────────────────

fn organ_pipe_items() -> Vec<Item> {
    // (p::OrganPipe): for i in 1:p.n emit i; for i in p.n-1:-1:1 emit i
    let up = for_in("i", range(int(1), field(var("p"), "n")), emit(var("i")));
    let down = for_in(
        "i",
        range_step(sub(field(var("p"), "n"), int(1)), int(-1), int(1)),
        emit(var("i")),
    );
    vec![
        Item::Producer(retrofit("p", "OrganPipe", seq(vec![up, down]))),
        record_def("OrganPipe", &["n"]),
        Item::Producer(producer(
            "organpipe",
            &["n"],
            delegate(record("OrganPipe", vec![("n", var("n"))])),
        )),
    ]
}

#[test]
fn test_retrofit_record_folds() {
    let module = link(organ_pipe_items());
    let pipe = Value::Record(Record {
        type_name: "OrganPipe".to_string(),
        fields: vec![("n".to_string(), Value::Int(3))],
    });
    assert_eq!(collect(&module, &pipe).unwrap(), ints(&[1, 2, 3, 2, 1]));
    assert_eq!(run(&module, "organpipe", ints(&[3])), ints(&[1, 2, 3, 2, 1]));
    assert_eq!(run(&module, "organpipe", ints(&[1])), ints(&[1]));
}

#[test]
fn test_record_without_retrofit_is_not_foldable() {
    let module = link(vec![record_def("Point", &["x", "y"])]);
    let point = Value::Record(Record {
        type_name: "Point".to_string(),
        fields: vec![],
    });
    let err = collect(&module, &point).unwrap_err();
    assert_eq!(err, EvalError::NotFoldable("Point".to_string()));
}

#[test]
fn test_record_construction_checks_fields() {
    let module = link(vec![
        record_def("Point", &["x", "y"]),
        Item::Producer(producer(
            "missing",
            &[],
            emit(record("Point", vec![("x", int(1))])),
        )),
        Item::Producer(producer(
            "extra",
            &[],
            emit(record("Point", vec![("x", int(1)), ("y", int(2)), ("z", int(3))])),
        )),
        Item::Producer(producer(
            "ok",
            &[],
            emit(field(record("Point", vec![("y", int(2)), ("x", int(1))]), "y")),
        )),
    ]);
    let err = collect(&module, &module.call("missing", vec![]).unwrap()).unwrap_err();
    assert!(matches!(err, EvalError::MissingField { ref field, .. } if field == "y"));
    let err = collect(&module, &module.call("extra", vec![]).unwrap()).unwrap_err();
    assert!(matches!(err, EvalError::UnknownField { ref field, .. } if field == "z"));
    assert_eq!(run(&module, "ok", vec![]), ints(&[2]));
}

// ─── Errors ────────────────────────────────────────────────────────

#[test]
fn test_expression_errors_propagate() {
    let module = link(vec![
        Item::Producer(producer(
            "div",
            &[],
            seq(vec![emit(int(1)), emit(binary(BinOp::Div, int(1), int(0)))]),
        )),
        Item::Producer(producer(
            "test",
            &[],
            if_then(int(1), emit(int(1))),
        )),
        Item::Producer(producer("unbound", &[], emit(var("nope")))),
    ]);
    let err = collect(&module, &module.call("div", vec![]).unwrap()).unwrap_err();
    assert_eq!(err, EvalError::DivisionByZero);
    let err = collect(&module, &module.call("test", vec![]).unwrap()).unwrap_err();
    assert_eq!(
        err,
        EvalError::TypeMismatch {
            op: "if".to_string(),
            expected: "Bool",
            found: "Int".to_string(),
        }
    );
    let err = collect(&module, &module.call("unbound", vec![]).unwrap()).unwrap_err();
    assert_eq!(err, EvalError::UnboundVariable("nope".to_string()));
}

#[test]
fn test_reducer_error_propagates_unchanged() {
    let (module, log) = delegation_module();
    let generator = module.call("both", vec![]).unwrap();
    let mut rf = |_: (), item: Value| -> Result<Step<()>, EvalError> {
        if item == Value::Int(10) {
            Err(EvalError::native("reducer", "refused 10"))
        } else {
            Ok(Step::Continue(()))
        }
    };
    let err = generator.fold_with(&module, (), &mut rf).unwrap_err();
    assert_eq!(err, EvalError::native("reducer", "refused 10"));
    assert_eq!(*log.lock().unwrap(), ints(&[100]));
}

#[test]
fn test_overflow_is_an_error() {
    let module = link(vec![Item::Producer(producer(
        "big",
        &[],
        emit(add(int(i64::MAX), int(1))),
    ))]);
    let err = collect(&module, &module.call("big", vec![]).unwrap()).unwrap_err();
    assert_eq!(err, EvalError::Overflow("+"));
}

#[test]
fn test_call_arity_mismatch() {
    let module = link(vec![Item::Producer(producer("p", &["a", "b"], emit(var("a"))))]);
    let err = module.call("p", ints(&[1])).unwrap_err();
    assert_eq!(
        err,
        EvalError::Arity {
            name: "p".to_string(),
            expected: 2,
            found: 1
        }
    );
    assert_eq!(
        module.call("nope", vec![]).unwrap_err(),
        EvalError::UnknownFunction("nope".to_string())
    );
}

// ─── Linking ───────────────────────────────────────────────────────

#[test]
fn test_link_rejects_duplicates_and_unknown_retrofit_type() {
    let items = vec![
        Item::Producer(producer("p", &[], emit(int(1)))),
        Item::Producer(producer("p", &[], emit(int(2)))),
        Item::Producer(retrofit("x", "Ghost", emit(var("x")))),
    ];
    let errors = Module::link(&program(items)).unwrap_err();
    let codes: Vec<_> = errors.iter().map(|d| d.code).collect();
    assert_eq!(
        codes,
        vec![Some(DUPLICATE_DEFINITION), Some(UNKNOWN_RETROFIT_TYPE)]
    );
}

#[test]
fn test_link_reports_lowering_errors() {
    let items = vec![
        Item::Producer(producer("p", &[], brk())),
        main_script(emit(int(1))),
    ];
    let errors = Module::link(&program(items)).unwrap_err();
    let codes: Vec<_> = errors.iter().map(|d| d.code).collect();
    assert_eq!(codes, vec![Some("E0001"), Some("E0002")]);
}

#[test]
fn test_main_script_runs_side_effects() {
    let (module, log) = with_probe(vec![
        Item::Producer(producer("a", &[], seq(vec![emit(int(1)), emit(int(2))]))),
        main_script(seq(vec![
            other(assign("total", call("sum", vec![call("a", vec![])]))),
            other(call("probe", vec![var("total")])),
        ])),
    ]);
    module.run_main().unwrap();
    assert_eq!(*log.lock().unwrap(), ints(&[3]));
}

#[test]
fn test_relinking_is_observationally_identical() {
    let first = link(organ_pipe_items());
    let second = link(organ_pipe_items());
    let a = first.producer("organpipe").unwrap();
    let b = second.producer("organpipe").unwrap();
    assert_eq!(a.fingerprint(), b.fingerprint());
    assert_eq!(
        run(&first, "organpipe", ints(&[4])),
        run(&second, "organpipe", ints(&[4]))
    );
}

// ─── Concurrency ───────────────────────────────────────────────────

#[test]
fn test_concurrent_invocations_share_lowered_code() {
    let module = link(organ_pipe_items());
    thread::scope(|s| {
        let handles: Vec<_> = (1..=4)
            .map(|n| {
                let module = &module;
                s.spawn(move || run(module, "organpipe", ints(&[n])))
            })
            .collect();
        for (n, handle) in (1..=4).zip(handles) {
            let items = handle.join().unwrap();
            assert_eq!(items.len(), (2 * n - 1) as usize);
        }
    });
}
