use std::path::PathBuf;
use std::process;

use clap::{Args, ValueEnum};
use foldgen::reference::interpret;
use foldgen::{reducers, EvalError, Module, Value};
use tracing::{info, warn};

use super::{load_and_link, ResolvedInput};

#[derive(Args)]
pub struct RunArgs {
    /// Input .json program or directory with foldgen.toml
    pub input: PathBuf,
    /// Producer to fold (default: run the main script)
    #[arg(long)]
    pub producer: Option<String>,
    /// Integer argument for the producer (repeatable)
    #[arg(long = "arg", value_name = "INT", allow_negative_numbers = true)]
    pub args: Vec<i64>,
    /// Fold consumer applied to the produced items
    #[arg(long, value_enum)]
    pub reducer: Option<ReducerKind>,
    /// Stop after this many items
    #[arg(long)]
    pub take: Option<usize>,
    /// Cross-check the items against the reference interpreter
    #[arg(long)]
    pub oracle: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReducerKind {
    Collect,
    Sum,
    Count,
    First,
}

pub fn cmd_run(args: RunArgs, ri: ResolvedInput) {
    let (_, program, module) = load_and_link(&ri.entry);
    let defaults = ri.project.map(|p| p.run).unwrap_or_default();

    let producer = args.producer.or(defaults.producer);
    let call_args = if args.args.is_empty() {
        defaults.args
    } else {
        args.args
    };
    let reducer = match (args.reducer, defaults.reducer) {
        (Some(kind), _) => kind,
        (None, Some(name)) => match ReducerKind::from_str(&name, true) {
            Ok(kind) => kind,
            Err(_) => {
                eprintln!("error: unknown reducer '{}' in project config", name);
                process::exit(1);
            }
        },
        (None, None) => ReducerKind::Collect,
    };
    let take = args.take.or(defaults.take);

    let Some(name) = producer else {
        if args.oracle || take.is_some() {
            warn!("--oracle and --take only apply to producers; running main script");
        }
        info!("running main script");
        if let Err(e) = module.run_main() {
            fail(e);
        }
        return;
    };

    let values: Vec<Value> = call_args.into_iter().map(Value::Int).collect();
    info!(producer = %name, args = values.len(), ?reducer, ?take, "folding producer");
    let generator = module.call(&name, values.clone()).unwrap_or_else(|e| fail(e));

    let result = fold(&module, &generator, reducer, take).unwrap_or_else(|e| fail(e));
    println!("{}", result);

    if args.oracle {
        let Some(decl) = program.find_producer(&name) else {
            eprintln!("error: '{}' is not a producer declaration", name);
            process::exit(1);
        };
        let expected = interpret(&module, decl, values, take).unwrap_or_else(|e| fail(e));
        let actual = match take {
            Some(n) => reducers::take(&module, &generator, n),
            None => reducers::collect(&module, &generator),
        }
        .unwrap_or_else(|e| fail(e));
        if actual != expected {
            eprintln!("error: lowered fold diverges from reference interpreter");
            eprintln!("  lowered:   {}", Value::List(actual));
            eprintln!("  reference: {}", Value::List(expected));
            process::exit(1);
        }
        eprintln!("oracle: OK ({} item(s))", expected.len());
    }
}

fn fold(
    module: &Module,
    generator: &Value,
    reducer: ReducerKind,
    take: Option<usize>,
) -> Result<Value, EvalError> {
    let limited;
    let source = match take {
        Some(n) => {
            limited = Value::List(reducers::take(module, generator, n)?);
            &limited
        }
        None => generator,
    };
    Ok(match reducer {
        ReducerKind::Collect => Value::List(reducers::collect(module, source)?),
        ReducerKind::Sum => Value::Int(reducers::sum(module, source)?),
        ReducerKind::Count => Value::Int(reducers::count(module, source)? as i64),
        ReducerKind::First => reducers::first(module, source)?.unwrap_or(Value::Nil),
    })
}

fn fail(e: EvalError) -> ! {
    eprintln!("error: {}", e);
    process::exit(1);
}
