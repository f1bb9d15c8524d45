use std::path::PathBuf;
use std::process;

use clap::Args;
use foldgen::ast::display::format_producer;

use super::{load_and_link, ResolvedInput};

#[derive(Args)]
pub struct DumpArgs {
    /// Input .json program or directory with foldgen.toml
    pub input: PathBuf,
    /// Only dump this producer (`<Type>` selects a retrofit)
    #[arg(long)]
    pub producer: Option<String>,
    /// Print the producer tree instead of the lowered code
    #[arg(long)]
    pub tree: bool,
}

pub fn cmd_dump(args: DumpArgs, ri: ResolvedInput) {
    let (_, program, module) = load_and_link(&ri.entry);

    if args.tree {
        let mut found = false;
        for decl in program.producers() {
            if args.producer.as_deref().is_some_and(|p| p != decl.name()) {
                continue;
            }
            found = true;
            print!("{}", format_producer(decl));
        }
        if !found {
            not_found(args.producer.as_deref());
        }
        return;
    }

    let units: Vec<_> = module
        .lowered_units()
        .into_iter()
        .filter(|u| args.producer.as_deref().map_or(true, |p| p == u.name))
        .collect();
    if units.is_empty() {
        not_found(args.producer.as_deref());
    }
    for (i, unit) in units.iter().enumerate() {
        if i > 0 {
            println!();
        }
        print!("{}", unit);
        println!("  ; fingerprint {}", unit.fingerprint());
    }
}

fn not_found(producer: Option<&str>) {
    match producer {
        Some(name) => eprintln!("error: no producer named '{}'", name),
        None => eprintln!("error: program declares no producers"),
    }
    process::exit(1);
}
