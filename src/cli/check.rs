use std::path::PathBuf;

use clap::Args;

use super::{load_and_link, ResolvedInput};

#[derive(Args)]
pub struct CheckArgs {
    /// Input .json program or directory with foldgen.toml
    pub input: PathBuf,
}

pub fn cmd_check(args: CheckArgs, ri: ResolvedInput) {
    let (_, _, module) = load_and_link(&ri.entry);
    let units = module.lowered_units();
    let nodes: usize = units.iter().map(|u| u.len()).sum();
    eprintln!(
        "OK: {} ({} producer(s), {} lowered unit(s), {} node(s){})",
        args.input.display(),
        module.producer_names().len(),
        units.len(),
        nodes,
        if module.main().is_some() { ", main" } else { "" }
    );
}
