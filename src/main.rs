use std::path::Path;

use clap::{Parser, Subcommand};

mod cli;

use cli::check::{cmd_check, CheckArgs};
use cli::dump::{cmd_dump, DumpArgs};
use cli::hash::{cmd_hash, HashArgs};
use cli::run::{cmd_run, RunArgs};

#[derive(Parser)]
#[command(
    name = "foldgen",
    version,
    about = "Lower yield-style producers into short-circuiting folds"
)]
struct Cli {
    /// Log lowering and fold events at debug level
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse, lower and link a program; report errors
    Check(CheckArgs),
    /// Print lowered code (or producer trees with --tree)
    Dump(DumpArgs),
    /// Fold a producer, or run the main script
    Run(RunArgs),
    /// Show content hashes of the program and each lowered unit
    Hash(HashArgs),
}

impl Command {
    fn input(&self) -> &Path {
        match self {
            Command::Check(args) => &args.input,
            Command::Dump(args) => &args.input,
            Command::Run(args) => &args.input,
            Command::Hash(args) => &args.input,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let ri = cli::resolve_input(cli.command.input());
    cli::init_logging(cli.verbose, &ri);

    match cli.command {
        Command::Check(args) => cmd_check(args, ri),
        Command::Dump(args) => cmd_dump(args, ri),
        Command::Run(args) => cmd_run(args, ri),
        Command::Hash(args) => cmd_hash(args, ri),
    }
}
