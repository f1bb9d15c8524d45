use std::path::PathBuf;

use clap::Args;
use foldgen::ir::ContentHash;

use super::{load_and_link, ResolvedInput};

#[derive(Args)]
pub struct HashArgs {
    /// Input .json program or directory with foldgen.toml
    pub input: PathBuf,
    /// Show full 64-char hex hashes
    #[arg(long)]
    pub full: bool,
}

pub fn cmd_hash(args: HashArgs, ri: ResolvedInput) {
    let (source, _, module) = load_and_link(&ri.entry);

    let file_hash = ContentHash(*blake3::hash(source.as_bytes()).as_bytes());
    if args.full {
        eprintln!("File: {} {}", file_hash.to_hex(), ri.entry.display());
    } else {
        eprintln!("File: {} {}", file_hash, ri.entry.display());
    }

    for unit in module.lowered_units() {
        let hash = unit.fingerprint();
        if args.full {
            println!("  {} {}", hash.to_hex(), unit.name);
        } else {
            println!("  {} {}", hash, unit.name);
        }
    }
}
