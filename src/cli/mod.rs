pub mod check;
pub mod dump;
pub mod hash;
pub mod run;

use std::path::{Path, PathBuf};
use std::process;

use foldgen::ast::Program;
use foldgen::project::{Project, PROJECT_FILE};
use foldgen::Module;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a `tracing` filter directive.
pub const LOG_ENV: &str = "FOLDGEN_LOG";

/// Resolved input: entry file and optional project.
pub struct ResolvedInput {
    pub entry: PathBuf,
    pub project: Option<Project>,
}

fn load_project(toml_path: &Path) -> Project {
    match Project::load(toml_path) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {}", e.message);
            process::exit(1);
        }
    }
}

/// Resolve an input path (file or project directory) to an entry file and
/// optional project.
pub fn resolve_input(input: &Path) -> ResolvedInput {
    if input.is_dir() {
        let toml_path = input.join(PROJECT_FILE);
        if !toml_path.exists() {
            eprintln!("error: no {} found in '{}'", PROJECT_FILE, input.display());
            process::exit(1);
        }
        let project = load_project(&toml_path);
        return ResolvedInput {
            entry: project.entry.clone(),
            project: Some(project),
        };
    }

    if !input.extension().is_some_and(|e| e == "json") {
        eprintln!("error: input must be a .json program or project directory");
        process::exit(1);
    }

    // A file inside a project still picks up its run defaults and log filter.
    let project = Project::find(input.parent().unwrap_or(Path::new("."))).map(|p| load_project(&p));
    ResolvedInput {
        entry: input.to_path_buf(),
        project,
    }
}

/// Install the stderr subscriber.
///
/// Filter precedence: `-v`, then `FOLDGEN_LOG`, then the project's
/// `[log] filter`, then `warn`.
pub fn init_logging(verbose: bool, ri: &ResolvedInput) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        match EnvFilter::try_from_env(LOG_ENV) {
            Ok(filter) => filter,
            Err(_) => {
                let configured = ri.project.as_ref().and_then(|p| p.log_filter.as_deref());
                EnvFilter::new(configured.unwrap_or("warn"))
            }
        }
    };
    // A second init (tests driving several commands) keeps the first one.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Read, parse and link the entry file. Diagnostics are rendered against
/// the source; any failure exits with status 1.
pub fn load_and_link(entry: &Path) -> (String, Program, Module) {
    let source = match std::fs::read_to_string(entry) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", entry.display(), e);
            process::exit(1);
        }
    };
    let filename = entry.to_string_lossy().to_string();
    let program = match foldgen::parse_program(&source, &filename) {
        Ok(p) => p,
        Err(_) => process::exit(1),
    };
    info!(entry = %entry.display(), items = program.items.len(), "parsed program");
    match Module::link(&program) {
        Ok(module) => (source, program, module),
        Err(errors) => {
            foldgen::diagnostic::render_diagnostics(&errors, &filename, &source);
            eprintln!(
                "error: {} error(s) in '{}'",
                errors.iter().filter(|d| d.is_error()).count(),
                entry.display()
            );
            process::exit(1);
        }
    }
}
