pub mod ast;
pub mod config;
pub mod diagnostic;
pub mod ir;
pub mod reference;
pub mod runtime;
pub mod span;

// Re-exports: short paths used by the CLI, tests and benches
pub use config::project;
pub use ir::{lower_producer, lower_script, Lowered};
pub use runtime::{reducers, EvalError, Foldable, Module, Reducer, Step, Value};

use std::path::Path;

use ast::Program;
use diagnostic::{render_diagnostics, Diagnostic};
use span::Span;

/// Parse a JSON program, rendering any error against the source.
pub fn parse_program(source: &str, filename: &str) -> Result<Program, Vec<Diagnostic>> {
    Program::from_json(source).map_err(|diag| {
        let errors = vec![diag];
        render_diagnostics(&errors, filename, source);
        errors
    })
}

/// Parse and link a JSON program, rendering diagnostics on failure.
pub fn link_source(source: &str, filename: &str) -> Result<Module, Vec<Diagnostic>> {
    let program = parse_program(source, filename)?;
    Module::link(&program).map_err(|errors| {
        render_diagnostics(&errors, filename, source);
        errors
    })
}

/// Read, parse and link a program file, without rendering.
pub fn load_program(path: &Path) -> Result<(Program, Module), Vec<Diagnostic>> {
    let source = std::fs::read_to_string(path).map_err(|e| {
        vec![Diagnostic::error(
            format!("cannot read '{}': {}", path.display(), e),
            Span::dummy(),
        )]
    })?;
    let program = Program::from_json(&source).map_err(|diag| vec![diag])?;
    let module = Module::link(&program)?;
    Ok((program, module))
}
