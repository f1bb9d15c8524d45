use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::diagnostic::Diagnostic;
use crate::span::Span;

/// Project file name searched for next to inputs.
pub const PROJECT_FILE: &str = "foldgen.toml";

/// Project configuration from foldgen.toml.
#[derive(Clone, Debug)]
pub struct Project {
    pub name: String,
    pub entry: PathBuf,
    pub root_dir: PathBuf,
    /// Defaults for `foldgen run`; CLI flags override them.
    pub run: RunDefaults,
    /// `tracing` filter directive used when `FOLDGEN_LOG` is unset.
    pub log_filter: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunDefaults {
    pub producer: Option<String>,
    pub args: Vec<i64>,
    pub reducer: Option<String>,
    pub take: Option<usize>,
}

// ─── File layout ───────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ProjectFile {
    project: ProjectSection,
    #[serde(default)]
    run: RunDefaults,
    #[serde(default)]
    log: LogSection,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ProjectSection {
    #[serde(default)]
    name: String,
    entry: Option<String>,
}

#[derive(Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct LogSection {
    filter: Option<String>,
}

impl Project {
    /// Load project from a foldgen.toml file.
    pub fn load(toml_path: &Path) -> Result<Project, Diagnostic> {
        let content = std::fs::read_to_string(toml_path).map_err(|e| {
            Diagnostic::error(
                format!("cannot read '{}': {}", toml_path.display(), e),
                Span::dummy(),
            )
        })?;
        let root_dir = toml_path.parent().unwrap_or(Path::new(".")).to_path_buf();
        Self::parse(&content, root_dir)
    }

    /// Parse foldgen.toml contents; relative paths resolve against `root_dir`.
    pub fn parse(content: &str, root_dir: PathBuf) -> Result<Project, Diagnostic> {
        let file: ProjectFile = toml::from_str(content).map_err(|e| {
            let span = e
                .span()
                .map(|r| Span::new(r.start as u32, r.end as u32))
                .unwrap_or_else(Span::dummy);
            Diagnostic::error(format!("invalid {}: {}", PROJECT_FILE, e.message()), span)
        })?;

        if file.project.name.is_empty() {
            return Err(Diagnostic::error(
                format!("missing 'name' in {}", PROJECT_FILE),
                Span::dummy(),
            ));
        }

        let entry = file.project.entry.unwrap_or_else(|| "main.json".to_string());

        Ok(Project {
            name: file.project.name,
            entry: root_dir.join(entry),
            root_dir,
            run: file.run,
            log_filter: file.log.filter,
        })
    }

    /// Try to find a foldgen.toml in the given directory or its ancestors.
    pub fn find(start_dir: &Path) -> Option<PathBuf> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(PROJECT_FILE);
            if candidate.exists() {
                return Some(candidate);
            }
            if !dir.pop() {
                return None;
            }
        }
    }
}
