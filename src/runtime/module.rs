//! Linked program: lowered producers, retrofit registry, record types and
//! native functions.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::ast::{Item, ProducerDecl, ProducerHead, Program, RecordDef};
use crate::diagnostic::Diagnostic;
use crate::ir::{lower_producer, lower_script, Lowered};
use crate::span::Span;

use super::{reducers, EvalError, Generator, Step, Value};

/// Two items claim the same name (or the same retrofit type).
pub const DUPLICATE_DEFINITION: &str = "E0003";
/// A retrofit producer names a record type that is not declared.
pub const UNKNOWN_RETROFIT_TYPE: &str = "E0004";

/// A host function callable from expressions.
pub type NativeFn = Arc<dyn Fn(&Module, Vec<Value>) -> Result<Value, EvalError> + Send + Sync>;

/// Everything a fold may need at run time.
///
/// Immutable once linked; lowered code is shared through `Arc`, so one
/// module can drive any number of concurrent invocations.
#[derive(Clone, Default)]
pub struct Module {
    producers: HashMap<String, Arc<Lowered>>,
    /// Fold implementations of record types, keyed by type name.
    retrofits: HashMap<String, Arc<Lowered>>,
    records: HashMap<String, RecordDef>,
    natives: HashMap<String, NativeFn>,
    main: Option<Arc<Lowered>>,
}

impl Module {
    /// Empty module with the standard natives installed.
    pub fn new() -> Self {
        let mut module = Self::bare();
        reducers::install_stdlib(&mut module);
        module
    }

    /// Empty module with no natives at all.
    pub fn bare() -> Self {
        Self::default()
    }

    /// Lower and register every item of `program` on top of the stdlib.
    pub fn link(program: &Program) -> Result<Module, Vec<Diagnostic>> {
        let mut module = Self::new();
        module.load(program)?;
        Ok(module)
    }

    /// Register `program` into this module. On failure the module may hold
    /// a subset of the program's items and should be discarded.
    pub fn load(&mut self, program: &Program) -> Result<(), Vec<Diagnostic>> {
        let mut errors = Vec::new();

        // Records first: retrofits may precede the type they attach to.
        for item in &program.items {
            if let Item::Record(def) = &item.node {
                if self.records.contains_key(&def.name) {
                    errors.push(duplicate("record type", &def.name, item.span));
                    continue;
                }
                self.records.insert(def.name.clone(), def.clone());
            }
        }

        for item in &program.items {
            match &item.node {
                Item::Record(_) => {}
                Item::Producer(decl) => {
                    if let Err(mut diags) = self.register(decl, item.span) {
                        errors.append(&mut diags);
                    }
                }
                Item::Main { body } => {
                    if self.main.is_some() {
                        errors.push(duplicate("main script", "main", item.span));
                        continue;
                    }
                    match lower_script(body) {
                        Ok(lowered) => self.main = Some(Arc::new(lowered)),
                        Err(mut diags) => errors.append(&mut diags),
                    }
                }
            }
        }

        if errors.is_empty() {
            debug!(
                producers = self.producers.len(),
                retrofits = self.retrofits.len(),
                records = self.records.len(),
                "linked program"
            );
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Lower and register a single producer declaration.
    pub fn add_producer(&mut self, decl: &ProducerDecl) -> Result<(), Vec<Diagnostic>> {
        self.register(decl, decl.body.span)
    }

    fn register(&mut self, decl: &ProducerDecl, span: Span) -> Result<(), Vec<Diagnostic>> {
        match &decl.head {
            ProducerHead::Callable { name, .. } => {
                if self.producers.contains_key(name) {
                    return Err(vec![duplicate("producer", name, span)]);
                }
                let lowered = lower_producer(decl)?;
                self.producers.insert(name.clone(), Arc::new(lowered));
            }
            ProducerHead::Retrofit { type_name, .. } => {
                if !self.records.contains_key(type_name) {
                    return Err(vec![Diagnostic::error(
                        format!("unknown type `{}` in retrofit producer", type_name),
                        span,
                    )
                    .with_code(UNKNOWN_RETROFIT_TYPE)
                    .with_help(format!("declare `record {}` before attaching a fold to it", type_name))]);
                }
                if self.retrofits.contains_key(type_name) {
                    return Err(vec![duplicate("fold implementation for", type_name, span)]);
                }
                let lowered = lower_producer(decl)?;
                self.retrofits.insert(type_name.clone(), Arc::new(lowered));
            }
        }
        Ok(())
    }

    /// Register a host function, replacing any earlier one of that name.
    pub fn register_native<F>(&mut self, name: &str, f: F)
    where
        F: Fn(&Module, Vec<Value>) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        self.natives.insert(name.to_string(), Arc::new(f));
    }

    pub fn with_native<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&Module, Vec<Value>) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        self.register_native(name, f);
        self
    }

    // ─── Lookup ────────────────────────────────────────────────────

    pub fn producer(&self, name: &str) -> Option<&Arc<Lowered>> {
        self.producers.get(name)
    }

    pub fn retrofit(&self, type_name: &str) -> Option<&Arc<Lowered>> {
        self.retrofits.get(type_name)
    }

    pub fn record_def(&self, name: &str) -> Option<&RecordDef> {
        self.records.get(name)
    }

    pub fn native(&self, name: &str) -> Option<&NativeFn> {
        self.natives.get(name)
    }

    pub fn main(&self) -> Option<&Arc<Lowered>> {
        self.main.as_ref()
    }

    /// Callable producer names, sorted.
    pub fn producer_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.producers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Every lowered unit in a stable order: callables, then retrofits,
    /// then the main script.
    pub fn lowered_units(&self) -> Vec<&Arc<Lowered>> {
        let callables: BTreeMap<_, _> = self.producers.iter().collect();
        let retrofits: BTreeMap<_, _> = self.retrofits.iter().collect();
        callables
            .into_values()
            .chain(retrofits.into_values())
            .chain(self.main.iter())
            .collect()
    }

    // ─── Invocation ────────────────────────────────────────────────

    /// Apply a producer or native by name, as a `Call` expression would.
    /// Producers come back as an unfolded `Generator`.
    pub fn call(&self, name: &str, args: Vec<Value>) -> Result<Value, EvalError> {
        if let Some(producer) = self.producer(name) {
            if producer.params.len() != args.len() {
                return Err(EvalError::Arity {
                    name: name.to_string(),
                    expected: producer.params.len(),
                    found: args.len(),
                });
            }
            return Ok(Value::Generator(Generator {
                producer: producer.clone(),
                args,
            }));
        }
        match self.native(name) {
            Some(native) => native(self, args),
            None => Err(EvalError::UnknownFunction(name.to_string())),
        }
    }

    /// Run the main script, if there is one.
    pub fn run_main(&self) -> Result<(), EvalError> {
        let Some(main) = &self.main else {
            return Ok(());
        };
        let mut reject = |_: (), _: Value| -> Result<Step<()>, EvalError> { Err(EvalError::ItemInScript) };
        self.invoke(main, Vec::new(), (), &mut reject)?;
        Ok(())
    }
}

fn duplicate(what: &str, name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(format!("duplicate {} `{}`", what, name), span)
        .with_code(DUPLICATE_DEFINITION)
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut natives: Vec<&String> = self.natives.keys().collect();
        natives.sort();
        f.debug_struct("Module")
            .field("producers", &self.producer_names())
            .field("retrofits", &self.retrofits.keys().collect::<Vec<_>>())
            .field("records", &self.records.keys().collect::<Vec<_>>())
            .field("natives", &natives)
            .field("main", &self.main.is_some())
            .finish()
    }
}
