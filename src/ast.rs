//! Tree model for producer declarations.
//!
//! A producer body is a tree of control-flow statements (`Stmt`) with
//! opaque expressions (`Expr`) at the leaves. Loop control carries no
//! target reference: `Break`/`Continue` bind to the nearest lexically
//! enclosing `Loop`, resolved positionally during lowering.

pub mod build;
pub mod display;

use serde::{Deserialize, Serialize};

use crate::diagnostic::Diagnostic;
use crate::span::{Span, Spanned};

/// A whole interchange unit handed over by the front end.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub items: Vec<Spanned<Item>>,
}

impl Program {
    /// Parse the JSON interchange form.
    ///
    /// Syntax errors are reported at the byte offset serde_json points at.
    pub fn from_json(source: &str) -> Result<Program, Diagnostic> {
        serde_json::from_str(source).map_err(|e| {
            let offset = line_col_to_offset(source, e.line(), e.column());
            Diagnostic::error(
                format!("malformed program: {}", e),
                Span::new(offset, offset.saturating_add(1)),
            )
        })
    }

    pub fn to_json(&self) -> String {
        // Tree types contain only strings, integers and vectors.
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    pub fn producers(&self) -> impl Iterator<Item = &ProducerDecl> {
        self.items.iter().filter_map(|item| match &item.node {
            Item::Producer(decl) => Some(decl),
            _ => None,
        })
    }

    pub fn find_producer(&self, name: &str) -> Option<&ProducerDecl> {
        self.producers().find(|decl| decl.name() == name)
    }
}

fn line_col_to_offset(source: &str, line: usize, column: usize) -> u32 {
    if line == 0 {
        return 0;
    }
    let line_start: usize = source
        .split_inclusive('\n')
        .take(line - 1)
        .map(str::len)
        .sum();
    let offset = (line_start + column.saturating_sub(1)).min(source.len());
    offset as u32
}

/// Top-level items.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "item", rename_all = "snake_case")]
pub enum Item {
    /// A nominal record type that retrofit producers can attach to.
    Record(RecordDef),
    Producer(ProducerDecl),
    /// Top-level script. Not a producer body: yields are rejected here.
    Main { body: Spanned<Stmt> },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordDef {
    pub name: String,
    pub fields: Vec<String>,
}

/// A producer: a parameter list (or retrofit receiver) and a body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProducerDecl {
    pub head: ProducerHead,
    pub body: Spanned<Stmt>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ProducerHead {
    /// `@fgenerator function name(params...)`: a fresh callable.
    Callable { name: String, params: Vec<String> },
    /// `@fgenerator(binding::TypeName) do ... end`: the fold
    /// implementation of an existing record type.
    Retrofit { binding: String, type_name: String },
}

impl ProducerDecl {
    /// Display name: the callable's name, or `<TypeName>` for retrofits.
    pub fn name(&self) -> String {
        match &self.head {
            ProducerHead::Callable { name, .. } => name.clone(),
            ProducerHead::Retrofit { type_name, .. } => format!("<{}>", type_name),
        }
    }

    /// Names bound at invocation time, in argument order.
    pub fn params(&self) -> Vec<String> {
        match &self.head {
            ProducerHead::Callable { params, .. } => params.clone(),
            ProducerHead::Retrofit { binding, .. } => vec![binding.clone()],
        }
    }
}

/// Control-flow statements.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stmt", rename_all = "snake_case")]
pub enum Stmt {
    Sequence {
        body: Vec<Spanned<Stmt>>,
    },
    /// Produce one item.
    Emit {
        value: Spanned<Expr>,
    },
    /// Produce every item of another foldable value, in its order.
    Delegate {
        source: Spanned<Expr>,
    },
    Conditional {
        test: Spanned<Expr>,
        then_branch: Box<Spanned<Stmt>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        else_branch: Option<Box<Spanned<Stmt>>>,
    },
    Loop {
        kind: LoopKind,
        body: Box<Spanned<Stmt>>,
    },
    /// End the whole invocation. The value is evaluated but not folded.
    Return {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<Spanned<Expr>>,
    },
    Break,
    Continue,
    /// Any non-control-flow statement, evaluated for its effect.
    Other {
        expr: Spanned<Expr>,
    },
}

impl Stmt {
    /// Short construct name used in diagnostics.
    pub fn keyword(&self) -> &'static str {
        match self {
            Stmt::Sequence { .. } => "sequence",
            Stmt::Emit { .. } => "emit",
            Stmt::Delegate { .. } => "delegate",
            Stmt::Conditional { .. } => "if",
            Stmt::Loop { kind, .. } => match kind {
                LoopKind::Indefinite => "while true",
                LoopKind::Tested { .. } => "while",
                LoopKind::Iterating { .. } => "for",
            },
            Stmt::Return { .. } => "return",
            Stmt::Break => "break",
            Stmt::Continue => "continue",
            Stmt::Other { .. } => "statement",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "loop", rename_all = "snake_case")]
pub enum LoopKind {
    /// `while true`
    Indefinite,
    /// `while test`
    Tested { test: Spanned<Expr> },
    /// `for binding in source`
    Iterating {
        binding: String,
        source: Spanned<Expr>,
    },
}

/// Expressions. Opaque to the lowering engine; evaluated by the driver.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "expr", rename_all = "snake_case")]
pub enum Expr {
    Nil,
    Bool {
        value: bool,
    },
    Int {
        value: i64,
    },
    Str {
        value: String,
    },
    Var {
        name: String,
    },
    Unary {
        op: UnOp,
        operand: Box<Spanned<Expr>>,
    },
    Binary {
        op: BinOp,
        lhs: Box<Spanned<Expr>>,
        rhs: Box<Spanned<Expr>>,
    },
    Assign {
        name: String,
        value: Box<Spanned<Expr>>,
    },
    List {
        items: Vec<Spanned<Expr>>,
    },
    /// Inclusive range `start:step:stop`.
    Range {
        start: Box<Spanned<Expr>>,
        stop: Box<Spanned<Expr>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        step: Option<Box<Spanned<Expr>>>,
    },
    Call {
        callee: String,
        args: Vec<Spanned<Expr>>,
    },
    Record {
        type_name: String,
        fields: Vec<FieldInit>,
    },
    Field {
        object: Box<Spanned<Expr>>,
        name: String,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldInit {
    pub name: String,
    pub value: Spanned<Expr>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnOp {
    Neg, // -
    Not, // !
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinOp {
    Add, // +
    Sub, // -
    Mul, // *
    Div, // ÷ (truncating)
    Rem, // %
    Eq,  // ==
    Ne,  // !=
    Lt,  // <
    Le,  // <=
    Gt,  // >
    Ge,  // >=
    And, // &&
    Or,  // ||
}

impl BinOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
        }
    }
}

impl UnOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnOp::Neg => "-",
            UnOp::Not => "!",
        }
    }
}
