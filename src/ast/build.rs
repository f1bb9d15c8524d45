//! Terse constructors for building trees by hand.
//!
//! Every node gets a dummy span. Used by tests, benchmarks and embedders
//! that assemble producers programmatically instead of going through JSON.

use super::*;

fn sp<T>(node: T) -> Spanned<T> {
    Spanned::dummy(node)
}

// ─── Expressions ───────────────────────────────────────────────────

pub fn nil() -> Spanned<Expr> {
    sp(Expr::Nil)
}

pub fn boolean(value: bool) -> Spanned<Expr> {
    sp(Expr::Bool { value })
}

pub fn int(value: i64) -> Spanned<Expr> {
    sp(Expr::Int { value })
}

pub fn string(value: &str) -> Spanned<Expr> {
    sp(Expr::Str {
        value: value.to_string(),
    })
}

pub fn var(name: &str) -> Spanned<Expr> {
    sp(Expr::Var {
        name: name.to_string(),
    })
}

pub fn unary(op: UnOp, operand: Spanned<Expr>) -> Spanned<Expr> {
    sp(Expr::Unary {
        op,
        operand: Box::new(operand),
    })
}

pub fn binary(op: BinOp, lhs: Spanned<Expr>, rhs: Spanned<Expr>) -> Spanned<Expr> {
    sp(Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    })
}

pub fn add(lhs: Spanned<Expr>, rhs: Spanned<Expr>) -> Spanned<Expr> {
    binary(BinOp::Add, lhs, rhs)
}

pub fn sub(lhs: Spanned<Expr>, rhs: Spanned<Expr>) -> Spanned<Expr> {
    binary(BinOp::Sub, lhs, rhs)
}

pub fn eq(lhs: Spanned<Expr>, rhs: Spanned<Expr>) -> Spanned<Expr> {
    binary(BinOp::Eq, lhs, rhs)
}

pub fn ne(lhs: Spanned<Expr>, rhs: Spanned<Expr>) -> Spanned<Expr> {
    binary(BinOp::Ne, lhs, rhs)
}

pub fn lt(lhs: Spanned<Expr>, rhs: Spanned<Expr>) -> Spanned<Expr> {
    binary(BinOp::Lt, lhs, rhs)
}

pub fn gt(lhs: Spanned<Expr>, rhs: Spanned<Expr>) -> Spanned<Expr> {
    binary(BinOp::Gt, lhs, rhs)
}

pub fn rem(lhs: Spanned<Expr>, rhs: Spanned<Expr>) -> Spanned<Expr> {
    binary(BinOp::Rem, lhs, rhs)
}

pub fn assign(name: &str, value: Spanned<Expr>) -> Spanned<Expr> {
    sp(Expr::Assign {
        name: name.to_string(),
        value: Box::new(value),
    })
}

pub fn list(items: Vec<Spanned<Expr>>) -> Spanned<Expr> {
    sp(Expr::List { items })
}

/// Inclusive `start:stop`.
pub fn range(start: Spanned<Expr>, stop: Spanned<Expr>) -> Spanned<Expr> {
    sp(Expr::Range {
        start: Box::new(start),
        stop: Box::new(stop),
        step: None,
    })
}

/// Inclusive `start:step:stop`.
pub fn range_step(start: Spanned<Expr>, step: Spanned<Expr>, stop: Spanned<Expr>) -> Spanned<Expr> {
    sp(Expr::Range {
        start: Box::new(start),
        stop: Box::new(stop),
        step: Some(Box::new(step)),
    })
}

pub fn call(callee: &str, args: Vec<Spanned<Expr>>) -> Spanned<Expr> {
    sp(Expr::Call {
        callee: callee.to_string(),
        args,
    })
}

pub fn record(type_name: &str, fields: Vec<(&str, Spanned<Expr>)>) -> Spanned<Expr> {
    sp(Expr::Record {
        type_name: type_name.to_string(),
        fields: fields
            .into_iter()
            .map(|(name, value)| FieldInit {
                name: name.to_string(),
                value,
            })
            .collect(),
    })
}

pub fn field(object: Spanned<Expr>, name: &str) -> Spanned<Expr> {
    sp(Expr::Field {
        object: Box::new(object),
        name: name.to_string(),
    })
}

// ─── Statements ────────────────────────────────────────────────────

pub fn seq(body: Vec<Spanned<Stmt>>) -> Spanned<Stmt> {
    sp(Stmt::Sequence { body })
}

pub fn emit(value: Spanned<Expr>) -> Spanned<Stmt> {
    sp(Stmt::Emit { value })
}

pub fn delegate(source: Spanned<Expr>) -> Spanned<Stmt> {
    sp(Stmt::Delegate { source })
}

pub fn if_then(test: Spanned<Expr>, then_branch: Spanned<Stmt>) -> Spanned<Stmt> {
    sp(Stmt::Conditional {
        test,
        then_branch: Box::new(then_branch),
        else_branch: None,
    })
}

pub fn if_else(
    test: Spanned<Expr>,
    then_branch: Spanned<Stmt>,
    else_branch: Spanned<Stmt>,
) -> Spanned<Stmt> {
    sp(Stmt::Conditional {
        test,
        then_branch: Box::new(then_branch),
        else_branch: Some(Box::new(else_branch)),
    })
}

pub fn while_true(body: Spanned<Stmt>) -> Spanned<Stmt> {
    sp(Stmt::Loop {
        kind: LoopKind::Indefinite,
        body: Box::new(body),
    })
}

pub fn while_loop(test: Spanned<Expr>, body: Spanned<Stmt>) -> Spanned<Stmt> {
    sp(Stmt::Loop {
        kind: LoopKind::Tested { test },
        body: Box::new(body),
    })
}

pub fn for_in(binding: &str, source: Spanned<Expr>, body: Spanned<Stmt>) -> Spanned<Stmt> {
    sp(Stmt::Loop {
        kind: LoopKind::Iterating {
            binding: binding.to_string(),
            source,
        },
        body: Box::new(body),
    })
}

pub fn ret() -> Spanned<Stmt> {
    sp(Stmt::Return { value: None })
}

pub fn ret_value(value: Spanned<Expr>) -> Spanned<Stmt> {
    sp(Stmt::Return { value: Some(value) })
}

pub fn brk() -> Spanned<Stmt> {
    sp(Stmt::Break)
}

pub fn cont() -> Spanned<Stmt> {
    sp(Stmt::Continue)
}

pub fn other(expr: Spanned<Expr>) -> Spanned<Stmt> {
    sp(Stmt::Other { expr })
}

/// `name = name + 1`
pub fn incr(name: &str) -> Spanned<Stmt> {
    other(assign(name, add(var(name), int(1))))
}

// ─── Declarations ──────────────────────────────────────────────────

pub fn producer(name: &str, params: &[&str], body: Spanned<Stmt>) -> ProducerDecl {
    ProducerDecl {
        head: ProducerHead::Callable {
            name: name.to_string(),
            params: params.iter().map(|p| p.to_string()).collect(),
        },
        body,
    }
}

pub fn retrofit(binding: &str, type_name: &str, body: Spanned<Stmt>) -> ProducerDecl {
    ProducerDecl {
        head: ProducerHead::Retrofit {
            binding: binding.to_string(),
            type_name: type_name.to_string(),
        },
        body,
    }
}

pub fn record_def(name: &str, fields: &[&str]) -> Item {
    Item::Record(RecordDef {
        name: name.to_string(),
        fields: fields.iter().map(|f| f.to_string()).collect(),
    })
}

pub fn main_script(body: Spanned<Stmt>) -> Item {
    Item::Main { body }
}

pub fn program(items: Vec<Item>) -> Program {
    Program {
        items: items.into_iter().map(sp).collect(),
    }
}

pub fn program_of(decls: Vec<ProducerDecl>) -> Program {
    program(decls.into_iter().map(Item::Producer).collect())
}
