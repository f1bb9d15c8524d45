//! Pretty-printing utilities for tree nodes.
//!
//! Single source of truth for rendering expressions and statements in
//! diagnostics, lowered-code listings and `foldgen dump --tree`.

use super::{Expr, LoopKind, ProducerDecl, ProducerHead, Stmt};
use crate::span::Spanned;

/// Render an expression on one line.
pub fn format_expr(expr: &Expr) -> String {
    match expr {
        Expr::Nil => "nothing".to_string(),
        Expr::Bool { value } => value.to_string(),
        Expr::Int { value } => value.to_string(),
        Expr::Str { value } => format!("{:?}", value),
        Expr::Var { name } => name.clone(),
        Expr::Unary { op, operand } => format!("{}{}", op.as_str(), format_operand(&operand.node)),
        Expr::Binary { op, lhs, rhs } => format!(
            "{} {} {}",
            format_operand(&lhs.node),
            op.as_str(),
            format_operand(&rhs.node)
        ),
        Expr::Assign { name, value } => format!("{} = {}", name, format_expr(&value.node)),
        Expr::List { items } => format!("[{}]", join(items)),
        Expr::Range { start, stop, step } => match step {
            Some(step) => format!(
                "{}:{}:{}",
                format_operand(&start.node),
                format_operand(&step.node),
                format_operand(&stop.node)
            ),
            None => format!(
                "{}:{}",
                format_operand(&start.node),
                format_operand(&stop.node)
            ),
        },
        Expr::Call { callee, args } => format!("{}({})", callee, join(args)),
        Expr::Record { type_name, fields } => {
            let parts: Vec<_> = fields
                .iter()
                .map(|f| format!("{}: {}", f.name, format_expr(&f.value.node)))
                .collect();
            format!("{} {{ {} }}", type_name, parts.join(", "))
        }
        Expr::Field { object, name } => format!("{}.{}", format_operand(&object.node), name),
    }
}

/// Compound operands are parenthesized so the rendering stays unambiguous.
fn format_operand(expr: &Expr) -> String {
    match expr {
        Expr::Binary { .. } | Expr::Assign { .. } | Expr::Range { .. } => {
            format!("({})", format_expr(expr))
        }
        _ => format_expr(expr),
    }
}

fn join(exprs: &[Spanned<Expr>]) -> String {
    let parts: Vec<_> = exprs.iter().map(|e| format_expr(&e.node)).collect();
    parts.join(", ")
}

/// Render a producer declaration as indented source-like text.
pub fn format_producer(decl: &ProducerDecl) -> String {
    let mut out = match &decl.head {
        ProducerHead::Callable { name, params } => {
            format!("producer {}({})\n", name, params.join(", "))
        }
        ProducerHead::Retrofit { binding, type_name } => {
            format!("producer ({}::{})\n", binding, type_name)
        }
    };
    write_stmt(&mut out, &decl.body.node, 1);
    out.push_str("end\n");
    out
}

/// Render a statement tree as indented source-like text.
pub fn format_stmt(stmt: &Stmt) -> String {
    let mut out = String::new();
    write_stmt(&mut out, stmt, 0);
    out
}

fn write_stmt(out: &mut String, stmt: &Stmt, depth: usize) {
    let pad = "    ".repeat(depth);
    match stmt {
        Stmt::Sequence { body } => {
            for s in body {
                write_stmt(out, &s.node, depth);
            }
        }
        Stmt::Emit { value } => {
            out.push_str(&format!("{}@yield {}\n", pad, format_expr(&value.node)));
        }
        Stmt::Delegate { source } => {
            out.push_str(&format!("{}@yieldfrom {}\n", pad, format_expr(&source.node)));
        }
        Stmt::Conditional {
            test,
            then_branch,
            else_branch,
        } => {
            out.push_str(&format!("{}if {}\n", pad, format_expr(&test.node)));
            write_stmt(out, &then_branch.node, depth + 1);
            if let Some(else_branch) = else_branch {
                out.push_str(&format!("{}else\n", pad));
                write_stmt(out, &else_branch.node, depth + 1);
            }
            out.push_str(&format!("{}end\n", pad));
        }
        Stmt::Loop { kind, body } => {
            let header = match kind {
                LoopKind::Indefinite => "while true".to_string(),
                LoopKind::Tested { test } => format!("while {}", format_expr(&test.node)),
                LoopKind::Iterating { binding, source } => {
                    format!("for {} in {}", binding, format_expr(&source.node))
                }
            };
            out.push_str(&format!("{}{}\n", pad, header));
            write_stmt(out, &body.node, depth + 1);
            out.push_str(&format!("{}end\n", pad));
        }
        Stmt::Return { value } => match value {
            Some(v) => out.push_str(&format!("{}return {}\n", pad, format_expr(&v.node))),
            None => out.push_str(&format!("{}return\n", pad)),
        },
        Stmt::Break => out.push_str(&format!("{}break\n", pad)),
        Stmt::Continue => out.push_str(&format!("{}continue\n", pad)),
        Stmt::Other { expr } => {
            out.push_str(&format!("{}{}\n", pad, format_expr(&expr.node)));
        }
    }
}
