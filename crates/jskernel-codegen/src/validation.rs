//! Structural checks on a parsed kernel.
//!
//! These run before the walker and reject kernels whose overall shape is
//! wrong: parameter count, async or generator functions, and misplaced
//! function declarations. Expression-level rules are enforced during the
//! walk.

use crate::dsl;
use crate::parse::KernelSource;
use crate::{Result, TranspileError};
use swc_core::common::Spanned;
use swc_core::ecma::ast::{Decl, Expr, Lit, Pat, Stmt};

/// Validate a parsed kernel.
pub fn validate_kernel(kernel: &KernelSource) -> Result<()> {
    let at = |err: TranspileError| err.with_location(kernel.lines.lines(kernel.span));

    if kernel.is_async {
        return Err(at(TranspileError::unsupported(
            "async kernels are not supported",
        )));
    }
    if kernel.is_generator {
        return Err(at(TranspileError::unsupported(
            "generator kernels are not supported",
        )));
    }

    match kernel.params.as_slice() {
        [Pat::Ident(binding)] => {
            if binding.id.sym.starts_with("__") {
                return Err(at(TranspileError::unsupported(format!(
                    "identifier `{}` is reserved",
                    binding.id.sym
                ))));
            }
            let name = &*binding.id.sym;
            if dsl::helper(name).is_some()
                || matches!(name, dsl::TYPES | "Math" | "arguments" | "undefined")
            {
                return Err(at(TranspileError::unsupported(format!(
                    "`{}` is a builtin name and cannot be the kernel parameter",
                    name
                ))));
            }
        }
        [_] => {
            return Err(at(TranspileError::unsupported(
                "the kernel parameter must be a plain identifier",
            )))
        }
        params => {
            return Err(at(TranspileError::unsupported(format!(
                "kernels take exactly one parameter, got {}",
                params.len()
            ))))
        }
    }

    let mut seen_statement = false;
    for stmt in &kernel.body.stmts {
        let located = |err: TranspileError| err.with_location(kernel.lines.lines(stmt.span()));
        match stmt {
            Stmt::Decl(Decl::Fn(decl)) => {
                if seen_statement {
                    return Err(located(TranspileError::unsupported(format!(
                        "function `{}` must be declared before any other statement",
                        decl.ident.sym
                    ))));
                }
                if decl.function.is_async || decl.function.is_generator {
                    return Err(located(TranspileError::unsupported(format!(
                        "function `{}` cannot be async or a generator",
                        decl.ident.sym
                    ))));
                }
                if let Some(body) = &decl.function.body {
                    check_no_functions(&body.stmts, kernel)?;
                }
            }
            other => {
                if !is_directive(other) {
                    seen_statement = true;
                }
                check_no_functions(std::slice::from_ref(other), kernel)?;
            }
        }
    }
    Ok(())
}

/// Whether a statement is a string directive such as `"use strict"`.
pub fn is_directive(stmt: &Stmt) -> bool {
    matches!(stmt, Stmt::Expr(expr) if matches!(&*expr.expr, Expr::Lit(Lit::Str(_))))
}

fn check_no_functions(stmts: &[Stmt], kernel: &KernelSource) -> Result<()> {
    for stmt in stmts {
        match stmt {
            Stmt::Decl(Decl::Fn(_)) => {
                return Err(TranspileError::unsupported(
                    "nested function declarations are not allowed",
                )
                .with_location(kernel.lines.lines(stmt.span())))
            }
            Stmt::Block(block) => check_no_functions(&block.stmts, kernel)?,
            Stmt::If(if_stmt) => {
                check_no_functions(std::slice::from_ref(&*if_stmt.cons), kernel)?;
                if let Some(alt) = &if_stmt.alt {
                    check_no_functions(std::slice::from_ref(&**alt), kernel)?;
                }
            }
            Stmt::For(for_stmt) => {
                check_no_functions(std::slice::from_ref(&*for_stmt.body), kernel)?
            }
            Stmt::While(while_stmt) => {
                check_no_functions(std::slice::from_ref(&*while_stmt.body), kernel)?
            }
            _ => {}
        }
    }
    Ok(())
}
