//! JavaScript front end.
//!
//! Kernel source is parsed with the swc ECMAScript parser. The text is
//! wrapped in parentheses so both `function (inputs) { ... }` and
//! `(inputs) => { ... }` parse as a single expression statement.

use crate::{Result, TranspileError};
use std::fmt;
use swc_core::common::{sync::Lrc, FileName, SourceMap, Span, Spanned};
use swc_core::ecma::ast::{BlockStmt, BlockStmtOrExpr, EsVersion, Expr, Pat, Stmt};
use swc_core::ecma::parser::{lexer::Lexer, Parser, StringInput, Syntax};

/// 1-based line range in the kernel source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLines {
    pub start: usize,
    pub end: usize,
}

impl fmt::Display for SourceLines {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "line {}", self.start)
        } else {
            write!(f, "lines {}-{}", self.start, self.end)
        }
    }
}

/// Maps parser byte positions back to kernel source lines.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    base: u32,
    len: usize,
}

impl LineIndex {
    /// `base` is the parser position of the first byte of the kernel text.
    pub fn new(source: &str, base: u32) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(source.match_indices('\n').map(|(i, _)| i + 1));
        Self {
            line_starts,
            base,
            len: source.len(),
        }
    }

    fn line_of(&self, pos: u32) -> usize {
        let offset = (pos.saturating_sub(self.base) as usize).min(self.len);
        self.line_starts.partition_point(|start| *start <= offset).max(1)
    }

    /// Lines covered by a span.
    pub fn lines(&self, span: Span) -> SourceLines {
        let start = self.line_of(span.lo.0);
        let end = self.line_of(span.hi.0.saturating_sub(1).max(span.lo.0));
        SourceLines { start, end }
    }
}

/// How the kernel function was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelForm {
    Function,
    Arrow,
}

/// A parsed kernel function.
#[derive(Debug, Clone)]
pub struct KernelSource {
    /// Name of a named function expression.
    pub name: Option<String>,
    pub form: KernelForm,
    pub params: Vec<Pat>,
    pub body: BlockStmt,
    pub is_async: bool,
    pub is_generator: bool,
    /// Span of the whole function.
    pub span: Span,
    pub lines: LineIndex,
}

impl KernelSource {
    /// Name of the single `inputs` parameter.
    pub fn parameter_name(&self) -> Option<String> {
        match self.params.as_slice() {
            [Pat::Ident(binding)] => Some(binding.id.sym.to_string()),
            _ => None,
        }
    }
}

/// Parse kernel source text into a [`KernelSource`].
pub fn parse_kernel(source: &str) -> Result<KernelSource> {
    let cm: Lrc<SourceMap> = Default::default();
    let fm = cm.new_source_file(
        FileName::Custom("kernel.js".to_string()),
        format!("({}\n)", source),
    );
    // +1 skips the opening parenthesis.
    let lines = LineIndex::new(source, fm.start_pos.0 + 1);

    let lexer = Lexer::new(
        Syntax::Es(Default::default()),
        EsVersion::Es2022,
        StringInput::from(&*fm),
        None,
    );
    let mut parser = Parser::new_from(lexer);

    let script = parser.parse_script().map_err(|err| {
        TranspileError::parse(err.kind().msg().to_string()).with_location(lines.lines(err.span()))
    })?;
    if let Some(err) = parser.take_errors().into_iter().next() {
        return Err(TranspileError::parse(err.kind().msg().to_string())
            .with_location(lines.lines(err.span())));
    }

    let expr = match script.body.as_slice() {
        [Stmt::Expr(stmt)] => &*stmt.expr,
        _ => {
            return Err(TranspileError::parse(
                "kernel source must be a single function expression",
            ))
        }
    };
    let inner = match expr {
        Expr::Paren(paren) => &*paren.expr,
        other => other,
    };

    match inner {
        Expr::Fn(fn_expr) => {
            let function = &fn_expr.function;
            let body = function.body.clone().ok_or_else(|| {
                TranspileError::parse("kernel function has no body")
            })?;
            Ok(KernelSource {
                name: fn_expr.ident.as_ref().map(|id| id.sym.to_string()),
                form: KernelForm::Function,
                params: function.params.iter().map(|p| p.pat.clone()).collect(),
                body,
                is_async: function.is_async,
                is_generator: function.is_generator,
                span: function.span,
                lines,
            })
        }
        Expr::Arrow(arrow) => {
            let body = match &*arrow.body {
                BlockStmtOrExpr::BlockStmt(block) => block.clone(),
                BlockStmtOrExpr::Expr(_) => {
                    return Err(TranspileError::unsupported(
                        "kernel arrow functions need a block body",
                    )
                    .with_location(lines.lines(arrow.span)))
                }
            };
            Ok(KernelSource {
                name: None,
                form: KernelForm::Arrow,
                params: arrow.params.clone(),
                body,
                is_async: arrow.is_async,
                is_generator: arrow.is_generator,
                span: arrow.span,
                lines,
            })
        }
        _ => Err(TranspileError::parse(
            "kernel source must be a function expression or an arrow function",
        )),
    }
}
