//! Core JavaScript-to-kernel transpiler.
//!
//! One recursive walker serves both targets. Statements come back as
//! indented text, expressions as [`Typed`] values; everything that differs
//! between WGSL and JavaScript goes through the [`Backend`] or the overload
//! templates.

use crate::backend::{self, linear_address, Backend, DeclKind};
use crate::dsl::{self, unparen, MemberChain, Pseudo};
use crate::functions::{Overload, Template};
use crate::layout::{BufferSpec, KernelLayout, Target};
use crate::loops::{strip_parens, LoopHeader};
use crate::parse::KernelSource;
use crate::processors::{process_function, process_index, process_property, ExprInfo, Typed};
use crate::state::{Binding, DeclaredFunction, FunctionFrame, WalkState};
use crate::swizzle;
use crate::types::VariableType;
use crate::validation::is_directive;
use crate::{Result, TranspileError};
use swc_core::common::Spanned;
use swc_core::ecma::ast::{
    ArrayLit, AssignExpr, AssignOp, BinExpr, BinaryOp, CallExpr, Callee, CondExpr, Decl, Expr,
    FnDecl, ForStmt, IfStmt, Lit, MemberExpr, MemberProp, Pat, PatOrExpr, ReturnStmt, Stmt,
    UnaryExpr, UnaryOp, UpdateExpr, UpdateOp, VarDeclKind, VarDeclOrExpr, VarDeclarator,
};

/// Output of a walk: the entry point body and the declared functions.
#[derive(Debug, Clone, PartialEq)]
pub struct KernelBody {
    /// Statements of the entry point, indented one level.
    pub body: String,
    /// Declared functions in declaration order.
    pub functions: Vec<DeclaredFunction>,
}

/// Kernel transpiler.
pub struct Transpiler<'a> {
    kernel: &'a KernelSource,
    state: WalkState<'a>,
    backend: &'static dyn Backend,
    /// Current indentation level.
    indent: usize,
}

/// Left-hand side of an assignment or update.
enum AssignTarget<'e> {
    Name(&'e str),
    Expr(&'e Expr),
}

/// Something that can be written to.
enum Place {
    Variable {
        name: String,
        code: String,
        ty: VariableType,
        array_length: Option<usize>,
    },
    Element {
        code: String,
        ty: VariableType,
    },
    Buffer {
        buffer: String,
        address: String,
        ty: VariableType,
    },
}

impl Place {
    fn ty(&self) -> VariableType {
        match self {
            Place::Variable { ty, .. } | Place::Element { ty, .. } | Place::Buffer { ty, .. } => *ty,
        }
    }

    fn describe(&self) -> String {
        match self {
            Place::Variable { name, .. } => format!("`{}`", name),
            Place::Element { .. } => "an array element".to_string(),
            Place::Buffer { buffer, .. } => format!("an element of buffer `{}`", buffer),
        }
    }

    fn read(&self, backend: &dyn Backend) -> Typed {
        let code = match self {
            Place::Variable { code, .. } | Place::Element { code, .. } => code.clone(),
            Place::Buffer {
                buffer, address, ..
            } => backend.buffer_load(buffer, address),
        };
        Typed::new(code, self.ty())
    }

    fn write(&self, backend: &dyn Backend, value: &str) -> String {
        match self {
            Place::Variable { code, .. } | Place::Element { code, .. } => {
                format!("{} = {}", code, value)
            }
            Place::Buffer {
                buffer, address, ..
            } => backend.buffer_store(buffer, address, value),
        }
    }
}

/// Evaluate a constant arithmetic operator.
fn fold(op: &str, a: f64, b: f64) -> Option<f64> {
    match op {
        "+" => Some(a + b),
        "-" => Some(a - b),
        "*" => Some(a * b),
        "/" => Some(a / b),
        "%" => Some(a % b),
        _ => None,
    }
}

/// Reject constants that have no `f32` representation.
fn finite(value: f64, source: impl FnOnce() -> String) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(TranspileError::unsupported(format!(
            "constant `{}` is not a finite number",
            source()
        )))
    }
}

/// Whether control never falls through `stmt`.
fn always_returns(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Return(_) => true,
        Stmt::Block(block) => block.stmts.iter().any(always_returns),
        Stmt::If(IfStmt {
            cons,
            alt: Some(alt),
            ..
        }) => always_returns(cons) && always_returns(alt),
        _ => false,
    }
}

/// Short description of an expression kind for diagnostics.
fn describe_expr(expr: &Expr) -> &'static str {
    match expr {
        Expr::This(_) => "`this`",
        Expr::Object(_) => "object literals",
        Expr::Fn(_) => "function expressions",
        Expr::Arrow(_) => "arrow functions",
        Expr::New(_) => "`new` expressions",
        Expr::Seq(_) => "sequence expressions",
        Expr::Tpl(_) | Expr::TaggedTpl(_) => "template literals",
        Expr::Class(_) => "class expressions",
        Expr::Yield(_) => "`yield`",
        Expr::Await(_) => "`await`",
        Expr::OptChain(_) => "optional chaining",
        Expr::SuperProp(_) => "`super`",
        Expr::MetaProp(_) => "meta properties",
        _ => "expressions of this kind",
    }
}

/// Match one declarator of the ES5 default-parameter idiom:
/// `var a = arguments.length > 0 && arguments[0] !== undefined ? arguments[0] : types.number;`
fn es5_parameter(decl: &VarDeclarator, position: usize) -> Option<(&str, &Expr)> {
    let Pat::Ident(binding) = &decl.name else {
        return None;
    };
    let Expr::Cond(cond) = unparen(decl.init.as_deref()?) else {
        return None;
    };
    let Expr::Member(member) = unparen(&cond.cons) else {
        return None;
    };
    let reads_argument = matches!(unparen(&member.obj), Expr::Ident(id) if &*id.sym == "arguments")
        && matches!(
            &member.prop,
            MemberProp::Computed(c)
                if matches!(unparen(&c.expr), Expr::Lit(Lit::Num(n)) if n.value == position as f64)
        );
    reads_argument.then_some((&*binding.id.sym, &*cond.alt))
}

fn assign_target(left: &PatOrExpr) -> Result<AssignTarget<'_>> {
    match left {
        PatOrExpr::Expr(expr) => Ok(AssignTarget::Expr(expr)),
        PatOrExpr::Pat(pat) => match &**pat {
            Pat::Ident(binding) => Ok(AssignTarget::Name(&*binding.id.sym)),
            Pat::Expr(expr) => Ok(AssignTarget::Expr(expr)),
            _ => Err(TranspileError::unsupported(
                "destructuring assignments are not supported",
            )),
        },
    }
}

impl<'a> Transpiler<'a> {
    /// Create a transpiler for a validated kernel.
    pub fn new(kernel: &'a KernelSource, layout: &'a KernelLayout, target: Target) -> Result<Self> {
        let inputs = kernel.parameter_name().ok_or_else(|| {
            TranspileError::unsupported("the kernel parameter must be a plain identifier")
        })?;
        Ok(Self {
            kernel,
            state: WalkState::new(target, layout, &inputs),
            backend: backend::for_target(target),
            indent: 1,
        })
    }

    fn indent_str(&self) -> String {
        "    ".repeat(self.indent)
    }

    /// Walk the whole kernel.
    pub fn transpile(mut self) -> Result<KernelBody> {
        let kernel = self.kernel;
        let mut body = String::new();
        for stmt in &kernel.body.stmts {
            match stmt {
                Stmt::Decl(Decl::Fn(decl)) => {
                    let lines = kernel.lines.lines(stmt.span());
                    self.transpile_function(decl)
                        .map_err(|err| err.with_location(lines))?;
                }
                other => body.push_str(&self.transpile_stmt(other)?),
            }
        }
        Ok(KernelBody {
            body,
            functions: self.state.functions,
        })
    }

    // === Functions ===

    /// Lower a top-level function declaration and register it.
    fn transpile_function(&mut self, decl: &FnDecl) -> Result<()> {
        let name = decl.ident.sym.to_string();
        self.state.check_name(&name)?;
        let function = &decl.function;
        let body = function.body.as_ref().ok_or_else(|| {
            TranspileError::unsupported(format!("function `{}` has no body", name))
        })?;

        // Parameters come from ES6 defaults or the ES5 `arguments` idiom.
        let mut annotated: Vec<(&str, &Expr)> = Vec::new();
        let mut skip = 0;
        if function.params.is_empty() {
            for stmt in &body.stmts {
                if is_directive(stmt) {
                    skip += 1;
                    continue;
                }
                let Stmt::Decl(Decl::Var(var)) = stmt else {
                    break;
                };
                let matched: Option<Vec<_>> = var
                    .decls
                    .iter()
                    .enumerate()
                    .map(|(i, d)| es5_parameter(d, annotated.len() + i))
                    .collect();
                match matched {
                    Some(params) => {
                        annotated.extend(params);
                        skip += 1;
                    }
                    None => break,
                }
            }
        } else {
            for (position, param) in function.params.iter().enumerate() {
                match &param.pat {
                    Pat::Assign(assign) => match &*assign.left {
                        Pat::Ident(binding) => annotated.push((&*binding.id.sym, &*assign.right)),
                        _ => {
                            return Err(TranspileError::unsupported(format!(
                                "parameter {} of `{}` must be a plain identifier",
                                position + 1,
                                name
                            )))
                        }
                    },
                    _ => {
                        return Err(TranspileError::type_mismatch(format!(
                            "parameter {} of `{}` needs a type, e.g. `x = types.number`",
                            position + 1,
                            name
                        )))
                    }
                }
            }
        }

        let mut params = Vec::with_capacity(annotated.len());
        for (param, annotation) in annotated {
            let element = match self.transpile_expr(annotation)?.ty {
                VariableType::TypeLiteral(element) => element,
                other => {
                    return Err(TranspileError::type_mismatch(format!(
                        "parameter `{}` of `{}` must default to a type literal, got {}",
                        param, name, other
                    )))
                }
            };
            params.push((param.to_string(), element));
        }

        let saved_indent = self.indent;
        self.indent = 1;
        self.state.push_scope();
        self.state.frame = Some(FunctionFrame::new(&name));
        for (param, element) in &params {
            self.state.declare(
                param,
                Binding::parameter(*element, self.backend.identifier(param)),
            )?;
        }

        let mut text = String::new();
        for stmt in &body.stmts[skip..] {
            text.push_str(&self.transpile_stmt(stmt)?);
        }

        let frame = self.state.frame.take();
        self.state.pop_scope();
        self.indent = saved_indent;

        let return_type = frame
            .and_then(|f| f.return_type)
            .unwrap_or(VariableType::Void);
        if return_type != VariableType::Void && !body.stmts[skip..].iter().any(always_returns) {
            return Err(TranspileError::type_mismatch(format!(
                "function `{}` does not return a value on every path",
                name
            )));
        }
        let header = self.backend.function_header(&name, &params, &return_type);
        let argument_types: Vec<VariableType> =
            params.iter().map(|(_, element)| element.value_type()).collect();
        let overload = Overload::shared(
            return_type,
            &argument_types,
            Template::Declared {
                name: self.backend.identifier(&name),
                thread_id: self.backend.thread_id_param(),
            },
        );

        tracing::trace!(
            function = %name,
            params = params.len(),
            returns = %return_type,
            "lowered kernel function"
        );

        self.state.declare_function(
            DeclaredFunction {
                name,
                params,
                return_type,
                source: format!("{} {{\n{}}}\n", header, text),
            },
            overload,
        )
    }

    // === Statements ===

    /// Transpile one statement; errors carry the statement's lines.
    fn transpile_stmt(&mut self, stmt: &Stmt) -> Result<String> {
        let lines = self.kernel.lines.lines(stmt.span());
        self.transpile_stmt_inner(stmt)
            .map_err(|err| err.with_location(lines))
    }

    fn transpile_stmt_inner(&mut self, stmt: &Stmt) -> Result<String> {
        let indent = self.indent_str();
        match stmt {
            Stmt::Empty(_) => Ok(String::new()),
            Stmt::Expr(_) if is_directive(stmt) => Ok(String::new()),
            Stmt::Expr(expr) => Ok(format!("{indent}{};\n", self.transpile_effect(&expr.expr)?)),
            Stmt::Decl(Decl::Var(var)) => {
                let mut out = String::new();
                for decl in &var.decls {
                    let text = self.transpile_declarator(var.kind, decl)?;
                    out.push_str(&format!("{indent}{text};\n"));
                }
                Ok(out)
            }
            Stmt::Decl(Decl::Fn(_)) => Err(TranspileError::unsupported(
                "nested function declarations are not allowed",
            )),
            Stmt::Decl(_) => Err(TranspileError::unsupported(
                "only variable and function declarations are supported",
            )),
            Stmt::Block(block) => {
                let inner = self.transpile_scoped(&block.stmts)?;
                Ok(format!("{indent}{{\n{inner}{indent}}}\n"))
            }
            Stmt::If(if_stmt) => Ok(format!("{indent}{}\n", self.transpile_if(if_stmt)?)),
            Stmt::For(for_stmt) => self.transpile_for(for_stmt),
            Stmt::While(while_stmt) => {
                let test = self.condition(&while_stmt.test, "while")?;
                let header = LoopHeader::While { test }.render();
                let body = self.transpile_body(&while_stmt.body)?;
                Ok(format!("{indent}{header} {{\n{body}{indent}}}\n"))
            }
            Stmt::Break(brk) => match brk.label {
                Some(_) => Err(TranspileError::unsupported("labeled `break` is not supported")),
                None => Ok(format!("{indent}break;\n")),
            },
            Stmt::Continue(cont) => match cont.label {
                Some(_) => Err(TranspileError::unsupported(
                    "labeled `continue` is not supported",
                )),
                None => Ok(format!("{indent}continue;\n")),
            },
            Stmt::Return(ret) => self.transpile_return(ret),
            Stmt::DoWhile(_) => Err(TranspileError::unsupported("`do`-`while` loops are not supported")),
            Stmt::ForIn(_) | Stmt::ForOf(_) => Err(TranspileError::unsupported(
                "`for`-`in` and `for`-`of` loops are not supported",
            )),
            Stmt::Switch(_) => Err(TranspileError::unsupported("`switch` is not supported")),
            Stmt::Try(_) | Stmt::Throw(_) => {
                Err(TranspileError::unsupported("exceptions are not supported"))
            }
            Stmt::Labeled(_) => Err(TranspileError::unsupported("labels are not supported")),
            _ => Err(TranspileError::unsupported("unsupported statement")),
        }
    }

    /// Statements in a fresh scope, one level deeper.
    fn transpile_scoped(&mut self, stmts: &[Stmt]) -> Result<String> {
        self.indent += 1;
        self.state.push_scope();
        let mut out = String::new();
        for stmt in stmts {
            out.push_str(&self.transpile_stmt(stmt)?);
        }
        self.state.pop_scope();
        self.indent -= 1;
        Ok(out)
    }

    /// Body of an `if` or loop; single statements get braces.
    fn transpile_body(&mut self, stmt: &Stmt) -> Result<String> {
        match stmt {
            Stmt::Block(block) => self.transpile_scoped(&block.stmts),
            other => self.transpile_scoped(std::slice::from_ref(other)),
        }
    }

    /// A boolean condition without its outer parentheses.
    fn condition(&mut self, expr: &Expr, what: &str) -> Result<String> {
        let test = self.transpile_expr(expr)?;
        if test.ty != VariableType::Boolean {
            return Err(TranspileError::type_mismatch(format!(
                "`{}` condition must be a boolean, got {}",
                what, test.ty
            )));
        }
        Ok(strip_parens(&test.code).to_string())
    }

    fn transpile_if(&mut self, if_stmt: &IfStmt) -> Result<String> {
        let indent = self.indent_str();
        let test = self.condition(&if_stmt.test, "if")?;
        let cons = self.transpile_body(&if_stmt.cons)?;
        let mut out = format!("if ({test}) {{\n{cons}{indent}}}");
        match if_stmt.alt.as_deref() {
            Some(Stmt::If(alt)) => {
                out.push_str(" else ");
                out.push_str(&self.transpile_if(alt)?);
            }
            Some(alt) => {
                let body = self.transpile_body(alt)?;
                out.push_str(&format!(" else {{\n{body}{indent}}}"));
            }
            None => {}
        }
        Ok(out)
    }

    fn transpile_for(&mut self, for_stmt: &ForStmt) -> Result<String> {
        let indent = self.indent_str();
        self.state.push_scope();
        let init = match &for_stmt.init {
            Some(VarDeclOrExpr::VarDecl(var)) => match var.decls.as_slice() {
                [decl] => Some(self.transpile_declarator(var.kind, decl)?),
                _ => {
                    return Err(TranspileError::unsupported(
                        "a `for` initializer can declare only one variable",
                    ))
                }
            },
            Some(VarDeclOrExpr::Expr(expr)) => Some(self.transpile_effect(expr)?),
            None => None,
        };
        let test = match &for_stmt.test {
            Some(test) => Some(self.condition(test, "for")?),
            None => None,
        };
        let update = match &for_stmt.update {
            Some(update) => Some(self.transpile_effect(update)?),
            None => None,
        };
        let header = LoopHeader::For { init, test, update }.render();
        let body = self.transpile_body(&for_stmt.body)?;
        self.state.pop_scope();
        Ok(format!("{indent}{header} {{\n{body}{indent}}}\n"))
    }

    fn transpile_return(&mut self, ret: &ReturnStmt) -> Result<String> {
        let indent = self.indent_str();
        if !self.state.in_function() {
            return match ret.arg {
                None => Ok(format!("{indent}{}\n", self.backend.top_level_return())),
                Some(_) => Err(TranspileError::unsupported(
                    "the kernel body cannot return a value",
                )),
            };
        }

        let (ty, text) = match &ret.arg {
            None => (VariableType::Void, format!("{indent}return;\n")),
            Some(arg) => {
                let value = self.transpile_expr(arg)?;
                if value.ty.as_element().is_none() {
                    return Err(TranspileError::type_mismatch(format!(
                        "functions cannot return a value of type {}",
                        value.ty
                    )));
                }
                (value.ty, format!("{indent}return {};\n", value.code))
            }
        };
        if let Some(frame) = self.state.frame.as_mut() {
            frame.record_return(ty)?;
        }
        Ok(text)
    }

    /// Declaration text without indentation or semicolon.
    fn transpile_declarator(&mut self, kind: VarDeclKind, decl: &VarDeclarator) -> Result<String> {
        let Pat::Ident(binding) = &decl.name else {
            return Err(TranspileError::unsupported(
                "destructuring declarations are not supported",
            ));
        };
        let name = &*binding.id.sym;
        let init = decl.init.as_ref().ok_or_else(|| {
            TranspileError::unsupported(format!("`{}` must be initialized where it is declared", name))
        })?;

        let value = self.transpile_expr(init)?;
        if !value.ty.is_storable() {
            return Err(TranspileError::type_mismatch(format!(
                "cannot bind a value of type {} to `{}`",
                value.ty, name
            )));
        }
        let ty = value.ty.binding_type();
        let array_length = if ty.is_array() {
            let length = value.sizes().and_then(|s| s.first().copied());
            Some(length.ok_or_else(|| {
                TranspileError::type_mismatch(format!(
                    "length of array `{}` is not known at compile time",
                    name
                ))
            })?)
        } else {
            None
        };
        let value = self.copy_if_aliased(init, value);

        let kind = match kind {
            VarDeclKind::Const => DeclKind::Const,
            VarDeclKind::Let => DeclKind::Let,
            VarDeclKind::Var => DeclKind::Var,
        };
        let constant = match (kind, ty) {
            (DeclKind::Const, VariableType::Number) => value.constant(),
            _ => None,
        };
        let emitted = self.backend.identifier(name);
        self.state.declare(
            name,
            Binding {
                ty,
                emitted: emitted.clone(),
                mutable: kind != DeclKind::Const,
                array_length,
                constant,
            },
        )?;
        Ok(self
            .backend
            .declaration(kind, &emitted, &ty, array_length, &value.code))
    }

    /// Arrays read from another variable are copied; WGSL arrays are values.
    fn copy_if_aliased(&self, source: &Expr, value: Typed) -> Typed {
        if value.ty.is_array() && matches!(unparen(source), Expr::Ident(_) | Expr::Member(_)) {
            Typed {
                code: self.backend.copy_array(&value.code),
                ..value
            }
        } else {
            value
        }
    }

    /// An expression evaluated for its effect, without semicolon.
    fn transpile_effect(&mut self, expr: &Expr) -> Result<String> {
        match unparen(expr) {
            Expr::Assign(assign) => self.transpile_assign(assign),
            Expr::Update(update) => self.transpile_update(update),
            other => {
                let value = self.transpile_expr(other)?;
                match value.ty {
                    VariableType::Void => Ok(value.code),
                    ty if ty.as_element().is_some() => Ok(self.backend.discard(&value.code)),
                    ty => Err(TranspileError::unsupported(format!(
                        "a value of type {} cannot be used as a statement",
                        ty
                    ))),
                }
            }
        }
    }

    // === Assignment ===

    fn transpile_assign(&mut self, assign: &AssignExpr) -> Result<String> {
        let op = match assign.op {
            AssignOp::Assign => None,
            AssignOp::AddAssign => Some("+"),
            AssignOp::SubAssign => Some("-"),
            AssignOp::MulAssign => Some("*"),
            AssignOp::DivAssign => Some("/"),
            AssignOp::ModAssign => Some("%"),
            other => {
                return Err(TranspileError::unsupported(format!(
                    "assignment operator `{}` is not supported",
                    other
                )))
            }
        };
        let place = self.resolve_place(assign_target(&assign.left)?)?;
        let value = self.transpile_expr(&assign.right)?;
        let value = self.copy_if_aliased(&assign.right, value);
        self.store(place, op, value)
    }

    fn transpile_update(&mut self, update: &UpdateExpr) -> Result<String> {
        let op = match update.op {
            UpdateOp::PlusPlus => "+",
            UpdateOp::MinusMinus => "-",
        };
        let place = self.resolve_place(AssignTarget::Expr(&update.arg))?;
        if place.ty() != VariableType::Number {
            return Err(TranspileError::type_mismatch(format!(
                "`{}{}` needs a number, got {}",
                op,
                op,
                place.ty()
            )));
        }
        let one = self.constant(1.0);
        self.store(place, Some(op), one)
    }

    /// Check and emit a store; compound operators resolve like binary ones.
    fn store(&mut self, place: Place, op: Option<&str>, value: Typed) -> Result<String> {
        let value = match op {
            None => value,
            Some(op) => {
                let current = place.read(self.backend);
                process_function(&self.state, op, None, &[current, value])?
            }
        };
        if !place.ty().accepts(&value.ty) {
            return Err(TranspileError::type_mismatch(format!(
                "cannot assign {} to {} of type {}",
                value.ty,
                place.describe(),
                place.ty()
            )));
        }
        if let Place::Variable {
            array_length: Some(expected),
            ..
        } = &place
        {
            if let Some(&[actual]) = value.sizes() {
                if actual != *expected {
                    return Err(TranspileError::type_mismatch(format!(
                        "cannot assign an array of length {} to {} of length {}",
                        actual,
                        place.describe(),
                        expected
                    )));
                }
            }
        }
        Ok(place.write(self.backend, &value.code))
    }

    fn resolve_place(&mut self, target: AssignTarget<'_>) -> Result<Place> {
        let expr = match target {
            AssignTarget::Name(name) => return self.variable_place(name),
            AssignTarget::Expr(expr) => unparen(expr),
        };
        let member = match expr {
            Expr::Ident(id) => return self.variable_place(&id.sym),
            Expr::Member(member) => member,
            other => {
                return Err(TranspileError::unsupported(format!(
                    "cannot assign to {}",
                    describe_expr(other)
                )))
            }
        };

        if let Some(chain) = MemberChain::from_member(member) {
            let root = self.state.root_kind(chain.root);
            match dsl::classify(&chain, root, self.state.layout)? {
                Some(Pseudo::Buffer { spec, indices }) => {
                    if indices.len() < spec.rank() {
                        return Err(TranspileError::dimensionality(format!(
                            "buffer `{}` has {} dimensions; assignment needs all of them, got {}",
                            spec.name,
                            spec.rank(),
                            indices.len()
                        )));
                    }
                    let codes = self.buffer_indices(spec, &indices)?;
                    return Ok(Place::Buffer {
                        buffer: spec.name.clone(),
                        address: self.address(spec, &codes),
                        ty: spec.element.value_type(),
                    });
                }
                Some(Pseudo::Uniform(spec)) => {
                    return Err(TranspileError::unsupported(format!(
                        "uniform `{}` is read-only",
                        spec.name
                    )))
                }
                Some(_) => {
                    return Err(TranspileError::unsupported(format!(
                        "cannot assign to a member of `{}`",
                        chain.root
                    )))
                }
                None => {}
            }
        }

        match &member.prop {
            MemberProp::Computed(computed) => {
                if !matches!(unparen(&member.obj), Expr::Ident(_)) {
                    return Err(TranspileError::unsupported(
                        "only elements of array variables can be assigned",
                    ));
                }
                let array = self.transpile_expr(&member.obj)?;
                let index = self.transpile_expr(&computed.expr)?;
                let element = process_index(self.backend, &array, &index)?;
                Ok(Place::Element {
                    code: element.code,
                    ty: element.ty,
                })
            }
            MemberProp::Ident(id) => {
                let object = self.transpile_expr(&member.obj)?;
                if swizzle::resolve(&object.ty, &id.sym).is_some() {
                    Err(TranspileError::unsupported(
                        "vector components are read-only; build a new vector instead",
                    ))
                } else {
                    Err(TranspileError::unsupported(format!(
                        "cannot assign to member `{}` of {}",
                        id.sym, object.ty
                    )))
                }
            }
            _ => Err(TranspileError::unsupported("private fields are not supported")),
        }
    }

    fn variable_place(&self, name: &str) -> Result<Place> {
        let binding = self.state.lookup(name).ok_or_else(|| {
            TranspileError::unknown_symbol(format!("unknown identifier `{}`", name))
        })?;
        if !binding.ty.is_storable() {
            return Err(TranspileError::unsupported(format!(
                "cannot assign to `{}`",
                name
            )));
        }
        if !binding.mutable {
            return Err(TranspileError::unsupported(format!(
                "cannot assign to `{}`: it is a constant or a function parameter",
                name
            )));
        }
        Ok(Place::Variable {
            name: name.to_string(),
            code: binding.emitted.clone(),
            ty: binding.ty,
            array_length: binding.array_length,
        })
    }

    // === Expressions ===

    /// Transpile an expression.
    fn transpile_expr(&mut self, expr: &Expr) -> Result<Typed> {
        match expr {
            Expr::Paren(paren) => self.transpile_expr(&paren.expr),
            Expr::Lit(lit) => self.transpile_lit(lit),
            Expr::Ident(id) => self.transpile_ident(&id.sym),
            Expr::Member(member) => self.transpile_member(member),
            Expr::Call(call) => self.transpile_call(call),
            Expr::Bin(bin) => self.transpile_binary(bin),
            Expr::Unary(unary) => self.transpile_unary(unary),
            Expr::Cond(cond) => self.transpile_conditional(cond),
            Expr::Array(array) => self.transpile_array_literal(array),
            Expr::Assign(_) => Err(TranspileError::unsupported(
                "assignments cannot be used as values",
            )),
            Expr::Update(_) => Err(TranspileError::unsupported(
                "`++` and `--` can only be used as statements",
            )),
            other => Err(TranspileError::unsupported(format!(
                "{} are not supported",
                describe_expr(other)
            ))),
        }
    }

    /// A folded number.
    fn constant(&self, value: f64) -> Typed {
        let code = self.backend.number(value);
        let code = if value.is_sign_negative() {
            format!("({})", code)
        } else {
            code
        };
        Typed::new(code, VariableType::Number).with_info(ExprInfo::Constant(value))
    }

    fn transpile_lit(&self, lit: &Lit) -> Result<Typed> {
        match lit {
            Lit::Num(num) => {
                let value = finite(num.value, || num.value.to_string())?;
                Ok(self.constant(value))
            }
            Lit::Bool(b) => Ok(Typed::new(b.value.to_string(), VariableType::Boolean)),
            Lit::Str(_) => Err(TranspileError::unsupported("strings are not supported")),
            Lit::Null(_) => Err(TranspileError::unsupported("`null` is not supported")),
            Lit::BigInt(_) => Err(TranspileError::unsupported("BigInt literals are not supported")),
            Lit::Regex(_) => Err(TranspileError::unsupported(
                "regular expressions are not supported",
            )),
            _ => Err(TranspileError::unsupported("unsupported literal")),
        }
    }

    fn transpile_ident(&self, name: &str) -> Result<Typed> {
        if let Some(binding) = self.state.lookup(name) {
            if binding.ty == VariableType::Inputs {
                return Err(TranspileError::unsupported(format!(
                    "`{}` can only be used through its members",
                    name
                )));
            }
            let info = match (binding.constant, binding.array_length) {
                (Some(value), _) => ExprInfo::Constant(value),
                (None, Some(length)) => ExprInfo::Sized(vec![length]),
                (None, None) => ExprInfo::Plain,
            };
            return Ok(Typed::new(binding.emitted.clone(), binding.ty).with_info(info));
        }
        if name == dsl::TYPES {
            return Ok(Typed::new("", VariableType::Types));
        }
        if let Some(helper) = dsl::helper(name) {
            return Ok(Typed::new(helper, VariableType::Function));
        }
        if self.state.is_function(name) {
            return Ok(Typed::new(name, VariableType::Function));
        }
        Err(TranspileError::unknown_symbol(format!(
            "unknown identifier `{}`",
            name
        )))
    }

    fn transpile_member(&mut self, member: &MemberExpr) -> Result<Typed> {
        if let Some(chain) = MemberChain::from_member(member) {
            let root = self.state.root_kind(chain.root);
            if let Some(pseudo) = dsl::classify(&chain, root, self.state.layout)? {
                return self.transpile_pseudo(pseudo);
            }
        }

        let object = self.transpile_expr(&member.obj)?;
        match &member.prop {
            MemberProp::Ident(id) => process_property(&self.state, &object, &id.sym),
            MemberProp::Computed(computed) => {
                let index = self.transpile_expr(&computed.expr)?;
                process_index(self.backend, &object, &index)
            }
            _ => Err(TranspileError::unsupported("private fields are not supported")),
        }
    }

    fn transpile_pseudo(&mut self, pseudo: Pseudo<'_, '_>) -> Result<Typed> {
        Ok(match pseudo {
            Pseudo::ThreadId => Typed::new(self.backend.thread_id(), VariableType::Vec3),
            Pseudo::Buffers => Typed::new("", VariableType::Buffers),
            Pseudo::Buffer { spec, indices } => {
                let codes = self.buffer_indices(spec, &indices)?;
                if codes.len() == spec.rank() {
                    let address = self.address(spec, &codes);
                    Typed::new(
                        self.backend.buffer_load(&spec.name, &address),
                        spec.element.value_type(),
                    )
                } else {
                    // A view over the trailing dimensions; only `dim` accepts it.
                    let trailing = spec.size[codes.len()..].iter().map(|d| *d as usize).collect();
                    Typed::new(
                        "",
                        VariableType::Buffer {
                            rank: (spec.rank() - codes.len()) as u8,
                            element: spec.element,
                        },
                    )
                    .with_info(ExprInfo::Sized(trailing))
                }
            }
            Pseudo::Uniforms => Typed::new("", VariableType::Uniforms),
            Pseudo::Uniform(spec) => Typed::new(
                self.backend.uniform(&spec.name),
                spec.value.element().value_type(),
            ),
            Pseudo::Canvas => Typed::new("", VariableType::Canvas),
            Pseudo::Types => Typed::new("", VariableType::Types),
            Pseudo::TypeLiteral(element) => Typed::new("", VariableType::TypeLiteral(element)),
            Pseudo::Helper(name) => Typed::new(name, VariableType::Function),
        })
    }

    /// Transpile and check buffer indices.
    fn buffer_indices(&mut self, spec: &BufferSpec, indices: &[&Expr]) -> Result<Vec<String>> {
        let mut codes = Vec::with_capacity(indices.len());
        for (dimension, index) in indices.iter().enumerate() {
            let index = self.transpile_expr(index)?;
            if index.ty != VariableType::Number {
                return Err(TranspileError::type_mismatch(format!(
                    "index of buffer `{}` must be a number, got {}",
                    spec.name, index.ty
                )));
            }
            let size = spec.size[dimension] as usize;
            if let Some(i) = index.constant_index() {
                if i >= size {
                    return Err(TranspileError::dimensionality(format!(
                        "index {} is out of bounds for dimension {} of buffer `{}` (size {})",
                        i, dimension, spec.name, size
                    )));
                }
            }
            codes.push(index.code);
        }
        Ok(codes)
    }

    fn address(&self, spec: &BufferSpec, codes: &[String]) -> String {
        let backend = self.backend;
        linear_address(codes, &spec.strides(), |v| backend.number(v))
    }

    fn transpile_call(&mut self, call: &CallExpr) -> Result<Typed> {
        let Callee::Expr(callee) = &call.callee else {
            return Err(TranspileError::unsupported(
                "`super` and `import` calls are not supported",
            ));
        };
        let (name, receiver) = self.resolve_callee(callee)?;

        let mut args = Vec::with_capacity(call.args.len());
        for arg in &call.args {
            if arg.spread.is_some() {
                return Err(TranspileError::unsupported("spread arguments are not supported"));
            }
            args.push(self.transpile_expr(&arg.expr)?);
        }
        process_function(&self.state, &name, receiver.as_ref(), &args)
    }

    /// Name and optional receiver of a call.
    fn resolve_callee(&mut self, callee: &Expr) -> Result<(String, Option<Typed>)> {
        match unparen(callee) {
            Expr::Ident(id) => {
                let name = &*id.sym;
                if self.state.lookup(name).is_some() {
                    return Err(TranspileError::type_mismatch(format!(
                        "`{}` is not a function",
                        name
                    )));
                }
                if dsl::helper(name).is_some() || self.state.is_function(name) {
                    Ok((name.to_string(), None))
                } else {
                    Err(TranspileError::unknown_symbol(format!(
                        "unknown function `{}`",
                        name
                    )))
                }
            }
            // `(0, _lib.vec3)(...)` as emitted by bundlers.
            Expr::Seq(seq) => match seq.exprs.split_last() {
                Some((last, rest))
                    if rest.iter().all(|e| matches!(&**e, Expr::Lit(Lit::Num(_)))) =>
                {
                    self.resolve_callee(last)
                }
                _ => Err(TranspileError::unsupported("sequence expressions are not supported")),
            },
            Expr::Member(member) => {
                if let Some(chain) = MemberChain::from_member(member) {
                    let root = self.state.root_kind(chain.root);
                    match dsl::classify(&chain, root, self.state.layout)? {
                        Some(Pseudo::Helper(name)) => return Ok((name.to_string(), None)),
                        Some(_) => {
                            return Err(TranspileError::type_mismatch(format!(
                                "member of `{}` is not a function",
                                chain.root
                            )))
                        }
                        None => {}
                    }
                }
                let MemberProp::Ident(method) = &member.prop else {
                    return Err(TranspileError::unsupported(
                        "computed method names are not supported",
                    ));
                };
                let receiver = self.transpile_expr(&member.obj)?;
                Ok((method.sym.to_string(), Some(receiver)))
            }
            other => Err(TranspileError::unsupported(format!(
                "cannot call {}",
                describe_expr(other)
            ))),
        }
    }

    fn transpile_binary(&mut self, bin: &BinExpr) -> Result<Typed> {
        let op = match bin.op {
            BinaryOp::In | BinaryOp::InstanceOf => {
                return Err(TranspileError::unsupported(format!(
                    "`{}` is not supported",
                    bin.op
                )))
            }
            BinaryOp::NullishCoalescing => {
                return Err(TranspileError::unsupported("`??` is not supported"))
            }
            op => op.to_string(),
        };
        let left = self.transpile_expr(&bin.left)?;
        let right = self.transpile_expr(&bin.right)?;
        if let (Some(a), Some(b)) = (left.constant(), right.constant()) {
            if let Some(value) = fold(&op, a, b) {
                let value = finite(value, || format!("{} {} {}", a, op, b))?;
                return Ok(self.constant(value));
            }
        }
        process_function(&self.state, &op, None, &[left, right])
    }

    fn transpile_unary(&mut self, unary: &UnaryExpr) -> Result<Typed> {
        let name = match unary.op {
            UnaryOp::Minus => "-u",
            UnaryOp::Plus => "+u",
            UnaryOp::Bang => "!u",
            other => {
                return Err(TranspileError::unsupported(format!(
                    "unary `{}` is not supported",
                    other
                )))
            }
        };
        let arg = self.transpile_expr(&unary.arg)?;
        match (unary.op, arg.constant()) {
            (UnaryOp::Minus, Some(value)) => Ok(self.constant(-value)),
            (UnaryOp::Plus, Some(value)) => Ok(self.constant(value)),
            _ => process_function(&self.state, name, None, &[arg]),
        }
    }

    fn transpile_conditional(&mut self, cond: &CondExpr) -> Result<Typed> {
        let test = self.transpile_expr(&cond.test)?;
        if test.ty != VariableType::Boolean {
            return Err(TranspileError::type_mismatch(format!(
                "conditional test must be a boolean, got {}",
                test.ty
            )));
        }
        let cons = self.transpile_expr(&cond.cons)?;
        let alt = self.transpile_expr(&cond.alt)?;
        if cons.ty != alt.ty {
            return Err(TranspileError::type_mismatch(format!(
                "conditional branches have different types: {} and {}",
                cons.ty, alt.ty
            )));
        }
        if cons.ty.as_element().is_none() {
            return Err(TranspileError::type_mismatch(format!(
                "conditional branches must be numbers, vectors or booleans, got {}",
                cons.ty
            )));
        }
        Ok(Typed::new(
            self.backend.conditional(&test.code, &cons.code, &alt.code),
            cons.ty,
        ))
    }

    fn transpile_array_literal(&mut self, array: &ArrayLit) -> Result<Typed> {
        if self.state.in_array_literal {
            return Err(TranspileError::unsupported("nested array literals are not allowed"));
        }
        if array.elems.is_empty() {
            return Err(TranspileError::unsupported("empty array literals are not allowed"));
        }
        self.state.in_array_literal = true;
        let items = self.array_items(array);
        self.state.in_array_literal = false;
        let items = items?;

        let element = items[0].ty.as_element().ok_or_else(|| {
            TranspileError::type_mismatch(format!(
                "array elements must be numbers, vectors or booleans, got {}",
                items[0].ty
            ))
        })?;
        if let Some(other) = items.iter().find(|item| item.ty != items[0].ty) {
            return Err(TranspileError::type_mismatch(format!(
                "array literal mixes {} and {}",
                items[0].ty, other.ty
            )));
        }

        let codes: Vec<String> = items.into_iter().map(|item| item.code).collect();
        let length = codes.len();
        Ok(Typed::new(
            self.backend.array_literal(element, &codes),
            VariableType::ArrayLiteral(element),
        )
        .with_info(ExprInfo::Sized(vec![length])))
    }

    fn array_items(&mut self, array: &ArrayLit) -> Result<Vec<Typed>> {
        let mut items = Vec::with_capacity(array.elems.len());
        for elem in &array.elems {
            let Some(elem) = elem else {
                return Err(TranspileError::unsupported("array literals cannot have holes"));
            };
            if elem.spread.is_some() {
                return Err(TranspileError::unsupported("spread elements are not supported"));
            }
            items.push(self.transpile_expr(&elem.expr)?);
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_kernel;
    use crate::types::ElementType;
    use crate::validation::validate_kernel;

    fn walk(source: &str, layout: &KernelLayout, target: Target) -> Result<KernelBody> {
        let kernel = parse_kernel(source)?;
        validate_kernel(&kernel)?;
        Transpiler::new(&kernel, layout, target)?.transpile()
    }

    fn gpu(source: &str, layout: &KernelLayout) -> String {
        walk(source, layout, Target::Gpu).unwrap().body
    }

    fn cpu(source: &str, layout: &KernelLayout) -> String {
        walk(source, layout, Target::Cpu).unwrap().body
    }

    fn out3() -> KernelLayout {
        KernelLayout::new().with_buffer("out", ElementType::Number, &[3])
    }

    #[test]
    fn test_buffer_store() {
        let source = "function (inputs) {\n  const i = inputs.threadId.x;\n  inputs.buffers.out[i] = i * 2;\n}";
        let body = gpu(source, &out3());
        assert_eq!(
            body,
            "    let i: f32 = vec3<f32>(global_id).x;\n    buffer_out.data[u32(i)] = (i * 2.0);\n"
        );
        let body = cpu(source, &out3());
        assert_eq!(
            body,
            "    const i = __threadId.x;\n    __buffer_out.set(i, (i * 2));\n"
        );
    }

    #[test]
    fn test_address_strides_are_folded() {
        let layout = KernelLayout::new().with_buffer("grid", ElementType::Number, &[4, 5, 6]);
        let body = gpu(
            "(inputs) => { const p = inputs.threadId; inputs.buffers.grid[p.x][p.y][p.z] = 1; }",
            &layout,
        );
        assert!(body.contains("buffer_grid.data[u32(p.x + p.y * 4.0 + p.z * 20.0)] = 1.0;"));
    }

    #[test]
    fn test_declarations() {
        let layout = KernelLayout::new();
        let source = "function (inputs) { const a = 1; let b = vec2(a, 2); var c = true; }";
        let body = gpu(source, &layout);
        assert!(body.contains("let a: f32 = 1.0;"));
        assert!(body.contains("var b: vec2<f32> = vec2<f32>(a, 2.0);"));
        assert!(body.contains("var c: bool = true;"));

        let body = cpu(source, &layout);
        assert!(body.contains("const a = 1;"));
        assert!(body.contains("let b = vec2(a, 2);"));
        assert!(body.contains("let c = true;"));
    }

    #[test]
    fn test_constant_folding() {
        let body = gpu(
            "function (inputs) { const n = 2 * 3 - 1; const m = -n; }",
            &KernelLayout::new(),
        );
        assert!(body.contains("let n: f32 = 5.0;"));
        assert!(body.contains("let m: f32 = (-5.0);"));
    }

    #[test]
    fn test_array_literal_and_dim() {
        let source = "function (inputs) {\n  const a = [1, 2, 3];\n  const n = dim(a);\n  const m = dim([4, 5]);\n  let x = a[1] + a[n - 1];\n}";
        let body = gpu(source, &KernelLayout::new());
        assert!(body.contains("var a: array<f32, 3> = array<f32, 3>(1.0, 2.0, 3.0);"));
        assert!(body.contains("let n: f32 = 3.0;"));
        assert!(body.contains("let m: f32 = 2.0;"));
        assert!(body.contains("var x: f32 = (a[1] + a[2]);"));

        let body = cpu(source, &KernelLayout::new());
        assert!(body.contains("const a = [1, 2, 3];"));
        assert!(body.contains("const n = a.length;"));
        assert!(body.contains("let x = (a[1] + a[2]);"));

        let body = gpu(
            "function (inputs) { const a = [1, 2]; let i = inputs.threadId.x; let y = a[i]; }",
            &KernelLayout::new(),
        );
        assert!(body.contains("var y: f32 = a[u32(i)];"));
    }

    #[test]
    fn test_array_copy_on_cpu() {
        let source = "function (inputs) { let a = array(4, 0); let b = a; b[0] = 1; }";
        let body = cpu(source, &KernelLayout::new());
        assert!(body.contains("let a = new Array(4).fill(0);"));
        assert!(body.contains("let b = a.slice();"));
        assert!(body.contains("b[0] = 1;"));
        let body = gpu(source, &KernelLayout::new());
        assert!(body.contains("var a: array<f32, 4> = array<f32, 4>(0.0, 0.0, 0.0, 0.0);"));
        assert!(body.contains("var b: array<f32, 4> = a;"));
    }

    #[test]
    fn test_for_loop_and_update() {
        let source = "function (inputs) {\n  let s = 0;\n  for (let i = 0; i < 4; i++) {\n    s += i;\n  }\n}";
        let body = gpu(source, &KernelLayout::new());
        assert!(body.contains("for (var i: f32 = 0.0; i < 4.0; i = (i + 1.0)) {"));
        assert!(body.contains("        s = (s + i);"));
        let body = cpu(source, &KernelLayout::new());
        assert!(body.contains("for (let i = 0; i < 4; i = (i + 1)) {"));
    }

    #[test]
    fn test_if_else_chain() {
        let source = "function (inputs) {\n  let x = inputs.threadId.x;\n  if (x < 1) x = 1;\n  else if (x > 2) { x = 2; }\n  else { x = 0; }\n}";
        let body = gpu(source, &KernelLayout::new());
        assert!(body.contains("    if (x < 1.0) {\n        x = 1.0;\n    } else if (x > 2.0) {"));
        assert!(body.contains("    } else {\n        x = 0.0;\n    }\n"));
    }

    #[test]
    fn test_while_break_continue() {
        let source = "function (inputs) { let i = 0; while (i < 10) { i += 1; if (i == 3) { continue; } if (i > 5) { break; } } }";
        let body = gpu(source, &KernelLayout::new());
        assert!(body.contains("while (i < 10.0) {"));
        assert!(body.contains("continue;"));
        assert!(body.contains("break;"));
    }

    #[test]
    fn test_top_level_return() {
        let source = "function (inputs) { if (inputs.threadId.x > 1) { return; } }";
        assert!(gpu(source, &KernelLayout::new()).contains("return;"));
        assert!(cpu(source, &KernelLayout::new()).contains("break __thread;"));

        let err = walk("function (inputs) { return 1; }", &KernelLayout::new(), Target::Gpu)
            .unwrap_err();
        assert!(matches!(err, TranspileError::Unsupported { .. }));
    }

    #[test]
    fn test_conditional() {
        let source = "function (inputs) { const t = inputs.threadId.x > 1 ? 2 : 3; }";
        assert!(gpu(source, &KernelLayout::new()).contains("select(3.0, 2.0, (vec3<f32>(global_id).x > 1.0))"));
        assert!(cpu(source, &KernelLayout::new()).contains("((__threadId.x > 1) ? 2 : 3)"));
    }

    #[test]
    fn test_vector_operators_per_backend() {
        let source = "function (inputs) { const a = vec3(1); const b = a * 2 + a.xyz; const l = b.length(); }";
        let body = gpu(source, &KernelLayout::new());
        assert!(body.contains("let b: vec3<f32> = ((a * 2.0) + a.xyz);"));
        assert!(body.contains("let l: f32 = length(b);"));
        let body = cpu(source, &KernelLayout::new());
        assert!(body.contains("const b = a.mul(2).add(a.xyz);"));
        assert!(body.contains("const l = b.length();"));
    }

    #[test]
    fn test_math() {
        let source = "function (inputs) { const r = Math.sqrt(Math.PI) + Math.random(); }";
        let body = gpu(source, &KernelLayout::new());
        assert!(body.contains("(sqrt(3.141592653589793) + random(global_id))"));
        let body = cpu(source, &KernelLayout::new());
        assert!(body.contains("(Math.sqrt(Math.PI) + Math.random())"));
    }

    #[test]
    fn test_uniforms_and_canvas() {
        let layout = KernelLayout::new()
            .with_uniform("tint", crate::layout::UniformValue::Vec3([1.0, 0.5, 0.25]))
            .with_canvas(4, 4);
        let source = "(inputs) => { inputs.canvas.setPixel(inputs.threadId.xy, inputs.uniforms.tint); }";
        assert!(gpu(source, &layout).contains(
            "set_pixel(vec3<f32>(global_id).xy, vec4<f32>(uniforms.tint, 1.0));"
        ));
        assert!(cpu(source, &layout).contains("__setPixel(__threadId.xy, vec4(__uniforms.tint, 1));"));
    }

    #[test]
    fn test_declared_function_es6() {
        let source = "function (inputs) {\n  function scale(v = types.vec2, k = types.number) {\n    return v * k;\n  }\n  const r = scale(vec2(1, 2), 3);\n}";
        let result = walk(source, &KernelLayout::new(), Target::Gpu).unwrap();
        assert_eq!(result.functions.len(), 1);
        let f = &result.functions[0];
        assert_eq!(f.return_type, VariableType::Vec2);
        assert_eq!(
            f.source,
            "fn scale(global_id: vec3<u32>, v: vec2<f32>, k: f32) -> vec2<f32> {\n    return (v * k);\n}\n"
        );
        assert!(result
            .body
            .contains("let r: vec2<f32> = scale(global_id, vec2<f32>(1.0, 2.0), 3.0);"));

        let result = walk(source, &KernelLayout::new(), Target::Cpu).unwrap();
        assert_eq!(
            result.functions[0].source,
            "function scale(__threadId, v, k) {\n    return v.mul(k);\n}\n"
        );
    }

    #[test]
    fn test_declared_function_es5() {
        let source = "function (inputs) {\n  function shade() {\n    var t = arguments.length > 0 && arguments[0] !== undefined ? arguments[0] : _lib.types.number;\n    return t * t;\n  }\n  const s = shade(2);\n}";
        let result = walk(source, &KernelLayout::new(), Target::Gpu).unwrap();
        let f = &result.functions[0];
        assert_eq!(f.params, vec![("t".to_string(), ElementType::Number)]);
        assert!(f.source.starts_with("fn shade(global_id: vec3<u32>, t: f32) -> f32 {"));
    }

    #[test]
    fn test_function_without_type_rejected() {
        let err = walk(
            "function (inputs) { function f(a) { return a; } }",
            &KernelLayout::new(),
            Target::Gpu,
        )
        .unwrap_err();
        assert!(matches!(err, TranspileError::TypeMismatch { .. }));
        assert_eq!(err.location().map(|l| l.start), Some(1));
    }

    #[test]
    fn test_recursion_is_unknown() {
        let err = walk(
            "function (inputs) { function f(a = types.number) { return f(a); } }",
            &KernelLayout::new(),
            Target::Gpu,
        )
        .unwrap_err();
        assert!(err.message().contains("unknown function `f`"));
    }

    #[test]
    fn test_namespaced_helpers() {
        let source = "function (inputs) { const v = (0, _lib.vec3)(1, 2, 3); const w = _lib.vec2(v.x); }";
        let body = gpu(source, &KernelLayout::new());
        assert!(body.contains("let v: vec3<f32> = vec3<f32>(1.0, 2.0, 3.0);"));
        assert!(body.contains("let w: vec2<f32> = vec2<f32>(v.x);"));
    }

    #[test]
    fn test_errors_carry_statement_lines() {
        let source = "function (inputs) {\n  let a = 1;\n  let b = vec2(1, 2);\n  a = b;\n}";
        let err = walk(source, &KernelLayout::new(), Target::Gpu).unwrap_err();
        assert!(matches!(err, TranspileError::TypeMismatch { .. }));
        assert!(err.message().contains("cannot assign vec2 to `a` of type number"));
        assert_eq!(err.location().map(|l| l.start), Some(4));
    }

    #[test]
    fn test_read_only_targets() {
        let layout = KernelLayout::new()
            .with_uniform("k", crate::layout::UniformValue::Number(1.0))
            .with_buffer("out", ElementType::Number, &[2, 2]);
        for source in [
            "function (inputs) { const a = 1; a = 2; }",
            "function (inputs) { inputs.uniforms.k = 2; }",
            "function (inputs) { let v = vec2(1); v.x = 2; }",
        ] {
            let err = walk(source, &layout, Target::Cpu).unwrap_err();
            assert!(matches!(err, TranspileError::Unsupported { .. }), "{source}");
        }
        let err = walk("function (inputs) { inputs.buffers.out[0] = 1; }", &layout, Target::Cpu)
            .unwrap_err();
        assert!(matches!(err, TranspileError::Dimensionality { .. }));
    }

    #[test]
    fn test_nested_array_literal_rejected() {
        let err = walk(
            "function (inputs) { const a = [[1], [2]]; }",
            &KernelLayout::new(),
            Target::Gpu,
        )
        .unwrap_err();
        assert!(err.message().contains("nested array literals"));
    }

    #[test]
    fn test_non_number_index_rejected() {
        let err = walk(
            "function (inputs) { inputs.buffers.out[true] = 1; }",
            &out3(),
            Target::Gpu,
        )
        .unwrap_err();
        assert!(matches!(err, TranspileError::TypeMismatch { .. }));
    }

    #[test]
    fn test_unsupported_expressions() {
        for source in [
            "function (inputs) { const o = {}; }",
            "function (inputs) { const f = () => 1; }",
            "function (inputs) { const s = 'x'; }",
            "function (inputs) { let i = 0; const j = i++; }",
        ] {
            let err = walk(source, &KernelLayout::new(), Target::Gpu).unwrap_err();
            assert!(matches!(err, TranspileError::Unsupported { .. }), "{source}");
        }
    }

    #[test]
    fn test_reserved_wgsl_names_renamed() {
        let body = gpu("function (inputs) { let loop = 1; const r = loop + 1; }", &KernelLayout::new());
        assert!(body.contains("var loop_: f32 = 1.0;"));
        assert!(body.contains("(loop_ + 1.0)"));
    }
}
