//! Per-call walk state.
//!
//! One [`WalkState`] is created for every transpile call and dropped when it
//! returns. Declared kernel functions are registered in a per-call overlay
//! table so the shared builtin table is never mutated.

use crate::dsl::{self, RootKind};
use crate::functions::{FunctionTable, Overload, Receiver};
use crate::layout::{KernelLayout, Target};
use crate::types::{ElementType, VariableType};
use crate::{Result, TranspileError};
use std::collections::HashMap;

/// What a name in scope refers to.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub ty: VariableType,
    /// Name in the emitted code.
    pub emitted: String,
    /// `false` for `const` bindings and function parameters.
    pub mutable: bool,
    /// Length of an array binding.
    pub array_length: Option<usize>,
    /// Value of a `const` number with a literal initializer.
    pub constant: Option<f64>,
}

impl Binding {
    /// A builtin name that is not a value (`Math`, the kernel parameter).
    pub fn builtin(ty: VariableType, emitted: &str) -> Self {
        Self {
            ty,
            emitted: emitted.to_string(),
            mutable: false,
            array_length: None,
            constant: None,
        }
    }

    /// A typed function parameter. Parameters are read only.
    pub fn parameter(element: ElementType, emitted: String) -> Self {
        Self {
            ty: element.value_type(),
            emitted,
            mutable: false,
            array_length: None,
            constant: None,
        }
    }
}

/// A function declared at the top of the kernel.
#[derive(Debug, Clone, PartialEq)]
pub struct DeclaredFunction {
    pub name: String,
    pub params: Vec<(String, ElementType)>,
    pub return_type: VariableType,
    /// Emitted definition, spliced before the entry point.
    pub source: String,
}

/// Bookkeeping while walking a function body.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionFrame {
    pub name: String,
    pub return_type: Option<VariableType>,
}

impl FunctionFrame {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            return_type: None,
        }
    }

    /// Record the type of a `return`; all returns must agree.
    pub fn record_return(&mut self, ty: VariableType) -> Result<()> {
        match self.return_type {
            None => {
                self.return_type = Some(ty);
                Ok(())
            }
            Some(previous) if previous == ty => Ok(()),
            Some(previous) => Err(TranspileError::type_mismatch(format!(
                "function `{}` returns both {} and {}",
                self.name, previous, ty
            ))),
        }
    }
}

/// Mutable state threaded through the walker.
#[derive(Debug)]
pub struct WalkState<'a> {
    pub target: Target,
    pub layout: &'a KernelLayout,
    /// Name of the kernel parameter.
    pub inputs_name: String,
    scopes: Vec<HashMap<String, Binding>>,
    /// Declared functions in declaration order.
    pub functions: Vec<DeclaredFunction>,
    /// Overloads of declared functions.
    pub overlay: FunctionTable,
    /// Set while walking a function declaration.
    pub frame: Option<FunctionFrame>,
    /// Set while walking the elements of an array literal.
    pub in_array_literal: bool,
}

impl<'a> WalkState<'a> {
    /// Fresh state with the kernel parameter and `Math` in scope.
    pub fn new(target: Target, layout: &'a KernelLayout, inputs_name: &str) -> Self {
        let mut globals = HashMap::new();
        globals.insert(
            inputs_name.to_string(),
            Binding::builtin(VariableType::Inputs, ""),
        );
        globals.insert("Math".to_string(), Binding::builtin(VariableType::Math, "Math"));
        Self {
            target,
            layout,
            inputs_name: inputs_name.to_string(),
            scopes: vec![globals],
            functions: Vec::new(),
            overlay: FunctionTable::new(),
            frame: None,
            in_array_literal: false,
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Innermost binding of a name.
    pub fn lookup(&self, name: &str) -> Option<&Binding> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// How the root of a member chain resolves.
    pub fn root_kind(&self, name: &str) -> RootKind {
        match self.lookup(name) {
            Some(binding) if binding.ty == VariableType::Inputs => RootKind::Inputs,
            Some(_) => RootKind::Bound,
            None => RootKind::Unbound,
        }
    }

    /// Whether a declared function with this name exists.
    pub fn is_function(&self, name: &str) -> bool {
        self.overlay.has_standalone(name)
    }

    /// Reject names that would shadow builtins or generated code.
    pub fn check_name(&self, name: &str) -> Result<()> {
        if name.starts_with("__") {
            return Err(TranspileError::unsupported(format!(
                "identifier `{}` is reserved; names starting with `__` are used by generated code",
                name
            )));
        }
        if dsl::helper(name).is_some()
            || name == dsl::TYPES
            || name == "Math"
            || name == self.inputs_name
            || name == "arguments"
            || name == "undefined"
        {
            return Err(TranspileError::unsupported(format!(
                "`{}` is a builtin name and cannot be redeclared",
                name
            )));
        }
        if self.is_function(name) {
            return Err(TranspileError::unsupported(format!(
                "`{}` is already declared as a function",
                name
            )));
        }
        Ok(())
    }

    /// Bind a name in the innermost scope.
    pub fn declare(&mut self, name: &str, binding: Binding) -> Result<()> {
        self.check_name(name)?;
        let scope = self
            .scopes
            .last_mut()
            .ok_or_else(|| TranspileError::unsupported("no open scope"))?;
        if scope.contains_key(name) {
            return Err(TranspileError::unsupported(format!(
                "`{}` is already declared in this scope",
                name
            )));
        }
        scope.insert(name.to_string(), binding);
        Ok(())
    }

    /// Register a declared function and its overload.
    pub fn declare_function(&mut self, function: DeclaredFunction, overload: Overload) -> Result<()> {
        self.check_name(&function.name)?;
        if FunctionTable::builtin().has_standalone(&function.name) {
            return Err(TranspileError::unsupported(format!(
                "`{}` collides with a builtin function",
                function.name
            )));
        }
        self.overlay.add(Receiver::Standalone, &function.name, overload);
        self.functions.push(function);
        Ok(())
    }

    /// Whether the walker is inside a function declaration.
    pub fn in_function(&self) -> bool {
        self.frame.is_some()
    }
}
