//! Compute kernel transpiler for a JavaScript subset.
//!
//! A kernel is an ordinary JavaScript function taking a single `inputs`
//! parameter. The same source is turned into two programs that produce the
//! same buffer and pixel contents:
//!
//! - a WGSL compute shader, run once per invocation of the dispatch grid;
//! - a JavaScript function body, run through a triple loop over the grid.
//!
//! # Overview
//!
//! The accepted subset:
//!
//! - Values: `number` (f32), `vec2`/`vec3`/`vec4`, `boolean`, fixed-length arrays
//! - `let`/`const`/`var` declarations, assignment and compound assignment
//! - `if`/`else`, `for`, `while`, `break`, `continue`, bare `return`
//! - Arithmetic, comparison and logical operators, ternaries
//! - `Math` functions and constants, vector methods and swizzles
//! - `inputs.threadId`, `inputs.buffers.*`, `inputs.uniforms.*`, `inputs.canvas`
//! - Top-level helper functions with typed parameters (`a = types.number`)
//!
//! # Example
//!
//! ```ignore
//! use jskernel_codegen::{transpile_gpu, ElementType, KernelLayout, TranspileOptions};
//!
//! let layout = KernelLayout::new().with_buffer("out", ElementType::Number, &[3]);
//! let source = r#"
//!     function (inputs) {
//!         const i = inputs.threadId.x;
//!         inputs.buffers.out[i] = i * 2;
//!     }
//! "#;
//!
//! let program = transpile_gpu(source, &layout, &TranspileOptions::default())?;
//! assert!(program.source.contains("@compute @workgroup_size(1, 1, 1)"));
//! ```
//!
//! # Errors
//!
//! Anything outside the subset fails the whole call with a [`TranspileError`]
//! carrying the line range of the offending statement. There is no partial
//! output.

pub mod backend;
pub mod bindings;
pub mod dsl;
pub mod functions;
pub mod layout;
pub mod loops;
pub mod parse;
pub mod processors;
pub mod program;
pub mod runtime;
pub mod state;
pub mod swizzle;
pub mod transpiler;
pub mod types;
pub mod validation;

pub use backend::{Backend, JsBackend, WgslBackend};
pub use bindings::{AccessMode, BindingKind, BindingLayout};
pub use functions::{FunctionTable, Overload, Receiver, Template, TemplateInput};
pub use layout::{
    BufferSpec, CanvasSpec, KernelLayout, Target, TranspileOptions, UniformSpec, UniformValue,
};
pub use parse::SourceLines;
pub use program::{CpuProgram, GpuProgram, Program};
pub use runtime::vector_library;
pub use transpiler::Transpiler;
pub use types::{ElementType, VariableType};

use thiserror::Error;

/// Errors that can occur during transpilation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranspileError {
    /// The source is not valid JavaScript, or not a function.
    #[error("Parse error{}: {message}", at(.location))]
    Parse {
        message: String,
        location: Option<SourceLines>,
    },

    /// Valid JavaScript outside the kernel subset.
    #[error("Unsupported syntax{}: {message}", at(.location))]
    Unsupported {
        message: String,
        location: Option<SourceLines>,
    },

    /// Unknown identifier, member, function, operator or overload.
    #[error("Unknown symbol{}: {message}", at(.location))]
    UnknownSymbol {
        message: String,
        location: Option<SourceLines>,
    },

    /// Operand, argument, assignment or return types do not fit.
    #[error("Type mismatch{}: {message}", at(.location))]
    TypeMismatch {
        message: String,
        location: Option<SourceLines>,
    },

    /// Too many indices on a buffer, or a constant index out of range.
    #[error("Dimensionality error{}: {message}", at(.location))]
    Dimensionality {
        message: String,
        location: Option<SourceLines>,
    },

    /// Invalid layout metadata or options.
    #[error("Invalid layout: {0}")]
    Layout(String),
}

fn at(location: &Option<SourceLines>) -> String {
    match location {
        Some(lines) => format!(" at {}", lines),
        None => String::new(),
    }
}

impl TranspileError {
    pub fn parse(message: impl Into<String>) -> Self {
        TranspileError::Parse {
            message: message.into(),
            location: None,
        }
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        TranspileError::Unsupported {
            message: message.into(),
            location: None,
        }
    }

    pub fn unknown_symbol(message: impl Into<String>) -> Self {
        TranspileError::UnknownSymbol {
            message: message.into(),
            location: None,
        }
    }

    pub fn type_mismatch(message: impl Into<String>) -> Self {
        TranspileError::TypeMismatch {
            message: message.into(),
            location: None,
        }
    }

    pub fn dimensionality(message: impl Into<String>) -> Self {
        TranspileError::Dimensionality {
            message: message.into(),
            location: None,
        }
    }

    /// Attach a source location unless one is already set.
    pub fn with_location(mut self, lines: SourceLines) -> Self {
        match &mut self {
            TranspileError::Parse { location, .. }
            | TranspileError::Unsupported { location, .. }
            | TranspileError::UnknownSymbol { location, .. }
            | TranspileError::TypeMismatch { location, .. }
            | TranspileError::Dimensionality { location, .. } => {
                if location.is_none() {
                    *location = Some(lines);
                }
            }
            TranspileError::Layout(_) => {}
        }
        self
    }

    /// Source location, if known.
    pub fn location(&self) -> Option<SourceLines> {
        match self {
            TranspileError::Parse { location, .. }
            | TranspileError::Unsupported { location, .. }
            | TranspileError::UnknownSymbol { location, .. }
            | TranspileError::TypeMismatch { location, .. }
            | TranspileError::Dimensionality { location, .. } => *location,
            TranspileError::Layout(_) => None,
        }
    }

    /// Diagnostic text without the category prefix.
    pub fn message(&self) -> &str {
        match self {
            TranspileError::Parse { message, .. }
            | TranspileError::Unsupported { message, .. }
            | TranspileError::UnknownSymbol { message, .. }
            | TranspileError::TypeMismatch { message, .. }
            | TranspileError::Dimensionality { message, .. }
            | TranspileError::Layout(message) => message,
        }
    }
}

/// Result type for transpilation operations.
pub type Result<T> = std::result::Result<T, TranspileError>;

/// Transpile a kernel for the target selected in `options`.
pub fn transpile(source: &str, layout: &KernelLayout, options: &TranspileOptions) -> Result<Program> {
    match options.target {
        Target::Gpu => transpile_gpu(source, layout, options).map(Program::Gpu),
        Target::Cpu => transpile_cpu(source, layout).map(Program::Cpu),
    }
}

/// Transpile a kernel to a WGSL compute shader.
///
/// The `target` field of `options` is ignored; only the seed pool size is
/// used.
///
/// # Example
///
/// ```ignore
/// use jskernel_codegen::{transpile_gpu, ElementType, KernelLayout, TranspileOptions};
///
/// let layout = KernelLayout::new()
///     .with_buffer("grid", ElementType::Number, &[16, 16])
///     .with_canvas(16, 16);
/// let source = r#"
///     (inputs) => {
///         const p = inputs.threadId.xy;
///         const v = inputs.buffers.grid[p.x][p.y];
///         inputs.canvas.setPixel(p, vec3(v, v, v));
///     }
/// "#;
///
/// let options = TranspileOptions::default().with_seed_pool_size(256);
/// let program = transpile_gpu(source, &layout, &options)?;
/// ```
pub fn transpile_gpu(
    source: &str,
    layout: &KernelLayout,
    options: &TranspileOptions,
) -> Result<GpuProgram> {
    options.validate()?;
    layout.validate()?;
    tracing::debug!(
        target_backend = "gpu",
        buffers = layout.buffers.len(),
        uniforms = layout.uniforms.len(),
        canvas = layout.canvas.is_some(),
        "transpiling kernel"
    );

    let kernel = parse::parse_kernel(source)?;
    validation::validate_kernel(&kernel)?;
    let body = Transpiler::new(&kernel, layout, Target::Gpu)?.transpile()?;
    Ok(program::assemble_gpu(layout, options, &body))
}

/// Transpile a kernel to a JavaScript function body.
///
/// The resulting [`CpuProgram`] expects the vector library (see
/// [`vector_library`]) as its `lib` argument.
pub fn transpile_cpu(source: &str, layout: &KernelLayout) -> Result<CpuProgram> {
    layout.validate()?;
    tracing::debug!(
        target_backend = "cpu",
        buffers = layout.buffers.len(),
        uniforms = layout.uniforms.len(),
        canvas = layout.canvas.is_some(),
        "transpiling kernel"
    );

    let kernel = parse::parse_kernel(source)?;
    validation::validate_kernel(&kernel)?;
    let body = Transpiler::new(&kernel, layout, Target::Cpu)?.transpile()?;
    Ok(program::assemble_cpu(layout, &body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transpile_error_display() {
        let err = TranspileError::parse("unexpected token");
        assert!(err.to_string().contains("Parse error"));

        let err = TranspileError::dimensionality("too many indices")
            .with_location(SourceLines { start: 3, end: 4 });
        assert_eq!(
            err.to_string(),
            "Dimensionality error at lines 3-4: too many indices"
        );
        assert_eq!(err.message(), "too many indices");
    }

    #[test]
    fn test_location_is_not_overwritten() {
        let err = TranspileError::unsupported("x")
            .with_location(SourceLines { start: 2, end: 2 })
            .with_location(SourceLines { start: 1, end: 5 });
        assert_eq!(err.location(), Some(SourceLines { start: 2, end: 2 }));
    }

    #[test]
    fn test_transpile_dispatches_on_target() {
        let layout = KernelLayout::new().with_buffer("out", ElementType::Number, &[4]);
        let source = "function (inputs) { inputs.buffers.out[inputs.threadId.x] = 1; }";

        let gpu = transpile(source, &layout, &TranspileOptions::new(Target::Gpu)).unwrap();
        assert!(matches!(gpu, Program::Gpu(_)));

        let cpu = transpile(source, &layout, &TranspileOptions::new(Target::Cpu)).unwrap();
        assert!(matches!(cpu, Program::Cpu(_)));
    }

    #[test]
    fn test_invalid_layout_rejected_before_parsing() {
        let layout = KernelLayout::new().with_buffer("out", ElementType::Number, &[]);
        let err = transpile_cpu("not even javascript (", &layout).unwrap_err();
        assert!(matches!(err, TranspileError::Layout(_)));
    }
}
