//! Backend strategies.
//!
//! The walker is shared by both targets. Everything that differs in the
//! emitted text, beyond the overload templates, goes through [`Backend`].

mod js;
mod wgsl;

pub use js::JsBackend;
pub use wgsl::WgslBackend;

use crate::layout::Target;
use crate::types::{ElementType, VariableType};

/// Declaration keyword used in the kernel source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Const,
    Let,
    Var,
}

/// Target-specific pieces of emitted code.
pub trait Backend {
    /// Which target this backend emits.
    fn target(&self) -> Target;

    /// A number literal.
    fn number(&self, value: f64) -> String;

    /// Emitted name of a kernel-level identifier.
    fn identifier(&self, name: &str) -> String;

    /// Expression for `inputs.threadId`.
    fn thread_id(&self) -> &'static str;

    /// Name of the implicit thread id parameter of declared functions.
    fn thread_id_param(&self) -> &'static str;

    /// Read one element of a storage buffer.
    fn buffer_load(&self, buffer: &str, address: &str) -> String;

    /// Write one element of a storage buffer.
    fn buffer_store(&self, buffer: &str, address: &str, value: &str) -> String;

    /// Read a uniform.
    fn uniform(&self, name: &str) -> String;

    /// An array literal.
    fn array_literal(&self, element: ElementType, items: &[String]) -> String;

    /// Index into a local array. `constant` is set when the index is a
    /// non-negative integer literal.
    fn array_index(&self, array: &str, index: &str, constant: Option<usize>) -> String;

    /// Copy an array read from a variable before binding it elsewhere.
    fn copy_array(&self, code: &str) -> String;

    /// Variable declaration, without the trailing semicolon.
    fn declaration(
        &self,
        kind: DeclKind,
        name: &str,
        ty: &VariableType,
        array_length: Option<usize>,
        value: &str,
    ) -> String;

    /// `cond ? then : else`.
    fn conditional(&self, test: &str, consequent: &str, alternate: &str) -> String;

    /// A bare `return;` at kernel top level.
    fn top_level_return(&self) -> &'static str;

    /// An expression evaluated only for its effects, without semicolon.
    fn discard(&self, code: &str) -> String;

    /// Signature line of a declared function, without the opening brace.
    fn function_header(
        &self,
        name: &str,
        params: &[(String, ElementType)],
        return_type: &VariableType,
    ) -> String;
}

/// Backend for a target.
pub fn for_target(target: Target) -> &'static dyn Backend {
    match target {
        Target::Gpu => &WgslBackend,
        Target::Cpu => &JsBackend,
    }
}

/// WGSL float literal. Always contains a decimal point or exponent.
pub fn wgsl_float(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{:.1}", value)
    } else {
        format!("{:?}", value)
    }
}

/// JavaScript number literal.
pub fn js_number(value: f64) -> String {
    format!("{}", value)
}

/// Linear buffer address `i0 + i1 * d0 + i2 * d0 * d1` with folded strides.
pub fn linear_address(indices: &[String], strides: &[usize], number: impl Fn(f64) -> String) -> String {
    let terms: Vec<String> = indices
        .iter()
        .zip(strides)
        .map(|(index, stride)| {
            if *stride == 1 {
                index.clone()
            } else {
                format!("{} * {}", index, number(*stride as f64))
            }
        })
        .collect();
    terms.join(" + ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wgsl_float() {
        assert_eq!(wgsl_float(2.0), "2.0");
        assert_eq!(wgsl_float(0.5), "0.5");
        assert_eq!(wgsl_float(-3.0), "-3.0");
        assert_eq!(wgsl_float(1e20), "1e20");
    }

    #[test]
    fn test_js_number() {
        assert_eq!(js_number(2.0), "2");
        assert_eq!(js_number(0.25), "0.25");
    }

    #[test]
    fn test_linear_address() {
        let indices = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert_eq!(linear_address(&indices, &[1, 4, 20], js_number), "a + b * 4 + c * 20");
        assert_eq!(
            linear_address(&indices, &[1, 4, 20], wgsl_float),
            "a + b * 4.0 + c * 20.0"
        );
    }
}
