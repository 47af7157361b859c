//! JavaScript backend.

use super::{js_number, Backend, DeclKind};
use crate::layout::Target;
use crate::program::CPU_PARAMS;
use crate::types::{ElementType, VariableType};

/// Globals referenced by emitted code; kernel names must not shadow them.
const GLOBALS: &[&str] = &["Array", "ArrayBuffer"];

/// Emits a plain JavaScript function body.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsBackend;

impl Backend for JsBackend {
    fn target(&self) -> Target {
        Target::Cpu
    }

    fn number(&self, value: f64) -> String {
        js_number(value)
    }

    fn identifier(&self, name: &str) -> String {
        if CPU_PARAMS.contains(&name) || GLOBALS.contains(&name) {
            format!("{}_", name)
        } else {
            name.to_string()
        }
    }

    fn thread_id(&self) -> &'static str {
        "__threadId"
    }

    fn thread_id_param(&self) -> &'static str {
        "__threadId"
    }

    fn buffer_load(&self, buffer: &str, address: &str) -> String {
        format!("__buffer_{}.get({})", buffer, address)
    }

    fn buffer_store(&self, buffer: &str, address: &str, value: &str) -> String {
        format!("__buffer_{}.set({}, {})", buffer, address, value)
    }

    fn uniform(&self, name: &str) -> String {
        format!("__uniforms.{}", name)
    }

    fn array_literal(&self, _element: ElementType, items: &[String]) -> String {
        format!("[{}]", items.join(", "))
    }

    fn array_index(&self, array: &str, index: &str, constant: Option<usize>) -> String {
        match constant {
            Some(i) => format!("{}[{}]", array, i),
            None => format!("{}[{} | 0]", array, index),
        }
    }

    fn copy_array(&self, code: &str) -> String {
        format!("{}.slice()", code)
    }

    fn declaration(
        &self,
        kind: DeclKind,
        name: &str,
        _ty: &VariableType,
        _array_length: Option<usize>,
        value: &str,
    ) -> String {
        let keyword = match kind {
            DeclKind::Const => "const",
            DeclKind::Let | DeclKind::Var => "let",
        };
        format!("{} {} = {}", keyword, name, value)
    }

    fn conditional(&self, test: &str, consequent: &str, alternate: &str) -> String {
        format!("({} ? {} : {})", test, consequent, alternate)
    }

    fn top_level_return(&self) -> &'static str {
        "break __thread;"
    }

    fn discard(&self, code: &str) -> String {
        code.to_string()
    }

    fn function_header(
        &self,
        name: &str,
        params: &[(String, ElementType)],
        _return_type: &VariableType,
    ) -> String {
        let mut list = vec![self.thread_id_param().to_string()];
        list.extend(params.iter().map(|(param, _)| self.identifier(param)));
        format!("function {}({})", self.identifier(name), list.join(", "))
    }
}
