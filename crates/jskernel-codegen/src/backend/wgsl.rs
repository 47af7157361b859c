//! WGSL backend.

use super::{wgsl_float, Backend, DeclKind};
use crate::layout::Target;
use crate::types::{ElementType, VariableType};

/// Emits WGSL compute shader code.
#[derive(Debug, Clone, Copy, Default)]
pub struct WgslBackend;

/// WGSL keywords, reserved words and names used by the generated preamble.
const RESERVED: &[&str] = &[
    // keywords
    "alias", "break", "case", "const", "const_assert", "continue", "continuing", "default",
    "diagnostic", "discard", "else", "enable", "false", "fn", "for", "if", "let", "loop",
    "override", "requires", "return", "struct", "switch", "true", "var", "while",
    // reserved
    "NULL", "Self", "abstract", "active", "alignas", "alignof", "as", "asm", "async",
    "attribute", "auto", "await", "become", "binding_array", "cast", "catch", "class",
    "co_await", "co_return", "co_yield", "coherent", "column_major", "common", "compile",
    "concept", "const_cast", "consteval", "constexpr", "constinit", "crate", "debugger",
    "decltype", "delete", "demote", "do", "dynamic_cast", "enum", "explicit", "export",
    "extends", "extern", "external", "fallthrough", "filter", "final", "finally", "friend",
    "from", "fxgroup", "get", "goto", "groupshared", "highp", "impl", "implements", "import",
    "inline", "instanceof", "interface", "layout", "lowp", "macro", "macro_rules", "match",
    "mediump", "meta", "mod", "module", "move", "mut", "mutable", "namespace", "new", "nil",
    "noexcept", "noinline", "nointerpolation", "noperspective", "null", "nullptr", "of",
    "operator", "package", "packoffset", "partition", "pass", "patch", "pixelfragment",
    "precise", "precision", "premerge", "priv", "protected", "pub", "public", "readonly",
    "ref", "regardless", "register", "reinterpret_cast", "require", "resource", "restrict",
    "self", "set", "shared", "sizeof", "smooth", "snorm", "static", "static_assert",
    "static_cast", "std", "subroutine", "super", "target", "template", "this",
    "thread_local", "throw", "trait", "try", "type", "typedef", "typeid", "typename",
    "typeof", "union", "unless", "unorm", "unsafe", "unsized", "use", "using", "varying",
    "virtual", "volatile", "wgsl", "where", "with", "writeonly", "yield",
    // predeclared types
    "bool", "f16", "f32", "i32", "u32", "vec2", "vec3", "vec4", "mat2x2", "mat3x3",
    "mat4x4", "array", "atomic", "ptr", "sampler", "texture_2d",
    // builtin functions
    "abs", "acos", "acosh", "all", "any", "arrayLength", "asin", "asinh", "atan", "atan2",
    "atanh", "bitcast", "ceil", "clamp", "cos", "cosh", "countLeadingZeros", "countOneBits",
    "countTrailingZeros", "cross", "degrees", "determinant", "distance", "dot", "exp", "exp2",
    "extractBits", "faceForward", "firstLeadingBit", "firstTrailingBit", "floor", "fma",
    "fract", "frexp", "insertBits", "inverseSqrt", "ldexp", "length", "log", "log2", "max",
    "min", "mix", "modf", "normalize", "pack2x16float", "pack2x16snorm", "pack2x16unorm",
    "pack4x8snorm", "pack4x8unorm", "pow", "quantizeToF16", "radians", "reflect", "refract",
    "reverseBits", "round", "saturate", "select", "sign", "sin", "sinh", "smoothstep", "sqrt",
    "step", "storageBarrier", "tan", "tanh", "transpose", "trunc", "unpack2x16float",
    "unpack2x16snorm", "unpack2x16unorm", "unpack4x8snorm", "unpack4x8unorm",
    "workgroupBarrier",
    // preamble
    "main", "global_id", "uniforms", "pixels", "rng_state", "random", "set_pixel",
    "CANVAS_SIZE", "CANVAS_WIDTH", "RNG_POOL_SIZE", "Uniforms", "NumberBuffer", "Vec2Buffer",
    "Vec3Buffer", "Vec4Buffer",
];

impl Backend for WgslBackend {
    fn target(&self) -> Target {
        Target::Gpu
    }

    fn number(&self, value: f64) -> String {
        wgsl_float(value)
    }

    fn identifier(&self, name: &str) -> String {
        let sanitized = name.replace('$', "_S");
        if sanitized == "_"
            || sanitized.starts_with("buffer_")
            || RESERVED.contains(&sanitized.as_str())
        {
            format!("{}_", sanitized)
        } else {
            sanitized
        }
    }

    fn thread_id(&self) -> &'static str {
        "vec3<f32>(global_id)"
    }

    fn thread_id_param(&self) -> &'static str {
        "global_id"
    }

    fn buffer_load(&self, buffer: &str, address: &str) -> String {
        format!("buffer_{}.data[u32({})]", buffer, address)
    }

    fn buffer_store(&self, buffer: &str, address: &str, value: &str) -> String {
        format!("{} = {}", self.buffer_load(buffer, address), value)
    }

    fn uniform(&self, name: &str) -> String {
        format!("uniforms.{}", self.identifier(name))
    }

    fn array_literal(&self, element: ElementType, items: &[String]) -> String {
        format!(
            "array<{}, {}>({})",
            element.to_wgsl(),
            items.len(),
            items.join(", ")
        )
    }

    fn array_index(&self, array: &str, index: &str, constant: Option<usize>) -> String {
        match constant {
            Some(i) => format!("{}[{}]", array, i),
            None => format!("{}[u32({})]", array, index),
        }
    }

    fn copy_array(&self, code: &str) -> String {
        code.to_string()
    }

    fn declaration(
        &self,
        kind: DeclKind,
        name: &str,
        ty: &VariableType,
        array_length: Option<usize>,
        value: &str,
    ) -> String {
        // Arrays stay `var` so they can be indexed dynamically.
        let keyword = match kind {
            DeclKind::Const if !ty.is_array() => "let",
            _ => "var",
        };
        match ty.to_wgsl(array_length) {
            Some(wgsl_ty) => format!("{} {}: {} = {}", keyword, name, wgsl_ty, value),
            None => format!("{} {} = {}", keyword, name, value),
        }
    }

    fn conditional(&self, test: &str, consequent: &str, alternate: &str) -> String {
        format!("select({}, {}, {})", alternate, consequent, test)
    }

    fn top_level_return(&self) -> &'static str {
        "return;"
    }

    fn discard(&self, code: &str) -> String {
        format!("_ = {}", code)
    }

    fn function_header(
        &self,
        name: &str,
        params: &[(String, ElementType)],
        return_type: &VariableType,
    ) -> String {
        let mut list = vec![format!("{}: vec3<u32>", self.thread_id_param())];
        list.extend(
            params
                .iter()
                .map(|(param, ty)| format!("{}: {}", self.identifier(param), ty.to_wgsl())),
        );
        match return_type.to_wgsl(None) {
            Some(ret) => format!("fn {}({}) -> {}", self.identifier(name), list.join(", "), ret),
            None => format!("fn {}({})", self.identifier(name), list.join(", ")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_identifiers_renamed() {
        let b = WgslBackend;
        assert_eq!(b.identifier("value"), "value");
        assert_eq!(b.identifier("loop"), "loop_");
        assert_eq!(b.identifier("f32"), "f32_");
        assert_eq!(b.identifier("pixels"), "pixels_");
        assert_eq!(b.identifier("buffer_out"), "buffer_out_");
        assert_eq!(b.identifier("$el"), "_Sel");
    }

    #[test]
    fn test_builtin_function_names_renamed() {
        let b = WgslBackend;
        assert_eq!(b.identifier("max"), "max_");
        assert_eq!(b.identifier("length"), "length_");
        assert_eq!(b.identifier("select"), "select_");
        assert_eq!(b.identifier("maximum"), "maximum");
    }

    #[test]
    fn test_declarations() {
        let b = WgslBackend;
        assert_eq!(
            b.declaration(DeclKind::Const, "x", &VariableType::Number, None, "1.0"),
            "let x: f32 = 1.0"
        );
        assert_eq!(
            b.declaration(DeclKind::Let, "v", &VariableType::Vec3, None, "w"),
            "var v: vec3<f32> = w"
        );
        assert_eq!(
            b.declaration(
                DeclKind::Const,
                "a",
                &VariableType::Array(ElementType::Number),
                Some(2),
                "array<f32, 2>(1.0, 2.0)"
            ),
            "var a: array<f32, 2> = array<f32, 2>(1.0, 2.0)"
        );
    }

    #[test]
    fn test_select_argument_order() {
        assert_eq!(WgslBackend.conditional("c", "a", "b"), "select(b, a, c)");
    }

    #[test]
    fn test_function_header() {
        let header = WgslBackend.function_header(
            "shade",
            &[("t".to_string(), ElementType::Number)],
            &VariableType::Vec3,
        );
        assert_eq!(header, "fn shade(global_id: vec3<u32>, t: f32) -> vec3<f32>");
        let header = WgslBackend.function_header("noop", &[], &VariableType::Void);
        assert_eq!(header, "fn noop(global_id: vec3<u32>)");
    }
}
