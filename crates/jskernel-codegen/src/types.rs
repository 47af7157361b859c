//! Type lattice for kernel expressions.
//!
//! Every expression the walker resolves carries exactly one [`VariableType`].
//! The lattice is closed: there is no user-defined type, no generic, and no
//! implicit conversion between members.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Value types that can be stored in buffers, arrays and variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    /// 32-bit float.
    Number,
    /// Two-component float vector.
    Vec2,
    /// Three-component float vector.
    Vec3,
    /// Four-component float vector.
    Vec4,
    /// Boolean.
    Boolean,
}

impl ElementType {
    /// All element types, in tag order.
    pub const ALL: [ElementType; 5] = [
        ElementType::Number,
        ElementType::Vec2,
        ElementType::Vec3,
        ElementType::Vec4,
        ElementType::Boolean,
    ];

    /// Element types that may back a storage buffer or a uniform.
    pub const NUMERIC: [ElementType; 4] = [
        ElementType::Number,
        ElementType::Vec2,
        ElementType::Vec3,
        ElementType::Vec4,
    ];

    /// Tag prefix used in type names (`number`, `vec2`, ...).
    pub fn tag(&self) -> &'static str {
        match self {
            ElementType::Number => "number",
            ElementType::Vec2 => "vec2",
            ElementType::Vec3 => "vec3",
            ElementType::Vec4 => "vec4",
            ElementType::Boolean => "boolean",
        }
    }

    /// WGSL spelling of the type.
    pub fn to_wgsl(&self) -> &'static str {
        match self {
            ElementType::Number => "f32",
            ElementType::Vec2 => "vec2<f32>",
            ElementType::Vec3 => "vec3<f32>",
            ElementType::Vec4 => "vec4<f32>",
            ElementType::Boolean => "bool",
        }
    }

    /// Name of the WGSL struct wrapping a runtime-sized buffer of this element.
    pub fn buffer_struct(&self) -> &'static str {
        match self {
            ElementType::Number => "NumberBuffer",
            ElementType::Vec2 => "Vec2Buffer",
            ElementType::Vec3 => "Vec3Buffer",
            ElementType::Vec4 => "Vec4Buffer",
            ElementType::Boolean => "BooleanBuffer",
        }
    }

    /// Number of float components (0 for booleans).
    pub fn components(&self) -> usize {
        match self {
            ElementType::Number => 1,
            ElementType::Vec2 => 2,
            ElementType::Vec3 => 3,
            ElementType::Vec4 => 4,
            ElementType::Boolean => 0,
        }
    }

    /// Floats occupied by one element in storage.
    ///
    /// `vec3<f32>` has 16-byte alignment in WGSL storage arrays, so it is
    /// padded to four floats on both backends.
    pub fn stride(&self) -> usize {
        match self {
            ElementType::Vec3 => 4,
            other => other.components().max(1),
        }
    }

    /// Vector element type of the given arity.
    pub fn vector(arity: usize) -> Option<ElementType> {
        match arity {
            2 => Some(ElementType::Vec2),
            3 => Some(ElementType::Vec3),
            4 => Some(ElementType::Vec4),
            _ => None,
        }
    }

    /// The value type of a single element.
    pub fn value_type(&self) -> VariableType {
        match self {
            ElementType::Number => VariableType::Number,
            ElementType::Vec2 => VariableType::Vec2,
            ElementType::Vec3 => VariableType::Vec3,
            ElementType::Vec4 => VariableType::Vec4,
            ElementType::Boolean => VariableType::Boolean,
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// The closed set of types an expression can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableType {
    Number,
    Vec2,
    Vec3,
    Vec4,
    Boolean,
    /// The `Math` namespace.
    Math,
    /// A helper referenced without being called.
    Function,
    /// Result of a call that produces no value.
    Void,
    /// Not yet resolved. Never survives resolution.
    Unknown,
    /// `inputs.canvas`.
    Canvas,
    /// `inputs.uniforms`.
    Uniforms,
    /// `inputs.buffers`.
    Buffers,
    /// The `types` namespace.
    Types,
    /// The kernel parameter.
    Inputs,
    /// A storage buffer, or a partially indexed view of one.
    Buffer { rank: u8, element: ElementType },
    /// A local array variable.
    Array(ElementType),
    /// An array literal that has not been bound yet.
    ArrayLiteral(ElementType),
    /// A type literal such as `types.vec3`, used to annotate parameters.
    TypeLiteral(ElementType),
}

impl VariableType {
    /// Wrap an element type as a value type.
    pub fn from_element(element: ElementType) -> Self {
        element.value_type()
    }

    /// The element type when this is a plain value type.
    pub fn as_element(&self) -> Option<ElementType> {
        match self {
            VariableType::Number => Some(ElementType::Number),
            VariableType::Vec2 => Some(ElementType::Vec2),
            VariableType::Vec3 => Some(ElementType::Vec3),
            VariableType::Vec4 => Some(ElementType::Vec4),
            VariableType::Boolean => Some(ElementType::Boolean),
            _ => None,
        }
    }

    /// Arity of a vector type.
    pub fn vector_arity(&self) -> Option<usize> {
        match self {
            VariableType::Vec2 => Some(2),
            VariableType::Vec3 => Some(3),
            VariableType::Vec4 => Some(4),
            _ => None,
        }
    }

    pub fn is_vector(&self) -> bool {
        self.vector_arity().is_some()
    }

    /// Element type of an array or array literal.
    pub fn array_element(&self) -> Option<ElementType> {
        match self {
            VariableType::Array(e) | VariableType::ArrayLiteral(e) => Some(*e),
            _ => None,
        }
    }

    pub fn is_array(&self) -> bool {
        self.array_element().is_some()
    }

    /// Whether a value of this type may be bound to a variable.
    pub fn is_storable(&self) -> bool {
        self.as_element().is_some() || self.is_array()
    }

    /// The type a variable gets when bound to a value of this type.
    pub fn binding_type(&self) -> Self {
        match self {
            VariableType::ArrayLiteral(e) => VariableType::Array(*e),
            other => *other,
        }
    }

    /// Whether assigning `other` to a slot of this type is allowed.
    pub fn accepts(&self, other: &VariableType) -> bool {
        self.binding_type() == other.binding_type()
    }

    /// WGSL spelling of a value type; arrays need their length.
    pub fn to_wgsl(&self, array_length: Option<usize>) -> Option<String> {
        if let Some(element) = self.as_element() {
            return Some(element.to_wgsl().to_string());
        }
        match (self.array_element(), array_length) {
            (Some(element), Some(len)) => Some(format!("array<{}, {}>", element.to_wgsl(), len)),
            _ => None,
        }
    }
}

impl fmt::Display for VariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableType::Number => f.write_str("number"),
            VariableType::Vec2 => f.write_str("vec2"),
            VariableType::Vec3 => f.write_str("vec3"),
            VariableType::Vec4 => f.write_str("vec4"),
            VariableType::Boolean => f.write_str("boolean"),
            VariableType::Math => f.write_str("math"),
            VariableType::Function => f.write_str("function"),
            VariableType::Void => f.write_str("void"),
            VariableType::Unknown => f.write_str("unknown"),
            VariableType::Canvas => f.write_str("canvas"),
            VariableType::Uniforms => f.write_str("uniforms"),
            VariableType::Buffers => f.write_str("buffers"),
            VariableType::Types => f.write_str("types"),
            VariableType::Inputs => f.write_str("inputs"),
            VariableType::Buffer { rank, element } => write!(f, "buffer{}d{}", rank, element),
            VariableType::Array(e) => write!(f, "{}array", e),
            VariableType::ArrayLiteral(e) => write!(f, "{}arrayliteral", e),
            VariableType::TypeLiteral(e) => write!(f, "{}type", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_tags() {
        assert_eq!(VariableType::Vec3.to_string(), "vec3");
        assert_eq!(
            VariableType::Buffer {
                rank: 2,
                element: ElementType::Vec3
            }
            .to_string(),
            "buffer2dvec3"
        );
        assert_eq!(VariableType::Array(ElementType::Number).to_string(), "numberarray");
        assert_eq!(
            VariableType::ArrayLiteral(ElementType::Boolean).to_string(),
            "booleanarrayliteral"
        );
        assert_eq!(VariableType::TypeLiteral(ElementType::Vec4).to_string(), "vec4type");
    }

    #[test]
    fn test_wgsl_names() {
        assert_eq!(VariableType::Number.to_wgsl(None).as_deref(), Some("f32"));
        assert_eq!(
            VariableType::Array(ElementType::Vec2).to_wgsl(Some(3)).as_deref(),
            Some("array<vec2<f32>, 3>")
        );
        assert_eq!(VariableType::Array(ElementType::Number).to_wgsl(None), None);
        assert_eq!(VariableType::Math.to_wgsl(None), None);
    }

    #[test]
    fn test_array_literal_binds_as_array() {
        let literal = VariableType::ArrayLiteral(ElementType::Number);
        assert_eq!(literal.binding_type(), VariableType::Array(ElementType::Number));
        assert!(VariableType::Array(ElementType::Number).accepts(&literal));
        assert!(!VariableType::Number.accepts(&VariableType::Vec2));
    }

    #[test]
    fn test_vec3_stride_is_padded() {
        assert_eq!(ElementType::Number.stride(), 1);
        assert_eq!(ElementType::Vec2.stride(), 2);
        assert_eq!(ElementType::Vec3.stride(), 4);
        assert_eq!(ElementType::Vec4.stride(), 4);
    }
}
