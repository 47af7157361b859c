//! Kernel layout metadata and transpile options.
//!
//! The layout describes what a kernel can see through its `inputs` parameter:
//! named storage buffers with fixed dimensions, named uniforms and an
//! optional canvas. Registration order is significant, it decides binding
//! indices on the GPU.

use crate::types::ElementType;
use crate::{Result, TranspileError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Code generation target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    /// WGSL compute shader.
    #[default]
    Gpu,
    /// JavaScript function body.
    Cpu,
}

/// Options for a single transpile call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranspileOptions {
    /// Backend to emit.
    pub target: Target,
    /// Number of `u32` seeds in the GPU random state buffer.
    pub seed_pool_size: u32,
}

impl TranspileOptions {
    /// Default number of random seeds.
    pub const DEFAULT_SEED_POOL_SIZE: u32 = 1024;

    /// Create options for the given target.
    pub fn new(target: Target) -> Self {
        Self {
            target,
            seed_pool_size: Self::DEFAULT_SEED_POOL_SIZE,
        }
    }

    /// Set the target.
    pub fn with_target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    /// Set the random seed pool size.
    pub fn with_seed_pool_size(mut self, size: u32) -> Self {
        self.seed_pool_size = size;
        self
    }

    /// Check option values.
    pub fn validate(&self) -> Result<()> {
        if self.seed_pool_size == 0 {
            return Err(TranspileError::Layout(
                "seed pool size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for TranspileOptions {
    fn default() -> Self {
        Self::new(Target::Gpu)
    }
}

/// A named storage buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferSpec {
    /// Name under `inputs.buffers`.
    pub name: String,
    /// Element type stored in the buffer.
    pub element: ElementType,
    /// Dimension sizes, dimension 0 varies fastest.
    pub size: Vec<u32>,
}

impl BufferSpec {
    pub fn new(name: &str, element: ElementType, size: &[u32]) -> Self {
        Self {
            name: name.to_string(),
            element,
            size: size.to_vec(),
        }
    }

    /// Number of dimensions.
    pub fn rank(&self) -> usize {
        self.size.len()
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.size.iter().map(|d| *d as usize).product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Linear stride of each dimension: `[1, d0, d0*d1]`.
    pub fn strides(&self) -> Vec<usize> {
        let mut strides = Vec::with_capacity(self.size.len());
        let mut acc = 1usize;
        for dim in &self.size {
            strides.push(acc);
            acc *= *dim as usize;
        }
        strides
    }
}

/// Value of a uniform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UniformValue {
    Number(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
}

impl UniformValue {
    /// Element type of the uniform.
    pub fn element(&self) -> ElementType {
        match self {
            UniformValue::Number(_) => ElementType::Number,
            UniformValue::Vec2(_) => ElementType::Vec2,
            UniformValue::Vec3(_) => ElementType::Vec3,
            UniformValue::Vec4(_) => ElementType::Vec4,
        }
    }
}

/// A named uniform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniformSpec {
    /// Name under `inputs.uniforms`.
    pub name: String,
    /// Initial value; only its type matters for code generation.
    pub value: UniformValue,
}

/// Pixel canvas dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasSpec {
    pub width: u32,
    pub height: u32,
}

/// Everything a kernel can reach through `inputs`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KernelLayout {
    #[serde(default)]
    pub buffers: Vec<BufferSpec>,
    #[serde(default)]
    pub uniforms: Vec<UniformSpec>,
    #[serde(default)]
    pub canvas: Option<CanvasSpec>,
}

impl KernelLayout {
    /// Create an empty layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a buffer.
    pub fn with_buffer(mut self, name: &str, element: ElementType, size: &[u32]) -> Self {
        self.buffers.push(BufferSpec::new(name, element, size));
        self
    }

    /// Register a uniform.
    pub fn with_uniform(mut self, name: &str, value: UniformValue) -> Self {
        self.uniforms.push(UniformSpec {
            name: name.to_string(),
            value,
        });
        self
    }

    /// Attach a canvas.
    pub fn with_canvas(mut self, width: u32, height: u32) -> Self {
        self.canvas = Some(CanvasSpec { width, height });
        self
    }

    /// Look up a buffer by name.
    pub fn buffer(&self, name: &str) -> Option<&BufferSpec> {
        self.buffers.iter().find(|b| b.name == name)
    }

    /// Look up a uniform by name.
    pub fn uniform(&self, name: &str) -> Option<&UniformSpec> {
        self.uniforms.iter().find(|u| u.name == name)
    }

    /// Element types of all buffers, first use order, deduplicated.
    pub fn buffer_elements(&self) -> Vec<ElementType> {
        let mut seen = Vec::new();
        for buffer in &self.buffers {
            if !seen.contains(&buffer.element) {
                seen.push(buffer.element);
            }
        }
        seen
    }

    /// Check names and dimensions.
    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for buffer in &self.buffers {
            check_name("buffer", &buffer.name)?;
            if !names.insert(buffer.name.as_str()) {
                return Err(TranspileError::Layout(format!(
                    "duplicate buffer name `{}`",
                    buffer.name
                )));
            }
            if !ElementType::NUMERIC.contains(&buffer.element) {
                return Err(TranspileError::Layout(format!(
                    "buffer `{}` cannot hold {} values",
                    buffer.name,
                    buffer.element.tag()
                )));
            }
            if buffer.size.is_empty() || buffer.size.len() > 3 {
                return Err(TranspileError::Layout(format!(
                    "buffer `{}` must have 1 to 3 dimensions, got {}",
                    buffer.name,
                    buffer.size.len()
                )));
            }
            if buffer.size.contains(&0) {
                return Err(TranspileError::Layout(format!(
                    "buffer `{}` has a zero-length dimension",
                    buffer.name
                )));
            }
        }

        let mut names = HashSet::new();
        for uniform in &self.uniforms {
            check_name("uniform", &uniform.name)?;
            if !names.insert(uniform.name.as_str()) {
                return Err(TranspileError::Layout(format!(
                    "duplicate uniform name `{}`",
                    uniform.name
                )));
            }
        }

        if let Some(canvas) = &self.canvas {
            if canvas.width == 0 || canvas.height == 0 {
                return Err(TranspileError::Layout(format!(
                    "canvas must not be empty, got {}x{}",
                    canvas.width, canvas.height
                )));
            }
        }
        Ok(())
    }
}

fn check_name(kind: &str, name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if !valid || name.starts_with("__") {
        return Err(TranspileError::Layout(format!(
            "{kind} name `{name}` is not a plain identifier"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strides() {
        let buffer = BufferSpec::new("grid", ElementType::Number, &[4, 5, 6]);
        assert_eq!(buffer.strides(), vec![1, 4, 20]);
        assert_eq!(buffer.len(), 120);
        assert_eq!(buffer.rank(), 3);
    }

    #[test]
    fn test_builder() {
        let layout = KernelLayout::new()
            .with_buffer("a", ElementType::Number, &[8])
            .with_buffer("b", ElementType::Vec3, &[2, 2])
            .with_buffer("c", ElementType::Number, &[1])
            .with_uniform("scale", UniformValue::Number(2.0))
            .with_canvas(16, 8);
        assert!(layout.validate().is_ok());
        assert_eq!(
            layout.buffer_elements(),
            vec![ElementType::Number, ElementType::Vec3]
        );
        assert!(layout.buffer("b").is_some());
        assert!(layout.uniform("missing").is_none());
    }

    #[test]
    fn test_invalid_layouts() {
        let dup = KernelLayout::new()
            .with_buffer("a", ElementType::Number, &[1])
            .with_buffer("a", ElementType::Number, &[1]);
        assert!(matches!(dup.validate(), Err(TranspileError::Layout(_))));

        let rank = KernelLayout::new().with_buffer("a", ElementType::Number, &[1, 1, 1, 1]);
        assert!(rank.validate().is_err());

        let zero = KernelLayout::new().with_buffer("a", ElementType::Number, &[4, 0]);
        assert!(zero.validate().is_err());

        let name = KernelLayout::new().with_uniform("my-value", UniformValue::Number(0.0));
        assert!(name.validate().is_err());

        let flags = KernelLayout::new().with_buffer("a", ElementType::Boolean, &[4]);
        assert!(flags.validate().is_err());

        let canvas = KernelLayout::new().with_canvas(0, 4);
        assert!(canvas.validate().is_err());
    }

    #[test]
    fn test_layout_from_json() {
        let json = r#"{
            "buffers": [{ "name": "out", "element": "vec2", "size": [3, 2] }],
            "uniforms": [
                { "name": "scale", "value": 1.5 },
                { "name": "tint", "value": [1.0, 0.5, 0.0] }
            ],
            "canvas": { "width": 4, "height": 4 }
        }"#;
        let layout: KernelLayout = serde_json::from_str(json).unwrap();
        assert_eq!(layout.buffers[0].element, ElementType::Vec2);
        assert_eq!(layout.uniforms[0].value, UniformValue::Number(1.5));
        assert_eq!(layout.uniforms[1].value.element(), ElementType::Vec3);
        assert_eq!(layout.canvas, Some(CanvasSpec { width: 4, height: 4 }));
    }

    #[test]
    fn test_options_builder() {
        let options = TranspileOptions::new(Target::Cpu).with_seed_pool_size(64);
        assert_eq!(options.target, Target::Cpu);
        assert_eq!(options.seed_pool_size, 64);
        assert!(options.with_seed_pool_size(0).validate().is_err());
        assert_eq!(TranspileOptions::default().target, Target::Gpu);
    }
}
