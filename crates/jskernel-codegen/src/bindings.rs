//! Resource binding layout for emitted WGSL.
//!
//! Generates @group/@binding declarations from the kernel layout. Indices are
//! dense and follow a fixed order: buffers in registration order, then the
//! uniform block, then the pixel buffer, then the random state.

use crate::backend::{Backend, WgslBackend};
use crate::layout::KernelLayout;
use crate::types::ElementType;
use serde::{Deserialize, Serialize};

/// Name of the uniform block binding.
pub const UNIFORMS: &str = "uniforms";
/// Name of the pixel buffer binding.
pub const PIXELS: &str = "pixels";
/// Name of the random state binding.
pub const RNG_STATE: &str = "rng_state";

/// Access mode of a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    /// Read-only access.
    Read,
    /// Read-write access.
    ReadWrite,
}

impl AccessMode {
    /// Get the WGSL access mode string.
    pub fn to_wgsl(&self) -> &'static str {
        match self {
            AccessMode::Read => "read",
            AccessMode::ReadWrite => "read_write",
        }
    }
}

/// What a binding holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingKind {
    /// A storage buffer of the given element type, wrapped in its struct.
    Buffer(ElementType),
    /// The `Uniforms` block.
    Uniforms,
    /// RGBA8 pixels packed into `u32`.
    Pixels,
    /// Per-slot xorshift seeds.
    RandomState,
}

impl BindingKind {
    /// WGSL type of the bound variable.
    pub fn wgsl_type(&self) -> &'static str {
        match self {
            BindingKind::Buffer(element) => element.buffer_struct(),
            BindingKind::Uniforms => "Uniforms",
            BindingKind::Pixels | BindingKind::RandomState => "array<u32>",
        }
    }
}

/// Description of a resource binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingLayout {
    /// Binding group (always 0).
    pub group: u32,
    /// Binding number within the group.
    pub binding: u32,
    /// Variable name in the shader.
    pub name: String,
    /// Buffer, uniform or pixel name in the kernel layout, if any.
    pub source: Option<String>,
    /// What is bound.
    pub kind: BindingKind,
    /// Access mode.
    pub access: AccessMode,
}

impl BindingLayout {
    /// Create a new binding layout.
    pub fn new(binding: u32, name: &str, kind: BindingKind, access: AccessMode) -> Self {
        Self {
            group: 0,
            binding,
            name: name.to_string(),
            source: None,
            kind,
            access,
        }
    }

    /// Create a read-write storage buffer binding for a kernel buffer.
    pub fn buffer(binding: u32, buffer: &str, element: ElementType) -> Self {
        Self {
            source: Some(buffer.to_string()),
            ..Self::new(
                binding,
                &format!("buffer_{}", buffer),
                BindingKind::Buffer(element),
                AccessMode::ReadWrite,
            )
        }
    }

    /// Create the uniform block binding.
    pub fn uniforms(binding: u32) -> Self {
        Self::new(binding, UNIFORMS, BindingKind::Uniforms, AccessMode::Read)
    }

    /// Generate the WGSL binding declaration.
    pub fn to_wgsl(&self) -> String {
        match self.kind {
            BindingKind::Uniforms => format!(
                "@group({}) @binding({}) var<uniform> {}: {};",
                self.group,
                self.binding,
                self.name,
                self.kind.wgsl_type()
            ),
            _ => format!(
                "@group({}) @binding({}) var<storage, {}> {}: {};",
                self.group,
                self.binding,
                self.access.to_wgsl(),
                self.name,
                self.kind.wgsl_type()
            ),
        }
    }
}

/// Generate binding declarations.
pub fn generate_bindings(bindings: &[BindingLayout]) -> String {
    bindings
        .iter()
        .map(|b| b.to_wgsl())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Bindings needed by a kernel layout.
pub fn kernel_bindings(layout: &KernelLayout) -> Vec<BindingLayout> {
    let mut bindings = Vec::with_capacity(layout.buffers.len() + 3);
    let mut next = 0u32;
    let mut index = || {
        let current = next;
        next += 1;
        current
    };

    for buffer in &layout.buffers {
        bindings.push(BindingLayout::buffer(index(), &buffer.name, buffer.element));
    }
    if !layout.uniforms.is_empty() {
        bindings.push(BindingLayout::uniforms(index()));
    }
    if layout.canvas.is_some() {
        bindings.push(BindingLayout::new(
            index(),
            PIXELS,
            BindingKind::Pixels,
            AccessMode::ReadWrite,
        ));
    }
    bindings.push(BindingLayout::new(
        index(),
        RNG_STATE,
        BindingKind::RandomState,
        AccessMode::ReadWrite,
    ));
    bindings
}

/// `struct Uniforms` with every field on its own 16-byte boundary.
pub fn uniforms_struct(layout: &KernelLayout) -> Option<String> {
    if layout.uniforms.is_empty() {
        return None;
    }
    let backend = WgslBackend;
    let fields: String = layout
        .uniforms
        .iter()
        .map(|u| {
            format!(
                "    @align(16) {}: {},\n",
                backend.identifier(&u.name),
                u.value.element().to_wgsl()
            )
        })
        .collect();
    Some(format!("struct Uniforms {{\n{}}}", fields))
}
