//! Program assembly.
//!
//! The walker produces an entry point body and a list of declared functions.
//! This module wraps them with the target preamble: storage structs,
//! bindings and helpers on the GPU, buffer accessors and the dispatch loop
//! on the CPU.

use crate::backend::{js_number, wgsl_float, Backend, WgslBackend};
use crate::bindings::{self, BindingLayout};
use crate::layout::{CanvasSpec, KernelLayout, Target, TranspileOptions};
use crate::transpiler::KernelBody;
use crate::types::ElementType;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Parameters of the emitted CPU function, in order.
pub const CPU_PARAMS: [&str; 5] = ["lib", "buffers", "uniforms", "pixels", "dispatch"];

/// A WGSL compute shader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpuProgram {
    /// Complete shader module.
    pub source: String,
    /// Entry point name.
    pub entry_point: String,
    /// Bindings the host must create, in binding order.
    pub bindings: Vec<BindingLayout>,
}

/// A JavaScript function body.
///
/// The body expects these parameters:
///
/// - `lib`: the vector library (`{ vec2, vec3, vec4 }`)
/// - `buffers`: flat float storage per buffer name (`Float32Array`)
/// - `uniforms`: uniform values by name (numbers or component arrays)
/// - `pixels`: RGBA8 bytes of the canvas, row-major, or `null`
/// - `dispatch`: grid size as `[x, y, z]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuProgram {
    pub params: Vec<String>,
    pub body: String,
}

impl CpuProgram {
    /// Render a parenthesized function expression.
    pub fn to_function_source(&self) -> String {
        format!("(function ({}) {{\n{}}})", self.params.join(", "), self.body)
    }
}

/// Output of a transpile call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "target", rename_all = "lowercase")]
pub enum Program {
    Gpu(GpuProgram),
    Cpu(CpuProgram),
}

impl Program {
    pub fn target(&self) -> Target {
        match self {
            Program::Gpu(_) => Target::Gpu,
            Program::Cpu(_) => Target::Cpu,
        }
    }

    /// Emitted source: the shader module, or the function expression.
    pub fn source(&self) -> String {
        match self {
            Program::Gpu(gpu) => gpu.source.clone(),
            Program::Cpu(cpu) => cpu.to_function_source(),
        }
    }
}

fn indent_lines(text: &str, levels: usize) -> String {
    let prefix = "    ".repeat(levels);
    text.lines()
        .map(|line| {
            if line.is_empty() {
                "\n".to_string()
            } else {
                format!("{}{}\n", prefix, line)
            }
        })
        .collect()
}

// === GPU ===

/// Assemble the WGSL module.
pub fn assemble_gpu(layout: &KernelLayout, options: &TranspileOptions, body: &KernelBody) -> GpuProgram {
    let bindings = bindings::kernel_bindings(layout);
    let mut out = String::new();

    for element in layout.buffer_elements() {
        writeln!(
            out,
            "struct {} {{\n    data: array<{}>,\n}}\n",
            element.buffer_struct(),
            element.to_wgsl()
        )
        .unwrap();
    }
    if let Some(uniforms) = bindings::uniforms_struct(layout) {
        writeln!(out, "{}\n", uniforms).unwrap();
    }

    out.push_str(&bindings::generate_bindings(&bindings));
    out.push_str("\n\n");

    if let Some(canvas) = &layout.canvas {
        out.push_str(&canvas_wgsl(canvas));
        out.push('\n');
    }
    out.push_str(&random_wgsl(options.seed_pool_size));
    out.push('\n');

    for function in &body.functions {
        out.push_str(&function.source);
        out.push('\n');
    }

    out.push_str("@compute @workgroup_size(1, 1, 1)\n");
    writeln!(
        out,
        "fn main(@builtin(global_invocation_id) {}: vec3<u32>) {{",
        WgslBackend.thread_id_param()
    )
    .unwrap();
    out.push_str(&body.body);
    out.push_str("}\n");

    GpuProgram {
        source: out,
        entry_point: "main".to_string(),
        bindings,
    }
}

fn canvas_wgsl(canvas: &CanvasSpec) -> String {
    format!(
        "const CANVAS_WIDTH: u32 = {width}u;
const CANVAS_SIZE: vec2<f32> = vec2<f32>({w}, {h});

fn set_pixel(coord: vec2<f32>, color: vec4<f32>) {{
    let p = floor(coord);
    if (p.x < 0.0 || p.y < 0.0 || p.x >= CANVAS_SIZE.x || p.y >= CANVAS_SIZE.y) {{
        return;
    }}
    {pixels}[u32(p.y) * CANVAS_WIDTH + u32(p.x)] = pack4x8unorm(color);
}}
",
        width = canvas.width,
        w = wgsl_float(canvas.width as f64),
        h = wgsl_float(canvas.height as f64),
        pixels = bindings::PIXELS,
    )
}

fn random_wgsl(pool_size: u32) -> String {
    format!(
        "const RNG_POOL_SIZE: u32 = {pool_size}u;

fn random(id: vec3<u32>) -> f32 {{
    let slot = (id.x + id.y * 7919u + id.z * 104729u) % RNG_POOL_SIZE;
    var x = {state}[slot];
    x = x ^ (x << 13u);
    x = x ^ (x >> 17u);
    x = x ^ (x << 5u);
    {state}[slot] = x;
    return f32(x >> 8u) / 16777216.0;
}}
",
        state = bindings::RNG_STATE,
    )
}

// === CPU ===

/// Assemble the JavaScript function body.
pub fn assemble_cpu(layout: &KernelLayout, body: &KernelBody) -> CpuProgram {
    let mut out = String::from("const { vec2, vec3, vec4 } = lib;\n");

    for buffer in &layout.buffers {
        out.push_str(&buffer_accessor(&buffer.name, buffer.element));
    }

    if !layout.uniforms.is_empty() {
        out.push_str(
            "const __vector = (ctor, v) => (Array.isArray(v) || ArrayBuffer.isView(v) ? ctor(...v) : v);\n",
        );
        out.push_str("const __uniforms = {\n");
        for uniform in &layout.uniforms {
            let name = &uniform.name;
            let value = match uniform.value.element() {
                ElementType::Vec2 => format!("__vector(vec2, uniforms.{name})"),
                ElementType::Vec3 => format!("__vector(vec3, uniforms.{name})"),
                ElementType::Vec4 => format!("__vector(vec4, uniforms.{name})"),
                _ => format!("uniforms.{name}"),
            };
            writeln!(out, "    {name}: {value},").unwrap();
        }
        out.push_str("};\n");
    }

    if let Some(canvas) = &layout.canvas {
        out.push_str(&canvas_js(canvas));
    }

    for function in &body.functions {
        out.push_str(&function.source);
    }

    out.push_str(
        "for (let __z = 0; __z < dispatch[2]; __z++) {
    for (let __y = 0; __y < dispatch[1]; __y++) {
        for (let __x = 0; __x < dispatch[0]; __x++) {
            const __threadId = vec3(__x, __y, __z);
            __thread: {
",
    );
    out.push_str(&indent_lines(&body.body, 3));
    out.push_str(
        "            }
        }
    }
}
",
    );

    CpuProgram {
        params: CPU_PARAMS.iter().map(|p| p.to_string()).collect(),
        body: out,
    }
}

/// Accessor over flat float storage, with the GPU's per-element stride.
fn buffer_accessor(name: &str, element: ElementType) -> String {
    let stride = element.stride();
    let (get, set) = match element.components() {
        1 => (
            "return d[o];".to_string(),
            "d[o] = v;".to_string(),
        ),
        n => {
            let keys = &['x', 'y', 'z', 'w'][..n];
            let reads: Vec<String> = (0..n)
                .map(|k| if k == 0 { "d[o]".to_string() } else { format!("d[o + {}]", k) })
                .collect();
            let writes: Vec<String> = keys
                .iter()
                .enumerate()
                .map(|(k, c)| {
                    if k == 0 {
                        format!("d[o] = v.{};", c)
                    } else {
                        format!("d[o + {}] = v.{};", k, c)
                    }
                })
                .collect();
            (
                format!("return {}({});", element.tag(), reads.join(", ")),
                writes.join(" "),
            )
        }
    };
    let offset = if stride == 1 {
        "const o = Math.trunc(i);".to_string()
    } else {
        format!("const o = Math.trunc(i) * {};", stride)
    };
    format!(
        "const __buffer_{name} = {{
    get(i) {{ const d = buffers.{name}; {offset} {get} }},
    set(i, v) {{ const d = buffers.{name}; {offset} {set} }},
}};
"
    )
}

fn canvas_js(canvas: &CanvasSpec) -> String {
    let width = js_number(canvas.width as f64);
    let height = js_number(canvas.height as f64);
    format!(
        "const __canvasSize = vec2({width}, {height});
const __unorm8 = (v) => Math.floor(0.5 + 255 * Math.min(Math.max(v, 0), 1));
const __setPixel = (coord, color) => {{
    const x = Math.floor(coord.x);
    const y = Math.floor(coord.y);
    if (x < 0 || y < 0 || x >= {width} || y >= {height}) {{
        return;
    }}
    const o = (y * {width} + x) * 4;
    pixels[o] = __unorm8(color.x);
    pixels[o + 1] = __unorm8(color.y);
    pixels[o + 2] = __unorm8(color.z);
    pixels[o + 3] = __unorm8(color.w);
}};
"
    )
}
