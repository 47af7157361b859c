//! CPU backend integration tests.
//!
//! Emitted function bodies are executed with boa against the reference
//! vector library, and the resulting buffer and pixel contents are checked.

use boa_engine::{Context, Source};
use jskernel_codegen::{transpile_cpu, vector_library, ElementType, KernelLayout, UniformValue};

/// Run a kernel and return the contents of every buffer and the pixels.
fn run(source: &str, layout: &KernelLayout, uniforms: &str, dispatch: [u32; 3]) -> serde_json::Value {
    let program = transpile_cpu(source, layout)
        .unwrap_or_else(|err| panic!("transpile failed: {err}\n{source}"));

    let buffers: Vec<String> = layout
        .buffers
        .iter()
        .map(|b| format!("{}: new Float32Array({})", b.name, b.len() * b.element.stride()))
        .collect();
    let pixels = match &layout.canvas {
        Some(canvas) => format!("new Uint8Array({})", canvas.width * canvas.height * 4),
        None => "null".to_string(),
    };

    let script = format!(
        "const lib = {lib};
const buffers = {{ {buffers} }};
const pixels = {pixels};
const kernel = {kernel};
kernel(lib, buffers, {uniforms}, pixels, [{x}, {y}, {z}]);
const result = {{ pixels: pixels ? Array.from(pixels) : null }};
for (const name of Object.keys(buffers)) {{
    result[name] = Array.from(buffers[name]);
}}
JSON.stringify(result);",
        lib = vector_library(),
        buffers = buffers.join(", "),
        kernel = program.to_function_source(),
        x = dispatch[0],
        y = dispatch[1],
        z = dispatch[2],
    );

    let mut context = Context::default();
    let value = context
        .eval(Source::from_bytes(&script))
        .unwrap_or_else(|err| panic!("evaluation failed: {err}\n{script}"));
    let json = value.to_string(&mut context).unwrap().to_std_string_escaped();
    serde_json::from_str(&json).unwrap()
}

fn floats(value: &serde_json::Value) -> Vec<f64> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_f64().unwrap())
        .collect()
}

#[test]
fn test_doubling_kernel() {
    let layout = KernelLayout::new().with_buffer("out", ElementType::Number, &[3]);
    let result = run(
        "function (inputs) {\n  const i = inputs.threadId.x;\n  inputs.buffers.out[i] = i * 2;\n}",
        &layout,
        "{}",
        [3, 1, 1],
    );
    assert_eq!(floats(&result["out"]), vec![0.0, 2.0, 4.0]);
}

#[test]
fn test_array_dimensions() {
    let layout = KernelLayout::new()
        .with_buffer("out", ElementType::Number, &[5])
        .with_buffer("grid", ElementType::Number, &[4, 5]);
    let result = run(
        "function (inputs) {
            const a = array(3, 7);
            inputs.buffers.out[0] = dim([1, 2, 3]);
            inputs.buffers.out[1] = dim(a);
            inputs.buffers.out[2] = a.length;
            inputs.buffers.out[3] = dim(inputs.buffers.grid).y;
            inputs.buffers.out[4] = dim(inputs.buffers.grid[1]);
        }",
        &layout,
        "{}",
        [1, 1, 1],
    );
    assert_eq!(floats(&result["out"]), vec![3.0, 3.0, 3.0, 5.0, 5.0]);
}

#[test]
fn test_address_linearity() {
    let layout = KernelLayout::new().with_buffer("grid", ElementType::Number, &[4, 5, 6]);
    let result = run(
        "(inputs) => {
            const t = inputs.threadId;
            inputs.buffers.grid[t.x][t.y][t.z] = t.x + t.y * 10 + t.z * 100;
        }",
        &layout,
        "{}",
        [4, 5, 6],
    );
    let grid = floats(&result["grid"]);
    assert_eq!(grid.len(), 120);
    for z in 0..6 {
        for y in 0..5 {
            for x in 0..4 {
                let address = x + y * 4 + z * 20;
                assert_eq!(grid[address], (x + y * 10 + z * 100) as f64, "({x}, {y}, {z})");
            }
        }
    }
}

#[test]
fn test_vector_buffer_strides() {
    let layout = KernelLayout::new()
        .with_buffer("pos", ElementType::Vec3, &[2])
        .with_buffer("uv", ElementType::Vec2, &[2]);
    let result = run(
        "function (inputs) {
            const i = inputs.threadId.x;
            inputs.buffers.pos[i] = vec3(i, i + 1, i + 2);
            inputs.buffers.uv[i] = inputs.buffers.pos[i].zy;
        }",
        &layout,
        "{}",
        [2, 1, 1],
    );
    assert_eq!(
        floats(&result["pos"]),
        vec![0.0, 1.0, 2.0, 0.0, 1.0, 2.0, 3.0, 0.0]
    );
    assert_eq!(floats(&result["uv"]), vec![2.0, 1.0, 3.0, 2.0]);
}

#[test]
fn test_uniforms() {
    let layout = KernelLayout::new()
        .with_buffer("out", ElementType::Number, &[2])
        .with_uniform("scale", UniformValue::Number(1.0))
        .with_uniform("tint", UniformValue::Vec3([0.0; 3]));
    let result = run(
        "function (inputs) {
            const i = inputs.threadId.x;
            inputs.buffers.out[i] = inputs.uniforms.scale * inputs.uniforms.tint.y + i;
        }",
        &layout,
        "{ scale: 2, tint: [1, 5, 3] }",
        [2, 1, 1],
    );
    assert_eq!(floats(&result["out"]), vec![10.0, 11.0]);
}

#[test]
fn test_pixels() {
    let layout = KernelLayout::new().with_canvas(2, 2);
    let result = run(
        "function (inputs) {
            const p = inputs.threadId.xy;
            inputs.canvas.setPixel(p, vec4(1, 0.5, p.x, 1));
            inputs.canvas.setPixel(-1, 0, vec3(1, 1, 1));
        }",
        &layout,
        "{}",
        [2, 2, 1],
    );
    assert_eq!(
        floats(&result["pixels"]),
        vec![
            255.0, 128.0, 0.0, 255.0, //
            255.0, 128.0, 255.0, 255.0, //
            255.0, 128.0, 0.0, 255.0, //
            255.0, 128.0, 255.0, 255.0,
        ]
    );
}

#[test]
fn test_control_flow() {
    let layout = KernelLayout::new().with_buffer("out", ElementType::Number, &[3]);
    let result = run(
        "function (inputs) {
            const i = inputs.threadId.x;
            if (i == 1) {
                return;
            }
            let s = 0;
            for (let k = 0; k < 4; k++) {
                if (k == 2) {
                    continue;
                }
                s += k;
            }
            let w = 0;
            while (true) {
                w += 1;
                if (w >= 3) break;
            }
            inputs.buffers.out[i] = s + w;
        }",
        &layout,
        "{}",
        [3, 1, 1],
    );
    assert_eq!(floats(&result["out"]), vec![7.0, 0.0, 7.0]);
}

#[test]
fn test_declared_functions() {
    let layout = KernelLayout::new().with_buffer("out", ElementType::Vec2, &[2]);
    let result = run(
        "function (inputs) {
            function scale(v = types.vec2, k = types.number) {
                return v * k;
            }
            function offset() {
                var d = arguments.length > 0 && arguments[0] !== undefined ? arguments[0] : _lib.types.number;
                return vec2(d);
            }
            const i = inputs.threadId.x;
            inputs.buffers.out[i] = scale(vec2(i, 1), 3) + offset(0.5);
        }",
        &layout,
        "{}",
        [2, 1, 1],
    );
    assert_eq!(floats(&result["out"]), vec![0.5, 3.5, 3.5, 3.5]);
}

#[test]
fn test_arrays_are_values() {
    let layout = KernelLayout::new().with_buffer("out", ElementType::Number, &[2]);
    let result = run(
        "function (inputs) {
            let a = [1, 2, 3];
            let b = a;
            b[0] = 10;
            inputs.buffers.out[0] = a[0];
            inputs.buffers.out[1] = b[0];
        }",
        &layout,
        "{}",
        [1, 1, 1],
    );
    assert_eq!(floats(&result["out"]), vec![1.0, 10.0]);
}

#[test]
fn test_random_range() {
    let layout = KernelLayout::new().with_buffer("out", ElementType::Number, &[8]);
    let result = run(
        "function (inputs) {
            const r = Math.random();
            inputs.buffers.out[inputs.threadId.x] = r >= 0 && r < 1 ? 1 : 0;
        }",
        &layout,
        "{}",
        [8, 1, 1],
    );
    assert!(floats(&result["out"]).iter().all(|v| *v == 1.0));
}

#[test]
fn test_program_parameter_names_are_free() {
    let layout = KernelLayout::new().with_buffer("out", ElementType::Number, &[3]);
    let result = run(
        "function (inputs) {
            function dispatch(a = types.number) {
                return a;
            }
            const i = inputs.threadId.x;
            const lib = vec2(i, 1);
            const Array = [lib.x, 0];
            inputs.buffers.out[i] = dispatch(Array[0]) + 1;
        }",
        &layout,
        "{}",
        [3, 1, 1],
    );
    assert_eq!(floats(&result["out"]), vec![1.0, 2.0, 3.0]);
}
