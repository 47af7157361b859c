//! Fuzz target for kernel transpilation.
//!
//! Builds kernels from random operation sequences and runs both backends.
//! Errors are fine; panics are not.

#![no_main]

use arbitrary::Arbitrary;
use jskernel_codegen::{transpile_cpu, transpile_gpu, ElementType, KernelLayout, TranspileOptions, UniformValue};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct FuzzKernel {
    grid_width: u8,
    with_canvas: bool,
    helper: Option<FuzzHelper>,
    body_ops: Vec<FuzzOp>,
}

#[derive(Debug, Arbitrary)]
enum FuzzHelper {
    Scale,
    Es5Offset,
}

#[derive(Debug, Arbitrary)]
enum FuzzOp {
    // Inputs
    ThreadId,
    Uniform,
    LoadBuffer { index: u8 },
    LoadGrid { row: u8, col: u8 },

    // Math
    AddConst(i16),
    MulConst(i16),
    Negate,
    Sqrt,
    Clamp,
    Random,
    Vector,
    Swizzle,

    // Arrays
    ArrayLiteral,
    ArrayIndex { index: u8 },
    Dim,

    // Control flow
    IfCheck,
    ForLoop { count: u8 },
    WhileBreak,
    EarlyReturn,

    // Outputs
    Store { index: u8 },
    SetPixel,
    CallHelper,
}

fn generate_kernel(kernel: &FuzzKernel) -> String {
    let mut code = String::from("function (inputs) {\n");

    match kernel.helper {
        Some(FuzzHelper::Scale) => {
            code.push_str("  function helper(v = types.number) {\n    return v * 2;\n  }\n");
        }
        Some(FuzzHelper::Es5Offset) => code.push_str(
            "  function helper() {\n    var v = arguments.length > 0 && arguments[0] !== undefined ? arguments[0] : _lib.types.number;\n    return v + 1;\n  }\n",
        ),
        None => {}
    }

    code.push_str("  const t = inputs.threadId;\n");
    code.push_str("  let acc = 0;\n");

    for (i, op) in kernel.body_ops.iter().take(16).enumerate() {
        let line = match op {
            FuzzOp::ThreadId => format!("  const v{} = t.x + t.y;\n", i),
            FuzzOp::Uniform => format!("  const v{} = inputs.uniforms.scale * inputs.uniforms.tint.z;\n", i),
            FuzzOp::LoadBuffer { index } => {
                format!("  const v{} = inputs.buffers.data[{}];\n", i, index)
            }
            FuzzOp::LoadGrid { row, col } => {
                format!("  const v{} = inputs.buffers.grid[{}][{}];\n", i, row % 8, col)
            }
            FuzzOp::AddConst(c) => format!("  acc = acc + {};\n", c),
            FuzzOp::MulConst(c) => format!("  acc *= {};\n", c),
            FuzzOp::Negate => "  acc = -acc;\n".to_string(),
            FuzzOp::Sqrt => format!("  const v{} = Math.sqrt(Math.abs(acc));\n", i),
            FuzzOp::Clamp => format!("  const v{} = Math.min(Math.max(acc, 0), 1);\n", i),
            FuzzOp::Random => "  acc += Math.random();\n".to_string(),
            FuzzOp::Vector => format!("  const v{} = vec3(acc, t.y, 1).normalize();\n", i),
            FuzzOp::Swizzle => format!("  const v{} = t.zyx.xy.length();\n", i),
            FuzzOp::ArrayLiteral => format!("  let v{} = [acc, 1, 2];\n", i),
            FuzzOp::ArrayIndex { index } => format!("  const v{} = [1, 2, 3][{}];\n", i, index % 4),
            FuzzOp::Dim => format!("  const v{} = dim(inputs.buffers.grid).x;\n", i),
            FuzzOp::IfCheck => "  if (acc > 10) {\n    acc = 0;\n  } else {\n    acc += 1;\n  }\n".to_string(),
            FuzzOp::ForLoop { count } => format!(
                "  for (let k = 0; k < {}; k++) {{\n    acc += k;\n  }}\n",
                count % 8
            ),
            FuzzOp::WhileBreak => {
                "  while (true) {\n    acc += 1;\n    if (acc > 3) break;\n  }\n".to_string()
            }
            FuzzOp::EarlyReturn => "  if (t.x > 6) {\n    return;\n  }\n".to_string(),
            FuzzOp::Store { index } => format!("  inputs.buffers.data[{}] = acc;\n", index),
            FuzzOp::SetPixel => "  inputs.canvas.setPixel(t.xy, vec3(acc, 0, 1));\n".to_string(),
            FuzzOp::CallHelper => "  acc = helper(acc);\n".to_string(),
        };
        code.push_str(&line);
    }

    code.push_str("}\n");
    code
}

fn layout(kernel: &FuzzKernel) -> KernelLayout {
    let width = (kernel.grid_width % 8) as u32 + 1;
    let layout = KernelLayout::new()
        .with_buffer("data", ElementType::Number, &[16])
        .with_buffer("grid", ElementType::Number, &[8, width])
        .with_uniform("scale", UniformValue::Number(1.0))
        .with_uniform("tint", UniformValue::Vec3([1.0, 1.0, 1.0]));
    if kernel.with_canvas {
        layout.with_canvas(8, 8)
    } else {
        layout
    }
}

fuzz_target!(|kernel: FuzzKernel| {
    // Limit complexity
    if kernel.body_ops.len() > 32 {
        return;
    }

    let code = generate_kernel(&kernel);
    let layout = layout(&kernel);

    let gpu = transpile_gpu(&code, &layout, &TranspileOptions::default());
    let cpu = transpile_cpu(&code, &layout);

    // Both backends accept or reject the same kernels.
    assert_eq!(gpu.is_ok(), cpu.is_ok(), "{}", code);
});
