//! Overload table for operators, helpers and methods.
//!
//! Every operator, free helper, `Math` function and vector method a kernel
//! can use is an entry here, keyed by receiver type and name. Each entry
//! carries one template per backend. Resolution walks a bucket in
//! declaration order and takes the first entry whose arity and argument
//! types match exactly.

use crate::backend::{js_number, wgsl_float};
use crate::layout::Target;
use crate::types::{ElementType, VariableType};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// Arguments handed to a template when rendering a resolved call.
#[derive(Debug, Clone, Copy)]
pub struct TemplateInput<'a> {
    /// Emitted receiver expression, if the call has one.
    pub receiver: Option<&'a str>,
    /// Emitted argument expressions.
    pub args: &'a [String],
    /// Resolved size of the first array-like operand.
    pub size: &'a [usize],
}

impl<'a> TemplateInput<'a> {
    pub fn new(receiver: Option<&'a str>, args: &'a [String], size: &'a [usize]) -> Self {
        Self {
            receiver,
            args,
            size,
        }
    }

    /// Receiver followed by the arguments.
    pub fn operands(&self) -> Vec<&'a str> {
        self.receiver
            .into_iter()
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }

    fn operand(&self, index: usize) -> &'a str {
        self.operands().get(index).copied().unwrap_or_default()
    }

    fn first_size(&self) -> usize {
        self.size.first().copied().unwrap_or(0)
    }
}

/// Custom code generator.
pub type TemplateFn = fn(&TemplateInput<'_>) -> String;

/// How a resolved call is written out by one backend.
#[derive(Debug, Clone, PartialEq)]
pub enum Template {
    /// `name(arg, ...)`; the receiver is not emitted.
    Call(&'static str),
    /// `name(receiver, arg, ...)`.
    Apply(&'static str),
    /// `first.name(rest, ...)`.
    Method(&'static str),
    /// `first.name`.
    Property(&'static str),
    /// `(first op second)`.
    Infix(&'static str),
    /// `(op first)`.
    Prefix(&'static str),
    /// `ctor(first).method(second)`: scalar on the left of a vector operator.
    SplatLeft {
        ctor: &'static str,
        method: &'static str,
    },
    /// `array<T, N>(fill, fill, ...)`.
    ArrayFill(&'static str),
    /// Fixed text.
    Text(&'static str),
    /// Anything else.
    Custom(TemplateFn),
    /// A function declared in the kernel; the thread id is passed first.
    Declared {
        name: String,
        thread_id: &'static str,
    },
}

impl Template {
    /// Render the template.
    pub fn render(&self, input: &TemplateInput<'_>) -> String {
        let operands = input.operands();
        match self {
            Template::Call(name) => format!("{}({})", name, input.args.join(", ")),
            Template::Apply(name) => format!("{}({})", name, operands.join(", ")),
            Template::Method(name) => match operands.split_first() {
                Some((first, rest)) => format!("{}.{}({})", first, name, rest.join(", ")),
                None => format!("{}()", name),
            },
            Template::Property(name) => format!("{}.{}", input.operand(0), name),
            Template::Infix(op) => {
                format!("({} {} {})", input.operand(0), op, input.operand(1))
            }
            Template::Prefix(op) => format!("({}{})", op, input.operand(0)),
            Template::SplatLeft { ctor, method } => format!(
                "{}({}).{}({})",
                ctor,
                input.operand(0),
                method,
                input.operand(1)
            ),
            Template::ArrayFill(element) => {
                let fill = input.operand(1);
                let repeated = vec![fill; input.first_size()].join(", ");
                format!("array<{}, {}>({})", element, input.first_size(), repeated)
            }
            Template::Text(text) => text.to_string(),
            Template::Custom(generate) => generate(input),
            Template::Declared { name, thread_id } => {
                let mut args = vec![thread_id.to_string()];
                args.extend(input.args.iter().cloned());
                format!("{}({})", name, args.join(", "))
            }
        }
    }
}

/// One resolvable signature.
#[derive(Debug, Clone, PartialEq)]
pub struct Overload {
    pub return_type: VariableType,
    pub argument_types: Vec<VariableType>,
    pub gpu: Template,
    pub cpu: Template,
    /// Whether rendering needs the size of the first operand.
    pub uses_size: bool,
}

impl Overload {
    pub fn new(
        return_type: VariableType,
        argument_types: &[VariableType],
        gpu: Template,
        cpu: Template,
    ) -> Self {
        Self {
            return_type,
            argument_types: argument_types.to_vec(),
            gpu,
            cpu,
            uses_size: false,
        }
    }

    /// Same template on both backends.
    pub fn shared(return_type: VariableType, argument_types: &[VariableType], t: Template) -> Self {
        Self::new(return_type, argument_types, t.clone(), t)
    }

    /// Mark the overload as needing the first operand's size.
    pub fn sized(mut self) -> Self {
        self.uses_size = true;
        self
    }

    /// Template for a target.
    pub fn template(&self, target: Target) -> &Template {
        match target {
            Target::Gpu => &self.gpu,
            Target::Cpu => &self.cpu,
        }
    }

    /// Exact arity and per-position type equality.
    pub fn matches(&self, args: &[VariableType]) -> bool {
        self.argument_types.len() == args.len()
            && self.argument_types.iter().zip(args).all(|(a, b)| a == b)
    }
}

/// Bucket key: free functions and operators, or methods of a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Receiver {
    Standalone,
    Of(VariableType),
}

impl fmt::Display for Receiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Receiver::Standalone => f.write_str("standalone"),
            Receiver::Of(ty) => write!(f, "{}", ty),
        }
    }
}

/// Two entries in one bucket with the same signature. The second can never
/// be selected.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlap {
    pub receiver: Receiver,
    pub name: String,
    pub first: usize,
    pub second: usize,
    pub signature: Vec<VariableType>,
}

impl fmt::Display for Overlap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sig: Vec<String> = self.signature.iter().map(|t| t.to_string()).collect();
        write!(
            f,
            "{}.{}({}) declared at positions {} and {}; the later entry is unreachable",
            self.receiver,
            self.name,
            sig.join(", "),
            self.first,
            self.second
        )
    }
}

/// Overload table keyed by receiver and name.
#[derive(Debug, Clone, Default)]
pub struct FunctionTable {
    methods: HashMap<Receiver, HashMap<String, Vec<Overload>>>,
    properties: HashMap<Receiver, HashMap<String, Overload>>,
}

impl FunctionTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// The builtin table, built once and shared.
    pub fn builtin() -> &'static FunctionTable {
        static BUILTIN: LazyLock<FunctionTable> = LazyLock::new(|| {
            let table = build_builtin();
            for overlap in table.lint() {
                tracing::warn!(%overlap, "overlapping builtin overload");
            }
            table
        });
        &BUILTIN
    }

    /// Append an overload to a bucket.
    pub fn add(&mut self, receiver: Receiver, name: &str, overload: Overload) {
        self.methods
            .entry(receiver)
            .or_default()
            .entry(name.to_string())
            .or_default()
            .push(overload);
    }

    /// Register a property (`Math.PI`, `canvas.size`).
    pub fn add_property(&mut self, receiver: Receiver, name: &str, overload: Overload) {
        self.properties
            .entry(receiver)
            .or_default()
            .insert(name.to_string(), overload);
    }

    /// Candidates for a call, in declaration order.
    pub fn overloads(&self, receiver: Receiver, name: &str) -> Option<&[Overload]> {
        self.methods
            .get(&receiver)
            .and_then(|bucket| bucket.get(name))
            .map(Vec::as_slice)
    }

    /// Property entry.
    pub fn property(&self, receiver: Receiver, name: &str) -> Option<&Overload> {
        self.properties
            .get(&receiver)
            .and_then(|bucket| bucket.get(name))
    }

    /// First overload matching the argument types.
    pub fn resolve(&self, receiver: Receiver, name: &str, args: &[VariableType]) -> Option<&Overload> {
        self.overloads(receiver, name)?
            .iter()
            .find(|o| o.matches(args))
    }

    /// Whether a free function or operator with this name exists.
    pub fn has_standalone(&self, name: &str) -> bool {
        self.overloads(Receiver::Standalone, name).is_some()
    }

    /// Total number of overloads.
    pub fn len(&self) -> usize {
        self.methods
            .values()
            .flat_map(|bucket| bucket.values())
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Report entries shadowed by an earlier entry with the same signature.
    pub fn lint(&self) -> Vec<Overlap> {
        let mut found = Vec::new();
        for (receiver, bucket) in &self.methods {
            for (name, overloads) in bucket {
                for (i, a) in overloads.iter().enumerate() {
                    for (j, b) in overloads.iter().enumerate().skip(i + 1) {
                        if a.argument_types == b.argument_types {
                            found.push(Overlap {
                                receiver: *receiver,
                                name: name.clone(),
                                first: i,
                                second: j,
                                signature: a.argument_types.clone(),
                            });
                        }
                    }
                }
            }
        }
        found.sort_by(|a, b| a.name.cmp(&b.name).then(a.first.cmp(&b.first)));
        found
    }
}

// === Builtin table ===

use VariableType as T;

const N: T = T::Number;
const B: T = T::Boolean;

struct VectorInfo {
    ty: T,
    arity: usize,
    gpu_ctor: &'static str,
    cpu_ctor: &'static str,
}

const VECTORS: [VectorInfo; 3] = [
    VectorInfo {
        ty: T::Vec2,
        arity: 2,
        gpu_ctor: "vec2<f32>",
        cpu_ctor: "vec2",
    },
    VectorInfo {
        ty: T::Vec3,
        arity: 3,
        gpu_ctor: "vec3<f32>",
        cpu_ctor: "vec3",
    },
    VectorInfo {
        ty: T::Vec4,
        arity: 4,
        gpu_ctor: "vec4<f32>",
        cpu_ctor: "vec4",
    },
];

/// Arithmetic operators and the vector library method implementing each.
const ARITHMETIC: [(&str, &str); 5] = [
    ("+", "add"),
    ("-", "sub"),
    ("*", "mul"),
    ("/", "div"),
    ("%", "mod"),
];

/// `Math` functions of one number: (name, WGSL builtin, JavaScript).
const MATH_UNARY: [(&str, &str, &str); 20] = [
    ("sin", "sin", "Math.sin"),
    ("cos", "cos", "Math.cos"),
    ("tan", "tan", "Math.tan"),
    ("asin", "asin", "Math.asin"),
    ("acos", "acos", "Math.acos"),
    ("atan", "atan", "Math.atan"),
    ("sinh", "sinh", "Math.sinh"),
    ("cosh", "cosh", "Math.cosh"),
    ("tanh", "tanh", "Math.tanh"),
    ("asinh", "asinh", "Math.asinh"),
    ("acosh", "acosh", "Math.acosh"),
    ("atanh", "atanh", "Math.atanh"),
    ("exp", "exp", "Math.exp"),
    ("log", "log", "Math.log"),
    ("log2", "log2", "Math.log2"),
    ("sqrt", "sqrt", "Math.sqrt"),
    ("abs", "abs", "Math.abs"),
    ("floor", "floor", "Math.floor"),
    ("ceil", "ceil", "Math.ceil"),
    ("trunc", "trunc", "Math.trunc"),
];

const MATH_BINARY: [(&str, &str, &str); 4] = [
    ("pow", "pow", "Math.pow"),
    ("atan2", "atan2", "Math.atan2"),
    ("min", "min", "Math.min"),
    ("max", "max", "Math.max"),
];

const MATH_CONSTANTS: [(&str, &str, &str); 8] = [
    ("PI", "3.141592653589793", "Math.PI"),
    ("E", "2.718281828459045", "Math.E"),
    ("LN2", "0.6931471805599453", "Math.LN2"),
    ("LN10", "2.302585092994046", "Math.LN10"),
    ("LOG2E", "1.4426950408889634", "Math.LOG2E"),
    ("LOG10E", "0.4342944819032518", "Math.LOG10E"),
    ("SQRT2", "1.4142135623730951", "Math.SQRT2"),
    ("SQRT1_2", "0.7071067811865476", "Math.SQRT1_2"),
];

/// Component-wise vector methods taking no argument.
const VECTOR_UNARY: [&str; 10] = [
    "abs", "floor", "ceil", "fract", "sign", "sqrt", "sin", "cos", "exp", "log",
];

fn build_builtin() -> FunctionTable {
    let mut table = FunctionTable::new();
    add_operators(&mut table);
    add_constructors(&mut table);
    add_array_helpers(&mut table);
    add_math(&mut table);
    add_vector_methods(&mut table);
    add_canvas(&mut table);
    table
}

fn add_operators(table: &mut FunctionTable) {
    let s = Receiver::Standalone;

    for (op, method) in ARITHMETIC {
        table.add(s, op, Overload::shared(N, &[N, N], Template::Infix(op)));
        for v in &VECTORS {
            table.add(
                s,
                op,
                Overload::new(v.ty, &[v.ty, v.ty], Template::Infix(op), Template::Method(method)),
            );
            table.add(
                s,
                op,
                Overload::new(v.ty, &[v.ty, N], Template::Infix(op), Template::Method(method)),
            );
            table.add(
                s,
                op,
                Overload::new(
                    v.ty,
                    &[N, v.ty],
                    Template::Infix(op),
                    Template::SplatLeft {
                        ctor: v.cpu_ctor,
                        method,
                    },
                ),
            );
        }
    }

    for op in ["<", "<=", ">", ">="] {
        table.add(s, op, Overload::shared(B, &[N, N], Template::Infix(op)));
    }

    for (ops, gpu, cpu) in [(["==", "==="], "==", "==="), (["!=", "!=="], "!=", "!==")] {
        for op in ops {
            for ty in [N, B] {
                table.add(
                    s,
                    op,
                    Overload::new(B, &[ty, ty], Template::Infix(gpu), Template::Infix(cpu)),
                );
            }
        }
    }

    for op in ["&&", "||"] {
        table.add(s, op, Overload::shared(B, &[B, B], Template::Infix(op)));
    }

    table.add(s, "-u", Overload::shared(N, &[N], Template::Prefix("-")));
    for v in &VECTORS {
        table.add(
            s,
            "-u",
            Overload::new(v.ty, &[v.ty], Template::Prefix("-"), Template::Method("neg")),
        );
    }
    table.add(s, "+u", Overload::shared(N, &[N], Template::Custom(identity)));
    table.add(s, "!u", Overload::shared(B, &[B], Template::Prefix("!")));
}

/// Ordered ways to fill `n` components with parts of size 1..=4.
fn compositions(n: usize) -> Vec<Vec<usize>> {
    if n == 0 {
        return vec![Vec::new()];
    }
    let mut out = Vec::new();
    for first in 1..=n.min(4) {
        for mut rest in compositions(n - first) {
            rest.insert(0, first);
            out.push(rest);
        }
    }
    out
}

fn part_type(size: usize) -> T {
    match size {
        1 => N,
        2 => T::Vec2,
        3 => T::Vec3,
        _ => T::Vec4,
    }
}

fn add_constructors(table: &mut FunctionTable) {
    let s = Receiver::Standalone;
    for v in &VECTORS {
        let name = v.cpu_ctor;
        // Splat first so `vec3(1)` does not need a composition.
        table.add(
            s,
            name,
            Overload::new(v.ty, &[N], Template::Call(v.gpu_ctor), Template::Call(v.cpu_ctor)),
        );
        for parts in compositions(v.arity) {
            if parts == [1] {
                continue;
            }
            let args: Vec<T> = parts.iter().map(|p| part_type(*p)).collect();
            table.add(
                s,
                name,
                Overload::new(v.ty, &args, Template::Call(v.gpu_ctor), Template::Call(v.cpu_ctor)),
            );
        }
    }
}

fn add_array_helpers(table: &mut FunctionTable) {
    let s = Receiver::Standalone;

    for element in ElementType::ALL {
        table.add(
            s,
            "array",
            Overload::new(
                T::Array(element),
                &[N, element.value_type()],
                Template::ArrayFill(element.to_wgsl()),
                Template::Custom(array_fill_js),
            )
            .sized(),
        );
    }

    for element in ElementType::ALL {
        for array in [T::Array(element), T::ArrayLiteral(element)] {
            table.add(
                s,
                "dim",
                Overload::new(
                    N,
                    &[array],
                    Template::Custom(size_wgsl),
                    Template::Property("length"),
                )
                .sized(),
            );
            table.add_property(
                Receiver::Of(array),
                "length",
                Overload::new(
                    N,
                    &[],
                    Template::Custom(size_wgsl),
                    Template::Property("length"),
                )
                .sized(),
            );
        }
    }

    for element in ElementType::NUMERIC {
        for rank in 1..=3u8 {
            table.add(
                s,
                "dim",
                Overload::new(
                    part_type(rank as usize),
                    &[T::Buffer { rank, element }],
                    Template::Custom(size_wgsl),
                    Template::Custom(size_js),
                )
                .sized(),
            );
        }
    }
}

fn add_math(table: &mut FunctionTable) {
    let m = Receiver::Of(T::Math);

    for (name, gpu, cpu) in MATH_UNARY {
        table.add(m, name, Overload::new(N, &[N], Template::Call(gpu), Template::Call(cpu)));
    }
    table.add(
        m,
        "round",
        Overload::new(N, &[N], Template::Custom(round_wgsl), Template::Call("Math.round")),
    );
    table.add(
        m,
        "log10",
        Overload::new(N, &[N], Template::Custom(log10_wgsl), Template::Call("Math.log10")),
    );
    table.add(
        m,
        "cbrt",
        Overload::new(N, &[N], Template::Custom(cbrt_wgsl), Template::Call("Math.cbrt")),
    );
    table.add(
        m,
        "sign",
        Overload::new(N, &[N], Template::Call("sign"), Template::Call("Math.sign")),
    );

    for (name, gpu, cpu) in MATH_BINARY {
        table.add(
            m,
            name,
            Overload::new(N, &[N, N], Template::Call(gpu), Template::Call(cpu)),
        );
    }
    table.add(
        m,
        "hypot",
        Overload::new(N, &[N, N], Template::Custom(hypot_wgsl), Template::Call("Math.hypot")),
    );

    table.add(
        m,
        "random",
        Overload::new(
            N,
            &[],
            Template::Text("random(global_id)"),
            Template::Text("Math.random()"),
        ),
    );

    for (name, gpu, cpu) in MATH_CONSTANTS {
        table.add_property(m, name, Overload::new(N, &[], Template::Text(gpu), Template::Text(cpu)));
    }
}

fn add_vector_methods(table: &mut FunctionTable) {
    for v in &VECTORS {
        let r = Receiver::Of(v.ty);

        for (op, method) in ARITHMETIC {
            for arg in [v.ty, N] {
                table.add(
                    r,
                    method,
                    Overload::new(v.ty, &[arg], Template::Infix(op), Template::Method(method)),
                );
            }
        }

        for (name, ret, args) in [
            ("dot", N, vec![v.ty]),
            ("distance", N, vec![v.ty]),
            ("length", N, vec![]),
            ("normalize", v.ty, vec![]),
            ("min", v.ty, vec![v.ty]),
            ("max", v.ty, vec![v.ty]),
            ("clamp", v.ty, vec![v.ty, v.ty]),
            ("mix", v.ty, vec![v.ty, N]),
        ] {
            table.add(
                r,
                name,
                Overload::new(ret, &args, Template::Apply(name), Template::Method(name)),
            );
        }

        for name in VECTOR_UNARY {
            table.add(
                r,
                name,
                Overload::new(v.ty, &[], Template::Apply(name), Template::Method(name)),
            );
        }

        table.add(
            r,
            "neg",
            Overload::new(v.ty, &[], Template::Prefix("-"), Template::Method("neg")),
        );
        table.add(
            r,
            "equals",
            Overload::new(B, &[v.ty], Template::Custom(all_equal_wgsl), Template::Method("equals")),
        );
    }

    table.add(
        Receiver::Of(T::Vec3),
        "cross",
        Overload::new(
            T::Vec3,
            &[T::Vec3],
            Template::Apply("cross"),
            Template::Method("cross"),
        ),
    );
}

fn add_canvas(table: &mut FunctionTable) {
    let c = Receiver::Of(T::Canvas);
    table.add(
        c,
        "setPixel",
        Overload::new(
            T::Void,
            &[T::Vec2, T::Vec4],
            Template::Call("set_pixel"),
            Template::Call("__setPixel"),
        ),
    );
    table.add(
        c,
        "setPixel",
        Overload::new(
            T::Void,
            &[T::Vec2, T::Vec3],
            Template::Custom(set_pixel_rgb_wgsl),
            Template::Custom(set_pixel_rgb_js),
        ),
    );
    table.add(
        c,
        "setPixel",
        Overload::new(
            T::Void,
            &[N, N, T::Vec4],
            Template::Custom(set_pixel_xy_wgsl),
            Template::Custom(set_pixel_xy_js),
        ),
    );
    table.add(
        c,
        "setPixel",
        Overload::new(
            T::Void,
            &[N, N, T::Vec3],
            Template::Custom(set_pixel_xy_rgb_wgsl),
            Template::Custom(set_pixel_xy_rgb_js),
        ),
    );
    table.add_property(
        c,
        "size",
        Overload::new(
            T::Vec2,
            &[],
            Template::Text("CANVAS_SIZE"),
            Template::Text("__canvasSize"),
        ),
    );
}

// === Custom templates ===

fn identity(input: &TemplateInput<'_>) -> String {
    input.operand(0).to_string()
}

fn array_fill_js(input: &TemplateInput<'_>) -> String {
    format!(
        "new Array({}).fill({})",
        input.first_size(),
        input.operand(1)
    )
}

fn sized_value(size: &[usize], format: fn(f64) -> String, ctor: [&str; 3]) -> String {
    let parts: Vec<String> = size.iter().map(|d| format(*d as f64)).collect();
    match parts.len() {
        0 => format(0.0),
        1 => parts[0].clone(),
        n => format!("{}({})", ctor[n.min(4) - 2], parts.join(", ")),
    }
}

fn size_wgsl(input: &TemplateInput<'_>) -> String {
    sized_value(input.size, wgsl_float, ["vec2<f32>", "vec3<f32>", "vec4<f32>"])
}

fn size_js(input: &TemplateInput<'_>) -> String {
    sized_value(input.size, js_number, ["vec2", "vec3", "vec4"])
}

fn round_wgsl(input: &TemplateInput<'_>) -> String {
    format!("floor({} + 0.5)", input.args[0])
}

fn log10_wgsl(input: &TemplateInput<'_>) -> String {
    format!("(log({}) * 0.4342944819032518)", input.args[0])
}

fn cbrt_wgsl(input: &TemplateInput<'_>) -> String {
    let x = &input.args[0];
    format!("(sign({x}) * pow(abs({x}), 0.3333333333333333))")
}

fn hypot_wgsl(input: &TemplateInput<'_>) -> String {
    format!("length(vec2<f32>({}, {}))", input.args[0], input.args[1])
}

fn all_equal_wgsl(input: &TemplateInput<'_>) -> String {
    format!("all({} == {})", input.operand(0), input.operand(1))
}

fn set_pixel_rgb_wgsl(input: &TemplateInput<'_>) -> String {
    format!("set_pixel({}, vec4<f32>({}, 1.0))", input.args[0], input.args[1])
}

fn set_pixel_rgb_js(input: &TemplateInput<'_>) -> String {
    format!("__setPixel({}, vec4({}, 1))", input.args[0], input.args[1])
}

fn set_pixel_xy_wgsl(input: &TemplateInput<'_>) -> String {
    format!(
        "set_pixel(vec2<f32>({}, {}), {})",
        input.args[0], input.args[1], input.args[2]
    )
}

fn set_pixel_xy_js(input: &TemplateInput<'_>) -> String {
    format!(
        "__setPixel(vec2({}, {}), {})",
        input.args[0], input.args[1], input.args[2]
    )
}

fn set_pixel_xy_rgb_wgsl(input: &TemplateInput<'_>) -> String {
    format!(
        "set_pixel(vec2<f32>({}, {}), vec4<f32>({}, 1.0))",
        input.args[0], input.args[1], input.args[2]
    )
}

fn set_pixel_xy_rgb_js(input: &TemplateInput<'_>) -> String {
    format!(
        "__setPixel(vec2({}, {}), vec4({}, 1))",
        input.args[0], input.args[1], input.args[2]
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_builtin_has_no_overlaps() {
        let table = FunctionTable::builtin();
        assert!(table.lint().is_empty(), "{:?}", table.lint());
        assert!(!table.is_empty());
    }

    #[test]
    fn test_first_match_wins() {
        let mut table = FunctionTable::new();
        let s = Receiver::Standalone;
        table.add(s, "f", Overload::shared(N, &[N], Template::Call("first")));
        table.add(s, "f", Overload::shared(N, &[N], Template::Call("second")));
        table.add(s, "f", Overload::shared(N, &[B], Template::Call("third")));

        for _ in 0..10 {
            let chosen = table.resolve(s, "f", &[N]).unwrap();
            assert_eq!(chosen.gpu, Template::Call("first"));
        }
        assert_eq!(
            table.resolve(s, "f", &[B]).unwrap().gpu,
            Template::Call("third")
        );
        assert!(table.resolve(s, "f", &[N, N]).is_none());

        let overlaps = table.lint();
        assert_eq!(overlaps.len(), 1);
        assert_eq!((overlaps[0].first, overlaps[0].second), (0, 1));
        assert!(overlaps[0].to_string().contains("unreachable"));
    }

    #[test]
    fn test_vector_operator_templates() {
        let table = FunctionTable::builtin();
        let add = table
            .resolve(Receiver::Standalone, "+", &[T::Vec3, T::Vec3])
            .unwrap();
        let a = args(&["a", "b"]);
        let input = TemplateInput::new(None, &a, &[]);
        assert_eq!(add.gpu.render(&input), "(a + b)");
        assert_eq!(add.cpu.render(&input), "a.add(b)");

        let scalar_left = table
            .resolve(Receiver::Standalone, "-", &[N, T::Vec2])
            .unwrap();
        assert_eq!(scalar_left.cpu.render(&input), "vec2(a).sub(b)");

        let eq = table.resolve(Receiver::Standalone, "===", &[N, N]).unwrap();
        assert_eq!(eq.gpu.render(&input), "(a == b)");
        assert_eq!(eq.cpu.render(&input), "(a === b)");
    }

    #[test]
    fn test_constructor_compositions() {
        let table = FunctionTable::builtin();
        let s = Receiver::Standalone;
        assert!(table.resolve(s, "vec4", &[T::Vec2, T::Vec2]).is_some());
        assert!(table.resolve(s, "vec4", &[N, T::Vec2, N]).is_some());
        assert!(table.resolve(s, "vec4", &[T::Vec3, N]).is_some());
        assert!(table.resolve(s, "vec3", &[N]).is_some());
        assert!(table.resolve(s, "vec3", &[T::Vec3]).is_some());
        assert!(table.resolve(s, "vec3", &[T::Vec2, T::Vec2]).is_none());
        assert_eq!(compositions(4).len(), 8);

        let ctor = table.resolve(s, "vec3", &[T::Vec2, N]).unwrap();
        let a = args(&["v", "1.0"]);
        let input = TemplateInput::new(None, &a, &[]);
        assert_eq!(ctor.gpu.render(&input), "vec3<f32>(v, 1.0)");
        assert_eq!(ctor.cpu.render(&input), "vec3(v, 1.0)");
    }

    #[test]
    fn test_math_receiver_is_not_emitted() {
        let table = FunctionTable::builtin();
        let m = Receiver::Of(T::Math);
        let sin = table.resolve(m, "sin", &[N]).unwrap();
        let a = args(&["x"]);
        let input = TemplateInput::new(Some("Math"), &a, &[]);
        assert_eq!(sin.gpu.render(&input), "sin(x)");
        assert_eq!(sin.cpu.render(&input), "Math.sin(x)");

        let round = table.resolve(m, "round", &[N]).unwrap();
        assert_eq!(round.gpu.render(&input), "floor(x + 0.5)");

        let pi = table.property(m, "PI").unwrap();
        assert_eq!(pi.cpu.render(&input), "Math.PI");
    }

    #[test]
    fn test_sized_templates() {
        let table = FunctionTable::builtin();
        let s = Receiver::Standalone;
        let fill = table.resolve(s, "array", &[N, N]).unwrap();
        assert!(fill.uses_size);
        let a = args(&["3.0", "0.0"]);
        let input = TemplateInput::new(None, &a, &[3]);
        assert_eq!(fill.gpu.render(&input), "array<f32, 3>(0.0, 0.0, 0.0)");

        let dim = table
            .resolve(
                s,
                "dim",
                &[T::Buffer {
                    rank: 2,
                    element: ElementType::Number,
                }],
            )
            .unwrap();
        assert_eq!(dim.return_type, T::Vec2);
        let a = args(&["view"]);
        let input = TemplateInput::new(None, &a, &[5, 6]);
        assert_eq!(dim.gpu.render(&input), "vec2<f32>(5.0, 6.0)");
        assert_eq!(dim.cpu.render(&input), "vec2(5, 6)");
    }

    #[test]
    fn test_declared_template_passes_thread_id() {
        let template = Template::Declared {
            name: "shade".to_string(),
            thread_id: "global_id",
        };
        let a = args(&["a", "b"]);
        assert_eq!(
            template.render(&TemplateInput::new(None, &a, &[])),
            "shade(global_id, a, b)"
        );
    }
}
