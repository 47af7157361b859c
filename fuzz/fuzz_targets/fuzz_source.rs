//! Fuzz target for raw kernel source.
//!
//! Feeds arbitrary text to the parser and both backends.

#![no_main]

use jskernel_codegen::{transpile_cpu, transpile_gpu, ElementType, KernelLayout, TranspileOptions};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(source) = std::str::from_utf8(data) else {
        return;
    };
    if source.len() > 4096 {
        return;
    }

    let layout = KernelLayout::new()
        .with_buffer("out", ElementType::Number, &[8])
        .with_canvas(4, 4);

    let _ = transpile_gpu(source, &layout, &TranspileOptions::default());
    let _ = transpile_cpu(source, &layout);
});
