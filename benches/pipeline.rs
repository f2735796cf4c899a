extern crate rotascope;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use rotascope::{
    script::{find_target_script, JsScript},
    DeobfuscationEngine,
};
use std::{fmt::Write, hint::black_box};

/// Builds a synthetic obfuscated page with `entries` table strings and one
/// decoder call per entry, half of them through an alias with hex arithmetic.
fn synthetic_document(entries: usize) -> String {
    let table: Vec<String> = (0..entries).map(|i| format!("'entry{i}'")).collect();

    let mut script = String::new();
    let _ = write!(
        script,
        "function _0xa() {{ var d = [{}]; _0xa = function () {{ return d; }}; return _0xa(); }}\n\
         function _0xb(e, f) {{ var c = _0xa(); return _0xb = function (g, h) {{ g = g - 0x100; var i = c[g]; return i; }}, _0xb(e, f); }}\n\
         var _0xk = _0xb;\n",
        table.join(", ")
    );
    for i in 0..entries {
        let index = 0x100 + i;
        if i % 2 == 0 {
            let _ = writeln!(script, "out[_0xb({index:#x})] = {i};");
        } else {
            let _ = writeln!(script, "out[_0xk(0x80 + {:#x})]();", index - 0x80);
        }
    }

    format!("<html><body><script>{script}</script></body></html>")
}

/// Benchmark the full pipeline and the parse step alone on a 500-entry table.
fn bench_pipeline(c: &mut Criterion) {
    let document = synthetic_document(500);
    let engine = DeobfuscationEngine::default();

    let mut group = c.benchmark_group("pipeline");
    group.throughput(Throughput::Bytes(document.len() as u64));
    group.bench_function("process_document", |b| {
        b.iter(|| {
            let output = engine.process_document(black_box(&document)).unwrap();
            black_box(output)
        });
    });
    group.finish();

    let source = find_target_script(&document, "_0x").unwrap();
    let mut group = c.benchmark_group("parse");
    group.throughput(Throughput::Bytes(source.len() as u64));
    group.bench_function("parse", |b| {
        b.iter(|| {
            let script = JsScript::parse(black_box(source)).unwrap();
            black_box(script)
        });
    });
    group.finish();
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);
