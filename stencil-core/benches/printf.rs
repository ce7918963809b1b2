use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use stencil_core::{sprintf, Encoding, PrintfProgram, Value};

fn bench_sprintf(c: &mut Criterion) {
    let mut group = c.benchmark_group("sprintf");

    let cases: [(&str, Vec<Value>); 4] = [
        ("int", vec![Value::from(42)]),
        ("float", vec![Value::from(3.14159)]),
        ("string", vec![Value::from("stencil")]),
        ("mixed", vec![Value::from("row"), Value::from(-7), Value::from(0.5)]),
    ];
    let templates = ["%05d", "%.3e", "%-12s|", "%-8s %+6d %8.3f"];

    for ((name, args), template) in cases.iter().zip(templates) {
        let program = PrintfProgram::compile(template.as_bytes(), Encoding::Utf8).unwrap();
        group.bench_with_input(BenchmarkId::new("execute", name), args, |b, args| {
            b.iter(|| program.execute(black_box(args)).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("cached", name), args, |b, args| {
            b.iter(|| sprintf(template, black_box(args)).unwrap());
        });
    }

    group.finish();
}

fn bench_bignum(c: &mut Criterion) {
    let big = Value::from(i128::MAX);
    c.bench_function("sprintf_bignum_hex", |b| {
        b.iter(|| sprintf("%x %b", &[black_box(big.clone()), Value::from(-255)]).unwrap());
    });
}

criterion_group!(benches, bench_sprintf, bench_bignum);
criterion_main!(benches);
