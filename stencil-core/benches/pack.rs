use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use stencil_core::{pack, unpack, CompileOptions, PackProgram, UnpackProgram, Value};

fn bench_pack(c: &mut Criterion) {
    let mut group = c.benchmark_group("pack");

    for count in [16, 256, 4096] {
        let values: Vec<Value> = (0..count).map(|i| Value::from(i as u32)).collect();
        let program = PackProgram::compile("N*").unwrap();

        group.throughput(Throughput::Bytes(count as u64 * 4));
        group.bench_with_input(BenchmarkId::from_parameter(count), &values, |b, values| {
            b.iter(|| program.execute(black_box(values)).unwrap());
        });
    }

    group.finish();
}

fn bench_unpack(c: &mut Criterion) {
    let mut group = c.benchmark_group("unpack");

    for count in [16, 256, 4096] {
        let values: Vec<Value> = (0..count).map(|i| Value::from(i as u32)).collect();
        let bytes = pack("N*", &values).unwrap().bytes;
        let program = UnpackProgram::compile("N*").unwrap();

        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &bytes, |b, data| {
            b.iter(|| program.execute(black_box(data)).unwrap());
        });
    }

    group.finish();
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");
    let unrolled = "C1".repeat(5000);

    group.bench_function("loop_recovery", |b| {
        b.iter(|| PackProgram::compile(black_box(&unrolled)).unwrap());
    });

    let naive = CompileOptions::without_loop_recovery();
    group.bench_function("naive", |b| {
        b.iter(|| PackProgram::compile_with(black_box(&unrolled), &naive).unwrap());
    });

    group.bench_function("cached_record", |b| {
        let values = [Value::from(1), Value::from("name"), Value::from(2.5)];
        b.iter(|| pack(black_box("n Z* G"), &values).unwrap());
    });

    group.finish();
}

fn bench_codecs(c: &mut Criterion) {
    let mut group = c.benchmark_group("codecs");
    let text = Value::from(vec![0x5au8; 16384]);

    for template in ["m", "m0", "u", "M", "H*"] {
        let arg = match template {
            "H*" => Value::from("0123456789abcdef".repeat(1024)),
            _ => text.clone(),
        };
        let encoded = pack(template, std::slice::from_ref(&arg)).unwrap().bytes;

        group.throughput(Throughput::Bytes(16384));
        group.bench_with_input(BenchmarkId::new("pack", template), &arg, |b, arg| {
            b.iter(|| pack(template, std::slice::from_ref(black_box(arg))).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("unpack", template), &encoded, |b, data| {
            b.iter(|| unpack(template, black_box(data)).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_pack, bench_unpack, bench_compile, bench_codecs);
criterion_main!(benches);
