use criterion::{black_box, criterion_group, criterion_main, Criterion};
use srnx::codec::transpose::{transpose, transpose_pack};

fn sample_matrix(count: usize, bits: usize) -> Vec<u8> {
    let values: Vec<i64> = (0..count as i64)
        .map(|i| (i * 7 - count as i64 / 2) % (1 << (bits - 1)))
        .collect();
    let mut out = Vec::new();
    transpose_pack(&values, bits, count, &mut out).unwrap();
    out
}

fn transpose_benchmark(c: &mut Criterion) {
    for &count in &[8usize, 16, 32] {
        for &bits in &[4usize, 16, 32] {
            let matrix = sample_matrix(count, bits);
            c.bench_function(&format!("transpose/count={count}/bits={bits}"), |b| {
                b.iter(|| transpose(black_box(&matrix), bits, count).unwrap())
            });
        }
    }
}

criterion_group!(benches, transpose_benchmark);
criterion_main!(benches);
