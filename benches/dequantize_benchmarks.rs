use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use vextra::block::BLOCK_BYTES;
use vextra::kernels::scalar::dequantize_scalar;
use vextra::{Kernel, dequantize, kernels};

fn tensor_of(nb: usize) -> (Vec<u8>, usize) {
    let k = nb * 256;
    let mut src = vec![0u8; nb * BLOCK_BYTES];
    for b in 0..nb {
        let block = &mut src[b * BLOCK_BYTES..(b + 1) * BLOCK_BYTES];
        block[0..4].copy_from_slice(&1.5f32.to_le_bytes());
        block[4..8].copy_from_slice(&(-0.25f32).to_le_bytes());
        for (i, byte) in block[8..72].iter_mut().enumerate() {
            *byte = ((b * 31 + i * 7) % 256) as u8;
        }
    }
    (src, k)
}

fn bench_scalar_kernel(c: &mut Criterion) {
    let mut group = c.benchmark_group("dequantize_scalar");
    for nb in [1usize, 16, 256, 4096] {
        let (src, k) = tensor_of(nb);
        let mut dst = vec![0f32; k];
        group.bench_with_input(BenchmarkId::from_parameter(nb), &nb, |b, _| {
            b.iter(|| dequantize_scalar(black_box(&src), black_box(&mut dst), k).unwrap())
        });
    }
    group.finish();
}

fn bench_dispatched_kernel(c: &mut Criterion) {
    let selected = kernels::select();
    let label = match selected {
        Kernel::Scalar => "dequantize_dispatched_scalar",
        Kernel::Avx2 => "dequantize_dispatched_avx2",
        Kernel::Avx512 => "dequantize_dispatched_avx512",
    };

    let mut group = c.benchmark_group(label);
    for nb in [1usize, 16, 256, 4096] {
        let (src, k) = tensor_of(nb);
        let mut dst = vec![0f32; k];
        group.bench_with_input(BenchmarkId::from_parameter(nb), &nb, |b, _| {
            b.iter(|| dequantize(black_box(&src), black_box(&mut dst), k).unwrap())
        });
    }
    group.finish();
}

criterion_group!(kernel_benches, bench_scalar_kernel, bench_dispatched_kernel);
criterion_main!(kernel_benches);
