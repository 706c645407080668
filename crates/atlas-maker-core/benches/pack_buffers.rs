use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use atlas_maker_core::prelude::*;
use image::{Rgba, RgbaImage};
use rand::{Rng, SeedableRng};

fn generate_buffers(count: usize, min_size: u32, max_size: u32) -> Vec<RgbaImage> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(count as u64);
    (0..count)
        .map(|i| {
            let w = rng.gen_range(min_size..=max_size);
            let h = rng.gen_range(min_size..=max_size);
            RgbaImage::from_pixel(w, h, Rgba([i as u8, 0, 0, 255]))
        })
        .collect()
}

fn bench_pack_buffers(c: &mut Criterion) {
    let mut group = c.benchmark_group("pack_buffers");

    for count in [50usize, 100, 200] {
        let buffers = generate_buffers(count, 16, 64);
        group.throughput(Throughput::Elements(count as u64));

        for (label, heuristic) in [
            ("BAF", MaxRectsHeuristic::BestAreaFit),
            ("BSSF", MaxRectsHeuristic::BestShortSideFit),
            ("CP", MaxRectsHeuristic::ContactPoint),
        ] {
            group.bench_with_input(BenchmarkId::new(label, count), &buffers, |b, buffers| {
                b.iter(|| black_box(pack_buffers(buffers, 2, 2048, heuristic)).is_ok());
            });
        }
    }

    group.finish();
}

fn bench_square(c: &mut Criterion) {
    let raster = RgbaImage::new(1024, 256);
    c.bench_function("square_canvas_1024x256", |b| {
        b.iter(|| black_box(square_canvas(&raster)))
    });
}

criterion_group!(benches, bench_pack_buffers, bench_square);
criterion_main!(benches);
