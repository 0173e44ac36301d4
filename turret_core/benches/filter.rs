use criterion::{Criterion, black_box, criterion_group, criterion_main};

use turret_core::filter::{FilterCfg, TrackFilter};
use turret_traits::{BoundingBox, Detection};

// Small deterministic PRNG so runs are comparable
struct XorShift(u64);

impl XorShift {
    fn next_f32(&mut self, range: f32) -> f32 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        (self.0 % 10_000) as f32 / 10_000.0 * range
    }
}

fn batch(rng: &mut XorShift, categories: u32) -> Vec<Detection> {
    (0..categories)
        .map(|category| Detection {
            category,
            confidence: rng.next_f32(1.0),
            bbox: BoundingBox::new(
                rng.next_f32(640.0),
                rng.next_f32(360.0),
                20.0 + rng.next_f32(60.0),
                20.0 + rng.next_f32(60.0),
            ),
        })
        .collect()
}

fn bench_filter_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("track_filter");

    for categories in [1u32, 4, 16] {
        group.bench_function(format!("update_{categories}_tracks"), |b| {
            let mut rng = XorShift(0x9E37_79B9_7F4A_7C15);
            let mut filter = TrackFilter::new(FilterCfg::default());
            b.iter(|| {
                let dets = batch(&mut rng, categories);
                filter.update(black_box(&dets));
                black_box(filter.best());
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_filter_update);
criterion_main!(benches);
