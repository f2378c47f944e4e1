//! Benchmarks for procedural building generation.
//!
//! `sample` is the pure candidate draw + polygon validation; `generate`
//! adds anchor creation through the simulated session.
//!
//! Run with: cargo bench -p placement --bench generation_bench

use bevy::prelude::*;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use placement::buildings::BuildingGenerator;
use placement::placement_params::PlacementParams;
use placement::placement_rng::PlacementRng;
use placement::simulated_session::SimulatedSession;
use placement::surface::{SurfaceId, TrackedSurface};
use placement::tracking::TrackingSession;

/// Irregular polygon with `sides` vertices inscribed in the unit extent.
fn irregular_surface(sides: usize) -> TrackedSurface {
    let polygon = (0..sides)
        .map(|i| {
            let a = i as f32 / sides as f32 * std::f32::consts::TAU;
            let r = if i % 2 == 0 { 0.5 } else { 0.35 };
            Vec2::new(a.cos() * r, a.sin() * r)
        })
        .collect();
    TrackedSurface::rectangle(SurfaceId(1), Vec3::ZERO, Vec2::ONE).with_polygon(polygon)
}

fn bench_sample(c: &mut Criterion) {
    let mut group = c.benchmark_group("building_sample");
    for per_surface in [10usize, 100] {
        let generator = BuildingGenerator {
            per_surface,
            ..Default::default()
        };
        let surface = irregular_surface(16);
        let mut rng = PlacementRng::default();
        group.bench_with_input(
            BenchmarkId::from_parameter(per_surface),
            &surface,
            |b, surface| b.iter(|| generator.sample(black_box(surface), &mut rng.0)),
        );
    }
    group.finish();
}

fn bench_generate_anchored(c: &mut Criterion) {
    let generator = BuildingGenerator::from_params(&PlacementParams::default());
    let surface = irregular_surface(16);
    let (mut session, handle) = SimulatedSession::new();
    handle.add_surface(surface.clone());
    let mut rng = PlacementRng::default();

    c.bench_function("building_generate_anchored", |b| {
        b.iter(|| {
            let batch = generator
                .generate(black_box(&surface), &mut rng.0, &mut session)
                .unwrap_or_default();
            for building in &batch {
                if let placement::buildings::Attachment::Anchor(anchor) = building.attachment {
                    session.detach_anchor(anchor);
                }
            }
            batch.len()
        })
    });
}

criterion_group!(benches, bench_sample, bench_generate_anchored);
criterion_main!(benches);
