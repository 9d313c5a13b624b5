use std::hint::black_box;

use bevy_symbios_torus::{
    DefaultNoise, DeformParams, DisplacementMode, InstanceSet, TorusShape, WorkingBuffer,
    deform_into,
};
use criterion::{Criterion, criterion_group, criterion_main};

const TEAL: [f32; 3] = [0.0, 0.2159, 0.2159];
const AQUA: [f32; 3] = [0.0, 1.0, 1.0];

fn params() -> DeformParams {
    DeformParams::new(0.25, TEAL, AQUA, DisplacementMode::Radial).unwrap()
}

fn bench_deform(c: &mut Criterion) {
    let noise = DefaultNoise::new(42);
    let reference = TorusShape::default().build(TEAL).unwrap();
    let mut out = WorkingBuffer::from_reference(&reference);
    let params = params();
    let mut time = 0.0;
    c.bench_function("deform_40x150", |b| {
        b.iter(|| {
            time += 0.015;
            deform_into(&noise, &reference, black_box(time), 0.0, &params, &mut out).unwrap();
        })
    });
}

fn bench_advance(c: &mut Criterion) {
    let mut set = InstanceSet::new(
        Box::new(DefaultNoise::new(42)),
        &TorusShape::default(),
        3,
        params(),
    )
    .unwrap();
    c.bench_function("advance_3x40x150", |b| b.iter(|| set.advance(black_box(0.015))));
}

criterion_group!(benches, bench_deform, bench_advance);
criterion_main!(benches);
