use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use shape_sketch::config::{CanvasSettings, DatasetSettings};
use shape_sketch::dataset::{DatasetSource, GeneratedShapes, ShapeKind};
use shape_sketch::sketch::{Canvas, GridSize, Point};

const CANVAS_SIDE: f32 = 224.0;

fn scribble(points: usize) -> Canvas {
    let mut canvas = Canvas::new(CANVAS_SIDE, CANVAS_SIDE);
    canvas.begin(Point::new(10.0, 10.0));
    for i in 1..points {
        let t = i as f32 / points as f32;
        let x = 10.0 + t * 200.0;
        let y = 112.0 + (t * 12.0).sin() * 90.0;
        canvas.extend(Point::new(x, y));
    }
    canvas.end();
    canvas
}

fn bench_rasterize(c: &mut Criterion) {
    let rasterizer = CanvasSettings::default().rasterizer();
    let canvas = scribble(400);
    for side in [28u32, 64] {
        let grid = GridSize::new(side, side);
        c.bench_with_input(BenchmarkId::new("rasterize", side), &grid, |b, grid| {
            b.iter(|| rasterizer.rasterize(black_box(&canvas), *grid));
        });
    }
}

fn bench_generate_dataset(c: &mut Criterion) {
    let settings = DatasetSettings {
        training_per_class: 25,
        validation_per_class: 5,
        ..DatasetSettings::default()
    };
    let source = GeneratedShapes::new(settings, &CanvasSettings::default());
    c.bench_function("generate_dataset", |b| {
        b.iter(|| source.build().expect("build dataset"));
    });
    c.bench_function("draw_circle", |b| {
        b.iter(|| source.draw(black_box(ShapeKind::Circle), 0.6, 0.8));
    });
}

criterion_group!(benches, bench_rasterize, bench_generate_dataset);
criterion_main!(benches);
