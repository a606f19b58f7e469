//! # Coordinate Transform Benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use dash_lib::{
    coord_tf::{self, Frame},
    grid_model::{CalibrationPoint, GridModel},
};
use nalgebra::Point2;

fn coord_tf_benchmark(c: &mut Criterion) {
    // ---- Build a calibrated grid ----

    // 41 x 31 cells spread over a 2000 x 1500 px image
    let mut points = vec![];
    for row in 0..=30 {
        for col in 0..=40 {
            points.push(CalibrationPoint {
                row,
                col,
                x: 100.0 + 45.0 * col as f64,
                y: 75.0 + 45.0 * row as f64,
            });
        }
    }

    let mut grid = GridModel::new();
    grid.load_calibration(points).unwrap();
    let bounds = grid.bounds().unwrap();

    let frame = Frame::new((1000.0, 750.0), (2000.0, 1500.0));
    let vp = Point2::new(512.3, 301.7);

    c.bench_function("coord_tf::pixel_to_grid", |b| {
        b.iter(|| coord_tf::pixel_to_grid(black_box(&vp), &frame, &bounds).unwrap())
    });

    c.bench_function("coord_tf::grid_to_pixel", |b| {
        b.iter(|| {
            coord_tf::grid_to_pixel(black_box(17.0), black_box(12.0), &frame, &bounds).unwrap()
        })
    });

    let img = coord_tf::viewport_to_image(&vp, &frame).unwrap();

    c.bench_function("GridModel::nearest_calibration_point", |b| {
        b.iter(|| grid.nearest_calibration_point(black_box(&img)).unwrap())
    });
}

criterion_group!(benches, coord_tf_benchmark);
criterion_main!(benches);
