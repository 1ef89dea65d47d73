// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the scanwerk-document crate. The live loop has a
// ~16 ms budget per tick, so frame analysis at the default working width is
// the number to watch.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;

use scanwerk_document::{DocumentDetector, ToneEnhancer, WorkingFrame};

/// A 1280x960 "camera frame": a slightly rotated light page on a dark desk.
fn synthetic_frame() -> DynamicImage {
    let mut img = RgbImage::from_pixel(1280, 960, Rgb([40, 38, 36]));
    let page = [
        Point::new(240, 130),
        Point::new(1010, 180),
        Point::new(980, 860),
        Point::new(200, 800),
    ];
    draw_polygon_mut(&mut img, &page, Rgb([232, 230, 224]));
    DynamicImage::ImageRgb8(img)
}

/// Downscale + analyse, as done once per detection tick.
fn bench_live_tick(c: &mut Criterion) {
    let frame = synthetic_frame();
    let detector = DocumentDetector::default();

    c.bench_function("live_tick (1280x960 -> 640)", |b| {
        b.iter(|| {
            let working = WorkingFrame::prepare(black_box(&frame), 640);
            black_box(working.to_source(detector.analyze(working.image())));
        });
    });
}

/// Tone curve over a full-resolution frame.
fn bench_enhance(c: &mut Criterion) {
    let frame = synthetic_frame();
    let enhancer = ToneEnhancer::default();

    c.bench_function("enhance (1280x960)", |b| {
        b.iter(|| black_box(enhancer.enhance(black_box(&frame))));
    });
}

criterion_group!(benches, bench_live_tick, bench_enhance);
criterion_main!(benches);
