//! Export throughput benchmarks
//!
//! Measures a full export (probe, size, paint, encode) of a generated
//! diagram into an in-memory sink, per format and per diagram size.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use sdexport::{ExportConfig, ExportPipeline, ExportRequest, Item, Point, Rect, Scene, Style};
use std::hint::black_box;

/// A grid of boxes, each connected to its right neighbour. Raster formats
/// need a font face for labels, so those runs use an unlabelled grid.
fn grid_scene(boxes: usize, labels: bool) -> Scene {
    let columns = 10;
    let mut scene = Scene::default();
    for i in 0..boxes {
        let (col, row) = ((i % columns) as f32, (i / columns) as f32);
        let (x, y) = (10.0 + col * 120.0, 10.0 + row * 60.0);
        scene = scene.with_item(Item::Rect { bounds: Rect::new(x, y, 90.0, 30.0), style: Style::default() });
        if labels {
            scene = scene.with_item(Item::Text {
                text: format!("node {}", i),
                at: Point::new(x + 8.0, y + 20.0),
                style: Style::default(),
            });
        }
        if (i + 1) % columns != 0 {
            scene = scene.with_item(Item::Arrow {
                from: Point::new(x + 90.0, y + 15.0),
                to: Point::new(x + 120.0, y + 15.0),
                head: 6.0,
                style: Style::default(),
            });
        }
    }
    scene
}

fn pipeline() -> ExportPipeline {
    ExportPipeline::with_config(ExportConfig {
        system_fonts: false,
        ..Default::default()
    })
}

fn export(pipeline: &ExportPipeline, scene: &Scene, tag: &str) -> usize {
    let mut sink = Vec::new();
    pipeline
        .export(ExportRequest::new(tag), &mut sink, |m| scene.measure(m), |s| scene.paint(s))
        .expect("export failed");
    sink.len()
}

fn benchmark_formats(c: &mut Criterion) {
    let mut group = c.benchmark_group("export_by_format");
    let pipeline = pipeline();
    let labelled = grid_scene(50, true);
    let unlabelled = grid_scene(50, false);

    for tag in ["svg", "ps", "eps", "emf", "pdf", "png", "jpg"] {
        let scene = if matches!(tag, "png" | "jpg") { &unlabelled } else { &labelled };
        group.bench_with_input(BenchmarkId::from_parameter(tag), &tag, |b, tag| {
            b.iter(|| black_box(export(&pipeline, scene, tag)));
        });
    }
    group.finish();
}

fn benchmark_scene_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("svg_by_scene_size");
    let pipeline = pipeline();

    for boxes in [10, 100, 1000] {
        let scene = grid_scene(boxes, true);
        group.throughput(Throughput::Elements(scene.items.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(boxes), &scene, |b, scene| {
            b.iter(|| black_box(export(&pipeline, scene, "svg")));
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_formats, benchmark_scene_size);
criterion_main!(benches);
