//! Performance benchmarks for the viewer core
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use insight_pdf::query::gemini::parse_locator;
use insight_pdf::viewer::intersection::IntersectionObserver;
use insight_pdf::viewer::{ObserverOptions, Rect, RenderWindow};

const PAGE_HEIGHT: f64 = 1035.0;
const GAP: f64 = 16.0;

fn column(count: u32) -> Vec<(u32, Rect)> {
    (1..=count)
        .map(|p| (p, Rect::new(0.0, (p - 1) as f64 * (PAGE_HEIGHT + GAP), 800.0, PAGE_HEIGHT)))
        .collect()
}

/// Slot planning for large documents
fn bench_render_plan(c: &mut Criterion) {
    let window = RenderWindow::default();
    let mut group = c.benchmark_group("render_plan");

    for pages in [20u32, 500, 5000] {
        group.throughput(Throughput::Elements(u64::from(pages)));
        group.bench_with_input(BenchmarkId::from_parameter(pages), &pages, |b, &pages| {
            b.iter(|| window.plan(black_box(pages), pages / 2, 800.0, 1.0));
        });
    }

    group.finish();
}

/// One observer pass while scrolling through a long column
fn bench_intersection(c: &mut Criterion) {
    let mut group = c.benchmark_group("intersection");

    for pages in [20u32, 500] {
        let targets = column(pages);
        group.throughput(Throughput::Elements(u64::from(pages)));
        group.bench_with_input(BenchmarkId::new("scroll_step", pages), &targets, |b, targets| {
            let mut observer = IntersectionObserver::new(ObserverOptions::default());
            let mut y = 0.0;
            b.iter(|| {
                y = (y + 120.0) % (pages as f64 * (PAGE_HEIGHT + GAP));
                let viewport = Rect::new(0.0, y, 800.0, 900.0);
                black_box(observer.evaluate(viewport, targets.iter().copied()))
            });
        });
    }

    group.finish();
}

/// Parsing a structured model answer
fn bench_parse_locator(c: &mut Criterion) {
    let located = r#"{
        "answer": "该图表位于第 12 页的右上角",
        "foundLocation": true,
        "pageNumber": 12,
        "box2d": [80, 520, 410, 960],
        "snippet": "Figure 4: Latency by region",
        "reasoning": "caption matches the question"
    }"#;
    let unlocated = r#"{ "answer": "文档中没有提到这一点", "foundLocation": false }"#;

    let mut group = c.benchmark_group("parse_locator");
    group.bench_function("located", |b| b.iter(|| parse_locator(black_box(located))));
    group.bench_function("answer_only", |b| b.iter(|| parse_locator(black_box(unlocated))));
    group.finish();
}

criterion_group!(
    benches,
    bench_render_plan,
    bench_intersection,
    bench_parse_locator,
);

criterion_main!(benches);
