use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use report_core::{DailyRecord, ItemMetrics, NodeItemMetrics};
use report_view::{FilterCriteria, Selection};

fn build_records(days: u32, nodes: usize, items: usize) -> Vec<DailyRecord> {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    (1..=days)
        .map(|day| {
            let map = (0..nodes)
                .map(|n| {
                    let per_item = (0..items)
                        .map(|i| {
                            let m = NodeItemMetrics {
                                demand: rng.gen_range(0.0..40.0),
                                end_stock: rng.gen_range(0.0..100.0),
                                ..NodeItemMetrics::default()
                            };
                            (format!("I{i}"), m)
                        })
                        .collect::<ItemMetrics>();
                    (format!("N{n}"), per_item)
                })
                .collect();
            DailyRecord { day, nodes: map }
        })
        .collect()
}

fn bench_project(c: &mut Criterion) {
    let records = build_records(365, 25, 12);
    let narrow = FilterCriteria {
        day_from: 30,
        day_to: 200,
        node: Selection::Only("N3".into()),
        item: Selection::Only("I5".into()),
    };
    let wide = FilterCriteria::full_range(&records);
    c.bench_function("project narrow 365d", |b| {
        b.iter(|| black_box(report_view::project(&records, &narrow)))
    });
    c.bench_function("project full 365d", |b| {
        b.iter(|| black_box(report_view::project(&records, &wide)))
    });
    c.bench_function("distinct values 365d", |b| {
        b.iter(|| black_box(report_view::distinct_nodes_and_items(&records)))
    });
}

criterion_group!(benches, bench_project);
criterion_main!(benches);
