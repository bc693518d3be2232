use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use report_core::{DailyRecord, ItemMetrics, NodeItemMetrics, NodeMetrics, NodeType, NodeTypeMap, ProfitLossRecord};

fn build_run(days: u32, stores: usize, items: usize) -> (Vec<DailyRecord>, Vec<ProfitLossRecord>, NodeTypeMap) {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let mut types = NodeTypeMap::new();
    let mut names = Vec::new();
    for i in 0..stores {
        names.push(format!("S{i}"));
        types.insert(format!("S{i}"), NodeType::Store);
    }
    for (name, t) in [("W1", NodeType::Warehouse), ("F1", NodeType::Factory), ("M1", NodeType::Material)] {
        names.push(name.to_string());
        types.insert(name, t);
    }

    let mut daily = Vec::with_capacity(days as usize);
    let mut ledger = Vec::with_capacity(days as usize);
    for day in 1..=days {
        let mut nodes = NodeMetrics::new();
        for node in &names {
            let mut per_item = ItemMetrics::new();
            for j in 0..items {
                let demand: f64 = rng.gen_range(0.0..50.0);
                let sales = demand * rng.gen_range(0.7..1.0);
                per_item.insert(
                    format!("I{j}"),
                    NodeItemMetrics {
                        demand,
                        sales,
                        shortage: demand - sales,
                        backorder_balance: rng.gen_range(0.0..10.0),
                        end_stock: rng.gen_range(0.0..200.0),
                        ..NodeItemMetrics::default()
                    },
                );
            }
            nodes.insert(node.clone(), per_item);
        }
        daily.push(DailyRecord { day, nodes });

        let mut pl = ProfitLossRecord {
            day,
            revenue: rng.gen_range(1000.0..5000.0),
            material_cost: rng.gen_range(100.0..500.0),
            ..ProfitLossRecord::default()
        };
        pl.flow_costs.insert("store_transport_variable".into(), rng.gen_range(0.0..100.0));
        pl.stock_costs.insert("store_storage_variable".into(), rng.gen_range(0.0..100.0));
        ledger.push(pl);
    }
    (daily, ledger, types)
}

fn bench_summarize(c: &mut Criterion) {
    let (daily, ledger, types) = build_run(365, 20, 10);
    c.bench_function("summarize 365d x 23 nodes x 10 items", |b| {
        b.iter(|| black_box(report_kpi::summarize(&daily, &ledger, &types)))
    });
    c.bench_function("rollup weekly by node", |b| {
        b.iter(|| {
            black_box(report_kpi::rollup_by_time(
                &daily,
                report_kpi::TimeBucket::Week,
                report_kpi::RollupGroup::Node,
            ))
        })
    });
}

criterion_group!(benches, bench_summarize);
criterion_main!(benches);
