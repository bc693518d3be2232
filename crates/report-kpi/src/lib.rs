#![deny(warnings)]

//! KPI aggregation for simulation results.
//!
//! [`summarize`] recomputes the run summary from raw per-day records and the
//! profit-and-loss ledger. It is the client-side fallback when the backend
//! omits its own summary and the reference the backend summary is checked
//! against (see [`verify`]). The module also provides run comparison and
//! time-bucket rollups.

use report_core::{
    parse_daily_records, parse_profit_loss, DailyRecord, InputError, NodeType, NodeTypeMap,
    ProfitLossRecord, ResultsPayload, ShortageEntry, SummaryKpi,
};
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use tracing::debug;

pub mod compare;
pub mod rollup;
pub mod verify;

pub use compare::{compare_runs, Comparison, MetricDelta, RunDiff, RunMetrics, COMPARE_KEYS};
pub use rollup::{rollup_by_time, PeriodTotals, RollupGroup, TimeBucket};
pub use verify::{audit_payload, verify_summary, within_tolerance, KpiMismatch};

/// Number of items kept in the top-shortage ranking.
pub const TOP_SHORTAGE_LIMIT: usize = 5;

/// Errors produced by KPI helpers.
#[derive(Debug, Error, PartialEq)]
pub enum KpiError {
    /// Structurally malformed input.
    #[error(transparent)]
    Input(#[from] InputError),
    /// A comparison needs at least one run.
    #[error("nothing to compare: at least one run is required")]
    NothingToCompare,
    /// Time bucket other than day, week or month.
    #[error("unknown time bucket: {0}")]
    UnknownBucket(String),
}

pub type KpiResult<T> = Result<T, KpiError>;

#[derive(Clone, Copy, Debug, Default)]
struct EchelonTotals {
    demand: f64,
    sales: f64,
    shortage: f64,
    end_stock: f64,
}

/// Recompute the summary KPIs of a run.
///
/// Nodes missing from `node_types` are left out of every type-bucketed total.
/// Records are taken in the order given; `backorder_peak_day` is the 1-based
/// position of the earliest day reaching the peak.
pub fn summarize(
    daily: &[DailyRecord],
    profit_loss: &[ProfitLossRecord],
    node_types: &NodeTypeMap,
) -> SummaryKpi {
    let mut totals: BTreeMap<NodeType, EchelonTotals> = NodeType::ALL
        .iter()
        .map(|t| (*t, EchelonTotals::default()))
        .collect();
    let mut shortage_by_item: Vec<ShortageEntry> = Vec::new();
    let mut item_slot: HashMap<&str, usize> = HashMap::new();
    let mut backorder_by_day: Vec<f64> = Vec::with_capacity(daily.len());
    let mut untyped = 0usize;

    for record in daily {
        let mut backorder_today = 0.0;
        for (node, item, m) in record.entries() {
            let Some(node_type) = node_types.get(node) else {
                untyped += 1;
                continue;
            };
            let t = totals.entry(node_type).or_default();
            t.demand += m.demand;
            t.sales += m.sales;
            t.shortage += m.shortage;
            t.end_stock += m.end_stock;
            if node_type == NodeType::Store {
                match item_slot.get(item) {
                    Some(&slot) => shortage_by_item[slot].shortage += m.shortage,
                    None => {
                        item_slot.insert(item, shortage_by_item.len());
                        shortage_by_item.push(ShortageEntry {
                            item: item.to_string(),
                            shortage: m.shortage,
                        });
                    }
                }
                backorder_today += m.backorder_balance;
            }
        }
        backorder_by_day.push(backorder_today);
    }
    if untyped > 0 {
        debug!(untyped, "metrics of nodes without a type were left out of totals");
    }

    let days = u32::try_from(daily.len()).unwrap_or(u32::MAX).max(1);
    let day_count = f64::from(days);
    let avg_on_hand_by_type = totals
        .iter()
        .map(|(t, tot)| (*t, tot.end_stock / day_count))
        .collect();

    let get = |t: NodeType| totals.get(&t).copied().unwrap_or_default();
    let store = get(NodeType::Store);
    let fill_rate = if store.demand > 0.0 {
        store.sales / store.demand
    } else {
        1.0
    };
    let network_shortage_total = get(NodeType::Warehouse).shortage
        + get(NodeType::Factory).shortage
        + get(NodeType::Material).shortage;

    let (backorder_peak, backorder_peak_day) = first_peak(&backorder_by_day);

    let mut revenue_total = 0.0;
    let mut material_cost_total = 0.0;
    let mut flow_total = 0.0;
    let mut stock_total = 0.0;
    let mut penalty_stockout_total = 0.0;
    let mut penalty_backorder_total = 0.0;
    for pl in profit_loss {
        revenue_total += pl.revenue;
        material_cost_total += pl.material_cost;
        flow_total += pl.flow_total();
        stock_total += pl.stock_total();
        penalty_stockout_total += pl.penalty_costs.stockout;
        penalty_backorder_total += pl.penalty_costs.backorder;
    }
    let penalty_total = penalty_stockout_total + penalty_backorder_total;
    let cost_total = material_cost_total + flow_total + stock_total + penalty_total;
    let profit_total = revenue_total - cost_total;

    // sort_by is stable, so ties keep first-seen order
    shortage_by_item.sort_by(|a, b| b.shortage.partial_cmp(&a.shortage).unwrap_or(Ordering::Equal));
    shortage_by_item.truncate(TOP_SHORTAGE_LIMIT);

    debug!(days, records = daily.len(), ledger = profit_loss.len(), "summarized run");

    SummaryKpi {
        planning_days: days,
        fill_rate,
        store_demand_total: store.demand,
        store_sales_total: store.sales,
        customer_shortage_total: store.shortage,
        network_shortage_total,
        avg_on_hand_by_type,
        backorder_peak,
        backorder_peak_day,
        revenue_total,
        material_cost_total,
        flow_total,
        stock_total,
        cost_total,
        penalty_stockout_total,
        penalty_backorder_total,
        penalty_total,
        profit_total,
        profit_per_day_avg: profit_total / day_count,
        top_shortage_items: shortage_by_item,
    }
}

/// Maximum and 1-based position of its first occurrence; `(0, 0)` when empty.
fn first_peak(values: &[f64]) -> (f64, u32) {
    let mut best: Option<(f64, usize)> = None;
    for (i, &v) in values.iter().enumerate() {
        if best.map_or(true, |(b, _)| v > b) {
            best = Some((v, i));
        }
    }
    match best {
        Some((v, i)) => (v, u32::try_from(i + 1).unwrap_or(u32::MAX)),
        None => (0.0, 0),
    }
}

/// Summarize straight from backend JSON (`results` and `profit_loss` arrays).
pub fn summarize_json(
    results: &Value,
    profit_loss: &Value,
    node_types: &NodeTypeMap,
) -> KpiResult<SummaryKpi> {
    let daily = parse_daily_records(results)?;
    let ledger = parse_profit_loss(Some(profit_loss))?;
    Ok(summarize(&daily, &ledger, node_types))
}

/// Where a displayed summary came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SummarySource {
    Backend,
    Recomputed,
}

/// A summary ready for display together with its origin.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResolvedSummary {
    pub summary: SummaryKpi,
    pub source: SummarySource,
}

/// Prefer the backend summary; recompute when it is absent.
pub fn resolve_summary(payload: &ResultsPayload, node_types: &NodeTypeMap) -> ResolvedSummary {
    match &payload.summary {
        Some(summary) => ResolvedSummary {
            summary: summary.clone(),
            source: SummarySource::Backend,
        },
        None => {
            debug!("backend summary absent; recomputing");
            ResolvedSummary {
                summary: summarize(&payload.results, &payload.profit_loss, node_types),
                source: SummarySource::Recomputed,
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use proptest::prelude::*;
    use report_core::NodeItemMetrics;
    use serde_json::json;

    #[test]
    fn fill_rate_example() {
        let daily = vec![
            day(1, &[("S1", "A", metrics(10.0, 10.0, 0.0, 0.0, 5.0))]),
            day(2, &[("S1", "A", metrics(0.0, 0.0, 0.0, 0.0, 5.0))]),
            day(3, &[("S1", "A", metrics(5.0, 4.0, 1.0, 1.0, 0.0))]),
        ];
        let s = summarize(&daily, &[], &types());
        assert_eq!(s.store_demand_total, 15.0);
        assert_eq!(s.store_sales_total, 14.0);
        assert!((s.fill_rate - 14.0 / 15.0).abs() < 1e-12);
        assert_eq!(s.planning_days, 3);
        assert!((s.avg_on_hand_by_type[&NodeType::Store] - 10.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn no_demand_means_perfect_fill() {
        let daily = vec![day(1, &[("W1", "A", metrics(8.0, 2.0, 0.0, 0.0, 0.0))])];
        let s = summarize(&daily, &[], &types());
        assert_eq!(s.fill_rate, 1.0);
    }

    #[test]
    fn empty_run() {
        let s = summarize(&[], &[], &types());
        assert_eq!(s.planning_days, 1);
        assert_eq!(s.fill_rate, 1.0);
        assert_eq!(s.backorder_peak, 0.0);
        assert_eq!(s.backorder_peak_day, 0);
        assert!(s.top_shortage_items.is_empty());
        assert_eq!(s.avg_on_hand_by_type.len(), 4);
    }

    #[test]
    fn backorder_peak_prefers_earliest_day() {
        let daily = vec![
            day(1, &[("S1", "A", metrics(0.0, 0.0, 0.0, 2.0, 0.0))]),
            day(2, &[("S1", "A", metrics(0.0, 0.0, 0.0, 7.0, 0.0)), ("W1", "A", metrics(0.0, 0.0, 0.0, 50.0, 0.0))]),
            day(3, &[("S1", "A", metrics(0.0, 0.0, 0.0, 3.0, 0.0)), ("S2", "B", metrics(0.0, 0.0, 0.0, 4.0, 0.0))]),
        ];
        let s = summarize(&daily, &[], &types());
        assert_eq!(s.backorder_peak, 7.0);
        assert_eq!(s.backorder_peak_day, 2);
    }

    #[test]
    fn shortages_split_customer_and_network() {
        let daily = vec![day(
            1,
            &[
                ("S1", "A", metrics(0.0, 0.0, 3.0, 0.0, 0.0)),
                ("W1", "A", metrics(0.0, 0.0, 2.0, 0.0, 0.0)),
                ("F1", "A", metrics(0.0, 0.0, 1.0, 0.0, 0.0)),
                ("M1", "R", metrics(0.0, 0.0, 0.5, 0.0, 0.0)),
                ("X9", "A", metrics(100.0, 0.0, 100.0, 0.0, 0.0)),
            ],
        )];
        let s = summarize(&daily, &[], &types());
        assert_eq!(s.customer_shortage_total, 3.0);
        assert_eq!(s.network_shortage_total, 3.5);
        assert_eq!(s.store_demand_total, 0.0);
    }

    #[test]
    fn top_shortage_is_stable_and_truncated() {
        let daily = vec![
            day(
                1,
                &[
                    ("S1", "A", metrics(0.0, 0.0, 1.0, 0.0, 0.0)),
                    ("S1", "B", metrics(0.0, 0.0, 5.0, 0.0, 0.0)),
                    ("S1", "C", metrics(0.0, 0.0, 1.0, 0.0, 0.0)),
                    ("S1", "D", metrics(0.0, 0.0, 2.0, 0.0, 0.0)),
                ],
            ),
            day(
                2,
                &[
                    ("S2", "E", metrics(0.0, 0.0, 1.0, 0.0, 0.0)),
                    ("S2", "F", metrics(0.0, 0.0, 3.0, 0.0, 0.0)),
                    ("W1", "G", metrics(0.0, 0.0, 99.0, 0.0, 0.0)),
                ],
            ),
        ];
        let s = summarize(&daily, &[], &types());
        let names: Vec<&str> = s.top_shortage_items.iter().map(|e| e.item.as_str()).collect();
        assert_eq!(names, vec!["B", "F", "D", "A", "C"]);
    }

    #[test]
    fn ledger_totals() {
        let pl = vec![
            ledger(1, 100.0, 10.0, 5.0, 2.0, 1.0, 0.5),
            ledger(2, 50.0, 5.0, 2.5, 1.0, 0.0, 1.5),
        ];
        let s = summarize(&[day(1, &[]), day(2, &[])], &pl, &types());
        assert_eq!(s.revenue_total, 150.0);
        assert_eq!(s.material_cost_total, 15.0);
        assert_eq!(s.flow_total, 7.5);
        assert_eq!(s.stock_total, 3.0);
        assert_eq!(s.penalty_stockout_total, 1.0);
        assert_eq!(s.penalty_backorder_total, 2.0);
        assert_eq!(s.penalty_total, 3.0);
        assert_eq!(s.cost_total, 28.5);
        assert_eq!(s.profit_total, 121.5);
        assert_eq!(s.profit_per_day_avg, 60.75);
    }

    #[test]
    fn json_boundary_rejects_bad_nodes() {
        let err = summarize_json(&json!([{"day": 1, "nodes": 5}]), &json!([]), &types()).unwrap_err();
        assert!(matches!(err, KpiError::Input(InputError::Malformed { .. })));
    }

    #[test]
    fn json_boundary_coerces_missing_fields() {
        let s = summarize_json(
            &json!([{"day": 1, "nodes": {"S1": {"A": {"demand": "4", "sales": null}}}}]),
            &json!([{"revenue": 10, "penalty_costs": {}}]),
            &types(),
        )
        .unwrap();
        assert_eq!(s.store_demand_total, 4.0);
        assert_eq!(s.fill_rate, 0.0);
        assert_eq!(s.profit_total, 10.0);
    }

    #[test]
    fn shortage_ties_keep_payload_order() {
        let results: Value = serde_json::from_str(
            r#"[{"day": 1, "nodes": {"S2": {"B": {"shortage": 1}}, "S1": {"B": {"shortage": 1}, "A": {"shortage": 2}}}},
                {"day": 2, "nodes": {"S1": {"D": {"shortage": 2}, "C": {"shortage": 2}}}}]"#,
        )
        .unwrap();
        let s = summarize_json(&results, &json!([]), &types()).unwrap();
        let names: Vec<&str> = s.top_shortage_items.iter().map(|e| e.item.as_str()).collect();
        assert_eq!(names, vec!["B", "A", "D", "C"]);

        let tied = json!([{"day": 1, "nodes": {"S1": {"B": {"shortage": 1}, "A": {"shortage": 1}}}}]);
        let s = summarize_json(&tied, &json!([]), &types()).unwrap();
        let names: Vec<&str> = s.top_shortage_items.iter().map(|e| e.item.as_str()).collect();
        assert_eq!(names, vec!["B", "A"]);
    }

    #[test]
    fn resolve_prefers_backend_summary() {
        let backend = SummaryKpi {
            planning_days: 9,
            ..SummaryKpi::default()
        };
        let mut payload = ResultsPayload {
            results: vec![day(1, &[("S1", "A", metrics(1.0, 1.0, 0.0, 0.0, 0.0))])],
            profit_loss: vec![],
            summary: Some(backend),
        };
        let r = resolve_summary(&payload, &types());
        assert_eq!(r.source, SummarySource::Backend);
        assert_eq!(r.summary.planning_days, 9);

        payload.summary = None;
        let r = resolve_summary(&payload, &types());
        assert_eq!(r.source, SummarySource::Recomputed);
        assert_eq!(r.summary.planning_days, 1);
    }

    fn arb_day() -> impl Strategy<Value = Vec<(f64, f64, f64, f64)>> {
        prop::collection::vec((0.0f64..100.0, 0.0f64..1.0, 0.0f64..50.0, 0.0f64..30.0), 0..4)
    }

    proptest! {
        #[test]
        fn fill_rate_bounded(days in prop::collection::vec(arb_day(), 0..10)) {
            let daily: Vec<DailyRecord> = days
                .iter()
                .enumerate()
                .map(|(i, items)| {
                    let names: Vec<String> = (0..items.len()).map(|j| format!("I{j}")).collect();
                    let entries: Vec<(&str, &str, NodeItemMetrics)> = items
                        .iter()
                        .zip(&names)
                        .map(|(&(d, frac, sh, bo), name)| ("S1", name.as_str(), metrics(d, d * frac, sh, bo, 0.0)))
                        .collect();
                    day(i as u32 + 1, &entries)
                })
                .collect();
            let s = summarize(&daily, &[], &types());
            if s.store_demand_total > 0.0 {
                prop_assert!(s.fill_rate >= 0.0 && s.fill_rate <= 1.0);
            } else {
                prop_assert_eq!(s.fill_rate, 1.0);
            }
        }

        #[test]
        fn peak_is_first_maximum(bos in prop::collection::vec(0u8..5, 1..20)) {
            let daily: Vec<DailyRecord> = bos
                .iter()
                .enumerate()
                .map(|(i, &bo)| day(i as u32 + 1, &[("S1", "A", metrics(0.0, 0.0, 0.0, f64::from(bo), 0.0))]))
                .collect();
            let s = summarize(&daily, &[], &types());
            let max = bos.iter().copied().max().unwrap_or(0);
            let first = bos.iter().position(|&b| b == max).unwrap_or(0);
            prop_assert_eq!(s.backorder_peak, f64::from(max));
            prop_assert_eq!(s.backorder_peak_day as usize, first + 1);
        }

        #[test]
        fn cost_identity(rows in prop::collection::vec((0.0f64..1e6, 0.0f64..1e5, 0.0f64..1e5, 0.0f64..1e5, 0.0f64..1e4, 0.0f64..1e4), 0..30)) {
            let pl: Vec<ProfitLossRecord> = rows
                .iter()
                .enumerate()
                .map(|(i, &(r, m, f, st, so, bo))| ledger(i as u32 + 1, r, m, f, st, so, bo))
                .collect();
            let s = summarize(&[], &pl, &types());
            let expected = s.material_cost_total + s.flow_total + s.stock_total + s.penalty_total;
            prop_assert!((s.cost_total - expected).abs() <= 1e-9 * expected.abs().max(1.0));
            prop_assert!((s.profit_total - (s.revenue_total - s.cost_total)).abs() <= 1e-9 * s.revenue_total.abs().max(1.0));
        }
    }
}
