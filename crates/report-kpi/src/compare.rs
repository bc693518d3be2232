//! Side-by-side comparison of run summaries against a base run.

use crate::{KpiError, KpiResult};
use report_core::SummaryKpi;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// KPIs included in a comparison, in display order.
pub const COMPARE_KEYS: [&str; 9] = [
    "fill_rate",
    "revenue_total",
    "cost_total",
    "penalty_total",
    "profit_total",
    "profit_per_day_avg",
    "store_demand_total",
    "store_sales_total",
    "customer_shortage_total",
];

/// Compared KPI values of one run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunMetrics {
    pub run_id: String,
    pub metrics: BTreeMap<&'static str, f64>,
}

/// Difference of one KPI against the base run.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct MetricDelta {
    pub abs: f64,
    /// Percent change; `None` when the base value is zero.
    pub pct: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunDiff {
    pub run_id: String,
    pub deltas: BTreeMap<&'static str, MetricDelta>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Comparison {
    pub base_id: String,
    pub rows: Vec<RunMetrics>,
    pub diffs: Vec<RunDiff>,
}

fn pick(run_id: &str, summary: &SummaryKpi) -> RunMetrics {
    let metrics = COMPARE_KEYS
        .iter()
        .map(|k| (*k, summary.scalar(k).unwrap_or(0.0)))
        .collect();
    RunMetrics {
        run_id: run_id.to_string(),
        metrics,
    }
}

/// Compare runs; the first one is the base every other run is diffed against.
pub fn compare_runs(runs: &[(String, SummaryKpi)]) -> KpiResult<Comparison> {
    let ((base_id, _), _) = runs.split_first().ok_or(KpiError::NothingToCompare)?;
    let rows: Vec<RunMetrics> = runs.iter().map(|(id, s)| pick(id, s)).collect();
    let base = &rows[0];
    let diffs = rows[1..]
        .iter()
        .map(|row| {
            let deltas = COMPARE_KEYS
                .iter()
                .map(|k| {
                    let b = base.metrics.get(k).copied().unwrap_or(0.0);
                    let t = row.metrics.get(k).copied().unwrap_or(0.0);
                    let abs = t - b;
                    let pct = if b != 0.0 { Some(abs / b * 100.0) } else { None };
                    (*k, MetricDelta { abs, pct })
                })
                .collect();
            RunDiff {
                run_id: row.run_id.clone(),
                deltas,
            }
        })
        .collect();
    debug!(base = %base_id, runs = runs.len(), "compared runs");
    Ok(Comparison {
        base_id: base_id.clone(),
        rows,
        diffs,
    })
}
