//! Cross-check of a backend summary against the recomputed one.

use crate::summarize;
use report_core::{NodeType, NodeTypeMap, ResultsPayload, SummaryKpi};
use serde::Serialize;
use tracing::{debug, warn};

/// One KPI on which the backend and the recomputation disagree.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct KpiMismatch {
    pub field: String,
    pub backend: Option<f64>,
    pub recomputed: Option<f64>,
}

impl KpiMismatch {
    fn new(field: impl Into<String>, backend: Option<f64>, recomputed: Option<f64>) -> Self {
        Self {
            field: field.into(),
            backend,
            recomputed,
        }
    }
}

/// Relative comparison that degrades to absolute near zero.
pub fn within_tolerance(a: f64, b: f64, tolerance: f64) -> bool {
    let scale = 1f64.max(a.abs()).max(b.abs());
    (a - b).abs() <= tolerance * scale
}

/// Compare two summaries field by field.
///
/// Scalars listed in [`SummaryKpi::EXPORT_COLUMNS`], the per-type average
/// on-hand values and the top-shortage ranking are checked. Items whose
/// shortage ties the last ranked value may legitimately differ between
/// implementations, so only their values are compared.
pub fn verify_summary(backend: &SummaryKpi, recomputed: &SummaryKpi, tolerance: f64) -> Vec<KpiMismatch> {
    let mut out = Vec::new();

    for field in SummaryKpi::EXPORT_COLUMNS
        .iter()
        .chain(["material_cost_total", "flow_total", "stock_total"].iter())
    {
        let (a, b) = (backend.scalar(field), recomputed.scalar(field));
        if let (Some(x), Some(y)) = (a, b) {
            if !within_tolerance(x, y, tolerance) {
                out.push(KpiMismatch::new(*field, a, b));
            }
        }
    }

    for t in NodeType::ALL {
        let a = backend.avg_on_hand_by_type.get(&t).copied();
        let b = recomputed.avg_on_hand_by_type.get(&t).copied();
        let agree = match (a, b) {
            (Some(x), Some(y)) => within_tolerance(x, y, tolerance),
            // A backend that omits a type it has no nodes of is fine.
            (None, Some(y)) => y == 0.0,
            (Some(x), None) => x == 0.0,
            (None, None) => true,
        };
        if !agree {
            out.push(KpiMismatch::new(format!("avg_on_hand_by_type.{t}"), a, b));
        }
    }

    let ours = &recomputed.top_shortage_items;
    let theirs = &backend.top_shortage_items;
    let len = ours.len().max(theirs.len());
    for i in 0..len {
        let a = theirs.get(i).map(|e| e.shortage);
        let b = ours.get(i).map(|e| e.shortage);
        let agree = matches!((a, b), (Some(x), Some(y)) if within_tolerance(x, y, tolerance));
        if !agree {
            out.push(KpiMismatch::new(format!("top_shortage_items[{i}]"), a, b));
        }
    }
    if let Some(cutoff) = ours.last().map(|e| e.shortage) {
        for entry in ours {
            if within_tolerance(entry.shortage, cutoff, tolerance) {
                continue;
            }
            if !theirs.iter().any(|e| e.item == entry.item) {
                out.push(KpiMismatch::new(
                    format!("top_shortage_items.{}", entry.item),
                    None,
                    Some(entry.shortage),
                ));
            }
        }
    }

    out
}

/// Recompute the summary of `payload` and compare it with the backend's.
///
/// Returns `None` when the payload carries no backend summary.
pub fn audit_payload(
    payload: &ResultsPayload,
    node_types: &NodeTypeMap,
    tolerance: f64,
) -> Option<Vec<KpiMismatch>> {
    let backend = payload.summary.as_ref()?;
    let recomputed = summarize(&payload.results, &payload.profit_loss, node_types);
    let mismatches = verify_summary(backend, &recomputed, tolerance);
    if mismatches.is_empty() {
        debug!("backend summary agrees with recomputation");
    } else {
        for m in &mismatches {
            warn!(field = %m.field, backend = ?m.backend, recomputed = ?m.recomputed, "summary mismatch");
        }
    }
    Some(mismatches)
}
