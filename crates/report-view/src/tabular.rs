//! Flat row shapes for exporting results, summaries and the P&L ledger.

use report_core::{DailyRecord, ProfitLossRecord, SummaryKpi};
use serde::Serialize;
use std::collections::BTreeSet;

/// One `(day, node, item)` line of the results table.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResultRow {
    #[serde(rename = "Day")]
    pub day: u32,
    #[serde(rename = "Node")]
    pub node: String,
    #[serde(rename = "Item")]
    pub item: String,
    #[serde(rename = "StartStock")]
    pub start_stock: f64,
    #[serde(rename = "Incoming")]
    pub incoming: f64,
    #[serde(rename = "Demand")]
    pub demand: f64,
    #[serde(rename = "Sales")]
    pub sales: f64,
    #[serde(rename = "Consumption")]
    pub consumption: f64,
    #[serde(rename = "Produced")]
    pub produced: f64,
    #[serde(rename = "Shortage")]
    pub shortage: f64,
    #[serde(rename = "Backorder")]
    pub backorder: f64,
    #[serde(rename = "EndStock")]
    pub end_stock: f64,
    #[serde(rename = "Ordered")]
    pub ordered: f64,
}

/// Flatten records into rows, day by day then node and item.
pub fn result_rows(records: &[DailyRecord]) -> Vec<ResultRow> {
    records
        .iter()
        .flat_map(|r| {
            r.entries().map(move |(node, item, m)| ResultRow {
                day: r.day,
                node: node.to_string(),
                item: item.to_string(),
                start_stock: m.start_stock,
                incoming: m.incoming,
                demand: m.demand,
                sales: m.sales,
                consumption: m.consumption,
                produced: m.produced,
                shortage: m.shortage,
                backorder: m.backorder_balance,
                end_stock: m.end_stock,
                ordered: m.ordered_quantity,
            })
        })
        .collect()
}

/// The single-row summary table.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SummaryRow {
    pub planning_days: u32,
    pub fill_rate: f64,
    pub store_demand_total: f64,
    pub store_sales_total: f64,
    pub customer_shortage_total: f64,
    pub network_shortage_total: f64,
    pub backorder_peak: f64,
    pub backorder_peak_day: u32,
    pub revenue_total: f64,
    pub cost_total: f64,
    pub penalty_stockout_total: f64,
    pub penalty_backorder_total: f64,
    pub penalty_total: f64,
    pub profit_total: f64,
    pub profit_per_day_avg: f64,
}

pub fn summary_row(s: &SummaryKpi) -> SummaryRow {
    SummaryRow {
        planning_days: s.planning_days,
        fill_rate: s.fill_rate,
        store_demand_total: s.store_demand_total,
        store_sales_total: s.store_sales_total,
        customer_shortage_total: s.customer_shortage_total,
        network_shortage_total: s.network_shortage_total,
        backorder_peak: s.backorder_peak,
        backorder_peak_day: s.backorder_peak_day,
        revenue_total: s.revenue_total,
        cost_total: s.cost_total,
        penalty_stockout_total: s.penalty_stockout_total,
        penalty_backorder_total: s.penalty_backorder_total,
        penalty_total: s.penalty_total,
        profit_total: s.profit_total,
        profit_per_day_avg: s.profit_per_day_avg,
    }
}

/// A header row plus string cells. Empty cells mark absent values.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Build the P&L table; cost-label columns are the sorted union across days.
pub fn profit_loss_table(ledger: &[ProfitLossRecord]) -> Table {
    let flow_labels: BTreeSet<&str> = ledger
        .iter()
        .flat_map(|pl| pl.flow_costs.keys().map(String::as_str))
        .collect();
    let stock_labels: BTreeSet<&str> = ledger
        .iter()
        .flat_map(|pl| pl.stock_costs.keys().map(String::as_str))
        .collect();

    let mut headers: Vec<String> = vec!["Day".into(), "Revenue".into(), "MaterialCost".into()];
    headers.extend(flow_labels.iter().map(|l| format!("Flow_{l}")));
    headers.extend(stock_labels.iter().map(|l| format!("Stock_{l}")));
    headers.extend(
        ["Penalty_Stockout", "Penalty_Backorder", "TotalCost", "ProfitLoss"]
            .iter()
            .map(|h| h.to_string()),
    );

    let rows = ledger
        .iter()
        .map(|pl| {
            let mut row = vec![pl.day.to_string(), pl.revenue.to_string(), pl.material_cost.to_string()];
            row.extend(
                flow_labels
                    .iter()
                    .map(|l| pl.flow_costs.get(*l).map(f64::to_string).unwrap_or_default()),
            );
            row.extend(
                stock_labels
                    .iter()
                    .map(|l| pl.stock_costs.get(*l).map(f64::to_string).unwrap_or_default()),
            );
            row.push(pl.penalty_costs.stockout.to_string());
            row.push(pl.penalty_costs.backorder.to_string());
            row.push(pl.total_cost.to_string());
            row.push(pl.profit_loss.to_string());
            row
        })
        .collect();

    Table { headers, rows }
}
