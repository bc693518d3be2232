#![deny(warnings)]

//! Core data model for the supply-chain simulation reporting client.
//!
//! Defines the per-day metric records, the profit-and-loss ledger, the node
//! echelon lookup and the summary KPI value produced by aggregation. Backend
//! JSON is decoded leniently: missing or non-numeric metrics become zero,
//! while structural damage (a `nodes` field that is not a mapping, a result
//! list that is not an array) is reported as [`InputError::Malformed`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

pub mod config;
pub mod lenient;
pub mod payload;

pub use config::{ConfigError, ReportConfig};
pub use indexmap::IndexMap;
pub use payload::{ResultsPayload, RunSummary, RunSummaryKpis, RunsPage};

/// Name of a supply-chain location.
pub type NodeName = String;
/// Name of a product or material.
pub type ItemName = String;
/// Per-item metrics of one node on one day, in payload order.
pub type ItemMetrics = IndexMap<ItemName, NodeItemMetrics>;
/// Per-node item maps of one day, in payload order.
pub type NodeMetrics = IndexMap<NodeName, ItemMetrics>;

/// Errors raised while decoding backend input.
#[derive(Debug, Error, PartialEq)]
pub enum InputError {
    /// The value at `path` does not have the expected JSON shape.
    #[error("malformed input at {path}: expected {expected}")]
    Malformed {
        path: String,
        expected: &'static str,
    },
    /// A node type outside {store, warehouse, factory, material}.
    #[error("unknown node type: {0}")]
    UnknownNodeType(String),
    /// The text is not JSON at all.
    #[error("invalid JSON: {0}")]
    Json(String),
}

impl InputError {
    pub fn malformed(path: impl Into<String>, expected: &'static str) -> Self {
        InputError::Malformed {
            path: path.into(),
            expected,
        }
    }
}

pub type InputResult<T> = Result<T, InputError>;

/// Echelon classification of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Store,
    Warehouse,
    Factory,
    Material,
}

impl NodeType {
    pub const ALL: [NodeType; 4] = [
        NodeType::Store,
        NodeType::Warehouse,
        NodeType::Factory,
        NodeType::Material,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            NodeType::Store => "store",
            NodeType::Warehouse => "warehouse",
            NodeType::Factory => "factory",
            NodeType::Material => "material",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeType {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "store" => Ok(NodeType::Store),
            "warehouse" => Ok(NodeType::Warehouse),
            "factory" => Ok(NodeType::Factory),
            "material" => Ok(NodeType::Material),
            other => Err(InputError::UnknownNodeType(other.to_string())),
        }
    }
}

/// Operational metrics of one item at one node on one day.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct NodeItemMetrics {
    /// On-hand quantity at the start of the day.
    pub start_stock: f64,
    /// Quantity received from upstream.
    pub incoming: f64,
    /// Customer or downstream demand.
    pub demand: f64,
    /// Demand actually served.
    pub sales: f64,
    /// Quantity used up as production input.
    pub consumption: f64,
    /// Quantity produced (factories).
    pub produced: f64,
    /// Unmet demand of the day.
    pub shortage: f64,
    /// Accumulated unserved demand carried forward.
    pub backorder_balance: f64,
    /// On-hand quantity at the end of the day.
    pub end_stock: f64,
    /// Quantity ordered from upstream.
    pub ordered_quantity: f64,
}

impl NodeItemMetrics {
    /// Field names in wire order.
    pub const FIELDS: [&'static str; 10] = [
        "start_stock",
        "incoming",
        "demand",
        "sales",
        "consumption",
        "produced",
        "shortage",
        "backorder_balance",
        "end_stock",
        "ordered_quantity",
    ];

    /// Decode one metrics object. `null` yields all zeros.
    pub fn from_value(value: &Value, path: &str) -> InputResult<Self> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::Object(map) => Ok(Self::from_map(map)),
            _ => Err(InputError::malformed(path, "an object of item metrics")),
        }
    }

    fn from_map(map: &Map<String, Value>) -> Self {
        let n = |key: &str| lenient::number(map.get(key));
        Self {
            start_stock: n("start_stock"),
            incoming: n("incoming"),
            demand: n("demand"),
            sales: n("sales"),
            consumption: n("consumption"),
            produced: n("produced"),
            shortage: n("shortage"),
            backorder_balance: n("backorder_balance"),
            end_stock: n("end_stock"),
            ordered_quantity: n("ordered_quantity"),
        }
    }

    /// Values in the same order as [`Self::FIELDS`].
    pub fn values(&self) -> [f64; 10] {
        [
            self.start_stock,
            self.incoming,
            self.demand,
            self.sales,
            self.consumption,
            self.produced,
            self.shortage,
            self.backorder_balance,
            self.end_stock,
            self.ordered_quantity,
        ]
    }

    /// Apply `f` to every field.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            start_stock: f(self.start_stock),
            incoming: f(self.incoming),
            demand: f(self.demand),
            sales: f(self.sales),
            consumption: f(self.consumption),
            produced: f(self.produced),
            shortage: f(self.shortage),
            backorder_balance: f(self.backorder_balance),
            end_stock: f(self.end_stock),
            ordered_quantity: f(self.ordered_quantity),
        }
    }

    /// Add every field of `other` into `self`.
    pub fn accumulate(&mut self, other: &NodeItemMetrics) {
        self.start_stock += other.start_stock;
        self.incoming += other.incoming;
        self.demand += other.demand;
        self.sales += other.sales;
        self.consumption += other.consumption;
        self.produced += other.produced;
        self.shortage += other.shortage;
        self.backorder_balance += other.backorder_balance;
        self.end_stock += other.end_stock;
        self.ordered_quantity += other.ordered_quantity;
    }
}

impl TryFrom<Value> for NodeItemMetrics {
    type Error = InputError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(&value, "metrics")
    }
}

/// Snapshot of every node and item for one simulated day.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct DailyRecord {
    /// Simulation day, 1-based. Unusable values decode as 0.
    pub day: u32,
    /// Item metrics per node, keeping the order the payload lists them in.
    pub nodes: NodeMetrics,
}

impl DailyRecord {
    pub fn from_value(value: &Value, path: &str) -> InputResult<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| InputError::malformed(path, "a daily record object"))?;
        let day = lenient::day(obj.get("day"));
        let mut nodes = NodeMetrics::new();
        match obj.get("nodes") {
            None | Some(Value::Null) => {}
            Some(Value::Object(node_map)) => {
                for (node, items) in node_map {
                    let node_path = format!("{path}.nodes.{node}");
                    nodes.insert(node.clone(), parse_items(items, &node_path)?);
                }
            }
            Some(_) => {
                return Err(InputError::malformed(
                    format!("{path}.nodes"),
                    "a mapping of node name to items",
                ))
            }
        }
        Ok(Self { day, nodes })
    }

    /// Iterate `(node, item, metrics)` in payload order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str, &NodeItemMetrics)> {
        self.nodes.iter().flat_map(|(node, items)| {
            items
                .iter()
                .map(move |(item, m)| (node.as_str(), item.as_str(), m))
        })
    }
}

impl TryFrom<Value> for DailyRecord {
    type Error = InputError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(&value, "record")
    }
}

fn parse_items(value: &Value, path: &str) -> InputResult<ItemMetrics> {
    let mut items = ItemMetrics::new();
    match value {
        Value::Null => {}
        Value::Object(item_map) => {
            for (item, metrics) in item_map {
                let item_path = format!("{path}.{item}");
                items.insert(item.clone(), NodeItemMetrics::from_value(metrics, &item_path)?);
            }
        }
        _ => return Err(InputError::malformed(path, "a mapping of item name to metrics")),
    }
    Ok(items)
}

/// Decode the `results` array of a results payload.
pub fn parse_daily_records(value: &Value) -> InputResult<Vec<DailyRecord>> {
    let list = value
        .as_array()
        .ok_or_else(|| InputError::malformed("results", "an array of daily records"))?;
    list.iter()
        .enumerate()
        .map(|(i, v)| DailyRecord::from_value(v, &format!("results[{i}]")))
        .collect()
}

/// Penalty costs of one day.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PenaltyCosts {
    /// Penalty for demand lost to stockouts.
    pub stockout: f64,
    /// Penalty for demand left on backorder.
    pub backorder: f64,
}

/// Profit-and-loss ledger entry for one day.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct ProfitLossRecord {
    /// Simulation day, 1-based.
    pub day: u32,
    /// Sales revenue of the day.
    pub revenue: f64,
    /// Cost of purchased raw material.
    pub material_cost: f64,
    /// Transport and handling costs by label. New labels are summed like
    /// known ones.
    pub flow_costs: BTreeMap<String, f64>,
    /// Storage costs by label.
    pub stock_costs: BTreeMap<String, f64>,
    pub penalty_costs: PenaltyCosts,
    /// Backend's own cost total; informational only.
    pub total_cost: f64,
    /// Backend's own profit of the day; informational only.
    pub profit_loss: f64,
}

impl ProfitLossRecord {
    pub fn from_value(value: &Value, path: &str) -> InputResult<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| InputError::malformed(path, "a profit-and-loss object"))?;
        let n = |key: &str| lenient::number(obj.get(key));
        let penalty_costs = match obj.get("penalty_costs") {
            None | Some(Value::Null) => PenaltyCosts::default(),
            Some(Value::Object(pc)) => PenaltyCosts {
                stockout: lenient::number(pc.get("stockout")),
                backorder: lenient::number(pc.get("backorder")),
            },
            Some(_) => {
                return Err(InputError::malformed(
                    format!("{path}.penalty_costs"),
                    "an object with stockout and backorder",
                ))
            }
        };
        Ok(Self {
            day: lenient::day(obj.get("day")),
            revenue: n("revenue"),
            material_cost: n("material_cost"),
            flow_costs: parse_cost_labels(obj.get("flow_costs"), &format!("{path}.flow_costs"))?,
            stock_costs: parse_cost_labels(obj.get("stock_costs"), &format!("{path}.stock_costs"))?,
            penalty_costs,
            total_cost: n("total_cost"),
            profit_loss: n("profit_loss"),
        })
    }

    pub fn flow_total(&self) -> f64 {
        self.flow_costs.values().sum()
    }

    pub fn stock_total(&self) -> f64 {
        self.stock_costs.values().sum()
    }
}

impl TryFrom<Value> for ProfitLossRecord {
    type Error = InputError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(&value, "profit_loss")
    }
}

fn parse_cost_labels(value: Option<&Value>, path: &str) -> InputResult<BTreeMap<String, f64>> {
    match value {
        None | Some(Value::Null) => Ok(BTreeMap::new()),
        Some(Value::Object(map)) => Ok(map
            .iter()
            .map(|(label, v)| (label.clone(), lenient::number(Some(v))))
            .collect()),
        Some(_) => Err(InputError::malformed(path, "a mapping of cost label to amount")),
    }
}

/// Decode the `profit_loss` array; absent or null means no ledger.
pub fn parse_profit_loss(value: Option<&Value>) -> InputResult<Vec<ProfitLossRecord>> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(list)) => list
            .iter()
            .enumerate()
            .map(|(i, v)| ProfitLossRecord::from_value(v, &format!("profit_loss[{i}]")))
            .collect(),
        Some(_) => Err(InputError::malformed(
            "profit_loss",
            "an array of profit-and-loss records",
        )),
    }
}

/// Node definition as supplied with the simulation request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeDef {
    pub name: NodeName,
    /// Raw type string; see [`NodeType`] for the accepted values.
    pub node_type: String,
}

/// Lookup from node name to echelon.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodeTypeMap(BTreeMap<NodeName, NodeType>);

impl NodeTypeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from node definitions; unknown node types are left out.
    pub fn from_defs<'a, I>(defs: I) -> Self
    where
        I: IntoIterator<Item = &'a NodeDef>,
    {
        let mut map = Self::new();
        for def in defs {
            match def.node_type.parse::<NodeType>() {
                Ok(t) => map.insert(def.name.clone(), t),
                Err(_) => {
                    debug!(node = %def.name, node_type = %def.node_type, "skipping node with unknown type");
                }
            }
        }
        map
    }

    /// Build from a simulation request object carrying a `nodes` list.
    pub fn from_request(request: &Value) -> InputResult<Self> {
        let defs = match request.get("nodes") {
            None | Some(Value::Null) => return Ok(Self::new()),
            Some(Value::Array(list)) => list,
            Some(_) => return Err(InputError::malformed("nodes", "an array of node definitions")),
        };
        let parsed: Vec<NodeDef> = defs
            .iter()
            .filter_map(|d| {
                let name = d.get("name")?.as_str()?;
                let node_type = d.get("node_type")?.as_str()?;
                Some(NodeDef {
                    name: name.to_string(),
                    node_type: node_type.to_string(),
                })
            })
            .collect();
        Ok(Self::from_defs(&parsed))
    }

    pub fn insert(&mut self, name: impl Into<NodeName>, node_type: NodeType) {
        self.0.insert(name.into(), node_type);
    }

    pub fn get(&self, name: &str) -> Option<NodeType> {
        self.0.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(NodeName, NodeType)> for NodeTypeMap {
    fn from_iter<T: IntoIterator<Item = (NodeName, NodeType)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Store-level shortage total of one item.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShortageEntry {
    pub item: ItemName,
    /// Shortage summed over every store node and day.
    pub shortage: f64,
}

/// Summary KPIs of one simulation run.
///
/// Fields a backend summary omits decode as zero.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryKpi {
    /// Number of daily records, at least 1.
    pub planning_days: u32,
    /// Store sales over store demand; 1 when there was no demand.
    pub fill_rate: f64,
    pub store_demand_total: f64,
    pub store_sales_total: f64,
    /// Shortage at store nodes.
    pub customer_shortage_total: f64,
    /// Shortage at warehouse, factory and material nodes.
    pub network_shortage_total: f64,
    /// Mean daily end stock per node type, over `planning_days`.
    pub avg_on_hand_by_type: BTreeMap<NodeType, f64>,
    /// Largest one-day sum of store backorder balances.
    pub backorder_peak: f64,
    /// 1-based position of the first day reaching `backorder_peak`; 0 for
    /// an empty run.
    pub backorder_peak_day: u32,
    pub revenue_total: f64,
    pub material_cost_total: f64,
    /// Sum of every flow-cost label.
    pub flow_total: f64,
    /// Sum of every stock-cost label.
    pub stock_total: f64,
    /// Material, flow, stock and penalty costs together.
    pub cost_total: f64,
    pub penalty_stockout_total: f64,
    pub penalty_backorder_total: f64,
    pub penalty_total: f64,
    /// Revenue minus `cost_total`.
    pub profit_total: f64,
    /// `profit_total` over `planning_days`.
    pub profit_per_day_avg: f64,
    /// Up to five items with the largest store shortage, ties in first-seen
    /// order.
    pub top_shortage_items: Vec<ShortageEntry>,
}

impl SummaryKpi {
    /// Scalar KPIs exported as the summary table, in column order.
    pub const EXPORT_COLUMNS: [&'static str; 15] = [
        "planning_days",
        "fill_rate",
        "store_demand_total",
        "store_sales_total",
        "customer_shortage_total",
        "network_shortage_total",
        "backorder_peak",
        "backorder_peak_day",
        "revenue_total",
        "cost_total",
        "penalty_stockout_total",
        "penalty_backorder_total",
        "penalty_total",
        "profit_total",
        "profit_per_day_avg",
    ];

    /// Look up a scalar KPI by its wire name.
    pub fn scalar(&self, name: &str) -> Option<f64> {
        let v = match name {
            "planning_days" => self.planning_days as f64,
            "fill_rate" => self.fill_rate,
            "store_demand_total" => self.store_demand_total,
            "store_sales_total" => self.store_sales_total,
            "customer_shortage_total" => self.customer_shortage_total,
            "network_shortage_total" => self.network_shortage_total,
            "backorder_peak" => self.backorder_peak,
            "backorder_peak_day" => self.backorder_peak_day as f64,
            "revenue_total" => self.revenue_total,
            "material_cost_total" => self.material_cost_total,
            "flow_total" => self.flow_total,
            "stock_total" => self.stock_total,
            "cost_total" => self.cost_total,
            "penalty_stockout_total" => self.penalty_stockout_total,
            "penalty_backorder_total" => self.penalty_backorder_total,
            "penalty_total" => self.penalty_total,
            "profit_total" => self.profit_total,
            "profit_per_day_avg" => self.profit_per_day_avg,
            _ => return None,
        };
        Some(v)
    }
}
