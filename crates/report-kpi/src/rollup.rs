//! Time-bucket rollups of daily metrics.

use crate::KpiError;
use report_core::{DailyRecord, ItemName, NodeItemMetrics, NodeName};
use serde::Serialize;
use std::collections::BTreeMap;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeBucket {
    Day,
    /// Seven-day periods starting at day 1.
    Week,
    /// Thirty-day periods starting at day 1.
    Month,
}

impl TimeBucket {
    /// 1-based period containing `day`. Day 0 (an undated record) maps to 0.
    pub fn period_of(self, day: u32) -> u32 {
        if day == 0 {
            return 0;
        }
        match self {
            TimeBucket::Day => day,
            TimeBucket::Week => (day - 1) / 7 + 1,
            TimeBucket::Month => (day - 1) / 30 + 1,
        }
    }
}

impl FromStr for TimeBucket {
    type Err = KpiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" => Ok(TimeBucket::Day),
            "week" => Ok(TimeBucket::Week),
            "month" => Ok(TimeBucket::Month),
            other => Err(KpiError::UnknownBucket(other.to_string())),
        }
    }
}

/// Grouping below the period level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RollupGroup {
    #[default]
    Period,
    Node,
    NodeItem,
}

/// Summed metrics of one group in one period.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PeriodTotals {
    pub period: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<NodeName>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<ItemName>,
    #[serde(flatten)]
    pub totals: NodeItemMetrics,
}

type GroupKey = (u32, Option<NodeName>, Option<ItemName>);

fn round6(v: f64) -> f64 {
    (v * 1e6).round() / 1e6
}

/// Sum every metric per period and group; sums are rounded to 6 decimals
/// and rows come out ordered by period, node and item.
pub fn rollup_by_time(records: &[DailyRecord], bucket: TimeBucket, group: RollupGroup) -> Vec<PeriodTotals> {
    let mut acc: BTreeMap<GroupKey, NodeItemMetrics> = BTreeMap::new();
    for record in records {
        let period = bucket.period_of(record.day);
        for (node, item, m) in record.entries() {
            let key = match group {
                RollupGroup::Period => (period, None, None),
                RollupGroup::Node => (period, Some(node.to_string()), None),
                RollupGroup::NodeItem => (period, Some(node.to_string()), Some(item.to_string())),
            };
            acc.entry(key).or_default().accumulate(m);
        }
    }
    acc.into_iter()
        .map(|((period, node, item), totals)| PeriodTotals {
            period,
            node,
            item,
            totals: totals.map(round6),
        })
        .collect()
}
