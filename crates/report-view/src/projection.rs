//! Day-range, node and item projection of daily records.

use report_core::{DailyRecord, ItemMetrics, ItemName, NodeMetrics, NodeName};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Either every value or one exact name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Selection {
    #[default]
    All,
    Only(String),
}

impl Selection {
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(wanted) => wanted == name,
        }
    }
}

impl From<String> for Selection {
    fn from(s: String) -> Self {
        if s == "all" {
            Selection::All
        } else {
            Selection::Only(s)
        }
    }
}

impl From<Selection> for String {
    fn from(s: Selection) -> Self {
        s.to_string()
    }
}

impl FromStr for Selection {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Selection::from(s.to_string()))
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::All => f.write_str("all"),
            Selection::Only(name) => f.write_str(name),
        }
    }
}

/// What to keep when projecting daily records.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub day_from: u32,
    pub day_to: u32,
    #[serde(default)]
    pub node: Selection,
    #[serde(default)]
    pub item: Selection,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            day_from: 1,
            day_to: u32::MAX,
            node: Selection::All,
            item: Selection::All,
        }
    }
}

impl FilterCriteria {
    /// Criteria spanning every day present in `records`.
    pub fn full_range(records: &[DailyRecord]) -> Self {
        let last = records.iter().map(|r| r.day).max().unwrap_or(1);
        Self {
            day_from: 1,
            day_to: last.max(1),
            ..Self::default()
        }
    }

    /// `day_from` raised to at least 1, `day_to` to at least `day_from`.
    pub fn clamped(&self) -> (u32, u32) {
        let from = self.day_from.max(1);
        (from, self.day_to.max(from))
    }
}

/// Keep the days, nodes and items selected by `criteria`.
///
/// Nodes left without items and days left without nodes are dropped.
/// Records, nodes and items keep their input order.
pub fn project(records: &[DailyRecord], criteria: &FilterCriteria) -> Vec<DailyRecord> {
    let (from, to) = criteria.clamped();
    let out: Vec<DailyRecord> = records
        .iter()
        .filter(|r| (from..=to).contains(&r.day))
        .filter_map(|r| {
            let nodes: NodeMetrics = r
                .nodes
                .iter()
                .filter(|(node, _)| criteria.node.matches(node))
                .filter_map(|(node, items)| {
                    let kept: ItemMetrics = items
                        .iter()
                        .filter(|(item, _)| criteria.item.matches(item))
                        .map(|(item, m)| (item.clone(), m.clone()))
                        .collect();
                    (!kept.is_empty()).then(|| (node.clone(), kept))
                })
                .collect();
            (!nodes.is_empty()).then(|| DailyRecord { day: r.day, nodes })
        })
        .collect();
    debug!(from, to, node = %criteria.node, item = %criteria.item, kept = out.len(), "projected records");
    out
}

/// Sorted node and item names occurring anywhere in `records`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DistinctValues {
    pub nodes: BTreeSet<NodeName>,
    pub items: BTreeSet<ItemName>,
}

pub fn distinct_nodes_and_items(records: &[DailyRecord]) -> DistinctValues {
    let mut out = DistinctValues::default();
    for (node, item, _) in records.iter().flat_map(|r| r.entries()) {
        if !out.nodes.contains(node) {
            out.nodes.insert(node.to_string());
        }
        if !out.items.contains(item) {
            out.items.insert(item.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use report_core::NodeItemMetrics;

    fn m(demand: f64) -> NodeItemMetrics {
        NodeItemMetrics {
            demand,
            ..NodeItemMetrics::default()
        }
    }

    fn rec(day: u32, entries: &[(&str, &str)]) -> DailyRecord {
        let mut nodes = NodeMetrics::new();
        for (node, item) in entries {
            nodes
                .entry(node.to_string())
                .or_default()
                .insert(item.to_string(), m(f64::from(day)));
        }
        DailyRecord { day, nodes }
    }

    fn sample() -> Vec<DailyRecord> {
        vec![
            rec(1, &[("S1", "A"), ("S1", "B"), ("W1", "A")]),
            rec(2, &[("S1", "B"), ("W1", "A")]),
            rec(3, &[("W1", "C")]),
            rec(4, &[]),
        ]
    }

    #[test]
    fn selection_parses_all() {
        assert_eq!("all".parse::<Selection>().unwrap(), Selection::All);
        assert_eq!("S1".parse::<Selection>().unwrap(), Selection::Only("S1".into()));
        assert_eq!(Selection::All.to_string(), "all");
    }

    #[test]
    fn filters_by_day_node_and_item() {
        let c = FilterCriteria {
            day_from: 1,
            day_to: 3,
            node: Selection::Only("S1".into()),
            item: Selection::Only("B".into()),
        };
        let out = project(&sample(), &c);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].day, 1);
        assert_eq!(out[0].nodes.len(), 1);
        assert_eq!(out[0].nodes["S1"].keys().collect::<Vec<_>>(), vec!["B"]);
        assert_eq!(out[1].day, 2);
    }

    #[test]
    fn empty_days_and_nodes_are_dropped() {
        let c = FilterCriteria {
            item: Selection::Only("A".into()),
            ..FilterCriteria::full_range(&sample())
        };
        let out = project(&sample(), &c);
        let days: Vec<u32> = out.iter().map(|r| r.day).collect();
        assert_eq!(days, vec![1, 2]);
        assert!(!out[1].nodes.contains_key("S1"));
    }

    #[test]
    fn range_is_clamped() {
        let c = FilterCriteria {
            day_from: 0,
            day_to: 0,
            ..FilterCriteria::default()
        };
        assert_eq!(c.clamped(), (1, 1));
        let out = project(&sample(), &c);
        assert_eq!(out.len(), 1);

        let inverted = FilterCriteria {
            day_from: 3,
            day_to: 2,
            ..FilterCriteria::default()
        };
        assert_eq!(project(&sample(), &inverted).iter().map(|r| r.day).collect::<Vec<_>>(), vec![3]);
    }

    #[test]
    fn input_is_untouched_and_order_kept() {
        let mut input = sample();
        input.swap(0, 2);
        let before = input.clone();
        let out = project(&input, &FilterCriteria::default());
        assert_eq!(input, before);
        assert_eq!(out.iter().map(|r| r.day).collect::<Vec<_>>(), vec![3, 2, 1]);
    }

    #[test]
    fn distinct_values_are_sorted() {
        let d = distinct_nodes_and_items(&sample());
        assert_eq!(d.nodes.into_iter().collect::<Vec<_>>(), vec!["S1", "W1"]);
        assert_eq!(d.items.into_iter().collect::<Vec<_>>(), vec!["A", "B", "C"]);
        assert_eq!(distinct_nodes_and_items(&[]), DistinctValues::default());
    }

    fn arb_records() -> impl Strategy<Value = Vec<DailyRecord>> {
        let entry = (0u8..3, 0u8..3);
        prop::collection::vec((1u32..15, prop::collection::vec(entry, 0..5)), 0..12).prop_map(|days| {
            days.into_iter()
                .map(|(day, entries)| {
                    let named: Vec<(String, String)> = entries
                        .into_iter()
                        .map(|(n, i)| (format!("N{n}"), format!("I{i}")))
                        .collect();
                    let refs: Vec<(&str, &str)> = named.iter().map(|(n, i)| (n.as_str(), i.as_str())).collect();
                    rec(day, &refs)
                })
                .collect()
        })
    }

    fn arb_selection() -> impl Strategy<Value = Selection> {
        prop_oneof![Just(Selection::All), (0u8..4).prop_map(|i| Selection::Only(format!("N{i}")))]
    }

    proptest! {
        #[test]
        fn projection_is_idempotent(records in arb_records(), from in 0u32..10, span in 0u32..10, node in arb_selection()) {
            let c = FilterCriteria { day_from: from, day_to: from + span, node, item: Selection::All };
            let once = project(&records, &c);
            let twice = project(&once, &c);
            prop_assert_eq!(&once, &twice);
            for r in &once {
                prop_assert!(!r.nodes.is_empty());
                prop_assert!(r.nodes.values().all(|items| !items.is_empty()));
            }
        }
    }
}
