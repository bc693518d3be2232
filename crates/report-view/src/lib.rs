#![deny(warnings)]

//! Filtered views and tabular exports of simulation results.

pub mod format;
pub mod projection;
pub mod tabular;

pub use format::{format_metric, format_number, format_percent, is_percent_key};
pub use projection::{distinct_nodes_and_items, project, DistinctValues, FilterCriteria, Selection};
pub use tabular::{profit_loss_table, result_rows, summary_row, ResultRow, SummaryRow, Table};
