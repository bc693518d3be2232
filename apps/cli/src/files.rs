//! File input and CSV output for the CLI.

use anyhow::{bail, Context, Result};
use report_core::{NodeTypeMap, ResultsPayload, SummaryKpi};
use report_view::Table;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::info;

pub fn read_json(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing JSON in {}", path.display()))
}

pub fn load_payload(path: &Path) -> Result<ResultsPayload> {
    let value = read_json(path)?;
    ResultsPayload::from_value(&value).with_context(|| format!("decoding results payload {}", path.display()))
}

/// Node types from the simulation request, or an empty map without one.
pub fn load_node_types(request: Option<&Path>) -> Result<NodeTypeMap> {
    let Some(path) = request else {
        return Ok(NodeTypeMap::new());
    };
    let value = read_json(path)?;
    let types = NodeTypeMap::from_request(&value).with_context(|| format!("reading nodes of {}", path.display()))?;
    info!(nodes = types.len(), "loaded node types");
    Ok(types)
}

/// A run entered for comparison: either a full results payload or a bare
/// `{run_id, summary}` object.
pub enum CompareInput {
    Payload(ResultsPayload),
    Summary { run_id: String, summary: SummaryKpi },
}

pub fn load_compare_input(path: &Path) -> Result<CompareInput> {
    let value = read_json(path)?;
    if value.get("results").is_some() {
        let payload = ResultsPayload::from_value(&value)
            .with_context(|| format!("decoding results payload {}", path.display()))?;
        return Ok(CompareInput::Payload(payload));
    }
    let Some(summary) = value.get("summary") else {
        bail!("{} has neither results nor summary", path.display());
    };
    let summary: SummaryKpi =
        serde_json::from_value(summary.clone()).with_context(|| format!("decoding summary in {}", path.display()))?;
    let run_id = value
        .get("run_id")
        .and_then(report_core::lenient::opaque_id)
        .unwrap_or_else(|| run_id_from_path(path));
    Ok(CompareInput::Summary { run_id, summary })
}

pub fn run_id_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    info!(rows = rows.len(), path = %path.display(), "wrote CSV");
    Ok(())
}

pub fn write_table(path: &Path, table: &Table) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    wtr.write_record(&table.headers)?;
    for row in &table.rows {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    info!(rows = table.rows.len(), path = %path.display(), "wrote CSV");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use report_view::{result_rows, ResultRow};

    #[test]
    fn payload_and_result_csv() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("run.json");
        fs::write(
            &input,
            r#"{"results": [{"day": 1, "nodes": {"S1": {"A": {"demand": 4, "sales": 3}}}}]}"#,
        )
        .unwrap();
        let payload = load_payload(&input).unwrap();
        let rows: Vec<ResultRow> = result_rows(&payload.results);
        let out = dir.path().join("out.csv");
        write_rows(&out, &rows).unwrap();
        let text = fs::read_to_string(&out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("Day,Node,Item,StartStock,Incoming,Demand,Sales,Consumption,Produced,Shortage,Backorder,EndStock,Ordered")
        );
        assert!(lines.next().unwrap().starts_with("1,S1,A,"));
    }

    #[test]
    fn compare_input_shapes() {
        let dir = tempfile::tempdir().unwrap();
        let bare = dir.path().join("base.json");
        fs::write(&bare, r#"{"run_id": 12, "summary": {"profit_total": 5}}"#).unwrap();
        match load_compare_input(&bare).unwrap() {
            CompareInput::Summary { run_id, summary } => {
                assert_eq!(run_id, "12");
                assert_eq!(summary.profit_total, 5.0);
            }
            CompareInput::Payload(_) => panic!("expected bare summary"),
        }

        let neither = dir.path().join("x.json");
        fs::write(&neither, "{}").unwrap();
        assert!(load_compare_input(&neither).is_err());
    }

    #[test]
    fn missing_request_means_no_types() {
        assert!(load_node_types(None).unwrap().is_empty());
    }
}
