//! Backend payload shapes: simulation results and the runs list.

use crate::{lenient, parse_daily_records, parse_profit_loss, DailyRecord, InputError};
use crate::{InputResult, ProfitLossRecord, SummaryKpi};
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

/// Response of a simulation request.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct ResultsPayload {
    pub results: Vec<DailyRecord>,
    pub profit_loss: Vec<ProfitLossRecord>,
    /// Backend-computed summary; when absent the client recomputes it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<SummaryKpi>,
}

impl ResultsPayload {
    pub fn from_value(value: &Value) -> InputResult<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| InputError::malformed("payload", "a results object"))?;
        let results = match obj.get("results") {
            Some(v) => parse_daily_records(v)?,
            None => return Err(InputError::malformed("results", "an array of daily records")),
        };
        let profit_loss = parse_profit_loss(obj.get("profit_loss"))?;
        let summary = match obj.get("summary") {
            None | Some(Value::Null) => None,
            Some(v) => match serde_json::from_value::<SummaryKpi>(v.clone()) {
                Ok(s) => Some(s),
                Err(e) => {
                    warn!(error = %e, "backend summary could not be decoded; treating it as absent");
                    None
                }
            },
        };
        Ok(Self {
            results,
            profit_loss,
            summary,
        })
    }

    pub fn from_json_str(text: &str) -> InputResult<Self> {
        let value: Value = serde_json::from_str(text).map_err(|e| InputError::Json(e.to_string()))?;
        Self::from_value(&value)
    }
}

impl TryFrom<Value> for ResultsPayload {
    type Error = InputError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(&value)
    }
}

fn opaque_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(lenient::opaque_id))
}

/// Headline KPIs carried by a runs-list entry.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSummaryKpis {
    pub fill_rate: Option<f64>,
    pub profit_total: Option<f64>,
}

/// One prior simulation run as listed by the backend.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    /// Start time in epoch milliseconds.
    #[serde(default)]
    pub started_at: Option<i64>,
    #[serde(default)]
    pub duration_ms: Option<i64>,
    #[serde(default, deserialize_with = "opaque_id")]
    pub schema_version: Option<String>,
    #[serde(default, deserialize_with = "opaque_id")]
    pub config_id: Option<String>,
    #[serde(default, deserialize_with = "opaque_id")]
    pub config_version_id: Option<String>,
    #[serde(default, deserialize_with = "opaque_id")]
    pub scenario_id: Option<String>,
    #[serde(default)]
    pub summary: RunSummaryKpis,
}

impl RunSummary {
    /// `started_at` rendered as `YYYY/MM/DD HH:MM:SS` in JST (UTC+9).
    pub fn started_at_jst(&self) -> Option<String> {
        let utc = DateTime::<Utc>::from_timestamp_millis(self.started_at?)?;
        let jst = FixedOffset::east_opt(9 * 3600)?;
        Some(utc.with_timezone(&jst).format("%Y/%m/%d %H:%M:%S").to_string())
    }
}

/// One page of the runs list.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunsPage {
    pub runs: Vec<RunSummary>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}
