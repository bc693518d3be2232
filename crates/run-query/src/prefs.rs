//! Persisted runs-list preferences and state resolution.

use crate::codec::{parse_query, ParsedQuery};
use crate::state::{Filters, QueryState, SortKey, SortOrder};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Stored preference blob. Same field names as the query string, without
/// `offset`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoredPrefs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<SortOrder>,
    pub schema_version: String,
    pub config_id: String,
    pub config_version_id: String,
    pub scenario_id: String,
}

impl StoredPrefs {
    pub fn from_state(state: &QueryState) -> Self {
        let Filters {
            schema_version,
            config_id,
            config_version_id,
            scenario_id,
        } = state.filters.clone();
        Self {
            limit: Some(state.limit),
            sort: Some(state.sort.clone()),
            order: Some(state.order),
            schema_version,
            config_id,
            config_version_id,
            scenario_id,
        }
    }

    /// Decode a stored blob; anything unreadable is ignored with a warning.
    pub fn decode(blob: &str) -> Option<Self> {
        match serde_json::from_str::<StoredPrefs>(blob) {
            Ok(prefs) => Some(prefs),
            Err(e) => {
                warn!(error = %e, "ignoring unreadable runs-list preferences");
                None
            }
        }
    }

    /// Apply every field the URL left unset.
    fn fill_gaps(&self, url: &ParsedQuery, state: &mut QueryState) {
        if url.limit.is_none() {
            if let Some(limit) = self.limit.filter(|l| *l > 0) {
                state.limit = limit;
            }
        }
        if url.sort.is_none() {
            if let Some(sort) = &self.sort {
                state.sort = sort.clone();
            }
        }
        if url.order.is_none() {
            if let Some(order) = self.order {
                state.order = order;
            }
        }
        let pairs = [
            (&url.schema_version, &self.schema_version, &mut state.filters.schema_version),
            (&url.config_id, &self.config_id, &mut state.filters.config_id),
            (&url.config_version_id, &self.config_version_id, &mut state.filters.config_version_id),
            (&url.scenario_id, &self.scenario_id, &mut state.filters.scenario_id),
        ];
        for (from_url, stored, slot) in pairs {
            if from_url.is_none() {
                slot.clone_from(stored);
            }
        }
    }
}

/// Resolve the view's state: URL parameters first, then the stored blob
/// (only when the URL sets none of limit, sort, order, schema_version or
/// config_id), then defaults.
pub fn resolve_state(location: &str, stored_blob: Option<&str>) -> QueryState {
    let url = parse_query(location);
    let mut state = QueryState::default();
    if url.overrides_preferences() {
        debug!("query string present; stored preferences not consulted");
    } else if let Some(prefs) = stored_blob.and_then(StoredPrefs::decode) {
        debug!("applying stored runs-list preferences");
        prefs.fill_gaps(&url, &mut state);
    }
    url.apply_to(&mut state);
    state
}
