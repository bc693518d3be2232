//! Query-string encoding of [`QueryState`].

use crate::state::{Filters, QueryState, SortKey, SortOrder};
use url::form_urlencoded;

/// Parameters recognized in a query string. `None` means the key was absent
/// or its value unusable.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedQuery {
    pub offset: Option<u64>,
    pub limit: Option<u64>,
    pub sort: Option<SortKey>,
    pub order: Option<SortOrder>,
    pub schema_version: Option<String>,
    pub config_id: Option<String>,
    pub config_version_id: Option<String>,
    pub scenario_id: Option<String>,
}

impl ParsedQuery {
    /// Whether the URL pins down enough of the state that stored
    /// preferences must not be consulted.
    pub fn overrides_preferences(&self) -> bool {
        self.limit.is_some()
            || self.sort.is_some()
            || self.order.is_some()
            || self.schema_version.is_some()
            || self.config_id.is_some()
    }

    fn filter_slot(&mut self, key: &str) -> Option<&mut Option<String>> {
        match key {
            "schema_version" => Some(&mut self.schema_version),
            "config_id" => Some(&mut self.config_id),
            "config_version_id" => Some(&mut self.config_version_id),
            "scenario_id" => Some(&mut self.scenario_id),
            _ => None,
        }
    }

    /// Fill `state` with every recognized parameter.
    pub fn apply_to(&self, state: &mut QueryState) {
        if let Some(offset) = self.offset {
            state.offset = offset;
        }
        if let Some(limit) = self.limit {
            state.limit = limit;
        }
        if let Some(sort) = &self.sort {
            state.sort = sort.clone();
        }
        if let Some(order) = self.order {
            state.order = order;
        }
        let Filters {
            schema_version,
            config_id,
            config_version_id,
            scenario_id,
        } = &mut state.filters;
        for (slot, value) in [
            (schema_version, &self.schema_version),
            (config_id, &self.config_id),
            (config_version_id, &self.config_version_id),
            (scenario_id, &self.scenario_id),
        ] {
            if let Some(v) = value {
                *slot = v.clone();
            }
        }
    }
}

/// Portion of `location` between `?` and `#`. A bare string without `?` or
/// `/` is taken as the query itself.
fn query_part(location: &str) -> &str {
    let query = match location.split_once('?') {
        Some((_, q)) => q,
        None if !location.contains('/') => location,
        None => "",
    };
    query.split('#').next().unwrap_or("")
}

/// Parse the query string of `location`. The first occurrence of a key wins.
pub fn parse_query(location: &str) -> ParsedQuery {
    let mut parsed = ParsedQuery::default();
    let mut seen: Vec<String> = Vec::new();
    for (key, value) in form_urlencoded::parse(query_part(location).as_bytes()) {
        if seen.iter().any(|k| *k == key) {
            continue;
        }
        seen.push(key.to_string());
        match &*key {
            "offset" => parsed.offset = value.trim().parse::<u64>().ok(),
            "limit" => parsed.limit = value.trim().parse::<u64>().ok().filter(|l| *l > 0),
            "sort" => parsed.sort = SortKey::new(value.into_owned()),
            "order" => parsed.order = value.parse::<SortOrder>().ok(),
            other => {
                if let Some(slot) = parsed.filter_slot(other) {
                    *slot = Some(value.into_owned());
                }
            }
        }
    }
    parsed
}

/// Encode `state` as a query string. Pagination and sort are always
/// written; filters only when set.
pub fn to_query_string(state: &QueryState) -> String {
    let mut ser = form_urlencoded::Serializer::new(String::new());
    ser.append_pair("offset", &state.offset.to_string())
        .append_pair("limit", &state.limit.to_string())
        .append_pair("sort", state.sort.as_str())
        .append_pair("order", state.order.as_str());
    for (key, value) in state.filters.pairs() {
        if !value.is_empty() {
            ser.append_pair(key, value);
        }
    }
    ser.finish()
}
