//! Pagination, sort and filter state of the runs list.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_LIMIT: u64 = 20;
pub const DEFAULT_SORT: &str = "started_at";

/// Column the runs list is sorted by. Never empty.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SortKey(String);

impl SortKey {
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let key = key.into();
        if key.trim().is_empty() {
            None
        } else {
            Some(Self(key))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SortKey {
    fn default() -> Self {
        Self(DEFAULT_SORT.to_string())
    }
}

impl TryFrom<String> for SortKey {
    type Error = &'static str;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value).ok_or("sort key must not be empty")
    }
}

impl From<SortKey> for String {
    fn from(key: SortKey) -> Self {
        key.0
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(format!("unknown sort order: {other}")),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Run-list filters. An empty string means "no filter".
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Filters {
    pub schema_version: String,
    pub config_id: String,
    pub config_version_id: String,
    pub scenario_id: String,
}

impl Filters {
    pub const KEYS: [&'static str; 4] = ["schema_version", "config_id", "config_version_id", "scenario_id"];

    pub fn is_empty(&self) -> bool {
        self.pairs().all(|(_, v)| v.is_empty())
    }

    /// `(key, value)` in query-string order, empty values included.
    pub fn pairs(&self) -> impl Iterator<Item = (&'static str, &str)> {
        Self::KEYS.into_iter().zip([
            self.schema_version.as_str(),
            self.config_id.as_str(),
            self.config_version_id.as_str(),
            self.scenario_id.as_str(),
        ])
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut String> {
        match key {
            "schema_version" => Some(&mut self.schema_version),
            "config_id" => Some(&mut self.config_id),
            "config_version_id" => Some(&mut self.config_version_id),
            "scenario_id" => Some(&mut self.scenario_id),
            _ => None,
        }
    }
}

/// Everything that decides which page of runs is requested.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryState {
    pub offset: u64,
    /// Page size; always at least 1.
    pub limit: u64,
    pub sort: SortKey,
    pub order: SortOrder,
    #[serde(flatten)]
    pub filters: Filters,
}

impl Default for QueryState {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: DEFAULT_LIMIT,
            sort: SortKey::default(),
            order: SortOrder::Desc,
            filters: Filters::default(),
        }
    }
}
