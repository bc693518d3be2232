#![deny(warnings)]

//! Query state of the runs list.
//!
//! [`QueryStateManager`] resolves pagination, sort and filter parameters from
//! the view's URL, the stored preference blob and built-in defaults, exposes
//! the mutators the list UI drives, and keeps the shareable location and the
//! stored blob consistent with the in-memory state. It produces query
//! parameters only; fetching runs is the caller's concern.

use persistence::StoreError;
use thiserror::Error;

pub mod codec;
pub mod manager;
pub mod prefs;
pub mod state;

pub use codec::{parse_query, to_query_string, ParsedQuery};
pub use manager::{QueryStateManager, ResponseOutcome};
pub use prefs::{resolve_state, StoredPrefs};
pub use state::{Filters, QueryState, SortKey, SortOrder, DEFAULT_LIMIT, DEFAULT_SORT};

#[derive(Debug, Error)]
pub enum QueryError {
    /// Page sizes start at 1.
    #[error("invalid page size: {0}")]
    InvalidLimit(u64),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("failed to encode preferences: {0}")]
    Json(#[from] serde_json::Error),
}

pub type QueryResult<T> = Result<T, QueryError>;
