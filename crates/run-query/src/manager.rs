//! Stateful owner of the runs-list query.

use crate::codec::to_query_string;
use crate::prefs::{resolve_state, StoredPrefs};
use crate::state::{Filters, QueryState, SortKey, SortOrder};
use crate::{QueryError, QueryResult};
use persistence::PreferenceStore;
use report_core::RunsPage;
use serde::Serialize;
use tracing::{debug, warn};

/// What [`QueryStateManager::apply_server_response`] did with a page.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseOutcome {
    /// The total was taken over.
    Applied,
    /// The response answers an older query and was discarded.
    Stale,
    /// The offset lay past the end and was moved to the last page; the
    /// caller should fetch again.
    OffsetClamped,
}

/// Owns the runs-list [`QueryState`] and keeps the location and the stored
/// preferences in step with it.
///
/// Navigation (`*_page`) only rewrites the location. Changing the page size,
/// sort or filters also resets the offset and rewrites the stored blob.
#[derive(Debug)]
pub struct QueryStateManager<S: PreferenceStore> {
    state: QueryState,
    total: u64,
    store: S,
    runs_path: String,
    prefs_key: String,
    location: String,
}

impl<S: PreferenceStore> QueryStateManager<S> {
    /// Resolve the initial state from `location` and the stored preferences.
    /// Store failures are logged; resolution always yields a usable state.
    pub fn load(location: &str, store: S, runs_path: impl Into<String>, prefs_key: impl Into<String>) -> Self {
        let prefs_key = prefs_key.into();
        let blob = match store.get(&prefs_key) {
            Ok(blob) => blob,
            Err(e) => {
                warn!(error = %e, "could not read runs-list preferences");
                None
            }
        };
        let state = resolve_state(location, blob.as_deref());
        let mut mgr = Self {
            state,
            total: 0,
            store,
            runs_path: runs_path.into(),
            prefs_key,
            location: String::new(),
        };
        mgr.rewrite_location();
        debug!(location = %mgr.location, "runs-list state resolved");
        mgr
    }

    pub fn state(&self) -> &QueryState {
        &self.state
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Current shareable location (`<runs_path>?<query>`).
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Query string to send with the runs-list request.
    pub fn backend_query(&self) -> String {
        to_query_string(&self.state)
    }

    fn rewrite_location(&mut self) {
        self.location = format!("{}?{}", self.runs_path, to_query_string(&self.state));
    }

    fn persist(&mut self) -> QueryResult<()> {
        let blob = serde_json::to_string(&StoredPrefs::from_state(&self.state))?;
        self.store.set(&self.prefs_key, &blob)?;
        Ok(())
    }

    pub fn page_count(&self) -> u64 {
        self.total.div_ceil(self.state.limit).max(1)
    }

    /// 1-based page the offset falls on.
    pub fn current_page(&self) -> u64 {
        self.state.offset / self.state.limit + 1
    }

    /// Offset just past the current page. Both operands come from the URL,
    /// so the sum saturates.
    fn page_end(&self) -> u64 {
        self.state.offset.saturating_add(self.state.limit)
    }

    pub fn can_next_page(&self) -> bool {
        self.page_end() < self.total
    }

    pub fn can_prev_page(&self) -> bool {
        self.state.offset > 0
    }

    /// `"<first>-<last> / <total>"`, or `"0-0 / 0"` for an empty list.
    pub fn pager_text(&self) -> String {
        if self.total == 0 {
            return "0-0 / 0".to_string();
        }
        let first = self.state.offset.saturating_add(1);
        let last = self.page_end().min(self.total);
        format!("{first}-{last} / {}", self.total)
    }

    fn last_page_offset(&self) -> u64 {
        self.total.saturating_sub(1) / self.state.limit * self.state.limit
    }

    fn move_to(&mut self, offset: u64) -> bool {
        if offset == self.state.offset {
            return false;
        }
        self.state.offset = offset;
        self.rewrite_location();
        true
    }

    /// Jump to 1-based page `page`, clamped into `[1, page_count]`.
    pub fn set_page(&mut self, page: u64) -> bool {
        let page = page.clamp(1, self.page_count());
        self.move_to((page - 1) * self.state.limit)
    }

    pub fn next_page(&mut self) -> bool {
        if !self.can_next_page() {
            return false;
        }
        self.move_to(self.page_end())
    }

    pub fn prev_page(&mut self) -> bool {
        self.move_to(self.state.offset.saturating_sub(self.state.limit))
    }

    pub fn first_page(&mut self) -> bool {
        self.move_to(0)
    }

    pub fn last_page(&mut self) -> bool {
        self.move_to(self.last_page_offset())
    }

    /// Shared tail of every non-navigation change.
    fn changed(&mut self) -> QueryResult<()> {
        self.state.offset = 0;
        self.rewrite_location();
        self.persist()
    }

    pub fn set_limit(&mut self, limit: u64) -> QueryResult<()> {
        if limit == 0 {
            return Err(QueryError::InvalidLimit(limit));
        }
        self.state.limit = limit;
        self.changed()
    }

    /// Same key flips the order; a new key sorts descending by it.
    pub fn toggle_sort(&mut self, key: SortKey) -> QueryResult<()> {
        if key == self.state.sort {
            self.state.order = self.state.order.flipped();
        } else {
            self.state.sort = key;
            self.state.order = SortOrder::Desc;
        }
        self.changed()
    }

    pub fn set_order(&mut self, order: SortOrder) -> QueryResult<()> {
        self.state.order = order;
        self.changed()
    }

    pub fn set_filters(&mut self, filters: Filters) -> QueryResult<()> {
        self.state.filters = filters;
        self.changed()
    }

    pub fn clear_filters(&mut self) -> QueryResult<()> {
        self.set_filters(Filters::default())
    }

    /// Take over the total of a runs-list response issued for `issued`.
    pub fn apply_server_response(&mut self, page: &RunsPage, issued: &QueryState) -> ResponseOutcome {
        if *issued != self.state {
            debug!(issued_offset = issued.offset, "discarding stale runs-list response");
            return ResponseOutcome::Stale;
        }
        self.total = page.total;
        if self.total > 0 && self.state.offset >= self.total {
            let clamped = self.last_page_offset();
            debug!(from = self.state.offset, to = clamped, total = self.total, "offset past end; clamping");
            self.state.offset = clamped;
            self.rewrite_location();
            return ResponseOutcome::OffsetClamped;
        }
        ResponseOutcome::Applied
    }
}
