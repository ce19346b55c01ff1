//! Paginated fetching over a point-in-time.
//!
//! The [`Paginator`] walks the states
//!
//! ```text
//! Initializing -> Fetching -> HasMore -> Fetching -> ... -> Exhausted
//!                         \-> Failed
//! ```
//!
//! Each page request resumes strictly after the complete sort key of the
//! previous page's last hit, so hits sharing a timestamp are neither repeated
//! nor lost at a page boundary. `Exhausted` and `Failed` are terminal.

use std::collections::BTreeSet;

use serde_json::Value;
use tracing::{debug, error};

use crate::backend::Backend;
use crate::pit::SnapshotHandle;
use crate::query::SearchQuery;
use crate::schema::{parse_search_response, Hit, SearchRequest};
use crate::{Config, Error, Result};

/// Where a scan stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// No request issued yet; the point-in-time is opened on the first fetch.
    Initializing,
    /// A page request is in flight.
    Fetching,
    /// The last page had hits; more may follow.
    HasMore,
    /// An empty page was returned: the scan completed.
    Exhausted,
    /// A request failed; the error was handed to the caller.
    Failed,
}

impl CursorState {
    pub fn is_terminal(self) -> bool {
        matches!(self, CursorState::Exhausted | CursorState::Failed)
    }
}

/// Resume position within a scan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cursor {
    /// Sort key of the most recent hit, None before the first page.
    pub last_sort_key: Option<Vec<Value>>,
}

/// Drives page requests for one scan.
pub struct Paginator<B: Backend> {
    backend: B,
    target: String,
    page_size: usize,
    keep_alive: String,
    timestamp_field: String,
    query: Value,
    fields: Option<BTreeSet<String>>,
    snapshot: Option<SnapshotHandle>,
    cursor: Cursor,
    state: CursorState,
    pages: usize,
}

impl<B: Backend> Paginator<B> {
    /// Prepare a scan. Nothing is sent until [`Paginator::next_page`].
    pub fn new(backend: B, config: &Config, query: &SearchQuery) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            backend,
            target: config.index.clone(),
            page_size: config.page_size,
            keep_alive: config.keep_alive(),
            timestamp_field: config.timestamp_field.clone(),
            query: query.to_query_dsl(&config.timestamp_field),
            fields: query.fields.clone(),
            snapshot: None,
            cursor: Cursor::default(),
            state: CursorState::Initializing,
            pages: 0,
        })
    }

    pub fn state(&self) -> CursorState {
        self.state
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn snapshot(&self) -> Option<&SnapshotHandle> {
        self.snapshot.as_ref()
    }

    /// Number of non-empty pages received so far.
    pub fn pages(&self) -> usize {
        self.pages
    }

    /// Fetch the next page.
    ///
    /// Returns `Ok(None)` once the scan is over (and on every call after a
    /// failure); an error moves the paginator to `Failed`.
    pub fn next_page(&mut self) -> Result<Option<Vec<Hit>>> {
        if self.state.is_terminal() {
            return Ok(None);
        }

        match self.fetch() {
            Ok(page) => Ok(page),
            Err(e) => {
                error!(error = %e, pages = self.pages, "scan failed");
                self.state = CursorState::Failed;
                Err(e)
            }
        }
    }

    fn fetch(&mut self) -> Result<Option<Vec<Hit>>> {
        let snapshot = match self.snapshot.take() {
            Some(snapshot) => snapshot,
            None => SnapshotHandle::open(&self.backend, &self.target, &self.keep_alive)?,
        };
        self.state = CursorState::Fetching;

        let request = SearchRequest {
            size: self.page_size,
            timestamp_field: self.timestamp_field.clone(),
            pit_id: snapshot.id.clone(),
            keep_alive: snapshot.keep_alive.clone(),
            query: self.query.clone(),
            source: self.fields.clone(),
            search_after: self.cursor.last_sort_key.clone(),
        };
        let snapshot = self.snapshot.insert(snapshot);

        let body = request.to_body();
        debug!(page = self.pages + 1, %body, "requesting page");
        let page = parse_search_response(self.backend.search(&body)?)?;
        snapshot.refresh(page.pit_id);

        let Some(last) = page.hits.last() else {
            debug!(pages = self.pages, "scan exhausted");
            self.state = CursorState::Exhausted;
            return Ok(None);
        };

        if last.sort.is_empty() {
            return Err(Error::InvalidResponse(
                "hit without sort values, cannot resume".to_string(),
            ));
        }

        self.cursor.last_sort_key = Some(last.sort.clone());
        self.pages += 1;
        self.state = CursorState::HasMore;
        Ok(Some(page.hits))
    }
}
