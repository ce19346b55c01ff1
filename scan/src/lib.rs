//! elnok-scan: query construction and point-in-time pagination for
//! Elasticsearch-backed logs.
//!
//! A scan opens a point-in-time on the target indices, then pages through
//! every matching hit in ascending time order, resuming each page after the
//! sort key of the previous one. Results are exposed as a lazy iterator.

pub mod backend;
pub mod config;
pub mod cursor;
pub mod error;
pub mod fields;
pub mod pit;
pub mod query;
pub mod schema;
pub mod stream;

#[cfg(any(test, feature = "test-server"))]
pub mod test_server;
#[cfg(test)]
pub(crate) mod testing;

pub use backend::{Backend, HttpBackend};
pub use config::Config;
pub use cursor::{Cursor, CursorState, Paginator};
pub use error::{Error, QueryError, Result};
pub use fields::{list_fields, unknown_fields};
pub use pit::SnapshotHandle;
pub use query::{translate, MatchFilters, SearchQuery, TimeRange};
pub use schema::{Hit, SearchPage, SearchRequest};
pub use stream::{scan, scan_host, HitStream};
