//! Filter translation into the backend's query DSL.
//!
//! # Shape
//!
//! Every query is a `bool` query whose `filter` list holds:
//!
//! - one `match` clause per field filter (`field=value` on the command line)
//! - one `range` clause on the timestamp field, when `since` and/or `until`
//!   is given (`gte` / `lte`, both inclusive)
//!
//! An empty filter list matches every document.

mod filters;

pub use filters::{translate, MatchFilters, SearchQuery, TimeRange};
