//! Match filters, time ranges, and their translation.

use std::collections::BTreeSet;

use serde_json::{json, Map, Value};

use crate::{Error, Result};

/// Field → value match filters, at most one per field.
///
/// Insertion order is kept so the generated query reads like the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchFilters {
    entries: Vec<(String, String)>,
}

impl MatchFilters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter. A second filter on the same field is rejected.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let field = field.into();
        if self.contains(&field) {
            // TODO: support multiple matches on the same field as an OR
            return Err(Error::Config(format!(
                "Cannot pass multiple matches on the same field ({})",
                field
            )));
        }
        self.entries.push((field, value.into()));
        Ok(())
    }

    /// Build from (field, value) pairs.
    pub fn from_pairs<I, F, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (F, V)>,
        F: Into<String>,
        V: Into<String>,
    {
        let mut filters = Self::new();
        for (field, value) in pairs {
            filters.insert(field, value)?;
        }
        Ok(filters)
    }

    /// Parse `field=value` arguments.
    ///
    /// The value is everything after the first `=`, so it may itself contain `=`.
    pub fn parse_args<S: AsRef<str>>(args: &[S]) -> Result<Self> {
        let mut filters = Self::new();
        for arg in args {
            let arg = arg.as_ref();
            let (field, value) = arg.split_once('=').ok_or_else(|| {
                Error::Config(format!("Match '{}' is not of the form field=value", arg))
            })?;
            if field.is_empty() {
                return Err(Error::Config(format!("Match '{}' has no field name", arg)));
            }
            filters.insert(field, value)?;
        }
        Ok(filters)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.entries.iter().any(|(f, _)| f == field)
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(f, v)| (f.as_str(), v.as_str()))
    }

    /// Names of the filtered fields.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(f, _)| f.as_str())
    }
}

/// Inclusive time bounds, in any syntax the backend accepts
/// (e.g. `2021-04-12T14:57:46` or `now-2d`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeRange {
    pub since: Option<String>,
    pub until: Option<String>,
}

impl TimeRange {
    pub fn new(since: Option<String>, until: Option<String>) -> Self {
        Self { since, until }
    }

    pub fn is_unbounded(&self) -> bool {
        self.since.is_none() && self.until.is_none()
    }
}

/// Everything that selects which hits a scan returns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchQuery {
    /// Field match filters, all of which must hold.
    pub matches: MatchFilters,
    /// Optional time bounds on the timestamp field.
    pub time_range: TimeRange,
    /// Fields to return for each hit (None = all).
    pub fields: Option<BTreeSet<String>>,
}

impl SearchQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_matches(mut self, matches: MatchFilters) -> Self {
        self.matches = matches;
        self
    }

    pub fn with_time_range(mut self, time_range: TimeRange) -> Self {
        self.time_range = time_range;
        self
    }

    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// The query DSL body for this query.
    pub fn to_query_dsl(&self, timestamp_field: &str) -> Value {
        translate(&self.matches, &self.time_range, timestamp_field)
    }
}

/// Translate filters into a `bool`/`filter` query: every clause must hold.
pub fn translate(matches: &MatchFilters, time_range: &TimeRange, timestamp_field: &str) -> Value {
    let mut clauses = Vec::with_capacity(matches.len() + 1);

    for (field, value) in matches.iter() {
        clauses.push(json!({ "match": { field: { "query": value } } }));
    }

    if !time_range.is_unbounded() {
        let mut bounds = Map::new();
        if let Some(since) = &time_range.since {
            bounds.insert("gte".to_string(), Value::String(since.clone()));
        }
        if let Some(until) = &time_range.until {
            bounds.insert("lte".to_string(), Value::String(until.clone()));
        }
        clauses.push(json!({ "range": { timestamp_field: bounds } }));
    }

    json!({ "bool": { "filter": clauses } })
}
