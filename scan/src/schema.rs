//! Wire shapes of search requests, responses, and hits.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::QueryError;
use crate::{Error, Result};

/// A single search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    /// Concrete index the document lives in.
    #[serde(rename = "_index", default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,

    /// Document identifier.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// The log entry itself, restricted to the requested fields.
    #[serde(rename = "_source", default)]
    pub source: Map<String, Value>,

    /// Sort values defining the hit's position in the scan.
    #[serde(default)]
    pub sort: Vec<Value>,
}

impl Hit {
    /// Look up a source field.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.source.get(name)
    }
}

/// Body of one page request.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub size: usize,
    pub timestamp_field: String,
    pub pit_id: String,
    pub keep_alive: String,
    pub query: Value,
    pub source: Option<BTreeSet<String>>,
    pub search_after: Option<Vec<Value>>,
}

impl SearchRequest {
    /// Render the JSON document sent to the search endpoint.
    pub fn to_body(&self) -> Value {
        let mut body = json!({
            "size": self.size,
            "sort": [{ self.timestamp_field.as_str(): "asc" }],
            "pit": {
                "id": self.pit_id,
                "keep_alive": self.keep_alive,
            },
            "query": self.query,
        });

        if let Some(fields) = &self.source {
            body["_source"] = json!(fields);
        }

        if let Some(sort) = &self.search_after {
            body["search_after"] = Value::Array(sort.clone());
        }

        body
    }
}

/// A successful page.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPage {
    /// Point-in-time id the backend wants used from now on, if it sent one.
    pub pit_id: Option<String>,
    pub hits: Vec<Hit>,
}

/// Split a search response into a page or the backend's error payload.
///
/// Only a `hits` object holding a `hits` list is a page. A response without a
/// `hits` section is a failed query, even when it carries no `error` section
/// either; a malformed `hits` section is reported as the backend's error when
/// there is one, and as an invalid response otherwise.
pub fn parse_search_response(doc: Value) -> Result<SearchPage> {
    let mut doc = match doc {
        Value::Object(map) => map,
        other => {
            return Err(Error::InvalidResponse(format!(
                "expected a JSON object, got {}",
                other
            )))
        }
    };

    let hits = match doc.remove("hits") {
        None => return Err(Error::BackendQuery(QueryError::from_section(doc.get("error")))),
        Some(Value::Object(mut section)) => match section.remove("hits") {
            Some(list @ Value::Array(_)) => Ok(serde_json::from_value::<Vec<Hit>>(list)?),
            Some(other) => Err(format!("hits.hits is not a list: {}", other)),
            None => Err("hits section has no hits list".to_string()),
        },
        Some(other) => Err(format!("hits is not an object: {}", other)),
    };

    let hits = match hits {
        Ok(hits) => hits,
        Err(_) if doc.contains_key("error") => {
            return Err(Error::BackendQuery(QueryError::from_section(doc.get("error"))))
        }
        Err(reason) => return Err(Error::InvalidResponse(reason)),
    };

    let pit_id = doc
        .get("pit_id")
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(SearchPage { pit_id, hits })
}
