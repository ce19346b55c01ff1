//! In-memory log server standing in for the search backend.

use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde_json::{json, Map, Value};

use crate::backend::Backend;
use crate::Result;

/// One stored log entry: sort key is `[timestamp, tiebreak]`.
#[derive(Debug, Clone)]
pub struct Doc {
    pub timestamp: i64,
    pub tiebreak: u64,
    pub source: Map<String, Value>,
}

/// Build `n` docs with increasing timestamps and a `seq` field.
pub fn sequential_docs(n: usize) -> Vec<Doc> {
    (0..n)
        .map(|i| doc(1_000 + i as i64 * 10, i as u64, json!({"seq": i, "level": "INFO"})))
        .collect()
}

pub fn doc(timestamp: i64, tiebreak: u64, source: Value) -> Doc {
    let source = match source {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    Doc { timestamp, tiebreak, source }
}

fn sort_key(doc: &Doc) -> (i64, u64) {
    (doc.timestamp, doc.tiebreak)
}

fn parse_sort_key(values: &[Value]) -> (i64, u64) {
    let ts = values.first().and_then(Value::as_i64).unwrap_or(i64::MIN);
    let tb = values.get(1).and_then(Value::as_u64).unwrap_or(0);
    (ts, tb)
}

/// In-memory stand-in for a search server honouring point-in-time,
/// `size`, `match` filters, `_source`, and `search_after`.
pub struct LogServer {
    docs: Vec<Doc>,
    open_pits: RefCell<BTreeSet<String>>,
    pits_opened: Cell<usize>,
    searches: RefCell<Vec<Value>>,
    /// Replace the n-th search (0-based) reply with this document.
    inject: RefCell<Option<(usize, Value)>>,
    /// Reject point-in-time requests with this document.
    reject_pit: Option<Value>,
    /// Forget every point-in-time after this many searches.
    expire_after: Option<usize>,
    /// Hand out a new point-in-time id with every page.
    rotate_ids: bool,
}

impl LogServer {
    pub fn new(mut docs: Vec<Doc>) -> Self {
        docs.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));
        Self {
            docs,
            open_pits: RefCell::new(BTreeSet::new()),
            pits_opened: Cell::new(0),
            searches: RefCell::new(Vec::new()),
            inject: RefCell::new(None),
            reject_pit: None,
            expire_after: None,
            rotate_ids: false,
        }
    }

    pub fn inject_reply(self, nth_search: usize, reply: Value) -> Self {
        *self.inject.borrow_mut() = Some((nth_search, reply));
        self
    }

    pub fn reject_pit(mut self, reply: Value) -> Self {
        self.reject_pit = Some(reply);
        self
    }

    pub fn expire_after(mut self, searches: usize) -> Self {
        self.expire_after = Some(searches);
        self
    }

    pub fn rotate_ids(mut self) -> Self {
        self.rotate_ids = true;
        self
    }

    /// Bodies of every search request received.
    pub fn searches(&self) -> Vec<Value> {
        self.searches.borrow().clone()
    }

    pub fn pits_opened(&self) -> usize {
        self.pits_opened.get()
    }

    fn matches(doc: &Doc, body: &Value) -> bool {
        let Some(clauses) = body["query"]["bool"]["filter"].as_array() else {
            return true;
        };
        clauses.iter().all(|clause| match clause.get("match").and_then(Value::as_object) {
            Some(m) => m.iter().all(|(field, cond)| {
                let wanted = cond["query"].as_str().unwrap_or_default();
                match doc.source.get(field) {
                    Some(Value::String(s)) => s.eq_ignore_ascii_case(wanted),
                    Some(other) => other.to_string() == wanted,
                    None => false,
                }
            }),
            None => true,
        })
    }

    fn project(doc: &Doc, body: &Value) -> Map<String, Value> {
        match body.get("_source").and_then(Value::as_array) {
            Some(fields) => doc
                .source
                .iter()
                .filter(|(k, _)| fields.iter().any(|f| f.as_str() == Some(k.as_str())))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            None => doc.source.clone(),
        }
    }

    fn unknown_pit(id: &str) -> Value {
        json!({
            "error": {
                "type": "search_context_missing_exception",
                "reason": format!("No search context found for id [{}]", id),
            },
            "status": 404
        })
    }
}

impl Backend for LogServer {
    fn open_point_in_time(&self, _target: &str, _keep_alive: &str) -> Result<Value> {
        if let Some(reply) = &self.reject_pit {
            return Ok(reply.clone());
        }
        let n = self.pits_opened.get() + 1;
        self.pits_opened.set(n);
        let id = format!("pit-{}", n);
        self.open_pits.borrow_mut().insert(id.clone());
        Ok(json!({ "id": id }))
    }

    fn search(&self, body: &Value) -> Result<Value> {
        let nth = self.searches.borrow().len();
        self.searches.borrow_mut().push(body.clone());

        if let Some((at, reply)) = self.inject.borrow().as_ref() {
            if *at == nth {
                return Ok(reply.clone());
            }
        }

        if self.expire_after == Some(nth) {
            self.open_pits.borrow_mut().clear();
        }

        let pit_id = body["pit"]["id"].as_str().unwrap_or_default().to_string();
        if !self.open_pits.borrow().contains(&pit_id) {
            return Ok(Self::unknown_pit(&pit_id));
        }

        let size = body["size"].as_u64().unwrap_or(10) as usize;
        let after = body
            .get("search_after")
            .and_then(Value::as_array)
            .map(|v| parse_sort_key(v));

        let hits: Vec<Value> = self
            .docs
            .iter()
            .filter(|d| match after {
                Some(key) => sort_key(d).cmp(&key) == Ordering::Greater,
                None => true,
            })
            .filter(|d| Self::matches(d, body))
            .take(size)
            .map(|d| {
                json!({
                    "_index": "logstash-test",
                    "_id": format!("doc-{}-{}", d.timestamp, d.tiebreak),
                    "_source": Self::project(d, body),
                    "sort": [d.timestamp, d.tiebreak],
                })
            })
            .collect();

        let next_id = if self.rotate_ids {
            let id = format!("{}+", pit_id);
            let mut pits = self.open_pits.borrow_mut();
            pits.remove(&pit_id);
            pits.insert(id.clone());
            id
        } else {
            pit_id
        };

        Ok(json!({
            "pit_id": next_id,
            "hits": { "hits": hits }
        }))
    }

    fn field_caps(&self, _target: &str) -> Result<Value> {
        let mut fields = Map::new();
        for name in ["_id", "_index", "_source"] {
            fields.insert(name.to_string(), json!({"_id": {"type": "_id"}}));
        }
        for doc in &self.docs {
            for key in doc.source.keys() {
                fields.insert(key.clone(), json!({"keyword": {"type": "keyword"}}));
            }
        }
        Ok(json!({ "indices": ["logstash-test"], "fields": fields }))
    }
}
