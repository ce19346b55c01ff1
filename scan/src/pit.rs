//! Point-in-time leases.
//!
//! A point-in-time fixes a consistent view of the target indices for the
//! length of a scan. The server forgets it once its keep-alive lapses; every
//! page request renews it, and there is no explicit release.

use serde_json::Value;
use tracing::debug;

use crate::backend::Backend;
use crate::error::QueryError;
use crate::{Error, Result};

/// A leased point-in-time on one target pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotHandle {
    /// Opaque id issued by the server.
    pub id: String,
    /// Renewal duration sent with every request (e.g. "10s").
    pub keep_alive: String,
    /// Index pattern the view was opened against.
    pub target: String,
}

impl SnapshotHandle {
    /// Open a point-in-time on `target`.
    ///
    /// Transport failures pass through unchanged; a response without an `id`
    /// is a rejected lease.
    pub fn open<B: Backend>(backend: &B, target: &str, keep_alive: &str) -> Result<Self> {
        let doc = backend.open_point_in_time(target, keep_alive)?;

        match doc.get("id").and_then(Value::as_str) {
            Some(id) => {
                debug!(pit_target = target, keep_alive, "point-in-time opened");
                Ok(Self {
                    id: id.to_string(),
                    keep_alive: keep_alive.to_string(),
                    target: target.to_string(),
                })
            }
            None => Err(Error::LeaseRequestFailed {
                target: target.to_string(),
                payload: QueryError::from_section(doc.get("error")),
            }),
        }
    }

    /// Adopt the id the server returned with the latest page.
    ///
    /// The server may hand back a different id after each search; the most
    /// recent one must be used for the next request.
    pub fn refresh(&mut self, id: Option<String>) {
        if let Some(id) = id {
            if id != self.id {
                debug!("point-in-time id updated");
                self.id = id;
            }
        }
    }
}
