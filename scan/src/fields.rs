//! Field discovery.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::backend::Backend;
use crate::error::QueryError;
use crate::{Error, Result};

/// All field names known to the indices matching `target`.
///
/// Metadata fields (`_id`, `_index`, ...) are left out.
pub fn list_fields<B: Backend>(backend: &B, target: &str) -> Result<BTreeSet<String>> {
    let doc = backend.field_caps(target)?;

    let Some(fields) = doc.get("fields").and_then(Value::as_object) else {
        return Err(Error::BackendQuery(QueryError::from_section(doc.get("error"))));
    };

    Ok(fields
        .keys()
        .filter(|name| !name.starts_with('_'))
        .cloned()
        .collect())
}

/// Names in `wanted` that are not fields of `target`.
pub fn unknown_fields<'a, B, I>(backend: &B, target: &str, wanted: I) -> Result<BTreeSet<String>>
where
    B: Backend,
    I: IntoIterator<Item = &'a str>,
{
    let available = list_fields(backend, target)?;
    Ok(wanted
        .into_iter()
        .filter(|name| !available.contains(*name))
        .map(str::to_string)
        .collect())
}
