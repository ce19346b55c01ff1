//! Rendering hits for the terminal.

use std::collections::BTreeSet;
use std::io::{self, Write};

use chrono::NaiveDateTime;
use scan::Hit;
use serde_json::{Map, Value};
use tracing::info;

/// Fields shown by the short format when none are requested.
pub const DEFAULT_SHORT_FIELDS: &str = "@timestamp,level,module,component,subcomponent:line,message";

/// Placeholder for a field the hit does not have.
pub const MISSING_FIELD: &str = "∅";

/// Timestamp layout used by the backend, and the one shown to the user.
const BACKEND_TIME_FMT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";
const DISPLAY_TIME_FMT: &str = "%Y-%m-%d %H:%M:%S%.6f";

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// One line per log entry, tab/colon separated
    Short,
    /// Each log entry as raw JSON
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Field(String),
    Text(&'static str),
}

/// Line template built from a field list such as `@timestamp,level,subcomponent:line`.
///
/// A run of `,` becomes a tab, a run of `:` stays a `:`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineFormat {
    segments: Vec<Segment>,
}

impl LineFormat {
    pub fn parse(template: &str) -> Self {
        let mut segments = Vec::new();
        let mut name = String::new();
        let mut in_separator = false;

        for c in template.chars() {
            if c == ',' || c == ':' {
                if !name.is_empty() {
                    segments.push(Segment::Field(std::mem::take(&mut name)));
                }
                if !in_separator {
                    segments.push(Segment::Text(if c == ',' { "\t" } else { ":" }));
                    in_separator = true;
                }
            } else {
                name.push(c);
                in_separator = false;
            }
        }
        if !name.is_empty() {
            segments.push(Segment::Field(name));
        }

        Self { segments }
    }

    /// Names of the fields the template refers to.
    pub fn fields(&self) -> BTreeSet<String> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Field(name) => Some(name.clone()),
                Segment::Text(_) => None,
            })
            .collect()
    }

    pub fn render(&self, source: &Map<String, Value>, timestamp_field: &str) -> String {
        let mut line = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => line.push_str(text),
                Segment::Field(name) => match source.get(name) {
                    Some(Value::String(s)) if name == timestamp_field => {
                        line.push_str(&format_timestamp(s).unwrap_or_else(|| s.clone()))
                    }
                    Some(value) => line.push_str(&value_to_text(value)),
                    None => {
                        info!(field = %name, "missing field");
                        line.push_str(MISSING_FIELD);
                    }
                },
            }
        }
        line
    }
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Convert `2021-04-12T12:57:46.306Z` into `2021-04-12 12:57:46.306000`.
pub fn format_timestamp(raw: &str) -> Option<String> {
    NaiveDateTime::parse_from_str(raw, BACKEND_TIME_FMT)
        .ok()
        .map(|ts| ts.format(DISPLAY_TIME_FMT).to_string())
}

/// Writes hits in the selected format.
pub struct Renderer {
    format: OutputFormat,
    line: Option<LineFormat>,
    timestamp_field: String,
}

impl Renderer {
    pub fn new(format: OutputFormat, line: Option<LineFormat>, timestamp_field: &str) -> Self {
        Self {
            format,
            line,
            timestamp_field: timestamp_field.to_string(),
        }
    }

    pub fn write<W: Write>(&self, out: &mut W, hit: &Hit) -> io::Result<()> {
        match (self.format, &self.line) {
            (OutputFormat::Short, Some(line)) => {
                writeln!(out, "{}", line.render(&hit.source, &self.timestamp_field))
            }
            // No field list: the whole source, whatever the format
            _ => {
                serde_json::to_writer(&mut *out, &hit.source)?;
                writeln!(out)
            }
        }
    }
}
