//! CLI command implementations.

use std::collections::BTreeSet;
use std::io::{self, Write};
use std::path::Path;

use scan::{
    list_fields as backend_fields, scan, unknown_fields, Config, Error, HttpBackend, MatchFilters,
    SearchQuery, TimeRange,
};
use tracing::{debug, error};

use crate::output::{LineFormat, OutputFormat, Renderer, DEFAULT_SHORT_FIELDS};

/// What to search for and how to show it.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// `field=value` matches.
    pub matches: Vec<String>,
    pub since: Option<String>,
    pub until: Option<String>,
    pub output: OutputFormat,
    /// Field list (`,` / `:` separated), None for the format's default.
    pub output_fields: Option<String>,
}

/// Load the config file and apply command-line overrides.
pub fn load_config(path: Option<&Path>, host: Option<&str>, index: Option<&str>) -> scan::Result<Config> {
    let mut config = match path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    if let Some(host) = host {
        config.host = host.to_string();
    }
    if let Some(index) = index {
        config.index = index.to_string();
    }

    config.validate()?;
    Ok(config)
}

/// Print every field name of the index, tab separated.
pub fn list_fields(config: &Config) -> scan::Result<()> {
    let backend = HttpBackend::from_config(config)?;
    let fields = backend_fields(&backend, &config.index)?;

    let names: Vec<&str> = fields.iter().map(String::as_str).collect();
    println!("{}", names.join("\t"));
    Ok(())
}

/// Pick the field list for the output format: the short format has a default,
/// JSON shows everything unless told otherwise.
fn resolve_line_format(output: OutputFormat, requested: Option<&str>) -> Option<LineFormat> {
    match (requested, output) {
        (Some(template), _) => Some(LineFormat::parse(template)),
        (None, OutputFormat::Short) => Some(LineFormat::parse(DEFAULT_SHORT_FIELDS)),
        (None, OutputFormat::Json) => None,
    }
}

fn check_fields_exist<'a, I>(backend: &HttpBackend, config: &Config, names: I) -> scan::Result<()>
where
    I: IntoIterator<Item = &'a str>,
{
    let wrong = unknown_fields(backend, &config.index, names)?;
    if wrong.is_empty() {
        return Ok(());
    }
    let wrong: Vec<String> = wrong.into_iter().collect();
    error!(fields = %wrong.join(", "), index = %config.index, "fields missing from index");
    Err(Error::UnknownFields(wrong))
}

/// Search and print every matching log entry.
pub fn search(config: &Config, opts: &SearchOptions) -> scan::Result<()> {
    // Rejected here, before anything is sent
    let matches = MatchFilters::parse_args(&opts.matches)?;

    let line_format = resolve_line_format(opts.output, opts.output_fields.as_deref());
    let fields: Option<BTreeSet<String>> = line_format
        .as_ref()
        .map(LineFormat::fields)
        .filter(|f| !f.is_empty());
    debug!(?fields, "selected fields");

    let mut query = SearchQuery::new()
        .with_matches(matches)
        .with_time_range(TimeRange::new(opts.since.clone(), opts.until.clone()));
    if let Some(fields) = &fields {
        query = query.with_fields(fields.iter().cloned());
    }

    let renderer = Renderer::new(opts.output, line_format, &config.timestamp_field);
    let backend = HttpBackend::from_config(config)?;

    let mut hit_count = 0usize;
    let mut hit_fields: BTreeSet<String> = BTreeSet::new();
    {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        for hit in scan(&backend, config, &query)? {
            let hit = hit?;
            hit_count += 1;
            hit_fields.extend(hit.source.keys().cloned());

            match renderer.write(&mut out, &hit) {
                Ok(()) => {}
                // Reader went away (e.g. piped into head): stop quietly
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => return Ok(()),
                Err(e) => return Err(e.into()),
            }
        }
        out.flush()?;
    }
    debug!(hit_count, "scan complete");

    // A field that never showed up might just be misspelled
    if let Some(fields) = &fields {
        let never_seen: Vec<&str> = fields
            .iter()
            .filter(|f| !hit_fields.contains(*f))
            .map(String::as_str)
            .collect();
        debug!(?never_seen, "fields absent from every hit");
        if !never_seen.is_empty() {
            check_fields_exist(&backend, config, never_seen)?;
        }
    }

    // Nothing found with matches given: check the match fields too
    if hit_count == 0 {
        let query_fields: Vec<&str> = query.matches.fields().collect();
        if !query_fields.is_empty() {
            check_fields_exist(&backend, config, query_fields)?;
        }
    }

    Ok(())
}
