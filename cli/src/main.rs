//! elnok: a light front-end to Logstash/Elasticsearch.
//!
//! Syntax is inspired by journalctl:
//! `elnok [OPTIONS...] [MATCHES...]`

use std::path::PathBuf;

use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use output::OutputFormat;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "\nCopyright © 2021 Éric Piel, Delmic",
    "\nLicensed under the GPL-2.0"
);

#[derive(Parser)]
#[command(name = "elnok")]
#[command(about = "A light front-end to Logstash/Elasticsearch")]
#[command(version, long_version = LONG_VERSION)]
struct Cli {
    /// Verbosity (0-3) of the elnok internals
    #[arg(long = "log-level", value_name = "LEVEL", default_value_t = 0,
          value_parser = clap::value_parser!(u8).range(0..=3))]
    log_level: u8,

    /// Name or IP address and port of the elasticsearch server (default: localhost:9200)
    #[arg(long)]
    host: Option<String>,

    /// Index pattern to look into (default: logstash-*). Can be comma separated.
    #[arg(long)]
    index: Option<String>,

    /// Config file (default: $ELNOK_CONFIG or ~/.config/elnok/config.toml)
    #[arg(long = "config", value_name = "PATH")]
    config: Option<PathBuf>,

    /// List all the fields present in the index (tab separated)
    #[arg(long = "list-fields")]
    list_fields: bool,

    /// Format of the generated output
    #[arg(short = 'o', long = "output", value_enum, default_value_t = OutputFormat::Short)]
    output: OutputFormat,

    /// Fields to print (comma/colon separated)
    #[arg(long = "output-fields", value_name = "FIELDS")]
    output_fields: Option<String>,

    /// Show entries on or newer than the given date (e.g. 2012-10-30T18:17:16 or now-2d)
    #[arg(short = 'S', long)]
    since: Option<String>,

    /// Show entries on or before the given date (e.g. 2012-10-30T18:17:16 or now-1h)
    #[arg(short = 'U', long)]
    until: Option<String>,

    /// Only show entries matching these field=value filters
    matches: Vec<String>,
}

/// Map the 0-3 verbosity to a level; RUST_LOG still takes precedence.
fn init_logging(log_level: u8) {
    let level = match log_level {
        0 => LevelFilter::ERROR,
        1 => LevelFilter::WARN,
        2 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_level);

    let result = commands::load_config(cli.config.as_deref(), cli.host.as_deref(), cli.index.as_deref())
        .and_then(|config| {
            if cli.list_fields {
                commands::list_fields(&config)
            } else {
                let opts = commands::SearchOptions {
                    matches: cli.matches,
                    since: cli.since,
                    until: cli.until,
                    output: cli.output,
                    output_fields: cli.output_fields,
                };
                commands::search(&config, &opts)
            }
        });

    if let Err(e) = result {
        if let scan::Error::BackendQuery(err) | scan::Error::LeaseRequestFailed { payload: err, .. } = &e {
            for line in err.lines() {
                eprintln!("{}", line);
            }
        }
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
