use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Course schedule scraper for the NTU class schedule portal.
///
/// Crawls every course of the currently selected semester and writes the
/// timetables as SQL insert statements.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Log formatter to use
    #[arg(long, value_enum, global = true, default_value_t = default_tracing_format())]
    pub tracing: TracingFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Crawl the live portal and write SQL
    Crawl {
        /// SQL output file
        #[arg(short, long, default_value = "out.sql")]
        output: PathBuf,
        /// Prefix the output with the table definitions
        #[arg(long)]
        schema: bool,
        /// Only crawl the given course keys (repeatable)
        #[arg(long = "only", value_name = "KEY")]
        only: Vec<String>,
    },
    /// Save the main page and every raw course page to a dated cache folder
    Download {
        /// Directory the dated cache folder is created in
        #[arg(long, default_value = ".")]
        cache_root: PathBuf,
    },
    /// Extract SQL from a cache folder written by `download`
    Parse {
        /// Dated cache folder containing mapping.json
        dir: PathBuf,
        #[arg(short, long, default_value = "out.sql")]
        output: PathBuf,
        #[arg(long)]
        schema: bool,
    },
    /// Print the selected semester and course options of a saved main page
    Inspect { file: PathBuf },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
pub enum TracingFormat {
    /// Human-readable output for terminals
    Pretty,
    /// One JSON object per line
    Json,
}

#[cfg(debug_assertions)]
const DEFAULT_TRACING_FORMAT: TracingFormat = TracingFormat::Pretty;
#[cfg(not(debug_assertions))]
const DEFAULT_TRACING_FORMAT: TracingFormat = TracingFormat::Json;

fn default_tracing_format() -> TracingFormat {
    DEFAULT_TRACING_FORMAT
}
