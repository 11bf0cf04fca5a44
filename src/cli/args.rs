//! Command line argument parsing for the profile-search CLI using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::search::{SearchFilter, SearchRequest};

/// profile-search - semantic search over researcher profiles
#[derive(Parser, Debug, Clone)]
#[command(name = "profile-search")]
#[command(about = "Semantic search over researcher profiles with metadata filters")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct ProfileSearchArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human")]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Configuration file (JSON)
    #[arg(long, value_name = "CONFIG_FILE", env = "PROFILE_SEARCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Instance directory holding the index and metadata (overrides config)
    #[arg(long, value_name = "DIRECTORY", env = "PROFILE_SEARCH_INSTANCE")]
    pub instance: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl ProfileSearchArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1,
                n => n,
            }
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Embed and index profiles from a JSON-lines file
    Ingest(IngestArgs),

    /// Search indexed profiles
    Search(SearchArgs),

    /// Show index and metadata statistics
    Stats,

    /// Delete every vector and profile record
    Clear,
}

/// Arguments for ingesting profiles
#[derive(Parser, Debug, Clone)]
pub struct IngestArgs {
    /// Profile file, one JSON object per line
    #[arg(value_name = "PROFILES_JSONL")]
    pub profiles_file: PathBuf,

    /// Wipe the index and metadata before ingesting
    #[arg(long)]
    pub reset: bool,
}

/// Arguments for searching
#[derive(Parser, Debug, Clone)]
pub struct SearchArgs {
    /// Query string
    #[arg(value_name = "QUERY")]
    pub query: String,

    /// Maximum number of results to return
    #[arg(short, long, default_value = "10")]
    pub limit: usize,

    /// Only profiles from this school
    #[arg(long)]
    pub school: Option<String>,

    /// Only profiles whose department contains this text
    #[arg(long)]
    pub department: Option<String>,

    /// Only profiles with a project of this activity code
    #[arg(long)]
    pub activity_code: Option<String>,

    /// Only profiles with a project from this agency
    #[arg(long)]
    pub agency: Option<String>,

    /// Only profiles with currently funded projects
    #[arg(long)]
    pub has_funding: bool,

    /// Match the query as a literal substring instead of semantically
    #[arg(long)]
    pub exact_words: bool,
}

impl SearchArgs {
    /// Build the search request these arguments describe.
    pub fn to_request(&self) -> SearchRequest {
        let mut filter = SearchFilter::new();
        if let Some(school) = &self.school {
            filter = filter.with_school(school.clone());
        }
        if let Some(department) = &self.department {
            filter = filter.with_department(department.clone());
        }
        if let Some(activity_code) = &self.activity_code {
            filter = filter.with_activity_code(activity_code.clone());
        }
        if let Some(agency) = &self.agency {
            filter = filter.with_agency(agency.clone());
        }
        filter = filter.with_has_funding(self.has_funding);

        SearchRequest::new(self.query.clone())
            .with_limit(self.limit)
            .with_filter(filter)
            .with_exact_words(self.exact_words)
    }
}

/// Output formats for CLI
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}
