//! Output formatting for CLI commands.

use serde::{Deserialize, Serialize};

use crate::cli::args::{OutputFormat, ProfileSearchArgs};
use crate::error::Result;
use crate::profile::ProfileRecord;
use crate::search::SearchMode;

/// Result structure for profile ingestion.
#[derive(Debug, Serialize, Deserialize)]
pub struct IngestResult {
    pub indexed: usize,
    pub merged: usize,
    pub skipped: Vec<String>,
    pub invalid_lines: usize,
    pub total_vectors: usize,
    pub duration_ms: u64,
}

/// One resolved search hit.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileHit {
    pub rank: usize,
    pub embedding_id: u64,
    pub name: String,
    pub school: String,
    pub department: String,
    pub email: Option<String>,
    pub profile_url: Option<String>,
    pub has_funding: bool,
}

impl ProfileHit {
    pub fn new(rank: usize, embedding_id: u64, record: ProfileRecord) -> Self {
        Self {
            rank,
            embedding_id,
            name: record.name,
            school: record.school,
            department: record.department,
            email: record.email,
            profile_url: record.profile_url,
            has_funding: record.has_funding,
        }
    }
}

/// Result structure for search operations.
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResults {
    pub query: String,
    pub mode: SearchMode,
    pub hits: Vec<ProfileHit>,
    pub total_hits: usize,
    pub duration_ms: u64,
}

/// Instance statistics.
#[derive(Debug, Serialize, Deserialize)]
pub struct IndexStats {
    pub directory: String,
    pub vectors: usize,
    pub dimension: usize,
    pub profiles: usize,
    pub index_size_bytes: u64,
    pub metadata_size_bytes: u64,
}

/// Result structure for clearing an instance.
#[derive(Debug, Serialize, Deserialize)]
pub struct ClearResult {
    pub vectors_deleted: usize,
    pub profiles_deleted: usize,
}

/// Renders itself for the human output format.
pub trait HumanOutput {
    fn print_human(&self);
}

/// Output a result in the specified format.
pub fn output_result<T: Serialize + HumanOutput>(
    message: &str,
    result: &T,
    args: &ProfileSearchArgs,
) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => {
            if args.verbosity() > 0 {
                println!("{message}");
                println!();
            }
            result.print_human();
            Ok(())
        }
        OutputFormat::Json => output_json(result, args),
    }
}

/// Output in JSON format.
fn output_json<T: Serialize>(result: &T, args: &ProfileSearchArgs) -> Result<()> {
    let json = if args.pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };

    println!("{json}");
    Ok(())
}

impl HumanOutput for SearchResults {
    fn print_human(&self) {
        println!("Search Results:");
        println!("═══════════════");

        for hit in &self.hits {
            println!();
            println!("Result {}: {} (id {})", hit.rank, hit.name, hit.embedding_id);
            println!("─────────────");
            println!("School: {}", hit.school);
            println!("Department: {}", hit.department);
            if let Some(email) = &hit.email {
                println!("Email: {email}");
            }
            if let Some(url) = &hit.profile_url {
                println!("Profile: {url}");
            }
            if hit.has_funding {
                println!("Funded: yes");
            }
        }

        println!();
        println!("Total hits: {}", self.total_hits);
        println!("Search time: {}ms", self.duration_ms);
    }
}

impl HumanOutput for IndexStats {
    fn print_human(&self) {
        println!("Index Statistics:");
        println!("════════════════");
        println!("Directory: {}", self.directory);
        println!("Vectors: {}", self.vectors);
        println!("Dimension: {}", self.dimension);
        println!("Profiles: {}", self.profiles);
        println!("Index size: {}", format_bytes(self.index_size_bytes));
        println!("Metadata size: {}", format_bytes(self.metadata_size_bytes));
        if self.vectors != self.profiles {
            println!(
                "Warning: {} vectors but {} profiles; consider re-ingesting with --reset",
                self.vectors, self.profiles
            );
        }
    }
}

impl HumanOutput for IngestResult {
    fn print_human(&self) {
        println!("Indexed: {}", self.indexed);
        println!("Merged duplicates: {}", self.merged);
        println!("Invalid lines: {}", self.invalid_lines);
        if !self.skipped.is_empty() {
            println!("Skipped: {}", self.skipped.join(", "));
        }
        println!("Vectors in index: {}", self.total_vectors);
        println!("Duration: {}ms", self.duration_ms);
    }
}

impl HumanOutput for ClearResult {
    fn print_human(&self) {
        println!("Vectors deleted: {}", self.vectors_deleted);
        println!("Profiles deleted: {}", self.profiles_deleted);
    }
}

/// Format bytes into human-readable format.
fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    let unit = UNITS[unit_index];
    if unit_index == 0 {
        format!("{bytes} {unit}")
    } else {
        format!("{size:.1} {unit}")
    }
}
