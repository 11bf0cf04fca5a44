//! Command implementations for the profile-search CLI.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use log::{debug, info, warn};

use crate::analysis::BpeTokenCounter;
use crate::cli::args::*;
use crate::cli::output::*;
use crate::config::ProfileSearchConfig;
use crate::embedding::{EmbeddingBackend, EmbeddingGenerator};
use crate::error::{ProfileSearchError, Result};
use crate::metadata::{MemoryMetadataStore, MetadataStore};
use crate::population::Populator;
use crate::profile::ProfileRecord;
use crate::search::{SearchEngine, SearchMode};
use crate::storage::{FileStorage, Storage, StorageConfig};
use crate::vector::{FlatVectorIndex, Vector, VectorIndexBackend};

type Engine = SearchEngine<FlatVectorIndex, MemoryMetadataStore>;

/// Execute a CLI command.
pub async fn execute_command(args: ProfileSearchArgs) -> Result<()> {
    let config = load_config(&args)?;
    match &args.command {
        Command::Ingest(ingest_args) => ingest_profiles(ingest_args, &config, &args).await,
        Command::Search(search_args) => search_profiles(search_args, &config, &args).await,
        Command::Stats => show_stats(&config, &args),
        Command::Clear => clear_instance(&config, &args),
    }
}

/// Resolve the configuration: file (if any), then command line overrides.
pub fn load_config(args: &ProfileSearchArgs) -> Result<ProfileSearchConfig> {
    let mut config = match &args.config {
        Some(path) => {
            debug!("Loading configuration from {}", path.display());
            ProfileSearchConfig::from_file(path)?
        }
        None => ProfileSearchConfig::default(),
    };
    if let Some(instance) = &args.instance {
        config.index.directory = instance.clone();
    }
    config.validate()?;
    Ok(config)
}

/// The on-disk stores of one instance directory.
struct Instance {
    storage: Arc<dyn Storage>,
    index: FlatVectorIndex,
    metadata: Arc<MemoryMetadataStore>,
}

fn open_instance(config: &ProfileSearchConfig) -> Result<Instance> {
    let storage: Arc<dyn Storage> = Arc::new(FileStorage::new(
        &config.index.directory,
        StorageConfig::default(),
    )?);
    let index = FlatVectorIndex::open(
        storage.clone(),
        config.index.file_name.clone(),
        config.embedding.dimension,
    )?;
    let metadata = Arc::new(MemoryMetadataStore::open(
        storage.clone(),
        config.index.metadata_file_name.clone(),
    )?);
    Ok(Instance {
        storage,
        index,
        metadata,
    })
}

#[cfg(feature = "embeddings-openai")]
fn embedding_backend(config: &ProfileSearchConfig) -> Result<Arc<dyn EmbeddingBackend>> {
    use crate::embedding::openai::OpenAiEmbeddingBackend;

    let api_key = std::env::var(&config.embedding.api_key_env).map_err(|_| {
        ProfileSearchError::invalid_config(format!(
            "environment variable {} must hold the embeddings API key",
            config.embedding.api_key_env
        ))
    })?;
    let backend = OpenAiEmbeddingBackend::with_dimension(
        api_key,
        config.embedding.model.clone(),
        config.embedding.dimension,
    )
    .with_base_url(config.embedding.base_url.clone());
    Ok(Arc::new(backend))
}

#[cfg(not(feature = "embeddings-openai"))]
fn embedding_backend(_config: &ProfileSearchConfig) -> Result<Arc<dyn EmbeddingBackend>> {
    Err(ProfileSearchError::invalid_config(
        "built without an embedding backend; enable the embeddings-openai feature",
    ))
}

/// Backend for commands that never embed; every call fails.
struct NoEmbeddingBackend {
    dimension: usize,
}

#[async_trait]
impl EmbeddingBackend for NoEmbeddingBackend {
    async fn embed(&self, _text: &str) -> Result<Vector> {
        Err(ProfileSearchError::invalid_config(
            "no embedding backend is configured for this command",
        ))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "none"
    }
}

fn build_engine(
    config: &ProfileSearchConfig,
    backend: Arc<dyn EmbeddingBackend>,
) -> Result<Engine> {
    let instance = open_instance(config)?;
    let mut generator =
        EmbeddingGenerator::new(backend).with_max_tokens(config.embedding.max_tokens);
    match BpeTokenCounter::for_model(&config.embedding.model) {
        Ok(counter) => generator = generator.with_token_counter(Arc::new(counter)),
        Err(e) => warn!(
            "No tokenizer known for model {} ({e}); using the default counter",
            config.embedding.model
        ),
    }
    SearchEngine::new(generator, instance.index, instance.metadata)
}

/// Ingest profiles from a JSON-lines file.
async fn ingest_profiles(
    args: &IngestArgs,
    config: &ProfileSearchConfig,
    cli_args: &ProfileSearchArgs,
) -> Result<()> {
    if cli_args.verbosity() > 1 {
        println!("Ingesting profiles from: {}", args.profiles_file.display());
        println!("Instance: {}", config.index.directory.display());
    }

    let start_time = Instant::now();
    let (records, invalid_lines) = read_profiles(&args.profiles_file)?;
    info!("Read {} profiles ({invalid_lines} invalid lines)", records.len());

    let engine = build_engine(config, embedding_backend(config)?)?;
    let populator = Populator::new(&engine)
        .with_max_retries(config.population.max_retries)
        .with_retry_backoff(config.population.retry_backoff());
    if args.reset {
        populator.reset()?;
    }
    let report = populator.ingest(records).await?;

    output_result(
        "Profiles ingested",
        &IngestResult {
            indexed: report.indexed,
            merged: report.merged,
            skipped: report.skipped,
            invalid_lines,
            total_vectors: engine.len(),
            duration_ms: start_time.elapsed().as_millis() as u64,
        },
        cli_args,
    )
}

/// Parse a profile file, one JSON object per line. Malformed lines are
/// logged and counted, not fatal.
fn read_profiles(path: &Path) -> Result<(Vec<ProfileRecord>, usize)> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    let mut invalid_lines = 0;

    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<ProfileRecord>(&line) {
            Ok(mut record) => {
                record.embedding_id = None;
                records.push(record);
            }
            Err(e) => {
                warn!("Skipping profile on line {}: {e}", line_num + 1);
                invalid_lines += 1;
            }
        }
    }
    Ok((records, invalid_lines))
}

/// Search indexed profiles.
async fn search_profiles(
    args: &SearchArgs,
    config: &ProfileSearchConfig,
    cli_args: &ProfileSearchArgs,
) -> Result<()> {
    let request = args.to_request();
    if cli_args.verbosity() > 1 {
        println!("Query: {}", request.query);
        println!("Mode: {:?}", request.mode());
    }

    let start_time = Instant::now();
    let backend: Arc<dyn EmbeddingBackend> = match request.mode() {
        SearchMode::Exact => Arc::new(NoEmbeddingBackend {
            dimension: config.embedding.dimension,
        }),
        SearchMode::Semantic => embedding_backend(config)?,
    };
    let engine = build_engine(config, backend)?;
    let ids = engine.search(&request).await?;

    let mut hits = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(record) = engine.metadata().get_by_embedding_id(id)? {
            hits.push(ProfileHit::new(hits.len() + 1, id, record));
        }
    }

    let results = SearchResults {
        query: request.query.clone(),
        mode: request.mode(),
        total_hits: hits.len(),
        hits,
        duration_ms: start_time.elapsed().as_millis() as u64,
    };
    output_result("Search completed", &results, cli_args)
}

/// Show index and metadata statistics.
fn show_stats(config: &ProfileSearchConfig, cli_args: &ProfileSearchArgs) -> Result<()> {
    let instance = open_instance(config)?;
    let file_size = |name: &str| {
        if instance.storage.file_exists(name) {
            instance.storage.file_size(name)
        } else {
            Ok(0)
        }
    };

    let stats = IndexStats {
        directory: config.index.directory.display().to_string(),
        vectors: instance.index.len(),
        dimension: instance.index.dimension(),
        profiles: instance.metadata.len()?,
        index_size_bytes: file_size(&config.index.file_name)?,
        metadata_size_bytes: file_size(&config.index.metadata_file_name)?,
    };
    output_result("Index statistics", &stats, cli_args)
}

/// Wipe the vector index and the metadata store.
fn clear_instance(config: &ProfileSearchConfig, cli_args: &ProfileSearchArgs) -> Result<()> {
    let mut instance = open_instance(config)?;
    let result = ClearResult {
        vectors_deleted: instance.index.len(),
        profiles_deleted: instance.metadata.len()?,
    };
    instance.index.clear()?;
    instance.metadata.clear()?;
    output_result("Instance cleared", &result, cli_args)
}
