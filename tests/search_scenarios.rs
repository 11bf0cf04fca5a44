use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use profile_search::embedding::{EmbeddingBackend, EmbeddingGenerator};
use profile_search::error::{ProfileSearchError, Result};
use profile_search::metadata::{MemoryMetadataStore, MetadataStore};
use profile_search::profile::{ProfileRecord, Project};
use profile_search::search::{SearchEngine, SearchFilter, SearchRequest};
use profile_search::vector::{FlatVectorIndex, Vector, VectorIndexBackend};

#[test]
fn full_search_orders_by_distance() -> Result<()> {
    let engine = engine_with_vectors(&[[0.0, 0.0], [10.0, 10.0], [1.0, 1.0]], &[])?;

    let ids = engine.search_vector(&Vector::new(vec![0.1, 0.1]), &SearchFilter::new(), 2)?;
    assert_eq!(ids, vec![0, 2]);
    Ok(())
}

#[test]
fn top_k_larger_than_index_returns_everything() -> Result<()> {
    let engine = engine_with_vectors(&[[3.0, 0.0], [1.0, 0.0], [2.0, 0.0]], &[])?;

    let ids = engine.search_vector(&Vector::new(vec![0.0, 0.0]), &SearchFilter::new(), 50)?;
    assert_eq!(ids, vec![1, 2, 0]);
    Ok(())
}

#[test]
fn filter_restricts_ranking_to_candidates() -> Result<()> {
    let engine = engine_with_vectors(
        &[[0.0, 0.0], [5.0, 5.0], [1.0, 1.0]],
        &[("ada", "SOM", 0), ("bob", "SEAS", 1), ("cy", "SOM", 2)],
    )?;

    let filter = SearchFilter::new().with_school("SEAS");
    let ids = engine.search_vector(&Vector::new(vec![0.0, 0.0]), &filter, 10)?;
    assert_eq!(ids, vec![1]);

    let filter = SearchFilter::new().with_school("SOM");
    let ids = engine.search_vector(&Vector::new(vec![4.0, 4.0]), &filter, 10)?;
    assert_eq!(ids, vec![2, 0]);
    Ok(())
}

#[test]
fn empty_filter_matches_unfiltered_search() -> Result<()> {
    let engine = engine_with_vectors(
        &[[0.0, 2.0], [5.0, 5.0], [1.0, 1.0], [0.5, 0.5]],
        &[("a", "SOM", 0), ("b", "SOM", 1), ("c", "SOM", 2), ("d", "SOM", 3)],
    )?;
    let query = Vector::new(vec![0.2, 0.4]);

    let unfiltered = engine.search_vector(&query, &SearchFilter::new(), 3)?;
    let every_school = engine.search_vector(&query, &SearchFilter::new().with_school("SOM"), 3)?;
    let blank_values = engine.search_vector(
        &query,
        &SearchFilter::new().with_school("").with_has_funding(false),
        3,
    )?;

    assert_eq!(unfiltered, vec![3, 2, 0]);
    assert_eq!(every_school, unfiltered);
    assert_eq!(blank_values, unfiltered);
    Ok(())
}

#[test]
fn empty_candidate_set_skips_reconstruction() -> Result<()> {
    let reconstructions = Arc::new(AtomicUsize::new(0));
    let mut index = CountingIndex::new(2, reconstructions.clone());
    index.append(&Vector::new(vec![0.0, 0.0]))?;

    let metadata = Arc::new(MemoryMetadataStore::new());
    metadata.insert(profile("ada", "SOM", 0))?;
    let engine = SearchEngine::new(generator(2), index, metadata)?;

    let ids = engine.search_vector(
        &Vector::new(vec![0.0, 0.0]),
        &SearchFilter::new().with_school("Nursing"),
        5,
    )?;
    assert!(ids.is_empty());
    assert_eq!(reconstructions.load(Ordering::SeqCst), 0);

    engine.search_vector(
        &Vector::new(vec![0.0, 0.0]),
        &SearchFilter::new().with_school("SOM"),
        5,
    )?;
    assert_eq!(reconstructions.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn candidate_ids_beyond_index_are_ignored() -> Result<()> {
    let reconstructions = Arc::new(AtomicUsize::new(0));
    let mut index = CountingIndex::new(2, reconstructions.clone());
    index.append(&Vector::new(vec![1.0, 0.0]))?;

    let metadata = Arc::new(MemoryMetadataStore::new());
    metadata.insert(profile("ada", "SOM", 0))?;
    metadata.insert(profile("ghost", "SOM", 99))?;
    metadata.insert(profile("later", "SEAS", 7))?;
    let engine = SearchEngine::new(generator(2), index, metadata)?;

    let ids = engine.search_vector(
        &Vector::new(vec![0.0, 0.0]),
        &SearchFilter::new().with_school("SOM"),
        5,
    )?;
    assert_eq!(ids, vec![0]);

    let ids = engine.search_vector(
        &Vector::new(vec![0.0, 0.0]),
        &SearchFilter::new().with_school("SEAS"),
        5,
    )?;
    assert!(ids.is_empty());
    assert_eq!(reconstructions.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn clear_restarts_ids_at_zero() -> Result<()> {
    let engine = engine_with_vectors(
        &[[0.0, 0.0], [1.0, 1.0], [2.0, 2.0], [3.0, 3.0], [4.0, 4.0]],
        &[],
    )?;
    assert_eq!(engine.len(), 5);

    engine.clear_index()?;
    assert!(engine.is_empty());
    assert_eq!(engine.append_vector(&Vector::new(vec![9.0, 9.0]))?, 0);
    assert_eq!(
        engine.search_vector(&Vector::new(vec![0.0, 0.0]), &SearchFilter::new(), 3)?,
        vec![0]
    );
    Ok(())
}

#[test]
fn wrong_dimension_is_rejected() -> Result<()> {
    let engine = engine_with_vectors(&[[0.0, 0.0]], &[])?;

    let err = engine
        .search_vector(&Vector::new(vec![0.0, 0.0, 0.0]), &SearchFilter::new(), 1)
        .unwrap_err();
    assert!(matches!(
        err,
        ProfileSearchError::DimensionMismatch {
            expected: 2,
            actual: 3
        }
    ));

    let err = engine.append_vector(&Vector::new(vec![1.0])).unwrap_err();
    assert!(matches!(err, ProfileSearchError::DimensionMismatch { .. }));
    assert_eq!(engine.len(), 1);

    let mismatched = SearchEngine::new(
        generator(3),
        FlatVectorIndex::in_memory(2)?,
        Arc::new(MemoryMetadataStore::new()),
    );
    assert!(mismatched.is_err());
    Ok(())
}

#[tokio::test]
async fn empty_query_is_rejected_before_embedding() -> Result<()> {
    let backend = Arc::new(KeywordBackend::default());
    let engine = keyword_engine(backend.clone())?;

    for query in ["", "   ", "@#$%"] {
        let err = engine.search(&SearchRequest::new(query)).await.unwrap_err();
        assert!(matches!(err, ProfileSearchError::InvalidQuery(_)));
        let err = engine
            .search(&SearchRequest::new(query).with_exact_words(true))
            .await
            .unwrap_err();
        assert!(matches!(err, ProfileSearchError::InvalidQuery(_)));
    }
    assert_eq!(backend.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn semantic_search_embeds_canonical_query() -> Result<()> {
    let backend = Arc::new(KeywordBackend::default());
    let engine = keyword_engine(backend.clone())?;
    engine.append_vector(&Vector::new(vec![0.0, 3.0, 0.0]))?;
    engine.append_vector(&Vector::new(vec![1.0, 0.0, 0.0]))?;
    engine.append_vector(&Vector::new(vec![0.0, 0.0, 1.0]))?;

    let ids = engine
        .search(&SearchRequest::new("  GENOME assembly!! ").with_limit(2))
        .await?;
    assert_eq!(ids[0], 1);
    assert_eq!(ids.len(), 2);
    assert_eq!(backend.calls(), 1);
    assert_eq!(backend.last_text(), Some("genome assembly!!".to_string()));

    assert!(engine.search(&SearchRequest::new("genome").with_limit(0)).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn index_profile_embeds_rendered_profile() -> Result<()> {
    let backend = Arc::new(KeywordBackend::default());
    let engine = keyword_engine(backend.clone())?;

    let mut record = profile("ada", "SOM", 0);
    record.about = Some("Cancer genome evolution".into());
    assert_eq!(engine.index_profile(&record).await?, 0);
    assert_eq!(engine.index_profile(&record).await?, 1);

    let text = backend.last_text().unwrap();
    assert!(text.starts_with("Department: Medicine.School: SOM.About: Cancer genome evolution."));
    assert_eq!(
        engine.search_vector(&Vector::new(vec![1.0, 0.0, 1.0]), &SearchFilter::new(), 1)?,
        vec![0]
    );
    Ok(())
}

#[tokio::test]
async fn exact_search_never_embeds() -> Result<()> {
    let backend = Arc::new(KeywordBackend::default());
    let engine = keyword_engine(backend.clone())?;

    let mut first = profile("ada", "SOM", 2);
    first.about = Some("Studies T-Cell exhaustion".into());
    let mut second = profile("bob", "SEAS", 0);
    second.projects.push(Project {
        project_number: "R01-7".into(),
        terms: Some("t-cell receptor; cytokines".into()),
        ..Default::default()
    });
    let mut third = profile("cy", "SOM", 1);
    third.about = Some("Soft robotics".into());
    for record in [first, second, third] {
        engine.metadata().insert(record)?;
    }

    let ids = engine
        .search(&SearchRequest::new("T-cell").with_exact_words(true))
        .await?;
    assert_eq!(ids, vec![2, 0]);

    let ids = engine
        .search(
            &SearchRequest::new("t-cell")
                .with_exact_words(true)
                .with_filter(SearchFilter::new().with_school("SEAS")),
        )
        .await?;
    assert_eq!(ids, vec![0]);

    let ids = engine
        .search(&SearchRequest::new("t-cell").with_exact_words(true).with_limit(1))
        .await?;
    assert_eq!(ids, vec![2]);

    assert_eq!(backend.calls(), 0);
    Ok(())
}

// Helpers

fn generator(dimension: usize) -> EmbeddingGenerator {
    EmbeddingGenerator::new(Arc::new(KeywordBackend::with_dimension(dimension)))
}

fn profile(name: &str, school: &str, embedding_id: u64) -> ProfileRecord {
    ProfileRecord {
        name: name.into(),
        school: school.into(),
        department: "Medicine".into(),
        email: Some(format!("{name}@example.edu")),
        embedding_id: Some(embedding_id),
        ..Default::default()
    }
}

fn engine_with_vectors<const D: usize>(
    vectors: &[[f32; D]],
    records: &[(&str, &str, u64)],
) -> Result<SearchEngine<FlatVectorIndex, MemoryMetadataStore>> {
    let metadata = Arc::new(MemoryMetadataStore::new());
    for (name, school, id) in records {
        metadata.insert(profile(name, school, *id))?;
    }
    let engine = SearchEngine::new(generator(D), FlatVectorIndex::in_memory(D)?, metadata)?;
    for vector in vectors {
        engine.append_vector(&Vector::new(vector.to_vec()))?;
    }
    Ok(engine)
}

fn keyword_engine(
    backend: Arc<KeywordBackend>,
) -> Result<SearchEngine<FlatVectorIndex, MemoryMetadataStore>> {
    SearchEngine::new(
        EmbeddingGenerator::new(backend),
        FlatVectorIndex::in_memory(KEYWORDS.len())?,
        Arc::new(MemoryMetadataStore::new()),
    )
}

const KEYWORDS: [&str; 3] = ["genome", "robot", "cancer"];

/// Embeds text as keyword occurrence counts.
struct KeywordBackend {
    dimension: usize,
    calls: AtomicUsize,
    last_text: parking_lot::Mutex<Option<String>>,
}

impl Default for KeywordBackend {
    fn default() -> Self {
        Self::with_dimension(KEYWORDS.len())
    }
}

impl KeywordBackend {
    fn with_dimension(dimension: usize) -> Self {
        Self {
            dimension,
            calls: AtomicUsize::new(0),
            last_text: parking_lot::Mutex::new(None),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_text(&self) -> Option<String> {
        self.last_text.lock().clone()
    }
}

#[async_trait]
impl EmbeddingBackend for KeywordBackend {
    async fn embed(&self, text: &str) -> Result<Vector> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_text.lock() = Some(text.to_string());
        let lowered = text.to_lowercase();
        Ok(Vector::new(
            (0..self.dimension)
                .map(|i| {
                    KEYWORDS
                        .get(i)
                        .map_or(0.0, |keyword| lowered.matches(keyword).count() as f32)
                })
                .collect(),
        ))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Flat index that counts `reconstruct_batch` calls.
struct CountingIndex {
    inner: FlatVectorIndex,
    reconstructions: Arc<AtomicUsize>,
}

impl CountingIndex {
    fn new(dimension: usize, reconstructions: Arc<AtomicUsize>) -> Self {
        Self {
            inner: FlatVectorIndex::in_memory(dimension).unwrap(),
            reconstructions,
        }
    }
}

impl VectorIndexBackend for CountingIndex {
    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn append(&mut self, vector: &Vector) -> Result<u64> {
        self.inner.append(vector)
    }

    fn reconstruct_batch(&self, ids: &[u64]) -> Result<Vec<Vector>> {
        self.reconstructions.fetch_add(1, Ordering::SeqCst);
        self.inner.reconstruct_batch(ids)
    }

    fn search_all(&self, query: &Vector, top_k: usize) -> Result<Vec<u64>> {
        self.inner.search_all(query, top_k)
    }

    fn clear(&mut self) -> Result<()> {
        self.inner.clear()
    }
}
