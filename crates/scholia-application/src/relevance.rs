//! Debounced, cancellable relevance scoring.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use scholia_core::debounce::Debouncer;
use scholia_core::paper::Paper;
use scholia_core::relevance::{
    EmbeddingCache, EmbeddingProvider, average_embedding, cosine_similarity, relevance_score,
};

/// Cap on the number of candidates scored per cycle, bounding external
/// embedding-call cost.
pub const MAX_SCORED_CANDIDATES: usize = 20;

/// Relevance scores keyed by paper id, 0-100.
pub type ScoreMap = HashMap<String, u8>;

/// Scores candidate papers by semantic closeness to the selected set.
///
/// Recomputation is debounced so rapid selection changes collapse into one
/// cycle, and every cycle owns a cancellation token: starting a new cycle
/// cancels any in-flight one, so a slow superseded request can never
/// overwrite fresher scores. Results are published through a watch channel.
pub struct RelevanceEngine {
    cache: Arc<EmbeddingCache>,
    provider: Arc<dyn EmbeddingProvider>,
    current_cycle: Arc<Mutex<CancellationToken>>,
    scores: watch::Sender<ScoreMap>,
    debouncer: Debouncer<(Vec<Paper>, Vec<Paper>)>,
}

impl RelevanceEngine {
    /// Creates an engine over a shared cache and provider, recomputing
    /// after `delay` of quiet.
    pub fn new(
        cache: Arc<EmbeddingCache>,
        provider: Arc<dyn EmbeddingProvider>,
        delay: Duration,
    ) -> Self {
        let (scores, _) = watch::channel(ScoreMap::new());
        let current_cycle = Arc::new(Mutex::new(CancellationToken::new()));

        let cache_for_cycle = Arc::clone(&cache);
        let provider_for_cycle = Arc::clone(&provider);
        let cycle_slot = Arc::clone(&current_cycle);
        let scores_tx = scores.clone();
        let debouncer = Debouncer::new(
            delay,
            move |(selected, candidates): (Vec<Paper>, Vec<Paper>)| {
                let token = begin_cycle(&cycle_slot);
                let cache = Arc::clone(&cache_for_cycle);
                let provider = Arc::clone(&provider_for_cycle);
                let scores_tx = scores_tx.clone();
                tokio::spawn(async move {
                    let map =
                        compute_scores(&cache, provider.as_ref(), &selected, &candidates, &token)
                            .await;
                    if token.is_cancelled() {
                        debug!("superseded relevance cycle discarded");
                        return;
                    }
                    scores_tx.send_replace(map);
                });
            },
        );

        Self {
            cache,
            provider,
            current_cycle,
            scores,
            debouncer,
        }
    }

    /// Schedules a debounced recomputation for the given selection and
    /// candidate set. Bursts collapse to one cycle using the last inputs.
    pub fn schedule(&self, selected: Vec<Paper>, candidates: Vec<Paper>) {
        self.debouncer.schedule((selected, candidates));
    }

    /// Recomputes immediately, bypassing the debounce window. Cancels any
    /// in-flight cycle, publishes (unless superseded meanwhile), and
    /// returns the computed map.
    pub async fn recompute_now(&self, selected: &[Paper], candidates: &[Paper]) -> ScoreMap {
        let token = begin_cycle(&self.current_cycle);
        let map =
            compute_scores(&self.cache, self.provider.as_ref(), selected, candidates, &token).await;
        if !token.is_cancelled() {
            self.scores.send_replace(map.clone());
        }
        map
    }

    /// Subscribes to published score maps.
    pub fn subscribe(&self) -> watch::Receiver<ScoreMap> {
        self.scores.subscribe()
    }

    /// Cancels any in-flight cycle without starting a new one. Also drops a
    /// pending debounced trigger.
    pub fn cancel(&self) {
        self.debouncer.cancel();
        self.current_cycle
            .lock()
            .expect("relevance cycle lock poisoned")
            .cancel();
    }

    /// The embedding cache this engine resolves through.
    pub fn cache(&self) -> &Arc<EmbeddingCache> {
        &self.cache
    }
}

/// Cancels the previous cycle's token and installs a fresh one.
fn begin_cycle(slot: &Arc<Mutex<CancellationToken>>) -> CancellationToken {
    let mut current = slot.lock().expect("relevance cycle lock poisoned");
    current.cancel();
    let token = CancellationToken::new();
    *current = token.clone();
    token
}

async fn compute_scores(
    cache: &EmbeddingCache,
    provider: &dyn EmbeddingProvider,
    selected: &[Paper],
    candidates: &[Paper],
    token: &CancellationToken,
) -> ScoreMap {
    if selected.is_empty() || candidates.is_empty() {
        return ScoreMap::new();
    }

    let scored: Vec<&Paper> = candidates.iter().take(MAX_SCORED_CANDIDATES).collect();
    let mut papers: Vec<Paper> = selected.to_vec();
    papers.extend(scored.iter().map(|p| (*p).clone()));

    if let Err(err) = cache.resolve(&papers, provider, token).await {
        warn!(%err, "embedding resolution failed; scores degrade to empty");
        return ScoreMap::new();
    }
    if token.is_cancelled() {
        return ScoreMap::new();
    }

    let selected_vectors: Vec<Vec<f32>> = selected
        .iter()
        .filter_map(|p| cache.get(&p.paper_id))
        .collect();
    let Some(centroid) = average_embedding(&selected_vectors) else {
        return ScoreMap::new();
    };

    let mut map = ScoreMap::new();
    for paper in scored {
        if let Some(vector) = cache.get(&paper.paper_id) {
            map.insert(
                paper.paper_id.clone(),
                relevance_score(cosine_similarity(&centroid, &vector)),
            );
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use scholia_core::{Result, ScholiaError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn paper(id: &str, title: &str) -> Paper {
        Paper {
            paper_id: id.to_string(),
            title: title.to_string(),
            abstract_text: None,
            year: Some(2020),
            authors: Vec::new(),
            citation_count: 0,
            url: format!("https://papers.example/{}", id),
            pdf_url: None,
            slug: None,
            snapshots: Vec::new(),
        }
    }

    /// Deterministic provider: the vector depends only on the text, so two
    /// papers with the same title embed identically. The first call can be
    /// slowed down to keep a cycle in flight.
    struct MockProvider {
        calls: AtomicUsize,
        first_call_delay: Option<Duration>,
        fail: bool,
    }

    impl MockProvider {
        fn instant() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                first_call_delay: None,
                fail: false,
            }
        }

        fn slow_first_call(delay: Duration) -> Self {
            Self {
                first_call_delay: Some(delay),
                ..Self::instant()
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::instant()
            }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for MockProvider {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call == 0 {
                if let Some(delay) = self.first_call_delay {
                    tokio::time::sleep(delay).await;
                }
            }
            if self.fail {
                return Err(ScholiaError::embedding("mock failure"));
            }
            Ok(texts
                .iter()
                .map(|t| {
                    let sum: f32 = t.bytes().map(|b| b as f32).sum();
                    vec![sum, t.len() as f32]
                })
                .collect())
        }
    }

    fn engine_with(provider: MockProvider, delay_ms: u64) -> RelevanceEngine {
        RelevanceEngine::new(
            Arc::new(EmbeddingCache::new()),
            Arc::new(provider),
            Duration::from_millis(delay_ms),
        )
    }

    #[tokio::test]
    async fn identical_papers_score_one_hundred() {
        let engine = engine_with(MockProvider::instant(), 10);
        let selected = vec![paper("s1", "Same Title")];
        let candidates = vec![paper("c1", "Same Title")];

        let scores = engine.recompute_now(&selected, &candidates).await;
        assert_eq!(scores.get("c1"), Some(&100));
    }

    #[tokio::test]
    async fn empty_selection_or_candidates_yield_empty_map() {
        let engine = engine_with(MockProvider::instant(), 10);

        let scores = engine.recompute_now(&[], &[paper("c1", "One")]).await;
        assert!(scores.is_empty());

        let scores = engine.recompute_now(&[paper("s1", "One")], &[]).await;
        assert!(scores.is_empty());
    }

    #[tokio::test]
    async fn candidates_are_capped_per_cycle() {
        let engine = engine_with(MockProvider::instant(), 10);
        let selected = vec![paper("s1", "Selected")];
        let candidates: Vec<Paper> = (0..30)
            .map(|i| paper(&format!("c{}", i), &format!("Candidate {}", i)))
            .collect();

        let scores = engine.recompute_now(&selected, &candidates).await;
        assert_eq!(scores.len(), MAX_SCORED_CANDIDATES);
        assert!(!scores.contains_key("c25"));
    }

    #[tokio::test]
    async fn provider_failure_degrades_to_empty_map() {
        let engine = engine_with(MockProvider::failing(), 10);

        let scores = engine
            .recompute_now(&[paper("s1", "One")], &[paper("c1", "Two")])
            .await;
        assert!(scores.is_empty());
    }

    #[tokio::test]
    async fn superseded_cycle_never_overwrites_fresh_scores() {
        let engine = Arc::new(engine_with(
            MockProvider::slow_first_call(Duration::from_millis(150)),
            10,
        ));

        // Cycle A: slow fetch, will be superseded mid-flight.
        let engine_a = Arc::clone(&engine);
        let cycle_a = tokio::spawn(async move {
            engine_a
                .recompute_now(&[paper("s1", "Selected")], &[paper("a1", "Cycle A")])
                .await
        });
        tokio::time::sleep(Duration::from_millis(30)).await;

        // Cycle B supersedes A and completes first.
        let scores_b = engine
            .recompute_now(&[paper("s1", "Selected")], &[paper("b1", "Cycle B")])
            .await;
        assert!(scores_b.contains_key("b1"));

        // Let A's fetch resolve after B finished.
        cycle_a.await.unwrap();

        let published = engine.subscribe().borrow().clone();
        assert!(published.contains_key("b1"));
        assert!(!published.contains_key("a1"));
    }

    #[tokio::test]
    async fn scheduled_bursts_collapse_and_publish_last_inputs() {
        let engine = engine_with(MockProvider::instant(), 20);
        let mut scores_rx = engine.subscribe();

        for i in 0..5 {
            engine.schedule(
                vec![paper("s1", "Selected")],
                vec![paper(&format!("c{}", i), "Candidate")],
            );
        }
        tokio::time::sleep(Duration::from_millis(150)).await;

        let published = scores_rx.borrow_and_update().clone();
        assert_eq!(published.len(), 1);
        assert!(published.contains_key("c4"));
    }

    #[tokio::test]
    async fn resolved_embeddings_are_cached_across_cycles() {
        let provider = MockProvider::instant();
        let engine = RelevanceEngine::new(
            Arc::new(EmbeddingCache::new()),
            Arc::new(provider),
            Duration::from_millis(10),
        );
        let selected = vec![paper("s1", "Selected")];
        let candidates = vec![paper("c1", "Candidate")];

        engine.recompute_now(&selected, &candidates).await;
        assert_eq!(engine.cache().len(), 2);

        // Second cycle over the same papers needs no provider call; the
        // scores still come out identical.
        let scores = engine.recompute_now(&selected, &candidates).await;
        assert_eq!(scores.len(), 1);
    }
}
