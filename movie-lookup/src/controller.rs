use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, error, info, warn};

use crate::lookup::LookupService;
use crate::recent::{RecentSearchEntry, RecentSearches};
use crate::schema::{self, MovieResult};
use crate::storage::RecentStorage;

/// Externally visible lifecycle of one search. A single tagged variant so a
/// stale result can never coexist with a loading flag.
#[derive(Debug, Clone)]
pub enum SearchState {
    Idle,
    Loading,
    Success(MovieResult),
    Failed(SearchFailure),
}

/// Why a search settled without a result.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchFailure {
    /// The service definitively found no match. No cache mutation.
    NotFound { query: String },
    /// Transport failure, provider exception, or a response that failed
    /// schema validation. The causes are logged separately but the user sees
    /// one generic message.
    Service,
}

impl SearchFailure {
    pub fn user_message(&self) -> String {
        match self {
            SearchFailure::NotFound { query } => format!(
                "Couldn't find \"{query}\". Try checking the spelling or searching for a different movie."
            ),
            SearchFailure::Service => "Something went wrong. Please try again.".to_string(),
        }
    }
}

/// Read-only view handed to the presentation layer: the current state plus
/// the recent-search list. Nothing here grants mutation access.
#[derive(Debug, Clone)]
pub struct SearchSnapshot {
    pub state: SearchState,
    pub recent: Vec<RecentSearchEntry>,
}

/// Coordinates user intent, the lookup call, the recent-search cache, and the
/// exposed state.
///
/// At most one lookup is in flight at a time: a submit while `Loading` is
/// rejected at the boundary. Every accepted submit bumps a generation
/// counter, and a response is applied only if its generation is still
/// current, so a lookup that outlives a `reset` settles into nothing.
pub struct SearchController {
    lookup: Arc<dyn LookupService>,
    recent: RecentSearches,
    state: Mutex<SearchState>,
    generation: AtomicU64,
}

impl SearchController {
    /// Build the controller and load the recent-search cache once.
    pub async fn start(lookup: Arc<dyn LookupService>, storage: Arc<dyn RecentStorage>) -> Self {
        let recent = RecentSearches::new(storage);
        let loaded = recent.load().await;
        info!(entries = loaded.len(), "search controller started");
        Self {
            lookup,
            recent,
            state: Mutex::new(SearchState::Idle),
            generation: AtomicU64::new(0),
        }
    }

    /// Submit a free-text query and drive it to a settled state.
    ///
    /// An empty or whitespace-only query is silently ignored. A submit while
    /// a lookup is in flight has no observable effect beyond returning the
    /// current snapshot.
    pub async fn submit(&self, query: &str) -> SearchSnapshot {
        let query = query.trim();
        if query.is_empty() {
            return self.snapshot().await;
        }

        let generation = {
            let mut state = self.state.lock().unwrap();
            if matches!(*state, SearchState::Loading) {
                None
            } else {
                // Entering Loading drops any previous payload immediately.
                *state = SearchState::Loading;
                Some(self.generation.fetch_add(1, Ordering::SeqCst) + 1)
            }
        };
        let Some(generation) = generation else {
            debug!(%query, "submit rejected: a lookup is already in flight");
            return self.snapshot().await;
        };

        info!(%query, "movie lookup started");
        let resolved = self.lookup.resolve(query).await;

        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(%query, "discarding stale lookup response");
            return self.snapshot().await;
        }

        let next = match resolved {
            Ok(raw) => match schema::validate(&raw) {
                Ok(movie) if movie.found => {
                    // The cache must reflect the hit before the success state
                    // becomes visible.
                    self.recent.record(&movie.title).await;
                    info!(
                        title = %movie.title,
                        tomatometer = movie.tomatometer,
                        audience_score = movie.audience_score,
                        "movie lookup succeeded"
                    );
                    SearchState::Success(movie)
                }
                Ok(_) => {
                    info!(%query, "lookup found no match");
                    SearchState::Failed(SearchFailure::NotFound {
                        query: query.to_string(),
                    })
                }
                Err(err) => {
                    // Contract drift with the external service.
                    error!(%query, error = %err, "lookup response failed validation");
                    SearchState::Failed(SearchFailure::Service)
                }
            },
            Err(err) => {
                warn!(%query, error = %err, "lookup request failed");
                SearchState::Failed(SearchFailure::Service)
            }
        };

        {
            let mut state = self.state.lock().unwrap();
            if self.generation.load(Ordering::SeqCst) == generation {
                *state = next;
            }
        }
        self.snapshot().await
    }

    /// Re-run a past query. Identical path to [`submit`](Self::submit),
    /// including the move-to-front `record` on success.
    pub async fn select_recent(&self, title: &str) -> SearchSnapshot {
        self.submit(title).await
    }

    /// Drop all recent searches.
    pub async fn clear_recent(&self) -> SearchSnapshot {
        self.recent.clear().await;
        self.snapshot().await
    }

    /// Current state and recent-search list.
    pub async fn snapshot(&self) -> SearchSnapshot {
        let state = self.state.lock().unwrap().clone();
        SearchSnapshot {
            state,
            recent: self.recent.entries().await,
        }
    }

    /// Return to `Idle` and invalidate any in-flight lookup, which will be
    /// discarded when it eventually settles.
    pub fn reset(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        *self.state.lock().unwrap() = SearchState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LookupError;
    use crate::storage::InMemoryRecentStorage;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    fn found_payload(title: &str) -> Value {
        json!({
            "found": true,
            "title": title,
            "year": "2010",
            "tomatometer": 87,
            "audienceScore": 91,
            "freshStatus": "Certified Fresh",
            "cast": ["Leonardo DiCaprio", "Joseph Gordon-Levitt"],
        })
    }

    /// Replays a scripted sequence of responses and counts invocations.
    struct ScriptedLookup {
        responses: Mutex<VecDeque<Result<Value, LookupError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedLookup {
        fn new(responses: Vec<Result<Value, LookupError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LookupService for ScriptedLookup {
        async fn resolve(&self, _query: &str) -> Result<Value, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(LookupError::Transport("script exhausted".into())))
        }
    }

    /// Holds every lookup in flight until the gate opens.
    struct GatedLookup {
        gate: Notify,
        calls: AtomicUsize,
        payload: Value,
    }

    impl GatedLookup {
        fn new(payload: Value) -> Arc<Self> {
            Arc::new(Self {
                gate: Notify::new(),
                calls: AtomicUsize::new(0),
                payload,
            })
        }
    }

    #[async_trait]
    impl LookupService for GatedLookup {
        async fn resolve(&self, _query: &str) -> Result<Value, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.gate.notified().await;
            Ok(self.payload.clone())
        }
    }

    async fn controller_with(lookup: Arc<dyn LookupService>) -> SearchController {
        SearchController::start(lookup, Arc::new(InMemoryRecentStorage::new())).await
    }

    async fn wait_for_loading(controller: &SearchController) {
        for _ in 0..100 {
            if matches!(controller.snapshot().await.state, SearchState::Loading) {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("controller never entered Loading");
    }

    #[tokio::test]
    async fn empty_submit_stays_idle_and_issues_no_lookup() {
        let lookup = ScriptedLookup::new(vec![]);
        let controller = controller_with(lookup.clone()).await;

        let snapshot = controller.submit("").await;
        assert!(matches!(snapshot.state, SearchState::Idle));
        let snapshot = controller.submit("   ").await;
        assert!(matches!(snapshot.state, SearchState::Idle));
        assert_eq!(lookup.calls(), 0);
    }

    #[tokio::test]
    async fn successful_lookup_exposes_result_and_records_the_title() {
        let lookup = ScriptedLookup::new(vec![Ok(found_payload("Inception"))]);
        let controller = controller_with(lookup.clone()).await;

        let snapshot = controller.submit("inception movie").await;
        match snapshot.state {
            SearchState::Success(movie) => {
                assert_eq!(movie.title, "Inception");
                assert_eq!(movie.tomatometer, 87);
            }
            other => panic!("expected Success, got {other:?}"),
        }
        assert_eq!(snapshot.recent[0].title, "Inception");
        assert_eq!(lookup.calls(), 1);
    }

    #[tokio::test]
    async fn definitive_miss_fails_with_the_queried_title_and_no_cache_change() {
        let lookup = ScriptedLookup::new(vec![Ok(json!({ "found": false }))]);
        let controller = controller_with(lookup).await;

        let snapshot = controller.submit("zzzqqq123").await;
        match &snapshot.state {
            SearchState::Failed(failure) => {
                assert_eq!(
                    failure,
                    &SearchFailure::NotFound {
                        query: "zzzqqq123".to_string()
                    }
                );
                assert!(failure.user_message().contains("zzzqqq123"));
            }
            other => panic!("expected Failed, got {other:?}"),
        }
        assert!(snapshot.recent.is_empty());
    }

    #[tokio::test]
    async fn transport_failure_fails_generically_and_leaves_cache_untouched() {
        let lookup =
            ScriptedLookup::new(vec![Err(LookupError::Transport("connection reset".into()))]);
        let controller = controller_with(lookup).await;

        let snapshot = controller.submit("Inception").await;
        match &snapshot.state {
            SearchState::Failed(failure) => {
                assert_eq!(failure, &SearchFailure::Service);
                assert_eq!(failure.user_message(), "Something went wrong. Please try again.");
            }
            other => panic!("expected Failed, got {other:?}"),
        }
        assert!(snapshot.recent.is_empty());
    }

    #[tokio::test]
    async fn invalid_response_shape_is_a_service_failure() {
        let lookup = ScriptedLookup::new(vec![Ok(json!({ "title": "Inception" }))]);
        let controller = controller_with(lookup).await;

        let snapshot = controller.submit("Inception").await;
        assert!(matches!(
            snapshot.state,
            SearchState::Failed(SearchFailure::Service)
        ));
        assert!(snapshot.recent.is_empty());
    }

    #[tokio::test]
    async fn failed_state_reenters_loading_on_the_next_submit() {
        let lookup = ScriptedLookup::new(vec![
            Ok(json!({ "found": false })),
            Ok(found_payload("Up")),
        ]);
        let controller = controller_with(lookup.clone()).await;

        let first = controller.submit("Up movie").await;
        assert!(matches!(first.state, SearchState::Failed(_)));

        // No Idle round-trip required between searches.
        let second = controller.submit("Up").await;
        assert!(matches!(second.state, SearchState::Success(_)));
        assert_eq!(lookup.calls(), 2);
    }

    #[tokio::test]
    async fn selecting_a_recent_entry_follows_the_identical_path() {
        let lookup = ScriptedLookup::new(vec![
            Ok(found_payload("Inception")),
            Ok(found_payload("Up")),
            Ok(found_payload("Inception")),
        ]);
        let controller = controller_with(lookup.clone()).await;

        controller.submit("Inception").await;
        controller.submit("Up").await;
        let snapshot = controller.select_recent("Inception").await;

        assert!(matches!(snapshot.state, SearchState::Success(_)));
        assert_eq!(lookup.calls(), 3);
        // Move-to-front dedup, exactly one Inception entry.
        assert_eq!(snapshot.recent.len(), 2);
        assert_eq!(snapshot.recent[0].title, "Inception");
        assert_eq!(snapshot.recent[1].title, "Up");
    }

    #[tokio::test]
    async fn submit_while_loading_has_no_observable_effect() {
        let lookup = GatedLookup::new(found_payload("Inception"));
        let controller = Arc::new(controller_with(lookup.clone()).await);

        let in_flight = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.submit("Inception").await })
        };
        wait_for_loading(&controller).await;

        let rejected = controller.submit("Up").await;
        assert!(matches!(rejected.state, SearchState::Loading));
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);

        lookup.gate.notify_one();
        let settled = in_flight.await.unwrap();
        assert!(matches!(settled.state, SearchState::Success(_)));
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stale_response_after_reset_is_discarded() {
        let lookup = GatedLookup::new(found_payload("Inception"));
        let controller = Arc::new(controller_with(lookup.clone()).await);

        let in_flight = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.submit("Inception").await })
        };
        wait_for_loading(&controller).await;

        controller.reset();
        lookup.gate.notify_one();
        let settled = in_flight.await.unwrap();

        // The late response must not reach the state or the cache.
        assert!(matches!(settled.state, SearchState::Idle));
        let snapshot = controller.snapshot().await;
        assert!(matches!(snapshot.state, SearchState::Idle));
        assert!(snapshot.recent.is_empty());
    }

    #[tokio::test]
    async fn clear_recent_empties_the_list() {
        let lookup = ScriptedLookup::new(vec![Ok(found_payload("Inception"))]);
        let controller = controller_with(lookup).await;

        controller.submit("Inception").await;
        let snapshot = controller.clear_recent().await;
        assert!(snapshot.recent.is_empty());
        // The settled result itself is unaffected.
        assert!(matches!(snapshot.state, SearchState::Success(_)));
    }
}
