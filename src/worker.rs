//! Index ownership, builds and background refresh.
//!
//! [`IndexState`] owns the current [`SearchIndex`] and serializes builds through a
//! generation counter: every refresh takes the next generation, and a finished build
//! is installed only if no newer refresh has started since. Callers waiting on a build
//! share one future, so concurrent `initialize` calls trigger a single fetch.

use crate::error::IndexError;
use crate::registry::{ExtractOptions, Registry, RegistrySource};
use crate::search::{SearchIndex, SearchMatch};
use crate::types::Record;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

/// Default number of cached query results.
const DEFAULT_CACHE_SIZE: NonZeroUsize = NonZeroUsize::new(128).unwrap();

/// Type alias for shared index build futures.
type SharedBuild = Shared<BoxFuture<'static, Result<Arc<SearchIndex>, IndexError>>>;

/// Results of one query against one index generation.
#[derive(Debug, Clone)]
pub struct QueryResults {
    index: Arc<SearchIndex>,
    matches: Vec<SearchMatch>,
}

impl QueryResults {
    /// Records with their rank, best first.
    pub fn iter(&self) -> impl Iterator<Item = (&Record, u32)> {
        self.matches
            .iter()
            .filter_map(|m| self.index.record(m.doc).map(|record| (record, m.rank)))
    }

    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.iter().map(|(record, _)| record)
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// The index these results were computed against.
    pub fn index(&self) -> &Arc<SearchIndex> {
        &self.index
    }
}

/// Snapshot of the index lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexStatus {
    pub ready: bool,
    pub building: bool,
    /// Generation of the installed index, 0 before the first install.
    pub generation: u64,
    /// Newest generation requested.
    pub latest_requested: u64,
    pub records: usize,
    pub fields: usize,
    pub codes: usize,
    pub terms: usize,
}

/// Installed index, generation counter, in-flight build and query cache.
///
/// Shared with build tasks, which install their own result when they finish.
struct Lifecycle {
    /// Installed index; replaced wholesale by newer generations
    current: RwLock<Option<Arc<SearchIndex>>>,

    /// Newest generation handed out
    latest: AtomicU64,

    /// Build for the newest generation, awaited by any number of callers
    in_flight: Mutex<Option<(u64, SharedBuild)>>,

    /// Query results keyed by query text
    cache: Mutex<LruCache<String, Arc<QueryResults>>>,
}

impl Lifecycle {
    fn current(&self) -> Option<Arc<SearchIndex>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Install a finished build if it is still the newest generation.
    fn complete(
        &self,
        generation: u64,
        result: Result<Arc<SearchIndex>, IndexError>,
    ) -> Result<Arc<SearchIndex>, IndexError> {
        {
            let mut in_flight = lock(&self.in_flight);
            if in_flight.as_ref().is_some_and(|(g, _)| *g == generation) {
                *in_flight = None;
            }
        }

        if generation != self.latest.load(Ordering::SeqCst) {
            tracing::debug!("Discarding result of superseded index build {}", generation);
            return Err(IndexError::Superseded { generation });
        }

        let index = result.inspect_err(|e| {
            tracing::warn!("Index build {} failed: {}", generation, e);
        })?;

        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&index));
        lock(&self.cache).clear();
        tracing::info!(
            "Installed search index {} ({} records)",
            generation,
            index.record_count()
        );
        Ok(index)
    }
}

/// Shared index state: current index, in-flight build and query cache.
pub struct IndexState {
    source: Arc<dyn RegistrySource>,
    options: ExtractOptions,
    result_limit: usize,
    lifecycle: Arc<Lifecycle>,
}

impl std::fmt::Debug for IndexState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexState")
            .field("source", &self.source.describe())
            .field("latest", &self.lifecycle.latest.load(Ordering::SeqCst))
            .field("ready", &self.current().is_some())
            .finish_non_exhaustive()
    }
}

impl IndexState {
    /// Create an empty state. Nothing is fetched until [`Self::initialize`] or
    /// [`Self::refresh`] is called.
    pub fn new(source: Arc<dyn RegistrySource>, options: ExtractOptions) -> Self {
        Self {
            source,
            options,
            result_limit: crate::search::MAX_RESULTS,
            lifecycle: Arc::new(Lifecycle {
                current: RwLock::new(None),
                latest: AtomicU64::new(0),
                in_flight: Mutex::new(None),
                cache: Mutex::new(LruCache::new(DEFAULT_CACHE_SIZE)),
            }),
        }
    }

    /// Bound results per query (never above 1000).
    #[must_use]
    pub fn with_result_limit(mut self, limit: usize) -> Self {
        self.result_limit = limit.clamp(1, crate::search::MAX_RESULTS);
        self
    }

    #[must_use]
    pub fn with_cache_size(self, size: usize) -> Self {
        let size = NonZeroUsize::new(size).unwrap_or(DEFAULT_CACHE_SIZE);
        *lock(&self.lifecycle.cache) = LruCache::new(size);
        self
    }

    /// The installed index, if any.
    pub fn current(&self) -> Option<Arc<SearchIndex>> {
        self.lifecycle.current()
    }

    pub fn is_ready(&self) -> bool {
        self.current().is_some()
    }

    /// Resolve once an index is available.
    ///
    /// Returns the installed index immediately if there is one, otherwise waits for
    /// the in-flight build or starts the first one.
    pub async fn initialize(&self) -> Result<Arc<SearchIndex>, IndexError> {
        loop {
            if let Some(index) = self.current() {
                return Ok(index);
            }

            let pending = lock(&self.lifecycle.in_flight).clone();
            let Some((generation, build)) = pending else {
                return self.refresh().await;
            };

            tracing::debug!("Awaiting in-flight index build {}", generation);
            match build.await {
                Err(IndexError::Superseded { .. }) => continue,
                result => return result,
            }
        }
    }

    /// Rebuild the index from a fresh fetch.
    ///
    /// The result is installed only if no newer refresh started meanwhile; otherwise
    /// this returns [`IndexError::Superseded`] and the newer build wins. Dropping the
    /// returned future does not stop the build.
    pub async fn refresh(&self) -> Result<Arc<SearchIndex>, IndexError> {
        let generation = self.lifecycle.latest.fetch_add(1, Ordering::SeqCst) + 1;
        self.start_build(generation).await
    }

    /// Run `query` against the installed index.
    pub fn query(&self, query: &str) -> Result<Arc<QueryResults>, IndexError> {
        let index = self.current().ok_or(IndexError::IndexNotReady)?;

        if let Some(cached) = lock(&self.lifecycle.cache).get(query)
            && cached.index.generation() == index.generation()
        {
            tracing::trace!("Query cache hit for '{}'", query);
            return Ok(Arc::clone(cached));
        }

        let matches = index.search(query, self.result_limit);
        let results = Arc::new(QueryResults { index, matches });
        lock(&self.lifecycle.cache).put(query.to_string(), Arc::clone(&results));
        Ok(results)
    }

    /// Vocabulary suggestions for a query, empty before the first install.
    pub fn suggest(&self, query: &str, limit: usize) -> Vec<String> {
        self.current()
            .map(|index| index.suggest(query, limit))
            .unwrap_or_default()
    }

    pub fn status(&self) -> IndexStatus {
        let current = self.current();
        IndexStatus {
            ready: current.is_some(),
            building: lock(&self.lifecycle.in_flight).is_some(),
            generation: current.as_ref().map_or(0, |index| index.generation()),
            latest_requested: self.lifecycle.latest.load(Ordering::SeqCst),
            records: current.as_ref().map_or(0, |index| index.record_count()),
            fields: current.as_ref().map_or(0, |index| index.field_count()),
            codes: current.as_ref().map_or(0, |index| index.code_count()),
            terms: current.as_ref().map_or(0, |index| index.term_count()),
        }
    }

    /// Spawn the build task for `generation` and publish it as in-flight.
    ///
    /// The task installs its own result, so it runs to completion whether or not
    /// anyone awaits it.
    fn start_build(&self, generation: u64) -> SharedBuild {
        let source = Arc::clone(&self.source);
        let options = self.options.clone();
        let lifecycle = Arc::clone(&self.lifecycle);

        // Completion takes this lock, so it cannot run before the build is published
        let mut in_flight = lock(&self.lifecycle.in_flight);
        let task = tokio::spawn(async move {
            let result = build_index(source, options, generation).await;
            lifecycle.complete(generation, result)
        });

        let shared = task
            .map(|joined| joined.unwrap_or_else(|e| Err(IndexError::BuildFailed(e.to_string()))))
            .boxed()
            .shared();
        if in_flight.as_ref().is_none_or(|(g, _)| *g < generation) {
            *in_flight = Some((generation, shared.clone()));
        }
        shared
    }
}

/// Fetch, parse and index one registry snapshot.
async fn build_index(
    source: Arc<dyn RegistrySource>,
    options: ExtractOptions,
    generation: u64,
) -> Result<Arc<SearchIndex>, IndexError> {
    tracing::info!("Fetching registry for index build {}", generation);
    let document = source
        .fetch()
        .await
        .map_err(|e| IndexError::source_unavailable(source.describe(), &e))?;

    // Parsing and indexing are CPU-bound
    tokio::task::spawn_blocking(move || -> Result<Arc<SearchIndex>, IndexError> {
        let registry = Registry::from_slice(&document)
            .map_err(|e| IndexError::source_unavailable(source.describe(), &e))?;
        Ok(Arc::new(SearchIndex::from_registry(
            &registry, &options, generation,
        )))
    })
    .await
    .map_err(|e| IndexError::BuildFailed(e.to_string()))?
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Periodically refreshes an [`IndexState`] until cancelled.
pub struct BackgroundRefresher {
    state: Arc<IndexState>,
    period: Duration,
    cancel: CancellationToken,
}

impl BackgroundRefresher {
    pub fn new(state: Arc<IndexState>, period: Duration, cancel: CancellationToken) -> Self {
        Self {
            state,
            period,
            cancel,
        }
    }

    /// Run the refresh loop.
    ///
    /// The first tick completes immediately and is skipped, so the first refresh
    /// happens one period after start. Failures are logged; the previous index
    /// keeps serving queries.
    pub async fn run(&self) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    tracing::debug!("Background refresher stopped");
                    return;
                }
                _ = ticker.tick() => {
                    match self.state.refresh().await {
                        Ok(index) => tracing::info!(
                            "Background refresh installed index {}",
                            index.generation()
                        ),
                        Err(e) => tracing::warn!("Background refresh failed: {}", e),
                    }
                }
            }
        }
    }
}

/// Spawn the background refresher as a tokio task.
///
/// Returns a handle to the spawned task.
pub fn spawn_background_refresher(
    state: Arc<IndexState>,
    period: Duration,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        BackgroundRefresher::new(state, period, cancel).run().await;
    })
}
