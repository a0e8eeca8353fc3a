//! Per-category feed cache.
//!
//! Every category owns one slot holding the last good [`FeedResult`] and at
//! most one in-flight fetch. Concurrent callers for the same category share
//! that fetch; callers for different categories never contend on a lock.
//! Each fetch is tagged with a sequence number and may only commit if it is
//! newer than what the slot already holds, so a slow fetch that was detached
//! by [`FeedCache::invalidate`] can never overwrite fresher data.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::article::{Article, Category, FeedResult};
use crate::config::CacheConfig;
use crate::error::FetchError;
use crate::fetcher::NewsSource;

type FetchOutcome = Result<Arc<FeedResult>, FetchError>;
type InFlight = Shared<BoxFuture<'static, FetchOutcome>>;

#[derive(Debug, Clone)]
pub struct CachePolicy {
    pub ttl: Duration,
    pub retry_attempts: u32,
    pub retry_backoff: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        (&CacheConfig::default()).into()
    }
}

impl From<&CacheConfig> for CachePolicy {
    fn from(config: &CacheConfig) -> Self {
        Self {
            ttl: Duration::from_secs(config.ttl_secs),
            retry_attempts: config.retry_attempts,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }
}

struct Cached {
    result: Arc<FeedResult>,
    stored_at: Instant,
    expired: bool,
}

#[derive(Default)]
struct SlotState {
    cached: Option<Cached>,
    in_flight: Option<(u64, InFlight)>,
    next_seq: u64,
    committed_seq: u64,
    // Fetches up to this sequence were issued before the last invalidate.
    invalidated_through: u64,
}

#[derive(Default)]
struct Slot {
    state: Mutex<SlotState>,
}

impl Slot {
    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies the outcome of fetch `seq`. Only the fetch owning `seq` calls this.
    fn complete(
        &self,
        category: Category,
        seq: u64,
        outcome: Result<Vec<Article>, FetchError>,
    ) -> FetchOutcome {
        let mut state = self.lock();

        if matches!(state.in_flight, Some((current, _)) if current == seq) {
            state.in_flight = None;
        }

        if seq <= state.committed_seq {
            if let Some(cached) = &state.cached {
                debug!(
                    "Discarding fetch #{} for '{}', #{} already committed",
                    seq, category, state.committed_seq
                );
                return Ok(cached.result.clone());
            }
        }

        match outcome {
            Ok(articles) => {
                let result = Arc::new(FeedResult::new(category, articles));
                let expired = seq <= state.invalidated_through;
                state.committed_seq = seq;
                state.cached = Some(Cached {
                    result: result.clone(),
                    stored_at: Instant::now(),
                    expired,
                });
                info!(
                    "Cached {} articles for '{}' (fetch #{})",
                    result.articles.len(),
                    category,
                    seq
                );
                Ok(result)
            }
            Err(err) => match state.cached.as_mut() {
                Some(cached) => {
                    warn!("Refresh of '{}' failed ({}), serving stale result", category, err);
                    if !cached.result.stale {
                        cached.result = Arc::new(cached.result.marked_stale());
                    }
                    Ok(cached.result.clone())
                }
                None => {
                    error!("Fetching '{}' failed with nothing cached: {}", category, err);
                    Err(err)
                }
            },
        }
    }
}

pub struct FeedCache {
    source: Arc<dyn NewsSource>,
    policy: CachePolicy,
    slots: HashMap<Category, Arc<Slot>>,
}

impl FeedCache {
    pub fn new(source: Arc<dyn NewsSource>, policy: CachePolicy) -> Self {
        let slots = Category::ALL
            .into_iter()
            .map(|category| (category, Arc::new(Slot::default())))
            .collect();

        Self {
            source,
            policy,
            slots,
        }
    }

    fn slot(&self, category: Category) -> &Arc<Slot> {
        // All categories get a slot in `new`.
        &self.slots[&category]
    }

    /// Returns the feed for `category`, fetching only when nothing fresh is cached.
    pub async fn get(&self, category: Category) -> FetchOutcome {
        let slot = self.slot(category);

        let pending = {
            let mut guard = slot.lock();
            let state = &mut *guard;

            if let Some(cached) = &state.cached {
                if !cached.expired && cached.stored_at.elapsed() < self.policy.ttl {
                    debug!("Cache hit for '{}'", category);
                    return Ok(cached.result.clone());
                }
            }

            let joined = state
                .in_flight
                .as_ref()
                .map(|(seq, fetch)| (*seq, fetch.clone()));

            match joined {
                Some((seq, fetch)) => {
                    debug!("Joining in-flight fetch #{} for '{}'", seq, category);
                    fetch
                }
                None => {
                    state.next_seq += 1;
                    let seq = state.next_seq;
                    let fetch = self.start_fetch(category, seq, slot.clone());
                    state.in_flight = Some((seq, fetch.clone()));
                    fetch
                }
            }
        };

        pending.await
    }

    /// Cached result for `category`, if any, without fetching.
    pub fn peek(&self, category: Category) -> Option<Arc<FeedResult>> {
        self.slot(category)
            .lock()
            .cached
            .as_ref()
            .map(|cached| cached.result.clone())
    }

    /// Forces the next `get` to refetch. Cached data stays around for
    /// stale-while-error, and an in-flight fetch is detached so it cannot be
    /// joined by later callers. If the detached fetch lands first it still
    /// fills the slot, but already expired.
    pub fn invalidate(&self, category: Category) {
        let mut state = self.slot(category).lock();
        state.invalidated_through = state.next_seq;

        if let Some(cached) = state.cached.as_mut() {
            cached.expired = true;
        }
        if let Some((seq, _)) = state.in_flight.take() {
            debug!("Detached in-flight fetch #{} for '{}'", seq, category);
        }

        info!("Invalidated '{}'", category);
    }

    fn start_fetch(&self, category: Category, seq: u64, slot: Arc<Slot>) -> InFlight {
        let source = self.source.clone();
        let policy = self.policy.clone();

        async move {
            let outcome = fetch_with_retry(source.as_ref(), category, &policy).await;
            slot.complete(category, seq, outcome)
        }
        .boxed()
        .shared()
    }
}

async fn fetch_with_retry(
    source: &dyn NewsSource,
    category: Category,
    policy: &CachePolicy,
) -> Result<Vec<Article>, FetchError> {
    let mut attempt = 0;

    loop {
        match source.fetch(category).await {
            Ok(articles) => return Ok(articles),
            Err(err) if err.is_transient() && attempt < policy.retry_attempts => {
                attempt += 1;
                let delay = backoff_delay(policy, attempt);
                warn!(
                    "Fetch of '{}' failed ({}), retry {}/{} in {:?}",
                    category, err, attempt, policy.retry_attempts, delay
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Linear backoff, saturating instead of overflowing on huge configs.
fn backoff_delay(policy: &CachePolicy, attempt: u32) -> Duration {
    policy.retry_backoff.saturating_mul(attempt)
}
