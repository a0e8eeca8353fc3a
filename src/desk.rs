//! The consumer-facing surface: feeds, the display preference and the clock.

use std::sync::Arc;

use futures::Stream;
use tracing::info;

use crate::article::{Category, FeedResult};
use crate::cache::{CachePolicy, FeedCache};
use crate::clock::{ClockSource, ClockSubscription, ClockTick};
use crate::config::Config;
use crate::error::FetchError;
use crate::fetcher::{GNewsClient, NewsSource};
use crate::partition::{BucketLayout, Buckets};
use crate::preferences::PreferenceStore;

pub struct NewsDesk {
    cache: FeedCache,
    preferences: PreferenceStore,
    clock: ClockSource,
    layout: BucketLayout,
}

impl NewsDesk {
    pub fn new(
        cache: FeedCache,
        preferences: PreferenceStore,
        clock: ClockSource,
        layout: BucketLayout,
    ) -> Self {
        Self {
            cache,
            preferences,
            clock,
            layout,
        }
    }

    /// Wires up the GNews client, cache, preference store and clock from config.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let api_key = config.provider.api_key()?;
        let source: Arc<dyn NewsSource> = Arc::new(GNewsClient::new(&config.provider, api_key)?);
        Self::with_source(config, source)
    }

    /// Like [`NewsDesk::from_config`] but with a caller-supplied news source.
    pub fn with_source(config: &Config, source: Arc<dyn NewsSource>) -> anyhow::Result<Self> {
        let cache = FeedCache::new(source, CachePolicy::from(&config.cache));
        let preferences = PreferenceStore::new(&config.database_url)?;
        let clock = ClockSource::new(config.clock.clone());

        info!(
            "News desk ready (ttl {}s, layout {}/{}/rest)",
            config.cache.ttl_secs, config.layout.important, config.layout.latest
        );
        Ok(Self::new(cache, preferences, clock, config.layout))
    }

    pub async fn get_feed(&self, category: Category) -> Result<Arc<FeedResult>, FetchError> {
        self.cache.get(category).await
    }

    pub fn invalidate(&self, category: Category) {
        self.cache.invalidate(category);
    }

    pub fn layout(&self) -> BucketLayout {
        self.layout
    }

    /// Splits a feed into display columns using the configured layout.
    pub fn partition<'a>(&self, feed: &'a FeedResult) -> Buckets<'a> {
        self.layout.partition(&feed.articles)
    }

    pub async fn preference(&self) -> bool {
        self.preferences.load().await
    }

    pub async fn set_preference(&self, value: bool) {
        self.preferences.save(value).await;
    }

    pub async fn toggle_preference(&self) -> bool {
        self.preferences.toggle().await
    }

    /// Starts a once-per-second clock callback.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn subscribe_clock<F>(&self, callback: F) -> ClockSubscription
    where
        F: FnMut(ClockTick) + Send + 'static,
    {
        self.clock.subscribe(callback)
    }

    pub fn clock_stream(&self) -> impl Stream<Item = ClockTick> + Send + 'static {
        self.clock.ticks()
    }
}
