//! The render orchestrator: cache, single-flight, and pipeline glued into
//! one entry point for the bot layer.

use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use crate::browser::ChromeSession;
use crate::cache::RenderCache;
use crate::error::Result;
use crate::fingerprint::Fingerprint;
use crate::pipeline::{RenderPipeline, SessionDriver};
use crate::singleflight::SingleFlight;
use crate::RenderConfig;

struct Inner<D: SessionDriver> {
    pipeline: RenderPipeline<D>,
    cache: RenderCache,
    flights: SingleFlight<Fingerprint, Arc<Vec<u8>>>,
}

/// Turns finished HTML into a rendered card image.
///
/// Call path: fingerprint the document, serve from cache when fresh,
/// otherwise collapse concurrent duplicates into one pipeline run and fan the
/// outcome out to every waiter. Cheap to clone; bot handlers share one
/// instance.
pub struct Renderer<D: SessionDriver> {
    inner: Arc<Inner<D>>,
}

impl<D: SessionDriver> Clone for Renderer<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// The production renderer, backed by headless Chrome.
pub type ChromeRenderer = Renderer<ChromeSession>;

impl ChromeRenderer {
    /// Builds a renderer that will launch Chrome on first use.
    pub fn new(config: RenderConfig) -> Self {
        let driver = ChromeSession::new(&config);
        Self::with_driver(config, driver)
    }
}

impl<D: SessionDriver + 'static> Renderer<D> {
    /// Builds a renderer over a custom session driver.
    pub fn with_driver(config: RenderConfig, driver: D) -> Self {
        let cache = RenderCache::new(config.cache_ttl, config.cache_capacity);
        Self {
            inner: Arc::new(Inner {
                pipeline: RenderPipeline::new(config, driver),
                cache,
                flights: SingleFlight::new(),
            }),
        }
    }

    /// Renders `html` and returns a screenshot of the node at `selector`.
    ///
    /// Concurrent calls with identical canonicalized HTML share one render;
    /// results are served from cache while fresh. Every call terminates with
    /// bytes or a typed error; all waiting is deadline-bounded.
    pub async fn render(&self, html: &str, selector: &str) -> Result<Arc<Vec<u8>>> {
        let key = Fingerprint::of(html);

        if let Some(bytes) = self.inner.cache.get(&key, Instant::now()) {
            debug!(%key, "cache hit");
            return Ok(bytes);
        }

        let inner = Arc::clone(&self.inner);
        let html = html.to_string();
        let selector = selector.to_string();
        self.inner
            .flights
            .execute(key, move || async move {
                // A flight that settled between our miss and registration may
                // already have filled the cache.
                if let Some(bytes) = inner.cache.get(&key, Instant::now()) {
                    return Ok(bytes);
                }
                let bytes = Arc::new(inner.pipeline.render(&html, &selector).await?);
                inner.cache.put(key, Arc::clone(&bytes), Instant::now());
                Ok(bytes)
            })
            .await
    }

    /// Tears down the browser session and clears all dependent state.
    ///
    /// Always safe to call, including on an already-closed renderer.
    pub async fn shutdown(&self) {
        self.inner.pipeline.close().await;
        self.inner.cache.clear();
        self.inner.flights.clear();
    }
}
