//! The render pipeline: set content, locate the target node, screenshot it.
//!
//! The shared browser page is not safe for concurrent mutation, so the whole
//! sequence runs under one mutual-exclusion lock. Every stage is bounded by
//! its own timeout, and a recoverable failure on the first attempt buys
//! exactly one forced session restart before the error propagates.

use std::future::Future;

use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::{classify, next_phase, AttemptPhase, RenderError, RenderStage, Result};
use crate::{RenderConfig, Viewport};

/// The seam between render orchestration and browser automation.
///
/// The production implementation drives Chrome over CDP; tests substitute a
/// scripted driver so the retry contract can be exercised without a browser.
pub trait SessionDriver: Send {
    /// Handle to a located DOM node, passed from query to screenshot.
    type Target: Send;

    /// Launches or revives the browser session. With `force_restart`, any
    /// existing session is torn down first (best-effort) and replaced.
    fn ensure_ready(&mut self, force_restart: bool) -> impl Future<Output = Result<()>> + Send;

    /// Makes the reusable page available, creating it if needed.
    fn prepare_page(&mut self, viewport: Viewport) -> impl Future<Output = Result<()>> + Send;

    /// Replaces the page's document with `html`.
    fn set_content(&mut self, html: &str) -> impl Future<Output = Result<()>> + Send;

    /// Resolves `selector` to the node that will be captured.
    fn query_target(&mut self, selector: &str)
        -> impl Future<Output = Result<Self::Target>> + Send;

    /// Captures the located node as a compressed raster image.
    fn screenshot(&mut self, target: &Self::Target) -> impl Future<Output = Result<Vec<u8>>> + Send;

    /// Drops the reusable page. Best-effort; must not fail.
    fn close_page(&mut self) -> impl Future<Output = ()> + Send;

    /// Tears everything down. Best-effort; must not fail.
    fn close_all(&mut self) -> impl Future<Output = ()> + Send;
}

/// Runs renders one at a time against the shared browser session.
pub struct RenderPipeline<D: SessionDriver> {
    driver: Mutex<D>,
    config: RenderConfig,
}

impl<D: SessionDriver> RenderPipeline<D> {
    pub fn new(config: RenderConfig, driver: D) -> Self {
        Self {
            driver: Mutex::new(driver),
            config,
        }
    }

    /// Renders `html` and screenshots the node at `selector`.
    ///
    /// Holds the pipeline lock end-to-end; concurrent callers serialize here.
    pub async fn render(&self, html: &str, selector: &str) -> Result<Vec<u8>> {
        let mut driver = self.driver.lock().await;
        let mut phase = AttemptPhase::First;

        loop {
            let force_restart = phase == AttemptPhase::Retry;
            match self.attempt(&mut *driver, html, selector, force_restart).await {
                Ok(bytes) => return Ok(bytes),
                Err(err) => {
                    driver.close_page().await;
                    match next_phase(phase, classify(&err)) {
                        Some(next) => {
                            warn!(error = %err, "render attempt failed; restarting session for one retry");
                            phase = next;
                        }
                        None => {
                            debug!(error = %err, ?phase, "render failed");
                            return Err(err);
                        }
                    }
                }
            }
        }
    }

    async fn attempt(
        &self,
        driver: &mut D,
        html: &str,
        selector: &str,
        force_restart: bool,
    ) -> Result<Vec<u8>> {
        driver.ensure_ready(force_restart).await?;
        driver.prepare_page(self.config.viewport).await?;

        match timeout(self.config.set_content_timeout, driver.set_content(html)).await {
            Ok(outcome) => outcome?,
            Err(_) => {
                return Err(RenderError::Timeout {
                    stage: RenderStage::SetContent,
                    timeout: self.config.set_content_timeout,
                })
            }
        }

        // A query that never resolves means the node is not in the document;
        // that is a content defect, not a transient fault.
        let target = match timeout(self.config.query_timeout, driver.query_target(selector)).await {
            Ok(outcome) => outcome?,
            Err(_) => {
                return Err(RenderError::MissingTarget {
                    selector: selector.to_string(),
                })
            }
        };

        match timeout(self.config.screenshot_timeout, driver.screenshot(&target)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(RenderError::Timeout {
                stage: RenderStage::Screenshot,
                timeout: self.config.screenshot_timeout,
            }),
        }
    }

    /// Best-effort teardown of the underlying session.
    pub async fn close(&self) {
        let mut driver = self.driver.lock().await;
        driver.close_all().await;
    }
}
