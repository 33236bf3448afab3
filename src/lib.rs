//! Cardshot
//!
//! Render orchestration for a stats bot that answers with images: finished
//! HTML goes in, a screenshot of one DOM node comes out. The crate owns the
//! hard part of that trade, safely sharing a single flaky headless-browser
//! process across many concurrent, often-duplicate requests:
//!
//! - [`browser`] - Chrome session lifecycle (launch, reuse, forced restart)
//! - [`pipeline`] - set-content → query-target → screenshot under one lock,
//!   with per-stage timeouts and one bounded retry
//! - [`cache`] - TTL + capacity bounded image cache
//! - [`singleflight`] - at most one in-flight render per fingerprint
//! - [`renderer`] - the orchestrator tying the above together
//!
//! # Example
//!
//! ```no_run
//! use cardshot::{ChromeRenderer, RenderConfig};
//!
//! # async fn example() -> cardshot::Result<()> {
//! let renderer = ChromeRenderer::new(RenderConfig::default());
//! let image = renderer
//!     .render("<html><body><div id=\"card\">…</div></body></html>", "#card")
//!     .await?;
//! // hand `image` (JPEG bytes) to the messaging layer
//! renderer.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod browser;
pub mod cache;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod pipeline;
pub mod renderer;
pub mod singleflight;
pub mod viewport;

pub use browser::{ChromeSession, BROWSER_ENV};
pub use cache::RenderCache;
pub use config::RenderConfig;
pub use error::{
    classify, next_phase, AttemptPhase, ErrorClass, RenderError, RenderStage, Result,
};
pub use fingerprint::Fingerprint;
pub use pipeline::{RenderPipeline, SessionDriver};
pub use renderer::{ChromeRenderer, Renderer};
pub use singleflight::SingleFlight;
pub use viewport::Viewport;
