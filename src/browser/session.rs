//! Chrome session lifecycle and the production [`SessionDriver`].
//!
//! One browser process and one reusable page, owned exclusively by the render
//! pipeline. A session is replaced wholesale on forced restart, never patched
//! in place; all teardown is best-effort and never surfaces to callers.

use std::fs;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::error::CdpError;
use chromiumoxide::{Element, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::launch::{default_profile_dir, fallback_profile_dir, locate_executable};
use crate::error::{RenderError, Result};
use crate::pipeline::SessionDriver;
use crate::{RenderConfig, Viewport};

/// Deadline for the browser process to exit during teardown. When the
/// websocket is already dead, `close` cannot reach Chrome and the orphaned
/// process may never exit on its own; the reap must not hold the pipeline
/// lock indefinitely.
const REAP_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of waiting for the browser process to exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reap {
    Exited,
    WaitFailed,
    DeadlineExceeded,
}

/// Waits for process exit, bounded by `deadline`.
async fn reap_with_deadline<F, T, E>(wait: F, deadline: Duration) -> Reap
where
    F: Future<Output = std::result::Result<T, E>>,
    E: std::fmt::Display,
{
    match timeout(deadline, wait).await {
        Ok(Ok(_)) => Reap::Exited,
        Ok(Err(error)) => {
            warn!(%error, "failed to reap browser process during teardown");
            Reap::WaitFailed
        }
        Err(_) => {
            warn!(?deadline, "browser process did not exit before deadline");
            Reap::DeadlineExceeded
        }
    }
}

/// Message fragments that identify a dead session when the error variant
/// alone is not conclusive. Not a stable contract of the automation library;
/// revisit on upgrades.
const SESSION_FAULT_MARKERS: &[&str] = &[
    "session closed",
    "target closed",
    "browser closed",
    "connection closed",
    "connection is closed",
    "websocket",
    "crashed",
];

/// True when an error message reads like a disconnected or crashed session.
pub(crate) fn message_indicates_session_fault(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    SESSION_FAULT_MARKERS
        .iter()
        .any(|marker| lower.contains(marker))
}

fn is_session_fault(err: &CdpError) -> bool {
    // Structured variants first: transport-level failures always mean the
    // session is gone. Fall back to message matching for the rest.
    match err {
        CdpError::Ws(_) | CdpError::ChannelSendError(_) => true,
        other => message_indicates_session_fault(&other.to_string()),
    }
}

/// Maps an automation error into the orchestrator taxonomy.
pub(crate) fn from_cdp(err: CdpError) -> RenderError {
    if is_session_fault(&err) {
        RenderError::Session(err.to_string())
    } else {
        RenderError::Protocol(err.to_string())
    }
}

/// One live browser process plus its CDP event loop and reusable page.
struct BrowserSession {
    browser: Browser,
    event_loop: JoinHandle<()>,
    page: Option<Page>,
    /// Set when this session launched against the temporary fallback
    /// profile; the directory is deleted on teardown.
    temp_profile: Option<PathBuf>,
}

impl BrowserSession {
    /// The CDP event loop ends when the connection to Chrome drops, so a
    /// finished task means a disconnected session.
    fn is_connected(&self) -> bool {
        !self.event_loop.is_finished()
    }

    async fn launch(
        executable: &PathBuf,
        profile_dir: PathBuf,
        viewport: Viewport,
        ephemeral_profile: bool,
    ) -> Result<Self> {
        fs::create_dir_all(&profile_dir).map_err(|err| {
            RenderError::Launch(format!(
                "cannot create profile dir {}: {}",
                profile_dir.display(),
                err
            ))
        })?;

        let config = BrowserConfig::builder()
            .chrome_executable(executable)
            .user_data_dir(&profile_dir)
            .window_size(viewport.width, viewport.height)
            .build()
            .map_err(RenderError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|err| RenderError::Launch(err.to_string()))?;

        let event_loop = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(error) = event {
                    debug!(%error, "cdp event loop terminated");
                    break;
                }
            }
        });

        info!(profile = %profile_dir.display(), "browser session launched");
        Ok(Self {
            browser,
            event_loop,
            page: None,
            temp_profile: ephemeral_profile.then_some(profile_dir),
        })
    }

    /// Closes page, browser, then the event loop. Every step is best-effort
    /// and deadline-bounded; a process that will not exit gets killed.
    async fn teardown(mut self) {
        if let Some(page) = self.page.take() {
            if let Err(error) = page.close().await {
                warn!(%error, "failed to close page during teardown");
            }
        }
        let close_failed = match self.browser.close().await {
            Ok(_) => false,
            Err(error) => {
                warn!(%error, "failed to close browser during teardown");
                true
            }
        };
        let reap = reap_with_deadline(self.browser.wait(), REAP_TIMEOUT).await;
        if close_failed || reap != Reap::Exited {
            if let Some(Err(error)) = self.browser.kill().await {
                debug!(%error, "failed to kill browser process");
            }
        }
        self.event_loop.abort();
        if let Some(dir) = self.temp_profile.take() {
            if let Err(error) = fs::remove_dir_all(&dir) {
                debug!(%error, dir = %dir.display(), "failed to remove temporary profile");
            }
        }
    }
}

/// The production [`SessionDriver`], driving Chrome over CDP.
pub struct ChromeSession {
    executable: Option<PathBuf>,
    profile_dir: Option<PathBuf>,
    viewport: Viewport,
    session: Option<BrowserSession>,
}

impl ChromeSession {
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            executable: config.executable.clone(),
            profile_dir: config.profile_dir.clone(),
            viewport: config.viewport,
            session: None,
        }
    }

    async fn launch_session(&self) -> Result<BrowserSession> {
        let executable = locate_executable(self.executable.as_deref())?;
        let profile = self
            .profile_dir
            .clone()
            .unwrap_or_else(default_profile_dir);

        match BrowserSession::launch(&executable, profile, self.viewport, false).await {
            Ok(session) => Ok(session),
            Err(error) => {
                // Persistent profiles fail on lock contention after unclean
                // exits; one retry against a fresh temp profile.
                warn!(%error, "launch against persistent profile failed; retrying with temporary profile");
                let temp = fallback_profile_dir();
                BrowserSession::launch(&executable, temp, self.viewport, true).await
            }
        }
    }

    fn page(&self) -> Result<&Page> {
        self.session
            .as_ref()
            .and_then(|session| session.page.as_ref())
            .ok_or_else(|| RenderError::Session("no page available".to_string()))
    }
}

impl SessionDriver for ChromeSession {
    type Target = Element;

    async fn ensure_ready(&mut self, force_restart: bool) -> Result<()> {
        let usable = self
            .session
            .as_ref()
            .is_some_and(|session| session.is_connected());
        if usable && !force_restart {
            return Ok(());
        }

        if let Some(stale) = self.session.take() {
            stale.teardown().await;
        }
        self.session = Some(self.launch_session().await?);
        Ok(())
    }

    async fn prepare_page(&mut self, viewport: Viewport) -> Result<()> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| RenderError::Session("no live session".to_string()))?;

        if session.page.is_none() {
            let page = session
                .browser
                .new_page("about:blank")
                .await
                .map_err(from_cdp)?;
            session.page = Some(page);
        }

        let metrics = SetDeviceMetricsOverrideParams::builder()
            .width(viewport.width as i64)
            .height(viewport.height as i64)
            .device_scale_factor(1.0)
            .mobile(false)
            .build()
            .map_err(RenderError::Protocol)?;
        self.page()?.execute(metrics).await.map_err(from_cdp)?;
        Ok(())
    }

    async fn set_content(&mut self, html: &str) -> Result<()> {
        self.page()?.set_content(html).await.map_err(from_cdp)?;
        Ok(())
    }

    async fn query_target(&mut self, selector: &str) -> Result<Element> {
        match self.page()?.find_element(selector).await {
            Ok(element) => Ok(element),
            Err(err) if is_session_fault(&err) => Err(RenderError::Session(err.to_string())),
            Err(_) => Err(RenderError::MissingTarget {
                selector: selector.to_string(),
            }),
        }
    }

    async fn screenshot(&mut self, target: &Element) -> Result<Vec<u8>> {
        target
            .screenshot(CaptureScreenshotFormat::Jpeg)
            .await
            .map_err(from_cdp)
    }

    async fn close_page(&mut self) {
        if let Some(session) = self.session.as_mut() {
            if let Some(page) = session.page.take() {
                if let Err(error) = page.close().await {
                    warn!(%error, "failed to close page");
                }
            }
        }
    }

    async fn close_all(&mut self) {
        if let Some(session) = self.session.take() {
            session.teardown().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disconnect_messages_classify_as_session_faults() {
        for message in [
            "Session closed. Most likely the page has been closed.",
            "Target closed",
            "Browser closed before response arrived",
            "Connection is closed",
            "the renderer process crashed",
            "WebSocket protocol error",
        ] {
            assert!(
                message_indicates_session_fault(message),
                "expected session fault for: {message}"
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn hung_process_reap_gives_up_at_the_deadline() {
        // A process that never exits must not stall teardown forever.
        let wait = std::future::pending::<std::result::Result<(), String>>();
        let reap = reap_with_deadline(wait, REAP_TIMEOUT).await;
        assert_eq!(reap, Reap::DeadlineExceeded);
    }

    #[tokio::test]
    async fn clean_exit_reaps_without_a_kill() {
        let reap = reap_with_deadline(
            std::future::ready(Ok::<(), String>(())),
            REAP_TIMEOUT,
        )
        .await;
        assert_eq!(reap, Reap::Exited);
    }

    #[tokio::test]
    async fn wait_error_is_reported_not_swallowed_as_exit() {
        let reap = reap_with_deadline(
            std::future::ready(Err::<(), String>("no child process".to_string())),
            REAP_TIMEOUT,
        )
        .await;
        assert_eq!(reap, Reap::WaitFailed);
    }

    #[test]
    fn ordinary_errors_are_not_session_faults() {
        for message in [
            "invalid parameters",
            "Could not find node with given id",
            "JavaScript exception in evaluate",
        ] {
            assert!(
                !message_indicates_session_fault(message),
                "expected terminal classification for: {message}"
            );
        }
    }
}
