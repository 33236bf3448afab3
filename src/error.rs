use std::time::Duration;
use thiserror::Error;

/// The bounded stage of the render pipeline that produced a timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStage {
    SetContent,
    QueryTarget,
    Screenshot,
}

impl std::fmt::Display for RenderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RenderStage::SetContent => "set-content",
            RenderStage::QueryTarget => "query-target",
            RenderStage::Screenshot => "screenshot",
        };
        f.write_str(name)
    }
}

/// Failures surfaced by the render orchestrator.
///
/// The type is `Clone` so one settled in-flight render can hand the same
/// outcome to every waiter. Teardown failures are not represented here; they
/// are logged and discarded at the point of cleanup and never reach a caller.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    /// No usable browser executable, or launch failed even against the
    /// fallback profile. Fatal; never retried.
    #[error("Browser launch failed: {0}")]
    Launch(String),

    /// A bounded pipeline stage exceeded its deadline.
    #[error("Render stage `{stage}` timed out after {timeout:?}")]
    Timeout {
        stage: RenderStage,
        timeout: Duration,
    },

    /// Content was set but the node to screenshot never appeared. A content
    /// defect, not a transient fault; retrying will not help.
    #[error("Render target `{selector}` not found in document")]
    MissingTarget { selector: String },

    /// The browser session or page reported disconnected/closed, or the
    /// renderer process crashed.
    #[error("Browser session failed: {0}")]
    Session(String),

    /// Any other automation-protocol failure.
    #[error("Browser protocol error: {0}")]
    Protocol(String),
}

pub type Result<T> = std::result::Result<T, RenderError>;

/// Whether a failure is worth one forced session restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Recoverable,
    Terminal,
}

/// Classifies a render failure for the retry state machine.
///
/// Session faults and stage timeouts are the transient shapes headless Chrome
/// produces under load; everything else, including a missing target node,
/// fails the render outright.
pub fn classify(err: &RenderError) -> ErrorClass {
    match err {
        RenderError::Session(_) | RenderError::Timeout { .. } => ErrorClass::Recoverable,
        RenderError::Launch(_) | RenderError::MissingTarget { .. } | RenderError::Protocol(_) => {
            ErrorClass::Terminal
        }
    }
}

/// Position within the bounded retry sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptPhase {
    /// First attempt against whatever session already exists.
    First,
    /// Second attempt, entered after a forced session restart.
    Retry,
}

/// Pure transition function for the bounded retry sequence.
///
/// Returns the next phase to run, or `None` when the error must propagate.
/// Only a recoverable failure on the first attempt buys the single
/// restart-and-retry; the retry attempt never loops.
pub fn next_phase(phase: AttemptPhase, class: ErrorClass) -> Option<AttemptPhase> {
    match (phase, class) {
        (AttemptPhase::First, ErrorClass::Recoverable) => Some(AttemptPhase::Retry),
        _ => None,
    }
}
