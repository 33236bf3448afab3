//! Browser automation for card rendering.
//!
//! Drives headless Chrome over CDP via `chromiumoxide`: one browser process,
//! one reusable page, relaunched on demand when the connection drops.
//!
//! # Module Structure
//!
//! - [`launch`] - Executable discovery and profile directories
//! - [`session`] - Session lifecycle and the production `SessionDriver`

pub mod launch;
pub mod session;

pub use launch::{default_profile_dir, locate_executable, BROWSER_ENV};
pub use session::ChromeSession;
