//! Browser executable discovery and profile directory layout.

use std::env;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{RenderError, Result};

/// Environment variable overriding browser executable discovery.
pub const BROWSER_ENV: &str = "CARDSHOT_BROWSER";

#[cfg(target_os = "linux")]
const DEFAULT_EXECUTABLES: &[&str] = &[
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
];

#[cfg(target_os = "macos")]
const DEFAULT_EXECUTABLES: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
];

#[cfg(target_os = "windows")]
const DEFAULT_EXECUTABLES: &[&str] = &[
    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files\Chromium\Application\chrome.exe",
];

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
const DEFAULT_EXECUTABLES: &[&str] = &[];

/// Locates a usable browser executable.
///
/// Resolution order: explicit configuration override, the `CARDSHOT_BROWSER`
/// environment variable, then the OS default install paths. A configured path
/// that does not exist is an error rather than a silent fallback.
pub fn locate_executable(configured: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = configured {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        return Err(RenderError::Launch(format!(
            "configured browser executable does not exist: {}",
            path.display()
        )));
    }

    if let Some(path) = env::var_os(BROWSER_ENV).map(PathBuf::from) {
        if path.exists() {
            return Ok(path);
        }
        return Err(RenderError::Launch(format!(
            "{} points at a missing executable: {}",
            BROWSER_ENV,
            path.display()
        )));
    }

    for candidate in DEFAULT_EXECUTABLES {
        let path = Path::new(candidate);
        if path.exists() {
            return Ok(path.to_path_buf());
        }
    }

    Err(RenderError::Launch(format!(
        "no usable browser executable found; install Chrome/Chromium or set {}",
        BROWSER_ENV
    )))
}

/// Persistent per-purpose profile directory under an application-local path.
pub fn default_profile_dir() -> PathBuf {
    let base = env::var_os("XDG_CACHE_HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("HOME").map(|home| PathBuf::from(home).join(".cache")))
        .or_else(|| env::var_os("LOCALAPPDATA").map(PathBuf::from))
        .unwrap_or_else(env::temp_dir);
    base.join("cardshot").join("chrome-profile")
}

/// Uniquely named temporary profile directory for the launch-failure
/// fallback (typically profile lock contention from a crashed run).
pub fn fallback_profile_dir() -> PathBuf {
    static SEQ: AtomicU64 = AtomicU64::new(0);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.subsec_nanos())
        .unwrap_or(0);
    env::temp_dir().join(format!(
        "cardshot-profile-{}-{}-{}",
        process::id(),
        nanos,
        SEQ.fetch_add(1, Ordering::Relaxed)
    ))
}
