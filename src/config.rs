use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::Viewport;

/// Orchestrator configuration.
///
/// Deserializable from a config-file table; duration fields accept humantime
/// strings (`"25s"`, `"500ms"`). Missing fields fall back to the defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RenderConfig {
    /// Fixed viewport for every render.
    pub viewport: Viewport,
    /// Deadline for pushing the document into the page.
    #[serde(with = "humantime_serde")]
    pub set_content_timeout: Duration,
    /// Deadline for the target selector to resolve.
    #[serde(with = "humantime_serde")]
    pub query_timeout: Duration,
    /// Deadline for capturing the node screenshot.
    #[serde(with = "humantime_serde")]
    pub screenshot_timeout: Duration,
    /// How long a rendered image stays servable.
    #[serde(with = "humantime_serde")]
    pub cache_ttl: Duration,
    /// Upper bound on cached images.
    pub cache_capacity: usize,
    /// Browser executable override; beats the `CARDSHOT_BROWSER` env var and
    /// the OS default install paths.
    pub executable: Option<PathBuf>,
    /// Persistent browser profile directory override.
    pub profile_dir: Option<PathBuf>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            set_content_timeout: Duration::from_secs(25),
            query_timeout: Duration::from_secs(10),
            screenshot_timeout: Duration::from_secs(10),
            cache_ttl: Duration::from_secs(60),
            cache_capacity: 32,
            executable: None,
            profile_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values_match_expected() {
        let cfg = RenderConfig::default();

        assert_eq!(cfg.viewport.width, 900);
        assert_eq!(cfg.viewport.height, 1100);
        assert_eq!(cfg.set_content_timeout, Duration::from_secs(25));
        assert_eq!(cfg.query_timeout, Duration::from_secs(10));
        assert_eq!(cfg.screenshot_timeout, Duration::from_secs(10));
        assert_eq!(cfg.cache_ttl, Duration::from_secs(60));
        assert_eq!(cfg.cache_capacity, 32);
        assert!(cfg.executable.is_none());
        assert!(cfg.profile_dir.is_none());
    }

    #[test]
    fn deserializes_from_toml_with_humantime_durations() {
        let cfg: RenderConfig = toml::from_str(
            r#"
            set-content-timeout = "40s"
            cache-ttl = "2m"
            cache-capacity = 8
            executable = "/opt/chrome/chrome"

            [viewport]
            width = 800
            height = 600
            "#,
        )
        .unwrap();

        assert_eq!(cfg.set_content_timeout, Duration::from_secs(40));
        assert_eq!(cfg.cache_ttl, Duration::from_secs(120));
        assert_eq!(cfg.cache_capacity, 8);
        assert_eq!(cfg.executable, Some(PathBuf::from("/opt/chrome/chrome")));
        assert_eq!(cfg.viewport.width, 800);
        // Untouched fields keep their defaults.
        assert_eq!(cfg.query_timeout, Duration::from_secs(10));
    }

    #[test]
    fn empty_table_is_all_defaults() {
        let cfg: RenderConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.cache_capacity, RenderConfig::default().cache_capacity);
    }
}
