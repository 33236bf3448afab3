use serde::{Deserialize, Serialize};

/// Fixed viewport dimensions used for card rendering.
///
/// Cards are laid out for a known width; the default is tall enough for the
/// largest leaderboard card so the target node never clips. Configured as a
/// `{ width, height }` table inside the renderer config and applied to the
/// page via device-metrics emulation before every render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 900,
            height: 1100,
        }
    }
}
