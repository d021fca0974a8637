//! Engine configuration.
//!
//! Every field has a default, so a TOML file only needs the keys it changes:
//!
//! ```toml
//! min_version = { major = 3, minor = 3 }
//! loop_join_timeout_ms = 2000
//!
//! [window]
//! title = "viewer"
//! width = 1280
//! height = 720
//!
//! [signals]
//! handle_terminate = false
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::context::{ApiVersion, ContextCreationPolicy, FramebufferRequest, WindowGeometry};
use crate::render::ClearColor;
use crate::runtime::SignalPolicy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub vsync: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "lumen".to_string(),
            x: 0,
            y: 0,
            width: 800,
            height: 600,
            vsync: true,
        }
    }
}

impl WindowConfig {
    pub fn geometry(&self) -> WindowGeometry {
        WindowGeometry::new(self.x, self.y, self.width, self.height)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub window: WindowConfig,
    /// Oldest graphics API version `init` accepts.
    pub min_version: ApiVersion,
    pub signals: SignalPolicy,
    pub creation_policy: ContextCreationPolicy,
    /// How long `quit` waits for each loop before giving up on it.
    pub loop_join_timeout_ms: u64,
    /// Wake-up interval while waiting for a pause to be acknowledged.
    pub pause_poll_interval_ms: u64,
    /// Sleep of the event loop when no event is pending.
    pub event_poll_interval_ms: u64,
    pub quit_on_window_close: bool,
    pub framebuffer: FramebufferRequest,
    /// RGBA clear colour applied before every frame.
    pub clear_color: [f32; 4],
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            min_version: ApiVersion::new(3, 3),
            signals: SignalPolicy::default(),
            creation_policy: ContextCreationPolicy::platform_default(),
            loop_join_timeout_ms: 1000,
            pause_poll_interval_ms: 10,
            event_poll_interval_ms: 1,
            quit_on_window_close: true,
            framebuffer: FramebufferRequest::default(),
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).context("invalid engine configuration")
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("failed to load {}", path.display()))
    }

    pub fn loop_join_timeout(&self) -> Duration {
        Duration::from_millis(self.loop_join_timeout_ms)
    }

    pub fn pause_poll_interval(&self) -> Duration {
        Duration::from_millis(self.pause_poll_interval_ms.max(1))
    }

    pub fn event_poll_interval(&self) -> Duration {
        Duration::from_millis(self.event_poll_interval_ms)
    }

    pub fn clear_color(&self) -> ClearColor {
        let [r, g, b, a] = self.clear_color;
        ClearColor::rgba(r, g, b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_values() {
        let config = EngineConfig::default();
        assert_eq!(config.loop_join_timeout(), Duration::from_secs(1));
        assert_eq!(config.pause_poll_interval(), Duration::from_millis(10));
        assert_eq!((config.window.width, config.window.height), (800, 600));
        assert!(config.signals.handle_interrupt && config.signals.handle_terminate);
        assert_eq!(config.framebuffer.depth, 24);
        assert_eq!(config.framebuffer.stencil, 8);
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            min_version = { major = 4, minor = 1 }
            creation_policy = "create_on_event_loop_thread"

            [window]
            title = "demo"
            width = 1024

            [signals]
            handle_terminate = false
            "#,
        )
        .unwrap();

        assert_eq!(config.min_version, ApiVersion::new(4, 1));
        assert_eq!(config.creation_policy, ContextCreationPolicy::CreateOnEventLoopThread);
        assert_eq!(config.window.title, "demo");
        assert_eq!(config.window.width, 1024);
        assert_eq!(config.window.height, 600);
        assert!(config.signals.handle_interrupt);
        assert!(!config.signals.handle_terminate);
    }

    #[test]
    fn bad_toml_is_an_error() {
        let err = EngineConfig::from_toml_str("loop_join_timeout_ms = \"soon\"").unwrap_err();
        assert!(format!("{err:#}").contains("invalid engine configuration"));
    }
}
