use std::thread::ThreadId;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// Never created.
    Uninitialized,
    /// Created and not bound to any thread.
    Created,
    /// Bound to the given thread.
    Current(ThreadId),
    /// Created at least once, now torn down.
    Destroyed,
}

/// Which thread creates (and destroys) the context.
///
/// Some window systems only deliver events to the thread that created the
/// window; those need `CreateOnEventLoopThread`, and the controller then routes
/// creation and destruction through its event thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextCreationPolicy {
    CreateOnCallerThread,
    CreateOnEventLoopThread,
}

impl ContextCreationPolicy {
    /// Platform default: Windows requires the event loop thread.
    pub fn platform_default() -> Self {
        if cfg!(windows) {
            Self::CreateOnEventLoopThread
        } else {
            Self::CreateOnCallerThread
        }
    }
}

impl Default for ContextCreationPolicy {
    fn default() -> Self {
        Self::platform_default()
    }
}

/// Window position and size in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowGeometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl WindowGeometry {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn aspect(&self) -> f32 {
        self.width.max(1) as f32 / self.height.max(1) as f32
    }
}

impl Default for WindowGeometry {
    fn default() -> Self {
        Self::new(0, 0, 800, 600)
    }
}
