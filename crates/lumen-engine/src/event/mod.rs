//! Window events and their dispatch.
//!
//! Platform backends translate native events into [`Event`]; the controller's
//! event thread hands each one to the [`EventDispatcher`], which notifies the
//! listeners registered for that event kind.

mod dispatch;
mod types;

pub use dispatch::{EventDispatcher, ListenerId};
pub use types::{
    Event, EventKind, Key, KeyEvent, KeyState, Modifiers, MouseButton, MouseEvent, WheelDelta,
};
