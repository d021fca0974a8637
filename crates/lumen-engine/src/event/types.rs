use std::fmt;

use crate::context::WindowGeometry;

/// Keyboard key identifier.
///
/// Backends map what they can; the rest arrives as `Unknown` with the platform code.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Key {
    Escape,
    Enter,
    Tab,
    Backspace,
    Space,

    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,

    Shift,
    Control,
    Alt,
    Meta,

    // Letters
    A, B, C, D, E, F, G, H, I, J, K, L, M,
    N, O, P, Q, R, S, T, U, V, W, X, Y, Z,

    // Digits
    Digit0, Digit1, Digit2, Digit3, Digit4,
    Digit5, Digit6, Digit7, Digit8, Digit9,

    F1, F2, F3, F4, F5, F6,
    F7, F8, F9, F10, F11, F12,

    Unknown(u32),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum KeyState {
    Pressed,
    Released,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Other(u16),
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub fn any(&self) -> bool {
        self.shift || self.ctrl || self.alt || self.meta
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub state: KeyState,
    pub modifiers: Modifiers,
    /// Platform scancode when available.
    pub code: u32,
    pub repeat: bool,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum WheelDelta {
    Lines { x: f32, y: f32 },
    Pixels { x: f32, y: f32 },
}

/// Pointer positions are in physical pixels relative to the window.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum MouseEvent {
    Moved {
        x: f32,
        y: f32,
    },
    Button {
        button: MouseButton,
        state: KeyState,
        x: f32,
        y: f32,
        modifiers: Modifiers,
    },
    Wheel {
        delta: WheelDelta,
        modifiers: Modifiers,
    },
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Event {
    /// Window moved or resized; carries the new geometry.
    Resize(WindowGeometry),
    Focus { has_focus: bool },
    Key(KeyEvent),
    Mouse(MouseEvent),
    /// The user asked the window manager to close the window.
    WindowClose,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum EventKind {
    Resize,
    Focus,
    Key,
    Mouse,
    WindowClose,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Resize(_) => EventKind::Resize,
            Self::Focus { .. } => EventKind::Focus,
            Self::Key(_) => EventKind::Key,
            Self::Mouse(_) => EventKind::Mouse,
            Self::WindowClose => EventKind::WindowClose,
        }
    }
}
