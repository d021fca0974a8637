use winit::event::{ElementState, MouseButton as WinitMouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, ModifiersState, PhysicalKey};
use winit::window::Window;

use crate::context::WindowGeometry;
use crate::event::{
    Event, Key, KeyEvent, KeyState, Modifiers, MouseButton, MouseEvent, WheelDelta,
};

/// Input state winit does not attach to every event.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct InputTracker {
    modifiers: Modifiers,
    pointer: (f32, f32),
}

/// Current position and inner size of `window`, in physical pixels.
pub(crate) fn window_geometry(window: &Window) -> WindowGeometry {
    let position = window.outer_position().unwrap_or_default();
    let size = window.inner_size();
    WindowGeometry::new(position.x, position.y, size.width, size.height)
}

/// Translates a winit window event into an engine event.
///
/// Returns `None` for events the engine does not model; those may still
/// update the tracked modifier and pointer state.
pub(crate) fn translate_window_event(
    window: &Window,
    tracker: &mut InputTracker,
    event: &WindowEvent,
) -> Option<Event> {
    match event {
        WindowEvent::Resized(_) | WindowEvent::Moved(_) => {
            Some(Event::Resize(window_geometry(window)))
        }

        WindowEvent::Focused(has_focus) => Some(Event::Focus {
            has_focus: *has_focus,
        }),

        WindowEvent::CloseRequested => Some(Event::WindowClose),

        WindowEvent::ModifiersChanged(m) => {
            tracker.modifiers = map_modifiers(m.state());
            None
        }

        WindowEvent::CursorMoved { position, .. } => {
            let (x, y) = (position.x as f32, position.y as f32);
            tracker.pointer = (x, y);
            Some(Event::Mouse(MouseEvent::Moved { x, y }))
        }

        WindowEvent::MouseInput { state, button, .. } => {
            let (x, y) = tracker.pointer;
            Some(Event::Mouse(MouseEvent::Button {
                button: map_mouse_button(*button),
                state: map_state(*state),
                x,
                y,
                modifiers: tracker.modifiers,
            }))
        }

        WindowEvent::MouseWheel { delta, .. } => {
            let delta = match delta {
                MouseScrollDelta::LineDelta(x, y) => WheelDelta::Lines { x: *x, y: *y },
                MouseScrollDelta::PixelDelta(p) => WheelDelta::Pixels {
                    x: p.x as f32,
                    y: p.y as f32,
                },
            };
            Some(Event::Mouse(MouseEvent::Wheel {
                delta,
                modifiers: tracker.modifiers,
            }))
        }

        WindowEvent::KeyboardInput { event, .. } => {
            let (key, code) = map_key(event.physical_key);
            Some(Event::Key(KeyEvent {
                key,
                state: map_state(event.state),
                modifiers: tracker.modifiers,
                code,
                repeat: event.repeat,
            }))
        }

        _ => None,
    }
}

fn map_state(state: ElementState) -> KeyState {
    match state {
        ElementState::Pressed => KeyState::Pressed,
        ElementState::Released => KeyState::Released,
    }
}

fn map_modifiers(m: ModifiersState) -> Modifiers {
    Modifiers {
        shift: m.shift_key(),
        ctrl: m.control_key(),
        alt: m.alt_key(),
        meta: m.super_key(),
    }
}

fn map_mouse_button(b: WinitMouseButton) -> MouseButton {
    match b {
        WinitMouseButton::Left => MouseButton::Left,
        WinitMouseButton::Right => MouseButton::Right,
        WinitMouseButton::Middle => MouseButton::Middle,
        WinitMouseButton::Back => MouseButton::Other(3),
        WinitMouseButton::Forward => MouseButton::Other(4),
        WinitMouseButton::Other(v) => MouseButton::Other(v),
    }
}

fn map_key(pk: PhysicalKey) -> (Key, u32) {
    let PhysicalKey::Code(code) = pk else {
        return (Key::Unknown(0), 0);
    };
    let key = match code {
        KeyCode::Escape => Key::Escape,
        KeyCode::Enter | KeyCode::NumpadEnter => Key::Enter,
        KeyCode::Tab => Key::Tab,
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Space => Key::Space,

        KeyCode::ArrowUp => Key::ArrowUp,
        KeyCode::ArrowDown => Key::ArrowDown,
        KeyCode::ArrowLeft => Key::ArrowLeft,
        KeyCode::ArrowRight => Key::ArrowRight,

        KeyCode::ShiftLeft | KeyCode::ShiftRight => Key::Shift,
        KeyCode::ControlLeft | KeyCode::ControlRight => Key::Control,
        KeyCode::AltLeft | KeyCode::AltRight => Key::Alt,
        KeyCode::SuperLeft | KeyCode::SuperRight => Key::Meta,

        KeyCode::KeyA => Key::A,
        KeyCode::KeyB => Key::B,
        KeyCode::KeyC => Key::C,
        KeyCode::KeyD => Key::D,
        KeyCode::KeyE => Key::E,
        KeyCode::KeyF => Key::F,
        KeyCode::KeyG => Key::G,
        KeyCode::KeyH => Key::H,
        KeyCode::KeyI => Key::I,
        KeyCode::KeyJ => Key::J,
        KeyCode::KeyK => Key::K,
        KeyCode::KeyL => Key::L,
        KeyCode::KeyM => Key::M,
        KeyCode::KeyN => Key::N,
        KeyCode::KeyO => Key::O,
        KeyCode::KeyP => Key::P,
        KeyCode::KeyQ => Key::Q,
        KeyCode::KeyR => Key::R,
        KeyCode::KeyS => Key::S,
        KeyCode::KeyT => Key::T,
        KeyCode::KeyU => Key::U,
        KeyCode::KeyV => Key::V,
        KeyCode::KeyW => Key::W,
        KeyCode::KeyX => Key::X,
        KeyCode::KeyY => Key::Y,
        KeyCode::KeyZ => Key::Z,

        KeyCode::Digit0 => Key::Digit0,
        KeyCode::Digit1 => Key::Digit1,
        KeyCode::Digit2 => Key::Digit2,
        KeyCode::Digit3 => Key::Digit3,
        KeyCode::Digit4 => Key::Digit4,
        KeyCode::Digit5 => Key::Digit5,
        KeyCode::Digit6 => Key::Digit6,
        KeyCode::Digit7 => Key::Digit7,
        KeyCode::Digit8 => Key::Digit8,
        KeyCode::Digit9 => Key::Digit9,

        KeyCode::F1 => Key::F1,
        KeyCode::F2 => Key::F2,
        KeyCode::F3 => Key::F3,
        KeyCode::F4 => Key::F4,
        KeyCode::F5 => Key::F5,
        KeyCode::F6 => Key::F6,
        KeyCode::F7 => Key::F7,
        KeyCode::F8 => Key::F8,
        KeyCode::F9 => Key::F9,
        KeyCode::F10 => Key::F10,
        KeyCode::F11 => Key::F11,
        KeyCode::F12 => Key::F12,

        other => Key::Unknown(other as u32),
    };
    (key, code as u32)
}
