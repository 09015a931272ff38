//! Translation of winit input events into background inputs.

use winit::event::MouseScrollDelta;
use winit::keyboard::{Key, ModifiersState};

/// Pixels scrolled per wheel notch reported as a line delta.
pub const LINE_HEIGHT_PX: f32 = 40.0;

/// Converts a wheel event into a page offset change in pixels.
///
/// Positive values move further down the virtual page.
pub fn scroll_delta_px(delta: MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, lines) => -lines * LINE_HEIGHT_PX,
        MouseScrollDelta::PixelDelta(position) => -position.y as f32,
    }
}

/// Ctrl+Shift+P, the overlay toggle.
pub fn is_debug_chord(modifiers: ModifiersState, key: &Key) -> bool {
    modifiers.control_key()
        && modifiers.shift_key()
        && matches!(key, Key::Character(text) if text.eq_ignore_ascii_case("p"))
}
