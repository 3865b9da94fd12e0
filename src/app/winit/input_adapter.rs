//! Winit 输入事件适配器
//!
//! 将 Winit 的输入事件翻译为平台无关的 [`Input`] 状态。

use glam::Vec2;
use winit::event::{ElementState, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::app::input::{ButtonState, Input, Key, MouseButton};

/// Pixels per scroll notch for touchpads reporting pixel deltas.
const PIXELS_PER_NOTCH: f32 = 100.0;

/// 将 Winit 的 PhysicalKey 转换为 Key；未使用的键返回 None
#[must_use]
pub fn translate_key(physical_key: PhysicalKey) -> Option<Key> {
    let PhysicalKey::Code(code) = physical_key else {
        return None;
    };

    let key = match code {
        KeyCode::KeyW => Key::W,
        KeyCode::KeyA => Key::A,
        KeyCode::KeyS => Key::S,
        KeyCode::KeyD => Key::D,
        KeyCode::KeyQ => Key::Q,
        KeyCode::KeyE => Key::E,
        KeyCode::KeyZ => Key::Z,
        KeyCode::KeyC => Key::C,

        KeyCode::F1 => Key::F1,
        KeyCode::F2 => Key::F2,
        KeyCode::F3 => Key::F3,

        KeyCode::ShiftLeft => Key::LeftShift,
        KeyCode::Escape => Key::Escape,

        _ => return None,
    };

    Some(key)
}

#[must_use]
pub fn translate_mouse_button(button: winit::event::MouseButton) -> Option<MouseButton> {
    match button {
        winit::event::MouseButton::Left => Some(MouseButton::Left),
        winit::event::MouseButton::Right => Some(MouseButton::Right),
        winit::event::MouseButton::Middle => Some(MouseButton::Middle),
        _ => None,
    }
}

#[must_use]
pub fn translate_element_state(state: ElementState) -> ButtonState {
    match state {
        ElementState::Pressed => ButtonState::Pressed,
        ElementState::Released => ButtonState::Released,
    }
}

/// Scroll notches of one wheel event, positive away from the user.
#[must_use]
pub fn scroll_notches(delta: MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => y,
        MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / PIXELS_PER_NOTCH,
    }
}

/// 处理 Winit 窗口事件并注入到 Input
pub fn process_window_event(input: &mut Input, event: &WindowEvent) {
    match event {
        WindowEvent::KeyboardInput { event, .. } => {
            if let Some(key) = translate_key(event.physical_key) {
                input.key(key, translate_element_state(event.state));
            }
        }

        WindowEvent::CursorMoved { position, .. } => {
            input.cursor_moved(Vec2::new(position.x as f32, position.y as f32));
        }

        WindowEvent::CursorLeft { .. } => input.cursor_left(),

        WindowEvent::MouseInput { state, button, .. } => {
            if let Some(button) = translate_mouse_button(*button) {
                input.mouse_button(button, translate_element_state(*state));
            }
        }

        WindowEvent::MouseWheel { delta, .. } => input.scroll(scroll_notches(*delta)),

        _ => {}
    }
}
