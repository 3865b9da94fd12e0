//! 平台无关的输入状态
//!
//! [`Input`] accumulates one frame of events and turns them into camera and
//! scene deltas. Window-system events are translated into it by
//! [`super::winit::input_adapter`].

use glam::{Vec2, Vec3};
use rustc_hash::FxHashSet;

use crate::scene::{CameraDeltas, SceneSettings};

/// Roll per frame while Z or C is held, degrees.
pub const ROLL_STEP_DEGREES: f32 = 2.0;
/// View rotation per pixel of cursor travel (left button), degrees.
pub const VIEW_DEGREES_PER_PIXEL: f32 = 0.25;
/// Scene rotation per pixel of cursor travel (right button), degrees.
pub const SCENE_DEGREES_PER_PIXEL: f32 = 1.0;
/// Camera travel per scroll notch.
pub const ZOOM_STEP: f32 = 16.0;
pub const FAST_MOVE_SPEED: f32 = 5.0;
pub const MOVE_SPEED: f32 = 0.5;

/// Keys the viewer reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    W,
    A,
    S,
    D,
    Q,
    E,
    Z,
    C,
    F1,
    F2,
    F3,
    LeftShift,
    Escape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonState {
    Pressed,
    Released,
}

#[derive(Debug, Default, Clone)]
pub struct Input {
    keys: FxHashSet<Key>,
    buttons: FxHashSet<MouseButton>,
    /// 上一次光标位置；窗口外或首帧时为 None
    cursor: Option<Vec2>,
    /// 本帧累计的光标位移
    cursor_delta: Vec2,
    /// 本帧累计的滚轮格数
    scroll: f32,
    /// 本帧按下的灯光开关
    toggled_lights: Vec<usize>,
    exit_requested: bool,
}

impl Input {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(&mut self, key: Key, state: ButtonState) {
        match state {
            ButtonState::Pressed => {
                // 按住不放时的重复事件不再触发开关
                let fresh = self.keys.insert(key);
                if fresh {
                    match key {
                        Key::F1 => self.toggled_lights.push(0),
                        Key::F2 => self.toggled_lights.push(1),
                        Key::F3 => self.toggled_lights.push(2),
                        Key::Escape => self.exit_requested = true,
                        _ => {}
                    }
                }
            }
            ButtonState::Released => {
                self.keys.remove(&key);
            }
        }
    }

    pub fn mouse_button(&mut self, button: MouseButton, state: ButtonState) {
        match state {
            ButtonState::Pressed => {
                self.buttons.insert(button);
            }
            ButtonState::Released => {
                self.buttons.remove(&button);
            }
        }
    }

    pub fn cursor_moved(&mut self, position: Vec2) {
        if let Some(last) = self.cursor {
            self.cursor_delta += position - last;
        }
        self.cursor = Some(position);
    }

    pub fn cursor_left(&mut self) {
        self.cursor = None;
    }

    /// Raw pointer motion, used while the cursor is locked and stops moving.
    pub fn mouse_motion(&mut self, delta: Vec2) {
        self.cursor_delta += delta;
    }

    /// `notches > 0` scrolls away from the user.
    pub fn scroll(&mut self, notches: f32) {
        self.scroll += notches;
    }

    #[must_use]
    pub fn is_key_down(&self, key: Key) -> bool {
        self.keys.contains(&key)
    }

    #[must_use]
    pub fn is_button_down(&self, button: MouseButton) -> bool {
        self.buttons.contains(&button)
    }

    /// Either drag button is held; the window hides and captures the cursor.
    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.is_button_down(MouseButton::Left) || self.is_button_down(MouseButton::Right)
    }

    #[must_use]
    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }

    fn axis(&self, positive: Key, negative: Key) -> f32 {
        f32::from(u8::from(self.is_key_down(positive))) - f32::from(u8::from(self.is_key_down(negative)))
    }

    /// Camera deltas of this frame.
    #[must_use]
    pub fn camera_deltas(&self) -> CameraDeltas {
        let roll = self.axis(Key::Z, Key::C) * ROLL_STEP_DEGREES;
        let (pitch, yaw) = if self.is_button_down(MouseButton::Left) {
            (
                self.cursor_delta.y * VIEW_DEGREES_PER_PIXEL,
                self.cursor_delta.x * VIEW_DEGREES_PER_PIXEL,
            )
        } else {
            (0.0, 0.0)
        };

        let speed = if self.is_key_down(Key::LeftShift) {
            FAST_MOVE_SPEED
        } else {
            MOVE_SPEED
        };
        let direction = Vec3::new(
            self.axis(Key::D, Key::A),
            self.axis(Key::E, Key::Q),
            self.axis(Key::S, Key::W),
        );
        let zoom = Vec3::NEG_Z * self.scroll * ZOOM_STEP;

        CameraDeltas {
            roll: roll.to_radians(),
            pitch: pitch.to_radians(),
            yaw: yaw.to_radians(),
            movement: direction * speed + zoom,
        }
    }

    /// Applies this frame's scene rotation and light toggles.
    pub fn apply_to_scene(&self, scene: &mut SceneSettings) {
        if self.is_button_down(MouseButton::Right) {
            scene.yaw += self.cursor_delta.x * SCENE_DEGREES_PER_PIXEL;
            scene.pitch += self.cursor_delta.y * SCENE_DEGREES_PER_PIXEL;
        }
        for &index in &self.toggled_lights {
            scene.toggle_light(index);
        }
    }

    /// 帧末清理（清除 delta 状态，防止一直旋转）
    pub fn end_frame(&mut self) {
        self.cursor_delta = Vec2::ZERO;
        self.scroll = 0.0;
        self.toggled_lights.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn idle_input_produces_no_motion() {
        assert_eq!(Input::new().camera_deltas(), CameraDeltas::default());
    }

    #[test]
    fn wasd_moves_in_camera_space() {
        let mut input = Input::new();
        input.key(Key::W, ButtonState::Pressed);
        input.key(Key::D, ButtonState::Pressed);
        assert_eq!(input.camera_deltas().movement, Vec3::new(0.5, 0.0, -0.5));

        input.key(Key::LeftShift, ButtonState::Pressed);
        input.key(Key::D, ButtonState::Released);
        input.key(Key::Q, ButtonState::Pressed);
        assert_eq!(input.camera_deltas().movement, Vec3::new(0.0, -5.0, -5.0));
    }

    #[test]
    fn cursor_rotates_view_only_while_left_button_held() {
        let mut input = Input::new();
        input.cursor_moved(Vec2::new(100.0, 100.0));
        input.cursor_moved(Vec2::new(104.0, 98.0));
        assert_eq!(input.camera_deltas().yaw, 0.0);

        input.mouse_button(MouseButton::Left, ButtonState::Pressed);
        let deltas = input.camera_deltas();
        assert!(approx(deltas.yaw, 1f32.to_radians()));
        assert!(approx(deltas.pitch, (-0.5f32).to_radians()));

        input.end_frame();
        assert_eq!(input.camera_deltas().yaw, 0.0);
    }

    #[test]
    fn roll_keys_and_zoom() {
        let mut input = Input::new();
        input.key(Key::C, ButtonState::Pressed);
        input.scroll(2.0);
        let deltas = input.camera_deltas();
        assert!(approx(deltas.roll, (-2f32).to_radians()));
        assert_eq!(deltas.movement, Vec3::new(0.0, 0.0, -32.0));
    }

    #[test]
    fn right_drag_rotates_scene_and_f_keys_toggle_lights() {
        let mut input = Input::new();
        let mut scene = SceneSettings::default();
        input.mouse_button(MouseButton::Right, ButtonState::Pressed);
        input.cursor_moved(Vec2::new(10.0, 10.0));
        input.cursor_moved(Vec2::new(13.0, 6.0));
        input.key(Key::F1, ButtonState::Pressed);
        // 按住时的重复事件
        input.key(Key::F1, ButtonState::Pressed);
        input.key(Key::F3, ButtonState::Pressed);

        input.apply_to_scene(&mut scene);
        assert!(approx(scene.yaw, 3.0));
        assert!(approx(scene.pitch, -4.0));
        assert!(scene.lights[0].enabled);
        assert!(!scene.lights[2].enabled);
    }

    #[test]
    fn drag_starts_with_either_button() {
        let mut input = Input::new();
        assert!(!input.is_dragging());
        input.mouse_button(MouseButton::Middle, ButtonState::Pressed);
        assert!(!input.is_dragging());
        input.mouse_button(MouseButton::Left, ButtonState::Pressed);
        input.mouse_button(MouseButton::Right, ButtonState::Pressed);
        input.mouse_button(MouseButton::Left, ButtonState::Released);
        assert!(input.is_dragging());
        input.mouse_button(MouseButton::Right, ButtonState::Released);
        assert!(!input.is_dragging());
    }

    #[test]
    fn locked_motion_turns_the_view() {
        let mut input = Input::new();
        input.mouse_button(MouseButton::Left, ButtonState::Pressed);
        input.mouse_motion(Vec2::new(4.0, 0.0));
        input.mouse_motion(Vec2::new(2.0, 0.0));
        let deltas = input.camera_deltas();
        assert!(deltas.yaw != 0.0);
        assert!(approx(deltas.pitch, 0.0));
    }

    #[test]
    fn escape_requests_exit() {
        let mut input = Input::new();
        assert!(!input.exit_requested());
        input.key(Key::Escape, ButtonState::Pressed);
        assert!(input.exit_requested());
    }
}
