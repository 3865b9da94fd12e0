//! Camera & Input Tests
//!
//! Tests for:
//! - Per-frame flow: input deltas → Camera::update → end_frame
//! - Zoom, fly movement and mouse-look against the camera pose
//! - Scene rotation and light toggles reaching the model matrix and lights
//! - Projection follows the window aspect ratio

use glam::{Vec2, Vec3};

use pbr_asteroid::app::input::{ButtonState, Input, Key, MouseButton};
use pbr_asteroid::scene::camera::START_POSITION;
use pbr_asteroid::{Camera, SceneSettings};

const EPSILON: f32 = 1e-3;

fn approx_vec(a: Vec3, b: Vec3) -> bool {
    (a - b).length() < EPSILON
}

/// One viewer frame: camera first, then scene, then the input reset.
fn frame(camera: Camera, scene: &mut SceneSettings, input: &mut Input) -> Camera {
    let camera = camera.update(input.camera_deltas());
    input.apply_to_scene(scene);
    input.end_frame();
    camera
}

// ============================================================================
// Camera movement
// ============================================================================

#[test]
fn scroll_zooms_towards_the_asteroid() {
    let mut input = Input::new();
    let mut scene = SceneSettings::default();

    input.scroll(1.0);
    let camera = frame(Camera::new(1.0), &mut scene, &mut input);
    assert!(approx_vec(camera.position(), START_POSITION - Vec3::Z * 16.0));

    // the scroll is consumed by the frame
    let camera = frame(camera, &mut scene, &mut input);
    assert!(approx_vec(camera.position(), START_POSITION - Vec3::Z * 16.0));
}

#[test]
fn held_keys_keep_moving_every_frame() {
    let mut input = Input::new();
    let mut scene = SceneSettings::default();
    input.key(Key::W, ButtonState::Pressed);

    let mut camera = Camera::new(1.0);
    for _ in 0..10 {
        camera = frame(camera, &mut scene, &mut input);
    }
    assert!(approx_vec(camera.position(), START_POSITION - Vec3::Z * 5.0));

    input.key(Key::W, ButtonState::Released);
    let still = frame(camera, &mut scene, &mut input);
    assert_eq!(still.position(), camera.position());
}

#[test]
fn left_drag_turns_the_view() {
    let mut input = Input::new();
    let mut scene = SceneSettings::default();

    input.cursor_moved(Vec2::new(0.0, 100.0));
    input.mouse_button(MouseButton::Left, ButtonState::Pressed);
    // 360 px × 0.25°/px = 90°
    input.cursor_moved(Vec2::new(360.0, 100.0));
    let camera = frame(Camera::new(1.0), &mut scene, &mut input);

    assert!(approx_vec(camera.forward(), Vec3::X), "forward {:?}", camera.forward());
    assert_eq!(camera.position(), START_POSITION);
    // left drag does not touch the model
    assert_eq!(scene.yaw, 0.0);
}

#[test]
fn aspect_change_keeps_the_pose() {
    let mut camera = Camera::new(1.0);
    let before = camera.projection();
    camera.set_aspect(2.0);

    assert_ne!(camera.projection(), before);
    assert_eq!(camera.position(), START_POSITION);
    // 水平视角随宽高比收窄，x 缩放减半
    assert!((camera.projection().x_axis.x * 2.0 - before.x_axis.x).abs() < EPSILON);
    assert_eq!(camera.projection().y_axis.y, before.y_axis.y);
}

// ============================================================================
// Scene
// ============================================================================

#[test]
fn right_drag_rotates_the_model() {
    let mut input = Input::new();
    let mut scene = SceneSettings::default();

    input.cursor_moved(Vec2::new(0.0, 0.0));
    input.mouse_button(MouseButton::Right, ButtonState::Pressed);
    input.cursor_moved(Vec2::new(90.0, 0.0));
    let camera = frame(Camera::new(1.0), &mut scene, &mut input);

    assert_eq!(scene.yaw, 90.0);
    assert_eq!(camera.forward(), Camera::new(1.0).forward());
    let tip = scene.model_matrix().transform_point3(Vec3::X);
    assert!(approx_vec(tip, Vec3::new(0.0, 0.0, -2.5)), "tip {tip:?}");
}

#[test]
fn function_keys_toggle_lights_once_per_press() {
    let mut input = Input::new();
    let mut scene = SceneSettings::default();

    input.key(Key::F2, ButtonState::Pressed);
    frame(Camera::new(1.0), &mut scene, &mut input);
    assert!(scene.lights[1].enabled);

    // still held: no further toggles
    input.key(Key::F2, ButtonState::Pressed);
    frame(Camera::new(1.0), &mut scene, &mut input);
    assert!(scene.lights[1].enabled);

    input.key(Key::F2, ButtonState::Released);
    input.key(Key::F2, ButtonState::Pressed);
    frame(Camera::new(1.0), &mut scene, &mut input);
    assert!(!scene.lights[1].enabled);
    assert_eq!(scene.lights[1].effective_radiance(), Vec3::ZERO);
}
