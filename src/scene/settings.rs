use glam::{Mat4, Vec3};

use super::light::Light;

/// Uniform scale applied to the model.
pub const MODEL_SCALE: f32 = 2.5;

/// User-adjustable scene state: model orientation and the three lights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneSettings {
    /// Model rotation about X, degrees.
    pub pitch: f32,
    /// Model rotation about Y, degrees.
    pub yaw: f32,
    pub lights: [Light; 3],
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            pitch: 0.0,
            yaw: 0.0,
            lights: [
                Light::new(Vec3::NEG_X, Vec3::ONE, false),
                Light::new(Vec3::X, Vec3::ONE, false),
                Light::new(Vec3::NEG_Y, Vec3::ONE, true),
            ],
        }
    }
}

impl SceneSettings {
    #[must_use]
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_scale(Vec3::splat(MODEL_SCALE))
            * Mat4::from_rotation_x(self.pitch.to_radians())
            * Mat4::from_rotation_y(self.yaw.to_radians())
    }

    /// Flips light `index`; out-of-range indices are ignored.
    pub fn toggle_light(&mut self, index: usize) {
        if let Some(light) = self.lights.get_mut(index) {
            light.enabled = !light.enabled;
        }
    }
}
