use glam::Vec3;

/// Directional light. `direction` points from the light into the scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub direction: Vec3,
    pub radiance: Vec3,
    pub enabled: bool,
}

impl Light {
    #[must_use]
    pub const fn new(direction: Vec3, radiance: Vec3, enabled: bool) -> Self {
        Self {
            direction,
            radiance,
            enabled,
        }
    }

    /// Radiance as seen by the shader: zero while disabled.
    #[must_use]
    pub fn effective_radiance(&self) -> Vec3 {
        if self.enabled { self.radiance } else { Vec3::ZERO }
    }
}
