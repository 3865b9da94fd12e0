use glam::{Mat4, Quat, Vec3};

pub const FIELD_OF_VIEW: f32 = 60.0;
pub const NEAR_PLANE: f32 = 0.25;
pub const FAR_PLANE: f32 = 5000.0;
pub const START_POSITION: Vec3 = Vec3::new(0.0, 0.0, 1000.0);

/// Per-frame input for [`Camera::update`]. Angles are in radians, movement is
/// in camera space (`-Z` forward, `+Y` up).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CameraDeltas {
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
    pub movement: Vec3,
}

/// Fly camera with a fixed perspective projection.
///
/// `rotation` maps world space to camera space; deltas are applied in camera
/// space on top of it, so orientation accumulates rather than being rebuilt
/// from absolute angles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    position: Vec3,
    rotation: Quat,
    projection: Mat4,
}

impl Camera {
    /// Camera at [`START_POSITION`] looking down `-Z`.
    #[must_use]
    pub fn new(aspect: f32) -> Self {
        Self {
            position: START_POSITION,
            rotation: Quat::IDENTITY,
            projection: perspective(aspect),
        }
    }

    /// Rebuilds the projection for a new window aspect ratio.
    pub fn set_aspect(&mut self, aspect: f32) {
        self.projection = perspective(aspect);
    }

    #[must_use]
    pub fn with_pose(position: Vec3, rotation: Quat, projection: Mat4) -> Self {
        Self {
            position,
            rotation: rotation.normalize(),
            projection,
        }
    }

    /// Returns the camera after applying one frame of deltas.
    #[must_use]
    pub fn update(self, deltas: CameraDeltas) -> Self {
        let delta = Quat::from_axis_angle(Vec3::Y, deltas.yaw)
            * Quat::from_axis_angle(Vec3::X, deltas.pitch)
            * Quat::from_axis_angle(Vec3::NEG_Z, deltas.roll);
        let rotation = (delta * self.rotation).normalize();
        let position = self.position + rotation.inverse() * deltas.movement;
        Self {
            position,
            rotation,
            projection: self.projection,
        }
    }

    #[must_use]
    pub fn view(&self) -> Mat4 {
        Mat4::from_quat(self.rotation) * Mat4::from_translation(-self.position)
    }

    /// View with translation stripped, for geometry at infinity.
    #[must_use]
    pub fn view_rotation(&self) -> Mat4 {
        Mat4::from_quat(self.rotation)
    }

    #[inline]
    #[must_use]
    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    #[inline]
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    #[inline]
    #[must_use]
    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    /// World-space viewing direction.
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        self.rotation.inverse() * Vec3::NEG_Z
    }
}

fn perspective(aspect: f32) -> Mat4 {
    Mat4::perspective_rh(
        FIELD_OF_VIEW.to_radians(),
        aspect.max(f32::EPSILON),
        NEAR_PLANE,
        FAR_PLANE,
    )
}
