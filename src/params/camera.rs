//! Per-mode camera rigs.

/// Viewpoints for each scene mode
#[derive(Debug, Clone)]
pub struct CameraParams {
    /// Orbit radius around the orb (world units)
    pub orb_radius: f32,

    /// Orbit eye height (world units)
    pub orb_height: f32,

    /// Orbit angular speed (radians per second)
    pub orb_rate: f32,

    /// Terrain eye position, in front of the newest row
    pub terrain_eye: [f32; 3],

    /// Terrain look-at point, down the waterfall
    pub terrain_target: [f32; 3],

    /// Crowd eye position, raised above the front row
    pub crowd_eye: [f32; 3],

    pub crowd_target: [f32; 3],

    /// Lateral drift of the crowd camera (world units)
    pub crowd_drift: f32,

    /// Crowd drift rate (radians per second)
    pub crowd_drift_rate: f32,
}

impl Default for CameraParams {
    fn default() -> Self {
        Self {
            orb_radius: 16.0,
            orb_height: 4.0,
            orb_rate: 0.1,
            terrain_eye: [0.0, 7.0, 14.0],
            terrain_target: [0.0, 0.0, -15.0],
            crowd_eye: [0.0, 6.0, 11.0],
            crowd_target: [0.0, 1.0, -4.0],
            crowd_drift: 1.5,
            crowd_drift_rate: 0.15,
        }
    }
}
