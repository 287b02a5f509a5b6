//! Per-mode camera rigs.

use glam::{Mat4, Vec3};

use crate::params::{CameraParams, RenderConfig};
use crate::scene::SceneMode;

/// Camera system choosing a viewpoint for the active mode
pub struct CameraSystem {
    params: CameraParams,
}

impl CameraSystem {
    pub fn new(params: CameraParams) -> Self {
        Self { params }
    }

    /// Compute camera position and look-at target for given time
    ///
    /// # Returns
    /// Tuple of (eye_position, target_position)
    pub fn compute_position_and_target(&self, mode: SceneMode, time_s: f32) -> (Vec3, Vec3) {
        let p = &self.params;
        match mode {
            SceneMode::Orb => {
                let angle = time_s * p.orb_rate;
                let eye = Vec3::new(
                    angle.sin() * p.orb_radius,
                    p.orb_height,
                    angle.cos() * p.orb_radius,
                );
                (eye, Vec3::ZERO)
            }
            SceneMode::Terrain => (
                Vec3::from_array(p.terrain_eye),
                Vec3::from_array(p.terrain_target),
            ),
            SceneMode::Crowd => {
                let drift = (time_s * p.crowd_drift_rate).sin() * p.crowd_drift;
                let eye = Vec3::from_array(p.crowd_eye) + Vec3::new(drift, 0.0, 0.0);
                (eye, Vec3::from_array(p.crowd_target))
            }
            // Fullscreen pass; any stable view works
            SceneMode::Wall => (Vec3::new(0.0, 0.0, p.orb_radius), Vec3::ZERO),
        }
    }

    /// Create view-projection matrix for rendering
    ///
    /// # Returns
    /// Tuple of (view_proj_matrix, camera_position)
    pub fn create_view_proj_matrix(
        &self,
        mode: SceneMode,
        time_s: f32,
        render_config: &RenderConfig,
    ) -> (Mat4, Vec3) {
        let (eye, target) = self.compute_position_and_target(mode, time_s);

        // Always keep Y as up vector (camera never rolls)
        let view = Mat4::look_at_rh(eye, target, Vec3::Y);
        let proj = Mat4::perspective_rh(
            render_config.fov_degrees.to_radians(),
            render_config.aspect_ratio(),
            render_config.near_plane,
            render_config.far_plane,
        );

        (proj * view, eye)
    }
}

impl Default for CameraSystem {
    fn default() -> Self {
        Self::new(CameraParams::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orb_orbit_keeps_radius() {
        let camera = CameraSystem::default();
        let params = CameraParams::default();
        for t in 0..50 {
            let (eye, target) = camera.compute_position_and_target(SceneMode::Orb, t as f32 * 0.7);
            let flat = Vec3::new(eye.x, 0.0, eye.z).length();
            assert!((flat - params.orb_radius).abs() < 1e-3);
            assert_eq!(eye.y, params.orb_height);
            assert_eq!(target, Vec3::ZERO);
        }
    }

    #[test]
    fn test_terrain_looks_down_the_waterfall() {
        let camera = CameraSystem::default();
        let (eye, target) = camera.compute_position_and_target(SceneMode::Terrain, 3.0);
        assert!(target.z < eye.z);
        assert!(target.y < eye.y);
    }

    #[test]
    fn test_view_proj_matrix_generation() {
        let camera = CameraSystem::default();
        let render_config = RenderConfig::default();

        for mode in SceneMode::ALL {
            let (view_proj, eye_pos) = camera.create_view_proj_matrix(mode, 1.0, &render_config);
            assert_ne!(view_proj, Mat4::IDENTITY);
            assert!(view_proj.is_finite());
            assert!(eye_pos.is_finite());
        }
    }
}
