use glam::{Mat4, Quat, Vec2, Vec3, Vec4Swizzles};

use crate::config::CameraConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit length
    pub direction: Vec3,
}

impl Ray {
    pub fn at(&self, t: f32) -> Vec3 { self.origin + self.direction * t }
}

/// Fixed-pitch perspective camera looking down toward -Z.
///
/// The projection is cached; anything that touches `zoom`, `fov_y` or
/// `aspect` directly must call [`Camera::update_projection`] afterwards.
/// [`Camera::set_zoom`] and [`Camera::set_aspect`] do it for you.
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    /// Rotation about the X axis in radians, negative looks down
    pub pitch: f32,
    pub fov_y: f32,
    pub aspect: f32,
    pub z_near: f32,
    pub z_far: f32,
    zoom: f32,
    projection: Mat4,
}

impl Camera {
    pub fn new(config: &CameraConfig, width: u32, height: u32) -> Self {
        let mut camera = Self {
            position: config.initial_position,
            pitch: config.pitch_degrees.to_radians(),
            fov_y: config.fov_degrees.to_radians(),
            aspect: aspect_of(width, height),
            z_near: config.z_near,
            z_far: config.z_far,
            zoom: config.min_zoom,
            projection: Mat4::IDENTITY,
        };
        camera.update_projection();
        camera
    }

    /// Put the camera back in its starting pose, keeping aspect.
    pub fn reset(&mut self, config: &CameraConfig) {
        self.position = config.initial_position;
        self.pitch = config.pitch_degrees.to_radians();
        self.zoom = config.min_zoom;
        self.update_projection();
    }

    pub fn zoom(&self) -> f32 { self.zoom }

    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = zoom;
        self.update_projection();
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        self.aspect = aspect_of(width, height);
        self.update_projection();
    }

    /// Vertical field of view after zoom is applied.
    pub fn effective_fov(&self) -> f32 {
        2.0 * ((self.fov_y * 0.5).tan() / self.zoom).atan()
    }

    pub fn update_projection(&mut self) {
        self.projection = Mat4::perspective_rh(self.effective_fov(), self.aspect, self.z_near, self.z_far);
    }

    pub fn projection(&self) -> Mat4 { self.projection }

    pub fn rotation(&self) -> Quat { Quat::from_rotation_x(self.pitch) }

    pub fn forward(&self) -> Vec3 { self.rotation() * Vec3::NEG_Z }

    pub fn view(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.forward(), self.rotation() * Vec3::Y)
    }

    pub fn view_proj(&self) -> Mat4 { self.projection * self.view() }

    /// Ray from the eye through a point given in normalized device coordinates.
    pub fn ray_from_ndc(&self, ndc: Vec2) -> Ray {
        let inv = self.view_proj().inverse();
        let near = inv * ndc.extend(0.0).extend(1.0);
        let far = inv * ndc.extend(1.0).extend(1.0);
        let near = near.xyz() / near.w;
        let far = far.xyz() / far.w;
        let direction = (far - near).try_normalize().unwrap_or_else(|| self.forward());
        Ray { origin: self.position, direction }
    }
}

fn aspect_of(width: u32, height: u32) -> f32 {
    width.max(1) as f32 / height.max(1) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> Camera { Camera::new(&CameraConfig::default(), 1600, 900) }

    #[test]
    fn centre_ray_matches_forward() {
        let cam = camera();
        let ray = cam.ray_from_ndc(Vec2::ZERO);
        assert!(ray.direction.abs_diff_eq(cam.forward(), 1e-4));
        assert_eq!(ray.origin, cam.position);
    }

    #[test]
    fn forward_looks_down_and_ahead() {
        let f = camera().forward();
        assert!(f.y < 0.0 && f.z < 0.0);
        assert!(f.x.abs() < 1e-6);
    }

    #[test]
    fn zoom_narrows_fov_and_refreshes_projection() {
        let mut cam = camera();
        let before = cam.projection();
        let fov = cam.effective_fov();
        cam.set_zoom(cam.zoom() + 1.0);
        assert!(cam.effective_fov() < fov);
        assert_ne!(before, cam.projection());
    }

    #[test]
    fn right_edge_ray_points_right() {
        let ray = camera().ray_from_ndc(Vec2::new(1.0, 0.0));
        assert!(ray.direction.x > 0.0);
        assert!((ray.direction.length() - 1.0).abs() < 1e-5);
    }
}
