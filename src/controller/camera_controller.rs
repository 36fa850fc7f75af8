use glam::Vec3;
use tracing::debug;

use crate::config::CameraConfig;
use crate::model::{Bounds, Camera};

/// Directional pan intent. Set only from the pointer's edge position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PanDirection {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
}

impl PanDirection {
    pub fn any(&self) -> bool { self.forward || self.back || self.left || self.right }

    pub fn clear(&mut self) { *self = Self::default(); }
}

/// Moves the camera over the map: edge panning, scroll zoom and the
/// held-key player lock.
#[derive(Debug, Clone)]
pub struct CameraController {
    pub speed: f32,
    pub min_zoom: f32,
    pub max_zoom: f32,
    pub zoom_step: f32,
    pub zoom_dead_zone: f32,
    pub lock_offset: f32,
    locked: bool,
}

impl CameraController {
    pub fn new(config: &CameraConfig) -> Self {
        Self {
            speed: config.speed,
            min_zoom: config.min_zoom,
            max_zoom: config.max_zoom,
            zoom_step: config.zoom_step,
            zoom_dead_zone: config.zoom_dead_zone,
            lock_offset: config.lock_offset,
            locked: false,
        }
    }

    pub fn locked(&self) -> bool { self.locked }

    pub fn set_locked(&mut self, locked: bool) {
        if self.locked != locked {
            debug!(locked, "camera lock changed");
        }
        self.locked = locked;
    }

    /// One tick of edge panning. Each axis moves by `speed` or not at all.
    pub fn pan(&self, camera: &mut Camera, bounds: &Bounds, dir: PanDirection) {
        let pos = &mut camera.position;
        if dir.forward && bounds.contains_z(pos.z - self.speed) {
            pos.z -= self.speed;
        }
        if dir.back && bounds.contains_z(pos.z + self.speed) {
            pos.z += self.speed;
        }
        if dir.left && bounds.contains_x(pos.x - self.speed) {
            pos.x -= self.speed;
        }
        if dir.right && bounds.contains_x(pos.x + self.speed) {
            pos.x += self.speed;
        }
    }

    /// Scroll zoom. Positive `delta_y` (wheel down) zooms out.
    pub fn zoom(&self, camera: &mut Camera, delta_y: f32) {
        let zoom = camera.zoom();
        let next = if delta_y > 0.0 {
            if zoom <= self.min_zoom + self.zoom_dead_zone {
                return;
            }
            zoom - self.zoom_step
        } else if delta_y < 0.0 {
            if zoom + self.zoom_step > self.max_zoom {
                return;
            }
            zoom + self.zoom_step
        } else {
            return;
        };
        camera.set_zoom(next.clamp(self.min_zoom, self.max_zoom));
    }

    pub fn lock_to_player(&self, camera: &mut Camera, player_pos: Vec3) {
        if self.locked {
            camera.position.x = player_pos.x;
            camera.position.z = player_pos.z + self.lock_offset;
        }
    }

    /// Per-frame camera update: pan while the pointer sits at an edge, then
    /// let the lock override x and z.
    pub fn update(&self, camera: &mut Camera, bounds: &Bounds, pan: PanDirection, pointer_at_edge: bool, player_pos: Vec3) {
        if pointer_at_edge {
            self.pan(camera, bounds, pan);
        }
        self.lock_to_player(camera, player_pos);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (CameraController, Camera, Bounds) {
        let config = CameraConfig::default();
        (CameraController::new(&config), Camera::new(&config, 800, 600), Bounds::howling_abyss())
    }

    fn left() -> PanDirection { PanDirection { left: true, ..Default::default() } }

    #[test]
    fn pan_left_inside_bounds() {
        let (ctl, mut cam, bounds) = setup();
        cam.position = Vec3::new(50.0, 8.0, -45.0);
        ctl.pan(&mut cam, &bounds, left());
        assert!((cam.position.x - 49.875).abs() < 1e-5);
        assert_eq!(cam.position.z, -45.0);
    }

    #[test]
    fn pan_past_edge_is_skipped_not_clamped() {
        let (ctl, mut cam, bounds) = setup();
        cam.position.x = -2.6;
        ctl.pan(&mut cam, &bounds, left());
        assert_eq!(cam.position.x, -2.6);
    }

    #[test]
    fn blocked_axis_does_not_stop_the_other() {
        let (ctl, mut cam, bounds) = setup();
        cam.position = Vec3::new(-2.6, 8.0, 0.0);
        let dir = PanDirection { left: true, forward: true, ..Default::default() };
        ctl.pan(&mut cam, &bounds, dir);
        assert_eq!(cam.position.x, -2.6);
        assert_eq!(cam.position.z, -0.125);
    }

    #[test]
    fn zoom_out_refused_inside_dead_zone() {
        let (ctl, mut cam, _) = setup();
        ctl.zoom(&mut cam, 100.0);
        assert_eq!(cam.zoom(), 1.85);
    }

    #[test]
    fn zoom_in_stops_before_max() {
        let (ctl, mut cam, _) = setup();
        for _ in 0..50 {
            ctl.zoom(&mut cam, -1.0);
        }
        assert!(cam.zoom() <= ctl.max_zoom);
        assert!(cam.zoom() + ctl.zoom_step > ctl.max_zoom);
    }

    #[test]
    fn lock_overrides_pan() {
        let (mut ctl, mut cam, bounds) = setup();
        ctl.set_locked(true);
        cam.position = Vec3::new(10.0, 8.0, -10.0);
        ctl.update(&mut cam, &bounds, left(), true, Vec3::new(3.0, 0.5, -4.0));
        assert_eq!(cam.position.x, 3.0);
        assert_eq!(cam.position.z, 1.0);
        assert_eq!(cam.position.y, 8.0);
    }

    #[test]
    fn no_pan_away_from_edge() {
        let (ctl, mut cam, bounds) = setup();
        let before = cam.position;
        ctl.update(&mut cam, &bounds, left(), false, Vec3::ZERO);
        assert_eq!(cam.position, before);
    }
}
