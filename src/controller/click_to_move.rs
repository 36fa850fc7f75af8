use glam::{Vec2, Vec3};
use tracing::trace;

use crate::controller::input::{PointerState, Region};
use crate::controller::physics::{CollisionWorld, SurfaceKind};
use crate::controller::player_controller::PlayerController;
use crate::model::Camera;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClickOutcome {
    /// A walkable surface was hit; the player now heads for this point
    Moving(Vec3),
    /// Only a blocked area or the open ground was hit; the player stopped and turned toward it
    Faced(Vec3),
    Ignored,
}

/// Move order issued from the secondary button.
#[derive(Debug, Clone)]
pub struct ClickToMove {
    /// Height given to the target so the model clears the surface
    pub target_height: f32,
    pub max_distance: f32,
}

impl ClickToMove {
    pub fn new(target_height: f32, max_distance: f32) -> Self {
        Self { target_height, max_distance }
    }

    pub fn execute(&self, camera: &Camera, ndc: Vec2, world: &mut CollisionWorld, player: &mut PlayerController) -> ClickOutcome {
        let ray = camera.ray_from_ndc(ndc);
        let hit = world
            .cast_surfaces(&ray, self.max_distance, |k| k != SurfaceKind::Ground)
            .or_else(|| world.cast_surfaces(&ray, self.max_distance, |k| k == SurfaceKind::Ground));

        let Some(hit) = hit else {
            trace!(?ndc, "click hit nothing");
            return ClickOutcome::Ignored;
        };
        let point = Vec3::new(hit.point.x, self.target_height, hit.point.z);
        player.face(point);

        match hit.kind {
            SurfaceKind::Walkable => {
                player.set_target(point);
                ClickOutcome::Moving(point)
            }
            SurfaceKind::Blocked | SurfaceKind::Ground => {
                player.stop();
                ClickOutcome::Faced(point)
            }
        }
    }
}

/// Pointer-capture acquisition, dispatched from the same click as a move
/// order but independent of it.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaptureCommand;

impl CaptureCommand {
    /// Seeds the software cursor at the click position and reports whether
    /// the host should request pointer capture.
    pub fn execute(&self, pointer: &mut PointerState, x: f32, y: f32, region: Region) -> bool {
        if pointer.captured {
            return false;
        }
        pointer.move_to(x, y, region);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GameConfig, PointerConfig};
    use crate::controller::physics::Surface;
    use crate::model::animation::AnimationKey;

    fn setup() -> (Camera, CollisionWorld, PlayerController) {
        let config = GameConfig::default();
        let mut world = CollisionWorld::new(&config.physics);
        world.add_ground_plane(0.0);
        let player = PlayerController::spawn(&mut world, &config).unwrap();
        let mut camera = Camera::new(&config.camera, 800, 600);
        camera.position = Vec3::new(0.0, 8.0, 5.0);
        (camera, world, player)
    }

    fn surface(kind: SurfaceKind, center: Vec3, size: f32) -> Surface {
        Surface { kind, center, width: size, depth: size, yaw: 0.0 }
    }

    #[test]
    fn walkable_hit_sets_target_at_clearance_height() {
        let (camera, mut world, mut player) = setup();
        world.add_surface(surface(SurfaceKind::Walkable, Vec3::new(0.0, 0.1, 0.0), 40.0));
        let outcome = ClickToMove::new(0.08, 1000.0).execute(&camera, Vec2::ZERO, &mut world, &mut player);
        let ClickOutcome::Moving(p) = outcome else { panic!("{outcome:?}") };
        assert_eq!(p.y, 0.08);
        assert_eq!(player.target(), Some(p));
    }

    #[test]
    fn blocked_area_only_turns_the_player() {
        let (camera, mut world, mut player) = setup();
        world.add_surface(surface(SurfaceKind::Walkable, Vec3::new(0.0, 0.1, 0.0), 40.0));
        world.add_surface(surface(SurfaceKind::Blocked, Vec3::new(0.0, 0.2, 0.0), 40.0));
        let yaw = player.yaw;
        let outcome = ClickToMove::new(0.08, 1000.0).execute(&camera, Vec2::ZERO, &mut world, &mut player);
        assert!(matches!(outcome, ClickOutcome::Faced(_)));
        assert!(player.target().is_none());
        assert_ne!(player.yaw, yaw);
        assert_eq!(player.animation(), AnimationKey::Idle);
    }

    #[test]
    fn blocked_area_cancels_an_existing_target() {
        let (camera, mut world, mut player) = setup();
        player.set_target(Vec3::new(6.0, 0.08, 0.0));
        world.add_surface(surface(SurfaceKind::Blocked, Vec3::new(0.0, 0.2, 0.0), 40.0));
        let outcome = ClickToMove::new(0.08, 1000.0).execute(&camera, Vec2::ZERO, &mut world, &mut player);
        assert!(matches!(outcome, ClickOutcome::Faced(_)));
        assert!(player.target().is_none());
    }

    #[test]
    fn nothing_hit_is_ignored() {
        let (camera, mut world, mut player) = setup();
        let outcome = ClickToMove::new(0.08, 1000.0).execute(&camera, Vec2::ZERO, &mut world, &mut player);
        assert_eq!(outcome, ClickOutcome::Ignored);
        assert!(player.target().is_none());
    }

    #[test]
    fn capture_only_requested_once() {
        let region = Region::new(800, 600);
        let mut pointer = PointerState::new(&PointerConfig::default());
        assert!(CaptureCommand.execute(&mut pointer, 120.0, 80.0, region));
        assert_eq!((pointer.x, pointer.y), (120.0, 80.0));
        pointer.captured = true;
        assert!(!CaptureCommand.execute(&mut pointer, 10.0, 10.0, region));
        assert_eq!(pointer.x, 120.0);
    }
}
