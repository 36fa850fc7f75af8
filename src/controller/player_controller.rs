use glam::Vec3;
use tracing::debug;

use crate::config::GameConfig;
use crate::controller::physics::{BodyHandle, ColliderShape, CollisionWorld};
use crate::error::Result;
use crate::model::animation::{AnimationKey, AnimationMixer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerTransition {
    IdleToMoving,
    MovingToIdle,
}

/// Velocity-driven player: seeks a single target across the XZ plane and
/// keeps the idle/run animation in step with whether it is moving.
#[derive(Debug, Clone)]
pub struct PlayerController {
    pub body: BodyHandle,
    target: Option<Vec3>,
    /// Physics units per second
    pub speed: f32,
    pub arrival_threshold: f32,
    pub radius: f32,
    pub cross_fade: f32,
    /// Facing about +Y, 0 looks down +Z
    pub yaw: f32,
    pub model_position: Vec3,
    anim: AnimationKey,
    commanded: Vec3,
}

impl PlayerController {
    /// Registers the player body with the world.
    pub fn spawn(world: &mut CollisionWorld, config: &GameConfig) -> Result<Self> {
        let player = &config.player;
        let shape = ColliderShape::Sphere { radius: player.collider_radius };
        let body = world.add_dynamic_body(shape, player.mass, player.spawn)?;
        Ok(Self {
            body,
            target: None,
            speed: config.player_velocity(),
            arrival_threshold: player.arrival_threshold,
            radius: player.collider_radius,
            cross_fade: config.animation.cross_fade,
            yaw: 0.0,
            model_position: player.spawn - Vec3::Y * player.collider_radius,
            anim: AnimationKey::Idle,
            commanded: Vec3::ZERO,
        })
    }

    pub fn target(&self) -> Option<Vec3> { self.target }

    pub fn animation(&self) -> AnimationKey { self.anim }

    pub fn is_moving(&self) -> bool { self.anim == AnimationKey::Run }

    pub fn commanded_velocity(&self) -> Vec3 { self.commanded }

    /// Replace whatever the player was heading for.
    pub fn set_target(&mut self, point: Vec3) { self.target = Some(point); }

    /// Drop the current target. The next `update` settles into idle.
    pub fn stop(&mut self) { self.target = None; }

    /// Snap the facing toward `point`, ignoring height.
    pub fn face(&mut self, point: Vec3) {
        let d = point - self.model_position;
        if d.x != 0.0 || d.z != 0.0 {
            self.yaw = d.x.atan2(d.z);
        }
    }

    /// Start the idle clip without a transition. Call once the mixer has clips.
    pub fn start_idle(&self, mixer: &mut AnimationMixer) { mixer.play(AnimationKey::Idle); }

    pub fn update(&mut self, world: &mut CollisionWorld, mixer: &mut AnimationMixer) -> Option<PlayerTransition> {
        let pos = world.position(self.body);

        let heading = self.target.and_then(|t| {
            let flat = Vec3::new(t.x - pos.x, 0.0, t.z - pos.z);
            if flat.length() < self.arrival_threshold {
                return None;
            }
            flat.try_normalize()
        });

        match heading {
            Some(dir) => {
                self.commanded = dir * self.speed;
                world.set_velocity(self.body, self.commanded);
                (self.anim == AnimationKey::Idle).then(|| self.transition(AnimationKey::Run, mixer))
            }
            None => {
                self.target = None;
                self.commanded = Vec3::ZERO;
                world.set_velocity(self.body, Vec3::ZERO);
                (self.anim == AnimationKey::Run).then(|| self.transition(AnimationKey::Idle, mixer))
            }
        }
    }

    fn transition(&mut self, to: AnimationKey, mixer: &mut AnimationMixer) -> PlayerTransition {
        let from = self.anim;
        mixer.play(to);
        mixer.fade_out(from, self.cross_fade);
        self.anim = to;

        let transition = match to {
            AnimationKey::Run => PlayerTransition::IdleToMoving,
            AnimationKey::Idle => PlayerTransition::MovingToIdle,
        };
        debug!(?transition, target = ?self.target, "player state changed");
        transition
    }

    /// Place the visual model so its feet sit where the body touches the ground.
    pub fn sync_model(&mut self, world: &CollisionWorld) {
        self.model_position = world.position(self.body) - Vec3::Y * self.radius;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::animation::AnimationClip;

    fn setup() -> (CollisionWorld, PlayerController, AnimationMixer) {
        let config = GameConfig::default();
        let mut world = CollisionWorld::new(&config.physics);
        world.add_ground_plane(0.0);
        let player = PlayerController::spawn(&mut world, &config).unwrap();
        let mut mixer = AnimationMixer::new();
        mixer.add_action(AnimationKey::Idle, AnimationClip::new("idle", 2.0));
        mixer.add_action(AnimationKey::Run, AnimationClip::new("run", 0.8));
        player.start_idle(&mut mixer);
        (world, player, mixer)
    }

    #[test]
    fn target_sets_flat_velocity_once() {
        let (mut world, mut player, mut mixer) = setup();
        player.set_target(Vec3::new(3.0, 0.08, 4.0));
        assert_eq!(player.update(&mut world, &mut mixer), Some(PlayerTransition::IdleToMoving));
        let v = player.commanded_velocity();
        assert!(v.abs_diff_eq(Vec3::new(1.02, 0.0, 1.36), 1e-4), "{v:?}");
        assert_eq!(mixer.active(), Some(AnimationKey::Run));

        player.set_target(Vec3::new(3.0, 0.08, 4.0));
        assert_eq!(player.update(&mut world, &mut mixer), None);
    }

    #[test]
    fn target_on_top_of_player_is_arrival() {
        let (mut world, mut player, mut mixer) = setup();
        player.set_target(Vec3::new(0.0, 0.5, 0.0));
        assert_eq!(player.update(&mut world, &mut mixer), None);
        assert!(player.target().is_none());
        assert_eq!(player.commanded_velocity(), Vec3::ZERO);
        assert_eq!(player.animation(), AnimationKey::Idle);
    }

    #[test]
    fn stop_mid_run_goes_idle_once() {
        let (mut world, mut player, mut mixer) = setup();
        player.set_target(Vec3::new(5.0, 0.08, 0.0));
        player.update(&mut world, &mut mixer);
        player.stop();
        assert_eq!(player.update(&mut world, &mut mixer), Some(PlayerTransition::MovingToIdle));
        assert_eq!(player.update(&mut world, &mut mixer), None);
        assert_eq!(player.commanded_velocity(), Vec3::ZERO);
        assert_eq!(player.animation(), AnimationKey::Idle);
    }

    #[test]
    fn face_snaps_yaw() {
        let (_, mut player, _) = setup();
        player.face(Vec3::new(1.0, 0.0, 0.0));
        assert!((player.yaw - std::f32::consts::FRAC_PI_2).abs() < 1e-5);
        player.face(Vec3::new(0.0, 0.0, -1.0));
        assert!((player.yaw.abs() - std::f32::consts::PI).abs() < 1e-5);
    }

    #[test]
    fn model_sits_half_a_collider_below_body() {
        let (world, mut player, _) = setup();
        player.sync_model(&world);
        assert!((player.model_position.y - 0.0).abs() < 1e-4);
    }
}
