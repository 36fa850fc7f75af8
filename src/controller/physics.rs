use std::num::NonZeroUsize;

use glam::{EulerRot, Quat, Vec3};
use rapier3d::na::{Quaternion, Translation3, UnitQuaternion};
use rapier3d::prelude::*;
use tracing::debug;

use crate::config::PhysicsConfig;
use crate::error::{GameError, Result};
use crate::model::camera::Ray as CameraRay;

/// Shape of a collider, sized the way the map is authored (full extents).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColliderShape {
    Box { width: f32, height: f32, depth: f32 },
    Sphere { radius: f32 },
}

impl ColliderShape {
    fn builder(&self) -> ColliderBuilder {
        match *self {
            ColliderShape::Box { width, height, depth } => ColliderBuilder::cuboid(width * 0.5, height * 0.5, depth * 0.5),
            ColliderShape::Sphere { radius } => ColliderBuilder::ball(radius),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColliderTransform {
    pub position: Vec3,
    /// XYZ Euler angles in radians
    pub rotation: Option<Vec3>,
}

impl ColliderTransform {
    pub fn at(position: Vec3) -> Self { Self { position, rotation: None } }

    pub fn rotated(position: Vec3, euler: Vec3) -> Self { Self { position, rotation: Some(euler) } }

    fn isometry(&self) -> Isometry<Real> {
        let q = match self.rotation {
            Some(e) => Quat::from_euler(EulerRot::XYZ, e.x, e.y, e.z),
            None => Quat::IDENTITY,
        };
        let p = self.position;
        Isometry::from_parts(
            Translation3::new(p.x, p.y, p.z),
            UnitQuaternion::from_quaternion(Quaternion::new(q.w, q.x, q.y, q.z)),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StaticHandle(pub ColliderHandle);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyHandle(pub RigidBodyHandle);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceKind {
    Walkable,
    Blocked,
    /// Oversized plane under the whole map, only used to find a facing point
    Ground,
}

impl SurfaceKind {
    fn tag(self) -> u128 {
        match self {
            SurfaceKind::Walkable => 1,
            SurfaceKind::Blocked => 2,
            SurfaceKind::Ground => 3,
        }
    }

    fn from_tag(tag: u128) -> Option<Self> {
        match tag {
            1 => Some(SurfaceKind::Walkable),
            2 => Some(SurfaceKind::Blocked),
            3 => Some(SurfaceKind::Ground),
            _ => None,
        }
    }
}

/// Flat rectangle the pointer ray can land on. Surfaces never collide with
/// the player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Surface {
    pub kind: SurfaceKind,
    pub center: Vec3,
    pub width: f32,
    pub depth: f32,
    /// Rotation about Y in radians
    pub yaw: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHit {
    pub kind: SurfaceKind,
    pub point: Vec3,
    pub toi: f32,
}

const SURFACE_HALF_THICKNESS: f32 = 0.01;

const ALLOWED_LINEAR_ERROR: f32 = 1.0e-4;
const CONTACT_FREQUENCY: f32 = 120.0;
const SOLVER_ITERATIONS: usize = 8;
const STABILIZATION_ITERATIONS: usize = 4;

/// Static obstacles plus the single player body, stepped at a fixed rate.
pub struct CollisionWorld {
    gravity: Vector<Real>,
    friction: f32,
    restitution: f32,
    fixed_dt: f32,
    max_sub_steps: u32,
    accumulator: f32,

    pipeline: PhysicsPipeline,
    params: IntegrationParameters,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    bodies: RigidBodySet,
    colliders: ColliderSet,

    player: Option<BodyHandle>,
    static_count: usize,
    queries_dirty: bool,
}

impl CollisionWorld {
    pub fn new(config: &PhysicsConfig) -> Self {
        let mut params = IntegrationParameters::default();
        params.dt = config.fixed_dt;
        // Stiff contacts: a player pushed into a wall every step stays within 1e-3 of its face
        params.normalized_allowed_linear_error = ALLOWED_LINEAR_ERROR;
        params.contact_natural_frequency = CONTACT_FREQUENCY;
        params.num_internal_stabilization_iterations = STABILIZATION_ITERATIONS;
        if let Some(iterations) = NonZeroUsize::new(SOLVER_ITERATIONS) {
            params.num_solver_iterations = iterations;
        }

        Self {
            gravity: vector![0.0, config.gravity, 0.0],
            friction: config.friction,
            restitution: config.restitution,
            fixed_dt: config.fixed_dt,
            max_sub_steps: config.max_sub_steps,
            accumulator: 0.0,
            pipeline: PhysicsPipeline::new(),
            params,
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            player: None,
            static_count: 0,
            queries_dirty: true,
        }
    }

    pub fn fixed_dt(&self) -> f32 { self.fixed_dt }

    pub fn add_static_collider(&mut self, shape: ColliderShape, transform: ColliderTransform) -> StaticHandle {
        let collider = shape
            .builder()
            .position(transform.isometry())
            .friction(self.friction)
            .restitution(self.restitution)
            .build();
        self.static_count += 1;
        self.queries_dirty = true;
        StaticHandle(self.colliders.insert(collider))
    }

    /// Infinite floor facing +Y at the given height.
    pub fn add_ground_plane(&mut self, height: f32) -> StaticHandle {
        let collider = ColliderBuilder::halfspace(Vector::y_axis())
            .translation(vector![0.0, height, 0.0])
            .friction(self.friction)
            .restitution(self.restitution)
            .build();
        self.queries_dirty = true;
        StaticHandle(self.colliders.insert(collider))
    }

    /// Registers the player body. Only one dynamic body may exist.
    pub fn add_dynamic_body(&mut self, shape: ColliderShape, mass: f32, position: Vec3) -> Result<BodyHandle> {
        if self.player.is_some() {
            return Err(GameError::DynamicBodyExists);
        }
        let body = RigidBodyBuilder::dynamic()
            .translation(vector![position.x, position.y, position.z])
            .linear_damping(0.0)
            .lock_rotations()
            .can_sleep(false)
            .build();
        let handle = self.bodies.insert(body);
        let collider = shape
            .builder()
            .mass(mass)
            .friction(self.friction)
            .restitution(self.restitution)
            .build();
        self.colliders.insert_with_parent(collider, handle, &mut self.bodies);
        self.queries_dirty = true;

        let handle = BodyHandle(handle);
        self.player = Some(handle);
        debug!(?position, "dynamic body registered");
        Ok(handle)
    }

    pub fn position(&self, handle: BodyHandle) -> Vec3 {
        self.bodies
            .get(handle.0)
            .map(|b| {
                let t = b.translation();
                Vec3::new(t.x, t.y, t.z)
            })
            .unwrap_or(Vec3::ZERO)
    }

    pub fn velocity(&self, handle: BodyHandle) -> Vec3 {
        self.bodies
            .get(handle.0)
            .map(|b| {
                let v = b.linvel();
                Vec3::new(v.x, v.y, v.z)
            })
            .unwrap_or(Vec3::ZERO)
    }

    pub fn set_velocity(&mut self, handle: BodyHandle, v: Vec3) {
        if let Some(body) = self.bodies.get_mut(handle.0) {
            body.set_linvel(vector![v.x, v.y, v.z], true);
        }
    }

    /// Advance one fixed increment.
    pub fn step(&mut self, dt: f32) {
        self.params.dt = dt;
        self.pipeline.step(
            &self.gravity,
            &self.params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
        self.queries_dirty = false;
    }

    /// Consume wall-clock time in fixed steps. Time beyond `max_sub_steps`
    /// worth of steps is dropped rather than carried into the next frame.
    pub fn advance(&mut self, elapsed: f32) -> u32 {
        self.accumulator += elapsed.max(0.0);
        let mut steps = 0;
        while self.accumulator >= self.fixed_dt && steps < self.max_sub_steps {
            self.step(self.fixed_dt);
            self.accumulator -= self.fixed_dt;
            steps += 1;
        }
        if steps == self.max_sub_steps {
            self.accumulator %= self.fixed_dt;
        }
        steps
    }

    pub fn add_surface(&mut self, surface: Surface) -> StaticHandle {
        let iso = ColliderTransform::rotated(surface.center, Vec3::new(0.0, surface.yaw, 0.0)).isometry();
        let collider = ColliderBuilder::cuboid(surface.width * 0.5, SURFACE_HALF_THICKNESS, surface.depth * 0.5)
            .position(iso)
            .sensor(true)
            .user_data(surface.kind.tag())
            .build();
        self.queries_dirty = true;
        StaticHandle(self.colliders.insert(collider))
    }

    /// Nearest surface along the ray among the kinds `accept` lets through.
    pub fn cast_surfaces(&mut self, ray: &CameraRay, max_toi: f32, accept: impl Fn(SurfaceKind) -> bool) -> Option<SurfaceHit> {
        if self.queries_dirty {
            self.query_pipeline.update(&self.colliders);
            self.queries_dirty = false;
        }
        let o = ray.origin;
        let d = ray.direction;
        let rapier_ray = Ray::new(point![o.x, o.y, o.z], vector![d.x, d.y, d.z]);
        let predicate = |_: ColliderHandle, c: &Collider| SurfaceKind::from_tag(c.user_data).is_some_and(&accept);
        let filter = QueryFilter::new().predicate(&predicate);

        let (handle, toi) = self
            .query_pipeline
            .cast_ray(&self.bodies, &self.colliders, &rapier_ray, max_toi, true, filter)?;
        let kind = SurfaceKind::from_tag(self.colliders.get(handle)?.user_data)?;
        Some(SurfaceHit { kind, point: ray.at(toi), toi })
    }

    /// Obstacles registered through [`CollisionWorld::add_static_collider`].
    pub fn static_collider_count(&self) -> usize { self.static_count }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> CollisionWorld {
        let mut w = CollisionWorld::new(&PhysicsConfig::default());
        w.add_ground_plane(0.0);
        w
    }

    fn ball() -> ColliderShape { ColliderShape::Sphere { radius: 0.5 } }

    #[test]
    fn second_dynamic_body_is_rejected() {
        let mut w = world();
        w.add_dynamic_body(ball(), 1.0, Vec3::new(0.0, 0.5, 0.0)).unwrap();
        assert!(matches!(
            w.add_dynamic_body(ball(), 1.0, Vec3::ZERO),
            Err(GameError::DynamicBodyExists)
        ));
    }

    #[test]
    fn accumulator_sub_steps() {
        let mut w = world();
        assert_eq!(w.advance(0.0), 0);
        assert_eq!(w.advance(0.5 / 60.0), 0);
        assert_eq!(w.advance(0.6 / 60.0), 1);
        assert_eq!(w.advance(3.0 / 60.0), 3);
        assert_eq!(w.advance(1.0), 10);
        assert!(w.accumulator < w.fixed_dt);
    }

    #[test]
    fn body_rests_on_ground() {
        let mut w = world();
        let h = w.add_dynamic_body(ball(), 1.0, Vec3::new(0.0, 0.5, 0.0)).unwrap();
        for _ in 0..120 {
            w.step(1.0 / 60.0);
        }
        let y = w.position(h).y;
        assert!((y - 0.5).abs() < 0.02, "y = {y}");
    }

    #[test]
    fn wall_stops_the_body() {
        let mut w = world();
        w.add_static_collider(
            ColliderShape::Box { width: 1.0, height: 3.0, depth: 6.0 },
            ColliderTransform::at(Vec3::new(2.5, 1.5, 0.0)),
        );
        let h = w.add_dynamic_body(ball(), 1.0, Vec3::new(0.0, 0.5, 0.0)).unwrap();
        for _ in 0..240 {
            w.set_velocity(h, Vec3::new(1.7, 0.0, 0.0));
            w.step(1.0 / 60.0);
            assert!(w.position(h).x < 2.0 + 1e-3);
        }
        assert!(w.position(h).x < 1.55);
        assert_eq!(w.static_collider_count(), 1);
    }

    #[test]
    fn surfaces_do_not_block_and_nearest_wins() {
        let mut w = world();
        let surface = |kind, y| Surface { kind, center: Vec3::new(0.0, y, 0.0), width: 4.0, depth: 4.0, yaw: 0.0 };
        w.add_surface(surface(SurfaceKind::Walkable, 0.1));
        w.add_surface(surface(SurfaceKind::Blocked, 0.2));
        let ray = CameraRay { origin: Vec3::new(0.0, 5.0, 0.0), direction: Vec3::NEG_Y };

        let hit = w.cast_surfaces(&ray, 100.0, |_| true).unwrap();
        assert_eq!(hit.kind, SurfaceKind::Blocked);
        let hit = w.cast_surfaces(&ray, 100.0, |k| k == SurfaceKind::Walkable).unwrap();
        assert_eq!(hit.kind, SurfaceKind::Walkable);
        assert!((hit.point.y - 0.11).abs() < 1e-3);

        let miss = CameraRay { origin: Vec3::new(10.0, 5.0, 0.0), direction: Vec3::NEG_Y };
        assert!(w.cast_surfaces(&miss, 100.0, |_| true).is_none());
    }

    #[test]
    fn rotated_surface_follows_its_yaw() {
        let mut w = CollisionWorld::new(&PhysicsConfig::default());
        w.add_surface(Surface {
            kind: SurfaceKind::Walkable,
            center: Vec3::ZERO,
            width: 10.0,
            depth: 1.0,
            yaw: std::f32::consts::FRAC_PI_2,
        });
        // A quarter turn lays the long side along Z
        let down = |x, z| CameraRay { origin: Vec3::new(x, 5.0, z), direction: Vec3::NEG_Y };
        assert!(w.cast_surfaces(&down(0.0, 4.0), 100.0, |_| true).is_some());
        assert!(w.cast_surfaces(&down(4.0, 0.0), 100.0, |_| true).is_none());
    }
}
