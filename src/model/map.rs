//! Howling Abyss layout: collision obstacles, click surfaces and prop
//! placements, all in world units.

use std::f32::consts::PI;

use glam::Vec3;
use tracing::info;

use crate::controller::physics::{ColliderShape, ColliderTransform, CollisionWorld, Surface, SurfaceKind};
use crate::model::assets::{INHIB, NEXUS, ORDER_TURRET};

/// The map is laid out along a diagonal; most geometry shares this yaw.
pub const BASE_YAW: f32 = PI / 4.09;

pub const GROUND_HEIGHT: f32 = 0.05;

const WALL_Y: f32 = 1.5;
const WALL_HEIGHT: f32 = 6.0;
const WALL_THICKNESS: f32 = 0.1;

const TURRET_Y: f32 = 1.7;
const TURRET_SIZE: Vec3 = Vec3::new(0.8, 3.0, 0.8);

pub const TURRET_POSITIONS: [(f32, f32); 5] = [(-3.3, 2.6), (3.7, -6.4), (5.95, -4.1), (12.55, -12.8), (18.1, -18.15)];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObstacleKind {
    Platform,
    Wall,
    Nexus,
    Inhibitor,
    Turret,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obstacle {
    pub kind: ObstacleKind,
    pub shape: ColliderShape,
    pub transform: ColliderTransform,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropPlacement {
    pub asset: &'static str,
    pub position: Vec3,
    pub yaw: f32,
}

fn slab(kind: ObstacleKind, at: (f32, f32, f32), size: (f32, f32, f32), yaw: f32) -> Obstacle {
    Obstacle {
        kind,
        shape: ColliderShape::Box { width: size.0, height: size.1, depth: size.2 },
        transform: ColliderTransform::rotated(Vec3::new(at.0, at.1, at.2), Vec3::new(0.0, yaw, 0.0)),
    }
}

fn wall(x: f32, z: f32, width: f32, depth: f32, yaw: f32) -> Obstacle {
    slab(ObstacleKind::Wall, (x, WALL_Y, z), (width, WALL_HEIGHT, depth), yaw)
}

fn orb(kind: ObstacleKind, x: f32, y: f32, z: f32, radius: f32) -> Obstacle {
    Obstacle {
        kind,
        shape: ColliderShape::Sphere { radius },
        transform: ColliderTransform::at(Vec3::new(x, y, z)),
    }
}

pub fn obstacles() -> Vec<Obstacle> {
    let t = WALL_THICKNESS;
    let mut list = vec![
        // spawn platforms
        slab(ObstacleKind::Platform, (-1.0, 0.0, 0.5), (5.0, 0.55, 3.25), BASE_YAW),
        slab(ObstacleKind::Platform, (-0.7, 0.0, 0.1), (6.0, 0.35, 4.0), BASE_YAW),
        // fountain
        wall(-3.0, 3.0, t, 5.0, BASE_YAW),
        wall(2.0, 4.0, t, 10.0, PI / 2.09),
        wall(-4.0, 0.0, 7.0, t, BASE_YAW),
        wall(-1.8, -6.2, 7.5, t, PI / 1.9),
        // base
        wall(1.0, -12.0, 8.0, t, BASE_YAW),
        wall(5.0, -14.0, 5.0, t, PI / 1.05),
        wall(11.0, 0.0, 12.0, t, BASE_YAW),
        wall(14.0, -5.0, 5.0, t, PI / -2.4),
        // structures
        orb(ObstacleKind::Nexus, 3.0, 1.0, -3.5, 1.45),
        orb(ObstacleKind::Inhibitor, 9.1, 1.0, -9.5, 1.0),
    ];
    list.extend(TURRET_POSITIONS.iter().map(|&(x, z)| {
        slab(ObstacleKind::Turret, (x, TURRET_Y, z), (TURRET_SIZE.x, TURRET_SIZE.y, TURRET_SIZE.z), BASE_YAW)
    }));
    // lane
    list.push(wall(28.0, -22.0, 41.0, t, BASE_YAW));
    list.push(wall(22.2, -27.8, 41.0, t, BASE_YAW));
    list
}

pub fn surfaces() -> Vec<Surface> {
    let rect = |kind, x, y, z, width, depth| Surface { kind, center: Vec3::new(x, y, z), width, depth, yaw: BASE_YAW };
    vec![
        // lane
        rect(SurfaceKind::Walkable, 25.2, 0.1, -25.0, 80.0, 7.9),
        // our base
        rect(SurfaceKind::Walkable, 4.0, 0.1, -4.0, 17.0, 16.0),
        // enemy base
        rect(SurfaceKind::Walkable, 46.5, 0.1, -46.0, 17.0, 16.0),
        // nexus footprint
        rect(SurfaceKind::Blocked, 3.0, 0.2, -3.5, 3.0, 3.0),
        Surface { kind: SurfaceKind::Ground, center: Vec3::new(0.0, 0.2, 0.0), width: 200.0, depth: 200.0, yaw: 0.0 },
    ]
}

pub fn props() -> Vec<PropPlacement> {
    let mut props = vec![
        PropPlacement { asset: NEXUS, position: Vec3::new(3.0, 0.0, -3.5), yaw: 0.0 },
        PropPlacement { asset: INHIB, position: Vec3::new(9.1, 0.0, -9.5), yaw: PI / 0.31 },
    ];
    props.extend(TURRET_POSITIONS.iter().map(|&(x, z)| PropPlacement {
        asset: ORDER_TURRET,
        position: Vec3::new(x, 0.0, z),
        yaw: PI / 0.57,
    }));
    props
}

/// Register the whole map with the collision world. Call once per session.
pub fn build_world(world: &mut CollisionWorld) {
    world.add_ground_plane(GROUND_HEIGHT);
    for obstacle in obstacles() {
        world.add_static_collider(obstacle.shape, obstacle.transform);
    }
    let surfaces = surfaces();
    let count = surfaces.len();
    for surface in surfaces {
        world.add_surface(surface);
    }
    info!(obstacles = world.static_collider_count(), surfaces = count, "map colliders built");
}
