use abyss::config::GameConfig;
use abyss::controller::{ColliderShape, ColliderTransform, CollisionWorld, PlayerController, PlayerTransition};
use abyss::model::{AnimationClip, AnimationKey, AnimationMixer};
use glam::Vec3;

fn bare_world(config: &GameConfig) -> CollisionWorld {
    let mut world = CollisionWorld::new(&config.physics);
    world.add_ground_plane(0.05);
    world
}

fn mixer() -> AnimationMixer {
    let mut m = AnimationMixer::new();
    m.add_action(AnimationKey::Idle, AnimationClip::new("idle", 2.4));
    m.add_action(AnimationKey::Run, AnimationClip::new("run", 0.8));
    m.play(AnimationKey::Idle);
    m
}

fn flat_distance(a: Vec3, b: Vec3) -> f32 {
    Vec3::new(a.x - b.x, 0.0, a.z - b.z).length()
}

#[test]
fn walks_to_target_and_stops_once() {
    let config = GameConfig::default();
    let mut world = bare_world(&config);
    let mut player = PlayerController::spawn(&mut world, &config).unwrap();
    let mut mixer = mixer();
    let target = Vec3::new(3.0, 0.0, 4.0);
    player.set_target(target);

    let first = player.update(&mut world, &mut mixer);
    assert_eq!(first, Some(PlayerTransition::IdleToMoving));
    let v = player.commanded_velocity();
    assert!((v - Vec3::new(1.02, 0.0, 1.36)).length() < 1e-4, "{v:?}");

    let mut stops = 0;
    let mut starts = 0;
    for _ in 0..600 {
        world.advance(world.fixed_dt());
        match player.update(&mut world, &mut mixer) {
            Some(PlayerTransition::MovingToIdle) => stops += 1,
            Some(PlayerTransition::IdleToMoving) => starts += 1,
            None => {}
        }
        player.sync_model(&world);
        mixer.update(world.fixed_dt());
    }

    assert_eq!(stops, 1);
    assert_eq!(starts, 0);
    assert_eq!(player.target(), None);
    assert_eq!(player.animation(), AnimationKey::Idle);
    assert_eq!(mixer.active(), Some(AnimationKey::Idle));
    assert!(flat_distance(world.position(player.body), target) < 0.4 + 0.05);
}

#[test]
fn wall_between_player_and_target_holds_the_player() {
    let config = GameConfig::default();
    let mut world = bare_world(&config);
    world.add_static_collider(
        ColliderShape::Box { width: 0.5, height: 3.0, depth: 10.0 },
        ColliderTransform::at(Vec3::new(3.0, 1.5, 0.0)),
    );
    let mut player = PlayerController::spawn(&mut world, &config).unwrap();
    let mut mixer = mixer();
    player.set_target(Vec3::new(8.0, 0.0, 0.0));

    let face = 3.0 - 0.25;
    let mut deepest = 0.0_f32;
    for _ in 0..600 {
        world.advance(world.fixed_dt());
        player.update(&mut world, &mut mixer);
        let x = world.position(player.body).x;
        deepest = deepest.max(x + config.player.collider_radius - face);
    }
    assert!(deepest <= 1e-3, "body sank {deepest} into the wall");
    assert!(player.target().is_some());
    assert_eq!(player.animation(), AnimationKey::Run);
}

#[test]
fn retarget_mid_run_keeps_running() {
    let config = GameConfig::default();
    let mut world = bare_world(&config);
    let mut player = PlayerController::spawn(&mut world, &config).unwrap();
    let mut mixer = mixer();

    player.set_target(Vec3::new(5.0, 0.0, 0.0));
    player.update(&mut world, &mut mixer);
    for _ in 0..30 {
        world.advance(world.fixed_dt());
        assert_eq!(player.update(&mut world, &mut mixer), None);
    }
    player.set_target(Vec3::new(-5.0, 0.0, 0.0));
    assert_eq!(player.update(&mut world, &mut mixer), None);
    assert!(player.commanded_velocity().x < 0.0);
}
