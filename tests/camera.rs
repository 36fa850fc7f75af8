use abyss::config::{CameraConfig, GameConfig};
use abyss::controller::{CameraController, InputEvent, PanDirection};
use abyss::model::{BuiltinAssets, Bounds, Camera};
use abyss::Game;
use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn rig() -> (CameraController, Camera) {
    let config = CameraConfig::default();
    (CameraController::new(&config), Camera::new(&config, 800, 600))
}

fn scenario_bounds() -> Bounds {
    Bounds::new(
        Vec3::new(-2.7, 0.0, -51.0),
        Vec3::new(55.5, 0.0, 0.0),
        Vec3::new(0.0, 0.0, 7.5),
        Vec3::new(0.0, 0.0, 30.0),
    )
}

const LEFT: PanDirection = PanDirection { forward: false, back: false, left: true, right: false };

#[test]
fn edge_pan_moves_one_step() {
    let (ctl, mut cam) = rig();
    cam.position = Vec3::new(50.0, 8.0, -45.0);
    ctl.update(&mut cam, &scenario_bounds(), LEFT, true, Vec3::ZERO);
    assert!((cam.position.x - 49.875).abs() < 1e-5);
}

#[test]
fn edge_pan_refuses_to_cross_the_border() {
    let (ctl, mut cam) = rig();
    cam.position = Vec3::new(-2.6, 8.0, -10.0);
    ctl.update(&mut cam, &scenario_bounds(), LEFT, true, Vec3::ZERO);
    assert_eq!(cam.position.x, -2.6);
}

#[test]
fn pan_without_edge_contact_does_nothing() {
    let (ctl, mut cam) = rig();
    cam.position = Vec3::new(20.0, 8.0, -20.0);
    ctl.update(&mut cam, &scenario_bounds(), LEFT, false, Vec3::ZERO);
    assert_eq!(cam.position, Vec3::new(20.0, 8.0, -20.0));
}

#[test]
fn random_panning_never_leaves_bounds() {
    let (ctl, mut cam) = rig();
    let bounds = scenario_bounds();
    cam.position = Vec3::new(10.0, 8.0, -10.0);
    let mut rng = StdRng::seed_from_u64(7);

    for _ in 0..20_000 {
        let before = cam.position;
        let dir = PanDirection {
            forward: rng.gen_bool(0.5),
            back: rng.gen_bool(0.3),
            left: rng.gen_bool(0.5),
            right: rng.gen_bool(0.3),
        };
        ctl.pan(&mut cam, &bounds, dir);

        assert!(bounds.contains_xz(cam.position), "left bounds at {:?}", cam.position);
        assert_eq!(cam.position.y, before.y);
        let step = (cam.position - before).abs();
        for moved in [step.x, step.z] {
            // Each axis either stays put or moves by at most two opposing steps
            assert!(moved < 1e-5 || (moved - ctl.speed).abs() < 1e-4, "odd step {moved}");
        }
    }
}

#[test]
fn random_scrolling_keeps_zoom_in_range() {
    let (ctl, mut cam) = rig();
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..5_000 {
        let delta = rng.gen_range(-300.0f32..300.0);
        ctl.zoom(&mut cam, delta);
        assert!(cam.zoom() >= ctl.min_zoom - 1e-5 && cam.zoom() <= ctl.max_zoom + 1e-5, "zoom {}", cam.zoom());
    }
}

#[test]
fn holding_space_follows_the_player() {
    let mut game = Game::new(GameConfig::default(), 800, 600).unwrap();
    game.load_assets(&BuiltinAssets::default());
    game.start().unwrap();

    game.handle_input(InputEvent::KeyDown(" ".into()));
    game.tick(1.0 / 60.0);
    let player = game.player.model_position;
    assert_eq!(game.camera.position.x, player.x);
    assert!((game.camera.position.z - (player.z + 5.0)).abs() < 1e-5);

    game.handle_input(InputEvent::KeyUp(" ".into()));
    assert!(!game.camera_controller.locked());
}
