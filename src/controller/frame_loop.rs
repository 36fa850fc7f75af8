use std::cell::{Cell, RefCell};
use std::rc::Rc;

use glam::Vec3;
use tracing::{debug, info, warn};

use crate::config::GameConfig;
use crate::controller::camera_controller::CameraController;
use crate::controller::click_to_move::{CaptureCommand, ClickOutcome, ClickToMove};
use crate::controller::input::{InputEvent, InputProcessor, InputState, MouseButton, PointerState, Region};
use crate::controller::physics::CollisionWorld;
use crate::controller::player_controller::{PlayerController, PlayerTransition};
use crate::error::{GameError, Result};
use crate::model::animation::{AnimationKey, AnimationMixer};
use crate::model::assets::{self, AssetSource, AssetStore, REQUIRED_ASSETS};
use crate::model::audio::{self, Track};
use crate::model::{map, Bounds, Camera, Snowfall};

/// Directional light sits at this offset from the camera every frame.
pub const LIGHT_OFFSET: Vec3 = Vec3::new(-3.0, 7.0, -3.0);

const CLICK_MAX_DISTANCE: f32 = 1000.0;
const MAX_FRAME_DT: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    NotStarted,
    Running,
}

/// Shared stop flag. The host checks it before scheduling another frame.
#[derive(Debug, Clone, Default)]
pub struct LoopHandle(Rc<Cell<bool>>);

impl LoopHandle {
    pub fn cancel(&self) { self.0.set(true); }

    pub fn is_cancelled(&self) -> bool { self.0.get() }
}

type LoopCallback = Box<dyn FnMut(f32)>;

/// Everything one session needs, owned in one place and ticked once per
/// display refresh.
pub struct Game {
    pub config: GameConfig,
    pub bounds: Bounds,
    pub camera: Camera,
    pub camera_controller: CameraController,
    pub world: CollisionWorld,
    pub player: PlayerController,
    pub pointer: PointerState,
    pub keys: InputState,
    pub input: InputProcessor,
    pub mixer: AnimationMixer,
    pub assets: AssetStore,
    pub region: Region,
    pub light_position: Vec3,

    // Presentation state read by the UI
    pub paused: bool,
    pub loaded: bool,
    pub warning: Option<String>,
    pub show_debug: bool,
    pub fps: f32,

    state: LoopState,
    backend_error: Option<String>,
    click: ClickToMove,
    capture: CaptureCommand,
    capture_requested: bool,
    pending_tracks: Vec<Track>,
    last_click: Option<ClickOutcome>,
    last_transition: Option<PlayerTransition>,
    callbacks: Vec<LoopCallback>,
    last_frame_ms: Option<f64>,
    handle: LoopHandle,
}

impl Game {
    pub fn new(config: GameConfig, width: u32, height: u32) -> Result<Self> {
        config.validate()?;
        let bounds = Bounds::howling_abyss();
        let mut world = CollisionWorld::new(&config.physics);
        map::build_world(&mut world);
        Self::with_world(config, bounds, world, width, height)
    }

    /// Build around a prepared world, used when the map layout is not wanted.
    pub fn with_world(config: GameConfig, bounds: Bounds, mut world: CollisionWorld, width: u32, height: u32) -> Result<Self> {
        let player = PlayerController::spawn(&mut world, &config)?;
        let camera = Camera::new(&config.camera, width, height);
        let light_position = camera.position + LIGHT_OFFSET;

        Ok(Self {
            bounds,
            camera_controller: CameraController::new(&config.camera),
            pointer: PointerState::new(&config.pointer),
            keys: InputState::new(),
            input: InputProcessor::default(),
            mixer: AnimationMixer::new(),
            assets: AssetStore::new(),
            region: Region::new(width, height),
            light_position,
            paused: true,
            loaded: false,
            warning: None,
            show_debug: false,
            fps: 0.0,
            state: LoopState::NotStarted,
            backend_error: None,
            click: ClickToMove::new(config.player.target_height, CLICK_MAX_DISTANCE),
            capture: CaptureCommand,
            capture_requested: false,
            pending_tracks: Vec::new(),
            last_click: None,
            last_transition: None,
            callbacks: Vec::new(),
            last_frame_ms: None,
            handle: LoopHandle::default(),
            camera,
            world,
            player,
            config,
        })
    }

    pub fn state(&self) -> LoopState { self.state }

    pub fn handle(&self) -> LoopHandle { self.handle.clone() }

    pub fn last_click(&self) -> Option<ClickOutcome> { self.last_click }

    pub fn last_transition(&self) -> Option<PlayerTransition> { self.last_transition }

    /// Load every named asset and bind the champion's clips to the mixer.
    pub fn load_assets(&mut self, source: &dyn AssetSource) {
        self.assets.load_all(source, &assets::ALL_ASSETS);

        if let Some(champion) = self.assets.get(assets::NIDALEE) {
            for (key, name) in [(AnimationKey::Run, assets::RUN_CLIP), (AnimationKey::Idle, assets::IDLE_CLIP)] {
                match champion.clip(name) {
                    Some(clip) => self.mixer.add_action(key, clip.clone()),
                    None => warn!(clip = name, "champion is missing an animation clip"),
                }
            }
            self.player.start_idle(&mut self.mixer);
        }

        self.loaded = self.assets.settled();
        self.warning = match self.assets.require(&REQUIRED_ASSETS) {
            Err(e) => Some(e.to_string()),
            Ok(()) => self.assets.warning(),
        };
    }

    /// Record that the renderer could not be brought up. The loop will refuse to start.
    pub fn set_backend_unsupported(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(%reason, "rendering backend unsupported");
        self.warning = Some(reason.clone());
        self.backend_error = Some(reason);
    }

    pub fn start(&mut self) -> Result<()> {
        if self.state == LoopState::Running {
            self.paused = false;
            return Ok(());
        }
        self.assets.require(&REQUIRED_ASSETS)?;
        if let Some(reason) = &self.backend_error {
            return Err(GameError::UnsupportedBackend(reason.clone()));
        }

        self.camera.reset(&self.config.camera);
        self.light_position = self.camera.position + LIGHT_OFFSET;
        self.last_frame_ms = None;
        self.state = LoopState::Running;
        self.paused = false;
        self.pending_tracks = audio::soundscape(&self.config.audio);
        info!("game loop started");
        Ok(())
    }

    pub fn add_to_loop(&mut self, callback: impl FnMut(f32) + 'static) { self.callbacks.push(Box::new(callback)); }

    /// Build the ambient snow and hook it into the loop. The returned handle
    /// is for the renderer.
    pub fn spawn_snowfall(&mut self) -> Rc<RefCell<Snowfall>> {
        let snow = Rc::new(RefCell::new(Snowfall::new(&self.config.weather, self.bounds)));
        let ticking = snow.clone();
        self.add_to_loop(move |_| ticking.borrow_mut().update());
        snow
    }

    /// One display refresh. Returns whether the host should schedule another.
    pub fn frame(&mut self, now_ms: f64, render: impl FnOnce(&Game)) -> bool {
        if self.handle.is_cancelled() {
            return false;
        }
        let dt = match self.last_frame_ms {
            Some(last) => (((now_ms - last) / 1000.0) as f32).clamp(0.0, MAX_FRAME_DT),
            None => 0.0,
        };
        self.last_frame_ms = Some(now_ms);
        if dt > 0.0 {
            self.fps = self.fps * 0.9 + (1.0 / dt) * 0.1;
        }

        self.tick(dt);
        render(self);
        !self.handle.is_cancelled()
    }

    pub fn tick(&mut self, dt: f32) {
        if self.state != LoopState::Running {
            return;
        }

        self.world.advance(dt);
        if let Some(transition) = self.player.update(&mut self.world, &mut self.mixer) {
            self.last_transition = Some(transition);
        }
        self.player.sync_model(&self.world);

        self.camera_controller.update(
            &mut self.camera,
            &self.bounds,
            self.pointer.pan(),
            self.pointer.at_edge,
            self.player.model_position,
        );
        self.mixer.update(dt * self.config.animation.time_scale);
        for callback in &mut self.callbacks {
            callback(dt);
        }
        self.light_position = self.camera.position + LIGHT_OFFSET;
    }

    /// Sounds queued by the first start, for the host to play.
    pub fn take_tracks(&mut self) -> Vec<Track> { std::mem::take(&mut self.pending_tracks) }

    /// Pointer capture the host should request on the next opportunity.
    pub fn take_capture_request(&mut self) -> bool { std::mem::take(&mut self.capture_requested) }

    fn accepts_commands(&self) -> bool { self.state == LoopState::Running && !self.paused }

    pub fn handle_input(&mut self, event: InputEvent) {
        self.keys.process_event(&event);

        match event {
            InputEvent::KeyDown(key) => {
                if self.input.is_pause(&key) && self.state == LoopState::Running {
                    self.paused = !self.paused;
                    debug!(paused = self.paused, "pause toggled");
                } else if self.input.is_toggle_debug(&key) {
                    self.show_debug = !self.show_debug;
                }
            }
            InputEvent::KeyUp(_) | InputEvent::FocusLost | InputEvent::VisibilityChanged { .. } => {}
            InputEvent::Resized { width, height } => {
                self.region = Region::new(width, height);
                self.camera.set_aspect(width, height);
            }
            InputEvent::PointerLockChanged { locked } => {
                if locked {
                    self.pointer.captured = true;
                } else {
                    self.pointer.release();
                }
            }
            InputEvent::MouseMove { dx, dy } => {
                if self.accepts_commands() && self.pointer.captured {
                    self.pointer.move_by(dx, dy, self.region);
                }
            }
            InputEvent::PointerMoved { x, y } => {
                if self.accepts_commands() && !self.pointer.captured {
                    self.pointer.move_to(x, y, self.region);
                }
            }
            InputEvent::MouseWheel { delta_y } => {
                if self.accepts_commands() {
                    self.camera_controller.zoom(&mut self.camera, delta_y);
                }
            }
            InputEvent::MouseClick { button, is_down: true, x, y } => {
                if !self.accepts_commands() {
                    return;
                }
                if self.capture.execute(&mut self.pointer, x, y, self.region) {
                    self.capture_requested = true;
                }
                if button == MouseButton::Right {
                    let ndc = self.pointer.ndc(self.region);
                    let outcome = self.click.execute(&self.camera, ndc, &mut self.world, &mut self.player);
                    debug!(?outcome, "move order");
                    self.last_click = Some(outcome);
                }
            }
            InputEvent::MouseClick { is_down: false, .. } => {}
        }
        self.sync_camera_lock();
    }

    /// The lock follows the held key, but only engages while commands are accepted.
    fn sync_camera_lock(&mut self) {
        let held = self.input.camera_lock_held(&self.keys);
        self.camera_controller.set_locked(held && self.accepts_commands());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::assets::{BuiltinAssets, NIDALEE};

    fn game() -> Game {
        let mut g = Game::new(GameConfig::default(), 800, 600).unwrap();
        g.load_assets(&BuiltinAssets::default());
        g
    }

    #[test]
    fn first_frame_has_zero_dt_and_dt_is_clamped() {
        let mut g = game();
        g.start().unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        g.add_to_loop(move |dt| log.borrow_mut().push(dt));

        let mut renders = 0;
        g.frame(1000.0, |_| renders += 1);
        g.frame(1016.0, |_| renders += 1);
        g.frame(5000.0, |_| renders += 1);
        assert_eq!(renders, 3);
        let seen = seen.borrow();
        assert_eq!(seen[0], 0.0);
        assert!((seen[1] - 0.016).abs() < 1e-5);
        assert_eq!(seen[2], 0.1);
    }

    #[test]
    fn start_needs_required_assets() {
        let mut g = Game::new(GameConfig::default(), 800, 600).unwrap();
        g.load_assets(&BuiltinAssets::without(&[NIDALEE]));
        assert!(matches!(g.start(), Err(GameError::MissingRequiredAssets(_))));
        assert_eq!(g.state(), LoopState::NotStarted);
        assert!(g.warning.is_some());
    }

    #[test]
    fn unsupported_backend_never_starts() {
        let mut g = game();
        g.set_backend_unsupported("no adapter");
        assert!(matches!(g.start(), Err(GameError::UnsupportedBackend(_))));
        assert_eq!(g.state(), LoopState::NotStarted);
    }

    #[test]
    fn second_start_only_unpauses() {
        let mut g = game();
        g.start().unwrap();
        g.camera.position.x = 20.0;
        g.handle_input(InputEvent::KeyDown("Escape".into()));
        assert!(g.paused);
        g.start().unwrap();
        assert!(!g.paused);
        assert_eq!(g.camera.position.x, 20.0);
    }

    #[test]
    fn first_start_queues_the_soundscape_once() {
        let mut g = game();
        assert!(g.take_tracks().is_empty());
        g.start().unwrap();
        assert_eq!(g.take_tracks().len(), 2);
        assert!(g.take_tracks().is_empty());

        g.handle_input(InputEvent::KeyDown("Escape".into()));
        g.start().unwrap();
        assert!(g.take_tracks().is_empty());
    }

    #[test]
    fn commands_ignored_before_start_and_while_paused() {
        let mut g = game();
        g.handle_input(InputEvent::MouseWheel { delta_y: -1.0 });
        assert_eq!(g.camera.zoom(), 1.85);

        g.start().unwrap();
        g.handle_input(InputEvent::KeyDown("Escape".into()));
        g.handle_input(InputEvent::MouseClick { button: MouseButton::Right, is_down: true, x: 400.0, y: 300.0 });
        assert!(g.last_click().is_none());
        assert!(!g.take_capture_request());
    }

    #[test]
    fn click_requests_capture_and_moves() {
        let mut g = game();
        g.start().unwrap();
        g.handle_input(InputEvent::MouseClick { button: MouseButton::Right, is_down: true, x: 400.0, y: 300.0 });
        assert!(g.take_capture_request());
        assert!(!g.take_capture_request());
        assert!(matches!(g.last_click(), Some(ClickOutcome::Moving(_))));
        assert!(g.player.target().is_some());
    }

    #[test]
    fn space_lock_follows_player() {
        let mut g = game();
        g.start().unwrap();
        g.handle_input(InputEvent::KeyDown(" ".into()));
        g.tick(1.0 / 60.0);
        let p = g.player.model_position;
        assert_eq!(g.camera.position.x, p.x);
        assert!((g.camera.position.z - (p.z + 5.0)).abs() < 1e-5);
        g.handle_input(InputEvent::KeyUp(" ".into()));
        assert!(!g.camera_controller.locked());
    }

    #[test]
    fn lock_tracks_held_keys() {
        let mut g = game();
        g.handle_input(InputEvent::KeyDown(" ".into()));
        assert!(!g.camera_controller.locked());

        g.start().unwrap();
        g.handle_input(InputEvent::KeyDown(" ".into()));
        assert!(g.camera_controller.locked());
        g.handle_input(InputEvent::VisibilityChanged { visible: true });
        assert!(g.camera_controller.locked());
        g.handle_input(InputEvent::VisibilityChanged { visible: false });
        assert!(!g.camera_controller.locked());
        assert!(!g.keys.is_key_pressed(" "));

        g.handle_input(InputEvent::KeyDown(" ".into()));
        g.handle_input(InputEvent::KeyDown("Escape".into()));
        assert!(!g.camera_controller.locked());
        g.handle_input(InputEvent::KeyDown("Escape".into()));
        assert!(g.camera_controller.locked());
    }

    #[test]
    fn light_tracks_camera() {
        let mut g = game();
        g.start().unwrap();
        g.camera.position = Vec3::new(10.0, 8.0, -10.0);
        g.tick(0.0);
        assert_eq!(g.light_position, Vec3::new(7.0, 15.0, -13.0));
    }

    #[test]
    fn cancelled_handle_stops_scheduling() {
        let mut g = game();
        g.start().unwrap();
        let handle = g.handle();
        assert!(g.frame(0.0, |_| {}));
        handle.cancel();
        let mut rendered = false;
        assert!(!g.frame(16.0, |_| rendered = true));
        assert!(!rendered);
    }

    #[test]
    fn edge_pan_moves_camera_while_captured() {
        let mut g = game();
        g.start().unwrap();
        g.handle_input(InputEvent::PointerLockChanged { locked: true });
        g.pointer.move_to(400.0, 300.0, g.region);
        g.handle_input(InputEvent::MouseMove { dx: -1000.0, dy: 0.0 });
        assert!(g.pointer.pan().left);
        let x = g.camera.position.x;
        g.tick(1.0 / 60.0);
        assert!((g.camera.position.x - (x - 0.125)).abs() < 1e-5);

        g.handle_input(InputEvent::PointerLockChanged { locked: false });
        assert!(!g.pointer.at_edge);
    }
}
