use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};
use winit::{
    event::*,
    event_loop::EventLoop,
    keyboard::{Key, NamedKey},
    window::{CursorGrabMode, Window},
};

use abyss::controller::{Game, InputEvent, MouseButton as GameButton};
use abyss::model::{BuiltinAssets, Snowfall};
use abyss::view::{GpuContext, RenderState};
use abyss::{logging, ui, GameConfig, GameError};

/// Pixels per wheel line, matching what browsers report in `deltaY`.
const WHEEL_LINE: f32 = 100.0;

struct App {
    window: Arc<Window>,
    gpu: GpuContext,
    render: RenderState,

    // egui
    egui_state: egui_winit::State,
    egui_ctx: egui::Context,

    game: Game,
    snow: Rc<RefCell<Snowfall>>,
    cursor: (f32, f32),
    started: Instant,
}

/// Browser-style `KeyboardEvent.key` name for a winit key.
fn key_name(key: &Key) -> Option<String> {
    match key {
        Key::Named(NamedKey::Escape) => Some("Escape".into()),
        Key::Named(NamedKey::Space) => Some(" ".into()),
        Key::Named(NamedKey::F3) => Some("F3".into()),
        Key::Character(c) => Some(c.to_string()),
        _ => None,
    }
}

fn game_button(button: MouseButton) -> Option<GameButton> {
    match button {
        MouseButton::Left => Some(GameButton::Left),
        MouseButton::Right => Some(GameButton::Right),
        MouseButton::Middle => Some(GameButton::Middle),
        _ => None,
    }
}

impl App {
    async fn new(window: Arc<Window>, config: GameConfig) -> Result<Self, GameError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window.clone())
            .map_err(|e| GameError::UnsupportedBackend(e.to_string()))?;
        let gpu = GpuContext::new_native(instance, surface, size.width, size.height).await?;

        let mut game = Game::new(config, size.width, size.height)?;
        game.load_assets(&BuiltinAssets::default());
        let snow = game.spawn_snowfall();

        let mut render = RenderState::new(&gpu);
        render.load_scene(&gpu.device, &game.assets);

        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            None,
            None,
            None,
        );

        Ok(Self {
            window,
            gpu,
            render,
            egui_state,
            egui_ctx,
            game,
            snow,
            cursor: (0.0, 0.0),
            started: Instant::now(),
        })
    }

    fn set_captured(&mut self, captured: bool) {
        if captured {
            let grab = self
                .window
                .set_cursor_grab(CursorGrabMode::Locked)
                .or_else(|_| self.window.set_cursor_grab(CursorGrabMode::Confined));
            if let Err(e) = grab {
                warn!(error = %e, "cursor grab refused");
                return;
            }
        } else {
            let _ = self.window.set_cursor_grab(CursorGrabMode::None);
        }
        self.window.set_cursor_visible(!captured);
        self.game.handle_input(InputEvent::PointerLockChanged { locked: captured });
    }

    fn dispatch(&mut self, event: InputEvent) {
        self.game.handle_input(event);
        if self.game.take_capture_request() {
            self.set_captured(true);
        }
    }

    fn input(&mut self, event: &WindowEvent) {
        let _ = self.egui_state.on_window_event(self.window.as_ref(), event);

        match event {
            WindowEvent::KeyboardInput { event: KeyEvent { state, logical_key, repeat: false, .. }, .. } => {
                let Some(key) = key_name(logical_key) else { return };
                let pressed = *state == ElementState::Pressed;
                // The OS does not release the grab on Escape like a browser does
                if pressed && key == "Escape" && self.game.pointer.captured {
                    self.set_captured(false);
                }
                self.dispatch(if pressed { InputEvent::KeyDown(key) } else { InputEvent::KeyUp(key) });
            }
            WindowEvent::MouseInput { state, button, .. } => {
                if let Some(button) = game_button(*button) {
                    let (x, y) = self.cursor;
                    self.dispatch(InputEvent::MouseClick { button, is_down: *state == ElementState::Pressed, x, y });
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = (position.x as f32, position.y as f32);
                if !self.game.pointer.captured {
                    self.dispatch(InputEvent::PointerMoved { x: self.cursor.0, y: self.cursor.1 });
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let delta_y = match delta {
                    MouseScrollDelta::LineDelta(_, y) => -y * WHEEL_LINE,
                    MouseScrollDelta::PixelDelta(p) => -p.y as f32,
                };
                self.dispatch(InputEvent::MouseWheel { delta_y });
            }
            WindowEvent::Focused(false) => self.dispatch(InputEvent::FocusLost),
            WindowEvent::Occluded(occluded) => self.dispatch(InputEvent::VisibilityChanged { visible: !occluded }),
            _ => {}
        }
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.render.resize(&self.gpu.device, &self.gpu.surface, new_size.width, new_size.height);
        self.dispatch(InputEvent::Resized { width: new_size.width, height: new_size.height });
    }

    fn handle_mouse_motion(&mut self, dx: f64, dy: f64) {
        if self.game.pointer.captured {
            self.dispatch(InputEvent::MouseMove { dx: dx as f32, dy: dy as f32 });
        }
    }

    /// One display refresh. Returns whether to keep running.
    fn redraw(&mut self) -> bool {
        let now_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        let raw_input = self.egui_state.take_egui_input(&self.window);
        let mut actions = ui::UiActions::default();
        let mut platform_output = None;

        let Self { game, render, gpu, egui_ctx, snow, .. } = self;
        let keep_going = game.frame(now_ms, |game| {
            let (mut output, ui_actions) = ui::build_ui(egui_ctx, game, raw_input);
            actions = ui_actions;
            platform_output = Some(std::mem::take(&mut output.platform_output));

            let dpr = output.pixels_per_point;
            let primitives = egui_ctx.tessellate(std::mem::take(&mut output.shapes), dpr);
            render.prepare(&gpu.device, &gpu.queue, game, Some(&*snow.borrow()));
            render.set_ui(primitives, output, dpr);
            render.draw_frame(&gpu.device, &gpu.queue, &gpu.surface);
        });

        if let Some(output) = platform_output {
            self.egui_state.handle_platform_output(&self.window, output);
        }
        if actions.play_clicked {
            if let Err(e) = self.game.start() {
                warn!(error = %e, "cannot start");
                self.game.warning = Some(e.to_string());
            }
            for track in self.game.take_tracks() {
                debug!(src = %track.src, "no audio output on desktop, skipping");
            }
        }
        keep_going
    }
}

fn load_config() -> GameConfig {
    match std::env::args().nth(1) {
        Some(path) => GameConfig::load(&path).unwrap_or_else(|e| {
            warn!(%path, error = %e, "falling back to default config");
            GameConfig::default()
        }),
        None => GameConfig::default(),
    }
}

fn main() {
    logging::init();
    let config = load_config();

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            error!(error = %e, "no event loop");
            std::process::exit(1);
        }
    };
    let window_attributes = Window::default_attributes()
        .with_title("Howling Abyss")
        .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));
    #[allow(deprecated)]
    let window = match event_loop.create_window(window_attributes) {
        Ok(window) => Arc::new(window),
        Err(e) => {
            error!(error = %e, "cannot open window");
            std::process::exit(1);
        }
    };

    let mut app = match pollster::block_on(App::new(window, config)) {
        Ok(app) => app,
        Err(e) => {
            error!(error = %e, "startup failed");
            std::process::exit(1);
        }
    };
    info!("window open");

    #[allow(deprecated)]
    let result = event_loop.run(move |event, elwt| match event {
        Event::WindowEvent { ref event, window_id } if window_id == app.window.id() => {
            app.input(event);
            match event {
                WindowEvent::CloseRequested => elwt.exit(),
                WindowEvent::Resized(physical_size) => app.resize(*physical_size),
                WindowEvent::RedrawRequested => {
                    if !app.redraw() {
                        elwt.exit();
                    }
                }
                _ => {}
            }
        }
        Event::DeviceEvent { event: DeviceEvent::MouseMotion { delta }, .. } => {
            app.handle_mouse_motion(delta.0, delta.1);
        }
        Event::AboutToWait => app.window.request_redraw(),
        _ => {}
    });
    if let Err(e) = result {
        error!(error = %e, "event loop exited with an error");
    }
}
