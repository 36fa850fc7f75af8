// Re-export all public modules so they can be used from main.rs
pub mod config;
pub mod error;
pub mod logging;
pub mod ui;
pub mod utils;

// MVC Architecture
pub mod controller;
pub mod model;
pub mod view;

pub use config::GameConfig;
pub use controller::Game;
pub use error::{GameError, Result};

#[cfg(target_arch = "wasm32")]
use std::cell::{Cell, RefCell};
#[cfg(target_arch = "wasm32")]
use std::rc::Rc;

#[cfg(target_arch = "wasm32")]
use tracing::{error, info, warn};
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::closure::Closure;
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::{prelude::wasm_bindgen, JsCast, JsValue};
#[cfg(target_arch = "wasm32")]
use web_sys::{Document, Event, HtmlCanvasElement, KeyboardEvent, MouseEvent, Window};

#[cfg(target_arch = "wasm32")]
use controller::input::{wasm as web_input, InputEvent};
#[cfg(target_arch = "wasm32")]
use model::BuiltinAssets;
#[cfg(target_arch = "wasm32")]
use view::{GpuContext, RenderState};

#[cfg(target_arch = "wasm32")]
type Shared<T> = Rc<RefCell<T>>;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn start() -> std::result::Result<(), JsValue> {
    logging::init();
    let (window, document, canvas) = init_canvas()?;
    setup_app(&window, &document, &canvas).await
}

/// Main application setup for WASM
#[cfg(target_arch = "wasm32")]
async fn setup_app(window: &Window, document: &Document, canvas: &HtmlCanvasElement) -> std::result::Result<(), JsValue> {
    let (width, height) = (canvas.width(), canvas.height());
    let mut game = Game::new(GameConfig::default(), width, height).map_err(|e| js_error(e.to_string()))?;

    let gpu = match GpuContext::new(canvas, width, height).await {
        Ok(gpu) => gpu,
        Err(e) => {
            game.set_backend_unsupported(e.to_string());
            error!(error = %e, "cannot start without a GPU");
            show_fallback(document, &e.to_string())?;
            return Ok(());
        }
    };

    game.load_assets(&BuiltinAssets::default());
    let snow = game.spawn_snowfall();

    let mut render_state = RenderState::new(&gpu);
    render_state.load_scene(&gpu.device, &game.assets);

    let game = Rc::new(RefCell::new(game));
    let egui_events: Shared<Vec<egui::Event>> = Rc::new(RefCell::new(Vec::new()));
    let pending_resize: Rc<Cell<Option<(u32, u32)>>> = Rc::new(Cell::new(None));

    setup_input_listeners(document, window, canvas, game.clone(), egui_events.clone(), pending_resize.clone())?;

    let egui_ctx = egui::Context::default();
    let performance = window.performance().ok_or_else(|| js_error("no performance timer"))?;
    let canvas_for_loop = canvas.clone();
    info!(width, height, "entering frame loop");

    // Continuous redraw using requestAnimationFrame
    let f = RcCellCallback::new(window.clone(), move || {
        let now = performance.now();
        if let Some((w, h)) = pending_resize.take() {
            render_state.resize(&gpu.device, &gpu.surface, w, h);
        }

        let mut actions = ui::UiActions::default();
        let mut g = game.borrow_mut();
        let keep_going = g.frame(now, |game| {
            let events = std::mem::take(&mut *egui_events.borrow_mut());
            let raw = ui::raw_input(canvas_for_loop.width(), canvas_for_loop.height(), now, events);
            let (mut output, ui_actions) = ui::build_ui(&egui_ctx, game, raw);
            actions = ui_actions;

            let dpr = output.pixels_per_point;
            let primitives = egui_ctx.tessellate(std::mem::take(&mut output.shapes), dpr);
            render_state.prepare(&gpu.device, &gpu.queue, game, Some(&*snow.borrow()));
            render_state.set_ui(primitives, output, dpr);
            render_state.draw_frame(&gpu.device, &gpu.queue, &gpu.surface);
        });

        if actions.play_clicked {
            if let Err(e) = g.start() {
                warn!(error = %e, "cannot start");
                g.warning = Some(e.to_string());
            }
            model::audio::wasm::play_all(&g.take_tracks());
        }
        keep_going
    });
    f.start();

    Ok(())
}

/// Forward one event to the game and honour any capture it asks for.
#[cfg(target_arch = "wasm32")]
fn dispatch(game: &Shared<Game>, canvas: &HtmlCanvasElement, event: InputEvent) {
    let mut g = game.borrow_mut();
    g.handle_input(event);
    if g.take_capture_request() {
        canvas.request_pointer_lock();
    }
}

#[cfg(target_arch = "wasm32")]
fn egui_button(e: &MouseEvent, pressed: bool) -> egui::Event {
    egui::Event::PointerButton {
        pos: egui::pos2(e.client_x() as f32, e.client_y() as f32),
        button: egui::PointerButton::Primary,
        pressed,
        modifiers: egui::Modifiers::default(),
    }
}

/// Setup all input event listeners with platform-agnostic abstractions
#[cfg(target_arch = "wasm32")]
fn setup_input_listeners(
    document: &Document,
    window: &Window,
    canvas: &HtmlCanvasElement,
    game: Shared<Game>,
    egui_events: Shared<Vec<egui::Event>>,
    pending_resize: Rc<Cell<Option<(u32, u32)>>>,
) -> std::result::Result<(), JsValue> {
    // Keyboard down
    {
        let (game, canvas) = (game.clone(), canvas.clone());
        let keydown = Closure::wrap(Box::new(move |e: KeyboardEvent| {
            if matches!(e.key().as_str(), " " | "F3") {
                e.prevent_default();
            }
            dispatch(&game, &canvas, web_input::keyboard_event_to_input(&e, true));
        }) as Box<dyn FnMut(KeyboardEvent)>);
        document.add_event_listener_with_callback("keydown", keydown.as_ref().unchecked_ref())?;
        keydown.forget();
    }

    // Keyboard up
    {
        let (game, canvas) = (game.clone(), canvas.clone());
        let keyup = Closure::wrap(Box::new(move |e: KeyboardEvent| {
            dispatch(&game, &canvas, web_input::keyboard_event_to_input(&e, false));
        }) as Box<dyn FnMut(KeyboardEvent)>);
        document.add_event_listener_with_callback("keyup", keyup.as_ref().unchecked_ref())?;
        keyup.forget();
    }

    // Focus loss
    {
        let (game, canvas) = (game.clone(), canvas.clone());
        let blur = Closure::wrap(Box::new(move |_e: Event| {
            dispatch(&game, &canvas, InputEvent::FocusLost);
        }) as Box<dyn FnMut(Event)>);
        window.add_event_listener_with_callback("blur", blur.as_ref().unchecked_ref())?;
        blur.forget();
    }

    // Visibility change
    {
        let (game, canvas) = (game.clone(), canvas.clone());
        let doc = document.clone();
        let visibility = Closure::wrap(Box::new(move |_e: Event| {
            dispatch(&game, &canvas, InputEvent::VisibilityChanged { visible: !doc.hidden() });
        }) as Box<dyn FnMut(Event)>);
        document.add_event_listener_with_callback("visibilitychange", visibility.as_ref().unchecked_ref())?;
        visibility.forget();
    }

    // Pointer lock change
    {
        let (game, canvas) = (game.clone(), canvas.clone());
        let doc = document.clone();
        let plc = Closure::wrap(Box::new(move |_e: Event| {
            let locked = doc.pointer_lock_element().is_some();
            dispatch(&game, &canvas, InputEvent::PointerLockChanged { locked });
        }) as Box<dyn FnMut(Event)>);
        document.add_event_listener_with_callback("pointerlockchange", plc.as_ref().unchecked_ref())?;
        plc.forget();
    }

    // Mouse move
    {
        let (game, canvas) = (game.clone(), canvas.clone());
        let doc = document.clone();
        let egui_events = egui_events.clone();
        let mm = Closure::wrap(Box::new(move |e: MouseEvent| {
            let locked = doc.pointer_lock_element().is_some();
            if !locked {
                egui_events
                    .borrow_mut()
                    .push(egui::Event::PointerMoved(egui::pos2(e.client_x() as f32, e.client_y() as f32)));
            }
            dispatch(&game, &canvas, web_input::mouse_move_to_input(&e, locked));
        }) as Box<dyn FnMut(MouseEvent)>);
        document.add_event_listener_with_callback("mousemove", mm.as_ref().unchecked_ref())?;
        mm.forget();
    }

    // Mouse down / up
    for (name, pressed) in [("mousedown", true), ("mouseup", false)] {
        let (game, canvas) = (game.clone(), canvas.clone());
        let egui_events = egui_events.clone();
        let handler = Closure::wrap(Box::new(move |e: MouseEvent| {
            if e.button() == 0 {
                egui_events.borrow_mut().push(egui_button(&e, pressed));
            }
            dispatch(&game, &canvas, web_input::mouse_click_to_input(&e, pressed));
            e.prevent_default();
        }) as Box<dyn FnMut(MouseEvent)>);
        document.add_event_listener_with_callback(name, handler.as_ref().unchecked_ref())?;
        handler.forget();
    }

    // Context menu prevention
    {
        let contextmenu = Closure::wrap(Box::new(move |e: MouseEvent| {
            e.prevent_default();
        }) as Box<dyn FnMut(MouseEvent)>);
        document.add_event_listener_with_callback("contextmenu", contextmenu.as_ref().unchecked_ref())?;
        contextmenu.forget();
    }

    // Mouse wheel
    {
        let (game, canvas) = (game.clone(), canvas.clone());
        let wheel = Closure::wrap(Box::new(move |e: Event| {
            if let Some(event) = web_input::mouse_wheel_to_input(&e) {
                e.prevent_default();
                dispatch(&game, &canvas, event);
            }
        }) as Box<dyn FnMut(Event)>);
        document.add_event_listener_with_callback("wheel", wheel.as_ref().unchecked_ref())?;
        wheel.forget();
    }

    // Window resize
    {
        let (game, canvas) = (game.clone(), canvas.clone());
        let win = window.clone();
        let resize = Closure::wrap(Box::new(move |_e: Event| {
            let (width, height) = window_size(&win);
            canvas.set_width(width);
            canvas.set_height(height);
            pending_resize.set(Some((width, height)));
            dispatch(&game, &canvas, InputEvent::Resized { width, height });
        }) as Box<dyn FnMut(Event)>);
        window.add_event_listener_with_callback("resize", resize.as_ref().unchecked_ref())?;
        resize.forget();
    }

    Ok(())
}

#[cfg(target_arch = "wasm32")]
fn window_size(window: &Window) -> (u32, u32) {
    let dim = |v: std::result::Result<JsValue, JsValue>, fallback: u32| {
        v.ok().and_then(|v| v.as_f64()).map_or(fallback, |d| (d as u32).max(1))
    };
    (dim(window.inner_width(), 800), dim(window.inner_height(), 600))
}

#[cfg(target_arch = "wasm32")]
fn init_canvas() -> std::result::Result<(Window, Document, HtmlCanvasElement), JsValue> {
    let window = web_sys::window().ok_or(js_error("no global `window`"))?;
    let document = window.document().ok_or(js_error("no document on window"))?;
    let body = document.body().ok_or(js_error("no body on document"))?;
    let canvas_el = document
        .create_element("canvas")?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|_| js_error("failed to create canvas"))?;
    let (width, height) = window_size(&window);
    canvas_el.set_width(width);
    canvas_el.set_height(height);
    body.append_child(&canvas_el)?;
    Ok((window, document, canvas_el))
}

/// Plain text notice for browsers without a usable GPU backend.
#[cfg(target_arch = "wasm32")]
fn show_fallback(document: &Document, reason: &str) -> std::result::Result<(), JsValue> {
    let body = document.body().ok_or(js_error("no body on document"))?;
    let notice = document.create_element("p")?;
    notice.set_text_content(Some(&format!("Howling Abyss needs WebGPU or WebGL2: {reason}")));
    body.append_child(&notice)?;
    Ok(())
}

#[cfg(target_arch = "wasm32")]
fn js_error<E: Into<String>>(msg: E) -> JsValue {
    JsValue::from_str(&msg.into())
}

/// requestAnimationFrame driver. The callback returns whether to keep going.
#[cfg(target_arch = "wasm32")]
struct RcCellCallback {
    inner: Rc<RefCell<Box<dyn FnMut() -> bool>>>,
    window: Window,
}

#[cfg(target_arch = "wasm32")]
impl RcCellCallback {
    fn new(window: Window, f: impl FnMut() -> bool + 'static) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Box::new(f))),
            window,
        }
    }

    fn schedule(window: &Window, callback: &Rc<RefCell<Option<Closure<dyn FnMut()>>>>) {
        if let Some(cb) = callback.borrow().as_ref() {
            if let Err(e) = window.request_animation_frame(cb.as_ref().unchecked_ref()) {
                error!(?e, "requestAnimationFrame failed");
            }
        }
    }

    fn start(self) {
        let inner = self.inner.clone();
        let window = self.window.clone();

        let callback = Rc::new(RefCell::new(None::<Closure<dyn FnMut()>>));
        let callback_clone = callback.clone();

        *callback.borrow_mut() = Some(Closure::wrap(Box::new(move || {
            if inner.borrow_mut().as_mut()() {
                Self::schedule(&window, &callback_clone);
            } else {
                info!("frame loop stopped");
            }
        }) as Box<dyn FnMut()>));

        Self::schedule(&self.window, &callback);

        // Leak the closure to keep it alive
        std::mem::forget(callback);
    }
}
