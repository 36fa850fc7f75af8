/// Platform-agnostic input handling
use std::collections::HashSet;

use glam::Vec2;

use crate::config::PointerConfig;
use crate::controller::camera_controller::PanDirection;

/// Platform-independent input events
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    // Keyboard events
    KeyDown(String),
    KeyUp(String),

    // Mouse events
    /// Relative motion, only meaningful while the pointer is captured
    MouseMove { dx: f32, dy: f32 },
    /// Absolute cursor position inside the capture region
    PointerMoved { x: f32, y: f32 },
    MouseClick { button: MouseButton, is_down: bool, x: f32, y: f32 },
    MouseWheel { delta_y: f32 },

    // Window events
    Resized { width: u32, height: u32 },
    FocusLost,
    VisibilityChanged { visible: bool },
    PointerLockChanged { locked: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    pub fn from_web_button(button: i16) -> Self {
        match button {
            1 => MouseButton::Middle,
            2 => MouseButton::Right,
            _ => MouseButton::Left,
        }
    }
}

/// Size of the element the pointer is confined to, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub width: f32,
    pub height: f32,
}

impl Region {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width: width as f32, height: height as f32 }
    }
}

/// Software cursor driven by pointer-lock deltas.
///
/// Pan flags are derived here from the cursor's position and nowhere else.
#[derive(Debug, Clone)]
pub struct PointerState {
    pub x: f32,
    pub y: f32,
    pub speed: f32,
    pub edge_threshold: f32,
    pub at_edge: bool,
    pub captured: bool,
    pan: PanDirection,
}

impl PointerState {
    pub fn new(config: &PointerConfig) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            speed: config.speed,
            edge_threshold: config.edge_threshold,
            at_edge: false,
            captured: false,
            pan: PanDirection::default(),
        }
    }

    pub fn pan(&self) -> PanDirection { self.pan }

    /// Apply a captured-mode delta, scaled and clamped to the region.
    pub fn move_by(&mut self, dx: f32, dy: f32, region: Region) {
        let x = (self.x + dx * self.speed).clamp(0.0, region.width);
        let y = (self.y + dy * self.speed).clamp(0.0, region.height);
        self.place(x, y, region);
    }

    pub fn move_to(&mut self, x: f32, y: f32, region: Region) {
        self.place(x.clamp(0.0, region.width), y.clamp(0.0, region.height), region);
    }

    fn place(&mut self, x: f32, y: f32, region: Region) {
        self.x = x;
        self.y = y;
        self.pan.clear();

        let t = self.edge_threshold;
        self.at_edge = x <= t || y <= t || x >= region.width - t || y >= region.height - t;
        if !self.at_edge {
            return;
        }

        // Only the very border pans; the threshold band just arms it
        if x <= 0.0 {
            self.pan.left = true;
        } else if x >= region.width {
            self.pan.right = true;
        }
        if y <= 0.0 {
            self.pan.forward = true;
        } else if y >= region.height {
            self.pan.back = true;
        }
    }

    /// Leaving capture mode stops any edge pan in progress.
    pub fn release(&mut self) {
        self.captured = false;
        self.at_edge = false;
        self.pan.clear();
    }

    pub fn ndc(&self, region: Region) -> Vec2 {
        Vec2::new(
            self.x / region.width.max(1.0) * 2.0 - 1.0,
            -(self.y / region.height.max(1.0)) * 2.0 + 1.0,
        )
    }
}

/// Held keys
#[derive(Debug, Clone, Default)]
pub struct InputState {
    pub pressed_keys: HashSet<String>,
}

impl InputState {
    pub fn new() -> Self { Self::default() }

    pub fn process_event(&mut self, event: &InputEvent) {
        match event {
            InputEvent::KeyDown(key) => {
                self.pressed_keys.insert(key.clone());
            }
            InputEvent::KeyUp(key) => {
                self.pressed_keys.remove(key.as_str());
            }
            InputEvent::FocusLost | InputEvent::VisibilityChanged { visible: false } => self.clear_keys(),
            _ => {}
        }
    }

    pub fn is_key_pressed(&self, key: &str) -> bool { self.pressed_keys.contains(key) }

    pub fn clear_keys(&mut self) { self.pressed_keys.clear(); }
}

/// Key mapping configuration
#[derive(Debug, Clone)]
pub struct KeyBindings {
    pub pause: String,
    pub lock_camera: String,
    pub toggle_debug: String,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            pause: "Escape".to_string(),
            lock_camera: " ".to_string(),
            toggle_debug: "F3".to_string(),
        }
    }
}

/// Maps raw key names onto game intents
#[derive(Debug, Clone, Default)]
pub struct InputProcessor {
    bindings: KeyBindings,
}

impl InputProcessor {
    pub fn new(bindings: KeyBindings) -> Self { Self { bindings } }

    pub fn is_pause(&self, key: &str) -> bool { key == self.bindings.pause }

    pub fn is_lock_camera(&self, key: &str) -> bool {
        key == self.bindings.lock_camera || (self.bindings.lock_camera == " " && key == "Space")
    }

    pub fn is_toggle_debug(&self, key: &str) -> bool { key == self.bindings.toggle_debug }

    pub fn camera_lock_held(&self, input: &InputState) -> bool {
        input.pressed_keys.iter().any(|k| self.is_lock_camera(k))
    }
}

#[cfg(target_arch = "wasm32")]
pub mod wasm {
    use super::*;
    use web_sys::{Event, KeyboardEvent, MouseEvent};

    pub fn keyboard_event_to_input(e: &KeyboardEvent, is_down: bool) -> InputEvent {
        let key = e.key();
        if is_down {
            InputEvent::KeyDown(key)
        } else {
            InputEvent::KeyUp(key)
        }
    }

    pub fn mouse_move_to_input(e: &MouseEvent, locked: bool) -> InputEvent {
        if locked {
            InputEvent::MouseMove { dx: e.movement_x() as f32, dy: e.movement_y() as f32 }
        } else {
            InputEvent::PointerMoved { x: e.client_x() as f32, y: e.client_y() as f32 }
        }
    }

    pub fn mouse_click_to_input(e: &MouseEvent, is_down: bool) -> InputEvent {
        InputEvent::MouseClick {
            button: MouseButton::from_web_button(e.button()),
            is_down,
            x: e.client_x() as f32,
            y: e.client_y() as f32,
        }
    }

    pub fn mouse_wheel_to_input(e: &Event) -> Option<InputEvent> {
        let js_val = wasm_bindgen::JsValue::from(e.clone());
        let delta_y = js_sys::Reflect::get(&js_val, &wasm_bindgen::JsValue::from_str("deltaY")).ok()?;
        delta_y.as_f64().map(|dy| InputEvent::MouseWheel { delta_y: dy as f32 })
    }
}
