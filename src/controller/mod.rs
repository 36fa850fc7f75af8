// CONTROLLER: Input, game logic, and update loop
pub mod camera_controller;
pub mod click_to_move;
pub mod frame_loop;
pub mod input;
pub mod physics;
pub mod player_controller;

pub use camera_controller::{CameraController, PanDirection};
pub use click_to_move::{CaptureCommand, ClickOutcome, ClickToMove};
pub use frame_loop::{Game, LoopHandle, LoopState};
pub use input::{InputEvent, InputProcessor, InputState, KeyBindings, MouseButton, PointerState, Region};
pub use physics::{BodyHandle, ColliderShape, ColliderTransform, CollisionWorld, StaticHandle, Surface, SurfaceHit, SurfaceKind};
pub use player_controller::{PlayerController, PlayerTransition};
