// MODEL: Game state and data
pub mod animation;
pub mod assets;
pub mod audio;
pub mod bounds;
pub mod camera;
pub mod map;
pub mod weather;

pub use animation::{AnimationClip, AnimationKey, AnimationMixer};
pub use assets::{Asset, AssetSource, AssetState, AssetStore, BuiltinAssets};
pub use audio::Track;
pub use bounds::Bounds;
pub use camera::{Camera, Ray};
pub use weather::Snowfall;
