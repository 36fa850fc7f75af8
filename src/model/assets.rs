//! Named game assets and their load state.

use std::collections::HashMap;

use glam::{Mat4, Vec3};
use tracing::{info, warn};

use crate::error::{GameError, Result};
use crate::model::animation::AnimationClip;
use crate::utils::{rgba, Mesh};

pub const CUBE_MAP: &str = "cube-map";
pub const ARAM_MAP: &str = "aram-map";
pub const NEXUS: &str = "nexus";
pub const ORDER_TURRET: &str = "orderTurret";
pub const INHIB: &str = "inhib";
pub const NIDALEE: &str = "nidalee";

pub const ALL_ASSETS: [&str; 6] = [CUBE_MAP, ARAM_MAP, NEXUS, ORDER_TURRET, INHIB, NIDALEE];

/// Without these there is nothing to play on or with.
pub const REQUIRED_ASSETS: [&str; 2] = [NIDALEE, ARAM_MAP];

pub const RUN_CLIP: &str = "Run";
pub const IDLE_CLIP: &str = "idle1.pie_c_11_9";

#[derive(Debug, Clone, PartialEq)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl TextureData {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(bytes)?.to_rgba8();
        Ok(Self { width: img.width(), height: img.height(), rgba: img.into_raw() })
    }

    /// Average colour of the top row, used as the sky tint.
    pub fn zenith_color(&self) -> [f32; 3] {
        let row = (self.width as usize * 4).min(self.rgba.len());
        let pixels = row / 4;
        if pixels == 0 {
            return [0.0; 3];
        }
        let mut sum = [0u32; 3];
        for px in self.rgba[..row].chunks_exact(4) {
            for (acc, c) in sum.iter_mut().zip(px) {
                *acc += *c as u32;
            }
        }
        sum.map(|s| s as f32 / (pixels as f32 * 255.0))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Asset {
    Model { mesh: Mesh, animations: Vec<AnimationClip> },
    Texture(TextureData),
}

impl Asset {
    pub fn mesh(&self) -> Option<&Mesh> {
        match self {
            Asset::Model { mesh, .. } => Some(mesh),
            Asset::Texture(_) => None,
        }
    }

    pub fn texture(&self) -> Option<&TextureData> {
        match self {
            Asset::Texture(t) => Some(t),
            Asset::Model { .. } => None,
        }
    }

    pub fn clip(&self, name: &str) -> Option<&AnimationClip> {
        match self {
            Asset::Model { animations, .. } => animations.iter().find(|c| c.name == name),
            Asset::Texture(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AssetState {
    Pending,
    Loaded(Asset),
    Failed(String),
}

/// Produces assets by logical name.
pub trait AssetSource {
    fn load(&self, name: &str) -> Result<Asset>;
}

#[derive(Debug, Default)]
pub struct AssetStore {
    entries: HashMap<String, AssetState>,
}

impl AssetStore {
    pub fn new() -> Self {
        let entries = ALL_ASSETS.iter().map(|n| (n.to_string(), AssetState::Pending)).collect();
        Self { entries }
    }

    /// Load every name; one failure never stops the rest.
    pub fn load_all(&mut self, source: &dyn AssetSource, names: &[&str]) {
        for name in names {
            let state = match source.load(name) {
                Ok(asset) => AssetState::Loaded(asset),
                Err(e) => {
                    warn!(asset = name, error = %e, "asset failed to load");
                    AssetState::Failed(e.to_string())
                }
            };
            self.entries.insert(name.to_string(), state);
        }
        info!(loaded = self.loaded_count(), total = self.entries.len(), "assets loaded");
    }

    pub fn state(&self, name: &str) -> Option<&AssetState> { self.entries.get(name) }

    pub fn get(&self, name: &str) -> Option<&Asset> {
        match self.entries.get(name) {
            Some(AssetState::Loaded(asset)) => Some(asset),
            _ => None,
        }
    }

    pub fn insert(&mut self, name: &str, state: AssetState) { self.entries.insert(name.to_string(), state); }

    pub fn loaded_count(&self) -> usize {
        self.entries.values().filter(|s| matches!(s, AssetState::Loaded(_))).count()
    }

    /// True once no entry is still pending.
    pub fn settled(&self) -> bool { !self.entries.values().any(|s| matches!(s, AssetState::Pending)) }

    pub fn require(&self, names: &[&str]) -> Result<()> {
        let missing: Vec<String> = names.iter().filter(|n| self.get(n).is_none()).map(|n| n.to_string()).collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(GameError::MissingRequiredAssets(missing))
        }
    }

    /// User-facing note about optional assets that failed.
    pub fn warning(&self) -> Option<String> {
        let mut failed: Vec<&str> = self
            .entries
            .iter()
            .filter(|(name, state)| matches!(state, AssetState::Failed(_)) && !REQUIRED_ASSETS.contains(&name.as_str()))
            .map(|(name, _)| name.as_str())
            .collect();
        if failed.is_empty() {
            return None;
        }
        failed.sort_unstable();
        Some(format!("Some scenery could not be loaded: {}", failed.join(", ")))
    }
}

/// Vertical gradient from the fog blue at the zenith down to night.
const SKY_PNG: &[u8] = include_bytes!("../../assets/sky.png");

/// Procedural stand-ins for every named asset. The sky is a real image.
#[derive(Debug, Clone, Default)]
pub struct BuiltinAssets {
    /// Names that should fail, for exercising degraded starts
    pub unavailable: Vec<String>,
}

impl BuiltinAssets {
    pub fn without(names: &[&str]) -> Self {
        Self { unavailable: names.iter().map(|n| n.to_string()).collect() }
    }

    fn terrain() -> Mesh {
        use crate::model::map;

        let mut mesh = Mesh::plane(200.0, 200.0, rgba(0x2b3a4f, 1.0));
        let lane = rgba(0x8da3b8, 1.0);
        for surface in map::surfaces().iter().filter(|s| s.kind == crate::controller::physics::SurfaceKind::Walkable) {
            let transform = Mat4::from_translation(Vec3::new(surface.center.x, 0.01, surface.center.z))
                * Mat4::from_rotation_y(surface.yaw);
            mesh.append(&Mesh::plane(surface.width, surface.depth, lane), transform);
        }
        let wall = rgba(0x5d6b7a, 1.0);
        for obstacle in map::obstacles() {
            if let crate::controller::physics::ColliderShape::Box { width, height, depth } = obstacle.shape {
                let rotation = obstacle.transform.rotation.unwrap_or(Vec3::ZERO);
                let transform = Mat4::from_translation(obstacle.transform.position)
                    * Mat4::from_euler(glam::EulerRot::XYZ, rotation.x, rotation.y, rotation.z);
                // Turrets get their own model; only render slabs here
                if obstacle.kind != map::ObstacleKind::Turret {
                    mesh.append(&Mesh::cuboid(Vec3::new(width, height.min(1.2), depth.max(0.3)), wall), transform);
                }
            }
        }
        mesh
    }

    fn nexus() -> Mesh {
        let mut mesh = Mesh::cylinder(1.4, 1.0, 0.6, 24, rgba(0x6b7f99, 1.0));
        mesh.append(&Mesh::sphere(0.8, 16, 12, rgba(0x3fb8ff, 1.0)), Mat4::from_translation(Vec3::Y * 1.5));
        mesh
    }

    fn inhibitor() -> Mesh {
        let mut mesh = Mesh::cylinder(1.0, 0.8, 0.4, 20, rgba(0x6b7f99, 1.0));
        mesh.append(&Mesh::sphere(0.5, 12, 8, rgba(0x9fe3ff, 1.0)), Mat4::from_translation(Vec3::Y * 1.0));
        mesh
    }

    fn turret() -> Mesh {
        let mut mesh = Mesh::cylinder(0.45, 0.3, 2.6, 12, rgba(0xc9d3de, 1.0));
        mesh.append(&Mesh::cuboid(Vec3::new(0.7, 0.5, 0.7), rgba(0x2f7fd0, 1.0)), Mat4::from_translation(Vec3::Y * 2.85));
        mesh
    }

    fn champion() -> Mesh {
        let mut mesh = Mesh::cylinder(0.22, 0.18, 0.9, 12, rgba(0x7a5230, 1.0));
        mesh.append(&Mesh::sphere(0.17, 12, 8, rgba(0xe0b48a, 1.0)), Mat4::from_translation(Vec3::Y * 1.05));
        // Spear so the facing reads from above
        mesh.append(
            &Mesh::cuboid(Vec3::new(0.05, 0.05, 0.9), rgba(0xd8d8d8, 1.0)),
            Mat4::from_translation(Vec3::new(0.2, 0.6, 0.2)),
        );
        mesh
    }

    fn sky() -> Result<TextureData> { TextureData::decode(SKY_PNG) }
}

impl AssetSource for BuiltinAssets {
    fn load(&self, name: &str) -> Result<Asset> {
        if self.unavailable.iter().any(|n| n == name) {
            return Err(GameError::AssetUnavailable { name: name.to_string() });
        }
        let model = |mesh: Mesh| Asset::Model { mesh, animations: Vec::new() };
        Ok(match name {
            CUBE_MAP => Asset::Texture(Self::sky()?),
            ARAM_MAP => model(Self::terrain()),
            NEXUS => model(Self::nexus()),
            INHIB => model(Self::inhibitor()),
            ORDER_TURRET => model(Self::turret()),
            NIDALEE => Asset::Model {
                mesh: Self::champion(),
                animations: vec![AnimationClip::new(RUN_CLIP, 0.8), AnimationClip::new(IDLE_CLIP, 2.4)],
            },
            _ => return Err(GameError::AssetUnavailable { name: name.to_string() }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_failure_is_a_warning_not_an_error() {
        let mut store = AssetStore::new();
        store.load_all(&BuiltinAssets::without(&[NEXUS]), &ALL_ASSETS);
        assert!(store.settled());
        assert!(store.require(&REQUIRED_ASSETS).is_ok());
        assert!(store.warning().unwrap().contains(NEXUS));
        assert!(matches!(store.state(NEXUS), Some(AssetState::Failed(_))));
        assert!(store.get(INHIB).is_some());
    }

    #[test]
    fn missing_required_asset_is_reported() {
        let mut store = AssetStore::new();
        store.load_all(&BuiltinAssets::without(&[NIDALEE]), &ALL_ASSETS);
        match store.require(&REQUIRED_ASSETS) {
            Err(GameError::MissingRequiredAssets(missing)) => assert_eq!(missing, vec![NIDALEE.to_string()]),
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn fresh_store_is_pending() {
        let store = AssetStore::new();
        assert!(!store.settled());
        assert_eq!(store.state(ARAM_MAP), Some(&AssetState::Pending));
        assert!(store.require(&REQUIRED_ASSETS).is_err());
    }

    #[test]
    fn champion_carries_both_clips() {
        let champ = BuiltinAssets::default().load(NIDALEE).unwrap();
        assert!(champ.clip(RUN_CLIP).is_some());
        assert!(champ.clip(IDLE_CLIP).is_some());
        assert!(!champ.mesh().unwrap().is_empty());
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        assert!(matches!(TextureData::decode(b"not an image"), Err(GameError::TextureDecode(_))));
    }

    #[test]
    fn embedded_sky_decodes_to_rgba() {
        let sky = BuiltinAssets::default().load(CUBE_MAP).unwrap();
        let texture = sky.texture().unwrap();
        assert_eq!((texture.width, texture.height), (16, 16));
        assert_eq!(texture.rgba.len(), 16 * 16 * 4);
        assert_eq!(&texture.rgba[texture.rgba.len() - 4..], &[0x0a, 0x1a, 0x2e, 0xff]);
    }

    #[test]
    fn sky_zenith_matches_fog_blue() {
        let sky = BuiltinAssets::default().load(CUBE_MAP).unwrap();
        let [r, g, b] = sky.texture().unwrap().zenith_color();
        assert!((r - 0x3a as f32 / 255.0).abs() < 1e-3);
        assert!((g - 0x77 as f32 / 255.0).abs() < 1e-3);
        assert!((b - 0xbd as f32 / 255.0).abs() < 1e-3);
    }
}
