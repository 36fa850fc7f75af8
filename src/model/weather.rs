use std::ops::Range;

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::WeatherConfig;
use crate::model::Bounds;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snowflake {
    pub position: Vec3,
    /// Horizontal drift per tick, y is unused
    pub drift: Vec3,
}

/// Ambient snow confined to the pannable area.
#[derive(Debug, Clone)]
pub struct Snowfall {
    flakes: Vec<Snowflake>,
    bounds: Bounds,
    fall_speed: f32,
    ceiling: f32,
    rng: StdRng,
}

impl Snowfall {
    pub fn new(config: &WeatherConfig, bounds: Bounds) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let flakes = (0..config.snow_particles)
            .map(|_| {
                let (x, z) = random_xz(&mut rng, &bounds);
                let y = rng.gen_range(0.0..config.ceiling.max(f32::EPSILON));
                let d = config.max_drift;
                let drift = if d > 0.0 {
                    Vec3::new(rng.gen_range(-d..d), 0.0, rng.gen_range(-d..d))
                } else {
                    Vec3::ZERO
                };
                Snowflake { position: Vec3::new(x, y, z), drift }
            })
            .collect();
        Self { flakes, bounds, fall_speed: config.fall_speed, ceiling: config.ceiling, rng }
    }

    pub fn flakes(&self) -> &[Snowflake] { &self.flakes }

    pub fn len(&self) -> usize { self.flakes.len() }

    pub fn is_empty(&self) -> bool { self.flakes.is_empty() }

    /// One tick: fall, drift, and recycle flakes that blew out of the span.
    pub fn update(&mut self) {
        let (xs, zs) = self.bounds.spawn_span();
        for flake in &mut self.flakes {
            let p = &mut flake.position;
            p.y = (p.y - self.fall_speed).max(0.0);
            p.x += flake.drift.x;
            p.z += flake.drift.z;

            if p.x < xs.start || p.x > xs.end || p.z < zs.start || p.z > zs.end {
                let (x, z) = random_xz(&mut self.rng, &self.bounds);
                *p = Vec3::new(x, self.ceiling, z);
            }
        }
    }

    pub fn positions(&self) -> impl Iterator<Item = [f32; 3]> + '_ {
        self.flakes.iter().map(|f| f.position.to_array())
    }
}

fn random_xz(rng: &mut StdRng, bounds: &Bounds) -> (f32, f32) {
    let (xs, zs) = bounds.spawn_span();
    (sample(rng, xs), sample(rng, zs))
}

/// Uniform over `span`; a collapsed span yields its start.
fn sample(rng: &mut StdRng, span: Range<f32>) -> f32 {
    if span.is_empty() {
        span.start
    } else {
        rng.gen_range(span)
    }
}
