use glam::Vec3;

/// Quadrilateral region the camera may pan across.
///
/// The corners are not a perfect rectangle. Horizontal clamps use the
/// top edge's x values, the far clamp uses the nearer of the two bottom
/// corners so slight map irregularity never lets the camera escape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub top_left: Vec3,
    pub top_right: Vec3,
    pub bottom_left: Vec3,
    pub bottom_right: Vec3,
}

impl Bounds {
    pub const fn new(top_left: Vec3, top_right: Vec3, bottom_left: Vec3, bottom_right: Vec3) -> Self {
        Self {
            top_left,
            top_right,
            bottom_left,
            bottom_right,
        }
    }

    pub fn howling_abyss() -> Self {
        Self::new(
            Vec3::new(-2.7, 0.0, -51.0),
            Vec3::new(55.5, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 7.5),
            Vec3::new(0.0, 0.0, 30.0),
        )
    }

    pub fn min_x(&self) -> f32 { self.top_left.x }

    pub fn max_x(&self) -> f32 { self.top_right.x }

    pub fn min_z(&self) -> f32 { self.top_left.z }

    pub fn max_z(&self) -> f32 { self.bottom_left.z.min(self.bottom_right.z) }

    pub fn contains_x(&self, x: f32) -> bool { x >= self.min_x() && x <= self.max_x() }

    pub fn contains_z(&self, z: f32) -> bool { z >= self.min_z() && z <= self.max_z() }

    pub fn contains_xz(&self, p: Vec3) -> bool { self.contains_x(p.x) && self.contains_z(p.z) }

    /// Span used for ambient effects: x across the top edge, z from the top
    /// edge down to the bottom-left corner.
    pub fn spawn_span(&self) -> (std::ops::Range<f32>, std::ops::Range<f32>) {
        (self.top_left.x..self.top_right.x, self.top_left.z..self.bottom_left.z)
    }
}

impl Default for Bounds {
    fn default() -> Self { Self::howling_abyss() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn far_clamp_uses_nearer_bottom_corner() {
        let b = Bounds::howling_abyss();
        assert_eq!(b.max_z(), 7.5);
        assert_eq!(b.min_z(), -51.0);
        assert_eq!(b.min_x(), -2.7);
        assert_eq!(b.max_x(), 55.5);
    }

    #[test]
    fn contains_is_inclusive() {
        let b = Bounds::howling_abyss();
        assert!(b.contains_xz(Vec3::new(-2.7, 3.0, 7.5)));
        assert!(!b.contains_xz(Vec3::new(-2.71, 0.0, 0.0)));
        assert!(!b.contains_xz(Vec3::new(0.0, 0.0, 8.0)));
    }
}
