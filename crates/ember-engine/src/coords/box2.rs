use super::Vec2;

/// Axis-aligned box stored as center + half size (world units, +Y up).
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Box2 {
    pub position: Vec2,
    pub half_size: Vec2,
}

/// Axis-aligned box stored as its two extreme corners.
///
/// This is the form every vertex generator consumes.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct ParticleCorners {
    pub bottom_left: Vec2,
    pub top_right: Vec2,
}

impl Box2 {
    #[inline]
    pub const fn new(position: Vec2, half_size: Vec2) -> Self {
        Self { position, half_size }
    }

    /// Box of full `size` centered on `position`.
    #[inline]
    pub fn from_center_size(position: Vec2, size: Vec2) -> Self {
        Self::new(position, size * 0.5)
    }

    #[inline]
    pub fn size(self) -> Vec2 {
        self.half_size * 2.0
    }

    /// A box with a non-positive extent on either axis covers no area.
    #[inline]
    pub fn is_empty(self) -> bool {
        self.half_size.x <= 0.0 || self.half_size.y <= 0.0
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.position.is_finite() && self.half_size.is_finite()
    }

    #[inline]
    pub fn to_corners(self) -> ParticleCorners {
        let h = self.half_size.abs();
        ParticleCorners {
            bottom_left: self.position - h,
            top_right: self.position + h,
        }
    }

    /// Closed containment: edges count as inside.
    #[inline]
    pub fn contains(self, p: Vec2) -> bool {
        let c = self.to_corners();
        p.x >= c.bottom_left.x && p.y >= c.bottom_left.y && p.x <= c.top_right.x && p.y <= c.top_right.y
    }
}

impl ParticleCorners {
    #[inline]
    pub const fn new(bottom_left: Vec2, top_right: Vec2) -> Self {
        Self { bottom_left, top_right }
    }

    /// Reorders the corners so `bottom_left <= top_right` on both axes.
    #[inline]
    pub fn normalized(self) -> Self {
        Self {
            bottom_left: self.bottom_left.min(self.top_right),
            top_right: self.bottom_left.max(self.top_right),
        }
    }

    #[inline]
    pub fn to_box(self) -> Box2 {
        let c = self.normalized();
        Box2 {
            position: (c.bottom_left + c.top_right) * 0.5,
            half_size: (c.top_right - c.bottom_left) * 0.5,
        }
    }

    #[inline]
    pub fn bottom_right(self) -> Vec2 {
        Vec2::new(self.top_right.x, self.bottom_left.y)
    }

    #[inline]
    pub fn top_left(self) -> Vec2 {
        Vec2::new(self.bottom_left.x, self.top_right.y)
    }
}

impl From<Box2> for ParticleCorners {
    #[inline]
    fn from(b: Box2) -> Self {
        b.to_corners()
    }
}

impl From<ParticleCorners> for Box2 {
    #[inline]
    fn from(c: ParticleCorners) -> Self {
        c.to_box()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: f32, y: f32) -> Vec2 { Vec2::new(x, y) }

    // ── conversions ───────────────────────────────────────────────────────

    #[test]
    fn box_to_corners() {
        let b = Box2::new(v(10.0, 20.0), v(2.0, 3.0));
        let c = b.to_corners();
        assert_eq!(c.bottom_left, v(8.0, 17.0));
        assert_eq!(c.top_right, v(12.0, 23.0));
    }

    #[test]
    fn corners_to_box_normalizes_swapped_corners() {
        let c = ParticleCorners::new(v(4.0, 4.0), v(0.0, 0.0));
        let b = c.to_box();
        assert_eq!(b.position, v(2.0, 2.0));
        assert_eq!(b.half_size, v(2.0, 2.0));
    }

    #[test]
    fn negative_half_size_is_treated_as_extent() {
        let b = Box2::new(v(0.0, 0.0), v(-1.0, 1.0));
        let c = b.to_corners();
        assert_eq!(c.bottom_left, v(-1.0, -1.0));
        assert_eq!(c.top_right, v(1.0, 1.0));
    }

    // ── contains / is_empty ───────────────────────────────────────────────

    #[test]
    fn contains_edges() {
        let b = Box2::new(v(0.0, 0.0), v(1.0, 1.0));
        assert!(b.contains(v(1.0, 1.0)));
        assert!(b.contains(v(-1.0, 0.0)));
        assert!(!b.contains(v(1.5, 0.0)));
    }

    #[test]
    fn is_empty_zero_extent() {
        assert!(Box2::new(v(0.0, 0.0), v(0.0, 1.0)).is_empty());
        assert!(!Box2::new(v(0.0, 0.0), v(1.0, 1.0)).is_empty());
    }
}
