use super::{ParticleCorners, Vec2};

/// Anchor point of a sprite relative to its box.
///
/// A sprite placed at `position` with `Hotpoint::Center` has its center there;
/// with `Hotpoint::BottomLeft` its bottom-left corner is there.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum Hotpoint {
    BottomLeft,
    Bottom,
    BottomRight,
    Left,
    #[default]
    Center,
    Right,
    TopLeft,
    Top,
    TopRight,
}

impl Hotpoint {
    /// Fraction of the size between the bottom-left corner and the anchor.
    #[inline]
    fn factor(self) -> Vec2 {
        match self {
            Hotpoint::BottomLeft => Vec2::new(0.0, 0.0),
            Hotpoint::Bottom => Vec2::new(0.5, 0.0),
            Hotpoint::BottomRight => Vec2::new(1.0, 0.0),
            Hotpoint::Left => Vec2::new(0.0, 0.5),
            Hotpoint::Center => Vec2::new(0.5, 0.5),
            Hotpoint::Right => Vec2::new(1.0, 0.5),
            Hotpoint::TopLeft => Vec2::new(0.0, 1.0),
            Hotpoint::Top => Vec2::new(0.5, 1.0),
            Hotpoint::TopRight => Vec2::new(1.0, 1.0),
        }
    }

    /// Bottom-left corner of a `size` box anchored at `position`.
    #[inline]
    pub fn to_bottom_left(self, position: Vec2, size: Vec2) -> Vec2 {
        position - size.scale(self.factor())
    }

    /// Converts a position expressed relative to `self` into one relative to `other`.
    #[inline]
    pub fn convert(self, position: Vec2, size: Vec2, other: Hotpoint) -> Vec2 {
        self.to_bottom_left(position, size) + size.scale(other.factor())
    }

    #[inline]
    pub fn corners(self, position: Vec2, size: Vec2) -> ParticleCorners {
        let bottom_left = self.to_bottom_left(position, size);
        ParticleCorners::new(bottom_left, bottom_left + size)
    }
}
