//! Corner and texcoord helpers shared by particle policies.
//!
//! Every generator here returns corners in bottom-left, bottom-right,
//! top-right, top-left order, which is what the primitive encodings expect.

use std::ops::BitOr;

use crate::atlas::AtlasRect;
use crate::coords::{Box2, Hotpoint, ParticleCorners, Vec2};

/// Texture rectangle of one particle.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ParticleTexcoords {
    pub bottom_left: Vec2,
    pub top_right: Vec2,
    /// Texture array layer.
    pub layer: u32,
}

impl Default for ParticleTexcoords {
    fn default() -> Self {
        Self::from(AtlasRect::full())
    }
}

impl From<AtlasRect> for ParticleTexcoords {
    fn from(rect: AtlasRect) -> Self {
        Self {
            bottom_left: rect.bottom_left,
            top_right: rect.top_right,
            layer: rect.layer,
        }
    }
}

/// Texture orientation flags.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct ParticleFlags(u8);

impl ParticleFlags {
    pub const NONE: Self = Self(0);
    /// Mirrors U.
    pub const FLIP_HORIZONTAL: Self = Self(1 << 0);
    /// Mirrors V.
    pub const FLIP_VERTICAL: Self = Self(1 << 1);
    /// Transposes along the bottom-left/top-right diagonal.
    pub const FLIP_DIAGONAL: Self = Self(1 << 2);

    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    #[inline]
    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    pub fn set(&mut self, other: Self, on: bool) {
        if on {
            self.insert(other);
        } else {
            self.remove(other);
        }
    }
}

impl BitOr for ParticleFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Texcoords of the four corners after applying `flags`.
pub fn corner_texcoords(texcoords: &ParticleTexcoords, flags: ParticleFlags) -> [Vec2; 4] {
    let (mut u0, mut u1) = (texcoords.bottom_left.x, texcoords.top_right.x);
    let (mut v0, mut v1) = (texcoords.bottom_left.y, texcoords.top_right.y);
    if flags.contains(ParticleFlags::FLIP_HORIZONTAL) {
        std::mem::swap(&mut u0, &mut u1);
    }
    if flags.contains(ParticleFlags::FLIP_VERTICAL) {
        std::mem::swap(&mut v0, &mut v1);
    }

    let mut uv = [Vec2::new(u0, v0), Vec2::new(u1, v0), Vec2::new(u1, v1), Vec2::new(u0, v1)];
    if flags.contains(ParticleFlags::FLIP_DIAGONAL) {
        uv.swap(1, 3);
    }
    uv
}

/// Corner positions of an axis-aligned rectangle.
#[inline]
pub fn corner_positions(corners: ParticleCorners) -> [Vec2; 4] {
    [
        corners.bottom_left,
        corners.bottom_right(),
        corners.top_right,
        corners.top_left(),
    ]
}

/// Corner positions of `bbox` rotated counter-clockwise by `rotation`
/// radians around its center.
pub fn rotated_corner_positions(bbox: Box2, rotation: f32) -> [Vec2; 4] {
    if rotation == 0.0 {
        return corner_positions(bbox.to_corners());
    }
    let h = bbox.half_size.abs();
    [
        Vec2::new(-h.x, -h.y),
        Vec2::new(h.x, -h.y),
        Vec2::new(h.x, h.y),
        Vec2::new(-h.x, h.y),
    ]
    .map(|offset| bbox.position + offset.rotated(rotation))
}

/// Box of `size` placed with its `hotpoint` at `position`.
pub fn box_from_hotpoint(position: Vec2, size: Vec2, hotpoint: Hotpoint) -> Box2 {
    hotpoint.corners(position, size).to_box()
}

/// Builds the four vertices of a textured box.
///
/// `make` receives each corner's position and texcoord.
pub fn box_vertices<V>(
    bbox: Box2,
    rotation: f32,
    texcoords: &ParticleTexcoords,
    flags: ParticleFlags,
    mut make: impl FnMut(Vec2, Vec2) -> V,
) -> [V; 4] {
    let positions = rotated_corner_positions(bbox, rotation);
    let uv = corner_texcoords(texcoords, flags);
    [
        make(positions[0], uv[0]),
        make(positions[1], uv[1]),
        make(positions[2], uv[2]),
        make(positions[3], uv[3]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec2, b: Vec2) -> bool {
        (a.x - b.x).abs() < 1e-5 && (a.y - b.y).abs() < 1e-5
    }

    fn unit_tc() -> ParticleTexcoords {
        ParticleTexcoords::default()
    }

    // ── texcoords ─────────────────────────────────────────────────────────

    #[test]
    fn unflipped_texcoords_follow_corner_order() {
        let uv = corner_texcoords(&unit_tc(), ParticleFlags::NONE);
        assert_eq!(
            uv,
            [Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(1.0, 1.0), Vec2::new(0.0, 1.0)]
        );
    }

    #[test]
    fn horizontal_flip_mirrors_u() {
        let uv = corner_texcoords(&unit_tc(), ParticleFlags::FLIP_HORIZONTAL);
        assert_eq!(uv[0], Vec2::new(1.0, 0.0));
        assert_eq!(uv[1], Vec2::new(0.0, 0.0));
    }

    #[test]
    fn vertical_flip_mirrors_v() {
        let uv = corner_texcoords(&unit_tc(), ParticleFlags::FLIP_VERTICAL);
        assert_eq!(uv[0], Vec2::new(0.0, 1.0));
        assert_eq!(uv[3], Vec2::new(0.0, 0.0));
    }

    #[test]
    fn diagonal_flip_transposes() {
        let uv = corner_texcoords(&unit_tc(), ParticleFlags::FLIP_DIAGONAL);
        assert_eq!(uv[0], Vec2::new(0.0, 0.0));
        assert_eq!(uv[1], Vec2::new(0.0, 1.0));
        assert_eq!(uv[2], Vec2::new(1.0, 1.0));
        assert_eq!(uv[3], Vec2::new(1.0, 0.0));
    }

    #[test]
    fn flags_combine() {
        let mut f = ParticleFlags::FLIP_HORIZONTAL | ParticleFlags::FLIP_VERTICAL;
        assert!(f.contains(ParticleFlags::FLIP_VERTICAL));
        f.set(ParticleFlags::FLIP_VERTICAL, false);
        assert_eq!(f, ParticleFlags::FLIP_HORIZONTAL);
    }

    // ── positions ─────────────────────────────────────────────────────────

    #[test]
    fn unrotated_box_corners() {
        let b = Box2::new(Vec2::new(10.0, 10.0), Vec2::new(2.0, 1.0));
        assert_eq!(
            rotated_corner_positions(b, 0.0),
            [Vec2::new(8.0, 9.0), Vec2::new(12.0, 9.0), Vec2::new(12.0, 11.0), Vec2::new(8.0, 11.0)]
        );
    }

    #[test]
    fn quarter_turn_rotates_about_center() {
        let b = Box2::new(Vec2::new(5.0, 5.0), Vec2::new(1.0, 1.0));
        let c = rotated_corner_positions(b, std::f32::consts::FRAC_PI_2);
        assert!(approx(c[0], Vec2::new(6.0, 4.0)));
        assert!(approx(c[2], Vec2::new(4.0, 6.0)));
    }

    #[test]
    fn hotpoint_box_anchors_bottom_left() {
        let b = box_from_hotpoint(Vec2::zero(), Vec2::new(4.0, 2.0), Hotpoint::BottomLeft);
        assert_eq!(b.position, Vec2::new(2.0, 1.0));
        assert_eq!(b.half_size, Vec2::new(2.0, 1.0));
    }

    #[test]
    fn box_vertices_pairs_positions_with_texcoords() {
        let b = Box2::new(Vec2::zero(), Vec2::splat(1.0));
        let v = box_vertices(b, 0.0, &unit_tc(), ParticleFlags::NONE, |p, uv| (p, uv));
        assert_eq!(v[2], (Vec2::new(1.0, 1.0), Vec2::new(1.0, 1.0)));
    }
}
