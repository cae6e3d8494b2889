//! Texture atlas lookup.
//!
//! Packing happens elsewhere; layers only consume the resulting rectangles.

use std::collections::HashMap;

use crate::coords::Vec2;

/// Texture-space rectangle of one atlas entry.
///
/// `bottom_left` / `top_right` are normalized UVs; `layer` selects the slice of
/// a texture array.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct AtlasRect {
    pub bottom_left: Vec2,
    pub top_right: Vec2,
    pub layer: u32,
}

impl AtlasRect {
    #[inline]
    pub const fn new(bottom_left: Vec2, top_right: Vec2, layer: u32) -> Self {
        Self { bottom_left, top_right, layer }
    }

    /// The whole first layer: `(0, 0)` to `(1, 1)`.
    #[inline]
    pub const fn full() -> Self {
        Self::new(Vec2::new(0.0, 0.0), Vec2::new(1.0, 1.0), 0)
    }

    /// Builds normalized UVs from a pixel rectangle inside an atlas page.
    ///
    /// `origin` is the bottom-left pixel of the entry. A zero-sized page
    /// yields the full rectangle.
    pub fn from_pixels(origin: Vec2, size: Vec2, page_size: Vec2, layer: u32) -> Self {
        if page_size.x <= 0.0 || page_size.y <= 0.0 {
            return Self { layer, ..Self::full() };
        }
        let inv = Vec2::new(1.0 / page_size.x, 1.0 / page_size.y);
        Self::new(origin.scale(inv), (origin + size).scale(inv), layer)
    }
}

/// Name → rectangle lookup, shared read-only by every layer that uses it.
pub trait TextureAtlas {
    fn lookup(&self, name: &str) -> Option<AtlasRect>;
}

/// In-memory atlas backed by a hash map.
#[derive(Debug, Default, Clone)]
pub struct AtlasTable {
    entries: HashMap<String, AtlasRect>,
}

impl AtlasTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, rect: AtlasRect) -> Option<AtlasRect> {
        self.entries.insert(name.into(), rect)
    }

    pub fn with_entry(mut self, name: impl Into<String>, rect: AtlasRect) -> Self {
        self.insert(name, rect);
        self
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TextureAtlas for AtlasTable {
    fn lookup(&self, name: &str) -> Option<AtlasRect> {
        self.entries.get(name).copied()
    }
}
