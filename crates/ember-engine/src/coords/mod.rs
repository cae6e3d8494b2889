//! Coordinate and geometry types shared by particles and renderers.
//!
//! Canonical particle space:
//! - World units (logical pixels by default)
//! - Origin at the camera center
//! - +X right, +Y up
//!
//! Boxes are stored as center + half size; renderers only ever see the four
//! corners produced by `particle::tools`.

mod box2;
mod color;
mod hotpoint;
mod vec2;
mod viewport;

pub use box2::{Box2, ParticleCorners};
pub use color::ColorRgba;
pub use hotpoint::Hotpoint;
pub use vec2::Vec2;
pub use viewport::Viewport;
