//! Ember engine crate.
//!
//! Particle layers turned into device-ready vertex streams, frame after
//! frame, with device buffers reused across frames.
//!
//! Frame flow:
//! 1. [`manager::ParticleManager::tick`] runs every layer's update policy
//! 2. [`manager::ParticleManager::display`] rebuilds dirty layers and draws
//!    through a [`render::RenderDevice`]

pub mod atlas;
pub mod buffer;
pub mod coords;
pub mod error;
pub mod logging;
pub mod manager;
pub mod particle;
pub mod primitive;
pub mod render;

pub use error::{RenderError, Result};
