//! Particles, allocations and layers.
//!
//! A [`ParticleLayer`] owns allocations of one particle type and drives them
//! through the frame: `tick` runs the policy's update function, `display`
//! converts visible particles into one vertex stream and draws it. Everything
//! type-specific comes from a [`ParticlePolicy`] and is resolved at compile
//! time; only the [`LayerBase`] entry points are dynamically dispatched.

mod accessor;
mod allocation;
mod default;
mod layer;
mod policy;
mod spawner;

pub mod tools;

pub use accessor::{ParticleAccessor, ParticleAccessorMut};
pub use allocation::{Allocation, AllocationId, SpawnTarget};
pub use default::{DefaultParticle, DefaultPolicy, DefaultVertex};
pub use layer::{LayerBase, LayerConfig, ParticleLayer};
pub use policy::ParticlePolicy;
pub use spawner::{ParticleSpawner, TexturedParticle};
