//! wgpu backend.
//!
//! [`WgpuRenderer`] implements [`RenderDevice`](super::RenderDevice) on top of
//! a wgpu device/queue. Layers draw into the frame opened with
//! [`WgpuRenderer::begin_frame`]; every draw records its own render pass with
//! `LoadOp::Load`, so layers composite in display order.

mod ctx;
mod device;
mod material;
mod renderer;

pub use ctx::{RenderCtx, RenderTarget};
pub use device::{HeadlessGpu, HeadlessGpuInit};
pub use material::{ParticleMaterial, linear_sampler};
pub use renderer::{ParticleUniforms, WgpuRenderer};
