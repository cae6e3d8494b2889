//! Device-facing contracts and backends.
//!
//! The particle core talks to a [`RenderDevice`]: it creates buffers, uploads
//! bytes and issues one draw per mesh element. Two devices ship with the
//! crate:
//! - [`HeadlessDevice`] keeps everything in host memory and records every draw
//! - [`gpu::WgpuFrame`] forwards to a wgpu device/queue inside a frame

mod declaration;
mod device;
mod headless;
mod params;
mod uniforms;

pub mod gpu;

pub use declaration::{VertexDeclaration, VertexDeclarationEntry, VertexFormat, VertexSemantic};
pub use device::{BufferKind, DrawCall, RenderDevice, Topology};
pub use headless::{HeadlessBuffer, HeadlessDevice, HeadlessMaterial, RecordedDraw};
pub use params::RenderParams;
pub use uniforms::{NoUniforms, UniformMap, UniformProvider, UniformValue};
