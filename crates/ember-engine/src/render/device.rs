use crate::error::Result;
use crate::primitive::PrimitiveKind;

use super::{RenderParams, UniformProvider, VertexDeclaration};

/// What a device buffer is bound as.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BufferKind {
    Vertex,
    /// `u32` indices.
    Index,
}

/// Primitive topology understood by the device.
///
/// Quad and fan encodings are expressed as indexed triangle lists, so devices
/// without native quad/fan support only need these two.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Topology {
    TriangleList,
    TriangleStrip,
}

impl Topology {
    #[inline]
    pub const fn to_wgpu(self) -> wgpu::PrimitiveTopology {
        match self {
            Topology::TriangleList => wgpu::PrimitiveTopology::TriangleList,
            Topology::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
        }
    }
}

/// One draw issued by a layer.
#[derive(Debug)]
pub struct DrawCall<'a, B> {
    pub declaration: &'a VertexDeclaration,
    pub vertex_buffer: &'a B,
    /// Present for indexed encodings (quad, fan).
    pub index_buffer: Option<&'a B>,
    pub primitive: PrimitiveKind,
    pub first_vertex: u32,
    pub vertex_count: u32,
    pub first_index: u32,
    pub index_count: u32,
    pub params: &'a RenderParams,
}

impl<B> DrawCall<'_, B> {
    #[inline]
    pub fn topology(&self) -> Topology {
        self.primitive.topology()
    }

    #[inline]
    pub fn is_indexed(&self) -> bool {
        self.index_buffer.is_some() && self.index_count > 0
    }
}

/// The renderer/device context layers draw through.
///
/// Everything runs on the thread that owns the device; no method blocks.
pub trait RenderDevice {
    type Buffer;
    /// Opaque shading configuration; stored by layers, never introspected.
    type Material;

    /// Creates a buffer of exactly `size_bytes`.
    ///
    /// Fails with `OutOfDeviceMemory` when the device cannot back it.
    fn create_buffer(&mut self, kind: BufferKind, size_bytes: u64) -> Result<Self::Buffer>;

    /// Releases a buffer replaced by a larger one or dropped at teardown.
    fn destroy_buffer(&mut self, buffer: Self::Buffer);

    /// Copies `bytes` into `buffer` starting at `offset`.
    fn write_buffer(&mut self, buffer: &Self::Buffer, offset: u64, bytes: &[u8]);

    /// Fails with `ProgrammingError` when `material` cannot consume the
    /// vertex layout of `call`. Nothing is drawn in that case.
    fn draw(
        &mut self,
        call: &DrawCall<'_, Self::Buffer>,
        material: &Self::Material,
        uniforms: &dyn UniformProvider,
    ) -> Result<()>;
}
