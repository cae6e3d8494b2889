use std::collections::HashMap;

use crate::error::{RenderError, Result};
use crate::primitive::PrimitiveKind;

use super::{BufferKind, DrawCall, RenderDevice, Topology, UniformProvider, VertexSemantic};

/// Buffer handle of [`HeadlessDevice`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlessBuffer {
    id: u64,
    kind: BufferKind,
    size: u64,
}

impl HeadlessBuffer {
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }
}

/// Material of [`HeadlessDevice`]: a name recorded with each draw plus the
/// vertex semantics its shader would read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlessMaterial {
    pub name: String,
    pub inputs: Vec<VertexSemantic>,
}

impl HeadlessMaterial {
    /// Material that accepts any vertex layout.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), inputs: Vec::new() }
    }

    /// Draws fail unless the declaration provides every semantic in `inputs`.
    pub fn with_inputs(mut self, inputs: &[VertexSemantic]) -> Self {
        self.inputs = inputs.to_vec();
        self
    }
}

/// Snapshot of one draw call, taken when it was issued.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedDraw {
    pub frame_index: u64,
    pub material: String,
    pub primitive: PrimitiveKind,
    pub topology: Topology,
    pub stride: u32,
    pub vertex_buffer: u64,
    pub vertex_count: u32,
    pub index_count: u32,
    /// Bytes of the drawn vertex range.
    pub vertex_bytes: Vec<u8>,
    /// Drawn index range.
    pub indices: Vec<u32>,
}

/// Host-memory device.
///
/// Stores buffer contents in `Vec<u8>`s and records every draw, which makes
/// vertex streams observable in tests and tools without a GPU. An optional
/// memory limit simulates device exhaustion.
#[derive(Debug, Default)]
pub struct HeadlessDevice {
    storage: HashMap<u64, Vec<u8>>,
    next_id: u64,
    memory_limit: Option<u64>,
    allocated_bytes: u64,
    created: Vec<(BufferKind, u64)>,
    uploads: usize,
    draws: Vec<RecordedDraw>,
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Device that refuses allocations once `bytes` are live.
    pub fn with_memory_limit(bytes: u64) -> Self {
        Self { memory_limit: Some(bytes), ..Self::default() }
    }

    pub fn set_memory_limit(&mut self, limit: Option<u64>) {
        self.memory_limit = limit;
    }

    #[inline]
    pub fn allocated_bytes(&self) -> u64 {
        self.allocated_bytes
    }

    #[inline]
    pub fn live_buffer_count(&self) -> usize {
        self.storage.len()
    }

    /// Every buffer ever created, in creation order.
    #[inline]
    pub fn created_buffers(&self) -> &[(BufferKind, u64)] {
        &self.created
    }

    #[inline]
    pub fn upload_count(&self) -> usize {
        self.uploads
    }

    pub fn buffer_contents(&self, buffer: &HeadlessBuffer) -> Option<&[u8]> {
        self.storage.get(&buffer.id).map(Vec::as_slice)
    }

    #[inline]
    pub fn draws(&self) -> &[RecordedDraw] {
        &self.draws
    }

    #[inline]
    pub fn last_draw(&self) -> Option<&RecordedDraw> {
        self.draws.last()
    }

    pub fn take_draws(&mut self) -> Vec<RecordedDraw> {
        std::mem::take(&mut self.draws)
    }

    /// Total vertices over all recorded draws.
    pub fn drawn_vertex_count(&self) -> u64 {
        self.draws.iter().map(|d| d.vertex_count as u64).sum()
    }

    fn snapshot(&self, id: u64, start: u64, len: u64) -> Vec<u8> {
        let Some(bytes) = self.storage.get(&id) else { return Vec::new() };
        let start = (start as usize).min(bytes.len());
        let end = (start + len as usize).min(bytes.len());
        bytes[start..end].to_vec()
    }
}

impl RenderDevice for HeadlessDevice {
    type Buffer = HeadlessBuffer;
    type Material = HeadlessMaterial;

    fn create_buffer(&mut self, kind: BufferKind, size_bytes: u64) -> Result<HeadlessBuffer> {
        if let Some(limit) = self.memory_limit {
            if self.allocated_bytes.saturating_add(size_bytes) > limit {
                return Err(RenderError::OutOfDeviceMemory { requested_bytes: size_bytes });
            }
        }

        let id = self.next_id;
        self.next_id += 1;
        self.storage.insert(id, vec![0; size_bytes as usize]);
        self.allocated_bytes += size_bytes;
        self.created.push((kind, size_bytes));

        Ok(HeadlessBuffer { id, kind, size: size_bytes })
    }

    fn destroy_buffer(&mut self, buffer: HeadlessBuffer) {
        if self.storage.remove(&buffer.id).is_some() {
            self.allocated_bytes = self.allocated_bytes.saturating_sub(buffer.size);
        }
    }

    fn write_buffer(&mut self, buffer: &HeadlessBuffer, offset: u64, bytes: &[u8]) {
        let Some(dst) = self.storage.get_mut(&buffer.id) else {
            log::error!("write to destroyed headless buffer {}", buffer.id);
            return;
        };
        let start = offset as usize;
        let Some(region) = dst.get_mut(start..start + bytes.len()) else {
            log::error!(
                "write of {} bytes at {} overflows headless buffer {} ({} bytes)",
                bytes.len(),
                offset,
                buffer.id,
                buffer.size
            );
            return;
        };
        region.copy_from_slice(bytes);
        self.uploads += 1;
    }

    fn draw(
        &mut self,
        call: &DrawCall<'_, HeadlessBuffer>,
        material: &HeadlessMaterial,
        _uniforms: &dyn UniformProvider,
    ) -> Result<()> {
        if let Some(missing) = material.inputs.iter().find(|s| call.declaration.find(**s).is_none()) {
            return Err(RenderError::ProgrammingError(format!(
                "material `{}` reads {:?}, which the vertex declaration does not provide",
                material.name, missing
            )));
        }

        let stride = call.declaration.stride();
        let vertex_bytes = self.snapshot(
            call.vertex_buffer.id,
            call.first_vertex as u64 * stride as u64,
            call.vertex_count as u64 * stride as u64,
        );

        let indices = match call.index_buffer {
            Some(ib) if call.index_count > 0 => self
                .snapshot(ib.id, call.first_index as u64 * 4, call.index_count as u64 * 4)
                .chunks_exact(4)
                .map(|c| u32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
            _ => Vec::new(),
        };

        self.draws.push(RecordedDraw {
            frame_index: call.params.frame_index,
            material: material.name.clone(),
            primitive: call.primitive,
            topology: call.topology(),
            stride,
            vertex_buffer: call.vertex_buffer.id,
            vertex_count: call.vertex_count,
            index_count: call.index_count,
            vertex_bytes,
            indices,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_limit_rejects_oversized_buffer() {
        let mut dev = HeadlessDevice::with_memory_limit(1024);
        let a = dev.create_buffer(BufferKind::Vertex, 1000).unwrap();
        let err = dev.create_buffer(BufferKind::Vertex, 100).unwrap_err();
        assert_eq!(err, RenderError::OutOfDeviceMemory { requested_bytes: 100 });

        dev.destroy_buffer(a);
        assert_eq!(dev.allocated_bytes(), 0);
        assert!(dev.create_buffer(BufferKind::Vertex, 100).is_ok());
    }

    #[test]
    fn write_lands_at_offset() {
        let mut dev = HeadlessDevice::new();
        let b = dev.create_buffer(BufferKind::Vertex, 8).unwrap();
        dev.write_buffer(&b, 4, &[1, 2, 3, 4]);
        assert_eq!(dev.buffer_contents(&b).unwrap(), &[0, 0, 0, 0, 1, 2, 3, 4]);
        assert_eq!(dev.upload_count(), 1);
    }

    #[test]
    fn draw_rejects_missing_material_inputs() {
        use crate::render::{NoUniforms, RenderParams, VertexDeclaration, VertexFormat};

        let mut dev = HeadlessDevice::new();
        let vb = dev.create_buffer(BufferKind::Vertex, 32).unwrap();
        let decl = VertexDeclaration::new().with(VertexSemantic::Position, VertexFormat::Float32x2);
        let params = RenderParams::new(0);
        let call = DrawCall {
            declaration: &decl,
            vertex_buffer: &vb,
            index_buffer: None,
            primitive: PrimitiveKind::TriangleStrip,
            first_vertex: 0,
            vertex_count: 4,
            first_index: 0,
            index_count: 0,
            params: &params,
        };

        let colored = HeadlessMaterial::new("colored").with_inputs(&[VertexSemantic::Position, VertexSemantic::Color]);
        let err = dev.draw(&call, &colored, &NoUniforms).unwrap_err();
        assert!(err.is_programming_error());
        assert!(dev.draws().is_empty());

        let plain = HeadlessMaterial::new("plain").with_inputs(&[VertexSemantic::Position]);
        dev.draw(&call, &plain, &NoUniforms).unwrap();
        assert_eq!(dev.draws().len(), 1);
    }

    #[test]
    fn overflowing_write_is_ignored() {
        let mut dev = HeadlessDevice::new();
        let b = dev.create_buffer(BufferKind::Vertex, 4).unwrap();
        dev.write_buffer(&b, 2, &[1, 2, 3, 4]);
        assert_eq!(dev.buffer_contents(&b).unwrap(), &[0, 0, 0, 0]);
        assert_eq!(dev.upload_count(), 0);
    }
}
