use crate::error::Result;
use crate::primitive::PrimitiveKind;
use crate::render::{BufferKind, DrawCall, RenderDevice, RenderParams, UniformProvider, VertexDeclaration};

use super::{BufferCache, BufferCacheConfig, CacheState};

/// Draw range produced by one rebuild.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MeshElement {
    pub primitive: PrimitiveKind,
    pub first_vertex: u32,
    pub vertex_count: u32,
    pub first_index: u32,
    pub index_count: u32,
    pub particle_count: usize,
}

/// Vertex cache + index cache + the draw ranges of the last rebuild.
///
/// Valid means the device buffers hold exactly what `elements` describe and
/// can be redrawn without touching particles.
#[derive(Debug)]
pub struct DynamicMesh<B> {
    vertices: BufferCache<B>,
    indices: BufferCache<B>,
    elements: Vec<MeshElement>,
    valid: bool,
}

impl<B> DynamicMesh<B> {
    pub fn new(config: BufferCacheConfig) -> Self {
        Self {
            vertices: BufferCache::new(BufferKind::Vertex, config),
            indices: BufferCache::new(BufferKind::Index, config),
            elements: Vec::new(),
            valid: false,
        }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    #[inline]
    pub fn elements(&self) -> &[MeshElement] {
        &self.elements
    }

    #[inline]
    pub fn vertex_cache(&self) -> &BufferCache<B> {
        &self.vertices
    }

    #[inline]
    pub fn index_cache(&self) -> &BufferCache<B> {
        &self.indices
    }

    /// Vertices the last rebuild produced.
    pub fn vertex_count(&self) -> usize {
        self.elements.iter().map(|e| e.vertex_count as usize).sum()
    }

    /// Starts a full rewrite: sizes both caches for `vertex_count` vertices of
    /// `vertex_stride` bytes plus `index_count` u32 indices, then maps them.
    ///
    /// The index cache is only touched when `index_count > 0`. On failure the
    /// mesh is left invalid and unmapped.
    pub fn begin<D>(&mut self, device: &mut D, vertex_count: usize, vertex_stride: usize, index_count: usize) -> Result<()>
    where
        D: RenderDevice<Buffer = B>,
    {
        self.elements.clear();
        self.valid = false;

        let res = self.map_streams(device, vertex_count, vertex_stride, index_count);
        if res.is_err() {
            self.invalidate();
        }
        res
    }

    fn map_streams<D>(&mut self, device: &mut D, vertex_count: usize, vertex_stride: usize, index_count: usize) -> Result<()>
    where
        D: RenderDevice<Buffer = B>,
    {
        self.vertices.reserve_for(device, vertex_count, vertex_stride)?;
        if index_count > 0 {
            self.indices.reserve_for(device, index_count, std::mem::size_of::<u32>())?;
        }
        self.vertices.map()?;
        if index_count > 0 {
            self.indices.map()?;
        }
        Ok(())
    }

    #[inline]
    pub(crate) fn streams_mut(&mut self) -> (&mut BufferCache<B>, &mut BufferCache<B>) {
        (&mut self.vertices, &mut self.indices)
    }

    /// Uploads whatever is mapped and records `element` as drawable.
    pub fn finish<D>(&mut self, device: &mut D, element: MeshElement) -> Result<()>
    where
        D: RenderDevice<Buffer = B>,
    {
        let res = self.unmap_streams(device);
        if res.is_err() {
            self.invalidate();
            return res;
        }
        self.elements.push(element);
        self.valid = true;
        Ok(())
    }

    fn unmap_streams<D>(&mut self, device: &mut D) -> Result<()>
    where
        D: RenderDevice<Buffer = B>,
    {
        self.vertices.unmap(device)?;
        if self.indices.state() == CacheState::Writing {
            self.indices.unmap(device)?;
        }
        Ok(())
    }

    /// Marks the mesh as validly empty (nothing to draw, nothing to rebuild).
    pub fn clear(&mut self) {
        self.abort_streams();
        self.elements.clear();
        self.valid = true;
    }

    /// Forces the next display to rebuild.
    pub fn invalidate(&mut self) {
        self.abort_streams();
        self.elements.clear();
        self.valid = false;
    }

    fn abort_streams(&mut self) {
        if self.vertices.state() == CacheState::Writing {
            self.vertices.abort();
        }
        if self.indices.state() == CacheState::Writing {
            self.indices.abort();
        }
    }

    /// Issues one draw per recorded element.
    ///
    /// Returns the number of particles drawn; an invalid or empty mesh draws
    /// nothing. A draw rejected by the device stops at that element.
    pub fn draw<D>(
        &self,
        device: &mut D,
        declaration: &VertexDeclaration,
        material: &D::Material,
        uniforms: &dyn UniformProvider,
        params: &RenderParams,
    ) -> Result<usize>
    where
        D: RenderDevice<Buffer = B>,
    {
        if !self.valid {
            return Ok(0);
        }
        let Some(vertex_buffer) = self.vertices.buffer() else {
            return Ok(0);
        };

        let mut drawn = 0;
        for element in &self.elements {
            if element.vertex_count == 0 {
                continue;
            }
            let index_buffer = if element.index_count > 0 { self.indices.buffer() } else { None };
            let call = DrawCall {
                declaration,
                vertex_buffer,
                index_buffer,
                primitive: element.primitive,
                first_vertex: element.first_vertex,
                vertex_count: element.vertex_count,
                first_index: element.first_index,
                index_count: element.index_count,
                params,
            };
            device.draw(&call, material, uniforms)?;
            drawn += element.particle_count;
        }
        Ok(drawn)
    }

    /// Frees both device buffers. The mesh rebuilds from scratch afterwards.
    pub fn release<D>(&mut self, device: &mut D)
    where
        D: RenderDevice<Buffer = B>,
    {
        self.vertices.release(device);
        self.indices.release(device);
        self.elements.clear();
        self.valid = false;
    }
}
