use std::marker::PhantomData;

use bytemuck::Pod;

use crate::buffer::{BufferCache, DynamicMesh, MeshElement};
use crate::error::{RenderError, Result};
use crate::render::RenderDevice;

use super::PrimitiveKind;

/// Append-only view of a mesh's vertex and index streams during one rebuild.
pub struct Streams<'a, B> {
    vertices: &'a mut BufferCache<B>,
    indices: &'a mut BufferCache<B>,
    vertex_count: usize,
    index_count: usize,
}

impl<B> Streams<'_, B> {
    /// Absolute index the next vertex will get.
    #[inline]
    pub fn next_vertex(&self) -> u32 {
        self.vertex_count as u32
    }

    #[inline]
    pub fn vertex<V: Pod>(&mut self, vertex: &V) {
        self.vertices.push(vertex);
        self.vertex_count += 1;
    }

    #[inline]
    pub fn index(&mut self, index: u32) {
        self.indices.push(&index);
        self.index_count += 1;
    }
}

/// How one particle's four corners are laid out in the streams.
///
/// Implementations are zero-sized markers; the layer picks one at construction
/// and the per-particle path is monomorphized over it.
pub trait Encoding: 'static {
    const KIND: PrimitiveKind;

    /// Appends one particle. `corners` are ordered bottom-left, bottom-right,
    /// top-right, top-left; `previous` is the particle committed just before
    /// in the same rebuild.
    fn emit<B, V: Pod>(out: &mut Streams<'_, B>, corners: &[V; 4], previous: Option<&[V; 4]>);
}

const QUAD_INDICES: [u32; 6] = [0, 1, 2, 0, 2, 3];

/// Four shared corners, two indexed triangles.
#[derive(Debug, Copy, Clone, Default)]
pub struct Quad;

impl Encoding for Quad {
    const KIND: PrimitiveKind = PrimitiveKind::Quad;

    #[inline]
    fn emit<B, V: Pod>(out: &mut Streams<'_, B>, corners: &[V; 4], _previous: Option<&[V; 4]>) {
        let base = out.next_vertex();
        for v in corners {
            out.vertex(v);
        }
        for i in QUAD_INDICES {
            out.index(base + i);
        }
    }
}

/// Two independent triangles, no index stream.
#[derive(Debug, Copy, Clone, Default)]
pub struct TrianglePair;

impl Encoding for TrianglePair {
    const KIND: PrimitiveKind = PrimitiveKind::TrianglePair;

    #[inline]
    fn emit<B, V: Pod>(out: &mut Streams<'_, B>, corners: &[V; 4], _previous: Option<&[V; 4]>) {
        let [bl, br, tr, tl] = corners;
        for v in [bl, br, tr, bl, tr, tl] {
            out.vertex(v);
        }
    }
}

/// Strip order BL, BR, TL, TR; consecutive particles are stitched with two
/// degenerate vertices, which keeps the winding parity of the next quad.
#[derive(Debug, Copy, Clone, Default)]
pub struct TriangleStrip;

impl Encoding for TriangleStrip {
    const KIND: PrimitiveKind = PrimitiveKind::TriangleStrip;

    #[inline]
    fn emit<B, V: Pod>(out: &mut Streams<'_, B>, corners: &[V; 4], previous: Option<&[V; 4]>) {
        let [bl, br, tr, tl] = corners;
        if let Some(prev) = previous {
            // Last strip vertex of a particle is its top-right corner.
            out.vertex(&prev[2]);
            out.vertex(bl);
        }
        for v in [bl, br, tl, tr] {
            out.vertex(v);
        }
    }
}

/// Fan around the bottom-left corner, joined through the index stream.
#[derive(Debug, Copy, Clone, Default)]
pub struct TriangleFan;

impl Encoding for TriangleFan {
    const KIND: PrimitiveKind = PrimitiveKind::TriangleFan;

    #[inline]
    fn emit<B, V: Pod>(out: &mut Streams<'_, B>, corners: &[V; 4], _previous: Option<&[V; 4]>) {
        let base = out.next_vertex();
        for v in corners {
            out.vertex(v);
        }
        for i in 1..3 {
            out.index(base);
            out.index(base + i);
            out.index(base + i + 1);
        }
    }
}

/// Per-particle vertex assembler.
pub trait PrimitiveOutput<V> {
    const KIND: PrimitiveKind;

    #[inline]
    fn estimate_vertex_count(particle_count: usize) -> usize {
        Self::KIND.estimate_vertex_count(particle_count)
    }

    /// Appends exactly one particle.
    fn commit(&mut self, corners: &[V; 4]);

    /// Particles committed since the output was opened.
    fn committed(&self) -> usize;

    fn vertices_written(&self) -> usize;
}

/// Writes one layer rebuild into a [`DynamicMesh`].
///
/// `begin` sizes and maps the mesh for a known particle count, `commit` is
/// called once per particle, and `flush` uploads and records the draw range.
/// Dropping an output without flushing leaves the mesh invalid; the next
/// rebuild starts over.
pub struct MeshOutput<'m, B, V, E> {
    mesh: &'m mut DynamicMesh<B>,
    expected: usize,
    committed: usize,
    vertex_count: usize,
    index_count: usize,
    previous: Option<[V; 4]>,
    _encoding: PhantomData<E>,
}

pub type QuadOutput<'m, B, V> = MeshOutput<'m, B, V, Quad>;
pub type TrianglePairOutput<'m, B, V> = MeshOutput<'m, B, V, TrianglePair>;
pub type TriangleStripOutput<'m, B, V> = MeshOutput<'m, B, V, TriangleStrip>;
pub type TriangleFanOutput<'m, B, V> = MeshOutput<'m, B, V, TriangleFan>;

impl<'m, B, V: Pod, E: Encoding> MeshOutput<'m, B, V, E> {
    /// Reserves room for `particle_count` particles and opens the streams.
    pub fn begin<D>(mesh: &'m mut DynamicMesh<B>, device: &mut D, particle_count: usize) -> Result<Self>
    where
        D: RenderDevice<Buffer = B>,
    {
        let vertices = E::KIND.estimate_vertex_count(particle_count);
        if vertices > u32::MAX as usize {
            return Err(RenderError::AllocationFailure { requested: vertices });
        }
        let indices = E::KIND.estimate_index_count(particle_count);

        mesh.begin(device, vertices, std::mem::size_of::<V>(), indices)?;

        Ok(Self {
            mesh,
            expected: particle_count,
            committed: 0,
            vertex_count: 0,
            index_count: 0,
            previous: None,
            _encoding: PhantomData,
        })
    }

    /// Uploads the streams and records the resulting draw range.
    ///
    /// Fails with `ProgrammingError` when the committed particles or the
    /// written vertices disagree with the estimate made in `begin`.
    pub fn flush<D>(self, device: &mut D) -> Result<MeshElement>
    where
        D: RenderDevice<Buffer = B>,
    {
        let expected_vertices = E::KIND.estimate_vertex_count(self.expected);
        let expected_indices = E::KIND.estimate_index_count(self.expected);

        if self.committed != self.expected
            || self.vertex_count != expected_vertices
            || self.index_count != expected_indices
        {
            self.mesh.invalidate();
            return Err(RenderError::ProgrammingError(format!(
                "{} output: {} particles / {} vertices / {} indices committed, expected {} / {} / {}",
                E::KIND.name(),
                self.committed,
                self.vertex_count,
                self.index_count,
                self.expected,
                expected_vertices,
                expected_indices,
            )));
        }

        let element = MeshElement {
            primitive: E::KIND,
            first_vertex: 0,
            vertex_count: self.vertex_count as u32,
            first_index: 0,
            index_count: self.index_count as u32,
            particle_count: self.committed,
        };
        self.mesh.finish(device, element)?;
        Ok(element)
    }
}

impl<B, V: Pod, E: Encoding> PrimitiveOutput<V> for MeshOutput<'_, B, V, E> {
    const KIND: PrimitiveKind = E::KIND;

    #[inline]
    fn commit(&mut self, corners: &[V; 4]) {
        let (vertices, indices) = self.mesh.streams_mut();
        let mut out = Streams {
            vertices,
            indices,
            vertex_count: self.vertex_count,
            index_count: self.index_count,
        };
        E::emit(&mut out, corners, self.previous.as_ref());

        self.vertex_count = out.vertex_count;
        self.index_count = out.index_count;
        self.previous = Some(*corners);
        self.committed += 1;
    }

    #[inline]
    fn committed(&self) -> usize {
        self.committed
    }

    #[inline]
    fn vertices_written(&self) -> usize {
        self.vertex_count
    }
}
