//! Primitive encodings.
//!
//! A particle always converts to four corner vertices (bottom-left,
//! bottom-right, top-right, top-left). The encoding decides how those corners
//! land in the vertex and index streams:
//!
//! | kind            | vertices / particle | join vertices | indices / particle |
//! |-----------------|---------------------|---------------|--------------------|
//! | `Quad`          | 4                   | 0             | 6                  |
//! | `TrianglePair`  | 6                   | 0             | 0                  |
//! | `TriangleStrip` | 4                   | 2             | 0                  |
//! | `TriangleFan`   | 4                   | 0             | 6                  |
//!
//! Strips are stitched with two degenerate vertices (last vertex of the
//! previous particle, then the first vertex of the next), so a whole layer
//! draws with one call. Quads and fans go through the index stream instead.

mod output;

pub use output::{
    Encoding, MeshOutput, PrimitiveOutput, Quad, QuadOutput, Streams, TriangleFan, TriangleFanOutput,
    TrianglePair, TrianglePairOutput, TriangleStrip, TriangleStripOutput,
};

use crate::render::Topology;

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum PrimitiveKind {
    #[default]
    Quad,
    TrianglePair,
    TriangleStrip,
    TriangleFan,
}

impl PrimitiveKind {
    pub const ALL: [PrimitiveKind; 4] = [
        PrimitiveKind::Quad,
        PrimitiveKind::TrianglePair,
        PrimitiveKind::TriangleStrip,
        PrimitiveKind::TriangleFan,
    ];

    #[inline]
    pub const fn vertices_per_particle(self) -> usize {
        match self {
            PrimitiveKind::TrianglePair => 6,
            PrimitiveKind::Quad | PrimitiveKind::TriangleStrip | PrimitiveKind::TriangleFan => 4,
        }
    }

    /// Degenerate vertices inserted between two consecutive particles.
    #[inline]
    pub const fn join_vertices(self) -> usize {
        match self {
            PrimitiveKind::TriangleStrip => 2,
            _ => 0,
        }
    }

    #[inline]
    pub const fn indices_per_particle(self) -> usize {
        match self {
            PrimitiveKind::Quad | PrimitiveKind::TriangleFan => 6,
            _ => 0,
        }
    }

    #[inline]
    pub const fn is_indexed(self) -> bool {
        self.indices_per_particle() > 0
    }

    /// Exact number of vertices `particle_count` commits will write.
    #[inline]
    pub const fn estimate_vertex_count(self, particle_count: usize) -> usize {
        if particle_count == 0 {
            return 0;
        }
        particle_count * self.vertices_per_particle() + (particle_count - 1) * self.join_vertices()
    }

    #[inline]
    pub const fn estimate_index_count(self, particle_count: usize) -> usize {
        particle_count * self.indices_per_particle()
    }

    #[inline]
    pub const fn topology(self) -> Topology {
        match self {
            PrimitiveKind::TriangleStrip => Topology::TriangleStrip,
            _ => Topology::TriangleList,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Quad => "quad",
            PrimitiveKind::TrianglePair => "triangle-pair",
            PrimitiveKind::TriangleStrip => "triangle-strip",
            PrimitiveKind::TriangleFan => "triangle-fan",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_particles_need_nothing() {
        for kind in PrimitiveKind::ALL {
            assert_eq!(kind.estimate_vertex_count(0), 0);
            assert_eq!(kind.estimate_index_count(0), 0);
        }
    }

    #[test]
    fn strip_count_includes_joins() {
        assert_eq!(PrimitiveKind::TriangleStrip.estimate_vertex_count(1), 4);
        assert_eq!(PrimitiveKind::TriangleStrip.estimate_vertex_count(5), 28);
    }

    #[test]
    fn indexed_kinds_draw_as_lists() {
        assert!(PrimitiveKind::Quad.is_indexed());
        assert!(PrimitiveKind::TriangleFan.is_indexed());
        assert!(!PrimitiveKind::TrianglePair.is_indexed());
        assert_eq!(PrimitiveKind::TriangleFan.topology(), Topology::TriangleList);
        assert_eq!(PrimitiveKind::TriangleStrip.topology(), Topology::TriangleStrip);
    }
}
