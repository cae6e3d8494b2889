use bytemuck::Pod;

use crate::primitive::PrimitiveKind;
use crate::render::VertexDeclaration;

/// Compile-time description of a particle layer.
///
/// Both per-particle functions are called in the hot loop and are statically
/// dispatched. Neither may fail; a policy that cannot convert a particle is a
/// bug in the policy.
pub trait ParticlePolicy: 'static {
    /// Spawned particles start as `Default::default()`.
    type Particle: Default;
    type Vertex: Pod;

    /// Encoding used unless the layer config overrides it.
    const PRIMITIVE: PrimitiveKind = PrimitiveKind::Quad;

    /// When false, `tick` never calls [`update_particle`](Self::update_particle).
    const DYNAMIC_PARTICLES: bool = true;

    /// When false, an update that keeps every particle alive is assumed not to
    /// change any vertex.
    const DYNAMIC_VERTICES: bool = true;

    /// Layout of [`Vertex`](Self::Vertex). Its stride must equal the vertex size.
    fn vertex_declaration(&self) -> VertexDeclaration;

    /// Advances one particle by `dt` seconds. Returns `false` when it died.
    fn update_particle(&self, particle: &mut Self::Particle, dt: f32) -> bool;

    /// Corner vertices in bottom-left, bottom-right, top-right, top-left order.
    fn particle_to_vertices(&self, particle: &Self::Particle) -> [Self::Vertex; 4];
}
