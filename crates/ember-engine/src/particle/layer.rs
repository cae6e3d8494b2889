use std::any::Any;
use std::sync::Arc;

use crate::atlas::TextureAtlas;
use crate::buffer::{BufferCacheConfig, DynamicMesh, MeshElement};
use crate::error::{RenderError, Result};
use crate::primitive::{
    Encoding, MeshOutput, PrimitiveKind, PrimitiveOutput, Quad, TriangleFan, TrianglePair, TriangleStrip,
};
use crate::render::{RenderDevice, RenderParams, UniformProvider, VertexDeclaration};

use super::{Allocation, AllocationId, ParticleAccessorMut, ParticlePolicy, SpawnTarget};

/// Construction-time settings of a layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerConfig {
    /// Used in diagnostics.
    pub label: String,
    /// Overrides [`ParticlePolicy::PRIMITIVE`].
    pub primitive: Option<PrimitiveKind>,
    pub buffer: BufferCacheConfig,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            label: "particles".to_string(),
            primitive: None,
            buffer: BufferCacheConfig::default(),
        }
    }
}

impl LayerConfig {
    pub fn labeled(label: impl Into<String>) -> Self {
        Self { label: label.into(), ..Self::default() }
    }

    pub fn with_primitive(mut self, primitive: PrimitiveKind) -> Self {
        self.primitive = Some(primitive);
        self
    }
}

/// Allocations of one particle type plus the mesh they render into.
///
/// Frame protocol: [`tick`](Self::tick) first, then [`display`](Self::display).
/// Display rebuilds the mesh only when something changed since the last
/// rebuild; otherwise it redraws the cached buffers.
pub struct ParticleLayer<T: ParticlePolicy, D: RenderDevice> {
    label: String,
    policy: T,
    primitive: PrimitiveKind,
    declaration: VertexDeclaration,
    allocations: Vec<Allocation<T::Particle>>,
    next_allocation: u64,
    material: Arc<D::Material>,
    atlas: Option<Arc<dyn TextureAtlas>>,
    mesh: DynamicMesh<D::Buffer>,
    dirty: bool,
}

impl<T: ParticlePolicy, D: RenderDevice> ParticleLayer<T, D> {
    /// Fails with `ProgrammingError` when the policy's vertex declaration
    /// does not describe its vertex type.
    pub fn new(policy: T, material: Arc<D::Material>, config: LayerConfig) -> Result<Self> {
        let declaration = policy.vertex_declaration();
        let vertex_size = std::mem::size_of::<T::Vertex>();
        if declaration.stride() as usize != vertex_size || !declaration.is_consistent() {
            return Err(RenderError::ProgrammingError(format!(
                "layer `{}`: vertex declaration (stride {}) does not match a {} byte vertex",
                config.label,
                declaration.stride(),
                vertex_size
            )));
        }

        Ok(Self {
            label: config.label,
            policy,
            primitive: config.primitive.unwrap_or(T::PRIMITIVE),
            declaration,
            allocations: Vec::new(),
            next_allocation: 0,
            material,
            atlas: None,
            mesh: DynamicMesh::new(config.buffer),
            dirty: true,
        })
    }

    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[inline]
    pub fn policy(&self) -> &T {
        &self.policy
    }

    #[inline]
    pub fn primitive(&self) -> PrimitiveKind {
        self.primitive
    }

    #[inline]
    pub fn declaration(&self) -> &VertexDeclaration {
        &self.declaration
    }

    #[inline]
    pub fn mesh(&self) -> &DynamicMesh<D::Buffer> {
        &self.mesh
    }

    #[inline]
    pub fn material(&self) -> &Arc<D::Material> {
        &self.material
    }

    pub fn set_material(&mut self, material: Arc<D::Material>) {
        self.material = material;
    }

    #[inline]
    pub fn atlas(&self) -> Option<&Arc<dyn TextureAtlas>> {
        self.atlas.as_ref()
    }

    pub fn set_atlas(&mut self, atlas: Option<Arc<dyn TextureAtlas>>) {
        self.atlas = atlas;
    }

    // ── allocations ───────────────────────────────────────────────────────

    #[inline]
    pub fn allocation_count(&self) -> usize {
        self.allocations.len()
    }

    pub fn allocations(&self) -> impl Iterator<Item = &Allocation<T::Particle>> {
        self.allocations.iter()
    }

    pub fn allocation(&self, id: AllocationId) -> Option<&Allocation<T::Particle>> {
        self.allocations.iter().find(|a| a.id() == id)
    }

    pub fn allocation_mut(&mut self, id: AllocationId) -> Option<&mut Allocation<T::Particle>> {
        self.allocations.iter_mut().find(|a| a.id() == id)
    }

    /// Live particles over all allocations, visible or not.
    pub fn particle_count(&self) -> usize {
        self.allocations.iter().map(Allocation::len).sum()
    }

    pub fn visible_particle_count(&self) -> usize {
        self.allocations
            .iter()
            .filter(|a| a.is_visible())
            .map(Allocation::len)
            .sum()
    }

    /// Spawns into a new allocation, or into the latest one.
    pub fn spawn_particles(&mut self, count: usize, new_allocation: bool) -> Result<AllocationId> {
        let target = if new_allocation { SpawnTarget::NewAllocation } else { SpawnTarget::Latest };
        self.spawn_particles_into(count, target)
    }

    pub fn spawn_particles_into(&mut self, count: usize, target: SpawnTarget) -> Result<AllocationId> {
        self.spawn_particles_with(count, target, |_| {})
    }

    /// Spawns `count` default particles, then hands just those to `init`.
    pub fn spawn_particles_with<F>(&mut self, count: usize, target: SpawnTarget, init: F) -> Result<AllocationId>
    where
        F: FnOnce(ParticleAccessorMut<'_, T::Particle>),
    {
        let (index, created) = self.resolve(target)?;
        let allocation = &mut self.allocations[index];
        let id = allocation.id();

        match allocation.spawn_count(count) {
            Ok(particles) => init(particles),
            Err(err) => {
                if created {
                    self.allocations.remove(index);
                }
                return Err(err);
            }
        }

        self.dirty = true;
        Ok(id)
    }

    fn resolve(&mut self, target: SpawnTarget) -> Result<(usize, bool)> {
        match target {
            SpawnTarget::NewAllocation => Ok((self.push_allocation(), true)),
            SpawnTarget::Latest => match self.allocations.len() {
                0 => Ok((self.push_allocation(), true)),
                len => Ok((len - 1, false)),
            },
            SpawnTarget::Existing(id) => self
                .allocations
                .iter()
                .position(|a| a.id() == id)
                .map(|i| (i, false))
                .ok_or(RenderError::OutOfRange {
                    index: id.raw() as usize,
                    len: self.allocations.len(),
                }),
        }
    }

    fn push_allocation(&mut self) -> usize {
        let id = AllocationId(self.next_allocation);
        self.next_allocation += 1;
        self.allocations.push(Allocation::new(id));
        self.allocations.len() - 1
    }

    pub fn set_visible(&mut self, id: AllocationId, visible: bool) -> Result<()> {
        let len = self.allocations.len();
        let allocation = self
            .allocation_mut(id)
            .ok_or(RenderError::OutOfRange { index: id.raw() as usize, len })?;
        allocation.set_visible(visible);
        Ok(())
    }

    pub fn resize_allocation(&mut self, id: AllocationId, count: usize) -> Result<()> {
        let len = self.allocations.len();
        let allocation = self
            .allocation_mut(id)
            .ok_or(RenderError::OutOfRange { index: id.raw() as usize, len })?;
        allocation.resize(count)
    }

    pub fn remove_allocation(&mut self, id: AllocationId) -> bool {
        let before = self.allocations.len();
        self.allocations.retain(|a| a.id() != id);
        let removed = self.allocations.len() != before;
        self.dirty |= removed;
        removed
    }

    pub fn clear_all_allocations(&mut self) {
        if !self.allocations.is_empty() {
            self.allocations.clear();
            self.dirty = true;
        }
    }

    /// Forces the next display to rebuild.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty || self.allocations.iter().any(Allocation::is_dirty)
    }

    // ── frame ─────────────────────────────────────────────────────────────

    /// Advances every particle by `dt` seconds and drops the dead ones.
    ///
    /// Allocations emptied by this tick are pruned afterwards (when they are
    /// flagged `destroy_when_empty`).
    pub fn tick(&mut self, dt: f32) {
        if !T::DYNAMIC_PARTICLES {
            return;
        }

        let policy = &self.policy;
        for allocation in &mut self.allocations {
            if allocation.is_empty() {
                continue;
            }
            allocation.tick(|p| policy.update_particle(p, dt));
            if T::DYNAMIC_VERTICES && !allocation.is_empty() {
                allocation.mark_dirty();
            }
        }

        self.prune_empty();
    }

    fn prune_empty(&mut self) {
        let before = self.allocations.len();
        self.allocations.retain(|a| !(a.is_empty() && a.destroy_when_empty()));
        let pruned = before - self.allocations.len();
        if pruned > 0 {
            log::debug!("layer `{}` pruned {} empty allocations", self.label, pruned);
            self.dirty = true;
        }
    }

    /// Draws the visible particles. Returns the number of particles drawn.
    ///
    /// When the rebuild fails nothing is drawn and the layer stays dirty, so
    /// the next frame rebuilds from scratch. A draw the device rejects leaves
    /// the cached mesh intact.
    pub fn display(&mut self, device: &mut D, uniforms: &dyn UniformProvider, params: &RenderParams) -> Result<usize> {
        if self.is_dirty() || !self.mesh.is_valid() {
            self.rebuild(device)?;
        }
        self.mesh
            .draw(device, &self.declaration, &self.material, uniforms, params)
    }

    fn rebuild(&mut self, device: &mut D) -> Result<()> {
        let count = self.visible_particle_count();
        if count == 0 {
            self.mesh.clear();
            self.clear_dirty();
            return Ok(());
        }

        let res = match self.primitive {
            PrimitiveKind::Quad => self.generate::<Quad>(device, count),
            PrimitiveKind::TrianglePair => self.generate::<TrianglePair>(device, count),
            PrimitiveKind::TriangleStrip => self.generate::<TriangleStrip>(device, count),
            PrimitiveKind::TriangleFan => self.generate::<TriangleFan>(device, count),
        };

        match res {
            Ok(element) => {
                log::trace!(
                    "layer `{}` rebuilt {} particles into {} vertices",
                    self.label,
                    element.particle_count,
                    element.vertex_count
                );
                self.clear_dirty();
                Ok(())
            }
            Err(err) => {
                self.mesh.invalidate();
                Err(err)
            }
        }
    }

    fn generate<E: Encoding>(&mut self, device: &mut D, count: usize) -> Result<MeshElement> {
        let mut out = MeshOutput::<_, T::Vertex, E>::begin(&mut self.mesh, device, count)?;
        fill(&self.policy, &self.allocations, &mut out);
        out.flush(device)
    }

    fn clear_dirty(&mut self) {
        self.dirty = false;
        for allocation in &mut self.allocations {
            allocation.clear_dirty();
        }
    }

    /// Frees the device buffers; the next display recreates them.
    pub fn release_buffers(&mut self, device: &mut D) {
        self.mesh.release(device);
        self.dirty = true;
    }
}

/// Converts every visible particle, in layer order.
fn fill<T, O>(policy: &T, allocations: &[Allocation<T::Particle>], out: &mut O)
where
    T: ParticlePolicy,
    O: PrimitiveOutput<T::Vertex>,
{
    for allocation in allocations.iter().filter(|a| a.is_visible()) {
        for particle in allocation.particles() {
            out.commit(&policy.particle_to_vertices(particle));
        }
    }
}

/// Object-safe frame entry points of a layer.
pub trait LayerBase<D: RenderDevice>: Any {
    fn label(&self) -> &str;

    fn tick(&mut self, dt: f32);

    fn display(&mut self, device: &mut D, uniforms: &dyn UniformProvider, params: &RenderParams) -> Result<usize>;

    fn particle_count(&self) -> usize;

    fn clear_all_allocations(&mut self);

    fn release_buffers(&mut self, device: &mut D);

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T, D> LayerBase<D> for ParticleLayer<T, D>
where
    T: ParticlePolicy,
    D: RenderDevice + 'static,
{
    fn label(&self) -> &str {
        ParticleLayer::label(self)
    }

    fn tick(&mut self, dt: f32) {
        ParticleLayer::tick(self, dt)
    }

    fn display(&mut self, device: &mut D, uniforms: &dyn UniformProvider, params: &RenderParams) -> Result<usize> {
        ParticleLayer::display(self, device, uniforms, params)
    }

    fn particle_count(&self) -> usize {
        ParticleLayer::particle_count(self)
    }

    fn clear_all_allocations(&mut self) {
        ParticleLayer::clear_all_allocations(self)
    }

    fn release_buffers(&mut self, device: &mut D) {
        ParticleLayer::release_buffers(self, device)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
