use crate::atlas::TextureAtlas;
use crate::error::Result;
use crate::render::RenderDevice;

use super::tools::ParticleTexcoords;
use super::{AllocationId, ParticleLayer, ParticlePolicy, SpawnTarget};

/// Particles whose texture rectangle can be assigned from an atlas entry.
pub trait TexturedParticle {
    fn set_texcoords(&mut self, texcoords: ParticleTexcoords);
}

/// Spawns particles textured with one named atlas entry.
///
/// The name is resolved against the layer's atlas at every spawn, so swapping
/// the atlas is picked up immediately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticleSpawner {
    entry: String,
}

impl ParticleSpawner {
    pub fn new(entry: impl Into<String>) -> Self {
        Self { entry: entry.into() }
    }

    #[inline]
    pub fn entry(&self) -> &str {
        &self.entry
    }

    /// Texcoords of the entry, or the full texture when it cannot be resolved.
    pub fn texcoords(&self, atlas: Option<&dyn TextureAtlas>) -> ParticleTexcoords {
        match atlas.and_then(|a| a.lookup(&self.entry)) {
            Some(rect) => rect.into(),
            None => {
                log::debug!("atlas entry `{}` not found, using full texture", self.entry);
                ParticleTexcoords::default()
            }
        }
    }

    pub fn spawn<T, D>(
        &self,
        layer: &mut ParticleLayer<T, D>,
        count: usize,
        target: SpawnTarget,
    ) -> Result<AllocationId>
    where
        T: ParticlePolicy,
        T::Particle: TexturedParticle,
        D: RenderDevice,
    {
        self.spawn_with(layer, count, target, |_, _| {})
    }

    /// Like [`spawn`](Self::spawn), then runs `init` on each new particle.
    pub fn spawn_with<T, D>(
        &self,
        layer: &mut ParticleLayer<T, D>,
        count: usize,
        target: SpawnTarget,
        mut init: impl FnMut(usize, &mut T::Particle),
    ) -> Result<AllocationId>
    where
        T: ParticlePolicy,
        T::Particle: TexturedParticle,
        D: RenderDevice,
    {
        let texcoords = self.texcoords(layer.atlas().map(|a| a.as_ref()));
        layer.spawn_particles_with(count, target, |mut particles| {
            particles.for_each(|i, p| {
                p.set_texcoords(texcoords);
                init(i, p);
            });
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::atlas::{AtlasRect, AtlasTable};
    use crate::coords::Vec2;
    use crate::particle::{DefaultPolicy, LayerConfig};
    use crate::render::{HeadlessDevice, HeadlessMaterial};

    fn layer() -> ParticleLayer<DefaultPolicy, HeadlessDevice> {
        ParticleLayer::new(DefaultPolicy, Arc::new(HeadlessMaterial::new("sprites")), LayerConfig::default())
            .unwrap()
    }

    #[test]
    fn spawned_particles_use_atlas_rect() {
        let rect = AtlasRect::new(Vec2::new(0.5, 0.0), Vec2::new(1.0, 0.5), 3);
        let mut layer = layer();
        layer.set_atlas(Some(Arc::new(AtlasTable::new().with_entry("coin", rect))));

        let id = ParticleSpawner::new("coin")
            .spawn_with(&mut layer, 2, SpawnTarget::NewAllocation, |i, p| {
                p.rotation = i as f32;
            })
            .unwrap();

        let alloc = layer.allocation(id).unwrap();
        assert_eq!(alloc.len(), 2);
        assert!(alloc.particles().iter().all(|p| p.texcoords == ParticleTexcoords::from(rect)));
        assert_eq!(alloc.particles()[1].rotation, 1.0);
    }

    #[test]
    fn unknown_entry_falls_back_to_full_texture() {
        let mut layer = layer();
        let id = ParticleSpawner::new("ghost").spawn(&mut layer, 1, SpawnTarget::Latest).unwrap();
        assert_eq!(
            layer.allocation(id).unwrap().particles()[0].texcoords,
            ParticleTexcoords::default()
        );
    }
}
