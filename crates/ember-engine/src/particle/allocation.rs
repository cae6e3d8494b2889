use crate::error::{RenderError, Result};

use super::{ParticleAccessor, ParticleAccessorMut};

/// Handle to an allocation inside its layer.
///
/// Handles are never reused within a layer, so a handle to a pruned
/// allocation simply stops resolving.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct AllocationId(pub(crate) u64);

impl AllocationId {
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Where spawned particles go.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum SpawnTarget {
    /// A fresh allocation.
    NewAllocation,
    /// The most recently created allocation (a fresh one if there is none).
    #[default]
    Latest,
    Existing(AllocationId),
}

/// A growable array of particles of one type.
///
/// Index inside the allocation is a particle's identity until the next
/// resize or removal.
#[derive(Debug)]
pub struct Allocation<P> {
    id: AllocationId,
    particles: Vec<P>,
    visible: bool,
    dirty: bool,
    destroy_when_empty: bool,
}

impl<P: Default> Allocation<P> {
    pub(crate) fn new(id: AllocationId) -> Self {
        Self {
            id,
            particles: Vec::new(),
            visible: true,
            dirty: true,
            destroy_when_empty: true,
        }
    }

    #[inline]
    pub fn id(&self) -> AllocationId {
        self.id
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    #[inline]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Set by any mutation since the last vertex rebuild.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[inline]
    pub fn destroy_when_empty(&self) -> bool {
        self.destroy_when_empty
    }

    /// Keeps an emptied allocation alive after tick when `false`.
    pub fn set_destroy_when_empty(&mut self, destroy: bool) {
        self.destroy_when_empty = destroy;
    }

    /// Excludes or includes the allocation in vertex generation. Ticking is unaffected.
    pub fn set_visible(&mut self, visible: bool) {
        if self.visible != visible {
            self.visible = visible;
            self.dirty = true;
        }
    }

    #[inline]
    pub fn particles(&self) -> &[P] {
        &self.particles
    }

    pub fn accessor(&self) -> ParticleAccessor<'_, P> {
        ParticleAccessor::new(&self.particles)
    }

    pub fn accessor_mut(&mut self) -> ParticleAccessorMut<'_, P> {
        ParticleAccessorMut::new(&mut self.particles, &mut self.dirty)
    }

    /// Appends `count` default particles and returns a view of just those.
    ///
    /// Fails with `AllocationFailure` when host memory runs out; the
    /// allocation is unchanged in that case.
    pub fn spawn_count(&mut self, count: usize) -> Result<ParticleAccessorMut<'_, P>> {
        let start = self.particles.len();
        self.resize(start.saturating_add(count))?;
        Ok(ParticleAccessorMut::new(&mut self.particles[start..], &mut self.dirty))
    }

    /// Grows with default particles or truncates trailing ones.
    pub fn resize(&mut self, count: usize) -> Result<()> {
        let len = self.particles.len();
        if count == len {
            return Ok(());
        }
        if count > len {
            self.particles
                .try_reserve(count - len)
                .map_err(|_| RenderError::AllocationFailure { requested: count })?;
            self.particles.resize_with(count, P::default);
        } else {
            self.particles.truncate(count);
        }
        self.dirty = true;
        Ok(())
    }

    pub fn clear(&mut self) {
        if !self.particles.is_empty() {
            self.particles.clear();
            self.dirty = true;
        }
    }

    /// Runs `update` over every particle and swap-removes the dead ones.
    ///
    /// Returns the number of removed particles. Particle order is not kept
    /// across removals.
    pub(crate) fn tick(&mut self, mut update: impl FnMut(&mut P) -> bool) -> usize {
        let before = self.particles.len();
        let mut i = 0;
        while i < self.particles.len() {
            if update(&mut self.particles[i]) {
                i += 1;
            } else {
                // The swapped-in particle has not been updated yet: stay on `i`.
                self.particles.swap_remove(i);
            }
        }
        let removed = before - self.particles.len();
        if removed > 0 {
            self.dirty = true;
        }
        removed
    }

    #[inline]
    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    #[inline]
    pub(crate) fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}
