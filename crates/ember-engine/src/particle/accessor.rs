use std::ops::Index;

use crate::error::{RenderError, Result};

/// Read-only, bounds-checked view over particles.
#[derive(Debug)]
pub struct ParticleAccessor<'a, P> {
    particles: &'a [P],
}

impl<'a, P> ParticleAccessor<'a, P> {
    #[inline]
    pub(crate) fn new(particles: &'a [P]) -> Self {
        Self { particles }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<&'a P> {
        self.particles
            .get(index)
            .ok_or(RenderError::OutOfRange { index, len: self.particles.len() })
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'a, P> {
        self.particles.iter()
    }

    #[inline]
    pub fn as_slice(&self) -> &'a [P] {
        self.particles
    }
}

impl<P> Index<usize> for ParticleAccessor<'_, P> {
    type Output = P;

    fn index(&self, index: usize) -> &P {
        &self.particles[index]
    }
}

/// Mutable, bounds-checked view over particles.
///
/// Any mutable access marks the owning allocation dirty, so the next display
/// rebuilds its vertices.
#[derive(Debug)]
pub struct ParticleAccessorMut<'a, P> {
    particles: &'a mut [P],
    dirty: &'a mut bool,
}

impl<'a, P> ParticleAccessorMut<'a, P> {
    #[inline]
    pub(crate) fn new(particles: &'a mut [P], dirty: &'a mut bool) -> Self {
        Self { particles, dirty }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<&P> {
        self.particles
            .get(index)
            .ok_or(RenderError::OutOfRange { index, len: self.particles.len() })
    }

    pub fn get_mut(&mut self, index: usize) -> Result<&mut P> {
        let len = self.particles.len();
        let particle = self
            .particles
            .get_mut(index)
            .ok_or(RenderError::OutOfRange { index, len })?;
        *self.dirty = true;
        Ok(particle)
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, P> {
        self.particles.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, P> {
        *self.dirty = true;
        self.particles.iter_mut()
    }

    /// Calls `f` with each particle and its index inside this view.
    pub fn for_each(&mut self, mut f: impl FnMut(usize, &mut P)) {
        for (i, p) in self.iter_mut().enumerate() {
            f(i, p);
        }
    }

    #[inline]
    pub fn as_slice(&self) -> &[P] {
        self.particles
    }

    pub fn as_mut_slice(&mut self) -> &mut [P] {
        *self.dirty = true;
        self.particles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_does_not_dirty() {
        let mut particles = [1, 2, 3];
        let mut dirty = false;
        let acc = ParticleAccessorMut::new(&mut particles, &mut dirty);
        assert_eq!(*acc.get(2).unwrap(), 3);
        assert_eq!(acc.iter().sum::<i32>(), 6);
        drop(acc);
        assert!(!dirty);
    }

    #[test]
    fn write_dirties() {
        let mut particles = [1, 2, 3];
        let mut dirty = false;
        let mut acc = ParticleAccessorMut::new(&mut particles, &mut dirty);
        *acc.get_mut(0).unwrap() = 7;
        drop(acc);
        assert!(dirty);
        assert_eq!(particles[0], 7);
    }

    #[test]
    fn out_of_range_is_reported() {
        let particles = [1, 2];
        let acc = ParticleAccessor::new(&particles);
        assert_eq!(acc.get(2).unwrap_err(), RenderError::OutOfRange { index: 2, len: 2 });

        let mut dirty = false;
        let mut particles = [1];
        let mut acc = ParticleAccessorMut::new(&mut particles, &mut dirty);
        assert!(acc.get_mut(5).is_err());
        drop(acc);
        assert!(!dirty);
    }
}
