use bytemuck::Pod;

use crate::error::{RenderError, Result};
use crate::render::{BufferKind, RenderDevice};

/// How capacity grows when a reservation does not fit.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum GrowthPolicy {
    /// Grow to exactly the request.
    Exact,
    /// Grow to the next power of two of the request.
    #[default]
    Doubling,
}

impl GrowthPolicy {
    #[inline]
    pub fn grow(self, requested: u64) -> u64 {
        match self {
            GrowthPolicy::Exact => requested,
            GrowthPolicy::Doubling => requested.checked_next_power_of_two().unwrap_or(requested),
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BufferCacheConfig {
    /// Smallest buffer ever created.
    pub min_capacity_bytes: u64,
    pub growth: GrowthPolicy,
}

impl Default for BufferCacheConfig {
    fn default() -> Self {
        Self {
            min_capacity_bytes: 1024,
            growth: GrowthPolicy::Doubling,
        }
    }
}

/// Lifecycle of a [`BufferCache`].
///
/// `Empty → reserve → Sized → map → Writing → unmap → Ready → (draw) → Ready`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CacheState {
    Empty,
    Sized,
    Writing,
    Ready,
}

impl CacheState {
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            CacheState::Empty => "empty",
            CacheState::Sized => "sized",
            CacheState::Writing => "writing",
            CacheState::Ready => "ready",
        }
    }
}

/// One growable device buffer plus its host staging region.
///
/// Invariants:
/// - `capacity` never decreases except through [`release`](Self::release)
/// - a rebuild always rewrites the buffer from offset 0; nothing from an older
///   buffer is carried over
/// - after [`unmap`](Self::unmap) the device buffer holds exactly the staged bytes
#[derive(Debug)]
pub struct BufferCache<B> {
    kind: BufferKind,
    config: BufferCacheConfig,
    buffer: Option<B>,
    capacity: u64,
    staging: Vec<u8>,
    state: CacheState,
    high_water: u64,
    reallocations: u64,
}

impl<B> BufferCache<B> {
    pub fn new(kind: BufferKind, config: BufferCacheConfig) -> Self {
        Self {
            kind,
            config,
            buffer: None,
            capacity: 0,
            staging: Vec::new(),
            state: CacheState::Empty,
            high_water: 0,
            reallocations: 0,
        }
    }

    #[inline]
    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    #[inline]
    pub fn state(&self) -> CacheState {
        self.state
    }

    /// Capacity of the current device buffer, in bytes.
    #[inline]
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Largest reservation seen since creation or the last release.
    #[inline]
    pub fn high_water_mark(&self) -> u64 {
        self.high_water
    }

    /// Number of device buffers created so far.
    #[inline]
    pub fn reallocations(&self) -> u64 {
        self.reallocations
    }

    #[inline]
    pub fn buffer(&self) -> Option<&B> {
        self.buffer.as_ref()
    }

    /// Bytes staged by the current or last write pass.
    #[inline]
    pub fn staged(&self) -> &[u8] {
        &self.staging
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.state == CacheState::Ready
    }

    fn invalid(&self, operation: &'static str) -> RenderError {
        RenderError::InvalidState { operation, state: self.state.name() }
    }

    /// Ensures capacity for `bytes`.
    ///
    /// A request that does not fit replaces the device buffer with a larger
    /// one. On failure the previous buffer stays in place.
    pub fn reserve<D>(&mut self, device: &mut D, bytes: u64) -> Result<()>
    where
        D: RenderDevice<Buffer = B>,
    {
        if self.state == CacheState::Writing {
            return Err(self.invalid("reserve"));
        }

        self.high_water = self.high_water.max(bytes);

        let additional = (bytes as usize).saturating_sub(self.staging.len());
        self.staging
            .try_reserve(additional)
            .map_err(|_| RenderError::AllocationFailure { requested: bytes as usize })?;

        if self.buffer.is_some() && bytes <= self.capacity {
            if self.state == CacheState::Empty {
                self.state = CacheState::Sized;
            }
            return Ok(());
        }

        let new_capacity = self
            .config
            .growth
            .grow(bytes)
            .max(self.config.min_capacity_bytes)
            .max(self.capacity);
        // Device copies work on 4-byte granularity.
        let new_capacity = new_capacity.next_multiple_of(4);

        let buffer = device.create_buffer(self.kind, new_capacity)?;
        if let Some(old) = self.buffer.replace(buffer) {
            device.destroy_buffer(old);
        }

        log::debug!(
            "{:?} buffer cache grew {} -> {} bytes (requested {})",
            self.kind,
            self.capacity,
            new_capacity,
            bytes
        );

        self.capacity = new_capacity;
        self.reallocations += 1;
        self.state = CacheState::Sized;
        Ok(())
    }

    /// [`reserve`](Self::reserve) for `count` elements of `stride` bytes.
    pub fn reserve_for<D>(&mut self, device: &mut D, count: usize, stride: usize) -> Result<()>
    where
        D: RenderDevice<Buffer = B>,
    {
        let bytes = (count as u64)
            .checked_mul(stride as u64)
            .ok_or(RenderError::AllocationFailure { requested: count })?;
        self.reserve(device, bytes)
    }

    /// Opens the staging region for a full rewrite.
    pub fn map(&mut self) -> Result<()> {
        match self.state {
            CacheState::Sized | CacheState::Ready => {
                self.staging.clear();
                self.state = CacheState::Writing;
                Ok(())
            }
            _ => Err(self.invalid("map")),
        }
    }

    /// Appends one value to the staging region.
    ///
    /// Hot path: only valid while mapped, checked in debug builds.
    #[inline]
    pub fn push<T: Pod>(&mut self, value: &T) {
        debug_assert_eq!(self.state, CacheState::Writing, "push outside of map/unmap");
        self.staging.extend_from_slice(bytemuck::bytes_of(value));
    }

    /// Appends raw bytes to the staging region.
    pub fn write(&mut self, bytes: &[u8]) -> Result<()> {
        if self.state != CacheState::Writing {
            return Err(self.invalid("write"));
        }
        self.staging.extend_from_slice(bytes);
        Ok(())
    }

    /// Uploads the staged bytes and marks the buffer ready to draw.
    ///
    /// Returns the number of bytes uploaded. Staging more than the reserved
    /// capacity is a contract violation of the writer.
    pub fn unmap<D>(&mut self, device: &mut D) -> Result<u64>
    where
        D: RenderDevice<Buffer = B>,
    {
        if self.state != CacheState::Writing {
            return Err(self.invalid("unmap"));
        }

        let len = self.staging.len() as u64;
        if len > self.capacity {
            self.abort();
            return Err(RenderError::ProgrammingError(format!(
                "{} bytes staged into a {} byte {:?} buffer",
                len, self.capacity, self.kind
            )));
        }

        if let Some(buffer) = self.buffer.as_ref() {
            if len > 0 {
                device.write_buffer(buffer, 0, &self.staging);
            }
        }

        self.state = CacheState::Ready;
        Ok(len)
    }

    /// Abandons a write pass; the device buffer content is undefined afterwards.
    pub fn abort(&mut self) {
        self.staging.clear();
        self.state = if self.buffer.is_some() { CacheState::Sized } else { CacheState::Empty };
    }

    /// Frees the device buffer and the staging memory.
    ///
    /// Only called on deliberate teardown.
    pub fn release<D>(&mut self, device: &mut D)
    where
        D: RenderDevice<Buffer = B>,
    {
        if let Some(buffer) = self.buffer.take() {
            device.destroy_buffer(buffer);
        }
        self.staging = Vec::new();
        self.capacity = 0;
        self.high_water = 0;
        self.state = CacheState::Empty;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::HeadlessDevice;
    use proptest::prelude::*;

    fn cache() -> BufferCache<crate::render::HeadlessBuffer> {
        BufferCache::new(BufferKind::Vertex, BufferCacheConfig::default())
    }

    // ── reserve ───────────────────────────────────────────────────────────

    #[test]
    fn first_reserve_respects_minimum() {
        let mut dev = HeadlessDevice::new();
        let mut c = cache();
        assert_eq!(c.state(), CacheState::Empty);

        c.reserve(&mut dev, 10).unwrap();
        assert_eq!(c.state(), CacheState::Sized);
        assert_eq!(c.capacity(), 1024);
    }

    #[test]
    fn reserve_doubles_to_power_of_two() {
        let mut dev = HeadlessDevice::new();
        let mut c = cache();
        c.reserve(&mut dev, 3000).unwrap();
        assert_eq!(c.capacity(), 4096);
        assert_eq!(dev.live_buffer_count(), 1);
    }

    #[test]
    fn exact_growth_uses_request() {
        let mut dev = HeadlessDevice::new();
        let mut c = BufferCache::new(
            BufferKind::Vertex,
            BufferCacheConfig { min_capacity_bytes: 0, growth: GrowthPolicy::Exact },
        );
        c.reserve(&mut dev, 3000).unwrap();
        assert_eq!(c.capacity(), 3000);
    }

    #[test]
    fn reserve_for_multiplies_stride() {
        let mut dev = HeadlessDevice::new();
        let mut c = cache();
        c.reserve_for(&mut dev, 100, 32).unwrap();
        assert_eq!(c.capacity(), 4096);
        assert_eq!(c.high_water_mark(), 3200);
    }

    #[test]
    fn smaller_request_keeps_buffer() {
        let mut dev = HeadlessDevice::new();
        let mut c = cache();
        c.reserve(&mut dev, 5000).unwrap();
        c.reserve(&mut dev, 100).unwrap();
        assert_eq!(c.capacity(), 8192);
        assert_eq!(c.reallocations(), 1);
    }

    #[test]
    fn growth_replaces_old_buffer() {
        let mut dev = HeadlessDevice::new();
        let mut c = cache();
        c.reserve(&mut dev, 1024).unwrap();
        c.reserve(&mut dev, 2048).unwrap();
        assert_eq!(dev.live_buffer_count(), 1);
        assert_eq!(dev.allocated_bytes(), 2048);
        assert_eq!(c.reallocations(), 2);
    }

    #[test]
    fn reserve_while_writing_is_invalid() {
        let mut dev = HeadlessDevice::new();
        let mut c = cache();
        c.reserve(&mut dev, 16).unwrap();
        c.map().unwrap();
        let err = c.reserve(&mut dev, 16).unwrap_err();
        assert_eq!(err, RenderError::InvalidState { operation: "reserve", state: "writing" });
    }

    #[test]
    fn device_exhaustion_keeps_previous_buffer() {
        let mut dev = HeadlessDevice::with_memory_limit(2048);
        let mut c = cache();
        c.reserve(&mut dev, 1024).unwrap();
        c.map().unwrap();
        c.write(&[7; 4]).unwrap();
        c.unmap(&mut dev).unwrap();

        let err = c.reserve(&mut dev, 4096).unwrap_err();
        assert!(matches!(err, RenderError::OutOfDeviceMemory { .. }));
        assert_eq!(c.capacity(), 1024);
        assert!(c.buffer().is_some());
        assert_eq!(c.state(), CacheState::Ready);
    }

    // ── map / unmap ───────────────────────────────────────────────────────

    #[test]
    fn map_requires_reserve() {
        let mut c = cache();
        assert_eq!(
            c.map().unwrap_err(),
            RenderError::InvalidState { operation: "map", state: "empty" }
        );
    }

    #[test]
    fn unmap_uploads_staged_bytes() {
        let mut dev = HeadlessDevice::new();
        let mut c = cache();
        c.reserve(&mut dev, 8).unwrap();
        c.map().unwrap();
        c.push(&1u32);
        c.push(&2u32);
        assert_eq!(c.unmap(&mut dev).unwrap(), 8);
        assert!(c.is_ready());

        let bytes = dev.buffer_contents(c.buffer().unwrap()).unwrap();
        assert_eq!(&bytes[..8], bytemuck::cast_slice::<u32, u8>(&[1, 2]));
    }

    #[test]
    fn rewrite_starts_from_offset_zero() {
        let mut dev = HeadlessDevice::new();
        let mut c = cache();
        c.reserve(&mut dev, 8).unwrap();
        c.map().unwrap();
        c.push(&[9u32, 9u32]);
        c.unmap(&mut dev).unwrap();

        c.map().unwrap();
        c.push(&5u32);
        c.unmap(&mut dev).unwrap();
        assert_eq!(c.staged(), bytemuck::bytes_of(&5u32));
    }

    #[test]
    fn overfilled_staging_is_a_programming_error() {
        let mut dev = HeadlessDevice::new();
        let mut c = BufferCache::new(
            BufferKind::Vertex,
            BufferCacheConfig { min_capacity_bytes: 0, growth: GrowthPolicy::Exact },
        );
        c.reserve(&mut dev, 4).unwrap();
        c.map().unwrap();
        c.push(&[1u32, 2u32]);
        assert!(matches!(c.unmap(&mut dev), Err(RenderError::ProgrammingError(_))));
        assert_eq!(c.state(), CacheState::Sized);
    }

    // ── release ───────────────────────────────────────────────────────────

    #[test]
    fn release_returns_to_empty() {
        let mut dev = HeadlessDevice::new();
        let mut c = cache();
        c.reserve(&mut dev, 4000).unwrap();
        c.release(&mut dev);
        assert_eq!(c.state(), CacheState::Empty);
        assert_eq!(c.capacity(), 0);
        assert_eq!(dev.live_buffer_count(), 0);

        c.reserve(&mut dev, 10).unwrap();
        assert_eq!(c.capacity(), 1024);
    }

    proptest! {
        #[test]
        fn capacity_never_shrinks(requests in proptest::collection::vec(0u64..100_000, 1..40)) {
            let mut dev = HeadlessDevice::new();
            let mut c = cache();
            let mut previous = 0;
            for r in requests {
                c.reserve(&mut dev, r).unwrap();
                prop_assert!(c.capacity() >= previous);
                prop_assert!(c.capacity() >= r);
                previous = c.capacity();
            }
        }
    }
}
