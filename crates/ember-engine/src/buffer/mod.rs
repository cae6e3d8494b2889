//! Device buffers reused across frames.
//!
//! A [`BufferCache`] owns one device buffer plus a host staging region and
//! only ever grows. A [`DynamicMesh`] pairs a vertex cache with an index cache
//! and remembers the draw ranges of the last rebuild so unchanged frames can
//! redraw without touching particles.

mod cache;
mod dynamic_mesh;

pub use cache::{BufferCache, BufferCacheConfig, CacheState, GrowthPolicy};
pub use dynamic_mesh::{DynamicMesh, MeshElement};
