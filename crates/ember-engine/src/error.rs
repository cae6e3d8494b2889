//! Error taxonomy for the particle-to-vertex path.
//!
//! Failures are scoped to one layer and one frame: the manager logs them and
//! keeps rendering the other layers.

/// Result alias used across the engine core.
pub type Result<T> = std::result::Result<T, RenderError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    /// Accessor or handle misuse.
    #[error("index {index} out of range (len {len})")]
    OutOfRange { index: usize, len: usize },

    /// Host memory could not be reserved for particles or staging data.
    #[error("host allocation of {requested} elements failed")]
    AllocationFailure { requested: usize },

    /// Buffer cache protocol violation (e.g. reserving while mapped).
    #[error("`{operation}` is not allowed while the buffer cache is {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },

    /// The device refused a buffer of the requested size.
    #[error("device could not allocate {requested_bytes} bytes")]
    OutOfDeviceMemory { requested_bytes: u64 },

    /// A policy or output broke its contract.
    #[error("programming error: {0}")]
    ProgrammingError(String),
}

impl RenderError {
    /// Recoverable errors make the layer skip this frame and retry on the next.
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            RenderError::AllocationFailure { .. } | RenderError::OutOfDeviceMemory { .. }
        )
    }

    /// Programmer bugs: asserted in debug builds, skipped in release builds.
    #[inline]
    pub fn is_programming_error(&self) -> bool {
        matches!(
            self,
            RenderError::OutOfRange { .. } | RenderError::ProgrammingError(_)
        )
    }
}
