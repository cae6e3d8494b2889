use crate::coords::Viewport;

/// Per-frame parameters forwarded to every draw.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct RenderParams {
    /// Monotonic frame counter of the caller.
    pub frame_index: u64,
    /// Overrides the device viewport when set.
    pub viewport: Option<Viewport>,
}

impl RenderParams {
    #[inline]
    pub const fn new(frame_index: u64) -> Self {
        Self { frame_index, viewport: None }
    }

    #[inline]
    pub const fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = Some(viewport);
        self
    }
}
