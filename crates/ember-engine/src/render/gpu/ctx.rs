use crate::coords::Viewport;

/// Device/queue handles plus the output format and logical viewport.
#[derive(Debug, Clone)]
pub struct RenderCtx {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub surface_format: wgpu::TextureFormat,
    /// Logical pixels.
    pub viewport: Viewport,
    /// Physical pixels per logical pixel.
    pub scale_factor: f32,
}

impl RenderCtx {
    #[inline]
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        viewport: Viewport,
    ) -> Self {
        Self {
            device,
            queue,
            surface_format,
            viewport,
            scale_factor: 1.0,
        }
    }

    #[inline]
    pub fn with_scale_factor(mut self, scale_factor: f32) -> Self {
        self.scale_factor = scale_factor;
        self
    }
}

/// Where one frame is recorded: an encoder and the color view it targets.
#[derive(Debug)]
pub struct RenderTarget {
    pub encoder: wgpu::CommandEncoder,
    pub color_view: wgpu::TextureView,
}

impl RenderTarget {
    #[inline]
    pub fn new(encoder: wgpu::CommandEncoder, color_view: wgpu::TextureView) -> Self {
        Self { encoder, color_view }
    }
}
