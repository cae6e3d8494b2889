use anyhow::{Context, Result};

use crate::coords::Viewport;

use super::RenderCtx;

/// Initialization parameters for [`HeadlessGpu`].
#[derive(Debug, Clone)]
pub struct HeadlessGpuInit {
    pub backends: wgpu::Backends,
    pub power_preference: wgpu::PowerPreference,
    /// Favor an empty set for portability.
    pub required_features: wgpu::Features,
    pub required_limits: wgpu::Limits,
}

impl Default for HeadlessGpuInit {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            power_preference: wgpu::PowerPreference::HighPerformance,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
        }
    }
}

/// wgpu device without a surface, rendering into offscreen textures.
///
/// Used by tools and tests that need real GPU output without a window.
pub struct HeadlessGpu {
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
}

impl HeadlessGpu {
    pub async fn new(init: HeadlessGpuInit) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: init.backends,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: init.power_preference,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("ember-engine headless device"),
                required_features: init.required_features,
                required_limits: init.required_limits,
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        let info = adapter.get_info();
        log::info!("headless GPU: {} ({:?})", info.name, info.backend);

        Ok(Self { adapter, device, queue })
    }

    /// Blocks on [`new`](Self::new).
    pub fn new_blocking(init: HeadlessGpuInit) -> Result<Self> {
        pollster::block_on(Self::new(init))
    }

    #[inline]
    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    #[inline]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    #[inline]
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Context for a [`WgpuRenderer`](super::WgpuRenderer) drawing `format` targets.
    pub fn render_ctx(&self, format: wgpu::TextureFormat, viewport: Viewport) -> RenderCtx {
        RenderCtx::new(self.device.clone(), self.queue.clone(), format, viewport)
    }

    /// Offscreen color target of `width` x `height` physical pixels.
    pub fn create_target(
        &self,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
    ) -> Result<(wgpu::Texture, wgpu::TextureView)> {
        anyhow::ensure!(width > 0 && height > 0, "render target has zero size");

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("ember offscreen target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok((texture, view))
    }
}
