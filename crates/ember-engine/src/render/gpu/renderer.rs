use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};

use crate::coords::{ColorRgba, Viewport};
use crate::error::{RenderError, Result};
use crate::render::{BufferKind, DrawCall, RenderDevice, Topology, UniformProvider, VertexDeclaration};

use super::{ParticleMaterial, RenderCtx, RenderTarget};

/// Group 0 uniform block shared by every particle shader (32 bytes).
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct ParticleUniforms {
    /// Logical viewport size.
    pub viewport: [f32; 2],
    /// World position at the center of the screen.
    pub camera: [f32; 2],
    pub tint: [f32; 4],
}

impl ParticleUniforms {
    /// Reads `camera` (vec2) and `tint` (vec4) from the provider; missing
    /// values fall back to the origin and white.
    pub fn resolve(viewport: Viewport, uniforms: &dyn UniformProvider) -> Self {
        Self {
            viewport: viewport.to_uniform(),
            camera: uniforms.vec2("camera").unwrap_or([0.0, 0.0]),
            tint: uniforms.vec4("tint").unwrap_or(ColorRgba::white().to_array()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PipelineKey {
    material: u64,
    topology: Topology,
    declaration: VertexDeclaration,
    format: wgpu::TextureFormat,
}

/// Uniform slots reserved per frame before the first draw.
const MIN_UNIFORM_SLOTS: u64 = 16;

fn uniform_slot_size(alignment: u32) -> u64 {
    (std::mem::size_of::<ParticleUniforms>() as u64).next_multiple_of(alignment.max(1) as u64)
}

/// [`RenderDevice`] backed by wgpu.
///
/// Buffers are plain `wgpu::Buffer`s; pipelines are created lazily per
/// (material, topology, vertex layout, target format). Per-draw uniforms go
/// into a ring of dynamically offset slots that is rewound every frame.
///
/// Draws outside of `begin_frame`/`end_frame` are dropped.
pub struct WgpuRenderer {
    ctx: RenderCtx,

    uniform_layout: wgpu::BindGroupLayout,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    /// Keys whose pipeline failed validation, with the reason.
    rejected: HashMap<PipelineKey, String>,

    uniform_ubo: Option<wgpu::Buffer>,
    uniform_bind_group: Option<wgpu::BindGroup>,
    uniform_slots: u64,
    uniform_cursor: u64,
    slot_size: u64,

    target: Option<RenderTarget>,

    live_bytes: u64,
    memory_budget: Option<u64>,
    warned_no_frame: bool,
}

impl WgpuRenderer {
    pub fn new(ctx: RenderCtx) -> Self {
        let uniform_layout = ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("ember particle uniforms bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<ParticleUniforms>() as u64),
                },
                count: None,
            }],
        });
        let slot_size = uniform_slot_size(ctx.device.limits().min_uniform_buffer_offset_alignment);

        Self {
            ctx,
            uniform_layout,
            pipelines: HashMap::new(),
            rejected: HashMap::new(),
            uniform_ubo: None,
            uniform_bind_group: None,
            uniform_slots: 0,
            uniform_cursor: 0,
            slot_size,
            target: None,
            live_bytes: 0,
            memory_budget: None,
            warned_no_frame: false,
        }
    }

    /// Caps the bytes of live vertex/index buffers; growth beyond it fails
    /// with `OutOfDeviceMemory`.
    pub fn with_memory_budget(mut self, bytes: u64) -> Self {
        self.memory_budget = Some(bytes);
        self
    }

    #[inline]
    pub fn ctx(&self) -> &RenderCtx {
        &self.ctx
    }

    /// Bytes held by buffers created through this renderer.
    #[inline]
    pub fn live_buffer_bytes(&self) -> u64 {
        self.live_bytes
    }

    #[inline]
    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    pub fn set_viewport(&mut self, viewport: Viewport, scale_factor: f32) {
        self.ctx.viewport = viewport;
        self.ctx.scale_factor = scale_factor;
    }

    /// Pipelines built for another format are dropped.
    pub fn set_surface_format(&mut self, format: wgpu::TextureFormat) {
        if self.ctx.surface_format != format {
            self.ctx.surface_format = format;
            self.pipelines.clear();
            self.rejected.clear();
        }
    }

    /// Opens a frame drawing into `color_view`.
    pub fn begin_frame(&mut self, color_view: wgpu::TextureView) {
        let encoder = self.ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("ember particle frame"),
        });
        self.begin_frame_with(RenderTarget::new(encoder, color_view));
    }

    pub fn begin_frame_with(&mut self, target: RenderTarget) {
        if self.target.is_some() {
            log::warn!("begin_frame while a frame is open; the previous frame is discarded");
        }
        self.target = Some(target);
        self.uniform_cursor = 0;
    }

    #[inline]
    pub fn in_frame(&self) -> bool {
        self.target.is_some()
    }

    /// Clears the frame target to `color`.
    pub fn clear(&mut self, color: ColorRgba) {
        let Some(target) = self.target.as_mut() else { return };
        let _ = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("ember clear pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: color.r as f64,
                        g: color.g as f64,
                        b: color.b as f64,
                        a: color.a as f64,
                    }),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
    }

    /// Closes the frame and returns its command buffer.
    pub fn end_frame(&mut self) -> Option<wgpu::CommandBuffer> {
        self.target.take().map(|t| t.encoder.finish())
    }

    /// Closes the frame and submits it. Returns `false` when no frame was open.
    pub fn submit(&mut self) -> bool {
        match self.end_frame() {
            Some(commands) => {
                self.ctx.queue.submit(std::iter::once(commands));
                true
            }
            None => false,
        }
    }

    /// Builds the pipeline for `key` unless it is cached.
    ///
    /// A vertex layout the material's shader cannot consume fails wgpu
    /// validation; that is caught in an error scope and reported as
    /// `ProgrammingError` instead of reaching the uncaptured error handler.
    fn ensure_pipeline(&mut self, key: &PipelineKey, material: &ParticleMaterial) -> Result<()> {
        if self.pipelines.contains_key(key) {
            return Ok(());
        }
        if let Some(reason) = self.rejected.get(key) {
            return Err(pipeline_error(material, reason));
        }

        let scope = self.ctx.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let mut layouts = vec![&self.uniform_layout];
        if let Some(texture_layout) = material.texture_layout() {
            layouts.push(texture_layout);
        }

        let pipeline_layout = self.ctx.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("ember particle pipeline layout"),
            bind_group_layouts: &layouts,
            immediate_size: 0,
        });

        let attributes = key.declaration.wgpu_attributes();
        let vertex_layout = wgpu::VertexBufferLayout {
            array_stride: key.declaration.stride() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &attributes,
        };

        let pipeline = self.ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(material.label()),
            layout: Some(&pipeline_layout),

            vertex: wgpu::VertexState {
                module: material.shader(),
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[vertex_layout],
            },

            fragment: Some(wgpu::FragmentState {
                module: material.shader(),
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: key.format,
                    blend: material.blend(),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: wgpu::PrimitiveState {
                topology: key.topology.to_wgpu(),
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        if let Some(err) = pollster::block_on(scope.pop()) {
            let reason = err.to_string();
            log::debug!("particle pipeline for material `{}` rejected: {}", material.label(), reason);
            let err = pipeline_error(material, &reason);
            self.rejected.insert(key.clone(), reason);
            return Err(err);
        }

        log::debug!(
            "created particle pipeline for material `{}` ({:?}, stride {})",
            material.label(),
            key.topology,
            key.declaration.stride()
        );
        self.pipelines.insert(key.clone(), pipeline);
        Ok(())
    }

    fn ensure_uniform_capacity(&mut self, required_slots: u64) {
        if required_slots <= self.uniform_slots && self.uniform_ubo.is_some() {
            return;
        }

        let slots = required_slots.next_power_of_two().max(MIN_UNIFORM_SLOTS);
        let ubo = self.ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("ember particle uniforms"),
            size: slots * self.slot_size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = self.ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("ember particle uniforms bind group"),
            layout: &self.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &ubo,
                    offset: 0,
                    size: wgpu::BufferSize::new(std::mem::size_of::<ParticleUniforms>() as u64),
                }),
            }],
        });

        self.uniform_ubo = Some(ubo);
        self.uniform_bind_group = Some(bind_group);
        self.uniform_slots = slots;
    }

    /// Writes `data` into the next free slot and returns its dynamic offset.
    fn push_uniforms(&mut self, data: &ParticleUniforms) -> Option<u32> {
        // A replaced ring keeps earlier slots alive in already recorded passes,
        // so the cursor keeps counting into the new buffer.
        self.ensure_uniform_capacity(self.uniform_cursor + 1);
        let ubo = self.uniform_ubo.as_ref()?;

        let offset = self.uniform_cursor * self.slot_size;
        self.ctx.queue.write_buffer(ubo, offset, bytemuck::bytes_of(data));
        self.uniform_cursor += 1;
        u32::try_from(offset).ok()
    }
}

impl RenderDevice for WgpuRenderer {
    type Buffer = wgpu::Buffer;
    type Material = ParticleMaterial;

    fn create_buffer(&mut self, kind: BufferKind, size_bytes: u64) -> Result<wgpu::Buffer> {
        let size = size_bytes
            .next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT)
            .max(wgpu::COPY_BUFFER_ALIGNMENT);

        let over_budget = self
            .memory_budget
            .is_some_and(|budget| self.live_bytes.saturating_add(size) > budget);
        if size > self.ctx.device.limits().max_buffer_size || over_budget {
            return Err(RenderError::OutOfDeviceMemory { requested_bytes: size_bytes });
        }

        let (label, usage) = match kind {
            BufferKind::Vertex => ("ember particle vbo", wgpu::BufferUsages::VERTEX),
            BufferKind::Index => ("ember particle ibo", wgpu::BufferUsages::INDEX),
        };
        let buffer = self.ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: usage | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        self.live_bytes += size;
        Ok(buffer)
    }

    fn destroy_buffer(&mut self, buffer: wgpu::Buffer) {
        self.live_bytes = self.live_bytes.saturating_sub(buffer.size());
        buffer.destroy();
    }

    fn write_buffer(&mut self, buffer: &wgpu::Buffer, offset: u64, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        let padded = (bytes.len() as u64).next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT) as usize;
        if padded == bytes.len() {
            self.ctx.queue.write_buffer(buffer, offset, bytes);
        } else {
            let mut data = Vec::with_capacity(padded);
            data.extend_from_slice(bytes);
            data.resize(padded, 0);
            self.ctx.queue.write_buffer(buffer, offset, &data);
        }
    }

    fn draw(
        &mut self,
        call: &DrawCall<'_, wgpu::Buffer>,
        material: &ParticleMaterial,
        uniforms: &dyn UniformProvider,
    ) -> Result<()> {
        if self.target.is_none() {
            if !self.warned_no_frame {
                log::warn!("particle draw outside of begin_frame/end_frame ignored");
                self.warned_no_frame = true;
            }
            return Ok(());
        }

        let key = PipelineKey {
            material: material.id(),
            topology: call.topology(),
            declaration: call.declaration.clone(),
            format: self.ctx.surface_format,
        };
        self.ensure_pipeline(&key, material)?;

        let viewport = call.params.viewport.unwrap_or(self.ctx.viewport);
        let Some(dynamic_offset) = self.push_uniforms(&ParticleUniforms::resolve(viewport, uniforms)) else {
            return Ok(());
        };

        let Some(pipeline) = self.pipelines.get(&key) else { return Ok(()) };
        let Some(bind_group) = self.uniform_bind_group.as_ref() else { return Ok(()) };
        let Some(target) = self.target.as_mut() else { return Ok(()) };

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("ember particle pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, bind_group, &[dynamic_offset]);
        if let Some(textures) = material.texture_bind_group() {
            rpass.set_bind_group(1, textures, &[]);
        }
        rpass.set_vertex_buffer(0, call.vertex_buffer.slice(..));

        match call.index_buffer {
            Some(indices) if call.is_indexed() => {
                // Indices are absolute within the vertex buffer.
                rpass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
                rpass.draw_indexed(call.first_index..call.first_index + call.index_count, 0, 0..1);
            }
            _ => {
                rpass.draw(call.first_vertex..call.first_vertex + call.vertex_count, 0..1);
            }
        }
        Ok(())
    }
}

fn pipeline_error(material: &ParticleMaterial, reason: &str) -> RenderError {
    RenderError::ProgrammingError(format!(
        "material `{}` cannot draw this vertex layout: {}",
        material.label(),
        reason
    ))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::particle::{DefaultPolicy, LayerConfig, ParticleLayer, ParticlePolicy};
    use crate::render::gpu::{HeadlessGpu, HeadlessGpuInit};
    use crate::render::{NoUniforms, RenderParams, UniformMap, UniformValue, VertexFormat, VertexSemantic};

    /// Position-only vertices: no color for the colored shader to read.
    struct Points;

    impl ParticlePolicy for Points {
        type Particle = ();
        type Vertex = [f32; 2];

        fn vertex_declaration(&self) -> VertexDeclaration {
            VertexDeclaration::new().with(VertexSemantic::Position, VertexFormat::Float32x2)
        }

        fn update_particle(&self, _p: &mut (), _dt: f32) -> bool {
            true
        }

        fn particle_to_vertices(&self, _p: &()) -> [[f32; 2]; 4] {
            [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]
        }
    }

    #[test]
    fn uniforms_fill_missing_values() {
        let u = ParticleUniforms::resolve(Viewport::new(800.0, 600.0), &NoUniforms);
        assert_eq!(u.viewport, [800.0, 600.0]);
        assert_eq!(u.camera, [0.0, 0.0]);
        assert_eq!(u.tint, [1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn uniforms_read_camera_and_tint() {
        let map = UniformMap::new()
            .with("camera", UniformValue::Vec2([10.0, -4.0]))
            .with("tint", UniformValue::Vec4([0.5, 0.5, 0.5, 1.0]));
        let u = ParticleUniforms::resolve(Viewport::new(0.0, 0.0), &map);
        assert_eq!(u.viewport, [1.0, 1.0]);
        assert_eq!(u.camera, [10.0, -4.0]);
        assert_eq!(u.tint[0], 0.5);
    }

    #[test]
    fn uniform_block_is_32_bytes() {
        assert_eq!(std::mem::size_of::<ParticleUniforms>(), 32);
    }

    #[test]
    fn slot_size_respects_offset_alignment() {
        assert_eq!(uniform_slot_size(256), 256);
        assert_eq!(uniform_slot_size(16), 32);
        assert_eq!(uniform_slot_size(0), 32);
    }

    // ── offscreen ─────────────────────────────────────────────────────────

    #[test]
    fn layer_draws_offscreen_when_an_adapter_exists() {
        let Ok(gpu) = HeadlessGpu::new_blocking(HeadlessGpuInit::default()) else {
            return;
        };
        let format = wgpu::TextureFormat::Rgba8Unorm;
        let (_texture, view) = gpu.create_target(64, 64, format).unwrap();

        let mut renderer = WgpuRenderer::new(gpu.render_ctx(format, Viewport::new(64.0, 64.0)));
        let material = Arc::new(ParticleMaterial::colored(gpu.device()));
        let mut layer =
            ParticleLayer::<DefaultPolicy, WgpuRenderer>::new(DefaultPolicy, material, LayerConfig::default())
                .unwrap();
        layer.spawn_particles(3, true).unwrap();

        renderer.begin_frame(view);
        renderer.clear(ColorRgba::black());
        assert_eq!(layer.display(&mut renderer, &NoUniforms, &RenderParams::new(0)).unwrap(), 3);
        assert_eq!(layer.display(&mut renderer, &NoUniforms, &RenderParams::new(0)).unwrap(), 3);
        assert_eq!(renderer.pipeline_count(), 1);
        assert!(renderer.submit());
        assert!(renderer.live_buffer_bytes() > 0);

        layer.release_buffers(&mut renderer);
        assert_eq!(renderer.live_buffer_bytes(), 0);
    }

    #[test]
    fn incompatible_layout_is_reported_not_panicked() {
        let Ok(gpu) = HeadlessGpu::new_blocking(HeadlessGpuInit::default()) else {
            return;
        };
        let format = wgpu::TextureFormat::Rgba8Unorm;
        let (_texture, view) = gpu.create_target(16, 16, format).unwrap();

        let mut renderer = WgpuRenderer::new(gpu.render_ctx(format, Viewport::new(16.0, 16.0)));
        let mut layer = ParticleLayer::<Points, WgpuRenderer>::new(
            Points,
            Arc::new(ParticleMaterial::colored(gpu.device())),
            LayerConfig::labeled("points"),
        )
        .unwrap();
        layer.spawn_particles(1, true).unwrap();

        renderer.begin_frame(view);
        for _ in 0..2 {
            let err = layer.display(&mut renderer, &NoUniforms, &RenderParams::new(0)).unwrap_err();
            assert!(err.is_programming_error());
        }
        assert_eq!(renderer.pipeline_count(), 0);
        assert!(renderer.submit());
    }

    #[test]
    fn draw_outside_frame_is_ignored() {
        let Ok(gpu) = HeadlessGpu::new_blocking(HeadlessGpuInit::default()) else {
            return;
        };
        let format = wgpu::TextureFormat::Rgba8Unorm;
        let mut renderer = WgpuRenderer::new(gpu.render_ctx(format, Viewport::new(64.0, 64.0)));
        let mut layer = ParticleLayer::<DefaultPolicy, WgpuRenderer>::new(
            DefaultPolicy,
            Arc::new(ParticleMaterial::colored(gpu.device())),
            LayerConfig::default(),
        )
        .unwrap();
        layer.spawn_particles(1, true).unwrap();

        assert!(!renderer.in_frame());
        layer.display(&mut renderer, &NoUniforms, &RenderParams::new(0)).unwrap();
        assert_eq!(renderer.pipeline_count(), 0);
        assert!(!renderer.submit());
    }
}
