use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_MATERIAL_ID: AtomicU64 = AtomicU64::new(1);

pub(super) fn premul_alpha_blend() -> wgpu::BlendState {
    wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
    }
}

/// Shader + blend state + optional texture bindings used by a layer.
///
/// Shaders get the renderer's uniforms at group 0 (see
/// [`ParticleUniforms`](super::ParticleUniforms)) and the material's texture
/// bind group, when present, at group 1. Entry points are `vs_main` and
/// `fs_main`.
#[derive(Debug)]
pub struct ParticleMaterial {
    id: u64,
    label: String,
    shader: wgpu::ShaderModule,
    blend: Option<wgpu::BlendState>,
    texture_layout: Option<wgpu::BindGroupLayout>,
    texture_bind_group: Option<wgpu::BindGroup>,
}

impl ParticleMaterial {
    /// Vertex colors only. Expects position at location 0 and color at location 2.
    pub fn colored(device: &wgpu::Device) -> Self {
        Self::from_wgsl(device, "ember particle colored", include_str!("shaders/particle.wgsl"))
    }

    /// Texture array sampled with the location 1 texcoords (`u`, `v`, layer),
    /// modulated by the vertex color.
    ///
    /// `view` must be a `D2Array` view; a single texture is a one-layer array.
    pub fn textured(device: &wgpu::Device, view: &wgpu::TextureView, sampler: &wgpu::Sampler) -> Self {
        let mut material = Self::from_wgsl(
            device,
            "ember particle textured",
            include_str!("shaders/particle_textured.wgsl"),
        );

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("ember particle texture bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2Array,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("ember particle texture bind group"),
            layout: &layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });

        material.texture_layout = Some(layout);
        material.texture_bind_group = Some(bind_group);
        material
    }

    /// Custom shader without texture bindings.
    pub fn from_wgsl(device: &wgpu::Device, label: &str, source: &str) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        Self {
            id: NEXT_MATERIAL_ID.fetch_add(1, Ordering::Relaxed),
            label: label.to_string(),
            shader,
            blend: Some(premul_alpha_blend()),
            texture_layout: None,
            texture_bind_group: None,
        }
    }

    /// `None` disables blending.
    pub fn with_blend(mut self, blend: Option<wgpu::BlendState>) -> Self {
        self.blend = blend;
        self
    }

    /// Unique per material; pipelines are cached under it.
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[inline]
    pub fn shader(&self) -> &wgpu::ShaderModule {
        &self.shader
    }

    #[inline]
    pub fn blend(&self) -> Option<wgpu::BlendState> {
        self.blend
    }

    #[inline]
    pub fn texture_layout(&self) -> Option<&wgpu::BindGroupLayout> {
        self.texture_layout.as_ref()
    }

    #[inline]
    pub fn texture_bind_group(&self) -> Option<&wgpu::BindGroup> {
        self.texture_bind_group.as_ref()
    }
}

/// Linear clamp-to-edge sampler for atlas textures.
pub fn linear_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("ember particle sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::MipmapFilterMode::Nearest,
        ..Default::default()
    })
}
