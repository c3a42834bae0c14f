use gpu::{Pass, RenderCommand, ShaderError, atmosphere_source, globe_day_night_source, globe_flat_source, starfield_source};
use scene::atmosphere::AtmosphereMaterial;
use scene::resources::{Blend, Material, SceneResources, Side, TextureRole};

/// Surface segments for every sphere mesh.
pub const SPHERE_LAT_SEGMENTS: u32 = 64;
pub const SPHERE_LON_SEGMENTS: u32 = 128;

const CLEAR_COLOR: ::wgpu::Color = ::wgpu::Color {
    r: 0.004,
    g: 0.008,
    b: 0.016,
    a: 1.0,
};

/// Which shader a mesh needs, with its baked constants as raw bits.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ShaderKey {
    DayNight { terminator_exponent: u32 },
    Flat { color: [u32; 3] },
    Starfield,
    Atmosphere { color: [u32; 3], c: u32, p: u32 },
}

impl ShaderKey {
    pub fn for_command(pass: Pass, material: Option<&Material>) -> Option<Self> {
        Some(match pass {
            Pass::GlobeDayNight { terminator_exponent } => ShaderKey::DayNight {
                terminator_exponent: terminator_exponent.to_bits(),
            },
            Pass::GlobeFlat { color } => ShaderKey::Flat {
                color: color.map(f32::to_bits),
            },
            Pass::Starfield => ShaderKey::Starfield,
            Pass::Atmosphere => {
                let Some(Material::Atmosphere(m)) = material else {
                    return None;
                };
                ShaderKey::Atmosphere {
                    color: m.color.map(f32::to_bits),
                    c: m.c.to_bits(),
                    p: m.p.to_bits(),
                }
            }
        })
    }

    pub fn source(&self) -> Result<String, ShaderError> {
        match *self {
            ShaderKey::DayNight { terminator_exponent } => {
                globe_day_night_source(f32::from_bits(terminator_exponent))
            }
            ShaderKey::Flat { color } => globe_flat_source(color.map(f32::from_bits)),
            ShaderKey::Starfield => starfield_source(),
            ShaderKey::Atmosphere { color, c, p } => atmosphere_source(&AtmosphereMaterial {
                color: color.map(f32::from_bits),
                c: f32::from_bits(c),
                p: f32::from_bits(p),
            }),
        }
    }

    /// Textures bound at group 1, in binding order.
    pub fn texture_roles(&self) -> &'static [TextureRole] {
        match self {
            ShaderKey::DayNight { .. } => &[TextureRole::Day, TextureRole::Night, TextureRole::Bump],
            ShaderKey::Starfield => &[TextureRole::Stars],
            ShaderKey::Flat { .. } | ShaderKey::Atmosphere { .. } => &[],
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub shader: ShaderKey,
    pub side: Side,
    pub blend: Blend,
}

impl PipelineKey {
    pub fn for_command(command: &RenderCommand, resources: &SceneResources) -> Option<Self> {
        let RenderCommand::Mesh {
            pass,
            material,
            side,
            blend,
            ..
        } = *command
        else {
            return None;
        };
        Some(Self {
            shader: ShaderKey::for_command(pass, resources.material(material))?,
            side,
            blend,
        })
    }
}

/// Front faces wind counter-clockwise on screen; a back-side mesh is seen
/// from inside.
pub fn cull_mode(side: Side) -> ::wgpu::Face {
    match side {
        Side::Front => ::wgpu::Face::Back,
        Side::Back => ::wgpu::Face::Front,
    }
}

pub fn blend_state(blend: Blend) -> ::wgpu::BlendState {
    match blend {
        Blend::Opaque => ::wgpu::BlendState::REPLACE,
        Blend::Alpha => ::wgpu::BlendState::ALPHA_BLENDING,
        Blend::Additive => {
            let additive = ::wgpu::BlendComponent {
                src_factor: ::wgpu::BlendFactor::SrcAlpha,
                dst_factor: ::wgpu::BlendFactor::One,
                operation: ::wgpu::BlendOperation::Add,
            };
            ::wgpu::BlendState {
                color: additive,
                alpha: additive,
            }
        }
    }
}

/// Only opaque meshes write depth.
pub fn writes_depth(blend: Blend) -> bool {
    blend == Blend::Opaque
}

/// Color maps are sRGB; the bump map holds heights.
pub fn texture_format(role: TextureRole) -> ::wgpu::TextureFormat {
    match role {
        TextureRole::Bump => ::wgpu::TextureFormat::Rgba8Unorm,
        TextureRole::Day | TextureRole::Night | TextureRole::Stars => ::wgpu::TextureFormat::Rgba8UnormSrgb,
    }
}

#[cfg(target_arch = "wasm32")]
mod imp {
    use super::{
        CLEAR_COLOR, PipelineKey, SPHERE_LAT_SEGMENTS, SPHERE_LON_SEGMENTS, ShaderKey, blend_state,
        cull_mode, texture_format, writes_depth,
    };
    use ::wgpu::util::DeviceExt;
    use foundation::handles::Handle;
    use gpu::mesh::{MarkerInstance, SurfaceVertex, sphere_mesh};
    use gpu::{RenderCommand, RenderFrame, markers_source};
    use scene::resources::{Material, Resource, SceneResources, TextureImage, TextureRole};
    use std::borrow::Cow;
    use std::collections::{HashMap, HashSet};
    use tracing::{debug, warn};
    use viewer::config::MarkerConfig;
    use wasm_bindgen::prelude::*;

    const DEPTH_FORMAT: ::wgpu::TextureFormat = ::wgpu::TextureFormat::Depth24Plus;

    struct SphereBuffers {
        vertices: ::wgpu::Buffer,
        indices: ::wgpu::Buffer,
        index_count: u32,
    }

    struct GpuTexture {
        // Keeps the pixel buffer alive so its key cannot be reused.
        _image: TextureImage,
        view: ::wgpu::TextureView,
    }

    struct MeshDraw {
        pipeline: PipelineKey,
        sphere: u64,
        material: Option<Handle>,
    }

    pub struct GpuBackend {
        _instance: &'static ::wgpu::Instance,
        surface: ::wgpu::Surface<'static>,
        device: ::wgpu::Device,
        queue: ::wgpu::Queue,
        config: ::wgpu::SurfaceConfiguration,
        depth_view: ::wgpu::TextureView,
        globals_buffer: ::wgpu::Buffer,
        globals_layout: ::wgpu::BindGroupLayout,
        globals_bind_group: ::wgpu::BindGroup,
        globe_textures_layout: ::wgpu::BindGroupLayout,
        stars_layout: ::wgpu::BindGroupLayout,
        sampler: ::wgpu::Sampler,
        pipelines: HashMap<PipelineKey, ::wgpu::RenderPipeline>,
        spheres: HashMap<u64, SphereBuffers>,
        textures: HashMap<usize, GpuTexture>,
        material_groups: HashMap<Handle, ::wgpu::BindGroup>,
        marker_pipeline: ::wgpu::RenderPipeline,
        marker_buffer: ::wgpu::Buffer,
        marker_capacity: usize,
    }

    fn create_depth_view(
        device: &::wgpu::Device,
        config: &::wgpu::SurfaceConfiguration,
    ) -> ::wgpu::TextureView {
        let tex = device.create_texture(&::wgpu::TextureDescriptor {
            label: Some("globe-depth"),
            size: ::wgpu::Extent3d {
                width: config.width.max(1),
                height: config.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: ::wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: ::wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        tex.create_view(&::wgpu::TextureViewDescriptor::default())
    }

    fn texture_entry(binding: u32) -> ::wgpu::BindGroupLayoutEntry {
        ::wgpu::BindGroupLayoutEntry {
            binding,
            visibility: ::wgpu::ShaderStages::FRAGMENT,
            ty: ::wgpu::BindingType::Texture {
                sample_type: ::wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: ::wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        }
    }

    fn sampler_entry(binding: u32) -> ::wgpu::BindGroupLayoutEntry {
        ::wgpu::BindGroupLayoutEntry {
            binding,
            visibility: ::wgpu::ShaderStages::FRAGMENT,
            ty: ::wgpu::BindingType::Sampler(::wgpu::SamplerBindingType::Filtering),
            count: None,
        }
    }

    fn marker_instance_capacity(needed: usize) -> usize {
        needed.next_power_of_two().max(16)
    }

    fn create_marker_buffer(device: &::wgpu::Device, capacity: usize) -> ::wgpu::Buffer {
        device.create_buffer(&::wgpu::BufferDescriptor {
            label: Some("globe-marker-instances"),
            size: (capacity * std::mem::size_of::<MarkerInstance>()) as u64,
            usage: ::wgpu::BufferUsages::VERTEX | ::wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    pub async fn init_gpu(
        canvas: web_sys::HtmlCanvasElement,
        markers: &MarkerConfig,
    ) -> Result<GpuBackend, JsValue> {
        let width = canvas.width();
        let height = canvas.height();

        // `wgpu::Surface` must not outlive its `wgpu::Instance`, so the
        // instance lives for the rest of the page.
        let instance: &'static ::wgpu::Instance = Box::leak(Box::new(::wgpu::Instance::new(
            &::wgpu::InstanceDescriptor {
                backends: ::wgpu::Backends::BROWSER_WEBGPU | ::wgpu::Backends::GL,
                ..Default::default()
            },
        )));

        let surface = instance
            .create_surface(::wgpu::SurfaceTarget::Canvas(canvas))
            .map_err(|e| JsValue::from_str(&format!("surface error: {e}")))?;

        let adapter = instance
            .request_adapter(&::wgpu::RequestAdapterOptions {
                power_preference: ::wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| JsValue::from_str(&format!("adapter error: {e}")))?;

        let (device, queue) = adapter
            .request_device(&::wgpu::DeviceDescriptor {
                label: Some("globe-device"),
                required_features: ::wgpu::Features::empty(),
                required_limits: ::wgpu::Limits::downlevel_webgl2_defaults(),
                ..Default::default()
            })
            .await
            .map_err(|e| JsValue::from_str(&format!("device error: {e}")))?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| JsValue::from_str("surface has no supported formats"))?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(::wgpu::CompositeAlphaMode::Auto);

        let config = ::wgpu::SurfaceConfiguration {
            usage: ::wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            desired_maximum_frame_latency: 2,
            present_mode: ::wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
        };
        surface.configure(&device, &config);
        let depth_view = create_depth_view(&device, &config);

        let globals_buffer = device.create_buffer(&::wgpu::BufferDescriptor {
            label: Some("globe-globals"),
            size: std::mem::size_of::<gpu::Globals>() as u64,
            usage: ::wgpu::BufferUsages::UNIFORM | ::wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let globals_layout = device.create_bind_group_layout(&::wgpu::BindGroupLayoutDescriptor {
            label: Some("globe-globals-bgl"),
            entries: &[::wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: ::wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: ::wgpu::BindingType::Buffer {
                    ty: ::wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let globals_bind_group = device.create_bind_group(&::wgpu::BindGroupDescriptor {
            label: Some("globe-globals-bg"),
            layout: &globals_layout,
            entries: &[::wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_buffer.as_entire_binding(),
            }],
        });

        let globe_textures_layout = device.create_bind_group_layout(&::wgpu::BindGroupLayoutDescriptor {
            label: Some("globe-surface-textures-bgl"),
            entries: &[texture_entry(0), texture_entry(1), texture_entry(2), sampler_entry(3)],
        });

        let stars_layout = device.create_bind_group_layout(&::wgpu::BindGroupLayoutDescriptor {
            label: Some("globe-stars-bgl"),
            entries: &[texture_entry(0), sampler_entry(1)],
        });

        // Longitude wraps; latitude stops at the poles.
        let sampler = device.create_sampler(&::wgpu::SamplerDescriptor {
            label: Some("globe-sampler"),
            address_mode_u: ::wgpu::AddressMode::Repeat,
            address_mode_v: ::wgpu::AddressMode::ClampToEdge,
            address_mode_w: ::wgpu::AddressMode::ClampToEdge,
            mag_filter: ::wgpu::FilterMode::Linear,
            min_filter: ::wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let marker_source = markers_source(markers.color, markers.highlight_color)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        let marker_shader = device.create_shader_module(::wgpu::ShaderModuleDescriptor {
            label: Some("globe-markers-shader"),
            source: ::wgpu::ShaderSource::Wgsl(Cow::Owned(marker_source)),
        });
        let marker_layout = device.create_pipeline_layout(&::wgpu::PipelineLayoutDescriptor {
            label: Some("globe-markers-pipeline-layout"),
            bind_group_layouts: &[&globals_layout],
            immediate_size: 0,
        });
        let marker_pipeline = device.create_render_pipeline(&::wgpu::RenderPipelineDescriptor {
            label: Some("globe-markers-pipeline"),
            layout: Some(&marker_layout),
            vertex: ::wgpu::VertexState {
                module: &marker_shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[::wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<MarkerInstance>() as ::wgpu::BufferAddress,
                    step_mode: ::wgpu::VertexStepMode::Instance,
                    attributes: &[
                        ::wgpu::VertexAttribute {
                            format: ::wgpu::VertexFormat::Float32x3,
                            offset: 0,
                            shader_location: 0,
                        },
                        ::wgpu::VertexAttribute {
                            format: ::wgpu::VertexFormat::Float32,
                            offset: 12,
                            shader_location: 1,
                        },
                    ],
                }],
            },
            fragment: Some(::wgpu::FragmentState {
                module: &marker_shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(::wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(::wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: ::wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: ::wgpu::PrimitiveState {
                topology: ::wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: ::wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: ::wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(::wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: false,
                depth_compare: ::wgpu::CompareFunction::LessEqual,
                stencil: ::wgpu::StencilState::default(),
                bias: ::wgpu::DepthBiasState::default(),
            }),
            multisample: ::wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        let marker_capacity = marker_instance_capacity(0);
        let marker_buffer = create_marker_buffer(&device, marker_capacity);

        debug!(?format, width, height, "gpu ready");
        Ok(GpuBackend {
            _instance: instance,
            surface,
            device,
            queue,
            config,
            depth_view,
            globals_buffer,
            globals_layout,
            globals_bind_group,
            globe_textures_layout,
            stars_layout,
            sampler,
            pipelines: HashMap::new(),
            spheres: HashMap::new(),
            textures: HashMap::new(),
            material_groups: HashMap::new(),
            marker_pipeline,
            marker_buffer,
            marker_capacity,
        })
    }

    impl GpuBackend {
        pub fn resize(&mut self, width: u32, height: u32) {
            self.config.width = width.max(1);
            self.config.height = height.max(1);
            self.surface.configure(&self.device, &self.config);
            self.depth_view = create_depth_view(&self.device, &self.config);
        }

        /// Drops GPU objects whose scene resources were released.
        pub fn sync(&mut self, released: &[Handle], resources: &SceneResources) {
            for handle in released {
                self.material_groups.remove(handle);
            }
            let live: HashSet<usize> = resources
                .iter()
                .filter_map(|(_, r)| match r {
                    Resource::Texture(t) => Some(t.pixel_key()),
                    _ => None,
                })
                .collect();
            let before = self.textures.len();
            self.textures.retain(|key, _| live.contains(key));
            if before != self.textures.len() {
                debug!(evicted = before - self.textures.len(), "gpu textures evicted");
            }
        }

        fn upload(&mut self, image: &TextureImage) -> usize {
            let key = image.pixel_key();
            if self.textures.contains_key(&key) {
                return key;
            }
            let size = ::wgpu::Extent3d {
                width: image.width(),
                height: image.height(),
                depth_or_array_layers: 1,
            };
            let texture = self.device.create_texture(&::wgpu::TextureDescriptor {
                label: Some("globe-texture"),
                size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: ::wgpu::TextureDimension::D2,
                format: texture_format(image.role()),
                usage: ::wgpu::TextureUsages::TEXTURE_BINDING | ::wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            });
            self.queue.write_texture(
                ::wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: 0,
                    origin: ::wgpu::Origin3d::ZERO,
                    aspect: ::wgpu::TextureAspect::All,
                },
                image.pixels(),
                ::wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * image.width()),
                    rows_per_image: Some(image.height()),
                },
                size,
            );
            let view = texture.create_view(&::wgpu::TextureViewDescriptor::default());
            self.textures.insert(
                key,
                GpuTexture {
                    _image: image.clone(),
                    view,
                },
            );
            key
        }

        fn material_textures(
            resources: &SceneResources,
            material: &Material,
            roles: &[TextureRole],
        ) -> Option<Vec<TextureImage>> {
            let handle_for = |role: TextureRole| match (material, role) {
                (Material::DayNight(m), TextureRole::Day) => Some(m.day),
                (Material::DayNight(m), TextureRole::Night) => Some(m.night),
                (Material::DayNight(m), TextureRole::Bump) => Some(m.bump),
                (Material::Starfield { texture, .. }, TextureRole::Stars) => Some(*texture),
                _ => None,
            };
            roles
                .iter()
                .map(|role| resources.texture(handle_for(*role)?).cloned())
                .collect()
        }

        fn ensure_material_group(
            &mut self,
            handle: Handle,
            shader: &ShaderKey,
            resources: &SceneResources,
        ) -> Option<Handle> {
            let roles = shader.texture_roles();
            if roles.is_empty() {
                return None;
            }
            if self.material_groups.contains_key(&handle) {
                return Some(handle);
            }
            let material = resources.material(handle)?;
            let images = Self::material_textures(resources, material, roles)?;
            let keys: Vec<usize> = images.iter().map(|img| self.upload(img)).collect();

            let layout = match shader {
                ShaderKey::DayNight { .. } => &self.globe_textures_layout,
                _ => &self.stars_layout,
            };
            let mut entries: Vec<::wgpu::BindGroupEntry> = keys
                .iter()
                .enumerate()
                .filter_map(|(i, key)| {
                    let tex = self.textures.get(key)?;
                    Some(::wgpu::BindGroupEntry {
                        binding: i as u32,
                        resource: ::wgpu::BindingResource::TextureView(&tex.view),
                    })
                })
                .collect();
            entries.push(::wgpu::BindGroupEntry {
                binding: keys.len() as u32,
                resource: ::wgpu::BindingResource::Sampler(&self.sampler),
            });
            let group = self.device.create_bind_group(&::wgpu::BindGroupDescriptor {
                label: Some("globe-material-bg"),
                layout,
                entries: &entries,
            });
            self.material_groups.insert(handle, group);
            Some(handle)
        }

        fn ensure_pipeline(&mut self, key: PipelineKey) -> Result<(), JsValue> {
            if self.pipelines.contains_key(&key) {
                return Ok(());
            }
            let source = key.shader.source().map_err(|e| JsValue::from_str(&e.to_string()))?;
            let shader = self.device.create_shader_module(::wgpu::ShaderModuleDescriptor {
                label: Some("globe-surface-shader"),
                source: ::wgpu::ShaderSource::Wgsl(Cow::Owned(source)),
            });
            let layouts: Vec<&::wgpu::BindGroupLayout> = match key.shader {
                ShaderKey::DayNight { .. } => vec![&self.globals_layout, &self.globe_textures_layout],
                ShaderKey::Starfield => vec![&self.globals_layout, &self.stars_layout],
                ShaderKey::Flat { .. } | ShaderKey::Atmosphere { .. } => vec![&self.globals_layout],
            };
            let layout = self.device.create_pipeline_layout(&::wgpu::PipelineLayoutDescriptor {
                label: Some("globe-surface-pipeline-layout"),
                bind_group_layouts: &layouts,
                immediate_size: 0,
            });
            let pipeline = self.device.create_render_pipeline(&::wgpu::RenderPipelineDescriptor {
                label: Some("globe-surface-pipeline"),
                layout: Some(&layout),
                vertex: ::wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &[::wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<SurfaceVertex>() as ::wgpu::BufferAddress,
                        step_mode: ::wgpu::VertexStepMode::Vertex,
                        attributes: &[
                            ::wgpu::VertexAttribute {
                                format: ::wgpu::VertexFormat::Float32x3,
                                offset: 0,
                                shader_location: 0,
                            },
                            ::wgpu::VertexAttribute {
                                format: ::wgpu::VertexFormat::Float32x3,
                                offset: 12,
                                shader_location: 1,
                            },
                            ::wgpu::VertexAttribute {
                                format: ::wgpu::VertexFormat::Float32x2,
                                offset: 24,
                                shader_location: 2,
                            },
                        ],
                    }],
                },
                fragment: Some(::wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &[Some(::wgpu::ColorTargetState {
                        format: self.config.format,
                        blend: Some(blend_state(key.blend)),
                        write_mask: ::wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: ::wgpu::PrimitiveState {
                    topology: ::wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: ::wgpu::FrontFace::Ccw,
                    cull_mode: Some(cull_mode(key.side)),
                    polygon_mode: ::wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: Some(::wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: writes_depth(key.blend),
                    depth_compare: ::wgpu::CompareFunction::Less,
                    stencil: ::wgpu::StencilState::default(),
                    bias: ::wgpu::DepthBiasState::default(),
                }),
                multisample: ::wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            });
            debug!(?key, "pipeline created");
            self.pipelines.insert(key, pipeline);
            Ok(())
        }

        fn ensure_sphere(&mut self, radius: f64) -> u64 {
            let key = radius.to_bits();
            if !self.spheres.contains_key(&key) {
                let (vertices, indices) = sphere_mesh(radius as f32, SPHERE_LAT_SEGMENTS, SPHERE_LON_SEGMENTS);
                let vertex_buffer = self.device.create_buffer_init(&::wgpu::util::BufferInitDescriptor {
                    label: Some("globe-sphere-vertices"),
                    contents: bytemuck::cast_slice(&vertices),
                    usage: ::wgpu::BufferUsages::VERTEX,
                });
                let index_buffer = self.device.create_buffer_init(&::wgpu::util::BufferInitDescriptor {
                    label: Some("globe-sphere-indices"),
                    contents: bytemuck::cast_slice(&indices),
                    usage: ::wgpu::BufferUsages::INDEX,
                });
                self.spheres.insert(
                    key,
                    SphereBuffers {
                        vertices: vertex_buffer,
                        indices: index_buffer,
                        index_count: indices.len() as u32,
                    },
                );
            }
            key
        }

        fn write_markers(&mut self, markers: &[MarkerInstance]) {
            if markers.len() > self.marker_capacity {
                self.marker_capacity = marker_instance_capacity(markers.len());
                self.marker_buffer = create_marker_buffer(&self.device, self.marker_capacity);
            }
            if !markers.is_empty() {
                self.queue
                    .write_buffer(&self.marker_buffer, 0, bytemuck::cast_slice(markers));
            }
        }

        pub fn render(
            &mut self,
            frame: &RenderFrame,
            resources: &SceneResources,
            markers: &[MarkerInstance],
        ) -> Result<(), JsValue> {
            self.queue
                .write_buffer(&self.globals_buffer, 0, bytemuck::bytes_of(&frame.globals));

            let mut draws = Vec::new();
            let mut marker_count = 0;
            for command in &frame.commands {
                match *command {
                    RenderCommand::Mesh { material, radius, .. } => {
                        let Some(pipeline) = PipelineKey::for_command(command, resources) else {
                            warn!(?command, "mesh without a usable material skipped");
                            continue;
                        };
                        self.ensure_pipeline(pipeline)?;
                        let sphere = self.ensure_sphere(radius);
                        let group = self.ensure_material_group(material, &pipeline.shader, resources);
                        if !pipeline.shader.texture_roles().is_empty() && group.is_none() {
                            warn!(?command, "material textures missing; mesh skipped");
                            continue;
                        }
                        draws.push(MeshDraw {
                            pipeline,
                            sphere,
                            material: group,
                        });
                    }
                    RenderCommand::Markers { count } => {
                        marker_count = count.min(markers.len() as u32);
                    }
                }
            }
            self.write_markers(markers);

            let surface_texture = self
                .surface
                .get_current_texture()
                .map_err(|e| JsValue::from_str(&format!("surface acquire failed: {e}")))?;
            let view = surface_texture
                .texture
                .create_view(&::wgpu::TextureViewDescriptor::default());

            let mut encoder = self
                .device
                .create_command_encoder(&::wgpu::CommandEncoderDescriptor {
                    label: Some("globe-frame-encoder"),
                });
            {
                let mut rpass = encoder.begin_render_pass(&::wgpu::RenderPassDescriptor {
                    label: Some("globe-pass"),
                    color_attachments: &[Some(::wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        depth_slice: None,
                        ops: ::wgpu::Operations {
                            load: ::wgpu::LoadOp::Clear(CLEAR_COLOR),
                            store: ::wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: Some(::wgpu::RenderPassDepthStencilAttachment {
                        view: &self.depth_view,
                        depth_ops: Some(::wgpu::Operations {
                            load: ::wgpu::LoadOp::Clear(1.0),
                            store: ::wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }),
                    occlusion_query_set: None,
                    timestamp_writes: None,
                    multiview_mask: None,
                });

                for draw in &draws {
                    let (Some(pipeline), Some(sphere)) =
                        (self.pipelines.get(&draw.pipeline), self.spheres.get(&draw.sphere))
                    else {
                        continue;
                    };
                    rpass.set_pipeline(pipeline);
                    rpass.set_bind_group(0, &self.globals_bind_group, &[]);
                    if let Some(group) = draw.material.and_then(|h| self.material_groups.get(&h)) {
                        rpass.set_bind_group(1, group, &[]);
                    }
                    rpass.set_vertex_buffer(0, sphere.vertices.slice(..));
                    rpass.set_index_buffer(sphere.indices.slice(..), ::wgpu::IndexFormat::Uint16);
                    rpass.draw_indexed(0..sphere.index_count, 0, 0..1);
                }

                if marker_count > 0 {
                    rpass.set_pipeline(&self.marker_pipeline);
                    rpass.set_bind_group(0, &self.globals_bind_group, &[]);
                    rpass.set_vertex_buffer(0, self.marker_buffer.slice(..));
                    rpass.draw(0..6, 0..marker_count);
                }
            }

            self.queue.submit(std::iter::once(encoder.finish()));
            surface_texture.present();
            Ok(())
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod imp {
    use foundation::handles::Handle;
    use gpu::RenderFrame;
    use gpu::mesh::MarkerInstance;
    use scene::resources::SceneResources;
    use viewer::config::MarkerConfig;
    use wasm_bindgen::prelude::JsValue;

    #[derive(Debug, Default)]
    pub struct GpuBackend;

    pub async fn init_gpu(
        _canvas: web_sys::HtmlCanvasElement,
        _markers: &MarkerConfig,
    ) -> Result<GpuBackend, JsValue> {
        Err(JsValue::from_str(
            "wgpu initialization is only available on wasm32 targets",
        ))
    }

    impl GpuBackend {
        pub fn resize(&mut self, _width: u32, _height: u32) {}

        pub fn sync(&mut self, _released: &[Handle], _resources: &SceneResources) {}

        pub fn render(
            &mut self,
            _frame: &RenderFrame,
            _resources: &SceneResources,
            _markers: &[MarkerInstance],
        ) -> Result<(), JsValue> {
            Err(JsValue::from_str(
                "wgpu rendering is only available on wasm32 targets",
            ))
        }
    }
}

pub use imp::{GpuBackend, init_gpu};
