#[cfg(target_arch = "wasm32")]
mod imp {
    use std::borrow::Cow;
    use std::collections::HashMap;
    use std::num::NonZeroU64;

    use ::wgpu::util::DeviceExt;
    use gpu::{MAX_DIRECTIONAL_LIGHTS, RenderFrame, RendererSettings};
    use scene::EntityId;
    use scene::components::{BufferGeometry, GeometryId};
    use wasm_bindgen::JsCast;

    use crate::error::ViewerError;

    const DEPTH_FORMAT: ::wgpu::TextureFormat = ::wgpu::TextureFormat::Depth24Plus;

    struct GpuMesh {
        vertices: ::wgpu::Buffer,
        /// Triangle edges as a line list, built on first wireframe use.
        wire: Option<::wgpu::Buffer>,
    }

    struct GpuLines {
        vertices: ::wgpu::Buffer,
        count: u32,
    }

    pub struct WgpuContext {
        pub _instance: &'static ::wgpu::Instance,
        pub surface: ::wgpu::Surface<'static>,
        pub device: ::wgpu::Device,
        pub queue: ::wgpu::Queue,
        pub config: ::wgpu::SurfaceConfiguration,
        pub _canvas: web_sys::HtmlCanvasElement,
        sample_count: u32,
        msaa_view: Option<::wgpu::TextureView>,
        depth_view: ::wgpu::TextureView,
        mesh_pipeline: ::wgpu::RenderPipeline,
        blended_mesh_pipeline: ::wgpu::RenderPipeline,
        line_pipeline: ::wgpu::RenderPipeline,
        globals_buffer: ::wgpu::Buffer,
        globals_bind_group: ::wgpu::BindGroup,
        draw_layout: ::wgpu::BindGroupLayout,
        draw_buffer: ::wgpu::Buffer,
        draw_bind_group: ::wgpu::BindGroup,
        draw_capacity: usize,
        draw_stride: u64,
        meshes: HashMap<GeometryId, GpuMesh>,
        lines: HashMap<EntityId, GpuLines>,
    }

    impl std::fmt::Debug for WgpuContext {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("WgpuContext")
                .field("width", &self.config.width)
                .field("height", &self.config.height)
                .field("sample_count", &self.sample_count)
                .field("meshes", &self.meshes.len())
                .field("lines", &self.lines.len())
                .finish()
        }
    }

    const COMMON_WGSL: &str = r#"
struct Globals {
    view_proj: mat4x4<f32>,
    // xyz camera position, w tone-mapping exposure
    camera: vec4<f32>,
    ambient: vec4<f32>,
    hemi_sky: vec4<f32>,
    hemi_ground: vec4<f32>,
    // xyz up direction, w 1 when a hemisphere light exists
    hemi_up: vec4<f32>,
    // x directional light count
    counts: vec4<f32>,
    dir_direction: array<vec4<f32>, 4>,
    dir_color: array<vec4<f32>, 4>,
};

struct Draw {
    model: mat4x4<f32>,
    // rgb linear colour, a opacity
    color: vec4<f32>,
    // x metalness, y roughness
    params: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> globals: Globals;

@group(1) @binding(0)
var<uniform> draw: Draw;

fn rrt_and_odt_fit(v: vec3<f32>) -> vec3<f32> {
    let a = v * (v + 0.0245786) - 0.000090537;
    let b = v * (0.983729 * v + 0.4329510) + 0.238081;
    return a / b;
}

fn aces_filmic(color_in: vec3<f32>) -> vec3<f32> {
    let aces_input = mat3x3<f32>(
        vec3<f32>(0.59719, 0.07600, 0.02840),
        vec3<f32>(0.35458, 0.90834, 0.13383),
        vec3<f32>(0.04823, 0.01566, 0.83777),
    );
    let aces_output = mat3x3<f32>(
        vec3<f32>(1.60475, -0.10208, -0.00327),
        vec3<f32>(-0.53108, 1.10813, -0.07276),
        vec3<f32>(-0.07367, -0.00605, 1.07602),
    );
    var color = color_in * (globals.camera.w / 0.6);
    color = aces_input * color;
    color = rrt_and_odt_fit(color);
    color = aces_output * color;
    return clamp(color, vec3<f32>(0.0), vec3<f32>(1.0));
}
"#;

    const MESH_WGSL: &str = r#"
struct VsOut {
    @builtin(position) pos: vec4<f32>,
    @location(0) world_pos: vec3<f32>,
    @location(1) normal: vec3<f32>,
};

@vertex
fn vs_main(@location(0) position: vec3<f32>, @location(1) normal: vec3<f32>) -> VsOut {
    let world = draw.model * vec4<f32>(position, 1.0);
    return VsOut(globals.view_proj * world, world.xyz, normal);
}

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    let n = normalize(in.normal);
    let v = normalize(globals.camera.xyz - in.world_pos);
    let base = draw.color.rgb;
    let metal = clamp(draw.params.x, 0.0, 1.0);
    let rough = clamp(draw.params.y, 0.04, 1.0);
    let shininess = max(2.0 / (rough * rough * rough * rough) - 2.0, 1.0);

    var irradiance = globals.ambient.rgb;
    let up = normalize(globals.hemi_up.xyz);
    let w = 0.5 * dot(n, up) + 0.5;
    irradiance += mix(globals.hemi_ground.rgb, globals.hemi_sky.rgb, w) * globals.hemi_up.w;

    var specular = vec3<f32>(0.0);
    let count = u32(globals.counts.x);
    for (var i = 0u; i < count; i = i + 1u) {
        let l = normalize(globals.dir_direction[i].xyz);
        let ndl = max(dot(n, l), 0.0);
        let radiance = globals.dir_color[i].rgb;
        irradiance += radiance * ndl;
        let h = normalize(l + v);
        let blinn = pow(max(dot(n, h), 0.0), shininess) * (shininess + 2.0) / 8.0;
        specular += radiance * blinn * ndl;
    }

    let f0 = mix(vec3<f32>(0.04), base, metal);
    let lit = base * (1.0 - metal) * irradiance + specular * f0;
    return vec4<f32>(aces_filmic(lit), draw.color.a);
}
"#;

    const LINE_WGSL: &str = r#"
@vertex
fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return globals.view_proj * draw.model * vec4<f32>(position, 1.0);
}

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(aces_filmic(draw.color.rgb), draw.color.a);
}
"#;

    #[repr(C)]
    #[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
    struct Vertex {
        position: [f32; 3],
        normal: [f32; 3],
    }

    #[repr(C)]
    #[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
    struct LineVertex {
        position: [f32; 3],
    }

    #[repr(C)]
    #[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
    struct Globals {
        view_proj: [[f32; 4]; 4],
        camera: [f32; 4],
        ambient: [f32; 4],
        hemi_sky: [f32; 4],
        hemi_ground: [f32; 4],
        hemi_up: [f32; 4],
        counts: [f32; 4],
        dir_direction: [[f32; 4]; MAX_DIRECTIONAL_LIGHTS],
        dir_color: [[f32; 4]; MAX_DIRECTIONAL_LIGHTS],
    }

    #[repr(C)]
    #[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
    struct DrawUniform {
        model: [[f32; 4]; 4],
        color: [f32; 4],
        params: [f32; 4],
    }

    #[derive(Copy, Clone)]
    enum Pass {
        Opaque,
        Blended,
    }

    enum DrawCall {
        Mesh {
            geometry: GeometryId,
            first: u32,
            count: u32,
            pass: Pass,
        },
        Wire {
            geometry: GeometryId,
            first: u32,
            count: u32,
        },
        Lines {
            entity: EntityId,
        },
    }

    fn xyz1(v: [f32; 3], w: f32) -> [f32; 4] {
        [v[0], v[1], v[2], w]
    }

    fn globals_from_frame(frame: &RenderFrame<'_>) -> Globals {
        let lights = &frame.lights;
        let mut dir_direction = [[0.0; 4]; MAX_DIRECTIONAL_LIGHTS];
        let mut dir_color = [[0.0; 4]; MAX_DIRECTIONAL_LIGHTS];
        for (i, light) in lights.directional.iter().enumerate() {
            dir_direction[i] = xyz1(light.direction, 0.0);
            dir_color[i] = xyz1(light.color, 0.0);
        }
        let hemi = lights.hemisphere.unwrap_or_default();
        Globals {
            view_proj: frame.view_proj,
            camera: xyz1(frame.camera_position, frame.exposure),
            ambient: xyz1(lights.ambient, 0.0),
            hemi_sky: xyz1(hemi.sky, 0.0),
            hemi_ground: xyz1(hemi.ground, 0.0),
            hemi_up: xyz1(
                if lights.hemisphere.is_some() { hemi.up } else { [0.0, 1.0, 0.0] },
                if lights.hemisphere.is_some() { 1.0 } else { 0.0 },
            ),
            counts: [lights.directional.len() as f32, 0.0, 0.0, 0.0],
            dir_direction,
            dir_color,
        }
    }

    fn create_depth_view(
        device: &::wgpu::Device,
        config: &::wgpu::SurfaceConfiguration,
        sample_count: u32,
    ) -> ::wgpu::TextureView {
        let tex = device.create_texture(&::wgpu::TextureDescriptor {
            label: Some("regionmap-depth"),
            size: ::wgpu::Extent3d {
                width: config.width.max(1),
                height: config.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count,
            dimension: ::wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: ::wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        tex.create_view(&::wgpu::TextureViewDescriptor::default())
    }

    fn create_msaa_view(
        device: &::wgpu::Device,
        config: &::wgpu::SurfaceConfiguration,
        sample_count: u32,
    ) -> Option<::wgpu::TextureView> {
        if sample_count <= 1 {
            return None;
        }
        let tex = device.create_texture(&::wgpu::TextureDescriptor {
            label: Some("regionmap-msaa"),
            size: ::wgpu::Extent3d {
                width: config.width.max(1),
                height: config.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count,
            dimension: ::wgpu::TextureDimension::D2,
            format: config.format,
            usage: ::wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        Some(tex.create_view(&::wgpu::TextureViewDescriptor::default()))
    }

    fn create_draw_buffer(
        device: &::wgpu::Device,
        layout: &::wgpu::BindGroupLayout,
        stride: u64,
        capacity: usize,
    ) -> (::wgpu::Buffer, ::wgpu::BindGroup) {
        let buffer = device.create_buffer(&::wgpu::BufferDescriptor {
            label: Some("regionmap-draws"),
            size: stride * capacity.max(1) as u64,
            usage: ::wgpu::BufferUsages::UNIFORM | ::wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&::wgpu::BindGroupDescriptor {
            label: Some("regionmap-draws-bg"),
            layout,
            entries: &[::wgpu::BindGroupEntry {
                binding: 0,
                resource: ::wgpu::BindingResource::Buffer(::wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: NonZeroU64::new(std::mem::size_of::<DrawUniform>() as u64),
                }),
            }],
        });
        (buffer, bind_group)
    }

    struct PipelineDesc<'a> {
        label: &'a str,
        module: &'a ::wgpu::ShaderModule,
        vertex_layout: ::wgpu::VertexBufferLayout<'a>,
        topology: ::wgpu::PrimitiveTopology,
        blend: ::wgpu::BlendState,
        depth_write: bool,
    }

    fn create_pipeline(
        device: &::wgpu::Device,
        layout: &::wgpu::PipelineLayout,
        format: ::wgpu::TextureFormat,
        sample_count: u32,
        desc: PipelineDesc<'_>,
    ) -> ::wgpu::RenderPipeline {
        device.create_render_pipeline(&::wgpu::RenderPipelineDescriptor {
            label: Some(desc.label),
            layout: Some(layout),
            vertex: ::wgpu::VertexState {
                module: desc.module,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[desc.vertex_layout],
            },
            fragment: Some(::wgpu::FragmentState {
                module: desc.module,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(::wgpu::ColorTargetState {
                    format,
                    blend: Some(desc.blend),
                    write_mask: ::wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: ::wgpu::PrimitiveState {
                topology: desc.topology,
                strip_index_format: None,
                front_face: ::wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: ::wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(::wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: desc.depth_write,
                depth_compare: ::wgpu::CompareFunction::LessEqual,
                stencil: ::wgpu::StencilState::default(),
                bias: ::wgpu::DepthBiasState::default(),
            }),
            multisample: ::wgpu::MultisampleState {
                count: sample_count,
                ..Default::default()
            },
            multiview_mask: None,
            cache: None,
        })
    }

    const MESH_ATTRIBUTES: [::wgpu::VertexAttribute; 2] = [
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
    ];

    const LINE_ATTRIBUTES: [::wgpu::VertexAttribute; 1] = [::wgpu::VertexAttribute {
        format: ::wgpu::VertexFormat::Float32x3,
        offset: 0,
        shader_location: 0,
    }];

    fn mesh_vertex_layout() -> ::wgpu::VertexBufferLayout<'static> {
        ::wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as ::wgpu::BufferAddress,
            step_mode: ::wgpu::VertexStepMode::Vertex,
            attributes: &MESH_ATTRIBUTES,
        }
    }

    fn line_vertex_layout() -> ::wgpu::VertexBufferLayout<'static> {
        ::wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<LineVertex>() as ::wgpu::BufferAddress,
            step_mode: ::wgpu::VertexStepMode::Vertex,
            attributes: &LINE_ATTRIBUTES,
        }
    }

    pub async fn init_wgpu_from_canvas_id(
        canvas_id: &str,
        settings: &RendererSettings,
    ) -> Result<WgpuContext, ViewerError> {
        let window = web_sys::window().ok_or_else(|| ViewerError::Dom("window missing".into()))?;
        let document = window
            .document()
            .ok_or_else(|| ViewerError::Dom("document missing".into()))?;
        let canvas_elem = document
            .get_element_by_id(canvas_id)
            .ok_or_else(|| ViewerError::Dom(format!("canvas #{canvas_id} missing")))?
            .dyn_into::<web_sys::HtmlCanvasElement>()
            .map_err(|_| ViewerError::Dom(format!("#{canvas_id} is not a canvas")))?;

        let width = canvas_elem.width();
        let height = canvas_elem.height();

        // `wgpu::Surface` must not outlive its `wgpu::Instance`, so the
        // instance lives for the rest of the page.
        let instance: &'static ::wgpu::Instance = Box::leak(Box::new(::wgpu::Instance::new(
            &::wgpu::InstanceDescriptor {
                backends: ::wgpu::Backends::BROWSER_WEBGPU | ::wgpu::Backends::GL,
                ..Default::default()
            },
        )));

        let surface = instance
            .create_surface(::wgpu::SurfaceTarget::Canvas(canvas_elem.clone()))
            .map_err(|e| ViewerError::Gpu(format!("surface error: {e}")))?;

        let adapter = instance
            .request_adapter(&::wgpu::RequestAdapterOptions {
                power_preference: ::wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| ViewerError::Gpu(format!("adapter error: {e}")))?;

        let (device, queue) = adapter
            .request_device(&::wgpu::DeviceDescriptor {
                label: Some("regionmap-device"),
                required_features: ::wgpu::Features::empty(),
                required_limits: ::wgpu::Limits::downlevel_webgl2_defaults(),
                ..Default::default()
            })
            .await
            .map_err(|e| ViewerError::Gpu(format!("device error: {e}")))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| ViewerError::Gpu("surface reports no formats".into()))?;
        let premultiplied = surface_caps
            .alpha_modes
            .iter()
            .copied()
            .find(|m| *m == ::wgpu::CompositeAlphaMode::PreMultiplied)
            .filter(|_| settings.alpha);
        let alpha_mode = premultiplied
            .or_else(|| surface_caps.alpha_modes.first().copied())
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

        let sample_count = settings.sample_count;
        let depth_view = create_depth_view(&device, &config, sample_count);
        let msaa_view = create_msaa_view(&device, &config, sample_count);

        let mesh_shader = device.create_shader_module(::wgpu::ShaderModuleDescriptor {
            label: Some("regionmap-mesh-shader"),
            source: ::wgpu::ShaderSource::Wgsl(Cow::Owned(format!("{COMMON_WGSL}{MESH_WGSL}"))),
        });
        let line_shader = device.create_shader_module(::wgpu::ShaderModuleDescriptor {
            label: Some("regionmap-line-shader"),
            source: ::wgpu::ShaderSource::Wgsl(Cow::Owned(format!("{COMMON_WGSL}{LINE_WGSL}"))),
        });

        let globals_buffer = device.create_buffer(&::wgpu::BufferDescriptor {
            label: Some("regionmap-globals"),
            size: std::mem::size_of::<Globals>() as u64,
            usage: ::wgpu::BufferUsages::UNIFORM | ::wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let globals_layout = device.create_bind_group_layout(&::wgpu::BindGroupLayoutDescriptor {
            label: Some("regionmap-globals-bgl"),
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
            label: Some("regionmap-globals-bg"),
            layout: &globals_layout,
            entries: &[::wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_buffer.as_entire_binding(),
            }],
        });

        let draw_layout = device.create_bind_group_layout(&::wgpu::BindGroupLayoutDescriptor {
            label: Some("regionmap-draws-bgl"),
            entries: &[::wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: ::wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: ::wgpu::BindingType::Buffer {
                    ty: ::wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(std::mem::size_of::<DrawUniform>() as u64),
                },
                count: None,
            }],
        });

        let align = u64::from(device.limits().min_uniform_buffer_offset_alignment).max(1);
        let draw_stride = (std::mem::size_of::<DrawUniform>() as u64).div_ceil(align) * align;
        let draw_capacity = 64;
        let (draw_buffer, draw_bind_group) =
            create_draw_buffer(&device, &draw_layout, draw_stride, draw_capacity);

        let pipeline_layout = device.create_pipeline_layout(&::wgpu::PipelineLayoutDescriptor {
            label: Some("regionmap-pipeline-layout"),
            bind_group_layouts: &[&globals_layout, &draw_layout],
            immediate_size: 0,
        });

        let mesh_pipeline = create_pipeline(
            &device,
            &pipeline_layout,
            format,
            sample_count,
            PipelineDesc {
                label: "regionmap-mesh-pipeline",
                module: &mesh_shader,
                vertex_layout: mesh_vertex_layout(),
                topology: ::wgpu::PrimitiveTopology::TriangleList,
                blend: ::wgpu::BlendState::REPLACE,
                depth_write: true,
            },
        );
        let blended_mesh_pipeline = create_pipeline(
            &device,
            &pipeline_layout,
            format,
            sample_count,
            PipelineDesc {
                label: "regionmap-blended-mesh-pipeline",
                module: &mesh_shader,
                vertex_layout: mesh_vertex_layout(),
                topology: ::wgpu::PrimitiveTopology::TriangleList,
                blend: ::wgpu::BlendState::ALPHA_BLENDING,
                depth_write: false,
            },
        );
        let line_pipeline = create_pipeline(
            &device,
            &pipeline_layout,
            format,
            sample_count,
            PipelineDesc {
                label: "regionmap-line-pipeline",
                module: &line_shader,
                vertex_layout: line_vertex_layout(),
                topology: ::wgpu::PrimitiveTopology::LineList,
                blend: ::wgpu::BlendState::ALPHA_BLENDING,
                depth_write: false,
            },
        );

        Ok(WgpuContext {
            _instance: instance,
            surface,
            device,
            queue,
            config,
            _canvas: canvas_elem,
            sample_count,
            msaa_view,
            depth_view,
            mesh_pipeline,
            blended_mesh_pipeline,
            line_pipeline,
            globals_buffer,
            globals_bind_group,
            draw_layout,
            draw_buffer,
            draw_bind_group,
            draw_capacity,
            draw_stride,
            meshes: HashMap::new(),
            lines: HashMap::new(),
        })
    }

    pub fn resize_wgpu(ctx: &mut WgpuContext, width: u32, height: u32) {
        ctx.config.width = width.max(1);
        ctx.config.height = height.max(1);
        ctx.surface.configure(&ctx.device, &ctx.config);
        ctx.depth_view = create_depth_view(&ctx.device, &ctx.config, ctx.sample_count);
        ctx.msaa_view = create_msaa_view(&ctx.device, &ctx.config, ctx.sample_count);
    }

    /// Drops uploaded buffers; call when the scene is replaced.
    pub fn clear_gpu_cache(ctx: &mut WgpuContext) {
        ctx.meshes.clear();
        ctx.lines.clear();
    }

    fn upload_mesh(device: &::wgpu::Device, geometry: &BufferGeometry) -> GpuMesh {
        let vertices: Vec<Vertex> = geometry
            .positions
            .iter()
            .zip(&geometry.normals)
            .map(|(p, n)| Vertex {
                position: p.to_f32(),
                normal: n.to_f32(),
            })
            .collect();
        GpuMesh {
            vertices: device.create_buffer_init(&::wgpu::util::BufferInitDescriptor {
                label: Some("regionmap-mesh-vertices"),
                contents: bytemuck::cast_slice(&vertices),
                usage: ::wgpu::BufferUsages::VERTEX,
            }),
            wire: None,
        }
    }

    fn upload_wire(device: &::wgpu::Device, geometry: &BufferGeometry) -> ::wgpu::Buffer {
        let vertices: Vec<LineVertex> = geometry
            .triangles()
            .flat_map(|[a, b, c]| [a, b, b, c, c, a])
            .map(|p| LineVertex {
                position: p.to_f32(),
            })
            .collect();
        device.create_buffer_init(&::wgpu::util::BufferInitDescriptor {
            label: Some("regionmap-wire-vertices"),
            contents: bytemuck::cast_slice(&vertices),
            usage: ::wgpu::BufferUsages::VERTEX,
        })
    }

    fn prepare(ctx: &mut WgpuContext, frame: &RenderFrame<'_>) -> Vec<(DrawCall, DrawUniform)> {
        let world = frame.world;
        let mut calls = Vec::new();
        let mut blended = Vec::new();
        let mut wires = Vec::new();

        for draw in &frame.meshes {
            let Some(geometry) = world.geometry(draw.geometry) else {
                continue;
            };
            let gpu_mesh = ctx
                .meshes
                .entry(draw.geometry)
                .or_insert_with(|| upload_mesh(&ctx.device, geometry));
            for section in &draw.sections {
                let m = section.material;
                let uniform = DrawUniform {
                    model: draw.model,
                    color: xyz1(m.color, m.opacity),
                    params: [m.metalness, m.roughness, 0.0, 0.0],
                };
                if m.wireframe {
                    if gpu_mesh.wire.is_none() {
                        gpu_mesh.wire = Some(upload_wire(&ctx.device, geometry));
                    }
                    wires.push((
                        DrawCall::Wire {
                            geometry: draw.geometry,
                            first: section.start * 2,
                            count: section.count * 2,
                        },
                        uniform,
                    ));
                    continue;
                }
                let pass = if m.blended { Pass::Blended } else { Pass::Opaque };
                let call = DrawCall::Mesh {
                    geometry: draw.geometry,
                    first: section.start,
                    count: section.count,
                    pass,
                };
                match pass {
                    Pass::Opaque => calls.push((call, uniform)),
                    Pass::Blended => blended.push((call, uniform)),
                }
            }
        }

        for line in &frame.lines {
            let gpu_lines = ctx.lines.entry(line.entity).or_insert_with(|| {
                let vertices: Vec<LineVertex> = line
                    .geometry
                    .positions
                    .iter()
                    .map(|p| LineVertex {
                        position: p.to_f32(),
                    })
                    .collect();
                GpuLines {
                    vertices: ctx
                        .device
                        .create_buffer_init(&::wgpu::util::BufferInitDescriptor {
                            label: Some("regionmap-line-vertices"),
                            contents: bytemuck::cast_slice(&vertices),
                            usage: ::wgpu::BufferUsages::VERTEX,
                        }),
                    count: vertices.len() as u32,
                }
            });
            if gpu_lines.count == 0 {
                continue;
            }
            calls.push((
                DrawCall::Lines {
                    entity: line.entity,
                },
                DrawUniform {
                    model: line.model,
                    color: xyz1(line.color, line.opacity),
                    params: [0.0; 4],
                },
            ));
        }

        calls.extend(blended);
        calls.extend(wires);
        calls
    }

    pub fn render_frame(ctx: &mut WgpuContext, frame: &RenderFrame<'_>) -> Result<(), ViewerError> {
        let calls = prepare(ctx, frame);

        if calls.len() > ctx.draw_capacity {
            ctx.draw_capacity = calls.len().next_power_of_two();
            let (buffer, bind_group) =
                create_draw_buffer(&ctx.device, &ctx.draw_layout, ctx.draw_stride, ctx.draw_capacity);
            ctx.draw_buffer = buffer;
            ctx.draw_bind_group = bind_group;
        }
        for (i, (_, uniform)) in calls.iter().enumerate() {
            ctx.queue.write_buffer(
                &ctx.draw_buffer,
                i as u64 * ctx.draw_stride,
                bytemuck::bytes_of(uniform),
            );
        }
        ctx.queue.write_buffer(
            &ctx.globals_buffer,
            0,
            bytemuck::bytes_of(&globals_from_frame(frame)),
        );

        let surface_texture = ctx
            .surface
            .get_current_texture()
            .map_err(|e| ViewerError::Gpu(format!("surface acquire failed: {e}")))?;
        let surface_view = surface_texture
            .texture
            .create_view(&::wgpu::TextureViewDescriptor::default());
        let (target, resolve_target) = match &ctx.msaa_view {
            Some(msaa) => (msaa, Some(&surface_view)),
            None => (&surface_view, None),
        };

        let mut encoder = ctx
            .device
            .create_command_encoder(&::wgpu::CommandEncoderDescriptor {
                label: Some("regionmap-encoder"),
            });
        {
            let [r, g, b, a] = frame.clear_color;
            let mut rpass = encoder.begin_render_pass(&::wgpu::RenderPassDescriptor {
                label: Some("regionmap-scene-pass"),
                color_attachments: &[Some(::wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target,
                    depth_slice: None,
                    ops: ::wgpu::Operations {
                        load: ::wgpu::LoadOp::Clear(::wgpu::Color { r, g, b, a }),
                        store: ::wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(::wgpu::RenderPassDepthStencilAttachment {
                    view: &ctx.depth_view,
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
            rpass.set_bind_group(0, &ctx.globals_bind_group, &[]);

            for (i, (call, _)) in calls.iter().enumerate() {
                let offset = (i as u64 * ctx.draw_stride) as u32;
                rpass.set_bind_group(1, &ctx.draw_bind_group, &[offset]);
                match call {
                    DrawCall::Mesh {
                        geometry,
                        first,
                        count,
                        pass,
                    } => {
                        let Some(mesh) = ctx.meshes.get(geometry) else { continue };
                        rpass.set_pipeline(match pass {
                            Pass::Opaque => &ctx.mesh_pipeline,
                            Pass::Blended => &ctx.blended_mesh_pipeline,
                        });
                        rpass.set_vertex_buffer(0, mesh.vertices.slice(..));
                        rpass.draw(*first..first + count, 0..1);
                    }
                    DrawCall::Wire {
                        geometry,
                        first,
                        count,
                    } => {
                        let Some(wire) = ctx.meshes.get(geometry).and_then(|m| m.wire.as_ref())
                        else {
                            continue;
                        };
                        rpass.set_pipeline(&ctx.line_pipeline);
                        rpass.set_vertex_buffer(0, wire.slice(..));
                        rpass.draw(*first..first + count, 0..1);
                    }
                    DrawCall::Lines { entity } => {
                        let Some(lines) = ctx.lines.get(entity) else { continue };
                        rpass.set_pipeline(&ctx.line_pipeline);
                        rpass.set_vertex_buffer(0, lines.vertices.slice(..));
                        rpass.draw(0..lines.count, 0..1);
                    }
                }
            }
        }

        ctx.queue.submit(std::iter::once(encoder.finish()));
        surface_texture.present();
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod imp {
    use gpu::{RenderFrame, RendererSettings};

    use crate::error::ViewerError;

    #[derive(Debug, Default)]
    pub struct WgpuContext;

    pub async fn init_wgpu_from_canvas_id(
        _canvas_id: &str,
        _settings: &RendererSettings,
    ) -> Result<WgpuContext, ViewerError> {
        Err(ViewerError::Gpu(
            "wgpu initialization is only available on wasm32 targets".to_string(),
        ))
    }

    pub fn resize_wgpu(_ctx: &mut WgpuContext, _width: u32, _height: u32) {}

    pub fn clear_gpu_cache(_ctx: &mut WgpuContext) {}

    pub fn render_frame(_ctx: &mut WgpuContext, _frame: &RenderFrame<'_>) -> Result<(), ViewerError> {
        Err(ViewerError::Gpu(
            "wgpu rendering is only available on wasm32 targets".to_string(),
        ))
    }
}

pub use imp::{WgpuContext, clear_gpu_cache, init_wgpu_from_canvas_id, render_frame, resize_wgpu};
