use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use tracing::{debug, warn};
use wgpu::*;

use crate::controller::frame_loop::Game;
use crate::model::animation::{AnimationKey, AnimationMixer};
use crate::model::assets::{self, AssetStore};
use crate::model::{map, Snowfall};
use crate::utils::{Mesh, MeshBuffer, Vertex};
use crate::view::gpu_init::GpuContext;

pub const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

const FOG_COLOR: u32 = 0x3a77bd;
const FOG_DENSITY: f32 = 0.009;
const HEMI_SKY: u32 = 0x0a9df2;
const HEMI_INTENSITY: f32 = 2.0;
const SUN_INTENSITY: f32 = 2.5;
const RUN_BOB_HEIGHT: f32 = 0.06;

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub eye: [f32; 4],
}

impl CameraUniform {
    pub fn from_game(game: &Game) -> Self {
        Self {
            view_proj: game.camera.view_proj().to_cols_array_2d(),
            eye: game.camera.position.extend(1.0).to_array(),
        }
    }
}

/// Mirrors `Lighting` in scene.wgsl; each vec3 is padded by the scalar after it.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct LightingUniform {
    pub light_dir: [f32; 3],
    pub light_intensity: f32,
    pub sky_color: [f32; 3],
    pub hemi_intensity: f32,
    pub ground_color: [f32; 3],
    pub fog_density: f32,
    pub fog_color: [f32; 3],
    pub _pad: f32,
}

impl LightingUniform {
    /// The sun sits at `light_position` and aims at the camera.
    pub fn new(light_position: Vec3, camera_position: Vec3) -> Self {
        let dir = (light_position - camera_position).normalize_or_zero();
        Self {
            light_dir: dir.to_array(),
            light_intensity: SUN_INTENSITY,
            sky_color: linear_rgb(HEMI_SKY),
            hemi_intensity: HEMI_INTENSITY,
            ground_color: [0.0; 3],
            fog_density: FOG_DENSITY,
            fog_color: linear_rgb(FOG_COLOR),
            _pad: 0.0,
        }
    }
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 { c / 12.92 } else { ((c + 0.055) / 1.055).powf(2.4) }
}

pub fn linear_rgb(hex: u32) -> [f32; 3] {
    let c = |shift: u32| srgb_to_linear(((hex >> shift) & 0xff) as f32 / 255.0);
    [c(16), c(8), c(0)]
}

/// Model matrix for the champion: body position, facing, and a small hop
/// while the run clip has weight.
pub fn player_transform(position: Vec3, yaw: f32, mixer: &AnimationMixer) -> Mat4 {
    let bob = mixer
        .action(AnimationKey::Run)
        .filter(|a| a.clip.duration > 0.0)
        .map(|a| (a.time / a.clip.duration * std::f32::consts::TAU).sin().abs() * RUN_BOB_HEIGHT * a.weight)
        .unwrap_or(0.0);
    Mat4::from_translation(position + Vec3::Y * bob) * Mat4::from_rotation_y(yaw)
}

/// Terrain plus every prop placement baked into one mesh.
pub fn bake_static_scene(store: &AssetStore) -> Mesh {
    let mut scene = store
        .get(assets::ARAM_MAP)
        .and_then(|a| a.mesh())
        .cloned()
        .unwrap_or_default();
    for prop in map::props() {
        match store.get(prop.asset).and_then(|a| a.mesh()) {
            Some(mesh) => scene.append(mesh, Mat4::from_translation(prop.position) * Mat4::from_rotation_y(prop.yaw)),
            None => debug!(asset = prop.asset, "prop skipped"),
        }
    }
    scene
}

pub struct CameraResources {
    pub camera_buffer: Buffer,
    pub lighting_buffer: Buffer,
    pub bind_group_layout: BindGroupLayout,
    pub bind_group: BindGroup,
}

pub struct PipelineResources {
    pub scene: RenderPipeline,
    pub particles: RenderPipeline,
}

pub fn create_depth_texture(device: &Device, width: u32, height: u32) -> (Texture, TextureView) {
    let depth_texture = device.create_texture(&TextureDescriptor {
        label: Some("depth_texture"),
        size: Extent3d { width: width.max(1), height: height.max(1), depth_or_array_layers: 1 },
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let depth_view = depth_texture.create_view(&TextureViewDescriptor::default());
    (depth_texture, depth_view)
}

fn uniform_entry(binding: u32) -> BindGroupLayoutEntry {
    BindGroupLayoutEntry {
        binding,
        visibility: ShaderStages::VERTEX | ShaderStages::FRAGMENT,
        ty: BindingType::Buffer {
            ty: BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

pub fn create_camera_resources(device: &Device) -> CameraResources {
    let camera_buffer = device.create_buffer(&BufferDescriptor {
        label: Some("camera_buffer"),
        size: std::mem::size_of::<CameraUniform>() as BufferAddress,
        usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let lighting_buffer = device.create_buffer(&BufferDescriptor {
        label: Some("lighting_buffer"),
        size: std::mem::size_of::<LightingUniform>() as BufferAddress,
        usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let bind_group_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
        label: Some("scene_bind_group_layout"),
        entries: &[uniform_entry(0), uniform_entry(1)],
    });

    let bind_group = device.create_bind_group(&BindGroupDescriptor {
        label: Some("scene_bind_group"),
        layout: &bind_group_layout,
        entries: &[
            BindGroupEntry { binding: 0, resource: camera_buffer.as_entire_binding() },
            BindGroupEntry { binding: 1, resource: lighting_buffer.as_entire_binding() },
        ],
    });

    CameraResources { camera_buffer, lighting_buffer, bind_group_layout, bind_group }
}

pub fn create_pipelines(device: &Device, format: TextureFormat, bind_group_layout: &BindGroupLayout) -> PipelineResources {
    let shader = device.create_shader_module(ShaderModuleDescriptor {
        label: Some("scene_shader"),
        source: ShaderSource::Wgsl(include_str!("shaders/scene.wgsl").into()),
    });

    let layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
        label: Some("scene_pipeline_layout"),
        bind_group_layouts: &[bind_group_layout],
        push_constant_ranges: &[],
    });

    let depth = |write: bool| DepthStencilState {
        format: DEPTH_FORMAT,
        depth_write_enabled: write,
        depth_compare: CompareFunction::Less,
        stencil: StencilState::default(),
        bias: DepthBiasState::default(),
    };

    let scene = device.create_render_pipeline(&RenderPipelineDescriptor {
        label: Some("scene_pipeline"),
        layout: Some(&layout),
        vertex: VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[VertexBufferLayout {
                array_stride: std::mem::size_of::<Vertex>() as BufferAddress,
                step_mode: VertexStepMode::Vertex,
                attributes: &[
                    VertexAttribute { offset: 0, shader_location: 0, format: VertexFormat::Float32x3 },
                    VertexAttribute { offset: 12, shader_location: 1, format: VertexFormat::Float32x3 },
                    VertexAttribute { offset: 24, shader_location: 2, format: VertexFormat::Float32x4 },
                ],
            }],
            compilation_options: Default::default(),
        },
        fragment: Some(FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(ColorTargetState { format, blend: Some(BlendState::REPLACE), write_mask: ColorWrites::ALL })],
            compilation_options: Default::default(),
        }),
        primitive: PrimitiveState {
            topology: PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: FrontFace::Ccw,
            // props are rotated by arbitrary yaw and planes are single sided
            cull_mode: None,
            polygon_mode: PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(depth(true)),
        multisample: MultisampleState { count: 1, mask: !0, alpha_to_coverage_enabled: false },
        multiview: None,
        cache: None,
    });

    let particles = device.create_render_pipeline(&RenderPipelineDescriptor {
        label: Some("snow_pipeline"),
        layout: Some(&layout),
        vertex: VertexState {
            module: &shader,
            entry_point: Some("vs_particle"),
            buffers: &[VertexBufferLayout {
                array_stride: std::mem::size_of::<[f32; 3]>() as BufferAddress,
                step_mode: VertexStepMode::Vertex,
                attributes: &[VertexAttribute { offset: 0, shader_location: 0, format: VertexFormat::Float32x3 }],
            }],
            compilation_options: Default::default(),
        },
        fragment: Some(FragmentState {
            module: &shader,
            entry_point: Some("fs_particle"),
            targets: &[Some(ColorTargetState { format, blend: Some(BlendState::ALPHA_BLENDING), write_mask: ColorWrites::ALL })],
            compilation_options: Default::default(),
        }),
        primitive: PrimitiveState {
            topology: PrimitiveTopology::PointList,
            ..Default::default()
        },
        depth_stencil: Some(depth(false)),
        multisample: MultisampleState { count: 1, mask: !0, alpha_to_coverage_enabled: false },
        multiview: None,
        cache: None,
    });

    PipelineResources { scene, particles }
}

///////////////////////////////////////////////////////////////////////////////

struct PlayerModel {
    mesh: Mesh,
    buffer: MeshBuffer,
}

struct SnowBuffer {
    buffer: Buffer,
    capacity: u32,
    count: u32,
}

/// Consolidated render state to avoid parameter explosion
pub struct RenderState {
    pub surface_config: SurfaceConfiguration,
    depth_view: TextureView,
    camera: CameraResources,
    pipelines: PipelineResources,

    static_scene: Option<MeshBuffer>,
    player: Option<PlayerModel>,
    snow: Option<SnowBuffer>,
    clear_color: Color,

    // UI
    pub egui_renderer: egui_wgpu::Renderer,
    pub egui_primitives: Option<Vec<egui::ClippedPrimitive>>,
    pub egui_full_output: Option<egui::FullOutput>,
    pub egui_dpr: f32,
}

impl RenderState {
    pub fn new(gpu: &GpuContext) -> Self {
        let device = &gpu.device;
        let camera = create_camera_resources(device);
        let pipelines = create_pipelines(device, gpu.format, &camera.bind_group_layout);
        let (_, depth_view) = create_depth_texture(device, gpu.config.width, gpu.config.height);
        let [r, g, b] = linear_rgb(FOG_COLOR);

        Self {
            surface_config: gpu.config.clone(),
            depth_view,
            camera,
            pipelines,
            static_scene: None,
            player: None,
            snow: None,
            clear_color: Color { r: r as f64, g: g as f64, b: b as f64, a: 1.0 },
            egui_renderer: egui_wgpu::Renderer::new(device, gpu.format, egui_wgpu::RendererOptions::default()),
            egui_primitives: None,
            egui_full_output: None,
            egui_dpr: 1.0,
        }
    }

    /// Upload everything that does not move. Missing optional assets just leave gaps.
    pub fn load_scene(&mut self, device: &Device, store: &AssetStore) {
        let scene = bake_static_scene(store);
        self.static_scene = (!scene.is_empty()).then(|| scene.upload(device));

        self.player = store
            .get(assets::NIDALEE)
            .and_then(|a| a.mesh())
            .filter(|m| !m.is_empty())
            .map(|mesh| PlayerModel { buffer: mesh.upload(device), mesh: mesh.clone() });

        if let Some(sky) = store.get(assets::CUBE_MAP).and_then(|a| a.texture()) {
            let [r, g, b] = sky.zenith_color().map(srgb_to_linear);
            self.clear_color = Color { r: r as f64, g: g as f64, b: b as f64, a: 1.0 };
        }
        debug!(
            scene_indices = self.static_scene.as_ref().map_or(0, |s| s.index_count),
            player = self.player.is_some(),
            "scene uploaded"
        );
    }

    pub fn resize(&mut self, device: &Device, surface: &Surface, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.surface_config.width = width;
        self.surface_config.height = height;
        surface.configure(device, &self.surface_config);
        self.depth_view = create_depth_texture(device, width, height).1;
    }

    /// Push this frame's camera, lighting, champion pose and snow to the GPU.
    pub fn prepare(&mut self, device: &Device, queue: &Queue, game: &Game, snow: Option<&Snowfall>) {
        queue.write_buffer(&self.camera.camera_buffer, 0, bytemuck::bytes_of(&CameraUniform::from_game(game)));
        let lighting = LightingUniform::new(game.light_position, game.camera.position);
        queue.write_buffer(&self.camera.lighting_buffer, 0, bytemuck::bytes_of(&lighting));

        if let Some(player) = &self.player {
            let transform = player_transform(game.player.model_position, game.player.yaw, &game.mixer);
            let posed = player.mesh.transformed(transform);
            queue.write_buffer(&player.buffer.vertex_buffer, 0, bytemuck::cast_slice(&posed.vertices));
        }

        if let Some(snow) = snow {
            let positions: Vec<[f32; 3]> = snow.positions().collect();
            let count = positions.len() as u32;
            if self.snow.as_ref().map_or(true, |s| s.capacity < count) {
                self.snow = Some(SnowBuffer {
                    buffer: device.create_buffer(&BufferDescriptor {
                        label: Some("snow_buffer"),
                        size: (count.max(1) as usize * std::mem::size_of::<[f32; 3]>()) as BufferAddress,
                        usage: BufferUsages::VERTEX | BufferUsages::COPY_DST,
                        mapped_at_creation: false,
                    }),
                    capacity: count.max(1),
                    count: 0,
                });
            }
            if let Some(buf) = &mut self.snow {
                queue.write_buffer(&buf.buffer, 0, bytemuck::cast_slice(&positions));
                buf.count = count;
            }
        }
    }

    pub fn set_ui(&mut self, primitives: Vec<egui::ClippedPrimitive>, output: egui::FullOutput, dpr: f32) {
        self.egui_primitives = Some(primitives);
        self.egui_full_output = Some(output);
        self.egui_dpr = dpr;
    }

    fn acquire(&self, device: &Device, surface: &Surface) -> Option<SurfaceTexture> {
        match surface.get_current_texture() {
            Ok(frame) => Some(frame),
            Err(SurfaceError::Lost | SurfaceError::Outdated) => {
                surface.configure(device, &self.surface_config);
                surface
                    .get_current_texture()
                    .map_err(|e| warn!(error = ?e, "frame unavailable after reconfigure"))
                    .ok()
            }
            Err(e) => {
                warn!(error = ?e, "skipping frame");
                None
            }
        }
    }

    pub fn draw_frame(&mut self, device: &Device, queue: &Queue, surface: &Surface) {
        let Some(frame) = self.acquire(device, surface) else {
            return;
        };

        let view = frame.texture.create_view(&TextureViewDescriptor::default());
        let mut encoder = device.create_command_encoder(&CommandEncoderDescriptor { label: Some("encoder") });

        {
            let mut rp = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("scene_pass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: Operations { load: LoadOp::Clear(self.clear_color), store: StoreOp::Store },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(Operations { load: LoadOp::Clear(1.0), store: StoreOp::Store }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            rp.set_pipeline(&self.pipelines.scene);
            rp.set_bind_group(0, &self.camera.bind_group, &[]);

            let meshes = self.static_scene.iter().chain(self.player.iter().map(|p| &p.buffer));
            for mesh in meshes.filter(|m| m.index_count > 0) {
                rp.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                rp.set_index_buffer(mesh.index_buffer.slice(..), IndexFormat::Uint32);
                rp.draw_indexed(0..mesh.index_count, 0, 0..1);
            }

            if let Some(snow) = self.snow.as_ref().filter(|s| s.count > 0) {
                rp.set_pipeline(&self.pipelines.particles);
                rp.set_vertex_buffer(0, snow.buffer.slice(..));
                rp.draw(0..snow.count, 0..1);
            }
        }

        if let (Some(primitives), Some(output)) = (self.egui_primitives.take(), self.egui_full_output.take()) {
            let screen_descriptor = egui_wgpu::ScreenDescriptor {
                size_in_pixels: [self.surface_config.width, self.surface_config.height],
                pixels_per_point: self.egui_dpr,
            };

            for (id, image_delta) in &output.textures_delta.set {
                self.egui_renderer.update_texture(device, queue, *id, image_delta);
            }
            self.egui_renderer
                .update_buffers(device, queue, &mut encoder, &primitives, &screen_descriptor);

            {
                let egui_pass = encoder.begin_render_pass(&RenderPassDescriptor {
                    label: Some("egui_render_pass"),
                    color_attachments: &[Some(RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: Operations { load: LoadOp::Load, store: StoreOp::Store },
                        depth_slice: None,
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                });
                self.egui_renderer
                    .render(&mut egui_pass.forget_lifetime(), &primitives, &screen_descriptor);
            }

            for id in &output.textures_delta.free {
                self.egui_renderer.free_texture(id);
            }
        }

        queue.submit(std::iter::once(encoder.finish()));
        frame.present();
    }
}
