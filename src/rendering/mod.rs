//! Rendering system with wgpu pipelines, per-frame vertex upload and readback.

mod readback;

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use log::{info, warn};
use wgpu::util::DeviceExt;

pub use readback::{padded_bytes_per_row, pixel_layout, strip_padding, FrameReadback};

use crate::capture::{PixelLayout, RawFrame};
use crate::error::{Result, VisualizerError};
use crate::scene::{ColorVertex, DrawList, SceneDressing, WallUniforms};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Uniform buffer shared by the sky and geometry shaders
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct FrameUniforms {
    pub view_proj: [[f32; 4]; 4],
    /// xyz: eye position, w: fog density
    pub camera: [f32; 4],
    pub fog_color: [f32; 4],
    pub sky_top: [f32; 4],
    pub sky_bottom: [f32; 4],
}

impl FrameUniforms {
    pub fn new(view_proj: Mat4, eye: Vec3, dressing: &SceneDressing) -> Self {
        let rgba = |c: [f32; 3]| [c[0], c[1], c[2], 1.0];
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            camera: [eye.x, eye.y, eye.z, dressing.fog_density],
            fog_color: rgba(dressing.fog_color),
            sky_top: rgba(dressing.sky_top),
            sky_bottom: rgba(dressing.sky_bottom),
        }
    }
}

/// Vertex buffer that grows (never shrinks) to fit the largest frame seen
struct GrowableBuffer {
    label: &'static str,
    buffer: wgpu::Buffer,
    len: u32,
}

impl GrowableBuffer {
    const INITIAL_BYTES: u64 = 64 * 1024;

    fn new(device: &wgpu::Device, label: &'static str) -> Self {
        Self {
            label,
            buffer: Self::allocate(device, label, Self::INITIAL_BYTES),
            len: 0,
        }
    }

    fn allocate(device: &wgpu::Device, label: &'static str, size: u64) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, vertices: &[ColorVertex]) {
        self.len = vertices.len() as u32;
        if vertices.is_empty() {
            return;
        }
        let bytes: &[u8] = bytemuck::cast_slice(vertices);
        if bytes.len() as u64 > self.buffer.size() {
            let size = (bytes.len() as u64).next_power_of_two();
            self.buffer = Self::allocate(device, self.label, size);
        }
        queue.write_buffer(&self.buffer, 0, bytes);
    }
}

/// Rendering system managing wgpu device, pipelines, and buffers
pub struct RenderSystem {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    depth_view: wgpu::TextureView,
    sky_pipeline: wgpu::RenderPipeline,
    wall_pipeline: wgpu::RenderPipeline,
    line_pipeline: wgpu::RenderPipeline,
    triangle_pipeline: wgpu::RenderPipeline,
    point_pipeline: wgpu::RenderPipeline,
    frame_uniform_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    wall_uniform_buffer: wgpu::Buffer,
    wall_bind_group: wgpu::BindGroup,
    lines: GrowableBuffer,
    triangles: GrowableBuffer,
    points: GrowableBuffer,
    readback: Option<FrameReadback>,
}

impl RenderSystem {
    /// Create new rendering system
    pub async fn new(window: Arc<winit::window::Window>) -> Result<Self> {
        let size = window.inner_size();
        let (width, height) = (size.width.max(1), size.height.max(1));

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        // Create surface (window must have 'static lifetime via Arc)
        let surface = instance
            .create_surface(window)
            .map_err(|e| VisualizerError::Gpu(format!("failed to create surface: {e}")))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| VisualizerError::Gpu("no suitable GPU adapter".into()))?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Main Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await
            .map_err(|e| VisualizerError::Gpu(format!("failed to request device: {e}")))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or_else(|| VisualizerError::Gpu("surface reports no formats".into()))?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let mut usage = wgpu::TextureUsages::RENDER_ATTACHMENT;

        // Frames can only be read back when the surface allows copies out
        let layout = pixel_layout(surface_format);
        let readback = match layout {
            Some(layout) if surface_caps.usages.contains(wgpu::TextureUsages::COPY_SRC) => {
                usage |= wgpu::TextureUsages::COPY_SRC;
                Some(FrameReadback::new(layout))
            }
            _ => {
                warn!("surface {:?} cannot be read back; recording disabled", surface_format);
                None
            }
        };

        let config = wgpu::SurfaceConfiguration {
            usage,
            format: surface_format,
            width,
            height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        let depth_view = create_depth_view(&device, width, height);

        // Load shaders
        let scene_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scene Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("scene.wgsl").into()),
        });
        let sky_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Sky Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("sky.wgsl").into()),
        });
        let wall_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Wall Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("wall.wgsl").into()),
        });

        let frame_uniforms = FrameUniforms::new(
            Mat4::IDENTITY,
            Vec3::ZERO,
            &crate::scene::SceneMode::Orb.dressing(),
        );
        let frame_uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Frame Uniform Buffer"),
            contents: bytemuck::cast_slice(&[frame_uniforms]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let wall_uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Wall Uniform Buffer"),
            contents: bytemuck::cast_slice(&[WallUniforms::default()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let (frame_layout, frame_bind_group) =
            uniform_bind_group(&device, "Frame", &frame_uniform_buffer);
        let (wall_layout, wall_bind_group) =
            uniform_bind_group(&device, "Wall", &wall_uniform_buffer);

        let frame_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Frame Pipeline Layout"),
            bind_group_layouts: &[&frame_layout],
            push_constant_ranges: &[],
        });
        let wall_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Wall Pipeline Layout"),
            bind_group_layouts: &[&wall_layout],
            push_constant_ranges: &[],
        });

        let format = config.format;
        let sky_pipeline =
            fullscreen_pipeline(&device, "Sky Pipeline", &frame_pipeline_layout, &sky_shader, format);
        let wall_pipeline =
            fullscreen_pipeline(&device, "Wall Pipeline", &wall_pipeline_layout, &wall_shader, format);
        let geometry = |label, topology, depth_write| {
            geometry_pipeline(
                &device,
                label,
                &frame_pipeline_layout,
                &scene_shader,
                format,
                topology,
                depth_write,
            )
        };
        let line_pipeline = geometry("Line Pipeline", wgpu::PrimitiveTopology::LineList, false);
        let triangle_pipeline =
            geometry("Triangle Pipeline", wgpu::PrimitiveTopology::TriangleList, true);
        let point_pipeline = geometry("Point Pipeline", wgpu::PrimitiveTopology::PointList, false);

        info!(
            "GPU: {} ({:?}), surface {}x{} {:?}",
            adapter.get_info().name,
            adapter.get_info().backend,
            width,
            height,
            surface_format
        );

        let lines = GrowableBuffer::new(&device, "Line Vertex Buffer");
        let triangles = GrowableBuffer::new(&device, "Triangle Vertex Buffer");
        let points = GrowableBuffer::new(&device, "Point Vertex Buffer");

        Ok(Self {
            surface,
            device,
            queue,
            config,
            depth_view,
            sky_pipeline,
            wall_pipeline,
            line_pipeline,
            triangle_pipeline,
            point_pipeline,
            frame_uniform_buffer,
            frame_bind_group,
            wall_uniform_buffer,
            wall_bind_group,
            lines,
            triangles,
            points,
            readback,
        })
    }

    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    /// Byte order of read-back frames, `None` when capture is unavailable
    pub fn capture_layout(&self) -> Option<PixelLayout> {
        self.readback.as_ref().map(FrameReadback::layout)
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_view = create_depth_view(&self.device, width, height);
        if let Some(readback) = &mut self.readback {
            readback.resize();
        }
    }

    /// Reconfigure after `SurfaceError::Lost` / `Outdated`
    pub fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
    }

    /// Draw one frame; when `capture` is set the presented image is also copied for readback
    ///
    /// Returns whether a capture copy was queued.
    pub fn render(
        &mut self,
        list: &DrawList,
        uniforms: &FrameUniforms,
        draw_sky: bool,
        capture: bool,
    ) -> std::result::Result<bool, wgpu::SurfaceError> {
        self.queue
            .write_buffer(&self.frame_uniform_buffer, 0, bytemuck::cast_slice(&[*uniforms]));
        if let Some(wall) = &list.wall {
            self.queue
                .write_buffer(&self.wall_uniform_buffer, 0, bytemuck::cast_slice(&[*wall]));
        }
        self.lines.upload(&self.device, &self.queue, &list.lines);
        self.triangles.upload(&self.device, &self.queue, &list.triangles);
        self.points.upload(&self.device, &self.queue, &list.points);

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if list.wall.is_some() {
                render_pass.set_pipeline(&self.wall_pipeline);
                render_pass.set_bind_group(0, &self.wall_bind_group, &[]);
                render_pass.draw(0..3, 0..1);
            } else if draw_sky {
                render_pass.set_pipeline(&self.sky_pipeline);
                render_pass.set_bind_group(0, &self.frame_bind_group, &[]);
                render_pass.draw(0..3, 0..1); // Fullscreen triangle
            }

            let batches = [
                (&self.triangle_pipeline, &self.triangles),
                (&self.line_pipeline, &self.lines),
                (&self.point_pipeline, &self.points),
            ];
            for (pipeline, batch) in batches {
                if batch.len == 0 {
                    continue;
                }
                render_pass.set_pipeline(pipeline);
                render_pass.set_bind_group(0, &self.frame_bind_group, &[]);
                render_pass.set_vertex_buffer(0, batch.buffer.slice(..));
                render_pass.draw(0..batch.len, 0..1);
            }
        }

        let captured = match (&mut self.readback, capture) {
            (Some(readback), true) => readback.record(&self.device, &mut encoder, &output.texture),
            _ => false,
        };

        self.queue.submit(std::iter::once(encoder.finish()));
        if let Some(readback) = &mut self.readback {
            readback.map_submitted();
        }
        output.present();

        Ok(captured)
    }

    /// Frames whose readback has completed since the last call
    pub fn poll_captures(&mut self) -> Vec<RawFrame> {
        let Some(readback) = &mut self.readback else {
            return Vec::new();
        };
        if readback.in_flight() == 0 {
            return Vec::new();
        }
        self.device.poll(wgpu::Maintain::Poll);
        readback.collect()
    }

    /// Wait for every queued readback and return the frames in order
    ///
    /// Blocks on the GPU; only used when a recording stops.
    pub fn flush_captures(&mut self) -> Vec<RawFrame> {
        let Some(readback) = &mut self.readback else {
            return Vec::new();
        };
        if readback.in_flight() == 0 {
            return Vec::new();
        }
        self.device.poll(wgpu::Maintain::Wait);
        readback.collect()
    }
}

fn create_depth_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

fn uniform_bind_group(
    device: &wgpu::Device,
    label: &str,
    buffer: &wgpu::Buffer,
) -> (wgpu::BindGroupLayout, wgpu::BindGroup) {
    let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(&format!("{label} Bind Group Layout")),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    });
    let group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(&format!("{label} Bind Group")),
        layout: &layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: buffer.as_entire_binding(),
        }],
    });
    (layout, group)
}

/// Background pass drawn with a single fullscreen triangle
fn fullscreen_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: false,
            depth_compare: wgpu::CompareFunction::Always,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

fn geometry_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    topology: wgpu::PrimitiveTopology,
    depth_write: bool,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<ColorVertex>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &[
                    wgpu::VertexAttribute {
                        offset: 0,
                        shader_location: 0,
                        format: wgpu::VertexFormat::Float32x3,
                    },
                    wgpu::VertexAttribute {
                        offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                        shader_location: 1,
                        format: wgpu::VertexFormat::Float32x4,
                    },
                ],
            }],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: depth_write,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneMode;

    #[test]
    fn test_frame_uniforms_layout() {
        // mat4 + four vec4s, matching FrameUniforms in the WGSL
        assert_eq!(std::mem::size_of::<FrameUniforms>(), 128);
        assert_eq!(std::mem::size_of::<WallUniforms>(), 16);
        assert_eq!(std::mem::size_of::<ColorVertex>(), 28);
    }

    #[test]
    fn test_wall_shader_draws_white_lines() {
        let source = include_str!("wall.wgsl");
        assert!(source.contains("return vec4<f32>(vec3<f32>(line), 1.0);"));
        assert!(!source.contains("mix("));
        // Same field constants as scene::wall::pattern
        for term in ["0.4 + bass * 1.2", "0.08 + bass * 0.22", "time * 0.1", "* 6.0"] {
            assert!(source.contains(term), "wall.wgsl lost `{term}`");
        }
    }

    #[test]
    fn test_frame_uniforms_carry_fog() {
        let dressing = SceneMode::Terrain.dressing();
        let uniforms = FrameUniforms::new(Mat4::IDENTITY, Vec3::new(1.0, 2.0, 3.0), &dressing);
        assert_eq!(uniforms.camera, [1.0, 2.0, 3.0, dressing.fog_density]);
        assert_eq!(uniforms.fog_color[3], 1.0);
    }
}
