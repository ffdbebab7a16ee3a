//! Full-screen ray-march pass.

use glam::Vec3;
use wgpu::util::DeviceExt;

use crate::entry_exit_pass::EntryExitTargets;
use crate::error::RenderResult;
use crate::mesh::ProxyMesh;
use crate::shader::{create_validated_pipeline, ShaderBuilder};
use crate::transfer_function_texture::TransferFunctionTexture;
use crate::volume_texture::VolumeTexture;

/// GPU representation of the composite parameters.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[allow(clippy::pub_underscore_fields)]
pub struct CompositeUniforms {
    pub background: [f32; 4],
    pub sampling_rate: f32,
    pub max_dimension: f32,
    pub early_termination_alpha: f32,
    pub _padding: f32,
}

impl Default for CompositeUniforms {
    fn default() -> Self {
        Self {
            background: [0.0, 0.0, 0.0, 1.0],
            sampling_rate: 1.0,
            max_dimension: 1.0,
            early_termination_alpha: 0.99,
            _padding: 0.0,
        }
    }
}

impl CompositeUniforms {
    /// Builds uniforms for a volume whose largest axis has `max_dimension` voxels.
    #[must_use]
    pub fn new(
        background: Vec3,
        sampling_rate: f32,
        max_dimension: u32,
        early_termination_alpha: f32,
    ) -> Self {
        Self {
            background: background.extend(1.0).to_array(),
            sampling_rate: sampling_rate.max(1.0),
            max_dimension: max_dimension as f32,
            early_termination_alpha,
            _padding: 0.0,
        }
    }
}

/// Composite pass resources.
pub struct CompositePass {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    quad: ProxyMesh,
}

impl CompositePass {
    /// Creates the pass rendering into `output_format`.
    pub fn new(device: &wgpu::Device, output_format: wgpu::TextureFormat) -> RenderResult<Self> {
        let unfiltered_2d = wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: false },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        };

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Composite Bind Group Layout"),
            entries: &[
                // Entry points
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: unfiltered_2d,
                    count: None,
                },
                // Exit points
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: unfiltered_2d,
                    count: None,
                },
                // Volume
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D3,
                        multisampled: false,
                    },
                    count: None,
                },
                // Volume sampler
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                // Transfer function
                wgpu::BindGroupLayoutEntry {
                    binding: 4,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D1,
                        multisampled: false,
                    },
                    count: None,
                },
                // Uniforms
                wgpu::BindGroupLayoutEntry {
                    binding: 5,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(
                            std::mem::size_of::<CompositeUniforms>() as u64,
                        ),
                    },
                    count: None,
                },
            ],
        });

        let shader = ShaderBuilder::new()
            .with_label("composite shader")
            .with_source(include_str!("shaders/composite.wgsl"))
            .build(device)?;

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Composite Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = create_validated_pipeline(
            device,
            &wgpu::RenderPipelineDescriptor {
                label: Some("Composite Pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader.module,
                    entry_point: Some(shader.vertex_entry()),
                    buffers: &[ProxyMesh::quad_layout()],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader.module,
                    entry_point: Some(shader.fragment_entry()),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: output_format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            },
        )?;

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Composite Uniform Buffer"),
            contents: bytemuck::cast_slice(&[CompositeUniforms::default()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        Ok(Self {
            pipeline,
            bind_group_layout,
            uniform_buffer,
            quad: ProxyMesh::quad(device),
        })
    }

    /// Uploads the composite parameters.
    pub fn update_uniforms(&self, queue: &wgpu::Queue, uniforms: &CompositeUniforms) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[*uniforms]));
    }

    /// Creates a bind group; must be rebuilt whenever any of the inputs is replaced.
    pub fn create_bind_group(
        &self,
        device: &wgpu::Device,
        targets: &EntryExitTargets,
        volume: &VolumeTexture,
        transfer_function: &TransferFunctionTexture,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Composite Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(targets.entry_view()),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(targets.exit_view()),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(volume.view()),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(volume.sampler()),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::TextureView(transfer_function.view()),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
            ],
        })
    }

    /// Ray-marches every pixel of `output_view`.
    pub fn render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        output_view: &wgpu::TextureView,
        bind_group: &wgpu::BindGroup,
        background: Vec3,
    ) {
        let mut render_pass = begin(encoder, output_view, background, "Composite Pass");
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, bind_group, &[]);
        self.quad.draw(&mut render_pass);
    }

    /// Fills `output_view` with the background color (no volume loaded).
    pub fn clear(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        output_view: &wgpu::TextureView,
        background: Vec3,
    ) {
        let _render_pass = begin(encoder, output_view, background, "Background Clear Pass");
    }
}

fn begin<'e>(
    encoder: &'e mut wgpu::CommandEncoder,
    output_view: &wgpu::TextureView,
    background: Vec3,
    label: &str,
) -> wgpu::RenderPass<'e> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: output_view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color {
                    r: f64::from(background.x),
                    g: f64::from(background.y),
                    b: f64::from(background.z),
                    a: 1.0,
                }),
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })],
        depth_stencil_attachment: None,
        ..Default::default()
    })
}
