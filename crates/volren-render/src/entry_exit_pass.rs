//! Ray entry/exit points from two depth-tested draws of the proxy cube.
//!
//! The exit sub-pass keeps the farthest fragment (back faces) and the entry sub-pass the
//! nearest (front faces). Both write object-space positions into `Rgba16Float` targets
//! that are cleared to transparent black, so pixels the cube does not cover read back
//! entry == exit.

use glam::Mat4;
use wgpu::util::DeviceExt;

use crate::error::RenderResult;
use crate::mesh::ProxyMesh;
use crate::shader::{create_validated_pipeline, ShaderBuilder};

/// Format of the entry and exit targets.
pub const ENTRY_EXIT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
/// Format of the shared depth attachment.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Size of the targets for a framebuffer of `width` x `height`; never zero.
#[must_use]
pub fn target_size(width: u32, height: u32) -> (u32, u32) {
    (width.max(1), height.max(1))
}

/// Returns whether targets of `current` size must be rebuilt for a new framebuffer size.
#[must_use]
pub fn needs_rebuild(current: (u32, u32), width: u32, height: u32) -> bool {
    target_size(width, height) != current
}

/// GPU representation of the proxy transform.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ProxyUniforms {
    /// projection * view * model
    pub mvp: [[f32; 4]; 4],
}

impl Default for ProxyUniforms {
    fn default() -> Self {
        Self {
            mvp: Mat4::IDENTITY.to_cols_array_2d(),
        }
    }
}

/// One of the two draws of the proxy cube.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubPass {
    /// Farthest surface, written to the exit target.
    Exit,
    /// Nearest surface, written to the entry target.
    Entry,
}

impl SubPass {
    /// Sub-passes in the order they are recorded.
    pub const ORDER: [SubPass; 2] = [SubPass::Exit, SubPass::Entry];

    /// Depth comparison selecting the surface this sub-pass keeps.
    pub fn depth_compare(self) -> wgpu::CompareFunction {
        match self {
            SubPass::Exit => wgpu::CompareFunction::Greater,
            SubPass::Entry => wgpu::CompareFunction::Less,
        }
    }

    /// Value the depth attachment is cleared to before drawing.
    pub fn depth_clear(self) -> f32 {
        match self {
            SubPass::Exit => 0.0,
            SubPass::Entry => 1.0,
        }
    }

    fn label(self) -> &'static str {
        match self {
            SubPass::Exit => "exit points pass",
            SubPass::Entry => "entry points pass",
        }
    }
}

/// Entry, exit and depth textures sized to the framebuffer.
pub struct EntryExitTargets {
    entry: wgpu::Texture,
    entry_view: wgpu::TextureView,
    exit: wgpu::Texture,
    exit_view: wgpu::TextureView,
    depth_view: wgpu::TextureView,
    width: u32,
    height: u32,
}

impl EntryExitTargets {
    /// Creates all three targets.
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let (width, height) = target_size(width, height);
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        let color_target = |label: &str| {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: ENTRY_EXIT_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::COPY_SRC,
                view_formats: &[],
            })
        };

        let entry = color_target("entry points");
        let exit = color_target("exit points");
        let depth = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("entry/exit depth"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });

        Self {
            entry_view: entry.create_view(&wgpu::TextureViewDescriptor::default()),
            exit_view: exit.create_view(&wgpu::TextureViewDescriptor::default()),
            depth_view: depth.create_view(&wgpu::TextureViewDescriptor::default()),
            entry,
            exit,
            width,
            height,
        }
    }

    /// Returns the target a sub-pass renders into.
    pub fn target(&self, sub_pass: SubPass) -> &wgpu::TextureView {
        match sub_pass {
            SubPass::Exit => &self.exit_view,
            SubPass::Entry => &self.entry_view,
        }
    }

    /// Returns the entry texture.
    pub fn entry_texture(&self) -> &wgpu::Texture {
        &self.entry
    }

    /// Returns the exit texture.
    pub fn exit_texture(&self) -> &wgpu::Texture {
        &self.exit
    }

    /// Returns the entry view.
    pub fn entry_view(&self) -> &wgpu::TextureView {
        &self.entry_view
    }

    /// Returns the exit view.
    pub fn exit_view(&self) -> &wgpu::TextureView {
        &self.exit_view
    }

    /// Returns the target size.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Pipelines and resources of the entry/exit pass.
pub struct EntryExitPass {
    exit_pipeline: wgpu::RenderPipeline,
    entry_pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    cube: ProxyMesh,
    targets: EntryExitTargets,
}

impl EntryExitPass {
    /// Creates the pass and targets of the given size.
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> RenderResult<Self> {
        let shader = ShaderBuilder::new()
            .with_label("entry/exit shader")
            .with_source(include_str!("shaders/entry_exit.wgsl"))
            .build(device)?;

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Entry Exit Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<ProxyUniforms>() as u64,
                    ),
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Entry Exit Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let create_pipeline = |sub_pass: SubPass| {
            create_validated_pipeline(
                device,
                &wgpu::RenderPipelineDescriptor {
                    label: Some(sub_pass.label()),
                    layout: Some(&pipeline_layout),
                    vertex: wgpu::VertexState {
                        module: &shader.module,
                        entry_point: Some(shader.vertex_entry()),
                        buffers: &[ProxyMesh::cube_layout()],
                        compilation_options: Default::default(),
                    },
                    fragment: Some(wgpu::FragmentState {
                        module: &shader.module,
                        entry_point: Some(shader.fragment_entry()),
                        targets: &[Some(wgpu::ColorTargetState {
                            format: ENTRY_EXIT_FORMAT,
                            blend: None,
                            write_mask: wgpu::ColorWrites::ALL,
                        })],
                        compilation_options: Default::default(),
                    }),
                    primitive: wgpu::PrimitiveState {
                        topology: wgpu::PrimitiveTopology::TriangleStrip,
                        strip_index_format: Some(wgpu::IndexFormat::Uint16),
                        cull_mode: None,
                        ..Default::default()
                    },
                    depth_stencil: Some(wgpu::DepthStencilState {
                        format: DEPTH_FORMAT,
                        depth_write_enabled: true,
                        depth_compare: sub_pass.depth_compare(),
                        stencil: wgpu::StencilState::default(),
                        bias: wgpu::DepthBiasState::default(),
                    }),
                    multisample: wgpu::MultisampleState::default(),
                    multiview: None,
                    cache: None,
                },
            )
        };

        let exit_pipeline = create_pipeline(SubPass::Exit)?;
        let entry_pipeline = create_pipeline(SubPass::Entry)?;

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Entry Exit Uniform Buffer"),
            contents: bytemuck::cast_slice(&[ProxyUniforms::default()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Entry Exit Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        Ok(Self {
            exit_pipeline,
            entry_pipeline,
            uniform_buffer,
            bind_group,
            cube: ProxyMesh::cube(device),
            targets: EntryExitTargets::new(device, width, height),
        })
    }

    /// Rebuilds the targets for a new framebuffer size.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        if !needs_rebuild(self.targets.size(), width, height) {
            return;
        }
        self.targets = EntryExitTargets::new(device, width, height);
    }

    /// Returns the current targets.
    pub fn targets(&self) -> &EntryExitTargets {
        &self.targets
    }

    /// Uploads the combined projection-view-model matrix.
    pub fn update_uniforms(&self, queue: &wgpu::Queue, mvp: Mat4) {
        let uniforms = ProxyUniforms {
            mvp: mvp.to_cols_array_2d(),
        };
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));
    }

    /// Clears both targets without drawing, so every pixel reads entry == exit.
    pub fn clear(&self, encoder: &mut wgpu::CommandEncoder) {
        for sub_pass in SubPass::ORDER {
            let _pass = self.begin(encoder, sub_pass);
        }
    }

    /// Records both sub-passes.
    pub fn render(&self, encoder: &mut wgpu::CommandEncoder) {
        for sub_pass in SubPass::ORDER {
            let mut render_pass = self.begin(encoder, sub_pass);
            render_pass.set_pipeline(match sub_pass {
                SubPass::Exit => &self.exit_pipeline,
                SubPass::Entry => &self.entry_pipeline,
            });
            render_pass.set_bind_group(0, &self.bind_group, &[]);
            self.cube.draw(&mut render_pass);
        }
    }

    fn begin<'e>(
        &self,
        encoder: &'e mut wgpu::CommandEncoder,
        sub_pass: SubPass,
    ) -> wgpu::RenderPass<'e> {
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(sub_pass.label()),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: self.targets.target(sub_pass),
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.targets.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(sub_pass.depth_clear()),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proxy_uniforms_size() {
        assert_eq!(std::mem::size_of::<ProxyUniforms>(), 64);
    }

    #[test]
    fn test_resize_rebuilds_only_on_size_change() {
        assert_eq!(target_size(0, 0), (1, 1));
        assert_eq!(target_size(640, 480), (640, 480));
        assert!(!needs_rebuild((640, 480), 640, 480));
        assert!(needs_rebuild((640, 480), 800, 480));
        assert!(needs_rebuild((640, 480), 640, 600));
        // A minimized window keeps 1x1 targets.
        assert!(!needs_rebuild((1, 1), 0, 0));
    }

    #[test]
    fn test_sub_pass_depth_setup() {
        assert_eq!(SubPass::ORDER, [SubPass::Exit, SubPass::Entry]);
        assert_eq!(SubPass::Exit.depth_compare(), wgpu::CompareFunction::Greater);
        assert_eq!(SubPass::Exit.depth_clear(), 0.0);
        assert_eq!(SubPass::Entry.depth_compare(), wgpu::CompareFunction::Less);
        assert_eq!(SubPass::Entry.depth_clear(), 1.0);
    }
}
