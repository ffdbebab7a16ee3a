use glam::{Mat4, Vec4};

use super::RenderEngine;
use crate::camera::ViewCamera;
use crate::capture;
use crate::composite_pass::CompositeUniforms;
use crate::error::{RenderError, RenderResult};

/// Object-space entry and exit points read back from the GPU, row-major.
#[derive(Debug, Clone)]
pub struct EntryExitImage {
    /// Image width.
    pub width: u32,
    /// Image height.
    pub height: u32,
    /// Entry points (`w` is 1 where the proxy cube covered the pixel).
    pub entry: Vec<Vec4>,
    /// Exit points.
    pub exit: Vec<Vec4>,
}

impl EntryExitImage {
    /// Returns the entry and exit point of a pixel.
    #[must_use]
    pub fn at(&self, x: u32, y: u32) -> (Vec4, Vec4) {
        let index = (y * self.width + x) as usize;
        (self.entry[index], self.exit[index])
    }
}

impl RenderEngine {
    /// Records the entry/exit and composite passes for one frame.
    fn encode_frame(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        view_projection: Mat4,
    ) {
        let background = self.settings.background;
        match (&self.volume, &self.composite_bind_group) {
            (Some(volume), Some(bind_group)) => {
                let mvp = view_projection * volume.model_matrix();
                self.entry_exit_pass.update_uniforms(&self.queue, mvp);
                self.composite_pass.update_uniforms(
                    &self.queue,
                    &CompositeUniforms::new(
                        background,
                        self.settings.sampling_rate,
                        volume.info().max_dimension(),
                        self.settings.early_termination_alpha,
                    ),
                );
                self.entry_exit_pass.render(encoder);
                self.composite_pass
                    .render(encoder, target, bind_group, background);
            }
            _ => {
                self.entry_exit_pass.clear(encoder);
                self.composite_pass.clear(encoder, target, background);
            }
        }
    }

    /// Renders a frame to the window surface and presents it.
    ///
    /// A lost or outdated surface is reconfigured and the frame skipped; only fatal
    /// errors are returned.
    pub fn render(&self, camera: &dyn ViewCamera) -> RenderResult<()> {
        let Some(surface) = &self.surface else {
            return self.render_offscreen(camera);
        };

        let output = match surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("Surface lost or outdated, reconfiguring");
                self.reconfigure_surface();
                return Ok(());
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("Out of memory");
                return Err(RenderError::OutOfMemory);
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("Surface timeout");
                return Ok(());
            }
            Err(wgpu::SurfaceError::Other) => {
                log::warn!("Surface error: other");
                return Ok(());
            }
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame encoder"),
            });
        self.encode_frame(&mut encoder, &view, camera.view_projection_matrix());
        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    /// Renders a frame into the headless output texture.
    pub fn render_offscreen(&self, camera: &dyn ViewCamera) -> RenderResult<()> {
        let texture = self
            .output_texture
            .as_ref()
            .ok_or(RenderError::SurfaceConfigurationFailed)?;
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("offscreen frame encoder"),
            });
        self.encode_frame(&mut encoder, &view, camera.view_projection_matrix());
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    /// Renders a frame offscreen and returns its RGBA8 pixels.
    pub fn capture_frame(&self, camera: &dyn ViewCamera) -> RenderResult<Vec<u8>> {
        self.render_offscreen(camera)?;
        let texture = self
            .output_texture
            .as_ref()
            .ok_or(RenderError::SurfaceConfigurationFailed)?;
        capture::read_rgba8(&self.device, &self.queue, texture)
    }

    /// Reads back the entry/exit textures of the last rendered frame.
    pub fn read_entry_exit(&self) -> RenderResult<EntryExitImage> {
        let targets = self.entry_exit_pass.targets();
        let (width, height) = targets.size();
        let entry = capture::read_rgba16f(&self.device, &self.queue, targets.entry_texture())?;
        let exit = capture::read_rgba16f(&self.device, &self.queue, targets.exit_texture())?;
        Ok(EntryExitImage {
            width,
            height,
            entry,
            exit,
        })
    }
}
