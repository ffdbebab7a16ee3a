//! 1D lookup texture built from a transfer function.

use volren_core::TransferFunctionTable;

use crate::error::{scoped, RenderResult};

/// The transfer-function table uploaded as a 1D `Rgba8Unorm` texture.
///
/// The composite shader reads it with `textureLoad` and filters manually, so no sampler
/// is attached.
pub struct TransferFunctionTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    resolution: u32,
}

impl TransferFunctionTexture {
    /// Uploads `table`.
    pub fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        table: &TransferFunctionTable,
    ) -> RenderResult<Self> {
        let resolution = table.len() as u32;
        let size = wgpu::Extent3d {
            width: resolution,
            height: 1,
            depth_or_array_layers: 1,
        };

        let (texture, error) = scoped(device, wgpu::ErrorFilter::Validation, || {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some("transfer function texture"),
                size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D1,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            })
        });
        if let Some(error) = error {
            return Err(error.into());
        }

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &table.to_rgba8(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(resolution * 4),
                rows_per_image: Some(1),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        log::debug!("Uploaded transfer function with {resolution} texels");

        Ok(Self {
            texture,
            view,
            resolution,
        })
    }

    /// Returns the texture view.
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    /// Returns the number of texels.
    pub fn resolution(&self) -> u32 {
        self.resolution
    }
}

impl Drop for TransferFunctionTexture {
    fn drop(&mut self) {
        self.texture.destroy();
    }
}
