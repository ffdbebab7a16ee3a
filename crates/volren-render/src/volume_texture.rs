//! 3D texture holding the scalar volume.

use glam::{Mat4, UVec3};
use half::f16;
use volren_core::{BitDepth, Volume, VolumeInfo};

use crate::error::{scoped, RenderError, RenderResult};

/// Picks the texture format for a bit depth given the device features.
#[must_use]
pub fn texture_format(bit_depth: BitDepth, features: wgpu::Features) -> wgpu::TextureFormat {
    match bit_depth {
        BitDepth::U8 => wgpu::TextureFormat::R8Unorm,
        BitDepth::U16 if features.contains(wgpu::Features::TEXTURE_FORMAT_16BIT_NORM) => {
            wgpu::TextureFormat::R16Unorm
        }
        BitDepth::U16 => wgpu::TextureFormat::R16Float,
    }
}

/// Converts little-endian 16-bit samples into normalized half floats.
#[must_use]
pub fn u16_to_f16_bytes(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    for sample in data.chunks_exact(2) {
        let value = f32::from(u16::from_le_bytes([sample[0], sample[1]])) / 65535.0;
        out.extend_from_slice(&f16::from_f32(value).to_le_bytes());
    }
    out
}

/// Checks a volume shape against the device's 3D texture limit.
pub fn check_limits(dimensions: UVec3, limits: &wgpu::Limits) -> RenderResult<()> {
    let limit = limits.max_texture_dimension_3d;
    if dimensions.max_element() > limit {
        return Err(RenderError::VolumeTooLarge {
            width: dimensions.x,
            height: dimensions.y,
            depth: dimensions.z,
            limit,
        });
    }
    Ok(())
}

/// A volume uploaded to the GPU. The texture memory is released when this is dropped.
pub struct VolumeTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
    info: VolumeInfo,
}

impl VolumeTexture {
    /// Uploads `volume`, consuming it so the CPU copy is freed right after the upload.
    pub fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        volume: Volume,
    ) -> RenderResult<Self> {
        let (info, data) = volume.into_parts();
        let dims = info.dimensions;
        check_limits(dims, &device.limits())?;

        let format = texture_format(info.bit_depth, device.features());
        let data = if format == wgpu::TextureFormat::R16Float {
            log::debug!("16-bit normalized textures unavailable, converting volume to f16");
            u16_to_f16_bytes(&data)
        } else {
            data
        };

        let size = wgpu::Extent3d {
            width: dims.x,
            height: dims.y,
            depth_or_array_layers: dims.z,
        };

        let ((texture, validation), out_of_memory) =
            scoped(device, wgpu::ErrorFilter::OutOfMemory, || {
                scoped(device, wgpu::ErrorFilter::Validation, || {
                    device.create_texture(&wgpu::TextureDescriptor {
                        label: Some("volume texture"),
                        size,
                        mip_level_count: 1,
                        sample_count: 1,
                        dimension: wgpu::TextureDimension::D3,
                        format,
                        usage: wgpu::TextureUsages::TEXTURE_BINDING
                            | wgpu::TextureUsages::COPY_DST,
                        view_formats: &[],
                    })
                })
            });
        if out_of_memory.is_some() {
            texture.destroy();
            return Err(RenderError::OutOfMemory);
        }
        if let Some(error) = validation {
            texture.destroy();
            return Err(error.into());
        }

        let bytes_per_voxel = format
            .block_copy_size(None)
            .unwrap_or_else(|| info.bit_depth.bytes());
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(dims.x * bytes_per_voxel),
                rows_per_image: Some(dims.y),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("volume sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        log::info!(
            "Uploaded {}x{}x{} volume as {:?}",
            dims.x,
            dims.y,
            dims.z,
            format
        );

        Ok(Self {
            texture,
            view,
            sampler,
            info,
        })
    }

    /// Returns the texture view.
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    /// Returns the trilinear clamp-to-edge sampler.
    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }

    /// Returns the texture format.
    pub fn format(&self) -> wgpu::TextureFormat {
        self.texture.format()
    }

    /// Returns shape metadata.
    pub fn info(&self) -> VolumeInfo {
        self.info
    }

    /// Returns the model matrix of the volume's bounding box.
    pub fn model_matrix(&self) -> Mat4 {
        self.info.model_matrix()
    }
}

impl Drop for VolumeTexture {
    fn drop(&mut self) {
        self.texture.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_texture_format_selection() {
        assert_eq!(
            texture_format(BitDepth::U8, wgpu::Features::empty()),
            wgpu::TextureFormat::R8Unorm
        );
        assert_eq!(
            texture_format(BitDepth::U16, wgpu::Features::TEXTURE_FORMAT_16BIT_NORM),
            wgpu::TextureFormat::R16Unorm
        );
        assert_eq!(
            texture_format(BitDepth::U16, wgpu::Features::empty()),
            wgpu::TextureFormat::R16Float
        );
    }

    #[test]
    fn test_u16_to_f16_conversion() {
        let bytes = u16_to_f16_bytes(&[0x00, 0x00, 0xFF, 0xFF, 0x00, 0x80]);
        let values: Vec<f32> = bytes
            .chunks_exact(2)
            .map(|b| f16::from_le_bytes([b[0], b[1]]).to_f32())
            .collect();
        assert_eq!(values[0], 0.0);
        assert_eq!(values[1], 1.0);
        assert!((values[2] - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_volume_too_large() {
        let limits = wgpu::Limits::default();
        let max = limits.max_texture_dimension_3d;
        assert!(check_limits(UVec3::splat(max), &limits).is_ok());
        assert!(matches!(
            check_limits(UVec3::new(8, 8, max + 1), &limits),
            Err(RenderError::VolumeTooLarge { depth, .. }) if depth == max + 1
        ));
    }
}
