use glam::Mat4;
use volren_core::{TransferFunction, TransferFunctionTable, Volume, VolumeDescriptor, VolumeInfo};

use super::RenderEngine;
use crate::error::RenderResult;
use crate::transfer_function_texture::TransferFunctionTexture;
use crate::volume_texture::VolumeTexture;

impl RenderEngine {
    /// Loads a raw volume file and makes it the displayed volume.
    ///
    /// On any failure the error is logged and returned, and the previously displayed
    /// volume stays bound.
    pub fn load_volume(&mut self, descriptor: &VolumeDescriptor) -> RenderResult<VolumeInfo> {
        let volume = Volume::load(descriptor).inspect_err(|e| {
            log::error!("Failed to load volume '{}': {e}", descriptor.path.display());
        })?;
        self.set_volume(volume)
    }

    /// Uploads an in-memory volume and makes it the displayed volume.
    pub fn set_volume(&mut self, volume: Volume) -> RenderResult<VolumeInfo> {
        let texture = VolumeTexture::upload(&self.device, &self.queue, volume)
            .inspect_err(|e| log::error!("Failed to upload volume: {e}"))?;
        let info = texture.info();
        // The old texture is dropped (and destroyed) only now that the upload succeeded.
        self.volume = Some(texture);
        self.refresh_bind_group();
        Ok(info)
    }

    /// Releases the displayed volume.
    pub fn clear_volume(&mut self) {
        self.volume = None;
        self.composite_bind_group = None;
    }

    /// Returns the displayed volume's metadata.
    pub fn volume_info(&self) -> Option<VolumeInfo> {
        self.volume.as_ref().map(VolumeTexture::info)
    }

    /// Returns the model matrix of the displayed volume, or identity.
    pub fn model_matrix(&self) -> Mat4 {
        self.volume
            .as_ref()
            .map_or(Mat4::IDENTITY, VolumeTexture::model_matrix)
    }

    /// Rebuilds the transfer-function table and re-uploads it.
    pub fn set_transfer_function(
        &mut self,
        transfer_function: &TransferFunction,
        resolution: usize,
    ) -> RenderResult<()> {
        let table = transfer_function.build(resolution)?;
        let texture = TransferFunctionTexture::upload(&self.device, &self.queue, &table)?;
        self.transfer_function = texture;
        self.transfer_function_table = table;
        self.refresh_bind_group();
        Ok(())
    }

    /// Returns the current transfer-function table.
    pub fn transfer_function_table(&self) -> &TransferFunctionTable {
        &self.transfer_function_table
    }

    pub(crate) fn refresh_bind_group(&mut self) {
        self.composite_bind_group = self.volume.as_ref().map(|volume| {
            self.composite_pass.create_bind_group(
                &self.device,
                self.entry_exit_pass.targets(),
                volume,
                &self.transfer_function,
            )
        });
    }
}
