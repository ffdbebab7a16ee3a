//! Rendering error types.

use thiserror::Error;

/// Errors that can occur during rendering operations.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Failed to create wgpu adapter.
    #[error("failed to create graphics adapter")]
    AdapterCreationFailed,

    /// Failed to create wgpu device.
    #[error("failed to create graphics device: {0}")]
    DeviceCreationFailed(#[from] wgpu::RequestDeviceError),

    /// Failed to create surface.
    #[error("failed to create surface: {0}")]
    SurfaceCreationFailed(#[from] wgpu::CreateSurfaceError),

    /// The surface reports no usable texture format.
    #[error("surface configuration failed")]
    SurfaceConfigurationFailed,

    /// Shader compilation or pipeline validation failed.
    #[error("shader compilation failed: {0}")]
    ShaderCompilationFailed(String),

    /// Texture creation failed validation.
    #[error("texture creation failed: {0}")]
    TextureCreationFailed(String),

    /// Volume is larger than the device's 3D texture limit.
    #[error("volume {width}x{height}x{depth} exceeds the device 3D texture limit of {limit}")]
    VolumeTooLarge {
        width: u32,
        height: u32,
        depth: u32,
        limit: u32,
    },

    /// The device ran out of memory.
    #[error("out of memory")]
    OutOfMemory,

    /// Surface lost.
    #[error("surface lost")]
    SurfaceLost,

    /// Surface outdated.
    #[error("surface outdated")]
    SurfaceOutdated,

    /// Timeout waiting for GPU.
    #[error("timeout waiting for GPU")]
    Timeout,

    /// Mapping a readback buffer failed.
    #[error("GPU buffer mapping failed")]
    BufferMapFailed,

    /// Pixel data does not match the requested image size.
    #[error("invalid image data")]
    InvalidImageData,

    /// The output file extension is not a supported image format.
    #[error("unsupported image format: {0}")]
    UnsupportedImageFormat(String),

    /// Image encoding error.
    #[error("image encoding error: {0}")]
    ImageError(#[from] image::ImageError),

    /// Volume or transfer function error.
    #[error(transparent)]
    Core(#[from] volren_core::VolrenError),
}

impl From<wgpu::Error> for RenderError {
    fn from(error: wgpu::Error) -> Self {
        match error {
            wgpu::Error::OutOfMemory { .. } => RenderError::OutOfMemory,
            other => RenderError::TextureCreationFailed(other.to_string()),
        }
    }
}

/// A specialized Result type for rendering operations.
pub type RenderResult<T> = std::result::Result<T, RenderError>;

/// Runs `f` inside a wgpu error scope and returns its result together with the first
/// error raised by the device while it ran.
pub fn scoped<T>(
    device: &wgpu::Device,
    filter: wgpu::ErrorFilter,
    f: impl FnOnce() -> T,
) -> (T, Option<wgpu::Error>) {
    device.push_error_scope(filter);
    let value = f();
    let error = pollster::block_on(device.pop_error_scope());
    (value, error)
}
