//! The main rendering engine.

mod rendering;
mod volume;

pub use rendering::EntryExitImage;

use std::sync::Arc;

use glam::Vec3;
use volren_core::{Options, TransferFunctionTable};

use crate::composite_pass::CompositePass;
use crate::entry_exit_pass::EntryExitPass;
use crate::error::{RenderError, RenderResult};
use crate::transfer_function_texture::TransferFunctionTexture;
use crate::volume_texture::VolumeTexture;

/// Per-frame ray-march settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSettings {
    /// Color composited behind the volume.
    pub background: Vec3,
    /// Samples per voxel along a ray.
    pub sampling_rate: f32,
    /// Accumulated opacity at which a ray stops.
    pub early_termination_alpha: f32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self::from(&Options::default())
    }
}

impl From<&Options> for RenderSettings {
    fn from(options: &Options) -> Self {
        Self {
            background: options.background_color,
            sampling_rate: options.sampling_rate.max(1.0),
            early_termination_alpha: options.early_termination_alpha,
        }
    }
}

/// The main rendering engine backed by wgpu.
pub struct RenderEngine {
    /// The wgpu instance.
    pub instance: wgpu::Instance,
    /// The wgpu adapter.
    pub adapter: wgpu::Adapter,
    /// The wgpu device.
    pub device: wgpu::Device,
    /// The wgpu queue.
    pub queue: wgpu::Queue,
    /// The render surface (None for headless).
    pub surface: Option<wgpu::Surface<'static>>,
    /// Surface configuration; for headless engines it describes the offscreen target.
    pub surface_config: wgpu::SurfaceConfiguration,
    /// Current viewport width.
    pub width: u32,
    /// Current viewport height.
    pub height: u32,
    /// Ray-march settings.
    pub settings: RenderSettings,
    /// Offscreen color target (headless only).
    pub(crate) output_texture: Option<wgpu::Texture>,
    pub(crate) entry_exit_pass: EntryExitPass,
    pub(crate) composite_pass: CompositePass,
    pub(crate) volume: Option<VolumeTexture>,
    pub(crate) transfer_function: TransferFunctionTexture,
    pub(crate) transfer_function_table: TransferFunctionTable,
    pub(crate) composite_bind_group: Option<wgpu::BindGroup>,
}

impl RenderEngine {
    /// Creates a new windowed render engine.
    pub async fn new_windowed(
        window: Arc<winit::window::Window>,
        options: &Options,
    ) -> RenderResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..wgpu::InstanceDescriptor::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| RenderError::AdapterCreationFailed)?;

        let (device, queue) = Self::request_device(&adapter, "volren device").await?;

        let size = window.inner_size();
        let width = size.width.max(1);
        let height = size.height.max(1);

        // Colors are written as-is, so prefer a linear (non-sRGB) surface format.
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| !f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or(RenderError::SurfaceConfigurationFailed)?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        log::info!(
            "Created windowed engine on '{}' ({:?}), surface {:?} {}x{}",
            adapter.get_info().name,
            adapter.get_info().backend,
            surface_format,
            width,
            height
        );

        Self::from_parts(
            instance,
            adapter,
            device,
            queue,
            Some(surface),
            surface_config,
            options,
        )
    }

    /// Creates a new headless render engine.
    pub async fn new_headless(width: u32, height: u32, options: &Options) -> RenderResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..wgpu::InstanceDescriptor::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| RenderError::AdapterCreationFailed)?;

        let (device, queue) = Self::request_device(&adapter, "volren device (headless)").await?;

        let width = width.max(1);
        let height = height.max(1);
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            format: wgpu::TextureFormat::Rgba8Unorm,
            width,
            height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        log::info!(
            "Created headless engine on '{}' ({:?}) {}x{}",
            adapter.get_info().name,
            adapter.get_info().backend,
            width,
            height
        );

        let mut engine =
            Self::from_parts(instance, adapter, device, queue, None, surface_config, options)?;
        engine.output_texture = Some(engine.create_output_texture());
        Ok(engine)
    }

    async fn request_device(
        adapter: &wgpu::Adapter,
        label: &str,
    ) -> RenderResult<(wgpu::Device, wgpu::Queue)> {
        // 16-bit normalized formats are optional; without them 16-bit volumes are
        // converted to half floats on upload.
        let required_features =
            adapter.features() & wgpu::Features::TEXTURE_FORMAT_16BIT_NORM;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some(label),
                required_features,
                required_limits: adapter.limits(),
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::default(),
                experimental_features: wgpu::ExperimentalFeatures::default(),
            })
            .await?;
        Ok((device, queue))
    }

    fn from_parts(
        instance: wgpu::Instance,
        adapter: wgpu::Adapter,
        device: wgpu::Device,
        queue: wgpu::Queue,
        surface: Option<wgpu::Surface<'static>>,
        surface_config: wgpu::SurfaceConfiguration,
        options: &Options,
    ) -> RenderResult<Self> {
        let options = options.sanitized();
        let width = surface_config.width;
        let height = surface_config.height;

        let entry_exit_pass = EntryExitPass::new(&device, width, height)?;
        let composite_pass = CompositePass::new(&device, surface_config.format)?;

        let transfer_function_table = options
            .transfer_function
            .build(options.transfer_function_resolution)?;
        let transfer_function =
            TransferFunctionTexture::upload(&device, &queue, &transfer_function_table)?;

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
            surface,
            surface_config,
            width,
            height,
            settings: RenderSettings::from(&options),
            output_texture: None,
            entry_exit_pass,
            composite_pass,
            volume: None,
            transfer_function,
            transfer_function_table,
            composite_bind_group: None,
        })
    }

    fn create_output_texture(&self) -> wgpu::Texture {
        self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("headless output texture"),
            size: wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.surface_config.format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        })
    }

    /// Resizes the render target and rebuilds the entry/exit textures.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }

        self.width = width;
        self.height = height;
        self.surface_config.width = width;
        self.surface_config.height = height;

        if let Some(ref surface) = self.surface {
            surface.configure(&self.device, &self.surface_config);
        }
        if self.output_texture.is_some() {
            self.output_texture = Some(self.create_output_texture());
        }

        self.entry_exit_pass.resize(&self.device, width, height);
        self.refresh_bind_group();
        log::info!("Resized render targets to {width}x{height}");
    }

    /// Reconfigures the surface after it was lost or became outdated.
    pub fn reconfigure_surface(&self) {
        if let Some(ref surface) = self.surface {
            surface.configure(&self.device, &self.surface_config);
        }
    }

    /// Returns the viewport dimensions.
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Returns the viewport aspect ratio.
    #[must_use]
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}
