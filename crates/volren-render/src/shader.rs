//! Shader management.

use crate::error::{scoped, RenderError, RenderResult};

/// Builder for validated WGSL shader modules.
pub struct ShaderBuilder {
    source: Option<String>,
    vertex_entry: String,
    fragment_entry: String,
    label: Option<String>,
}

impl ShaderBuilder {
    /// Creates a new shader builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            source: None,
            vertex_entry: "vs_main".to_string(),
            fragment_entry: "fs_main".to_string(),
            label: None,
        }
    }

    /// Sets the shader source (WGSL) holding both stages.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Sets the vertex shader entry point.
    #[must_use]
    pub fn with_vertex_entry(mut self, entry: impl Into<String>) -> Self {
        self.vertex_entry = entry.into();
        self
    }

    /// Sets the fragment shader entry point.
    #[must_use]
    pub fn with_fragment_entry(mut self, entry: impl Into<String>) -> Self {
        self.fragment_entry = entry.into();
        self
    }

    /// Sets the shader label for debugging.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Compiles the module inside a validation scope so WGSL errors come back as
    /// [`RenderError::ShaderCompilationFailed`] instead of a device panic.
    pub fn build(self, device: &wgpu::Device) -> RenderResult<ShaderModule> {
        let source = self
            .source
            .ok_or_else(|| RenderError::ShaderCompilationFailed("missing shader source".into()))?;
        let label = self.label.unwrap_or_else(|| "shader".to_string());

        let (module, error) = scoped(device, wgpu::ErrorFilter::Validation, || {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label.as_str()),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            })
        });

        if let Some(error) = error {
            log::error!("shader '{label}' failed to compile: {error}");
            return Err(RenderError::ShaderCompilationFailed(format!("{label}: {error}")));
        }

        Ok(ShaderModule {
            module,
            vertex_entry: self.vertex_entry,
            fragment_entry: self.fragment_entry,
        })
    }
}

impl Default for ShaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A compiled module with its entry points.
pub struct ShaderModule {
    /// The wgpu shader module.
    pub module: wgpu::ShaderModule,
    vertex_entry: String,
    fragment_entry: String,
}

impl ShaderModule {
    /// Returns the vertex entry point name.
    pub fn vertex_entry(&self) -> &str {
        &self.vertex_entry
    }

    /// Returns the fragment entry point name.
    pub fn fragment_entry(&self) -> &str {
        &self.fragment_entry
    }
}

/// Creates a render pipeline inside a validation scope; layout mismatches between the
/// shader and the bind groups are reported as shader errors.
pub fn create_validated_pipeline(
    device: &wgpu::Device,
    descriptor: &wgpu::RenderPipelineDescriptor<'_>,
) -> RenderResult<wgpu::RenderPipeline> {
    let (pipeline, error) = scoped(device, wgpu::ErrorFilter::Validation, || {
        device.create_render_pipeline(descriptor)
    });
    match error {
        Some(error) => {
            let label = descriptor.label.unwrap_or("pipeline");
            log::error!("pipeline '{label}' failed validation: {error}");
            Err(RenderError::ShaderCompilationFailed(format!("{label}: {error}")))
        }
        None => Ok(pipeline),
    }
}
