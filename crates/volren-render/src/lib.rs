//! Rendering backend for volren.
//!
//! This crate provides the wgpu-based volume renderer:
//! - Entry/exit point pass rasterizing the proxy cube twice with opposite depth tests
//! - Composite pass ray-marching the volume between those points
//! - GPU resources for the volume and transfer-function textures
//! - Arcball and orbit cameras

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
// Pixel counts and texel sizes are converted between integer and float freely
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

pub mod camera;
pub mod capture;
pub mod composite_pass;
pub mod engine;
pub mod entry_exit_pass;
pub mod error;
pub mod mesh;
pub mod shader;
pub mod transfer_function_texture;
pub mod volume_texture;

pub use camera::{ArcballCamera, Lens, OrbitCamera, ViewCamera};
pub use capture::save_image;
pub use composite_pass::{CompositePass, CompositeUniforms};
pub use engine::{EntryExitImage, RenderEngine, RenderSettings};
pub use entry_exit_pass::{EntryExitPass, EntryExitTargets, ProxyUniforms, SubPass};
pub use error::{RenderError, RenderResult};
pub use mesh::ProxyMesh;
pub use shader::{ShaderBuilder, ShaderModule};
pub use transfer_function_texture::TransferFunctionTexture;
pub use volume_texture::VolumeTexture;
