//! volren: an interactive GPU volume-rendering viewer.
//!
//! Loads a raw 3D scalar field, classifies it with a transfer function and ray-marches
//! it between per-pixel entry and exit points of a proxy cube.
//!
//! # Quick Start
//!
//! ```no_run
//! use volren::*;
//!
//! fn main() -> Result<()> {
//!     let options = Options {
//!         volume: Some(VolumeDescriptor::new(
//!             "head.raw",
//!             UVec3::new(256, 256, 113),
//!             Vec3::new(1.0, 1.0, 2.0),
//!             BitDepth::U16,
//!         )),
//!         ..Options::default()
//!     };
//!     show(options)
//! }
//! ```
//!
//! # Controls
//!
//! - Left drag rotates the camera
//! - Scroll wheel zooms
//! - `R` resets the camera, `Escape` closes the window
//! - Dropping a `.json` volume descriptor onto the window opens that volume

// Cursor and scroll positions arrive as f64 and are used as f32
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::missing_errors_doc)]

mod app;
mod headless;

pub use app::App;
pub use headless::{create_headless_engine, render_to_file, render_to_image};

// Re-export core types
pub use volren_core::{
    build_transfer_function, composite_ray, BitDepth, CameraStyle, ControlPoint, Drag, Mat4,
    Options, PointerState, RaymarchParams, Result, TransferFunction, TransferFunctionTable,
    UVec3, Vec2, Vec3, Vec4, Volume, VolumeDescriptor, VolumeInfo, VolrenError, FOV_RANGE,
};

// Re-export render types
pub use volren_render::{
    ArcballCamera, EntryExitImage, OrbitCamera, RenderEngine, RenderError, RenderSettings,
    ViewCamera,
};

/// Opens the viewer window and blocks until it is closed.
///
/// Returns the first fatal error (window or GPU setup, device out of memory). Volume load
/// failures are logged and never end the session.
pub fn show(options: Options) -> Result<()> {
    let _ = env_logger::try_init();
    log::info!("Starting volren viewer");
    app::run_app(options)
}

/// Opens the viewer with the volume described by a JSON descriptor file.
pub fn show_volume(descriptor_path: impl AsRef<std::path::Path>) -> Result<()> {
    let descriptor = VolumeDescriptor::from_json_file(descriptor_path)?;
    show(Options {
        volume: Some(descriptor),
        ..Options::default()
    })
}
