//! Headless rendering API.
//!
//! Renders a frame without opening a window. Useful for integration tests, batch
//! processing and automated screenshot generation.

use std::path::Path;

use pollster::FutureExt;
use volren_core::{Options, Result, VolrenError};
use volren_render::{RenderEngine, RenderError};

use crate::app::create_camera;

fn render_error(context: &str) -> impl FnOnce(RenderError) -> VolrenError + '_ {
    move |e| VolrenError::RenderError(format!("{context}: {e}"))
}

/// Creates a headless engine with `options.volume` (if any) loaded.
///
/// Unlike the windowed viewer, a volume that fails to load is an error here.
pub fn create_headless_engine(options: &Options, width: u32, height: u32) -> Result<RenderEngine> {
    let mut engine = RenderEngine::new_headless(width, height, options)
        .block_on()
        .map_err(render_error("failed to create headless engine"))?;

    if let Some(descriptor) = &options.volume {
        engine
            .load_volume(descriptor)
            .map_err(|e| match e {
                RenderError::Core(inner) => inner,
                other => VolrenError::RenderError(other.to_string()),
            })?;
    }
    Ok(engine)
}

/// Renders one frame to a raw RGBA pixel buffer.
///
/// The camera is the one `options.camera_style` selects, in its initial pose. The
/// returned buffer holds `width * height * 4` bytes, row by row from the top left.
///
/// # Example
/// ```no_run
/// use volren::*;
///
/// let pixels = render_to_image(&Options::default(), 320, 240).unwrap();
/// assert_eq!(pixels.len(), 320 * 240 * 4);
/// ```
pub fn render_to_image(options: &Options, width: u32, height: u32) -> Result<Vec<u8>> {
    let _ = env_logger::try_init();
    let engine = create_headless_engine(options, width, height)?;
    let camera = create_camera(&options.sanitized(), engine.width, engine.height);
    engine
        .capture_frame(camera.as_ref())
        .map_err(render_error("failed to capture frame"))
}

/// Renders one frame and saves it as a PNG or JPEG, chosen by extension.
pub fn render_to_file(
    options: &Options,
    path: impl AsRef<Path>,
    width: u32,
    height: u32,
) -> Result<()> {
    let data = render_to_image(options, width, height)?;
    volren_render::save_image(path, &data, width.max(1), height.max(1))
        .map_err(render_error("failed to save image"))
}
