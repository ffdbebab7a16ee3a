//! Application window and event loop management.

mod input;
mod render;

pub(super) use std::sync::Arc;

pub(super) use pollster::FutureExt;
pub(super) use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

pub(super) use volren_core::{CameraStyle, Options, PointerState, Vec2, Vec3, VolrenError};
pub(super) use volren_render::{ArcballCamera, OrbitCamera, RenderEngine, ViewCamera};

use std::path::Path;

use volren_core::VolumeDescriptor;

/// The viewer application state.
///
/// Owns the camera, the pointer state and the engine; nothing lives in globals.
pub struct App {
    pub(super) options: Options,
    pub(super) window: Option<Arc<Window>>,
    pub(super) engine: Option<RenderEngine>,
    pub(super) camera: Box<dyn ViewCamera>,
    pub(super) pointer: PointerState,
    pub(super) close_requested: bool,
    /// First fatal error; returned from [`run_app`] once the loop exits.
    pub(super) error: Option<VolrenError>,
}

impl App {
    /// Creates a new application with the given options.
    pub fn new(options: Options) -> Self {
        let options = options.sanitized();
        let camera = create_camera(&options, options.window_width, options.window_height);
        Self {
            options,
            window: None,
            engine: None,
            camera,
            pointer: PointerState::new(),
            close_requested: false,
            error: None,
        }
    }

    /// Opens the volume described by a JSON descriptor file.
    ///
    /// Failures are logged and the current volume keeps rendering.
    pub(super) fn open_descriptor(&mut self, path: &Path) {
        let Some(engine) = &mut self.engine else {
            return;
        };

        let descriptor = match VolumeDescriptor::from_json_file(path) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                log::error!("Failed to read volume descriptor '{}': {e}", path.display());
                return;
            }
        };

        if let Ok(info) = engine.load_volume(&descriptor) {
            log::info!(
                "Opened '{}' ({}x{}x{})",
                descriptor.path.display(),
                info.dimensions.x,
                info.dimensions.y,
                info.dimensions.z
            );
            if let Some(window) = &self.window {
                window.request_redraw();
            }
        }
    }

    /// Records a fatal error and asks the event loop to stop.
    pub(super) fn fail(&mut self, error: VolrenError) {
        log::error!("{error}");
        self.error.get_or_insert(error);
        self.close_requested = true;
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new(Options::default())
    }
}

/// Builds the camera selected by `options.camera_style`, looking at the origin.
pub(crate) fn create_camera(options: &Options, width: u32, height: u32) -> Box<dyn ViewCamera> {
    match options.camera_style {
        CameraStyle::Arcball => Box::new(ArcballCamera::looking_at_origin(
            options.camera_distance,
            width,
            height,
            options.fov,
        )),
        CameraStyle::Orbit => Box::new(OrbitCamera::new(
            Vec3::ZERO,
            Vec3::new(0.0, 0.0, options.camera_distance),
            width,
            height,
            options.fov,
        )),
    }
}

/// Runs the viewer until its window is closed.
pub fn run_app(options: Options) -> volren_core::Result<()> {
    let event_loop = EventLoop::new()
        .map_err(|e| VolrenError::RenderError(format!("failed to create event loop: {e}")))?;
    let mut app = App::new(options);

    event_loop
        .run_app(&mut app)
        .map_err(|e| VolrenError::RenderError(format!("event loop error: {e}")))?;

    app.error.map_or(Ok(()), Err)
}
