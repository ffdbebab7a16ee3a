use super::App;
use volren_core::VolrenError;
use volren_render::RenderError;

impl App {
    /// Renders a single frame.
    pub(super) fn render(&mut self) {
        let Some(engine) = &self.engine else {
            return;
        };

        match engine.render(self.camera.as_ref()) {
            Ok(()) => {}
            Err(RenderError::OutOfMemory) => {
                self.fail(VolrenError::RenderError(
                    RenderError::OutOfMemory.to_string(),
                ));
            }
            Err(e) => log::error!("Frame failed: {e}"),
        }
    }
}
