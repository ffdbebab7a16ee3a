use volren_core::interaction::pixels_to_scroll_lines;

use super::{
    ActiveEventLoop, App, ApplicationHandler, Arc, ElementState, FutureExt, KeyCode, LogicalSize,
    MouseButton, MouseScrollDelta, PhysicalKey, RenderEngine, Vec2, VolrenError, Window,
    WindowEvent, WindowId,
};

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attributes = Window::default_attributes()
            .with_title(self.options.title.clone())
            .with_inner_size(LogicalSize::new(
                self.options.window_width,
                self.options.window_height,
            ));

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                self.fail(VolrenError::RenderError(format!(
                    "failed to create window: {e}"
                )));
                event_loop.exit();
                return;
            }
        };

        let mut engine = match RenderEngine::new_windowed(window.clone(), &self.options).block_on()
        {
            Ok(engine) => engine,
            Err(e) => {
                self.fail(VolrenError::RenderError(format!(
                    "failed to create render engine: {e}"
                )));
                event_loop.exit();
                return;
            }
        };

        if let Some(descriptor) = &self.options.volume {
            // Already logged by the engine; the viewer starts empty instead.
            let _ = engine.load_volume(descriptor);
        }

        let (width, height) = engine.dimensions();
        self.camera.set_viewport(width, height);

        window.request_redraw();
        self.window = Some(window);
        self.engine = Some(engine);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                self.close_requested = true;
            }
            WindowEvent::Resized(size) => {
                if let Some(engine) = &mut self.engine {
                    engine.resize(size.width, size.height);
                }
                self.camera.set_viewport(size.width, size.height);
            }
            WindowEvent::RedrawRequested => {
                self.render();
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                let position = Vec2::new(position.x as f32, position.y as f32);
                if let Some(drag) = self.pointer.move_to(position) {
                    log::debug!("rotate {} -> {}", drag.from, drag.to);
                    self.camera.rotate(drag.from, drag.to);
                }
            }
            WindowEvent::CursorLeft { .. } => {
                self.pointer.leave();
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => match state {
                ElementState::Pressed => self.pointer.press(),
                ElementState::Released => {
                    log::debug!("drag ended after {:.1}px", self.pointer.drag_distance());
                    self.pointer.release();
                }
            },
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => pixels_to_scroll_lines(pos.y as f32),
                };
                self.camera.zoom(lines);
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state != ElementState::Pressed || event.repeat {
                    return;
                }
                if let PhysicalKey::Code(code) = event.physical_key {
                    match code {
                        KeyCode::Escape => {
                            self.close_requested = true;
                        }
                        KeyCode::KeyR => {
                            log::info!("Camera reset");
                            self.camera.reset();
                        }
                        _ => {}
                    }
                }
            }
            WindowEvent::DroppedFile(path) => {
                log::info!("File dropped: {}", path.display());
                let is_descriptor = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("json"));
                if is_descriptor {
                    self.open_descriptor(&path);
                } else {
                    log::warn!(
                        "Ignoring '{}': drop a .json volume descriptor",
                        path.display()
                    );
                }
            }
            _ => {}
        }

        if self.close_requested {
            event_loop.exit();
        }
    }
}
