//! Pointer tracking for camera interaction.

use glam::Vec2;

/// Pixel-delta scroll events are divided by this to get wheel ticks.
pub const PIXELS_PER_SCROLL_LINE: f32 = 40.0;

/// A drag segment in window pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Drag {
    /// Cursor position before the move.
    pub from: Vec2,
    /// Cursor position after the move.
    pub to: Vec2,
}

/// Mouse state owned by the application and handed to input handling.
#[derive(Debug, Clone, Default)]
pub struct PointerState {
    position: Option<Vec2>,
    rotating: bool,
    drag_distance: f32,
}

impl PointerState {
    /// Creates a pointer state with no known cursor position.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the last known cursor position.
    pub fn position(&self) -> Option<Vec2> {
        self.position
    }

    /// Returns whether a rotation drag is in progress.
    pub fn is_rotating(&self) -> bool {
        self.rotating
    }

    /// Returns the accumulated Manhattan distance since the drag started.
    pub fn drag_distance(&self) -> f32 {
        self.drag_distance
    }

    /// Starts a rotation drag.
    pub fn press(&mut self) {
        self.rotating = true;
        self.drag_distance = 0.0;
    }

    /// Ends the rotation drag.
    pub fn release(&mut self) {
        self.rotating = false;
    }

    /// Forgets the cursor, e.g. when it leaves the window.
    pub fn leave(&mut self) {
        self.position = None;
        self.rotating = false;
    }

    /// Records a cursor move. Returns the drag segment when a rotation drag is in
    /// progress and the cursor actually moved.
    pub fn move_to(&mut self, position: Vec2) -> Option<Drag> {
        if !position.is_finite() {
            log::warn!("ignoring non-finite cursor position {position}");
            return None;
        }

        let previous = self.position.replace(position)?;
        if !self.rotating || previous == position {
            return None;
        }

        let delta = position - previous;
        self.drag_distance += delta.x.abs() + delta.y.abs();
        Some(Drag {
            from: previous,
            to: position,
        })
    }
}

/// Converts a pixel scroll delta into wheel ticks.
pub fn pixels_to_scroll_lines(pixels: f32) -> f32 {
    pixels / PIXELS_PER_SCROLL_LINE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_drag_without_press() {
        let mut pointer = PointerState::new();
        assert!(pointer.move_to(Vec2::new(10.0, 10.0)).is_none());
        assert!(pointer.move_to(Vec2::new(20.0, 10.0)).is_none());
        assert_eq!(pointer.position(), Some(Vec2::new(20.0, 10.0)));
    }

    #[test]
    fn test_drag_reports_segment() {
        let mut pointer = PointerState::new();
        pointer.move_to(Vec2::new(10.0, 10.0));
        pointer.press();
        let drag = pointer.move_to(Vec2::new(13.0, 6.0)).unwrap();
        assert_eq!(drag.from, Vec2::new(10.0, 10.0));
        assert_eq!(drag.to, Vec2::new(13.0, 6.0));
        assert_eq!(pointer.drag_distance(), 7.0);

        pointer.release();
        assert!(pointer.move_to(Vec2::new(20.0, 20.0)).is_none());
    }

    #[test]
    fn test_identical_positions_filtered() {
        let mut pointer = PointerState::new();
        pointer.move_to(Vec2::new(5.0, 5.0));
        pointer.press();
        assert!(pointer.move_to(Vec2::new(5.0, 5.0)).is_none());
        assert!(pointer.move_to(Vec2::new(f32::NAN, 5.0)).is_none());
        assert_eq!(pointer.position(), Some(Vec2::new(5.0, 5.0)));
    }

    #[test]
    fn test_first_move_after_leave_is_not_a_drag() {
        let mut pointer = PointerState::new();
        pointer.move_to(Vec2::new(5.0, 5.0));
        pointer.press();
        pointer.leave();
        assert!(!pointer.is_rotating());
        assert!(pointer.move_to(Vec2::new(50.0, 50.0)).is_none());
    }

    #[test]
    fn test_pixel_scroll_conversion() {
        assert_eq!(pixels_to_scroll_lines(80.0), 2.0);
        assert_eq!(pixels_to_scroll_lines(-40.0), -1.0);
    }
}
