//! Camera and view management.
//!
//! Both cameras turn a mouse drag into a rotation by lifting the two cursor positions
//! onto a virtual unit hemisphere in front of the screen and rotating by the angle
//! between them, about their cross product.

use glam::{Mat3, Mat4, Vec2, Vec3};
use volren_core::FOV_RANGE;

/// Near clipping plane.
pub const Z_NEAR: f32 = 0.1;
/// Far clipping plane.
pub const Z_FAR: f32 = 100.0;
/// Radians of field of view removed per scroll tick.
pub const ZOOM_STRENGTH: f32 = 0.05;
/// Default rotation multiplier for [`OrbitCamera`].
pub const DEFAULT_SENSITIVITY: f32 = 2.5;
/// Rotation multiplier applied by [`ArcballCamera`] on every drag.
pub const ARCBALL_GAIN: f32 = 2.0;

/// A camera driven by mouse drags and scroll-wheel zoom.
pub trait ViewCamera {
    /// Rotates the view for a drag between two window positions in pixels.
    fn rotate(&mut self, drag_start: Vec2, drag_end: Vec2);

    /// Zooms by `delta` scroll ticks (positive narrows the field of view).
    fn zoom(&mut self, delta: f32);

    /// Returns the world-to-camera matrix.
    fn view_matrix(&self) -> Mat4;

    /// Returns the camera-to-clip matrix.
    fn projection_matrix(&self) -> Mat4;

    /// Updates the viewport size in pixels.
    fn set_viewport(&mut self, width: u32, height: u32);

    /// Restores the initial orientation and field of view.
    fn reset(&mut self);

    /// Returns the vertical field of view in radians.
    fn fov(&self) -> f32;

    /// Returns `projection * view`.
    fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Returns the camera position in world space.
    fn position(&self) -> Vec3 {
        self.view_matrix().inverse().w_axis.truncate()
    }
}

/// Maps a window position in pixels to normalized device coordinates (y up).
#[must_use]
pub fn screen_to_ndc(point: Vec2, width: u32, height: u32) -> Vec2 {
    let w = width.max(1) as f32;
    let h = height.max(1) as f32;
    Vec2::new(2.0 * point.x / w - 1.0, 1.0 - 2.0 * point.y / h)
}

/// Lifts a point in normalized device coordinates onto the unit hemisphere facing the
/// viewer. Points outside the unit circle are projected onto its rim.
#[must_use]
pub fn project_to_hemisphere(ndc: Vec2) -> Vec3 {
    let length_squared = ndc.length_squared();
    if length_squared <= 1.0 {
        Vec3::new(ndc.x, ndc.y, (1.0 - length_squared).sqrt())
    } else {
        ndc.normalize().extend(0.0)
    }
}

/// Returns the (unit axis, angle) rotating direction `from` onto direction `to`, or `None`
/// when the input is degenerate.
#[must_use]
pub fn arcball_rotation(from: Vec3, to: Vec3) -> Option<(Vec3, f32)> {
    if !from.is_finite() || !to.is_finite() {
        return None;
    }
    let angle = from.dot(to).min(1.0).acos();
    let axis = from.cross(to);
    if !angle.is_finite() || angle <= 0.0 || axis.length_squared() <= f32::EPSILON * f32::EPSILON
    {
        return None;
    }
    Some((axis.normalize(), angle))
}

/// Perspective parameters shared by both cameras.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lens {
    /// Vertical field of view in radians.
    pub fov: f32,
    /// Viewport width in pixels.
    pub width: u32,
    /// Viewport height in pixels.
    pub height: u32,
}

impl Lens {
    /// Creates a lens; the field of view is clamped into [`FOV_RANGE`].
    #[must_use]
    pub fn new(fov: f32, width: u32, height: u32) -> Self {
        let (min_fov, max_fov) = FOV_RANGE;
        Self {
            fov: fov.clamp(min_fov, max_fov),
            width: width.max(1),
            height: height.max(1),
        }
    }

    /// Returns width / height.
    #[must_use]
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Applies `delta` scroll ticks. Returns `false` when the input was rejected.
    pub fn zoom(&mut self, delta: f32) -> bool {
        if !delta.is_finite() {
            log::warn!("ignoring non-finite zoom delta {delta}");
            return false;
        }
        let (min_fov, max_fov) = FOV_RANGE;
        self.fov = (self.fov - ZOOM_STRENGTH * delta).clamp(min_fov, max_fov);
        true
    }

    /// Returns a right-handed perspective matrix with depth in [0, 1].
    #[must_use]
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect_ratio(), Z_NEAR, Z_FAR)
    }
}

/// Arcball that rotates the scene about the look-at target and keeps the accumulated
/// rotation between drags.
#[derive(Debug, Clone)]
pub struct ArcballCamera {
    look_from: Vec3,
    look_to: Vec3,
    up: Vec3,
    initial_fov: f32,
    lens: Lens,
    look_at: Mat4,
    rotation: Mat4,
    view: Mat4,
    projection: Mat4,
}

impl ArcballCamera {
    /// Creates a camera at `look_from` looking at `look_to`.
    #[must_use]
    pub fn new(look_from: Vec3, look_to: Vec3, width: u32, height: u32, fov: f32) -> Self {
        let forward = look_to - look_from;
        let up = if forward.cross(Vec3::Y).length_squared() > 1e-8 {
            Vec3::Y
        } else {
            Vec3::Z
        };
        let lens = Lens::new(fov, width, height);
        let mut camera = Self {
            look_from,
            look_to,
            up,
            initial_fov: lens.fov,
            lens,
            look_at: Mat4::look_at_rh(look_from, look_to, up),
            rotation: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            projection: lens.projection_matrix(),
        };
        camera.update_view();
        camera
    }

    /// Creates a camera on the +Z axis at `distance` from the origin.
    #[must_use]
    pub fn looking_at_origin(distance: f32, width: u32, height: u32, fov: f32) -> Self {
        Self::new(Vec3::new(0.0, 0.0, distance), Vec3::ZERO, width, height, fov)
    }

    /// Returns the accumulated rotation in arcball space.
    #[must_use]
    pub fn rotation(&self) -> Mat4 {
        self.rotation
    }

    /// Returns the look-at target.
    #[must_use]
    pub fn target(&self) -> Vec3 {
        self.look_to
    }

    fn update_view(&mut self) {
        self.view = self.look_at
            * Mat4::from_translation(self.look_to)
            * self.rotation
            * Mat4::from_translation(-self.look_to);
        debug_assert!(self.view.is_finite(), "arcball view matrix is not finite");
    }
}

impl ViewCamera for ArcballCamera {
    fn rotate(&mut self, drag_start: Vec2, drag_end: Vec2) {
        if drag_start == drag_end {
            return;
        }
        let from = project_to_hemisphere(screen_to_ndc(drag_start, self.lens.width, self.lens.height));
        let to = project_to_hemisphere(screen_to_ndc(drag_end, self.lens.width, self.lens.height));
        let Some((camera_axis, angle)) = arcball_rotation(from, to) else {
            return;
        };

        let arcball_axis = (Mat3::from_mat4(self.look_at).transpose() * camera_axis).normalize();
        if !arcball_axis.is_finite() {
            return;
        }
        self.rotation = Mat4::from_axis_angle(arcball_axis, ARCBALL_GAIN * angle) * self.rotation;
        self.update_view();
    }

    fn zoom(&mut self, delta: f32) {
        if self.lens.zoom(delta) {
            self.projection = self.lens.projection_matrix();
        }
    }

    fn view_matrix(&self) -> Mat4 {
        self.view
    }

    fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.lens.width = width;
        self.lens.height = height;
        self.projection = self.lens.projection_matrix();
    }

    fn reset(&mut self) {
        self.rotation = Mat4::IDENTITY;
        self.lens.fov = self.initial_fov;
        self.look_at = Mat4::look_at_rh(self.look_from, self.look_to, self.up);
        self.projection = self.lens.projection_matrix();
        self.update_view();
    }

    fn fov(&self) -> f32 {
        self.lens.fov
    }
}

/// Camera orbiting a fixed world point at constant distance.
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    center: Vec3,
    distance: f32,
    initial_rotation: Mat4,
    initial_fov: f32,
    rotation: Mat4,
    sensitivity: f32,
    position: Vec3,
    lens: Lens,
    view: Mat4,
    projection: Mat4,
}

impl OrbitCamera {
    /// Creates a camera at `position` orbiting `center`.
    #[must_use]
    pub fn new(center: Vec3, position: Vec3, width: u32, height: u32, fov: f32) -> Self {
        let initial_rotation = initial_basis(position - center);
        let lens = Lens::new(fov, width, height);
        let mut camera = Self {
            center,
            distance: center.distance(position),
            initial_rotation,
            initial_fov: lens.fov,
            rotation: initial_rotation,
            sensitivity: DEFAULT_SENSITIVITY,
            position,
            lens,
            view: Mat4::IDENTITY,
            projection: lens.projection_matrix(),
        };
        camera.update_view();
        camera
    }

    /// Sets the rotation multiplier.
    #[must_use]
    pub fn with_sensitivity(mut self, sensitivity: f32) -> Self {
        self.sensitivity = sensitivity;
        self
    }

    /// Returns the rotation multiplier.
    #[must_use]
    pub fn sensitivity(&self) -> f32 {
        self.sensitivity
    }

    /// Returns the orbit center.
    #[must_use]
    pub fn center(&self) -> Vec3 {
        self.center
    }

    /// Rotates by the arc between two unit directions given in camera space.
    pub fn rotate_directions(&mut self, previous: Vec3, current: Vec3) {
        let Some((axis, angle)) = arcball_rotation(previous, current) else {
            return;
        };
        self.rotation = Mat4::from_axis_angle(axis, self.sensitivity * angle) * self.rotation;
        self.update_view();
    }

    fn update_view(&mut self) {
        self.view = Mat4::from_translation(Vec3::new(0.0, 0.0, -self.distance))
            * self.rotation
            * Mat4::from_translation(-self.center);
        debug_assert!(self.view.is_finite(), "orbit view matrix is not finite");
        self.position = self.view.inverse().w_axis.truncate();
    }
}

/// World-to-camera rotation for a camera looking along `-offset` with world Y up.
fn initial_basis(offset: Vec3) -> Mat4 {
    let z = offset.normalize_or_zero();
    if z == Vec3::ZERO {
        return Mat4::IDENTITY;
    }
    let up = if z.cross(Vec3::Y).length_squared() > 1e-8 {
        Vec3::Y
    } else {
        Vec3::Z
    };
    let x = up.cross(z).normalize();
    let y = z.cross(x);
    Mat4::from_mat3(Mat3::from_cols(x, y, z).transpose())
}

impl ViewCamera for OrbitCamera {
    fn rotate(&mut self, drag_start: Vec2, drag_end: Vec2) {
        if drag_start == drag_end {
            return;
        }
        let previous =
            project_to_hemisphere(screen_to_ndc(drag_start, self.lens.width, self.lens.height));
        let current =
            project_to_hemisphere(screen_to_ndc(drag_end, self.lens.width, self.lens.height));
        self.rotate_directions(previous, current);
    }

    fn zoom(&mut self, delta: f32) {
        if self.lens.zoom(delta) {
            self.projection = self.lens.projection_matrix();
        }
    }

    fn view_matrix(&self) -> Mat4 {
        self.view
    }

    fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.lens.width = width;
        self.lens.height = height;
        self.projection = self.lens.projection_matrix();
    }

    fn reset(&mut self) {
        self.rotation = self.initial_rotation;
        self.lens.fov = self.initial_fov;
        self.projection = self.lens.projection_matrix();
        self.update_view();
    }

    fn fov(&self) -> f32 {
        self.lens.fov
    }

    fn position(&self) -> Vec3 {
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const W: u32 = 1280;
    const H: u32 = 720;

    fn cameras() -> Vec<Box<dyn ViewCamera>> {
        vec![
            Box::new(ArcballCamera::looking_at_origin(2.5, W, H, std::f32::consts::FRAC_PI_4)),
            Box::new(OrbitCamera::new(
                Vec3::ZERO,
                Vec3::new(0.0, 0.0, 2.5),
                W,
                H,
                std::f32::consts::FRAC_PI_4,
            )),
        ]
    }

    fn assert_mat_near(a: Mat4, b: Mat4) {
        assert!(a.abs_diff_eq(b, 1e-4), "{a:?} != {b:?}");
    }

    #[test]
    fn test_screen_to_ndc() {
        assert_eq!(screen_to_ndc(Vec2::new(0.0, 0.0), 100, 50), Vec2::new(-1.0, 1.0));
        assert_eq!(screen_to_ndc(Vec2::new(100.0, 50.0), 100, 50), Vec2::new(1.0, -1.0));
        assert_eq!(screen_to_ndc(Vec2::new(50.0, 25.0), 100, 50), Vec2::ZERO);
    }

    #[test]
    fn test_hemisphere_projection() {
        assert_eq!(project_to_hemisphere(Vec2::ZERO), Vec3::Z);
        let rim = project_to_hemisphere(Vec2::new(3.0, 4.0));
        assert!((rim - Vec3::new(0.6, 0.8, 0.0)).length() < 1e-6);
        let inside = project_to_hemisphere(Vec2::new(0.5, 0.5));
        assert!((inside.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_arcball_rotation_degenerate() {
        assert!(arcball_rotation(Vec3::Z, Vec3::Z).is_none());
        assert!(arcball_rotation(Vec3::Z, Vec3::new(f32::NAN, 0.0, 1.0)).is_none());
        let (axis, angle) = arcball_rotation(Vec3::X, Vec3::Y).unwrap();
        assert!((axis - Vec3::Z).length() < 1e-6);
        assert!((angle - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn test_initial_orbit_view_matches_look_at() {
        let camera = OrbitCamera::new(
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 2.0, 3.0),
            W,
            H,
            std::f32::consts::FRAC_PI_4,
        );
        let expected = Mat4::look_at_rh(Vec3::new(1.0, 2.0, 3.0), Vec3::new(1.0, 0.0, 0.0), Vec3::Y);
        assert_mat_near(camera.view_matrix(), expected);
        assert!((camera.position() - Vec3::new(1.0, 2.0, 3.0)).length() < 1e-4);
    }

    #[test]
    fn test_initial_arcball_view_matches_look_at() {
        let camera = ArcballCamera::looking_at_origin(2.5, W, H, std::f32::consts::FRAC_PI_4);
        let expected = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 2.5), Vec3::ZERO, Vec3::Y);
        assert_mat_near(camera.view_matrix(), expected);
    }

    #[test]
    fn test_identical_points_leave_view_unchanged() {
        for mut camera in cameras() {
            let before = camera.view_matrix();
            camera.rotate(Vec2::new(300.0, 200.0), Vec2::new(300.0, 200.0));
            assert_eq!(camera.view_matrix(), before);
        }
    }

    #[test]
    fn test_zoom_clamped() {
        let (min_fov, max_fov) = FOV_RANGE;
        for mut camera in cameras() {
            camera.zoom(1000.0);
            assert_eq!(camera.fov(), min_fov);
            camera.zoom(-1000.0);
            assert_eq!(camera.fov(), max_fov);
            camera.zoom(f32::NAN);
            assert_eq!(camera.fov(), max_fov);
        }
    }

    #[test]
    fn test_zoom_step() {
        let mut camera = ArcballCamera::looking_at_origin(2.5, W, H, 0.5);
        camera.zoom(2.0);
        assert!((camera.fov() - 0.4).abs() < 1e-6);
        let expected = Mat4::perspective_rh(0.4, W as f32 / H as f32, Z_NEAR, Z_FAR);
        assert_mat_near(camera.projection_matrix(), expected);
    }

    #[test]
    fn test_horizontal_drag_spins_about_screen_vertical() {
        for mut camera in cameras() {
            // Tilt first so the accumulated rotation is not trivial.
            camera.rotate(Vec2::new(640.0, 300.0), Vec2::new(640.0, 420.0));
            let before = camera.view_matrix();
            camera.rotate(Vec2::new(600.0, 360.0), Vec2::new(680.0, 360.0));
            let after = camera.view_matrix();
            assert_ne!(before, after);

            let delta = after * before.inverse();
            let up = delta.transform_vector3(Vec3::Y);
            assert!((up - Vec3::Y).length() < 1e-4, "camera up moved to {up:?}");
        }
    }

    #[test]
    fn test_arcball_keeps_target_in_view_center() {
        let mut camera = ArcballCamera::new(
            Vec3::new(1.0, 1.0, 4.0),
            Vec3::new(1.0, 1.0, 0.0),
            W,
            H,
            std::f32::consts::FRAC_PI_4,
        );
        camera.rotate(Vec2::new(100.0, 100.0), Vec2::new(500.0, 600.0));
        let target = camera.view_matrix().transform_point3(camera.target());
        assert!((target - Vec3::new(0.0, 0.0, -4.0)).length() < 1e-4);
    }

    #[test]
    fn test_orbit_keeps_distance() {
        let mut camera = OrbitCamera::new(
            Vec3::new(0.5, 0.0, 0.0),
            Vec3::new(0.5, 0.0, 3.0),
            W,
            H,
            std::f32::consts::FRAC_PI_4,
        );
        camera.rotate_directions(Vec3::Z, Vec3::new(0.6, 0.0, 0.8));
        assert!((camera.position().distance(camera.center()) - 3.0).abs() < 1e-4);
        assert!((camera.position() - Vec3::new(0.5, 0.0, 3.0)).length() > 0.1);
    }

    #[test]
    fn test_reset_restores_initial_state() {
        for mut camera in cameras() {
            let view = camera.view_matrix();
            let fov = camera.fov();
            camera.rotate(Vec2::new(100.0, 100.0), Vec2::new(400.0, 300.0));
            camera.zoom(3.0);
            camera.reset();
            assert_mat_near(camera.view_matrix(), view);
            assert_eq!(camera.fov(), fov);
        }
    }

    #[test]
    fn test_viewport_updates_aspect() {
        let mut camera = ArcballCamera::looking_at_origin(2.5, W, H, 0.8);
        camera.set_viewport(500, 500);
        assert_mat_near(
            camera.projection_matrix(),
            Mat4::perspective_rh(0.8, 1.0, Z_NEAR, Z_FAR),
        );
        let before = camera.projection_matrix();
        camera.set_viewport(0, 100);
        assert_eq!(camera.projection_matrix(), before);
    }

    proptest! {
        #[test]
        fn prop_rotate_same_point_is_identity(x in 0.0f32..1280.0, y in 0.0f32..720.0) {
            for mut camera in cameras() {
                camera.rotate(Vec2::new(10.0, 20.0), Vec2::new(700.0, 500.0));
                let before = camera.view_matrix();
                camera.rotate(Vec2::new(x, y), Vec2::new(x, y));
                prop_assert_eq!(camera.view_matrix(), before);
            }
        }

        #[test]
        fn prop_view_stays_rigid(
            drags in proptest::collection::vec(
                (0.0f32..1280.0, 0.0f32..720.0, 0.0f32..1280.0, 0.0f32..720.0),
                1..20,
            )
        ) {
            for mut camera in cameras() {
                for &(x0, y0, x1, y1) in &drags {
                    camera.rotate(Vec2::new(x0, y0), Vec2::new(x1, y1));
                }
                let view = camera.view_matrix();
                prop_assert!(view.is_finite());
                let det = Mat3::from_mat4(view).determinant();
                prop_assert!((det - 1.0).abs() < 1e-2, "determinant {}", det);
                prop_assert!((camera.position().length() - 2.5).abs() < 1e-2);
            }
        }

        #[test]
        fn prop_zoom_stays_in_range(deltas in proptest::collection::vec(-1000.0f32..1000.0, 1..50)) {
            let (min_fov, max_fov) = FOV_RANGE;
            for mut camera in cameras() {
                for &delta in &deltas {
                    camera.zoom(delta);
                    prop_assert!(camera.fov() >= min_fov && camera.fov() <= max_fov);
                }
            }
        }
    }
}
