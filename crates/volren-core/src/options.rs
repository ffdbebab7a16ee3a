//! Configuration options for volren.

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::transfer_function::{TransferFunction, DEFAULT_RESOLUTION, MAX_RESOLUTION};
use crate::volume::VolumeDescriptor;

/// Viewer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Window title.
    pub title: String,

    /// Initial window width in pixels.
    pub window_width: u32,

    /// Initial window height in pixels.
    pub window_height: u32,

    /// Background color composited behind the volume.
    pub background_color: Vec3,

    /// Ray-march samples per voxel along the ray (at least 1).
    pub sampling_rate: f32,

    /// Accumulated opacity at which the ray-march stops early.
    pub early_termination_alpha: f32,

    /// Number of texels in the transfer-function table.
    pub transfer_function_resolution: usize,

    /// Transfer-function control points.
    pub transfer_function: TransferFunction,

    /// Camera interaction style.
    pub camera_style: CameraStyle,

    /// Distance from the camera to the volume center.
    pub camera_distance: f32,

    /// Initial vertical field of view in radians.
    pub fov: f32,

    /// Volume opened at startup.
    pub volume: Option<VolumeDescriptor>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            title: "volren".to_string(),
            window_width: 1280,
            window_height: 720,
            background_color: Vec3::new(0.1, 0.1, 0.1),
            sampling_rate: 1.0,
            early_termination_alpha: 0.99,
            transfer_function_resolution: DEFAULT_RESOLUTION,
            transfer_function: TransferFunction::default(),
            camera_style: CameraStyle::default(),
            camera_distance: 2.5,
            fov: std::f32::consts::FRAC_PI_4,
            volume: None,
        }
    }
}

impl Options {
    /// Reads options from a JSON file; missing fields take their default values.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let mut options: Self = serde_json::from_str(&text)?;
        if let Some(volume) = options.volume.as_mut() {
            if volume.path.is_relative() {
                if let Some(dir) = path.parent() {
                    volume.path = dir.join(&volume.path);
                }
            }
        }
        Ok(options)
    }

    /// Returns a copy with every value clamped into its valid range.
    #[must_use]
    pub fn sanitized(&self) -> Self {
        let defaults = Self::default();
        let mut options = self.clone();

        if !options.sampling_rate.is_finite() || options.sampling_rate < 1.0 {
            log::warn!(
                "sampling rate {} clamped to 1.0",
                options.sampling_rate
            );
            options.sampling_rate = 1.0;
        }

        if !(options.early_termination_alpha > 0.0 && options.early_termination_alpha <= 1.0) {
            log::warn!(
                "early termination alpha {} out of range, using {}",
                options.early_termination_alpha,
                defaults.early_termination_alpha
            );
            options.early_termination_alpha = defaults.early_termination_alpha;
        }

        options.transfer_function_resolution =
            options.transfer_function_resolution.clamp(2, MAX_RESOLUTION);

        options.window_width = options.window_width.max(1);
        options.window_height = options.window_height.max(1);

        if !options.background_color.is_finite() {
            options.background_color = defaults.background_color;
        }
        options.background_color = options.background_color.clamp(Vec3::ZERO, Vec3::ONE);

        if !options.camera_distance.is_finite() || options.camera_distance <= 0.0 {
            options.camera_distance = defaults.camera_distance;
        }

        let (min_fov, max_fov) = FOV_RANGE;
        options.fov = if options.fov.is_finite() {
            options.fov.clamp(min_fov, max_fov)
        } else {
            defaults.fov
        };

        options
    }
}

/// Allowed field-of-view range in radians (1 to 90 degrees).
pub const FOV_RANGE: (f32, f32) = (
    std::f32::consts::PI / 180.0,
    std::f32::consts::FRAC_PI_2,
);

/// How mouse drags are turned into rotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CameraStyle {
    /// Screen-to-hemisphere arcball with persisted rotation.
    #[default]
    Arcball,
    /// Rotation about a fixed world point.
    Orbit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_are_sane() {
        let options = Options::default();
        let sanitized = options.sanitized();
        assert_eq!(sanitized.sampling_rate, options.sampling_rate);
        assert_eq!(sanitized.fov, options.fov);
        assert_eq!(options.camera_style, CameraStyle::Arcball);
        assert!(options.volume.is_none());
    }

    #[test]
    fn test_sanitize_clamps_values() {
        let options = Options {
            sampling_rate: 0.25,
            early_termination_alpha: 1.5,
            transfer_function_resolution: 100_000,
            camera_distance: -1.0,
            fov: 10.0,
            window_width: 0,
            ..Options::default()
        };
        let sanitized = options.sanitized();
        assert_eq!(sanitized.sampling_rate, 1.0);
        assert_eq!(sanitized.early_termination_alpha, 0.99);
        assert_eq!(sanitized.transfer_function_resolution, MAX_RESOLUTION);
        assert_eq!(sanitized.camera_distance, 2.5);
        assert_eq!(sanitized.fov, FOV_RANGE.1);
        assert_eq!(sanitized.window_width, 1);

        let nan = Options {
            sampling_rate: f32::NAN,
            transfer_function_resolution: 0,
            ..Options::default()
        }
        .sanitized();
        assert_eq!(nan.sampling_rate, 1.0);
        assert_eq!(nan.transfer_function_resolution, 2);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "sampling_rate": 2.0, "camera_style": "orbit" }"#;
        let options: Options = serde_json::from_str(json).unwrap();
        assert_eq!(options.sampling_rate, 2.0);
        assert_eq!(options.camera_style, CameraStyle::Orbit);
        assert_eq!(options.window_width, 1280);
        assert_eq!(
            options.transfer_function.points().len(),
            TransferFunction::default().points().len()
        );
    }

    #[test]
    fn test_json_roundtrip_preserves_transfer_function() {
        let options = Options::default();
        let json = serde_json::to_string(&options).unwrap();
        let parsed: Options = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.transfer_function, options.transfer_function);
        assert_eq!(parsed.background_color, options.background_color);
    }
}
