//! CPU reference for the composite pass.
//!
//! Mirrors the composite shader step for step so that tests can derive expected pixels
//! without a GPU, and so single rays can be inspected when debugging a render.

use glam::{Vec3, Vec4};

use crate::transfer_function::TransferFunctionTable;
use crate::volume::Volume;

/// Upper bound on samples per ray.
pub const MAX_STEPS: u32 = 4096;

/// Parameters shared by every ray of a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaymarchParams {
    /// Samples per voxel along the ray.
    pub sampling_rate: f32,
    /// Accumulated opacity at which marching stops.
    pub early_termination_alpha: f32,
    /// Color composited behind the accumulated result.
    pub background: Vec3,
}

impl Default for RaymarchParams {
    fn default() -> Self {
        Self {
            sampling_rate: 1.0,
            early_termination_alpha: 0.99,
            background: Vec3::ZERO,
        }
    }
}

/// Result of marching a single ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayProbe {
    /// Number of steps the ray was divided into.
    pub steps: u32,
    /// Number of samples actually taken before termination.
    pub samples: u32,
    /// Premultiplied color and opacity accumulated along the ray.
    pub accumulated: Vec4,
    /// Final color after compositing over the background.
    pub color: Vec3,
}

impl RayProbe {
    /// Returns whether the ray stopped before its last step.
    pub fn terminated_early(&self) -> bool {
        self.samples < self.steps
    }
}

/// Returns the number of samples for the segment `entry..exit` in object space.
pub fn step_count(entry: Vec3, exit: Vec3, max_dimension: u32, sampling_rate: f32) -> u32 {
    let length = (exit - entry).length();
    if !length.is_finite() || length <= 0.0 {
        return 0;
    }
    let steps = (length * max_dimension as f32 * sampling_rate.max(1.0)).ceil();
    (steps as u32).min(MAX_STEPS)
}

/// Front-to-back "under" blend of one sample into the accumulator.
pub fn blend_front_to_back(accumulated: Vec4, sample: Vec4) -> Vec4 {
    let weight = (1.0 - accumulated.w) * sample.w;
    Vec4::new(
        accumulated.x + weight * sample.x,
        accumulated.y + weight * sample.y,
        accumulated.z + weight * sample.z,
        accumulated.w + weight,
    )
}

/// Composites premultiplied `accumulated` over an opaque background.
pub fn over_background(accumulated: Vec4, background: Vec3) -> Vec3 {
    accumulated.truncate() + (1.0 - accumulated.w) * background
}

/// Marches one ray between object-space `entry` and `exit` points.
pub fn probe_ray(
    volume: &Volume,
    table: &TransferFunctionTable,
    entry: Vec3,
    exit: Vec3,
    params: &RaymarchParams,
) -> RayProbe {
    let steps = step_count(
        entry,
        exit,
        volume.dimensions().max_element(),
        params.sampling_rate,
    );

    let mut accumulated = Vec4::ZERO;
    let mut samples = 0;
    let delta = exit - entry;
    for i in 0..steps {
        let t = (i as f32 + 0.5) / steps as f32;
        let density = volume.sample_trilinear(entry + delta * t);
        accumulated = blend_front_to_back(accumulated, table.lookup(density));
        samples += 1;
        if accumulated.w >= params.early_termination_alpha {
            break;
        }
    }

    RayProbe {
        steps,
        samples,
        accumulated,
        color: over_background(accumulated, params.background),
    }
}

/// Returns the final color of one ray.
pub fn composite_ray(
    volume: &Volume,
    table: &TransferFunctionTable,
    entry: Vec3,
    exit: Vec3,
    params: &RaymarchParams,
) -> Vec3 {
    probe_ray(volume, table, entry, exit, params).color
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer_function::{ControlPoint, TransferFunction};
    use crate::volume::BitDepth;
    use glam::UVec3;

    fn red_table() -> TransferFunctionTable {
        TransferFunction::new(vec![
            ControlPoint::new(0.0, Vec3::ZERO, 0.0),
            ControlPoint::new(0.5, Vec3::new(1.0, 0.0, 0.0), 1.0),
        ])
        .unwrap()
        .build(256)
        .unwrap()
    }

    fn uniform_volume(size: u32, value: u8) -> Volume {
        let len = (size * size * size) as usize;
        Volume::from_bytes(UVec3::splat(size), Vec3::ONE, BitDepth::U8, vec![value; len]).unwrap()
    }

    #[test]
    fn test_step_count() {
        assert_eq!(step_count(Vec3::ZERO, Vec3::X, 256, 1.0), 256);
        assert_eq!(step_count(Vec3::ZERO, Vec3::X, 256, 2.0), 512);
        assert_eq!(step_count(Vec3::ZERO, Vec3::ONE, 4096, 4.0), MAX_STEPS);
        assert_eq!(step_count(Vec3::splat(0.3), Vec3::splat(0.3), 256, 1.0), 0);
        // Sampling rate below one is treated as one.
        assert_eq!(step_count(Vec3::ZERO, Vec3::X, 10, 0.1), 10);
    }

    #[test]
    fn test_blend_front_to_back() {
        let half_red = Vec4::new(1.0, 0.0, 0.0, 0.5);
        let a = blend_front_to_back(Vec4::ZERO, half_red);
        assert_eq!(a, Vec4::new(0.5, 0.0, 0.0, 0.5));
        let b = blend_front_to_back(a, Vec4::new(0.0, 1.0, 0.0, 1.0));
        assert_eq!(b, Vec4::new(0.5, 0.5, 0.0, 1.0));
        // Opaque accumulator ignores further samples.
        assert_eq!(blend_front_to_back(b, half_red), b);
    }

    #[test]
    fn test_degenerate_ray_is_background() {
        let volume = uniform_volume(4, 255);
        let params = RaymarchParams {
            background: Vec3::new(0.2, 0.3, 0.4),
            ..RaymarchParams::default()
        };
        let probe = probe_ray(&volume, &red_table(), Vec3::splat(0.5), Vec3::splat(0.5), &params);
        assert_eq!(probe.steps, 0);
        assert_eq!(probe.color, params.background);
    }

    #[test]
    fn test_low_density_renders_background() {
        let volume = uniform_volume(256, 0);
        let params = RaymarchParams {
            background: Vec3::new(0.1, 0.2, 0.3),
            ..RaymarchParams::default()
        };
        let probe = probe_ray(
            &volume,
            &red_table(),
            Vec3::new(0.5, 0.5, 0.0),
            Vec3::new(0.5, 0.5, 1.0),
            &params,
        );
        assert_eq!(probe.steps, 256);
        assert_eq!(probe.samples, 256);
        assert!((probe.color - params.background).length() < 1e-6);
    }

    #[test]
    fn test_half_density_renders_opaque_red() {
        let volume = uniform_volume(256, 128);
        let params = RaymarchParams {
            background: Vec3::ONE,
            ..RaymarchParams::default()
        };
        let probe = probe_ray(
            &volume,
            &red_table(),
            Vec3::new(0.5, 0.5, 0.0),
            Vec3::new(0.5, 0.5, 1.0),
            &params,
        );
        assert!(probe.terminated_early());
        assert_eq!(probe.samples, 1);
        assert!((probe.color - Vec3::new(1.0, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_partial_opacity_accumulates() {
        // Density 64/255 maps to alpha of about 0.5 in the red ramp.
        let volume = uniform_volume(8, 64);
        let table = red_table();
        let params = RaymarchParams {
            early_termination_alpha: 1.0,
            ..RaymarchParams::default()
        };
        let probe = probe_ray(&volume, &table, Vec3::ZERO, Vec3::Z, &params);
        assert_eq!(probe.steps, 8);
        let alpha = table.lookup(64.0 / 255.0).w;
        let expected = 1.0 - (1.0 - alpha).powi(8);
        assert!((probe.accumulated.w - expected).abs() < 1e-4);
        assert!(!probe.terminated_early());
    }
}
