//! Transfer functions mapping scalar density to color and opacity.
//!
//! A transfer function is described by a sparse, sorted list of [`ControlPoint`]s and
//! materialized into a dense lookup table by [`build_transfer_function`]. The table is
//! what gets uploaded to the GPU as a 1D texture.

use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::error::{Result, VolrenError};

/// Default number of texels in a transfer function table.
pub const DEFAULT_RESOLUTION: usize = 256;

/// Largest table resolution accepted by the options layer.
pub const MAX_RESOLUTION: usize = 4096;

/// A single transfer function control point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlPoint {
    /// Normalized scalar position in [0, 1].
    pub position: f32,
    /// Linear RGB color in [0, 1].
    pub color: Vec3,
    /// Opacity in [0, 1].
    pub alpha: f32,
}

impl ControlPoint {
    /// Creates a new control point.
    #[must_use]
    pub fn new(position: f32, color: Vec3, alpha: f32) -> Self {
        Self {
            position,
            color,
            alpha,
        }
    }

    /// Returns the control value as RGBA.
    #[must_use]
    pub fn rgba(&self) -> Vec4 {
        self.color.extend(self.alpha)
    }
}

/// A validated, sorted set of control points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ControlPoint>", into = "Vec<ControlPoint>")]
pub struct TransferFunction {
    points: Vec<ControlPoint>,
}

impl TransferFunction {
    /// Creates a transfer function, rejecting unsorted or out-of-range control points.
    pub fn new(points: Vec<ControlPoint>) -> Result<Self> {
        validate_control_points(&points)?;
        Ok(Self { points })
    }

    /// Returns the control points in ascending position order.
    #[must_use]
    pub fn points(&self) -> &[ControlPoint] {
        &self.points
    }

    /// Materializes the dense lookup table.
    pub fn build(&self, resolution: usize) -> Result<TransferFunctionTable> {
        build_transfer_function(&self.points, resolution)
    }
}

impl Default for TransferFunction {
    /// Soft-tissue style ramp: transparent air, faint skin, opaque bone.
    fn default() -> Self {
        Self {
            points: vec![
                ControlPoint::new(0.0, Vec3::ZERO, 0.0),
                ControlPoint::new(0.15, Vec3::new(0.91, 0.7, 0.61), 0.0),
                ControlPoint::new(0.3, Vec3::new(0.91, 0.7, 0.61), 0.08),
                ControlPoint::new(0.55, Vec3::new(1.0, 1.0, 0.85), 0.45),
                ControlPoint::new(1.0, Vec3::ONE, 0.9),
            ],
        }
    }
}

impl TryFrom<Vec<ControlPoint>> for TransferFunction {
    type Error = VolrenError;

    fn try_from(points: Vec<ControlPoint>) -> Result<Self> {
        Self::new(points)
    }
}

impl From<TransferFunction> for Vec<ControlPoint> {
    fn from(tf: TransferFunction) -> Self {
        tf.points
    }
}

/// Dense RGBA lookup table produced from control points.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferFunctionTable {
    texels: Vec<Vec4>,
}

impl TransferFunctionTable {
    /// Returns the number of texels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.texels.len()
    }

    /// Returns true if the table has no texels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.texels.is_empty()
    }

    /// Returns the texels.
    #[must_use]
    pub fn texels(&self) -> &[Vec4] {
        &self.texels
    }

    /// Looks up a density with linear filtering and clamp-to-edge addressing.
    ///
    /// Texel `i` is centered at `(i + 0.5) / len`, matching GPU texture sampling.
    #[must_use]
    pub fn lookup(&self, density: f32) -> Vec4 {
        let n = self.texels.len();
        let u = (density.clamp(0.0, 1.0) * n as f32 - 0.5).clamp(0.0, (n - 1) as f32);
        let i0 = u.floor() as usize;
        let i1 = (i0 + 1).min(n - 1);
        self.texels[i0].lerp(self.texels[i1], u - i0 as f32)
    }

    /// Encodes the table as tightly packed RGBA8 texels for upload.
    #[must_use]
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.texels
            .iter()
            .flat_map(|t| t.to_array())
            .map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8)
            .collect()
    }

    /// Returns a copy with every channel rounded to 8-bit precision, i.e. the values the
    /// GPU actually sees after [`to_rgba8`](Self::to_rgba8).
    #[must_use]
    pub fn quantized(&self) -> Self {
        let texels = self
            .to_rgba8()
            .chunks_exact(4)
            .map(|c| {
                Vec4::new(
                    f32::from(c[0]),
                    f32::from(c[1]),
                    f32::from(c[2]),
                    f32::from(c[3]),
                ) / 255.0
            })
            .collect();
        Self { texels }
    }
}

/// Maps a normalized control position to its texel index: `ceil(position * (n - 1))`.
#[must_use]
pub fn texel_index(position: f32, resolution: usize) -> usize {
    let last = resolution.saturating_sub(1);
    let idx = (position.clamp(0.0, 1.0) * last as f32).ceil();
    (idx as usize).min(last)
}

/// Checks that control points are non-empty, finite, within [0, 1] and sorted.
pub fn validate_control_points(points: &[ControlPoint]) -> Result<()> {
    if points.is_empty() {
        return Err(VolrenError::EmptyTransferFunction);
    }

    for (index, point) in points.iter().enumerate() {
        let values = [
            point.position,
            point.color.x,
            point.color.y,
            point.color.z,
            point.alpha,
        ];
        if values.iter().any(|v| !v.is_finite() || !(0.0..=1.0).contains(v)) {
            return Err(VolrenError::ControlPointOutOfRange { index });
        }
    }

    for (index, pair) in points.windows(2).enumerate() {
        if pair[1].position < pair[0].position {
            return Err(VolrenError::UnsortedControlPoints {
                index: index + 1,
                previous: pair[0].position,
                current: pair[1].position,
            });
        }
    }

    Ok(())
}

/// Builds a dense lookup table of `resolution` texels from sorted control points.
///
/// Each control value is stored at [`texel_index`] of its position, texels between two
/// populated indices are linearly interpolated, and texels before the first / after the
/// last populated index take the boundary value. Two positions that land on the same
/// texel resolve to the later control point.
pub fn build_transfer_function(
    points: &[ControlPoint],
    resolution: usize,
) -> Result<TransferFunctionTable> {
    if resolution < 2 {
        return Err(VolrenError::InvalidResolution(resolution));
    }
    validate_control_points(points)?;

    let anchors: Vec<(usize, Vec4)> = points
        .iter()
        .map(|p| (texel_index(p.position, resolution), p.rgba()))
        .collect();

    let mut texels = vec![Vec4::ZERO; resolution];

    let (first_idx, first_value) = anchors[0];
    texels[..=first_idx].fill(first_value);

    for pair in anchors.windows(2) {
        let (x0, v0) = pair[0];
        let (x1, v1) = pair[1];
        if x1 == x0 {
            texels[x1] = v1;
            continue;
        }
        let span = (x1 - x0) as f32;
        for (offset, texel) in texels[x0..=x1].iter_mut().enumerate() {
            *texel = v0.lerp(v1, offset as f32 / span);
        }
    }

    let (last_idx, last_value) = anchors[anchors.len() - 1];
    texels[last_idx..].fill(last_value);

    Ok(TransferFunctionTable { texels })
}
