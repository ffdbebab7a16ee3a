//! Raw scalar volumes.
//!
//! Volumes are read from headerless, tightly packed files of unsigned integers (8-bit or
//! 16-bit little-endian), x fastest-varying, then y, then z.

use std::path::{Path, PathBuf};

use glam::{Mat4, UVec3, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::{Result, VolrenError};

/// Storage size of a single voxel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "u32", into = "u32")]
pub enum BitDepth {
    /// One byte per voxel.
    #[default]
    U8,
    /// Two bytes per voxel, little-endian.
    U16,
}

impl BitDepth {
    /// Returns the number of bytes per voxel.
    #[must_use]
    pub fn bytes(self) -> u32 {
        match self {
            BitDepth::U8 => 1,
            BitDepth::U16 => 2,
        }
    }

    /// Converts a byte count (1 or 2) into a bit depth.
    pub fn from_bytes(bytes: u32) -> Result<Self> {
        match bytes {
            1 => Ok(BitDepth::U8),
            2 => Ok(BitDepth::U16),
            other => Err(VolrenError::UnsupportedBitDepth(other)),
        }
    }
}

impl TryFrom<u32> for BitDepth {
    type Error = VolrenError;

    fn try_from(bytes: u32) -> Result<Self> {
        Self::from_bytes(bytes)
    }
}

impl From<BitDepth> for u32 {
    fn from(depth: BitDepth) -> Self {
        depth.bytes()
    }
}

/// Everything needed to open a raw volume file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeDescriptor {
    /// Path to the raw file. Relative paths in a JSON descriptor are resolved against the
    /// descriptor's directory by [`VolumeDescriptor::from_json_file`].
    pub path: PathBuf,
    /// Voxel counts along x, y, z.
    pub dimensions: UVec3,
    /// Physical size of one voxel along x, y, z.
    #[serde(default = "default_spacing")]
    pub spacing: Vec3,
    /// Bytes per voxel (1 or 2).
    #[serde(rename = "bytes_per_voxel", default)]
    pub bit_depth: BitDepth,
}

fn default_spacing() -> Vec3 {
    Vec3::ONE
}

impl VolumeDescriptor {
    /// Creates a new descriptor.
    pub fn new(
        path: impl Into<PathBuf>,
        dimensions: UVec3,
        spacing: Vec3,
        bit_depth: BitDepth,
    ) -> Self {
        Self {
            path: path.into(),
            dimensions,
            spacing,
            bit_depth,
        }
    }

    /// Reads a descriptor from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let mut descriptor: Self = serde_json::from_str(&text)?;
        if descriptor.path.is_relative() {
            if let Some(dir) = path.parent() {
                descriptor.path = dir.join(&descriptor.path);
            }
        }
        Ok(descriptor)
    }

    /// Returns the number of bytes the raw file must contain, or `None` when that
    /// count does not fit in `usize`.
    #[must_use]
    pub fn expected_len(&self) -> Option<usize> {
        expected_len(self.dimensions, self.bit_depth)
    }

    /// Checks dimensions and spacing, returning the expected byte count.
    pub fn validate(&self) -> Result<usize> {
        validate_shape(self.dimensions, self.spacing, self.bit_depth)
    }
}

/// Returns `x * y * z * bytes_per_voxel`, or `None` on overflow.
#[must_use]
pub fn expected_len(dimensions: UVec3, bit_depth: BitDepth) -> Option<usize> {
    (dimensions.x as usize)
        .checked_mul(dimensions.y as usize)?
        .checked_mul(dimensions.z as usize)?
        .checked_mul(bit_depth.bytes() as usize)
}

fn validate_shape(dimensions: UVec3, spacing: Vec3, bit_depth: BitDepth) -> Result<usize> {
    if dimensions.min_element() == 0 {
        return Err(VolrenError::InvalidDimensions(
            dimensions.x,
            dimensions.y,
            dimensions.z,
        ));
    }
    if !spacing.is_finite() || spacing.min_element() <= 0.0 {
        return Err(VolrenError::InvalidSpacing(spacing.x, spacing.y, spacing.z));
    }
    expected_len(dimensions, bit_depth).ok_or(VolrenError::VolumeTooLarge(
        dimensions.x,
        dimensions.y,
        dimensions.z,
    ))
}

/// Shape metadata of a volume, kept after the voxel data has been released.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeInfo {
    /// Voxel counts along x, y, z.
    pub dimensions: UVec3,
    /// Physical size of one voxel along x, y, z.
    pub spacing: Vec3,
    /// Storage size of a voxel.
    pub bit_depth: BitDepth,
}

impl VolumeInfo {
    /// Returns the physical extent (`dimensions * spacing`).
    #[must_use]
    pub fn physical_extent(&self) -> Vec3 {
        self.dimensions.as_vec3() * self.spacing
    }

    /// Returns the extent of the proxy box in world units, normalized so that the longest
    /// axis has length 1 while preserving the physical aspect ratio.
    #[must_use]
    pub fn normalized_extent(&self) -> Vec3 {
        let extent = self.physical_extent();
        extent / extent.max_element()
    }

    /// Returns the model matrix mapping the unit cube [0, 1]^3 onto the volume's box,
    /// scaled by `dimensions * spacing` and centered at the origin.
    #[must_use]
    pub fn model_matrix(&self) -> Mat4 {
        let extent = self.normalized_extent();
        Mat4::from_translation(-0.5 * extent) * Mat4::from_scale(extent)
    }

    /// Returns the largest voxel count, used to derive the ray-march step size.
    #[must_use]
    pub fn max_dimension(&self) -> u32 {
        self.dimensions.max_element()
    }
}

/// A scalar volume held in CPU memory.
#[derive(Debug, Clone)]
pub struct Volume {
    info: VolumeInfo,
    data: Vec<u8>,
}

impl Volume {
    /// Wraps raw voxel bytes, checking that the length matches the declared shape.
    pub fn from_bytes(
        dimensions: UVec3,
        spacing: Vec3,
        bit_depth: BitDepth,
        data: Vec<u8>,
    ) -> Result<Self> {
        let expected = validate_shape(dimensions, spacing, bit_depth)?;
        if data.len() != expected {
            return Err(VolrenError::SizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            info: VolumeInfo {
                dimensions,
                spacing,
                bit_depth,
            },
            data,
        })
    }

    /// Builds an 8-bit volume by evaluating `f` at every voxel; `f` returns a density in
    /// [0, 1].
    pub fn from_fn(
        dimensions: UVec3,
        spacing: Vec3,
        mut f: impl FnMut(u32, u32, u32) -> f32,
    ) -> Result<Self> {
        let len = validate_shape(dimensions, spacing, BitDepth::U8)?;
        let mut data = Vec::with_capacity(len);
        for z in 0..dimensions.z {
            for y in 0..dimensions.y {
                for x in 0..dimensions.x {
                    data.push((f(x, y, z).clamp(0.0, 1.0) * 255.0).round() as u8);
                }
            }
        }
        Self::from_bytes(dimensions, spacing, BitDepth::U8, data)
    }

    /// Reads a raw volume file.
    ///
    /// The whole file is read; a length that differs from the declared shape is an error,
    /// never a truncation or zero-fill.
    pub fn load(descriptor: &VolumeDescriptor) -> Result<Self> {
        descriptor.validate()?;

        let data = std::fs::read(&descriptor.path).map_err(|source| VolrenError::VolumeOpen {
            path: descriptor.path.clone(),
            source,
        })?;

        let volume = Self::from_bytes(
            descriptor.dimensions,
            descriptor.spacing,
            descriptor.bit_depth,
            data,
        )?;

        log::info!(
            "Loaded volume '{}' ({}x{}x{}, {} byte(s)/voxel)",
            descriptor.path.display(),
            descriptor.dimensions.x,
            descriptor.dimensions.y,
            descriptor.dimensions.z,
            descriptor.bit_depth.bytes()
        );

        Ok(volume)
    }

    /// Returns the shape metadata.
    #[must_use]
    pub fn info(&self) -> VolumeInfo {
        self.info
    }

    /// Returns the voxel counts.
    #[must_use]
    pub fn dimensions(&self) -> UVec3 {
        self.info.dimensions
    }

    /// Returns the voxel spacing.
    #[must_use]
    pub fn spacing(&self) -> Vec3 {
        self.info.spacing
    }

    /// Returns the bit depth.
    #[must_use]
    pub fn bit_depth(&self) -> BitDepth {
        self.info.bit_depth
    }

    /// Returns the raw voxel bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the volume, returning its metadata and raw bytes.
    #[must_use]
    pub fn into_parts(self) -> (VolumeInfo, Vec<u8>) {
        (self.info, self.data)
    }

    /// Returns the normalized density of a voxel in [0, 1].
    #[must_use]
    pub fn voxel(&self, x: u32, y: u32, z: u32) -> f32 {
        let dims = self.info.dimensions;
        let index = (z as usize * dims.y as usize + y as usize) * dims.x as usize + x as usize;
        match self.info.bit_depth {
            BitDepth::U8 => f32::from(self.data[index]) / 255.0,
            BitDepth::U16 => {
                let lo = self.data[index * 2];
                let hi = self.data[index * 2 + 1];
                f32::from(u16::from_le_bytes([lo, hi])) / 65535.0
            }
        }
    }

    /// Samples the density at a normalized texture coordinate with trilinear filtering
    /// and clamp-to-edge addressing. Voxel `i` is centered at `(i + 0.5) / n`.
    #[must_use]
    pub fn sample_trilinear(&self, coord: Vec3) -> f32 {
        let dims = self.info.dimensions;
        let max = (dims - UVec3::ONE).as_vec3();
        let p = (coord * dims.as_vec3() - Vec3::splat(0.5)).clamp(Vec3::ZERO, max);

        let base = p.floor();
        let t = p - base;
        let x0 = base.x as u32;
        let y0 = base.y as u32;
        let z0 = base.z as u32;
        let x1 = (x0 + 1).min(dims.x - 1);
        let y1 = (y0 + 1).min(dims.y - 1);
        let z1 = (z0 + 1).min(dims.z - 1);

        let lerp = |a: f32, b: f32, s: f32| a + (b - a) * s;

        let c00 = lerp(self.voxel(x0, y0, z0), self.voxel(x1, y0, z0), t.x);
        let c10 = lerp(self.voxel(x0, y1, z0), self.voxel(x1, y1, z0), t.x);
        let c01 = lerp(self.voxel(x0, y0, z1), self.voxel(x1, y0, z1), t.x);
        let c11 = lerp(self.voxel(x0, y1, z1), self.voxel(x1, y1, z1), t.x);

        let c0 = lerp(c00, c10, t.y);
        let c1 = lerp(c01, c11, t.y);
        lerp(c0, c1, t.z)
    }
}
