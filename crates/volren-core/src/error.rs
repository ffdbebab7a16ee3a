//! Error types for volren.

use std::path::PathBuf;

use thiserror::Error;

/// The main error type for volren operations.
#[derive(Error, Debug)]
pub enum VolrenError {
    /// The volume file could not be opened or read.
    #[error("unable to open volume file '{path}': {source}")]
    VolumeOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The volume byte length does not match the declared dimensions and bit depth.
    #[error("volume size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// Unsupported number of bytes per voxel.
    #[error("unsupported bytes per voxel: {0} (expected 1 or 2)")]
    UnsupportedBitDepth(u32),

    /// One of the volume dimensions is zero.
    #[error("invalid volume dimensions {0}x{1}x{2}")]
    InvalidDimensions(u32, u32, u32),

    /// The declared shape holds more bytes than can be addressed.
    #[error("volume {0}x{1}x{2} is too large to address")]
    VolumeTooLarge(u32, u32, u32),

    /// A spacing component is not a positive finite number.
    #[error("invalid voxel spacing ({0}, {1}, {2})")]
    InvalidSpacing(f32, f32, f32),

    /// The transfer function has no control points.
    #[error("transfer function requires at least one control point")]
    EmptyTransferFunction,

    /// Control point positions are not monotonically non-decreasing.
    #[error("transfer function control point {index} at position {current} precedes previous position {previous}")]
    UnsortedControlPoints {
        index: usize,
        previous: f32,
        current: f32,
    },

    /// A control point has a position or value outside [0, 1].
    #[error("transfer function control point {index} is outside [0, 1]")]
    ControlPointOutOfRange { index: usize },

    /// The transfer function table resolution is too small.
    #[error("transfer function resolution must be at least 2, got {0}")]
    InvalidResolution(usize),

    /// Rendering error.
    #[error("render error: {0}")]
    RenderError(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// A specialized Result type for volren operations.
pub type Result<T> = std::result::Result<T, VolrenError>;
