//! Core abstractions for volren.
//!
//! This crate holds everything that does not need a GPU:
//! - [`Volume`] loading and validation of raw scalar fields
//! - [`TransferFunction`] control points and the dense lookup table builder
//! - [`Options`] viewer configuration
//! - [`PointerState`] drag tracking for camera interaction
//! - a CPU reference of the composite ray-march in [`raymarch`]

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Builder patterns return Self which doesn't need must_use
#![allow(clippy::must_use_candidate)]
// Voxel indices and texel counts are converted to floats for interpolation
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

pub mod error;
pub mod interaction;
pub mod options;
pub mod raymarch;
pub mod transfer_function;
pub mod volume;

pub use error::{Result, VolrenError};
pub use interaction::{Drag, PointerState};
pub use options::{CameraStyle, Options, FOV_RANGE};
pub use raymarch::{composite_ray, probe_ray, RayProbe, RaymarchParams, MAX_STEPS};
pub use transfer_function::{
    build_transfer_function, ControlPoint, TransferFunction, TransferFunctionTable,
};
pub use volume::{BitDepth, Volume, VolumeDescriptor, VolumeInfo};

// Re-export glam types for convenience
pub use glam::{Mat4, UVec3, Vec2, Vec3, Vec4};
