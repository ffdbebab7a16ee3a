#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
//! Demo opening the volren viewer.
//!
//! With a path argument, opens that JSON volume descriptor. Otherwise writes a synthetic
//! 16-bit dataset (two nested shells and a dense core, with anisotropic spacing) to the
//! temp directory and opens it.
//!
//! Drag with the left mouse button to rotate, scroll to zoom, press `R` to reset the
//! camera. Dropping another descriptor onto the window replaces the volume.

use std::path::PathBuf;

fn write_synthetic_volume() -> volren::Result<PathBuf> {
    let (nx, ny, nz) = (128u32, 128u32, 96u32);
    let mut data = Vec::with_capacity((nx * ny * nz * 2) as usize);
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                let x = i as f32 / (nx - 1) as f32 * 2.0 - 1.0;
                let y = j as f32 / (ny - 1) as f32 * 2.0 - 1.0;
                let z = k as f32 / (nz - 1) as f32 * 2.0 - 1.0;
                let r = (x * x + y * y + z * z).sqrt();

                let shell = |radius: f32, width: f32| (1.0 - ((r - radius) / width).abs()).max(0.0);
                let density = (0.35 * shell(0.85, 0.06)
                    + 0.6 * shell(0.55, 0.05)
                    + if r < 0.25 { 1.0 } else { 0.0 })
                .min(1.0);

                let value = (density * f32::from(u16::MAX)).round() as u16;
                data.extend_from_slice(&value.to_le_bytes());
            }
        }
    }

    let dir = std::env::temp_dir().join("volren-demo");
    std::fs::create_dir_all(&dir)?;
    std::fs::write(dir.join("shells.raw"), data)?;

    let descriptor = volren::VolumeDescriptor::new(
        "shells.raw",
        volren::UVec3::new(nx, ny, nz),
        volren::Vec3::new(1.0, 1.0, 1.25),
        volren::BitDepth::U16,
    );
    let descriptor_path = dir.join("shells.json");
    std::fs::write(&descriptor_path, serde_json::to_string_pretty(&descriptor)?)?;
    Ok(descriptor_path)
}

fn main() -> volren::Result<()> {
    let descriptor_path = match std::env::args().nth(1) {
        Some(path) => PathBuf::from(path),
        None => write_synthetic_volume()?,
    };
    volren::show_volume(descriptor_path)
}
