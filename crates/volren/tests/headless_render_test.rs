//! Headless rendering integration tests.
//!
//! These tests need a GPU adapter (real or software fallback). Without one, engine
//! creation fails and each test returns early after printing why it was skipped.

use std::path::PathBuf;

use volren::*;

const WIDTH: u32 = 160;
const HEIGHT: u32 = 120;

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("volren-headless-{}-{name}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Options with a dark blue background and the red test transfer function.
fn red_options() -> Options {
    Options {
        background_color: Vec3::new(0.0, 0.0, 0.4),
        transfer_function: TransferFunction::new(vec![
            ControlPoint::new(0.0, Vec3::ZERO, 0.0),
            ControlPoint::new(0.5, Vec3::new(1.0, 0.0, 0.0), 1.0),
        ])
        .unwrap(),
        ..Options::default()
    }
}

fn engine_or_skip(options: &Options) -> Option<RenderEngine> {
    match create_headless_engine(options, WIDTH, HEIGHT) {
        Ok(engine) => Some(engine),
        Err(e) => {
            eprintln!("Skipping headless test: no GPU adapter available ({e})");
            None
        }
    }
}

fn camera() -> ArcballCamera {
    ArcballCamera::looking_at_origin(2.5, WIDTH, HEIGHT, std::f32::consts::FRAC_PI_4)
}

fn pixel(pixels: &[u8], x: u32, y: u32) -> Vec3 {
    let i = ((y * WIDTH + x) * 4) as usize;
    Vec3::new(
        f32::from(pixels[i]),
        f32::from(pixels[i + 1]),
        f32::from(pixels[i + 2]),
    ) / 255.0
}

fn assert_color_near(actual: Vec3, expected: Vec3, tolerance: f32) {
    assert!(
        actual.abs_diff_eq(expected, tolerance),
        "expected {expected}, got {actual}"
    );
}

fn uniform_volume(density: f32) -> Volume {
    Volume::from_fn(UVec3::splat(256), Vec3::ONE, |_, _, _| density).unwrap()
}

#[test]
fn headless_empty_scene_is_background() {
    let options = red_options();
    let Some(engine) = engine_or_skip(&options) else {
        return;
    };

    let pixels = engine.capture_frame(&camera()).unwrap();
    assert_eq!(pixels.len(), (WIDTH * HEIGHT * 4) as usize);
    let first = &pixels[0..4];
    assert!(pixels.chunks(4).all(|px| px == first));
    assert_color_near(pixel(&pixels, 0, 0), options.background_color, 1.0 / 255.0);
}

#[test]
fn headless_red_scenario_matches_reference() {
    let options = red_options();
    let Some(mut engine) = engine_or_skip(&options) else {
        return;
    };
    let camera = camera();
    let background = options.background_color;

    // Density far below the ramp renders pure background everywhere.
    engine.set_volume(uniform_volume(0.0)).unwrap();
    let pixels = engine.capture_frame(&camera).unwrap();
    assert_color_near(pixel(&pixels, WIDTH / 2, HEIGHT / 2), background, 1.0 / 255.0);

    // Density 0.5 is opaque red inside the box, background outside it.
    let volume = uniform_volume(0.5);
    engine.set_volume(volume.clone()).unwrap();
    let pixels = engine.capture_frame(&camera).unwrap();
    assert_color_near(
        pixel(&pixels, WIDTH / 2, HEIGHT / 2),
        Vec3::new(1.0, 0.0, 0.0),
        2.0 / 255.0,
    );
    assert_color_near(pixel(&pixels, 0, 0), background, 1.0 / 255.0);

    // The CPU compositor agrees with the GPU on the center ray.
    let entry_exit = engine.read_entry_exit().unwrap();
    let (entry, exit) = entry_exit.at(WIDTH / 2, HEIGHT / 2);
    assert_eq!(entry.w, 1.0);
    let expected = composite_ray(
        &volume,
        engine.transfer_function_table(),
        entry.truncate(),
        exit.truncate(),
        &RaymarchParams {
            sampling_rate: engine.settings.sampling_rate,
            early_termination_alpha: engine.settings.early_termination_alpha,
            background,
        },
    );
    assert_color_near(pixel(&pixels, WIDTH / 2, HEIGHT / 2), expected, 3.0 / 255.0);
}

#[test]
fn headless_sixteen_bit_volume() {
    let options = red_options();
    let Some(mut engine) = engine_or_skip(&options) else {
        return;
    };

    let dimensions = UVec3::splat(64);
    let data = 32768u16
        .to_le_bytes()
        .repeat((dimensions.x * dimensions.y * dimensions.z) as usize);
    let volume = Volume::from_bytes(dimensions, Vec3::ONE, BitDepth::U16, data).unwrap();
    engine.set_volume(volume).unwrap();

    let pixels = engine.capture_frame(&camera()).unwrap();
    assert_color_near(
        pixel(&pixels, WIDTH / 2, HEIGHT / 2),
        Vec3::new(1.0, 0.0, 0.0),
        0.02,
    );
}

#[test]
fn headless_uncovered_pixels_have_equal_entry_and_exit() {
    let options = red_options();
    let Some(mut engine) = engine_or_skip(&options) else {
        return;
    };
    engine.set_volume(uniform_volume(0.5)).unwrap();
    engine.capture_frame(&camera()).unwrap();

    let entry_exit = engine.read_entry_exit().unwrap();
    for (x, y) in [(0, 0), (WIDTH - 1, 0), (0, HEIGHT - 1), (WIDTH - 1, HEIGHT - 1)] {
        let (entry, exit) = entry_exit.at(x, y);
        assert_eq!(entry, exit, "pixel ({x}, {y})");
    }

    // Covered pixels enter on the front face, nearer the camera than the exit.
    let (entry, exit) = entry_exit.at(WIDTH / 2, HEIGHT / 2);
    assert!(entry.z > exit.z, "entry {entry}, exit {exit}");
}

#[test]
fn headless_rendering_is_deterministic() {
    let mut options = red_options();
    options.transfer_function = TransferFunction::default();
    let Some(mut engine) = engine_or_skip(&options) else {
        return;
    };
    let sphere = Volume::from_fn(UVec3::splat(48), Vec3::new(1.0, 1.0, 1.5), |x, y, z| {
        let p = Vec3::new(x as f32, y as f32, z as f32) / 47.0 - 0.5;
        1.0 - 2.0 * p.length()
    })
    .unwrap();
    engine.set_volume(sphere).unwrap();

    let camera = camera();
    let first = engine.capture_frame(&camera).unwrap();
    let second = engine.capture_frame(&camera).unwrap();
    assert!(first == second, "two renders without input differ");
}

#[test]
fn headless_failed_load_keeps_previous_volume() {
    let dir = scratch_dir("failed-load");
    let options = red_options();
    let Some(mut engine) = engine_or_skip(&options) else {
        return;
    };
    let camera = camera();

    let good = dir.join("good.raw");
    std::fs::write(&good, vec![128u8; 32 * 32 * 32]).unwrap();
    let info = engine
        .load_volume(&VolumeDescriptor::new(
            &good,
            UVec3::splat(32),
            Vec3::ONE,
            BitDepth::U8,
        ))
        .unwrap();
    let before = engine.capture_frame(&camera).unwrap();

    let bad = dir.join("bad.raw");
    std::fs::write(&bad, vec![0u8; 100]).unwrap();
    let result = engine.load_volume(&VolumeDescriptor::new(
        &bad,
        UVec3::splat(32),
        Vec3::ONE,
        BitDepth::U8,
    ));
    assert!(matches!(
        result,
        Err(RenderError::Core(VolrenError::SizeMismatch { .. }))
    ));

    assert_eq!(engine.volume_info(), Some(info));
    let after = engine.capture_frame(&camera).unwrap();
    assert!(before == after, "failed load changed the rendered volume");

    std::fs::remove_dir_all(dir).ok();
}

#[test]
fn headless_render_to_file() {
    let dir = scratch_dir("to-file");
    let raw = dir.join("cube.raw");
    std::fs::write(&raw, vec![200u8; 16 * 16 * 16]).unwrap();
    let options = Options {
        volume: Some(VolumeDescriptor::new(
            &raw,
            UVec3::splat(16),
            Vec3::ONE,
            BitDepth::U8,
        )),
        ..red_options()
    };
    if engine_or_skip(&options).is_none() {
        return;
    }

    let path = dir.join("frame.png");
    render_to_file(&options, &path, WIDTH, HEIGHT).unwrap();
    assert!(path.exists());

    // A missing volume file is an error for the headless API.
    let missing = Options {
        volume: Some(VolumeDescriptor::new(
            dir.join("missing.raw"),
            UVec3::splat(16),
            Vec3::ONE,
            BitDepth::U8,
        )),
        ..red_options()
    };
    assert!(matches!(
        render_to_image(&missing, WIDTH, HEIGHT),
        Err(VolrenError::VolumeOpen { .. })
    ));

    std::fs::remove_dir_all(dir).ok();
}

#[test]
fn headless_resize_rebuilds_targets() {
    const RESIZED_WIDTH: u32 = 200;
    const RESIZED_HEIGHT: u32 = 100;

    let options = red_options();
    let Some(mut engine) = engine_or_skip(&options) else {
        return;
    };
    engine.set_volume(uniform_volume(0.5)).unwrap();
    engine.resize(RESIZED_WIDTH, RESIZED_HEIGHT);

    let camera = ArcballCamera::looking_at_origin(
        2.5,
        RESIZED_WIDTH,
        RESIZED_HEIGHT,
        std::f32::consts::FRAC_PI_4,
    );
    let pixels = engine.capture_frame(&camera).unwrap();
    assert_eq!(pixels.len(), (RESIZED_WIDTH * RESIZED_HEIGHT * 4) as usize);

    let at = |x: u32, y: u32| {
        let i = ((y * RESIZED_WIDTH + x) * 4) as usize;
        Vec3::new(
            f32::from(pixels[i]),
            f32::from(pixels[i + 1]),
            f32::from(pixels[i + 2]),
        ) / 255.0
    };
    assert_color_near(
        at(RESIZED_WIDTH / 2, RESIZED_HEIGHT / 2),
        Vec3::new(1.0, 0.0, 0.0),
        2.0 / 255.0,
    );
    assert_color_near(at(0, 0), options.background_color, 1.0 / 255.0);

    let entry_exit = engine.read_entry_exit().unwrap();
    assert_eq!(
        (entry_exit.width, entry_exit.height),
        (RESIZED_WIDTH, RESIZED_HEIGHT)
    );
    assert_eq!(
        entry_exit.entry.len(),
        (RESIZED_WIDTH * RESIZED_HEIGHT) as usize
    );

    // Resizing to the current size keeps the frame unchanged.
    engine.resize(RESIZED_WIDTH, RESIZED_HEIGHT);
    assert_eq!(engine.capture_frame(&camera).unwrap(), pixels);
}

#[test]
fn headless_gpu_resources_match_inputs() {
    let options = red_options();
    let Some(engine) = engine_or_skip(&options) else {
        return;
    };

    assert_eq!(
        volren_render::ProxyMesh::cube(&engine.device).index_count(),
        14
    );
    assert_eq!(
        volren_render::ProxyMesh::quad(&engine.device).index_count(),
        6
    );

    let table = build_transfer_function(options.transfer_function.points(), 128).unwrap();
    let texture =
        volren_render::TransferFunctionTexture::upload(&engine.device, &engine.queue, &table)
            .unwrap();
    assert_eq!(texture.resolution(), table.len() as u32);

    let features = engine.device.features();
    let volume = Volume::from_fn(UVec3::splat(8), Vec3::ONE, |_, _, _| 0.25).unwrap();
    let texture =
        volren_render::VolumeTexture::upload(&engine.device, &engine.queue, volume).unwrap();
    assert_eq!(
        texture.format(),
        volren_render::volume_texture::texture_format(BitDepth::U8, features)
    );

    let dimensions = UVec3::splat(8);
    let data = 1000u16
        .to_le_bytes()
        .repeat((dimensions.x * dimensions.y * dimensions.z) as usize);
    let volume = Volume::from_bytes(dimensions, Vec3::ONE, BitDepth::U16, data).unwrap();
    let texture =
        volren_render::VolumeTexture::upload(&engine.device, &engine.queue, volume).unwrap();
    assert_eq!(
        texture.format(),
        volren_render::volume_texture::texture_format(BitDepth::U16, features)
    );
}
