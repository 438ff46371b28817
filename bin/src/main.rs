#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;

mod options;
mod scene;

use device::{CpuQueue, Queue};
use half::f16;
use integrator::{Destination, PassAccessor, PathTrace, RenderStatus};
use kernel::film::{BufferParams, RenderBuffer};
use kernel::{PassType, RenderParams};
use options::OPTIONS;
use scene::DemoScene;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use util::clamp;

fn main() {
    // Initialize `env_logger`.
    env_logger::init();

    if let Err(e) = render() {
        error!("{e}");
        std::process::exit(1);
    }
}

fn render() -> Result<(), String> {
    let params = RenderParams {
        width: OPTIONS.width,
        height: OPTIONS.height,
        num_samples: OPTIONS.num_samples,
        ..RenderParams::default()
    };
    if params.width == 0 || params.height == 0 {
        return Err("image dimensions must be non-zero".to_string());
    }

    let queue: Arc<dyn Queue> = Arc::new(CpuQueue::new(OPTIONS.threads())?);
    let services = Arc::new(DemoScene::new(params.width, params.height));

    let mut buffer_params = BufferParams::new(params.width as usize, params.height as usize);
    buffer_params.add_pass(PassType::Combined);
    let buffer = RenderBuffer::new(buffer_params);

    let mut tracer: PathTrace = PathTrace::new(
        Arc::clone(&queue),
        services,
        params,
        OPTIONS.num_paths.max(1),
    )?;

    let cancel = AtomicBool::new(false);
    let status = if OPTIONS.megakernel {
        tracer.render_megakernel(&buffer, &cancel)
    } else {
        tracer.render(&buffer, &cancel)
    };
    if status != RenderStatus::Complete {
        return Err("render did not complete".to_string());
    }

    let accessor = PassAccessor::new(queue, OPTIONS.exposure, params.num_samples);
    let mut destination =
        Destination::half_rgba(params.width as usize, params.height as usize);
    accessor.get_pass_combined(&buffer, &destination)?;

    write_png(
        &OPTIONS.image_file,
        params.width,
        params.height,
        &destination.half_rgba_pixels(),
    )
}

/// Writes half-precision RGBA pixels as an 8-bit PNG, gamma encoding the
/// color channels.
fn write_png(path: &str, width: u32, height: u32, pixels: &[[f16; 4]]) -> Result<(), String> {
    let to_byte = |v: f16, gamma: bool| {
        let v = clamp(v.to_f32(), 0.0, 1.0);
        let v = if gamma { v.powf(1.0 / 2.2) } else { v };
        (v * 255.0 + 0.5) as u8
    };

    let mut image = image::RgbaImage::new(width, height);
    for (i, pixel) in image.pixels_mut().enumerate() {
        let rgba = pixels[i];
        *pixel = image::Rgba([
            to_byte(rgba[0], true),
            to_byte(rgba[1], true),
            to_byte(rgba[2], true),
            to_byte(rgba[3], false),
        ]);
    }

    info!("Writing image to {path}");
    image
        .save(path)
        .map_err(|e| format!("Failed to write '{path}': {e}"))
}
