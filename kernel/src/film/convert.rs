//! Film convert kernels.
//!
//! Pure per-pixel conversions from accumulated buffer channels to final
//! output values. Each kernel is a deterministic function of the pixel's
//! channels and the [`FilmConvert`] parameter block, so running a
//! conversion twice over an unchanged buffer yields identical output.

use crate::types::FilmConvertKernel;
use half::f16;
use util::{clamp, Float};

/// Parameter block for one film convert dispatch.
#[derive(Copy, Clone, Debug)]
pub struct FilmConvert {
    /// Channel offset of the source pass.
    pub pass_offset: usize,

    /// Channel offset of the secondary source pass, for composites that
    /// read two passes (shadow-catcher matte).
    pub pass_offset2: Option<usize>,

    /// Number of float channels per pixel in the buffer.
    pub pass_stride: usize,

    /// Sample normalization factor, 1 / num_samples.
    pub scale: Float,

    /// Sample normalization combined with exposure, applied to color
    /// channels.
    pub scale_exposure: Float,
}

impl FilmConvert {
    /// Create a parameter block.
    ///
    /// * `pass_offset` - Channel offset of the source pass.
    /// * `pass_stride` - Channels per pixel.
    /// * `num_samples` - Samples accumulated per pixel.
    /// * `exposure`    - Exposure multiplier for color channels.
    pub fn new(pass_offset: usize, pass_stride: usize, num_samples: u32, exposure: Float) -> Self {
        let scale = 1.0 / num_samples.max(1) as Float;
        Self {
            pass_offset,
            pass_offset2: None,
            pass_stride,
            scale,
            scale_exposure: scale * exposure,
        }
    }
}

/// Converts one pixel's channels to an RGBA value for the given kernel.
///
/// * `kernel` - The film convert kernel to run.
/// * `kfilm`  - Conversion parameters.
/// * `pixel`  - The pixel's channels, `pass_stride` floats.
pub fn film_get_pass_pixel(
    kernel: FilmConvertKernel,
    kfilm: &FilmConvert,
    pixel: &[Float],
) -> [Float; 4] {
    match kernel {
        FilmConvertKernel::Depth => film_get_pass_pixel_depth(kfilm, pixel),
        FilmConvertKernel::Mist => film_get_pass_pixel_mist(kfilm, pixel),
        FilmConvertKernel::SampleCount => film_get_pass_pixel_sample_count(kfilm, pixel),
        FilmConvertKernel::Float => film_get_pass_pixel_float(kfilm, pixel),
        FilmConvertKernel::Float3 => film_get_pass_pixel_float3(kfilm, pixel),
        FilmConvertKernel::Motion => film_get_pass_pixel_motion(kfilm, pixel),
        FilmConvertKernel::Cryptomatte => film_get_pass_pixel_cryptomatte(kfilm, pixel),
        FilmConvertKernel::ShadowCatcher => film_get_pass_pixel_shadow_catcher(kfilm, pixel),
        FilmConvertKernel::ShadowCatcherMatteWithShadow => {
            film_get_pass_pixel_shadow_catcher_matte_with_shadow(kfilm, pixel)
        }
        FilmConvertKernel::Combined | FilmConvertKernel::Float4 => {
            film_get_pass_pixel_float4(kfilm, pixel)
        }
    }
}

/// Scalar distance pass, replicated to RGB.
fn film_get_pass_pixel_depth(kfilm: &FilmConvert, pixel: &[Float]) -> [Float; 4] {
    let d = pixel[kfilm.pass_offset] * kfilm.scale;
    [d, d, d, 1.0]
}

/// Mist factor, clamped to [0, 1].
fn film_get_pass_pixel_mist(kfilm: &FilmConvert, pixel: &[Float]) -> [Float; 4] {
    let v = clamp(pixel[kfilm.pass_offset] * kfilm.scale, 0.0, 1.0);
    [v, v, v, 1.0]
}

fn film_get_pass_pixel_sample_count(kfilm: &FilmConvert, pixel: &[Float]) -> [Float; 4] {
    let v = pixel[kfilm.pass_offset] * kfilm.scale;
    [v, v, v, 1.0]
}

fn film_get_pass_pixel_float(kfilm: &FilmConvert, pixel: &[Float]) -> [Float; 4] {
    let v = pixel[kfilm.pass_offset] * kfilm.scale;
    [v, v, v, 1.0]
}

fn film_get_pass_pixel_float3(kfilm: &FilmConvert, pixel: &[Float]) -> [Float; 4] {
    let p = kfilm.pass_offset;
    [
        pixel[p] * kfilm.scale_exposure,
        pixel[p + 1] * kfilm.scale_exposure,
        pixel[p + 2] * kfilm.scale_exposure,
        1.0,
    ]
}

/// RGBA color pass: exposure applies to radiance, alpha is the sample
/// count and only gets the sample normalization.
fn film_get_pass_pixel_float4(kfilm: &FilmConvert, pixel: &[Float]) -> [Float; 4] {
    let p = kfilm.pass_offset;
    [
        pixel[p] * kfilm.scale_exposure,
        pixel[p + 1] * kfilm.scale_exposure,
        pixel[p + 2] * kfilm.scale_exposure,
        pixel[p + 3] * kfilm.scale,
    ]
}

/// Motion vectors are data, not radiance: sample normalization only.
fn film_get_pass_pixel_motion(kfilm: &FilmConvert, pixel: &[Float]) -> [Float; 4] {
    let p = kfilm.pass_offset;
    [
        pixel[p] * kfilm.scale,
        pixel[p + 1] * kfilm.scale,
        pixel[p + 2] * kfilm.scale,
        pixel[p + 3] * kfilm.scale,
    ]
}

/// Cryptomatte id/weight pairs: ids pass through untouched, coverage
/// weights are normalized by sample count.
fn film_get_pass_pixel_cryptomatte(kfilm: &FilmConvert, pixel: &[Float]) -> [Float; 4] {
    let p = kfilm.pass_offset;
    [
        pixel[p],
        pixel[p + 1] * kfilm.scale,
        pixel[p + 2],
        pixel[p + 3] * kfilm.scale,
    ]
}

fn film_get_pass_pixel_shadow_catcher(kfilm: &FilmConvert, pixel: &[Float]) -> [Float; 4] {
    let p = kfilm.pass_offset;
    [
        pixel[p] * kfilm.scale_exposure,
        pixel[p + 1] * kfilm.scale_exposure,
        pixel[p + 2] * kfilm.scale_exposure,
        1.0,
    ]
}

/// Matte pass modulated by the catcher's average shadowing. Reads the
/// matte RGBA at `pass_offset` and the catcher RGB at `pass_offset2`.
fn film_get_pass_pixel_shadow_catcher_matte_with_shadow(
    kfilm: &FilmConvert,
    pixel: &[Float],
) -> [Float; 4] {
    let matte = film_get_pass_pixel_float4(kfilm, pixel);
    let p2 = kfilm
        .pass_offset2
        .expect("shadow catcher composite requires a second pass offset");
    let shadow = (pixel[p2] + pixel[p2 + 1] + pixel[p2 + 2]) * kfilm.scale_exposure * (1.0 / 3.0);
    [
        matte[0] * shadow,
        matte[1] * shadow,
        matte[2] * shadow,
        matte[3],
    ]
}

/// Converts an RGBA value to half precision.
///
/// * `rgba` - The value.
pub fn float4_to_half4(rgba: [Float; 4]) -> [f16; 4] {
    [
        f16::from_f32(rgba[0]),
        f16::from_f32(rgba[1]),
        f16::from_f32(rgba[2]),
        f16::from_f32(rgba[3]),
    ]
}
