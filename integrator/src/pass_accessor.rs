//! Pass accessor: render buffer to output pixels.
//!
//! Reads accumulated passes out of a render buffer and converts them to
//! display or compositing pixels by dispatching the film convert kernels
//! through a device queue. One dispatch plus one synchronization per call;
//! the conversions are pure per-pixel functions, so accessing the same
//! unchanged buffer twice yields identical output.

use device::Queue;
use half::f16;
use kernel::film::{
    film_get_pass_pixel, float4_to_half4, BufferParams, FilmConvert, RenderBuffer,
};
use kernel::{DeviceKernel, FilmConvertKernel, PassType};
use std::sync::Arc;
use util::{Float, SyncCell};

/// Output pixel storage for a pass access. Either a half-precision RGBA
/// image or a float image with a caller-chosen component count; cells are
/// shared with the device workers, each of which writes a distinct pixel.
pub struct Destination {
    pixels_half_rgba: Option<Vec<SyncCell<[f16; 4]>>>,
    pixels_float: Option<Vec<SyncCell<Float>>>,
    num_components: usize,

    /// Pixel index offset of the converted region within the destination.
    pub offset: usize,

    /// Row stride of the destination in pixels.
    pub stride: usize,
}

impl Destination {
    /// Create a half-precision RGBA destination.
    ///
    /// * `width`  - Image width in pixels.
    /// * `height` - Image height in pixels.
    pub fn half_rgba(width: usize, height: usize) -> Self {
        Self {
            pixels_half_rgba: Some((0..width * height).map(|_| SyncCell::default()).collect()),
            pixels_float: None,
            num_components: 4,
            offset: 0,
            stride: width,
        }
    }

    /// Create a float destination.
    ///
    /// * `width`          - Image width in pixels.
    /// * `height`         - Image height in pixels.
    /// * `num_components` - Float components stored per pixel; between 1
    ///                      and 4, the size of a converted pixel.
    pub fn float(width: usize, height: usize, num_components: usize) -> Result<Self, String> {
        if num_components == 0 || num_components > 4 {
            return Err(format!(
                "float destination supports 1 to 4 components, got {num_components}"
            ));
        }
        Ok(Self {
            pixels_half_rgba: None,
            pixels_float: Some(
                (0..width * height * num_components)
                    .map(|_| SyncCell::default())
                    .collect(),
            ),
            num_components,
            offset: 0,
            stride: width,
        })
    }

    /// Returns the half-precision RGBA pixels, empty for a float
    /// destination.
    pub fn half_rgba_pixels(&mut self) -> Vec<[f16; 4]> {
        self.pixels_half_rgba
            .as_mut()
            .map(|cells| cells.iter_mut().map(|c| *c.get_mut()).collect())
            .unwrap_or_default()
    }

    /// Returns the float pixels, empty for a half-precision destination.
    pub fn float_pixels(&mut self) -> Vec<Float> {
        self.pixels_float
            .as_mut()
            .map(|cells| cells.iter_mut().map(|c| *c.get_mut()).collect())
            .unwrap_or_default()
    }
}

/// Returns the buffer pass a film convert kernel reads.
fn source_pass(kernel: FilmConvertKernel) -> PassType {
    match kernel {
        FilmConvertKernel::Depth => PassType::Depth,
        FilmConvertKernel::Mist => PassType::Mist,
        FilmConvertKernel::SampleCount => PassType::SampleCount,
        FilmConvertKernel::Float => PassType::Float,
        FilmConvertKernel::Float3 => PassType::Float3,
        FilmConvertKernel::Motion => PassType::Motion,
        FilmConvertKernel::Cryptomatte => PassType::Cryptomatte,
        FilmConvertKernel::ShadowCatcher => PassType::ShadowCatcher,
        FilmConvertKernel::ShadowCatcherMatteWithShadow => PassType::ShadowCatcherMatte,
        FilmConvertKernel::Combined => PassType::Combined,
        FilmConvertKernel::Float4 => PassType::Float4,
    }
}

/// Converts accumulated render buffer passes to output pixels, one
/// `get_pass_*` entry point per film convert kernel.
pub struct PassAccessor {
    queue: Arc<dyn Queue>,
    exposure: Float,
    num_samples: u32,
}

impl PassAccessor {
    /// Create a pass accessor.
    ///
    /// * `queue`       - Device queue to dispatch conversions through.
    /// * `exposure`    - Exposure multiplier applied to color channels.
    /// * `num_samples` - Samples accumulated per pixel, for normalization.
    pub fn new(queue: Arc<dyn Queue>, exposure: Float, num_samples: u32) -> Self {
        Self {
            queue,
            exposure,
            num_samples,
        }
    }

    pub fn get_pass_depth(
        &self,
        buffers: &RenderBuffer,
        destination: &Destination,
    ) -> Result<(), String> {
        self.run_film_convert(FilmConvertKernel::Depth, buffers, destination)
    }

    pub fn get_pass_mist(
        &self,
        buffers: &RenderBuffer,
        destination: &Destination,
    ) -> Result<(), String> {
        self.run_film_convert(FilmConvertKernel::Mist, buffers, destination)
    }

    pub fn get_pass_sample_count(
        &self,
        buffers: &RenderBuffer,
        destination: &Destination,
    ) -> Result<(), String> {
        self.run_film_convert(FilmConvertKernel::SampleCount, buffers, destination)
    }

    pub fn get_pass_float(
        &self,
        buffers: &RenderBuffer,
        destination: &Destination,
    ) -> Result<(), String> {
        self.run_film_convert(FilmConvertKernel::Float, buffers, destination)
    }

    pub fn get_pass_float3(
        &self,
        buffers: &RenderBuffer,
        destination: &Destination,
    ) -> Result<(), String> {
        self.run_film_convert(FilmConvertKernel::Float3, buffers, destination)
    }

    pub fn get_pass_motion(
        &self,
        buffers: &RenderBuffer,
        destination: &Destination,
    ) -> Result<(), String> {
        self.run_film_convert(FilmConvertKernel::Motion, buffers, destination)
    }

    pub fn get_pass_cryptomatte(
        &self,
        buffers: &RenderBuffer,
        destination: &Destination,
    ) -> Result<(), String> {
        self.run_film_convert(FilmConvertKernel::Cryptomatte, buffers, destination)
    }

    pub fn get_pass_shadow_catcher(
        &self,
        buffers: &RenderBuffer,
        destination: &Destination,
    ) -> Result<(), String> {
        self.run_film_convert(FilmConvertKernel::ShadowCatcher, buffers, destination)
    }

    pub fn get_pass_shadow_catcher_matte_with_shadow(
        &self,
        buffers: &RenderBuffer,
        destination: &Destination,
    ) -> Result<(), String> {
        self.run_film_convert(
            FilmConvertKernel::ShadowCatcherMatteWithShadow,
            buffers,
            destination,
        )
    }

    pub fn get_pass_combined(
        &self,
        buffers: &RenderBuffer,
        destination: &Destination,
    ) -> Result<(), String> {
        self.run_film_convert(FilmConvertKernel::Combined, buffers, destination)
    }

    pub fn get_pass_float4(
        &self,
        buffers: &RenderBuffer,
        destination: &Destination,
    ) -> Result<(), String> {
        self.run_film_convert(FilmConvertKernel::Float4, buffers, destination)
    }

    /// Builds the conversion parameter block for a kernel against a
    /// buffer's pass layout.
    fn film_convert(
        &self,
        kernel: FilmConvertKernel,
        params: &BufferParams,
    ) -> Result<FilmConvert, String> {
        let source = source_pass(kernel);
        let pass_offset = params
            .pass_offset(source)
            .ok_or_else(|| format!("render buffer has no {source:?} pass for {kernel}"))?;
        let mut kfilm = FilmConvert::new(
            pass_offset,
            params.pass_stride,
            self.num_samples,
            self.exposure,
        );
        if kernel == FilmConvertKernel::ShadowCatcherMatteWithShadow {
            kfilm.pass_offset2 = Some(params.pass_offset(PassType::ShadowCatcher).ok_or_else(
                || format!("render buffer has no ShadowCatcher pass for {kernel}"),
            )?);
        }
        Ok(kfilm)
    }

    /// Dispatches one film convert kernel over every pixel and waits for
    /// completion.
    fn run_film_convert(
        &self,
        kernel: FilmConvertKernel,
        buffers: &RenderBuffer,
        destination: &Destination,
    ) -> Result<(), String> {
        let kfilm = self.film_convert(kernel, &buffers.params)?;
        let params = &buffers.params;
        let work_size = params.width * params.height;
        // Snapshot once; the conversion is a pure function of the buffer.
        let pixels = buffers.to_vec();
        debug!("Running {kernel} over {work_size} pixels");

        let convert = |i: usize| {
            let x = i % params.width;
            let y = i / params.width;
            let base = params.pixel_index(x, y);
            let rgba =
                film_get_pass_pixel(kernel, &kfilm, &pixels[base..base + params.pass_stride]);
            (x, y, rgba)
        };

        if let Some(out) = &destination.pixels_half_rgba {
            self.queue.enqueue(
                DeviceKernel::FilmConvertHalfRgba(kernel),
                work_size,
                &|i| {
                    let (x, y, rgba) = convert(i);
                    let index = destination.offset + y * destination.stride + x;
                    // Each work item owns a distinct destination pixel.
                    unsafe { out[index].write(float4_to_half4(rgba)) };
                },
            );
        }
        if let Some(out) = &destination.pixels_float {
            self.queue.enqueue(
                DeviceKernel::FilmConvertFloat(kernel),
                work_size,
                &|i| {
                    let (x, y, rgba) = convert(i);
                    let index =
                        (destination.offset + y * destination.stride + x) * destination.num_components;
                    for c in 0..destination.num_components {
                        // Each work item owns a distinct destination pixel.
                        unsafe { out[index + c].write(rgba[c]) };
                    }
                },
            );
        }
        self.queue.synchronize();
        Ok(())
    }
}
