//! Render buffer and film accumulation.

use crate::state::PathState;
use crate::types::PassType;
use util::{AtomicFloat, Float, Float3};

mod convert;

// Re-export.
pub use convert::*;

/// Geometry and pass layout of a render buffer.
#[derive(Clone, Debug, Default)]
pub struct BufferParams {
    /// Image width in pixels.
    pub width: usize,

    /// Image height in pixels.
    pub height: usize,

    /// Pixel index offset of this buffer within the full image.
    pub offset: usize,

    /// Row stride in pixels.
    pub stride: usize,

    /// Number of float channels per pixel.
    pub pass_stride: usize,

    /// Channel offset of each pass present in the buffer.
    passes: Vec<(PassType, usize)>,
}

impl BufferParams {
    /// Create parameters for a full-frame buffer with no passes yet.
    ///
    /// * `width`  - Image width in pixels.
    /// * `height` - Image height in pixels.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            offset: 0,
            stride: width,
            pass_stride: 0,
            passes: Vec::new(),
        }
    }

    /// Appends a pass to the buffer layout, returning its channel offset.
    ///
    /// * `pass` - The pass type.
    pub fn add_pass(&mut self, pass: PassType) -> usize {
        let offset = self.pass_stride;
        self.passes.push((pass, offset));
        self.pass_stride += pass.num_channels();
        offset
    }

    /// Returns the channel offset of a pass, if present.
    ///
    /// * `pass` - The pass type.
    pub fn pass_offset(&self, pass: PassType) -> Option<usize> {
        self.passes
            .iter()
            .find(|(p, _)| *p == pass)
            .map(|(_, offset)| *offset)
    }

    /// Returns the index of a pixel's first channel in the flat buffer.
    ///
    /// * `x` - Pixel x coordinate.
    /// * `y` - Pixel y coordinate.
    pub fn pixel_index(&self, x: usize, y: usize) -> usize {
        (self.offset + y * self.stride + x) * self.pass_stride
    }

    /// Total number of float channels backing the buffer. Covers every
    /// pixel addressable through [`Self::pixel_index`], including the
    /// window's offset and stride placement within the full image.
    pub fn num_channels(&self) -> usize {
        (self.offset + self.height * self.stride) * self.pass_stride
    }
}

/// Dense per-pixel accumulation buffer. Multiple in-flight paths may target
/// the same pixel, so every channel is an [`AtomicFloat`] and accumulation
/// is an atomic add; there is no higher-level locking.
pub struct RenderBuffer {
    /// Buffer geometry and pass layout.
    pub params: BufferParams,

    data: Vec<AtomicFloat>,
}

impl RenderBuffer {
    /// Create a zeroed render buffer.
    ///
    /// * `params` - Buffer geometry and pass layout.
    pub fn new(params: BufferParams) -> Self {
        let data = (0..params.num_channels())
            .map(|_| AtomicFloat::default())
            .collect();
        Self { params, data }
    }

    /// Atomically adds a value into one channel.
    ///
    /// * `index` - Flat channel index.
    /// * `v`     - The value to add.
    pub fn accum(&self, index: usize, v: Float) {
        self.data[index].fetch_add(v);
    }

    /// Reads one channel.
    ///
    /// * `index` - Flat channel index.
    pub fn get(&self, index: usize) -> Float {
        self.data[index].load()
    }

    /// Overwrites one channel. Intended for host-side buffer setup; paths
    /// only ever accumulate.
    ///
    /// * `index` - Flat channel index.
    /// * `v`     - The value.
    pub fn set(&self, index: usize, v: Float) {
        self.data[index].store(v);
    }

    /// Returns a plain snapshot of the whole buffer.
    pub fn to_vec(&self) -> Vec<Float> {
        self.data.iter().map(|c| c.load()).collect()
    }
}

/// Atomically adds an RGB contribution into a pixel of a color pass.
///
/// * `buffer`      - The render buffer.
/// * `pass_offset` - Channel offset of the pass.
/// * `x`           - Pixel x coordinate.
/// * `y`           - Pixel y coordinate.
/// * `value`       - The RGB contribution.
pub fn accum_rgb(buffer: &RenderBuffer, pass_offset: usize, x: usize, y: usize, value: Float3) {
    let index = buffer.params.pixel_index(x, y) + pass_offset;
    buffer.accum(index, value.x);
    buffer.accum(index + 1, value.y);
    buffer.accum(index + 2, value.z);
}

/// Accumulates a main-path radiance contribution into the combined pass.
///
/// * `state`  - The path owning the contribution.
/// * `buffer` - The render buffer.
/// * `value`  - Radiance already weighted by the path throughput.
pub fn accum_radiance<const N: usize>(
    state: &PathState<N>,
    buffer: &RenderBuffer,
    value: Float3,
) {
    if let Some(offset) = buffer.params.pass_offset(PassType::Combined) {
        accum_rgb(buffer, offset, state.x as usize, state.y as usize, value);
    }
}

/// Accumulates one camera sample into the combined pass alpha channel.
/// Called once per path at init so alpha counts samples regardless of how
/// the path terminates.
///
/// * `state`  - The path.
/// * `buffer` - The render buffer.
pub fn accum_sample_alpha<const N: usize>(state: &PathState<N>, buffer: &RenderBuffer) {
    if let Some(offset) = buffer.params.pass_offset(PassType::Combined) {
        let index = buffer
            .params
            .pixel_index(state.x as usize, state.y as usize)
            + offset
            + 3;
        buffer.accum(index, 1.0);
    }
}

/// Accumulates the surviving shadow sub-path light contribution into the
/// combined pass.
///
/// * `state`  - The path whose shadow sub-path completed.
/// * `buffer` - The render buffer.
pub fn accum_light<const N: usize>(state: &PathState<N>, buffer: &RenderBuffer) {
    if let Some(offset) = buffer.params.pass_offset(PassType::Combined) {
        accum_rgb(
            buffer,
            offset,
            state.x as usize,
            state.y as usize,
            state.shadow.throughput,
        );
    }
}
