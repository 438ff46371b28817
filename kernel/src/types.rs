//! Kernel and pass identifiers shared between host and device code.

use std::fmt;

/// Number of integrator kernel stages (and queue counter slots).
pub const NUM_INTEGRATOR_KERNELS: usize = 10;

/// The integrator kernel stages. A path's queued-kernel tag holds one of
/// these while the path is live; `None` means terminated.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum IntegratorKernel {
    /// Generate the camera ray and enqueue the first intersection.
    InitFromCamera = 0,

    /// Closest-hit intersection for the main path.
    IntersectClosest,

    /// Bounded transparent-shadow intersection for the shadow sub-path.
    IntersectShadow,

    /// Subsurface exit-point intersection.
    IntersectSubsurface,

    /// Accumulate background radiance for an escaped ray.
    ShadeBackground,

    /// Accumulate emitter radiance for a direct light hit.
    ShadeLight,

    /// Consume recorded shadow intersections and accumulate light.
    ShadeShadow,

    /// Evaluate the surface shader, spawn shadow and bounce rays.
    ShadeSurface,

    /// Evaluate volume emission and transmittance on the main path.
    ShadeVolume,

    /// Run a whole path to completion in one invocation.
    Megakernel,
}

impl IntegratorKernel {
    /// All kernel stages in counter-slot order.
    pub const ALL: [IntegratorKernel; NUM_INTEGRATOR_KERNELS] = [
        IntegratorKernel::InitFromCamera,
        IntegratorKernel::IntersectClosest,
        IntegratorKernel::IntersectShadow,
        IntegratorKernel::IntersectSubsurface,
        IntegratorKernel::ShadeBackground,
        IntegratorKernel::ShadeLight,
        IntegratorKernel::ShadeShadow,
        IntegratorKernel::ShadeSurface,
        IntegratorKernel::ShadeVolume,
        IntegratorKernel::Megakernel,
    ];

    /// Returns the queue counter slot for this kernel.
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for IntegratorKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IntegratorKernel::InitFromCamera => "integrator_init_from_camera",
            IntegratorKernel::IntersectClosest => "integrator_intersect_closest",
            IntegratorKernel::IntersectShadow => "integrator_intersect_shadow",
            IntegratorKernel::IntersectSubsurface => "integrator_intersect_subsurface",
            IntegratorKernel::ShadeBackground => "integrator_shade_background",
            IntegratorKernel::ShadeLight => "integrator_shade_light",
            IntegratorKernel::ShadeShadow => "integrator_shade_shadow",
            IntegratorKernel::ShadeSurface => "integrator_shade_surface",
            IntegratorKernel::ShadeVolume => "integrator_shade_volume",
            IntegratorKernel::Megakernel => "integrator_megakernel",
        };
        write!(f, "{name}")
    }
}

/// Film convert kernel kinds, one per semantic pass conversion.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FilmConvertKernel {
    Depth,
    Mist,
    SampleCount,
    Float,
    Float3,
    Motion,
    Cryptomatte,
    ShadowCatcher,
    ShadowCatcherMatteWithShadow,
    Combined,
    Float4,
}

impl fmt::Display for FilmConvertKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FilmConvertKernel::Depth => "film_convert_depth",
            FilmConvertKernel::Mist => "film_convert_mist",
            FilmConvertKernel::SampleCount => "film_convert_sample_count",
            FilmConvertKernel::Float => "film_convert_float",
            FilmConvertKernel::Float3 => "film_convert_float3",
            FilmConvertKernel::Motion => "film_convert_motion",
            FilmConvertKernel::Cryptomatte => "film_convert_cryptomatte",
            FilmConvertKernel::ShadowCatcher => "film_convert_shadow_catcher",
            FilmConvertKernel::ShadowCatcherMatteWithShadow => {
                "film_convert_shadow_catcher_matte_with_shadow"
            }
            FilmConvertKernel::Combined => "film_convert_combined",
            FilmConvertKernel::Float4 => "film_convert_float4",
        };
        write!(f, "{name}")
    }
}

/// Identifier for any kernel a device queue can dispatch.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DeviceKernel {
    /// One of the integrator stages.
    Integrator(IntegratorKernel),

    /// A film convert kernel writing a half-precision RGBA destination.
    FilmConvertHalfRgba(FilmConvertKernel),

    /// A film convert kernel writing a float destination.
    FilmConvertFloat(FilmConvertKernel),
}

impl fmt::Display for DeviceKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKernel::Integrator(k) => write!(f, "{k}"),
            DeviceKernel::FilmConvertHalfRgba(k) => write!(f, "{k}_half_rgba"),
            DeviceKernel::FilmConvertFloat(k) => write!(f, "{k}_float"),
        }
    }
}

/// The semantic output channels a render buffer can carry.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PassType {
    /// Accumulated RGB radiance plus sample-count alpha.
    Combined,

    /// Distance to the first hit.
    Depth,

    /// Mist/fog factor.
    Mist,

    /// Number of samples accumulated into the pixel.
    SampleCount,

    /// Motion vectors (two 2-D vectors).
    Motion,

    /// Cryptomatte id/weight pairs.
    Cryptomatte,

    /// Shadow-catcher radiance.
    ShadowCatcher,

    /// Matte object radiance composited with catcher shadow.
    ShadowCatcherMatte,

    /// Generic scalar pass.
    Float,

    /// Generic 3-channel pass.
    Float3,

    /// Generic 4-channel pass.
    Float4,
}

impl PassType {
    /// Returns the number of float channels this pass occupies in the
    /// render buffer.
    pub fn num_channels(self) -> usize {
        match self {
            PassType::Depth | PassType::Mist | PassType::SampleCount | PassType::Float => 1,
            PassType::ShadowCatcher | PassType::Float3 => 3,
            PassType::Combined
            | PassType::Motion
            | PassType::Cryptomatte
            | PassType::ShadowCatcherMatte
            | PassType::Float4 => 4,
        }
    }
}

/// Scene-independent integrator parameters, fixed for a render session.
#[derive(Copy, Clone, Debug)]
pub struct RenderParams {
    /// Image width in pixels.
    pub width: u32,

    /// Image height in pixels.
    pub height: u32,

    /// Samples per pixel.
    pub num_samples: u32,

    /// Maximum number of main-path bounces.
    pub max_bounce: u32,

    /// Maximum number of transparent bounces a shadow ray may take before
    /// remaining surfaces are treated as opaque.
    pub max_transparent_bounce: u32,
}

impl Default for RenderParams {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            num_samples: 1,
            max_bounce: 8,
            max_transparent_bounce: 32,
        }
    }
}
