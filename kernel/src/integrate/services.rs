//! Scene and shader evaluation services.
//!
//! The integrator core does not own geometry or shading graphs; ray
//! intersection, BSDF transparency and volume transmittance are supplied by
//! the host as black-box capability services behind this trait.

use crate::ray::Ray;
use crate::state::{Isect, VolumeStack};
use util::{Float, Float3};

/// Result of a closest-hit query on the main path.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ClosestHit {
    /// The ray hit a surface.
    Surface(Isect),

    /// The ray hit an emitter directly.
    Light(Isect),

    /// The ray escaped the scene.
    Miss,
}

/// Volume boundary crossing reported by a surface shader.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum VolumeEvent {
    /// The path entered the volume with this object id.
    Enter(u32),

    /// The path exited the innermost volume.
    Exit,
}

/// Continuation ray chosen by a surface shader.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum BounceRay {
    /// Regular BSDF bounce.
    Surface(Ray),

    /// BSSRDF bounce; the ray must be resolved to an exit point by the
    /// subsurface intersection kernel before shading resumes.
    Subsurface(Ray),
}

/// A next-event-estimation light sample.
#[derive(Copy, Clone, Debug)]
pub struct ShadowSample {
    /// Shadow ray toward the sampled light, bounded at the light distance.
    pub ray: Ray,

    /// Light contribution if the ray is unoccluded, already weighted by
    /// the BSDF and sampling pdf.
    pub contribution: Float3,
}

/// Everything a surface shader evaluation hands back to the integrator.
#[derive(Clone, Debug, Default)]
pub struct SurfaceSample {
    /// Emission at the hit point.
    pub emission: Float3,

    /// Optional light sample spawning a shadow sub-path.
    pub shadow: Option<ShadowSample>,

    /// Optional continuation ray.
    pub bounce: Option<BounceRay>,

    /// Throughput multiplier for the continuation ray.
    pub bounce_weight: Float3,

    /// Volume boundary crossing, if the surface is one.
    pub volume_event: Option<VolumeEvent>,
}

/// Volume evaluation over a main-path ray segment.
#[derive(Copy, Clone, Debug)]
pub struct VolumeSample {
    /// In-scattered/emitted radiance over the segment.
    pub emission: Float3,

    /// Transmittance over the segment.
    pub transmittance: Float3,
}

/// Black-box scene and shader evaluation capabilities supplied by the
/// host. Methods with default implementations cover features a scene may
/// not use (volumes, subsurface, emitters).
pub trait SceneServices: Send + Sync {
    /// Generates the camera ray for a pixel sample.
    ///
    /// * `x`      - Pixel x coordinate.
    /// * `y`      - Pixel y coordinate.
    /// * `sample` - Sample index within the pixel.
    fn camera_ray(&self, x: u32, y: u32, sample: u32) -> Ray;

    /// Closest-hit intersection query for the main path.
    ///
    /// * `ray` - The ray.
    fn intersect_closest(&self, ray: &Ray) -> ClosestHit;

    /// Transparent-shadow intersection query. Records up to
    /// `isects.len()` hits ordered nearest-first by `t` and returns the
    /// total number of intersections found, which may exceed the recorded
    /// count.
    ///
    /// * `ray`    - The shadow ray.
    /// * `isects` - Recorded-hit storage to fill.
    fn intersect_shadow(&self, ray: &Ray, isects: &mut [Isect]) -> u32;

    /// Evaluates the surface shader at a hit: emission, light sample,
    /// continuation.
    ///
    /// * `ray`    - The incoming ray.
    /// * `isect`  - The hit.
    /// * `bounce` - Current bounce count of the path.
    fn shade_surface(&self, ray: &Ray, isect: &Isect, bounce: u32) -> SurfaceSample;

    /// Transparency of a surface crossed by a shadow ray. An exact zero
    /// vector means fully opaque.
    ///
    /// * `ray`   - The shadow ray.
    /// * `isect` - The recorded hit.
    fn surface_transparency(&self, ray: &Ray, isect: &Isect) -> Float3;

    /// Volumes enclosing the camera, used to seed the path's volume stack.
    fn camera_volume_stack(&self) -> VolumeStack {
        VolumeStack::new()
    }

    /// Background radiance for an escaped ray.
    ///
    /// * `ray` - The escaped ray.
    fn background(&self, ray: &Ray) -> Float3 {
        let _ = ray;
        Float3::zero()
    }

    /// Emitter radiance for a direct light hit.
    ///
    /// * `ray`   - The ray.
    /// * `isect` - The hit on the emitter.
    fn light_radiance(&self, ray: &Ray, isect: &Isect) -> Float3 {
        let _ = (ray, isect);
        Float3::zero()
    }

    /// Subsurface exit-point query for a BSSRDF bounce.
    ///
    /// * `ray` - The subsurface ray.
    fn intersect_subsurface(&self, ray: &Ray) -> Isect {
        let _ = ray;
        Isect::default()
    }

    /// Volume emission and transmittance over `[0, t]` of a main-path ray.
    ///
    /// * `ray`   - The ray.
    /// * `t`     - Segment end.
    /// * `stack` - Volumes enclosing the segment.
    fn shade_volume(&self, ray: &Ray, t: Float, stack: &VolumeStack) -> VolumeSample {
        let _ = (ray, t, stack);
        VolumeSample {
            emission: Float3::zero(),
            transmittance: Float3::one(),
        }
    }

    /// Heterogeneous transmittance of the stacked volumes over
    /// `[start_t, end_t]` of a shadow ray.
    ///
    /// * `ray`     - The shadow ray.
    /// * `start_t` - Segment start.
    /// * `end_t`   - Segment end.
    /// * `stack`   - Volumes enclosing the segment.
    fn volume_transmittance(
        &self,
        ray: &Ray,
        start_t: Float,
        end_t: Float,
        stack: &VolumeStack,
    ) -> Float3 {
        let _ = (ray, start_t, end_t, stack);
        Float3::one()
    }
}
