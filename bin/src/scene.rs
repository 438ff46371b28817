//! Built-in demonstration scene.
//!
//! An analytic scene exercising the integrator without a geometry kernel:
//! a checkered ground plane and a diffuse sphere lit by a distant light,
//! with a tinted transparent sphere casting a colored shadow. Intersection
//! and shading are closed-form, so renders are deterministic for a given
//! pixel sample.

use kernel::integrate::{
    BounceRay, ClosestHit, SceneServices, ShadowSample, SurfaceSample,
};
use kernel::{ray_offset, Isect, Ray};
use util::{Float, Float3};

const GROUND: u32 = 0;
const GLASS_SPHERE: u32 = 1;
const DIFFUSE_SPHERE: u32 = 2;

/// Vertical field of view in degrees.
const FOV: Float = 40.0;

/// Minimum ray parameter accepted as a hit, avoiding self-intersection.
const T_MIN: Float = 1e-3;

/// Extent given to secondary rays.
const T_FAR: Float = 1e4;

pub struct DemoScene {
    width: u32,
    height: u32,
    eye: Float3,
    light_dir: Float3,
    light_color: Float3,
    glass_center: Float3,
    glass_tint: Float3,
    diffuse_center: Float3,
}

impl DemoScene {
    /// Create the scene for an image of the given dimensions.
    ///
    /// * `width`  - Image width in pixels.
    /// * `height` - Image height in pixels.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            eye: Float3::new(0.0, 1.0, -4.0),
            light_dir: Float3::new(-0.4, 1.0, -0.35).normalize(),
            light_color: Float3::new(2.4, 2.3, 2.1),
            glass_center: Float3::new(-0.9, 0.75, 0.4),
            glass_tint: Float3::new(0.95, 0.55, 0.55),
            diffuse_center: Float3::new(0.9, 0.75, 0.2),
        }
    }

    fn albedo(&self, object: u32, p: Float3) -> Float3 {
        match object {
            GROUND => {
                let parity = (p.x.floor() + p.z.floor()) as i64 & 1;
                if parity == 0 {
                    Float3::new(0.75, 0.75, 0.75)
                } else {
                    Float3::new(0.25, 0.25, 0.25)
                }
            }
            DIFFUSE_SPHERE => Float3::new(0.3, 0.45, 0.8),
            _ => Float3::zero(),
        }
    }

    fn normal(&self, object: u32, p: Float3) -> Float3 {
        match object {
            DIFFUSE_SPHERE => (p - self.diffuse_center).normalize(),
            GLASS_SPHERE => (p - self.glass_center).normalize(),
            _ => Float3::new(0.0, 1.0, 0.0),
        }
    }
}

/// Both sphere intersection roots, unordered validity; callers filter by
/// range.
fn sphere_roots(ray: &Ray, center: Float3, radius: Float) -> Option<(Float, Float)> {
    let oc = ray.p - center;
    let b = oc.dot(&ray.d);
    let c = oc.dot(&oc) - radius * radius;
    let disc = b * b - c;
    if disc <= 0.0 {
        return None;
    }
    let s = disc.sqrt();
    Some((-b - s, -b + s))
}

/// Ground plane crossing at y = 0.
fn plane_t(ray: &Ray) -> Option<Float> {
    if ray.d.y.abs() < 1e-8 {
        return None;
    }
    let t = -ray.p.y / ray.d.y;
    (t > 0.0).then_some(t)
}

/// Low-bias integer hash giving a per-sample subpixel jitter.
fn jitter(x: u32, y: u32, sample: u32) -> (Float, Float) {
    let mut h = x
        .wrapping_mul(73856093)
        .wrapping_add(y.wrapping_mul(19349663))
        .wrapping_add(sample.wrapping_mul(83492791));
    h ^= h >> 13;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 16;
    let jx = (h & 0xffff) as Float / 65536.0;
    let jy = (h >> 16) as Float / 65536.0;
    (jx, jy)
}

impl SceneServices for DemoScene {
    fn camera_ray(&self, x: u32, y: u32, sample: u32) -> Ray {
        let (jx, jy) = jitter(x, y, sample);
        let aspect = self.width as Float / self.height as Float;
        let tan_half = (FOV.to_radians() * 0.5).tan();

        let sx = ((x as Float + jx) / self.width as Float * 2.0 - 1.0) * aspect * tan_half;
        let sy = (1.0 - (y as Float + jy) / self.height as Float * 2.0) * tan_half;
        let d = Float3::new(sx, sy, 1.0).normalize();
        Ray::new(self.eye, d, T_FAR)
    }

    fn intersect_closest(&self, ray: &Ray) -> ClosestHit {
        let mut closest: Option<(Float, u32)> = None;
        let mut consider = |t: Float, object: u32| {
            if t > T_MIN && t < ray.t && closest.map_or(true, |(ct, _)| t < ct) {
                closest = Some((t, object));
            }
        };

        if let Some(t) = plane_t(ray) {
            consider(t, GROUND);
        }
        if let Some((t0, t1)) = sphere_roots(ray, self.glass_center, 0.75) {
            consider(t0, GLASS_SPHERE);
            consider(t1, GLASS_SPHERE);
        }
        if let Some((t0, t1)) = sphere_roots(ray, self.diffuse_center, 0.75) {
            consider(t0, DIFFUSE_SPHERE);
            consider(t1, DIFFUSE_SPHERE);
        }

        match closest {
            Some((t, object)) => ClosestHit::Surface(Isect { t, object, prim: 0 }),
            None => ClosestHit::Miss,
        }
    }

    fn intersect_shadow(&self, ray: &Ray, isects: &mut [Isect]) -> u32 {
        let mut hits: Vec<(Float, u32)> = Vec::new();
        let mut consider = |t: Float, object: u32| {
            if t > T_MIN && t < ray.t {
                hits.push((t, object));
            }
        };

        if let Some(t) = plane_t(ray) {
            consider(t, GROUND);
        }
        if let Some((t0, t1)) = sphere_roots(ray, self.glass_center, 0.75) {
            consider(t0, GLASS_SPHERE);
            consider(t1, GLASS_SPHERE);
        }
        if let Some((t0, t1)) = sphere_roots(ray, self.diffuse_center, 0.75) {
            consider(t0, DIFFUSE_SPHERE);
            consider(t1, DIFFUSE_SPHERE);
        }

        hits.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
        for (slot, (t, object)) in isects.iter_mut().zip(&hits) {
            *slot = Isect {
                t: *t,
                object: *object,
                prim: 0,
            };
        }
        hits.len() as u32
    }

    fn shade_surface(&self, ray: &Ray, isect: &Isect, _bounce: u32) -> SurfaceSample {
        let p = ray.at(isect.t);

        if isect.object == GLASS_SPHERE {
            // Straight transmission; the tint applies once per boundary
            // crossing.
            return SurfaceSample {
                bounce: Some(BounceRay::Surface(Ray::new(
                    ray_offset(p, ray.d),
                    ray.d,
                    T_FAR,
                ))),
                bounce_weight: self.glass_tint,
                ..SurfaceSample::default()
            };
        }

        let n = self.normal(isect.object, p);
        let cos = n.dot(&self.light_dir);
        let shadow = (cos > 0.0).then(|| ShadowSample {
            ray: Ray::new(ray_offset(p, n), self.light_dir, T_FAR),
            contribution: self.albedo(isect.object, p) * self.light_color * cos,
        });

        SurfaceSample {
            shadow,
            ..SurfaceSample::default()
        }
    }

    fn surface_transparency(&self, _ray: &Ray, isect: &Isect) -> Float3 {
        if isect.object == GLASS_SPHERE {
            self.glass_tint
        } else {
            Float3::zero()
        }
    }

    fn background(&self, ray: &Ray) -> Float3 {
        let t = util::clamp(0.5 * (ray.d.y + 1.0), 0.0, 1.0);
        Float3::new(1.0, 1.0, 1.0) * (1.0 - t) + Float3::new(0.35, 0.55, 0.95) * t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_rays_stay_inside_frustum() {
        let scene = DemoScene::new(64, 64);
        let center = scene.camera_ray(32, 32, 0);
        let corner = scene.camera_ray(0, 0, 0);
        assert!(center.d.z > corner.d.z);
        assert!(corner.d.x < 0.0 && corner.d.y > 0.0);
    }

    #[test]
    fn glass_sphere_records_two_shadow_hits() {
        let scene = DemoScene::new(64, 64);
        let ray = Ray::new(
            scene.glass_center - Float3::new(0.0, 0.0, 5.0),
            Float3::new(0.0, 0.0, 1.0),
            100.0,
        );
        let mut isects = [Isect::default(); 4];
        let num_hits = scene.intersect_shadow(&ray, &mut isects);
        assert_eq!(num_hits, 2);
        assert!(isects[0].t < isects[1].t);
        assert_eq!(isects[0].object, GLASS_SPHERE);
        assert!(!scene.surface_transparency(&ray, &isects[0]).is_zero());
    }

    #[test]
    fn ground_is_opaque_to_shadow_rays() {
        let scene = DemoScene::new(64, 64);
        let ray = Ray::new(
            Float3::new(5.0, 1.0, 5.0),
            Float3::new(0.0, -1.0, 0.0),
            100.0,
        );
        let mut isects = [Isect::default(); 4];
        assert_eq!(scene.intersect_shadow(&ray, &mut isects), 1);
        assert!(scene.surface_transparency(&ray, &isects[0]).is_zero());
    }
}
