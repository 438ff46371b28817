//! Rays.

use util::{Float, Float3, RAY_OFFSET_EPSILON};

/// A ray with a bounded extent.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Ray {
    /// Origin.
    pub p: Float3,

    /// Direction (unit length).
    pub d: Float3,

    /// Maximum ray parameter; intersections beyond this distance are
    /// ignored.
    pub t: Float,
}

impl Ray {
    /// Create a new ray.
    ///
    /// * `p` - Origin.
    /// * `d` - Direction.
    /// * `t` - Maximum ray parameter.
    pub fn new(p: Float3, d: Float3, t: Float) -> Self {
        Self { p, d, t }
    }

    /// Returns the point at parameter `t` along the ray.
    ///
    /// * `t` - The ray parameter.
    pub fn at(&self, t: Float) -> Float3 {
        self.p + self.d * t
    }
}

impl Default for Ray {
    fn default() -> Self {
        Self {
            p: Float3::zero(),
            d: Float3::new(0.0, 0.0, 1.0),
            t: 0.0,
        }
    }
}

/// Nudges a point along a direction so that a ray restarted from it does
/// not re-intersect the surface it sits on.
///
/// * `p` - The point on the surface.
/// * `d` - The direction the new ray will travel.
pub fn ray_offset(p: Float3, d: Float3) -> Float3 {
    p + d * RAY_OFFSET_EPSILON
}
