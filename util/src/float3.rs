//! 3-component float vectors.

use crate::math::Float;
use std::ops::{Add, AddAssign, Div, Index, Mul, MulAssign, Neg, Sub};

/// A 3-component single-precision vector used for positions, directions and
/// RGB throughput values.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Float3 {
    /// X-coordinate / red channel.
    pub x: Float,

    /// Y-coordinate / green channel.
    pub y: Float,

    /// Z-coordinate / blue channel.
    pub z: Float,
}

impl Float3 {
    /// Creates a new vector.
    ///
    /// * `x` - X-coordinate.
    /// * `y` - Y-coordinate.
    /// * `z` - Z-coordinate.
    pub const fn new(x: Float, y: Float, z: Float) -> Self {
        Self { x, y, z }
    }

    /// Creates a zero vector.
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Creates a vector with all components set to one.
    pub const fn one() -> Self {
        Self::new(1.0, 1.0, 1.0)
    }

    /// Creates a vector with all components set to `v`.
    ///
    /// * `v` - The value.
    pub const fn splat(v: Float) -> Self {
        Self::new(v, v, v)
    }

    /// Returns true if every component is exactly zero. Throughput
    /// termination checks use this exact comparison, matching how the
    /// accumulation buffer interprets full occlusion.
    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }

    /// Returns true if any component is NaN.
    pub fn has_nans(&self) -> bool {
        self.x.is_nan() || self.y.is_nan() || self.z.is_nan()
    }

    /// Returns the dot product with another vector.
    ///
    /// * `other` - The other vector.
    pub fn dot(&self, other: &Self) -> Float {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Returns the vector length.
    pub fn length(&self) -> Float {
        self.dot(self).sqrt()
    }

    /// Returns a unit vector in the same direction.
    pub fn normalize(&self) -> Self {
        *self / self.length()
    }

    /// Returns the average of the 3 components.
    pub fn average(&self) -> Float {
        (self.x + self.y + self.z) * (1.0 / 3.0)
    }
}

impl Add for Float3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Float3 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Float3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul for Float3 {
    type Output = Self;

    /// Component-wise product; used for throughput attenuation.
    fn mul(self, rhs: Self) -> Self {
        Self::new(self.x * rhs.x, self.y * rhs.y, self.z * rhs.z)
    }
}

impl MulAssign for Float3 {
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

impl Mul<Float> for Float3 {
    type Output = Self;

    fn mul(self, rhs: Float) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Mul<Float3> for Float {
    type Output = Float3;

    fn mul(self, rhs: Float3) -> Float3 {
        rhs * self
    }
}

impl Div<Float> for Float3 {
    type Output = Self;

    fn div(self, rhs: Float) -> Self {
        debug_assert!(rhs != 0.0);
        let inv = 1.0 / rhs;
        self * inv
    }
}

impl Neg for Float3 {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl Index<usize> for Float3 {
    type Output = Float;

    /// Indexes the components in x, y, z order.
    ///
    /// * `index` - The component index in [0, 2].
    fn index(&self, index: usize) -> &Float {
        match index {
            0 => &self.x,
            1 => &self.y,
            2 => &self.z,
            _ => panic!("Invalid index {index} for Float3"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    #[test]
    fn zero_and_one() {
        assert!(Float3::zero().is_zero());
        assert!(!Float3::one().is_zero());
        assert!(!Float3::new(0.0, 1e-30, 0.0).is_zero());
    }

    #[test]
    fn component_wise_mul() {
        let a = Float3::new(0.5, 2.0, 0.0);
        let b = Float3::new(4.0, 0.25, 7.0);
        assert_eq!(a * b, Float3::new(2.0, 0.5, 0.0));
    }

    #[test]
    fn scalar_ops() {
        let v = Float3::new(1.0, 2.0, 3.0);
        assert_eq!(v * 2.0, Float3::new(2.0, 4.0, 6.0));
        assert_eq!(2.0 * v, v * 2.0);
        assert_eq!(-v, Float3::new(-1.0, -2.0, -3.0));
    }

    #[test]
    fn normalize_unit_length() {
        let v = Float3::new(3.0, 4.0, 12.0).normalize();
        assert!(approx_eq!(f32, v.length(), 1.0, ulps = 4));
    }

    #[test]
    fn has_nans() {
        assert!(!Float3::zero().has_nans());
        assert!(Float3::new(f32::NAN, 0.0, 0.0).has_nans());
    }
}
