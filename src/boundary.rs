//! World container: a ground plane and four vertical walls.

use serde::{Deserialize, Serialize};

use crate::vector::{self, Vec3};

/// Number of planes bounding the world.
pub const PLANE_COUNT: usize = 5;

/// A half-space given by a point on its plane and an inward-facing unit normal.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    /// Point on the plane.
    pub point: Vec3,
    /// Unit normal pointing into the allowed region.
    pub normal: Vec3,
}

impl Plane {
    /// Signed distance of triple `i` of `positions` along the normal.
    /// Negative values are outside the allowed region.
    #[inline]
    #[must_use]
    pub fn gap(&self, positions: &[f32], i: usize) -> f32 {
        let mut d = [0.0; 3];
        vector::sub(&mut d, 0, positions, i, &self.point, 0);
        vector::dot(&d, 0, &self.normal, 0)
    }
}

/// Box-shaped container shared read-only by every body, together with the
/// velocity response applied on contact.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Boundary {
    /// Ground, +x wall, -x wall, +z wall, -z wall.
    pub planes: [Plane; PLANE_COUNT],
    /// Normal restitution on contact, in `[0, 1]`.
    pub restitution: f32,
    /// Fraction of tangential velocity removed on contact, in `[0, 1]`.
    pub friction: f32,
    /// Gap below which a point counts as touching a plane.
    pub contact_threshold: f32,
}

impl Boundary {
    /// Container with the ground at `y = 0` and walls at `x = ±bound`, `z = ±bound`.
    #[must_use]
    pub fn new(bound: f32, restitution: f32, friction: f32, contact_threshold: f32) -> Self {
        let plane = |point: Vec3, normal: Vec3| Plane { point, normal };
        Self {
            planes: [
                plane([0.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
                plane([bound, 0.0, 0.0], [-1.0, 0.0, 0.0]),
                plane([-bound, 0.0, 0.0], [1.0, 0.0, 0.0]),
                plane([0.0, 0.0, bound], [0.0, 0.0, -1.0]),
                plane([0.0, 0.0, -bound], [0.0, 0.0, 1.0]),
            ],
            restitution,
            friction,
            contact_threshold,
        }
    }

    /// Reflect the normal component of velocity triple `i` against plane `k`
    /// when it approaches the plane: `v' = v - (1 + e)(v . n) n`.
    pub fn reflect(&self, velocities: &mut [f32], i: usize, k: usize) {
        let n = &self.planes[k].normal;
        let vn = vector::dot(velocities, i, n, 0);
        if vn < 0.0 {
            vector::add_assign(velocities, i, n, 0, -(1.0 + self.restitution) * vn);
        }
    }

    /// Apply the contact response to velocity triple `i` against plane `k`:
    /// [`reflect`](Self::reflect), then damp the tangential component by
    /// friction.
    pub fn respond(&self, velocities: &mut [f32], i: usize, k: usize) {
        self.reflect(velocities, i, k);
        let n = &self.planes[k].normal;
        let vn = vector::dot(velocities, i, n, 0);
        let mut tangent = [0.0; 3];
        vector::add(&mut tangent, 0, velocities, i, n, 0, -vn);
        vector::add_assign(velocities, i, &tangent, 0, -self.friction);
    }
}

impl Default for Boundary {
    fn default() -> Self {
        Self::new(5.0, 0.5, 0.9, 0.01)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gap_sign() {
        let boundary = Boundary::default();
        let inside = [0.0, 1.0, 0.0];
        let below = [0.0, -0.5, 0.0];
        let outside_x = [6.0, 1.0, 0.0];
        assert!((boundary.planes[0].gap(&inside, 0) - 1.0).abs() < 1e-6);
        assert!((boundary.planes[0].gap(&below, 0) + 0.5).abs() < 1e-6);
        assert!((boundary.planes[1].gap(&outside_x, 0) + 1.0).abs() < 1e-6);
        assert!(boundary.planes[2].gap(&outside_x, 0) > 0.0);
    }

    #[test]
    fn test_respond_reflects_and_damps() {
        let boundary = Boundary::new(5.0, 0.5, 0.5, 0.01);
        let mut v = [2.0, -4.0, 0.0];
        boundary.respond(&mut v, 0, 0);
        assert!((v[1] - 2.0).abs() < 1e-6, "normal component reflected: {v:?}");
        assert!((v[0] - 1.0).abs() < 1e-6, "tangential component damped: {v:?}");
    }

    #[test]
    fn test_respond_keeps_separating_normal_velocity() {
        let boundary = Boundary::new(5.0, 0.5, 0.0, 0.01);
        let mut v = [0.0, 3.0, 0.0];
        boundary.respond(&mut v, 0, 0);
        assert_eq!(v, [0.0, 3.0, 0.0]);
    }
}
