//! Rigid sphere treated as a single point mass.

use std::f32::consts::PI;

use tracing::debug;

use crate::boundary::Boundary;
use crate::collision::ContactParams;
use crate::error::{ensure, Result};
use crate::vector::{self, Vec3};

/// A non-rotating sphere.
#[derive(Clone, Debug, PartialEq)]
pub struct RigidSphere {
    pub(crate) position: Vec3,
    pub(crate) velocity: Vec3,
    prev_position: Vec3,
    radius: f32,
    inv_mass: f32,
}

impl RigidSphere {
    /// Create a sphere at the origin, at rest, with mass `4/3 pi r^3 density`.
    ///
    /// # Errors
    /// Returns an error unless `radius` and `density` are positive.
    pub fn new(radius: f32, density: f32) -> Result<Self> {
        ensure(radius > 0.0 && radius.is_finite(), "sphere_radius", "must be positive")?;
        ensure(density > 0.0 && density.is_finite(), "density", "must be positive")?;
        let mass = 4.0 / 3.0 * PI * radius.powi(3) * density;
        debug!(radius, mass, "Rigid sphere created");
        Ok(Self {
            position: [0.0; 3],
            velocity: [0.0; 3],
            prev_position: [0.0; 3],
            radius,
            inv_mass: 1.0 / mass,
        })
    }

    /// Centre of the sphere.
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Linear velocity.
    #[must_use]
    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    /// Radius.
    #[must_use]
    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Inverse mass.
    #[must_use]
    pub fn inv_mass(&self) -> f32 {
        self.inv_mass
    }

    /// Overwrite the velocity.
    pub fn set_velocity(&mut self, velocity: Vec3) {
        self.velocity = velocity;
    }

    /// Translate the sphere.
    pub fn move_by(&mut self, offset: Vec3) {
        vector::add_assign(&mut self.position, 0, &offset, 0, 1.0);
        vector::add_assign(&mut self.prev_position, 0, &offset, 0, 1.0);
    }

    /// Put the sphere back at the origin, at rest.
    pub fn reset(&mut self) {
        self.position = [0.0; 3];
        self.prev_position = [0.0; 3];
        self.velocity = [0.0; 3];
    }

    /// Add gravity to the velocity and advance the position (semi-implicit Euler).
    pub fn apply_states(&mut self, dt: f32, gravity: f32) {
        self.prev_position = self.position;
        self.velocity[1] -= gravity * dt;
        vector::add_assign(&mut self.position, 0, &self.velocity, 0, dt);
    }

    /// Move the centre to `target` and derive the velocity from the jump.
    pub fn grab_interact(&mut self, dt: f32, target: Vec3) {
        self.prev_position = self.position;
        self.position = target;
        vector::sub(&mut self.velocity, 0, &target, 0, &self.prev_position, 0);
        vector::scale(&mut self.velocity, 0, 1.0 / dt);
    }

    /// Bounce off the container planes: reflect approaching velocity when
    /// within the contact threshold, then push the sphere back inside.
    pub fn handle_boundaries(&mut self, boundary: &Boundary) {
        for (k, plane) in boundary.planes.iter().enumerate() {
            let gap = plane.gap(&self.position, 0) - self.radius;
            if gap < boundary.contact_threshold {
                boundary.reflect(&mut self.velocity, 0, k);
            }
            if gap < 0.0 {
                vector::add_assign(&mut self.position, 0, &plane.normal, 0, -gap);
            }
        }
    }

    /// Whether the two spheres interpenetrate.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        vector::dist(&self.position, 0, &other.position, 0) < self.radius + other.radius
    }

    /// Resolve contact with each sphere of `others`.
    pub fn handle_collision(&mut self, others: &mut [Self], contact: &ContactParams) {
        for other in others {
            self.resolve_contact(other, contact);
        }
    }

    /// Sphere-sphere contact: a restitution impulse along the unit normal
    /// when the spheres are close and approaching, then a positional
    /// correction of any overlap. Both are split by inverse mass.
    pub fn resolve_contact(&mut self, other: &mut Self, contact: &ContactParams) {
        let mut n = [0.0; 3];
        vector::sub(&mut n, 0, &other.position, 0, &self.position, 0);
        let dist = vector::normalize(&mut n, 0);
        let w = self.inv_mass + other.inv_mass;
        if dist == 0.0 || w == 0.0 {
            return;
        }
        let gap = dist - self.radius - other.radius;

        let mut rel = [0.0; 3];
        vector::sub(&mut rel, 0, &other.velocity, 0, &self.velocity, 0);
        let closing = vector::dot(&rel, 0, &n, 0);
        if gap < contact.threshold && closing < 0.0 {
            let impulse = (1.0 + contact.restitution) * closing / w;
            vector::add_assign(&mut self.velocity, 0, &n, 0, impulse * self.inv_mass);
            vector::add_assign(&mut other.velocity, 0, &n, 0, -impulse * other.inv_mass);
        }
        if gap < 0.0 {
            vector::add_assign(&mut self.position, 0, &n, 0, gap * self.inv_mass / w);
            vector::add_assign(&mut other.position, 0, &n, 0, -gap * other.inv_mass / w);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact() -> ContactParams {
        ContactParams {
            restitution: 0.1,
            threshold: 0.01,
        }
    }

    #[test]
    fn test_inverse_mass() {
        let sphere = RigidSphere::new(0.5, 2.0).unwrap();
        let mass = 4.0 / 3.0 * PI * 0.125 * 2.0;
        assert!((sphere.inv_mass() - 1.0 / mass).abs() < 1e-5);
        assert!(RigidSphere::new(0.0, 1.0).is_err());
        assert!(RigidSphere::new(1.0, -1.0).is_err());
    }

    #[test]
    fn test_falls_onto_ground() {
        let boundary = Boundary::default();
        let mut sphere = RigidSphere::new(0.5, 1.0).unwrap();
        sphere.move_by([0.0, 5.0, 0.0]);
        let dt = 0.013;
        for _ in 0..1000 {
            sphere.apply_states(dt, 10.0);
            sphere.handle_boundaries(&boundary);
            assert!(sphere.position()[1] >= 0.5 - 1e-4);
        }
        assert!(sphere.position()[1] < 0.6, "sphere settles: {:?}", sphere.position());
    }

    #[test]
    fn test_wall_reflection() {
        let boundary = Boundary::new(5.0, 0.5, 0.9, 0.01);
        let mut sphere = RigidSphere::new(0.5, 1.0).unwrap();
        sphere.move_by([4.6, 2.0, 0.0]);
        sphere.set_velocity([2.0, 0.0, 1.0]);
        sphere.handle_boundaries(&boundary);
        assert!((sphere.velocity()[0] + 1.0).abs() < 1e-6);
        assert!((sphere.velocity()[2] - 1.0).abs() < 1e-6, "no friction on spheres");
        assert!((sphere.position()[0] - 4.5).abs() < 1e-6);
    }

    #[test]
    fn test_grab_derives_velocity() {
        let mut sphere = RigidSphere::new(0.5, 1.0).unwrap();
        sphere.grab_interact(0.5, [1.0, 2.0, 0.0]);
        assert_eq!(sphere.position(), [1.0, 2.0, 0.0]);
        assert_eq!(sphere.velocity(), [2.0, 4.0, 0.0]);
    }

    #[test]
    fn test_head_on_collision_conserves_momentum() {
        let mut a = RigidSphere::new(0.5, 1.0).unwrap();
        let mut b = RigidSphere::new(0.5, 1.0).unwrap();
        a.move_by([-0.45, 1.0, 0.0]);
        b.move_by([0.45, 1.0, 0.0]);
        a.set_velocity([1.0, 0.0, 0.0]);
        b.set_velocity([-1.0, 0.0, 0.0]);

        a.handle_collision(std::slice::from_mut(&mut b), &contact());
        assert!((a.velocity()[0] + 0.1).abs() < 1e-5, "{:?}", a.velocity());
        assert!((b.velocity()[0] - 0.1).abs() < 1e-5, "{:?}", b.velocity());
        assert!(!a.overlaps(&b) || vector::dist(&a.position, 0, &b.position, 0) > 0.999);
        assert!((a.position()[0] + b.position()[0]).abs() < 1e-6);
    }

    #[test]
    fn test_separating_spheres_keep_velocity() {
        let mut a = RigidSphere::new(0.5, 1.0).unwrap();
        let mut b = RigidSphere::new(0.5, 1.0).unwrap();
        b.move_by([1.005, 0.0, 0.0]);
        a.set_velocity([-1.0, 0.0, 0.0]);
        a.resolve_contact(&mut b, &contact());
        assert_eq!(a.velocity(), [-1.0, 0.0, 0.0]);
        assert_eq!(b.velocity(), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_coincident_spheres_are_skipped() {
        let mut a = RigidSphere::new(0.5, 1.0).unwrap();
        let mut b = a.clone();
        a.resolve_contact(&mut b, &contact());
        assert!(a.position().iter().all(|c| c.is_finite()));
        assert_eq!(a.position(), b.position());
    }
}
