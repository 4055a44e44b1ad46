//! Simulated entities and the capabilities the world drives them through.

use crate::boundary::Boundary;
use crate::mesh::Spatial;
use crate::softbody::SoftBody;
use crate::sphere::RigidSphere;
use crate::vector::{self, Vec3};

/// Per-tick operations shared by every kind of entity.
pub trait Entity: Spatial {
    /// Integrate gravity and advance positions by one step of `dt`.
    fn apply_states(&mut self, dt: f32, gravity: f32);

    /// Drive vertex `vertex` (ignored by spheres) to `target`.
    fn grab_interact(&mut self, dt: f32, target: Vec3, vertex: usize);

    /// Keep the entity inside the container.
    fn handle_boundaries(&mut self, boundary: &Boundary);

    /// Recompute velocities at the end of a tick.
    fn update_velocities(&mut self, _dt: f32, _boundary: &Boundary) {}

    /// Positions to hand to a renderer, 3 floats per point.
    fn render_positions(&self) -> &[f32];
}

impl Spatial for SoftBody {
    fn translate(&mut self, by: Vec3) {
        self.move_by(by);
    }

    fn bounding_box(&self) -> (Vec3, Vec3) {
        self.positions.bounding_box()
    }
}

impl Entity for SoftBody {
    fn apply_states(&mut self, dt: f32, gravity: f32) {
        SoftBody::apply_states(self, dt, gravity);
    }

    fn grab_interact(&mut self, _dt: f32, target: Vec3, vertex: usize) {
        SoftBody::grab_interact(self, target, vertex);
    }

    fn handle_boundaries(&mut self, boundary: &Boundary) {
        SoftBody::handle_boundaries(self, boundary);
    }

    fn update_velocities(&mut self, dt: f32, boundary: &Boundary) {
        SoftBody::update_velocities(self, dt, boundary);
    }

    fn render_positions(&self) -> &[f32] {
        &self.positions
    }
}

impl Spatial for RigidSphere {
    fn translate(&mut self, by: Vec3) {
        self.move_by(by);
    }

    fn bounding_box(&self) -> (Vec3, Vec3) {
        let mut min = [0.0; 3];
        let mut max = [0.0; 3];
        let r = [self.radius(); 3];
        vector::add(&mut min, 0, &self.position, 0, &r, 0, -1.0);
        vector::add(&mut max, 0, &self.position, 0, &r, 0, 1.0);
        (min, max)
    }
}

impl Entity for RigidSphere {
    fn apply_states(&mut self, dt: f32, gravity: f32) {
        RigidSphere::apply_states(self, dt, gravity);
    }

    fn grab_interact(&mut self, dt: f32, target: Vec3, _vertex: usize) {
        RigidSphere::grab_interact(self, dt, target);
    }

    fn handle_boundaries(&mut self, boundary: &Boundary) {
        RigidSphere::handle_boundaries(self, boundary);
    }

    fn render_positions(&self) -> &[f32] {
        &self.position
    }
}

/// An entity stored in the world.
#[derive(Clone, Debug)]
pub enum Body {
    /// Deformable tetrahedral mesh.
    Soft(SoftBody),
    /// Rigid sphere.
    Rigid(RigidSphere),
}

impl Body {
    /// Short name of the body kind, for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Soft(_) => "soft",
            Self::Rigid(_) => "rigid",
        }
    }

    /// The soft body, if this is one.
    #[must_use]
    pub fn as_soft(&self) -> Option<&SoftBody> {
        match self {
            Self::Soft(soft) => Some(soft),
            Self::Rigid(_) => None,
        }
    }

    /// The soft body, if this is one.
    pub fn as_soft_mut(&mut self) -> Option<&mut SoftBody> {
        match self {
            Self::Soft(soft) => Some(soft),
            Self::Rigid(_) => None,
        }
    }

    /// The sphere, if this is one.
    #[must_use]
    pub fn as_sphere(&self) -> Option<&RigidSphere> {
        match self {
            Self::Rigid(sphere) => Some(sphere),
            Self::Soft(_) => None,
        }
    }

    /// The sphere, if this is one.
    pub fn as_sphere_mut(&mut self) -> Option<&mut RigidSphere> {
        match self {
            Self::Rigid(sphere) => Some(sphere),
            Self::Soft(_) => None,
        }
    }

    fn entity(&self) -> &dyn Entity {
        match self {
            Self::Soft(soft) => soft,
            Self::Rigid(sphere) => sphere,
        }
    }

    fn entity_mut(&mut self) -> &mut dyn Entity {
        match self {
            Self::Soft(soft) => soft,
            Self::Rigid(sphere) => sphere,
        }
    }
}

impl From<SoftBody> for Body {
    fn from(soft: SoftBody) -> Self {
        Self::Soft(soft)
    }
}

impl From<RigidSphere> for Body {
    fn from(sphere: RigidSphere) -> Self {
        Self::Rigid(sphere)
    }
}

impl Spatial for Body {
    fn translate(&mut self, by: Vec3) {
        self.entity_mut().translate(by);
    }

    fn bounding_box(&self) -> (Vec3, Vec3) {
        self.entity().bounding_box()
    }
}

impl Entity for Body {
    fn apply_states(&mut self, dt: f32, gravity: f32) {
        self.entity_mut().apply_states(dt, gravity);
    }

    fn grab_interact(&mut self, dt: f32, target: Vec3, vertex: usize) {
        self.entity_mut().grab_interact(dt, target, vertex);
    }

    fn handle_boundaries(&mut self, boundary: &Boundary) {
        self.entity_mut().handle_boundaries(boundary);
    }

    fn update_velocities(&mut self, dt: f32, boundary: &Boundary) {
        self.entity_mut().update_velocities(dt, boundary);
    }

    fn render_positions(&self) -> &[f32] {
        self.entity().render_positions()
    }
}
