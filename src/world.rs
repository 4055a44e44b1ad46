//! Simulation parameters and the world that owns every body.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::body::{Body, Entity};
use crate::boundary::Boundary;
use crate::collision::{check_collision, solve_collision, ContactParams};
use crate::error::{ensure, Error, Result};
use crate::mesh::{Spatial, TetMesh};
use crate::softbody::SoftBody;
use crate::sphere::RigidSphere;
use crate::vector::Vec3;

/// Tunable simulation parameters.
///
/// Every field has a default, so a partial JSON document is a valid
/// configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimParams {
    /// Constraint iterations per tick.
    pub num_substeps: usize,
    /// Tick length in milliseconds.
    pub time_step_ms: f32,
    /// Downward acceleration.
    pub gravity: f32,
    /// Edge compliance; 0 is inextensible.
    pub inv_stiffness: f32,
    /// Volume compliance; 0 is incompressible.
    pub volume_compliance: f32,
    /// Whether bodies collide with each other.
    pub collision_check: bool,
    /// Radius of new spheres.
    pub sphere_radius: f32,
    /// Density of new spheres.
    pub density: f32,
    /// Half extent of the container walls.
    pub bound: f32,
    /// Cell size of the soft-body spatial hashes.
    pub hash_spacing: f32,
    /// Bucket count of the soft-body spatial hashes.
    pub hash_table_size: usize,
    /// Restitution against the container.
    pub boundary_restitution: f32,
    /// Tangential damping of soft-body vertices touching the container.
    pub boundary_friction: f32,
    /// Restitution between spheres.
    pub contact_restitution: f32,
    /// Gap below which contacts respond.
    pub contact_threshold: f32,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            num_substeps: 10,
            time_step_ms: 13.0,
            gravity: 10.0,
            inv_stiffness: 0.0,
            volume_compliance: 0.0,
            collision_check: true,
            sphere_radius: 0.5,
            density: 1.0,
            bound: 5.0,
            hash_spacing: 0.05,
            hash_table_size: 5000,
            boundary_restitution: 0.5,
            boundary_friction: 0.9,
            contact_restitution: 0.1,
            contact_threshold: 0.01,
        }
    }
}

impl SimParams {
    /// Set the number of substeps.
    #[must_use]
    pub fn with_substeps(mut self, num_substeps: usize) -> Self {
        self.num_substeps = num_substeps;
        self
    }

    /// Set the tick length in milliseconds.
    #[must_use]
    pub fn with_time_step_ms(mut self, time_step_ms: f32) -> Self {
        self.time_step_ms = time_step_ms;
        self
    }

    /// Set gravity.
    #[must_use]
    pub fn with_gravity(mut self, gravity: f32) -> Self {
        self.gravity = gravity;
        self
    }

    /// Set edge and volume compliance.
    #[must_use]
    pub fn with_compliance(mut self, inv_stiffness: f32, volume_compliance: f32) -> Self {
        self.inv_stiffness = inv_stiffness;
        self.volume_compliance = volume_compliance;
        self
    }

    /// Enable or disable body-to-body collisions.
    #[must_use]
    pub fn with_collision_check(mut self, collision_check: bool) -> Self {
        self.collision_check = collision_check;
        self
    }

    /// Set the radius and density of new spheres.
    #[must_use]
    pub fn with_sphere(mut self, radius: f32, density: f32) -> Self {
        self.sphere_radius = radius;
        self.density = density;
        self
    }

    /// Set the container half extent.
    #[must_use]
    pub fn with_bound(mut self, bound: f32) -> Self {
        self.bound = bound;
        self
    }

    /// Set the spatial hash configuration.
    #[must_use]
    pub fn with_hash(mut self, spacing: f32, table_size: usize) -> Self {
        self.hash_spacing = spacing;
        self.hash_table_size = table_size;
        self
    }

    /// Tick length in seconds.
    #[must_use]
    pub fn dt(&self) -> f32 {
        self.time_step_ms / 1000.0
    }

    /// The container described by these parameters.
    #[must_use]
    pub fn boundary(&self) -> Boundary {
        Boundary::new(
            self.bound,
            self.boundary_restitution,
            self.boundary_friction,
            self.contact_threshold,
        )
    }

    /// The body-to-body contact constants.
    #[must_use]
    pub fn contact(&self) -> ContactParams {
        ContactParams {
            restitution: self.contact_restitution,
            threshold: self.contact_threshold,
        }
    }

    /// Check every field against its valid range.
    ///
    /// # Errors
    /// Returns [`Error::InvalidParameter`] naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        let positive = |value: f32| value > 0.0 && value.is_finite();
        let non_negative = |value: f32| value >= 0.0 && value.is_finite();
        let unit = |value: f32| (0.0..=1.0).contains(&value);

        ensure(self.num_substeps >= 1, "num_substeps", "must be at least 1")?;
        ensure(positive(self.time_step_ms), "time_step_ms", "must be positive")?;
        ensure(self.gravity.is_finite(), "gravity", "must be finite")?;
        ensure(non_negative(self.inv_stiffness), "inv_stiffness", "must be >= 0")?;
        ensure(non_negative(self.volume_compliance), "volume_compliance", "must be >= 0")?;
        ensure(positive(self.sphere_radius), "sphere_radius", "must be positive")?;
        ensure(positive(self.density), "density", "must be positive")?;
        ensure(positive(self.bound), "bound", "must be positive")?;
        ensure(positive(self.hash_spacing), "hash_spacing", "must be positive")?;
        ensure(self.hash_table_size >= 1, "hash_table_size", "must be at least 1")?;
        ensure(unit(self.boundary_restitution), "boundary_restitution", "must be in [0, 1]")?;
        ensure(unit(self.boundary_friction), "boundary_friction", "must be in [0, 1]")?;
        ensure(unit(self.contact_restitution), "contact_restitution", "must be in [0, 1]")?;
        ensure(non_negative(self.contact_threshold), "contact_threshold", "must be >= 0")?;
        Ok(())
    }

    /// Load parameters from a JSON file; missing fields take their defaults.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or validated.
    #[tracing::instrument]
    pub fn from_json(filename: &str) -> Result<Self> {
        let data = std::fs::read(filename)?;
        let params: Self = serde_json::from_slice(&data)?;
        params.validate()?;
        debug!(?params, "Loaded simulation parameters");
        Ok(params)
    }
}

/// An external drag on one body.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Grab {
    /// Grabbed body.
    pub body: usize,
    /// Grabbed vertex; ignored for spheres.
    pub vertex: usize,
    /// Where the grabbed point is driven to.
    pub target: Vec3,
}

/// Every body of a simulation together with its parameters.
///
/// Bodies are addressed by their index in insertion order.
#[derive(Clone, Debug)]
pub struct World {
    params: SimParams,
    boundary: Boundary,
    contact: ContactParams,
    bodies: Vec<Body>,
    grab: Option<Grab>,
    tick: u64,
}

impl World {
    /// Create an empty world.
    ///
    /// # Errors
    /// Returns an error if `params` is invalid.
    pub fn new(params: SimParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            boundary: params.boundary(),
            contact: params.contact(),
            params,
            bodies: Vec::new(),
            grab: None,
            tick: 0,
        })
    }

    /// Current parameters.
    #[must_use]
    pub fn params(&self) -> &SimParams {
        &self.params
    }

    /// The container.
    #[must_use]
    pub fn boundary(&self) -> &Boundary {
        &self.boundary
    }

    /// All bodies, in id order.
    #[must_use]
    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    /// Body `id`, if any.
    #[must_use]
    pub fn body(&self, id: usize) -> Option<&Body> {
        self.bodies.get(id)
    }

    /// Body `id`, if any.
    pub fn body_mut(&mut self, id: usize) -> Option<&mut Body> {
        self.bodies.get_mut(id)
    }

    /// Soft body `id`, for direct edits such as pinning vertices.
    ///
    /// # Errors
    /// Returns an error if there is no body `id` or it is a sphere.
    pub fn soft_body_mut(&mut self, id: usize) -> Result<&mut SoftBody> {
        match self.bodies.get_mut(id) {
            Some(Body::Soft(soft)) => Ok(soft),
            Some(Body::Rigid(_)) => Err(Error::NotASoftBody(id)),
            None => Err(Error::NoSuchBody(id)),
        }
    }

    /// Number of bodies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    /// Whether the world has no bodies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Number of completed ticks.
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// The active grab, if any.
    #[must_use]
    pub fn grabbed(&self) -> Option<&Grab> {
        self.grab.as_ref()
    }

    /// Build a soft body from `mesh`, translated by `offset`, without adding it.
    ///
    /// # Errors
    /// Returns an error if the mesh is malformed.
    pub fn make_soft_body(&self, mesh: &TetMesh, offset: Vec3) -> Result<Body> {
        let mut soft = SoftBody::new(mesh, self.params.hash_spacing, self.params.hash_table_size)?;
        soft.init_location(offset);
        Ok(Body::Soft(soft))
    }

    /// Build a sphere centred at `position`, without adding it.
    ///
    /// # Errors
    /// Returns an error if the sphere parameters are invalid.
    pub fn make_sphere(&self, position: Vec3) -> Result<Body> {
        let mut sphere = RigidSphere::new(self.params.sphere_radius, self.params.density)?;
        sphere.move_by(position);
        Ok(Body::Rigid(sphere))
    }

    /// Add a body and return its id.
    pub fn add_body(&mut self, body: Body) -> usize {
        debug!(id = self.bodies.len(), kind = body.kind(), "Adding body");
        self.bodies.push(body);
        self.bodies.len() - 1
    }

    /// Add a soft body built from `mesh`, translated by `offset`.
    ///
    /// # Errors
    /// Returns an error if the mesh is malformed.
    pub fn add_soft_body(&mut self, mesh: &TetMesh, offset: Vec3) -> Result<usize> {
        let body = self.make_soft_body(mesh, offset)?;
        Ok(self.add_body(body))
    }

    /// Add a sphere centred at `position`.
    ///
    /// # Errors
    /// Returns an error if the sphere parameters are invalid.
    pub fn add_sphere(&mut self, position: Vec3) -> Result<usize> {
        let body = self.make_sphere(position)?;
        Ok(self.add_body(body))
    }

    /// Whether `candidate` would interpenetrate any body of the world.
    #[must_use]
    pub fn overlaps_any(&self, candidate: &Body) -> bool {
        self.bodies.iter().any(|body| check_collision(body, candidate))
    }

    /// Remove body `id`. Bodies added after it move down one id.
    ///
    /// # Errors
    /// Returns [`Error::NoSuchBody`] if `id` is out of range.
    pub fn remove(&mut self, id: usize) -> Result<Body> {
        if id >= self.bodies.len() {
            return Err(Error::NoSuchBody(id));
        }
        if self.grab.is_some_and(|grab| grab.body == id) {
            self.grab = None;
        } else if let Some(grab) = self.grab.as_mut().filter(|grab| grab.body > id) {
            grab.body -= 1;
        }
        Ok(self.bodies.remove(id))
    }

    /// Drop every body and restart the tick counter.
    pub fn reset(&mut self) {
        info!(bodies = self.bodies.len(), ticks = self.tick, "Resetting world");
        self.bodies.clear();
        self.grab = None;
        self.tick = 0;
    }

    /// Start dragging vertex `vertex` of body `body` (any vertex for a sphere)
    /// towards `target`. Replaces any previous grab.
    ///
    /// # Errors
    /// Returns an error if the body or vertex does not exist.
    pub fn grab(&mut self, body: usize, vertex: usize, target: Vec3) -> Result<()> {
        match self.bodies.get(body) {
            None => return Err(Error::NoSuchBody(body)),
            Some(Body::Soft(soft)) if vertex >= soft.vert_count() => {
                return Err(Error::NoSuchVertex {
                    body,
                    vertex,
                    count: soft.vert_count(),
                });
            }
            Some(_) => {}
        }
        self.grab = Some(Grab {
            body,
            vertex,
            target,
        });
        Ok(())
    }

    /// Move the target of the active grab.
    pub fn drag_to(&mut self, target: Vec3) {
        match &mut self.grab {
            Some(grab) => grab.target = target,
            None => warn!("Drag without an active grab ignored"),
        }
    }

    /// Stop dragging.
    pub fn release(&mut self) {
        self.grab = None;
    }

    /// Replace the parameters. A new hash configuration is applied to every
    /// soft body immediately.
    ///
    /// # Errors
    /// Returns an error if `params` is invalid; the world is left unchanged.
    pub fn set_params(&mut self, params: SimParams) -> Result<()> {
        params.validate()?;
        if params.hash_spacing != self.params.hash_spacing
            || params.hash_table_size != self.params.hash_table_size
        {
            for soft in self.bodies.iter_mut().filter_map(Body::as_soft_mut) {
                soft.rebuild_hash(params.hash_spacing, params.hash_table_size)?;
            }
        }
        self.boundary = params.boundary();
        self.contact = params.contact();
        self.params = params;
        Ok(())
    }

    /// Advance the simulation by one tick of `params().dt()`.
    pub fn step(&mut self) {
        let dt = self.params.dt();
        let SimParams {
            num_substeps,
            gravity,
            inv_stiffness,
            volume_compliance,
            collision_check,
            ..
        } = self.params;

        for body in &mut self.bodies {
            body.apply_states(dt, gravity);
        }

        if let Some(grab) = self.grab {
            if let Some(body) = self.bodies.get_mut(grab.body) {
                body.grab_interact(dt, grab.target, grab.vertex);
            }
        }

        for _ in 0..num_substeps {
            for soft in self.bodies.iter_mut().filter_map(Body::as_soft_mut) {
                soft.solve_volume_constraints(dt, volume_compliance);
                soft.solve_length_constraints(dt, inv_stiffness);
            }
            if collision_check {
                self.solve_collisions(dt);
            }
        }

        for body in &mut self.bodies {
            body.handle_boundaries(&self.boundary);
        }
        for body in &mut self.bodies {
            body.update_velocities(dt, &self.boundary);
        }

        self.tick += 1;
        trace!(tick = self.tick, "Step complete");
    }

    /// Rebuild every soft-body hash, then resolve each pair of bodies once.
    fn solve_collisions(&mut self, dt: f32) {
        for soft in self.bodies.iter_mut().filter_map(Body::as_soft_mut) {
            soft.update_hash();
        }
        for j in 1..self.bodies.len() {
            let (head, tail) = self.bodies.split_at_mut(j);
            let b = &mut tail[0];
            for a in head {
                solve_collision(a, b, dt, &self.contact);
            }
        }
    }

    /// Ratio of current to rest volume summed over the soft bodies, or
    /// `None` when there are none.
    #[must_use]
    pub fn volume_ratio(&self) -> Option<f32> {
        let (volume, rest) = self
            .bodies
            .iter()
            .filter_map(Body::as_soft)
            .fold((0.0, 0.0), |(v, r), soft| {
                (v + soft.total_volume(), r + soft.rest_volume())
            });
        (rest != 0.0).then(|| volume / rest)
    }

    /// Lowest point of any body, or `None` for an empty world.
    #[must_use]
    pub fn lowest_point(&self) -> Option<f32> {
        self.bodies
            .iter()
            .map(|body| body.bounding_box().0[1])
            .reduce(f32::min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params_are_valid() {
        let params = SimParams::default();
        assert!(params.validate().is_ok());
        assert!((params.dt() - 0.013).abs() < 1e-7);
    }

    #[test]
    fn test_invalid_params_are_rejected() {
        let cases = [
            SimParams::default().with_substeps(0),
            SimParams::default().with_time_step_ms(0.0),
            SimParams::default().with_compliance(-1.0, 0.0),
            SimParams::default().with_hash(0.0, 10),
            SimParams::default().with_hash(0.1, 0),
            SimParams::default().with_sphere(0.5, 0.0),
            SimParams::default().with_bound(-1.0),
            SimParams {
                boundary_friction: 1.5,
                ..SimParams::default()
            },
        ];
        for params in cases {
            assert!(
                matches!(params.validate(), Err(Error::InvalidParameter { .. })),
                "{params:?}"
            );
            assert!(World::new(params).is_err());
        }
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        std::fs::write(&path, r#"{"num_substeps": 4, "gravity": 9.81}"#).unwrap();
        let params = SimParams::from_json(path.to_str().unwrap()).unwrap();
        assert_eq!(params.num_substeps, 4);
        assert!((params.gravity - 9.81).abs() < 1e-6);
        assert_eq!(params.hash_table_size, 5000);
    }

    #[test]
    fn test_sphere_comes_to_rest_on_ground() {
        let mut world = World::new(SimParams::default()).unwrap();
        let id = world.add_sphere([0.0, 5.0, 0.0]).unwrap();
        for _ in 0..600 {
            world.step();
            let y = world.body(id).unwrap().as_sphere().unwrap().position()[1];
            assert!(y >= 0.5 - 1e-4, "sphere sank to {y}");
        }
        let y = world.body(id).unwrap().as_sphere().unwrap().position()[1];
        assert!(y < 0.6);
        assert_eq!(world.tick(), 600);
    }

    #[test]
    fn test_soft_block_lands_and_keeps_volume() {
        let params = SimParams::default().with_hash(0.25, 997);
        let mut world = World::new(params).unwrap();
        world
            .add_soft_body(&TetMesh::block(2, 2, 2, 0.25), [-0.25, 1.0, -0.25])
            .unwrap();
        for _ in 0..200 {
            world.step();
            assert!(world.lowest_point().unwrap() >= 0.0);
        }
        let ratio = world.volume_ratio().unwrap();
        assert!((0.9..1.1).contains(&ratio), "volume ratio {ratio}");
        assert!(world.lowest_point().unwrap() < 0.05, "block rests on the ground");
    }

    #[test]
    fn test_sphere_rests_on_pinned_block() {
        let params = SimParams::default().with_hash(0.25, 997);
        let mut world = World::new(params).unwrap();
        let block = world.add_soft_body(&TetMesh::block(2, 2, 2, 0.5), [0.0; 3]).unwrap();
        let soft = world.soft_body_mut(block).unwrap();
        for i in 0..soft.vert_count() {
            soft.set_inv_mass(i, 0.0).unwrap();
        }
        let sphere = world.add_sphere([0.5, 1.7, 0.5]).unwrap();
        assert!(matches!(world.soft_body_mut(sphere), Err(Error::NotASoftBody(_))));
        assert!(matches!(world.soft_body_mut(9), Err(Error::NoSuchBody(9))));
        for _ in 0..100 {
            world.step();
        }
        let y = world.body(sphere).unwrap().as_sphere().unwrap().position()[1];
        assert!((y - 1.5).abs() < 0.05, "sphere centre at {y}");
        let rest = TetMesh::block(2, 2, 2, 0.5).verts;
        assert_eq!(world.body(block).unwrap().render_positions(), rest.as_slice());
    }

    fn stacked_blocks(collision_check: bool) -> World {
        let params = SimParams::default().with_collision_check(collision_check);
        let mut world = World::new(params).unwrap();
        let mesh = TetMesh::block(3, 3, 3, 0.2);
        world.add_soft_body(&mesh, [-0.3, 0.0, -0.3]).unwrap();
        // Offset by half a cell so vertices meet faces rather than vertices.
        world.add_soft_body(&mesh, [-0.2, 0.65, -0.2]).unwrap();
        // Long enough for the bounces off the ground to die down.
        for _ in 0..120 {
            world.step();
        }
        world
    }

    #[test]
    fn test_soft_bodies_collide_through_step() {
        let world = stacked_blocks(true);
        let ratio = world.volume_ratio().unwrap();
        assert!((0.85..1.15).contains(&ratio), "volume ratio {ratio}");
        for body in world.bodies() {
            assert!(body.render_positions().iter().all(|c| c.is_finite()));
            assert!(body.bounding_box().0[1] >= 0.0);
        }

        let upper = |w: &World| w.body(1).unwrap().bounding_box().0[1];
        let unobstructed = stacked_blocks(false);
        assert!(upper(&unobstructed) < 0.05, "falls through without collisions");
        assert!(
            upper(&world) > upper(&unobstructed) + 0.1,
            "upper block held up at {}",
            upper(&world)
        );
    }

    #[test]
    fn test_overlaps_any_for_placement() {
        let mut world = World::new(SimParams::default()).unwrap();
        world.add_sphere([0.0, 1.0, 0.0]).unwrap();
        let near = world.make_sphere([0.5, 1.0, 0.0]).unwrap();
        let far = world.make_sphere([2.0, 1.0, 0.0]).unwrap();
        assert!(world.overlaps_any(&near));
        assert!(!world.overlaps_any(&far));
    }

    #[test]
    fn test_grab_moves_sphere_to_target() {
        let mut world = World::new(SimParams::default()).unwrap();
        let id = world.add_sphere([0.0, 1.0, 0.0]).unwrap();
        world.grab(id, 0, [1.0, 2.0, 1.0]).unwrap();
        world.step();
        let sphere = world.body(id).unwrap().as_sphere().unwrap();
        assert_eq!(sphere.position(), [1.0, 2.0, 1.0]);
        assert!(sphere.velocity()[0] > 0.0);

        world.release();
        assert!(world.grabbed().is_none());
    }

    #[test]
    fn test_grab_errors() {
        let mut world = World::new(SimParams::default()).unwrap();
        let soft = world.add_soft_body(&TetMesh::tetrahedron(0.5), [0.0; 3]).unwrap();
        assert!(matches!(world.grab(3, 0, [0.0; 3]), Err(Error::NoSuchBody(3))));
        assert!(matches!(
            world.grab(soft, 4, [0.0; 3]),
            Err(Error::NoSuchVertex { vertex: 4, count: 4, .. })
        ));
        assert!(world.grab(soft, 3, [0.0, 1.0, 0.0]).is_ok());
    }

    #[test]
    fn test_remove_and_reset() {
        let mut world = World::new(SimParams::default()).unwrap();
        world.add_sphere([0.0, 1.0, 0.0]).unwrap();
        world.add_sphere([2.0, 1.0, 0.0]).unwrap();
        world.grab(1, 0, [2.0, 2.0, 0.0]).unwrap();
        assert!(world.remove(0).unwrap().as_sphere().is_some());
        assert_eq!(world.grabbed().map(|g| g.body), Some(0));
        assert!(matches!(world.remove(5), Err(Error::NoSuchBody(5))));
        world.step();
        world.reset();
        assert!(world.is_empty());
        assert_eq!(world.tick(), 0);
        assert!(world.grabbed().is_none());
    }

    #[test]
    fn test_set_params_rebuilds_hashes() {
        let mut world = World::new(SimParams::default()).unwrap();
        let id = world.add_soft_body(&TetMesh::tetrahedron(0.5), [0.0; 3]).unwrap();
        assert!(world.set_params(SimParams::default().with_substeps(0)).is_err());
        world
            .set_params(SimParams::default().with_hash(0.2, 31).with_bound(2.0))
            .unwrap();
        let soft = world.body(id).unwrap().as_soft().unwrap();
        assert_eq!(soft.spatial_hash().table_size(), 31);
        assert!((world.boundary().planes[1].point[0] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_collisions_can_be_disabled() {
        let params = SimParams::default().with_collision_check(false).with_gravity(0.0);
        let mut world = World::new(params).unwrap();
        world.add_sphere([0.0, 1.0, 0.0]).unwrap();
        world.add_sphere([0.6, 1.0, 0.0]).unwrap();
        world.step();
        let a = world.body(0).unwrap().as_sphere().unwrap();
        let b = world.body(1).unwrap().as_sphere().unwrap();
        assert!(a.overlaps(b));

        let mut world = World::new(SimParams::default().with_gravity(0.0)).unwrap();
        world.add_sphere([0.0, 1.0, 0.0]).unwrap();
        world.add_sphere([0.6, 1.0, 0.0]).unwrap();
        world.step();
        let a = world.body(0).unwrap().as_sphere().unwrap();
        let b = world.body(1).unwrap().as_sphere().unwrap();
        assert!(!a.overlaps(b) || (b.position()[0] - a.position()[0]) > 0.999);
    }
}
