//! Deformable tetrahedral body solved with position-based dynamics.
//!
//! A [`SoftBody`] owns flat position, velocity and constraint buffers built
//! from a [`TetMesh`]. Per tick the driver calls, in order:
//! [`apply_states`](SoftBody::apply_states), optionally
//! [`grab_interact`](SoftBody::grab_interact), the two constraint solvers for
//! every substep, [`handle_boundaries`](SoftBody::handle_boundaries) and
//! finally [`update_velocities`](SoftBody::update_velocities).

use bitvec::vec::BitVec;
use tracing::{debug, trace, warn};

use crate::boundary::{Boundary, PLANE_COUNT};
use crate::error::{ensure, Result};
use crate::hash::SpatialHash;
use crate::mesh::{tet_volume, Spatial, TetMesh};
use crate::vector::{self, Vec3};

/// Soft body state and constraint data.
#[derive(Clone, Debug)]
pub struct SoftBody {
    pub(crate) name: String,
    pub(crate) positions: Vec<f32>,
    pub(crate) prev_positions: Vec<f32>,
    pub(crate) velocities: Vec<f32>,
    pub(crate) init_positions: Vec<f32>,
    pub(crate) inv_masses: Vec<f32>,

    pub(crate) tet_ids: Vec<usize>,
    pub(crate) edge_ids: Vec<usize>,
    pub(crate) surface_tri_ids: Vec<usize>,
    pub(crate) init_tet_volumes: Vec<f32>,
    pub(crate) init_edge_lengths: Vec<f32>,

    pub(crate) is_surface_vert: BitVec,
    pub(crate) is_surface_tet: BitVec,
    /// Tetrahedra incident to each vertex.
    pub(crate) vert_tets: Vec<Vec<usize>>,
    /// Longest rest edge of any tetrahedron.
    pub(crate) max_tet_edge: f32,
    /// Per vertex, bit `k` is set while the vertex touches boundary plane `k`.
    boundary_contacts: Vec<u8>,

    pub(crate) hash: SpatialHash,
}

impl SoftBody {
    /// Build a soft body from a mesh, with a spatial hash of cell size
    /// `hash_spacing` and `hash_table_size` buckets.
    ///
    /// Vertex masses are a quarter of the rest volume of every incident
    /// tetrahedron. A vertex with no incident volume is made immovable.
    ///
    /// # Errors
    /// Returns an error if the mesh is malformed or the hash settings are invalid.
    #[tracing::instrument(skip(mesh), fields(name = %mesh.name))]
    pub fn new(mesh: &TetMesh, hash_spacing: f32, hash_table_size: usize) -> Result<Self> {
        mesh.validate()?;
        let vert_num = mesh.vert_count();
        let tet_num = mesh.tet_count();
        let to_usize = |ids: &[u32]| ids.iter().map(|&id| id as usize).collect::<Vec<_>>();

        let positions = mesh.verts.clone();
        let tet_ids = to_usize(&mesh.tet_ids);
        let edge_ids = to_usize(&mesh.edge_ids);
        let surface_tri_ids = to_usize(&mesh.surface_tri_ids);

        let mut is_surface_vert = BitVec::repeat(false, vert_num);
        for &id in &surface_tri_ids {
            is_surface_vert.set(id, true);
        }

        let mut is_surface_tet = BitVec::repeat(false, tet_num);
        let mut vert_tets = vec![Vec::new(); vert_num];
        let mut init_tet_volumes = Vec::with_capacity(tet_num);
        let mut masses = vec![0.0_f32; vert_num];
        let mut max_tet_edge = 0.0_f32;
        for (i, t) in tet_ids.chunks_exact(4).enumerate() {
            let ids = [t[0], t[1], t[2], t[3]];
            let surface = ids.iter().filter(|&&id| is_surface_vert[id]).count();
            is_surface_tet.set(i, surface == 3);
            for a in 0..3 {
                for b in a + 1..4 {
                    let length = vector::dist(&positions, ids[a], &positions, ids[b]);
                    max_tet_edge = max_tet_edge.max(length);
                }
            }

            let volume = tet_volume(&positions, ids);
            init_tet_volumes.push(volume);
            for id in ids {
                vert_tets[id].push(i);
                masses[id] += volume.abs() / 4.0;
            }
        }

        let mut pinned = 0;
        let inv_masses = masses
            .into_iter()
            .map(|m| {
                if m > 0.0 {
                    1.0 / m
                } else {
                    pinned += 1;
                    0.0
                }
            })
            .collect();
        if pinned > 0 {
            warn!(pinned, "Vertices without incident volume are immovable");
        }

        let init_edge_lengths = edge_ids
            .chunks_exact(2)
            .map(|e| vector::dist(&positions, e[0], &positions, e[1]))
            .collect();

        let mut hash = SpatialHash::new(hash_spacing, hash_table_size, vert_num)?;
        hash.update(&positions);

        debug!(
            vertices = vert_num,
            tetrahedra = tet_num,
            edges = edge_ids.len() / 2,
            surface_tets = is_surface_tet.count_ones(),
            "Soft body created"
        );

        Ok(Self {
            name: mesh.name.clone(),
            prev_positions: positions.clone(),
            velocities: vec![0.0; positions.len()],
            init_positions: positions.clone(),
            positions,
            inv_masses,
            tet_ids,
            edge_ids,
            surface_tri_ids,
            init_tet_volumes,
            init_edge_lengths,
            is_surface_vert,
            is_surface_tet,
            vert_tets,
            max_tet_edge,
            boundary_contacts: vec![0; vert_num],
            hash,
        })
    }

    /// Mesh name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of vertices.
    #[must_use]
    pub fn vert_count(&self) -> usize {
        self.inv_masses.len()
    }

    /// Number of tetrahedra.
    #[must_use]
    pub fn tet_count(&self) -> usize {
        self.init_tet_volumes.len()
    }

    /// Number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.init_edge_lengths.len()
    }

    /// Current positions, 3 floats per vertex.
    #[must_use]
    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    /// Positions at the start of the current tick.
    #[must_use]
    pub fn prev_positions(&self) -> &[f32] {
        &self.prev_positions
    }

    /// Velocities, 3 floats per vertex.
    #[must_use]
    pub fn velocities(&self) -> &[f32] {
        &self.velocities
    }

    /// Per-vertex inverse masses; 0 marks an immovable vertex.
    #[must_use]
    pub fn inv_masses(&self) -> &[f32] {
        &self.inv_masses
    }

    /// Tetrahedra, 4 vertex indices each.
    #[must_use]
    pub fn tet_ids(&self) -> &[usize] {
        &self.tet_ids
    }

    /// Edges, 2 vertex indices each.
    #[must_use]
    pub fn edge_ids(&self) -> &[usize] {
        &self.edge_ids
    }

    /// Surface triangles, 3 vertex indices each.
    #[must_use]
    pub fn surface_tri_ids(&self) -> &[usize] {
        &self.surface_tri_ids
    }

    /// Rest volume of every tetrahedron.
    #[must_use]
    pub fn init_tet_volumes(&self) -> &[f32] {
        &self.init_tet_volumes
    }

    /// Rest length of every edge.
    #[must_use]
    pub fn init_edge_lengths(&self) -> &[f32] {
        &self.init_edge_lengths
    }

    /// Whether vertex `i` lies on the outer surface.
    #[must_use]
    pub fn is_surface_vert(&self, i: usize) -> bool {
        self.is_surface_vert.get(i).is_some_and(|b| *b)
    }

    /// Whether tetrahedron `i` has exactly three surface vertices.
    #[must_use]
    pub fn is_surface_tet(&self, i: usize) -> bool {
        self.is_surface_tet.get(i).is_some_and(|b| *b)
    }

    /// Tetrahedra incident to vertex `i`.
    #[must_use]
    pub fn vert_tets(&self, i: usize) -> &[usize] {
        self.vert_tets.get(i).map_or(&[][..], Vec::as_slice)
    }

    /// The body's spatial hash, as of the last update.
    #[must_use]
    pub fn spatial_hash(&self) -> &SpatialHash {
        &self.hash
    }

    /// Override the inverse mass of vertex `i`; 0 pins it in place.
    ///
    /// # Errors
    /// Returns an error if `i` is out of range or `inv_mass` is negative.
    pub fn set_inv_mass(&mut self, i: usize, inv_mass: f32) -> Result<()> {
        ensure(i < self.vert_count(), "vertex", format!("{i} out of range"))?;
        ensure(inv_mass >= 0.0 && inv_mass.is_finite(), "inv_mass", "must be finite and >= 0")?;
        self.inv_masses[i] = inv_mass;
        Ok(())
    }

    /// Restore the rest shape translated by `offset`, at rest.
    pub fn init_location(&mut self, offset: Vec3) {
        self.positions.copy_from_slice(&self.init_positions);
        self.positions.translate(offset);
        self.prev_positions.copy_from_slice(&self.positions);
        self.velocities.fill(0.0);
        self.boundary_contacts.fill(0);
        self.hash.update(&self.positions);
    }

    /// Translate the body without changing its velocity. The spatial hash
    /// follows the move.
    pub fn move_by(&mut self, offset: Vec3) {
        self.positions.translate(offset);
        self.prev_positions.translate(offset);
        self.hash.update(&self.positions);
    }

    /// Current signed volume of tetrahedron `i`.
    #[must_use]
    pub fn volume(&self, i: usize) -> f32 {
        let t = &self.tet_ids[4 * i..4 * i + 4];
        tet_volume(&self.positions, [t[0], t[1], t[2], t[3]])
    }

    /// Sum of the current signed tetrahedron volumes.
    #[must_use]
    pub fn total_volume(&self) -> f32 {
        (0..self.tet_count()).map(|i| self.volume(i)).sum()
    }

    /// Sum of the rest volumes.
    #[must_use]
    pub fn rest_volume(&self) -> f32 {
        self.init_tet_volumes.iter().sum()
    }

    /// Snapshot positions, add gravity to the velocities and advance the
    /// positions by one explicit step. Immovable vertices stay put.
    pub fn apply_states(&mut self, dt: f32, gravity: f32) {
        self.prev_positions.copy_from_slice(&self.positions);
        for (i, &w) in self.inv_masses.iter().enumerate() {
            if w == 0.0 {
                continue;
            }
            self.velocities[3 * i + 1] -= gravity * dt;
            vector::add_assign(&mut self.positions, i, &self.velocities, i, dt);
        }
    }

    /// Replace the spatial hash with one of a different configuration.
    ///
    /// # Errors
    /// Returns an error if the hash settings are invalid.
    pub fn rebuild_hash(&mut self, spacing: f32, table_size: usize) -> Result<()> {
        let mut hash = SpatialHash::new(spacing, table_size, self.vert_count())?;
        hash.update(&self.positions);
        self.hash = hash;
        Ok(())
    }

    /// Pin vertex `id` to `target`. Unknown vertices are ignored.
    pub fn grab_interact(&mut self, target: Vec3, id: usize) {
        if id < self.vert_count() {
            vector::set(&mut self.positions, id, target);
        } else {
            debug!(id, "Grab target vertex out of range");
        }
    }

    /// One Gauss-Seidel pass over the tetrahedron volume constraints with
    /// compliance `compliance / dt^2`.
    pub fn solve_volume_constraints(&mut self, dt: f32, compliance: f32) {
        const SIGNS: [f32; 4] = [1.0, -1.0, 1.0, -1.0];
        let alpha = compliance / (dt * dt);
        let mut skipped = 0_usize;

        for (i, t) in self.tet_ids.chunks_exact(4).enumerate() {
            let w = [
                self.inv_masses[t[0]],
                self.inv_masses[t[1]],
                self.inv_masses[t[2]],
                self.inv_masses[t[3]],
            ];

            // Edges around the ring x0 -> x1 -> x2 -> x3 -> x0.
            let mut seg = [0.0; 12];
            for j in 0..4 {
                vector::sub(&mut seg, j, &self.positions, t[(j + 1) % 4], &self.positions, t[j]);
            }
            let mut grads = [0.0; 12];
            vector::cross(&mut grads, 0, &seg, 0, &seg, 1);
            let volume = vector::dot(&grads, 0, &seg, 2) / 6.0;

            // Each entry is the negated gradient of 6V for vertex j.
            let mut denom = alpha;
            for j in 0..4 {
                vector::cross(&mut grads, j, &seg, (j + 1) % 4, &seg, (j + 2) % 4);
                vector::scale(&mut grads, j, SIGNS[j]);
                denom += vector::norm_sq(&grads, j) * w[j];
            }
            if denom == 0.0 {
                skipped += 1;
                continue;
            }

            let lambda = 6.0 * (volume - self.init_tet_volumes[i]) / denom;
            for j in 0..4 {
                vector::add_assign(&mut self.positions, t[j], &grads, j, lambda * w[j]);
            }
        }

        if skipped > 0 {
            trace!(skipped, "Skipped degenerate volume constraints");
        }
    }

    /// One Gauss-Seidel pass over the edge length constraints with
    /// compliance `inv_stiffness / dt^2`.
    pub fn solve_length_constraints(&mut self, dt: f32, inv_stiffness: f32) {
        let alpha = inv_stiffness / (dt * dt);
        let mut skipped = 0_usize;

        for (i, e) in self.edge_ids.chunks_exact(2).enumerate() {
            let w = [self.inv_masses[e[0]], self.inv_masses[e[1]]];
            let mut dir = [0.0; 3];
            vector::sub(&mut dir, 0, &self.positions, e[1], &self.positions, e[0]);
            let length = vector::normalize(&mut dir, 0);
            let denom = w[0] + w[1] + alpha;
            if length == 0.0 || denom == 0.0 {
                skipped += 1;
                continue;
            }

            let lambda = (length - self.init_edge_lengths[i]) / denom;
            vector::add_assign(&mut self.positions, e[0], &dir, 0, lambda * w[0]);
            vector::add_assign(&mut self.positions, e[1], &dir, 0, -lambda * w[1]);
        }

        if skipped > 0 {
            trace!(skipped, "Skipped degenerate length constraints");
        }
    }

    /// Rebuild the spatial hash from the current positions.
    pub fn update_hash(&mut self) {
        self.hash.update(&self.positions);
    }

    /// Project every vertex back inside the container and record which
    /// planes each vertex touches for the velocity response.
    pub fn handle_boundaries(&mut self, boundary: &Boundary) {
        for i in 0..self.vert_count() {
            let mut contacts = 0_u8;
            for (k, plane) in boundary.planes.iter().enumerate() {
                let gap = plane.gap(&self.positions, i);
                if gap < 0.0 {
                    vector::add_assign(&mut self.positions, i, &plane.normal, 0, -gap);
                }
                if gap < boundary.contact_threshold {
                    contacts |= 1 << k;
                }
            }
            self.boundary_contacts[i] = contacts;
        }
    }

    /// Derive velocities from the position change over the tick, then apply
    /// the boundary response to vertices in contact.
    pub fn update_velocities(&mut self, dt: f32, boundary: &Boundary) {
        for i in 0..self.vert_count() {
            vector::sub(&mut self.velocities, i, &self.positions, i, &self.prev_positions, i);
            vector::scale(&mut self.velocities, i, 1.0 / dt);

            let contacts = self.boundary_contacts[i];
            for k in (0..PLANE_COUNT).filter(|k| contacts & (1 << k) != 0) {
                boundary.respond(&mut self.velocities, i, k);
            }
        }
    }

    /// Lowest vertex height.
    #[must_use]
    pub fn lowest_point(&self) -> f32 {
        self.positions.bounding_box().0[1]
    }
}
