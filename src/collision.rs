//! Pairwise contact between bodies.
//!
//! [`check_collision`] is a read-only overlap test used for placement.
//! [`solve_collision`] resolves contact in place:
//!
//! - soft/soft: surface vertices of one body found inside a surface
//!   tetrahedron of the other are pushed out through that tetrahedron's
//!   surface triangle, with the correction split by inverse mass;
//! - soft/rigid: vertices inside the sphere are projected onto its surface
//!   and the sphere receives the matching momentum;
//! - rigid/rigid: see [`RigidSphere::handle_collision`].

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::body::Body;
use crate::mesh::{boxes_overlap, Spatial};
use crate::softbody::SoftBody;
use crate::sphere::RigidSphere;
use crate::vector::{self, Mat3};

/// Constants of the body-to-body contact response.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContactParams {
    /// Restitution of sphere-sphere impacts.
    pub restitution: f32,
    /// Gap below which approaching spheres exchange an impulse.
    pub threshold: f32,
}

impl Default for ContactParams {
    fn default() -> Self {
        Self {
            restitution: 0.1,
            threshold: 0.01,
        }
    }
}

/// Whether two bodies currently interpenetrate. Never mutates either body.
#[must_use]
pub fn check_collision(a: &Body, b: &Body) -> bool {
    if !boxes_overlap(a.bounding_box(), b.bounding_box()) {
        return false;
    }
    match (a, b) {
        (Body::Soft(a), Body::Soft(b)) => check_soft_soft(a, b) || check_soft_soft(b, a),
        (Body::Soft(soft), Body::Rigid(sphere)) | (Body::Rigid(sphere), Body::Soft(soft)) => {
            check_soft_rigid(soft, sphere)
        }
        (Body::Rigid(a), Body::Rigid(b)) => a.overlaps(b),
    }
}

/// Resolve contact between two distinct bodies.
pub fn solve_collision(a: &mut Body, b: &mut Body, dt: f32, contact: &ContactParams) {
    match (a, b) {
        (Body::Soft(a), Body::Soft(b)) => {
            let pushed = solve_soft_soft(a, b) + solve_soft_soft(b, a);
            if pushed > 0 {
                trace!(pushed, "Resolved soft-soft contacts");
            }
        }
        (Body::Soft(soft), Body::Rigid(sphere)) | (Body::Rigid(sphere), Body::Soft(soft)) => {
            solve_soft_rigid(soft, sphere, dt);
        }
        (Body::Rigid(a), Body::Rigid(b)) => {
            a.handle_collision(std::slice::from_mut(b), contact);
        }
    }
}

/// Barycentric coordinates of `point` with respect to the first three
/// corners of tetrahedron `tet`, relative to the fourth. `None` for a flat
/// tetrahedron.
fn barycentric(positions: &[f32], tet: &[usize], point: &[f32], i: usize) -> Option<[f32; 3]> {
    let mut seg = [0.0; 9];
    for k in 0..3 {
        vector::sub(&mut seg, k, positions, tet[k], positions, tet[3]);
    }
    let inv = Mat3::from_cols(&seg, 0, &seg, 1, &seg, 2).inverse()?;
    let mut b = [0.0; 3];
    vector::sub(&mut b, 0, point, i, positions, tet[3]);
    inv.apply(&mut b, 0);
    Some(b)
}

fn is_inside(b: [f32; 3]) -> bool {
    b.iter().all(|&w| w >= 0.0) && b[0] + b[1] + b[2] <= 1.0
}

/// Whether any vertex of `b` lies inside a tetrahedron of `a`.
fn check_soft_soft(a: &SoftBody, b: &SoftBody) -> bool {
    let bounds = a.bounding_box();
    (0..b.vert_count()).any(|i| {
        let p = vector::get(&b.positions, i);
        boxes_overlap(bounds, (p, p))
            && a.tet_ids.chunks_exact(4).any(|t| {
                barycentric(&a.positions, t, &b.positions, i).is_some_and(is_inside)
            })
    })
}

fn check_soft_rigid(soft: &SoftBody, sphere: &RigidSphere) -> bool {
    let center = sphere.position();
    (0..soft.vert_count())
        .any(|i| vector::dist(&soft.positions, i, &center, 0) < sphere.radius())
}

/// Push surface vertices of `b` out of the surface tetrahedra of `a`.
/// Returns the number of vertices moved.
fn solve_soft_soft(a: &mut SoftBody, b: &mut SoftBody) -> usize {
    let SoftBody {
        positions: a_pos,
        inv_masses: a_w,
        tet_ids,
        is_surface_vert: a_surface,
        is_surface_tet,
        vert_tets,
        max_tet_edge,
        hash,
        ..
    } = a;
    let radius = max_tet_edge.max(hash.spacing());
    let bounds = a_pos.bounding_box();

    let mut candidates = Vec::new();
    let mut tested = Vec::new();
    let mut pushed = 0;

    for i in 0..b.vert_count() {
        let p = vector::get(&b.positions, i);
        if !b.is_surface_vert[i] || !boxes_overlap(bounds, (p, p)) {
            continue;
        }
        hash.query(p, radius, &mut candidates);
        tested.clear();

        'search: for &v in &candidates {
            if !a_surface[v] {
                continue;
            }
            for &j in &vert_tets[v] {
                if !is_surface_tet[j] || tested.contains(&j) {
                    continue;
                }
                tested.push(j);
                let t = &tet_ids[4 * j..4 * j + 4];
                let Some(bary) = barycentric(a_pos, t, &b.positions, i) else {
                    continue;
                };
                if !is_inside(bary) {
                    continue;
                }

                // The three surface corners and the interior one.
                let mut s = [0; 3];
                let mut interior = t[0];
                let mut count = 0;
                for &k in t {
                    if a_surface[k] && count < 3 {
                        s[count] = k;
                        count += 1;
                    } else {
                        interior = k;
                    }
                }

                let mut e = [0.0; 6];
                vector::sub(&mut e, 0, a_pos, s[1], a_pos, s[0]);
                vector::sub(&mut e, 1, a_pos, s[2], a_pos, s[0]);
                let mut n = [0.0; 3];
                vector::cross(&mut n, 0, &e, 0, &e, 1);
                if vector::normalize(&mut n, 0) == 0.0 {
                    continue;
                }
                let mut d = [0.0; 3];
                vector::sub(&mut d, 0, a_pos, interior, a_pos, s[0]);
                if vector::dot(&n, 0, &d, 0) > 0.0 {
                    vector::scale(&mut n, 0, -1.0);
                }
                vector::sub(&mut d, 0, &b.positions, i, a_pos, s[0]);
                let depth = -vector::dot(&n, 0, &d, 0);
                if depth <= 0.0 {
                    continue;
                }

                // Pinned surface corners hold the face back; the share of A
                // they cannot take goes to B.
                let wa = t.iter().map(|&k| a_w[k]).sum::<f32>() / 4.0;
                #[allow(clippy::cast_precision_loss)]
                let face_free = s.iter().filter(|&&k| a_w[k] > 0.0).count() as f32 / 3.0;
                let wb = b.inv_masses[i];
                let w = wa * face_free + wb;
                if w == 0.0 {
                    continue;
                }
                vector::add_assign(&mut b.positions, i, &n, 0, depth * wb / w);
                if face_free > 0.0 {
                    for &k in t {
                        if a_w[k] > 0.0 {
                            vector::add_assign(a_pos, k, &n, 0, -depth * wa / w);
                        }
                    }
                }
                pushed += 1;
                break 'search;
            }
        }
    }
    pushed
}

/// Project soft-body vertices out of the sphere and hand the momentum of
/// each correction to the sphere. Every vertex is tested, so the result does
/// not depend on when the body's hash was last rebuilt.
fn solve_soft_rigid(soft: &mut SoftBody, sphere: &mut RigidSphere, dt: f32) {
    let radius = sphere.radius();
    let sphere_w = sphere.inv_mass();

    for i in 0..soft.vert_count() {
        let mut n = [0.0; 3];
        vector::sub(&mut n, 0, &soft.positions, i, &sphere.position, 0);
        let dist = vector::normalize(&mut n, 0);
        let gap = dist - radius;
        if dist == 0.0 || gap >= 0.0 {
            continue;
        }

        let w = soft.inv_masses[i];
        if w > 0.0 {
            vector::add_assign(&mut soft.positions, i, &n, 0, -gap);
            let momentum = -gap / dt / w;
            vector::add_assign(&mut sphere.velocity, 0, &n, 0, -momentum * sphere_w);
        } else {
            // The vertex is pinned; move the sphere instead.
            vector::add_assign(&mut sphere.position, 0, &n, 0, gap);
            let vn = vector::dot(&sphere.velocity, 0, &n, 0);
            if vn > 0.0 {
                vector::add_assign(&mut sphere.velocity, 0, &n, 0, -vn);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::Entity;
    use crate::mesh::TetMesh;

    fn block(offset: [f32; 3]) -> SoftBody {
        let mut body = SoftBody::new(&TetMesh::block(2, 2, 2, 0.5), 0.25, 257).unwrap();
        body.init_location(offset);
        body
    }

    fn sphere_at(p: [f32; 3]) -> RigidSphere {
        let mut sphere = RigidSphere::new(0.5, 1.0).unwrap();
        sphere.move_by(p);
        sphere
    }

    #[test]
    fn test_check_is_side_effect_free() {
        let a = Body::Soft(block([0.0, 0.0, 0.0]));
        let b = Body::Soft(block([0.6, 0.3, 0.4]));
        let far = Body::Soft(block([3.0, 0.0, 0.0]));
        let before = a.render_positions().to_vec();
        assert!(check_collision(&a, &b));
        assert!(check_collision(&b, &a));
        assert!(!check_collision(&a, &far));
        assert_eq!(a.render_positions(), before.as_slice());
    }

    #[test]
    fn test_check_soft_rigid_and_rigid_rigid() {
        let soft = Body::Soft(block([0.0, 0.0, 0.0]));
        assert!(check_collision(&soft, &Body::Rigid(sphere_at([1.2, 0.5, 0.5]))));
        assert!(check_collision(&Body::Rigid(sphere_at([1.2, 0.5, 0.5])), &soft));
        assert!(!check_collision(&soft, &Body::Rigid(sphere_at([2.0, 0.5, 0.5]))));

        let a = Body::Rigid(sphere_at([0.0, 2.0, 0.0]));
        assert!(check_collision(&a, &Body::Rigid(sphere_at([0.9, 2.0, 0.0]))));
        assert!(!check_collision(&a, &Body::Rigid(sphere_at([1.1, 2.0, 0.0]))));
    }

    #[test]
    fn test_soft_rigid_non_penetration() {
        let mut soft = Body::Soft(block([0.0, 0.0, 0.0]));
        let mut sphere = Body::Rigid(sphere_at([1.3, 0.5, 0.5]));
        solve_collision(&mut soft, &mut sphere, 0.013, &ContactParams::default());

        let (Body::Soft(soft), Body::Rigid(sphere)) = (&soft, &sphere) else {
            unreachable!()
        };
        let center = sphere.position();
        for i in 0..soft.vert_count() {
            let gap = vector::dist(soft.positions(), i, &center, 0) - sphere.radius();
            assert!(gap >= -1e-5, "vertex {i} still inside: {gap}");
        }
        assert!(sphere.velocity()[0] > 0.0, "sphere pushed away from the block");
    }

    #[test]
    fn test_pinned_vertex_pushes_sphere() {
        let mut soft = block([0.0, 0.0, 0.0]);
        for i in 0..soft.vert_count() {
            soft.set_inv_mass(i, 0.0).unwrap();
        }
        let before = soft.positions().to_vec();
        let mut sphere = sphere_at([1.3, 1.0, 1.0]);
        solve_soft_rigid(&mut soft, &mut sphere, 0.013);
        assert_eq!(soft.positions(), before.as_slice());
        // The corner (1, 1, 1) lies 0.3 from the centre; the sphere backs off.
        assert!((sphere.position()[0] - 1.5).abs() < 1e-5);
    }

    #[test]
    fn test_soft_soft_pushes_vertex_out() {
        // Fine enough that the top layer of cells has interior bottom corners.
        let mut a = SoftBody::new(&TetMesh::block(4, 4, 4, 0.25), 0.25, 257).unwrap();
        for i in 0..a.vert_count() {
            a.set_inv_mass(i, 0.0).unwrap();
        }
        // A single tetrahedron with one corner poking through the top face.
        let mut b = SoftBody::new(&TetMesh::tetrahedron(0.4), 0.25, 257).unwrap();
        b.init_location([0.35, 1.2, 0.325]);
        vector::set(&mut b.positions, 0, [0.35, 0.95, 0.325]);
        b.update_hash();

        let mut a = Body::Soft(a);
        let mut b = Body::Soft(b);
        assert!(check_collision(&a, &b));
        solve_collision(&mut a, &mut b, 0.013, &ContactParams::default());

        let corner = vector::get(b.as_soft().unwrap().positions(), 0);
        assert!((corner[1] - 1.0).abs() < 1e-4, "corner not on the top face: {corner:?}");
        assert!((corner[0] - 0.35).abs() < 1e-5 && (corner[2] - 0.325).abs() < 1e-5);
    }

    #[test]
    fn test_soft_rigid_after_translate() {
        let mut soft = Body::Soft(block([0.0, 0.0, 0.0]));
        soft.translate([3.0, 0.0, 0.0]);
        let mut sphere = Body::Rigid(sphere_at([4.3, 0.5, 0.5]));
        assert!(check_collision(&soft, &sphere));
        solve_collision(&mut soft, &mut sphere, 0.013, &ContactParams::default());

        let center = sphere.as_sphere().unwrap().position();
        let soft = soft.as_soft().unwrap();
        for i in 0..soft.vert_count() {
            let gap = vector::dist(soft.positions(), i, &center, 0) - 0.5;
            assert!(gap >= -1e-5, "vertex {i} still inside: {gap}");
        }
    }

    #[test]
    fn test_soft_soft_pinned_face_pushes_vertex_fully() {
        // Only the top face of A is pinned; the vertices below it are free.
        let mut a = SoftBody::new(&TetMesh::block(4, 4, 4, 0.25), 0.25, 257).unwrap();
        for i in 0..a.vert_count() {
            if vector::get(a.positions(), i)[1] > 0.99 {
                a.set_inv_mass(i, 0.0).unwrap();
            }
        }
        let rest = a.positions().to_vec();
        let mut b = SoftBody::new(&TetMesh::tetrahedron(0.4), 0.25, 257).unwrap();
        b.init_location([0.35, 1.2, 0.325]);
        vector::set(&mut b.positions, 0, [0.35, 0.95, 0.325]);
        b.update_hash();

        let mut a = Body::Soft(a);
        let mut b = Body::Soft(b);
        solve_collision(&mut a, &mut b, 0.013, &ContactParams::default());

        let corner = vector::get(b.as_soft().unwrap().positions(), 0);
        assert!((corner[1] - 1.0).abs() < 1e-4, "corner not on the top face: {corner:?}");
        assert_eq!(a.render_positions(), rest.as_slice());
    }

    #[test]
    fn test_rigid_rigid_dispatch() {
        let mut a = Body::Rigid(sphere_at([0.0, 1.0, 0.0]));
        let mut b = Body::Rigid(sphere_at([0.8, 1.0, 0.0]));
        solve_collision(&mut a, &mut b, 0.013, &ContactParams::default());
        let (a, b) = (a.as_sphere().unwrap(), b.as_sphere().unwrap());
        assert!(!a.overlaps(b) || vector::dist(&a.position(), 0, &b.position(), 0) > 0.999);
    }
}
