//! Common data structures and utilities shared by the mesh loaders and bodies.

use std::collections::HashSet;
use std::hash::Hash;

use tracing::{debug, warn};

use crate::vector::{self, Vec3};

/// Remove duplicates from `items`, keeping the first occurrence in order.
///
/// Two items are duplicates when `key` maps them to the same value, which
/// lets unordered index tuples (edges, tetrahedra) compare by their sorted
/// form.
#[tracing::instrument(skip(items, key), fields(original_count = items.len()))]
pub fn dedup_with_warning<T, K, F>(items: Vec<T>, key: F, item_name: &str) -> Vec<T>
where
    K: Hash + Eq,
    F: Fn(&T) -> K,
{
    let original_count = items.len();
    let mut seen = HashSet::with_capacity(original_count);
    let deduped: Vec<T> = items.into_iter().filter(|item| seen.insert(key(item))).collect();

    let duplicate_count = original_count - deduped.len();
    if duplicate_count > 0 {
        warn!("Found {} duplicate {} entries", duplicate_count, item_name);
    } else {
        debug!("No duplicate {} entries found", item_name);
    }

    deduped
}

/// Sorted copy of an index tuple, used as an order-independent key.
#[must_use]
pub fn sorted_key<const N: usize>(mut ids: [u32; N]) -> [u32; N] {
    ids.sort_unstable();
    ids
}

/// Signed volume of the tetrahedron `ids` over a flat position buffer.
///
/// Positive when `(x1 - x0) x (x2 - x0)` points towards `x3`.
#[must_use]
pub fn tet_volume(positions: &[f32], ids: [usize; 4]) -> f32 {
    let mut seg = [0.0; 9];
    for j in 0..3 {
        vector::sub(&mut seg, j, positions, ids[j + 1], positions, ids[0]);
    }
    let mut n = [0.0; 3];
    vector::cross(&mut n, 0, &seg, 0, &seg, 1);
    vector::dot(&n, 0, &seg, 2) / 6.0
}

/// Rigid placement and extent of anything made of points: flat position
/// buffers, bodies and whole [`Body`](crate::Body) values.
pub trait Spatial {
    /// Translate all points by a vector.
    fn translate(&mut self, by: Vec3);

    /// Get bounding box of the points as (min, max) corners.
    fn bounding_box(&self) -> (Vec3, Vec3);
}

impl Spatial for [f32] {
    fn translate(&mut self, by: Vec3) {
        for i in 0..self.len() / 3 {
            vector::add_assign(self, i, &by, 0, 1.0);
        }
    }

    fn bounding_box(&self) -> (Vec3, Vec3) {
        if self.len() < 3 {
            return ([0.0; 3], [0.0; 3]);
        }

        let mut min = [f32::INFINITY; 3];
        let mut max = [f32::NEG_INFINITY; 3];

        for p in self.chunks_exact(3) {
            for k in 0..3 {
                min[k] = min[k].min(p[k]);
                max[k] = max[k].max(p[k]);
            }
        }

        (min, max)
    }
}

/// Whether two axis-aligned boxes overlap (touching counts).
#[must_use]
pub fn boxes_overlap(a: (Vec3, Vec3), b: (Vec3, Vec3)) -> bool {
    (0..3).all(|k| a.0[k] <= b.1[k] && b.0[k] <= a.1[k])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spatial_translate() {
        let mut positions = vec![0.0, 0.0, 0.0, 1.0, 2.0, 3.0];
        positions.translate([10.0, 20.0, 30.0]);
        assert_eq!(positions, vec![10.0, 20.0, 30.0, 11.0, 22.0, 33.0]);
    }

    #[test]
    fn test_spatial_bounding_box() {
        let positions = [-1.0, -2.0, -3.0, 4.0, 5.0, 6.0, 2.0, 1.0, 0.0];
        let (min, max) = positions.bounding_box();
        assert_eq!(min, [-1.0, -2.0, -3.0]);
        assert_eq!(max, [4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_spatial_bounding_box_empty() {
        let positions: Vec<f32> = vec![];
        assert_eq!(positions.bounding_box(), ([0.0; 3], [0.0; 3]));
    }

    #[test]
    fn test_dedup_keeps_first_in_order() {
        let edges = vec![[0u32, 1], [2, 3], [1, 0], [3, 2], [1, 2]];
        let deduped = dedup_with_warning(edges, |e| sorted_key(*e), "edge");
        assert_eq!(deduped, vec![[0, 1], [2, 3], [1, 2]]);
    }

    #[test]
    fn test_unit_tet_volume() {
        let positions = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];
        assert!((tet_volume(&positions, [0, 1, 2, 3]) - 1.0 / 6.0).abs() < 1e-6);
        assert!((tet_volume(&positions, [1, 0, 2, 3]) + 1.0 / 6.0).abs() < 1e-6);
    }

    #[test]
    fn test_boxes_overlap() {
        let a = ([0.0; 3], [1.0; 3]);
        let b = ([0.5; 3], [2.0; 3]);
        let c = ([1.5; 3], [2.0; 3]);
        assert!(boxes_overlap(a, b));
        assert!(!boxes_overlap(a, c));
    }
}
