//! Uniform-grid spatial hash over a flat point buffer.
//!
//! The table is rebuilt from scratch by [`SpatialHash::update`] with a counting
//! sort: after an update, `particle_table[count_table[b]..count_table[b + 1]]`
//! lists the points whose cell hashes to bucket `b`. Queries reflect the
//! positions seen by the last update only.

use bitvec::vec::BitVec;
use tracing::debug;

use crate::error::{ensure, Result};
use crate::vector::{self, Vec3};

const PRIME_X: i32 = 92_837_111;
const PRIME_Y: i32 = 689_287_499;
const PRIME_Z: i32 = 283_923_481;

/// Spatial hash for proximity queries on a point set.
#[derive(Clone, Debug)]
pub struct SpatialHash {
    spacing: f32,
    table_size: usize,
    /// Bucket start offsets, `table_size + 1` entries.
    count_table: Vec<usize>,
    /// Point indices grouped by bucket.
    particle_table: Vec<usize>,
    /// Buckets visited by the running query, in visit order.
    visited: Vec<usize>,
    /// Membership flags for `visited`, all clear between queries.
    visited_flags: BitVec,
}

impl SpatialHash {
    /// Create a hash with cell size `spacing` and `table_size` buckets for
    /// `num_points` points.
    ///
    /// # Errors
    /// Returns an error if `spacing` is not positive or `table_size` is zero.
    pub fn new(spacing: f32, table_size: usize, num_points: usize) -> Result<Self> {
        ensure(spacing > 0.0 && spacing.is_finite(), "hash_spacing", "must be positive")?;
        ensure(table_size > 0, "hash_table_size", "must be at least 1")?;
        Ok(Self {
            spacing,
            table_size,
            count_table: vec![0; table_size + 1],
            particle_table: vec![0; num_points],
            visited: Vec::new(),
            visited_flags: BitVec::repeat(false, table_size),
        })
    }

    /// Cell size.
    #[must_use]
    pub fn spacing(&self) -> f32 {
        self.spacing
    }

    /// Number of buckets.
    #[must_use]
    pub fn table_size(&self) -> usize {
        self.table_size
    }

    /// Number of points covered by the last update.
    #[must_use]
    pub fn len(&self) -> usize {
        self.particle_table.len()
    }

    /// Whether the hash holds no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.particle_table.is_empty()
    }

    /// Integer cell coordinate of a continuous coordinate.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn cell(&self, coordinate: f32) -> i32 {
        (coordinate / self.spacing).floor() as i32
    }

    /// Bucket of an integer cell, using wrapping signed 32-bit arithmetic.
    #[must_use]
    pub fn hash(&self, x: i32, y: i32, z: i32) -> usize {
        let h = x.wrapping_mul(PRIME_X) ^ y.wrapping_mul(PRIME_Y) ^ z.wrapping_mul(PRIME_Z);
        h.unsigned_abs() as usize % self.table_size
    }

    fn hash_point(&self, positions: &[f32], i: usize) -> usize {
        let p = vector::get(positions, i);
        self.hash(self.cell(p[0]), self.cell(p[1]), self.cell(p[2]))
    }

    /// Rebuild the table from `positions` (3 floats per point).
    pub fn update(&mut self, positions: &[f32]) {
        let num_points = positions.len() / 3;
        if self.particle_table.len() != num_points {
            debug!(
                from = self.particle_table.len(),
                to = num_points,
                "Resizing spatial hash"
            );
            self.particle_table.resize(num_points, 0);
        }

        self.count_table.fill(0);
        for i in 0..num_points {
            let b = self.hash_point(positions, i);
            self.count_table[b] += 1;
        }
        for b in 0..self.table_size {
            self.count_table[b + 1] += self.count_table[b];
        }
        for i in 0..num_points {
            let b = self.hash_point(positions, i);
            self.count_table[b] -= 1;
            self.particle_table[self.count_table[b]] = i;
        }
    }

    /// Collect into `out` every point whose cell lies in the box of cells
    /// covering `point ± radius` on each axis.
    ///
    /// The result is a superset of the points within `radius`: callers must
    /// apply their own exact distance test. Each point is reported at most
    /// once. `out` is cleared first.
    pub fn query(&mut self, point: Vec3, radius: f32, out: &mut Vec<usize>) {
        out.clear();
        let lo = [
            self.cell(point[0] - radius),
            self.cell(point[1] - radius),
            self.cell(point[2] - radius),
        ];
        let hi = [
            self.cell(point[0] + radius),
            self.cell(point[1] + radius),
            self.cell(point[2] + radius),
        ];

        let cells = (0..3)
            .map(|k| (i64::from(hi[k]) - i64::from(lo[k]) + 1).max(0))
            .product::<i64>();
        if usize::try_from(cells).map_or(true, |c| c >= self.table_size) {
            // The box touches every bucket anyway.
            out.extend_from_slice(&self.particle_table);
            return;
        }

        self.visited.clear();
        for x in lo[0]..=hi[0] {
            for y in lo[1]..=hi[1] {
                for z in lo[2]..=hi[2] {
                    let b = self.hash(x, y, z);
                    if self.visited_flags[b] {
                        continue;
                    }
                    self.visited_flags.set(b, true);
                    self.visited.push(b);
                    let (begin, end) = (self.count_table[b], self.count_table[b + 1]);
                    out.extend_from_slice(&self.particle_table[begin..end]);
                }
            }
        }
        for &b in &self.visited {
            self.visited_flags.set(b, false);
        }
    }
}
