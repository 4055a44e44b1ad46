//! Flat-array vector kernel.
//!
//! Every function addresses 3-vectors stored as consecutive triples inside a
//! `[f32]` buffer: triple `i` occupies `3 * i .. 3 * i + 3`. Solvers keep their
//! temporaries in small stack arrays (`[f32; 12]` holds four triples) and pass
//! them in explicitly, so the inner loops never allocate.
//!
//! Destination and source buffers are distinct borrows; a function that needs
//! to read and write the same buffer has an `*_assign` form.

/// A single 3-vector.
pub type Vec3 = [f32; 3];

/// Read triple `i`.
#[inline]
#[must_use]
pub fn get(src: &[f32], i: usize) -> Vec3 {
    [src[3 * i], src[3 * i + 1], src[3 * i + 2]]
}

/// Write `v` into triple `i`.
#[inline]
pub fn set(dst: &mut [f32], i: usize, v: Vec3) {
    dst[3 * i] = v[0];
    dst[3 * i + 1] = v[1];
    dst[3 * i + 2] = v[2];
}

/// `dst[i0] = src[i1]`.
#[inline]
pub fn copy(dst: &mut [f32], i0: usize, src: &[f32], i1: usize) {
    dst[3 * i0..3 * i0 + 3].copy_from_slice(&src[3 * i1..3 * i1 + 3]);
}

/// `dst[i0] = a[i1] + b[i2] * scale`.
#[inline]
pub fn add(dst: &mut [f32], i0: usize, a: &[f32], i1: usize, b: &[f32], i2: usize, scale: f32) {
    for k in 0..3 {
        dst[3 * i0 + k] = a[3 * i1 + k] + b[3 * i2 + k] * scale;
    }
}

/// `dst[i0] += src[i1] * scale`.
#[inline]
pub fn add_assign(dst: &mut [f32], i0: usize, src: &[f32], i1: usize, scale: f32) {
    for k in 0..3 {
        dst[3 * i0 + k] += src[3 * i1 + k] * scale;
    }
}

/// `dst[i0] = a[i1] - b[i2]`.
#[inline]
pub fn sub(dst: &mut [f32], i0: usize, a: &[f32], i1: usize, b: &[f32], i2: usize) {
    for k in 0..3 {
        dst[3 * i0 + k] = a[3 * i1 + k] - b[3 * i2 + k];
    }
}

/// `dst[i0] -= src[i1]`.
#[inline]
pub fn sub_assign(dst: &mut [f32], i0: usize, src: &[f32], i1: usize) {
    for k in 0..3 {
        dst[3 * i0 + k] -= src[3 * i1 + k];
    }
}

/// `dst[i0] = a[i1] x b[i2]`.
#[inline]
pub fn cross(dst: &mut [f32], i0: usize, a: &[f32], i1: usize, b: &[f32], i2: usize) {
    let (a, b) = (get(a, i1), get(b, i2));
    set(
        dst,
        i0,
        [
            a[1] * b[2] - a[2] * b[1],
            a[2] * b[0] - a[0] * b[2],
            a[0] * b[1] - a[1] * b[0],
        ],
    );
}

/// `a[i1] . b[i2]`.
#[inline]
#[must_use]
pub fn dot(a: &[f32], i1: usize, b: &[f32], i2: usize) -> f32 {
    a[3 * i1] * b[3 * i2] + a[3 * i1 + 1] * b[3 * i2 + 1] + a[3 * i1 + 2] * b[3 * i2 + 2]
}

/// Squared length of triple `i`.
#[inline]
#[must_use]
pub fn norm_sq(a: &[f32], i: usize) -> f32 {
    dot(a, i, a, i)
}

/// Length of triple `i`.
#[inline]
#[must_use]
pub fn norm(a: &[f32], i: usize) -> f32 {
    norm_sq(a, i).sqrt()
}

/// Squared distance between `a[i1]` and `b[i2]`.
#[inline]
#[must_use]
pub fn dist_sq(a: &[f32], i1: usize, b: &[f32], i2: usize) -> f32 {
    (0..3)
        .map(|k| {
            let d = a[3 * i1 + k] - b[3 * i2 + k];
            d * d
        })
        .sum()
}

/// Distance between `a[i1]` and `b[i2]`.
#[inline]
#[must_use]
pub fn dist(a: &[f32], i1: usize, b: &[f32], i2: usize) -> f32 {
    dist_sq(a, i1, b, i2).sqrt()
}

/// `dst[i] *= s`.
#[inline]
pub fn scale(dst: &mut [f32], i: usize, s: f32) {
    for k in 0..3 {
        dst[3 * i + k] *= s;
    }
}

/// Scale triple `i` to unit length and return its previous length.
///
/// A zero vector is left untouched and `0.0` is returned; callers must check
/// the result before using the triple as a direction.
#[inline]
pub fn normalize(dst: &mut [f32], i: usize) -> f32 {
    let n = norm(dst, i);
    if n != 0.0 {
        scale(dst, i, 1.0 / n);
    }
    n
}

/// Column-major 3x3 matrix.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Mat3 {
    m: [f32; 9],
}

impl Mat3 {
    /// Build a matrix whose columns are `a[i0]`, `b[i1]` and `c[i2]`.
    #[must_use]
    pub fn from_cols(a: &[f32], i0: usize, b: &[f32], i1: usize, c: &[f32], i2: usize) -> Self {
        let mut m = [0.0; 9];
        copy(&mut m, 0, a, i0);
        copy(&mut m, 1, b, i1);
        copy(&mut m, 2, c, i2);
        Self { m }
    }

    /// Determinant.
    #[must_use]
    pub fn determinant(&self) -> f32 {
        let m = &self.m;
        m[0] * (m[4] * m[8] - m[7] * m[5]) - m[3] * (m[1] * m[8] - m[7] * m[2])
            + m[6] * (m[1] * m[5] - m[4] * m[2])
    }

    /// Inverse, or `None` when the determinant is exactly zero.
    #[must_use]
    pub fn inverse(&self) -> Option<Self> {
        let det = self.determinant();
        if det == 0.0 {
            return None;
        }
        let inv = 1.0 / det;
        let m = &self.m;
        Some(Self {
            m: [
                (m[4] * m[8] - m[5] * m[7]) * inv,
                (m[2] * m[7] - m[1] * m[8]) * inv,
                (m[1] * m[5] - m[2] * m[4]) * inv,
                (m[5] * m[6] - m[3] * m[8]) * inv,
                (m[0] * m[8] - m[2] * m[6]) * inv,
                (m[2] * m[3] - m[0] * m[5]) * inv,
                (m[3] * m[7] - m[4] * m[6]) * inv,
                (m[1] * m[6] - m[0] * m[7]) * inv,
                (m[0] * m[4] - m[1] * m[3]) * inv,
            ],
        })
    }

    /// Replace triple `i` of `v` with `self * v[i]`.
    pub fn apply(&self, v: &mut [f32], i: usize) {
        let x = get(v, i);
        let m = &self.m;
        set(
            v,
            i,
            [
                m[0] * x[0] + m[3] * x[1] + m[6] * x[2],
                m[1] * x[0] + m[4] * x[1] + m[7] * x[2],
                m[2] * x[0] + m[5] * x[1] + m[8] * x[2],
            ],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cross_and_dot() {
        let a = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let mut out = [0.0; 3];
        cross(&mut out, 0, &a, 0, &a, 1);
        assert_eq!(out, [0.0, 0.0, 1.0]);
        assert!(dot(&a, 0, &a, 1).abs() < f32::EPSILON);
        assert!((dot(&out, 0, &out, 0) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_add_sub_scale() {
        let a = [1.0, 2.0, 3.0];
        let b = [4.0, 5.0, 6.0];
        let mut out = [0.0; 6];
        add(&mut out, 0, &a, 0, &b, 0, 0.5);
        assert_eq!(get(&out, 0), [3.0, 4.5, 6.0]);
        sub(&mut out, 1, &b, 0, &a, 0);
        assert_eq!(get(&out, 1), [3.0, 3.0, 3.0]);
        add_assign(&mut out, 1, &a, 0, 2.0);
        assert_eq!(get(&out, 1), [5.0, 7.0, 9.0]);
        sub_assign(&mut out, 1, &b, 0);
        assert_eq!(get(&out, 1), [1.0, 2.0, 3.0]);
        scale(&mut out, 1, -1.0);
        assert_eq!(get(&out, 1), [-1.0, -2.0, -3.0]);
    }

    #[test]
    fn test_normalize_zero_is_reported() {
        let mut zero = [0.0; 3];
        assert!(normalize(&mut zero, 0).abs() < f32::EPSILON);
        assert!(zero.iter().all(|c| c.is_finite()));

        let mut v = [3.0, 0.0, 4.0];
        assert!((normalize(&mut v, 0) - 5.0).abs() < 1e-6);
        assert!((norm(&v, 0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_distance() {
        let a = [0.0, 0.0, 0.0, 3.0, 4.0, 0.0];
        assert!((dist(&a, 0, &a, 1) - 5.0).abs() < 1e-6);
        assert!((dist_sq(&a, 0, &a, 1) - 25.0).abs() < 1e-5);
    }

    #[test]
    fn test_matrix_inverse_roundtrip() {
        let cols = [2.0, 0.0, 1.0, 1.0, 3.0, 0.0, 0.0, 1.0, 4.0];
        let m = Mat3::from_cols(&cols, 0, &cols, 1, &cols, 2);
        let inv = m.inverse().expect("matrix is regular");
        let mut v = [1.0, -2.0, 0.5];
        m.apply(&mut v, 0);
        inv.apply(&mut v, 0);
        assert!((v[0] - 1.0).abs() < 1e-5);
        assert!((v[1] + 2.0).abs() < 1e-5);
        assert!((v[2] - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_singular_matrix_has_no_inverse() {
        let cols = [1.0, 2.0, 3.0, 2.0, 4.0, 6.0, 0.0, 1.0, 0.0];
        let m = Mat3::from_cols(&cols, 0, &cols, 1, &cols, 2);
        assert!(m.determinant().abs() < f32::EPSILON);
        assert!(m.inverse().is_none());
    }
}
