//! Linear estimation of a 4x4 space homography and the plane at infinity.

use anyhow::Result;
use autocal_core::{eigen_decompose, Mat4, Real, Vec4};
use nalgebra::DMatrix;

use crate::math::svd_null_vector;

/// Row pattern of the six independent antisymmetric 4x4 selectors: for the
/// selector indexed by `(c1, c2)`, the constraint `yᵀ H_k H x = 0` couples
/// `y[lut[r][0]]` with block `c1` and `y[lut[r][1]]` with block `c2`.
const SELECTOR_LUT: [[usize; 2]; 6] = [[1, 0], [2, 0], [3, 0], [2, 1], [3, 1], [3, 2]];

/// Estimate the 4x4 homography `H` relating two sets of homogeneous 3D
/// points, `y ~ H x`.
///
/// Every correspondence contributes six equations (one per antisymmetric
/// selector) on the sixteen entries of `H`. All rows are normalized to
/// unit length before the SVD null-vector solve, and the result is scaled
/// so that `|det(H)| = 1`.
pub fn find_homography_linear(xyzw1: &[Vec4], xyzw2: &[Vec4]) -> Result<Mat4> {
    let n = xyzw1.len();
    if n != xyzw2.len() {
        anyhow::bail!(
            "mismatched number of points: {} vs {}",
            xyzw1.len(),
            xyzw2.len()
        );
    }
    if n < 3 {
        anyhow::bail!("need at least 3 correspondences, got {n}");
    }

    let mut a = DMatrix::<Real>::zeros(6 * n, 16);

    for (p, (x, y)) in xyzw1.iter().zip(xyzw2.iter()).enumerate() {
        let mut r = 0;
        for c1 in 0..3 {
            for c2 in (c1 + 1)..4 {
                for i in 0..4 {
                    a[(6 * p + r, 4 * c1 + i)] = -x[i] * y[SELECTOR_LUT[r][0]];
                    a[(6 * p + r, 4 * c2 + i)] = x[i] * y[SELECTOR_LUT[r][1]];
                }
                r += 1;
            }
        }
    }

    for i in 0..a.nrows() {
        let norm = a.row(i).norm();
        if norm > Real::EPSILON {
            for j in 0..a.ncols() {
                a[(i, j)] /= norm;
            }
        }
    }

    let h_vec = svd_null_vector(&a)?;
    let h = Mat4::from_row_slice(h_vec.as_slice());

    let det = h.determinant();
    if det.abs() < 1e-15 {
        anyhow::bail!("degenerate homography (zero determinant)");
    }
    Ok(h / det.abs().powf(0.25))
}

/// Extract the plane at infinity from a space homography.
///
/// The plane at infinity is the real eigenvector of `Hᵀ`; it is selected
/// as the eigenvector whose eigenvalue has the smallest absolute
/// imaginary component.
pub fn plane_at_infinity(h: &Mat4) -> Result<Vec4> {
    let ht = h.transpose();
    let ht_dyn = DMatrix::<Real>::from_iterator(4, 4, ht.iter().copied());

    let (vals, vecs) =
        eigen_decompose(&ht_dyn).ok_or_else(|| anyhow::anyhow!("eigen-decomposition failed"))?;

    let mut best = 0;
    for i in 1..4 {
        if vals[i].im.abs() < vals[best].im.abs() {
            best = i;
        }
    }

    let col = vecs.column(best);
    Ok(Vec4::new(col[0].re, col[1].re, col[2].re, col[3].re))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_det(h: Mat4) -> Mat4 {
        let det = h.determinant();
        h / det.abs().powf(0.25)
    }

    #[test]
    fn homography_roundtrip() {
        let h_gt = unit_det(Mat4::new(
            1.0, 0.2, -0.1, 0.4, //
            -0.3, 1.1, 0.05, -0.2, //
            0.1, -0.15, 0.9, 0.3, //
            0.02, 0.04, -0.03, 1.2,
        ));

        let mut x = Vec::new();
        for i in 0..6 {
            let s = i as Real;
            x.push(Vec4::new(
                0.3 * s - 1.0,
                (0.4 * s).sin(),
                0.2 * s * s - 0.5,
                1.0,
            ));
        }
        let y: Vec<Vec4> = x.iter().map(|p| h_gt * p).collect();

        let h_est = find_homography_linear(&x, &y).unwrap();

        assert!((h_est.determinant().abs() - 1.0).abs() < 1e-9);

        // Fix the global sign before comparing.
        let sign = if (h_est[(0, 0)] * h_gt[(0, 0)]) < 0.0 {
            -1.0
        } else {
            1.0
        };
        let diff = (h_est * sign - h_gt).norm() / h_gt.norm();
        assert!(diff < 1e-8, "H mismatch: {diff}\n{h_est}");
    }

    #[test]
    fn plane_at_infinity_is_eigenvector() {
        let h = Mat4::new(
            0.9, 0.1, 0.0, 0.2, //
            -0.1, 0.9, 0.1, -0.3, //
            0.05, -0.1, 1.1, 0.1, //
            0.0, 0.0, 0.0, 1.0,
        );

        let pinf = plane_at_infinity(&h).unwrap();
        assert!(pinf.norm() > 1e-6);

        // Rayleigh quotient gives the eigenvalue; the residual must vanish.
        let ht = h.transpose();
        let lambda = pinf.dot(&(ht * pinf)) / pinf.dot(&pinf);
        let residual = (ht * pinf - lambda * pinf).norm() / pinf.norm();
        assert!(residual < 1e-6, "not an eigenvector, residual {residual}");
    }

    #[test]
    fn too_few_points_are_rejected() {
        let pts = vec![Vec4::new(0.0, 0.0, 0.0, 1.0), Vec4::new(1.0, 0.0, 0.0, 1.0)];
        assert!(find_homography_linear(&pts, &pts).is_err());
    }
}
