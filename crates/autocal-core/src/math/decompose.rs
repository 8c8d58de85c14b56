//! Small matrix decompositions used by the autocalibration solvers.
//!
//! The conic extracted by the linear calibrators is symmetric positive
//! definite; [`decompose_uut`] and [`decompose_cholesky`] turn it back into
//! an (upper or lower) triangular factor. Both return `None` when the input
//! is not positive definite, which callers treat as a numeric failure.

use nalgebra::{Complex, DMatrix, DVector, Scalar, Schur};
use num_traits::{One, Zero};

use super::{Mat3, Real, Vec3};

/// The `n×n` matrix with ones on the antidiagonal `(i, n-1-i)`.
///
/// It is its own inverse; multiplying by it flips a triangular matrix
/// between upper and lower form.
pub fn antidiag<S: Scalar + Zero + One>(n: usize) -> DMatrix<S> {
    let mut dst = DMatrix::<S>::zeros(n, n);
    for i in 0..n {
        dst[(i, n - 1 - i)] = S::one();
    }
    dst
}

/// Cholesky factor of a symmetric positive definite matrix.
///
/// Returns the lower-triangular `L` with `L * L.transpose() == m`, or
/// `None` when `m` is not positive definite.
pub fn decompose_cholesky(m: &Mat3) -> Option<Mat3> {
    nalgebra::Cholesky::new(*m).map(|chol| chol.l())
}

/// Decompose a symmetric positive definite `m = U * U.transpose()` with
/// `U` upper-triangular (the DIAC form of the calibration matrix).
///
/// Computed as `J * chol(J * m * J) * J` with `J` the antidiagonal flip.
/// Returns `None` when the flipped matrix is not positive definite.
pub fn decompose_uut(m: &Mat3) -> Option<Mat3> {
    let j: Mat3 = antidiag::<Real>(3).fixed_view::<3, 3>(0, 0).into_owned();
    let l = decompose_cholesky(&(j * m * j))?;
    Some(j * l * j)
}

/// The skew-symmetric cross-product matrix `[v]x` with `[v]x * w == v × w`.
pub fn cross_product_mat(v: &Vec3) -> Mat3 {
    Mat3::new(0.0, -v.z, v.y, v.z, 0.0, -v.x, -v.y, v.x, 0.0)
}

/// General (non-symmetric) eigen-decomposition of a square real matrix.
///
/// Eigenvalues come from the Schur form; each right eigenvector is the
/// null vector of `m - λI`, solved over the reals when `λ` is real and
/// over the complex numbers otherwise. Eigenvectors are returned as the
/// columns of the second element, in eigenvalue order.
///
/// Returns `None` when an SVD fails to produce the nullspace.
pub fn eigen_decompose(
    m: &DMatrix<Real>,
) -> Option<(Vec<Complex<Real>>, DMatrix<Complex<Real>>)> {
    assert_eq!(m.nrows(), m.ncols(), "eigen_decompose needs a square matrix");
    let n = m.nrows();

    let schur = Schur::new(m.clone());
    let eigvals = schur.complex_eigenvalues();

    let mut eigvecs = DMatrix::<Complex<Real>>::zeros(n, n);
    for (k, lambda) in eigvals.iter().enumerate() {
        let v: DVector<Complex<Real>> = if lambda.im.abs() < 1e-12 {
            let mut shifted = m.clone();
            for i in 0..n {
                shifted[(i, i)] -= lambda.re;
            }
            let svd = shifted.svd(false, true);
            let v_t = svd.v_t?;
            DVector::from_iterator(n, v_t.row(n - 1).iter().map(|&x| Complex::new(x, 0.0)))
        } else {
            let mut shifted = DMatrix::<Complex<Real>>::from_iterator(
                n,
                n,
                m.iter().map(|&x| Complex::new(x, 0.0)),
            );
            for i in 0..n {
                shifted[(i, i)] -= lambda;
            }
            let svd = shifted.svd(false, true);
            let v_t = svd.v_t?;
            // Rows of `v_t` are the adjoints of the right singular vectors.
            DVector::from_iterator(n, v_t.row(n - 1).iter().map(|c| c.conj()))
        };
        eigvecs.set_column(k, &v);
    }

    Some((eigvals.iter().copied().collect(), eigvecs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec3;

    #[test]
    fn antidiag_square_is_unit() {
        let a = antidiag::<Real>(3);
        assert_eq!(a[(0, 2)], 1.0);
        assert_eq!(a[(1, 1)], 1.0);
        assert_eq!(a[(2, 0)], 1.0);
        assert_eq!(a[(0, 0)], 0.0);

        let prod = &a * &a;
        let eye = DMatrix::<Real>::identity(3, 3);
        assert!((prod - eye).norm() < 1e-6);
    }

    #[test]
    fn cholesky_roundtrip_small_matrix() {
        let l = Mat3::new(1.0, 0.0, 0.0, 2.0, 3.0, 0.0, 4.0, 5.0, 6.0);
        let dst = decompose_cholesky(&(l * l.transpose())).expect("positive definite");
        assert!((dst - l).abs().max() < 1e-6, "factor mismatch: {}", dst);
    }

    #[test]
    fn cholesky_rejects_negative_definite() {
        let l = Mat3::new(1.0, 0.0, 0.0, 2.0, 3.0, 0.0, 4.0, 5.0, 6.0);
        assert!(decompose_cholesky(&(-(l * l.transpose()))).is_none());
    }

    #[test]
    fn uut_roundtrip_small_matrix() {
        let u = Mat3::new(1.0, 2.0, 3.0, 0.0, 4.0, 5.0, 0.0, 0.0, 6.0);
        let dst = decompose_uut(&(u * u.transpose())).expect("positive definite");
        assert!((dst - u).abs().max() < 1e-3, "factor mismatch: {}", dst);
    }

    #[test]
    fn cross_product_mat_matches_cross() {
        let v = Vec3::new(0.3, -1.2, 2.5);
        let w = Vec3::new(-0.7, 0.4, 1.1);
        let diff = cross_product_mat(&v) * w - v.cross(&w);
        assert!(diff.norm() < 1e-12);
    }

    #[test]
    fn eigen_decompose_diagonal() {
        let m = DMatrix::<Real>::from_diagonal(&DVector::from_row_slice(&[2.0, 5.0, 3.0]));
        let (vals, vecs) = eigen_decompose(&m).unwrap();

        let mut re: Vec<Real> = vals.iter().map(|v| v.re).collect();
        re.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert!((re[0] - 2.0).abs() < 1e-9);
        assert!((re[1] - 3.0).abs() < 1e-9);
        assert!((re[2] - 5.0).abs() < 1e-9);

        // Each returned column must satisfy m v = λ v.
        for (k, lambda) in vals.iter().enumerate() {
            let v = vecs.column(k).into_owned();
            let mc = DMatrix::<Complex<Real>>::from_iterator(
                3,
                3,
                m.iter().map(|&x| Complex::new(x, 0.0)),
            );
            let diff = &mc * &v - v.map(|c| c * lambda);
            assert!(diff.norm() < 1e-8);
        }
    }

    #[test]
    fn eigen_decompose_planar_rotation_is_complex() {
        let m = DMatrix::<Real>::from_row_slice(2, 2, &[0.0, -1.0, 1.0, 0.0]);
        let (vals, vecs) = eigen_decompose(&m).unwrap();

        for (k, lambda) in vals.iter().enumerate() {
            assert!((lambda.im.abs() - 1.0).abs() < 1e-9);
            let v = vecs.column(k).into_owned();
            let mc = DMatrix::<Complex<Real>>::from_iterator(
                2,
                2,
                m.iter().map(|&x| Complex::new(x, 0.0)),
            );
            let diff = &mc * &v - v.map(|c| c * lambda);
            assert!(diff.norm() < 1e-8);
        }
    }
}
