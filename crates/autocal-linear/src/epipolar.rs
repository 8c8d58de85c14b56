//! Camera recovery from a fundamental matrix.

use anyhow::Result;
use autocal_core::{cross_product_mat, Mat3, Mat34, Real, Vec3};
use nalgebra::DMatrix;

use crate::math::svd_null_vector;

/// Canonical second camera of the pair `(I | 0)`, `P'` for a fundamental
/// matrix `F`.
///
/// The epipole `e'` is the right null vector of `Fᵀ`, and
/// `P' = [ [e']x F / ‖[e']x F‖ | e' ]`.
pub fn camera_from_fundamental(f: &Mat3) -> Result<Mat34> {
    let ft = DMatrix::<Real>::from_iterator(3, 3, f.transpose().iter().copied());
    let e = svd_null_vector(&ft)?;
    let epipole = Vec3::new(e[0], e[1], e[2]);

    let mut a = cross_product_mat(&epipole) * f;
    let norm = a.norm();
    if norm < 1e-15 {
        anyhow::bail!("degenerate fundamental matrix");
    }
    a /= norm;

    let mut p = Mat34::zeros();
    p.fixed_view_mut::<3, 3>(0, 0).copy_from(&a);
    p.set_column(3, &epipole);
    Ok(p)
}
