//! Conditioning and SVD helpers shared by the linear solvers.

use anyhow::Result;
use autocal_core::{Mat3, Pt2, Real};
use nalgebra::{DMatrix, DVector};

/// Isotropic conditioning transform for a 2D point cloud.
///
/// Maps the centroid to the origin and scales so that the mean distance
/// from it is `√2`. A single point (or a fully coincident cloud) gets unit
/// scale: the translation alone is the only meaningful conditioning then.
///
/// The returned matrix is the affine
/// `{{s, 0, -s*cx}, {0, s, -s*cy}, {0, 0, 1}}`.
pub fn normalization_mat(points: &[Pt2]) -> Mat3 {
    assert!(!points.is_empty(), "normalization of an empty point set");

    let n = points.len() as Real;
    let mut cx = 0.0;
    let mut cy = 0.0;
    for p in points {
        cx += p.x;
        cy += p.y;
    }
    cx /= n;
    cy /= n;

    let mut mean_dist = 0.0;
    for p in points {
        let dx = p.x - cx;
        let dy = p.y - cy;
        mean_dist += (dx * dx + dy * dy).sqrt();
    }
    mean_dist /= n;

    let scale = if points.len() > 1 && mean_dist > Real::EPSILON {
        (2.0_f64).sqrt() / mean_dist
    } else {
        1.0
    };

    Mat3::new(
        scale,
        0.0,
        -scale * cx,
        0.0,
        scale,
        -scale * cy,
        0.0,
        0.0,
        1.0,
    )
}

/// Null vector of `A` (the right singular vector of least singular value).
///
/// Pads `A` with zero rows when it has fewer rows than columns, so that
/// the full `V^T` is available from the SVD.
pub(crate) fn svd_null_vector(a: &DMatrix<Real>) -> Result<DVector<Real>> {
    let mut work = a.clone();
    if work.nrows() < work.ncols() {
        let (rows, cols) = (work.nrows(), work.ncols());
        let mut padded = DMatrix::<Real>::zeros(cols, cols);
        padded.view_mut((0, 0), (rows, cols)).copy_from(&work);
        work = padded;
    }

    let svd = work.svd(false, true);
    let v_t = svd.v_t.ok_or_else(|| anyhow::anyhow!("SVD failed"))?;
    Ok(v_t.row(v_t.nrows() - 1).transpose())
}
