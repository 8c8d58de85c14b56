//! Linear autocalibration of a rotating camera.
//!
//! For a camera rotating about its center with fixed intrinsics, every
//! inter-view homography has the form `H = K R K⁻¹` up to scale. After
//! normalizing `det(H) = ±1`, the constraint `H W Hᵀ = W` on the dual
//! image of the absolute conic `W = K Kᵀ` (resp. `Hᵀ Ω H = Ω` on the
//! image of the absolute conic `Ω = W⁻¹`) is linear in the unknown conic
//! entries. Stacking six equations per homography gives an overdetermined
//! system solved by SVD; the calibration matrix is then peeled off the
//! conic by a triangular decomposition.

use anyhow::Result;
use autocal_core::{decompose_cholesky, decompose_uut, HomographiesP2, Mat3, Real};
use log::debug;
use nalgebra::{DMatrix, DVector};

/// Scale `H` so that `det(H) = ±1`, preserving the determinant sign.
fn normalize_homography(h: &Mat3) -> Mat3 {
    let det = h.determinant();
    let norm = det.abs().powf(1.0 / 3.0) * if det < 0.0 { -1.0 } else { 1.0 };
    h / norm
}

/// Column of the unknown vector holding conic entry `(r1, r2)`; the
/// `(2, 2)` entry is pinned to 1 and lives on the right-hand side.
const DIAC_LUT: [[Option<usize>; 3]; 3] = [
    [Some(0), Some(1), Some(2)],
    [None, Some(3), Some(4)],
    [None, None, None],
];

const IAC_LUT: [[Option<usize>; 3]; 3] = [
    [Some(0), None, Some(1)],
    [None, Some(2), Some(3)],
    [None, None, None],
];

fn solve_least_squares(a: &DMatrix<Real>, b: &DVector<Real>) -> Result<(DVector<Real>, Real)> {
    let svd = a.clone().svd(true, true);
    let x: DVector<Real> = svd
        .solve(b, 1e-12)
        .map_err(|e| anyhow::anyhow!("SVD solve failed: {e}"))?;

    let err = a * &x - b;
    let residual = (err.dot(&err) / b.dot(b)).sqrt();
    debug!("rotational calibration: |A x - b| / |b| = {residual:.3e}");
    Ok((x, residual))
}

/// Linear autocalibration of a rotating camera, full five-parameter model.
///
/// `hs` maps view pairs `(i, j)` to homographies `H_ij = K R_ij K⁻¹` (up
/// to scale). Returns the recovered `K` together with the relative
/// least-squares residual `|A x - b| / |b|`.
///
/// Fails when no homography is given or when the recovered dual conic is
/// not positive definite.
pub fn calibrate_rotational_camera(hs: &HomographiesP2) -> Result<(Mat3, Real)> {
    if hs.is_empty() {
        anyhow::bail!("Need at least one homography");
    }

    let hs_normed: Vec<Mat3> = hs.values().map(normalize_homography).collect();

    let num = hs_normed.len();
    let mut a = DMatrix::<Real>::zeros(6 * num, 5);
    let mut b = DVector::<Real>::zeros(6 * num);

    // Six equations per homography: (H W Hᵀ)(r1, r2) = W(r1, r2) for the
    // upper triangle, with W(2, 2) = 1 moved to the right-hand side.
    let mut eq = 0;
    for h in &hs_normed {
        for r1 in 0..3 {
            for r2 in r1..3 {
                a[(eq, 0)] = h[(r1, 0)] * h[(r2, 0)];
                a[(eq, 1)] = h[(r1, 0)] * h[(r2, 1)] + h[(r1, 1)] * h[(r2, 0)];
                a[(eq, 2)] = h[(r1, 0)] * h[(r2, 2)] + h[(r1, 2)] * h[(r2, 0)];
                a[(eq, 3)] = h[(r1, 1)] * h[(r2, 1)];
                a[(eq, 4)] = h[(r1, 1)] * h[(r2, 2)] + h[(r1, 2)] * h[(r2, 1)];
                if r1 == 2 && r2 == 2 {
                    b[eq] = 1.0 - h[(r1, 2)] * h[(r2, 2)];
                } else {
                    let col = DIAC_LUT[r1][r2].expect("upper-triangle entry");
                    a[(eq, col)] -= 1.0;
                    b[eq] = -h[(r1, 2)] * h[(r2, 2)];
                }
                eq += 1;
            }
        }
    }

    let (x, residual) = solve_least_squares(&a, &b)?;

    // Dual image of the absolute conic, W = K Kᵀ.
    let mut diac = Mat3::identity();
    diac[(0, 0)] = x[0];
    diac[(0, 1)] = x[1];
    diac[(1, 0)] = x[1];
    diac[(0, 2)] = x[2];
    diac[(2, 0)] = x[2];
    diac[(1, 1)] = x[3];
    diac[(1, 2)] = x[4];
    diac[(2, 1)] = x[4];

    debug!(
        "DIAC = {diac:.6}, eigenvalues = {:?}",
        diac.symmetric_eigenvalues().as_slice()
    );

    let k = decompose_uut(&diac).ok_or_else(|| anyhow::anyhow!("DIAC isn't positive definite"))?;
    Ok((k, residual))
}

/// Linear autocalibration of a rotating camera under the zero-skew model.
///
/// Works on the transposed normalized homographies and parameterizes the
/// image of the absolute conic `Ω = (K Kᵀ)⁻¹`, whose `(0, 1)` entry is
/// identically zero without skew. Returns `K` and the relative residual.
pub fn calibrate_rotational_camera_no_skew(hs: &HomographiesP2) -> Result<(Mat3, Real)> {
    if hs.is_empty() {
        anyhow::bail!("Need at least one homography");
    }

    let hs_normed_t: Vec<Mat3> = hs
        .values()
        .map(|h| normalize_homography(h).transpose())
        .collect();

    let num = hs_normed_t.len();
    let mut a = DMatrix::<Real>::zeros(6 * num, 4);
    let mut b = DVector::<Real>::zeros(6 * num);

    let mut eq = 0;
    for ht in &hs_normed_t {
        for r1 in 0..3 {
            for r2 in r1..3 {
                a[(eq, 0)] = ht[(r1, 0)] * ht[(r2, 0)];
                a[(eq, 1)] = ht[(r1, 0)] * ht[(r2, 2)] + ht[(r1, 2)] * ht[(r2, 0)];
                a[(eq, 2)] = ht[(r1, 1)] * ht[(r2, 1)];
                a[(eq, 3)] = ht[(r1, 1)] * ht[(r2, 2)] + ht[(r1, 2)] * ht[(r2, 1)];
                if r1 == 2 && r2 == 2 {
                    b[eq] = 1.0 - ht[(r1, 2)] * ht[(r2, 2)];
                } else if r1 == 0 && r2 == 1 {
                    // Ω(0, 1) = 0 is hard: no coefficient decrement here.
                    b[eq] = -ht[(r1, 2)] * ht[(r2, 2)];
                } else {
                    let col = IAC_LUT[r1][r2].expect("upper-triangle entry");
                    a[(eq, col)] -= 1.0;
                    b[eq] = -ht[(r1, 2)] * ht[(r2, 2)];
                }
                eq += 1;
            }
        }
    }

    let (x, residual) = solve_least_squares(&a, &b)?;

    // Image of the absolute conic, Ω = (K Kᵀ)⁻¹.
    let mut iac = Mat3::identity();
    iac[(0, 0)] = x[0];
    iac[(0, 2)] = x[1];
    iac[(2, 0)] = x[1];
    iac[(1, 1)] = x[2];
    iac[(1, 2)] = x[3];
    iac[(2, 1)] = x[3];

    debug!(
        "IAC = {iac:.6}, eigenvalues = {:?}",
        iac.symmetric_eigenvalues().as_slice()
    );

    // Ω = K⁻ᵀ K⁻¹, so the lower Cholesky factor is K⁻ᵀ itself.
    let k_inv_t =
        decompose_cholesky(&iac).ok_or_else(|| anyhow::anyhow!("IAC isn't positive definite"))?;
    let k_t = k_inv_t
        .try_inverse()
        .ok_or_else(|| anyhow::anyhow!("IAC factor is singular"))?;
    let mut k = k_t.transpose();
    k /= k[(2, 2)];

    Ok((k, residual))
}
