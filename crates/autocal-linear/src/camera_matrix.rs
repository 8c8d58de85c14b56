//! RQ factorization of projective camera matrices.

use anyhow::Result;
use autocal_core::{Mat3, Mat34, RigidCamera, Vec3};

/// RQ decomposition of a 3x3 matrix.
///
/// Returns `(K, R)` with `K` upper-triangular (positive diagonal) and `R`
/// orthonormal, via QR of the antidiagonally flipped transpose.
pub fn rq_decompose(m: &Mat3) -> (Mat3, Mat3) {
    let j = Mat3::new(0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0);

    let m1 = j * m.transpose() * j;
    let qr = m1.qr();

    let mut k = j * qr.r().transpose() * j;
    let mut r = j * qr.q().transpose() * j;

    // Enforce positive diagonal in K.
    let mut d = Mat3::identity();
    for i in 0..3 {
        if k[(i, i)] < 0.0 {
            d[(i, i)] = -1.0;
        }
    }
    k *= d;
    r = d * r;

    (k, r)
}

/// Factor a 3x4 projective camera into `K`, `R` and `t`.
///
/// RQ-decomposes the leading 3x3 block into `K R`, recovers
/// `t = K⁻¹ P[:, 3]`, normalizes `K` by its `(2, 2)` entry, and repairs
/// signs so that the focal lengths are positive and `det(R) = +1`.
pub fn rigid_camera_from_projective(p: &Mat34) -> Result<RigidCamera> {
    let m = p.fixed_view::<3, 3>(0, 0).into_owned();
    let (mut k, mut r) = rq_decompose(&m);

    let k_inv = k
        .try_inverse()
        .ok_or_else(|| anyhow::anyhow!("intrinsics matrix is not invertible"))?;
    let mut t: Vec3 = k_inv * p.column(3);

    k /= k[(2, 2)];

    if k[(0, 0)] < 0.0 && k[(1, 1)] < 0.0 {
        for i in 0..3 {
            k[(i, 0)] = -k[(i, 0)];
            k[(i, 1)] = -k[(i, 1)];
        }
        for j in 0..3 {
            r[(0, j)] = -r[(0, j)];
            r[(1, j)] = -r[(1, j)];
        }
        t.x = -t.x;
        t.y = -t.y;
    }

    if r.determinant() < 0.0 {
        r = -r;
        t = -t;
    }

    Ok(RigidCamera::new(k, r, t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use autocal_core::{Mat34, Real};
    use nalgebra::Rotation3;

    #[test]
    fn rq_decompose_recovers_k_r() {
        let k = Mat3::new(800.0, 1.5, 640.0, 0.0, 780.0, 360.0, 0.0, 0.0, 1.0);
        let rot = Rotation3::from_euler_angles(0.1, 0.2, -0.05);
        let r = rot.matrix();
        let m = k * r;

        let (k_est, r_est) = rq_decompose(&m);

        let scale = k[(2, 2)] / k_est[(2, 2)];
        let diff = (k_est * scale - k).norm();
        assert!(diff < 1e-6, "K mismatch: {diff}");

        let r_diff = r_est.transpose() * r;
        let cos_theta = ((r_diff.trace() - 1.0) * 0.5).clamp(-1.0, 1.0);
        assert!(cos_theta.acos() < 1e-6, "R mismatch");
    }

    #[test]
    fn projective_factorization_roundtrip() {
        let k = Mat3::new(900.0, -2.0, 640.0, 0.0, 870.0, 360.0, 0.0, 0.0, 1.0);
        let rot = *Rotation3::from_euler_angles(-0.1, 0.05, 0.2).matrix();
        let t = Vec3::new(-0.2, 0.1, 1.5);

        let mut p = Mat34::zeros();
        p.fixed_view_mut::<3, 3>(0, 0).copy_from(&(k * rot));
        p.set_column(3, &(k * t));

        let cam = rigid_camera_from_projective(&p).unwrap();

        assert!((cam.k[(2, 2)] - 1.0).abs() < 1e-12);
        assert!(cam.k[(0, 0)] > 0.0 && cam.k[(1, 1)] > 0.0);
        assert!((cam.r.determinant() - 1.0).abs() < 1e-9);

        let p_recon = cam.projective_mat();
        // The input is reproduced up to a global scale.
        let dot: Real = p
            .iter()
            .zip(p_recon.iter())
            .map(|(a, b)| a * b)
            .sum();
        let denom: Real = p_recon.iter().map(|v| v * v).sum();
        let diff = (p_recon * (dot / denom) - p).norm();
        assert!(diff < 1e-6, "P reconstruction error: {diff}");
    }

    #[test]
    fn scaled_input_yields_same_camera() {
        let k = Mat3::new(700.0, 0.0, 300.0, 0.0, 650.0, 200.0, 0.0, 0.0, 1.0);
        let rot = *Rotation3::from_euler_angles(0.3, -0.1, 0.07).matrix();
        let t = Vec3::new(0.4, -0.3, 2.0);

        let mut p = Mat34::zeros();
        p.fixed_view_mut::<3, 3>(0, 0).copy_from(&(k * rot));
        p.set_column(3, &(k * t));

        let cam_a = rigid_camera_from_projective(&p).unwrap();
        let cam_b = rigid_camera_from_projective(&(p * 3.7)).unwrap();

        assert!((cam_a.k - cam_b.k).norm() < 1e-6);
        assert!((cam_a.r - cam_b.r).norm() < 1e-9);
        assert!((cam_a.t - cam_b.t).norm() < 1e-9);
    }
}
