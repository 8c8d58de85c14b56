//! Two-view DLT triangulation and reprojection error.

use anyhow::Result;
use autocal_core::{Mat34, Pt2, Real, Vec4};
use nalgebra::Matrix4;

use crate::math::normalization_mat;

/// Triangulate corresponding points of two views with the normalized DLT.
///
/// Both camera matrices are scaled to unit Frobenius norm, each view's
/// points are conditioned with their own isotropic transform (which also
/// premultiplies that view's camera), and every correspondence yields a
/// row-normalized 4x4 system whose least singular vector is the
/// homogeneous 3D point.
pub fn dlt_triangulate(
    p1: &Mat34,
    p2: &Mat34,
    xy1: &[Pt2],
    xy2: &[Pt2],
) -> Result<Vec<Vec4>> {
    if xy1.len() != xy2.len() {
        anyhow::bail!(
            "mismatched number of points: {} vs {}",
            xy1.len(),
            xy2.len()
        );
    }
    if xy1.is_empty() {
        anyhow::bail!("need at least one correspondence");
    }

    let p1n = p1 / p1.norm();
    let p2n = p2 / p2.norm();

    // Condition keypoints and cameras.
    let t1 = normalization_mat(xy1);
    let t2 = normalization_mat(xy2);

    let apply = |t: &nalgebra::Matrix3<Real>, p: &Pt2| {
        Pt2::new(
            t[(0, 0)] * p.x + t[(0, 2)],
            t[(1, 1)] * p.y + t[(1, 2)],
        )
    };
    let xy1n: Vec<Pt2> = xy1.iter().map(|p| apply(&t1, p)).collect();
    let xy2n: Vec<Pt2> = xy2.iter().map(|p| apply(&t2, p)).collect();

    let p1n = t1 * p1n;
    let p2n = t2 * p2n;

    let mut points = Vec::with_capacity(xy1.len());
    for (q1, q2) in xy1n.iter().zip(xy2n.iter()) {
        let mut a = Matrix4::<Real>::zeros();
        for j in 0..4 {
            a[(0, j)] = q1.x * p1n[(2, j)] - p1n[(0, j)];
            a[(1, j)] = q1.y * p1n[(2, j)] - p1n[(1, j)];
            a[(2, j)] = q2.x * p2n[(2, j)] - p2n[(0, j)];
            a[(3, j)] = q2.y * p2n[(2, j)] - p2n[(1, j)];
        }

        // Unit rows improve the conditioning of the per-point system.
        for i in 0..4 {
            let norm = a.row(i).norm();
            if norm > Real::EPSILON {
                for j in 0..4 {
                    a[(i, j)] /= norm;
                }
            }
        }

        let svd = a.svd(false, true);
        let v_t = svd
            .v_t
            .ok_or_else(|| anyhow::anyhow!("svd failed during triangulation"))?;
        points.push(v_t.row(3).transpose());
    }

    Ok(points)
}

/// Root-mean-square reprojection error of homogeneous points under `P`.
pub fn rms_reproj_error(xy: &[Pt2], p: &Mat34, xyzw: &[Vec4]) -> Real {
    assert_eq!(xy.len(), xyzw.len(), "point count mismatch");
    assert!(!xy.is_empty(), "empty point set");

    let mut sum_sq = 0.0;
    for (q, x) in xy.iter().zip(xyzw.iter()) {
        let proj = p * x;
        let dx = q.x - proj.x / proj.z;
        let dy = q.y - proj.y / proj.z;
        sum_sq += dx * dx + dy * dy;
    }

    (sum_sq / xy.len() as Real).sqrt()
}
