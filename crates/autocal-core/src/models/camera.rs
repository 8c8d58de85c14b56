use crate::math::{Mat3, Mat34, Pt3, Vec3};

/// Rigid camera: intrinsics plus a world-to-camera pose.
///
/// `r` is orthonormal with determinant +1 and `t` is the world origin
/// expressed in camera coordinates, so a world point `x` projects through
/// `K (R x + t)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidCamera {
    /// Intrinsics matrix (upper-triangular, `K[(2, 2)] == 1`).
    pub k: Mat3,
    /// Rotation matrix.
    pub r: Mat3,
    /// Translation vector in camera coordinates.
    pub t: Vec3,
}

impl RigidCamera {
    pub fn new(k: Mat3, r: Mat3, t: Vec3) -> Self {
        Self { k, r, t }
    }

    /// The 3x4 projective matrix `K [R | t]`.
    pub fn projective_mat(&self) -> Mat34 {
        let mut p = Mat34::zeros();
        p.fixed_view_mut::<3, 3>(0, 0).copy_from(&(self.k * self.r));
        p.set_column(3, &(self.k * self.t));
        p
    }
}

/// A rigid motion: rotation plus translation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Motion {
    pub r: Mat3,
    pub t: Vec3,
}

impl Motion {
    pub fn new(r: Mat3, t: Vec3) -> Self {
        Self { r, t }
    }

    /// The identity motion.
    pub fn identity() -> Self {
        Self {
            r: Mat3::identity(),
            t: Vec3::zeros(),
        }
    }
}

/// Apply a rigid motion to a point: `R p + t`.
pub fn transform_rigid(point: &Pt3, r: &Mat3, t: &Vec3) -> Pt3 {
    Pt3::from(r * point.coords + t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Rotation3;

    #[test]
    fn projective_mat_projects_like_pose() {
        let k = Mat3::new(800.0, 0.0, 320.0, 0.0, 780.0, 240.0, 0.0, 0.0, 1.0);
        let r = *Rotation3::from_euler_angles(0.1, -0.2, 0.05).matrix();
        let t = Vec3::new(0.2, -0.1, 1.0);
        let cam = RigidCamera::new(k, r, t);

        let pw = Pt3::new(0.3, -0.4, 3.0);
        let pc = transform_rigid(&pw, &r, &t);
        let expected = k * pc.coords;

        let x = cam.projective_mat() * nalgebra::Vector4::new(pw.x, pw.y, pw.z, 1.0);
        assert!((x - expected).norm() < 1e-9);
    }
}
