use crate::math::{Mat3, Real};

/// Standard pinhole intrinsics with optional skew.
///
/// Mirrors the upper triangle of the calibration matrix `K` with
/// `K[(2, 2)] == 1`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraIntrinsics {
    /// Focal length in pixels along X.
    pub fx: Real,
    /// Focal length in pixels along Y.
    pub fy: Real,
    /// Principal point X coordinate in pixels.
    pub cx: Real,
    /// Principal point Y coordinate in pixels.
    pub cy: Real,
    /// Skew term (typically 0).
    pub skew: Real,
}

impl CameraIntrinsics {
    /// Return the 3x3 camera intrinsics matrix K.
    pub fn k_matrix(&self) -> Mat3 {
        Mat3::new(
            self.fx, self.skew, self.cx, 0.0, self.fy, self.cy, 0.0, 0.0, 1.0,
        )
    }

    /// Read the parameters back from an upper-triangular K.
    ///
    /// The input is renormalized so that `K[(2, 2)] == 1`.
    pub fn from_k_matrix(k: &Mat3) -> Self {
        let k = k / k[(2, 2)];
        Self {
            fx: k[(0, 0)],
            skew: k[(0, 1)],
            cx: k[(0, 2)],
            fy: k[(1, 1)],
            cy: k[(1, 2)],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn k_matrix_roundtrip() {
        let intr = CameraIntrinsics {
            fx: 900.0,
            fy: 880.0,
            cx: 640.0,
            cy: 360.0,
            skew: 1.5,
        };
        let back = CameraIntrinsics::from_k_matrix(&intr.k_matrix());
        assert_eq!(intr, back);
    }
}
