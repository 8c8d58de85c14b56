//! Linear (closed-form) autocalibration and the projective-geometry
//! primitives it builds on.
//!
//! The central entry points are [`calibrate_rotational_camera`] and
//! [`calibrate_rotational_camera_no_skew`], which recover the calibration
//! matrix of a purely rotating camera from inter-view homographies. The
//! remaining modules provide the supporting machinery: RQ factorization of
//! projective cameras, DLT triangulation, 3D homography estimation, the
//! plane at infinity, and camera recovery from a fundamental matrix.

mod camera_matrix;
mod epipolar;
mod homography3d;
pub mod math;
mod rotational;
mod triangulation;

pub use camera_matrix::*;
pub use epipolar::*;
pub use homography3d::*;
pub use rotational::*;
pub use triangulation::*;
