//! High-level entry crate for the `autocal` toolbox.
//!
//! Autocalibration of multi-view rotational and rigid cameras: intrinsics
//! and absolute per-view rotations are recovered from pairwise image
//! homographies and feature matches.
//!
//! The typical flow:
//!
//! ```ignore
//! use autocal::prelude::*;
//!
//! // 1. Closed-form intrinsics from inter-view homographies.
//! let (k0, residual) = calibrate_rotational_camera(&homographies)?;
//!
//! // 2. Pick the effective view graph and its center.
//! let eff = extract_efficient_correspondences(num_views, &confidences)?;
//!
//! // 3. Compose absolute rotations along the spanning tree.
//! let mut rotations = calc_absolute_rotations(&relative, &eff.graph, eff.center)?;
//!
//! // 4. Joint nonlinear refinement against the matches.
//! let mut k = k0;
//! let rms = refine_rotational_camera(
//!     &mut k, &mut rotations, &features, &matches, RefineMask::all())?;
//! ```
//!
//! ## Module Organization
//!
//! - **[`core`]**: math types, matrix utilities, camera models, matching
//! - **[`linear`]**: closed-form calibration and projective primitives
//! - **[`graph`]**: view-graph selection and rotation composition
//! - **[`optim`]**: nonlinear least-squares refinement

/// Core math types, matrix utilities, camera models and matching.
pub mod core {
    pub use autocal_core::*;
}

/// Closed-form calibration and projective primitives.
pub mod linear {
    pub use autocal_linear::*;
}

/// View-graph selection and rotation composition.
pub mod graph {
    pub use autocal_graph::*;
}

/// Nonlinear least-squares refinement.
pub mod optim {
    pub use autocal_optim::*;
}

// Re-exports for convenience.
pub use autocal_core::{
    match_two_way, AbsoluteMotions, AbsoluteRotations, CameraIntrinsics, Features,
    FeaturesCollection, HomographiesP2, Mat3, Mat34, Mat4, Match, MatchesCollection, Motion, Pt2,
    Pt3, Real, RelativeConfidences, RelativeRotations, RigidCamera, Vec3, Vec4, ViewId,
};

pub use autocal_graph::{
    calc_absolute_rotations, extract_efficient_correspondences, EffectiveCorrespondences,
    ViewGraph,
};

pub use autocal_linear::{
    calibrate_rotational_camera, calibrate_rotational_camera_no_skew, camera_from_fundamental,
    dlt_triangulate, find_homography_linear, plane_at_infinity, rigid_camera_from_projective,
};

pub use autocal_optim::{refine_rotational_camera, refine_stereo_camera, RefineMask};

/// Convenient re-exports for common use cases.
pub mod prelude {
    pub use crate::core::{
        AbsoluteRotations, CameraIntrinsics, Features, FeaturesCollection, HomographiesP2, Mat3,
        MatchesCollection, RelativeConfidences, RelativeRotations, RigidCamera,
    };
    pub use crate::graph::{calc_absolute_rotations, extract_efficient_correspondences};
    pub use crate::linear::{calibrate_rotational_camera, calibrate_rotational_camera_no_skew};
    pub use crate::optim::{refine_rotational_camera, RefineMask};
}
