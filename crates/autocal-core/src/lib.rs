//! Core math and data model for the `autocal` toolbox.
//!
//! This crate contains:
//! - linear algebra type aliases (`Real`, `Mat3`, `Pt2`, ...),
//! - matrix utilities (antidiagonal, symmetric decompositions, eigen),
//! - camera models (`CameraIntrinsics`, `RigidCamera`, `Motion`),
//! - the features/matches data model and the two-way ratio matcher.
//!
//! The calibration algorithms themselves live in `autocal-linear`,
//! `autocal-graph` and `autocal-optim`, and are re-exported via the
//! top-level `autocal` crate.

/// Linear algebra type aliases and matrix utilities.
pub mod math;
/// Camera models.
pub mod models;
/// Keypoints, descriptors and match filtering.
pub mod features;
/// Collection aliases shared across the toolbox.
pub mod types;

pub use features::*;
pub use math::*;
pub use models::*;
pub use types::*;
