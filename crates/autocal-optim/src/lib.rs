//! Nonlinear (bundle-adjustment style) refinement.
//!
//! Residuals are modeled by the small [`ResidualModel`] interface; their
//! Jacobians come from a shared central-difference helper gated by a
//! selective refinement mask, and minimization is delegated to the
//! `levenberg-marquardt` crate through [`backend_lm`].

pub mod backend_lm;
mod pairs;
pub mod residual;
mod rotational;
mod stereo;

pub use backend_lm::*;
pub use residual::*;
pub use rotational::*;
pub use stereo::*;
