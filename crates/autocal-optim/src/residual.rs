//! Residual models and their finite-difference Jacobians.

use autocal_core::Real;
use nalgebra::{DMatrix, DVector};

/// Finite-difference step used by all refiners.
pub const FD_STEP: Real = 1e-4;

/// A sum-of-squares residual vector as a function of a flat parameter
/// vector.
pub trait ResidualModel {
    /// Length of the residual vector.
    fn dimension(&self) -> usize;

    /// Evaluate the residuals at `arg` into `err`, which the caller has
    /// sized to [`dimension`](Self::dimension).
    fn eval(&self, arg: &DVector<Real>, err: &mut DVector<Real>);
}

/// Selects which intrinsic parameters a refiner may touch. Rotation and
/// motion parameters are always refined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefineMask {
    pub fx: bool,
    pub skew: bool,
    pub cx: bool,
    pub fy: bool,
    pub cy: bool,
}

impl RefineMask {
    /// Refine every intrinsic parameter.
    pub fn all() -> Self {
        Self {
            fx: true,
            skew: true,
            cx: true,
            fy: true,
            cy: true,
        }
    }

    /// Flags in intrinsic parameter order: fx, skew, cx, fy, cy.
    pub fn flags(&self) -> [bool; 5] {
        [self.fx, self.skew, self.cx, self.fy, self.cy]
    }
}

impl Default for RefineMask {
    fn default() -> Self {
        Self::all()
    }
}

/// Central-difference Jacobian over the active columns.
///
/// Inactive columns are left at zero, which the minimizer treats as
/// frozen parameters. The same two scratch buffers serve every column.
pub fn central_difference_jacobian<M: ResidualModel>(
    model: &M,
    arg: &DVector<Real>,
    active: &[bool],
    step: Real,
    jac: &mut DMatrix<Real>,
) {
    let dim = model.dimension();
    assert_eq!(active.len(), arg.len(), "mask length mismatch");
    assert_eq!(jac.nrows(), dim, "jacobian row count mismatch");
    assert_eq!(jac.ncols(), arg.len(), "jacobian column count mismatch");

    jac.fill(0.0);

    let mut probe = arg.clone();
    let mut fwd = DVector::<Real>::zeros(dim);
    let mut bwd = DVector::<Real>::zeros(dim);

    for col in 0..arg.len() {
        if !active[col] {
            continue;
        }
        let val = probe[col];

        probe[col] = val + step;
        model.eval(&probe, &mut fwd);
        probe[col] = val - step;
        model.eval(&probe, &mut bwd);
        probe[col] = val;

        for row in 0..dim {
            jac[(row, col)] = (fwd[row] - bwd[row]) / (2.0 * step);
        }
    }
}
