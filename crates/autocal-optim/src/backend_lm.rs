//! Adapter between [`ResidualModel`] and the `levenberg-marquardt` crate.

use autocal_core::Real;
use levenberg_marquardt::{LeastSquaresProblem, LevenbergMarquardt};
use log::debug;
use nalgebra::{storage::Owned, DMatrix, DVector, Dyn};

use crate::residual::{central_difference_jacobian, ResidualModel, FD_STEP};

struct LmWrapper<'a, M: ResidualModel> {
    model: &'a M,
    active: &'a [bool],
    params: DVector<Real>,
}

impl<M: ResidualModel> LeastSquaresProblem<Real, Dyn, Dyn> for LmWrapper<'_, M> {
    type ResidualStorage = Owned<Real, Dyn>;
    type JacobianStorage = Owned<Real, Dyn, Dyn>;
    type ParameterStorage = Owned<Real, Dyn>;

    fn set_params(&mut self, x: &DVector<Real>) {
        self.params.clone_from(x);
    }

    fn params(&self) -> DVector<Real> {
        self.params.clone()
    }

    fn residuals(&self) -> Option<DVector<Real>> {
        let mut err = DVector::zeros(self.model.dimension());
        self.model.eval(&self.params, &mut err);
        Some(err)
    }

    fn jacobian(&self) -> Option<DMatrix<Real>> {
        let mut jac = DMatrix::zeros(self.model.dimension(), self.params.len());
        central_difference_jacobian(self.model, &self.params, self.active, FD_STEP, &mut jac);
        Some(jac)
    }
}

/// Minimize `‖f(x)‖²` with Levenberg-Marquardt.
///
/// `active` gates the Jacobian columns: frozen parameters keep their
/// initial value. Termination and step policy belong to the driver; the
/// optimized parameter vector is returned regardless of the termination
/// reason (callers judge the result by the residual they recompute).
pub fn minimize_lev_marq<M: ResidualModel>(
    model: &M,
    x0: DVector<Real>,
    active: &[bool],
) -> DVector<Real> {
    let wrapper = LmWrapper {
        model,
        active,
        params: x0,
    };

    let (wrapper, report) = LevenbergMarquardt::new().minimize(wrapper);
    debug!(
        "levenberg-marquardt: {:?} after {} evaluations, objective = {:.6e}",
        report.termination, report.number_of_evaluations, report.objective_function
    );

    wrapper.params()
}
