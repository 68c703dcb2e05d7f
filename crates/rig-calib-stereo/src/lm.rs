//! Levenberg–Marquardt refinement on top of the `levenberg_marquardt` crate.
//!
//! Residual models only provide `r(x)`; the Jacobian falls back to central
//! differences. Problems are small (6 + 6·samples parameters).

use levenberg_marquardt::{LeastSquaresProblem, LevenbergMarquardt};
use nalgebra::{storage::Owned, DMatrix, DVector, Dyn};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Nonlinear least-squares model `min ½‖r(x)‖²`.
pub trait ResidualModel {
    fn residuals(&self, x: &DVector<f64>) -> DVector<f64>;

    /// Jacobian of [`ResidualModel::residuals`]; central differences unless
    /// overridden.
    fn jacobian(&self, x: &DVector<f64>) -> DMatrix<f64> {
        numeric_jacobian(|p| self.residuals(p), x)
    }
}

/// Central-difference Jacobian of `f` at `x`.
pub fn numeric_jacobian<F>(f: F, x: &DVector<f64>) -> DMatrix<f64>
where
    F: Fn(&DVector<f64>) -> DVector<f64>,
{
    let m = f(x).len();
    let n = x.len();
    let mut jac = DMatrix::<f64>::zeros(m, n);
    let mut shifted = x.clone();
    for j in 0..n {
        let h = 1e-6 * x[j].abs().max(1.0);
        shifted[j] = x[j] + h;
        let plus = f(&shifted);
        shifted[j] = x[j] - h;
        let minus = f(&shifted);
        shifted[j] = x[j];
        jac.set_column(j, &((plus - minus) / (2.0 * h)));
    }
    jac
}

struct LmWrapper<'a, M: ResidualModel> {
    model: &'a M,
    params: DVector<f64>,
}

impl<M: ResidualModel> LeastSquaresProblem<f64, Dyn, Dyn> for LmWrapper<'_, M> {
    type ResidualStorage = Owned<f64, Dyn>;
    type JacobianStorage = Owned<f64, Dyn, Dyn>;
    type ParameterStorage = Owned<f64, Dyn>;

    fn set_params(&mut self, x: &DVector<f64>) {
        self.params.clone_from(x);
    }

    fn params(&self) -> DVector<f64> {
        self.params.clone()
    }

    fn residuals(&self) -> Option<DVector<f64>> {
        Some(self.model.residuals(&self.params))
    }

    fn jacobian(&self) -> Option<DMatrix<f64>> {
        Some(self.model.jacobian(&self.params))
    }
}

/// Summary of one refinement run.
#[derive(Clone, Debug)]
pub struct RefineReport {
    /// Residual evaluations spent by the optimizer.
    pub evaluations: usize,
    /// `½‖r‖²` at the initial guess.
    pub initial_cost: f64,
    /// `½‖r‖²` at the returned parameters.
    pub final_cost: f64,
    /// Whether the optimizer reported convergence.
    pub converged: bool,
    /// Termination reason, as reported by the optimizer.
    pub termination: String,
}

/// Optimizer settings, forwarded to [`LevenbergMarquardt`].
#[derive(Clone, Copy, Debug)]
pub struct RefineOptions {
    pub ftol: f64,
    pub xtol: f64,
    pub gtol: f64,
    /// Initial step bound, in units of the scaled parameter norm.
    pub stepbound: f64,
    /// Evaluation budget is `patience · (params + 1)`.
    pub patience: usize,
}

impl Default for RefineOptions {
    fn default() -> Self {
        Self {
            ftol: 1e-12,
            xtol: 1e-12,
            gtol: 1e-10,
            stepbound: 100.0,
            patience: 100,
        }
    }
}

/// Minimize `½‖r(x)‖²` starting from `x0`.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(model, x0, opts), fields(params = x0.len()))
)]
pub fn refine<M: ResidualModel>(
    model: &M,
    x0: DVector<f64>,
    opts: &RefineOptions,
) -> (DVector<f64>, RefineReport) {
    let initial_cost = 0.5 * model.residuals(&x0).norm_squared();
    let lm = LevenbergMarquardt::new()
        .with_ftol(opts.ftol)
        .with_xtol(opts.xtol)
        .with_gtol(opts.gtol)
        .with_stepbound(opts.stepbound)
        .with_patience(opts.patience.max(1));

    let (wrapper, report) = lm.minimize(LmWrapper { model, params: x0 });
    let x = wrapper.params();
    let final_cost = 0.5 * model.residuals(&x).norm_squared();

    (
        x,
        RefineReport {
            evaluations: report.number_of_evaluations,
            initial_cost,
            final_cost,
            converged: report.termination.was_successful(),
            termination: format!("{:?}", report.termination),
        },
    )
}
