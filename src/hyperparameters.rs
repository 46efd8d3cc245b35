//! Kernel hyperparameters tuning by maximization of the log marginal likelihood.

use crate::covariance::gramian;
use crate::errors::{PredictError, Result};
use crate::kernels::{Kernel, KernelSpec};
use crate::likelihood::log_marginal_likelihood;
use crate::optimization::{into_f64, optimize_params, prepare_multistart, CobylaParams};
use crate::parameters::PredictorValidParams;
use crate::GP_COBYLA_MIN_EVAL;

use linfa::Float;
use log::{debug, info};
use ndarray::{s, Array1, ArrayBase, Data, Ix1, Ix2};
use rayon::prelude::*;
use std::time::Instant;

/// Hyperparameters found by [`optimize_hyperparameters`]
#[derive(Clone, Debug, PartialEq)]
pub struct TunedHyperparameters<F: Float> {
    /// Kernel specification holding the fitted gaussian widths
    pub kernels: KernelSpec<F>,
    /// Fitted regularization
    pub regularization: F,
    /// Log marginal likelihood reached with fitted values
    pub log_marginal_likelihood: F,
}

/// Find gaussian kernel widths and regularization maximizing the log marginal
/// likelihood of `y` targets given `x` fingerprints.
///
/// Parameters `theta = [width_1, ..., width_nx, regularization]` are optimized
/// with COBYLA in log10 space within the bounds given by `params`, starting from
/// the kernel width (replicated over the nx features when 1-dim) and regularization
/// held by `params`.
///
/// Only a kernel specification made of one gaussian kernel can be optimized.
pub fn optimize_hyperparameters<F: Float>(
    x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    y: &ArrayBase<impl Data<Elem = F>, Ix1>,
    params: &PredictorValidParams<F>,
) -> Result<TunedHyperparameters<F>> {
    let kernels = params.kernels();
    if kernels.len() != 1 {
        return Err(PredictError::ConfigurationError(format!(
            "Hyperparameters optimization of combined kernels ({} kernels) is not implemented",
            kernels.len()
        )));
    }
    let (name, scaling, width) = match kernels.iter().next() {
        Some((name, Kernel::Gaussian { width, scaling })) => (name.to_owned(), *scaling, width),
        Some((_, kernel)) => {
            return Err(PredictError::ConfigurationError(format!(
                "Hyperparameters optimization of {} kernel is not implemented",
                kernel.kernel_type()
            )))
        }
        None => {
            return Err(PredictError::ConfigurationError(
                "At least one kernel should be specified".to_string(),
            ))
        }
    };
    kernels.check(x.ncols())?;
    if x.nrows() != y.len() {
        return Err(PredictError::DimensionMismatchError(format!(
            "Training fingerprints ({}) and targets ({}) numbers differ",
            x.nrows(),
            y.len()
        )));
    }

    let dim = x.ncols();
    let mut theta0 = Array1::<F>::zeros(dim + 1);
    if width.len() == 1 {
        theta0.slice_mut(s![..dim]).fill(width[0]);
    } else {
        theta0.slice_mut(s![..dim]).assign(width);
    }
    theta0[dim] = params.regularization();

    let x = x.view();
    let y = y.view();
    let base: f64 = 10.;
    let objfn = |theta: &[f64], _gradient: Option<&mut [f64]>, _params: &mut ()| -> f64 {
        let theta = theta
            .iter()
            .map(|v| F::cast(base.powf(*v)))
            .collect::<Array1<F>>();
        // check theta as optimizer may return nan values
        if theta.iter().any(|v| v.is_nan()) {
            return f64::INFINITY;
        }
        match neg_log_marginal_likelihood(&x, &y, &theta, scaling) {
            Ok(v) if !v.is_nan() => into_f64(&v),
            _ => f64::INFINITY,
        }
    };

    let (lo, up) = params.bounds();
    let bounds = vec![(lo, up); dim + 1];
    let (theta_inits, bounds) =
        prepare_multistart(params.n_start(), &theta0, &bounds, params.seed());
    debug!("Optimize with multistart theta = {theta_inits:?} and bounds = {bounds:?}");
    let now = Instant::now();
    let opt_params = (0..theta_inits.nrows())
        .into_par_iter()
        .map(|i| {
            optimize_params(
                objfn,
                &theta_inits.row(i).to_owned(),
                &bounds,
                CobylaParams {
                    maxeval: (10 * theta_inits.ncols())
                        .clamp(GP_COBYLA_MIN_EVAL, params.max_eval()),
                    ..CobylaParams::default()
                },
            )
        })
        .reduce(
            || (f64::INFINITY, theta_inits.row(0).map(into_f64)),
            |a, b| if b.0 < a.0 { b } else { a },
        );
    debug!("elapsed optim = {:?}", now.elapsed().as_millis());

    // optimizer may slightly violate bounds
    let theta_opt = opt_params
        .1
        .mapv(|v| F::cast(base.powf(v)).max(lo).min(up));
    let lml = -neg_log_marginal_likelihood(&x, &y, &theta_opt, scaling)?;
    let width_opt = theta_opt.slice(s![..dim]).to_owned();
    let regularization = theta_opt[dim];
    info!(
        "Optimized hyperparameters: kernel widths = {}, regularization = {}, log marginal likelihood = {}",
        width_opt, regularization, lml
    );
    Ok(TunedHyperparameters {
        kernels: KernelSpec::new().with(
            &name,
            Kernel::Gaussian {
                width: width_opt,
                scaling,
            },
        ),
        regularization,
        log_marginal_likelihood: lml,
    })
}

/// Negative log marginal likelihood for `theta = [width_1, ..., width_nx, regularization]`
fn neg_log_marginal_likelihood<F: Float>(
    x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    y: &ArrayBase<impl Data<Elem = F>, Ix1>,
    theta: &Array1<F>,
    scaling: F,
) -> Result<F> {
    let dim = x.ncols();
    let kernels = KernelSpec::from(Kernel::Gaussian {
        width: theta.slice(s![..dim]).to_owned(),
        scaling,
    });
    let k = gramian(x, &kernels, Some(theta[dim]))?;
    Ok(-log_marginal_likelihood(&k, y)?)
}
