//! Log marginal likelihood of a zero-mean gaussian process model.

use crate::errors::{PredictError, Result};
use linfa::Float;
use linfa_linalg::{cholesky::*, triangular::*};
use ndarray::{ArrayBase, Axis, Data, Ix1, Ix2};

/// Compute the log marginal likelihood of targets `y` under a zero-mean
/// gaussian process with covariance `gram` (regularization included):
///
/// `log p(y) = -1/2 y^t.K^-1.y - 1/2 log|K| - n/2 log(2.pi)`
///
/// The determinant of K is equal to the squared product of
/// the diagonal elements of its Cholesky decomposition.
pub fn log_marginal_likelihood<F: Float>(
    gram: &ArrayBase<impl Data<Elem = F>, Ix2>,
    y: &ArrayBase<impl Data<Elem = F>, Ix1>,
) -> Result<F> {
    if gram.nrows() != y.len() {
        return Err(PredictError::DimensionMismatchError(format!(
            "Covariance matrix size ({}) does not match target length ({})",
            gram.nrows(),
            y.len()
        )));
    }
    let k_chol = gram.to_owned().cholesky()?;
    let z = k_chol.solve_triangular(&y.to_owned().insert_axis(Axis(1)), UPLO::Lower)?;
    let data_fit = z.mapv(|v| v * v).sum();
    let logdet = k_chol.diag().mapv(|v| v.ln()).sum() * F::cast(2.);
    let n_obs = F::cast(y.len());
    let half = F::cast(0.5);
    Ok(-half * data_fit - half * logdet - half * n_obs * F::cast(2. * std::f64::consts::PI).ln())
}
