use crate::basis::BasisFunction;
use crate::covariance::{get_covariance, gramian, invert_covariance};
use crate::errors::{PredictError, Result};
use crate::hyperparameters::optimize_hyperparameters;
use crate::kernels::KernelSpec;
use crate::metrics::{get_error, Cost, ErrorSummary};
use crate::parameters::{PredictorParams, PredictorValidParams};
use crate::standardize::TargetStandardization;

use linfa::prelude::{DatasetBase, Fit, Float, PredictInplace};
use log::warn;
use ndarray::{Array1, Array2, ArrayBase, ArrayView1, Axis, Data, Ix1, Ix2, Zip};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default number of additional multistart points for hyperparameters optimization
pub const GP_OPTIM_N_START: usize = 0;
/// Minimum of function evaluations for COBYLA optimizer
pub const GP_COBYLA_MIN_EVAL: usize = 25;
/// Maximum of function evaluations for COBYLA optimizer
pub const GP_COBYLA_MAX_EVAL: usize = 1000;
/// Default bounds of kernel widths and regularization during optimization
pub const GP_OPTIM_BOUNDS: (f64, f64) = (1e-6, 1e3);
/// Default seed of the multistart random generator
pub const GP_OPTIM_SEED: u64 = 42;

/// Kernel ridge regression model predicting structure fitness from fingerprints.
///
/// A model is obtained by fitting [`PredictorParams`] on a training dataset (see
/// [`FitnessPredictor::params`]). Fitting standardizes training targets (optional),
/// tunes gaussian kernel hyperparameters by maximizing the log marginal likelihood
/// (optional) and inverts the regularized training covariance matrix. The fitted model
/// is immutable: tuned kernels and regularization can be retrieved with
/// [`FitnessPredictor::tuned_params`] to be reused in subsequent fits.
///
/// For a test fingerprint with test-train covariance row `k`, the prediction is
///
/// `y(x) = k.K^-1.(t - mean(t)) + mean(t)`
///
/// where `K` is the regularized training covariance and `t` the (possibly standardized)
/// training targets. With standardization, predictions are transformed back to the
/// training targets scale.
///
/// # Example
///
/// ```no_run
/// use fitness_gp::{FitnessPredictor, PredictionRequest, kernels::{Kernel, KernelSpec}};
/// use linfa::prelude::*;
/// use ndarray::array;
///
/// let xt = array![[0.], [1.], [2.], [3.]];
/// let yt = array![0., 1., 1.5, 0.9];
///
/// let model = FitnessPredictor::params(KernelSpec::from(Kernel::gaussian(array![1.])))
///     .regularization(1e-3)
///     .fit(&Dataset::new(xt, yt))
///     .expect("fit error");
///
/// let xtest = array![[0.5], [2.5]];
/// let request = PredictionRequest::new().uncertainty(true).training_error(true);
/// let predictions = model.get_predictions(&xtest, &request).expect("prediction error");
/// println!("{}", predictions.prediction);
/// ```
#[derive(Clone, Debug)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(serialize = "F: Serialize", deserialize = "F: Deserialize<'de>"))
)]
pub struct FitnessPredictor<F: Float> {
    /// Kernels used to build covariances, tuned when optimized
    kernels: KernelSpec<F>,
    /// Regularization added to the training covariance, tuned when optimized
    regularization: F,
    /// Log marginal likelihood reached by hyperparameters optimization
    likelihood: Option<F>,
    /// Inverse of the regularized training covariance
    cinv: Array2<F>,
    /// Weights `K^-1.(t - mean(t))`
    weights: Array1<F>,
    /// Mean of the modelled training targets
    target_mean: F,
    /// Standardization record when targets were standardized
    standardization: Option<TargetStandardization<F>>,
    /// Training dataset (fingerprints, raw targets)
    training_data: (Array2<F>, Array1<F>),
    /// Parameters used to fit this model
    params: PredictorValidParams<F>,
}

/// Basis-corrected residual analysis, see [`FitnessPredictor::fixed_basis`]
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(serialize = "F: Serialize", deserialize = "F: Deserialize<'de>"))
)]
pub struct BasisAnalysis<F: Float> {
    /// (m, m) covariance of the residual model at test fingerprints
    pub g_cov: Array2<F>,
    /// (m,) predictions accounting for the basis trend
    pub g_x: Array1<F>,
    /// Error of `g_x` against test targets when given
    pub validation_error: Option<ErrorSummary<F>>,
}

/// Quantities computed by [`FitnessPredictor::get_predictions`],
/// optional ones are present only when requested.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(serialize = "F: Serialize", deserialize = "F: Deserialize<'de>"))
)]
pub struct Predictions<F: Float> {
    /// Predictions at test fingerprints
    pub prediction: Array1<F>,
    /// Error of predictions against test targets
    pub validation_error: Option<ErrorSummary<F>>,
    /// Predictions at training fingerprints
    pub training_prediction: Option<Array1<F>>,
    /// Error of training predictions against training targets
    pub training_error: Option<ErrorSummary<F>>,
    /// Predictive standard deviation at test fingerprints
    pub uncertainty: Option<Array1<F>>,
    /// Fixed-basis residual model results
    pub basis_analysis: Option<BasisAnalysis<F>>,
}

/// Select the quantities computed by [`FitnessPredictor::get_predictions`]
pub struct PredictionRequest<'a, F: Float> {
    test_target: Option<ArrayView1<'a, F>>,
    uncertainty: bool,
    validation_error: bool,
    training_error: bool,
    cost: Cost<F>,
    basis: Option<&'a dyn BasisFunction<F>>,
}

impl<F: Float> Default for PredictionRequest<'_, F> {
    fn default() -> Self {
        PredictionRequest {
            test_target: None,
            uncertainty: false,
            validation_error: false,
            training_error: false,
            cost: Cost::Squared,
            basis: None,
        }
    }
}

impl<'a, F: Float> PredictionRequest<'a, F> {
    /// A request of predictions only
    pub fn new() -> Self {
        Self::default()
    }

    /// Set targets of test fingerprints, requesting validation error
    pub fn test_target(mut self, target: ArrayView1<'a, F>) -> Self {
        self.test_target = Some(target);
        self.validation_error = true;
        self
    }

    /// Request (or not) the validation error, test targets are then required
    pub fn validation_error(mut self, validation_error: bool) -> Self {
        self.validation_error = validation_error;
        self
    }

    /// Request predictions and error at training fingerprints
    pub fn training_error(mut self, training_error: bool) -> Self {
        self.training_error = training_error;
        self
    }

    /// Request predictive uncertainty
    pub fn uncertainty(mut self, uncertainty: bool) -> Self {
        self.uncertainty = uncertainty;
        self
    }

    /// Set the cost function used to compute errors
    pub fn cost(mut self, cost: Cost<F>) -> Self {
        self.cost = cost;
        self
    }

    /// Request the fixed-basis residual model with the given basis
    pub fn basis(mut self, basis: &'a dyn BasisFunction<F>) -> Self {
        self.basis = Some(basis);
        self
    }
}

impl<F: Float> fmt::Display for FitnessPredictor<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "FitnessPredictor(kernels={}, regularization={}",
            self.kernels, self.regularization
        )?;
        if let Some(lml) = self.likelihood {
            write!(f, ", likelihood={lml}")?;
        }
        write!(f, ")")
    }
}

impl<F: Float> FitnessPredictor<F> {
    /// Predictor parameters constructor
    pub fn params(kernels: KernelSpec<F>) -> PredictorParams<F> {
        PredictorParams::new(kernels)
    }

    /// Compute predictions at `x` test fingerprints along with the quantities
    /// selected by `request`.
    pub fn get_predictions(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
        request: &PredictionRequest<F>,
    ) -> Result<Predictions<F>> {
        let ktb = get_covariance(x, &self.training_data.0, &self.kernels)?;
        let prediction = self.destandardize(self.do_prediction(&ktb));

        let validation_error = if request.validation_error {
            let target = request.test_target.as_ref().ok_or_else(|| {
                PredictError::InvalidValueError(
                    "Validation error requested without test targets".to_string(),
                )
            })?;
            Some(get_error(&prediction, target, &request.cost)?)
        } else {
            None
        };

        let (training_prediction, training_error) = if request.training_error {
            let train_pred = self.predict_training()?;
            let error = get_error(&train_pred, &self.training_data.1, &request.cost)?;
            (Some(train_pred), Some(error))
        } else {
            (None, None)
        };

        let uncertainty = if request.uncertainty {
            Some(self.uncertainty_from(&ktb)?)
        } else {
            None
        };

        let basis_analysis = match request.basis {
            Some(basis) => Some(self.basis_analysis(
                x,
                &ktb,
                basis,
                request.test_target.as_ref(),
                &request.cost,
            )?),
            None => None,
        };

        Ok(Predictions {
            prediction,
            validation_error,
            training_prediction,
            training_error,
            uncertainty,
            basis_analysis,
        })
    }

    /// Predict fitness values at n given `x` fingerprints specified as a (n, nx) matrix.
    pub fn predict(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array1<F>> {
        let ktb = get_covariance(x, &self.training_data.0, &self.kernels)?;
        Ok(self.destandardize(self.do_prediction(&ktb)))
    }

    /// Predict fitness values at training fingerprints
    pub fn predict_training(&self) -> Result<Array1<F>> {
        self.predict(&self.training_data.0)
    }

    /// Predictive standard deviation `sqrt(1 - k.K^-1.k^t)` at `x` fingerprints
    ///
    /// Negative variances within the `uncertainty_tolerance` parameter are clamped to 0,
    /// larger ones are reported as a [`PredictError::NumericDomainError`].
    pub fn uncertainty(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array1<F>> {
        let ktb = get_covariance(x, &self.training_data.0, &self.kernels)?;
        self.uncertainty_from(&ktb)
    }

    /// Fit a fixed-basis residual model at `x` fingerprints: the basis trend `beta`
    /// is fitted by generalized least squares on training targets, and predictions
    /// and covariance of the kernel model are corrected accordingly.
    ///
    /// With `H` (resp. `H*`) the basis matrix at training (resp. test) fingerprints,
    /// `k` the test-train covariance and `K` the regularized training covariance:
    ///
    /// * `R = H* - k.K^-1.H`
    /// * `beta = (H^t.K^-1.H)^-1.H^t.K^-1.t`
    /// * `g_x = y(x) + R.beta`
    /// * `g_cov = K** - k.K^-1.k^t + R.(H^t.K^-1.H)^-1.R^t`
    ///
    /// When `test_target` is given, the error of corrected predictions is computed with `cost`.
    pub fn fixed_basis(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
        basis: &dyn BasisFunction<F>,
        test_target: Option<&ArrayView1<F>>,
        cost: &Cost<F>,
    ) -> Result<BasisAnalysis<F>> {
        let ktb = get_covariance(x, &self.training_data.0, &self.kernels)?;
        self.basis_analysis(x, &ktb, basis, test_target, cost)
    }

    fn basis_analysis(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
        ktb: &Array2<F>,
        basis: &dyn BasisFunction<F>,
        test_target: Option<&ArrayView1<F>>,
        cost: &Cost<F>,
    ) -> Result<BasisAnalysis<F>> {
        let ktest = gramian(x, &self.kernels, None)?;
        let h = basis.value(&self.training_data.0.view())?;
        let h_test = basis.value(&x.view())?;
        if h.ncols() != h_test.ncols() {
            return Err(PredictError::DimensionMismatchError(format!(
                "Basis function gives {} terms at training fingerprints and {} at test fingerprints",
                h.ncols(),
                h_test.ncols()
            )));
        }

        let kinv_h = self.cinv.dot(&h);
        let r = &h_test - &ktb.dot(&kinv_h);
        let gls_inv = invert_covariance(&h.t().dot(&kinv_h))?;
        let beta = gls_inv.dot(&kinv_h.t().dot(self.modelled_target()));

        let covf = &ktest - &ktb.dot(&self.cinv).dot(&ktb.t());
        let g_cov = covf + r.dot(&gls_inv).dot(&r.t());
        let g_x = &self.destandardize(self.do_prediction(ktb)) + &r.dot(&beta);

        let validation_error = match test_target {
            Some(target) => Some(get_error(&g_x, target, cost)?),
            None => None,
        };
        Ok(BasisAnalysis {
            g_cov,
            g_x,
            validation_error,
        })
    }

    /// Prediction in the modelled targets space
    fn do_prediction(&self, ktb: &Array2<F>) -> Array1<F> {
        ktb.dot(&self.weights).mapv(|v| v + self.target_mean)
    }

    fn destandardize(&self, values: Array1<F>) -> Array1<F> {
        match &self.standardization {
            Some(st) => st.inverse(&values),
            None => values,
        }
    }

    fn uncertainty_from(&self, ktb: &Array2<F>) -> Result<Array1<F>> {
        let explained = (ktb.dot(&self.cinv) * ktb).sum_axis(Axis(1));
        let tol = self.params.uncertainty_tolerance();
        let mut unc = Array1::<F>::zeros(explained.len());
        let mut clamped = 0;
        for (u, &e) in unc.iter_mut().zip(explained.iter()) {
            let var = F::one() - e;
            if var < F::zero() {
                if var < -tol {
                    return Err(PredictError::NumericDomainError(format!(
                        "Negative predictive variance ({var}), covariance is ill-conditioned \
                        or kernel is mis-scaled"
                    )));
                }
                clamped += 1;
            } else {
                *u = var.sqrt();
            }
        }
        if clamped > 0 {
            warn!("{clamped} slightly negative predictive variance(s) clamped to 0");
        }
        Ok(unc)
    }

    fn modelled_target(&self) -> &Array1<F> {
        match &self.standardization {
            Some(st) => &st.target,
            None => &self.training_data.1,
        }
    }

    /// Parameters holding tuned kernels and regularization with hyperparameters
    /// optimization disabled, so that a new fit reuses tuned values.
    pub fn tuned_params(&self) -> PredictorParams<F> {
        PredictorParams::new_from_valid(&self.params)
            .kernels(self.kernels.clone())
            .regularization(self.regularization)
            .optimize_hyperparameters(false)
    }

    /// Kernels used by the model
    pub fn kernels(&self) -> &KernelSpec<F> {
        &self.kernels
    }

    /// Regularization used by the model
    pub fn regularization(&self) -> F {
        self.regularization
    }

    /// Log marginal likelihood reached when hyperparameters were optimized
    pub fn likelihood(&self) -> Option<F> {
        self.likelihood
    }

    /// Inverse of the regularized training covariance, may be cached by the caller
    /// and given back with [`PredictorValidParams::fit_with_inverse`]
    pub fn inverse_covariance(&self) -> &Array2<F> {
        &self.cinv
    }

    /// Training targets standardization record
    pub fn standardization(&self) -> Option<&TargetStandardization<F>> {
        self.standardization.as_ref()
    }

    /// Training dataset (fingerprints, targets)
    pub fn training_data(&self) -> &(Array2<F>, Array1<F>) {
        &self.training_data
    }

    /// Parameters used to fit this model
    pub fn params_used(&self) -> &PredictorValidParams<F> {
        &self.params
    }

    /// Training fingerprints dimension
    pub fn dim(&self) -> usize {
        self.training_data.0.ncols()
    }
}

impl<F, D> PredictInplace<ArrayBase<D, Ix2>, Array1<F>> for FitnessPredictor<F>
where
    F: Float,
    D: Data<Elem = F>,
{
    fn predict_inplace(&self, x: &ArrayBase<D, Ix2>, y: &mut Array1<F>) {
        assert_eq!(
            x.nrows(),
            y.len(),
            "The number of data points must match the number of output targets."
        );

        let values = self.predict(x).expect("Fitness prediction");
        *y = values;
    }

    fn default_target(&self, x: &ArrayBase<D, Ix2>) -> Array1<F> {
        Array1::zeros((x.nrows(),))
    }
}

impl<F: Float, D: Data<Elem = F>> Fit<ArrayBase<D, Ix2>, ArrayBase<D, Ix1>, PredictError>
    for PredictorValidParams<F>
{
    type Object = FitnessPredictor<F>;

    /// Fit the fitness predictor, optimizing hyperparameters when requested
    fn fit(
        &self,
        dataset: &DatasetBase<ArrayBase<D, Ix2>, ArrayBase<D, Ix1>>,
    ) -> Result<Self::Object> {
        self.fit_model(dataset.records(), dataset.targets(), None)
    }
}

impl<F: Float> PredictorValidParams<F> {
    /// Fit the fitness predictor reusing `cinv` as inverse of the regularized training
    /// covariance instead of computing it.
    ///
    /// `cinv` is expected to match the kernels and regularization of the fitted model,
    /// which is not checked beyond its shape.
    pub fn fit_with_inverse<D: Data<Elem = F>>(
        &self,
        dataset: &DatasetBase<ArrayBase<D, Ix2>, ArrayBase<D, Ix1>>,
        cinv: Array2<F>,
    ) -> Result<FitnessPredictor<F>> {
        self.fit_model(dataset.records(), dataset.targets(), Some(cinv))
    }

    fn fit_model(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
        y: &ArrayBase<impl Data<Elem = F>, Ix1>,
        cinv: Option<Array2<F>>,
    ) -> Result<FitnessPredictor<F>> {
        if x.nrows() != y.len() {
            return Err(PredictError::DimensionMismatchError(format!(
                "Training fingerprints ({}) and targets ({}) numbers differ",
                x.nrows(),
                y.len()
            )));
        }
        if x.nrows() == 0 {
            return Err(PredictError::InvalidValueError(
                "Training set is empty".to_string(),
            ));
        }
        self.kernels().check(x.ncols())?;
        if has_duplicated_rows(x) {
            warn!("Multiple training fingerprints have the same value (at least same row twice).");
        }

        let standardization = if self.standardize_target() {
            Some(TargetStandardization::new(y)?)
        } else {
            None
        };
        let target = match &standardization {
            Some(st) => st.target.to_owned(),
            None => y.to_owned(),
        };

        let (kernels, regularization, likelihood) = if self.optimize_hyperparameters() {
            let tuned = optimize_hyperparameters(x, &target, self)?;
            (
                tuned.kernels,
                tuned.regularization,
                Some(tuned.log_marginal_likelihood),
            )
        } else {
            (self.kernels().clone(), self.regularization(), None)
        };

        let cinv = match cinv {
            Some(cinv) => {
                if cinv.dim() != (x.nrows(), x.nrows()) {
                    return Err(PredictError::DimensionMismatchError(format!(
                        "Inverse covariance shape {:?} does not match training size {}",
                        cinv.dim(),
                        x.nrows()
                    )));
                }
                if self.optimize_hyperparameters() {
                    warn!("Given inverse covariance is reused although hyperparameters were optimized");
                }
                cinv
            }
            None => invert_covariance(&gramian(x, &kernels, Some(regularization))?)?,
        };

        let target_mean = target.sum() / F::cast(target.len());
        let weights = cinv.dot(&target.mapv(|v| v - target_mean));

        Ok(FitnessPredictor {
            kernels,
            regularization,
            likelihood,
            cinv,
            weights,
            target_mean,
            standardization,
            training_data: (x.to_owned(), y.to_owned()),
            params: self.clone(),
        })
    }
}

fn has_duplicated_rows<F: Float>(x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> bool {
    let rows = x.rows().into_iter().collect::<Vec<_>>();
    rows.iter().enumerate().any(|(i, a)| {
        rows[i + 1..].iter().any(|b| {
            let mut same = true;
            Zip::from(a).and(b).for_each(|u, v| same &= u == v);
            same
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basis::{ConstantBasis, LinearBasis};
    use crate::kernels::Kernel;
    use approx::assert_abs_diff_eq;
    use linfa::prelude::{Dataset, ParamGuard, Predict};
    use ndarray::{array, s, Array};
    use ndarray_rand::rand::SeedableRng;
    use ndarray_rand::rand_distr::Uniform;
    use ndarray_rand::RandomExt;
    use ndarray_stats::DeviationExt;
    use rand_xoshiro::Xoshiro256Plus;

    fn gaussian(width: f64) -> KernelSpec<f64> {
        KernelSpec::from(Kernel::gaussian(array![width]))
    }

    fn line_model(regularization: f64) -> FitnessPredictor<f64> {
        FitnessPredictor::params(gaussian(1.))
            .regularization(regularization)
            .standardize_target(false)
            .optimize_hyperparameters(false)
            .fit(&Dataset::new(array![[0.], [1.], [2.]], array![0., 1., 2.]))
            .expect("fit error")
    }

    fn sin_data(n: usize, seed: u64) -> (Array2<f64>, Array1<f64>) {
        let mut rng = Xoshiro256Plus::seed_from_u64(seed);
        let x = Array::random_using((n, 2), Uniform::new(0f64, 3.), &mut rng);
        let y = x.map_axis(Axis(1), |r| 10. + r[0].sin() + 0.5 * r[1]);
        (x, y)
    }

    #[test]
    fn test_line_interpolation() {
        let model = line_model(1e-3);
        let request = PredictionRequest::new().training_error(true);
        let res = model
            .get_predictions(&array![[1.5]], &request)
            .expect("prediction error");
        assert!(res.prediction[0] > 1. && res.prediction[0] < 2.);
        let train_err = res.training_error.expect("training error");
        assert!(train_err.average < 0.1);
        let train_pred = res.training_prediction.expect("training prediction");
        assert_abs_diff_eq!(
            train_err.average,
            train_pred.root_mean_sq_err(&array![0., 1., 2.]).unwrap(),
            epsilon = 1e-12
        );
        assert!(res.uncertainty.is_none());
        assert!(res.validation_error.is_none());
        assert!(res.basis_analysis.is_none());
    }

    #[test]
    fn test_reproducible_predictions() {
        let (xt, yt) = sin_data(12, 42);
        let (xv, _) = sin_data(5, 43);
        let params = FitnessPredictor::params(gaussian(0.8)).optimize_hyperparameters(false);
        let first = params
            .clone()
            .fit(&Dataset::new(xt.clone(), yt.clone()))
            .unwrap()
            .predict(&xv)
            .unwrap();
        let second = params
            .fit(&Dataset::new(xt, yt))
            .unwrap()
            .predict(&xv)
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_standardized_predictions() {
        let (xt, yt) = sin_data(10, 42);
        let model = FitnessPredictor::params(gaussian(1.))
            .regularization(1e-6)
            .optimize_hyperparameters(false)
            .fit(&Dataset::new(xt.clone(), yt.clone()))
            .unwrap();
        let st = model.standardization().expect("standardization record");
        assert_abs_diff_eq!(st.mean, yt.mean().unwrap(), epsilon = 1e-12);
        // predictions are given in the raw targets scale
        assert_abs_diff_eq!(model.predict_training().unwrap(), yt, epsilon = 1e-2);
        let inplace = model.predict(&xt).unwrap();
        let linfa_pred: Array1<f64> = Predict::predict(&model, &xt);
        assert_eq!(inplace, linfa_pred);
    }

    #[test]
    fn test_validation_error() {
        let (xt, yt) = sin_data(20, 42);
        let (xv, yv) = sin_data(6, 43);
        let model = FitnessPredictor::params(gaussian(1.))
            .optimize_hyperparameters(false)
            .fit(&Dataset::new(xt, yt))
            .unwrap();
        let request = PredictionRequest::new()
            .test_target(yv.view())
            .cost(Cost::Absolute);
        let res = model.get_predictions(&xv, &request).unwrap();
        let err = res.validation_error.expect("validation error");
        assert_abs_diff_eq!(
            err.average,
            res.prediction.mean_abs_err(&yv).unwrap(),
            epsilon = 1e-12
        );

        let request = PredictionRequest::new().validation_error(true);
        assert!(matches!(
            model.get_predictions(&xv, &request),
            Err(PredictError::InvalidValueError(_))
        ));
        let short = yv.slice(s![..3]);
        let request = PredictionRequest::new().test_target(short);
        assert!(matches!(
            model.get_predictions(&xv, &request),
            Err(PredictError::DimensionMismatchError(_))
        ));
    }

    #[test]
    fn test_uncertainty() {
        let model = line_model(0.);
        let unc = model.uncertainty(&array![[1.], [1.5], [10.]]).unwrap();
        assert!(unc.iter().all(|u| *u >= 0.));
        assert_abs_diff_eq!(unc[0], 0., epsilon = 1e-6);
        assert!(unc[1] > 0.);
        // far from training data the kernel model knows nothing
        assert_abs_diff_eq!(unc[2], 1., epsilon = 1e-6);
    }

    #[test]
    fn test_uncertainty_out_of_domain() {
        let model = FitnessPredictor::params(KernelSpec::from(
            Kernel::gaussian(array![1.]).with_scaling(4.),
        ))
        .regularization(1e-3)
        .standardize_target(false)
        .optimize_hyperparameters(false)
        .fit(&Dataset::new(array![[0.], [1.], [2.]], array![0., 1., 2.]))
        .unwrap();
        assert!(matches!(
            model.uncertainty(&array![[1.]]),
            Err(PredictError::NumericDomainError(_))
        ));
    }

    #[test]
    fn test_constant_basis_offset() {
        let model = line_model(1e-3);
        let xtest = array![[0.5], [1.5], [3.]];
        let res = model
            .get_predictions(&xtest, &PredictionRequest::new().basis(&ConstantBasis()))
            .unwrap();
        let analysis = res.basis_analysis.expect("basis analysis");

        let xt = array![[0.], [1.], [2.]];
        let yt = array![0., 1., 2.];
        let kernels = gaussian(1.);
        let cinv = invert_covariance(&gramian(&xt, &kernels, Some(1e-3)).unwrap()).unwrap();
        let ktb = get_covariance(&xtest, &xt, &kernels).unwrap();
        let ones = Array1::<f64>::ones(3);
        let r = ktb.dot(&cinv).dot(&ones).mapv(|v| 1. - v);
        let beta = ones.dot(&cinv).dot(&yt) / ones.dot(&cinv).dot(&ones);
        assert_abs_diff_eq!(&analysis.g_x - &res.prediction, r * beta, epsilon = 1e-10);
        assert_eq!(analysis.g_cov.dim(), (3, 3));
        assert!(analysis.validation_error.is_none());
    }

    #[test]
    fn test_constant_basis_offset_standardized() {
        let xt = array![[0.], [1.], [2.], [3.]];
        let yt: Array1<f64> = array![0., 10., 20., 35.];
        let model = FitnessPredictor::params(gaussian(1.))
            .optimize_hyperparameters(false)
            .fit(&Dataset::new(xt.clone(), yt.clone()))
            .unwrap();
        let xtest = array![[0.5], [4.]];
        let res = model
            .get_predictions(&xtest, &PredictionRequest::new().basis(&ConstantBasis()))
            .unwrap();
        let analysis = res.basis_analysis.expect("basis analysis");

        // trend fitted on standardized targets, added to destandardized predictions
        let ys = (&yt - yt.mean().unwrap()) / yt.std(0.);
        let kernels = gaussian(1.);
        let cinv = invert_covariance(&gramian(&xt, &kernels, Some(1e-3)).unwrap()).unwrap();
        let ktb = get_covariance(&xtest, &xt, &kernels).unwrap();
        let ones = Array1::<f64>::ones(4);
        let r = ktb.dot(&cinv).dot(&ones).mapv(|v| 1. - v);
        let beta = ones.dot(&cinv).dot(&ys) / ones.dot(&cinv).dot(&ones);
        assert_abs_diff_eq!(&analysis.g_x - &res.prediction, r * beta, epsilon = 1e-10);
    }

    #[test]
    fn test_negative_polynomial_offset_rejected() {
        let fitted: Result<FitnessPredictor<f64>> =
            FitnessPredictor::params(KernelSpec::from(Kernel::polynomial(1, -1.)))
                .standardize_target(false)
                .optimize_hyperparameters(false)
                .fit(&Dataset::new(array![[0.], [1.]], array![0., 1.]));
        assert!(matches!(fitted, Err(PredictError::ConfigurationError(_))));
    }

    #[test]
    fn test_basis_validation_error() {
        let (xt, yt) = sin_data(15, 42);
        let (xv, yv) = sin_data(4, 43);
        let model = FitnessPredictor::params(gaussian(1.))
            .optimize_hyperparameters(false)
            .fit(&Dataset::new(xt, yt))
            .unwrap();
        let analysis = model
            .fixed_basis(&xv, &LinearBasis(), Some(&yv.view()), &Cost::Squared)
            .unwrap();
        let err = analysis.validation_error.expect("validation error");
        assert_abs_diff_eq!(
            err.average,
            analysis.g_x.root_mean_sq_err(&yv).unwrap(),
            epsilon = 1e-12
        );
        let g_cov = &analysis.g_cov;
        assert_abs_diff_eq!(g_cov.to_owned(), g_cov.t().to_owned(), epsilon = 1e-8);
    }

    #[test]
    fn test_cached_inverse() {
        let (xt, yt) = sin_data(10, 42);
        let (xv, _) = sin_data(3, 43);
        let dataset = Dataset::new(xt.clone(), yt);
        let params = FitnessPredictor::params(gaussian(1.))
            .optimize_hyperparameters(false)
            .check_unwrap();
        let model = params.fit(&dataset).unwrap();
        let cinv = invert_covariance(&gramian(&xt, &gaussian(1.), Some(1e-3)).unwrap()).unwrap();
        let cached = params.fit_with_inverse(&dataset, cinv).unwrap();
        assert_abs_diff_eq!(
            cached.predict(&xv).unwrap(),
            model.predict(&xv).unwrap(),
            epsilon = 1e-10
        );
        assert!(matches!(
            params.fit_with_inverse(&dataset, Array2::eye(3)),
            Err(PredictError::DimensionMismatchError(_))
        ));
    }

    #[test]
    fn test_tuned_params() {
        let (xt, yt) = sin_data(15, 42);
        let (xv, _) = sin_data(4, 43);
        let dataset = Dataset::new(xt, yt);
        let model = FitnessPredictor::params(gaussian(0.5))
            .fit(&dataset)
            .expect("fit error");
        assert!(model.likelihood().is_some());
        let width = model.kernels().get("k1").and_then(|k| k.width()).unwrap();
        assert_eq!(width.len(), 2);

        let tuned = model.tuned_params().check_unwrap();
        assert!(!tuned.optimize_hyperparameters());
        assert_eq!(tuned.kernels(), model.kernels());
        assert_eq!(tuned.regularization(), model.regularization());
        let refitted = tuned.fit(&dataset).unwrap();
        assert!(refitted.likelihood().is_none());
        assert_abs_diff_eq!(
            refitted.predict(&xv).unwrap(),
            model.predict(&xv).unwrap(),
            epsilon = 1e-10
        );
    }

    #[test]
    fn test_fit_errors() {
        let xt = array![[0., 1.], [1., 0.], [2., 2.]];
        let model = FitnessPredictor::params(gaussian(1.))
            .optimize_hyperparameters(false)
            .fit(&Dataset::new(xt.clone(), array![1., 2., 3.]))
            .unwrap();
        assert!(matches!(
            model.predict(&array![[1.]]),
            Err(PredictError::DimensionMismatchError(_))
        ));

        let wrong_width = FitnessPredictor::params(KernelSpec::from(Kernel::gaussian(array![
            1., 1., 1.
        ])))
        .optimize_hyperparameters(false)
        .fit(&Dataset::new(xt.clone(), array![1., 2., 3.]));
        assert!(matches!(
            wrong_width,
            Err(PredictError::ConfigurationError(_))
        ));

        let constant = FitnessPredictor::params(gaussian(1.))
            .optimize_hyperparameters(false)
            .fit(&Dataset::new(xt.clone(), array![1., 1., 1.]));
        assert!(matches!(
            constant,
            Err(PredictError::NumericDomainError(_))
        ));

        let singular = FitnessPredictor::params(KernelSpec::from(Kernel::linear()))
            .regularization(0.)
            .standardize_target(false)
            .optimize_hyperparameters(false)
            .fit(&Dataset::new(xt, array![1., 2., 3.]));
        assert!(matches!(singular, Err(PredictError::LinalgError(_))));
    }

    #[test]
    fn test_duplicated_rows() {
        assert!(has_duplicated_rows(&array![[0., 1.], [2., 3.], [0., 1.]]));
        assert!(!has_duplicated_rows(&array![[0., 1.], [1., 0.]]));
    }

    #[test]
    fn test_display() {
        let model = line_model(1e-3);
        assert_eq!(
            model.to_string(),
            "FitnessPredictor(kernels=k1: gaussian(width=[1], scaling=1), regularization=0.001)"
        );
    }
}
