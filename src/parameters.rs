use crate::errors::{PredictError, Result};
use crate::kernels::KernelSpec;
use crate::{
    GP_COBYLA_MAX_EVAL, GP_COBYLA_MIN_EVAL, GP_OPTIM_BOUNDS, GP_OPTIM_N_START, GP_OPTIM_SEED,
};
use linfa::{Float, ParamGuard};

#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// A set of validated predictor parameters.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(serialize = "F: Serialize", deserialize = "F: Deserialize<'de>"))
)]
pub struct PredictorValidParams<F: Float> {
    /// Kernels summed up to build covariance matrices
    pub(crate) kernels: KernelSpec<F>,
    /// Value added to the diagonal of the training covariance
    pub(crate) regularization: F,
    /// Whether training targets are standardized before modelling
    pub(crate) standardize_target: bool,
    /// Whether kernel widths and regularization are tuned at fit time
    pub(crate) optimize_hyperparameters: bool,
    /// Bounds (lower, upper) applied to every tuned hyperparameter
    pub(crate) bounds: (F, F),
    /// Number of additional random starting points of the likelihood optimization
    pub(crate) n_start: usize,
    /// Max number of likelihood evaluations during one optimization
    pub(crate) max_eval: usize,
    /// Seed of the multistart random generator
    pub(crate) seed: u64,
    /// Negative variances above `-uncertainty_tolerance` are clamped to zero
    pub(crate) uncertainty_tolerance: F,
}

impl<F: Float> PredictorValidParams<F> {
    fn with_kernels(kernels: KernelSpec<F>) -> PredictorValidParams<F> {
        PredictorValidParams {
            kernels,
            regularization: F::cast(1e-3),
            standardize_target: true,
            optimize_hyperparameters: true,
            bounds: (F::cast(GP_OPTIM_BOUNDS.0), F::cast(GP_OPTIM_BOUNDS.1)),
            n_start: GP_OPTIM_N_START,
            max_eval: GP_COBYLA_MAX_EVAL,
            seed: GP_OPTIM_SEED,
            uncertainty_tolerance: F::cast(1e-6),
        }
    }

    /// Get kernel specification
    pub fn kernels(&self) -> &KernelSpec<F> {
        &self.kernels
    }

    /// Get regularization
    pub fn regularization(&self) -> F {
        self.regularization
    }

    /// Whether targets get standardized
    pub fn standardize_target(&self) -> bool {
        self.standardize_target
    }

    /// Whether hyperparameters get optimized
    pub fn optimize_hyperparameters(&self) -> bool {
        self.optimize_hyperparameters
    }

    /// Get hyperparameters search bounds
    pub fn bounds(&self) -> (F, F) {
        self.bounds
    }

    /// Get the number of internal optimization restart
    pub fn n_start(&self) -> usize {
        self.n_start
    }

    /// Get the max number of internal likelihood evaluations during one optimization
    pub fn max_eval(&self) -> usize {
        self.max_eval
    }

    /// Get multistart seed
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Get tolerance on negative variances
    pub fn uncertainty_tolerance(&self) -> F {
        self.uncertainty_tolerance
    }
}

#[derive(Clone, Debug)]
/// The set of parameters that can be specified to fit a
/// [fitness predictor](crate::FitnessPredictor).
pub struct PredictorParams<F: Float>(pub(crate) PredictorValidParams<F>);

impl<F: Float> PredictorParams<F> {
    /// A constructor for predictor parameters given kernels
    pub fn new(kernels: KernelSpec<F>) -> PredictorParams<F> {
        Self(PredictorValidParams::with_kernels(kernels))
    }

    /// A constructor for predictor parameters from validated parameters
    pub fn new_from_valid(params: &PredictorValidParams<F>) -> Self {
        Self(params.clone())
    }

    /// Set kernels.
    pub fn kernels(mut self, kernels: KernelSpec<F>) -> Self {
        self.0.kernels = kernels;
        self
    }

    /// Set regularization, initial guess when hyperparameters are optimized.
    pub fn regularization(mut self, regularization: F) -> Self {
        self.0.regularization = regularization;
        self
    }

    /// Set whether training targets are standardized.
    pub fn standardize_target(mut self, standardize_target: bool) -> Self {
        self.0.standardize_target = standardize_target;
        self
    }

    /// Set whether gaussian kernel widths and regularization are optimized.
    pub fn optimize_hyperparameters(mut self, optimize: bool) -> Self {
        self.0.optimize_hyperparameters = optimize;
        self
    }

    /// Set hyperparameters search space, the same bounds apply to every width and
    /// to regularization.
    pub fn bounds(mut self, lower: F, upper: F) -> Self {
        self.0.bounds = (lower, upper);
        self
    }

    /// Set the number of additional hyperparameters optimization restarts
    pub fn n_start(mut self, n_start: usize) -> Self {
        self.0.n_start = n_start;
        self
    }

    /// Set the max number of internal likelihood evaluations during one optimization
    /// Given max_eval has to be greater than [crate::GP_COBYLA_MIN_EVAL] otherwise
    /// max_eval is set to [crate::GP_COBYLA_MIN_EVAL].
    pub fn max_eval(mut self, max_eval: usize) -> Self {
        self.0.max_eval = GP_COBYLA_MIN_EVAL.max(max_eval);
        self
    }

    /// Set the seed used to draw multistart points
    pub fn seed(mut self, seed: u64) -> Self {
        self.0.seed = seed;
        self
    }

    /// Set the tolerance under which a negative predictive variance is an error
    /// rather than a round-off to be clamped to zero.
    pub fn uncertainty_tolerance(mut self, tolerance: F) -> Self {
        self.0.uncertainty_tolerance = tolerance;
        self
    }
}

impl<F: Float> From<PredictorValidParams<F>> for PredictorParams<F> {
    fn from(valid: PredictorValidParams<F>) -> Self {
        PredictorParams(valid)
    }
}

impl<F: Float> ParamGuard for PredictorParams<F> {
    type Checked = PredictorValidParams<F>;
    type Error = PredictError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        if self.0.kernels.is_empty() {
            return Err(PredictError::ConfigurationError(
                "At least one kernel should be specified".to_string(),
            ));
        }
        if !(self.0.regularization >= F::zero()) {
            return Err(PredictError::ConfigurationError(format!(
                "Regularization should be non negative, got {}",
                self.0.regularization
            )));
        }
        let (lo, up) = self.0.bounds;
        if !(lo > F::zero() && lo < up) {
            return Err(PredictError::ConfigurationError(format!(
                "Hyperparameters bounds should verify 0 < lower < upper, got ({lo}, {up})"
            )));
        }
        if !(self.0.uncertainty_tolerance >= F::zero()) {
            return Err(PredictError::ConfigurationError(format!(
                "Uncertainty tolerance should be non negative, got {}",
                self.0.uncertainty_tolerance
            )));
        }
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}
