//! This library implements kernel ridge regression, seen as [Gaussian Process](https://en.wikipedia.org/wiki/Gaussian_process)
//! prediction, of a scalar target (the "fitness") from fixed-length feature vectors
//! (the "fingerprints") describing physical structures.
//!
//! Prediction is implemented by [FitnessPredictor] parameterized by [PredictorParams]:
//! kernels summed up from the [kernels] library give the training and test-train covariances,
//! gaussian kernel widths and regularization may be tuned by maximizing the
//! [log marginal likelihood](likelihood::log_marginal_likelihood), and predictions come with
//! optional uncertainty, error [metrics] and a fixed [basis] residual model.
//!
//! The [learning_curve] module evaluates models versus training set size on a worker pool.
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
mod algorithm;
pub mod basis;
pub mod covariance;
mod errors;
pub mod hyperparameters;
pub mod kernels;
pub mod learning_curve;
pub mod likelihood;
pub mod metrics;
pub mod standardize;

mod parameters;

mod optimization;

pub use algorithm::*;
pub use errors::*;
pub use parameters::*;
