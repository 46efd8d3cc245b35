use thiserror::Error;

/// A result type for fitness prediction
pub type Result<T> = std::result::Result<T, PredictError>;

/// An error when fitting or using a [`FitnessPredictor`](crate::FitnessPredictor)
#[derive(Error, Debug)]
pub enum PredictError {
    /// When kernel, cost or optimization settings are not supported
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    /// When matrices or vectors sizes are not consistent
    #[error("Dimension mismatch error: {0}")]
    DimensionMismatchError(String),
    /// When linear algebra computation fails (singular covariance matrix)
    #[error(transparent)]
    LinalgError(#[from] linfa_linalg::LinalgError),
    /// When a computation leaves its numerical domain
    #[error("Numeric domain error: {0}")]
    NumericDomainError(String),
    /// When error due to a bad value
    #[error("InvalidValue error: {0}")]
    InvalidValueError(String),
    /// When a linfa error occurs
    #[error(transparent)]
    LinfaError(#[from] linfa::error::Error),
    /// When the learning curve worker pool cannot be built
    #[error("Thread pool error: {0}")]
    ThreadPoolError(#[from] rayon::ThreadPoolBuildError),
}
