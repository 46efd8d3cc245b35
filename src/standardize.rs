//! Standardization of training targets to zero mean and unit variance.

use crate::errors::{PredictError, Result};
use linfa::Float;
use ndarray::{Array1, ArrayBase, Data, Ix1};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// A structure to store a standardized target vector with the mean and
/// (population) standard deviation used to compute it.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(serialize = "F: Serialize", deserialize = "F: Deserialize<'de>"))
)]
pub struct TargetStandardization<F: Float> {
    /// standardized targets
    pub target: Array1<F>,
    /// mean computed from targets
    pub mean: F,
    /// standard deviation computed from targets
    pub std: F,
}

impl<F: Float> TargetStandardization<F> {
    /// Standardize `target` to zero mean and unit variance.
    ///
    /// A constant target vector has no defined standardization and is rejected.
    pub fn new(target: &ArrayBase<impl Data<Elem = F>, Ix1>) -> Result<TargetStandardization<F>> {
        let mean = target.mean().ok_or_else(|| {
            PredictError::NumericDomainError("Cannot standardize an empty target".to_string())
        })?;
        let std = target.std(F::zero());
        if !(std > F::zero()) {
            return Err(PredictError::NumericDomainError(format!(
                "Cannot standardize target with zero variance (std={std})"
            )));
        }
        Ok(TargetStandardization {
            target: target.mapv(|v| (v - mean) / std),
            mean,
            std,
        })
    }

    /// Transform standardized values back to the original target scale
    pub fn inverse(&self, values: &ArrayBase<impl Data<Elem = F>, Ix1>) -> Array1<F> {
        values.mapv(|v| v * self.std + self.mean)
    }
}

/// Standardize `target`, see [`TargetStandardization::new`]
pub fn target_standardize<F: Float>(
    target: &ArrayBase<impl Data<Elem = F>, Ix1>,
) -> Result<TargetStandardization<F>> {
    TargetStandardization::new(target)
}
