//! A module for cost functions measuring the error of predictions relative to target data.
//!
//! Discussed in: Rosasco et al, "Are loss functions all the same?",
//! Neural Computation 16.5 (2004): 1063-1076.

use crate::errors::{PredictError, Result};
use linfa::Float;
use ndarray::{Array1, ArrayBase, Data, Ix1, Zip};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Cost function used to compute prediction errors
#[derive(Clone, Copy, Debug, PartialEq, Default)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(tag = "cost", rename_all = "lowercase")
)]
pub enum Cost<F: Float> {
    /// Root mean squared error
    #[default]
    Squared,
    /// Mean absolute error
    Absolute,
    /// Epsilon-insensitive error: absolute errors below `epsilon` are ignored
    Insensitive {
        /// Threshold of the insensitive error
        epsilon: F,
    },
}

impl<F: Float> Cost<F> {
    /// Cost function from its name, `epsilon` being required by the `insensitive` cost
    pub fn from_name(name: &str, epsilon: Option<F>) -> Result<Self> {
        match (name, epsilon) {
            ("squared", _) => Ok(Cost::Squared),
            ("absolute", _) => Ok(Cost::Absolute),
            ("insensitive", Some(epsilon)) => Ok(Cost::Insensitive { epsilon }),
            ("insensitive", None) => Err(PredictError::ConfigurationError(
                "Insensitive cost requires an epsilon threshold".to_string(),
            )),
            (other, _) => Err(PredictError::ConfigurationError(format!(
                "Unknown cost function '{other}', should be one of \
                'squared', 'absolute' or 'insensitive'"
            ))),
        }
    }
}

/// Parse `squared` or `absolute`, the `insensitive` cost needing an epsilon
/// is built with [`Cost::from_name`].
impl<F: Float> FromStr for Cost<F> {
    type Err = PredictError;

    fn from_str(s: &str) -> Result<Self> {
        Cost::from_name(s, None)
    }
}

impl<F: Float> fmt::Display for Cost<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Cost::Squared => write!(f, "squared"),
            Cost::Absolute => write!(f, "absolute"),
            Cost::Insensitive { epsilon } => write!(f, "insensitive(epsilon={epsilon})"),
        }
    }
}

/// Pointwise and averaged errors
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(serialize = "F: Serialize", deserialize = "F: Deserialize<'de>"))
)]
pub struct ErrorSummary<F: Float> {
    /// Error for each prediction
    pub all: Array1<F>,
    /// Averaged error
    pub average: F,
}

/// Compute the error of `prediction` relative to `target` for the given `cost`.
///
/// With the squared cost, `all` holds pointwise absolute errors
/// while `average` is the root mean squared error.
pub fn get_error<F: Float>(
    prediction: &ArrayBase<impl Data<Elem = F>, Ix1>,
    target: &ArrayBase<impl Data<Elem = F>, Ix1>,
    cost: &Cost<F>,
) -> Result<ErrorSummary<F>> {
    if prediction.len() != target.len() {
        let which = if prediction.len() < target.len() {
            "more targets than predictions"
        } else {
            "fewer targets than predictions"
        };
        return Err(PredictError::DimensionMismatchError(format!(
            "Something has gone wrong and there are {which} ({} predictions, {} targets)",
            prediction.len(),
            target.len()
        )));
    }
    let n = F::cast(prediction.len());
    let mut diff = Array1::<F>::zeros(prediction.len());
    Zip::from(&mut diff)
        .and(prediction)
        .and(target)
        .for_each(|d, &p, &t| *d = p - t);

    let summary = match cost {
        Cost::Squared => {
            let e = diff.mapv(|v| v * v);
            ErrorSummary {
                all: e.mapv(|v| v.sqrt()),
                average: (e.sum() / n).sqrt(),
            }
        }
        Cost::Absolute => {
            let e = diff.mapv(|v| v.abs());
            let average = e.sum() / n;
            ErrorSummary { all: e, average }
        }
        Cost::Insensitive { epsilon } => {
            let e = diff.mapv(|v| (v.abs() - *epsilon).max(F::zero()));
            let average = e.sum() / n;
            ErrorSummary { all: e, average }
        }
    };
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use ndarray_stats::DeviationExt;

    #[test]
    fn test_zero_error_for_every_cost() {
        let y = array![0.5, -1.2, 3.3];
        for cost in [
            Cost::Squared,
            Cost::Absolute,
            Cost::Insensitive { epsilon: 0.1 },
        ] {
            let err = get_error(&y, &y, &cost).unwrap();
            assert_eq!(err.all, Array1::<f64>::zeros(3));
            assert_eq!(err.average, 0.);
        }
    }

    #[test]
    fn test_squared_error() {
        let p = array![1., 2., 3., 4.];
        let t = array![1.5, 1., 3., 6.];
        let err = get_error(&p, &t, &Cost::Squared).unwrap();
        assert_abs_diff_eq!(err.all, array![0.5, 1., 0., 2.], epsilon = 1e-12);
        assert_abs_diff_eq!(err.average, p.root_mean_sq_err(&t).unwrap(), epsilon = 1e-12);
    }

    #[test]
    fn test_absolute_and_insensitive_errors() {
        let p = array![1., 2., 3., 4.];
        let t = array![1.5, 1., 3., 6.];
        let err = get_error(&p, &t, &Cost::Absolute).unwrap();
        assert_abs_diff_eq!(err.average, 0.875, epsilon = 1e-12);

        let err = get_error(&p, &t, &Cost::Insensitive { epsilon: 0.75 }).unwrap();
        assert_abs_diff_eq!(err.all, array![0., 0.25, 0., 1.25], epsilon = 1e-12);
        assert_abs_diff_eq!(err.average, 0.375, epsilon = 1e-12);
    }

    #[test]
    fn test_length_mismatch() {
        let res = get_error(&array![1., 2.], &array![1., 2., 3.], &Cost::Squared);
        match res {
            Err(PredictError::DimensionMismatchError(msg)) => {
                assert!(msg.contains("more targets than predictions"))
            }
            _ => panic!("dimension mismatch expected"),
        }
        let res = get_error(&array![1., 2.], &array![1.], &Cost::Absolute);
        match res {
            Err(PredictError::DimensionMismatchError(msg)) => {
                assert!(msg.contains("fewer targets than predictions"))
            }
            _ => panic!("dimension mismatch expected"),
        }
    }

    #[test]
    fn test_cost_from_name() {
        assert_eq!(Cost::<f64>::from_name("squared", None).unwrap(), Cost::Squared);
        assert_eq!(
            Cost::from_name("insensitive", Some(0.2)).unwrap(),
            Cost::Insensitive { epsilon: 0.2 }
        );
        assert!(matches!(
            Cost::<f64>::from_name("insensitive", None),
            Err(PredictError::ConfigurationError(_))
        ));
        assert!(matches!(
            Cost::<f64>::from_name("hinge", None),
            Err(PredictError::ConfigurationError(_))
        ));
        assert_eq!("absolute".parse::<Cost<f64>>().unwrap(), Cost::Absolute);
        assert!("insensitive".parse::<Cost<f64>>().is_err());
    }
}
