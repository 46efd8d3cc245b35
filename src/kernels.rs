//! A module for kernel functions measuring the similarity between two fingerprints.
//!
//! The following kernels are implemented:
//! * linear,
//! * polynomial,
//! * gaussian (RBF) with isotropic or anisotropic width,
//! * laplacian.
//!
//! Several kernels gathered in a [`KernelSpec`] are combined by summation,
//! each one being weighted by its own scaling factor.

use crate::errors::{PredictError, Result};
use linfa::Float;
use ndarray::{Array1, Array2, ArrayBase, Data, Ix1, Ix2, Zip};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Kernel function names
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serializable", serde(rename_all = "lowercase"))]
pub enum KernelType {
    /// Dot product kernel
    Linear,
    /// Dot product raised to an integer degree
    Polynomial,
    /// Squared exponential kernel
    Gaussian,
    /// Absolute exponential kernel
    Laplacian,
}

impl FromStr for KernelType {
    type Err = PredictError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "linear" => Ok(KernelType::Linear),
            "polynomial" => Ok(KernelType::Polynomial),
            "gaussian" => Ok(KernelType::Gaussian),
            "laplacian" => Ok(KernelType::Laplacian),
            other => Err(PredictError::ConfigurationError(format!(
                "Unknown kernel type '{other}', should be one of \
                'linear', 'polynomial', 'gaussian' or 'laplacian'"
            ))),
        }
    }
}

impl fmt::Display for KernelType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            KernelType::Linear => "linear",
            KernelType::Polynomial => "polynomial",
            KernelType::Gaussian => "gaussian",
            KernelType::Laplacian => "laplacian",
        };
        write!(f, "{name}")
    }
}

/// A kernel descriptor: kernel function with its hyperparameters.
///
/// Every kernel value is multiplied by `scaling` (a.k.a. kfree) before
/// being summed with the other kernels of a [`KernelSpec`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(tag = "type", rename_all = "lowercase"),
    serde(bound(serialize = "F: Serialize", deserialize = "F: Deserialize<'de>"))
)]
pub enum Kernel<F: Float> {
    /// k(x, y) = x.y
    Linear {
        /// Multiplicative factor
        scaling: F,
    },
    /// k(x, y) = (x.y + offset)^degree
    Polynomial {
        /// Polynomial degree (>= 1)
        degree: i32,
        /// Added to the dot product before exponentiation
        offset: F,
        /// Multiplicative factor
        scaling: F,
    },
    /// k(x, y) = exp(-|(x - y) / width|^2)
    Gaussian {
        /// Either one width shared by all features or one width per feature
        width: Array1<F>,
        /// Multiplicative factor
        scaling: F,
    },
    /// k(x, y) = exp(-|x - y|_1 / width)
    Laplacian {
        /// Either one width shared by all features or one width per feature
        width: Array1<F>,
        /// Multiplicative factor
        scaling: F,
    },
}

impl<F: Float> Kernel<F> {
    /// Linear kernel
    pub fn linear() -> Self {
        Kernel::Linear { scaling: F::one() }
    }

    /// Polynomial kernel of given `degree` and `offset`
    pub fn polynomial(degree: i32, offset: F) -> Self {
        Kernel::Polynomial {
            degree,
            offset,
            scaling: F::one(),
        }
    }

    /// Gaussian kernel, `width` being either a 1-dim array or one value per feature
    pub fn gaussian(width: Array1<F>) -> Self {
        Kernel::Gaussian {
            width,
            scaling: F::one(),
        }
    }

    /// Laplacian kernel, `width` being either a 1-dim array or one value per feature
    pub fn laplacian(width: Array1<F>) -> Self {
        Kernel::Laplacian {
            width,
            scaling: F::one(),
        }
    }

    /// Set the multiplicative factor of the kernel
    pub fn with_scaling(mut self, value: F) -> Self {
        match &mut self {
            Kernel::Linear { scaling }
            | Kernel::Polynomial { scaling, .. }
            | Kernel::Gaussian { scaling, .. }
            | Kernel::Laplacian { scaling, .. } => *scaling = value,
        }
        self
    }

    /// Kernel function name
    pub fn kernel_type(&self) -> KernelType {
        match self {
            Kernel::Linear { .. } => KernelType::Linear,
            Kernel::Polynomial { .. } => KernelType::Polynomial,
            Kernel::Gaussian { .. } => KernelType::Gaussian,
            Kernel::Laplacian { .. } => KernelType::Laplacian,
        }
    }

    /// Multiplicative factor of the kernel
    pub fn scaling(&self) -> F {
        match self {
            Kernel::Linear { scaling }
            | Kernel::Polynomial { scaling, .. }
            | Kernel::Gaussian { scaling, .. }
            | Kernel::Laplacian { scaling, .. } => *scaling,
        }
    }

    /// Width hyperparameters if any
    pub fn width(&self) -> Option<&Array1<F>> {
        match self {
            Kernel::Gaussian { width, .. } | Kernel::Laplacian { width, .. } => Some(width),
            _ => None,
        }
    }

    /// Check hyperparameters against the fingerprint dimension `dim`
    ///
    /// Negative `scaling` or polynomial `offset` are rejected: the Gram matrix
    /// has to stay positive semi-definite.
    pub fn check(&self, dim: usize) -> Result<()> {
        let scaling = self.scaling();
        if !(scaling >= F::zero()) {
            return Err(PredictError::ConfigurationError(format!(
                "{} kernel scaling should be >= 0, got {scaling}",
                self.kernel_type()
            )));
        }
        match self {
            Kernel::Linear { .. } => Ok(()),
            Kernel::Polynomial { degree, offset, .. } => {
                if *degree < 1 {
                    return Err(PredictError::ConfigurationError(format!(
                        "Polynomial kernel degree should be >= 1, got {degree}"
                    )));
                }
                if !(*offset >= F::zero()) {
                    return Err(PredictError::ConfigurationError(format!(
                        "Polynomial kernel offset should be >= 0, got {offset}"
                    )));
                }
                Ok(())
            }
            Kernel::Gaussian { width, .. } | Kernel::Laplacian { width, .. } => {
                if width.len() != 1 && width.len() != dim {
                    return Err(PredictError::ConfigurationError(format!(
                        "{} kernel width should be either 1-dim or fingerprint dim ({}), got {}",
                        self.kernel_type(),
                        dim,
                        width.len()
                    )));
                }
                if width.iter().any(|w| !(*w > F::zero())) {
                    return Err(PredictError::ConfigurationError(format!(
                        "{} kernel widths should be positive, got {}",
                        self.kernel_type(),
                        width
                    )));
                }
                Ok(())
            }
        }
    }

    /// Kernel value between fingerprints `x` and `y`, scaling included.
    ///
    /// *Panics* if `x` and `y` have not the same length.
    pub fn value(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix1>,
        y: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> F {
        assert!(x.len() == y.len());
        let v = match self {
            Kernel::Linear { .. } => x.dot(y),
            Kernel::Polynomial { degree, offset, .. } => (x.dot(y) + *offset).powi(*degree),
            Kernel::Gaussian { width, .. } => {
                let mut d2 = F::zero();
                Zip::indexed(x).and(y).for_each(|k, &xk, &yk| {
                    let dk = (xk - yk) / width_at(width, k);
                    d2 += dk * dk;
                });
                F::exp(-d2)
            }
            Kernel::Laplacian { width, .. } => {
                let mut d1 = F::zero();
                Zip::indexed(x).and(y).for_each(|k, &xk, &yk| {
                    d1 += (xk - yk).abs() / width_at(width, k);
                });
                F::exp(-d1)
            }
        };
        self.scaling() * v
    }

    /// Kernel values between rows of `a` (n, nx) and rows of `b` (m, nx) as a (n, m) matrix
    pub fn matrix(
        &self,
        a: &ArrayBase<impl Data<Elem = F>, Ix2>,
        b: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Array2<F> {
        let b = b.view();
        let mut k = Array2::zeros((a.nrows(), b.nrows()));
        Zip::from(k.rows_mut())
            .and(a.rows())
            .par_for_each(|mut krow, ai| {
                Zip::from(&mut krow)
                    .and(b.rows())
                    .for_each(|kij, bj| *kij = self.value(&ai, &bj));
            });
        k
    }
}

#[inline]
fn width_at<F: Float>(width: &Array1<F>, k: usize) -> F {
    if width.len() == 1 {
        width[0]
    } else {
        width[k]
    }
}

impl<F: Float> fmt::Display for Kernel<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Kernel::Linear { scaling } => write!(f, "linear(scaling={scaling})"),
            Kernel::Polynomial {
                degree,
                offset,
                scaling,
            } => write!(
                f,
                "polynomial(degree={degree}, offset={offset}, scaling={scaling})"
            ),
            Kernel::Gaussian { width, scaling } => {
                write!(f, "gaussian(width={width}, scaling={scaling})")
            }
            Kernel::Laplacian { width, scaling } => {
                write!(f, "laplacian(width={width}, scaling={scaling})")
            }
        }
    }
}

/// A set of named kernels whose values are summed
#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(transparent),
    serde(bound(serialize = "F: Serialize", deserialize = "F: Deserialize<'de>"))
)]
pub struct KernelSpec<F: Float> {
    kernels: BTreeMap<String, Kernel<F>>,
}

impl<F: Float> From<Kernel<F>> for KernelSpec<F> {
    fn from(kernel: Kernel<F>) -> Self {
        KernelSpec::new().with("k1", kernel)
    }
}

impl<F: Float> KernelSpec<F> {
    /// An empty kernel specification
    pub fn new() -> Self {
        KernelSpec {
            kernels: BTreeMap::new(),
        }
    }

    /// Add (or replace) the kernel registered under `name`
    pub fn with(mut self, name: &str, kernel: Kernel<F>) -> Self {
        self.insert(name, kernel);
        self
    }

    /// Add (or replace) the kernel registered under `name`
    pub fn insert(&mut self, name: &str, kernel: Kernel<F>) -> Option<Kernel<F>> {
        self.kernels.insert(name.to_string(), kernel)
    }

    /// Kernel registered under `name`
    pub fn get(&self, name: &str) -> Option<&Kernel<F>> {
        self.kernels.get(name)
    }

    /// Number of kernels
    pub fn len(&self) -> usize {
        self.kernels.len()
    }

    /// Whether no kernel is specified
    pub fn is_empty(&self) -> bool {
        self.kernels.is_empty()
    }

    /// Iterate over (name, kernel) pairs in name order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Kernel<F>)> {
        self.kernels.iter()
    }

    /// Check every kernel against the fingerprint dimension `dim`
    pub fn check(&self, dim: usize) -> Result<()> {
        if self.is_empty() {
            return Err(PredictError::ConfigurationError(
                "At least one kernel should be specified".to_string(),
            ));
        }
        self.kernels.values().try_for_each(|k| k.check(dim))
    }

    /// Combined kernel value: sum of the (scaled) values of every kernel
    pub fn value(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix1>,
        y: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> F {
        self.kernels
            .values()
            .fold(F::zero(), |acc, k| acc + k.value(x, y))
    }
}

impl<F: Float> fmt::Display for KernelSpec<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let descr = self
            .kernels
            .iter()
            .map(|(name, k)| format!("{name}: {k}"))
            .collect::<Vec<_>>()
            .join(" + ");
        write!(f, "{descr}")
    }
}
