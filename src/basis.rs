//! Basis functions used by the fixed-basis residual model
//! (see [`crate::FitnessPredictor::fixed_basis`]).
//!
//! A basis function maps each fingerprint row to a (nb,) basis vector. The following
//! bases are implemented:
//! * constant,
//! * linear,
//! * quadratic,
//! * any row-wise closure through [`FnBasis`].

use crate::errors::{PredictError, Result};
use linfa::Float;
use ndarray::{concatenate, s, Array1, Array2, ArrayView1, ArrayView2, Axis};
use paste::paste;
use std::fmt;

/// A trait for basis transforms applied row-wise to fingerprints
pub trait BasisFunction<F: Float>: Sync {
    /// Compute the (n, nb) basis matrix of the given (n, nx) `x` fingerprints.
    fn value(&self, x: &ArrayView2<F>) -> Result<Array2<F>>;
}

/// A constant basis, the residual trend is a bias term
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct ConstantBasis();

impl<F: Float> BasisFunction<F> for ConstantBasis {
    /// basis(x) = [1]
    fn value(&self, x: &ArrayView2<F>) -> Result<Array2<F>> {
        Ok(Array2::<F>::ones((x.nrows(), 1)))
    }
}

/// An affine basis
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct LinearBasis();

impl<F: Float> BasisFunction<F> for LinearBasis {
    /// basis(x) = [ 1, x_1, ..., x_n ]
    fn value(&self, x: &ArrayView2<F>) -> Result<Array2<F>> {
        Ok(concatenate![
            Axis(1),
            Array2::<F>::ones((x.nrows(), 1)),
            x.to_owned()
        ])
    }
}

/// A 2-degree polynomial basis
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct QuadraticBasis();

impl<F: Float> BasisFunction<F> for QuadraticBasis {
    /// basis(x) = [ 1, { x_i, i = 1,...,n }, { x_i * x_j,  (i,j) = 1,...,n  , j >= i } ]
    fn value(&self, x: &ArrayView2<F>) -> Result<Array2<F>> {
        let mut res = concatenate![
            Axis(1),
            Array2::<F>::ones((x.nrows(), 1)),
            x.to_owned()
        ];
        for k in 0..x.ncols() {
            let part = x.slice(s![.., k..]).to_owned() * x.slice(s![.., k..k + 1]);
            res = concatenate![Axis(1), res, part]
        }
        Ok(res)
    }
}

macro_rules! declare_basis_display {
    ($basis:ident) => {
        paste! {
            impl fmt::Display for [<$basis Basis>] {
                fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                    write!(f, "{}Basis", stringify!($basis))
                }
            }
        }
    };
}

declare_basis_display!(Constant);
declare_basis_display!(Linear);
declare_basis_display!(Quadratic);

/// A basis given as a closure mapping one fingerprint to its basis vector
pub struct FnBasis<Fun>(pub Fun);

impl<F, Fun> BasisFunction<F> for FnBasis<Fun>
where
    F: Float,
    Fun: Fn(ArrayView1<F>) -> Array1<F> + Sync,
{
    fn value(&self, x: &ArrayView2<F>) -> Result<Array2<F>> {
        let rows = x.rows().into_iter().map(&self.0).collect::<Vec<_>>();
        let nb = rows.first().map_or(0, |r| r.len());
        if let Some((i, r)) = rows.iter().enumerate().find(|(_, r)| r.len() != nb) {
            return Err(PredictError::DimensionMismatchError(format!(
                "Basis function output of row {i} has length {}, expected {nb}",
                r.len()
            )));
        }
        let mut res = Array2::<F>::zeros((x.nrows(), nb));
        for (mut row, r) in res.rows_mut().into_iter().zip(rows.iter()) {
            row.assign(r);
        }
        Ok(res)
    }
}

impl<Fun> fmt::Display for FnBasis<Fun> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "FnBasis")
    }
}
