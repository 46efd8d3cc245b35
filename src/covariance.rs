//! Dense covariance matrices built from pairwise kernel evaluations.

use crate::errors::{PredictError, Result};
use crate::kernels::KernelSpec;
use linfa::Float;
use linfa_linalg::{cholesky::*, triangular::*};
use ndarray::{Array2, ArrayBase, Data, Ix2};

/// Compute the (n, n) Gram matrix of the rows of `x` for the combined `kernels`.
///
/// When given, `regularization` is added to every diagonal entry.
pub fn gramian<F: Float>(
    x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    kernels: &KernelSpec<F>,
    regularization: Option<F>,
) -> Result<Array2<F>> {
    kernels.check(x.ncols())?;
    let mut k = combined_matrix(x, x, kernels);
    if let Some(reg) = regularization {
        k.diag_mut().mapv_inplace(|v| v + reg);
    }
    Ok(k)
}

/// Compute the (m, n) covariance matrix between the m rows of `test`
/// and the n rows of `train`. No regularization is ever applied.
pub fn get_covariance<F: Float>(
    test: &ArrayBase<impl Data<Elem = F>, Ix2>,
    train: &ArrayBase<impl Data<Elem = F>, Ix2>,
    kernels: &KernelSpec<F>,
) -> Result<Array2<F>> {
    if test.ncols() != train.ncols() {
        return Err(PredictError::DimensionMismatchError(format!(
            "Test fingerprints have {} features while training fingerprints have {}",
            test.ncols(),
            train.ncols()
        )));
    }
    kernels.check(train.ncols())?;
    Ok(combined_matrix(test, train, kernels))
}

/// Invert a symmetric positive definite covariance matrix.
///
/// Uses the Cholesky factorization `C = L.L^t` hence `C^-1 = L^-t.L^-1`,
/// a singular matrix is reported as a linear algebra error.
pub fn invert_covariance<F: Float>(cov: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array2<F>> {
    let chol = cov.to_owned().cholesky()?;
    let linv = chol.solve_triangular(&Array2::<F>::eye(cov.nrows()), UPLO::Lower)?;
    Ok(linv.t().dot(&linv))
}

fn combined_matrix<F: Float>(
    a: &ArrayBase<impl Data<Elem = F>, Ix2>,
    b: &ArrayBase<impl Data<Elem = F>, Ix2>,
    kernels: &KernelSpec<F>,
) -> Array2<F> {
    kernels
        .iter()
        .fold(Array2::zeros((a.nrows(), b.nrows())), |acc, (_, k)| {
            acc + k.matrix(a, b)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::Kernel;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array};
    use ndarray_rand::rand::SeedableRng;
    use ndarray_rand::rand_distr::Uniform;
    use ndarray_rand::RandomExt;
    use rand_xoshiro::Xoshiro256Plus;

    fn spec() -> KernelSpec<f64> {
        KernelSpec::new()
            .with("k1", Kernel::gaussian(array![0.8, 1.3]))
            .with("k2", Kernel::laplacian(array![2.]).with_scaling(0.3))
            .with("k3", Kernel::polynomial(2, 0.5).with_scaling(0.1))
    }

    #[test]
    fn test_gramian_symmetry() {
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let x = Array::random_using((10, 2), Uniform::new(-2., 2.), &mut rng);
        let k = gramian(&x, &spec(), Some(1e-3)).expect("gram matrix");
        for i in 0..x.nrows() {
            for j in 0..x.nrows() {
                assert_eq!(k[[i, j]], k[[j, i]]);
            }
        }
    }

    #[test]
    fn test_regularization_on_diagonal() {
        let mut rng = Xoshiro256Plus::seed_from_u64(0);
        let x = Array::random_using((7, 2), Uniform::new(0., 1.), &mut rng);
        let k0 = gramian(&x, &spec(), None).unwrap();
        let kr = gramian(&x, &spec(), Some(0.25)).unwrap();
        let diff = &kr - &k0;
        assert_abs_diff_eq!(diff, Array2::<f64>::eye(7) * 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_covariance_shape_and_values() {
        let train = array![[0.], [1.], [2.]];
        let test = array![[0.5], [1.]];
        let kernels = KernelSpec::from(Kernel::gaussian(array![1.]));
        let ktb = get_covariance(&test, &train, &kernels).unwrap();
        assert_eq!(ktb.dim(), (2, 3));
        assert_abs_diff_eq!(ktb[[0, 0]], f64::exp(-0.25), epsilon = 1e-12);
        assert_abs_diff_eq!(ktb[[1, 1]], 1., epsilon = 1e-12);
        let k = gramian(&train, &kernels, None).unwrap();
        assert_abs_diff_eq!(ktb.row(1), k.row(1), epsilon = 1e-12);
    }

    #[test]
    fn test_covariance_column_mismatch() {
        let kernels = KernelSpec::from(Kernel::linear());
        let res = get_covariance(&array![[0., 1.]], &array![[0.], [1.]], &kernels);
        assert!(matches!(res, Err(PredictError::DimensionMismatchError(_))));
    }

    #[test]
    fn test_invert_covariance() {
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let x = Array::random_using((8, 3), Uniform::new(-1., 1.), &mut rng);
        let k = gramian(&x, &KernelSpec::from(Kernel::gaussian(array![1.])), Some(1e-2)).unwrap();
        let kinv = invert_covariance(&k).expect("invertible");
        assert_abs_diff_eq!(k.dot(&kinv), Array2::<f64>::eye(8), epsilon = 1e-8);
    }

    #[test]
    fn test_invert_singular_covariance() {
        // duplicated rows without regularization
        let x = array![[0.3], [0.3], [1.0]];
        let k = gramian(&x, &KernelSpec::from(Kernel::gaussian(array![1.])), None).unwrap();
        assert!(matches!(
            invert_covariance(&k),
            Err(PredictError::LinalgError(_))
        ));
    }
}
