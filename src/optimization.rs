use ndarray::{arr1, s, Array, Array1, Array2, Zip};
use ndarray_rand::rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;

use linfa::prelude::Float;

pub(crate) struct CobylaParams {
    pub rhobeg: f64,
    pub ftol_rel: f64,
    pub maxeval: usize,
}

impl Default for CobylaParams {
    fn default() -> Self {
        CobylaParams {
            rhobeg: 0.5,
            ftol_rel: 1e-4,
            maxeval: 200,
        }
    }
}

/// Build the (n_start + 1, n) matrix of starting points in log10 space:
/// the user given `theta0` first, then `n_start` points drawn uniformly
/// within `bounds`. Returns also the bounds in log10 space.
pub(crate) fn prepare_multistart<F: Float>(
    n_start: usize,
    theta0: &Array1<F>,
    bounds: &[(F, F)],
    seed: u64,
) -> (Array2<F>, Vec<(F, F)>) {
    // Use log10 theta as optimization parameter
    let bounds: Vec<(F, F)> = bounds
        .iter()
        .map(|(lo, up)| (lo.log10(), up.log10()))
        .collect();

    let mut theta0s = Array2::zeros((n_start + 1, theta0.len()));
    Zip::from(theta0s.row_mut(0))
        .and(theta0)
        .and(&bounds)
        .for_each(|t, &v, &(lo, up)| {
            // starting point has to lie within bounds (regularization may be 0)
            *t = if v > F::zero() {
                v.log10().max(lo).min(up)
            } else {
                lo
            }
        });

    if n_start > 0 {
        let mut rng = Xoshiro256Plus::seed_from_u64(seed);
        let mut starts = theta0s.slice_mut(s![1.., ..]);
        for mut row in starts.rows_mut() {
            let vals = bounds
                .iter()
                .map(|(lo, up)| F::cast(rng.gen_range(into_f64(lo)..into_f64(up))))
                .collect::<Vec<_>>();
            row.assign(&Array::from_vec(vals));
        }
    }
    (theta0s, bounds)
}

/// Optimize hyper parameters given an initial guess and bounds with NLOPT::Cobyla
#[cfg(feature = "nlopt")]
pub(crate) fn optimize_params<ObjF, F>(
    objfn: ObjF,
    param0: &Array1<F>,
    bounds: &[(F, F)],
    cobyla: CobylaParams,
) -> (f64, Array1<f64>)
where
    ObjF: Fn(&[f64], Option<&mut [f64]>, &mut ()) -> f64,
    F: Float,
{
    use nlopt::*;

    let mut optimizer = Nlopt::new(Algorithm::Cobyla, param0.len(), objfn, Target::Minimize, ());
    let mut param = param0.map(into_f64).into_raw_vec();

    let lower_bounds = bounds.iter().map(|b| into_f64(&b.0)).collect::<Vec<_>>();
    let upper_bounds = bounds.iter().map(|b| into_f64(&b.1)).collect::<Vec<_>>();
    let configured = optimizer
        .set_lower_bounds(&lower_bounds)
        .and_then(|_| optimizer.set_upper_bounds(&upper_bounds))
        .and_then(|_| optimizer.set_initial_step1(cobyla.rhobeg))
        .and_then(|_| optimizer.set_maxeval(cobyla.maxeval as u32))
        .and_then(|_| optimizer.set_ftol_rel(cobyla.ftol_rel));
    if let Err(status) = configured {
        log::warn!("NLOPT optimizer setup failure status={status:?}");
        return (f64::INFINITY, arr1(&param));
    }

    match optimizer.optimize(&mut param) {
        Ok((_, fmin)) => {
            let params_opt = arr1(&param);
            let fval = if f64::is_nan(fmin) {
                f64::INFINITY
            } else {
                fmin
            };
            (fval, params_opt)
        }
        Err((status, _)) => {
            log::warn!("ERROR NLOPT Cobyla optimizer status={status:?}");
            (f64::INFINITY, arr1(&param))
        }
    }
}

/// Optimize hyper parameters given an initial guess and bounds with cobyla
#[cfg(not(feature = "nlopt"))]
pub(crate) fn optimize_params<ObjF, F>(
    objfn: ObjF,
    param0: &Array1<F>,
    bounds: &[(F, F)],
    cobyla: CobylaParams,
) -> (f64, Array1<f64>)
where
    ObjF: Fn(&[f64], Option<&mut [f64]>, &mut ()) -> f64,
    F: Float,
{
    use cobyla::{minimize, Func, StopTols};

    let cons: Vec<&dyn Func<()>> = vec![];
    let param0 = param0.map(into_f64).into_raw_vec();

    let bounds: Vec<_> = bounds
        .iter()
        .map(|(lo, up)| (into_f64(lo), into_f64(up)))
        .collect();

    match minimize(
        |x, u| objfn(x, None, u),
        &param0,
        &bounds,
        &cons,
        (),
        cobyla.maxeval,
        cobyla::RhoBeg::All(cobyla.rhobeg),
        Some(StopTols {
            ftol_rel: cobyla.ftol_rel,
            ..StopTols::default()
        }),
    ) {
        Ok((_, x_opt, fval)) => {
            let params_opt = arr1(&x_opt);
            let fval = if f64::is_nan(fval) {
                f64::INFINITY
            } else {
                fval
            };
            (fval, params_opt)
        }
        Err((status, x_opt, _)) => {
            log::warn!("ERROR Cobyla optimizer status={status:?}");
            (f64::INFINITY, arr1(&x_opt))
        }
    }
}

#[inline(always)]
pub(crate) fn into_f64<F: Float>(v: &F) -> f64 {
    v.to_f64().unwrap_or(f64::NAN)
}
