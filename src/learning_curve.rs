//! Evaluation of a model versus training set size.
//!
//! [`LearningCurve::run`] calls a user given `predict` function on subsets made of the
//! last `n` training examples, for `n = min_data, min_data + step, ...` up to the
//! training set size, against a fixed test set. Tasks are independent: they run
//! serially when `n_jobs == 1`, otherwise on a dedicated rayon thread pool.

use crate::errors::{PredictError, Result};
use linfa::Float;
use log::{debug, info, warn};
use ndarray::{s, ArrayBase, ArrayView1, ArrayView2, Data, Ix1, Ix2};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// A cloneable flag used to stop a learning curve sweep.
///
/// Cancellation is checked before each task starts, running tasks complete.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// A token not cancelled yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of tasks not started yet
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Result of the `predict` function for one training set size
#[derive(Clone, Debug, PartialEq)]
pub struct LearningCurvePoint<R> {
    /// Task index, position of the training size in the sweep
    pub index: usize,
    /// Number of training examples used
    pub n_train: usize,
    /// Value returned by `predict`
    pub result: R,
}

/// Completed points of a learning curve sweep sorted by task index
#[derive(Clone, Debug, PartialEq)]
pub struct LearningCurveOutcome<R> {
    /// Points of completed tasks
    pub points: Vec<LearningCurvePoint<R>>,
    /// Whether some tasks were skipped due to cancellation
    pub cancelled: bool,
}

/// Learning curve sweep configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LearningCurve {
    n_jobs: usize,
    step: usize,
    min_data: usize,
}

impl Default for LearningCurve {
    fn default() -> Self {
        LearningCurve {
            n_jobs: 1,
            step: 1,
            min_data: 2,
        }
    }
}

impl LearningCurve {
    /// A sweep running on `n_jobs` threads (1 means serial, 0 lets rayon decide)
    pub fn new(n_jobs: usize) -> Self {
        LearningCurve {
            n_jobs,
            ..Default::default()
        }
    }

    /// Set the increment of training set size between two tasks
    pub fn step(mut self, step: usize) -> Self {
        self.step = step;
        self
    }

    /// Set the smallest training set size
    pub fn min_data(mut self, min_data: usize) -> Self {
        self.min_data = min_data;
        self
    }

    /// Training set sizes evaluated for a training set of `n_train` examples
    pub fn training_sizes(&self, n_train: usize) -> Result<Vec<usize>> {
        if self.step == 0 {
            return Err(PredictError::InvalidValueError(
                "Learning curve step should be strictly positive".to_string(),
            ));
        }
        if self.min_data == 0 || self.min_data > n_train {
            return Err(PredictError::InvalidValueError(format!(
                "Learning curve minimal data size ({}) should be in [1, {n_train}]",
                self.min_data
            )));
        }
        Ok((self.min_data..=n_train).step_by(self.step).collect())
    }

    /// Evaluate `predict(train, train_target, test, test_target)` for each training set
    /// size, subsets being made of the last rows of `train`.
    ///
    /// The first error returned by `predict` (in task order) aborts the sweep.
    pub fn run<F, R, P>(
        &self,
        predict: P,
        train: &ArrayBase<impl Data<Elem = F>, Ix2>,
        train_target: &ArrayBase<impl Data<Elem = F>, Ix1>,
        test: &ArrayBase<impl Data<Elem = F>, Ix2>,
        test_target: &ArrayBase<impl Data<Elem = F>, Ix1>,
        cancel: &CancellationToken,
    ) -> Result<LearningCurveOutcome<R>>
    where
        F: Float,
        R: Send,
        P: Fn(ArrayView2<F>, ArrayView1<F>, ArrayView2<F>, ArrayView1<F>) -> Result<R> + Sync,
    {
        if train.nrows() != train_target.len() || test.nrows() != test_target.len() {
            return Err(PredictError::DimensionMismatchError(format!(
                "Fingerprints and targets numbers differ: train ({}, {}), test ({}, {})",
                train.nrows(),
                train_target.len(),
                test.nrows(),
                test_target.len()
            )));
        }
        let sizes = self.training_sizes(train.nrows())?;
        let (train, train_target) = (train.view(), train_target.view());
        let (test, test_target) = (test.view(), test_target.view());
        let n = train.nrows();

        let task = |(index, n_train): (usize, usize)| -> Option<Result<LearningCurvePoint<R>>> {
            if cancel.is_cancelled() {
                return None;
            }
            debug!("Learning curve task {index}: {n_train} training examples");
            let result = predict(
                train.slice(s![n - n_train.., ..]),
                train_target.slice(s![n - n_train..]),
                test,
                test_target,
            );
            Some(result.map(|result| LearningCurvePoint {
                index,
                n_train,
                result,
            }))
        };

        let now = Instant::now();
        let tasks = sizes.into_iter().enumerate();
        let outputs: Vec<_> = if self.n_jobs == 1 {
            tasks.map(task).collect()
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.n_jobs)
                .build()?;
            pool.install(|| tasks.collect::<Vec<_>>().into_par_iter().map(task).collect())
        };

        let n_tasks = outputs.len();
        let mut points = outputs
            .into_iter()
            .flatten()
            .collect::<Result<Vec<_>>>()?;
        points.sort_by_key(|p| p.index);
        let cancelled = points.len() < n_tasks;
        if cancelled {
            warn!(
                "Learning curve cancelled: {} of {n_tasks} tasks completed",
                points.len()
            );
        }
        info!(
            "Learning curve of {} points computed in {} ms",
            points.len(),
            now.elapsed().as_millis()
        );
        Ok(LearningCurveOutcome { points, cancelled })
    }
}
