use fitness_gp::kernels::{Kernel, KernelSpec};
use fitness_gp::learning_curve::{CancellationToken, LearningCurve};
use fitness_gp::{FitnessPredictor, PredictError, PredictionRequest};
use linfa::prelude::*;
use ndarray::{array, Array, ArrayView1, ArrayView2, Axis};
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand_xoshiro::Xoshiro256Plus;

fn validation_error(
    xt: ArrayView2<f64>,
    yt: ArrayView1<f64>,
    xv: ArrayView2<f64>,
    yv: ArrayView1<f64>,
) -> fitness_gp::Result<f64> {
    let fitted: fitness_gp::Result<FitnessPredictor<f64>> =
        FitnessPredictor::params(KernelSpec::from(Kernel::gaussian(array![1.])))
            .optimize_hyperparameters(false)
            .fit(&Dataset::new(xt.to_owned(), yt.to_owned()));
    let model = fitted?;
    let res = model.get_predictions(&xv, &PredictionRequest::new().test_target(yv))?;
    res.validation_error
        .map(|e| e.average)
        .ok_or_else(|| PredictError::InvalidValueError("missing validation error".to_string()))
}

fn main() {
    env_logger::init();

    let mut rng = Xoshiro256Plus::seed_from_u64(42);
    let xtrain = Array::random_using((200, 4), Uniform::new(0f64, 3.), &mut rng);
    let ytrain = xtrain.map_axis(Axis(1), |x| x[0].cos() + x[1] * x[2] - x[3]);
    let xtest = Array::random_using((50, 4), Uniform::new(0f64, 3.), &mut rng);
    let ytest = xtest.map_axis(Axis(1), |x| x[0].cos() + x[1] * x[2] - x[3]);

    let outcome = LearningCurve::new(4)
        .min_data(10)
        .step(20)
        .run(
            validation_error,
            &xtrain,
            &ytrain,
            &xtest,
            &ytest,
            &CancellationToken::new(),
        )
        .expect("Learning curve");

    for point in outcome.points {
        println!("{:>4} training examples: rmse = {:.4}", point.n_train, point.result);
    }
}
