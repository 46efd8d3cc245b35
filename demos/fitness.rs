use fitness_gp::basis::LinearBasis;
use fitness_gp::kernels::{Kernel, KernelSpec};
use fitness_gp::metrics::Cost;
use fitness_gp::{FitnessPredictor, PredictionRequest};
use linfa::prelude::*;
use ndarray::{array, Array, Axis};
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand_xoshiro::Xoshiro256Plus;

fn fitness(x: &ndarray::ArrayView1<f64>) -> f64 {
    x[0].sin() * x[1] + 0.5 * x[2]
}

fn main() {
    env_logger::init();

    let mut rng = Xoshiro256Plus::seed_from_u64(42);
    let xtrain = Array::random_using((40, 3), Uniform::new(0., 3.), &mut rng);
    let ytrain = xtrain.map_axis(Axis(1), |x| fitness(&x));
    let xtest = Array::random_using((10, 3), Uniform::new(0., 3.), &mut rng);
    let ytest = xtest.map_axis(Axis(1), |x| fitness(&x));

    let model = FitnessPredictor::params(KernelSpec::from(Kernel::gaussian(array![0.5])))
        .regularization(1e-3)
        .n_start(4)
        .fit(&Dataset::new(xtrain, ytrain))
        .expect("Predictor fitting");
    println!("{model}");

    let basis = LinearBasis();
    let request = PredictionRequest::new()
        .test_target(ytest.view())
        .training_error(true)
        .uncertainty(true)
        .cost(Cost::Absolute)
        .basis(&basis);
    let res = model
        .get_predictions(&xtest, &request)
        .expect("Fitness prediction");

    println!("predictions = {}", res.prediction);
    println!("uncertainty = {:?}", res.uncertainty);
    if let Some(err) = res.validation_error {
        println!("validation error = {}", err.average);
    }
    if let Some(err) = res.training_error {
        println!("training error = {}", err.average);
    }
    if let Some(analysis) = res.basis_analysis {
        println!("basis corrected predictions = {}", analysis.g_x);
    }

    // tuned values are reused without optimizing again
    let refit = model
        .tuned_params()
        .fit(&Dataset::new(
            model.training_data().0.to_owned(),
            model.training_data().1.to_owned(),
        ))
        .expect("Predictor fitting");
    println!("{refit}");
}
