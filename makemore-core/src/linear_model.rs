use log::{debug, info};
use rand::Rng;

use crate::{
    dataset::Dataset,
    error::{MakemoreError, Result},
    language_model::BigramModel,
    matrix::{Matrix, log_sum_exp},
};

pub const DEFAULT_ITERATIONS: usize = 100;

pub const DEFAULT_LEARNING_RATE: f32 = 50.0;

/// Weight of the L2 penalty on the mean squared weight. This pulls the
/// weights towards zero, which plays the same role as smoothing the counts
/// does for the counting model.
pub const DEFAULT_REGULARIZATION: f32 = 0.01;

#[derive(Copy, Clone, Debug)]
pub struct TrainerOptions {
    /// Number of gradient descent steps. Training always runs all of them.
    pub iterations: usize,
    pub learning_rate: f32,
    pub regularization: f32,
}

impl Default for TrainerOptions {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            learning_rate: DEFAULT_LEARNING_RATE,
            regularization: DEFAULT_REGULARIZATION,
        }
    }
}

/// Output of a forward pass over a batch of examples.
pub struct Forward {
    /// One distribution over successors per example.
    pub probs: Matrix,
    /// Mean negative log-likelihood plus the L2 penalty.
    pub loss: f32,
}

/// Runs the single linear layer over `xs` and scores the result against
/// `ys`.
///
/// The logits are `one_hot(xs) · weights`, which is just the rows of
/// `weights` picked out by `xs`, so that's how they're computed. Softmax
/// turns each row of logits into probabilities.
pub fn forward(
    weights: &Matrix,
    xs: &[usize],
    ys: &[usize],
    regularization: f32,
) -> Result<Forward> {
    let (_, vocab_size) = weights.shape();
    if xs.len() != ys.len() {
        return Err(MakemoreError::DataLength {
            expected: xs.len(),
            got: ys.len(),
        });
    }
    if xs.is_empty() {
        return Err(MakemoreError::EmptyCorpus);
    }

    let logits = weights.select_rows(xs)?;
    let probs = logits.row_softmax();

    // ln p = logit - ln Σ exp(logits), which stays finite even when the
    // probability itself underflows.
    let mut nll = 0.0f64;
    for (i, &y) in ys.iter().enumerate() {
        if y >= vocab_size {
            return Err(MakemoreError::IndexOutOfRange {
                index: y,
                len: vocab_size,
            });
        }
        let row = logits.row(i);
        nll -= (row[y] - log_sum_exp(row)) as f64;
    }
    let nll = (nll / xs.len() as f64) as f32;
    let loss = nll + regularization * weights.mean_squares();

    Ok(Forward { probs, loss })
}

/// Gradient of the [`forward`] loss with respect to `weights`.
///
/// For softmax followed by cross-entropy, the gradient with respect to the
/// logits of example `i` is `(probs[i] - one_hot(ys[i])) / N`. The logits
/// came from `one_hot(xs) · weights`, so the weight gradient is
/// `one_hot(xs)ᵀ` times that, i.e. each example's row is added into the row
/// for its predecessor. The penalty `λ · mean(W²)` adds `2λ / |W| · W`.
pub fn gradient(
    weights: &Matrix,
    xs: &[usize],
    ys: &[usize],
    probs: &Matrix,
    regularization: f32,
) -> Result<Matrix> {
    let (rows, cols) = weights.shape();
    if xs.len() != ys.len() {
        return Err(MakemoreError::DataLength {
            expected: xs.len(),
            got: ys.len(),
        });
    }
    if probs.shape() != (xs.len(), cols) {
        return Err(MakemoreError::ShapeMismatch {
            lhs_rows: xs.len(),
            lhs_cols: cols,
            rhs_rows: probs.rows(),
            rhs_cols: probs.cols(),
        });
    }

    let num = xs.len() as f32;
    let mut dlogits = probs.clone();
    for (i, &y) in ys.iter().enumerate() {
        if y >= cols {
            return Err(MakemoreError::IndexOutOfRange {
                index: y,
                len: cols,
            });
        }
        dlogits.row_mut(i)[y] -= 1.0;
    }
    let dlogits = dlogits.scale(1.0 / num);

    let mut grad = Matrix::zeros(rows, cols);
    grad.index_add_rows(xs, &dlogits)?;
    grad.add_scaled(weights, 2.0 * regularization / (rows * cols) as f32)?;
    Ok(grad)
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TrainerState {
    /// No weights yet, call [`Trainer::initialize`].
    Uninitialized,
    Training,
    /// Every iteration has run, call [`Trainer::into_model`].
    Done,
}

/// Trains a single linear layer, with no bias, to predict the next symbol
/// from the current one by plain gradient descent.
pub struct Trainer {
    dataset: Dataset,
    vocab_size: usize,
    options: TrainerOptions,
    weights: Option<Matrix>,
    iteration: usize,
}

impl Trainer {
    pub fn new(dataset: Dataset, vocab_size: usize, options: TrainerOptions) -> Result<Self> {
        if dataset.is_empty() {
            return Err(MakemoreError::EmptyCorpus);
        }
        Ok(Self {
            dataset,
            vocab_size,
            options,
            weights: None,
            iteration: 0,
        })
    }

    /// Draws every weight from a standard normal distribution.
    pub fn initialize<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let weights = Matrix::random_normal(self.vocab_size, self.vocab_size, rng);
        self.start(weights);
    }

    /// Starts training from the given weights instead of random ones.
    pub fn initialize_with(&mut self, weights: Matrix) -> Result<()> {
        if weights.shape() != (self.vocab_size, self.vocab_size) {
            let (rows, cols) = weights.shape();
            return Err(MakemoreError::ShapeMismatch {
                lhs_rows: self.vocab_size,
                lhs_cols: self.vocab_size,
                rhs_rows: rows,
                rhs_cols: cols,
            });
        }
        self.start(weights);
        Ok(())
    }

    fn start(&mut self, weights: Matrix) {
        info!(
            "training {}x{} weights on {} examples for {} iterations",
            self.vocab_size,
            self.vocab_size,
            self.dataset.len(),
            self.options.iterations
        );
        self.weights = Some(weights);
        self.iteration = 0;
    }

    pub fn state(&self) -> TrainerState {
        if self.weights.is_none() {
            TrainerState::Uninitialized
        } else if self.iteration >= self.options.iterations {
            TrainerState::Done
        } else {
            TrainerState::Training
        }
    }

    /// Number of iterations run so far.
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn weights(&self) -> Option<&Matrix> {
        self.weights.as_ref()
    }

    /// Runs one forward pass, backward pass and update. Returns the loss
    /// from the forward pass, i.e. from before the update.
    pub fn step(&mut self) -> Result<f32> {
        match self.state() {
            TrainerState::Uninitialized => return Err(MakemoreError::NotInitialized),
            TrainerState::Done => return Err(MakemoreError::TrainingFinished),
            TrainerState::Training => {}
        }
        let Some(weights) = self.weights.as_mut() else {
            return Err(MakemoreError::NotInitialized);
        };
        let xs = self.dataset.xs();
        let ys = self.dataset.ys();

        let Forward { probs, loss } = forward(weights, xs, ys, self.options.regularization)?;
        let grad = gradient(weights, xs, ys, &probs, self.options.regularization)?;
        weights.add_scaled(&grad, -self.options.learning_rate)?;

        debug!("iteration {} loss {loss:.4}", self.iteration);
        self.iteration += 1;
        if self.iteration == self.options.iterations {
            info!("training finished with loss {loss:.4}");
        }
        Ok(loss)
    }

    /// Runs every remaining iteration, handing each iteration's loss to
    /// `observer`.
    pub fn run<F: FnMut(usize, f32)>(&mut self, mut observer: F) -> Result<()> {
        if self.state() == TrainerState::Uninitialized {
            return Err(MakemoreError::NotInitialized);
        }
        while self.state() == TrainerState::Training {
            let iteration = self.iteration;
            let loss = self.step()?;
            observer(iteration, loss);
        }
        Ok(())
    }

    pub fn into_model(self) -> Result<LinearModel> {
        match self.state() {
            TrainerState::Uninitialized => Err(MakemoreError::NotInitialized),
            TrainerState::Training => Err(MakemoreError::TrainingInProgress {
                iteration: self.iteration,
                iterations: self.options.iterations,
            }),
            TrainerState::Done => match self.weights {
                Some(weights) => Ok(LinearModel { weights }),
                None => Err(MakemoreError::NotInitialized),
            },
        }
    }
}

/// Initializes, trains and returns a model in one go.
pub fn train<R: Rng + ?Sized, F: FnMut(usize, f32)>(
    dataset: Dataset,
    vocab_size: usize,
    options: TrainerOptions,
    rng: &mut R,
    observer: F,
) -> Result<LinearModel> {
    let mut trainer = Trainer::new(dataset, vocab_size, options)?;
    trainer.initialize(rng);
    trainer.run(observer)?;
    trainer.into_model()
}

/// A trained weight matrix. Row `i` holds the log-counts of what follows
/// symbol `i`.
#[derive(Clone, Debug)]
pub struct LinearModel {
    weights: Matrix,
}

impl LinearModel {
    pub fn weights(&self) -> &Matrix {
        &self.weights
    }
}

impl BigramModel for LinearModel {
    fn vocab_size(&self) -> usize {
        self.weights.rows()
    }

    /// Forward pass for a single example, recomputed on every call.
    fn probabilities(&self, index: usize) -> Result<Vec<f32>> {
        let x_encoded = Matrix::one_hot(&[index], self.vocab_size())?;
        let logits = x_encoded.matmul(&self.weights)?;
        let probs = logits.row_softmax();
        Ok(probs.row(0).to_vec())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use candle_core::{Device, Tensor, Var};
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::{
        alphabet::Alphabet,
        language_model::{GeneratorOptions, NameGenerator},
    };

    const NAMES: [&str; 16] = [
        "emma", "olivia", "ava", "isabella", "sophia", "charlotte", "mia", "amelia", "harper",
        "evelyn", "abigail", "emily", "elizabeth", "mila", "ella", "avery",
    ];

    fn names_dataset() -> (Alphabet, Dataset) {
        let alphabet = Alphabet::from_words(&NAMES).unwrap();
        let dataset = Dataset::from_words(&NAMES, &alphabet).unwrap();
        (alphabet, dataset)
    }

    #[test]
    fn test_uniform_weights() {
        let alphabet = Alphabet::from_words(&["ab"]).unwrap();
        let dataset = Dataset::from_words(&["ab"], &alphabet).unwrap();
        let weights = Matrix::zeros(3, 3);

        let Forward { probs, loss } =
            forward(&weights, dataset.xs(), dataset.ys(), DEFAULT_REGULARIZATION).unwrap();
        for &p in probs.data() {
            assert_relative_eq!(p, 1.0 / 3.0);
        }
        assert_relative_eq!(loss, 3.0f32.ln(), epsilon = 1e-6);

        let grad = gradient(
            &weights,
            dataset.xs(),
            dataset.ys(),
            &probs,
            DEFAULT_REGULARIZATION,
        )
        .unwrap();
        // Row '.' saw one example, '.'→'a'.
        let expected = [1.0 / 9.0, -2.0 / 9.0, 1.0 / 9.0];
        for (&g, &e) in grad.row(0).iter().zip(expected.iter()) {
            assert_relative_eq!(g, e, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_regularization_adds_to_loss() {
        let weights = Matrix::from_vec(2, 2, vec![1.0, -1.0, 2.0, 0.0]).unwrap();
        let plain = forward(&weights, &[0, 1], &[1, 0], 0.0).unwrap();
        let regularized = forward(&weights, &[0, 1], &[1, 0], 0.5).unwrap();
        assert_relative_eq!(regularized.loss - plain.loss, 0.5 * 6.0 / 4.0, epsilon = 1e-6);
    }

    #[test]
    fn test_forward_rejects_bad_labels() {
        let weights = Matrix::zeros(2, 2);
        assert!(forward(&weights, &[0], &[2], 0.0).is_err());
        assert!(forward(&weights, &[2], &[0], 0.0).is_err());
        assert!(forward(&weights, &[0, 1], &[0], 0.0).is_err());
    }

    #[test]
    fn test_gradient_rejects_bad_labels() {
        let weights = Matrix::zeros(2, 2);
        let probs = Matrix::from_vec(1, 2, vec![0.5, 0.5]).unwrap();
        assert!(gradient(&weights, &[0], &[1], &probs, 0.0).is_ok());
        assert!(matches!(
            gradient(&weights, &[0], &[2], &probs, 0.0),
            Err(MakemoreError::IndexOutOfRange { index: 2, len: 2 })
        ));
        assert!(matches!(
            gradient(&weights, &[0, 1], &[1], &probs, 0.0),
            Err(MakemoreError::DataLength {
                expected: 2,
                got: 1
            })
        ));
        assert!(matches!(
            gradient(&weights, &[0, 1], &[1, 0], &probs, 0.0),
            Err(MakemoreError::ShapeMismatch {
                lhs_rows: 2,
                rhs_rows: 1,
                ..
            })
        ));
    }

    /// Computes the same loss with candle and lets its autograd produce the
    /// gradient, to check the closed form against.
    fn candle_loss_and_gradient(
        weights: &Matrix,
        dataset: &Dataset,
        regularization: f64,
    ) -> (f32, Vec<f32>) {
        let device = Device::Cpu;
        let (rows, cols) = weights.shape();
        let w = Var::from_tensor(&Tensor::from_slice(weights.data(), (rows, cols), &device).unwrap())
            .unwrap();
        let to_u32 = |indices: &[usize]| indices.iter().map(|&i| i as u32).collect::<Vec<_>>();
        let xs = Tensor::new(to_u32(dataset.xs()), &device).unwrap();
        let ys = Tensor::new(to_u32(dataset.ys()), &device).unwrap();

        let x_encoded = candle_nn::encoding::one_hot(xs, cols, 1f32, 0f32).unwrap();
        let logits = x_encoded.matmul(w.as_tensor()).unwrap();
        let nll = candle_nn::loss::cross_entropy(&logits, &ys).unwrap();
        let penalty = w
            .as_tensor()
            .sqr()
            .unwrap()
            .mean_all()
            .unwrap()
            .affine(regularization, 0.0)
            .unwrap();
        let loss = (nll + penalty).unwrap();

        let grads = loss.backward().unwrap();
        let grad = grads
            .get(w.as_tensor())
            .unwrap()
            .flatten_all()
            .unwrap()
            .to_vec1::<f32>()
            .unwrap();
        (loss.to_scalar::<f32>().unwrap(), grad)
    }

    #[test]
    fn test_gradient_matches_autograd() {
        let (alphabet, dataset) = names_dataset();
        let mut rng = StdRng::seed_from_u64(2147483647);
        let weights = Matrix::random_normal(alphabet.len(), alphabet.len(), &mut rng);

        let Forward { probs, loss } = forward(
            &weights,
            dataset.xs(),
            dataset.ys(),
            DEFAULT_REGULARIZATION,
        )
        .unwrap();
        let grad = gradient(
            &weights,
            dataset.xs(),
            dataset.ys(),
            &probs,
            DEFAULT_REGULARIZATION,
        )
        .unwrap();

        let (expected_loss, expected_grad) =
            candle_loss_and_gradient(&weights, &dataset, DEFAULT_REGULARIZATION as f64);
        assert_relative_eq!(loss, expected_loss, epsilon = 1e-4);
        assert_eq!(grad.data().len(), expected_grad.len());
        for (&actual, &expected) in grad.data().iter().zip(expected_grad.iter()) {
            assert_relative_eq!(actual, expected, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_loss_decreases() {
        let (alphabet, dataset) = names_dataset();
        let mut trainer = Trainer::new(dataset, alphabet.len(), TrainerOptions::default()).unwrap();
        trainer.initialize(&mut StdRng::seed_from_u64(2147483647));

        let mut losses = vec![];
        trainer
            .run(|iteration, loss| {
                assert_eq!(iteration, losses.len());
                losses.push(loss);
            })
            .unwrap();

        assert_eq!(losses.len(), DEFAULT_ITERATIONS);
        assert!(losses.iter().all(|loss| loss.is_finite()));
        assert!(losses[99] < losses[0], "{} >= {}", losses[99], losses[0]);
    }

    #[test]
    fn test_runs_exact_iteration_count() {
        let (alphabet, dataset) = names_dataset();
        let options = TrainerOptions {
            iterations: 7,
            ..Default::default()
        };
        let mut count = 0;
        let model = train(
            dataset,
            alphabet.len(),
            options,
            &mut StdRng::seed_from_u64(1),
            |_, _| count += 1,
        )
        .unwrap();
        assert_eq!(count, 7);
        assert_eq!(model.weights().shape(), (alphabet.len(), alphabet.len()));
    }

    #[test]
    fn test_state_transitions() {
        let (alphabet, dataset) = names_dataset();
        let options = TrainerOptions {
            iterations: 2,
            ..Default::default()
        };
        let mut trainer = Trainer::new(dataset, alphabet.len(), options).unwrap();
        assert_eq!(trainer.state(), TrainerState::Uninitialized);
        assert!(matches!(trainer.step(), Err(MakemoreError::NotInitialized)));
        assert!(matches!(trainer.run(|_, _| {}), Err(MakemoreError::NotInitialized)));

        trainer.initialize(&mut StdRng::seed_from_u64(1));
        assert_eq!(trainer.state(), TrainerState::Training);
        let before = trainer.weights().unwrap().clone();
        trainer.step().unwrap();
        assert_ne!(trainer.weights().unwrap(), &before);
        assert_eq!(trainer.iteration(), 1);
        assert_eq!(trainer.state(), TrainerState::Training);

        trainer.step().unwrap();
        assert_eq!(trainer.state(), TrainerState::Done);
        assert!(matches!(trainer.step(), Err(MakemoreError::TrainingFinished)));
        assert!(trainer.into_model().is_ok());
    }

    #[test]
    fn test_into_model_before_done() {
        let (alphabet, dataset) = names_dataset();
        let mut trainer =
            Trainer::new(dataset.clone(), alphabet.len(), TrainerOptions::default()).unwrap();
        assert!(matches!(trainer.into_model(), Err(MakemoreError::NotInitialized)));

        trainer = Trainer::new(dataset, alphabet.len(), TrainerOptions::default()).unwrap();
        trainer.initialize(&mut StdRng::seed_from_u64(1));
        trainer.step().unwrap();
        assert!(matches!(
            trainer.into_model(),
            Err(MakemoreError::TrainingInProgress {
                iteration: 1,
                iterations: DEFAULT_ITERATIONS
            })
        ));
    }

    #[test]
    fn test_initialize_with_checks_shape() {
        let (alphabet, dataset) = names_dataset();
        let mut trainer = Trainer::new(dataset, alphabet.len(), TrainerOptions::default()).unwrap();
        assert!(trainer.initialize_with(Matrix::zeros(2, 2)).is_err());
        trainer
            .initialize_with(Matrix::zeros(alphabet.len(), alphabet.len()))
            .unwrap();
        assert_eq!(trainer.state(), TrainerState::Training);
    }

    #[test]
    fn test_empty_dataset() {
        assert!(matches!(
            Trainer::new(Dataset::default(), 3, TrainerOptions::default()),
            Err(MakemoreError::EmptyCorpus)
        ));
    }

    #[test]
    fn test_model_rows_are_softmax_of_weights() {
        let mut rng = StdRng::seed_from_u64(3);
        let weights = Matrix::random_normal(4, 4, &mut rng);
        let expected = weights.exp().normalize_rows();
        let model = LinearModel { weights };

        for index in 0..4 {
            let row = model.probabilities(index).unwrap();
            assert_relative_eq!(row.iter().sum::<f32>(), 1.0, epsilon = 1e-6);
            for (&actual, &expected) in row.iter().zip(expected.row(index)) {
                assert_relative_eq!(actual, expected, epsilon = 1e-6);
            }
        }
        assert!(model.probabilities(4).is_err());
    }

    #[test]
    fn test_trained_model_samples_names() {
        let (alphabet, dataset) = names_dataset();
        let model = train(
            dataset,
            alphabet.len(),
            TrainerOptions::default(),
            &mut StdRng::seed_from_u64(2147483647),
            |_, _| {},
        )
        .unwrap();

        let generator = NameGenerator::new(&model, GeneratorOptions::default());
        let sample_all = || -> Vec<String> {
            let mut rng = StdRng::seed_from_u64(2147483647);
            (0..5)
                .map(|_| generator.sample_name(&mut rng, &alphabet).unwrap())
                .collect()
        };
        let names = sample_all();
        assert_eq!(names, sample_all());
        assert!(names.iter().all(|name| name.ends_with('.')));
    }
}
