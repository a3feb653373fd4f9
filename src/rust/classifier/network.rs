use ndarray::{Array1, Array2, Axis};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::error::ClassifierError;
use super::utils::sigmoid;
use crate::TrainingConfig;

const INITIAL_WEIGHT_RANGE: f32 = 0.2;
const MIN_HIDDEN_SIZE: usize = 3;

/// One vectorized training example: a bag-of-words input and a one-hot
/// output.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingPair {
    pub input: Array1<f32>,
    pub output: Array1<f32>,
}

/// Summary of a finished training run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingStats {
    /// Passes over the dataset actually performed
    pub iterations: usize,
    /// Mean squared error after the last pass
    pub error: f32,
}

/// A fully connected feed-forward network with sigmoid activations.
///
/// `weights[l]` has shape `(sizes[l + 1], sizes[l])`. Outputs are
/// independent activations in `[0, 1]`; they are not normalized to sum to
/// one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedForwardNetwork {
    sizes: Vec<usize>,
    weights: Vec<Array2<f32>>,
    biases: Vec<Array1<f32>>,
}

impl FeedForwardNetwork {
    /// Creates a network with weights and biases drawn uniformly from
    /// `[-0.2, 0.2]`. Needs at least an input and an output layer.
    pub fn random<R: Rng>(sizes: &[usize], rng: &mut R) -> Result<Self, ClassifierError> {
        if sizes.len() < 2 {
            return Err(ClassifierError::Validation(
                "A network needs at least an input and an output layer".into(),
            ));
        }
        let mut weights = Vec::with_capacity(sizes.len() - 1);
        let mut biases = Vec::with_capacity(sizes.len() - 1);
        for pair in sizes.windows(2) {
            let (inputs, outputs) = (pair[0], pair[1]);
            weights.push(Array2::from_shape_fn((outputs, inputs), |_| {
                rng.random_range(-INITIAL_WEIGHT_RANGE..INITIAL_WEIGHT_RANGE)
            }));
            biases.push(Array1::from_shape_fn(outputs, |_| {
                rng.random_range(-INITIAL_WEIGHT_RANGE..INITIAL_WEIGHT_RANGE)
            }));
        }
        Ok(Self {
            sizes: sizes.to_vec(),
            weights,
            biases,
        })
    }

    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    pub fn input_size(&self) -> usize {
        self.sizes.first().copied().unwrap_or(0)
    }

    pub fn output_size(&self) -> usize {
        self.sizes.last().copied().unwrap_or(0)
    }

    /// Runs the network on one input vector.
    pub fn infer(&self, input: &Array1<f32>) -> Result<Array1<f32>, ClassifierError> {
        if input.len() != self.input_size() {
            return Err(ClassifierError::shape("network input", self.input_size(), input.len()));
        }
        let mut activations = self.forward(input);
        activations
            .pop()
            .ok_or_else(|| ClassifierError::shape("network output", self.output_size(), 0))
    }

    /// Checks that layer sizes, weights and biases agree with each other.
    pub fn validate(&self) -> Result<(), ClassifierError> {
        if self.sizes.len() < 2 {
            return Err(ClassifierError::SnapshotIntegrity(
                "network has fewer than two layers".into(),
            ));
        }
        if self.weights.len() != self.sizes.len() - 1 || self.biases.len() != self.sizes.len() - 1 {
            return Err(ClassifierError::SnapshotIntegrity(format!(
                "network declares {} layers but stores {} weight and {} bias sets",
                self.sizes.len(),
                self.weights.len(),
                self.biases.len()
            )));
        }
        for (l, pair) in self.sizes.windows(2).enumerate() {
            if self.weights[l].dim() != (pair[1], pair[0]) || self.biases[l].len() != pair[1] {
                return Err(ClassifierError::SnapshotIntegrity(format!(
                    "layer {} weights {:?} / bias {} do not match sizes {} -> {}",
                    l,
                    self.weights[l].dim(),
                    self.biases[l].len(),
                    pair[0],
                    pair[1]
                )));
            }
        }
        Ok(())
    }

    /// Activations of every layer, input included.
    fn forward(&self, input: &Array1<f32>) -> Vec<Array1<f32>> {
        let mut activations = Vec::with_capacity(self.sizes.len());
        activations.push(input.clone());
        for (weights, bias) in self.weights.iter().zip(&self.biases) {
            let previous = &activations[activations.len() - 1];
            let next = (weights.dot(previous) + bias).mapv(sigmoid);
            activations.push(next);
        }
        activations
    }
}

/// The numeric trainer the classifier delegates to.
///
/// Implementations must produce a fresh network for every call; the
/// classifier never continues training from earlier weights.
pub trait NetworkTrainer: Send + Sync {
    fn train(
        &self,
        dataset: &[TrainingPair],
        config: &TrainingConfig,
    ) -> Result<(FeedForwardNetwork, TrainingStats), ClassifierError>;
}

/// Online back-propagation with momentum.
#[derive(Debug, Clone, Default)]
pub struct BackpropTrainer {
    seed: Option<u64>,
}

impl BackpropTrainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fixes the weight initialisation so runs are reproducible.
    pub fn with_seed(seed: u64) -> Self {
        Self { seed: Some(seed) }
    }

    fn layer_sizes(input: usize, output: usize, config: &TrainingConfig) -> Vec<usize> {
        let hidden = config
            .hidden_layers
            .clone()
            .unwrap_or_else(|| vec![MIN_HIDDEN_SIZE.max(input / 2)]);
        let mut sizes = Vec::with_capacity(hidden.len() + 2);
        sizes.push(input);
        sizes.extend(hidden);
        sizes.push(output);
        sizes
    }

    fn check_dataset(dataset: &[TrainingPair]) -> Result<(usize, usize), ClassifierError> {
        let first = dataset
            .first()
            .ok_or_else(|| ClassifierError::TrainingFailure("Training dataset is empty".into()))?;
        let (input, output) = (first.input.len(), first.output.len());
        if output == 0 {
            return Err(ClassifierError::TrainingFailure("Training dataset has no labels".into()));
        }
        if let Some(pos) = dataset
            .iter()
            .position(|pair| pair.input.len() != input || pair.output.len() != output)
        {
            return Err(ClassifierError::TrainingFailure(format!(
                "Training pair {} does not match the {}x{} shape of the first pair",
                pos, input, output
            )));
        }
        Ok((input, output))
    }

    /// One forward/backward pass; returns the sample's mean squared error.
    fn train_pattern(
        network: &mut FeedForwardNetwork,
        changes: &mut [Array2<f32>],
        pair: &TrainingPair,
        config: &TrainingConfig,
    ) -> f32 {
        let activations = network.forward(&pair.input);
        let layers = network.weights.len();

        let output = &activations[layers];
        let error = &pair.output - output;
        let sample_error = error.mapv(|e| e * e).mean().unwrap_or(0.0);

        let mut delta = &error * &output.mapv(|o| o * (1.0 - o));
        for l in (0..layers).rev() {
            let previous = &activations[l];
            // Propagate before this layer's weights change.
            let next_delta = if l > 0 {
                let back = network.weights[l].t().dot(&delta);
                Some(back * previous.mapv(|o| o * (1.0 - o)))
            } else {
                None
            };

            let gradient = delta
                .view()
                .insert_axis(Axis(1))
                .dot(&previous.view().insert_axis(Axis(0)));
            let change = gradient * config.learning_rate + &changes[l] * config.momentum;
            network.weights[l] += &change;
            network.biases[l].scaled_add(config.learning_rate, &delta);
            changes[l] = change;

            match next_delta {
                Some(d) => delta = d,
                None => break,
            }
        }
        sample_error
    }
}

impl NetworkTrainer for BackpropTrainer {
    fn train(
        &self,
        dataset: &[TrainingPair],
        config: &TrainingConfig,
    ) -> Result<(FeedForwardNetwork, TrainingStats), ClassifierError> {
        config.validate()?;
        let (input, output) = Self::check_dataset(dataset)?;

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let sizes = Self::layer_sizes(input, output, config);
        debug!("Initialising network with layer sizes {:?}", sizes);
        let mut network = FeedForwardNetwork::random(&sizes, &mut rng)?;
        let mut changes: Vec<Array2<f32>> = network
            .weights
            .iter()
            .map(|w| Array2::zeros(w.dim()))
            .collect();

        let mut error = f32::INFINITY;
        let mut iterations = 0;
        while iterations < config.iterations && error > config.error_threshold {
            iterations += 1;
            let total: f32 = dataset
                .iter()
                .map(|pair| Self::train_pattern(&mut network, &mut changes, pair, config))
                .sum();
            error = total / dataset.len() as f32;

            if !error.is_finite() {
                return Err(ClassifierError::TrainingFailure(format!(
                    "Training diverged at iteration {} (error {})",
                    iterations, error
                )));
            }
            if config.log_enabled && iterations % config.log_period == 0 {
                info!("iterations: {}, training error: {}", iterations, error);
            }
        }

        info!("Training finished after {} iterations with error {}", iterations, error);
        Ok((network, TrainingStats { iterations, error }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::utils::{argmax, one_hot};
    use ndarray::array;

    fn xor_like() -> Vec<TrainingPair> {
        vec![
            TrainingPair { input: array![1.0, 0.0, 0.0], output: one_hot(0, 2) },
            TrainingPair { input: array![0.0, 1.0, 0.0], output: one_hot(1, 2) },
            TrainingPair { input: array![0.0, 0.0, 1.0], output: one_hot(0, 2) },
        ]
    }

    #[test]
    fn test_random_network_shapes() {
        let mut rng = StdRng::seed_from_u64(1);
        let network = FeedForwardNetwork::random(&[4, 3, 2], &mut rng).unwrap();
        assert!(network.validate().is_ok());
        assert_eq!(network.input_size(), 4);
        assert_eq!(network.output_size(), 2);
        assert!(FeedForwardNetwork::random(&[4], &mut rng).is_err());
    }

    #[test]
    fn test_infer_rejects_wrong_width() {
        let mut rng = StdRng::seed_from_u64(1);
        let network = FeedForwardNetwork::random(&[4, 3, 2], &mut rng).unwrap();
        let err = network.infer(&array![1.0, 0.0]).unwrap_err();
        assert!(matches!(err, ClassifierError::ShapeMismatch { expected: 4, actual: 2, .. }));
        let out = network.infer(&array![1.0, 0.0, 0.0, 1.0]).unwrap();
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_backprop_learns_small_dataset() {
        let dataset = xor_like();
        let config = TrainingConfig::default()
            .with_iterations(2000)
            .with_error_threshold(0.005)
            .with_logging(false, 10);
        let (network, stats) = BackpropTrainer::with_seed(3).train(&dataset, &config).unwrap();

        assert!(stats.iterations <= 2000);
        assert!(stats.error < 0.05, "error too high: {}", stats.error);
        for pair in &dataset {
            let out = network.infer(&pair.input).unwrap();
            assert_eq!(argmax(&out), argmax(&pair.output));
        }
    }

    #[test]
    fn test_seeded_training_is_reproducible() {
        let config = TrainingConfig::default().with_iterations(50).with_logging(false, 10);
        let (a, _) = BackpropTrainer::with_seed(9).train(&xor_like(), &config).unwrap();
        let (b, _) = BackpropTrainer::with_seed(9).train(&xor_like(), &config).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_rejects_bad_datasets() {
        let config = TrainingConfig::default();
        let trainer = BackpropTrainer::new();
        assert!(matches!(trainer.train(&[], &config), Err(ClassifierError::TrainingFailure(_))));

        let mut ragged = xor_like();
        ragged[1].input = array![1.0];
        assert!(matches!(trainer.train(&ragged, &config), Err(ClassifierError::TrainingFailure(_))));
    }

    #[test]
    fn test_default_hidden_layer_size() {
        let config = TrainingConfig::default();
        assert_eq!(BackpropTrainer::layer_sizes(20, 2, &config), vec![20, 10, 2]);
        assert_eq!(BackpropTrainer::layer_sizes(4, 2, &config), vec![4, 3, 2]);
        let config = config.with_hidden_layers(vec![5, 4]);
        assert_eq!(BackpropTrainer::layer_sizes(4, 2, &config), vec![4, 5, 4, 2]);
    }

    #[test]
    fn test_serde_round_trip() {
        let mut rng = StdRng::seed_from_u64(5);
        let network = FeedForwardNetwork::random(&[3, 3, 2], &mut rng).unwrap();
        let json = serde_json::to_string(&network).unwrap();
        let back: FeedForwardNetwork = serde_json::from_str(&json).unwrap();
        assert_eq!(back, network);
    }
}
