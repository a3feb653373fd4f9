use std::sync::{Arc, RwLock};
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::classifier::{Inner, TextClassifier};
use super::corpus::{parse_corpus_json, Corpus, TrainingExample};
use super::error::ClassifierError;
use super::network::{BackpropTrainer, NetworkTrainer};
use super::state::Lifecycle;
use crate::TrainingConfig;

/// A builder for constructing a TextClassifier with a fluent interface.
#[derive(Default)]
pub struct ClassifierBuilder {
    config: TrainingConfig,
    trainer: Option<Arc<dyn NetworkTrainer>>,
    seed: Option<u64>,
    examples: Option<Vec<TrainingExample>>,
}

impl ClassifierBuilder {
    /// Creates a new builder with the default training configuration
    ///
    /// # Example
    /// ```
    /// use brain_text::ClassifierBuilder;
    ///
    /// let classifier = ClassifierBuilder::new().build().unwrap();
    /// assert!(classifier.list_corpus().is_empty());
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the hyperparameters used by every `train()` call
    pub fn with_configuration(mut self, config: TrainingConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the default back-propagation trainer
    pub fn with_trainer<T: NetworkTrainer + 'static>(mut self, trainer: T) -> Self {
        self.trainer = Some(Arc::new(trainer));
        self
    }

    /// Seeds the corpus shuffle and, unless a custom trainer is set, the
    /// weight initialisation. Makes whole runs reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Loads an initial corpus from the `{label: [texts]}` JSON format
    ///
    /// # Returns
    /// * `Result<Self, ClassifierError>` - The builder, or a usage error if
    ///   the JSON is malformed
    pub fn with_corpus_json(mut self, json: &str) -> Result<Self, ClassifierError> {
        self.examples = Some(parse_corpus_json(json)?);
        Ok(self)
    }

    /// Loads an initial corpus from already parsed examples
    pub fn with_examples(mut self, examples: Vec<TrainingExample>) -> Self {
        self.examples = Some(examples);
        self
    }

    /// Builds the classifier. It starts UNTRAINED.
    ///
    /// # Returns
    /// * `Result<TextClassifier, ClassifierError>` - Fails when the
    ///   configuration is out of range or an initial example is invalid
    pub fn build(self) -> Result<TextClassifier, ClassifierError> {
        self.config.validate()?;

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let trainer: Arc<dyn NetworkTrainer> = match (self.trainer, self.seed) {
            (Some(trainer), _) => trainer,
            (None, Some(seed)) => Arc::new(BackpropTrainer::with_seed(seed)),
            (None, None) => Arc::new(BackpropTrainer::new()),
        };

        let mut corpus = Corpus::new();
        if let Some(examples) = self.examples {
            corpus.load(examples, &mut rng)?;
            info!(
                "Loaded initial corpus: {} examples, {} labels",
                corpus.len(),
                corpus.labels().len()
            );
        }

        Ok(TextClassifier {
            inner: Arc::new(RwLock::new(Inner {
                corpus,
                config: self.config,
                lifecycle: Lifecycle::default(),
                bound: None,
                rng,
            })),
            trainer,
        })
    }
}
