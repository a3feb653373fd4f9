use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use log::{error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use super::corpus::{parse_corpus_json, AppendReport, Corpus, TrainingExample};
use super::error::ClassifierError;
use super::labels::LabelIndex;
use super::network::{
    BackpropTrainer, FeedForwardNetwork, NetworkTrainer, TrainingPair, TrainingStats,
};
use super::snapshot::Snapshot;
use super::state::{Completion, Lifecycle, State, TrainingTicket};
use super::trainer::{prepare_dataset, BoundModel, TrainingHandle, TrainingReport};
use super::utils::argmax;
use super::vectorizer::Vocabulary;
use super::ClassifierInfo;
use crate::TrainingConfig;

/// The answer to a classification query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub text: String,
    pub label: String,
    /// Output activation of the winning label, in `[0, 1]`
    pub confidence: f32,
    /// Output activation of every label. Activations are independent, so
    /// they do not necessarily sum to one.
    pub distribution: HashMap<String, f32>,
    /// State at query time; anything but TRAINED means best-effort
    pub status: State,
}

pub(crate) struct Inner {
    pub(crate) corpus: Corpus,
    pub(crate) config: TrainingConfig,
    pub(crate) lifecycle: Lifecycle,
    pub(crate) bound: Option<Arc<BoundModel>>,
    pub(crate) rng: StdRng,
}

impl Inner {
    fn state(&self) -> State {
        self.lifecycle.state(self.bound.is_some())
    }
}

/// A bag-of-words text classifier that owns its labeled corpus.
///
/// Cloning is cheap and yields a handle to the same classifier, which is how
/// the background training task shares it with callers.
///
/// Every corpus mutation rebuilds the vocabulary and label index before
/// returning. `train()` captures the corpus at call time and binds the new
/// network together with the vocabulary and label index it was trained
/// against; predictions always go through that bound triple, so a model
/// never sees vectors of the wrong width.
///
/// ```rust
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use brain_text::{TextClassifier, TrainingConfig};
///
/// let classifier = TextClassifier::builder()
///     .with_configuration(TrainingConfig::default().with_logging(false, 10))
///     .with_corpus_json(r#"{"on": ["turn it on"], "off": ["turn it off"]}"#)?
///     .build()?;
///
/// classifier.train()?.await?;
/// let result = classifier.predict("turn it on")?;
/// println!("{} ({:.2})", result.label, result.confidence);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct TextClassifier {
    pub(crate) inner: Arc<RwLock<Inner>>,
    pub(crate) trainer: Arc<dyn NetworkTrainer>,
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<TextClassifier>();
    }
};

impl std::fmt::Debug for TextClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextClassifier").field("info", &self.info()).finish()
    }
}

impl TextClassifier {
    /// Creates a new ClassifierBuilder for fluent construction
    pub fn builder() -> super::builder::ClassifierBuilder {
        super::builder::ClassifierBuilder::new()
    }

    /// An empty, untrained classifier with the default configuration
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                corpus: Corpus::new(),
                config: TrainingConfig::default(),
                lifecycle: Lifecycle::default(),
                bound: None,
                rng: StdRng::from_os_rng(),
            })),
            trainer: Arc::new(BackpropTrainer::new()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces the training hyperparameters. Takes effect on the next
    /// `train()`; an invalid configuration is rejected and the previous
    /// one kept.
    pub fn set_configuration(&self, config: TrainingConfig) -> Result<(), ClassifierError> {
        config.validate()?;
        self.write().config = config;
        Ok(())
    }

    pub fn get_configuration(&self) -> TrainingConfig {
        self.read().config.clone()
    }

    pub fn get_state(&self) -> State {
        self.read().state()
    }

    /// Replaces the corpus with the content of a `{label: [texts]}` JSON
    /// document. See [`TextClassifier::load_examples`].
    pub fn load_corpus(&self, json: &str) -> Result<(), ClassifierError> {
        let examples = parse_corpus_json(json)?;
        self.load_examples(examples)
    }

    /// Replaces the corpus wholesale and shuffles it. Any bound model is
    /// dropped, leaving the classifier UNTRAINED; a run still in flight
    /// will have its result discarded.
    pub fn load_examples(&self, examples: Vec<TrainingExample>) -> Result<(), ClassifierError> {
        let mut guard = self.write();
        let inner = &mut *guard;
        inner.corpus.load(examples, &mut inner.rng)?;
        inner.bound = None;
        inner.lifecycle.reset();
        info!(
            "Loaded corpus: {} examples, {} labels, {} tokens",
            inner.corpus.len(),
            inner.corpus.labels().len(),
            inner.corpus.vocabulary().len()
        );
        Ok(())
    }

    /// Appends examples. Texts already present are reported as duplicates
    /// but inserted anyway. A bound model becomes OUTDATED.
    pub fn append_examples(&self, examples: Vec<TrainingExample>) -> Result<AppendReport, ClassifierError> {
        if examples.is_empty() {
            return Ok(AppendReport::default());
        }
        let mut inner = self.write();
        let report = inner.corpus.append(examples)?;
        inner.lifecycle.mutated();
        info!(
            "Appended {} examples ({} duplicates), state is now {}",
            report.added,
            report.duplicates.len(),
            inner.state()
        );
        Ok(report)
    }

    pub fn append_one(&self, example: TrainingExample) -> Result<AppendReport, ClassifierError> {
        self.append_examples(vec![example])
    }

    /// Removes the first example with the same label and text. Returns
    /// false, changing nothing, when there is no such example.
    pub fn remove_example(&self, example: &TrainingExample) -> bool {
        let mut inner = self.write();
        if !inner.corpus.remove(example) {
            warn!("Example not found: label '{}', text '{}'", example.label, example.text);
            return false;
        }
        inner.lifecycle.mutated();
        info!("Removed example from label '{}', state is now {}", example.label, inner.state());
        true
    }

    /// A copy of the current corpus
    pub fn list_corpus(&self) -> Vec<TrainingExample> {
        self.read().corpus.examples().to_vec()
    }

    /// Vocabulary derived from the current corpus
    pub fn vocabulary(&self) -> Vocabulary {
        self.read().corpus.vocabulary().clone()
    }

    /// Label index derived from the current corpus
    pub fn label_index(&self) -> LabelIndex {
        self.read().corpus.labels().clone()
    }

    /// The current corpus vectorized the way `train()` would feed it to the
    /// network
    pub fn prepare_dataset(&self) -> Vec<TrainingPair> {
        prepare_dataset(&self.read().corpus)
    }

    /// Returns information about the classifier's current state
    pub fn info(&self) -> ClassifierInfo {
        let inner = self.read();
        ClassifierInfo {
            state: inner.state(),
            num_examples: inner.corpus.len(),
            vocabulary_size: inner.corpus.vocabulary().len(),
            class_labels: inner.corpus.labels().labels().to_vec(),
            model_layers: inner.bound.as_ref().map(|b| b.network.sizes().to_vec()),
        }
    }

    /// Starts a training run on the current corpus and returns immediately.
    ///
    /// The state is TRAINING as soon as this returns. The network is trained
    /// from scratch on tokio's blocking pool; on success it is bound and
    /// the state becomes TRAINED (or OUTDATED if the corpus changed in the
    /// meantime). On failure the previous model and state are kept and the
    /// error is delivered through the returned future.
    ///
    /// # Errors
    /// - `Usage` if a run is already in progress
    /// - `Usage` if called outside a tokio runtime
    pub fn train(&self) -> Result<TrainingHandle, ClassifierError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            ClassifierError::Usage("train() must be called from within a tokio runtime".into())
        })?;

        let (ticket, dataset, vocabulary, labels, config) = {
            let mut inner = self.write();
            let ticket = inner.lifecycle.begin_training()?;
            (
                ticket,
                prepare_dataset(&inner.corpus),
                inner.corpus.vocabulary().clone(),
                inner.corpus.labels().clone(),
                inner.config.clone(),
            )
        };
        info!(
            "Training on {} examples ({} tokens, {} labels)",
            dataset.len(),
            vocabulary.len(),
            labels.len()
        );

        let classifier = self.clone();
        let task = runtime.spawn_blocking(move || {
            let trainer = Arc::clone(&classifier.trainer);
            let result = panic::catch_unwind(AssertUnwindSafe(|| trainer.train(&dataset, &config)))
                .unwrap_or_else(|_| {
                    Err(ClassifierError::TrainingFailure("Network trainer panicked".into()))
                });
            classifier.finish_training(ticket, result, dataset.len(), vocabulary, labels)
        });

        Ok(TrainingHandle { task })
    }

    fn finish_training(
        &self,
        ticket: TrainingTicket,
        result: Result<(FeedForwardNetwork, TrainingStats), ClassifierError>,
        examples: usize,
        vocabulary: Vocabulary,
        labels: LabelIndex,
    ) -> Result<TrainingReport, ClassifierError> {
        let mut inner = self.write();
        let completion = inner.lifecycle.finish_training(ticket, result.is_ok());
        let (network, stats) = match result {
            Ok(trained) => trained,
            Err(e) => {
                error!("Training failed, keeping state {}: {}", inner.state(), e);
                return Err(e);
            }
        };

        let applied = match completion {
            Some(Completion::Bind { stale }) => {
                inner.bound = Some(Arc::new(BoundModel { network, vocabulary, labels }));
                if stale {
                    warn!("Corpus changed during training; the new model is already outdated");
                }
                true
            }
            _ => {
                warn!("Corpus was replaced during training; discarding the new model");
                false
            }
        };

        let state = inner.state();
        info!("Training run finished, state is now {}", state);
        Ok(TrainingReport { stats, examples, applied, state })
    }

    /// Classifies a text with the bound model.
    ///
    /// Allowed while TRAINING (the previous model answers) and while
    /// OUTDATED (the model no longer reflects the corpus); the result's
    /// `status` tells which.
    ///
    /// # Errors
    /// - `Usage` if no model has been trained yet
    /// - `Validation` if the text is empty
    /// - `ShapeMismatch` if the model's widths disagree with its vocabulary
    ///   or label index
    pub fn predict(&self, text: &str) -> Result<ClassificationResult, ClassifierError> {
        let (bound, status) = {
            let inner = self.read();
            let status = inner.state();
            match &inner.bound {
                Some(bound) => (Arc::clone(bound), status),
                None => {
                    return Err(ClassifierError::Usage(format!(
                        "Classifier is {}, can't make any prediction",
                        status
                    )))
                }
            }
        };

        if text.trim().is_empty() {
            return Err(ClassifierError::Validation("Input text cannot be empty".into()));
        }

        let input = bound.vocabulary.vectorize(text);
        let output = bound.network.infer(&input)?;
        if output.len() != bound.labels.len() {
            return Err(ClassifierError::shape("model output", bound.labels.len(), output.len()));
        }

        let best = argmax(&output)
            .ok_or_else(|| ClassifierError::shape("model output", bound.labels.len(), 0))?;
        let label = bound
            .labels
            .label_of(best)
            .ok_or_else(|| ClassifierError::shape("label index", output.len(), bound.labels.len()))?
            .to_string();

        let distribution = bound
            .labels
            .labels()
            .iter()
            .cloned()
            .zip(output.iter().copied())
            .collect();

        Ok(ClassificationResult {
            text: text.to_string(),
            label,
            confidence: output[best],
            distribution,
            status,
        })
    }

    /// Exports the bound model with its vocabulary, label index and the
    /// current corpus.
    ///
    /// # Errors
    /// - `Usage` if no model has been trained yet
    pub fn export(&self) -> Result<Snapshot, ClassifierError> {
        let inner = self.read();
        let bound = inner.bound.as_ref().ok_or_else(|| {
            ClassifierError::Usage(format!("Classifier is {}, there is no model to export", inner.state()))
        })?;
        Ok(Snapshot::new(bound, inner.corpus.examples()))
    }

    /// Replaces model, vocabulary, label index and corpus in one step and
    /// marks the classifier TRAINED. The snapshot's widths are checked
    /// first; nothing changes if they disagree.
    ///
    /// # Errors
    /// - `SnapshotIntegrity` if the snapshot is not internally consistent
    pub fn import(&self, snapshot: Snapshot) -> Result<(), ClassifierError> {
        let (bound, examples) = snapshot.into_parts()?;
        let corpus = Corpus::from_examples(examples);

        let mut inner = self.write();
        if inner.lifecycle.is_training() {
            warn!("Importing a snapshot while training; the running result will be discarded");
        }
        inner.corpus = corpus;
        inner.bound = Some(Arc::new(bound));
        inner.lifecycle.reset();
        info!(
            "Imported snapshot: {} examples, {} labels",
            inner.corpus.len(),
            inner.corpus.labels().len()
        );
        Ok(())
    }
}

impl Default for TextClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{mpsc, Mutex};

    struct FailingTrainer;

    impl NetworkTrainer for FailingTrainer {
        fn train(
            &self,
            _dataset: &[TrainingPair],
            _config: &TrainingConfig,
        ) -> Result<(FeedForwardNetwork, TrainingStats), ClassifierError> {
            Err(ClassifierError::TrainingFailure("rejected".into()))
        }
    }

    struct WaitingTrainer(Mutex<mpsc::Receiver<()>>);

    impl NetworkTrainer for WaitingTrainer {
        fn train(
            &self,
            dataset: &[TrainingPair],
            config: &TrainingConfig,
        ) -> Result<(FeedForwardNetwork, TrainingStats), ClassifierError> {
            let _ = self.0.lock().unwrap().recv();
            BackpropTrainer::with_seed(1).train(dataset, config)
        }
    }

    struct PanickingTrainer;

    impl NetworkTrainer for PanickingTrainer {
        fn train(
            &self,
            _dataset: &[TrainingPair],
            _config: &TrainingConfig,
        ) -> Result<(FeedForwardNetwork, TrainingStats), ClassifierError> {
            panic!("boom")
        }
    }

    fn quiet() -> TrainingConfig {
        TrainingConfig::default().with_logging(false, 10)
    }

    fn on_off() -> Vec<TrainingExample> {
        vec![
            TrainingExample::new("on", "turn it on"),
            TrainingExample::new("off", "turn it off"),
        ]
    }

    #[test]
    fn test_predict_untrained_is_usage_error() {
        let classifier = TextClassifier::new();
        assert!(matches!(classifier.predict("anything"), Err(ClassifierError::Usage(_))));
        classifier.load_examples(on_off()).unwrap();
        assert!(matches!(classifier.predict("turn it on"), Err(ClassifierError::Usage(_))));
    }

    #[test]
    fn test_new_is_empty_and_untrained() {
        let classifier = TextClassifier::new();
        assert_eq!(classifier.get_configuration(), TrainingConfig::default());
        assert!(classifier.list_corpus().is_empty());
        assert!(classifier.vocabulary().is_empty());
        assert_eq!(classifier.get_state(), State::Untrained);
    }

    #[tokio::test]
    async fn test_set_configuration_keeps_trained_model() {
        let classifier = TextClassifier::builder()
            .with_configuration(quiet())
            .with_seed(3)
            .with_examples(on_off())
            .build()
            .unwrap();
        classifier.train().unwrap().await.unwrap();
        let before = classifier.predict("turn it on").unwrap();

        classifier
            .set_configuration(quiet().with_iterations(10).with_learning_rate(0.5))
            .unwrap();

        assert_eq!(classifier.get_state(), State::Trained);
        assert_eq!(classifier.get_configuration().iterations, 10);
        let after = classifier.predict("turn it on").unwrap();
        assert_eq!(after.label, before.label);
        assert_eq!(after.confidence, before.confidence);
        assert_eq!(after.status, State::Trained);
    }

    #[test]
    fn test_train_outside_runtime() {
        let classifier = TextClassifier::new();
        assert!(matches!(classifier.train(), Err(ClassifierError::Usage(_))));
        assert_eq!(classifier.get_state(), State::Untrained);
    }

    #[test]
    fn test_set_configuration_keeps_previous_on_error() {
        let classifier = TextClassifier::new();
        classifier.set_configuration(quiet().with_iterations(5)).unwrap();
        assert!(classifier.set_configuration(quiet().with_iterations(0)).is_err());
        assert_eq!(classifier.get_configuration().iterations, 5);
    }

    #[tokio::test]
    async fn test_failure_propagates_and_reverts() {
        let classifier = TextClassifier::builder()
            .with_configuration(quiet())
            .with_trainer(FailingTrainer)
            .with_examples(on_off())
            .build()
            .unwrap();

        let handle = classifier.train().unwrap();
        let result = handle.await;
        assert!(matches!(result, Err(ClassifierError::TrainingFailure(_))));
        assert_eq!(classifier.get_state(), State::Untrained);
    }

    #[tokio::test]
    async fn test_panicking_trainer_is_a_failure() {
        let classifier = TextClassifier::builder()
            .with_configuration(quiet())
            .with_trainer(PanickingTrainer)
            .with_examples(on_off())
            .build()
            .unwrap();

        assert!(matches!(classifier.train().unwrap().await, Err(ClassifierError::TrainingFailure(_))));
        assert_eq!(classifier.get_state(), State::Untrained);
        // The classifier is usable again afterwards.
        assert!(classifier.train().is_ok());
    }

    #[tokio::test]
    async fn test_second_train_while_training_is_rejected() {
        let (tx, rx) = mpsc::channel();
        let classifier = TextClassifier::builder()
            .with_configuration(quiet())
            .with_trainer(WaitingTrainer(Mutex::new(rx)))
            .with_examples(on_off())
            .build()
            .unwrap();

        let handle = classifier.train().unwrap();
        assert_eq!(classifier.get_state(), State::Training);
        assert!(matches!(classifier.train(), Err(ClassifierError::Usage(_))));
        tx.send(()).unwrap();
        handle.await.unwrap();
        assert_eq!(classifier.get_state(), State::Trained);
    }

    #[tokio::test]
    async fn test_export_requires_model() {
        let classifier = TextClassifier::new();
        assert!(matches!(classifier.export(), Err(ClassifierError::Usage(_))));
    }

    #[tokio::test]
    async fn test_empty_corpus_training_fails() {
        let classifier = TextClassifier::builder().with_configuration(quiet()).build().unwrap();
        assert!(matches!(classifier.train().unwrap().await, Err(ClassifierError::TrainingFailure(_))));
        assert_eq!(classifier.get_state(), State::Untrained);
    }
}
