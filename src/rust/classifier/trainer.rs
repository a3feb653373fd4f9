use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::task::JoinHandle;

use super::corpus::Corpus;
use super::error::ClassifierError;
use super::labels::LabelIndex;
use super::network::{FeedForwardNetwork, TrainingPair, TrainingStats};
use super::state::State;
use super::utils::one_hot;
use super::vectorizer::Vocabulary;

/// A trained network together with the vocabulary and label index it was
/// trained against. The three are only meaningful as a unit.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundModel {
    pub network: FeedForwardNetwork,
    pub vocabulary: Vocabulary,
    pub labels: LabelIndex,
}

impl BoundModel {
    /// Checks that the network's input and output widths match the
    /// vocabulary and label index.
    pub fn validate(&self) -> Result<(), ClassifierError> {
        self.network.validate()?;
        if !self.vocabulary.is_consistent() {
            return Err(ClassifierError::SnapshotIntegrity(
                "vocabulary contains repeated tokens".into(),
            ));
        }
        if self.network.input_size() != self.vocabulary.len() {
            return Err(ClassifierError::SnapshotIntegrity(format!(
                "model input width {} does not match vocabulary size {}",
                self.network.input_size(),
                self.vocabulary.len()
            )));
        }
        if self.network.output_size() != self.labels.len() {
            return Err(ClassifierError::SnapshotIntegrity(format!(
                "model output width {} does not match label count {}",
                self.network.output_size(),
                self.labels.len()
            )));
        }
        Ok(())
    }
}

/// Vectorizes every example of the corpus against its current vocabulary
/// and label index.
pub fn prepare_dataset(corpus: &Corpus) -> Vec<TrainingPair> {
    let vocabulary = corpus.vocabulary();
    let labels = corpus.labels();
    corpus
        .examples()
        .iter()
        .filter_map(|example| {
            let index = labels.index_of(&example.label)?;
            Some(TrainingPair {
                input: vocabulary.vectorize(&example.text),
                output: one_hot(index, labels.len()),
            })
        })
        .collect()
}

/// Outcome of a completed training run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingReport {
    pub stats: TrainingStats,
    /// Number of examples the run was trained on
    pub examples: usize,
    /// False when the corpus was replaced during the run and the new model
    /// was thrown away
    pub applied: bool,
    /// Classifier state right after the run finished
    pub state: State,
}

/// Future returned by `TextClassifier::train`.
///
/// The classifier's state is updated by the background task itself, so
/// dropping the handle does not cancel the run or skip the transition.
#[derive(Debug)]
pub struct TrainingHandle {
    pub(crate) task: JoinHandle<Result<TrainingReport, ClassifierError>>,
}

impl TrainingHandle {
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Future for TrainingHandle {
    type Output = Result<TrainingReport, ClassifierError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.task).poll(cx).map(|joined| match joined {
            Ok(result) => result,
            Err(e) => Err(ClassifierError::TrainingFailure(format!(
                "Training task did not complete: {}",
                e
            ))),
        })
    }
}
