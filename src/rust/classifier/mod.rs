mod error;
mod utils;
mod vectorizer;
mod labels;
mod corpus;
mod state;
mod network;
mod trainer;
mod snapshot;
pub mod builder;
#[allow(clippy::module_inception)]
mod classifier;

pub use error::ClassifierError;
pub use utils::{argmax, one_hot};
pub use vectorizer::{tokenize, Vocabulary};
pub use labels::LabelIndex;
pub use corpus::{parse_corpus_json, AppendReport, Corpus, DuplicateData, TrainingExample};
pub use state::State;
pub use network::{BackpropTrainer, FeedForwardNetwork, NetworkTrainer, TrainingPair, TrainingStats};
pub use trainer::{prepare_dataset, BoundModel, TrainingHandle, TrainingReport};
pub use snapshot::{Snapshot, SNAPSHOT_VERSION};
pub use builder::ClassifierBuilder;
pub use classifier::{ClassificationResult, TextClassifier};

/// Information about the current state of a classifier
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierInfo {
    /// Lifecycle state
    pub state: State,
    /// Number of examples in the corpus
    pub num_examples: usize,
    /// Number of distinct tokens in the corpus vocabulary
    pub vocabulary_size: usize,
    /// Labels of the corpus, ordered by index
    pub class_labels: Vec<String>,
    /// Layer sizes of the bound model, if any
    pub model_layers: Option<Vec<usize>>,
}
