use serde::{Deserialize, Serialize};

use super::corpus::TrainingExample;
use super::error::ClassifierError;
use super::labels::LabelIndex;
use super::network::FeedForwardNetwork;
use super::trainer::BoundModel;
use super::vectorizer::Vocabulary;

pub const SNAPSHOT_VERSION: u32 = 1;

fn default_version() -> u32 {
    SNAPSHOT_VERSION
}

/// Everything needed to rebuild a working classifier: the trained network,
/// the vocabulary and label index it was trained against, and the corpus.
///
/// ```json
/// { "version": 1, "model": {...}, "vocabulary": ["turn", "it", "on"],
///   "labelIndex": {"on": 0}, "corpus": [{"label": "on", "text": "turn it on"}] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default = "default_version")]
    pub version: u32,
    pub model: FeedForwardNetwork,
    pub vocabulary: Vocabulary,
    pub label_index: LabelIndex,
    pub corpus: Vec<TrainingExample>,
}

impl Snapshot {
    pub(crate) fn new(bound: &BoundModel, corpus: &[TrainingExample]) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            model: bound.network.clone(),
            vocabulary: bound.vocabulary.clone(),
            label_index: bound.labels.clone(),
            corpus: corpus.to_vec(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ClassifierError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ClassifierError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, ClassifierError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Splits the snapshot into the bound model and the corpus after
    /// checking that the pieces fit together.
    pub(crate) fn into_parts(self) -> Result<(BoundModel, Vec<TrainingExample>), ClassifierError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(ClassifierError::SnapshotIntegrity(format!(
                "unsupported snapshot version {} (expected {})",
                self.version, SNAPSHOT_VERSION
            )));
        }
        let bound = BoundModel {
            network: self.model,
            vocabulary: self.vocabulary,
            labels: self.label_index,
        };
        bound.validate()?;
        Ok((bound, self.corpus))
    }
}
