use thiserror::Error;

/// Represents the different types of errors that can occur in the text classifier.
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// The classifier was used in a way its current state does not allow,
    /// e.g. predicting before any model was trained
    #[error("Usage error: {0}")]
    Usage(String),
    /// Invalid input parameters, malformed corpus data or configuration
    #[error("Validation error: {0}")]
    Validation(String),
    /// The network trainer rejected the dataset or failed while training
    #[error("Training failure: {0}")]
    TrainingFailure(String),
    /// A vector did not have the width the model was built for
    #[error("Shape mismatch: {what} expected width {expected}, got {actual}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    /// An imported snapshot is not internally consistent
    #[error("Snapshot integrity error: {0}")]
    SnapshotIntegrity(String),
    /// JSON encoding or decoding failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClassifierError {
    pub(crate) fn shape(what: &'static str, expected: usize, actual: usize) -> Self {
        Self::ShapeMismatch { what, expected, actual }
    }
}
