use serde::{Deserialize, Serialize};

use crate::classifier::ClassifierError;

/// Hyperparameters for a training run.
///
/// A new configuration only takes effect on the next `train()` call;
/// replacing it does not invalidate an already trained model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrainingConfig {
    /// Maximum number of passes over the training data
    pub iterations: usize,
    /// Training stops once the mean squared error drops below this value
    pub error_threshold: f32,
    /// Log progress while training
    pub log_enabled: bool,
    /// Iterations between two progress log lines
    pub log_period: usize,
    pub learning_rate: f32,
    pub momentum: f32,
    /// Hidden layer sizes. `None` picks one layer sized from the input width.
    pub hidden_layers: Option<Vec<usize>>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            iterations: 3000,
            error_threshold: 0.0006,
            log_enabled: true,
            log_period: 10,
            learning_rate: 0.3,
            momentum: 0.1,
            hidden_layers: None,
        }
    }
}

impl TrainingConfig {
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_error_threshold(mut self, error_threshold: f32) -> Self {
        self.error_threshold = error_threshold;
        self
    }

    pub fn with_logging(mut self, enabled: bool, period: usize) -> Self {
        self.log_enabled = enabled;
        self.log_period = period;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_momentum(mut self, momentum: f32) -> Self {
        self.momentum = momentum;
        self
    }

    pub fn with_hidden_layers(mut self, layers: Vec<usize>) -> Self {
        self.hidden_layers = Some(layers);
        self
    }

    /// Checks every field against its allowed range.
    pub fn validate(&self) -> Result<(), ClassifierError> {
        if self.iterations == 0 {
            return Err(ClassifierError::Validation("iterations must be positive".into()));
        }
        if !(self.error_threshold > 0.0 && self.error_threshold < 1.0) {
            return Err(ClassifierError::Validation(format!(
                "errorThreshold must be in (0, 1), got {}",
                self.error_threshold
            )));
        }
        if self.log_period == 0 {
            return Err(ClassifierError::Validation("logPeriod must be positive".into()));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(ClassifierError::Validation(format!(
                "learningRate must be in (0, 1], got {}",
                self.learning_rate
            )));
        }
        if !(self.momentum >= 0.0 && self.momentum < 1.0) {
            return Err(ClassifierError::Validation(format!(
                "momentum must be in [0, 1), got {}",
                self.momentum
            )));
        }
        if let Some(layers) = &self.hidden_layers {
            if layers.iter().any(|&size| size == 0) {
                return Err(ClassifierError::Validation("hidden layer sizes must be positive".into()));
            }
        }
        Ok(())
    }
}
