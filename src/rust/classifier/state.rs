use std::fmt;
use serde::{Deserialize, Serialize};

use super::error::ClassifierError;

/// Lifecycle state of a classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum State {
    /// No model, or the model is known to be invalid
    Untrained,
    /// A model exists but the corpus changed since it was trained
    Outdated,
    /// A training run is in flight
    Training,
    /// The model matches the current vocabulary and label index
    Trained,
}

impl State {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Untrained => "UNTRAINED",
            Self::Outdated => "OUTDATED",
            Self::Training => "TRAINING",
            Self::Trained => "TRAINED",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one training run and the corpus version it captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TrainingTicket {
    generation: u64,
    epoch: u64,
}

/// What to do with the result of a finished training run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Completion {
    /// Bind the new model; `stale` when the corpus changed during the run
    Bind { stale: bool },
    /// The corpus was replaced wholesale during the run
    Discard,
}

/// Bookkeeping behind [`State`].
///
/// The state is derived rather than stored: TRAINING while a ticket is
/// out, otherwise UNTRAINED/OUTDATED/TRAINED depending on whether a model is
/// bound and whether the corpus moved since. `generation` counts every
/// corpus mutation, `epoch` counts wholesale replacements (load/import)
/// that make in-flight results meaningless.
#[derive(Debug, Default)]
pub(crate) struct Lifecycle {
    generation: u64,
    epoch: u64,
    stale: bool,
    training: Option<TrainingTicket>,
}

impl Lifecycle {
    pub fn state(&self, has_model: bool) -> State {
        if self.training.is_some() {
            State::Training
        } else if !has_model {
            State::Untrained
        } else if self.stale {
            State::Outdated
        } else {
            State::Trained
        }
    }

    /// An append or remove happened.
    pub fn mutated(&mut self) {
        self.generation += 1;
        self.stale = true;
    }

    /// The corpus (and possibly the model) was replaced wholesale. A run
    /// still in flight is released: its ticket belongs to the old epoch, so
    /// its result will be discarded and a new run may start right away.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.epoch += 1;
        self.stale = false;
        self.training = None;
    }

    pub fn begin_training(&mut self) -> Result<TrainingTicket, ClassifierError> {
        if self.training.is_some() {
            return Err(ClassifierError::Usage(
                "A training run is already in progress".into(),
            ));
        }
        let ticket = TrainingTicket {
            generation: self.generation,
            epoch: self.epoch,
        };
        self.training = Some(ticket);
        Ok(ticket)
    }

    /// Ends the run. A failed run leaves everything else as it was, which
    /// reverts the visible state to what it would be without the run.
    pub fn finish_training(&mut self, ticket: TrainingTicket, succeeded: bool) -> Option<Completion> {
        if self.training == Some(ticket) {
            self.training = None;
        }
        if !succeeded {
            return None;
        }
        if ticket.epoch != self.epoch {
            return Some(Completion::Discard);
        }
        self.stale = ticket.generation != self.generation;
        Some(Completion::Bind { stale: self.stale })
    }

    pub fn is_training(&self) -> bool {
        self.training.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let lifecycle = Lifecycle::default();
        assert_eq!(lifecycle.state(false), State::Untrained);
    }

    #[test]
    fn test_mutation_outdates_model() {
        let mut lifecycle = Lifecycle::default();
        let ticket = lifecycle.begin_training().unwrap();
        assert_eq!(lifecycle.state(false), State::Training);
        assert_eq!(lifecycle.finish_training(ticket, true), Some(Completion::Bind { stale: false }));
        assert_eq!(lifecycle.state(true), State::Trained);

        lifecycle.mutated();
        assert_eq!(lifecycle.state(true), State::Outdated);
        lifecycle.mutated();
        assert_eq!(lifecycle.state(true), State::Outdated);
        assert_eq!(lifecycle.state(false), State::Untrained);
    }

    #[test]
    fn test_only_one_run_at_a_time() {
        let mut lifecycle = Lifecycle::default();
        let _ticket = lifecycle.begin_training().unwrap();
        assert!(matches!(lifecycle.begin_training(), Err(ClassifierError::Usage(_))));
    }

    #[test]
    fn test_failure_reverts() {
        let mut lifecycle = Lifecycle::default();
        let ticket = lifecycle.begin_training().unwrap();
        assert_eq!(lifecycle.finish_training(ticket, true), Some(Completion::Bind { stale: false }));

        let ticket = lifecycle.begin_training().unwrap();
        assert_eq!(lifecycle.finish_training(ticket, false), None);
        assert_eq!(lifecycle.state(true), State::Trained);
        assert!(!lifecycle.is_training());
    }

    #[test]
    fn test_mutation_during_training_leaves_outdated() {
        let mut lifecycle = Lifecycle::default();
        let ticket = lifecycle.begin_training().unwrap();
        lifecycle.mutated();
        assert_eq!(lifecycle.state(false), State::Training);
        assert_eq!(lifecycle.finish_training(ticket, true), Some(Completion::Bind { stale: true }));
        assert_eq!(lifecycle.state(true), State::Outdated);
    }

    #[test]
    fn test_reset_during_training_discards_result() {
        let mut lifecycle = Lifecycle::default();
        let ticket = lifecycle.begin_training().unwrap();
        lifecycle.reset();
        assert_eq!(lifecycle.state(true), State::Trained);
        assert!(!lifecycle.is_training());
        assert_eq!(lifecycle.finish_training(ticket, true), Some(Completion::Discard));
        assert_eq!(lifecycle.state(false), State::Untrained);
    }

    #[test]
    fn test_new_run_after_reset_survives_old_completion() {
        let mut lifecycle = Lifecycle::default();
        let old = lifecycle.begin_training().unwrap();
        lifecycle.reset();
        let new = lifecycle.begin_training().unwrap();

        assert_eq!(lifecycle.finish_training(old, true), Some(Completion::Discard));
        assert_eq!(lifecycle.state(true), State::Training);
        assert_eq!(lifecycle.finish_training(new, true), Some(Completion::Bind { stale: false }));
        assert_eq!(lifecycle.state(true), State::Trained);
    }

    #[test]
    fn test_display_matches_wire_names() {
        assert_eq!(State::Trained.to_string(), "TRAINED");
        assert_eq!(serde_json::to_string(&State::Outdated).unwrap(), r#""OUTDATED""#);
    }
}
