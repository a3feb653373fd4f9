use std::collections::{BTreeMap, HashMap};
use log::{debug, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::error::ClassifierError;
use super::labels::LabelIndex;
use super::vectorizer::{tokenize, Vocabulary};

/// A single labeled utterance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrainingExample {
    pub label: String,
    pub text: String,
}

impl TrainingExample {
    pub fn new(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
        }
    }

    fn validate(&self) -> Result<(), ClassifierError> {
        if self.label.trim().is_empty() {
            return Err(ClassifierError::Validation("Example label cannot be empty".into()));
        }
        if self.text.trim().is_empty() {
            return Err(ClassifierError::Validation(format!(
                "Example text for label '{}' cannot be empty",
                self.label
            )));
        }
        if tokenize(&self.text).is_empty() {
            return Err(ClassifierError::Validation(format!(
                "Example text '{}' for label '{}' contains no words",
                self.text, self.label
            )));
        }
        Ok(())
    }
}

/// An appended example whose text was already present in the corpus.
/// Duplicates are inserted anyway; this is only a warning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateData {
    pub example: TrainingExample,
    /// Label of the example that already carried the same text
    pub existing_label: String,
}

impl DuplicateData {
    /// True when the same text now appears under two different labels.
    pub fn is_conflicting(&self) -> bool {
        self.example.label != self.existing_label
    }
}

/// Outcome of an append operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppendReport {
    pub added: usize,
    pub duplicates: Vec<DuplicateData>,
}

impl AppendReport {
    pub fn has_duplicates(&self) -> bool {
        !self.duplicates.is_empty()
    }
}

/// Parses the corpus load format, an object mapping each label to an
/// array of example texts:
///
/// ```json
/// { "on": ["turn it on"], "off": ["turn it off"] }
/// ```
///
/// Examples come out grouped by label in label order; callers shuffle.
pub fn parse_corpus_json(json: &str) -> Result<Vec<TrainingExample>, ClassifierError> {
    let grouped: BTreeMap<String, Vec<String>> = serde_json::from_str(json)
        .map_err(|e| ClassifierError::Usage(format!("Malformed corpus JSON: {}", e)))?;

    let examples: Vec<TrainingExample> = grouped
        .into_iter()
        .flat_map(|(label, texts)| {
            texts
                .into_iter()
                .map(move |text| TrainingExample::new(label.clone(), text))
        })
        .collect();

    for example in &examples {
        example.validate()?;
    }
    Ok(examples)
}

/// The labeled corpus together with the data derived from it.
///
/// Vocabulary and label index are rebuilt eagerly on every mutation, so the
/// triple (examples, vocabulary, labels) is always consistent.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    examples: Vec<TrainingExample>,
    vocabulary: Vocabulary,
    labels: LabelIndex,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a corpus from examples in the given order, without shuffling.
    pub fn from_examples(examples: Vec<TrainingExample>) -> Self {
        let mut corpus = Self {
            examples,
            ..Self::default()
        };
        corpus.rebuild();
        corpus
    }

    /// Replaces the whole corpus, then shuffles it (Fisher-Yates) so class
    /// order does not bias training.
    pub fn load<R: Rng + ?Sized>(
        &mut self,
        examples: Vec<TrainingExample>,
        rng: &mut R,
    ) -> Result<(), ClassifierError> {
        for example in &examples {
            example.validate()?;
        }
        self.examples = examples;
        self.examples.shuffle(rng);
        self.rebuild();
        Ok(())
    }

    /// Appends every example, reporting the ones whose text was already
    /// present. Nothing is rejected for being a duplicate.
    pub fn append(&mut self, examples: Vec<TrainingExample>) -> Result<AppendReport, ClassifierError> {
        for example in &examples {
            example.validate()?;
        }

        let mut report = AppendReport::default();
        if examples.is_empty() {
            return Ok(report);
        }

        let mut seen: HashMap<String, String> = self
            .examples
            .iter()
            .map(|e| (e.text.clone(), e.label.clone()))
            .collect();

        for example in examples {
            if let Some(existing_label) = seen.get(&example.text) {
                warn!(
                    "Duplicate text '{}' (label '{}', already present under '{}')",
                    example.text, example.label, existing_label
                );
                report.duplicates.push(DuplicateData {
                    example: example.clone(),
                    existing_label: existing_label.clone(),
                });
            } else {
                seen.insert(example.text.clone(), example.label.clone());
            }
            self.examples.push(example);
            report.added += 1;
        }

        self.rebuild();
        Ok(report)
    }

    /// Removes the first example matching both label and text.
    /// Returns false when no such example exists.
    pub fn remove(&mut self, example: &TrainingExample) -> bool {
        match self.examples.iter().position(|e| e == example) {
            Some(pos) => {
                self.examples.remove(pos);
                self.rebuild();
                true
            }
            None => false,
        }
    }

    pub fn examples(&self) -> &[TrainingExample] {
        &self.examples
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn labels(&self) -> &LabelIndex {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    fn rebuild(&mut self) {
        self.vocabulary = Vocabulary::build(self.examples.iter().map(|e| e.text.as_str()));
        self.labels = LabelIndex::build(&self.examples);
        debug!(
            "Rebuilt vocabulary ({} tokens) and label index ({} labels) from {} examples",
            self.vocabulary.len(),
            self.labels.len(),
            self.examples.len()
        );
    }
}
