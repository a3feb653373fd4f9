use std::collections::{BTreeMap, HashMap};
use serde::{Deserialize, Serialize};

use super::corpus::TrainingExample;
use super::error::ClassifierError;

/// A bijection between label strings and the dense integers `0..N-1`
/// used to shape model outputs.
///
/// Indices are assigned in order of first occurrence while scanning the
/// corpus. Serialized as a `{label: index}` map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, usize>", into = "BTreeMap<String, usize>")]
pub struct LabelIndex {
    labels: Vec<String>,
    indices: HashMap<String, usize>,
}

impl LabelIndex {
    pub fn build<'a, I>(examples: I) -> Self
    where
        I: IntoIterator<Item = &'a TrainingExample>,
    {
        let mut index = Self::default();
        for example in examples {
            if !index.indices.contains_key(&example.label) {
                index.indices.insert(example.label.clone(), index.labels.len());
                index.labels.push(example.label.clone());
            }
        }
        index
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.indices.get(label).copied()
    }

    pub fn label_of(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// Labels ordered by their index.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

impl TryFrom<BTreeMap<String, usize>> for LabelIndex {
    type Error = ClassifierError;

    fn try_from(map: BTreeMap<String, usize>) -> Result<Self, Self::Error> {
        let mut slots: Vec<Option<String>> = vec![None; map.len()];
        for (label, &index) in &map {
            match slots.get_mut(index) {
                Some(slot) => {
                    if let Some(other) = slot {
                        return Err(ClassifierError::SnapshotIntegrity(format!(
                            "labels '{}' and '{}' share index {}",
                            other, label, index
                        )));
                    }
                    *slot = Some(label.clone());
                }
                None => {
                    return Err(ClassifierError::SnapshotIntegrity(format!(
                        "label '{}' has index {} outside 0..{}",
                        label,
                        index,
                        map.len()
                    )))
                }
            }
        }
        let labels: Vec<String> = slots.into_iter().flatten().collect();
        let indices = map.into_iter().collect();
        Ok(Self { labels, indices })
    }
}

impl From<LabelIndex> for BTreeMap<String, usize> {
    fn from(index: LabelIndex) -> Self {
        index.indices.into_iter().collect()
    }
}
