use std::collections::HashMap;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Splits text into lower-cased word tokens.
///
/// Every character that is not alphanumeric acts as a separator, so
/// punctuation never ends up inside a token. Non-ASCII letters are kept
/// ("lámpara" stays one token).
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_lowercase())
        .collect()
}

/// An ordered set of distinct tokens used to size and position
/// bag-of-words vectors.
///
/// Index `i` of every vector produced by [`Vocabulary::vectorize`] refers to
/// `tokens()[i]` for the lifetime of the instance. A changed corpus gets a
/// new vocabulary; an existing one is never mutated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Vocabulary {
    tokens: Vec<String>,
    positions: HashMap<String, usize>,
}

impl Vocabulary {
    /// Builds the vocabulary from a collection of texts. Tokens are ordered
    /// by first occurrence, so the result is deterministic for a fixed
    /// text order.
    pub fn build<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tokens = Vec::new();
        let mut positions = HashMap::new();
        for text in texts {
            for token in tokenize(text.as_ref()) {
                if !positions.contains_key(&token) {
                    positions.insert(token.clone(), tokens.len());
                    tokens.push(token);
                }
            }
        }
        Self { tokens, positions }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn position(&self, token: &str) -> Option<usize> {
        self.positions.get(token).copied()
    }

    /// True when no token appears twice. Always holds for built
    /// vocabularies; deserialized ones may violate it.
    pub(crate) fn is_consistent(&self) -> bool {
        self.positions.len() == self.tokens.len()
    }

    /// Converts text into a presence vector of length `self.len()`.
    /// Tokens outside the vocabulary are ignored.
    pub fn vectorize(&self, text: &str) -> Array1<f32> {
        let mut vec = Array1::zeros(self.tokens.len());
        for token in tokenize(text) {
            if let Some(&pos) = self.positions.get(&token) {
                vec[pos] = 1.0;
            }
        }
        vec
    }
}

impl From<Vec<String>> for Vocabulary {
    fn from(tokens: Vec<String>) -> Self {
        let positions = tokens
            .iter()
            .enumerate()
            .map(|(i, token)| (token.clone(), i))
            .collect();
        Self { tokens, positions }
    }
}

impl From<Vocabulary> for Vec<String> {
    fn from(vocab: Vocabulary) -> Self {
        vocab.tokens
    }
}
