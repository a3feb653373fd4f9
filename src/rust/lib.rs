//! A small text classifier that keeps its own labeled corpus, derives a
//! bag-of-words vocabulary from it and trains a feed-forward network to
//! map utterances to labels.
//!
//! # Basic Usage
//!
//! ```rust
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use brain_text::{TextClassifier, TrainingConfig, TrainingExample, State};
//!
//! let classifier = TextClassifier::builder()
//!     .with_configuration(TrainingConfig::default().with_logging(false, 10))
//!     .build()?;
//!
//! classifier.load_corpus(r#"{
//!     "lights_on": ["turn the lights on", "it is too dark in here"],
//!     "lights_off": ["turn the lights off", "switch off the lamp"]
//! }"#)?;
//!
//! classifier.train()?.await?;
//! assert_eq!(classifier.get_state(), State::Trained);
//!
//! let result = classifier.predict("lights on please")?;
//! println!("Predicted class: {} ({:.2})", result.label, result.confidence);
//!
//! // New data leaves the model outdated until the next training run
//! classifier.append_one(TrainingExample::new("lights_on", "more light"))?;
//! assert_eq!(classifier.get_state(), State::Outdated);
//! # Ok(())
//! # }
//! ```
//!
//! # Thread Safety
//!
//! `TextClassifier` is a cheap handle around shared state; clone it to use
//! the same classifier from several threads. Predictions only take a read
//! lock and may run concurrently with each other and with training.
//!
//! ```rust
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use brain_text::{TextClassifier, TrainingConfig};
//! use std::thread;
//!
//! let classifier = TextClassifier::builder()
//!     .with_configuration(TrainingConfig::default().with_logging(false, 10))
//!     .with_corpus_json(r#"{"yes": ["sure thing"], "no": ["no way"]}"#)?
//!     .build()?;
//! classifier.train()?.await?;
//!
//! let mut handles = vec![];
//! for _ in 0..3 {
//!     let classifier = classifier.clone();
//!     handles.push(thread::spawn(move || {
//!         classifier.predict("sure").unwrap();
//!     }));
//! }
//!
//! for handle in handles {
//!     handle.join().unwrap();
//! }
//! # Ok(())
//! # }
//! ```

pub mod classifier;
mod config;
pub mod store;

pub use classifier::{
    AppendReport, BackpropTrainer, ClassificationResult, ClassifierBuilder, ClassifierError,
    ClassifierInfo, DuplicateData, FeedForwardNetwork, LabelIndex, NetworkTrainer, Snapshot, State,
    TextClassifier, TrainingExample, TrainingHandle, TrainingPair, TrainingReport, TrainingStats,
    Vocabulary,
};
pub use config::TrainingConfig;
pub use store::{SnapshotStore, StoreError};

pub fn init_logger() {
    env_logger::init();
}
