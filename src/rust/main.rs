use brain_text::{SnapshotStore, TextClassifier, TrainingConfig};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding saved snapshots (defaults to $BRAIN_TEXT_HOME/snapshots)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Train a classifier from a `{label: [texts]}` JSON corpus and save it
    Train {
        /// Path to the corpus file
        #[arg(short, long)]
        corpus: PathBuf,
        /// Snapshot name to save under
        #[arg(short, long, default_value = "default")]
        name: String,
        /// JSON file with training hyperparameters
        #[arg(long)]
        config: Option<PathBuf>,
        /// Override the maximum number of iterations
        #[arg(long)]
        iterations: Option<usize>,
        /// Seed the shuffle and weight initialisation
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Classify one or more texts with a saved snapshot
    Predict {
        /// Snapshot name to load
        #[arg(short, long, default_value = "default")]
        name: String,
        /// Texts to classify
        #[arg(required = true)]
        texts: Vec<String>,
    },
    /// Print the corpus stored in a snapshot
    Corpus {
        #[arg(short, long, default_value = "default")]
        name: String,
    },
}

fn open_store(dir: Option<PathBuf>) -> Result<SnapshotStore> {
    let store = match dir {
        Some(dir) => SnapshotStore::new(&dir),
        None => SnapshotStore::new_default(),
    };
    store.context("Failed to open snapshot store")
}

fn load_config(path: Option<PathBuf>, iterations: Option<usize>) -> Result<TrainingConfig> {
    let mut config = match path {
        Some(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config {:?}", path))?;
            serde_json::from_str(&json).with_context(|| format!("Invalid config {:?}", path))?
        }
        None => TrainingConfig::default(),
    };
    if let Some(iterations) = iterations {
        config.iterations = iterations;
    }
    Ok(config)
}

async fn train(
    store: &SnapshotStore,
    corpus: PathBuf,
    name: &str,
    config: TrainingConfig,
    seed: Option<u64>,
) -> Result<()> {
    let examples = SnapshotStore::read_corpus(&corpus)
        .with_context(|| format!("Failed to load corpus {:?}", corpus))?;

    let mut builder = TextClassifier::builder()
        .with_configuration(config)
        .with_examples(examples);
    if let Some(seed) = seed {
        builder = builder.with_seed(seed);
    }
    let classifier = builder.build()?;

    let info = classifier.info();
    info!(
        "=== Training on {} examples, {} labels, {} tokens ===",
        info.num_examples,
        info.class_labels.len(),
        info.vocabulary_size
    );

    let start_time = Instant::now();
    let report = classifier.train()?.await?;
    info!("=== Training complete (took {:.2?}) ===", start_time.elapsed());

    let path = store.save(name, &classifier.export()?)?;
    println!(
        "Trained '{}' in {} iterations (error {:.6}), saved to {}",
        name,
        report.stats.iterations,
        report.stats.error,
        path.display()
    );
    Ok(())
}

fn predict(store: &SnapshotStore, name: &str, texts: &[String]) -> Result<()> {
    let classifier = TextClassifier::new();
    classifier.import(store.load(name)?)?;

    for text in texts {
        let result = classifier
            .predict(text)
            .with_context(|| format!("Failed to classify {:?}", text))?;

        let mut scores: Vec<_> = result.distribution.into_iter().collect();
        scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        println!("\n{}", text);
        println!("  Predicted class: {} ({:.1}%)", result.label, result.confidence * 100.0);
        println!("  Scores (sorted):");
        for (label, score) in scores {
            println!("    {}: {:.1}%", label, score * 100.0);
        }
    }
    Ok(())
}

fn list_corpus(store: &SnapshotStore, name: &str) -> Result<()> {
    let snapshot = store.load(name)?;
    for example in &snapshot.corpus {
        println!("{}\t{}", example.label, example.text);
    }
    println!("{} examples", snapshot.corpus.len());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let store = open_store(args.store)?;

    match args.command {
        Command::Train { corpus, name, config, iterations, seed } => {
            let config = load_config(config, iterations)?;
            train(&store, corpus, &name, config, seed).await
        }
        Command::Predict { name, texts } => predict(&store, &name, &texts),
        Command::Corpus { name } => list_corpus(&store, &name),
    }
}
