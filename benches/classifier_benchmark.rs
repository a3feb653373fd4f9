use brain_text::classifier::{prepare_dataset, Corpus};
use brain_text::{TextClassifier, TrainingConfig, TrainingExample, Vocabulary};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

const SHORT_TEXT: &str = "turn the lights on";
const LONG_TEXT: &str = "This is a much longer request that mentions the lights several \
     times, asks whether it is too dark in the living room, and finally wonders if the \
     lamp next to the sofa could be switched off before everybody goes to sleep tonight.";

fn corpus_of(labels: usize, per_label: usize) -> Vec<TrainingExample> {
    let mut examples = Vec::with_capacity(labels * per_label);
    for label in 0..labels {
        for i in 0..per_label {
            examples.push(TrainingExample::new(
                format!("intent_{}", label),
                format!("please do thing {} variant {} with the lights", label, i),
            ));
        }
    }
    examples
}

fn setup_trained_classifier(rt: &tokio::runtime::Runtime) -> TextClassifier {
    let classifier = TextClassifier::builder()
        .with_configuration(
            TrainingConfig::default()
                .with_logging(false, 10)
                .with_iterations(200),
        )
        .with_seed(1)
        .with_examples(corpus_of(4, 5))
        .build()
        .unwrap();
    rt.block_on(async { classifier.train().unwrap().await.unwrap() });
    classifier
}

fn bench_vectorize(c: &mut Criterion) {
    let vocabulary = Vocabulary::build(
        corpus_of(10, 10).iter().map(|e| e.text.clone()).collect::<Vec<_>>(),
    );
    let mut group = c.benchmark_group("Vectorize");
    group.sample_size(50);

    group.bench_function("short_text", |b| {
        b.iter(|| vocabulary.vectorize(black_box(SHORT_TEXT)))
    });
    group.bench_function("long_text", |b| {
        b.iter(|| vocabulary.vectorize(black_box(LONG_TEXT)))
    });

    group.finish();
}

fn bench_prediction(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let classifier = setup_trained_classifier(&rt);
    let mut group = c.benchmark_group("Prediction");
    group.sample_size(50);
    group.warm_up_time(std::time::Duration::from_secs(1));

    group.bench_function("short_text", |b| {
        b.iter(|| classifier.predict(black_box(SHORT_TEXT)).unwrap())
    });
    group.bench_function("long_text", |b| {
        b.iter(|| classifier.predict(black_box(LONG_TEXT)).unwrap())
    });

    group.finish();
}

fn bench_prepare_dataset(c: &mut Criterion) {
    let mut group = c.benchmark_group("PrepareDataset");
    group.sample_size(20);

    for size in [10, 50, 100] {
        let corpus = Corpus::from_examples(corpus_of(size / 10, 10));
        group.bench_with_input(BenchmarkId::from_parameter(size), &corpus, |b, corpus| {
            b.iter(|| prepare_dataset(black_box(corpus)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_vectorize, bench_prediction, bench_prepare_dataset);
criterion_main!(benches);
