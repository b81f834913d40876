use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::Array1;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use reviewsense::{evaluate, embed_all, BatchConfig, EmbeddingVector, Label, LogisticRegression, PipelineError, TextEmbedder};

/// Two gaussian-ish clouds offset along every axis
fn synthetic(n: usize, dim: usize, seed: u64) -> (Vec<EmbeddingVector>, Vec<Label>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut vectors = Vec::with_capacity(n);
    let mut labels = Vec::with_capacity(n);
    for i in 0..n {
        let label = if i % 2 == 0 { Label::Positive } else { Label::Negative };
        let shift = if label == Label::Positive { 0.3 } else { -0.3 };
        vectors.push((0..dim).map(|_| rng.random_range(-1.0f32..1.0) + shift).collect());
        labels.push(label);
    }
    (vectors, labels)
}

struct HashEmbedder {
    dim: usize,
}

impl TextEmbedder for HashEmbedder {
    fn embed(&self, text: &str) -> Result<EmbeddingVector, PipelineError> {
        let mut vector = Array1::zeros(self.dim);
        for (i, byte) in text.bytes().enumerate() {
            vector[(i * 31 + byte as usize) % self.dim] += 1.0;
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dim
    }
}

fn bench_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("Fit");
    group.sample_size(10);
    group.warm_up_time(std::time::Duration::from_secs(1));

    // BERT-sized vectors at growing training set sizes
    for &n in &[100usize, 500, 1000] {
        let (vectors, labels) = synthetic(n, 768, 42);
        let trainer = LogisticRegression::default();
        group.bench_with_input(BenchmarkId::new("examples", n), &n, |b, _| {
            b.iter(|| trainer.fit(black_box(&vectors), black_box(&labels)).unwrap())
        });
    }

    group.finish();
}

fn bench_predict_and_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("Predict");
    group.sample_size(50);

    let (train_x, train_y) = synthetic(400, 768, 1);
    let (test_x, test_y) = synthetic(1000, 768, 2);
    let model = LogisticRegression::default().fit(&train_x, &train_y).unwrap();

    group.bench_function("predict_1000", |b| b.iter(|| model.predict(black_box(&test_x)).unwrap()));

    let predicted = model.predict(&test_x).unwrap();
    group.bench_function("evaluate_1000", |b| {
        b.iter(|| evaluate(black_box(&test_y), black_box(&predicted)).unwrap())
    });

    group.finish();
}

fn bench_batching(c: &mut Criterion) {
    let mut group = c.benchmark_group("Batching");
    group.sample_size(20);

    let embedder = HashEmbedder { dim: 768 };
    let texts: Vec<String> = (0..2000)
        .map(|i| format!("review number {} with a bit of text to hash into a vector", i % 1500))
        .collect();

    for &workers in &[1usize, 2, 4] {
        let config = BatchConfig { workers, progress_interval: 0 };
        group.bench_with_input(BenchmarkId::new("workers", workers), &workers, |b, _| {
            b.iter(|| embed_all(black_box(&texts), &embedder, &config).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_fit, bench_predict_and_evaluate, bench_batching);
criterion_main!(benches);
