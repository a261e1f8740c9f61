//! 平均化された重みベクトルとコンパクトモデルの分類速度のベンチマーク
//!
//! 疎な素性ベクトルを多クラスで分類し、クラスごとの重みベクトルを引く場合と
//! 並列配列のコンパクトモデルを引く場合を比較します。

use std::time::Duration;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use cellprune::perceptron::{AveragedPerceptron, FeatureVector, NumericVector};

const NUM_CLASSES: usize = 16;
const VECTOR_LENGTH: usize = 200_000;
const NUM_ACTIVE: usize = 24;
const NUM_EXAMPLES: usize = 5_000;

// Deterministic xorshift so that every run sees the same data.
struct XorShift(u64);

impl XorShift {
    fn next(&mut self) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next() % n as u64) as usize
    }
}

fn examples(rng: &mut XorShift) -> Vec<(usize, FeatureVector)> {
    (0..NUM_EXAMPLES)
        .map(|_| {
            let gold = rng.below(NUM_CLASSES);
            let mut indices = vec![gold];
            indices.extend((1..NUM_ACTIVE).map(|_| rng.below(VECTOR_LENGTH)));
            (gold, FeatureVector::from_indices(VECTOR_LENGTH, indices).unwrap())
        })
        .collect()
}

fn argmax(vectors: &[NumericVector<f32>], x: &FeatureVector) -> usize {
    let mut best = 0;
    let mut best_score = f32::NEG_INFINITY;
    for (class, w) in vectors.iter().enumerate() {
        let score = w.dot_product(x);
        if score > best_score {
            best = class;
            best_score = score;
        }
    }
    best
}

fn benchmark_classify(c: &mut Criterion) {
    let mut rng = XorShift(0x2545_f491_4f6c_dd1d);
    let train = examples(&mut rng);
    let test = examples(&mut rng);

    let mut perceptron = AveragedPerceptron::multiclass(NUM_CLASSES, 1.0);
    for _ in 0..3 {
        for (gold, x) in &train {
            perceptron.train(*gold, x).unwrap();
        }
    }
    let averaged = perceptron.averaged_weights().to_vec();
    let model = perceptron.finalize();

    let mut group = c.benchmark_group("Classification Speed");
    group.throughput(Throughput::Elements(test.len() as u64));
    group.warm_up_time(Duration::from_secs(3));
    group.measurement_time(Duration::from_secs(10));
    group.sample_size(20);

    group.bench_function(BenchmarkId::new("Weight-Vectors", NUM_CLASSES), |b| {
        b.iter(|| test.iter().map(|(_, x)| argmax(&averaged, x)).sum::<usize>());
    });

    group.bench_function(BenchmarkId::new("Compact-Model", NUM_CLASSES), |b| {
        b.iter(|| test.iter().map(|(_, x)| model.classify(x)).sum::<usize>());
    });

    group.finish();
}

criterion_group!(benches, benchmark_classify);
criterion_main!(benches);
