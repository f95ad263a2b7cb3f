use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use tempfile::TempDir;

use sepia::analyzer::Analyzer;
use sepia::config::{AnalyzerConfig, EngineConfig};
use sepia::embedding::HashedEmbedding;
use sepia::index::InvertedIndex;
use sepia::storage::IndexStorage;

struct BenchEnv {
    _tmp: TempDir,
    engine: IndexStorage,
}

fn make_document(id: u64) -> String {
    const VOCAB: [&str; 16] = [
        "amber", "basalt", "cobalt", "dune", "ember", "flint", "garnet", "heath", "iris",
        "jasper", "krill", "lichen", "marble", "nickel", "onyx", "pumice",
    ];
    let mut text = String::new();
    for j in 0..24u64 {
        let pick = ((id.wrapping_mul(31).wrapping_add(j * 7)) % VOCAB.len() as u64) as usize;
        text.push_str(VOCAB[pick]);
        text.push(' ');
    }
    text
}

fn build_env(doc_count: u32) -> BenchEnv {
    let tmp = TempDir::new().unwrap();
    let config = EngineConfig::new(tmp.path()).with_analyzer(AnalyzerConfig::without_stopwords());
    let engine = IndexStorage::open(config, Arc::new(HashedEmbedding::new(16))).unwrap();

    for id in 1..=doc_count {
        engine.index(id, &make_document(id as u64)).unwrap();
    }

    BenchEnv { _tmp: tmp, engine }
}

fn build_inverted(doc_count: u32) -> InvertedIndex {
    let analyzer = Analyzer::new(&AnalyzerConfig::without_stopwords());
    let mut index = InvertedIndex::new(analyzer, 23);
    for id in 1..=doc_count {
        index.index(id, &make_document(id as u64));
    }
    index
}

fn bench_rank_proximity(c: &mut Criterion) {
    let mut group = c.benchmark_group("rank_proximity");
    for &count in &[1_000u32, 5_000] {
        let index = build_inverted(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &index, |b, index| {
            b.iter(|| black_box(index.rank_proximity("amber basalt", 10)));
        });
    }
    group.finish();
}

fn bench_hybrid_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("hybrid_search");
    for &count in &[1_000u32, 5_000] {
        let env = build_env(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &env, |b, env| {
            b.iter(|| black_box(env.engine.search("amber basalt", 10).unwrap()));
        });
    }
    group.finish();
}

fn bench_index_throughput(c: &mut Criterion) {
    c.bench_function("index_document", |b| {
        let env = build_env(100);
        let mut next_id = 1_000u32;
        b.iter(|| {
            next_id += 1;
            env.engine
                .index(next_id, &make_document(next_id as u64))
                .unwrap();
        });
    });
}

fn bench_inverted_codec(c: &mut Criterion) {
    let index = build_inverted(2_000);
    let encoded = index.encode();
    c.bench_function("inverted_encode", |b| {
        b.iter(|| black_box(index.encode()));
    });
    c.bench_function("inverted_decode", |b| {
        b.iter(|| {
            let analyzer = Analyzer::new(&AnalyzerConfig::without_stopwords());
            black_box(InvertedIndex::decode(&encoded, analyzer, 23).unwrap())
        });
    });
}

criterion_group!(
    benches,
    bench_rank_proximity,
    bench_hybrid_search,
    bench_index_throughput,
    bench_inverted_codec
);
criterion_main!(benches);
