//! Benchmarks for the test gap analyzers.
//!
//! Run with: cargo bench
//! Run specific benchmark: cargo bench -- index
//! Generate flamegraph: cargo bench --bench analyzers -- --profile-time=5

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tempfile::TempDir;

use gotestgap::analyzers::index::ProjectIndex;
use gotestgap::analyzers::{placement, testgap, untested};
use gotestgap::config::Config;
use gotestgap::core::{AnalysisContext, Analyzer, FileSet};
use gotestgap::parser::Parser;

/// Create a temporary Go module with source and test files for benchmarking.
fn create_benchmark_project(file_count: usize) -> TempDir {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let path = temp.path();

    std::fs::write(path.join("go.mod"), "module example.com/bench\n\ngo 1.22\n")
        .expect("Failed to write go.mod");

    for i in 0..file_count {
        let pkg = format!("pkg{}", i % 5);
        let dir = path.join(&pkg);
        std::fs::create_dir_all(&dir).expect("Failed to create package dir");

        std::fs::write(dir.join(format!("module_{i}.go")), generate_source(&pkg, i))
            .expect("Failed to write source file");

        // Every other file gets a test file; every fifth test lands in the wrong file.
        if i % 2 == 0 {
            let target = if i % 5 == 0 { i + 1 } else { i };
            std::fs::write(
                dir.join(format!("module_{i}_test.go")),
                generate_test(&pkg, i, target),
            )
            .expect("Failed to write test file");
        }
    }

    temp
}

fn generate_source(pkg: &str, seed: usize) -> String {
    let mut source = format!("package {pkg}\n\ntype Service{seed} struct {{\n\tcount int\n}}\n");

    for func in 0..8 {
        source.push_str(&format!(
            "\n// Func{seed}_{func} does some work.\nfunc Func{seed}_{func}(x int) int {{\n\tif x > {func} {{\n\t\treturn helper{seed}(x)\n\t}}\n\treturn x\n}}\n"
        ));
        source.push_str(&format!(
            "\nfunc (s *Service{seed}) Method{func}() int {{\n\ts.count++\n\treturn s.count\n}}\n"
        ));
    }
    source.push_str(&format!("\nfunc helper{seed}(x int) int {{\n\treturn x * 2\n}}\n"));
    source
}

fn generate_test(pkg: &str, seed: usize, target: usize) -> String {
    let mut source = format!("package {pkg}\n\nimport \"testing\"\n");
    for func in 0..4 {
        source.push_str(&format!(
            "\nfunc TestFunc{target}_{func}(t *testing.T) {{\n\tif Func{target}_{func}({seed}) < 0 {{\n\t\tt.Fatal(\"negative\")\n\t}}\n\ts := &Service{target}{{}}\n\ts.Method{func}()\n}}\n"
        ));
    }
    source
}

/// Benchmark file set creation (file discovery).
fn bench_file_discovery(c: &mut Criterion) {
    let mut group = c.benchmark_group("file_discovery");

    for size in [10, 50, 100].iter() {
        let temp = create_benchmark_project(*size);
        let config = Config::default();

        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::new("files", size), size, |b, _| {
            b.iter(|| {
                let files = FileSet::from_path(temp.path(), &config).unwrap();
                black_box(files.len())
            });
        });
    }

    group.finish();
}

/// Benchmark parsing and indexing the whole tree.
fn bench_index(c: &mut Criterion) {
    let mut group = c.benchmark_group("index");

    for size in [10, 50, 100].iter() {
        let temp = create_benchmark_project(*size);
        let config = Config::default();
        let files = FileSet::from_path(temp.path(), &config).unwrap();
        let ctx = AnalysisContext::new(&files, &config, Some(temp.path()));
        let parser = Parser::new();

        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::new("files", size), size, |b, _| {
            b.iter(|| {
                let index = ProjectIndex::build(&ctx, &parser, false).unwrap();
                black_box(index.declaration_count())
            });
        });
    }

    group.finish();
}

/// Benchmark the untested function check without coverage.
fn bench_untested(c: &mut Criterion) {
    let mut group = c.benchmark_group("untested");

    for size in [10, 50, 100].iter() {
        let temp = create_benchmark_project(*size);
        let config = Config::default();
        let files = FileSet::from_path(temp.path(), &config).unwrap();
        let ctx = AnalysisContext::new(&files, &config, Some(temp.path()));

        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::new("files", size), size, |b, _| {
            let analyzer = untested::Analyzer::new().with_coverage(false);
            b.iter(|| {
                let result = analyzer.analyze(&ctx).unwrap();
                black_box(result.functions_without_tests.len())
            });
        });
    }

    group.finish();
}

/// Benchmark the misplaced test check.
fn bench_misplaced(c: &mut Criterion) {
    let mut group = c.benchmark_group("misplaced");

    for size in [10, 50, 100].iter() {
        let temp = create_benchmark_project(*size);
        let config = Config::default();
        let files = FileSet::from_path(temp.path(), &config).unwrap();
        let ctx = AnalysisContext::new(&files, &config, Some(temp.path()));

        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::new("files", size), size, |b, _| {
            let analyzer = placement::Analyzer::new();
            b.iter(|| {
                let result = analyzer.analyze(&ctx).unwrap();
                black_box(result.misplaced_tests.len())
            });
        });
    }

    group.finish();
}

/// Benchmark the full report on one pre-built index.
fn bench_analyze_index(c: &mut Criterion) {
    let mut group = c.benchmark_group("analyze_index");

    for size in [10, 50, 100].iter() {
        let temp = create_benchmark_project(*size);
        let config = Config::default();
        let files = FileSet::from_path(temp.path(), &config).unwrap();
        let ctx = AnalysisContext::new(&files, &config, Some(temp.path()));
        let index = ProjectIndex::build(&ctx, &Parser::new(), false).unwrap();

        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::new("files", size), size, |b, _| {
            let analyzer = testgap::Analyzer::new().with_coverage(false);
            b.iter(|| {
                let (untested, misplaced, _) = analyzer.analyze_index(&index, None);
                black_box(untested.len() + misplaced.len())
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_file_discovery,
    bench_index,
    bench_untested,
    bench_misplaced,
    bench_analyze_index,
);
criterion_main!(benches);
