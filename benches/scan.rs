//! Benchmarks for the lexical scanner and a full project run
//!
//! Sources are generated so the numbers do not depend on a checked-in corpus.

use std::fs;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use exportscope::analysis::scanner::strip_comments;
use exportscope::analysis::{analyze_project, ScanOptions, Scanner};
use exportscope::config::ProjectConfig;
use tempfile::TempDir;

/// A module with `count` imports, exports, comments and template strings
fn generate_source(count: usize) -> String {
    let mut source = String::new();
    for i in 0..count {
        source.push_str(&format!(
            "import {{ helper{i}, other{i} as alias{i} }} from './dep{i}';\n\
             // export const commented{i} = 1;\n\
             /* block {i} with \"quotes\" */\n\
             export const value{i} = `template ${{helper{i}}} text`;\n\
             export function fn{i}() {{ return 'import x from \"y\"'; }}\n"
        ));
    }
    source.push_str("export default class Widget {}\n");
    source
}

fn bench_strip_comments(c: &mut Criterion) {
    let mut group = c.benchmark_group("strip_comments");

    for size in [10, 100, 1000].iter() {
        let source = generate_source(*size);

        group.bench_with_input(BenchmarkId::new("blocks", size), &source, |b, src| {
            b.iter(|| black_box(strip_comments(src, true)));
        });
    }

    group.finish();
}

fn bench_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan");
    let scanner = Scanner::new(ScanOptions::default());

    for size in [10, 100, 1000].iter() {
        let source = generate_source(*size);

        group.bench_with_input(BenchmarkId::new("blocks", size), &source, |b, src| {
            b.iter(|| black_box(scanner.scan(src)));
        });
    }

    group.finish();
}

/// A chain of files where each imports half of the previous one's exports
fn generate_project(files: usize) -> TempDir {
    let dir = TempDir::new().expect("create temp dir");
    for i in 0..files {
        let mut source = String::new();
        if i > 0 {
            source.push_str(&format!("import {{ a{p}, c{p} }} from './m{p}';\n", p = i - 1));
        }
        for name in ["a", "b", "c", "d"] {
            source.push_str(&format!("export const {name}{i} = {i};\n"));
        }
        fs::write(dir.path().join(format!("m{i}.ts")), source).expect("write source");
    }
    dir
}

fn bench_analyze_project(c: &mut Criterion) {
    let mut group = c.benchmark_group("analyze_project");
    group.sample_size(20);

    for size in [50, 200].iter() {
        let dir = generate_project(*size);
        let config = ProjectConfig::with_defaults(dir.path());

        group.bench_with_input(BenchmarkId::new("files", size), &config, |b, cfg| {
            b.iter(|| black_box(analyze_project(cfg)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_strip_comments, bench_scan, bench_analyze_project);
criterion_main!(benches);
