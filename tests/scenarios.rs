//! End-to-end runs of the engine over small fixture projects.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use exportscope::analysis::{analyze_project, AnalysisOutcome, AnalysisResult, FileId};
use exportscope::config::{ConfigOverrides, ProjectConfig};
use exportscope::session::{AnalysisSession, SessionRegistry};
use tempfile::TempDir;

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn analyze(root: &Path) -> AnalysisOutcome {
    analyze_project(&ProjectConfig::load(root, &ConfigOverrides::default()))
}

fn result_for<'a>(outcome: &'a AnalysisOutcome, root: &Path, relative: &str) -> Option<&'a AnalysisResult> {
    let file = FileId::new(root.join(relative));
    outcome.results.iter().find(|r| r.file == file)
}

fn unused(outcome: &AnalysisOutcome, root: &Path, relative: &str) -> Vec<String> {
    result_for(outcome, root, relative)
        .map(|r| r.not_used_exports.clone())
        .unwrap_or_default()
}

fn relative_chain(result: &AnalysisResult, root: &Path) -> Vec<String> {
    result
        .circular_import_chain
        .iter()
        .flatten()
        .map(|file| file.display_relative(root))
        .collect()
}

#[test]
fn test_diamond_reports_only_the_dead_export() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, "index.ts", "import { left } from './left';\nimport { right } from './right';\n");
    write(root, "left.ts", "import { shared } from './base';\nexport const left = shared;\n");
    write(root, "right.ts", "import { shared } from './base';\nexport const right = shared;\n");
    write(root, "base.ts", "export const shared = 1;\nexport const leftover = 2;\n");

    let outcome = analyze(root);
    assert_eq!(outcome.results.len(), 1);
    assert_eq!(unused(&outcome, root, "base.ts"), vec!["leftover"]);
    assert!(!outcome.results[0].is_completely_unused);
    assert_eq!(outcome.summary.files_processed, 4);
    assert_eq!(outcome.summary.import_count, 4);
    assert_eq!(outcome.summary.export_count, 4);
    assert_eq!(outcome.summary.circular_import_count, 0);
}

#[test]
fn test_three_file_cycle_is_anchored_at_first_file() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, "a.ts", "import { b } from './b';\nexport const a = 1;\n");
    write(root, "b.ts", "import { c } from './c';\nexport const b = 2;\n");
    write(root, "c.ts", "import { a } from './a';\nexport const c = 3;\n");

    let outcome = analyze(root);
    assert_eq!(outcome.summary.circular_import_count, 1);
    let cycles = outcome.circular_imports();
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].file, FileId::new(root.join("a.ts")));
    assert_eq!(relative_chain(&cycles[0], root), vec!["b.ts", "c.ts"]);
    assert!(outcome.unused_exports().is_empty());
}

#[test]
fn test_two_file_cycle_is_reported_once_whichever_file_is_read_first() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, "z.ts", "import { m } from './m';\nexport const z = 1;\n");
    write(root, "m.ts", "import { z } from './z';\nexport const m = 2;\n");

    let outcome = analyze(root);
    let cycles = outcome.circular_imports();
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].file, FileId::new(root.join("m.ts")));
    assert_eq!(relative_chain(&cycles[0], root), vec!["z.ts"]);
}

#[test]
fn test_cycle_through_unused_file_is_pruned() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    // b only imports a for side effects, so nothing of a is used.
    write(root, "a.ts", "import { b } from './b';\nexport const a = 1;\n");
    write(root, "b.ts", "import './a';\nexport const b = 2;\n");

    let outcome = analyze(root);
    assert_eq!(outcome.summary.circular_import_count, 0);
    assert!(outcome.circular_imports().is_empty());
    assert_eq!(unused(&outcome, root, "a.ts"), vec!["a"]);
}

#[test]
fn test_cycle_kept_when_used_export_comes_from_outside_it() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, "a.ts", "import { b } from './b';\nexport const x = 1;\n");
    write(root, "b.ts", "import './a';\nexport const b = 2;\n");
    write(root, "c.ts", "import { x } from './a';\n");

    let outcome = analyze(root);
    assert_eq!(outcome.summary.circular_import_count, 1);
    let cycles = outcome.circular_imports();
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].file, FileId::new(root.join("a.ts")));
    assert_eq!(relative_chain(&cycles[0], root), vec!["b.ts"]);
    assert!(outcome.unused_exports().is_empty());
}

#[test]
fn test_wildcard_and_dynamic_imports_use_everything() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, "lib.ts", "export const one = 1;\nexport function two() {}\n");
    write(root, "lazy.ts", "export default class Page {}\nexport const meta = {};\n");
    write(
        root,
        "main.ts",
        "import * as lib from './lib';\nconst page = () => import('./lazy');\n",
    );

    let outcome = analyze(root);
    assert!(outcome.results.is_empty(), "{:?}", outcome.results);
    assert_eq!(outcome.summary.export_count, 4);
}

#[test]
fn test_destructured_rename_exports_local_name() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, "values.ts", "const source = { a: 1, b: 2 };\nexport const { a, b: renamed } = source;\n");
    write(root, "use.ts", "import { a } from './values';\n");

    let outcome = analyze(root);
    assert_eq!(unused(&outcome, root, "values.ts"), vec!["renamed"]);
}

#[test]
fn test_tsconfig_path_aliases() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(
        root,
        "tsconfig.json",
        r#"{
  // path aliases
  "compilerOptions": {
    "baseUrl": ".",
    "paths": { "@/*": ["src/*"], },
  },
}"#,
    );
    write(root, "src/lib/math.ts", "export const add = 1;\nexport const sub = 2;\n");
    write(root, "src/app.ts", "import { add } from '@/lib/math';\n");

    let outcome = analyze(root);
    assert_eq!(unused(&outcome, root, "src/lib/math.ts"), vec!["sub"]);
    assert!(outcome.summary.warnings.is_empty(), "{:?}", outcome.summary.warnings);
}

#[test]
fn test_self_import_is_not_usage() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, "loop.ts", "import { x } from './loop';\nexport const x = 1;\n");

    let outcome = analyze(root);
    let result = result_for(&outcome, root, "loop.ts").unwrap();
    assert_eq!(result.not_used_exports, vec!["x"]);
    assert!(result.is_completely_unused);
    assert!(!result.has_circular_imports());
}

#[test]
fn test_commented_and_quoted_code_is_ignored() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, "lib.ts", "export const real = 1;\n");
    write(
        root,
        "main.ts",
        "// import { real } from './lib';\n\
         const text = \"import { real } from './lib'\";\n\
         /* export const fake = 1; */\n\
         const tpl = `export const alsoFake = 2;`;\n",
    );

    let outcome = analyze(root);
    assert_eq!(unused(&outcome, root, "lib.ts"), vec!["real"]);
    assert!(result_for(&outcome, root, "main.ts").is_none());
    assert_eq!(outcome.summary.import_count, 0);
}

#[test]
fn test_brace_inside_string_keeps_following_import() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, "a.ts", "export const a = 1;\n");
    write(root, "main.ts", "const hint = \"import {\"; import { a } from './a';\n");

    let outcome = analyze(root);
    assert!(outcome.unused_exports().is_empty(), "{:?}", outcome.results);
    assert_eq!(outcome.summary.import_count, 1);
}

#[test]
fn test_non_ascii_identifiers_are_tracked() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, "menu.ts", "export const café = 1;\nexport const thé = 2;\n");
    write(root, "main.ts", "import { café } from './menu';\n");

    let outcome = analyze(root);
    assert_eq!(outcome.summary.export_count, 2);
    assert_eq!(unused(&outcome, root, "menu.ts"), vec!["thé"]);
}

#[test]
fn test_main_entry_and_ignore_marker() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, "package.json", r#"{ "name": "fixture", "main": "src/index.ts" }"#);
    write(root, "src/index.ts", "export const api = 1;\n");
    write(
        root,
        "src/internal.ts",
        "// exportscope-ignore-next-line\nexport const kept = 1;\nexport const dead = 2;\n",
    );

    let outcome = analyze(root);
    assert!(result_for(&outcome, root, "src/index.ts").is_none());
    assert_eq!(unused(&outcome, root, "src/internal.ts"), vec!["dead"]);

    let overrides = ConfigOverrides {
        main_not_used: true,
        ..ConfigOverrides::default()
    };
    let outcome = analyze_project(&ProjectConfig::load(root, &overrides));
    assert_eq!(unused(&outcome, root, "src/index.ts"), vec!["api"]);
}

#[test]
fn test_repeated_runs_are_identical() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, "a.ts", "import { b } from './b';\nexport const a = 1;\nexport const extra = 1;\n");
    write(root, "b.ts", "import { a } from './a';\nexport const b = 2;\n");
    write(root, "c.ts", "export default function c() {}\n");

    let first = analyze(root);
    let second = analyze(root);
    assert_eq!(first.results, second.results);
    assert_eq!(first.summary.not_used_export_count, second.summary.not_used_export_count);
    assert_eq!(first.summary.circular_import_count, second.summary.circular_import_count);
    assert_eq!(first.summary.import_count, second.summary.import_count);
}

#[test]
fn test_concurrent_refreshes_are_dropped_not_queued() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    for i in 0..40 {
        write(
            root,
            &format!("m{i}.ts"),
            &format!("export const used{i} = {i};\nexport const dead{i} = {i};\n"),
        );
    }
    write(root, "main.ts", "import { used0 } from './m0';\n");

    let session = Arc::new(AnalysisSession::new(root, ConfigOverrides::default()));
    let notified = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&notified);
    session.subscribe(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let session = Arc::clone(&session);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                session.refresh()
            })
        })
        .collect();
    let successes = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .filter(|ran| *ran)
        .count();

    assert!(successes >= 1);
    assert_eq!(notified.load(Ordering::SeqCst), successes);
    assert!(!session.is_refreshing());
    assert_eq!(session.summary().files_processed, 41);
    assert_eq!(session.summary().not_used_export_count, 79);
}

#[test]
fn test_registry_keeps_projects_apart() {
    let one = TempDir::new().unwrap();
    let two = TempDir::new().unwrap();
    write(one.path(), "a.ts", "import { b } from './b';\nexport const a = 1;\n");
    write(one.path(), "b.ts", "import { a } from './a';\nexport const b = 1;\n");
    write(two.path(), "solo.ts", "export const lonely = 1;\n");

    let registry = SessionRegistry::default();
    registry.session(one.path());
    registry.session(two.path());
    assert_eq!(registry.refresh_all(), 2);

    let first = registry.get(one.path()).unwrap();
    let second = registry.get(two.path()).unwrap();
    assert_eq!(first.circular_imports().len(), 1);
    assert!(first.unused_exports().is_empty());
    assert!(second.circular_imports().is_empty());
    assert_eq!(second.unused_exports()[0].not_used_exports, vec!["lonely"]);
}
