//! One analysis run over a project: discovery, scanning, resolution,
//! relation building and circular detection.

use std::collections::HashSet;
use std::fs;
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::discovery::{discover_files, DiscoveryRules};
use super::names::{expand, SymbolKind};
use super::relations::{RelationBuilder, UsagePolicy};
use super::resolver::ModuleResolver;
use super::scanner::{ScanOptions, ScanOutput, Scanner};
use super::types::{
    AnalysisResult, AtomicExport, AtomicImport, FileId, FileRelation, RunSummary, WILDCARD_SYMBOL,
};
use super::AnalysisError;
use crate::config::ProjectConfig;
use crate::graph::CircularDetector;

/// Results of one run plus its counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisOutcome {
    /// Files with unused exports or a circular import chain, sorted by file.
    pub results: Vec<AnalysisResult>,
    pub summary: RunSummary,
}

impl AnalysisOutcome {
    /// Entries with a non-empty not-used list.
    pub fn unused_exports(&self) -> Vec<AnalysisResult> {
        self.results
            .iter()
            .filter(|r| r.has_unused_exports())
            .cloned()
            .collect()
    }

    /// Entries with a non-empty cycle chain.
    pub fn circular_imports(&self) -> Vec<AnalysisResult> {
        self.results
            .iter()
            .filter(|r| r.has_circular_imports())
            .cloned()
            .collect()
    }
}

struct ScannedFile {
    file: FileId,
    output: ScanOutput,
}

#[derive(Default)]
struct FileAtoms {
    imports: Vec<AtomicImport>,
    side_effects: Vec<FileId>,
    exports: Vec<AtomicExport>,
}

/// Runs a full analysis of the project described by `config`.
///
/// Never fails: unreadable files are skipped and configuration or glob
/// problems end up in [`RunSummary::warnings`].
pub fn analyze_project(config: &ProjectConfig) -> AnalysisOutcome {
    let started = Instant::now();
    let mut warnings = config.warnings.clone();

    let (rules, rule_warnings) = DiscoveryRules::new(&config.include, &config.exclude);
    warnings.extend(rule_warnings.iter().map(ToString::to_string));
    let discovered = discover_files(&config.root, &rules);
    warnings.extend(discovered.warnings.iter().map(ToString::to_string));

    let scanner = Scanner::new(ScanOptions {
        honor_ignore_marker: config.honor_ignore_marker,
    });
    let read_results: Vec<Result<ScannedFile, AnalysisError>> = discovered
        .files
        .par_iter()
        .map(|file| {
            let text = fs::read_to_string(file.as_path()).map_err(|source| {
                AnalysisError::FileRead {
                    path: file.as_path().to_path_buf(),
                    source,
                }
            })?;
            Ok(ScannedFile {
                file: file.clone(),
                output: scanner.scan(&text),
            })
        })
        .collect();

    let mut scanned = Vec::with_capacity(read_results.len());
    for result in read_results {
        match result {
            Ok(file) => scanned.push(file),
            Err(err) => {
                warn!(%err, "excluding unreadable file");
                warnings.push(err.to_string());
            }
        }
    }
    let scan_anomalies = scanned.iter().map(|s| s.output.anomalies).sum();
    debug!(files = scanned.len(), "scanned source files");

    let resolver = ModuleResolver::new(&config.resolver, scanned.iter().map(|s| s.file.clone()));
    for err in resolver.warnings() {
        warn!(%err, "path alias skipped");
        warnings.push(err.to_string());
    }

    let atoms: Vec<FileAtoms> = scanned
        .par_iter()
        .map(|scanned| atomize(scanned, &resolver))
        .collect();

    let mut builder = RelationBuilder::new();
    let mut side_effect_count = 0;
    for (scanned, atoms) in scanned.iter().zip(atoms) {
        builder.add_file(scanned.file.clone());
        atoms.imports.into_iter().for_each(|i| builder.add_import(i));
        side_effect_count += atoms.side_effects.len();
        for target in atoms.side_effects {
            builder.add_side_effect_import(scanned.file.clone(), target);
        }
        atoms.exports.into_iter().for_each(|e| builder.add_export(e));
    }
    let import_count = builder.import_count() + side_effect_count;

    let policy = usage_policy(config, &resolver, &scanned, &mut warnings);
    let relations = builder.build(&policy);

    let unused: Vec<AnalysisResult> = relations
        .iter()
        .filter(|r| !r.exports_not_used.is_empty())
        .map(unused_result)
        .collect();

    let detection = CircularDetector::new(config.detect_circular_imports).detect(&relations, unused);
    let mut results = detection.results;
    results.sort_by(|a, b| a.file.cmp(&b.file));

    let summary = RunSummary {
        files_processed: scanned.len(),
        import_count,
        export_count: relations.iter().map(FileRelation::export_count).sum(),
        not_used_export_count: relations.iter().map(|r| r.exports_not_used.len()).sum(),
        circular_import_count: detection.cycles.len(),
        scan_anomalies,
        elapsed: started.elapsed(),
        warnings,
    };
    info!(
        root = %config.root.display(),
        files = summary.files_processed,
        unused = summary.not_used_export_count,
        cycles = summary.circular_import_count,
        elapsed_ms = summary.elapsed_ms() as u64,
        "analysis finished"
    );

    AnalysisOutcome { results, summary }
}

/// Expands and resolves the raw declarations of one file.
fn atomize(scanned: &ScannedFile, resolver: &ModuleResolver) -> FileAtoms {
    let file = &scanned.file;
    let mut atoms = FileAtoms::default();

    for raw in &scanned.output.imports {
        let Some(target) = resolver.resolve(file, &raw.from_path) else {
            continue;
        };
        if raw.is_side_effect_only() {
            atoms.side_effects.push(target);
            continue;
        }
        for symbol in expand(&raw.name_expression, SymbolKind::Import) {
            atoms
                .imports
                .push(AtomicImport::new(file.clone(), symbol, target.clone()));
        }
    }

    for raw in &scanned.output.exports {
        let source = raw
            .from_path
            .as_deref()
            .and_then(|from| resolver.resolve(file, from));

        // A re-export also imports from its source module.
        if let Some(target) = &source {
            for symbol in expand(&raw.name_expression, SymbolKind::Import) {
                atoms
                    .imports
                    .push(AtomicImport::new(file.clone(), symbol, target.clone()));
            }
        }

        for symbol in expand(&raw.name_expression, SymbolKind::Export) {
            if symbol == WILDCARD_SYMBOL {
                continue;
            }
            let export = match &source {
                Some(target) => AtomicExport::reexport(file.clone(), symbol, target.clone()),
                None => AtomicExport::new(file.clone(), symbol),
            };
            atoms.exports.push(export);
        }
    }

    atoms
}

fn usage_policy(
    config: &ProjectConfig,
    resolver: &ModuleResolver,
    scanned: &[ScannedFile],
    warnings: &mut Vec<String>,
) -> UsagePolicy {
    let main_entry_file = config
        .main_entry
        .as_deref()
        .and_then(|main| resolver.resolve_path(main));
    if let (Some(main), None) = (&config.main_entry, &main_entry_file) {
        debug!(main = %main.display(), "main entry is not an analyzed file");
    }

    let mut ignored_files = HashSet::new();
    if !config.ignore.is_empty() {
        let (rules, rule_warnings) = DiscoveryRules::new(&config.ignore, &[]);
        warnings.extend(rule_warnings.iter().map(ToString::to_string));
        ignored_files.extend(
            scanned
                .iter()
                .map(|s| &s.file)
                .filter(|file| rules.matches(&file.display_relative(&config.root)))
                .cloned(),
        );
    }

    UsagePolicy {
        main_entry_file,
        treat_main_exports_as_used: config.treat_main_exports_as_used,
        ignored_files,
    }
}

fn unused_result(relation: &FileRelation) -> AnalysisResult {
    let mut result = AnalysisResult::new(relation.file.clone());
    result.is_completely_unused = !relation.has_used_exports();
    result.not_used_exports = relation.exports_not_used.clone();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn config(root: &Path) -> ProjectConfig {
        ProjectConfig::with_defaults(root)
    }

    fn unused_of(outcome: &AnalysisOutcome, root: &Path, relative: &str) -> Vec<String> {
        let file = FileId::new(root.join(relative));
        outcome
            .results
            .iter()
            .find(|r| r.file == file)
            .map(|r| r.not_used_exports.clone())
            .unwrap_or_default()
    }

    #[test]
    fn test_named_default_and_reexport_usage() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "src/util.ts", "export const a = 1;\nexport const b = 2;\nexport default 3;\n");
        write(root, "src/barrel.ts", "export { a as alpha } from './util';\n");
        write(root, "src/main.ts", "import three from './util';\nimport { alpha } from './barrel';\n");

        let outcome = analyze_project(&config(root));
        assert_eq!(unused_of(&outcome, root, "src/util.ts"), vec!["b"]);
        assert!(unused_of(&outcome, root, "src/barrel.ts").is_empty());
        assert_eq!(outcome.summary.files_processed, 3);
        assert_eq!(outcome.summary.not_used_export_count, 1);
    }

    #[test]
    fn test_export_star_forwards_wildcard_usage() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "lib.ts", "export const x = 1;\nexport const y = 2;\n");
        write(root, "index.ts", "export * from './lib';\n");

        let outcome = analyze_project(&config(root));
        assert!(unused_of(&outcome, root, "lib.ts").is_empty());
        assert!(unused_of(&outcome, root, "index.ts").is_empty());
    }

    #[test]
    fn test_completely_unused_flag() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "dead.ts", "export function a() {}\nexport function b() {}\n");
        write(root, "half.ts", "export const used = 1;\nexport const unused = 2;\n");
        write(root, "main.ts", "import { used } from './half';\n");

        let outcome = analyze_project(&config(root));
        let dead = FileId::new(root.join("dead.ts"));
        let half = FileId::new(root.join("half.ts"));
        let find = |f: &FileId| outcome.results.iter().find(|r| &r.file == f).unwrap();
        assert!(find(&dead).is_completely_unused);
        assert!(!find(&half).is_completely_unused);
    }

    #[test]
    fn test_unreadable_file_is_excluded() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "ok.ts", "export const a = 1;\n");
        fs::write(root.join("binary.ts"), [0xff, 0xfe, 0x00, 0x80]).unwrap();

        let outcome = analyze_project(&config(root));
        assert_eq!(outcome.summary.files_processed, 1);
        assert_eq!(outcome.summary.warnings.len(), 1);
    }

    #[test]
    fn test_side_effect_import_counts_as_import_only() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "polyfill.ts", "export const install = 1;\n");
        write(root, "main.ts", "import './polyfill';\n");

        let outcome = analyze_project(&config(root));
        assert_eq!(outcome.summary.import_count, 1);
        assert_eq!(unused_of(&outcome, root, "polyfill.ts"), vec!["install"]);
    }

    #[test]
    fn test_circular_detection_toggle() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "a.ts", "import { b } from './b';\nexport const a = 1;\n");
        write(root, "b.ts", "import { a } from './a';\nexport const b = 2;\n");

        let outcome = analyze_project(&config(root));
        assert_eq!(outcome.summary.circular_import_count, 1);
        assert_eq!(outcome.circular_imports().len(), 1);

        let mut disabled = config(root);
        disabled.detect_circular_imports = false;
        let outcome = analyze_project(&disabled);
        assert_eq!(outcome.summary.circular_import_count, 0);
        assert!(outcome.results.is_empty());
    }
}
