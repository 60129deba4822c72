//! Source discovery: enumerates candidate files under a project root.

use std::path::Path;

use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::types::FileId;
use super::AnalysisError;

/// Compiled include/exclude rules. Patterns are relative to the project root.
#[derive(Debug, Clone)]
pub struct DiscoveryRules {
    include: GlobSet,
    exclude: GlobSet,
}

impl DiscoveryRules {
    /// Compiles the patterns. Invalid patterns are skipped and returned as
    /// warnings alongside the rules.
    pub fn new(include: &[String], exclude: &[String]) -> (Self, Vec<AnalysisError>) {
        let mut warnings = Vec::new();
        let include = build_set(include, &mut warnings);
        let exclude = build_set(exclude, &mut warnings);
        (Self { include, exclude }, warnings)
    }

    /// Returns true if `relative` (a `/`-separated path below the root) is a
    /// candidate source file.
    pub fn matches(&self, relative: &str) -> bool {
        if relative.ends_with(".d.ts") {
            return false;
        }
        self.include.is_match(relative) && !self.exclude.is_match(relative)
    }
}

fn compile_glob(pattern: &str) -> Result<Glob, AnalysisError> {
    let normalized = pattern.replace('\\', "/");
    let normalized = normalized.trim_start_matches("./");
    GlobBuilder::new(normalized)
        .literal_separator(true)
        .build()
        .map_err(|source| AnalysisError::InvalidGlob {
            pattern: pattern.to_string(),
            source,
        })
}

fn build_set(patterns: &[String], warnings: &mut Vec<AnalysisError>) -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        match compile_glob(pattern) {
            Ok(glob) => {
                builder.add(glob);
            }
            Err(err) => {
                warn!(%err, "skipping glob pattern");
                warnings.push(err);
            }
        }
    }
    builder.build().unwrap_or_else(|err| {
        warn!(%err, "failed to build glob set");
        GlobSet::empty()
    })
}

/// Files found under a root, plus non-fatal problems met on the way.
#[derive(Debug, Default)]
pub struct Discovered {
    /// Sorted, de-duplicated candidate files.
    pub files: Vec<FileId>,
    pub warnings: Vec<AnalysisError>,
}

/// Walks `root` and returns every file accepted by `rules`.
///
/// Version-control and dependency directories are never entered. Entries that
/// cannot be read are skipped and reported in [`Discovered::warnings`].
pub fn discover_files(root: &Path, rules: &DiscoveryRules) -> Discovered {
    let root_id = FileId::new(root);
    let prefix = format!("{}/", root_id.as_str().trim_end_matches('/'));
    let mut discovered = Discovered::default();

    for entry in WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| !is_ignored_dir(e))
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(%err, "skipping unreadable entry");
                let path = err.path().unwrap_or(root).to_path_buf();
                discovered.warnings.push(AnalysisError::Walk { path, source: err });
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let id = FileId::new(entry.path());
        let Some(relative) = id.as_str().strip_prefix(&prefix) else {
            continue;
        };
        if rules.matches(relative) {
            discovered.files.push(id);
        }
    }

    discovered.files.sort();
    discovered.files.dedup();
    debug!(root = %root_id, count = discovered.files.len(), "discovered source files");
    discovered
}

/// Check if a directory should be skipped during traversal.
fn is_ignored_dir(entry: &walkdir::DirEntry) -> bool {
    if !entry.file_type().is_dir() || entry.depth() == 0 {
        return false;
    }

    let name = entry.file_name().to_string_lossy();
    matches!(name.as_ref(), "node_modules" | ".git")
}
