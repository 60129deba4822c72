//! Shared data model for the analysis engine.
//!
//! These types flow forward through the pipeline: the scanner produces
//! [`RawImport`]/[`RawExport`], the name expander and resolver turn those into
//! [`AtomicImport`]/[`AtomicExport`], the relation builder aggregates them into
//! [`FileRelation`]s, and the final per-file view is an [`AnalysisResult`].

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use path_clean::PathClean;
use serde::Serialize;

/// Symbol name used for a default binding.
pub const DEFAULT_SYMBOL: &str = "default";

/// Symbol name used for namespace, dynamic and wildcard imports.
pub const WILDCARD_SYMBOL: &str = "*";

/// Canonical identity of a source file.
///
/// An absolute, lexically cleaned path with `/` separators and a lowercase
/// drive letter. Ordering is plain case-sensitive string ordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct FileId(String);

impl FileId {
    /// Creates a file identity from any path, normalizing it.
    ///
    /// # Example
    ///
    /// ```
    /// use exportscope::analysis::FileId;
    ///
    /// let id = FileId::new("/project/src/../lib/util.ts");
    /// assert_eq!(id.as_str(), "/project/lib/util.ts");
    ///
    /// let win = FileId::new("C:\\work\\app.ts");
    /// assert_eq!(win.as_str(), "c:/work/app.ts");
    /// ```
    pub fn new(path: impl AsRef<Path>) -> Self {
        let raw = path.as_ref().to_string_lossy().replace('\\', "/");
        let cleaned = Path::new(&raw).clean();
        let mut normalized = cleaned.to_string_lossy().replace('\\', "/");

        let bytes = normalized.as_bytes();
        if bytes.len() >= 2 && bytes[1] == b':' && bytes[0].is_ascii_alphabetic() {
            let drive = normalized[..1].to_ascii_lowercase();
            normalized.replace_range(..1, &drive);
        }

        Self(normalized)
    }

    /// Returns the normalized path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the normalized path as a [`Path`].
    pub fn as_path(&self) -> &Path {
        Path::new(&self.0)
    }

    /// Returns the directory containing this file.
    pub fn dir(&self) -> &Path {
        self.as_path().parent().unwrap_or_else(|| Path::new("/"))
    }

    /// Returns the path relative to `root` for display, or the full path when
    /// the file lives outside it.
    pub fn display_relative(&self, root: &Path) -> String {
        let root = FileId::new(root);
        let prefix = format!("{}/", root.as_str().trim_end_matches('/'));
        match self.0.strip_prefix(&prefix) {
            Some(rest) => rest.to_string(),
            None => self.0.clone(),
        }
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<Path> for FileId {
    fn as_ref(&self) -> &Path {
        self.as_path()
    }
}

/// An import declaration as written in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImport {
    /// The binding expression, e.g. `React`, `{ a, b as c }`, `* as ns`.
    /// Empty for side-effect imports (`import "./polyfill"`).
    pub name_expression: String,
    /// The module specifier as written.
    pub from_path: String,
}

impl RawImport {
    pub fn new(name_expression: impl Into<String>, from_path: impl Into<String>) -> Self {
        Self {
            name_expression: name_expression.into(),
            from_path: from_path.into(),
        }
    }

    /// Returns true for `import "x"` style imports that bind nothing.
    pub fn is_side_effect_only(&self) -> bool {
        self.name_expression.trim().is_empty()
    }
}

/// An export declaration as written in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawExport {
    /// The exported expression, e.g. `foo`, `default`, `{ a, b as c }`, `*`.
    pub name_expression: String,
    /// Present for re-exports (`export ... from "x"`).
    pub from_path: Option<String>,
}

impl RawExport {
    pub fn new(name_expression: impl Into<String>) -> Self {
        Self {
            name_expression: name_expression.into(),
            from_path: None,
        }
    }

    pub fn reexport(name_expression: impl Into<String>, from_path: impl Into<String>) -> Self {
        Self {
            name_expression: name_expression.into(),
            from_path: Some(from_path.into()),
        }
    }
}

/// One resolved, expanded import edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomicImport {
    pub in_file: FileId,
    /// A real identifier, [`DEFAULT_SYMBOL`] or [`WILDCARD_SYMBOL`].
    pub symbol_name: String,
    pub from_file: FileId,
}

impl AtomicImport {
    pub fn new(in_file: FileId, symbol_name: impl Into<String>, from_file: FileId) -> Self {
        Self {
            in_file,
            symbol_name: symbol_name.into(),
            from_file,
        }
    }

    /// Returns true if this import marks every export of its target as used.
    pub fn is_wildcard(&self) -> bool {
        self.symbol_name == WILDCARD_SYMBOL
    }
}

/// One resolved, expanded export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomicExport {
    pub in_file: FileId,
    pub symbol_name: String,
    /// Set for re-exports.
    pub from_file: Option<FileId>,
    /// Computed by the relation builder.
    pub is_used: bool,
}

impl AtomicExport {
    pub fn new(in_file: FileId, symbol_name: impl Into<String>) -> Self {
        Self {
            in_file,
            symbol_name: symbol_name.into(),
            from_file: None,
            is_used: false,
        }
    }

    pub fn reexport(in_file: FileId, symbol_name: impl Into<String>, from_file: FileId) -> Self {
        Self {
            in_file,
            symbol_name: symbol_name.into(),
            from_file: Some(from_file),
            is_used: false,
        }
    }
}

/// Per-file aggregate of imports and export usage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRelation {
    pub file: FileId,
    /// Imported symbol names grouped by resolved target file. A target with an
    /// empty list is a side-effect import.
    pub imports: BTreeMap<FileId, Vec<String>>,
    pub exports_used: Vec<String>,
    pub exports_not_used: Vec<String>,
    /// Unused exports kept out of the report by the main-entry or ignore
    /// policy. They do not count as usage for cycle pruning.
    pub exports_suppressed: Vec<String>,
}

impl FileRelation {
    pub fn new(file: FileId) -> Self {
        Self {
            file,
            imports: BTreeMap::new(),
            exports_used: Vec::new(),
            exports_not_used: Vec::new(),
            exports_suppressed: Vec::new(),
        }
    }

    /// Total number of distinct exports declared by the file.
    pub fn export_count(&self) -> usize {
        self.exports_used.len() + self.exports_not_used.len() + self.exports_suppressed.len()
    }

    /// Returns true if at least one export is used.
    pub fn has_used_exports(&self) -> bool {
        !self.exports_used.is_empty()
    }
}

/// The externally visible unit of an analysis run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisResult {
    pub file: FileId,
    /// The file exports something and none of it is used.
    pub is_completely_unused: bool,
    pub not_used_exports: Vec<String>,
    /// Remaining members of a cycle anchored at this file, in import order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub circular_import_chain: Option<Vec<FileId>>,
}

impl AnalysisResult {
    pub fn new(file: FileId) -> Self {
        Self {
            file,
            is_completely_unused: false,
            not_used_exports: Vec::new(),
            circular_import_chain: None,
        }
    }

    pub fn has_unused_exports(&self) -> bool {
        !self.not_used_exports.is_empty()
    }

    pub fn has_circular_imports(&self) -> bool {
        self.circular_import_chain
            .as_ref()
            .is_some_and(|chain| !chain.is_empty())
    }
}

/// Counters describing one analysis run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub files_processed: usize,
    pub import_count: usize,
    pub export_count: usize,
    pub not_used_export_count: usize,
    pub circular_import_count: usize,
    /// Pattern matches that failed to advance and were skipped.
    pub scan_anomalies: usize,
    pub elapsed: Duration,
    /// Non-fatal configuration and discovery problems.
    pub warnings: Vec<String>,
}

impl RunSummary {
    pub fn elapsed_ms(&self) -> u128 {
        self.elapsed.as_millis()
    }
}
