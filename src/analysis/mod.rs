//! Source analysis for exportscope.
//!
//! This module finds unused exports in JavaScript/TypeScript projects without
//! a full parser. The pipeline runs strictly forward:
//!
//! - [`discovery`] enumerates candidate files from include/exclude globs
//! - [`scanner`] strips comments and templates and extracts raw declarations
//! - [`names`] expands name expressions into atomic symbols
//! - [`resolver`] maps import specifiers to discovered files
//! - [`relations`] aggregates everything per file and decides usage
//! - [`engine`] sequences one run and hands relations to the circular detector
//!
//! # Example
//!
//! ```no_run
//! use exportscope::analysis::analyze_project;
//! use exportscope::config::ProjectConfig;
//!
//! let config = ProjectConfig::with_defaults("./my-app");
//! let outcome = analyze_project(&config);
//! for result in outcome.unused_exports() {
//!     println!("{}: {:?}", result.file, result.not_used_exports);
//! }
//! ```

use std::path::PathBuf;

use thiserror::Error;

pub mod discovery;
pub mod engine;
pub mod names;
pub mod relations;
pub mod resolver;
pub mod scanner;
pub mod types;

// Re-export main types for convenience
pub use engine::{analyze_project, AnalysisOutcome};
pub use relations::{RelationBuilder, UsagePolicy};
pub use resolver::{ModuleResolver, ResolverConfig};
pub use scanner::{ScanOptions, ScanOutput, Scanner};
pub use types::{
    AnalysisResult, AtomicExport, AtomicImport, FileId, FileRelation, RawExport, RawImport,
    RunSummary,
};

/// Errors that can occur during analysis. None of them abort a run; they are
/// logged and reported as warnings.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Failed to read {}: {source}", path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to walk {}: {source}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Invalid glob pattern '{pattern}': {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("Invalid path alias '{key}': {reason}")]
    InvalidAlias { key: String, reason: String },
}
