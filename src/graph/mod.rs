//! Import graph analysis.
//!
//! [`CircularDetector`] prunes the file relation graph down to files that
//! matter to a consumer and reports the import cycles left among them.
//!
//! # Example
//!
//! ```rust
//! use exportscope::analysis::{FileId, FileRelation};
//! use exportscope::graph::CircularDetector;
//!
//! let mut a = FileRelation::new(FileId::new("/p/a.ts"));
//! a.imports.insert(FileId::new("/p/b.ts"), vec!["b".to_string()]);
//! a.exports_used.push("a".to_string());
//! let mut b = FileRelation::new(FileId::new("/p/b.ts"));
//! b.imports.insert(FileId::new("/p/a.ts"), vec!["a".to_string()]);
//! b.exports_used.push("b".to_string());
//!
//! let detection = CircularDetector::new(true).detect(&[a, b], Vec::new());
//! assert_eq!(detection.cycle_count(), 1);
//! ```

mod circular;

pub use circular::{prune_relations, CircularDetector, CycleInfo, Detection, ImportGraph};
