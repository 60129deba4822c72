//! exportscope - finds unused exports and circular imports in TypeScript and
//! JavaScript projects
//!
//! The crate scans sources with a comment- and string-aware lexical scanner,
//! resolves module specifiers against `tsconfig.json` settings, and reports
//! exports nothing imports plus import cycles between files that are
//! actually in use.
//!
//! ```no_run
//! use exportscope::analysis::analyze_project;
//! use exportscope::config::{ConfigOverrides, ProjectConfig};
//!
//! let config = ProjectConfig::load("./my-app", &ConfigOverrides::default());
//! let outcome = analyze_project(&config);
//! for result in outcome.unused_exports() {
//!     println!("{}: {:?}", result.file, result.not_used_exports);
//! }
//! ```

pub mod analysis;
pub mod config;
pub mod export;
pub mod graph;
pub mod logging;
pub mod session;
pub mod ui;
