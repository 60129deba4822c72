//! Project configuration for exportscope.
//!
//! Configuration is read fresh from the project root on every run:
//!
//! - **package.json** - `main` entry and the `"exportscope"` settings object
//! - **tsconfig.json** / **jsconfig.json** - include/exclude, `baseUrl`,
//!   `paths`, `moduleSuffixes`, `allowJs`, `outDir`, following `extends`
//!
//! Both are merged with command-line [`ConfigOverrides`] into a
//! [`ProjectConfig`]. Loading never fails: problems are kept as warnings.
//!
//! # Example
//!
//! ```no_run
//! use exportscope::config::{ConfigOverrides, ProjectConfig};
//!
//! let config = ProjectConfig::load("./my-app", &ConfigOverrides::default());
//! for warning in &config.warnings {
//!     eprintln!("warning: {warning}");
//! }
//! ```

use std::path::PathBuf;

pub mod package_json;
pub mod project;
pub mod tsconfig;
pub mod types;

// Re-export commonly used types for convenience
pub use project::{expand_exclude, expand_include, ConfigOverrides, ProjectConfig};
pub use types::{CompilerOptions, Extends, PackageJson, ToolSettings, TsConfig};

/// Errors that can occur while reading configuration files.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the file from disk.
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse JSON content.
    #[error("Failed to parse {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// An `extends` entry names a file that could not be found.
    #[error("Cannot resolve extended config '{0}'")]
    UnresolvedExtends(String),

    /// An `extends` chain leads back to a file already loaded.
    #[error("Circular extends chain at {}", .0.display())]
    CircularExtends(PathBuf),
}

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
