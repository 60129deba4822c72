//! Parser for npm package.json files.

use std::fs;
use std::path::Path;

use super::types::PackageJson;
use super::{ConfigError, ConfigResult};

/// Parses a package.json file from a file path.
pub fn parse_file(path: &Path) -> ConfigResult<PackageJson> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_str(&content).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Parses a package.json from a string.
///
/// # Example
///
/// ```
/// use exportscope::config::package_json::parse_str;
///
/// let json = r#"{"name": "my-app", "version": "1.0.0"}"#;
/// let pkg = parse_str(json).unwrap();
/// assert_eq!(pkg.name, Some("my-app".to_string()));
/// ```
pub fn parse_str(content: &str) -> Result<PackageJson, serde_json::Error> {
    serde_json::from_str(content)
}
