//! Loader for tsconfig.json / jsconfig.json, including `extends` chains.
//!
//! These files are JSON with comments and trailing commas. Comments are
//! removed with the scanner's string-safe stripper so values such as `"@/*"`
//! or `"http://x"` survive.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use path_clean::PathClean;
use regex::{Captures, Regex};
use tracing::{debug, warn};

use super::types::TsConfig;
use super::{ConfigError, ConfigResult};
use crate::analysis::scanner::strip_comments;
use crate::analysis::FileId;

static TRAILING_COMMA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",(\s*[}\]])").expect("trailing comma pattern is valid"));

/// Turns JSON-with-comments into plain JSON.
///
/// # Example
///
/// ```
/// use exportscope::config::tsconfig::strip_json_comments;
///
/// let jsonc = "{\n  // comment\n  \"paths\": {\"@/*\": [\"src/*\"],},\n}";
/// let json: serde_json::Value = serde_json::from_str(&strip_json_comments(jsonc)).unwrap();
/// assert_eq!(json["paths"]["@/*"][0], "src/*");
/// ```
pub fn strip_json_comments(content: &str) -> String {
    let cleaned = strip_comments(content, false);
    TRAILING_COMMA_RE
        .replace_all(&cleaned.text, |caps: &Captures<'_>| {
            let in_string = caps.get(0).is_some_and(|m| cleaned.in_string(m.start()));
            if in_string {
                caps[0].to_string()
            } else {
                caps[1].to_string()
            }
        })
        .into_owned()
}

/// Parses tsconfig content.
pub fn parse_str(content: &str) -> Result<TsConfig, serde_json::Error> {
    serde_json::from_str(&strip_json_comments(content))
}

/// Parses a tsconfig file without following `extends`.
pub fn parse_file(path: &Path) -> ConfigResult<TsConfig> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_str(&content).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// A tsconfig with its `extends` chain applied and every path-like value
/// made absolute relative to the file that declared it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedTsConfig {
    /// The config file that was loaded.
    pub config_file: PathBuf,
    /// Absolute include patterns.
    pub include: Option<Vec<String>>,
    /// Absolute exclude patterns.
    pub exclude: Option<Vec<String>>,
    /// Absolute file paths listed under `files`.
    pub files: Option<Vec<String>>,
    pub base_url: Option<PathBuf>,
    pub paths: Option<BTreeMap<String, Vec<String>>>,
    /// Directory of the config that declared `paths`.
    pub paths_base: Option<PathBuf>,
    pub module_suffixes: Option<Vec<String>>,
    pub allow_js: Option<bool>,
    pub out_dir: Option<PathBuf>,
}

impl ResolvedTsConfig {
    /// Directory containing the loaded config file.
    pub fn dir(&self) -> &Path {
        self.config_file.parent().unwrap_or_else(|| Path::new("."))
    }

    fn from_file(config: TsConfig, path: &Path) -> Self {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let absolute = |patterns: Vec<String>| -> Vec<String> {
            patterns
                .iter()
                .map(|pattern| FileId::new(dir.join(pattern)).as_str().to_string())
                .collect()
        };
        let options = config.compiler_options;
        let has_paths = options.paths.is_some();

        Self {
            config_file: path.to_path_buf(),
            include: config.include.map(absolute),
            exclude: config.exclude.map(absolute),
            files: config.files.map(absolute),
            base_url: options.base_url.map(|base| dir.join(base).clean()),
            paths: options.paths,
            paths_base: has_paths.then(|| dir.to_path_buf()),
            module_suffixes: options.module_suffixes,
            allow_js: options.allow_js,
            out_dir: options.out_dir.map(|out| dir.join(out).clean()),
        }
    }

    /// Overlays `child` on top of `self`: every value the child sets wins.
    fn merge(&mut self, child: ResolvedTsConfig) {
        self.config_file = child.config_file;
        if child.include.is_some() {
            self.include = child.include;
        }
        if child.exclude.is_some() {
            self.exclude = child.exclude;
        }
        if child.files.is_some() {
            self.files = child.files;
        }
        if child.base_url.is_some() {
            self.base_url = child.base_url;
        }
        if child.paths.is_some() {
            self.paths = child.paths;
            self.paths_base = child.paths_base;
        }
        if child.module_suffixes.is_some() {
            self.module_suffixes = child.module_suffixes;
        }
        if child.allow_js.is_some() {
            self.allow_js = child.allow_js;
        }
        if child.out_dir.is_some() {
            self.out_dir = child.out_dir;
        }
    }
}

/// Loads `path` and everything it extends.
///
/// A failure to load the file itself is an error. Failures further up the
/// `extends` chain are returned as warnings and the chain is cut there.
pub fn load(path: &Path, root: &Path) -> ConfigResult<(ResolvedTsConfig, Vec<ConfigError>)> {
    let mut visited = HashSet::new();
    let mut warnings = Vec::new();
    let resolved = load_chain(path, root, &mut visited, &mut warnings)?;
    Ok((resolved, warnings))
}

fn load_chain(
    path: &Path,
    root: &Path,
    visited: &mut HashSet<FileId>,
    warnings: &mut Vec<ConfigError>,
) -> ConfigResult<ResolvedTsConfig> {
    if !visited.insert(FileId::new(path)) {
        return Err(ConfigError::CircularExtends(path.to_path_buf()));
    }

    let config = parse_file(path)?;
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut resolved = ResolvedTsConfig::default();

    if let Some(extends) = &config.extends {
        for specifier in extends.paths() {
            let parent = resolve_extends(dir, root, specifier)
                .ok_or_else(|| ConfigError::UnresolvedExtends(specifier.to_string()))
                .and_then(|parent| load_chain(&parent, root, visited, warnings));
            match parent {
                Ok(parent) => {
                    debug!(config = %path.display(), parent = %parent.config_file.display(), "applied extends");
                    resolved.merge(parent);
                }
                Err(err) => {
                    warn!(%err, "ignoring extended config");
                    warnings.push(err);
                }
            }
        }
    }

    resolved.merge(ResolvedTsConfig::from_file(config, path));
    Ok(resolved)
}

/// Locates the file named by an `extends` entry.
fn resolve_extends(dir: &Path, root: &Path, specifier: &str) -> Option<PathBuf> {
    let candidates_for = |base: PathBuf| {
        [
            base.clone(),
            base.with_file_name(format!(
                "{}.json",
                base.file_name().map(|n| n.to_string_lossy()).unwrap_or_default()
            )),
            base.join("tsconfig.json"),
        ]
    };

    let is_relative = specifier.starts_with('.') || Path::new(specifier).is_absolute();
    let bases: Vec<PathBuf> = if is_relative {
        vec![dir.join(specifier)]
    } else {
        vec![
            dir.join("node_modules").join(specifier),
            root.join("node_modules").join(specifier),
        ]
    };

    bases
        .into_iter()
        .flat_map(candidates_for)
        .map(|candidate| candidate.clean())
        .find(|candidate| candidate.is_file())
}
