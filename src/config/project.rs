//! Merged project configuration consumed by the analysis engine.

use std::path::{Path, PathBuf};

use path_clean::PathClean;
use tracing::{debug, warn};

use super::types::{PackageJson, ToolSettings};
use super::{package_json, tsconfig, ConfigError};
use crate::analysis::resolver::ResolverConfig;
use crate::analysis::FileId;

const NODE_MODULES_EXCLUDE: &str = "**/node_modules/**";

/// Overrides taken from the command line. They are applied last.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub allow_js: bool,
    pub no_circular: bool,
    pub main_not_used: bool,
    pub ignore: Vec<String>,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

/// Everything one analysis run needs to know about a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectConfig {
    /// Absolute project root.
    pub root: PathBuf,
    /// Include globs relative to `root`.
    pub include: Vec<String>,
    /// Exclude globs relative to `root`.
    pub exclude: Vec<String>,
    pub resolver: ResolverConfig,
    /// Absolute path of the package.json `main` entry, as written.
    pub main_entry: Option<PathBuf>,
    pub treat_main_exports_as_used: bool,
    /// Globs (relative to `root`) of files whose unused exports are hidden.
    pub ignore: Vec<String>,
    pub detect_circular_imports: bool,
    pub honor_ignore_marker: bool,
    /// Non-fatal problems met while loading.
    pub warnings: Vec<String>,
}

impl ProjectConfig {
    /// Default configuration for `root`, without reading any file.
    ///
    /// # Example
    ///
    /// ```
    /// use exportscope::config::ProjectConfig;
    ///
    /// let config = ProjectConfig::with_defaults("/work/app");
    /// assert_eq!(config.include, vec!["**/*.{ts,tsx}"]);
    /// assert!(config.exclude.contains(&"**/node_modules/**".to_string()));
    /// assert!(config.detect_circular_imports);
    /// ```
    pub fn with_defaults(root: impl AsRef<Path>) -> Self {
        let root = absolute_root(root.as_ref());
        Self {
            include: vec![expand_include("**/*", false)],
            exclude: vec![NODE_MODULES_EXCLUDE.to_string()],
            resolver: ResolverConfig {
                base_directory: root.clone(),
                ..Default::default()
            },
            main_entry: None,
            treat_main_exports_as_used: true,
            ignore: Vec::new(),
            detect_circular_imports: true,
            honor_ignore_marker: true,
            warnings: Vec::new(),
            root,
        }
    }

    /// Reads package.json and tsconfig.json (or jsconfig.json) from `root`
    /// and applies `overrides`. Never fails; problems become warnings.
    pub fn load(root: impl AsRef<Path>, overrides: &ConfigOverrides) -> Self {
        let mut config = Self::with_defaults(root);
        let root = config.root.clone();

        let package = read_package_json(&root, &mut config.warnings);
        let settings = package
            .as_ref()
            .and_then(|pkg| pkg.exportscope.clone())
            .unwrap_or_default();

        let mut allow_js = settings.allow_js;
        let mut include: Option<Vec<String>> = None;
        let mut files: Vec<String> = Vec::new();
        let mut exclude: Option<Vec<String>> = None;
        let mut out_dir: Option<PathBuf> = None;

        if let Some((resolved, implies_js)) = read_tsconfig(&root, &mut config.warnings) {
            config.resolver.base_directory = resolved
                .base_url
                .clone()
                .or_else(|| resolved.paths_base.clone())
                .unwrap_or_else(|| resolved.dir().to_path_buf());
            allow_js = allow_js.or(resolved.allow_js).or(implies_js.then_some(true));
            include = resolved.include.map(|p| relative_patterns(&p, &root, &mut config.warnings));
            exclude = resolved.exclude.map(|p| relative_patterns(&p, &root, &mut config.warnings));
            files = resolved
                .files
                .map(|p| relative_patterns(&p, &root, &mut config.warnings))
                .unwrap_or_default();
            out_dir = resolved.out_dir;
            config.resolver.path_aliases = resolved.paths.unwrap_or_default().into_iter().collect();
            config.resolver.module_suffixes = resolved.module_suffixes.unwrap_or_default();
        }

        let allow_js = overrides.allow_js || allow_js.unwrap_or(false);
        config.resolver.allow_js = allow_js;

        config.include = pick(&overrides.include, settings.include.clone(), include)
            .map(|patterns| {
                patterns
                    .iter()
                    .map(|pattern| expand_include(pattern, allow_js))
                    .collect()
            })
            .unwrap_or_else(|| {
                // `files` alone restricts the project to those files.
                if files.is_empty() {
                    vec![expand_include("**/*", allow_js)]
                } else {
                    Vec::new()
                }
            });
        config.include.extend(files);

        let mut excludes: Vec<String> = pick(&overrides.exclude, settings.exclude.clone(), exclude)
            .unwrap_or_default()
            .iter()
            .map(|pattern| expand_exclude(pattern.as_str()))
            .collect();
        excludes.push(NODE_MODULES_EXCLUDE.to_string());
        if let Some(out_dir) = out_dir {
            if let Some(relative) = relative_to_root(&FileId::new(&out_dir), &root) {
                excludes.push(format!("{relative}/**"));
            }
        }
        excludes.dedup();
        config.exclude = excludes;

        apply_settings(&mut config, &settings, package.as_ref(), &root);
        apply_overrides(&mut config, overrides);

        debug!(
            root = %config.root.display(),
            include = ?config.include,
            exclude = ?config.exclude,
            aliases = config.resolver.path_aliases.len(),
            "loaded project configuration"
        );
        config
    }
}

pub(crate) fn absolute_root(root: &Path) -> PathBuf {
    if root.is_absolute() {
        return root.to_path_buf().clean();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(root))
        .unwrap_or_else(|_| root.to_path_buf())
        .clean()
}

fn read_package_json(root: &Path, warnings: &mut Vec<String>) -> Option<PackageJson> {
    let path = root.join("package.json");
    if !path.is_file() {
        return None;
    }
    match package_json::parse_file(&path) {
        Ok(pkg) => Some(pkg),
        Err(err) => {
            record(warnings, err);
            None
        }
    }
}

/// Loads tsconfig.json, falling back to jsconfig.json. The flag is true when
/// the jsconfig was used, which implies JavaScript sources.
fn read_tsconfig(
    root: &Path,
    warnings: &mut Vec<String>,
) -> Option<(tsconfig::ResolvedTsConfig, bool)> {
    let (path, is_jsconfig) = [("tsconfig.json", false), ("jsconfig.json", true)]
        .into_iter()
        .map(|(name, is_js)| (root.join(name), is_js))
        .find(|(path, _)| path.is_file())?;

    match tsconfig::load(&path, root) {
        Ok((resolved, chain_warnings)) => {
            for err in chain_warnings {
                record(warnings, err);
            }
            Some((resolved, is_jsconfig))
        }
        Err(err) => {
            record(warnings, err);
            None
        }
    }
}

fn record(warnings: &mut Vec<String>, err: ConfigError) {
    warn!(%err, "configuration problem");
    warnings.push(err.to_string());
}

/// First non-empty source wins: command line, tool settings, tsconfig.
fn pick(
    overrides: &[String],
    settings: Option<Vec<String>>,
    tsconfig: Option<Vec<String>>,
) -> Option<Vec<String>> {
    if !overrides.is_empty() {
        return Some(overrides.to_vec());
    }
    settings.or(tsconfig)
}

fn relative_to_root(pattern: &FileId, root: &Path) -> Option<String> {
    let root = FileId::new(root);
    if pattern == &root {
        return Some(String::new());
    }
    pattern
        .as_str()
        .strip_prefix(&format!("{}/", root.as_str().trim_end_matches('/')))
        .map(str::to_string)
}

/// Rebases absolute tsconfig patterns onto the project root. Patterns outside
/// the root cannot match a discovered file and are dropped with a warning.
fn relative_patterns(patterns: &[String], root: &Path, warnings: &mut Vec<String>) -> Vec<String> {
    patterns
        .iter()
        .filter_map(|pattern| {
            let relative = relative_to_root(&FileId::new(pattern), root);
            if relative.is_none() {
                warnings.push(format!("Pattern outside project root ignored: {pattern}"));
            }
            relative.map(|r| if r.is_empty() { "**/*".to_string() } else { r })
        })
        .collect()
}

fn extension_glob(allow_js: bool) -> &'static str {
    if allow_js {
        "{ts,tsx,js,jsx}"
    } else {
        "{ts,tsx}"
    }
}

/// Expands a tsconfig-style include entry into a file glob: a directory
/// becomes `dir/**/*.{ext}` and a wildcard tail gets the extension set.
///
/// # Example
///
/// ```
/// use exportscope::config::expand_include;
///
/// assert_eq!(expand_include("src", false), "src/**/*.{ts,tsx}");
/// assert_eq!(expand_include("src/**/*", true), "src/**/*.{ts,tsx,js,jsx}");
/// assert_eq!(expand_include("src/*.ts", false), "src/*.ts");
/// ```
pub fn expand_include(pattern: &str, allow_js: bool) -> String {
    let pattern = pattern.trim_end_matches('/');
    let pattern = pattern.strip_prefix("./").unwrap_or(pattern);
    let last = pattern.rsplit('/').next().unwrap_or(pattern);
    let extensions = extension_glob(allow_js);

    if last.contains('.') {
        pattern.to_string()
    } else if last.contains('*') {
        format!("{pattern}.{extensions}")
    } else {
        format!("{pattern}/**/*.{extensions}")
    }
}

/// Expands a tsconfig-style exclude entry: a plain directory name excludes
/// everything below it.
pub fn expand_exclude(pattern: &str) -> String {
    let pattern = pattern.trim_end_matches('/');
    let pattern = pattern.strip_prefix("./").unwrap_or(pattern);
    let last = pattern.rsplit('/').next().unwrap_or(pattern);
    if last.contains('.') || last.contains('*') {
        pattern.to_string()
    } else {
        format!("{pattern}/**")
    }
}

fn apply_settings(
    config: &mut ProjectConfig,
    settings: &ToolSettings,
    package: Option<&PackageJson>,
    root: &Path,
) {
    config.main_entry = package
        .and_then(|pkg| pkg.main.as_deref())
        .map(|main| root.join(main).clean());
    if let Some(value) = settings.main_exports_used {
        config.treat_main_exports_as_used = value;
    }
    if let Some(value) = settings.detect_circular_imports {
        config.detect_circular_imports = value;
    }
    if let Some(value) = settings.ignore_marker {
        config.honor_ignore_marker = value;
    }
    if let Some(ignore) = &settings.ignore {
        config.ignore = ignore.clone();
    }
}

fn apply_overrides(config: &mut ProjectConfig, overrides: &ConfigOverrides) {
    if overrides.no_circular {
        config.detect_circular_imports = false;
    }
    if overrides.main_not_used {
        config.treat_main_exports_as_used = false;
    }
    config.ignore.extend(overrides.ignore.iter().cloned());
}
