//! Module resolver: maps an import specifier to a discovered source file.
//!
//! Strategies are tried in order and the first hit wins: path aliases,
//! importer-relative, then base directory. Each strategy produces a candidate
//! path which is probed for an exact file, `candidate+suffix.{ext}` and
//! `candidate+suffix/index.{ext}`.
//!
//! Probing is done against the set of discovered files rather than the file
//! system. A target outside that set would be dropped anyway, and this keeps
//! resolution free of I/O.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{debug, trace};

use super::types::FileId;
use super::AnalysisError;

const TYPED_EXTENSIONS: &[&str] = &["ts", "tsx"];
const ALL_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx"];
const SCRIPT_EXTENSIONS: &[&str] = &[".js", ".jsx", ".mjs", ".cjs"];

/// Module resolution settings taken from project configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Directory alias targets and bare specifiers are resolved against.
    pub base_directory: PathBuf,
    /// Alias patterns (`@app/*`) with their target templates (`src/app/*`).
    pub path_aliases: Vec<(String, Vec<String>)>,
    /// Ordered module suffixes. Empty means `[""]`.
    pub module_suffixes: Vec<String>,
    /// Probe `.js`/`.jsx` in addition to `.ts`/`.tsx`.
    pub allow_js: bool,
}

#[derive(Debug, Clone)]
struct AliasRule {
    key: String,
    pattern: Regex,
    targets: Vec<String>,
}

impl AliasRule {
    fn compile(key: &str, targets: &[String]) -> Result<Self, AnalysisError> {
        let stars = key.matches('*').count();
        if stars > 1 {
            return Err(AnalysisError::InvalidAlias {
                key: key.to_string(),
                reason: "more than one '*' in pattern".to_string(),
            });
        }
        let escaped: Vec<String> = key.split('*').map(regex::escape).collect();
        let pattern = Regex::new(&format!("^{}$", escaped.join("(.*)"))).map_err(|err| {
            AnalysisError::InvalidAlias {
                key: key.to_string(),
                reason: err.to_string(),
            }
        })?;
        Ok(Self {
            key: key.to_string(),
            pattern,
            targets: targets.to_vec(),
        })
    }

    fn is_exact(&self) -> bool {
        !self.key.contains('*')
    }

    fn prefix_len(&self) -> usize {
        self.key.split('*').next().map_or(0, str::len)
    }

    /// Returns the substituted targets if `specifier` matches this alias.
    fn expand(&self, specifier: &str) -> Option<Vec<String>> {
        let caps = self.pattern.captures(specifier)?;
        let captured = caps.get(1).map_or("", |m| m.as_str());
        Some(
            self.targets
                .iter()
                .map(|target| target.replacen('*', captured, 1))
                .collect(),
        )
    }
}

/// Resolves import specifiers to [`FileId`]s of discovered files.
#[derive(Debug)]
pub struct ModuleResolver {
    base_directory: PathBuf,
    aliases: Vec<AliasRule>,
    suffixes: Vec<String>,
    extensions: &'static [&'static str],
    files: HashSet<FileId>,
    warnings: Vec<AnalysisError>,
}

impl ModuleResolver {
    /// Builds a resolver over the given discovered files. Invalid alias
    /// entries are skipped and reported through [`ModuleResolver::warnings`].
    pub fn new(config: &ResolverConfig, files: impl IntoIterator<Item = FileId>) -> Self {
        let mut aliases = Vec::new();
        let mut warnings = Vec::new();
        for (key, targets) in &config.path_aliases {
            match AliasRule::compile(key, targets) {
                Ok(rule) => aliases.push(rule),
                Err(err) => warnings.push(err),
            }
        }
        // Exact keys first, then the most specific prefix.
        aliases.sort_by(|a, b| {
            b.is_exact()
                .cmp(&a.is_exact())
                .then_with(|| b.prefix_len().cmp(&a.prefix_len()))
        });

        let suffixes = if config.module_suffixes.is_empty() {
            vec![String::new()]
        } else {
            config.module_suffixes.clone()
        };

        Self {
            base_directory: config.base_directory.clone(),
            aliases,
            suffixes,
            extensions: if config.allow_js {
                ALL_EXTENSIONS
            } else {
                TYPED_EXTENSIONS
            },
            files: files.into_iter().collect(),
            warnings,
        }
    }

    /// Problems found while compiling the alias table.
    pub fn warnings(&self) -> &[AnalysisError] {
        &self.warnings
    }

    /// Resolves `specifier` as written in `importer`.
    pub fn resolve(&self, importer: &FileId, specifier: &str) -> Option<FileId> {
        let specifier = specifier.trim();
        if specifier.is_empty() {
            return None;
        }

        if let Some(found) = self.resolve_alias(specifier) {
            trace!(specifier, resolved = %found, "resolved through alias");
            return Some(found);
        }
        if let Some(found) = self.probe(&importer.dir().join(specifier)) {
            return Some(found);
        }
        let found = self.probe(&self.base_directory.join(specifier));
        if found.is_none() {
            trace!(specifier, importer = %importer, "unresolved import");
        }
        found
    }

    /// Probes a path given directly, e.g. the `main` entry of a manifest.
    pub fn resolve_path(&self, path: &Path) -> Option<FileId> {
        self.probe(path)
    }

    fn resolve_alias(&self, specifier: &str) -> Option<FileId> {
        let rule = self.aliases.iter().find(|rule| rule.pattern.is_match(specifier))?;
        let targets = rule.expand(specifier)?;
        debug!(alias = %rule.key, specifier, "alias matched");
        targets
            .iter()
            .find_map(|target| self.probe(&self.base_directory.join(target)))
    }

    fn probe(&self, candidate: &Path) -> Option<FileId> {
        let candidate = FileId::new(candidate);
        self.probe_candidate(candidate.as_str()).or_else(|| {
            // `./util.js` written for ESM resolution of `./util.ts`.
            let stripped = SCRIPT_EXTENSIONS
                .iter()
                .find_map(|ext| candidate.as_str().strip_suffix(ext))?;
            self.probe_candidate(stripped)
        })
    }

    fn probe_candidate(&self, base: &str) -> Option<FileId> {
        let exact = FileId::new(base);
        if self.files.contains(&exact) {
            return Some(exact);
        }

        for suffix in &self.suffixes {
            let stem = format!("{base}{suffix}");
            let hit = self
                .extensions
                .iter()
                .map(|ext| FileId::new(format!("{stem}.{ext}")))
                .chain(
                    self.extensions
                        .iter()
                        .map(|ext| FileId::new(format!("{stem}/index.{ext}"))),
                )
                .find(|id| self.files.contains(id));
            if hit.is_some() {
                return hit;
            }
        }
        None
    }
}
