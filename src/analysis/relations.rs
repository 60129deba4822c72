//! Relation builder: aggregates atomic imports and exports per file and
//! decides which exports are used.

use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use super::types::{AtomicExport, AtomicImport, FileId, FileRelation};

/// Usage overrides applied when deciding whether an export is reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsagePolicy {
    pub main_entry_file: Option<FileId>,
    pub treat_main_exports_as_used: bool,
    pub ignored_files: HashSet<FileId>,
}

impl UsagePolicy {
    /// Returns true if unused exports of `file` must not be reported.
    pub fn suppresses(&self, file: &FileId) -> bool {
        let is_main = self.treat_main_exports_as_used && self.main_entry_file.as_ref() == Some(file);
        is_main || self.ignored_files.contains(file)
    }
}

/// Collects the atomic imports and exports of one run.
#[derive(Debug, Default)]
pub struct RelationBuilder {
    files: Vec<FileId>,
    imports: Vec<AtomicImport>,
    side_effects: Vec<(FileId, FileId)>,
    exports: Vec<AtomicExport>,
}

impl RelationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a file so it gets a relation even without imports or exports.
    pub fn add_file(&mut self, file: FileId) {
        self.files.push(file);
    }

    pub fn add_import(&mut self, import: AtomicImport) {
        self.imports.push(import);
    }

    /// Records an `import "x"` edge that binds no symbols.
    pub fn add_side_effect_import(&mut self, in_file: FileId, from_file: FileId) {
        self.side_effects.push((in_file, from_file));
    }

    pub fn add_export(&mut self, export: AtomicExport) {
        self.exports.push(export);
    }

    pub fn import_count(&self) -> usize {
        self.imports.len()
    }

    /// Builds one relation per file, sorted by file.
    ///
    /// An export is used when another file imports it by name or imports `*`
    /// from its file. A file importing from itself does not count.
    pub fn build(self, policy: &UsagePolicy) -> Vec<FileRelation> {
        let mut named_usage: HashSet<(&FileId, &str)> = HashSet::new();
        let mut wildcard_usage: HashSet<&FileId> = HashSet::new();
        for import in &self.imports {
            if import.in_file == import.from_file {
                continue;
            }
            if import.is_wildcard() {
                wildcard_usage.insert(&import.from_file);
            } else {
                named_usage.insert((&import.from_file, import.symbol_name.as_str()));
            }
        }

        let mut relations: BTreeMap<FileId, FileRelation> = BTreeMap::new();
        for file in &self.files {
            relations
                .entry(file.clone())
                .or_insert_with(|| FileRelation::new(file.clone()));
        }

        for import in &self.imports {
            let symbols = relation_for(&mut relations, &import.in_file)
                .imports
                .entry(import.from_file.clone())
                .or_default();
            push_unique(symbols, &import.symbol_name);
        }
        for (in_file, from_file) in &self.side_effects {
            relation_for(&mut relations, in_file)
                .imports
                .entry(from_file.clone())
                .or_default();
        }

        for export in &self.exports {
            let file = &export.in_file;
            let used = wildcard_usage.contains(file)
                || named_usage.contains(&(file, export.symbol_name.as_str()));
            let relation = relation_for(&mut relations, file);
            let list = if used {
                &mut relation.exports_used
            } else if policy.suppresses(file) {
                &mut relation.exports_suppressed
            } else {
                &mut relation.exports_not_used
            };
            push_unique(list, &export.symbol_name);
        }

        debug!(
            files = relations.len(),
            imports = self.imports.len(),
            exports = self.exports.len(),
            "built file relations"
        );
        relations.into_values().collect()
    }
}

fn relation_for<'a>(
    relations: &'a mut BTreeMap<FileId, FileRelation>,
    file: &FileId,
) -> &'a mut FileRelation {
    relations
        .entry(file.clone())
        .or_insert_with(|| FileRelation::new(file.clone()))
}

fn push_unique(list: &mut Vec<String>, name: &str) {
    if !list.iter().any(|existing| existing == name) {
        list.push(name.to_string());
    }
}
