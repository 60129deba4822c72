//! Lexical scanner for import and export declarations.
//!
//! The scanner does not build a syntax tree. It first produces a cleaned copy
//! of the source in which comments and template-literal bodies are blanked
//! out (ordinary quoted strings are kept, so module specifiers survive), then
//! runs a set of independent pattern matchers over that buffer. Each pattern
//! class lives in its own function so it can be tested in isolation.

use std::ops::Range;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::{trace, warn};

use super::types::{RawExport, RawImport};

/// Line comment that keeps the export on the following line out of the report.
pub const IGNORE_MARKER: &str = "exportscope-ignore-next-line";

/// A JavaScript identifier: a letter, `_` or `$`, then word characters or `$`.
pub(crate) const IDENT: &str = r"[\p{Alphabetic}_$][\w$]*";

static IMPORT_FROM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r#"\bimport\s+(?:type\s+)?((?:{IDENT}\s*,\s*)?(?:\{{[^}}]*\}}|\*\s*as\s+{IDENT}|{IDENT}))\s*from\s*["']([^"'\n]+)["']"#
    ))
    .expect("import-from pattern is valid")
});

static SIDE_EFFECT_IMPORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\bimport\s*["']([^"'\n]+)["']"#).expect("side-effect import pattern is valid")
});

static DYNAMIC_IMPORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\b(?:import|require)\s*\(\s*["']([^"'\n]+)["']\s*\)"#)
        .expect("dynamic import pattern is valid")
});

static DECLARATION_EXPORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"\bexport\s+(?:declare\s+)?(default\b|(?:async\s+)?function\b\s*\*?|(?:abstract\s+)?class\b|const\s+enum\b|const\b|let\b|var\b|enum\b|type\b|interface\b|namespace\b)\s*({IDENT})?"
    ))
    .expect("declaration export pattern is valid")
});

static DESTRUCTURED_EXPORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bexport\s+(?:const|let|var)\s*(\{[^}]*\}|\[[^\]]*\])\s*(?::[^=]*)?=")
        .expect("destructured export pattern is valid")
});

static EXPORT_LIST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\bexport\s+(?:type\s+)?(\{[^}]*\})(?:\s*from\s*["']([^"'\n]+)["'])?"#)
        .expect("export list pattern is valid")
});

static AGGREGATE_EXPORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r#"\bexport\s+(?:type\s+)?(\*(?:\s*as\s+{IDENT})?)\s*from\s*["']([^"'\n]+)["']"#
    ))
    .expect("aggregate export pattern is valid")
});

/// Source text with comments and template bodies blanked out.
#[derive(Debug, Clone, Default)]
pub struct CleanedSource {
    /// The cleaned buffer. Line structure matches the input.
    pub text: String,
    /// Byte ranges (in `text`) covered by ordinary quoted strings, quotes included.
    string_spans: Vec<Range<usize>>,
    /// Byte ranges of lines whose exports are suppressed by [`IGNORE_MARKER`].
    suppressed_lines: Vec<Range<usize>>,
}

impl CleanedSource {
    /// Returns true if `offset` falls inside a quoted string literal.
    pub fn in_string(&self, offset: usize) -> bool {
        contains_offset(&self.string_spans, offset)
    }

    /// End of the string literal containing `offset`, if any.
    fn string_end(&self, offset: usize) -> Option<usize> {
        let idx = self.string_spans.partition_point(|span| span.end <= offset);
        self.string_spans
            .get(idx)
            .filter(|span| span.contains(&offset))
            .map(|span| span.end)
    }

    /// Returns true if `offset` lies on a line preceded by the ignore marker.
    pub fn is_suppressed(&self, offset: usize) -> bool {
        contains_offset(&self.suppressed_lines, offset)
    }

    /// Returns true if a match starting at `offset` is real code: outside any
    /// string and not a property access such as `module.import(...)`.
    fn is_code_position(&self, offset: usize) -> bool {
        if self.in_string(offset) {
            return false;
        }
        !matches!(self.text[..offset].chars().next_back(), Some('.') | Some('$'))
    }
}

fn contains_offset(spans: &[Range<usize>], offset: usize) -> bool {
    // Spans are pushed in order and never overlap.
    let idx = spans.partition_point(|span| span.end <= offset);
    spans.get(idx).is_some_and(|span| span.contains(&offset))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StripState {
    Code,
    LineComment { start: usize },
    BlockComment,
    Quoted { quote: char, start: usize },
    Template,
}

struct Stripper {
    out: String,
    string_spans: Vec<Range<usize>>,
    suppressed_lines: Vec<Range<usize>>,
    open_suppression: Option<usize>,
}

impl Stripper {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            out: String::with_capacity(capacity),
            string_spans: Vec::new(),
            suppressed_lines: Vec::new(),
            open_suppression: None,
        }
    }

    fn newline(&mut self) {
        self.out.push('\n');
        if let Some(start) = self.open_suppression.take() {
            self.suppressed_lines.push(start..self.out.len());
        }
    }

    fn blank(&mut self, c: char) {
        if c == '\n' {
            self.newline();
        } else {
            self.out.push(' ');
        }
    }

    fn finish(mut self) -> CleanedSource {
        if let Some(start) = self.open_suppression.take() {
            self.suppressed_lines.push(start..self.out.len());
        }
        CleanedSource {
            text: self.out,
            string_spans: self.string_spans,
            suppressed_lines: self.suppressed_lines,
        }
    }
}

/// Blanks out `//` and `/* */` comments and backtick template bodies.
///
/// Comment-like text inside `"..."` or `'...'` strings is preserved, and the
/// spans of those strings are recorded so matchers can skip them. When
/// `honor_marker` is set, a line comment consisting of [`IGNORE_MARKER`]
/// marks the following line as suppressed.
///
/// # Example
///
/// ```
/// use exportscope::analysis::scanner::strip_comments;
///
/// let cleaned = strip_comments("const url = \"http://x\"; // note", false);
/// assert!(cleaned.text.contains("\"http://x\""));
/// assert!(!cleaned.text.contains("note"));
/// ```
pub fn strip_comments(source: &str, honor_marker: bool) -> CleanedSource {
    let chars: Vec<char> = source.chars().collect();
    let mut stripper = Stripper::with_capacity(source.len());
    let mut state = StripState::Code;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        match state {
            StripState::Code => match (c, next) {
                ('/', Some('/')) => {
                    stripper.out.push_str("  ");
                    state = StripState::LineComment { start: i + 2 };
                    i += 2;
                    continue;
                }
                ('/', Some('*')) => {
                    stripper.out.push_str("  ");
                    state = StripState::BlockComment;
                    i += 2;
                    continue;
                }
                ('"', _) | ('\'', _) => {
                    state = StripState::Quoted {
                        quote: c,
                        start: stripper.out.len(),
                    };
                    stripper.out.push(c);
                }
                ('`', _) => {
                    stripper.out.push('`');
                    state = StripState::Template;
                }
                ('\n', _) => stripper.newline(),
                _ => stripper.out.push(c),
            },
            StripState::LineComment { start } => {
                if c == '\n' {
                    let body: String = chars[start..i].iter().collect();
                    stripper.newline();
                    if honor_marker && body.trim() == IGNORE_MARKER {
                        stripper.open_suppression = Some(stripper.out.len());
                    }
                    state = StripState::Code;
                } else {
                    stripper.out.push(' ');
                }
            }
            StripState::BlockComment => {
                if c == '*' && next == Some('/') {
                    stripper.out.push_str("  ");
                    state = StripState::Code;
                    i += 2;
                    continue;
                }
                stripper.blank(c);
            }
            StripState::Quoted { quote, start } => {
                if c == '\\' {
                    stripper.out.push(c);
                    if let Some(escaped) = next {
                        if escaped == '\n' {
                            stripper.newline();
                        } else {
                            stripper.out.push(escaped);
                        }
                        i += 2;
                        continue;
                    }
                } else if c == quote {
                    stripper.out.push(c);
                    stripper.string_spans.push(start..stripper.out.len());
                    state = StripState::Code;
                } else if c == '\n' {
                    // Unterminated string: stop at end of line.
                    stripper.string_spans.push(start..stripper.out.len());
                    stripper.newline();
                    state = StripState::Code;
                } else {
                    stripper.out.push(c);
                }
            }
            StripState::Template => {
                if c == '\\' {
                    stripper.out.push(' ');
                    if let Some(escaped) = next {
                        stripper.blank(escaped);
                        i += 2;
                        continue;
                    }
                } else if c == '`' {
                    stripper.out.push('`');
                    state = StripState::Code;
                } else {
                    stripper.blank(c);
                }
            }
        }
        i += 1;
    }

    if let StripState::Quoted { start, .. } = state {
        stripper.string_spans.push(start..stripper.out.len());
    }
    stripper.finish()
}

/// Options controlling the scanner.
#[derive(Debug, Clone, Copy)]
pub struct ScanOptions {
    /// Honor the [`IGNORE_MARKER`] escape hatch.
    pub honor_ignore_marker: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            honor_ignore_marker: true,
        }
    }
}

/// Raw declarations found in one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOutput {
    pub imports: Vec<RawImport>,
    pub exports: Vec<RawExport>,
    /// Number of non-advancing matches that were skipped.
    pub anomalies: usize,
}

/// Extracts raw imports and exports from source text.
#[derive(Debug, Clone, Copy, Default)]
pub struct Scanner {
    options: ScanOptions,
}

impl Scanner {
    pub fn new(options: ScanOptions) -> Self {
        Self { options }
    }

    /// Scans a file's text. Declarations are returned in source order.
    pub fn scan(&self, source: &str) -> ScanOutput {
        let cleaned = strip_comments(source, self.options.honor_ignore_marker);
        let mut anomalies = 0;

        let mut imports: Vec<(usize, RawImport)> = Vec::new();
        imports.extend(scan_import_from(&cleaned, &mut anomalies));
        imports.extend(scan_side_effect_imports(&cleaned, &mut anomalies));
        imports.extend(scan_dynamic_imports(&cleaned, &mut anomalies));

        let mut exports: Vec<(usize, RawExport)> = Vec::new();
        exports.extend(scan_declaration_exports(&cleaned, &mut anomalies));
        exports.extend(scan_destructured_exports(&cleaned, &mut anomalies));
        exports.extend(scan_export_lists(&cleaned, &mut anomalies));
        exports.extend(scan_aggregate_exports(&cleaned, &mut anomalies));

        // A suppressed re-export still imports from its source module.
        exports.retain(|(offset, export)| {
            if !cleaned.is_suppressed(*offset) {
                return true;
            }
            trace!(offset, name = %export.name_expression, "export suppressed by marker");
            if let Some(from) = &export.from_path {
                imports.push((*offset, RawImport::new(export.name_expression.clone(), from)));
            }
            false
        });

        imports.sort_by_key(|(offset, _)| *offset);
        exports.sort_by_key(|(offset, _)| *offset);

        ScanOutput {
            imports: imports.into_iter().map(|(_, import)| import).collect(),
            exports: exports.into_iter().map(|(_, export)| export).collect(),
            anomalies,
        }
    }
}

/// Runs `re` over the cleaned text, calling `on_match` for every match that
/// starts in code. Scanning resumes after a string literal that held a
/// rejected match. A match that does not advance is logged and counted, and
/// the scan position is moved forward by one character.
fn scan_pattern<'t>(
    re: &Regex,
    cleaned: &'t CleanedSource,
    anomalies: &mut usize,
    mut on_match: impl FnMut(usize, &Captures<'t>),
) {
    let text = cleaned.text.as_str();
    let mut pos = 0;

    while pos <= text.len() {
        let Some(caps) = re.captures_at(text, pos) else {
            break;
        };
        let Some(whole) = caps.get(0) else {
            break;
        };

        if whole.start() == whole.end() {
            warn!(
                offset = whole.start(),
                pattern = re.as_str(),
                "non-advancing match, skipping one character"
            );
            *anomalies += 1;
            pos = next_char_boundary(text, whole.start());
            continue;
        }

        if cleaned.is_code_position(whole.start()) {
            on_match(whole.start(), &caps);
            pos = whole.end();
        } else {
            // A rejected match may run past the string into real code.
            pos = cleaned
                .string_end(whole.start())
                .unwrap_or_else(|| next_char_boundary(text, whole.start()));
        }
    }
}

fn next_char_boundary(text: &str, offset: usize) -> usize {
    text[offset..]
        .chars()
        .next()
        .map_or(offset + 1, |c| offset + c.len_utf8())
}

fn capture(caps: &Captures<'_>, group: usize) -> Option<String> {
    caps.get(group).map(|m| m.as_str().trim().to_string())
}

/// `import <names> from "<path>"`, including `import type`.
pub fn scan_import_from(cleaned: &CleanedSource, anomalies: &mut usize) -> Vec<(usize, RawImport)> {
    let mut found = Vec::new();
    scan_pattern(&IMPORT_FROM_RE, cleaned, anomalies, |offset, caps| {
        if let (Some(names), Some(path)) = (capture(caps, 1), capture(caps, 2)) {
            found.push((offset, RawImport::new(names, path)));
        }
    });
    found
}

/// `import "<path>"` with no bindings.
pub fn scan_side_effect_imports(
    cleaned: &CleanedSource,
    anomalies: &mut usize,
) -> Vec<(usize, RawImport)> {
    let mut found = Vec::new();
    scan_pattern(&SIDE_EFFECT_IMPORT_RE, cleaned, anomalies, |offset, caps| {
        if let Some(path) = capture(caps, 1) {
            found.push((offset, RawImport::new("", path)));
        }
    });
    found
}

/// `import("<path>")` and `require("<path>")`, always a wildcard import.
pub fn scan_dynamic_imports(
    cleaned: &CleanedSource,
    anomalies: &mut usize,
) -> Vec<(usize, RawImport)> {
    let mut found = Vec::new();
    scan_pattern(&DYNAMIC_IMPORT_RE, cleaned, anomalies, |offset, caps| {
        if let Some(path) = capture(caps, 1) {
            found.push((offset, RawImport::new("*", path)));
        }
    });
    found
}

/// `export (default|class|const|let|var|function|function*|enum|type|interface) <name>`.
pub fn scan_declaration_exports(
    cleaned: &CleanedSource,
    anomalies: &mut usize,
) -> Vec<(usize, RawExport)> {
    let mut found = Vec::new();
    scan_pattern(&DECLARATION_EXPORT_RE, cleaned, anomalies, |offset, caps| {
        let keyword = caps.get(1).map_or("", |m| m.as_str());
        if keyword == "default" {
            found.push((offset, RawExport::new("default")));
        } else if let Some(name) = capture(caps, 2) {
            found.push((offset, RawExport::new(name)));
        }
    });
    found
}

/// `export const { a, b: renamed } = ...` and the array form `export const [a, b] = ...`.
pub fn scan_destructured_exports(
    cleaned: &CleanedSource,
    anomalies: &mut usize,
) -> Vec<(usize, RawExport)> {
    let mut found = Vec::new();
    scan_pattern(&DESTRUCTURED_EXPORT_RE, cleaned, anomalies, |offset, caps| {
        if let Some(pattern) = capture(caps, 1) {
            let group = match pattern.strip_prefix('[').and_then(|p| p.strip_suffix(']')) {
                Some(inner) => format!("{{{inner}}}"),
                None => pattern,
            };
            found.push((offset, RawExport::new(group)));
        }
    });
    found
}

/// `export { a, b as c }`, `export type { a }` and their `from "<path>"` forms.
pub fn scan_export_lists(cleaned: &CleanedSource, anomalies: &mut usize) -> Vec<(usize, RawExport)> {
    let mut found = Vec::new();
    scan_pattern(&EXPORT_LIST_RE, cleaned, anomalies, |offset, caps| {
        if let Some(names) = capture(caps, 1) {
            let export = match capture(caps, 2) {
                Some(path) => RawExport::reexport(names, path),
                None => RawExport::new(names),
            };
            found.push((offset, export));
        }
    });
    found
}

/// `export * from "<path>"` and `export * as ns from "<path>"`.
pub fn scan_aggregate_exports(
    cleaned: &CleanedSource,
    anomalies: &mut usize,
) -> Vec<(usize, RawExport)> {
    let mut found = Vec::new();
    scan_pattern(&AGGREGATE_EXPORT_RE, cleaned, anomalies, |offset, caps| {
        if let (Some(names), Some(path)) = (capture(caps, 1), capture(caps, 2)) {
            found.push((offset, RawExport::reexport(names, path)));
        }
    });
    found
}
