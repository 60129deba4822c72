//! Name expander: turns a raw name expression into atomic symbol names.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

use super::scanner::IDENT;
use super::types::{DEFAULT_SYMBOL, WILDCARD_SYMBOL};

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!("^{IDENT}$")).expect("identifier pattern is valid"));

/// Direction of a name expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Import,
    Export,
}

/// Expands a raw name expression into the symbol names it binds.
///
/// - `*` always yields `["*"]`.
/// - `* as ns` yields `*` for imports and `ns` for exports.
/// - A bare identifier is the default binding for imports and the identifier
///   itself for exports.
/// - A brace group is split on commas; `type` qualifiers are dropped and the
///   local side of `as`/`:` renames is kept for exports, the source side for
///   imports.
/// - `D, { a }` and `D, * as ns` combine the default binding with the rest.
///
/// # Example
///
/// ```
/// use exportscope::analysis::names::{expand, SymbolKind};
///
/// assert_eq!(expand("{ a, b as c }", SymbolKind::Import), vec!["a", "b"]);
/// assert_eq!(expand("{ a, b as c }", SymbolKind::Export), vec!["a", "c"]);
/// assert_eq!(expand("React", SymbolKind::Import), vec!["default"]);
/// ```
pub fn expand(expression: &str, kind: SymbolKind) -> Vec<String> {
    let expression = expression.trim();
    if expression.is_empty() {
        return Vec::new();
    }

    if let Some((head, rest)) = split_default_head(expression) {
        let mut names = expand(head, kind);
        names.extend(expand(rest, kind));
        return names;
    }

    if expression == WILDCARD_SYMBOL {
        return vec![WILDCARD_SYMBOL.to_string()];
    }

    if let Some(alias) = namespace_alias(expression) {
        return match kind {
            SymbolKind::Import => vec![WILDCARD_SYMBOL.to_string()],
            SymbolKind::Export => vec![alias.to_string()],
        };
    }

    if let Some(inner) = expression
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
    {
        return inner
            .split(',')
            .filter_map(|entry| expand_entry(entry, kind))
            .collect();
    }

    if is_identifier(expression) {
        return match kind {
            SymbolKind::Import => vec![DEFAULT_SYMBOL.to_string()],
            SymbolKind::Export => vec![expression.to_string()],
        };
    }

    trace!(expression, "unrecognized name expression");
    Vec::new()
}

/// Splits `Default, { ... }` / `Default, * as ns` into its two halves.
fn split_default_head(expression: &str) -> Option<(&str, &str)> {
    if expression.starts_with('{') || expression.starts_with('*') {
        return None;
    }
    let (head, rest) = expression.split_once(',')?;
    let head = head.trim();
    let rest = rest.trim();
    (is_identifier(head) && (rest.starts_with('{') || rest.starts_with('*'))).then_some((head, rest))
}

/// Returns `ns` for `* as ns`.
fn namespace_alias(expression: &str) -> Option<&str> {
    let rest = expression.strip_prefix('*')?.trim_start();
    let alias = rest.strip_prefix("as")?;
    if !alias.starts_with(char::is_whitespace) {
        return None;
    }
    let alias = alias.trim();
    is_identifier(alias).then_some(alias)
}

/// Expands one comma-separated entry of a brace group.
fn expand_entry(entry: &str, kind: SymbolKind) -> Option<String> {
    // Drop default values and rest markers from destructuring patterns.
    let entry = entry.split('=').next().unwrap_or_default().trim();
    let entry = entry.trim_start_matches("...").trim();
    if entry.is_empty() {
        return None;
    }

    let mut tokens: Vec<&str> = entry.split_whitespace().collect();
    let renamed_type = tokens.len() == 3 && tokens[1] == "as";
    if tokens.len() > 1 && tokens[0] == "type" && !renamed_type {
        tokens.remove(0);
    }

    let name = if tokens.len() == 3 && tokens[1] == "as" {
        match kind {
            SymbolKind::Import => tokens[0],
            SymbolKind::Export => tokens[2],
        }
    } else {
        let joined = tokens.join(" ");
        let name = match joined.split_once(':') {
            Some((_, local)) => local.trim().to_string(),
            None => joined,
        };
        return accept(name);
    };

    accept(name.to_string())
}

fn accept(name: String) -> Option<String> {
    if is_identifier(&name) {
        Some(name)
    } else {
        trace!(name, "dropping non-identifier entry");
        None
    }
}

/// Returns true for a JavaScript identifier, using the same definition the
/// scanner captures with.
pub fn is_identifier(text: &str) -> bool {
    IDENTIFIER_RE.is_match(text)
}
