//! Shared string helpers for grammar implementations.
//!
//! Small building blocks that grammars compose: identifier quoting, literal
//! escaping, alias splitting and JSON path rendering.

use std::sync::LazyLock;

use regex::Regex;

static ALIAS_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\s+as\s+").unwrap());
static JSON_ARRAY_KEYS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\[[^\]]+\])+$").unwrap());
static JSON_ARRAY_KEY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[([^\]]+)\]").unwrap());
static ESCAPED_QUOTE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\\+)?'").unwrap());

// =============================================================================
// Identifiers and literals
// =============================================================================

/// `"name"`, doubling embedded double quotes. Every grammar except MySQL
/// and SQL Server wraps segments this way.
pub fn quote_double(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// `` `name` `` for MySQL segments.
pub fn quote_backtick(ident: &str) -> String {
    format!("`{}`", ident.replace('`', "``"))
}

/// `[name]` for SQL Server segments; a closing bracket is doubled.
pub fn quote_bracket(ident: &str) -> String {
    format!("[{}]", ident.replace(']', "]]"))
}

/// Text value rendered for `to_raw_sql`.
pub fn quote_string_single(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Boolean as it appears in debug SQL on engines without a boolean type.
pub fn format_bool_numeric(b: bool) -> &'static str {
    if b {
        "1"
    } else {
        "0"
    }
}

/// Boolean keyword text. Postgres escapes booleans with it; JSON boolean
/// predicates and JSON containment bindings use it on every engine.
pub fn format_bool_literal(b: bool) -> &'static str {
    if b {
        "true"
    } else {
        "false"
    }
}

/// Lowercase hex digits of a byte string.
pub fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

// =============================================================================
// Aliases
// =============================================================================

/// Split `left as right` (any case, any whitespace) into its two halves.
pub fn split_alias(value: &str) -> Option<(&str, &str)> {
    let found = ALIAS_PATTERN.find(value)?;
    Some((&value[..found.start()], &value[found.end()..]))
}

/// The name a `table as alias` reference is visible under.
pub fn alias_or_name(value: &str) -> &str {
    split_alias(value).map_or(value, |(_, alias)| alias)
}

// =============================================================================
// JSON paths
// =============================================================================

/// Whether a column reference selects into a JSON document (`col->path`).
pub fn is_json_selector(value: &str) -> bool {
    value.contains("->")
}

/// Render a `->` separated path as a quoted JSON path literal: `'$."a"."b"[0]'`.
pub fn wrap_json_path(value: &str, delimiter: &str) -> String {
    let value = ESCAPED_QUOTE.replace_all(value, "''");
    let path = value
        .split(delimiter)
        .map(wrap_json_path_segment)
        .collect::<Vec<_>>()
        .join(".");
    let dot = if path.starts_with('[') { "" } else { "." };
    format!("'${dot}{path}'")
}

/// Quote one path segment, leaving trailing array subscripts bare.
pub fn wrap_json_path_segment(segment: &str) -> String {
    if let Some(found) = JSON_ARRAY_KEYS.find(segment) {
        let key = &segment[..found.start()];
        if key.is_empty() {
            return found.as_str().to_string();
        }
        return format!("\"{}\"{}", key, found.as_str());
    }
    format!("\"{segment}\"")
}

/// Split `key[0][1]` into `["key", "0", "1"]`; plain segments come back alone.
pub fn parse_json_path_array_keys(attribute: &str) -> Vec<String> {
    let Some(found) = JSON_ARRAY_KEYS.find(attribute) else {
        return vec![attribute.to_string()];
    };
    let key = &attribute[..found.start()];
    std::iter::once(key.to_string())
        .chain(
            JSON_ARRAY_KEY
                .captures_iter(found.as_str())
                .map(|caps| caps[1].to_string()),
        )
        .filter(|part| !part.is_empty())
        .collect()
}
