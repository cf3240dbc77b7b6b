//! Query text normalization.
//!
//! Hosts prepend a `/* Username: ..., Query ID: ..., Job ID: ... */` block to
//! every query. The block is stripped, and the remaining text is split into
//! statements that are executed one by one.

use regex::Regex;
use std::sync::LazyLock;

/// Whole-query match; `.+` is greedy so everything up to the last `*/` goes.
static METADATA_COMMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^/\*.+\*/(.*)$").expect("metadata comment pattern is valid")
});

/// Removes a leading `/* ... */` metadata block.
///
/// Queries without such a block are returned unchanged. A `*/` inside the
/// query body after the block also ends the stripped prefix.
pub fn strip_metadata_comment(query: &str) -> &str {
    METADATA_COMMENT
        .captures(query)
        .and_then(|captures| captures.get(1))
        .map_or(query, |remainder| remainder.as_str())
}

/// Splits a query into the statements to execute, in order.
///
/// Lines are trimmed; blank lines and `--` comment lines are dropped.
/// Consecutive lines are joined with a space until one ends with `;`. Text
/// after the last `;` forms a final statement. Bare `;` lines produce no
/// statement.
pub fn split_statements(query: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();

    for line in query.split('\n') {
        let line = line.trim();
        if line.is_empty() || line.starts_with("--") {
            continue;
        }

        if line.ends_with(';') {
            append_fragment(&mut current, line.trim_matches(';').trim());
            if !current.is_empty() {
                statements.push(std::mem::take(&mut current));
            }
        } else {
            append_fragment(&mut current, line);
        }
    }

    if !current.is_empty() {
        statements.push(current);
    }

    statements
}

fn append_fragment(statement: &mut String, fragment: &str) {
    if !statement.is_empty() {
        statement.push(' ');
    }
    statement.push_str(fragment);
}
