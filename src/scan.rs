//! Line-oriented key scanning for YAML text.
//!
//! This is deliberately not a YAML parser. Files are read as a list of lines
//! and split into [`KeyBlock`] spans: a top-level key line (no leading
//! whitespace) plus every line after it up to the next top-level key line or
//! end of file. Edits built on these spans are plain text splices, so comments
//! and formatting outside the touched spans survive byte for byte.
//!
//! Known false positive: a key-shaped line at column 0 inside a block scalar
//! (`|` or `>`) is reported as a key. Block scalars are indented in practice,
//! so this only bites on unusual files.

use std::sync::LazyLock;

use regex::Regex;

static TOP_LEVEL_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z_][A-Za-z0-9_-]*)\s*:").expect("top-level key pattern is valid")
});

static INDENTED_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([ \t]+)([A-Za-z_][A-Za-z0-9_-]*)\s*:").expect("indented key pattern is valid")
});

/// A top-level key and the half-open line range `[start_line, end_line)` it
/// owns. `start_line` is the key line itself; the body is everything after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBlock {
    pub key: String,
    pub start_line: usize,
    pub end_line: usize,
}

impl KeyBlock {
    /// Line indices of the body (excluding the key line).
    pub fn body(&self) -> std::ops::Range<usize> {
        self.start_line + 1..self.end_line
    }
}

/// Split content into lines, keeping each line's terminator so that
/// concatenating the result reproduces the input exactly.
pub fn split_lines(content: &str) -> Vec<&str> {
    content.split_inclusive('\n').collect()
}

/// Name of the top-level key defined on `line`, if any.
pub fn top_level_key(line: &str) -> Option<&str> {
    TOP_LEVEL_KEY
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Text that cannot be YAML (embedded NUL bytes) yields no keys at all.
fn is_scannable(content: &str) -> bool {
    !content.contains('\0')
}

/// Top-level key blocks in file order.
pub fn top_level_blocks(content: &str) -> Vec<KeyBlock> {
    if !is_scannable(content) {
        return Vec::new();
    }
    let lines = split_lines(content);
    let mut blocks: Vec<KeyBlock> = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        if let Some(key) = top_level_key(line) {
            if let Some(prev) = blocks.last_mut() {
                prev.end_line = i;
            }
            blocks.push(KeyBlock {
                key: key.to_string(),
                start_line: i,
                end_line: lines.len(),
            });
        }
    }
    blocks
}

/// Top-level keys in file order. Repeats within one file are kept.
pub fn scan_top_level_keys(content: &str) -> Vec<String> {
    top_level_blocks(content).into_iter().map(|b| b.key).collect()
}

/// Second-level keys under every occurrence of `top_level_key`.
///
/// The first indented key line of a block fixes the indentation width for the
/// rest of that block; key lines at any other width are deeper content.
pub fn scan_second_level_keys(content: &str, top_level_key: &str) -> Vec<String> {
    let lines = split_lines(content);
    let mut keys = Vec::new();

    for block in top_level_blocks(content)
        .iter()
        .filter(|b| b.key == top_level_key)
    {
        let mut indent: Option<usize> = None;
        for line in &lines[block.body()] {
            let Some(caps) = INDENTED_KEY.captures(line) else {
                continue;
            };
            let width = caps[1].len();
            match indent {
                None => indent = Some(width),
                Some(expected) if expected != width => continue,
                Some(_) => {}
            }
            keys.push(caps[2].to_string());
        }
    }
    keys
}
