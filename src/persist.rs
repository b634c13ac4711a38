//! Section persistence: write one section's value into a YAML file while
//! leaving the rest of the file's text alone.
//!
//! The target value is merged with what is on disk (read immediately before
//! the write), re-serialized with `serde_yaml`, and spliced over the target
//! top-level block only. Other blocks keep their comments and formatting, as
//! do comment lines trailing the replaced block. When the file doesn't exist
//! yet, it is created with just the new block.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::EditorError;
use crate::mapping::Location;
use crate::merge;
use crate::scan::{self, KeyBlock};
use crate::store::FileStore;

/// Parse YAML text into its root mapping. Blank or comment-only text and a
/// bare `null` document are an empty mapping.
pub fn parse_document(content: &str, path: &Path) -> Result<Map<String, Value>, EditorError> {
    let has_content = content.lines().any(|l| {
        let l = l.trim();
        !l.is_empty() && !l.starts_with('#') && l != "---"
    });
    if !has_content {
        return Ok(Map::new());
    }
    let value: Value = serde_yaml::from_str(content).map_err(|source| EditorError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    match value {
        Value::Null => Ok(Map::new()),
        Value::Object(map) => Ok(map),
        _ => Err(EditorError::NotAMapping {
            path: path.to_path_buf(),
        }),
    }
}

/// Pure function: set the value at `location` inside `content`.
///
/// Object values replace the existing object, except for keys listed in
/// `preserve`, which keep their current on-disk value. Non-object values
/// replace outright. Returns `content` unchanged when the value already
/// matches.
pub fn set_section_in_document(
    content: &str,
    location: &Location,
    value: Value,
    preserve: &[String],
) -> Result<String, EditorError> {
    let path = location.file_path.as_path();
    let root = parse_document(content, path)?;
    let top = location.top_level_key.as_str();
    let existing_top = root.get(top);

    let new_top = match &location.second_level_key {
        None => apply(existing_top, value, preserve),
        Some(second) => {
            let mut parent = existing_top
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();
            let updated = apply(parent.get(second), value, preserve);
            parent.insert(second.clone(), updated);
            Value::Object(parent)
        }
    };

    if existing_top == Some(&new_top) {
        return Ok(content.to_string());
    }
    replace_top_level_block(content, &root, top, new_top)
}

fn apply(existing: Option<&Value>, value: Value, preserve: &[String]) -> Value {
    match value {
        Value::Object(incoming) => Value::Object(merge::replace_preserving(
            existing.and_then(Value::as_object),
            incoming,
            preserve,
        )),
        other => other,
    }
}

fn render_block(key: &str, value: Value) -> Result<String, EditorError> {
    let mut doc = Map::new();
    doc.insert(key.to_string(), value);
    serde_yaml::to_string(&doc).map_err(|source| EditorError::Serialize {
        key: key.to_string(),
        source,
    })
}

/// Splice a freshly rendered `key:` block over the existing one(s).
///
/// The first block for `key` is replaced in place; any later repeats are
/// removed. Blank and column-0 comment lines at the tail of a replaced block
/// usually introduce the next block, so they are kept.
fn replace_top_level_block(
    content: &str,
    root: &Map<String, Value>,
    key: &str,
    value: Value,
) -> Result<String, EditorError> {
    let blocks: Vec<KeyBlock> = scan::top_level_blocks(content)
        .into_iter()
        .filter(|b| b.key == key)
        .collect();

    if blocks.is_empty() {
        if root.contains_key(key) {
            // Defined in a form the line scanner can't see (quoted or flow key).
            log::warn!("'{key}' is not a plain block key; rewriting the whole document");
            let mut whole = root.clone();
            whole.insert(key.to_string(), value);
            return serde_yaml::to_string(&whole).map_err(|source| EditorError::Serialize {
                key: key.to_string(),
                source,
            });
        }
        let mut out = content.to_string();
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&render_block(key, value)?);
        return Ok(out);
    }

    let rendered = render_block(key, value)?;
    let lines = scan::split_lines(content);
    let mut out = String::with_capacity(content.len() + rendered.len());
    let mut cursor = 0;
    for (i, block) in blocks.iter().enumerate() {
        out.push_str(&lines[cursor..block.start_line].concat());
        if i == 0 {
            out.push_str(&rendered);
        }
        let trailer = trailing_trivia_start(&lines, block);
        out.push_str(&lines[trailer..block.end_line].concat());
        cursor = block.end_line;
    }
    out.push_str(&lines[cursor..].concat());
    Ok(out)
}

fn trailing_trivia_start(lines: &[&str], block: &KeyBlock) -> usize {
    let mut start = block.end_line;
    while start > block.start_line + 1 {
        let line = lines[start - 1];
        if line.trim().is_empty() || line.starts_with('#') {
            start -= 1;
        } else {
            break;
        }
    }
    start
}

/// What a single-file write did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOutcome {
    /// False when the file already held the value and nothing was written.
    pub changed: bool,
    pub backup: Option<PathBuf>,
    pub backup_error: Option<String>,
}

/// I/O wrapper: read the file fresh (if it exists), patch it, back it up,
/// write it back.
///
/// A failed backup is logged and reported in the outcome but does not stop
/// the write.
pub fn write_section<S: FileStore + ?Sized>(
    store: &S,
    location: &Location,
    value: Value,
    preserve: &[String],
    backup_directory: Option<&Path>,
) -> Result<WriteOutcome, EditorError> {
    let path = location.file_path.as_path();
    let existed = store.exists(path);
    let current = if existed {
        store.read_file(path)?
    } else {
        String::new()
    };

    let updated = set_section_in_document(&current, location, value, preserve)?;
    if existed && updated == current {
        log::debug!("{} already up to date", path.display());
        return Ok(WriteOutcome::default());
    }

    let mut outcome = WriteOutcome {
        changed: true,
        ..WriteOutcome::default()
    };
    if let Some(dir) = backup_directory.filter(|_| existed) {
        match store.backup_config(path, dir) {
            Ok(backup) => outcome.backup = Some(backup),
            Err(e) => {
                log::warn!("backup of {} failed, saving anyway: {e}", path.display());
                outcome.backup_error = Some(e.to_string());
            }
        }
    }

    store.save_file(path, &updated)?;
    log::info!(
        "wrote {}{} to {}",
        location.top_level_key,
        location
            .second_level_key
            .as_deref()
            .map(|s| format!(".{s}"))
            .unwrap_or_default(),
        path.display()
    );
    Ok(outcome)
}
