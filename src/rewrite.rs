//! Text-level rewriting: smart merge of duplicate keys, combining a file set
//! into one document, and splitting blocks out into their own files.
//!
//! Every function here is a pure splice over [`scan::top_level_blocks`]. No
//! content goes through a YAML parse/serialize cycle, so comments, quoting and
//! key order outside the relocated blocks come out exactly as they went in.

use std::collections::BTreeMap;
use std::path::Path;

use crate::analyze::{self, DuplicateKeyAnalysis, MergeDecisions};
use crate::error::EditorError;
use crate::scan::{self, KeyBlock};
use crate::types::ConfigFile;
use crate::validate;

/// Rewrite `files` so each duplicate top-level key lives only in its primary
/// file.
///
/// For a duplicate key with merge enabled, the bodies of every non-primary
/// copy are appended (in file order) right after the primary's own body.
/// With merge disabled the non-primary copies are dropped; disabling merge
/// discards them, it does not keep both.
///
/// A missing or invalid primary falls back to the default choice (see
/// [`MergeDecisions::defaults`]). Returns one file per input, in input order.
pub fn remove_duplicate_keys(
    files: &[ConfigFile],
    smart_merge_enabled: &BTreeMap<String, bool>,
    primary_file_per_key: &BTreeMap<String, usize>,
) -> Vec<ConfigFile> {
    let analysis = analyze::analyze(files);
    if !analysis.has_duplicates {
        return files.to_vec();
    }

    let primaries = effective_primaries(files, &analysis, primary_file_per_key);
    let to_merge = collect_merge_bodies(files, &analysis, smart_merge_enabled, &primaries);

    files
        .iter()
        .enumerate()
        .map(|(index, file)| ConfigFile {
            name: file.name.clone(),
            content: rewrite_file(index, &file.content, &primaries, &to_merge),
        })
        .collect()
}

fn effective_primaries(
    files: &[ConfigFile],
    analysis: &DuplicateKeyAnalysis,
    requested: &BTreeMap<String, usize>,
) -> BTreeMap<String, usize> {
    analysis
        .duplicate_details
        .iter()
        .map(|(key, detail)| {
            let carries = |index: usize| detail.files.iter().any(|f| f.file_index == index);
            let primary = match requested.get(key) {
                Some(&index) if carries(index) => index,
                Some(&index) => {
                    let fallback = analyze::default_primary(files, detail);
                    log::warn!(
                        "file #{index} does not define '{key}'; using {} as primary",
                        files[fallback].name
                    );
                    fallback
                }
                None => analyze::default_primary(files, detail),
            };
            (key.clone(), primary)
        })
        .collect()
}

/// Body lines of every non-primary copy, keyed by duplicate key, for keys with
/// merge enabled.
fn collect_merge_bodies(
    files: &[ConfigFile],
    analysis: &DuplicateKeyAnalysis,
    smart_merge_enabled: &BTreeMap<String, bool>,
    primaries: &BTreeMap<String, usize>,
) -> BTreeMap<String, Vec<String>> {
    let mut to_merge: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (key, detail) in &analysis.duplicate_details {
        if !smart_merge_enabled.get(key).copied().unwrap_or(false) {
            log::debug!("smart merge disabled for '{key}'; non-primary blocks are dropped");
            continue;
        }
        let primary = primaries[key];
        let bodies = to_merge.entry(key.clone()).or_default();
        for file_ref in detail.files.iter().filter(|f| f.file_index != primary) {
            bodies.extend(block_bodies(&files[file_ref.file_index].content, key));
        }
    }
    to_merge
}

/// Body lines of all blocks for `key`, each normalized to end with a newline.
fn block_bodies(content: &str, key: &str) -> Vec<String> {
    let lines = scan::split_lines(content);
    scan::top_level_blocks(content)
        .iter()
        .filter(|b| b.key == key)
        .flat_map(|b| lines[b.body()].iter().map(|l| terminated(l)))
        .collect()
}

fn terminated(line: &str) -> String {
    if line.ends_with('\n') {
        line.to_string()
    } else {
        format!("{line}\n")
    }
}

fn rewrite_file(
    index: usize,
    content: &str,
    primaries: &BTreeMap<String, usize>,
    to_merge: &BTreeMap<String, Vec<String>>,
) -> String {
    let blocks = scan::top_level_blocks(content);
    if !blocks.iter().any(|b| primaries.contains_key(&b.key)) {
        return content.to_string();
    }

    let lines = scan::split_lines(content);
    let preamble_end = blocks.first().map_or(lines.len(), |b| b.start_line);
    let mut out = String::with_capacity(content.len());
    out.extend(lines[..preamble_end].iter().copied());

    let mut merged_into: Vec<&str> = Vec::new();
    for block in &blocks {
        let block_text = || lines[block.start_line..block.end_line].concat();
        match primaries.get(&block.key) {
            None => out.push_str(&block_text()),
            Some(&primary) if primary == index => {
                out.push_str(&block_text());
                if merged_into.contains(&block.key.as_str()) {
                    continue;
                }
                merged_into.push(&block.key);
                if let Some(extra) = to_merge.get(&block.key).filter(|e| !e.is_empty()) {
                    if !out.is_empty() && !out.ends_with('\n') {
                        out.push('\n');
                    }
                    out.extend(extra.iter().map(String::as_str));
                }
            }
            Some(_) => {}
        }
    }
    out
}

/// Rewrite with `decisions` and join the results into one document.
///
/// Rejects the whole operation, before producing any output, when a key with
/// conflicting second-level keys still has smart merge disabled. Each
/// non-empty file contributes a `# --- <name> ---` separator followed by its
/// rewritten text.
pub fn combine_files(
    files: &[ConfigFile],
    decisions: &MergeDecisions,
) -> Result<String, EditorError> {
    let analysis = analyze::analyze(files);
    validate::validate_merge_decisions(&analysis, decisions)?;

    let rewritten = remove_duplicate_keys(
        files,
        &decisions.smart_merge_enabled,
        &decisions.primary_file_per_key,
    );

    let mut combined = String::new();
    for file in rewritten.iter().filter(|f| !f.content.trim().is_empty()) {
        if !combined.is_empty() {
            if !combined.ends_with('\n') {
                combined.push('\n');
            }
            combined.push('\n');
        }
        combined.push_str(&format!("# --- {} ---\n", file.name));
        combined.push_str(&file.content);
    }
    if !combined.is_empty() && !combined.ends_with('\n') {
        combined.push('\n');
    }
    Ok(combined)
}

/// Result of moving top-level blocks out of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitOutcome {
    /// The source file without the extracted blocks.
    pub remaining: ConfigFile,
    /// One new file per extracted key, in the order requested.
    pub extracted: Vec<ConfigFile>,
}

/// Move the blocks for `keys` out of `file` into `<stem>-<key>.yaml` files.
///
/// Keys the file does not define are an error; nothing is produced for a
/// partial match.
pub fn split_sections(file: &ConfigFile, keys: &[String]) -> Result<SplitOutcome, EditorError> {
    let blocks = scan::top_level_blocks(&file.content);
    let missing: Vec<String> = keys
        .iter()
        .filter(|k| !blocks.iter().any(|b| &b.key == *k))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(EditorError::InvalidArgument {
            arg: "keys".into(),
            reason: format!("{} does not define: {}", file.name, missing.join(", ")),
        });
    }

    let lines = scan::split_lines(&file.content);
    let text_of = |b: &KeyBlock| lines[b.start_line..b.end_line].concat();

    let extracted = keys
        .iter()
        .map(|key| {
            let content: String = blocks
                .iter()
                .filter(|b| &b.key == key)
                .map(|b| terminated(&text_of(b)))
                .collect();
            ConfigFile::new(split_file_name(&file.name, key), content)
        })
        .collect();

    let preamble_end = blocks.first().map_or(lines.len(), |b| b.start_line);
    let mut remaining = lines[..preamble_end].concat();
    for block in blocks.iter().filter(|b| !keys.contains(&b.key)) {
        remaining.push_str(&text_of(block));
    }

    Ok(SplitOutcome {
        remaining: ConfigFile::new(file.name.clone(), remaining),
        extracted,
    })
}

/// `content` with every top-level block removed: only the leading comment
/// and blank lines before the first key are kept.
pub fn strip_top_level_blocks(content: &str) -> String {
    let lines = scan::split_lines(content);
    let preamble_end = scan::top_level_blocks(content)
        .first()
        .map_or(lines.len(), |b| b.start_line);
    lines[..preamble_end].concat()
}

/// `app/config.yaml` + `zwift` → `app/config-zwift.yaml`.
fn split_file_name(source: &str, key: &str) -> String {
    let path = Path::new(source);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("config");
    let name = format!("{stem}-{key}.yaml");
    match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => parent.join(name).to_string_lossy().into_owned(),
        None => name,
    }
}
