//! Duplicate top-level key analysis across a set of files.
//!
//! A top-level key that appears in two or more files is a duplicate. For each
//! duplicate, the second-level keys found under it in every carrying file are
//! compared: a second-level key present in more than one of those files is a
//! conflict, and a duplicate with no conflicts can be smart-merged. Only key
//! presence is compared, never values.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::scan;
use crate::types::ConfigFile;

/// File name that wins the primary slot for a duplicate key when it carries it.
pub const PREFERRED_PRIMARY: &str = "config.yaml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRef {
    pub file_index: usize,
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecondLevelKeys {
    pub file_index: usize,
    pub file_name: String,
    pub second_level_keys: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateKeyDetail {
    pub files: Vec<FileRef>,
    pub second_level_analysis: Vec<SecondLevelKeys>,
    pub conflicting_second_keys: Vec<String>,
    pub can_smart_merge: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateKeyAnalysis {
    pub has_duplicates: bool,
    /// Duplicate keys in order of first appearance.
    pub duplicate_keys: Vec<String>,
    pub duplicate_details: BTreeMap<String, DuplicateKeyDetail>,
}

impl DuplicateKeyAnalysis {
    pub fn detail(&self, key: &str) -> Option<&DuplicateKeyDetail> {
        self.duplicate_details.get(key)
    }

    /// Duplicate keys that cannot be smart-merged.
    pub fn conflicting_keys(&self) -> impl Iterator<Item = &str> {
        self.duplicate_keys
            .iter()
            .filter(|k| self.duplicate_details.get(*k).is_some_and(|d| !d.can_smart_merge))
            .map(String::as_str)
    }
}

/// Find top-level keys defined in more than one file and classify each.
pub fn analyze(files: &[ConfigFile]) -> DuplicateKeyAnalysis {
    let per_file: Vec<Vec<String>> = files
        .iter()
        .map(|f| dedup_in_order(scan::scan_top_level_keys(&f.content)))
        .collect();

    let mut carriers: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    let mut first_seen: Vec<&str> = Vec::new();
    for (index, keys) in per_file.iter().enumerate() {
        for key in keys {
            let entry = carriers.entry(key.as_str()).or_default();
            if entry.is_empty() {
                first_seen.push(key.as_str());
            }
            entry.push(index);
        }
    }

    let mut analysis = DuplicateKeyAnalysis::default();
    for key in first_seen {
        let indices = &carriers[key];
        if indices.len() < 2 {
            continue;
        }
        let detail = detail_for(files, key, indices);
        log::debug!(
            "duplicate key '{key}' in {} files (smart merge: {})",
            indices.len(),
            detail.can_smart_merge
        );
        analysis.duplicate_keys.push(key.to_string());
        analysis.duplicate_details.insert(key.to_string(), detail);
    }
    analysis.has_duplicates = !analysis.duplicate_keys.is_empty();
    analysis
}

fn detail_for(files: &[ConfigFile], key: &str, indices: &[usize]) -> DuplicateKeyDetail {
    let mut files_out = Vec::with_capacity(indices.len());
    let mut second_level_analysis = Vec::with_capacity(indices.len());
    let mut seen_in: BTreeMap<String, usize> = BTreeMap::new();
    let mut conflicting: Vec<String> = Vec::new();

    for &index in indices {
        let file = &files[index];
        let second = scan::scan_second_level_keys(&file.content, key);

        for second_key in dedup_in_order(second.clone()) {
            let count = seen_in.entry(second_key.clone()).or_insert(0);
            *count += 1;
            if *count == 2 {
                conflicting.push(second_key);
            }
        }

        files_out.push(FileRef {
            file_index: index,
            file_name: file.name.clone(),
        });
        second_level_analysis.push(SecondLevelKeys {
            file_index: index,
            file_name: file.name.clone(),
            second_level_keys: second,
        });
    }

    DuplicateKeyDetail {
        files: files_out,
        second_level_analysis,
        can_smart_merge: conflicting.is_empty(),
        conflicting_second_keys: conflicting,
    }
}

fn dedup_in_order(keys: Vec<String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    keys.into_iter().filter(|k| seen.insert(k.clone())).collect()
}

/// The user's choices for each duplicate key: which file keeps it, and
/// whether the other files' blocks are merged into it or discarded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeDecisions {
    pub smart_merge_enabled: BTreeMap<String, bool>,
    pub primary_file_per_key: BTreeMap<String, usize>,
}

impl MergeDecisions {
    /// Defaults for every duplicate key: the primary is `config.yaml` when it
    /// carries the key, otherwise the first carrying file; smart merge is on
    /// only when the key has no conflicting second-level keys.
    pub fn defaults(files: &[ConfigFile], analysis: &DuplicateKeyAnalysis) -> Self {
        let mut decisions = MergeDecisions::default();
        for (key, detail) in &analysis.duplicate_details {
            decisions
                .primary_file_per_key
                .insert(key.clone(), default_primary(files, detail));
            decisions
                .smart_merge_enabled
                .insert(key.clone(), detail.can_smart_merge);
        }
        decisions
    }

    pub fn set_primary(&mut self, key: &str, file_index: usize) {
        self.primary_file_per_key.insert(key.to_string(), file_index);
    }

    pub fn set_smart_merge(&mut self, key: &str, enabled: bool) {
        self.smart_merge_enabled.insert(key.to_string(), enabled);
    }

    /// Unset keys count as disabled.
    pub fn is_merge_enabled(&self, key: &str) -> bool {
        self.smart_merge_enabled.get(key).copied().unwrap_or(false)
    }
}

pub(crate) fn default_primary(files: &[ConfigFile], detail: &DuplicateKeyDetail) -> usize {
    detail
        .files
        .iter()
        .find(|f| {
            files
                .get(f.file_index)
                .is_some_and(|file| file.base_name() == PREFERRED_PRIMARY)
        })
        .or_else(|| detail.files.first())
        .map(|f| f.file_index)
        .unwrap_or(0)
}
