//! Section → file mapping.
//!
//! A mapping is keyed by lower-case section name. Dotted keys
//! (`appearance.dashboard`) are split sections: their data lives at
//! `file[topLevelKey][secondLevelKey]`. Entries sharing a dotted prefix are
//! combined when the bare section is loaded, never treated as conflicts.
//!
//! Mappings normally come from an external builder as JSON, with each value
//! either a bare file name (legacy form) or a structured record.
//! [`SectionMapping::from_files`] derives a simple one from scanned files.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::analyze::PREFERRED_PRIMARY;
use crate::error::EditorError;
use crate::scan;
use crate::types::ConfigFile;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileLocation {
    pub file_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_level_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub second_level_key: Option<String>,
    #[serde(default)]
    pub is_split_file: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MappingEntry {
    /// Legacy form: just a file name; the section key doubles as the YAML key.
    File(String),
    Located(FileLocation),
}

impl MappingEntry {
    pub fn file_path(&self) -> &str {
        match self {
            MappingEntry::File(name) => name,
            MappingEntry::Located(loc) => &loc.file_path,
        }
    }

    /// Where this entry's data sits, using `section_key` to fill in whatever
    /// the entry leaves out.
    pub fn locate(&self, section_key: &str) -> Location {
        let (derived_top, derived_second) = match section_key.split_once('.') {
            Some((top, second)) => (top, Some(second)),
            None => (section_key, None),
        };
        match self {
            MappingEntry::File(name) => Location {
                file_path: PathBuf::from(name),
                top_level_key: derived_top.to_string(),
                second_level_key: derived_second.map(str::to_string),
            },
            MappingEntry::Located(loc) => Location {
                file_path: PathBuf::from(&loc.file_path),
                top_level_key: loc
                    .top_level_key
                    .clone()
                    .unwrap_or_else(|| derived_top.to_string()),
                second_level_key: loc
                    .second_level_key
                    .clone()
                    .or_else(|| derived_second.map(str::to_string)),
            },
        }
    }
}

/// A concrete place to read or write a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub file_path: PathBuf,
    pub top_level_key: String,
    pub second_level_key: Option<String>,
}

/// One split piece of a section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NestedLocation {
    /// The dotted mapping key, e.g. `appearance.dashboard`.
    pub section_key: String,
    /// The field name this piece occupies in the assembled section object.
    pub second_key: String,
    pub location: Location,
}

/// Every mapping entry that contributes to one section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedSection {
    pub parent: Option<Location>,
    pub nested: Vec<NestedLocation>,
}

impl ResolvedSection {
    pub fn is_empty(&self) -> bool {
        self.parent.is_none() && self.nested.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionMapping {
    entries: BTreeMap<String, MappingEntry>,
}

impl SectionMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an externally built mapping. Keys are lower-cased; two keys that
    /// collide after lower-casing are rejected.
    pub fn from_json(json: &str) -> Result<Self, EditorError> {
        let raw: BTreeMap<String, MappingEntry> =
            serde_json::from_str(json).map_err(|e| EditorError::Mapping {
                reason: e.to_string(),
            })?;
        let mut mapping = SectionMapping::new();
        for (key, entry) in raw {
            let lower = key.to_lowercase();
            if mapping.entries.contains_key(&lower) {
                return Err(EditorError::Mapping {
                    reason: format!("section '{lower}' is mapped more than once"),
                });
            }
            mapping.entries.insert(lower, entry);
        }
        Ok(mapping)
    }

    /// Derive a mapping from file contents.
    ///
    /// The first file carrying a top-level key owns section `key`, with a file
    /// named `config.yaml` considered first. Every later file carrying the same
    /// key contributes `key.second` split entries for its second-level keys.
    pub fn from_files(files: &[ConfigFile]) -> Self {
        let mut ordered: Vec<&ConfigFile> = files.iter().collect();
        ordered.sort_by_key(|f| f.base_name() != PREFERRED_PRIMARY);

        let mut mapping = SectionMapping::new();
        for file in ordered {
            let mut seen_here: Vec<String> = Vec::new();
            for key in scan::scan_top_level_keys(&file.content) {
                if seen_here.contains(&key) {
                    continue;
                }
                seen_here.push(key.clone());
                let section = key.to_lowercase();

                if !mapping.entries.contains_key(&section) {
                    mapping.insert(
                        &section,
                        MappingEntry::Located(FileLocation {
                            file_path: file.name.clone(),
                            top_level_key: Some(key),
                            second_level_key: None,
                            is_split_file: false,
                        }),
                    );
                    continue;
                }

                for second in scan::scan_second_level_keys(&file.content, &key) {
                    let dotted = format!("{section}.{}", second.to_lowercase());
                    if mapping.entries.contains_key(&dotted) {
                        continue;
                    }
                    mapping.insert(
                        &dotted,
                        MappingEntry::Located(FileLocation {
                            file_path: file.name.clone(),
                            top_level_key: Some(key.clone()),
                            second_level_key: Some(second),
                            is_split_file: true,
                        }),
                    );
                }
            }
        }
        log::debug!("derived mapping with {} entries", mapping.entries.len());
        mapping
    }

    pub fn insert(&mut self, key: &str, entry: MappingEntry) {
        self.entries.insert(key.to_lowercase(), entry);
    }

    pub fn get(&self, key: &str) -> Option<&MappingEntry> {
        self.entries.get(&key.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MappingEntry)> {
        self.entries.iter()
    }

    /// The exact entry for `section` plus its direct dotted children, in key order.
    pub fn resolve(&self, section: &str) -> ResolvedSection {
        let section = section.to_lowercase();
        let prefix = format!("{section}.");

        let parent = self.entries.get(&section).map(|e| e.locate(&section));
        let nested = self
            .entries
            .range(prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(&prefix))
            .filter(|(k, _)| !k[prefix.len()..].contains('.'))
            .map(|(k, entry)| {
                let location = entry.locate(k);
                let second_key = location
                    .second_level_key
                    .clone()
                    .unwrap_or_else(|| k[prefix.len()..].to_string());
                NestedLocation {
                    section_key: k.clone(),
                    second_key: second_key.clone(),
                    location: Location {
                        second_level_key: Some(second_key),
                        ..location
                    },
                }
            })
            .collect();

        ResolvedSection { parent, nested }
    }
}
