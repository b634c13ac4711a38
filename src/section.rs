//! Section data loading and saving.
//!
//! A section is what one editor form shows: `general`, `appearance`, ... Its
//! data may come from one file or be assembled from several split files (see
//! [`mapping`](crate::mapping)). Loading is forgiving: anything missing,
//! unreadable or unparsable comes back as an empty object so the form still
//! opens. Saving is strict and strictly sequential:
//!
//! ```text
//! Idle → Validating → SavingNested(0..n) → SavingParent → BackupVerified → Done
//!                 \________________ any failure ________________/→ Failed
//! ```
//!
//! Nested pieces are written one at a time, each reading its file fresh, so
//! two pieces that share a file never overwrite each other with a stale
//! snapshot. The first failure stops the save; pieces already written stay
//! written and the error names the exact step that failed.

use std::fmt;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::EditorError;
use crate::mapping::{Location, SectionMapping};
use crate::merge;
use crate::persist;
use crate::store::FileStore;

/// The object a section editor works on.
pub type SectionData = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStage {
    Idle,
    Validating,
    /// Writing the nested (split) piece with this zero-based index.
    SavingNested(usize),
    SavingParent,
    BackupVerified,
    Done,
    Failed,
}

impl fmt::Display for SaveStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveStage::Idle => write!(f, "idle"),
            SaveStage::Validating => write!(f, "validating"),
            SaveStage::SavingNested(i) => write!(f, "saving nested piece {}", i + 1),
            SaveStage::SavingParent => write!(f, "saving parent file"),
            SaveStage::BackupVerified => write!(f, "verifying backups"),
            SaveStage::Done => write!(f, "done"),
            SaveStage::Failed => write!(f, "failed"),
        }
    }
}

/// Options for [`save_section`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SaveOptions<'a> {
    /// Back up each existing file here before writing it. `None` disables
    /// auto-backup.
    pub backup_directory: Option<&'a Path>,
}

/// What a completed save did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveReport {
    /// Every stage entered, in order.
    pub stages: Vec<SaveStage>,
    /// Files actually rewritten, in write order.
    pub written: Vec<PathBuf>,
    pub backups: Vec<PathBuf>,
    /// Files whose backup failed (the write went ahead).
    pub backup_failures: Vec<PathBuf>,
    /// Top-level fields with nowhere to go (split section without a parent file).
    pub unpersisted_keys: Vec<String>,
}

/// Load a section's data. Never fails: an unmapped section, unreadable file or
/// non-object value yields an empty object.
///
/// For a split section the result is each nested piece under its second-level
/// key, with the parent entry's own fields merged over them. A parent field
/// named like a nested piece wins, and a warning is logged.
pub fn load_section<S: FileStore + ?Sized>(
    section_key: &str,
    mapping: &SectionMapping,
    store: &S,
) -> SectionData {
    let resolved = mapping.resolve(section_key);
    if resolved.is_empty() {
        log::warn!("section '{section_key}' has no file mapping");
        return SectionData::new();
    }

    let mut nested = SectionData::new();
    for piece in &resolved.nested {
        if let Some(value) = read_value(store, &piece.location) {
            nested.insert(piece.second_key.clone(), value);
        }
    }

    let parent = match &resolved.parent {
        Some(location) => match read_value(store, location) {
            Some(Value::Object(map)) => map,
            Some(_) => {
                log::warn!(
                    "section '{section_key}' in {} is not an object",
                    location.file_path.display()
                );
                SectionData::new()
            }
            None => SectionData::new(),
        },
        None => SectionData::new(),
    };

    if let Some(location) = &resolved.parent {
        for key in parent.keys().filter(|k| nested.contains_key(*k)) {
            log::warn!(
                "section '{section_key}': {} also defines '{key}', hiding its split file",
                location.file_path.display()
            );
        }
    }

    merge::deep_merge(nested, parent)
}

fn read_value<S: FileStore + ?Sized>(store: &S, location: &Location) -> Option<Value> {
    let path = location.file_path.as_path();
    let content = store
        .read_file(path)
        .inspect_err(|e| log::warn!("could not load {}: {e}", path.display()))
        .ok()?;
    let mut root = persist::parse_document(&content, path)
        .inspect_err(|e| log::warn!("could not parse {}: {e}", path.display()))
        .ok()?;

    let top = root.remove(&location.top_level_key)?;
    match &location.second_level_key {
        None => Some(top),
        Some(second) => match top {
            Value::Object(mut map) => map.remove(second),
            _ => None,
        },
    }
}

struct SaveRun {
    stage: SaveStage,
    report: SaveReport,
}

impl SaveRun {
    fn new() -> Self {
        Self {
            stage: SaveStage::Idle,
            report: SaveReport::default(),
        }
    }

    fn enter(&mut self, stage: SaveStage) {
        log::debug!("save: {} -> {}", self.stage, stage);
        self.stage = stage;
        self.report.stages.push(stage);
    }

    fn fail(&mut self, path: &Path, source: EditorError) -> EditorError {
        let stage = self.stage;
        self.enter(SaveStage::Failed);
        log::warn!("save failed while {stage} ({}): {source}", path.display());
        EditorError::SaveFailed {
            stage,
            path: path.to_path_buf(),
            source: Box::new(source),
        }
    }

    fn record(&mut self, path: &Path, outcome: persist::WriteOutcome) {
        if outcome.changed {
            self.report.written.push(path.to_path_buf());
        }
        if let Some(backup) = outcome.backup {
            self.report.backups.push(backup);
        }
        if outcome.backup_error.is_some() {
            self.report.backup_failures.push(path.to_path_buf());
        }
    }
}

/// Persist a section's data back to the file(s) it came from.
///
/// Each nested piece goes to its own file first, strictly one after another.
/// The remaining fields then go to the parent file with the nested keys
/// preserved, so data the parent file holds for them is never dropped.
pub fn save_section<S: FileStore + ?Sized>(
    section_key: &str,
    data: &SectionData,
    mapping: &SectionMapping,
    store: &S,
    options: SaveOptions<'_>,
) -> Result<SaveReport, EditorError> {
    let mut run = SaveRun::new();

    run.enter(SaveStage::Validating);
    let resolved = mapping.resolve(section_key);
    if resolved.is_empty() {
        run.enter(SaveStage::Failed);
        return Err(EditorError::SectionNotMapped(section_key.to_string()));
    }

    let nested_keys: Vec<String> = resolved.nested.iter().map(|n| n.second_key.clone()).collect();

    for (index, piece) in resolved.nested.iter().enumerate() {
        run.enter(SaveStage::SavingNested(index));
        let Some(value) = data.get(&piece.second_key) else {
            log::debug!("'{}' not in payload; leaving it alone", piece.section_key);
            continue;
        };
        let path = piece.location.file_path.as_path();
        match persist::write_section(
            store,
            &piece.location,
            value.clone(),
            &[],
            options.backup_directory,
        ) {
            Ok(outcome) => run.record(path, outcome),
            Err(e) => return Err(run.fail(path, e)),
        }
    }

    let remaining: SectionData = data
        .iter()
        .filter(|(k, _)| !nested_keys.contains(k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    run.enter(SaveStage::SavingParent);
    match &resolved.parent {
        Some(location) => {
            let path = location.file_path.as_path();
            match persist::write_section(
                store,
                location,
                Value::Object(remaining),
                &nested_keys,
                options.backup_directory,
            ) {
                Ok(outcome) => run.record(path, outcome),
                Err(e) => return Err(run.fail(path, e)),
            }
        }
        None if !remaining.is_empty() => {
            log::warn!(
                "section '{section_key}' has no parent file; not saving: {}",
                remaining.keys().cloned().collect::<Vec<_>>().join(", ")
            );
            run.report.unpersisted_keys = remaining.keys().cloned().collect();
        }
        None => {}
    }

    run.enter(SaveStage::BackupVerified);
    if options.backup_directory.is_some() {
        for backup in &run.report.backups {
            if !store.exists(backup) {
                log::warn!("backup {} is missing after save", backup.display());
            }
        }
        for path in &run.report.backup_failures {
            log::warn!("{} was saved without a backup", path.display());
        }
    }

    run.enter(SaveStage::Done);
    Ok(run.report)
}
