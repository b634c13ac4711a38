//! Section-aware editing of Statistics for Strava YAML configuration.
//!
//! A Statistics for Strava install keeps its configuration in a directory of
//! YAML files: one `config.yaml`, often with sections split out into
//! `config-<name>.yaml` companions. This crate reads that directory, tells you
//! which top-level keys are defined more than once, merges the files back
//! together without losing comments, and loads or saves one section at a time
//! no matter how many files it is spread across.
//!
//! ```ignore
//! let settings = EditorSettings::discover(&EditorSettings::default_search_paths())?;
//! let mut editor = ConfigEditor::open(settings)?;
//! let general = editor.load_section_data("general");
//! editor.save_section_data("general", &general)?;
//! ```
//!
//! # Two ways of looking at a file
//!
//! Most of the engine never parses YAML. Key scanning ([`scan`]), duplicate
//! analysis ([`analyze`]) and merging ([`rewrite`]) work on lines:
//!
//! - A **top-level key** is a line starting at column 0 with
//!   `identifier:`. Its **block** runs until the next top-level key or the
//!   end of the file.
//! - A **second-level key** is the first indented `identifier:` line in a
//!   block; the indentation it uses becomes the width every other
//!   second-level key in that block must match.
//!
//! Working on lines keeps comments, blank lines and quoting exactly as the
//! user wrote them, and lets the editor report duplicates in files that a
//! YAML parser would reject outright. The price is a heuristic: a block
//! scalar (`description: |`) whose content looks like `key:` is scanned as if
//! it were a key.
//!
//! Section data ([`section`]) is the opposite: values are parsed with
//! `serde_yaml` into JSON objects, edited as data, and written back by
//! re-rendering only the block that changed ([`persist`]). Everything else in
//! the file stays byte-for-byte.
//!
//! # Duplicate keys and smart merge
//!
//! When a top-level key appears in several files, [`analyze::analyze`]
//! collects the second-level keys under each copy. If no second-level key
//! shows up in more than one file, the copies are disjoint and can be merged:
//! the **primary** file's block keeps its place and receives the other blocks'
//! bodies. Otherwise the key is in conflict and the user has to decide.
//!
//! [`MergeDecisions`](analyze::MergeDecisions) hold those decisions: the
//! primary file per key (`config.yaml` when it carries the key) and whether
//! smart merge is on. Turning merge off for a key means the non-primary
//! blocks are **dropped** from the result. [`rewrite::combine_files`] refuses
//! to run while a conflicting key still has merge off.
//!
//! # Section mapping
//!
//! A [`SectionMapping`] says where each section lives:
//!
//! | Entry | Meaning |
//! |-------|---------|
//! | `general → config.yaml` | `general:` block of `config.yaml` |
//! | `appearance.dashboard → config-dashboard.yaml` | `appearance: dashboard:` in that file |
//!
//! Dotted entries make a section **split**. Loading assembles the pieces
//! under their second-level keys and lays the parent file's fields on top.
//! Saving goes the other way: each piece is written to its own file in
//! order, then the remaining fields go to the parent file with the pieces'
//! keys left untouched there. The mapping is derived from the files
//! themselves unless one is supplied with
//! [`with_mapping()`](ConfigEditor::with_mapping).
//!
//! # Saves
//!
//! A save walks `Idle → Validating → SavingNested(i)… → SavingParent →
//! BackupVerified → Done`; any failing step moves it to `Failed` and stops,
//! and the error names the step and the file ([`EditorError::SaveFailed`]).
//! Each write reads its file fresh, so two pieces that share a file see each
//! other's changes. Unchanged data is not written. When auto-backup is on,
//! every file is copied into the backup directory before it is overwritten;
//! a failed backup is reported but does not stop the save.
//!
//! # Editor settings
//!
//! The editor's own settings ([`EditorSettings`]) are a confique struct read
//! from `sfs-config.toml` along the [`SearchPath`]s, with `SFS_CONFIG_*`
//! environment variables on top. They name the config directory, the backup
//! policy, the combine target and the sections every install must have.
//!
//! # Clap adapter
//!
//! The `cli` feature (on by default) adds [`EditorArgs`], a clap derive
//! struct that converts into an [`EditorAction`] for
//! [`ConfigEditor::handle()`], and builds the `sfs-config` binary. Without it
//! the crate has no CLI dependencies:
//!
//! ```toml
//! sfs-config = { version = "...", default-features = false }
//! ```
//!
//! # Error handling
//!
//! Fallible operations return [`EditorError`]. Loading is the exception: a
//! section that can't be read comes back as an empty object and the cause is
//! logged through the `log` facade.

pub mod analyze;
pub mod error;
pub mod mapping;
pub mod persist;
pub mod rewrite;
pub mod scan;
pub mod section;
pub mod store;
pub mod types;
pub mod validate;

#[cfg(feature = "cli")]
mod cli;
mod editor;
mod file;
mod merge;
mod ops;
mod settings;

#[cfg(test)]
mod fixtures;

#[cfg(feature = "cli")]
pub use cli::{EditorArgs, EditorSubcommand};
pub use editor::ConfigEditor;
pub use error::EditorError;
pub use file::FileEntry;
pub use mapping::SectionMapping;
pub use ops::EditorResult;
pub use section::{SaveReport, SaveStage, SectionData};
pub use settings::{BackupSettings, CombineSettings, EditorSettings};
pub use store::{FileStore, FsStore};
pub use types::{ConfigFile, EditorAction, SearchPath};
