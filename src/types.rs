use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Raw text snapshot of one physical config file.
///
/// Operations take these by reference and hand back new snapshots; nothing
/// in the engine keeps one alive across an edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub name: String,
    pub content: String,
}

impl ConfigFile {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Content length in bytes.
    pub fn size(&self) -> usize {
        self.content.len()
    }

    /// Final path component of `name`, so `app/config.yaml` and `config.yaml`
    /// compare equal.
    pub fn base_name(&self) -> &str {
        Path::new(&self.name)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.name)
    }
}

/// Where to search for the editor's own settings file.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchPath {
    /// Platform config directory (XDG on Linux, ~/Library/Application Support on macOS).
    Platform,
    /// Current working directory.
    Cwd,
    /// An explicit path.
    Path(PathBuf),
}

/// An editor operation, independent of any CLI framework.
/// The CLI layer converts parsed clap args into this.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorAction {
    /// List the YAML files of the config directory.
    Files,
    /// Report top-level keys defined in more than one file.
    Analyze { json: bool },
    /// Merge every file into the combine target.
    Combine {
        /// `(key, file name)` primary-file overrides.
        primary: Vec<(String, String)>,
        /// Keys to force smart merge on.
        merge: Vec<String>,
        /// Keys to force smart merge off (their non-primary blocks are discarded).
        no_merge: Vec<String>,
    },
    /// Move top-level blocks out of `file` into their own files.
    Split { file: String, keys: Vec<String> },
    /// Print a section's data.
    Get { section: String },
    /// Replace a section's data with the YAML/JSON object in `input`.
    Set { section: String, input: PathBuf },
    /// Verify that every required section has a mapping.
    Check,
    /// Show the effective editor settings.
    Settings,
}
