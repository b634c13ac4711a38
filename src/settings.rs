//! The editor's own settings.
//!
//! Resolved the same way as any layered config: `sfs-config.toml` files found
//! along the search paths (later = higher priority), `SFS_CONFIG_*`
//! environment variables on top, compiled defaults underneath.

use std::path::{Path, PathBuf};

use confique::Config;
use serde::Serialize;

use crate::error::EditorError;
use crate::file;
use crate::types::SearchPath;

pub const SETTINGS_FILE_NAME: &str = "sfs-config.toml";
pub const APP_NAME: &str = "sfs-config";

#[derive(Config, Serialize, Debug, Clone)]
pub struct EditorSettings {
    /// Directory holding the Statistics for Strava YAML files.
    #[config(default = "config/app", env = "SFS_CONFIG_DIR")]
    pub config_directory: PathBuf,

    /// Sections that must exist somewhere in the config directory.
    #[config(default = ["general", "appearance", "import"])]
    pub required_sections: Vec<String>,

    /// Automatic backups before each write.
    #[config(nested)]
    pub backup: BackupSettings,

    /// Combining all files into one.
    #[config(nested)]
    pub combine: CombineSettings,
}

#[derive(Config, Serialize, Debug, Clone)]
pub struct BackupSettings {
    /// Copy each existing file into the backup directory before overwriting it.
    #[config(default = true, env = "SFS_CONFIG_AUTO_BACKUP")]
    pub enabled: bool,

    /// Backup directory, relative to the config directory.
    #[config(default = "backups", env = "SFS_CONFIG_BACKUP_DIR")]
    pub directory: PathBuf,
}

#[derive(Config, Serialize, Debug, Clone)]
pub struct CombineSettings {
    /// File that receives the combined configuration.
    #[config(default = "config.yaml")]
    pub target_file: String,

    /// Delete the other files once they have been combined. When off, they
    /// are kept but emptied of every top-level block.
    #[config(default = true)]
    pub remove_sources: bool,
}

impl EditorSettings {
    /// Default search order: platform config dir, then the working directory.
    pub fn default_search_paths() -> Vec<SearchPath> {
        vec![SearchPath::Platform, SearchPath::Cwd]
    }

    /// Load settings from the discovered settings files and the environment.
    pub fn discover(search_paths: &[SearchPath]) -> Result<Self, EditorError> {
        let files = file::find_settings_files(search_paths, SETTINGS_FILE_NAME, APP_NAME);
        Self::from_files(&files)
    }

    /// Load settings from exactly these files (priority-ascending) plus the
    /// environment.
    pub fn from_files(files: &[PathBuf]) -> Result<Self, EditorError> {
        // confique gives earlier sources precedence: env first, then files
        // from highest to lowest priority.
        let mut builder = Self::builder().env();
        for path in files.iter().rev() {
            log::debug!("reading settings from {}", path.display());
            builder = builder.file(path);
        }
        Ok(builder.load()?)
    }

    /// Backup directory to pass to a save, or `None` when auto-backup is off.
    pub fn backup_directory(&self) -> Option<&Path> {
        self.backup.enabled.then_some(self.backup.directory.as_path())
    }
}
