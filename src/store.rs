//! File access behind a trait, so the section engine can run against the
//! real config directory or an in-memory double.
//!
//! Paths handed to a store are relative to its root (absolute paths are
//! used as-is). The engine never caches file contents across calls; every
//! write path reads the file again right before modifying it.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::EditorError;

pub trait FileStore {
    /// Read a whole file as UTF-8 text.
    fn read_file(&self, path: &Path) -> Result<String, EditorError>;

    /// Write a whole file, creating parent directories as needed.
    fn save_file(&self, path: &Path, content: &str) -> Result<(), EditorError>;

    /// Copy `path` into `backup_directory` and return the backup's path,
    /// relative to the store like `path` itself.
    fn backup_config(&self, path: &Path, backup_directory: &Path) -> Result<PathBuf, EditorError>;

    /// YAML files (`.yaml`/`.yml`) directly inside `dir`, sorted by name.
    fn list_files(&self, dir: &Path) -> Result<Vec<PathBuf>, EditorError>;

    fn exists(&self, path: &Path) -> bool;

    fn delete_file(&self, path: &Path) -> Result<(), EditorError>;
}

/// Is `path` a YAML file by extension?
pub fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"))
}

/// Backup file name for `path`: `<stem>.<timestamp>.<ext>`.
pub fn backup_file_name(path: &Path, stamp: &str) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("config");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("yaml");
    format!("{stem}.{stamp}.{ext}")
}

/// Store rooted at the config directory on disk.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }
}

impl FileStore for FsStore {
    fn read_file(&self, path: &Path) -> Result<String, EditorError> {
        let full = self.resolve(path);
        fs::read_to_string(&full).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => EditorError::FileNotFound(path.display().to_string()),
            _ => EditorError::io(full, e),
        })
    }

    fn save_file(&self, path: &Path, content: &str) -> Result<(), EditorError> {
        let full = self.resolve(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).map_err(|e| EditorError::io(parent, e))?;
        }
        fs::write(&full, content).map_err(|e| EditorError::io(full, e))
    }

    fn backup_config(&self, path: &Path, backup_directory: &Path) -> Result<PathBuf, EditorError> {
        let source = self.resolve(path);
        let dir = self.resolve(backup_directory);
        fs::create_dir_all(&dir).map_err(|e| EditorError::io(&dir, e))?;

        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S%.3f").to_string();
        let name = backup_file_name(path, &stamp);
        let target = dir.join(&name);
        fs::copy(&source, &target).map_err(|e| EditorError::io(&source, e))?;
        log::info!("backed up {} to {}", source.display(), target.display());
        Ok(backup_directory.join(name))
    }

    fn list_files(&self, dir: &Path) -> Result<Vec<PathBuf>, EditorError> {
        let full = self.resolve(dir);
        let entries = fs::read_dir(&full).map_err(|e| EditorError::io(&full, e))?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| EditorError::io(&full, e))?;
            let path = entry.path();
            if path.is_file() && is_yaml(&path) {
                // Hand back paths in the same form the caller used for `dir`.
                files.push(dir.join(entry.file_name()));
            }
        }
        files.sort();
        Ok(files)
    }

    fn exists(&self, path: &Path) -> bool {
        self.resolve(path).exists()
    }

    fn delete_file(&self, path: &Path) -> Result<(), EditorError> {
        let full = self.resolve(path);
        fs::remove_file(&full).map_err(|e| EditorError::io(full, e))
    }
}
