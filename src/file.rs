//! File discovery: the YAML files of the config directory, and the editor's
//! own settings files.
//!
//! Each [`SearchPath`] resolves to one directory. Settings files are looked up
//! as `{dir}/{file_name}` in every directory, in priority-ascending order
//! (last = highest). Missing files are silently skipped.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::EditorError;
use crate::store::FileStore;
use crate::types::{ConfigFile, SearchPath};

/// Resolve a [`SearchPath`] to a concrete directory.
///
/// Returns `None` if the path cannot be resolved (no platform config directory).
pub fn resolve_search_path(sp: &SearchPath, app_name: &str) -> Option<PathBuf> {
    match sp {
        SearchPath::Platform => {
            let proj = directories::ProjectDirs::from("", "", app_name)?;
            Some(proj.config_dir().to_path_buf())
        }
        SearchPath::Cwd => std::env::current_dir().ok(),
        SearchPath::Path(p) => Some(p.clone()),
    }
}

/// Existing `{dir}/{file_name}` files along `search_paths`, priority-ascending.
pub fn find_settings_files(
    search_paths: &[SearchPath],
    file_name: &str,
    app_name: &str,
) -> Vec<PathBuf> {
    search_paths
        .iter()
        .filter_map(|sp| resolve_search_path(sp, app_name))
        .map(|dir| dir.join(file_name))
        .filter(|path| path.is_file())
        .collect()
}

/// A YAML file in the config directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub path: PathBuf,
    pub size: usize,
}

/// Read every YAML file in `dir` into a [`ConfigFile`], sorted by name.
///
/// A file that can't be read aborts the scan: a partial file set would make
/// duplicate analysis and combining silently wrong.
pub fn load_config_files<S: FileStore + ?Sized>(
    store: &S,
    dir: &Path,
) -> Result<Vec<ConfigFile>, EditorError> {
    let paths = store.list_files(dir)?;
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let content = store.read_file(&path)?;
        files.push(ConfigFile::new(path.to_string_lossy(), content));
    }
    log::debug!("loaded {} config files from {}", files.len(), dir.display());
    Ok(files)
}

/// Name and byte size of each loaded file.
pub fn entries(files: &[ConfigFile]) -> Vec<FileEntry> {
    files
        .iter()
        .map(|f| FileEntry {
            path: PathBuf::from(&f.name),
            size: f.size(),
        })
        .collect()
}
