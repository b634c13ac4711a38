#[cfg(test)]
pub mod test {
    use std::cell::{Cell, RefCell};
    use std::collections::{BTreeMap, BTreeSet};
    use std::path::{Path, PathBuf};

    use crate::error::EditorError;
    use crate::store::{self, FileStore};
    use crate::types::ConfigFile;

    pub const SPLIT_APPEARANCE: &[(&str, &str)] = &[
        ("config.yaml", "appearance:\n  theme: dark\n"),
        ("config-ui.yaml", "appearance:\n  widgetOrder: [a,b]\n"),
    ];

    pub fn file_set(specs: &[(&str, &str)]) -> Vec<ConfigFile> {
        specs
            .iter()
            .map(|(name, content)| ConfigFile::new(*name, *content))
            .collect()
    }

    /// One observed store call, in call order.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum StoreOp {
        Read(PathBuf),
        Save(PathBuf),
        Backup(PathBuf),
        Delete(PathBuf),
    }

    /// In-memory [`FileStore`] that records every call and can be told to fail.
    #[derive(Default)]
    pub struct RecordingStore {
        files: RefCell<BTreeMap<PathBuf, String>>,
        ops: RefCell<Vec<StoreOp>>,
        failing_saves: RefCell<BTreeSet<PathBuf>>,
        failing_backups: Cell<bool>,
        lost_backups: Cell<bool>,
    }

    impl RecordingStore {
        pub fn with_files(specs: &[(&str, &str)]) -> Self {
            let store = Self::default();
            for (name, content) in specs {
                store
                    .files
                    .borrow_mut()
                    .insert(PathBuf::from(name), content.to_string());
            }
            store
        }

        pub fn fail_save_of(&self, path: &str) {
            self.failing_saves.borrow_mut().insert(PathBuf::from(path));
        }

        pub fn fail_backups(&self) {
            self.failing_backups.set(true);
        }

        /// Backups report success but never land in the store.
        pub fn lose_backups(&self) {
            self.lost_backups.set(true);
        }

        pub fn content(&self, path: &str) -> Option<String> {
            self.files.borrow().get(Path::new(path)).cloned()
        }

        pub fn ops(&self) -> Vec<StoreOp> {
            self.ops.borrow().clone()
        }

        pub fn saves(&self) -> Vec<PathBuf> {
            self.ops()
                .into_iter()
                .filter_map(|op| match op {
                    StoreOp::Save(p) => Some(p),
                    _ => None,
                })
                .collect()
        }

        fn record(&self, op: StoreOp) {
            self.ops.borrow_mut().push(op);
        }
    }

    impl FileStore for RecordingStore {
        fn read_file(&self, path: &Path) -> Result<String, EditorError> {
            self.record(StoreOp::Read(path.to_path_buf()));
            self.files
                .borrow()
                .get(path)
                .cloned()
                .ok_or_else(|| EditorError::FileNotFound(path.display().to_string()))
        }

        fn save_file(&self, path: &Path, content: &str) -> Result<(), EditorError> {
            self.record(StoreOp::Save(path.to_path_buf()));
            if self.failing_saves.borrow().contains(path) {
                return Err(EditorError::io(
                    path,
                    std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
                ));
            }
            self.files
                .borrow_mut()
                .insert(path.to_path_buf(), content.to_string());
            Ok(())
        }

        fn backup_config(
            &self,
            path: &Path,
            backup_directory: &Path,
        ) -> Result<PathBuf, EditorError> {
            self.record(StoreOp::Backup(path.to_path_buf()));
            if self.failing_backups.get() {
                return Err(EditorError::io(
                    backup_directory,
                    std::io::Error::other("disk full"),
                ));
            }
            let content = self
                .files
                .borrow()
                .get(path)
                .cloned()
                .ok_or_else(|| EditorError::FileNotFound(path.display().to_string()))?;
            let target = backup_directory.join(store::backup_file_name(path, "test"));
            if !self.lost_backups.get() {
                self.files.borrow_mut().insert(target.clone(), content);
            }
            Ok(target)
        }

        fn list_files(&self, dir: &Path) -> Result<Vec<PathBuf>, EditorError> {
            Ok(self
                .files
                .borrow()
                .keys()
                .filter(|p| p.parent() == Some(dir) && store::is_yaml(p))
                .cloned()
                .collect())
        }

        fn exists(&self, path: &Path) -> bool {
            self.files.borrow().contains_key(path)
        }

        fn delete_file(&self, path: &Path) -> Result<(), EditorError> {
            self.record(StoreOp::Delete(path.to_path_buf()));
            self.files
                .borrow_mut()
                .remove(path)
                .map(|_| ())
                .ok_or_else(|| EditorError::FileNotFound(path.display().to_string()))
        }
    }

    #[test]
    fn recording_store_tracks_calls() {
        let store = RecordingStore::with_files(&[("config.yaml", "a: 1\n")]);
        store.read_file(Path::new("config.yaml")).unwrap();
        store.save_file(Path::new("config.yaml"), "a: 2\n").unwrap();
        assert_eq!(
            store.ops(),
            vec![
                StoreOp::Read(PathBuf::from("config.yaml")),
                StoreOp::Save(PathBuf::from("config.yaml")),
            ]
        );
        assert_eq!(store.content("config.yaml").unwrap(), "a: 2\n");
    }

    #[test]
    fn recording_store_lists_root_files() {
        let store = RecordingStore::with_files(&[
            ("config.yaml", ""),
            ("backups/config.test.yaml", ""),
        ]);
        assert_eq!(
            store.list_files(Path::new("")).unwrap(),
            vec![PathBuf::from("config.yaml")]
        );
    }
}
