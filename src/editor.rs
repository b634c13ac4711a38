use std::path::{Path, PathBuf};

use crate::analyze::{self, DuplicateKeyAnalysis, MergeDecisions};
use crate::error::EditorError;
use crate::file;
use crate::mapping::SectionMapping;
use crate::ops::EditorResult;
use crate::persist;
use crate::rewrite;
use crate::section::{self, SaveOptions, SaveReport, SectionData};
use crate::settings::EditorSettings;
use crate::store::{FileStore, FsStore};
use crate::types::{ConfigFile, EditorAction};
use crate::validate;

/// Stateful front end over one config directory.
///
/// Holds the loaded files and the section mapping derived from them (or
/// supplied with [`with_mapping`](Self::with_mapping)). Every write takes
/// `&mut self`, so at most one save or combine is in flight per editor, and
/// each one reloads the file set when it finishes.
pub struct ConfigEditor<S: FileStore = FsStore> {
    store: S,
    settings: EditorSettings,
    files: Vec<ConfigFile>,
    mapping: SectionMapping,
    external_mapping: bool,
}

impl ConfigEditor<FsStore> {
    /// Open the config directory named by `settings`.
    pub fn open(settings: EditorSettings) -> Result<Self, EditorError> {
        let store = FsStore::new(&settings.config_directory);
        Self::with_store(store, settings)
    }
}

impl<S: FileStore> ConfigEditor<S> {
    /// Open an editor over an arbitrary store and load its files.
    pub fn with_store(store: S, settings: EditorSettings) -> Result<Self, EditorError> {
        let mut editor = Self {
            store,
            settings,
            files: Vec::new(),
            mapping: SectionMapping::new(),
            external_mapping: false,
        };
        editor.refresh()?;
        Ok(editor)
    }

    /// Use `mapping` instead of deriving one from the files.
    pub fn with_mapping(mut self, mapping: SectionMapping) -> Self {
        self.mapping = mapping;
        self.external_mapping = true;
        self
    }

    /// Reload every file; re-derive the mapping unless one was supplied.
    pub fn refresh(&mut self) -> Result<(), EditorError> {
        self.files = file::load_config_files(&self.store, Path::new(""))?;
        if !self.external_mapping {
            self.mapping = SectionMapping::from_files(&self.files);
        }
        Ok(())
    }

    pub fn files(&self) -> &[ConfigFile] {
        &self.files
    }

    pub fn mapping(&self) -> &SectionMapping {
        &self.mapping
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn analyze(&self) -> DuplicateKeyAnalysis {
        analyze::analyze(&self.files)
    }

    /// Default merge decisions for the current files.
    pub fn default_decisions(&self) -> MergeDecisions {
        MergeDecisions::defaults(&self.files, &self.analyze())
    }

    /// Build decisions from defaults plus `(key, file name)` primary overrides
    /// and explicit merge toggles.
    pub fn decisions_from(
        &self,
        primary: &[(String, String)],
        merge: &[String],
        no_merge: &[String],
    ) -> Result<MergeDecisions, EditorError> {
        let mut decisions = self.default_decisions();
        for (key, name) in primary {
            let index = self
                .files
                .iter()
                .position(|f| f.name == *name || f.base_name() == name)
                .ok_or_else(|| EditorError::InvalidArgument {
                    arg: format!("--primary {key}={name}"),
                    reason: format!("no loaded file is named {name}"),
                })?;
            decisions.set_primary(key, index);
        }
        for key in merge {
            decisions.set_smart_merge(key, true);
        }
        for key in no_merge {
            decisions.set_smart_merge(key, false);
        }
        Ok(decisions)
    }

    /// Whether any mapping entry covers `section`.
    pub fn is_mapped(&self, section: &str) -> bool {
        !self.mapping.resolve(section).is_empty()
    }

    pub fn load_section_data(&self, section: &str) -> SectionData {
        section::load_section(section, &self.mapping, &self.store)
    }

    /// Save a section, then reload the file set.
    pub fn save_section_data(
        &mut self,
        section: &str,
        data: &SectionData,
    ) -> Result<SaveReport, EditorError> {
        let options = SaveOptions {
            backup_directory: self.settings.backup_directory(),
        };
        let report = section::save_section(section, data, &self.mapping, &self.store, options)?;
        if let Err(e) = self.refresh() {
            log::warn!("saved {section} but could not reload files: {e}");
        }
        Ok(report)
    }

    /// Merge every file into the combine target.
    ///
    /// Decisions are validated before anything is written. Sources are backed
    /// up first (best effort). Every source other than the target is then
    /// deleted (`remove_sources`) or stripped of its top-level blocks, so the
    /// directory ends up defining each key once.
    pub fn combine_all(&mut self, decisions: &MergeDecisions) -> Result<EditorResult, EditorError> {
        let combined = rewrite::combine_files(&self.files, decisions)?;
        let target = PathBuf::from(&self.settings.combine.target_file);
        let sources: Vec<String> = self.files.iter().map(|f| f.name.clone()).collect();

        self.backup_all(sources.iter().map(PathBuf::from));
        self.store.save_file(&target, &combined)?;
        log::info!("combined {} files into {}", sources.len(), target.display());

        let mut removed = Vec::new();
        let mut cleared = Vec::new();
        for file in self.files.iter().filter(|f| Path::new(&f.name) != target) {
            let path = Path::new(&file.name);
            if self.settings.combine.remove_sources {
                self.store.delete_file(path)?;
                removed.push(file.name.clone());
            } else {
                let stripped = rewrite::strip_top_level_blocks(&file.content);
                if stripped != file.content {
                    self.store.save_file(path, &stripped)?;
                    cleared.push(file.name.clone());
                }
            }
        }

        self.refresh()?;
        Ok(EditorResult::Combined {
            target,
            sources,
            removed,
            cleared,
        })
    }

    /// Move the blocks for `keys` out of the loaded file `name` into their
    /// own files. Refuses to overwrite an existing file.
    pub fn split_file(&mut self, name: &str, keys: &[String]) -> Result<EditorResult, EditorError> {
        let source = self
            .files
            .iter()
            .find(|f| f.name == name || f.base_name() == name)
            .ok_or_else(|| EditorError::FileNotFound(name.to_string()))?;
        let outcome = rewrite::split_sections(source, keys)?;

        if let Some(taken) = outcome
            .extracted
            .iter()
            .find(|f| self.store.exists(Path::new(&f.name)))
        {
            return Err(EditorError::InvalidArgument {
                arg: taken.name.clone(),
                reason: "file already exists".into(),
            });
        }

        self.backup_all(std::iter::once(PathBuf::from(&outcome.remaining.name)));
        let mut created = Vec::with_capacity(outcome.extracted.len());
        for extracted in &outcome.extracted {
            self.store
                .save_file(Path::new(&extracted.name), &extracted.content)?;
            created.push(extracted.name.clone());
        }
        self.store.save_file(
            Path::new(&outcome.remaining.name),
            &outcome.remaining.content,
        )?;

        self.refresh()?;
        Ok(EditorResult::Split {
            source: outcome.remaining.name,
            created,
        })
    }

    /// Every required section must be covered by the mapping.
    pub fn check(&self) -> Result<EditorResult, EditorError> {
        validate::validate_required_sections(&self.mapping, &self.settings.required_sections)?;
        Ok(EditorResult::Checked {
            sections: self.settings.required_sections.clone(),
        })
    }

    fn backup_all(&self, paths: impl Iterator<Item = PathBuf>) {
        let Some(dir) = self.settings.backup_directory() else {
            return;
        };
        for path in paths {
            if let Err(e) = self.store.backup_config(&path, dir) {
                log::warn!("backup of {} failed, continuing: {e}", path.display());
            }
        }
    }

    /// Handle an `EditorAction` and print the result to stdout.
    pub fn handle_and_print(&mut self, action: &EditorAction) -> Result<(), EditorError> {
        let result = self.handle(action)?;
        println!("{result}");
        Ok(())
    }

    /// Handle an `EditorAction`.
    pub fn handle(&mut self, action: &EditorAction) -> Result<EditorResult, EditorError> {
        match action {
            EditorAction::Files => Ok(EditorResult::Files {
                entries: file::entries(&self.files),
            }),
            EditorAction::Analyze { json } => Ok(EditorResult::Analysis {
                analysis: self.analyze(),
                json: *json,
            }),
            EditorAction::Combine {
                primary,
                merge,
                no_merge,
            } => {
                let decisions = self.decisions_from(primary, merge, no_merge)?;
                self.combine_all(&decisions)
            }
            EditorAction::Split { file, keys } => self.split_file(file, keys),
            EditorAction::Get { section } => Ok(EditorResult::Section {
                name: section.clone(),
                data: self.load_section_data(section),
                mapped: self.is_mapped(section),
            }),
            EditorAction::Set { section, input } => {
                let data = read_section_input(input)?;
                let report = self.save_section_data(section, &data)?;
                Ok(EditorResult::Saved {
                    section: section.clone(),
                    report,
                })
            }
            EditorAction::Check => self.check(),
            EditorAction::Settings => {
                let rendered =
                    toml::to_string(&self.settings).map_err(|e| EditorError::InvalidArgument {
                        arg: "settings".into(),
                        reason: e.to_string(),
                    })?;
                Ok(EditorResult::Settings(rendered))
            }
        }
    }
}

/// Read a section payload from a YAML or JSON file outside the config
/// directory. The document root must be an object.
fn read_section_input(path: &Path) -> Result<SectionData, EditorError> {
    let content = std::fs::read_to_string(path).map_err(|e| EditorError::io(path, e))?;
    persist::parse_document(&content, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::{RecordingStore, StoreOp, SPLIT_APPEARANCE};
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn settings() -> EditorSettings {
        EditorSettings::from_files(&[]).unwrap()
    }

    fn editor(specs: &[(&str, &str)]) -> ConfigEditor<RecordingStore> {
        ConfigEditor::with_store(RecordingStore::with_files(specs), settings()).unwrap()
    }

    fn obj(value: serde_json::Value) -> SectionData {
        match value {
            serde_json::Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn derives_mapping_from_files() {
        let editor = editor(&[
            ("config.yaml", "general:\n  appUrl: x\nappearance:\n  locale: en\n"),
            ("config-zwift.yaml", "zwift:\n  level: 3\n"),
        ]);
        assert_eq!(editor.files().len(), 2);
        assert!(editor.is_mapped("zwift"));
        assert_eq!(editor.load_section_data("zwift"), obj(json!({"level": 3})));
    }

    #[test]
    fn explicit_mapping_survives_refresh() {
        let mut mapping = SectionMapping::new();
        mapping.insert(
            "general",
            crate::mapping::MappingEntry::File("other.yaml".into()),
        );
        let mut editor = editor(&[("config.yaml", "general:\n  a: 1\n")]).with_mapping(mapping);
        editor.refresh().unwrap();
        assert_eq!(editor.mapping().len(), 1);
        assert_eq!(
            editor.mapping().get("general").unwrap().file_path(),
            "other.yaml"
        );
    }

    #[test]
    fn get_unmapped_section_is_empty() {
        let mut editor = editor(&[("config.yaml", "general:\n  a: 1\n")]);
        let result = editor
            .handle(&EditorAction::Get {
                section: "zwift".into(),
            })
            .unwrap();
        assert_eq!(
            result,
            EditorResult::Section {
                name: "zwift".into(),
                data: SectionData::new(),
                mapped: false,
            }
        );
    }

    #[test]
    fn save_backs_up_and_reloads() {
        let mut editor = editor(&[("config.yaml", "general:\n  appUrl: x\n")]);
        let report = editor
            .save_section_data("general", &obj(json!({"appUrl": "newhost"})))
            .unwrap();
        assert_eq!(report.written, vec![PathBuf::from("config.yaml")]);
        assert_eq!(report.backups.len(), 1);
        assert_eq!(editor.files()[0].content, "general:\n  appUrl: newhost\n");
    }

    const THREE_FILES: &[(&str, &str)] = &[
        ("config.yaml", "appearance:\n  theme: dark\n"),
        ("config-ui.yaml", "# UI overrides\nappearance:\n  widgetOrder: [a,b]\n"),
        ("config-zwift.yaml", "zwift:\n  level: 3\n"),
    ];

    #[test]
    fn combine_removes_sources_by_default() {
        let mut editor = editor(THREE_FILES);
        let decisions = editor.default_decisions();
        let result = editor.combine_all(&decisions).unwrap();

        let EditorResult::Combined {
            target,
            removed,
            cleared,
            ..
        } = result
        else {
            panic!("unexpected result");
        };
        assert_eq!(target, PathBuf::from("config.yaml"));
        assert_eq!(removed, vec!["config-ui.yaml", "config-zwift.yaml"]);
        assert!(cleared.is_empty());

        let combined = editor.store().content("config.yaml").unwrap();
        assert!(combined.contains("theme: dark"));
        assert!(combined.contains("widgetOrder: [a,b]"));
        assert!(combined.contains("level: 3"));
        assert!(editor.store().content("config-ui.yaml").is_none());
        assert!(
            editor
                .store()
                .ops()
                .contains(&StoreOp::Delete("config-ui.yaml".into()))
        );
        assert_eq!(editor.files().len(), 1);
        assert!(!editor.analyze().has_duplicates);
    }

    #[test]
    fn combine_keeping_sources_empties_them() {
        let mut settings = settings();
        settings.combine.remove_sources = false;
        let store = RecordingStore::with_files(THREE_FILES);
        let mut editor = ConfigEditor::with_store(store, settings).unwrap();
        let decisions = editor.default_decisions();
        let result = editor.combine_all(&decisions).unwrap();

        let EditorResult::Combined {
            removed, cleared, ..
        } = result
        else {
            panic!("unexpected result");
        };
        assert!(removed.is_empty());
        assert_eq!(cleared, vec!["config-ui.yaml", "config-zwift.yaml"]);
        assert_eq!(
            editor.store().content("config-ui.yaml").unwrap(),
            "# UI overrides\n"
        );
        assert_eq!(editor.store().content("config-zwift.yaml").unwrap(), "");
        assert!(!editor.analyze().has_duplicates);
        assert!(editor.is_mapped("zwift"));

        // A second combine has nothing left to conflict on.
        let decisions = editor.default_decisions();
        assert!(editor.combine_all(&decisions).is_ok());
        assert!(!editor.analyze().has_duplicates);
    }

    #[test]
    fn combine_with_unresolved_conflict_writes_nothing() {
        let mut editor = editor(&[
            ("config.yaml", "appearance:\n  theme: dark\n"),
            ("config-ui.yaml", "appearance:\n  theme: light\n"),
        ]);
        let err = editor
            .handle(&EditorAction::Combine {
                primary: vec![],
                merge: vec![],
                no_merge: vec![],
            })
            .unwrap_err();
        assert!(matches!(err, EditorError::UnresolvedConflicts(_)));
        assert!(editor.store().saves().is_empty());
    }

    #[test]
    fn primary_override_by_file_name() {
        let editor = editor(SPLIT_APPEARANCE);
        let decisions = editor
            .decisions_from(
                &[("appearance".into(), "config-ui.yaml".into())],
                &[],
                &["appearance".into()],
            )
            .unwrap();
        let ui = editor
            .files()
            .iter()
            .position(|f| f.name == "config-ui.yaml")
            .unwrap();
        assert_eq!(decisions.primary_file_per_key["appearance"], ui);
        assert!(!decisions.is_merge_enabled("appearance"));
    }

    #[test]
    fn primary_override_with_unknown_file_errors() {
        let editor = editor(SPLIT_APPEARANCE);
        let err = editor
            .decisions_from(&[("appearance".into(), "nope.yaml".into())], &[], &[])
            .unwrap_err();
        assert!(matches!(err, EditorError::InvalidArgument { .. }));
    }

    #[test]
    fn split_writes_new_files() {
        let mut editor = editor(&[(
            "config.yaml",
            "general:\n  a: 1\nzwift:\n  level: 3\n",
        )]);
        let result = editor.split_file("config.yaml", &["zwift".into()]).unwrap();
        assert_eq!(
            result,
            EditorResult::Split {
                source: "config.yaml".into(),
                created: vec!["config-zwift.yaml".into()],
            }
        );
        assert_eq!(
            editor.store().content("config.yaml").unwrap(),
            "general:\n  a: 1\n"
        );
        assert_eq!(
            editor.store().content("config-zwift.yaml").unwrap(),
            "zwift:\n  level: 3\n"
        );
        assert!(editor.is_mapped("zwift"));
    }

    #[test]
    fn split_refuses_to_overwrite() {
        let mut editor = editor(&[
            ("config.yaml", "zwift:\n  level: 3\n"),
            ("config-zwift.yaml", "other: 1\n"),
        ]);
        let err = editor
            .split_file("config.yaml", &["zwift".into()])
            .unwrap_err();
        assert!(matches!(err, EditorError::InvalidArgument { .. }));
        assert!(editor.store().saves().is_empty());
    }

    #[test]
    fn check_reports_missing_sections() {
        let editor = editor(&[("config.yaml", "general:\n  a: 1\n")]);
        let err = editor.check().unwrap_err();
        assert!(
            matches!(err, EditorError::MissingSections(ref m) if m == &["appearance", "import"])
        );
    }

    #[test]
    fn set_reads_payload_file() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("general.json");
        fs::write(&input, r#"{"appUrl": "http://new"}"#).unwrap();

        let mut editor = editor(&[("config.yaml", "general:\n  appUrl: x\n")]);
        let result = editor
            .handle(&EditorAction::Set {
                section: "general".into(),
                input,
            })
            .unwrap();
        assert!(matches!(result, EditorResult::Saved { .. }));
        assert_eq!(
            editor.load_section_data("general"),
            obj(json!({"appUrl": "http://new"}))
        );
    }

    #[test]
    fn settings_render_as_toml() {
        let mut editor = editor(&[]);
        let result = editor.handle(&EditorAction::Settings).unwrap();
        let EditorResult::Settings(rendered) = result else {
            panic!("unexpected result");
        };
        assert!(rendered.contains("config_directory = \"config/app\""));
        assert!(rendered.contains("[combine]"));
        assert!(rendered.contains("target_file = \"config.yaml\""));
    }

    #[test]
    fn opens_directory_on_disk() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("config.yaml"), "general:\n  a: 1\n").unwrap();
        let mut settings = settings();
        settings.config_directory = dir.path().to_path_buf();

        let mut editor = ConfigEditor::open(settings).unwrap();
        editor
            .save_section_data("general", &obj(json!({"a": 2})))
            .unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("config.yaml")).unwrap(),
            "general:\n  a: 2\n"
        );
        assert!(dir.path().join("backups").is_dir());
    }
}
