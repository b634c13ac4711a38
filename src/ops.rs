//! Result types for editor actions.
//!
//! Every [`EditorAction`](crate::EditorAction) produces an [`EditorResult`]
//! that the caller can inspect or print.

use std::fmt;
use std::path::PathBuf;

use crate::analyze::DuplicateKeyAnalysis;
use crate::file::FileEntry;
use crate::section::{SaveReport, SectionData};

/// Result of an editor action. Returned to the caller for display.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorResult {
    /// YAML files in the config directory.
    Files { entries: Vec<FileEntry> },
    /// Duplicate-key analysis, printed as text or JSON.
    Analysis {
        analysis: DuplicateKeyAnalysis,
        json: bool,
    },
    /// Confirmation that the files were combined.
    Combined {
        target: PathBuf,
        sources: Vec<String>,
        removed: Vec<String>,
        /// Sources kept on disk but emptied of their blocks.
        cleared: Vec<String>,
    },
    /// Confirmation that blocks were split out into new files.
    Split { source: String, created: Vec<String> },
    /// A section's data. `mapped` is false when no file defines the section.
    Section {
        name: String,
        data: SectionData,
        mapped: bool,
    },
    /// Confirmation that a section was saved.
    Saved { section: String, report: SaveReport },
    /// Every required section is present.
    Checked { sections: Vec<String> },
    /// Effective editor settings, rendered as TOML.
    Settings(String),
}

impl fmt::Display for EditorResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditorResult::Files { entries } => {
                for (i, entry) in entries.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{} ({} bytes)", entry.path.display(), entry.size)?;
                }
                Ok(())
            }
            EditorResult::Analysis {
                analysis,
                json: true,
            } => {
                let text = serde_json::to_string_pretty(analysis)
                    .unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"));
                write!(f, "{text}")
            }
            EditorResult::Analysis { analysis, .. } => fmt_analysis(f, analysis),
            EditorResult::Combined {
                target,
                sources,
                removed,
                cleared,
            } => {
                write!(
                    f,
                    "Combined {} files into {}",
                    sources.len(),
                    target.display()
                )?;
                if !removed.is_empty() {
                    write!(f, "\nRemoved {}", removed.join(", "))?;
                }
                if !cleared.is_empty() {
                    write!(f, "\nEmptied {}", cleared.join(", "))?;
                }
                Ok(())
            }
            EditorResult::Split { source, created } => {
                write!(f, "Split {source} into {}", created.join(", "))
            }
            EditorResult::Section { name, data, mapped } => {
                if !mapped {
                    writeln!(f, "# warning: section '{name}' was not found in any file")?;
                }
                if data.is_empty() {
                    return write!(f, "{{}}");
                }
                let text = serde_yaml::to_string(data).unwrap_or_else(|_| format!("{data:?}"));
                write!(f, "{}", text.trim_end())
            }
            EditorResult::Saved { section, report } => {
                if report.written.is_empty() {
                    write!(f, "Section {section} unchanged")?;
                } else {
                    let written: Vec<String> = report
                        .written
                        .iter()
                        .map(|p| p.display().to_string())
                        .collect();
                    write!(f, "Saved {section} to {}", written.join(", "))?;
                }
                for path in &report.backup_failures {
                    write!(f, "\nwarning: no backup was made of {}", path.display())?;
                }
                if !report.unpersisted_keys.is_empty() {
                    write!(
                        f,
                        "\nwarning: not saved (no parent file): {}",
                        report.unpersisted_keys.join(", ")
                    )?;
                }
                Ok(())
            }
            EditorResult::Checked { sections } => {
                write!(f, "All required sections present: {}", sections.join(", "))
            }
            EditorResult::Settings(toml) => write!(f, "{}", toml.trim_end()),
        }
    }
}

fn fmt_analysis(f: &mut fmt::Formatter<'_>, analysis: &DuplicateKeyAnalysis) -> fmt::Result {
    if !analysis.has_duplicates {
        return write!(f, "No duplicate top-level keys");
    }
    for (i, key) in analysis.duplicate_keys.iter().enumerate() {
        if i > 0 {
            writeln!(f)?;
        }
        let Some(detail) = analysis.detail(key) else {
            continue;
        };
        let files: Vec<&str> = detail.files.iter().map(|r| r.file_name.as_str()).collect();
        write!(f, "{key}: {}", files.join(", "))?;
        if detail.can_smart_merge {
            write!(f, " (can merge)")?;
        } else {
            write!(
                f,
                " (conflicts: {})",
                detail.conflicting_second_keys.join(", ")
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::analyze;
    use crate::fixtures::test::{file_set, SPLIT_APPEARANCE};
    use serde_json::json;

    #[test]
    fn analysis_text_lists_files_and_status() {
        let analysis = analyze(&file_set(SPLIT_APPEARANCE));
        let text = EditorResult::Analysis {
            analysis,
            json: false,
        }
        .to_string();
        assert_eq!(text, "appearance: config.yaml, config-ui.yaml (can merge)");
    }

    #[test]
    fn analysis_text_names_conflicts() {
        let analysis = analyze(&file_set(&[
            ("a.yaml", "zwift:\n  level: 1\n"),
            ("b.yaml", "zwift:\n  level: 2\n"),
        ]));
        let text = EditorResult::Analysis {
            analysis,
            json: false,
        }
        .to_string();
        assert!(text.ends_with("(conflicts: level)"));
    }

    #[test]
    fn analysis_json_is_parseable() {
        let analysis = analyze(&file_set(SPLIT_APPEARANCE));
        let text = EditorResult::Analysis {
            analysis,
            json: true,
        }
        .to_string();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["duplicateKeys"][0], "appearance");
    }

    #[test]
    fn no_duplicates_message() {
        let text = EditorResult::Analysis {
            analysis: DuplicateKeyAnalysis::default(),
            json: false,
        }
        .to_string();
        assert_eq!(text, "No duplicate top-level keys");
    }

    #[test]
    fn section_prints_yaml() {
        let data = match json!({"appUrl": "x", "ftp": 250}) {
            serde_json::Value::Object(m) => m,
            _ => unreachable!(),
        };
        let text = EditorResult::Section {
            name: "general".into(),
            data,
            mapped: true,
        }
        .to_string();
        assert_eq!(text, "appUrl: x\nftp: 250");
    }

    #[test]
    fn unmapped_section_warns() {
        let text = EditorResult::Section {
            name: "zwift".into(),
            data: SectionData::new(),
            mapped: false,
        }
        .to_string();
        assert!(text.starts_with("# warning: section 'zwift'"));
        assert!(text.ends_with("{}"));
    }

    #[test]
    fn saved_reports_backup_failures() {
        let report = SaveReport {
            written: vec!["config.yaml".into()],
            backup_failures: vec!["config.yaml".into()],
            ..SaveReport::default()
        };
        let text = EditorResult::Saved {
            section: "general".into(),
            report,
        }
        .to_string();
        assert!(text.starts_with("Saved general to config.yaml"));
        assert!(text.contains("no backup was made of config.yaml"));
    }
}
