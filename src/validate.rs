//! Pre-flight checks that reject an operation before any file is touched.

use crate::analyze::{DuplicateKeyAnalysis, MergeDecisions};
use crate::error::EditorError;
use crate::mapping::SectionMapping;

/// Every section in `required` must have at least one mapping entry (its own
/// or a dotted split entry).
pub fn validate_required_sections(
    mapping: &SectionMapping,
    required: &[String],
) -> Result<(), EditorError> {
    let missing: Vec<String> = required
        .iter()
        .filter(|section| mapping.resolve(section).is_empty())
        .cloned()
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(EditorError::MissingSections(missing))
    }
}

/// A duplicate key whose copies conflict can only be combined once the user
/// has explicitly enabled smart merge for it.
pub fn validate_merge_decisions(
    analysis: &DuplicateKeyAnalysis,
    decisions: &MergeDecisions,
) -> Result<(), EditorError> {
    let unresolved: Vec<String> = analysis
        .conflicting_keys()
        .filter(|key| !decisions.is_merge_enabled(key))
        .map(str::to_string)
        .collect();

    if unresolved.is_empty() {
        Ok(())
    } else {
        Err(EditorError::UnresolvedConflicts(unresolved))
    }
}
