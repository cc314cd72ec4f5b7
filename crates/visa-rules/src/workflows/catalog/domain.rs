use serde::{Deserialize, Serialize};

use crate::workflows::rules::{DocumentCategory, RuleSetId};

/// Identifier wrapper for shared catalog entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(pub u64);

/// Deduplicated, destination-agnostic description of a document type.
/// Owned globally; mutated only by catalog maintenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: DocumentId,
    /// Canonical key, already normalized (`bank_statement`, not `Bank Statement`).
    pub document_type: String,
    pub default_category: DocumentCategory,
    pub default_description: String,
}

/// Join between a rule set and a catalog entry, carrying only the deltas
/// specific to that rule set. One reference per (rule_set_id, document_id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentReference {
    pub rule_set_id: RuleSetId,
    pub document_id: DocumentId,
    /// Set only when the rule set's category differs from the catalog default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_override: Option<DocumentCategory>,
    /// Set only when the rule set's description differs from the catalog default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_override: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}
