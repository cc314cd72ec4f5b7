use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{
    normalize_document_type, DocumentCategory, DocumentRule, FeeSchedule, FinancialRequirements,
    ProcessingRequirements, RuleSetPayload,
};

/// Old/new pair for a single changed field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange<T> {
    pub previous: T,
    pub current: T,
}

/// A document present in both payloads whose category and/or condition
/// changed. Only changed fields carry a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentModification {
    pub document_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<FieldChange<DocumentCategory>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<FieldChange<Option<String>>>,
}

/// Structural comparison between a candidate payload and the approved one.
///
/// Advisory input to the human approval decision; computing a diff never
/// mutates stored state. Section diffs are present only when some sub-field
/// differs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSetDiff {
    pub added_documents: Vec<DocumentRule>,
    pub removed_documents: Vec<DocumentRule>,
    pub modified_documents: Vec<DocumentModification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub financial: Option<FieldChange<FinancialRequirements>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing: Option<FieldChange<ProcessingRequirements>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fees: Option<FieldChange<FeeSchedule>>,
}

impl RuleSetDiff {
    pub fn is_empty(&self) -> bool {
        self.added_documents.is_empty()
            && self.removed_documents.is_empty()
            && self.modified_documents.is_empty()
            && self.financial.is_none()
            && self.processing.is_none()
            && self.fees.is_none()
    }
}

/// Data-quality failures surfaced by the diff engine.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DiffError {
    /// One payload lists the same document type twice with conflicting
    /// category or condition. The engine refuses to pick one silently.
    #[error("payload lists '{document_type}' more than once with conflicting category or condition")]
    ConflictingDocumentEntries { document_type: String },
}

/// Refuse a payload whose document list carries the same type twice with a
/// conflicting category or condition. The write path runs this before a
/// version is created so the conflict never reaches an approved rule set.
pub fn ensure_consistent_documents(payload: &RuleSetPayload) -> Result<(), DiffError> {
    index_documents(&payload.documents).map(|_| ())
}

/// Diff a candidate payload against the currently approved payload for the
/// same pair. With no approved payload everything lands in `added_documents`.
pub fn diff_payloads(
    candidate: &RuleSetPayload,
    approved: Option<&RuleSetPayload>,
) -> Result<RuleSetDiff, DiffError> {
    let candidate_docs = index_documents(&candidate.documents)?;
    let approved_docs = match approved {
        Some(payload) => index_documents(&payload.documents)?,
        None => BTreeMap::new(),
    };

    let mut added_documents = Vec::new();
    let mut modified_documents = Vec::new();
    for (key, rule) in &candidate_docs {
        match approved_docs.get(key) {
            None => added_documents.push((*rule).clone()),
            Some(previous) => {
                if let Some(modification) = compare_documents(key, previous, rule) {
                    modified_documents.push(modification);
                }
            }
        }
    }

    let removed_documents = approved_docs
        .iter()
        .filter(|(key, _)| !candidate_docs.contains_key(*key))
        .map(|(_, rule)| (*rule).clone())
        .collect();

    let (financial, processing, fees) = match approved {
        Some(payload) => (
            section_change(&payload.financial, &candidate.financial),
            section_change(&payload.processing, &candidate.processing),
            section_change(&payload.fees, &candidate.fees),
        ),
        None => (None, None, None),
    };

    Ok(RuleSetDiff {
        added_documents,
        removed_documents,
        modified_documents,
        financial,
        processing,
        fees,
    })
}

fn index_documents(
    documents: &[DocumentRule],
) -> Result<BTreeMap<String, &DocumentRule>, DiffError> {
    let mut index: BTreeMap<String, &DocumentRule> = BTreeMap::new();
    for rule in documents {
        let key = normalize_document_type(&rule.document_type);
        if let Some(existing) = index.get(&key) {
            // Exact duplicates collapse; conflicting ones are a data-quality
            // error the reviewer has to see.
            if existing.category != rule.category
                || normalized_condition(existing) != normalized_condition(rule)
            {
                return Err(DiffError::ConflictingDocumentEntries { document_type: key });
            }
            continue;
        }
        index.insert(key, rule);
    }
    Ok(index)
}

fn compare_documents(
    key: &str,
    previous: &DocumentRule,
    current: &DocumentRule,
) -> Option<DocumentModification> {
    let category = (previous.category != current.category).then(|| FieldChange {
        previous: previous.category,
        current: current.category,
    });
    let condition = (normalized_condition(previous) != normalized_condition(current)).then(|| {
        FieldChange {
            previous: normalized_condition(previous),
            current: normalized_condition(current),
        }
    });

    if category.is_none() && condition.is_none() {
        return None;
    }

    Some(DocumentModification {
        document_type: key.to_string(),
        category,
        condition,
    })
}

fn normalized_condition(rule: &DocumentRule) -> Option<String> {
    rule.condition
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn section_change<T: Clone + PartialEq>(previous: &T, current: &T) -> Option<FieldChange<T>> {
    (previous != current).then(|| FieldChange {
        previous: previous.clone(),
        current: current.clone(),
    })
}
