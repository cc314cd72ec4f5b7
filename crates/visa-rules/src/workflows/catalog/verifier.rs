use std::collections::BTreeMap;

use serde::Serialize;

use crate::workflows::rules::{
    normalize_document_type, DocumentCategory, RepositoryError, RuleSet, RuleSetId,
};

use super::repository::CatalogRepository;

/// Category disagreement between the embedded entry and its reference row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryMismatch {
    pub document_type: String,
    pub embedded: DocumentCategory,
    pub referenced: DocumentCategory,
}

/// Condition disagreement between the embedded entry and its reference row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConditionMismatch {
    pub document_type: String,
    pub embedded: Option<String>,
    pub referenced: Option<String>,
}

/// Consistency report for one rule set's two document representations.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    pub rule_set_id: RuleSetId,
    /// Document types in the embedded list with no reference row.
    pub missing_in_references: Vec<String>,
    /// Reference rows with no embedded counterpart.
    pub extra_in_references: Vec<String>,
    pub category_mismatches: Vec<CategoryMismatch>,
    pub condition_mismatches: Vec<ConditionMismatch>,
}

impl VerificationReport {
    pub fn is_consistent(&self) -> bool {
        self.missing_in_references.is_empty()
            && self.extra_in_references.is_empty()
            && self.category_mismatches.is_empty()
            && self.condition_mismatches.is_empty()
    }
}

/// Compare a rule set's embedded document list against its reference rows.
///
/// Correctness oracle for the normalization step: read-only, repeatable, no
/// side effects. The effective category of a reference is its override when
/// present, otherwise the catalog default.
pub fn verify_rule_set(
    rule_set: &RuleSet,
    catalog: &dyn CatalogRepository,
) -> Result<VerificationReport, RepositoryError> {
    let mut embedded: BTreeMap<String, (DocumentCategory, Option<String>)> = BTreeMap::new();
    for rule in &rule_set.payload.documents {
        embedded.insert(
            normalize_document_type(&rule.document_type),
            (rule.category, trimmed(rule.condition.as_deref())),
        );
    }

    let mut referenced: BTreeMap<String, (DocumentCategory, Option<String>)> = BTreeMap::new();
    for reference in catalog.references_for(rule_set.id)? {
        let Some(entry) = catalog.entry(reference.document_id)? else {
            // A reference to a vanished catalog entry is itself an
            // inconsistency; report it under the extra bucket by id.
            referenced.insert(
                format!("document#{}", reference.document_id.0),
                (DocumentCategory::Optional, None),
            );
            continue;
        };
        let category = reference.category_override.unwrap_or(entry.default_category);
        referenced.insert(
            entry.document_type.clone(),
            (category, trimmed(reference.condition.as_deref())),
        );
    }

    let mut missing_in_references = Vec::new();
    let mut category_mismatches = Vec::new();
    let mut condition_mismatches = Vec::new();

    for (key, (embedded_category, embedded_condition)) in &embedded {
        let Some((referenced_category, referenced_condition)) = referenced.get(key) else {
            missing_in_references.push(key.clone());
            continue;
        };
        if embedded_category != referenced_category {
            category_mismatches.push(CategoryMismatch {
                document_type: key.clone(),
                embedded: *embedded_category,
                referenced: *referenced_category,
            });
        }
        if embedded_condition != referenced_condition {
            condition_mismatches.push(ConditionMismatch {
                document_type: key.clone(),
                embedded: embedded_condition.clone(),
                referenced: referenced_condition.clone(),
            });
        }
    }

    let extra_in_references = referenced
        .keys()
        .filter(|key| !embedded.contains_key(*key))
        .cloned()
        .collect();

    Ok(VerificationReport {
        rule_set_id: rule_set.id,
        missing_in_references,
        extra_in_references,
        category_mismatches,
        condition_mismatches,
    })
}

fn trimmed(condition: Option<&str>) -> Option<String> {
    condition
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
