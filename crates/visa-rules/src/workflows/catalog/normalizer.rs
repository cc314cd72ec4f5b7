use serde::Serialize;
use tracing::warn;

use crate::workflows::rules::{normalize_document_type, RepositoryError, RuleSet, RuleSetId};

use super::domain::DocumentReference;
use super::repository::CatalogRepository;

/// An embedded document entry that could not be resolved against the catalog.
/// Reported, never dropped and never fabricated into the catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnresolvedDocument {
    pub document_type: String,
}

/// Outcome of normalizing one rule set's embedded list into references.
#[derive(Debug, Clone, Serialize)]
pub struct NormalizationReport {
    pub rule_set_id: RuleSetId,
    pub normalized: Vec<DocumentReference>,
    pub unresolved: Vec<UnresolvedDocument>,
}

impl NormalizationReport {
    pub fn fully_resolved(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Convert a rule set's embedded document list into catalog references.
///
/// For each entry the catalog is consulted by normalized document type;
/// overrides are computed only where the entry deviates from the catalog
/// default, and the condition carries through unchanged. References are
/// upserted keyed by (rule_set_id, document_id), so re-running normalization
/// converges instead of duplicating rows.
pub fn normalize_rule_set(
    rule_set: &RuleSet,
    catalog: &dyn CatalogRepository,
) -> Result<NormalizationReport, RepositoryError> {
    let mut normalized = Vec::new();
    let mut unresolved = Vec::new();

    for rule in &rule_set.payload.documents {
        let key = normalize_document_type(&rule.document_type);
        let Some(entry) = catalog.entry_by_type(&key)? else {
            warn!(
                rule_set = rule_set.id.0,
                document_type = %key,
                "document type absent from catalog; left unresolved"
            );
            unresolved.push(UnresolvedDocument { document_type: key });
            continue;
        };

        let category_override = (rule.category != entry.default_category).then_some(rule.category);
        let description_override = (rule.description.trim() != entry.default_description.trim())
            .then(|| rule.description.clone());

        let reference = DocumentReference {
            rule_set_id: rule_set.id,
            document_id: entry.id,
            category_override,
            description_override,
            condition: rule.condition.clone(),
        };
        catalog.upsert_reference(reference.clone())?;
        normalized.push(reference);
    }

    Ok(NormalizationReport {
        rule_set_id: rule_set.id,
        normalized,
        unresolved,
    })
}

/// Batch normalization with per-rule-set fault isolation: one rule set's
/// failure (or unresolvable entries) never aborts the rest.
pub fn normalize_batch(
    rule_sets: &[RuleSet],
    catalog: &dyn CatalogRepository,
) -> Vec<(RuleSetId, Result<NormalizationReport, RepositoryError>)> {
    rule_sets
        .iter()
        .map(|rule_set| (rule_set.id, normalize_rule_set(rule_set, catalog)))
        .collect()
}
