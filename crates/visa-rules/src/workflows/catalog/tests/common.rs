use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;

use crate::workflows::catalog::domain::{CatalogEntry, DocumentId, DocumentReference};
use crate::workflows::catalog::repository::CatalogRepository;
use crate::workflows::rules::{
    DestinationCode, DocumentCategory, DocumentRule, Provenance, RepositoryError, RuleSet,
    RuleSetId, RuleSetPayload, VisaType,
};

#[derive(Default)]
pub(super) struct InMemoryCatalogRepository {
    entries: Mutex<HashMap<DocumentId, CatalogEntry>>,
    references: Mutex<HashMap<(RuleSetId, DocumentId), DocumentReference>>,
}

impl CatalogRepository for InMemoryCatalogRepository {
    fn upsert_entry(&self, entry: CatalogEntry) -> Result<CatalogEntry, RepositoryError> {
        let mut entries = self.entries.lock().expect("catalog mutex poisoned");
        entries.insert(entry.id, entry.clone());
        Ok(entry)
    }

    fn entry_by_type(&self, document_type: &str) -> Result<Option<CatalogEntry>, RepositoryError> {
        let entries = self.entries.lock().expect("catalog mutex poisoned");
        Ok(entries
            .values()
            .find(|entry| entry.document_type == document_type)
            .cloned())
    }

    fn entry(&self, id: DocumentId) -> Result<Option<CatalogEntry>, RepositoryError> {
        let entries = self.entries.lock().expect("catalog mutex poisoned");
        Ok(entries.get(&id).cloned())
    }

    fn upsert_reference(&self, reference: DocumentReference) -> Result<(), RepositoryError> {
        let mut references = self.references.lock().expect("reference mutex poisoned");
        references.insert((reference.rule_set_id, reference.document_id), reference);
        Ok(())
    }

    fn references_for(
        &self,
        rule_set_id: RuleSetId,
    ) -> Result<Vec<DocumentReference>, RepositoryError> {
        let references = self.references.lock().expect("reference mutex poisoned");
        let mut rows: Vec<DocumentReference> = references
            .values()
            .filter(|reference| reference.rule_set_id == rule_set_id)
            .cloned()
            .collect();
        rows.sort_by_key(|reference| reference.document_id);
        Ok(rows)
    }
}

pub(super) fn seeded_catalog() -> InMemoryCatalogRepository {
    let catalog = InMemoryCatalogRepository::default();
    for (id, document_type, category, description) in [
        (1, "passport", DocumentCategory::Required, "Valid passport"),
        (2, "photo", DocumentCategory::Required, "Passport-sized photograph"),
        (
            3,
            "bank_statement",
            DocumentCategory::HighlyRecommended,
            "Bank statement covering recent months",
        ),
    ] {
        catalog
            .upsert_entry(CatalogEntry {
                id: DocumentId(id),
                document_type: document_type.to_string(),
                default_category: category,
                default_description: description.to_string(),
            })
            .expect("seed entry");
    }
    catalog
}

pub(super) fn rule_set(id: u64, documents: Vec<DocumentRule>) -> RuleSet {
    RuleSet {
        id: RuleSetId(id),
        destination: DestinationCode::new("US"),
        visa_type: VisaType::new("tourist"),
        version: 1,
        payload: RuleSetPayload {
            documents,
            financial: Default::default(),
            processing: Default::default(),
            fees: Default::default(),
            provenance: Provenance {
                source: "https://embassy.example/visa-requirements".to_string(),
                confidence: 0.9,
                extracted_at: Utc::now(),
            },
        },
        is_approved: true,
        review: Default::default(),
        created_at: Utc::now(),
    }
}

pub(super) fn document(
    document_type: &str,
    category: DocumentCategory,
    description: &str,
    condition: Option<&str>,
) -> DocumentRule {
    DocumentRule {
        document_type: document_type.to_string(),
        category,
        description: description.to_string(),
        validity_notes: None,
        condition: condition.map(str::to_string),
    }
}
