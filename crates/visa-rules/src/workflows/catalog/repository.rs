use crate::workflows::rules::{RepositoryError, RuleSetId};

use super::domain::{CatalogEntry, DocumentId, DocumentReference};

/// Storage abstraction for the shared document catalog and the normalized
/// reference rows that join rule sets to it.
pub trait CatalogRepository: Send + Sync {
    /// Maintenance-only: register or replace a canonical entry. The key is
    /// the normalized document type.
    fn upsert_entry(&self, entry: CatalogEntry) -> Result<CatalogEntry, RepositoryError>;

    fn entry_by_type(&self, document_type: &str) -> Result<Option<CatalogEntry>, RepositoryError>;

    fn entry(&self, id: DocumentId) -> Result<Option<CatalogEntry>, RepositoryError>;

    /// Insert-or-replace keyed by (rule_set_id, document_id).
    fn upsert_reference(&self, reference: DocumentReference) -> Result<(), RepositoryError>;

    fn references_for(&self, rule_set_id: RuleSetId)
        -> Result<Vec<DocumentReference>, RepositoryError>;
}
