use chrono::{DateTime, Utc};

use crate::workflows::rules::RepositoryError;

use super::domain::{ApplicationId, GeneratedChecklist};

/// Storage abstraction for per-application checklists. One row per
/// application; regeneration replaces the row rather than appending.
pub trait ChecklistRepository: Send + Sync {
    fn fetch(&self, id: &ApplicationId) -> Result<Option<GeneratedChecklist>, RepositoryError>;

    /// Insert-or-replace keyed by application id. The service only calls
    /// this for explicit state transitions (processing, ready, failed).
    fn upsert(&self, checklist: GeneratedChecklist) -> Result<(), RepositoryError>;

    /// Checklists created at or after the cutoff, for metrics windows.
    fn created_since(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<GeneratedChecklist>, RepositoryError>;
}
