use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::info;

use super::diff::{ensure_consistent_documents, DiffError};
use super::domain::{DestinationCode, RuleSet, RuleSetId, RuleSetPayload, RuleVersionRecord, VisaType};
use super::repository::{ApprovalOutcome, RepositoryError, RuleSetRepository};

type PairKey = (DestinationCode, VisaType);

/// Read-through cache over the approved version per pair. Each invalidation
/// bumps the pair's epoch; a miss records the epoch before the repository
/// read and publishes its result only if the epoch is unchanged, so a read
/// that raced an approval cannot re-insert the superseded version.
#[derive(Default)]
struct ApprovedCache {
    entries: HashMap<PairKey, Arc<RuleSet>>,
    epochs: HashMap<PairKey, u64>,
}

impl ApprovedCache {
    fn epoch(&self, key: &PairKey) -> u64 {
        self.epochs.get(key).copied().unwrap_or(0)
    }
}

/// Versioned rule set store with a read-through cache over the approved
/// version per (destination, visa type) pair.
///
/// The cache only ever holds approved versions and is dropped for a pair on
/// any approve or reject touching it, so readers never observe a stale
/// approval after a transition completes.
pub struct RuleStore<R> {
    repository: Arc<R>,
    approved_cache: Mutex<ApprovedCache>,
}

impl<R> RuleStore<R>
where
    R: RuleSetRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self {
            repository,
            approved_cache: Mutex::new(ApprovedCache::default()),
        }
    }

    /// Currently approved rule set for a pair, if any. Absence is an
    /// expected condition handled by the checklist generator's fallback
    /// tiers, never an error.
    pub fn get_approved(
        &self,
        destination: &DestinationCode,
        visa_type: &VisaType,
    ) -> Result<Option<Arc<RuleSet>>, RuleStoreError> {
        let key = (destination.clone(), visa_type.clone());
        let epoch_at_miss = {
            let cache = self
                .approved_cache
                .lock()
                .expect("approved cache mutex poisoned");
            if let Some(hit) = cache.entries.get(&key) {
                return Ok(Some(hit.clone()));
            }
            cache.epoch(&key)
        };

        match self.repository.get_approved(destination, visa_type)? {
            Some(rule_set) => {
                let shared = Arc::new(rule_set);
                let mut cache = self
                    .approved_cache
                    .lock()
                    .expect("approved cache mutex poisoned");
                // An approve or reject invalidated the pair while the
                // repository read was in flight; the snapshot may predate
                // the transition, so it must not be published.
                if cache.epoch(&key) == epoch_at_miss {
                    cache.entries.insert(key, shared.clone());
                }
                Ok(Some(shared))
            }
            None => Ok(None),
        }
    }

    /// Create the next version for a pair. The new version starts
    /// unapproved; the repository assigns `max existing version + 1` and
    /// appends the audit snapshot in the same critical section. A payload
    /// listing the same document type twice with conflicting category or
    /// condition is refused here, before anything is stored.
    pub fn create_version(
        &self,
        destination: DestinationCode,
        visa_type: VisaType,
        payload: RuleSetPayload,
    ) -> Result<RuleSet, RuleStoreError> {
        ensure_consistent_documents(&payload)?;
        let rule_set =
            self.repository
                .create_version(destination, visa_type, payload, Utc::now())?;
        info!(
            destination = %rule_set.destination,
            visa_type = %rule_set.visa_type,
            version = rule_set.version,
            "created rule set version"
        );
        Ok(rule_set)
    }

    /// Promote a version to approved. Idempotent when already approved;
    /// otherwise the repository swap unapproves the prior version in the
    /// same transition.
    pub fn approve(
        &self,
        id: RuleSetId,
        actor: &str,
    ) -> Result<ApprovalOutcome, RuleStoreError> {
        let (rule_set, outcome) = self.repository.swap_approval(id, actor, Utc::now())?;
        self.invalidate(&rule_set.destination, &rule_set.visa_type);

        match &outcome {
            ApprovalOutcome::Approved { superseded } => info!(
                destination = %rule_set.destination,
                visa_type = %rule_set.visa_type,
                version = rule_set.version,
                superseded = superseded.map(|v| v as i64).unwrap_or(-1),
                actor,
                "approved rule set version"
            ),
            ApprovalOutcome::AlreadyApproved => info!(
                destination = %rule_set.destination,
                visa_type = %rule_set.visa_type,
                version = rule_set.version,
                actor,
                "approve was a no-op; version already approved"
            ),
        }

        Ok(outcome)
    }

    /// Record a rejection. A reason is mandatory; rejection is a normal
    /// terminal state, not an error path.
    pub fn reject(&self, id: RuleSetId, actor: &str, reason: &str) -> Result<(), RuleStoreError> {
        if reason.trim().is_empty() {
            return Err(RuleStoreError::MissingRejectionReason);
        }

        let rule_set = self.repository.reject(id, actor, Utc::now(), reason.trim())?;
        self.invalidate(&rule_set.destination, &rule_set.visa_type);
        info!(
            destination = %rule_set.destination,
            visa_type = %rule_set.visa_type,
            version = rule_set.version,
            actor,
            "rejected rule set version"
        );
        Ok(())
    }

    pub fn fetch(&self, id: RuleSetId) -> Result<Option<RuleSet>, RuleStoreError> {
        Ok(self.repository.fetch(id)?)
    }

    pub fn history(
        &self,
        destination: &DestinationCode,
        visa_type: &VisaType,
    ) -> Result<Vec<RuleVersionRecord>, RuleStoreError> {
        Ok(self.repository.history(destination, visa_type)?)
    }

    fn invalidate(&self, destination: &DestinationCode, visa_type: &VisaType) {
        let key = (destination.clone(), visa_type.clone());
        let mut cache = self
            .approved_cache
            .lock()
            .expect("approved cache mutex poisoned");
        cache.entries.remove(&key);
        *cache.epochs.entry(key).or_insert(0) += 1;
    }
}

/// Error raised by the rule store.
#[derive(Debug, thiserror::Error)]
pub enum RuleStoreError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    InvalidPayload(#[from] DiffError),
    #[error("a rejection reason is required")]
    MissingRejectionReason,
}
