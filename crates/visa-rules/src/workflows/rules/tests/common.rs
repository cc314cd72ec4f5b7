use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use crate::config::ReviewConfig;
use crate::workflows::rules::domain::{
    Candidate, CandidateId, DestinationCode, DocumentCategory, DocumentRule, Provenance, RuleSet,
    RuleSetId, RuleSetPayload, RuleVersionRecord, VisaType,
};
use crate::workflows::rules::repository::{
    mark_decided, ApprovalOutcome, CandidateDecision, CandidateRepository, RepositoryError,
    RuleSetRepository,
};
use crate::workflows::rules::review::CandidateReview;
use crate::workflows::rules::store::RuleStore;
use crate::workflows::rules::CandidateStatus;

#[derive(Default)]
pub(super) struct InMemoryRuleSetRepository {
    tables: Mutex<RuleSetTables>,
}

#[derive(Default)]
struct RuleSetTables {
    rule_sets: HashMap<RuleSetId, RuleSet>,
    history: Vec<RuleVersionRecord>,
    next_id: u64,
}

impl RuleSetRepository for InMemoryRuleSetRepository {
    fn create_version(
        &self,
        destination: DestinationCode,
        visa_type: VisaType,
        payload: RuleSetPayload,
        created_at: DateTime<Utc>,
    ) -> Result<RuleSet, RepositoryError> {
        let mut tables = self.tables.lock().expect("rule set mutex poisoned");
        tables.next_id += 1;
        let version = tables
            .rule_sets
            .values()
            .filter(|r| r.destination == destination && r.visa_type == visa_type)
            .map(|r| r.version)
            .max()
            .unwrap_or(0)
            + 1;

        let rule_set = RuleSet {
            id: RuleSetId(tables.next_id),
            destination,
            visa_type,
            version,
            payload,
            is_approved: false,
            review: Default::default(),
            created_at,
        };
        tables.history.push(RuleVersionRecord {
            destination: rule_set.destination.clone(),
            visa_type: rule_set.visa_type.clone(),
            version: rule_set.version,
            payload: rule_set.payload.clone(),
            created_at,
        });
        tables.rule_sets.insert(rule_set.id, rule_set.clone());
        Ok(rule_set)
    }

    fn fetch(&self, id: RuleSetId) -> Result<Option<RuleSet>, RepositoryError> {
        let tables = self.tables.lock().expect("rule set mutex poisoned");
        Ok(tables.rule_sets.get(&id).cloned())
    }

    fn get_approved(
        &self,
        destination: &DestinationCode,
        visa_type: &VisaType,
    ) -> Result<Option<RuleSet>, RepositoryError> {
        let tables = self.tables.lock().expect("rule set mutex poisoned");
        Ok(tables
            .rule_sets
            .values()
            .find(|r| r.is_approved && r.destination == *destination && r.visa_type == *visa_type)
            .cloned())
    }

    fn swap_approval(
        &self,
        id: RuleSetId,
        actor: &str,
        at: DateTime<Utc>,
    ) -> Result<(RuleSet, ApprovalOutcome), RepositoryError> {
        let mut tables = self.tables.lock().expect("rule set mutex poisoned");
        let target = tables
            .rule_sets
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound)?;
        if target.is_approved {
            return Ok((target, ApprovalOutcome::AlreadyApproved));
        }

        let superseded = tables
            .rule_sets
            .values_mut()
            .find(|r| {
                r.is_approved
                    && r.destination == target.destination
                    && r.visa_type == target.visa_type
            })
            .map(|prior| {
                prior.is_approved = false;
                prior.version
            });

        let approved = tables
            .rule_sets
            .get_mut(&id)
            .expect("target fetched above");
        approved.is_approved = true;
        approved.review.approved_by = Some(actor.to_string());
        approved.review.approved_at = Some(at);
        let snapshot = approved.clone();

        Ok((snapshot, ApprovalOutcome::Approved { superseded }))
    }

    fn reject(
        &self,
        id: RuleSetId,
        actor: &str,
        at: DateTime<Utc>,
        reason: &str,
    ) -> Result<RuleSet, RepositoryError> {
        let mut tables = self.tables.lock().expect("rule set mutex poisoned");
        let rule_set = tables
            .rule_sets
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        if rule_set.is_approved {
            return Err(RepositoryError::Conflict);
        }
        rule_set.review.rejected_by = Some(actor.to_string());
        rule_set.review.rejected_at = Some(at);
        rule_set.review.rejection_reason = Some(reason.to_string());
        Ok(rule_set.clone())
    }

    fn history(
        &self,
        destination: &DestinationCode,
        visa_type: &VisaType,
    ) -> Result<Vec<RuleVersionRecord>, RepositoryError> {
        let tables = self.tables.lock().expect("rule set mutex poisoned");
        let mut records: Vec<RuleVersionRecord> = tables
            .history
            .iter()
            .filter(|r| r.destination == *destination && r.visa_type == *visa_type)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.version);
        Ok(records)
    }
}

#[derive(Default)]
pub(super) struct InMemoryCandidateRepository {
    candidates: Mutex<HashMap<CandidateId, Candidate>>,
    next_id: Mutex<u64>,
}

impl CandidateRepository for InMemoryCandidateRepository {
    fn insert(&self, mut candidate: Candidate) -> Result<Candidate, RepositoryError> {
        let mut next_id = self.next_id.lock().expect("candidate id mutex poisoned");
        *next_id += 1;
        candidate.id = CandidateId(*next_id);
        let mut guard = self.candidates.lock().expect("candidate mutex poisoned");
        guard.insert(candidate.id, candidate.clone());
        Ok(candidate)
    }

    fn fetch(&self, id: CandidateId) -> Result<Option<Candidate>, RepositoryError> {
        let guard = self.candidates.lock().expect("candidate mutex poisoned");
        Ok(guard.get(&id).cloned())
    }

    fn pending(&self, limit: usize) -> Result<Vec<Candidate>, RepositoryError> {
        let guard = self.candidates.lock().expect("candidate mutex poisoned");
        let mut pending: Vec<Candidate> = guard
            .values()
            .filter(|c| c.status == CandidateStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by_key(|c| c.id);
        pending.truncate(limit);
        Ok(pending)
    }

    fn decide(
        &self,
        id: CandidateId,
        decision: CandidateDecision,
    ) -> Result<Candidate, RepositoryError> {
        let mut guard = self.candidates.lock().expect("candidate mutex poisoned");
        let candidate = guard.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        if candidate.status.is_terminal() {
            return Err(RepositoryError::Conflict);
        }
        mark_decided(candidate, &decision);
        Ok(candidate.clone())
    }
}

pub(super) fn document(
    document_type: &str,
    category: DocumentCategory,
    condition: Option<&str>,
) -> DocumentRule {
    DocumentRule {
        document_type: document_type.to_string(),
        category,
        description: format!("{document_type} as issued by the relevant authority"),
        validity_notes: None,
        condition: condition.map(str::to_string),
    }
}

pub(super) fn payload(documents: Vec<DocumentRule>) -> RuleSetPayload {
    RuleSetPayload {
        documents,
        financial: Default::default(),
        processing: Default::default(),
        fees: Default::default(),
        provenance: Provenance {
            source: "https://embassy.example/visa-requirements".to_string(),
            confidence: 0.9,
            extracted_at: Utc::now(),
        },
    }
}

pub(super) fn store() -> Arc<RuleStore<InMemoryRuleSetRepository>> {
    Arc::new(RuleStore::new(Arc::new(
        InMemoryRuleSetRepository::default(),
    )))
}

pub(super) fn review(
) -> CandidateReview<InMemoryRuleSetRepository, InMemoryCandidateRepository> {
    CandidateReview::new(
        store(),
        Arc::new(InMemoryCandidateRepository::default()),
        ReviewConfig::default(),
    )
}
