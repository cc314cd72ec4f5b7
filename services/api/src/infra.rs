use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;

use visa_rules::workflows::catalog::{CatalogEntry, CatalogRepository, DocumentId, DocumentReference};
use visa_rules::workflows::checklist::{
    ApplicationId, ChecklistRepository, GeneratedChecklist, LegacyTemplateItem,
    LegacyTemplateProvider, Priority,
};
use visa_rules::workflows::rules::{
    ApprovalOutcome, Candidate, CandidateDecision, CandidateId, CandidateRepository,
    CandidateStatus, DestinationCode, DocumentCategory, RepositoryError, RuleSet, RuleSetId,
    RuleSetRepository, RuleSetPayload, RuleVersionRecord, VisaType,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default)]
pub(crate) struct InMemoryRuleSetRepository {
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
        let approved = tables.rule_sets.get_mut(&id).expect("target fetched above");
        approved.is_approved = true;
        approved.review.approved_by = Some(actor.to_string());
        approved.review.approved_at = Some(at);
        Ok((approved.clone(), ApprovalOutcome::Approved { superseded }))
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
pub(crate) struct InMemoryCandidateRepository {
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
        match decision {
            CandidateDecision::Approved { actor, at } => {
                candidate.status = CandidateStatus::Approved;
                candidate.decided_by = Some(actor);
                candidate.decided_at = Some(at);
            }
            CandidateDecision::Rejected { actor, at, reason } => {
                candidate.status = CandidateStatus::Rejected;
                candidate.decided_by = Some(actor);
                candidate.decided_at = Some(at);
                candidate.rejection_reason = Some(reason);
            }
        }
        Ok(candidate.clone())
    }
}

#[derive(Default)]
pub(crate) struct InMemoryCatalogRepository {
    tables: Mutex<CatalogTables>,
}

#[derive(Default)]
struct CatalogTables {
    entries: HashMap<DocumentId, CatalogEntry>,
    by_type: HashMap<String, DocumentId>,
    references: HashMap<(RuleSetId, DocumentId), DocumentReference>,
}

impl CatalogRepository for InMemoryCatalogRepository {
    fn upsert_entry(&self, entry: CatalogEntry) -> Result<CatalogEntry, RepositoryError> {
        let mut tables = self.tables.lock().expect("catalog mutex poisoned");
        tables.by_type.insert(entry.document_type.clone(), entry.id);
        tables.entries.insert(entry.id, entry.clone());
        Ok(entry)
    }

    fn entry_by_type(&self, document_type: &str) -> Result<Option<CatalogEntry>, RepositoryError> {
        let tables = self.tables.lock().expect("catalog mutex poisoned");
        Ok(tables
            .by_type
            .get(document_type)
            .and_then(|id| tables.entries.get(id))
            .cloned())
    }

    fn entry(&self, id: DocumentId) -> Result<Option<CatalogEntry>, RepositoryError> {
        let tables = self.tables.lock().expect("catalog mutex poisoned");
        Ok(tables.entries.get(&id).cloned())
    }

    fn upsert_reference(&self, reference: DocumentReference) -> Result<(), RepositoryError> {
        let mut tables = self.tables.lock().expect("catalog mutex poisoned");
        tables
            .references
            .insert((reference.rule_set_id, reference.document_id), reference);
        Ok(())
    }

    fn references_for(
        &self,
        rule_set_id: RuleSetId,
    ) -> Result<Vec<DocumentReference>, RepositoryError> {
        let tables = self.tables.lock().expect("catalog mutex poisoned");
        let mut references: Vec<DocumentReference> = tables
            .references
            .values()
            .filter(|r| r.rule_set_id == rule_set_id)
            .cloned()
            .collect();
        references.sort_by_key(|r| r.document_id);
        Ok(references)
    }
}

#[derive(Default)]
pub(crate) struct InMemoryChecklistRepository {
    checklists: Mutex<HashMap<ApplicationId, GeneratedChecklist>>,
}

impl ChecklistRepository for InMemoryChecklistRepository {
    fn fetch(&self, id: &ApplicationId) -> Result<Option<GeneratedChecklist>, RepositoryError> {
        let guard = self.checklists.lock().expect("checklist mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn upsert(&self, checklist: GeneratedChecklist) -> Result<(), RepositoryError> {
        let mut guard = self.checklists.lock().expect("checklist mutex poisoned");
        guard.insert(checklist.application_id.clone(), checklist);
        Ok(())
    }

    fn created_since(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<GeneratedChecklist>, RepositoryError> {
        let guard = self.checklists.lock().expect("checklist mutex poisoned");
        Ok(guard
            .values()
            .filter(|c| c.created_at >= cutoff)
            .cloned()
            .collect())
    }
}

/// Fixed per-pair templates for destinations not yet covered by approved
/// rules. Keyed by "DEST/visa_type".
pub(crate) struct StaticTemplateProvider {
    templates: HashMap<String, Vec<LegacyTemplateItem>>,
}

impl LegacyTemplateProvider for StaticTemplateProvider {
    fn template(
        &self,
        destination: &DestinationCode,
        visa_type: &VisaType,
    ) -> Option<Vec<LegacyTemplateItem>> {
        self.templates
            .get(&format!("{}/{}", destination.as_str(), visa_type.as_str()))
            .cloned()
    }
}

/// Templates carried over from before the rule engine existed.
pub(crate) fn seeded_templates() -> StaticTemplateProvider {
    let mut templates = HashMap::new();
    templates.insert(
        "CA/tourist".to_string(),
        vec![
            LegacyTemplateItem {
                document_type: "passport".to_string(),
                name: "Valid Passport".to_string(),
                description: "Passport valid for the full duration of the stay".to_string(),
                category: Some(DocumentCategory::Required),
                required: None,
                priority: None,
                country_specific: true,
            },
            LegacyTemplateItem {
                document_type: "travel_itinerary".to_string(),
                name: "Travel Itinerary".to_string(),
                description: "Round-trip booking or detailed travel plan".to_string(),
                category: None,
                required: Some(true),
                priority: Some(Priority::Medium),
                country_specific: true,
            },
        ],
    );
    StaticTemplateProvider { templates }
}

/// Canonical catalog entries the normalizer resolves embedded documents
/// against.
pub(crate) fn seed_catalog(catalog: &InMemoryCatalogRepository) -> Result<(), RepositoryError> {
    let entries = [
        (1, "passport", DocumentCategory::Required, "Valid passport"),
        (
            2,
            "photo",
            DocumentCategory::Required,
            "Recent passport-sized photograph",
        ),
        (
            3,
            "bank_statement",
            DocumentCategory::HighlyRecommended,
            "Bank statements covering the last three months",
        ),
        (
            4,
            "application_form",
            DocumentCategory::Required,
            "Completed and signed visa application form",
        ),
        (
            5,
            "travel_itinerary",
            DocumentCategory::Optional,
            "Round-trip booking or detailed travel plan",
        ),
    ];
    for (id, document_type, default_category, default_description) in entries {
        catalog.upsert_entry(CatalogEntry {
            id: DocumentId(id),
            document_type: document_type.to_string(),
            default_category,
            default_description: default_description.to_string(),
        })?;
    }
    Ok(())
}
