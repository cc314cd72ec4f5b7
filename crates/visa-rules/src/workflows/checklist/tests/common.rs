use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use crate::workflows::checklist::domain::{ApplicationId, FactMap, FactValue, GeneratedChecklist};
use crate::workflows::checklist::generator::{LegacyTemplateItem, LegacyTemplateProvider};
use crate::workflows::checklist::repository::ChecklistRepository;
use crate::workflows::checklist::service::ChecklistService;
use crate::workflows::rules::domain::{
    DestinationCode, DocumentCategory, DocumentRule, Provenance, RuleSet, RuleSetId,
    RuleSetPayload, RuleVersionRecord, VisaType,
};
use crate::workflows::rules::repository::{ApprovalOutcome, RepositoryError, RuleSetRepository};
use crate::workflows::rules::store::RuleStore;

/// Rule set storage supporting versioning and approval swaps, enough for
/// driving the generation tiers through the rule store.
#[derive(Default)]
pub(super) struct StubRuleSetRepository {
    rule_sets: Mutex<HashMap<RuleSetId, RuleSet>>,
    next_id: Mutex<u64>,
}

impl RuleSetRepository for StubRuleSetRepository {
    fn create_version(
        &self,
        destination: DestinationCode,
        visa_type: VisaType,
        payload: RuleSetPayload,
        created_at: DateTime<Utc>,
    ) -> Result<RuleSet, RepositoryError> {
        let mut next_id = self.next_id.lock().expect("id mutex poisoned");
        *next_id += 1;
        let mut rule_sets = self.rule_sets.lock().expect("rule set mutex poisoned");
        let version = rule_sets
            .values()
            .filter(|r| r.destination == destination && r.visa_type == visa_type)
            .map(|r| r.version)
            .max()
            .unwrap_or(0)
            + 1;
        let rule_set = RuleSet {
            id: RuleSetId(*next_id),
            destination,
            visa_type,
            version,
            payload,
            is_approved: false,
            review: Default::default(),
            created_at,
        };
        rule_sets.insert(rule_set.id, rule_set.clone());
        Ok(rule_set)
    }

    fn fetch(&self, id: RuleSetId) -> Result<Option<RuleSet>, RepositoryError> {
        let rule_sets = self.rule_sets.lock().expect("rule set mutex poisoned");
        Ok(rule_sets.get(&id).cloned())
    }

    fn get_approved(
        &self,
        destination: &DestinationCode,
        visa_type: &VisaType,
    ) -> Result<Option<RuleSet>, RepositoryError> {
        let rule_sets = self.rule_sets.lock().expect("rule set mutex poisoned");
        Ok(rule_sets
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
        let mut rule_sets = self.rule_sets.lock().expect("rule set mutex poisoned");
        let target = rule_sets.get(&id).cloned().ok_or(RepositoryError::NotFound)?;
        if target.is_approved {
            return Ok((target, ApprovalOutcome::AlreadyApproved));
        }
        let superseded = rule_sets
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
        let approved = rule_sets.get_mut(&id).expect("target fetched above");
        approved.is_approved = true;
        approved.review.approved_by = Some(actor.to_string());
        approved.review.approved_at = Some(at);
        Ok((approved.clone(), ApprovalOutcome::Approved { superseded }))
    }

    fn reject(
        &self,
        _id: RuleSetId,
        _actor: &str,
        _at: DateTime<Utc>,
        _reason: &str,
    ) -> Result<RuleSet, RepositoryError> {
        Err(RepositoryError::Unavailable(
            "not exercised by checklist tests".to_string(),
        ))
    }

    fn history(
        &self,
        _destination: &DestinationCode,
        _visa_type: &VisaType,
    ) -> Result<Vec<RuleVersionRecord>, RepositoryError> {
        Ok(Vec::new())
    }
}

/// Rule set storage whose reads always fail, for exercising the failed
/// checklist path.
#[derive(Default)]
pub(super) struct UnavailableRuleSetRepository;

impl RuleSetRepository for UnavailableRuleSetRepository {
    fn create_version(
        &self,
        _destination: DestinationCode,
        _visa_type: VisaType,
        _payload: RuleSetPayload,
        _created_at: DateTime<Utc>,
    ) -> Result<RuleSet, RepositoryError> {
        Err(RepositoryError::Unavailable("rule store offline".to_string()))
    }

    fn fetch(&self, _id: RuleSetId) -> Result<Option<RuleSet>, RepositoryError> {
        Err(RepositoryError::Unavailable("rule store offline".to_string()))
    }

    fn get_approved(
        &self,
        _destination: &DestinationCode,
        _visa_type: &VisaType,
    ) -> Result<Option<RuleSet>, RepositoryError> {
        Err(RepositoryError::Unavailable("rule store offline".to_string()))
    }

    fn swap_approval(
        &self,
        _id: RuleSetId,
        _actor: &str,
        _at: DateTime<Utc>,
    ) -> Result<(RuleSet, ApprovalOutcome), RepositoryError> {
        Err(RepositoryError::Unavailable("rule store offline".to_string()))
    }

    fn reject(
        &self,
        _id: RuleSetId,
        _actor: &str,
        _at: DateTime<Utc>,
        _reason: &str,
    ) -> Result<RuleSet, RepositoryError> {
        Err(RepositoryError::Unavailable("rule store offline".to_string()))
    }

    fn history(
        &self,
        _destination: &DestinationCode,
        _visa_type: &VisaType,
    ) -> Result<Vec<RuleVersionRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("rule store offline".to_string()))
    }
}

#[derive(Default)]
pub(super) struct InMemoryChecklistRepository {
    checklists: Mutex<HashMap<ApplicationId, GeneratedChecklist>>,
}

impl InMemoryChecklistRepository {
    pub(super) fn stored(&self, id: &str) -> Option<GeneratedChecklist> {
        let checklists = self.checklists.lock().expect("checklist mutex poisoned");
        checklists.get(&ApplicationId(id.to_string())).cloned()
    }
}

impl ChecklistRepository for InMemoryChecklistRepository {
    fn fetch(&self, id: &ApplicationId) -> Result<Option<GeneratedChecklist>, RepositoryError> {
        let checklists = self.checklists.lock().expect("checklist mutex poisoned");
        Ok(checklists.get(id).cloned())
    }

    fn upsert(&self, checklist: GeneratedChecklist) -> Result<(), RepositoryError> {
        let mut checklists = self.checklists.lock().expect("checklist mutex poisoned");
        checklists.insert(checklist.application_id.clone(), checklist);
        Ok(())
    }

    fn created_since(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<GeneratedChecklist>, RepositoryError> {
        let checklists = self.checklists.lock().expect("checklist mutex poisoned");
        Ok(checklists
            .values()
            .filter(|c| c.created_at >= cutoff)
            .cloned()
            .collect())
    }
}

/// Static per-pair templates keyed by "DEST/visa_type".
#[derive(Default)]
pub(super) struct StaticTemplates {
    templates: HashMap<String, Vec<LegacyTemplateItem>>,
}

impl StaticTemplates {
    pub(super) fn with(destination: &str, visa_type: &str, items: Vec<LegacyTemplateItem>) -> Self {
        let mut templates = HashMap::new();
        templates.insert(format!("{destination}/{visa_type}"), items);
        Self { templates }
    }
}

impl LegacyTemplateProvider for StaticTemplates {
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

pub(super) struct Harness {
    pub(super) store: Arc<RuleStore<StubRuleSetRepository>>,
    pub(super) checklists: Arc<InMemoryChecklistRepository>,
    pub(super) service:
        ChecklistService<StubRuleSetRepository, StaticTemplates, InMemoryChecklistRepository>,
}

impl Harness {
    /// Create and approve the next rule set version for the pair, going
    /// through the store so its cache stays coherent.
    pub(super) fn approve(
        &self,
        destination: &str,
        visa_type: &str,
        payload: RuleSetPayload,
    ) -> RuleSet {
        let rule_set = self
            .store
            .create_version(
                DestinationCode::new(destination),
                VisaType::new(visa_type),
                payload,
            )
            .expect("create version");
        self.store
            .approve(rule_set.id, "reviewer@example.test")
            .expect("approve version");
        rule_set
    }
}

pub(super) fn harness(templates: StaticTemplates) -> Harness {
    let store = Arc::new(RuleStore::new(Arc::new(StubRuleSetRepository::default())));
    let checklists = Arc::new(InMemoryChecklistRepository::default());
    let service = ChecklistService::new(
        Arc::clone(&store),
        Arc::new(templates),
        Arc::clone(&checklists),
    );
    Harness {
        store,
        checklists,
        service,
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

pub(super) fn facts(entries: &[(&str, &str)]) -> FactMap {
    entries
        .iter()
        .map(|(key, value)| (key.to_string(), FactValue::Text(value.to_string())))
        .collect()
}
