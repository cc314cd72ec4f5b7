use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::workflows::rules::{
    DestinationCode, RepositoryError, RuleSetRepository, RuleStore, RuleStoreError, VisaType,
};

use super::domain::{
    ApplicationId, ChecklistStatus, FactMap, GeneratedChecklist, GenerationMode,
};
use super::generator::{resolve_checklist, LegacyTemplateProvider};
use super::repository::ChecklistRepository;

/// Checklist generation request as it arrives from the application UI.
#[derive(Debug, Clone, Deserialize)]
pub struct ChecklistRequest {
    pub application_id: String,
    pub destination: String,
    pub visa_type: String,
    #[serde(default)]
    pub facts: FactMap,
}

/// Generates and stores per-application checklists.
///
/// Generation is idempotent per (application, inputs digest): repeated
/// requests with unchanged inputs return the stored ready checklist, and a
/// duplicate request racing an in-flight generation observes the processing
/// row instead of starting a second write.
pub struct ChecklistService<R, L, C> {
    store: Arc<RuleStore<R>>,
    legacy: Arc<L>,
    checklists: Arc<C>,
}

impl<R, L, C> ChecklistService<R, L, C>
where
    R: RuleSetRepository + 'static,
    L: LegacyTemplateProvider + 'static,
    C: ChecklistRepository + 'static,
{
    pub fn new(store: Arc<RuleStore<R>>, legacy: Arc<L>, checklists: Arc<C>) -> Self {
        Self {
            store,
            legacy,
            checklists,
        }
    }

    pub fn generate(
        &self,
        request: ChecklistRequest,
    ) -> Result<GeneratedChecklist, ChecklistError> {
        let application_id = ApplicationId(request.application_id);
        let destination = DestinationCode::new(&request.destination);
        let visa_type = VisaType::new(&request.visa_type);
        let facts = request.facts;

        let approved = match self.store.get_approved(&destination, &visa_type) {
            Ok(approved) => approved,
            Err(error) => {
                // Internal detail stays in the logs; the applicant sees a
                // failed status with a retry affordance.
                warn!(
                    application = %application_id.0,
                    %error,
                    "rule store unavailable during checklist generation"
                );
                let failed = self.failed_checklist(
                    application_id,
                    destination,
                    visa_type,
                    &facts,
                );
                self.checklists.upsert(failed.clone())?;
                return Ok(failed);
            }
        };

        let inputs_hash = inputs_digest(
            &destination,
            &visa_type,
            approved.as_ref().map(|rule_set| rule_set.version),
            &facts,
        );

        if let Some(existing) = self.checklists.fetch(&application_id)? {
            if existing.inputs_hash == inputs_hash
                && matches!(
                    existing.status,
                    ChecklistStatus::Ready | ChecklistStatus::Processing
                )
            {
                return Ok(existing);
            }
        }

        let legacy = self.legacy.template(&destination, &visa_type);
        let mode = if approved.is_some() {
            GenerationMode::Rules
        } else if legacy.is_some() {
            GenerationMode::Legacy
        } else {
            GenerationMode::Fallback
        };

        let created_at = Utc::now();
        let processing = GeneratedChecklist {
            application_id: application_id.clone(),
            destination: destination.clone(),
            visa_type: visa_type.clone(),
            items: Vec::new(),
            mode,
            status: ChecklistStatus::Processing,
            notes: Vec::new(),
            inputs_hash: inputs_hash.clone(),
            created_at,
            completed_at: None,
        };
        self.checklists.upsert(processing)?;

        let resolved = resolve_checklist(approved.as_deref(), legacy, &visa_type, &facts);
        let ready = GeneratedChecklist {
            application_id: application_id.clone(),
            destination,
            visa_type,
            items: resolved.items,
            mode: resolved.mode,
            status: ChecklistStatus::Ready,
            notes: resolved.notes,
            inputs_hash,
            created_at,
            completed_at: Some(Utc::now()),
        };
        self.checklists.upsert(ready.clone())?;

        info!(
            application = %ready.application_id.0,
            mode = ready.mode.label(),
            items = ready.items.len(),
            "checklist generated"
        );
        Ok(ready)
    }

    /// Stored checklist for status polling.
    pub fn get(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Option<GeneratedChecklist>, ChecklistError> {
        Ok(self.checklists.fetch(application_id)?)
    }

    fn failed_checklist(
        &self,
        application_id: ApplicationId,
        destination: DestinationCode,
        visa_type: VisaType,
        facts: &FactMap,
    ) -> GeneratedChecklist {
        let now = Utc::now();
        GeneratedChecklist {
            inputs_hash: inputs_digest(&destination, &visa_type, None, facts),
            application_id,
            destination,
            visa_type,
            items: Vec::new(),
            mode: GenerationMode::Fallback,
            status: ChecklistStatus::Failed,
            notes: vec!["Checklist generation failed. Please try again.".to_string()],
            created_at: now,
            completed_at: Some(now),
        }
    }
}

/// Digest of everything that determines a checklist's content: the pair,
/// the approved rule set version (if any), and the applicant facts. The
/// fact map is ordered, so serialization is canonical.
fn inputs_digest(
    destination: &DestinationCode,
    visa_type: &VisaType,
    approved_version: Option<u32>,
    facts: &FactMap,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(destination.as_str().as_bytes());
    hasher.update(b"|");
    hasher.update(visa_type.as_str().as_bytes());
    hasher.update(b"|");
    match approved_version {
        Some(version) => hasher.update(version.to_be_bytes()),
        None => hasher.update(b"none"),
    }
    hasher.update(b"|");
    let facts_json = serde_json::to_string(facts).unwrap_or_default();
    hasher.update(facts_json.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Error raised by the checklist service.
#[derive(Debug, thiserror::Error)]
pub enum ChecklistError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Store(#[from] RuleStoreError),
}
