use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::ReviewConfig;

use super::diff::{diff_payloads, DiffError, RuleSetDiff};
use super::domain::{
    Candidate, CandidateId, CandidateStatus, DestinationCode, RuleSet, RuleSetPayload, VisaType,
};
use super::repository::{
    CandidateDecision, CandidateRepository, RepositoryError, RuleSetRepository,
};
use super::store::{RuleStore, RuleStoreError};

/// Payload for submitting a freshly extracted candidate.
#[derive(Debug, Clone, Deserialize)]
pub struct CandidateSubmission {
    pub destination: String,
    pub visa_type: String,
    pub payload: RuleSetPayload,
    pub source_reference: String,
    pub confidence: f64,
}

/// Advisory diff rendered for the reviewing administrator.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateDiffPreview {
    pub candidate_id: CandidateId,
    pub destination: DestinationCode,
    pub visa_type: VisaType,
    pub confidence: f64,
    /// Extraction confidence fell below the configured floor; worth extra
    /// scrutiny, but never an automatic rejection.
    pub low_confidence: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_version: Option<u32>,
    pub diff: RuleSetDiff,
}

/// Multi-state review workflow over machine-extracted candidates.
///
/// Approval promotes the candidate payload into a new approved rule set
/// version; rejection records a reason and leaves approved data untouched.
pub struct CandidateReview<R, C> {
    store: Arc<RuleStore<R>>,
    candidates: Arc<C>,
    config: ReviewConfig,
}

impl<R, C> CandidateReview<R, C>
where
    R: RuleSetRepository + 'static,
    C: CandidateRepository + 'static,
{
    pub fn new(store: Arc<RuleStore<R>>, candidates: Arc<C>, config: ReviewConfig) -> Self {
        Self {
            store,
            candidates,
            config,
        }
    }

    pub fn store(&self) -> &Arc<RuleStore<R>> {
        &self.store
    }

    /// Register a pending candidate for review.
    pub fn submit(&self, submission: CandidateSubmission) -> Result<Candidate, ReviewError> {
        if !(0.0..=1.0).contains(&submission.confidence) {
            return Err(ReviewError::InvalidConfidence(submission.confidence));
        }

        let candidate = Candidate {
            id: CandidateId(0), // assigned by the repository
            destination: DestinationCode::new(&submission.destination),
            visa_type: VisaType::new(&submission.visa_type),
            payload: submission.payload,
            source_reference: submission.source_reference,
            confidence: submission.confidence,
            status: CandidateStatus::Pending,
            decided_by: None,
            decided_at: None,
            rejection_reason: None,
            submitted_at: Utc::now(),
        };

        let stored = self.candidates.insert(candidate)?;
        info!(
            candidate = stored.id.0,
            destination = %stored.destination,
            visa_type = %stored.visa_type,
            confidence = stored.confidence,
            "candidate submitted for review"
        );
        Ok(stored)
    }

    /// Pending candidates awaiting a decision.
    pub fn pending(&self, limit: usize) -> Result<Vec<Candidate>, ReviewError> {
        Ok(self.candidates.pending(limit)?)
    }

    /// Compute the advisory diff between a candidate and the active approved
    /// rule set for its pair. Read-only; repeatable.
    pub fn preview(&self, id: CandidateId) -> Result<CandidateDiffPreview, ReviewError> {
        let candidate = self
            .candidates
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;

        let approved = self
            .store
            .get_approved(&candidate.destination, &candidate.visa_type)?;
        let diff = diff_payloads(&candidate.payload, approved.as_deref().map(|r| &r.payload))?;

        Ok(CandidateDiffPreview {
            candidate_id: candidate.id,
            destination: candidate.destination,
            visa_type: candidate.visa_type,
            confidence: candidate.confidence,
            low_confidence: candidate.confidence < self.config.confidence_floor,
            approved_version: approved.map(|rule_set| rule_set.version),
            diff,
        })
    }

    /// Approve a pending candidate: create the next rule set version from
    /// its payload and promote that version in one workflow step.
    pub fn approve(&self, id: CandidateId, actor: &str) -> Result<RuleSet, ReviewError> {
        let candidate = self
            .candidates
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;
        if candidate.status.is_terminal() {
            return Err(ReviewError::AlreadyDecided(candidate.status));
        }

        let rule_set = self.store.create_version(
            candidate.destination.clone(),
            candidate.visa_type.clone(),
            candidate.payload.clone(),
        )?;
        self.store.approve(rule_set.id, actor)?;

        let decided = self.candidates.decide(
            id,
            CandidateDecision::Approved {
                actor: actor.to_string(),
                at: Utc::now(),
            },
        )?;
        info!(
            candidate = decided.id.0,
            version = rule_set.version,
            actor,
            "candidate approved and promoted"
        );

        // Return the promoted version with its fresh approval trail.
        Ok(self
            .store
            .fetch(rule_set.id)?
            .unwrap_or(rule_set))
    }

    /// Reject a pending candidate. A reason is mandatory; existing approved
    /// data stays untouched.
    pub fn reject(&self, id: CandidateId, actor: &str, reason: &str) -> Result<Candidate, ReviewError> {
        if reason.trim().is_empty() {
            return Err(ReviewError::MissingRejectionReason);
        }

        let candidate = self
            .candidates
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;
        if candidate.status.is_terminal() {
            return Err(ReviewError::AlreadyDecided(candidate.status));
        }

        let decided = self.candidates.decide(
            id,
            CandidateDecision::Rejected {
                actor: actor.to_string(),
                at: Utc::now(),
                reason: reason.trim().to_string(),
            },
        )?;
        info!(candidate = decided.id.0, actor, "candidate rejected");
        Ok(decided)
    }
}

/// Error raised by the candidate review workflow.
#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Store(#[from] RuleStoreError),
    #[error(transparent)]
    Diff(#[from] DiffError),
    #[error("candidate was already decided ({})", .0.label())]
    AlreadyDecided(CandidateStatus),
    #[error("a rejection reason is required")]
    MissingRejectionReason,
    #[error("confidence {0} is outside [0, 1]")]
    InvalidConfidence(f64),
}
