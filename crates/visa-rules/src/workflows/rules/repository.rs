use chrono::{DateTime, Utc};

use super::domain::{
    Candidate, CandidateId, CandidateStatus, DestinationCode, RuleSet, RuleSetId, RuleSetPayload,
    RuleVersionRecord, VisaType,
};

/// Result of an approval transition on a rule set version.
#[derive(Debug, Clone, PartialEq)]
pub enum ApprovalOutcome {
    /// The version became the approved one; `superseded` names the version
    /// that lost approval in the same transition, if any.
    Approved { superseded: Option<u32> },
    /// The version was already approved; the call changed nothing.
    AlreadyApproved,
}

/// Storage abstraction for rule set versions and their audit history.
///
/// Implementations own the transactional guarantees: `create_version` must
/// assign `max existing version + 1` and append the history snapshot in one
/// critical section, and `swap_approval` must unapprove the prior approved
/// version and approve the new one atomically so no observer ever sees zero
/// or two approved versions for a pair.
pub trait RuleSetRepository: Send + Sync {
    fn create_version(
        &self,
        destination: DestinationCode,
        visa_type: VisaType,
        payload: RuleSetPayload,
        created_at: DateTime<Utc>,
    ) -> Result<RuleSet, RepositoryError>;

    fn fetch(&self, id: RuleSetId) -> Result<Option<RuleSet>, RepositoryError>;

    fn get_approved(
        &self,
        destination: &DestinationCode,
        visa_type: &VisaType,
    ) -> Result<Option<RuleSet>, RepositoryError>;

    /// Atomic approval swap. Idempotent when `id` is already approved.
    fn swap_approval(
        &self,
        id: RuleSetId,
        actor: &str,
        at: DateTime<Utc>,
    ) -> Result<(RuleSet, ApprovalOutcome), RepositoryError>;

    /// Record a rejection on an unapproved version. Rejecting the currently
    /// approved version is a conflict; approval moves by approving a
    /// replacement, never by un-approving in place.
    fn reject(
        &self,
        id: RuleSetId,
        actor: &str,
        at: DateTime<Utc>,
        reason: &str,
    ) -> Result<RuleSet, RepositoryError>;

    /// Append-only audit trail for a pair, ordered by version.
    fn history(
        &self,
        destination: &DestinationCode,
        visa_type: &VisaType,
    ) -> Result<Vec<RuleVersionRecord>, RepositoryError>;
}

/// Terminal decision applied to a pending candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum CandidateDecision {
    Approved {
        actor: String,
        at: DateTime<Utc>,
    },
    Rejected {
        actor: String,
        at: DateTime<Utc>,
        reason: String,
    },
}

/// Storage abstraction for extraction candidates.
pub trait CandidateRepository: Send + Sync {
    fn insert(&self, candidate: Candidate) -> Result<Candidate, RepositoryError>;
    fn fetch(&self, id: CandidateId) -> Result<Option<Candidate>, RepositoryError>;
    fn pending(&self, limit: usize) -> Result<Vec<Candidate>, RepositoryError>;

    /// Apply a terminal decision. Fails with [`RepositoryError::Conflict`]
    /// when the candidate was already decided; decisions are never revised.
    fn decide(
        &self,
        id: CandidateId,
        decision: CandidateDecision,
    ) -> Result<Candidate, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists or was already decided")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

pub(crate) fn mark_decided(candidate: &mut Candidate, decision: &CandidateDecision) {
    match decision {
        CandidateDecision::Approved { actor, at } => {
            candidate.status = CandidateStatus::Approved;
            candidate.decided_by = Some(actor.clone());
            candidate.decided_at = Some(*at);
        }
        CandidateDecision::Rejected { actor, at, reason } => {
            candidate.status = CandidateStatus::Rejected;
            candidate.decided_by = Some(actor.clone());
            candidate.decided_at = Some(*at);
            candidate.rejection_reason = Some(reason.clone());
        }
    }
}
