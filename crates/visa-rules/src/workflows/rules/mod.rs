//! Versioned rule sets and the administrator review workflow over
//! machine-extracted candidates.

pub mod diff;
pub mod domain;
pub mod repository;
pub mod review;
pub mod router;
pub mod store;

#[cfg(test)]
mod tests;

pub use diff::{
    diff_payloads, ensure_consistent_documents, DiffError, DocumentModification, FieldChange,
    RuleSetDiff,
};
pub use domain::{
    normalize_document_type, Candidate, CandidateId, CandidateStatus, DestinationCode,
    DocumentCategory, DocumentRule, FeeSchedule, FinancialRequirements, ProcessingRequirements,
    Provenance, ReviewTrail, RuleSet, RuleSetId, RuleSetPayload, RuleVersionRecord, VisaType,
};
pub use repository::{
    ApprovalOutcome, CandidateDecision, CandidateRepository, RepositoryError, RuleSetRepository,
};
pub use review::{CandidateDiffPreview, CandidateReview, CandidateSubmission, ReviewError};
pub use router::review_router;
pub use store::{RuleStore, RuleStoreError};
