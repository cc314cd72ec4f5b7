use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier wrapper for stored rule set versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RuleSetId(pub u64);

/// Identifier wrapper for extraction candidates awaiting review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CandidateId(pub u64);

/// ISO-style destination country code, normalized to uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DestinationCode(String);

impl DestinationCode {
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DestinationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Visa type slug (tourist, student, work...), normalized to lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VisaType(String);

impl VisaType {
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VisaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Requirement strength assigned to a document within a rule set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentCategory {
    Required,
    HighlyRecommended,
    Optional,
}

impl DocumentCategory {
    pub const fn label(self) -> &'static str {
        match self {
            DocumentCategory::Required => "required",
            DocumentCategory::HighlyRecommended => "highly_recommended",
            DocumentCategory::Optional => "optional",
        }
    }
}

/// One document requirement as embedded in a rule set payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRule {
    pub document_type: String,
    pub category: DocumentCategory,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validity_notes: Option<String>,
    /// Boolean expression over applicant facts gating whether the document
    /// applies, e.g. `sponsorType == 'self'`. Absent means always required.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

/// Minimum-funds expectations attached to a rule set.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FinancialRequirements {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_balance: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statement_window_days: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sponsor_rules: Option<String>,
}

/// Consulate processing expectations.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProcessingRequirements {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_days: Option<u32>,
    #[serde(default)]
    pub appointment_required: bool,
    #[serde(default)]
    pub interview_required: bool,
    #[serde(default)]
    pub biometrics_required: bool,
}

/// Fee expectations for the application itself.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FeeSchedule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_notes: Option<String>,
}

/// Where a payload came from and how much the extractor trusted it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub source: String,
    pub confidence: f64,
    pub extracted_at: DateTime<Utc>,
}

/// Structured blob persisted per rule set version.
///
/// Field names are a compatibility contract: historical versions are diffed
/// against current candidates, so renaming a field is a breaking change that
/// requires migrating stored payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSetPayload {
    pub documents: Vec<DocumentRule>,
    #[serde(default)]
    pub financial: FinancialRequirements,
    #[serde(default)]
    pub processing: ProcessingRequirements,
    #[serde(default)]
    pub fees: FeeSchedule,
    pub provenance: Provenance,
}

/// Who acted on a rule set version and when.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReviewTrail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

/// One immutable rule set version for a (destination, visa type) pair.
///
/// At most one version per pair is approved at any time; corrections are new
/// versions, never in-place edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    pub id: RuleSetId,
    pub destination: DestinationCode,
    pub visa_type: VisaType,
    pub version: u32,
    pub payload: RuleSetPayload,
    pub is_approved: bool,
    #[serde(default)]
    pub review: ReviewTrail,
    pub created_at: DateTime<Utc>,
}

/// Append-only audit snapshot, one per version ever created for a pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleVersionRecord {
    pub destination: DestinationCode,
    pub visa_type: VisaType,
    pub version: u32,
    pub payload: RuleSetPayload,
    pub created_at: DateTime<Utc>,
}

/// Lifecycle of an extraction candidate. Terminal once decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStatus {
    Pending,
    Approved,
    Rejected,
}

impl CandidateStatus {
    pub const fn label(self) -> &'static str {
        match self {
            CandidateStatus::Pending => "pending",
            CandidateStatus::Approved => "approved",
            CandidateStatus::Rejected => "rejected",
        }
    }

    pub const fn is_terminal(self) -> bool {
        !matches!(self, CandidateStatus::Pending)
    }
}

/// Machine-extracted proposal awaiting an administrator decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub destination: DestinationCode,
    pub visa_type: VisaType,
    pub payload: RuleSetPayload,
    pub source_reference: String,
    pub confidence: f64,
    pub status: CandidateStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decided_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

/// Canonical matching key for document types across representations.
///
/// Extraction output is free text; `Bank Statement`, `bank  statement`, and
/// `bank_statement` must all land on the same catalog entry and diff bucket.
pub fn normalize_document_type(raw: &str) -> String {
    raw.replace(['\u{feff}', '\u{200b}'], "")
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|part| !part.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}
