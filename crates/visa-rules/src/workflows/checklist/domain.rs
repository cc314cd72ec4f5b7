use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflows::rules::{DestinationCode, DocumentCategory, VisaType};

/// Identifier wrapper for visa applications requesting a checklist.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

/// One applicant fact derived from the questionnaire, e.g.
/// `sponsorType: "self"` or `hasInvitation: true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FactValue {
    Bool(bool),
    Text(String),
}

/// Flat map of applicant facts that conditions evaluate against.
pub type FactMap = BTreeMap<String, FactValue>;

/// Priority shown to the applicant for ordering work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub const fn label(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

/// Which tier produced a checklist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    Rules,
    Legacy,
    Fallback,
}

impl GenerationMode {
    pub const fn label(self) -> &'static str {
        match self {
            GenerationMode::Rules => "rules",
            GenerationMode::Legacy => "legacy",
            GenerationMode::Fallback => "fallback",
        }
    }
}

/// Lifecycle of a generated checklist as the applicant's UI polls it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecklistStatus {
    Processing,
    Ready,
    Failed,
}

impl ChecklistStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ChecklistStatus::Processing => "processing",
            ChecklistStatus::Ready => "ready",
            ChecklistStatus::Failed => "failed",
        }
    }
}

/// A fully resolved document the applicant must (or should) supply.
/// Category, required, and priority always agree here; the consistency
/// normalizer is the only place that assigns them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub document_type: String,
    pub name: String,
    pub description: String,
    pub category: DocumentCategory,
    pub required: bool,
    pub priority: Priority,
    #[serde(default)]
    pub country_specific: bool,
}

/// Per-application checklist artifact. Never silently mutated after
/// reaching `ready`; changes happen through explicit regeneration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedChecklist {
    pub application_id: ApplicationId,
    pub destination: DestinationCode,
    pub visa_type: VisaType,
    pub items: Vec<ChecklistItem>,
    pub mode: GenerationMode,
    pub status: ChecklistStatus,
    #[serde(default)]
    pub notes: Vec<String>,
    /// Digest of the inputs (pair, approved version, facts) that produced
    /// this checklist; identical inputs short-circuit regeneration.
    pub inputs_hash: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}
