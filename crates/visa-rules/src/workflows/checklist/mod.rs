//! Per-applicant checklist generation: condition evaluation against
//! questionnaire facts, the category-consistency normalizer, and the
//! three-tier rules/legacy/fallback policy.

pub mod condition;
pub mod domain;
pub mod generator;
pub mod normalizer;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use condition::{applies, Condition, ConditionError};
pub use domain::{
    ApplicationId, ChecklistItem, ChecklistStatus, FactMap, FactValue, GeneratedChecklist,
    GenerationMode, Priority,
};
pub use generator::{
    resolve_checklist, LegacyTemplateItem, LegacyTemplateProvider, ResolvedChecklist,
};
pub use normalizer::{resolve_category, CategoryFields, ResolvedCategory};
pub use repository::ChecklistRepository;
pub use router::checklist_router;
pub use service::{ChecklistError, ChecklistRequest, ChecklistService};
