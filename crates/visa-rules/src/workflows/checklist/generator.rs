use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::workflows::rules::{
    normalize_document_type, DestinationCode, DocumentCategory, RuleSet, VisaType,
};

use super::condition::applies;
use super::domain::{ChecklistItem, FactMap, GenerationMode, Priority};
use super::normalizer::{resolve_category, CategoryFields};

/// One entry in a pre-rule-engine static template for a destination. Kept
/// loose on purpose: legacy data frequently carries only some of the
/// category fields and relies on the consistency normalizer for the rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyTemplateItem {
    pub document_type: String,
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<DocumentCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub country_specific: bool,
}

/// Source of heuristic per-destination templates for destinations not yet
/// migrated onto the rule engine.
pub trait LegacyTemplateProvider: Send + Sync {
    fn template(
        &self,
        destination: &DestinationCode,
        visa_type: &VisaType,
    ) -> Option<Vec<LegacyTemplateItem>>;
}

/// A resolved document list plus the tier that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedChecklist {
    pub items: Vec<ChecklistItem>,
    pub mode: GenerationMode,
    pub notes: Vec<String>,
}

/// Resolve the document list through the three-tier policy: approved rules,
/// then the legacy template, then the generic fallback. Total: always
/// produces a non-empty checklist.
pub fn resolve_checklist(
    approved: Option<&RuleSet>,
    legacy: Option<Vec<LegacyTemplateItem>>,
    visa_type: &VisaType,
    facts: &FactMap,
) -> ResolvedChecklist {
    if let Some(rule_set) = approved {
        debug!(
            destination = %rule_set.destination,
            visa_type = %rule_set.visa_type,
            version = rule_set.version,
            "generating checklist from approved rule set"
        );
        return from_rule_set(rule_set, facts);
    }

    if let Some(items) = legacy {
        info!(visa_type = %visa_type, "no approved rule set; using legacy template");
        return from_legacy(items);
    }

    info!(visa_type = %visa_type, "no approved rule set or legacy template; using fallback list");
    fallback_checklist(visa_type)
}

fn from_rule_set(rule_set: &RuleSet, facts: &FactMap) -> ResolvedChecklist {
    let items = rule_set
        .payload
        .documents
        .iter()
        .filter(|rule| applies(rule.condition.as_deref(), facts))
        .map(|rule| {
            let resolved = resolve_category(CategoryFields {
                category: Some(rule.category),
                required: None,
                priority: None,
            });
            let document_type = normalize_document_type(&rule.document_type);
            ChecklistItem {
                name: display_name(&document_type),
                document_type,
                description: rule.description.clone(),
                category: resolved.category,
                required: resolved.required,
                priority: resolved.priority,
                country_specific: true,
            }
        })
        .collect();

    ResolvedChecklist {
        items,
        mode: GenerationMode::Rules,
        notes: Vec::new(),
    }
}

fn from_legacy(items: Vec<LegacyTemplateItem>) -> ResolvedChecklist {
    let items = items
        .into_iter()
        .map(|item| {
            let resolved = resolve_category(CategoryFields {
                category: item.category,
                required: item.required,
                priority: item.priority,
            });
            ChecklistItem {
                document_type: normalize_document_type(&item.document_type),
                name: item.name,
                description: item.description,
                category: resolved.category,
                required: resolved.required,
                priority: resolved.priority,
                country_specific: item.country_specific,
            }
        })
        .collect();

    ResolvedChecklist {
        items,
        mode: GenerationMode::Legacy,
        notes: vec![
            "Generated from a static destination template; rule coverage is pending.".to_string(),
        ],
    }
}

/// Destination-agnostic last resort. Deliberately small and clearly marked
/// low-confidence; student visas additionally get the acceptance letter.
fn fallback_checklist(visa_type: &VisaType) -> ResolvedChecklist {
    let mut entries = vec![
        (
            "passport",
            "Valid Passport",
            "Passport valid for at least 6 months beyond intended stay",
        ),
        (
            "application_form",
            "Visa Application Form",
            "Completed and signed visa application form",
        ),
        (
            "photo",
            "Passport Photo",
            "Recent passport-sized photograph",
        ),
        (
            "financial_proof",
            "Financial Proof",
            "Bank statements or proof of sufficient funds",
        ),
    ];
    if visa_type.as_str() == "student" {
        entries.push((
            "acceptance_letter",
            "Acceptance Letter",
            "Letter of acceptance from educational institution",
        ));
    }

    let items = entries
        .into_iter()
        .map(|(document_type, name, description)| {
            let resolved = resolve_category(CategoryFields {
                category: Some(DocumentCategory::Required),
                required: None,
                priority: None,
            });
            ChecklistItem {
                document_type: document_type.to_string(),
                name: name.to_string(),
                description: description.to_string(),
                category: resolved.category,
                required: resolved.required,
                priority: resolved.priority,
                country_specific: false,
            }
        })
        .collect();

    ResolvedChecklist {
        items,
        mode: GenerationMode::Fallback,
        notes: vec![
            "This is a basic checklist. Please verify specific requirements with the embassy."
                .to_string(),
            "Low confidence: no approved rules exist for this destination yet.".to_string(),
        ],
    }
}

fn display_name(document_type: &str) -> String {
    document_type
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
