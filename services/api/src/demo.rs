use std::sync::Arc;

use chrono::Utc;
use clap::Args;

use visa_rules::config::ReviewConfig;
use visa_rules::error::AppError;
use visa_rules::workflows::catalog::{normalize_rule_set, verify_rule_set};
use visa_rules::workflows::checklist::{
    ChecklistError, ChecklistRequest, ChecklistService, FactValue,
};
use visa_rules::workflows::metrics::GenerationMetrics;
use visa_rules::workflows::rules::{
    CandidateReview, CandidateSubmission, DocumentCategory, DocumentRule, Provenance, RuleStore,
    RuleSetPayload,
};

use crate::infra::{
    seed_catalog, seeded_templates, InMemoryCandidateRepository, InMemoryCatalogRepository,
    InMemoryChecklistRepository, InMemoryRuleSetRepository,
};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Destination country code for the demo rule set
    #[arg(long, default_value = "US")]
    pub(crate) destination: String,
    /// Visa type for the demo rule set
    #[arg(long, default_value = "tourist")]
    pub(crate) visa_type: String,
    /// Applicant's sponsorType answer fed to the condition evaluator
    #[arg(long, default_value = "parents")]
    pub(crate) sponsor_type: String,
}

/// End-to-end walkthrough: a candidate is submitted, diffed, approved,
/// normalized against the catalog, and used to generate a checklist.
pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let store = Arc::new(RuleStore::new(Arc::new(
        InMemoryRuleSetRepository::default(),
    )));
    let catalog = Arc::new(InMemoryCatalogRepository::default());
    seed_catalog(&catalog).map_err(ChecklistError::from)?;
    let checklists = Arc::new(InMemoryChecklistRepository::default());

    let review = CandidateReview::new(
        Arc::clone(&store),
        Arc::new(InMemoryCandidateRepository::default()),
        ReviewConfig::default(),
    );
    let checklist_service = ChecklistService::new(
        Arc::clone(&store),
        Arc::new(seeded_templates()),
        Arc::clone(&checklists),
    );
    let metrics = GenerationMetrics::new(Arc::clone(&checklists));

    println!("Visa rules demo: {} / {}", args.destination, args.visa_type);

    let candidate = review.submit(CandidateSubmission {
        destination: args.destination.clone(),
        visa_type: args.visa_type.clone(),
        payload: demo_payload(),
        source_reference: "https://embassy.example/visa-requirements".to_string(),
        confidence: 0.88,
    })?;
    println!(
        "\nSubmitted candidate {} (confidence {:.2})",
        candidate.id.0, candidate.confidence
    );

    let preview = review.preview(candidate.id)?;
    println!("\nDiff preview against the approved rule set:");
    print_json(&preview);

    let approved = review.approve(candidate.id, "demo-admin@example.test")?;
    println!(
        "\nApproved as version {} for {} / {}",
        approved.version, approved.destination, approved.visa_type
    );

    let normalization =
        normalize_rule_set(&approved, catalog.as_ref()).map_err(ChecklistError::from)?;
    println!("\nCatalog normalization report:");
    print_json(&normalization);

    let verification =
        verify_rule_set(&approved, catalog.as_ref()).map_err(ChecklistError::from)?;
    println!(
        "\nCatalog consistency: {}",
        if verification.is_consistent() {
            "clean"
        } else {
            "mismatches found"
        }
    );
    print_json(&verification);

    let checklist = checklist_service.generate(ChecklistRequest {
        application_id: format!("demo-{}", Utc::now().timestamp()),
        destination: args.destination,
        visa_type: args.visa_type,
        facts: [(
            "sponsorType".to_string(),
            FactValue::Text(args.sponsor_type.clone()),
        )]
        .into_iter()
        .collect(),
    })?;
    println!(
        "\nGenerated checklist (sponsorType = {:?}, mode = {}):",
        args.sponsor_type,
        checklist.mode.label()
    );
    print_json(&checklist);

    let summary = metrics.summary(24).map_err(ChecklistError::from)?;
    println!("\nGeneration metrics over the last 24h:");
    print_json(&summary);

    Ok(())
}

fn demo_payload() -> RuleSetPayload {
    RuleSetPayload {
        documents: vec![
            DocumentRule {
                document_type: "passport".to_string(),
                category: DocumentCategory::Required,
                description: "Valid passport".to_string(),
                validity_notes: Some("Valid for 6 months beyond intended stay".to_string()),
                condition: None,
            },
            DocumentRule {
                document_type: "photo".to_string(),
                category: DocumentCategory::Required,
                description: "Recent passport-sized photograph".to_string(),
                validity_notes: None,
                condition: None,
            },
            DocumentRule {
                document_type: "bank_statement".to_string(),
                category: DocumentCategory::Required,
                description: "Bank statements covering the last three months".to_string(),
                validity_notes: None,
                condition: Some("sponsorType == 'self'".to_string()),
            },
        ],
        financial: Default::default(),
        processing: Default::default(),
        fees: Default::default(),
        provenance: Provenance {
            source: "https://embassy.example/visa-requirements".to_string(),
            confidence: 0.88,
            extracted_at: Utc::now(),
        },
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(err) => println!("  (unrenderable: {err})"),
    }
}
