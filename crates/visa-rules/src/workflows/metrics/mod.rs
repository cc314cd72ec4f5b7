//! Aggregate generation statistics used to spot rule coverage gaps: which
//! destinations still generate in legacy or fallback mode, and how often
//! generation fails.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;

use crate::workflows::checklist::{ChecklistRepository, ChecklistStatus, GeneratedChecklist};
use crate::workflows::rules::RepositoryError;

/// Ready/failed/processing tallies for one slice of checklists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct GenerationCounts {
    pub ready: u64,
    pub failed: u64,
    pub processing: u64,
}

impl GenerationCounts {
    pub fn total(&self) -> u64 {
        self.ready + self.failed + self.processing
    }
}

/// Per-generation-mode slice of the summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModeBreakdown {
    pub mode: &'static str,
    pub counts: GenerationCounts,
    pub success_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_ready_ms: Option<f64>,
}

/// Per-destination slice of the summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DestinationBreakdown {
    pub destination: String,
    pub counts: GenerationCounts,
    pub success_rate: f64,
    /// Share of this destination's checklists not produced by approved
    /// rules, the coverage gap signal.
    pub non_rules_share: f64,
}

/// Aggregate view over a trailing window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationSummary {
    pub window_hours: u32,
    pub totals: GenerationCounts,
    pub success_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_ready_ms: Option<f64>,
    pub by_mode: Vec<ModeBreakdown>,
    pub by_destination: Vec<DestinationBreakdown>,
}

/// Read-only metrics facade over the checklist repository.
pub struct GenerationMetrics<C> {
    checklists: Arc<C>,
}

impl<C> GenerationMetrics<C>
where
    C: ChecklistRepository + 'static,
{
    pub fn new(checklists: Arc<C>) -> Self {
        Self { checklists }
    }

    pub fn summary(&self, window_hours: u32) -> Result<GenerationSummary, RepositoryError> {
        let cutoff = Utc::now() - Duration::hours(i64::from(window_hours));
        let checklists = self.checklists.created_since(cutoff)?;
        Ok(summarize(&checklists, window_hours))
    }
}

/// Pure aggregation over an already-fetched slice of checklists.
pub fn summarize(checklists: &[GeneratedChecklist], window_hours: u32) -> GenerationSummary {
    let totals = count(checklists.iter());
    let overall_average_ready_ms = average_ready_ms(checklists.iter());

    // A generation that fails does so before any tier runs, so a failed
    // row carries no meaningful mode; failures are tallied in the totals
    // and destination slices only.
    let by_mode = ["rules", "legacy", "fallback"]
        .into_iter()
        .map(|mode| {
            let slice: Vec<&GeneratedChecklist> = checklists
                .iter()
                .filter(|checklist| {
                    checklist.status != ChecklistStatus::Failed
                        && checklist.mode.label() == mode
                })
                .collect();
            let counts = count(slice.iter().copied());
            ModeBreakdown {
                mode,
                counts,
                success_rate: success_rate(counts),
                average_ready_ms: average_ready_ms(slice.into_iter()),
            }
        })
        .collect();

    let mut per_destination: BTreeMap<String, Vec<&GeneratedChecklist>> = BTreeMap::new();
    for checklist in checklists {
        per_destination
            .entry(checklist.destination.as_str().to_string())
            .or_default()
            .push(checklist);
    }
    let by_destination = per_destination
        .into_iter()
        .map(|(destination, slice)| {
            let counts = count(slice.iter().copied());
            let non_rules = slice
                .iter()
                .filter(|c| c.mode.label() != "rules")
                .count() as f64;
            let total = counts.total() as f64;
            DestinationBreakdown {
                destination,
                counts,
                success_rate: success_rate(counts),
                non_rules_share: if total > 0.0 { non_rules / total } else { 0.0 },
            }
        })
        .collect();

    GenerationSummary {
        window_hours,
        totals,
        success_rate: success_rate(totals),
        average_ready_ms: overall_average_ready_ms,
        by_mode,
        by_destination,
    }
}

fn count<'a>(checklists: impl Iterator<Item = &'a GeneratedChecklist>) -> GenerationCounts {
    let mut counts = GenerationCounts::default();
    for checklist in checklists {
        match checklist.status {
            ChecklistStatus::Ready => counts.ready += 1,
            ChecklistStatus::Failed => counts.failed += 1,
            ChecklistStatus::Processing => counts.processing += 1,
        }
    }
    counts
}

fn success_rate(counts: GenerationCounts) -> f64 {
    let decided = counts.ready + counts.failed;
    if decided == 0 {
        return 0.0;
    }
    counts.ready as f64 / decided as f64
}

fn average_ready_ms<'a>(
    checklists: impl Iterator<Item = &'a GeneratedChecklist>,
) -> Option<f64> {
    let durations: Vec<i64> = checklists
        .filter(|checklist| checklist.status == ChecklistStatus::Ready)
        .filter_map(|checklist| {
            checklist
                .completed_at
                .map(|done| (done - checklist.created_at).num_milliseconds())
        })
        .collect();

    if durations.is_empty() {
        return None;
    }
    Some(durations.iter().sum::<i64>() as f64 / durations.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::checklist::{ApplicationId, GenerationMode};
    use crate::workflows::rules::{DestinationCode, VisaType};
    use chrono::Duration;

    fn checklist(
        id: &str,
        destination: &str,
        mode: GenerationMode,
        status: ChecklistStatus,
        ready_after_ms: i64,
    ) -> GeneratedChecklist {
        let created_at = Utc::now() - Duration::minutes(5);
        GeneratedChecklist {
            application_id: ApplicationId(id.to_string()),
            destination: DestinationCode::new(destination),
            visa_type: VisaType::new("tourist"),
            items: Vec::new(),
            mode,
            status,
            notes: Vec::new(),
            inputs_hash: "digest".to_string(),
            created_at,
            completed_at: matches!(status, ChecklistStatus::Ready | ChecklistStatus::Failed)
                .then(|| created_at + Duration::milliseconds(ready_after_ms)),
        }
    }

    #[test]
    fn summary_partitions_by_mode_and_destination() {
        let checklists = vec![
            checklist("a", "US", GenerationMode::Rules, ChecklistStatus::Ready, 120),
            checklist("b", "US", GenerationMode::Rules, ChecklistStatus::Ready, 80),
            checklist("c", "DE", GenerationMode::Legacy, ChecklistStatus::Ready, 200),
            checklist("d", "JP", GenerationMode::Fallback, ChecklistStatus::Failed, 40),
            checklist("e", "JP", GenerationMode::Fallback, ChecklistStatus::Processing, 0),
        ];

        let summary = summarize(&checklists, 24);

        assert_eq!(summary.totals.ready, 3);
        assert_eq!(summary.totals.failed, 1);
        assert_eq!(summary.totals.processing, 1);
        assert!((summary.success_rate - 0.75).abs() < f64::EPSILON);

        let rules = summary
            .by_mode
            .iter()
            .find(|slice| slice.mode == "rules")
            .expect("rules slice");
        assert_eq!(rules.counts.ready, 2);
        assert_eq!(rules.average_ready_ms, Some(100.0));

        let jp = summary
            .by_destination
            .iter()
            .find(|slice| slice.destination == "JP")
            .expect("JP slice");
        assert_eq!(jp.counts.failed, 1);
        assert!((jp.non_rules_share - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn failures_count_in_totals_and_destinations_but_not_mode_slices() {
        let checklists = vec![
            checklist("a", "US", GenerationMode::Rules, ChecklistStatus::Ready, 90),
            checklist("b", "US", GenerationMode::Fallback, ChecklistStatus::Failed, 10),
        ];

        let summary = summarize(&checklists, 24);

        assert_eq!(summary.totals.failed, 1);
        let us = summary
            .by_destination
            .iter()
            .find(|slice| slice.destination == "US")
            .expect("US slice");
        assert_eq!(us.counts.failed, 1);

        for slice in &summary.by_mode {
            assert_eq!(slice.counts.failed, 0, "mode '{}' absorbed a failure", slice.mode);
        }
    }

    #[test]
    fn empty_window_produces_zeroed_summary() {
        let summary = summarize(&[], 6);
        assert_eq!(summary.totals.total(), 0);
        assert_eq!(summary.success_rate, 0.0);
        assert_eq!(summary.average_ready_ms, None);
        assert!(summary.by_destination.is_empty());
    }
}
