pub mod catalog;
pub mod checklist;
pub mod metrics;
pub mod rules;
