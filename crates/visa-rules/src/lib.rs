//! Domain library for the visa document rules service.
//!
//! Rule sets describing which documents a traveler must supply are versioned
//! per (destination, visa type) pair and move through an administrator-driven
//! approval workflow. Approved rule sets drive personalized checklist
//! generation; when none exists the generator degrades through legacy
//! templates down to a generic fallback list.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
