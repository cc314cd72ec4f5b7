//! Shared document catalog and the normalized counterpart to each rule
//! set's embedded document list, with a consistency verifier between the
//! two representations.

pub mod domain;
pub mod normalizer;
pub mod repository;
pub mod verifier;

#[cfg(test)]
mod tests;

pub use domain::{CatalogEntry, DocumentId, DocumentReference};
pub use normalizer::{normalize_batch, normalize_rule_set, NormalizationReport, UnresolvedDocument};
pub use repository::CatalogRepository;
pub use verifier::{verify_rule_set, CategoryMismatch, ConditionMismatch, VerificationReport};
