use crate::workflows::rules::DocumentCategory;

use super::domain::Priority;

/// Category-related fields as they arrive from a rule set, legacy template,
/// or fallback entry; any subset may be present.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CategoryFields {
    pub category: Option<DocumentCategory>,
    pub required: Option<bool>,
    pub priority: Option<Priority>,
}

/// The three fields after normalization, guaranteed to agree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedCategory {
    pub category: DocumentCategory,
    pub required: bool,
    pub priority: Priority,
}

/// Single source of truth for category/required/priority agreement.
///
/// - category given: `required` is derived (`required ⇔ category == required`)
///   and priority defaults from category unless explicitly set.
/// - category missing but required/priority given: category is derived from
///   those. Priority high or medium with no explicit `required = false`
///   yields highly_recommended, anything else optional, and then required
///   is re-derived from the category.
/// - nothing given: optional/false/medium. Historical payloads rely on this
///   silent default, so it stays; see the open-question note in DESIGN.md.
///
/// Idempotent: feeding a resolved value back through changes nothing.
pub fn resolve_category(fields: CategoryFields) -> ResolvedCategory {
    if fields.category.is_none() && fields.required.is_none() && fields.priority.is_none() {
        return ResolvedCategory {
            category: DocumentCategory::Optional,
            required: false,
            priority: Priority::Medium,
        };
    }

    let category = match fields.category {
        Some(category) => category,
        None => {
            let effective_priority = fields.priority.unwrap_or(Priority::Medium);
            let demoted = fields.required == Some(false);
            match effective_priority {
                Priority::High | Priority::Medium if !demoted => {
                    DocumentCategory::HighlyRecommended
                }
                _ => DocumentCategory::Optional,
            }
        }
    };

    ResolvedCategory {
        category,
        required: category == DocumentCategory::Required,
        priority: fields.priority.unwrap_or(default_priority(category)),
    }
}

const fn default_priority(category: DocumentCategory) -> Priority {
    match category {
        DocumentCategory::Required => Priority::High,
        DocumentCategory::HighlyRecommended => Priority::Medium,
        DocumentCategory::Optional => Priority::Low,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(resolved: ResolvedCategory) -> ResolvedCategory {
        resolve_category(CategoryFields {
            category: Some(resolved.category),
            required: Some(resolved.required),
            priority: Some(resolved.priority),
        })
    }

    #[test]
    fn category_drives_required_and_priority() {
        let resolved = resolve_category(CategoryFields {
            category: Some(DocumentCategory::Required),
            required: None,
            priority: None,
        });
        assert_eq!(resolved.category, DocumentCategory::Required);
        assert!(resolved.required);
        assert_eq!(resolved.priority, Priority::High);

        let resolved = resolve_category(CategoryFields {
            category: Some(DocumentCategory::HighlyRecommended),
            required: None,
            priority: None,
        });
        assert!(!resolved.required);
        assert_eq!(resolved.priority, Priority::Medium);
    }

    #[test]
    fn explicit_priority_survives_category_default() {
        let resolved = resolve_category(CategoryFields {
            category: Some(DocumentCategory::Required),
            required: None,
            priority: Some(Priority::Low),
        });
        assert_eq!(resolved.priority, Priority::Low);
        assert!(resolved.required);
    }

    #[test]
    fn category_derived_from_priority_and_required() {
        let resolved = resolve_category(CategoryFields {
            category: None,
            required: None,
            priority: Some(Priority::High),
        });
        assert_eq!(resolved.category, DocumentCategory::HighlyRecommended);
        assert!(!resolved.required);

        let resolved = resolve_category(CategoryFields {
            category: None,
            required: Some(false),
            priority: Some(Priority::High),
        });
        assert_eq!(resolved.category, DocumentCategory::Optional);

        let resolved = resolve_category(CategoryFields {
            category: None,
            required: None,
            priority: Some(Priority::Low),
        });
        assert_eq!(resolved.category, DocumentCategory::Optional);
        assert_eq!(resolved.priority, Priority::Low);
    }

    #[test]
    fn nothing_given_defaults_to_optional_false_medium() {
        // Deliberate compatibility quirk: the priority default here is
        // medium even though optional otherwise defaults to low.
        let resolved = resolve_category(CategoryFields::default());
        assert_eq!(resolved.category, DocumentCategory::Optional);
        assert!(!resolved.required);
        assert_eq!(resolved.priority, Priority::Medium);
    }

    #[test]
    fn resolution_is_idempotent() {
        let inputs = [
            CategoryFields::default(),
            CategoryFields {
                category: Some(DocumentCategory::Required),
                required: None,
                priority: None,
            },
            CategoryFields {
                category: None,
                required: Some(true),
                priority: None,
            },
            CategoryFields {
                category: None,
                required: Some(false),
                priority: Some(Priority::High),
            },
            CategoryFields {
                category: Some(DocumentCategory::Optional),
                required: Some(true),
                priority: Some(Priority::High),
            },
        ];

        for fields in inputs {
            let once = resolve_category(fields);
            assert_eq!(roundtrip(once), once, "not idempotent for {fields:?}");
        }
    }
}
