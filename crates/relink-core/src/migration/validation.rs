//! Validation of new link field definitions.
//!
//! A definition is validated as a unit before anything is persisted. Errors
//! are collected per attribute so the whole map can be logged at once.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use crate::models::{FieldErrors, NewFieldDefinition};

/// Field handles: a letter, then letters, digits and underscores.
static HANDLE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9_]*$").expect("handle pattern compiles"));

/// Whether `handle` is a valid field handle.
pub fn is_valid_handle(handle: &str) -> bool {
    HANDLE_PATTERN.is_match(handle)
}

/// Validate a definition. Returns every problem found, keyed by attribute.
pub fn validate_field_definition(definition: &NewFieldDefinition) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::default();

    if definition.handle.trim().is_empty() {
        errors.add("handle", "Handle cannot be blank.");
    } else if !is_valid_handle(&definition.handle) {
        errors.add(
            "handle",
            format!("“{}” isn’t a valid handle.", definition.handle),
        );
    }

    let link_types = &definition.settings.link_types;
    let mut seen = HashSet::with_capacity(link_types.len());

    for link_type in link_types {
        if link_type.label.trim().is_empty() {
            errors.add(
                "linkTypes",
                format!("Link type “{}” needs a label.", link_type.handle),
            );
        }

        if !seen.insert(link_type.handle.as_str()) {
            errors.add(
                "linkTypes",
                format!("Handle “{}” is used more than once.", link_type.handle),
            );
        }
    }

    if let Some(default) = &definition.settings.default_link_type {
        if !link_types.iter().any(|link_type| &link_type.handle == default) {
            errors.add(
                "defaultLinkType",
                format!("Default link type “{}” is not one of the link types.", default),
            );
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
