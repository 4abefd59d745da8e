//! Input validation rules for outreach entities.
//!
//! Each function returns `CoreError::Validation` with a message suitable
//! for the API response body.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use validator::{ValidateEmail, ValidateUrl};

use crate::error::CoreError;
use crate::types::DbId;

/// Maximum length of entity names (templates, campaigns, A/B tests).
pub const MAX_NAME_LENGTH: usize = 255;

/// Maximum length of a template body.
pub const MAX_TEMPLATE_CONTENT_LENGTH: usize = 20_000;

/// Bulk updates touch at most this many prospects per request.
pub const MAX_BULK_UPDATE: usize = 500;

// ---------------------------------------------------------------------------
// Prospects
// ---------------------------------------------------------------------------

/// Trim and lowercase an email, rejecting malformed addresses.
pub fn normalize_email(email: &str) -> Result<String, CoreError> {
    let normalized = email.trim().to_ascii_lowercase();
    if !normalized.as_str().validate_email() {
        return Err(CoreError::validation(format!("Invalid email address '{email}'")));
    }
    Ok(normalized)
}

/// Website URLs must parse as absolute URLs when present.
pub fn validate_website(website: Option<&str>) -> Result<(), CoreError> {
    match website {
        Some(url) if !url.validate_url() => {
            Err(CoreError::validation(format!("Invalid website URL '{url}'")))
        }
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Templates / campaigns
// ---------------------------------------------------------------------------

/// Trim a name and enforce non-empty and length limits.
pub fn normalize_name(field: &str, name: &str) -> Result<String, CoreError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CoreError::validation(format!("{field} must not be empty")));
    }
    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err(CoreError::validation(format!(
            "{field} must be at most {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Template content must contain something other than whitespace.
pub fn validate_template_content(content: &str) -> Result<(), CoreError> {
    if content.trim().is_empty() {
        return Err(CoreError::validation("Template content must not be empty"));
    }
    if content.chars().count() > MAX_TEMPLATE_CONTENT_LENGTH {
        return Err(CoreError::validation(format!(
            "Template content must be at most {MAX_TEMPLATE_CONTENT_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Campaign targeting: `min_score` must be a qualification score.
pub fn validate_min_score(min_score: Option<i64>) -> Result<(), CoreError> {
    match min_score {
        Some(score) if !(0..=100).contains(&score) => Err(CoreError::validation(
            "target_criteria.min_score must be between 0 and 100",
        )),
        _ => Ok(()),
    }
}

pub fn validate_sequence_step(step_number: i32, delay_days: i32) -> Result<(), CoreError> {
    if step_number < 1 {
        return Err(CoreError::validation("step_number must be at least 1"));
    }
    if delay_days < 0 {
        return Err(CoreError::validation("delay_days must not be negative"));
    }
    Ok(())
}

pub fn validate_bulk_size(count: usize) -> Result<(), CoreError> {
    if count == 0 {
        return Err(CoreError::validation("prospect_ids must not be empty"));
    }
    if count > MAX_BULK_UPDATE {
        return Err(CoreError::validation(format!(
            "At most {MAX_BULK_UPDATE} prospects can be updated at once"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// A/B tests
// ---------------------------------------------------------------------------

/// One arm of an A/B test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbVariant {
    pub variant_id: String,
    pub template_id: DbId,
}

/// An A/B test needs at least two variants with distinct ids.
pub fn validate_ab_variants(variants: &[AbVariant]) -> Result<(), CoreError> {
    if variants.len() < 2 {
        return Err(CoreError::validation("An A/B test needs at least two variants"));
    }
    let mut seen = HashSet::new();
    for v in variants {
        if v.variant_id.trim().is_empty() {
            return Err(CoreError::validation("variant_id must not be empty"));
        }
        if !seen.insert(v.variant_id.as_str()) {
            return Err(CoreError::validation(format!(
                "Duplicate variant_id '{}'",
                v.variant_id
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Webhooks
// ---------------------------------------------------------------------------

/// Outbound webhook targets must be http(s) URLs.
pub fn validate_webhook_url(url: &str) -> Result<(), CoreError> {
    if !url.validate_url() || !(url.starts_with("https://") || url.starts_with("http://")) {
        return Err(CoreError::validation(format!("Invalid webhook URL '{url}'")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn email_is_normalized() {
        assert_eq!(normalize_email("  Jane@Example.COM ").unwrap(), "jane@example.com");
    }

    #[test]
    fn malformed_email_is_rejected() {
        assert_matches!(normalize_email("not-an-email"), Err(CoreError::Validation(_)));
    }

    #[test]
    fn website_must_be_a_url() {
        assert!(validate_website(None).is_ok());
        assert!(validate_website(Some("https://example.com")).is_ok());
        assert!(validate_website(Some("example dot com")).is_err());
    }

    #[test]
    fn empty_template_content_fails() {
        assert_matches!(validate_template_content(""), Err(CoreError::Validation(_)));
        assert_matches!(validate_template_content("   \n"), Err(CoreError::Validation(_)));
        assert!(validate_template_content("Hi {{ first_name }}").is_ok());
    }

    #[test]
    fn names_are_trimmed() {
        assert_eq!(normalize_name("name", "  Spring Push ").unwrap(), "Spring Push");
        assert!(normalize_name("name", "   ").is_err());
        assert!(normalize_name("name", &"x".repeat(256)).is_err());
    }

    #[test]
    fn min_score_bounds() {
        assert!(validate_min_score(None).is_ok());
        assert!(validate_min_score(Some(0)).is_ok());
        assert!(validate_min_score(Some(100)).is_ok());
        assert!(validate_min_score(Some(101)).is_err());
        assert!(validate_min_score(Some(-1)).is_err());
    }

    #[test]
    fn sequence_step_rules() {
        assert!(validate_sequence_step(1, 0).is_ok());
        assert!(validate_sequence_step(0, 0).is_err());
        assert!(validate_sequence_step(2, -1).is_err());
    }

    #[test]
    fn ab_variants_need_two_distinct_ids() {
        let a = AbVariant { variant_id: "A".into(), template_id: 1 };
        let b = AbVariant { variant_id: "B".into(), template_id: 2 };
        assert!(validate_ab_variants(&[a.clone()]).is_err());
        assert!(validate_ab_variants(&[a.clone(), a.clone()]).is_err());
        assert!(validate_ab_variants(&[a, b]).is_ok());
    }

    #[test]
    fn bulk_size_limits() {
        assert!(validate_bulk_size(0).is_err());
        assert!(validate_bulk_size(1).is_ok());
        assert!(validate_bulk_size(MAX_BULK_UPDATE + 1).is_err());
    }

    #[test]
    fn webhook_url_requires_http_scheme() {
        assert!(validate_webhook_url("https://hooks.example.com/x").is_ok());
        assert!(validate_webhook_url("ftp://example.com").is_err());
        assert!(validate_webhook_url("nope").is_err());
    }
}
