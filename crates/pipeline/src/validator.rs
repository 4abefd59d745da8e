//! Structural and format checks over cleaned profile data.
//!
//! Validation never modifies the object. Each present section gets its
//! own [`SectionReport`]; the object is valid when every section is.

use std::collections::BTreeMap;

use outreach_core::data_object::{DataObject, JsonMap};
use serde::Serialize;
use serde_json::Value;
use validator::{ValidateEmail, ValidateUrl};

use crate::sections::{BASIC_INFO, CONTENT, ENGAGEMENT, NETWORK};

const REQUIRED_PROFILE_FIELDS: [&str; 3] = ["username", "name", "bio"];
const NON_NEGATIVE_FIELDS: [&str; 4] = ["likes", "comments", "shares", "views"];
const MAX_BIO_LENGTH: usize = 1000;
const MAX_CONTENT_TEXT_LENGTH: usize = 5000;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl SectionReport {
    fn new() -> Self {
        Self { is_valid: true, errors: Vec::new(), warnings: Vec::new() }
    }

    fn error(&mut self, message: impl Into<String>) {
        self.is_valid = false;
        self.errors.push(message.into());
    }

    fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    /// Object-level problems, e.g. no data at all.
    pub errors: Vec<String>,
    pub sections: BTreeMap<&'static str, SectionReport>,
}

impl ValidationReport {
    pub fn error_count(&self) -> usize {
        self.errors.len() + self.sections.values().map(|s| s.errors.len()).sum::<usize>()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DataValidator;

impl DataValidator {
    pub fn validate(&self, object: &DataObject) -> ValidationReport {
        let mut report = ValidationReport {
            is_valid: true,
            errors: Vec::new(),
            sections: BTreeMap::new(),
        };

        if object.data.is_empty() {
            report.is_valid = false;
            report.errors.push("no data".to_string());
            return report;
        }

        if let Some(value) = object.data.get(BASIC_INFO) {
            report.sections.insert(BASIC_INFO, with_object(value, validate_basic_info));
        }
        if let Some(value) = object.data.get(CONTENT) {
            let section = match value.as_array() {
                Some(items) => validate_content(items),
                None => malformed("an array"),
            };
            report.sections.insert(CONTENT, section);
        }
        if let Some(value) = object.data.get(ENGAGEMENT) {
            report.sections.insert(ENGAGEMENT, with_object(value, validate_engagement));
        }
        if let Some(value) = object.data.get(NETWORK) {
            report.sections.insert(NETWORK, with_object(value, validate_network));
        }

        report.is_valid = report.sections.values().all(|s| s.is_valid);
        report
    }
}

fn with_object(value: &Value, check: fn(&JsonMap) -> SectionReport) -> SectionReport {
    match value.as_object() {
        Some(map) => check(map),
        None => malformed("an object"),
    }
}

fn malformed(expected: &str) -> SectionReport {
    let mut report = SectionReport::new();
    report.error(format!("Section must be {expected}"));
    report
}

// ---------------------------------------------------------------------------
// Section checks
// ---------------------------------------------------------------------------

pub fn validate_basic_info(info: &JsonMap) -> SectionReport {
    let mut report = SectionReport::new();

    for field in REQUIRED_PROFILE_FIELDS {
        let present = info
            .get(field)
            .and_then(Value::as_str)
            .is_some_and(|s| !s.trim().is_empty());
        if !present {
            report.error(format!("Missing required field: {field}"));
        }
    }

    if let Some(email) = info.get("email") {
        if !email.as_str().is_some_and(is_valid_email) {
            report.error("Invalid email format");
        }
    }
    if let Some(website) = info.get("website") {
        if !website.as_str().is_some_and(is_valid_url) {
            report.error("Invalid website URL");
        }
    }
    if let Some(bio) = info.get("bio").and_then(Value::as_str) {
        if bio.chars().count() > MAX_BIO_LENGTH {
            report.warn("Bio exceeds recommended length");
        }
    }

    report
}

pub fn validate_content(items: &[Value]) -> SectionReport {
    let mut report = SectionReport::new();

    for item in items {
        let Some(item) = item.as_object() else {
            report.error("Content item must be an object");
            continue;
        };
        if let Some(text) = item.get("text").and_then(Value::as_str) {
            if text.chars().count() > MAX_CONTENT_TEXT_LENGTH {
                report.warn("Content text exceeds recommended length");
            }
        }
        if let Some(media) = item.get("media").and_then(Value::as_array) {
            for m in media {
                if !has_fields(m, &["type", "url"]) {
                    report.error("Invalid media format");
                }
            }
        }
    }

    report
}

pub fn validate_engagement(engagement: &JsonMap) -> SectionReport {
    let mut report = SectionReport::new();

    for field in NON_NEGATIVE_FIELDS {
        match engagement.get(field) {
            None => {}
            Some(v) => match v.as_f64() {
                None => report.error(format!("Invalid {field} value: must be numeric")),
                Some(n) if n < 0.0 => {
                    report.error(format!("Invalid {field} value: must be non-negative"))
                }
                Some(_) => {}
            },
        }
    }

    if let Some(rate) = engagement.get("engagement_rate") {
        if !rate.as_f64().is_some_and(|r| (0.0..=1.0).contains(&r)) {
            report.error("Invalid engagement rate: must be between 0 and 1");
        }
    }

    report
}

pub fn validate_network(network: &JsonMap) -> SectionReport {
    let mut report = SectionReport::new();

    if let Some(connections) = network.get("connections").and_then(Value::as_array) {
        for conn in connections {
            if !has_fields(conn, &["id", "type"]) {
                report.error("Invalid connection format");
            }
        }
    }
    if let Some(metrics) = network.get("metrics") {
        if !has_fields(metrics, &["size", "density"]) {
            report.error("Invalid metrics format");
        }
    }

    report
}

/// Every listed field is present and not null.
fn has_fields(value: &Value, fields: &[&str]) -> bool {
    value
        .as_object()
        .is_some_and(|map| fields.iter().all(|f| map.get(*f).is_some_and(|v| !v.is_null())))
}

fn is_valid_email(email: &str) -> bool {
    email.validate_email()
}

fn is_valid_url(url: &str) -> bool {
    (url.starts_with("https://") || url.starts_with("http://")) && url.validate_url()
}
