//! Message personalization.
//!
//! Templates use `{{ name }}` placeholders filled from a flat string map.
//! Unknown placeholders render as empty strings, except `first_name`
//! which falls back to "there" so greetings stay readable.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Fallback for a missing `first_name`.
pub const DEFAULT_FIRST_NAME: &str = "there";

const PLACEHOLDER_PATTERN: &str = r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}";

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(PLACEHOLDER_PATTERN).expect("valid regex"));

/// Substitute every placeholder in `template` from `context`.
pub fn render(template: &str, context: &HashMap<String, String>) -> String {
    PLACEHOLDER_RE
        .replace_all(template, |caps: &Captures| {
            let key = &caps[1];
            match context.get(key).filter(|v| !v.trim().is_empty()) {
                Some(value) => value.clone(),
                None if key == "first_name" => DEFAULT_FIRST_NAME.to_string(),
                None => String::new(),
            }
        })
        .into_owned()
}

/// Placeholder names used by a template, in order of first appearance.
pub fn placeholders(template: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in PLACEHOLDER_RE.captures_iter(template) {
        let name = caps[1].to_string();
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}
