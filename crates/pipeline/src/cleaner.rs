//! Normalization of raw scraped profile data.
//!
//! Each section is rebuilt from the fields it is known to carry, with text
//! stripped of markup, counters coerced to integers, dates to ISO format,
//! URLs to a canonical form and rates into `[0, 1]`. Unknown top-level
//! sections pass through untouched.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate};
use outreach_core::data_object::{DataObject, JsonMap};
use regex::Regex;
use serde_json::{json, Value};

use crate::error::PipelineError;
use crate::sections::{self, BASIC_INFO, CONTENT, ENGAGEMENT, NETWORK};

const TEXT_FIELDS: [&str; 5] = ["name", "username", "bio", "location", "website"];
const COUNT_FIELDS: [&str; 3] = ["followers", "following", "posts"];
const DATE_FIELDS: [&str; 2] = ["join_date", "last_active"];
const URL_FIELDS: [&str; 2] = ["profile_picture", "banner_image"];

/// Engagement counters kept as integers.
const ENGAGEMENT_COUNTS: [&str; 8] = [
    "likes",
    "comments",
    "shares",
    "views",
    "clicks",
    "conversions",
    "followers",
    "following",
];

/// Engagement ratios kept in `[0, 1]`.
const ENGAGEMENT_RATES: [&str; 5] = [
    "engagement_rate",
    "quality_score",
    "click_through_rate",
    "conversion_rate",
    "response_rate",
];

/// Accepted date layouts, tried in order. RFC 3339 is tried last.
const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%B %d, %Y", "%d %B %Y"];

#[derive(Debug, Default, Clone, Copy)]
pub struct DataCleaner;

impl DataCleaner {
    /// Clean every known section of `object` in place.
    ///
    /// A malformed section is removed and reported; the other sections
    /// are still cleaned.
    pub fn clean(&self, object: &mut DataObject) -> Vec<PipelineError> {
        let mut errors = Vec::new();

        match sections::object(&object.data, BASIC_INFO) {
            Ok(Some(info)) => {
                let cleaned = clean_basic_info(info);
                object.update_data(BASIC_INFO, Value::Object(cleaned));
            }
            Ok(None) => {}
            Err(e) => {
                object.data.remove(BASIC_INFO);
                errors.push(e);
            }
        }

        match sections::array(&object.data, CONTENT) {
            Ok(Some(items)) => {
                let cleaned = clean_content(items);
                object.update_data(CONTENT, Value::Array(cleaned));
            }
            Ok(None) => {}
            Err(e) => {
                object.data.remove(CONTENT);
                errors.push(e);
            }
        }

        match sections::object(&object.data, ENGAGEMENT) {
            Ok(Some(engagement)) => {
                let cleaned = clean_engagement(engagement);
                object.update_data(ENGAGEMENT, Value::Object(cleaned));
            }
            Ok(None) => {}
            Err(e) => {
                object.data.remove(ENGAGEMENT);
                errors.push(e);
            }
        }

        match sections::object(&object.data, NETWORK) {
            Ok(Some(network)) => {
                let cleaned = clean_network(network);
                object.update_data(NETWORK, Value::Object(cleaned));
            }
            Ok(None) => {}
            Err(e) => {
                object.data.remove(NETWORK);
                errors.push(e);
            }
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

pub fn clean_basic_info(info: &JsonMap) -> JsonMap {
    let mut out = JsonMap::new();
    for field in TEXT_FIELDS {
        if let Some(v) = info.get(field) {
            out.insert(field.into(), Value::String(clean_text(v)));
        }
    }
    for field in COUNT_FIELDS {
        if let Some(v) = info.get(field) {
            out.insert(field.into(), json!(clean_number(v)));
        }
    }
    for field in DATE_FIELDS {
        if let Some(v) = info.get(field) {
            out.insert(field.into(), json!(clean_date(v)));
        }
    }
    for field in URL_FIELDS {
        if let Some(v) = info.get(field) {
            out.insert(field.into(), json!(clean_url(v)));
        }
    }
    // Contact email is validated later; only surrounding space is removed.
    if let Some(email) = info.get("email").and_then(Value::as_str) {
        out.insert("email".into(), Value::String(email.trim().to_string()));
    }
    out
}

pub fn clean_content(items: &[Value]) -> Vec<Value> {
    items
        .iter()
        .filter_map(Value::as_object)
        .map(|item| {
            let media: Vec<Value> = item
                .get("media")
                .and_then(Value::as_array)
                .map(|m| m.iter().filter_map(Value::as_object).map(clean_media).collect())
                .unwrap_or_default();
            let engagement = item
                .get("engagement")
                .and_then(Value::as_object)
                .map(clean_engagement)
                .unwrap_or_default();
            let metadata = item
                .get("metadata")
                .and_then(Value::as_object)
                .map(clean_metadata)
                .unwrap_or_default();

            let mut out = JsonMap::new();
            if let Some(id) = item.get("id") {
                out.insert("id".into(), Value::String(value_to_string(id)));
            }
            if let Some(kind) = item.get("type").and_then(Value::as_str) {
                out.insert("type".into(), Value::String(kind.trim().to_lowercase()));
            }
            let text = clean_text(item.get("text").unwrap_or(&Value::Null));
            out.insert("text".into(), Value::String(text));
            out.insert("media".into(), Value::Array(media));
            out.insert("engagement".into(), Value::Object(engagement));
            out.insert("metadata".into(), Value::Object(metadata));
            Value::Object(out)
        })
        .collect()
}

pub fn clean_engagement(engagement: &JsonMap) -> JsonMap {
    let mut out = JsonMap::new();
    for field in ENGAGEMENT_COUNTS {
        if let Some(v) = engagement.get(field) {
            out.insert(field.into(), json!(clean_number(v)));
        }
    }
    for field in ENGAGEMENT_RATES {
        if let Some(v) = engagement.get(field) {
            out.insert(field.into(), json!(clean_score(v)));
        }
    }
    // Hours; fractional values are meaningful here.
    if let Some(hours) = engagement.get("avg_response_time").and_then(Value::as_f64) {
        out.insert("avg_response_time".into(), json!(hours.max(0.0)));
    }
    out
}

pub fn clean_network(network: &JsonMap) -> JsonMap {
    let mut out = JsonMap::new();
    if let Some(connections) = network.get("connections").and_then(Value::as_array) {
        let cleaned: Vec<Value> = connections
            .iter()
            .filter_map(Value::as_object)
            .map(|conn| {
                json!({
                    "id": conn.get("id").map(value_to_string).unwrap_or_default(),
                    "type": conn.get("type").and_then(Value::as_str).unwrap_or("unknown"),
                    "strength": clean_score(conn.get("strength").unwrap_or(&Value::Null)),
                    "metadata": conn
                        .get("metadata")
                        .and_then(Value::as_object)
                        .map(clean_metadata)
                        .unwrap_or_default(),
                })
            })
            .collect();
        out.insert("connections".into(), Value::Array(cleaned));
    }
    if let Some(metrics) = network.get("metrics").and_then(Value::as_object) {
        let field = |k: &str| metrics.get(k).unwrap_or(&Value::Null);
        out.insert(
            "metrics".into(),
            json!({
                "size": clean_number(field("size")),
                "density": clean_score(field("density")),
                "centrality": clean_score(field("centrality")),
                "clustering": clean_score(field("clustering")),
            }),
        );
    }
    out
}

fn clean_media(item: &JsonMap) -> Value {
    json!({
        "type": item.get("type").and_then(Value::as_str).unwrap_or("unknown"),
        "url": clean_url(item.get("url").unwrap_or(&Value::Null)),
        "metadata": item
            .get("metadata")
            .and_then(Value::as_object)
            .map(clean_metadata)
            .unwrap_or_default(),
    })
}

/// Recursively clean free-form metadata: strings as text, numbers as
/// integers, nested objects and arrays element-wise.
pub fn clean_metadata(metadata: &JsonMap) -> JsonMap {
    metadata
        .iter()
        .map(|(key, value)| (key.clone(), clean_metadata_value(value)))
        .collect()
}

fn clean_metadata_value(value: &Value) -> Value {
    match value {
        Value::String(_) => Value::String(clean_text(value)),
        Value::Number(_) => json!(clean_number(value)),
        Value::Object(map) => Value::Object(clean_metadata(map)),
        Value::Array(items) => Value::Array(items.iter().map(clean_metadata_value).collect()),
        other => other.clone(),
    }
}

// ---------------------------------------------------------------------------
// Field cleaners
// ---------------------------------------------------------------------------

static HTML_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

static NON_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s]").expect("valid regex"));

fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Strip HTML, replace punctuation with spaces and collapse whitespace.
pub fn clean_text(value: &Value) -> String {
    let raw = value_to_string(value);
    if raw.is_empty() {
        return raw;
    }
    let without_tags = HTML_TAG_RE.replace_all(&raw, " ");
    let decoded = without_tags
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");
    let words = NON_WORD_RE.replace_all(&decoded, " ");
    words.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Coerce a counter: integers pass, floats truncate, strings keep their
/// digits (`"1,234 followers"` is 1234). Anything else is 0.
pub fn clean_number(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
            .unwrap_or(0),
        Value::String(s) => {
            let digits: String = s.chars().filter(char::is_ascii_digit).collect();
            digits.parse().unwrap_or(0)
        }
        _ => 0,
    }
}

/// Parse a date in one of the accepted layouts and emit `YYYY-MM-DD`.
pub fn clean_date(value: &Value) -> Option<String> {
    let raw = value.as_str()?.trim();
    if raw.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
        .map(|d| d.format("%Y-%m-%d").to_string())
}

/// Drop query and fragment, default the scheme to https and trim the
/// trailing slash.
pub fn clean_url(value: &Value) -> Option<String> {
    let raw = value.as_str()?.trim();
    let base = raw.split(['?', '#']).next().unwrap_or_default();
    if base.is_empty() {
        return None;
    }
    let with_scheme = if base.starts_with("http://") || base.starts_with("https://") {
        base.to_string()
    } else {
        format!("https://{base}")
    };
    Some(with_scheme.trim_end_matches('/').to_string())
}

/// Coerce a rate into `[0, 1]`. Accepts numbers, `"85%"`, `"3/4"` and
/// numeric strings; anything unparseable is 0.
pub fn clean_score(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_score_str(s.trim()),
        _ => None,
    };
    parsed
        .filter(|f| f.is_finite())
        .map(|f| f.clamp(0.0, 1.0))
        .unwrap_or(0.0)
}

fn parse_score_str(s: &str) -> Option<f64> {
    if let Some(pct) = s.strip_suffix('%') {
        return pct.trim().parse::<f64>().ok().map(|p| p / 100.0);
    }
    if let Some((num, denom)) = s.split_once('/') {
        let num: f64 = num.trim().parse().ok()?;
        let denom: f64 = denom.trim().parse().ok()?;
        if denom == 0.0 {
            return None;
        }
        return Some(num / denom);
    }
    s.parse().ok()
}

#[cfg(test)]
mod tests {
    use outreach_core::platform::Platform;
    use serde_json::json;

    use super::*;

    #[test]
    fn text_is_stripped_of_markup_and_punctuation() {
        assert_eq!(
            clean_text(&json!("<b>Hello</b>,   world!! <br/>I&amp;you")),
            "Hello world I you"
        );
        assert_eq!(clean_text(&Value::Null), "");
        assert_eq!(clean_text(&json!(42)), "42");
    }

    #[test]
    fn numbers_are_coerced() {
        assert_eq!(clean_number(&json!(12)), 12);
        assert_eq!(clean_number(&json!(12.9)), 12);
        assert_eq!(clean_number(&json!("1,234 followers")), 1234);
        assert_eq!(clean_number(&json!("none")), 0);
        assert_eq!(clean_number(&json!(null)), 0);
    }

    #[test]
    fn dates_are_normalized() {
        assert_eq!(clean_date(&json!("2023-04-05")).as_deref(), Some("2023-04-05"));
        assert_eq!(clean_date(&json!("25/12/2022")).as_deref(), Some("2022-12-25"));
        assert_eq!(clean_date(&json!("March 3, 2021")).as_deref(), Some("2021-03-03"));
        assert_eq!(clean_date(&json!("7 July 2020")).as_deref(), Some("2020-07-07"));
        assert_eq!(
            clean_date(&json!("2024-01-02T10:00:00Z")).as_deref(),
            Some("2024-01-02")
        );
        assert_eq!(clean_date(&json!("yesterday")), None);
    }

    #[test]
    fn urls_are_canonicalized() {
        assert_eq!(
            clean_url(&json!("example.com/profile/?utm=x#top")).as_deref(),
            Some("https://example.com/profile")
        );
        assert_eq!(
            clean_url(&json!("http://a.test/")).as_deref(),
            Some("http://a.test")
        );
        assert_eq!(clean_url(&json!("")), None);
    }

    #[test]
    fn scores_accept_percent_and_fractions() {
        assert_eq!(clean_score(&json!("85%")), 0.85);
        assert_eq!(clean_score(&json!("3/4")), 0.75);
        assert_eq!(clean_score(&json!(1.7)), 1.0);
        assert_eq!(clean_score(&json!(-2)), 0.0);
        assert_eq!(clean_score(&json!("1/0")), 0.0);
        assert_eq!(clean_score(&json!("abc")), 0.0);
    }

    #[test]
    fn clean_rebuilds_sections() {
        let data = json!({
            "basic_info": {
                "name": "<i>Jane</i> Doe",
                "followers": "10,500",
                "join_date": "01/02/2020",
                "profile_picture": "cdn.test/p.png?size=200",
                "unexpected": "dropped"
            },
            "content": [
                {"id": 1, "type": "Promotional", "text": "Buy <b>now</b>!",
                 "media": [{"type": "image", "url": "img.test/a.png"}],
                 "engagement": {"likes": "12", "comments": 3}}
            ],
            "network": {"metrics": {"size": 40, "density": "50%"}},
            "extra": {"kept": true}
        });
        let mut obj = DataObject::with_data(
            Platform::Instagram,
            "https://instagram.com/jane",
            data.as_object().cloned().unwrap(),
        );

        let errors = DataCleaner.clean(&mut obj);
        assert!(errors.is_empty());

        let info = obj.section("basic_info").unwrap();
        assert_eq!(info["name"], "Jane Doe");
        assert_eq!(info["followers"], 10_500);
        assert_eq!(info["join_date"], "2020-02-01");
        assert_eq!(info["profile_picture"], "https://cdn.test/p.png");
        assert!(info.get("unexpected").is_none());

        let item = &obj.data["content"][0];
        assert_eq!(item["id"], "1");
        assert_eq!(item["type"], "promotional");
        assert_eq!(item["text"], "Buy now");
        assert_eq!(item["media"][0]["url"], "https://img.test/a.png");
        assert_eq!(item["engagement"]["likes"], 12);

        assert_eq!(obj.data["network"]["metrics"]["density"], 0.5);
        assert_eq!(obj.data["network"]["metrics"]["centrality"], 0.0);
        assert_eq!(obj.data["extra"]["kept"], true);
    }

    #[test]
    fn malformed_section_is_dropped_and_reported() {
        let mut obj = DataObject::with_data(
            Platform::Twitter,
            "u",
            json!({"basic_info": "oops", "engagement": {"likes": 1}})
                .as_object()
                .cloned()
                .unwrap(),
        );
        let errors = DataCleaner.clean(&mut obj);
        assert_eq!(errors, vec![PipelineError::malformed("basic_info", "an object")]);
        assert!(obj.data.get("basic_info").is_none());
        assert_eq!(obj.data["engagement"]["likes"], 1);
    }
}
