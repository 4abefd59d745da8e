//! Where discovery tasks get their raw profile data.
//!
//! Scraping itself runs outside this system. [`HttpProfileSource`] asks a
//! scraping service for one kind of data about one target and wraps the
//! answer in a [`DataObject`].

use std::sync::Arc;

use async_trait::async_trait;
use outreach_core::data_object::{DataObject, JsonMap};
use outreach_core::platform::Platform;
use outreach_core::task::TaskKind;
use serde_json::{json, Value};

use crate::error::ChannelError;
use crate::rate_limiter::RateLimiter;
use crate::retry::RetryingClient;

#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn fetch(
        &self,
        platform: Platform,
        kind: TaskKind,
        target: &Value,
    ) -> Result<DataObject, ChannelError>;
}

/// Data section a task kind fills.
pub fn section_for(kind: TaskKind) -> &'static str {
    match kind {
        TaskKind::Profile => "basic_info",
        TaskKind::Content => "content",
        TaskKind::Network => "network",
        TaskKind::Engagement => "engagement",
    }
}

pub struct HttpProfileSource {
    base_url: String,
    limiter: Arc<RateLimiter>,
}

impl HttpProfileSource {
    pub fn new(base_url: impl Into<String>, limiter: Arc<RateLimiter>) -> Self {
        Self { base_url: base_url.into(), limiter }
    }
}

#[async_trait]
impl ProfileSource for HttpProfileSource {
    async fn fetch(
        &self,
        platform: Platform,
        kind: TaskKind,
        target: &Value,
    ) -> Result<DataObject, ChannelError> {
        // One client per platform so 429s back off the scraped platform.
        let http = RetryingClient::new(Arc::clone(&self.limiter), platform)?;
        let url = format!("{}/scrape", self.base_url.trim_end_matches('/'));
        let body = json!({
            "platform": platform,
            "kind": kind,
            "target": target,
        });
        let response = http.send(|client| client.post(&url).json(&body)).await?;
        let payload: Value = response.json().await?;
        tracing::debug!(platform = %platform, kind = kind.as_str(), "Fetched profile data");
        Ok(into_data_object(platform, kind, target, payload))
    }
}

/// Build the envelope for a scraper answer.
///
/// The answer is `{"data": {...}, "metadata": {...}}` or `{"error": "..."}`.
/// Data that does not already carry the kind's section is wrapped in it.
pub fn into_data_object(
    platform: Platform,
    kind: TaskKind,
    target: &Value,
    payload: Value,
) -> DataObject {
    let url = target
        .get("url")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("{platform}:{}", kind.as_str()));

    if let Some(error) = payload.get("error").and_then(Value::as_str) {
        return DataObject::failed(platform, url, error);
    }

    let section = section_for(kind);
    let data = match payload.get("data") {
        Some(Value::Object(map)) if map.contains_key(section) => map.clone(),
        Some(other @ (Value::Object(_) | Value::Array(_))) => {
            let mut wrapped = JsonMap::new();
            wrapped.insert(section.to_string(), other.clone());
            wrapped
        }
        _ => JsonMap::new(),
    };

    let mut object = DataObject::with_data(platform, url, data);
    if let Some(Value::Object(metadata)) = payload.get("metadata") {
        object.merge_metadata(metadata.clone());
    }
    object.add_metadata("task_kind", json!(kind.as_str()));
    object
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_bare_data_in_section() {
        let object = into_data_object(
            Platform::Twitter,
            TaskKind::Profile,
            &json!({"url": "https://twitter.com/jane"}),
            json!({"data": {"username": "jane"}}),
        );
        assert!(object.is_valid());
        assert_eq!(object.url, "https://twitter.com/jane");
        assert_eq!(object.section("basic_info").unwrap()["username"], "jane");
        assert_eq!(object.metadata["task_kind"], "profile");
    }

    #[test]
    fn content_lists_are_wrapped() {
        let object = into_data_object(
            Platform::YouTube,
            TaskKind::Content,
            &Value::Null,
            json!({"data": [{"id": "v1"}]}),
        );
        assert_eq!(object.url, "youtube:content");
        assert!(object.data["content"].is_array());
    }

    #[test]
    fn scraper_error_marks_object_failed() {
        let object = into_data_object(
            Platform::LinkedIn,
            TaskKind::Network,
            &Value::Null,
            json!({"error": "login wall"}),
        );
        assert!(!object.is_valid());
        assert_eq!(object.error.as_deref(), Some("login wall"));
    }

    #[test]
    fn section_mapping() {
        assert_eq!(section_for(TaskKind::Engagement), "engagement");
        assert_eq!(section_for(TaskKind::Network), "network");
    }
}
