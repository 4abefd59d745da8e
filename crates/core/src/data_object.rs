//! Standardized envelope for scraped data.
//!
//! Every scraper produces a [`DataObject`] and every pipeline stage
//! consumes and returns one. An object either carries data or an error,
//! never both in a meaningful way: [`DataObject::is_valid`] is true only
//! when there is data and no error.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::platform::Platform;
use crate::types::Timestamp;

/// JSON object used for the `data` and `metadata` sections.
pub type JsonMap = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataObject {
    pub platform: Platform,
    pub timestamp: Timestamp,
    pub url: String,
    #[serde(default)]
    pub data: JsonMap,
    #[serde(default)]
    pub metadata: JsonMap,
    #[serde(default)]
    pub error: Option<String>,
}

impl DataObject {
    pub fn new(platform: Platform, url: impl Into<String>) -> Self {
        Self {
            platform,
            timestamp: Utc::now(),
            url: url.into(),
            data: JsonMap::new(),
            metadata: JsonMap::new(),
            error: None,
        }
    }

    /// Build an object from an already-scraped JSON map.
    pub fn with_data(platform: Platform, url: impl Into<String>, data: JsonMap) -> Self {
        let mut obj = Self::new(platform, url);
        obj.data = data;
        obj
    }

    /// Build an object that records a scrape failure.
    pub fn failed(platform: Platform, url: impl Into<String>, error: impl Into<String>) -> Self {
        let mut obj = Self::new(platform, url);
        obj.error = Some(error.into());
        obj
    }

    pub fn is_valid(&self) -> bool {
        self.error.is_none() && !self.data.is_empty()
    }

    pub fn set_error(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
    }

    pub fn add_metadata(&mut self, key: impl Into<String>, value: Value) {
        self.metadata.insert(key.into(), value);
    }

    /// Replace a single top-level data section.
    pub fn update_data(&mut self, key: impl Into<String>, value: Value) {
        self.data.insert(key.into(), value);
    }

    /// Shallow-merge `other` into `data`; keys in `other` win.
    pub fn merge_data(&mut self, other: JsonMap) {
        self.data.extend(other);
    }

    /// Shallow-merge `other` into `metadata`; keys in `other` win.
    pub fn merge_metadata(&mut self, other: JsonMap) {
        self.metadata.extend(other);
    }

    /// Borrow a top-level data section as an object, if present.
    pub fn section(&self, key: &str) -> Option<&JsonMap> {
        self.data.get(key).and_then(Value::as_object)
    }
}
