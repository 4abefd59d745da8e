//! Derived metrics added under the `enriched` section.

use outreach_core::data_object::{DataObject, JsonMap};
use serde::Serialize;
use serde_json::Value;

use crate::error::PipelineError;
use crate::sections::{self, BASIC_INFO, CONTENT, ENGAGEMENT, ENRICHED, NETWORK};

/// Metrics computed from the cleaned sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Enrichment {
    /// Followers per followed account.
    pub growth_rate: f64,
    /// Likes per follower.
    pub engagement_rate: f64,
    /// Shares per follower.
    pub viral_coefficient: f64,
    /// Mean of `likes*0.4 + comments*0.4 + shares*0.2` over content items.
    pub content_quality: f64,
    pub network_density: f64,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DataEnricher;

impl DataEnricher {
    /// Compute the enrichment and store it as `data.enriched`.
    pub fn enrich(&self, object: &mut DataObject) -> Result<Enrichment, PipelineError> {
        let enrichment = compute(&object.data)?;
        let value = serde_json::to_value(&enrichment)
            .map_err(|e| PipelineError::InvalidObject(e.to_string()))?;
        object.update_data(ENRICHED, value);
        Ok(enrichment)
    }
}

pub fn compute(data: &JsonMap) -> Result<Enrichment, PipelineError> {
    let empty = JsonMap::new();
    let info = sections::object(data, BASIC_INFO)?.unwrap_or(&empty);
    let engagement = sections::object(data, ENGAGEMENT)?.unwrap_or(&empty);
    let network = sections::object(data, NETWORK)?.unwrap_or(&empty);
    let content = sections::array(data, CONTENT)?.map(Vec::as_slice).unwrap_or(&[]);

    let followers = first_present(&[engagement, info], "followers");
    let following = first_present(&[engagement, info], "following");
    let likes = sections::num(engagement, "likes");
    let shares = sections::num(engagement, "shares");

    Ok(Enrichment {
        growth_rate: safe_div(followers, following),
        engagement_rate: safe_div(likes, followers),
        viral_coefficient: safe_div(shares, followers),
        content_quality: content_quality(content),
        network_density: network_density(network),
    })
}

/// Average per-item quality over the content section; 0 when empty.
pub fn content_quality(items: &[Value]) -> f64 {
    let scores: Vec<f64> = items
        .iter()
        .filter_map(Value::as_object)
        .map(|item| {
            sections::nested_num(item, "engagement", "likes") * 0.4
                + sections::nested_num(item, "engagement", "comments") * 0.4
                + sections::nested_num(item, "engagement", "shares") * 0.2
        })
        .collect();
    if scores.is_empty() {
        return 0.0;
    }
    scores.iter().sum::<f64>() / scores.len() as f64
}

/// `n / (size * (size - 1))` with `n` the number of listed connections and
/// `size` the reported network size (falling back to `n`).
pub fn network_density(network: &JsonMap) -> f64 {
    let n = network
        .get("connections")
        .and_then(Value::as_array)
        .map(Vec::len)
        .unwrap_or(0) as f64;
    let size = network
        .get("metrics")
        .and_then(Value::as_object)
        .and_then(|m| m.get("size"))
        .and_then(Value::as_f64)
        .filter(|s| *s > 0.0)
        .unwrap_or(n);
    if size < 2.0 {
        return 0.0;
    }
    n / (size * (size - 1.0))
}

fn first_present(maps: &[&JsonMap], key: &str) -> f64 {
    maps.iter()
        .find_map(|m| m.get(key).and_then(Value::as_f64))
        .unwrap_or(0.0)
}

fn safe_div(num: f64, denom: f64) -> f64 {
    if denom == 0.0 {
        0.0
    } else {
        num / denom
    }
}

#[cfg(test)]
mod tests {
    use outreach_core::platform::Platform;
    use serde_json::json;

    use super::*;

    #[test]
    fn ratios_use_followers() {
        let data = json!({
            "basic_info": {"followers": 1000, "following": 250},
            "engagement": {"likes": 50, "shares": 10}
        });
        let e = compute(data.as_object().unwrap()).unwrap();
        assert_eq!(e.growth_rate, 4.0);
        assert_eq!(e.engagement_rate, 0.05);
        assert_eq!(e.viral_coefficient, 0.01);
    }

    #[test]
    fn zero_denominators_yield_zero() {
        let e = compute(json!({"basic_info": {"followers": 10}}).as_object().unwrap()).unwrap();
        assert_eq!(e.growth_rate, 0.0);
        let e = compute(json!({"engagement": {"likes": 3}}).as_object().unwrap()).unwrap();
        assert_eq!(e.engagement_rate, 0.0);
    }

    #[test]
    fn content_quality_is_weighted_average() {
        let items = vec![
            json!({"engagement": {"likes": 10, "comments": 5, "shares": 5}}),
            json!({"engagement": {"likes": 0, "comments": 0, "shares": 0}}),
        ];
        // (4 + 2 + 1) / 2
        assert_eq!(content_quality(&items), 3.5);
        assert_eq!(content_quality(&[]), 0.0);
    }

    #[test]
    fn density_needs_two_nodes() {
        let single = json!({"connections": [{"id": "a"}]});
        assert_eq!(network_density(single.as_object().unwrap()), 0.0);
        let net = json!({
            "connections": [{"id": "a"}, {"id": "b"}, {"id": "c"}],
            "metrics": {"size": 4}
        });
        assert_eq!(network_density(net.as_object().unwrap()), 0.25);
    }

    #[test]
    fn enrich_stores_section() {
        let mut obj = DataObject::with_data(
            Platform::YouTube,
            "u",
            json!({"engagement": {"likes": 1}}).as_object().cloned().unwrap(),
        );
        DataEnricher.enrich(&mut obj).unwrap();
        assert!(obj.section("enriched").is_some());
    }

    #[test]
    fn malformed_sections_fail() {
        let data = json!({"content": {"not": "a list"}});
        assert!(compute(data.as_object().unwrap()).is_err());
    }
}
