//! Multi-dimensional prospect scoring.
//!
//! Five dimensions, each in `[0, 1]`, are combined with fixed weights into
//! a composite score. The composite maps to a qualification score in
//! `0..=100`.

use std::collections::HashSet;

use outreach_core::data_object::{DataObject, JsonMap};
use outreach_core::scoring::{normalize, qualification_from_composite};
use serde::Serialize;
use serde_json::Value;

use crate::error::PipelineError;
use crate::sections::{self, BASIC_INFO, CONTENT, ENGAGEMENT, NETWORK};

pub const WEIGHT_AUDIENCE_QUALITY: f64 = 0.25;
pub const WEIGHT_CONTENT_RELEVANCE: f64 = 0.25;
pub const WEIGHT_INFLUENCE_LEVEL: f64 = 0.20;
pub const WEIGHT_CONVERSION_POTENTIAL: f64 = 0.15;
pub const WEIGHT_ENGAGEMENT_PROPENSITY: f64 = 0.15;

/// Number of distinct content types that counts as fully diverse.
const CONTENT_TYPE_VARIETY: f64 = 5.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DimensionScores {
    pub audience_quality: f64,
    pub content_relevance: f64,
    pub influence_level: f64,
    pub conversion_potential: f64,
    pub engagement_propensity: f64,
}

impl DimensionScores {
    pub fn composite(&self) -> f64 {
        let score = self.audience_quality * WEIGHT_AUDIENCE_QUALITY
            + self.content_relevance * WEIGHT_CONTENT_RELEVANCE
            + self.influence_level * WEIGHT_INFLUENCE_LEVEL
            + self.conversion_potential * WEIGHT_CONVERSION_POTENTIAL
            + self.engagement_propensity * WEIGHT_ENGAGEMENT_PROPENSITY;
        score.clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProspectScore {
    pub composite_score: f64,
    pub qualification_score: i16,
    pub dimensions: DimensionScores,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ProspectScorer;

impl ProspectScorer {
    pub fn score(&self, object: &DataObject) -> Result<ProspectScore, PipelineError> {
        score_data(&object.data)
    }
}

pub fn score_data(data: &JsonMap) -> Result<ProspectScore, PipelineError> {
    let empty = JsonMap::new();
    let info = sections::object(data, BASIC_INFO)?.unwrap_or(&empty);
    let engagement = sections::object(data, ENGAGEMENT)?.unwrap_or(&empty);
    let network = sections::object(data, NETWORK)?.unwrap_or(&empty);
    let content: Vec<&JsonMap> = sections::array(data, CONTENT)?
        .map(|items| items.iter().filter_map(Value::as_object).collect())
        .unwrap_or_default();
    let metrics = network
        .get("metrics")
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    let dimensions = DimensionScores {
        audience_quality: audience_quality(metrics),
        content_relevance: content_relevance(&content),
        influence_level: influence_level(info, engagement, metrics),
        conversion_potential: conversion_potential(engagement, &content),
        engagement_propensity: engagement_propensity(engagement, &content),
    };
    let composite_score = dimensions.composite();
    Ok(ProspectScore {
        composite_score,
        qualification_score: qualification_from_composite(composite_score),
        dimensions,
    })
}

// ---------------------------------------------------------------------------
// Dimensions
// ---------------------------------------------------------------------------

fn audience_quality(metrics: &JsonMap) -> f64 {
    normalize(sections::num(metrics, "size"), 0.0, 1_000_000.0) * 0.3
        + normalize(sections::num(metrics, "density"), 0.0, 1.0) * 0.2
        + normalize(sections::num(metrics, "centrality"), 0.0, 1.0) * 0.3
        + normalize(sections::num(metrics, "clustering"), 0.0, 1.0) * 0.2
}

fn content_relevance(content: &[&JsonMap]) -> f64 {
    if content.is_empty() {
        return 0.0;
    }
    let interactions = mean(content.iter().map(|post| {
        post_engagement(post, "likes")
            + post_engagement(post, "comments")
            + post_engagement(post, "shares")
    }));
    let types: HashSet<&str> = content
        .iter()
        .filter_map(|post| post.get("type").and_then(Value::as_str))
        .collect();
    let diversity = (types.len() as f64 / CONTENT_TYPE_VARIETY).min(1.0);
    let quality = mean(content.iter().map(|post| {
        let mut q = 0.0;
        if post.get("text").and_then(Value::as_str).is_some_and(|t| !t.is_empty()) {
            q += 0.3;
        }
        if post.get("media").and_then(Value::as_array).is_some_and(|m| !m.is_empty()) {
            q += 0.3;
        }
        if post_engagement(post, "likes") > 0.0 {
            q += 0.2;
        }
        if post_engagement(post, "comments") > 0.0 {
            q += 0.2;
        }
        q
    }));

    normalize(content.len() as f64, 0.0, 100.0) * 0.3
        + normalize(interactions, 0.0, 1000.0) * 0.3
        + diversity * 0.2
        + quality * 0.2
}

fn influence_level(info: &JsonMap, engagement: &JsonMap, metrics: &JsonMap) -> f64 {
    let followers = engagement
        .get("followers")
        .or_else(|| info.get("followers"))
        .and_then(Value::as_f64)
        .unwrap_or(0.0);
    normalize(followers, 0.0, 1_000_000.0) * 0.4
        + normalize(sections::num(engagement, "engagement_rate"), 0.0, 1.0) * 0.3
        + normalize(sections::num(metrics, "centrality"), 0.0, 1.0) * 0.3
}

fn conversion_potential(engagement: &JsonMap, content: &[&JsonMap]) -> f64 {
    let content_potential = mean(content.iter().map(|post| {
        let mut p = 0.0;
        if post.get("type").and_then(Value::as_str) == Some("promotional") {
            p += 0.4;
        }
        if post_engagement(post, "clicks") > 0.0 {
            p += 0.3;
        }
        if post_engagement(post, "conversions") > 0.0 {
            p += 0.3;
        }
        p
    }));
    normalize(sections::num(engagement, "click_through_rate"), 0.0, 1.0) * 0.3
        + normalize(sections::num(engagement, "conversion_rate"), 0.0, 1.0) * 0.3
        + content_potential * 0.4
}

fn engagement_propensity(engagement: &JsonMap, content: &[&JsonMap]) -> f64 {
    let content_engagement = mean(content.iter().map(|post| {
        let mut e = 0.0;
        if post_engagement(post, "likes") > 0.0 {
            e += 0.3;
        }
        if post_engagement(post, "comments") > 0.0 {
            e += 0.4;
        }
        if post_engagement(post, "shares") > 0.0 {
            e += 0.3;
        }
        e
    }));
    normalize(sections::num(engagement, "response_rate"), 0.0, 1.0) * 0.3
        + (1.0 - normalize(sections::num(engagement, "avg_response_time"), 0.0, 24.0)) * 0.2
        + content_engagement * 0.5
}

fn post_engagement(post: &JsonMap, key: &str) -> f64 {
    sections::nested_num(post, "engagement", key)
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn weights_sum_to_one() {
        let total = WEIGHT_AUDIENCE_QUALITY
            + WEIGHT_CONTENT_RELEVANCE
            + WEIGHT_INFLUENCE_LEVEL
            + WEIGHT_CONVERSION_POTENTIAL
            + WEIGHT_ENGAGEMENT_PROPENSITY;
        assert!(approx(total, 1.0));
    }

    #[test]
    fn empty_profile_scores_only_response_time() {
        // Missing response time counts as instant.
        let score = score_data(&JsonMap::new()).unwrap();
        assert!(approx(score.dimensions.engagement_propensity, 0.2));
        assert!(approx(score.composite_score, 0.03));
        assert_eq!(score.qualification_score, 3);
    }

    #[test]
    fn strong_profile_scores_high() {
        let types = ["promotional", "video", "image", "text", "story"];
        let content: Vec<Value> = (0..100)
            .map(|i| {
                json!({
                    "type": types[i % 5],
                    "text": "hi",
                    "media": [{"type": "image", "url": "https://x"}],
                    "engagement": {
                        "likes": 500, "comments": 300, "shares": 200,
                        "clicks": 1, "conversions": 1
                    }
                })
            })
            .collect();
        let data = json!({
            "basic_info": {"followers": 2_000_000},
            "engagement": {
                "engagement_rate": 1.0, "click_through_rate": 1.0,
                "conversion_rate": 1.0, "response_rate": 1.0, "avg_response_time": 0
            },
            "network": {
                "metrics": {"size": 1_000_000, "density": 1, "centrality": 1, "clustering": 1}
            },
            "content": content
        });
        let score = score_data(data.as_object().unwrap()).unwrap();
        assert!(approx(score.dimensions.audience_quality, 1.0));
        assert!(approx(score.dimensions.content_relevance, 1.0));
        assert!(approx(score.dimensions.influence_level, 1.0));
        assert!(score.composite_score > 0.9);
        assert!(score.qualification_score > 90 && score.qualification_score <= 100);
    }

    #[test]
    fn composite_is_clamped() {
        let dims = DimensionScores {
            audience_quality: 5.0,
            content_relevance: 5.0,
            influence_level: 5.0,
            conversion_potential: 5.0,
            engagement_propensity: 5.0,
        };
        assert_eq!(dims.composite(), 1.0);
    }

    #[test]
    fn malformed_section_is_an_error() {
        let data = json!({"network": [1, 2]});
        assert!(score_data(data.as_object().unwrap()).is_err());
    }
}
