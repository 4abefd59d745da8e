//! Classification of prospect replies.
//!
//! Sentiment scores come from an external service (or the inbound webhook
//! payload) as a number in `[-1, 1]`. Only the thresholds live here.

use serde::{Deserialize, Serialize};

/// Sentiment above which a reply counts as positive.
pub const POSITIVE_THRESHOLD: f64 = 0.3;

/// Sentiment below which a reply counts as negative.
pub const NEGATIVE_THRESHOLD: f64 = -0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyOutcome {
    Positive,
    Negative,
    Neutral,
}

impl ReplyOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            ReplyOutcome::Positive => "positive",
            ReplyOutcome::Negative => "negative",
            ReplyOutcome::Neutral => "neutral",
        }
    }
}

/// Bucket a sentiment score. A missing score is neutral.
pub fn classify_reply(sentiment: Option<f64>) -> ReplyOutcome {
    match sentiment {
        Some(s) if s > POSITIVE_THRESHOLD => ReplyOutcome::Positive,
        Some(s) if s < NEGATIVE_THRESHOLD => ReplyOutcome::Negative,
        _ => ReplyOutcome::Neutral,
    }
}
