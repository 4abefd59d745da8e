//! Response analytics arithmetic.
//!
//! The database layer returns raw counters and response delays; these
//! helpers turn them into the rates and buckets the API reports.

use serde::Serialize;

/// Percentage of `part` in `total`, rounded to two decimals. Zero when empty.
pub fn rate_percent(part: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    ((part as f64 / total as f64) * 10_000.0).round() / 100.0
}

/// Ratio of `part` in `total` in `[0, 1]`. Zero when empty.
pub fn ratio(part: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    part as f64 / total as f64
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResponseTimeBreakdown {
    pub under_1h: i64,
    pub under_24h: i64,
    pub over_24h: i64,
}

/// Average response delay in hours plus the delay buckets.
///
/// `under_24h` counts replies between one and twenty-four hours.
pub fn summarize_response_times(hours: &[f64]) -> (f64, ResponseTimeBreakdown) {
    let mut breakdown = ResponseTimeBreakdown::default();
    for &h in hours {
        if h < 1.0 {
            breakdown.under_1h += 1;
        } else if h < 24.0 {
            breakdown.under_24h += 1;
        } else {
            breakdown.over_24h += 1;
        }
    }
    let avg = if hours.is_empty() {
        0.0
    } else {
        hours.iter().sum::<f64>() / hours.len() as f64
    };
    (avg, breakdown)
}

/// Aggregate counters for a set of outreach messages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseCounts {
    pub total: i64,
    pub opens: i64,
    pub clicks: i64,
    pub replies: i64,
    pub positive: i64,
    pub negative: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseAnalytics {
    pub total_messages: i64,
    pub opens: i64,
    pub clicks: i64,
    pub replies: i64,
    pub open_rate: f64,
    pub click_rate: f64,
    pub reply_rate: f64,
    pub positive_replies: i64,
    pub negative_replies: i64,
    pub avg_response_time_hours: f64,
    pub response_time_breakdown: ResponseTimeBreakdown,
}

pub fn build_response_analytics(
    counts: &ResponseCounts,
    response_hours: &[f64],
) -> ResponseAnalytics {
    let (avg, breakdown) = summarize_response_times(response_hours);
    ResponseAnalytics {
        total_messages: counts.total,
        opens: counts.opens,
        clicks: counts.clicks,
        replies: counts.replies,
        open_rate: rate_percent(counts.opens, counts.total),
        click_rate: rate_percent(counts.clicks, counts.total),
        reply_rate: rate_percent(counts.replies, counts.total),
        positive_replies: counts.positive,
        negative_replies: counts.negative,
        avg_response_time_hours: avg,
        response_time_breakdown: breakdown,
    }
}
