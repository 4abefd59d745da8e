//! Qualification score arithmetic shared by the pipeline and the API.

/// Lowest storable qualification score.
pub const MIN_QUALIFICATION_SCORE: i16 = 0;

/// Highest storable qualification score.
pub const MAX_QUALIFICATION_SCORE: i16 = 100;

/// Score given to prospects that have not been scored yet.
pub const DEFAULT_QUALIFICATION_SCORE: i16 = 50;

/// Clamp an arbitrary score into `[0, 100]`.
pub fn clamp_qualification_score(score: i64) -> i16 {
    score.clamp(
        MIN_QUALIFICATION_SCORE as i64,
        MAX_QUALIFICATION_SCORE as i64,
    ) as i16
}

/// Convert a composite score in `[0, 1]` into a qualification score.
///
/// Non-finite input yields the default score.
pub fn qualification_from_composite(composite: f64) -> i16 {
    if !composite.is_finite() {
        return DEFAULT_QUALIFICATION_SCORE;
    }
    clamp_qualification_score((composite * 100.0).round() as i64)
}

/// Map `value` from `[min, max]` onto `[0, 1]`, clamping outside the range.
pub fn normalize(value: f64, min: f64, max: f64) -> f64 {
    if max <= min || !value.is_finite() {
        return 0.0;
    }
    ((value - min) / (max - min)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scores_are_clamped_to_range() {
        assert_eq!(clamp_qualification_score(-20), 0);
        assert_eq!(clamp_qualification_score(55), 55);
        assert_eq!(clamp_qualification_score(250), 100);
    }

    #[test]
    fn composite_converts_to_percent() {
        assert_eq!(qualification_from_composite(0.734), 73);
        assert_eq!(qualification_from_composite(1.7), 100);
        assert_eq!(qualification_from_composite(-0.2), 0);
        assert_eq!(qualification_from_composite(f64::NAN), 50);
    }

    #[test]
    fn normalize_handles_degenerate_ranges() {
        assert_eq!(normalize(5.0, 0.0, 10.0), 0.5);
        assert_eq!(normalize(15.0, 0.0, 10.0), 1.0);
        assert_eq!(normalize(5.0, 10.0, 10.0), 0.0);
    }
}
