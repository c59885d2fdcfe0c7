use chrono::{DateTime, Utc};
use nv_core::{ArticleCandidate, Priority};

use crate::config::PriorityWeights;

/// Priority of an article found at `candidate.position` on the homepage.
///
/// `base + site_weight - position_step * position - hourly_decay * age_hours`,
/// where the age is measured against the run start `now`, clamped to
/// `[0, max_age_hours]`. Integer arithmetic keeps the result reproducible.
pub fn compute_priority(
    weights: &PriorityWeights,
    candidate: &ArticleCandidate,
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Priority {
    let age_hours = (now - created_at)
        .num_hours()
        .max(0)
        .min(weights.max_age_hours.max(0));
    let position = i64::try_from(candidate.position).unwrap_or(i64::MAX);

    let value = weights
        .base
        .saturating_add(candidate.site_weight)
        .saturating_sub(weights.position_step.saturating_mul(position))
        .saturating_sub(weights.hourly_decay.saturating_mul(age_hours));
    Priority(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_formula() {
        let weights = PriorityWeights::default();
        let candidate = ArticleCandidate::new("https://example.com/a", 3).with_site_weight(100);
        let priority = compute_priority(&weights, &candidate, now() - Duration::hours(2), now());
        assert_eq!(priority, Priority(10_000 + 100 - 30 - 10));
    }

    #[test]
    fn test_earlier_listing_scores_higher() {
        let weights = PriorityWeights::default();
        let first = ArticleCandidate::new("https://example.com/z", 0);
        let second = ArticleCandidate::new("https://example.com/a", 1);
        let a = compute_priority(&weights, &first, now(), now());
        let b = compute_priority(&weights, &second, now(), now());
        assert!(a > b);
    }

    #[test]
    fn test_age_is_clamped() {
        let weights = PriorityWeights::default();
        let candidate = ArticleCandidate::new("https://example.com/a", 0);
        let future = compute_priority(&weights, &candidate, now() + Duration::hours(5), now());
        assert_eq!(future, Priority(weights.base));

        let ancient = compute_priority(&weights, &candidate, now() - Duration::days(365), now());
        let week = compute_priority(&weights, &candidate, now() - Duration::hours(168), now());
        assert_eq!(ancient, week);
    }

    #[test]
    fn test_recency_decreases_priority() {
        let weights = PriorityWeights::default();
        let candidate = ArticleCandidate::new("https://example.com/a", 0);
        let fresh = compute_priority(&weights, &candidate, now() - Duration::minutes(10), now());
        let stale = compute_priority(&weights, &candidate, now() - Duration::hours(10), now());
        assert!(fresh > stale);
    }
}
