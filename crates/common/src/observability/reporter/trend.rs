//! Trend history, alert thresholds and derived aggregates

use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::ErrorCategory;
use crate::utils::serde::duration_millis;

/// Reported error timestamps, kept per category
///
/// Each category is pruned and capped on its own so a flood in one category
/// never evicts another category's entries.
#[derive(Debug, Clone, Default)]
pub(crate) struct TrendHistory {
    by_category: BTreeMap<ErrorCategory, VecDeque<DateTime<Utc>>>,
}

impl TrendHistory {
    pub(crate) fn push(&mut self, category: ErrorCategory, at: DateTime<Utc>) {
        self.by_category.entry(category).or_default().push_back(at);
    }

    /// Number of `category` entries strictly newer than `now - window`.
    pub(crate) fn count_in_window(
        &self,
        category: ErrorCategory,
        now: DateTime<Utc>,
        window: Duration,
    ) -> u64 {
        let since = window_start(now, window);
        self.by_category
            .get(&category)
            .map_or(0, |entries| entries.iter().filter(|at| **at > since).count() as u64)
    }

    /// Recompute per-category trends from scratch over `window`.
    pub(crate) fn compute_trends(&self, now: DateTime<Utc>, window: Duration) -> Vec<ErrorTrend> {
        let since = window_start(now, window);
        let hours = window.as_secs_f64() / 3600.0;

        self.by_category
            .iter()
            .filter_map(|(category, entries)| {
                let mut recent = entries.iter().copied().filter(|at| *at > since);
                let first = recent.next()?;
                let (count, first_seen, last_seen) =
                    recent.fold((1_u64, first, first), |(count, lo, hi), at| {
                        (count + 1, lo.min(at), hi.max(at))
                    });
                Some(ErrorTrend {
                    category: *category,
                    count,
                    rate: if hours > 0.0 { count as f64 / hours } else { 0.0 },
                    time_span: window,
                    first_seen,
                    last_seen,
                })
            })
            .collect()
    }

    /// Drop entries older than `retention` and keep at most `max_per_category`
    /// entries for each category.
    pub(crate) fn prune(
        &mut self,
        now: DateTime<Utc>,
        retention: Duration,
        max_per_category: usize,
    ) {
        let cutoff = window_start(now, retention);
        self.by_category.retain(|_, entries| {
            entries.retain(|at| *at > cutoff);
            while entries.len() > max_per_category {
                entries.pop_front();
            }
            !entries.is_empty()
        });
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.by_category.values().map(VecDeque::len).sum()
    }
}

/// Per-category aggregate over a time window, recomputed on demand
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorTrend {
    pub category: ErrorCategory,
    pub count: u64,
    /// Errors per hour over the requested window
    pub rate: f64,
    #[serde(with = "duration_millis")]
    pub time_span: Duration,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// Alert raised when a category crosses its threshold
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorAlert {
    pub category: ErrorCategory,
    pub count: u64,
    pub threshold: u64,
    #[serde(with = "duration_millis")]
    pub time_span: Duration,
    pub timestamp: DateTime<Utc>,
}

/// `count` errors of one category within `window` raise an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertThreshold {
    pub count: u64,
    pub window: Duration,
}

/// Start of a window ending at `now`; saturates at the earliest representable time.
pub(crate) fn window_start(now: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(window)
        .ok()
        .and_then(|window| now.checked_sub_signed(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap_or_default()
    }

    fn history(entries: &[(ErrorCategory, DateTime<Utc>)]) -> TrendHistory {
        let mut history = TrendHistory::default();
        for (category, at) in entries {
            history.push(*category, *at);
        }
        history
    }

    #[test]
    fn test_trends_group_by_category_within_window() {
        let now = base();
        let history = history(&[
            (ErrorCategory::Network, now - chrono::Duration::minutes(90)),
            (ErrorCategory::Network, now - chrono::Duration::minutes(30)),
            (ErrorCategory::Network, now - chrono::Duration::minutes(10)),
            (ErrorCategory::Timeout, now - chrono::Duration::minutes(5)),
        ]);

        let trends = history.compute_trends(now, Duration::from_secs(3600));

        assert_eq!(trends.len(), 2);
        let network = &trends[0];
        assert_eq!(network.category, ErrorCategory::Network);
        assert_eq!(network.count, 2);
        assert!((network.rate - 2.0).abs() < f64::EPSILON);
        assert_eq!(network.first_seen, now - chrono::Duration::minutes(30));
        assert_eq!(network.last_seen, now - chrono::Duration::minutes(10));
        assert_eq!(trends[1].category, ErrorCategory::Timeout);
    }

    #[test]
    fn test_rate_scales_with_window() {
        let now = base();
        let entries: Vec<_> = (1..=6)
            .map(|m| (ErrorCategory::Command, now - chrono::Duration::minutes(m)))
            .collect();

        let trends = history(&entries).compute_trends(now, Duration::from_secs(1800));
        assert!((trends[0].rate - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_window_has_no_entries() {
        let now = base();
        let history = history(&[(ErrorCategory::System, now)]);

        assert!(history.compute_trends(now, Duration::ZERO).is_empty());
    }

    #[test]
    fn test_count_in_window() {
        let now = base();
        let history = history(&[
            (ErrorCategory::Network, now - chrono::Duration::seconds(120)),
            (ErrorCategory::Network, now - chrono::Duration::seconds(30)),
            (ErrorCategory::Timeout, now - chrono::Duration::seconds(10)),
        ]);

        let minute = Duration::from_secs(60);
        assert_eq!(history.count_in_window(ErrorCategory::Network, now, minute), 1);
        assert_eq!(history.count_in_window(ErrorCategory::Network, now, minute * 10), 2);
        assert_eq!(history.count_in_window(ErrorCategory::Command, now, minute), 0);
    }

    #[test]
    fn test_prune_by_age_and_size() {
        let now = base();
        let entries: Vec<_> = (0..10)
            .rev()
            .map(|s| (ErrorCategory::System, now - chrono::Duration::seconds(s * 10)))
            .collect();
        let mut history = history(&entries);

        history.prune(now, Duration::from_secs(55), 100);
        assert_eq!(history.len(), 6);

        history.prune(now, Duration::from_secs(55), 2);
        assert_eq!(history.len(), 2);
        let second = Duration::from_secs(1);
        assert_eq!(history.count_in_window(ErrorCategory::System, now, second), 1);
    }

    #[test]
    fn test_cap_applies_per_category() {
        let now = base();
        let mut history = history(&[(ErrorCategory::Network, now - chrono::Duration::seconds(5))]);
        for _ in 0..10 {
            history.push(ErrorCategory::System, now);
        }

        let minute = Duration::from_secs(60);
        history.prune(now, minute, 3);

        assert_eq!(history.count_in_window(ErrorCategory::System, now, minute), 3);
        assert_eq!(history.count_in_window(ErrorCategory::Network, now, minute), 1);
    }

    #[test]
    fn test_window_start_saturates() {
        let now = base();
        assert_eq!(window_start(now, Duration::MAX), DateTime::<Utc>::MIN_UTC);
    }
}
