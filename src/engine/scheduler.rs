use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::time::Duration;
use thiserror::Error;

use crate::models::Offer;

/// What one invocation should do, decided once from stored truth and the
/// live count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Nothing listed and nothing mirrored; skip the walk entirely.
    Idle,
    /// The stored window is live: append applicant-state observations.
    StatePoll,
    /// The mirror is stale (count drift or lapsed window): re-derive
    /// metadata and offering assignments.
    FullRescan,
}

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("offer window has not started yet (now {now}, starts {starts_at})")]
    WindowNotStarted {
        now: DateTime<Utc>,
        starts_at: DateTime<Utc>,
    },
}

/// Pick the cycle's action.
///
/// Count drift dominates: any difference between the live listing and the
/// mirrored assignment count forces a re-scan regardless of the window.
/// Otherwise the stored window decides, and a window that lies entirely in
/// the future is a configuration error, not something to retry.
pub fn decide(
    window: Option<&Offer>,
    now: DateTime<Utc>,
    live: i64,
    stored: i64,
) -> Result<Action, ScheduleError> {
    if live != stored {
        return Ok(Action::FullRescan);
    }

    let Some(offer) = window else {
        // Equal counts with no offer recorded means both are zero.
        return Ok(Action::Idle);
    };

    if offer.contains(now) {
        Ok(Action::StatePoll)
    } else if offer.ends_at < now {
        Ok(Action::FullRescan)
    } else {
        Err(ScheduleError::WindowNotStarted {
            now,
            starts_at: offer.starts_at,
        })
    }
}

/// Lead window ahead of the offer edge inside which a cycle holds back.
const LEAD_MINUTES: i64 = 5;
/// How long to hold back when inside the lead window.
const LEAD_SLEEP: Duration = Duration::from_secs(300);

/// When the window edge is strictly less than [`LEAD_MINUTES`] away, delay
/// the cycle so the poll lands cleanly on one side of the edge instead of
/// racing it mid-walk.
pub fn lead_delay(now: DateTime<Utc>, ends_at: DateTime<Utc>) -> Option<Duration> {
    let lead = ends_at - now;
    if lead > ChronoDuration::zero() && lead < ChronoDuration::minutes(LEAD_MINUTES) {
        Some(LEAD_SLEEP)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn at(s: &str) -> DateTime<Utc> {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M")
            .unwrap()
            .and_utc()
    }

    fn offer() -> Offer {
        Offer {
            id: 7,
            starts_at: at("2024-01-01 00:00"),
            ends_at: at("2024-01-08 00:00"),
        }
    }

    #[test]
    fn inside_window_with_matching_counts_polls_state() {
        let action = decide(Some(&offer()), at("2024-01-03 12:00"), 40, 40).unwrap();
        assert_eq!(action, Action::StatePoll);
    }

    #[test]
    fn lapsed_window_rescans() {
        let action = decide(Some(&offer()), at("2024-01-09 00:00"), 40, 40).unwrap();
        assert_eq!(action, Action::FullRescan);
    }

    #[test]
    fn count_mismatch_dominates_the_window() {
        let action = decide(Some(&offer()), at("2024-01-03 12:00"), 42, 40).unwrap();
        assert_eq!(action, Action::FullRescan);
    }

    #[test]
    fn future_window_is_a_configuration_error() {
        let err = decide(Some(&offer()), at("2023-12-31 00:00"), 40, 40).unwrap_err();
        assert!(matches!(err, ScheduleError::WindowNotStarted { .. }));
    }

    #[test]
    fn window_edges_are_inclusive() {
        assert_eq!(
            decide(Some(&offer()), at("2024-01-01 00:00"), 40, 40).unwrap(),
            Action::StatePoll
        );
        assert_eq!(
            decide(Some(&offer()), at("2024-01-08 00:00"), 40, 40).unwrap(),
            Action::StatePoll
        );
    }

    #[test]
    fn virgin_store_with_empty_listing_idles() {
        assert_eq!(decide(None, at("2024-01-03 12:00"), 0, 0).unwrap(), Action::Idle);
    }

    #[test]
    fn virgin_store_with_live_items_rescans() {
        assert_eq!(
            decide(None, at("2024-01-03 12:00"), 12, 0).unwrap(),
            Action::FullRescan
        );
    }

    #[test]
    fn lead_delay_only_fires_just_before_the_edge() {
        let ends = at("2024-01-08 00:00");
        assert_eq!(lead_delay(at("2024-01-07 23:57"), ends), Some(LEAD_SLEEP));
        assert_eq!(lead_delay(at("2024-01-07 23:00"), ends), None);
        // At or past the edge there is nothing to wait for.
        assert_eq!(lead_delay(at("2024-01-08 00:00"), ends), None);
        assert_eq!(lead_delay(at("2024-01-08 00:01"), ends), None);
    }
}
