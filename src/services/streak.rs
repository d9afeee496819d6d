//! Streak statistics derived from a habit's completion history.
//!
//! These functions are pure. Streak data is recomputed from the completion
//! list on every read and never persisted.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Offset, TimeZone, Utc};
use serde::Serialize;

use crate::models::completion::Completion;

/// Largest spacing, in seconds, that keeps a run alive: between two
/// consecutive completions, and between the latest completion and now.
pub const STREAK_WINDOW_SECS: i64 = 36 * 60 * 60;

/// Anything carrying the instant a habit instance was fulfilled.
pub trait CompletionTime {
    fn completed_at(&self) -> DateTime<Utc>;
}

impl CompletionTime for Completion {
    fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }
}

impl CompletionTime for DateTime<Utc> {
    fn completed_at(&self) -> DateTime<Utc> {
        *self
    }
}

impl<T: CompletionTime + ?Sized> CompletionTime for &T {
    fn completed_at(&self) -> DateTime<Utc> {
        (**self).completed_at()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StreakData {
    /// Length of the run still active as of evaluation, 0 once it lapsed.
    pub streak: u32,
    pub best_streak: u32,
    /// Every supplied completion, duplicates included.
    pub total: u32,
}

fn streak_window() -> Duration {
    Duration::seconds(STREAK_WINDOW_SECS)
}

fn saturating_count(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

/// Computes streak data against the current wall clock.
#[allow(dead_code)]
pub fn calculate_streak_data<T: CompletionTime>(completions: &[T]) -> StreakData {
    calculate_streak_data_at(completions, Utc::now())
}

/// Computes streak data as of `now`.
///
/// Input order does not matter. Two completions belong to the same run when
/// they are at most 1.5 days apart, and the final run only counts as the
/// active streak if the latest completion is at most 1.5 days before `now`.
/// Same-day duplicates are not collapsed: each one extends the run.
pub fn calculate_streak_data_at<T: CompletionTime>(
    completions: &[T],
    now: DateTime<Utc>,
) -> StreakData {
    let mut timestamps: Vec<DateTime<Utc>> =
        completions.iter().map(CompletionTime::completed_at).collect();
    timestamps.sort_unstable();

    let Some(&last) = timestamps.last() else {
        return StreakData::default();
    };

    let window = streak_window();
    let mut current_run = 0u32;
    let mut best_run = 0u32;
    let mut previous: Option<DateTime<Utc>> = None;

    for &at in &timestamps {
        current_run = match previous {
            Some(prev) if at - prev <= window => current_run + 1,
            _ => 1,
        };
        best_run = best_run.max(current_run);
        previous = Some(at);
    }

    // Future timestamps give a negative gap and keep the run active.
    let streak = if now - last <= window { current_run } else { 0 };

    StreakData {
        streak,
        best_streak: best_run,
        total: saturating_count(completions.len()),
    }
}

/// Start of `date` in `tz` as a UTC instant, and the instant 24 hours later.
pub fn day_bounds<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    let midnight = date.and_time(NaiveTime::MIN);
    let start = match tz.from_local_datetime(&midnight).earliest() {
        Some(start) => start.with_timezone(&Utc),
        // Local midnight skipped by a DST transition.
        None => {
            let offset = tz.offset_from_utc_datetime(&midnight).fix();
            let shifted = midnight - Duration::seconds(i64::from(offset.local_minus_utc()));
            Utc.from_utc_datetime(&shifted)
        }
    };
    (start, start + Duration::hours(24))
}

#[allow(dead_code)]
pub fn is_completed_today<T: CompletionTime, Tz: TimeZone>(completions: &[T], tz: &Tz) -> bool {
    is_completed_today_at(completions, Utc::now(), tz)
}

/// Whether any completion falls on the calendar day of `now` in `tz`.
pub fn is_completed_today_at<T: CompletionTime, Tz: TimeZone>(
    completions: &[T],
    now: DateTime<Utc>,
    tz: &Tz,
) -> bool {
    let today = now.with_timezone(tz).date_naive();
    let (start, end) = day_bounds(today, tz);
    completions.iter().any(|c| {
        let at = c.completed_at();
        at >= start && at < end
    })
}

/// Completions recorded on `date` in `tz`, in input order.
pub fn get_completions_for_date<'a, T: CompletionTime, Tz: TimeZone>(
    completions: &'a [T],
    date: NaiveDate,
    tz: &Tz,
) -> Vec<&'a T> {
    let (start, end) = day_bounds(date, tz);
    completions
        .iter()
        .filter(|c| {
            let at = c.completed_at();
            at >= start && at < end
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use rand::seq::SliceRandom;
    use uuid::Uuid;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
    }

    fn days(n: i64) -> Duration {
        Duration::days(n)
    }

    fn completion(at: DateTime<Utc>) -> Completion {
        Completion {
            id: Uuid::new_v4(),
            habit_id: Uuid::nil(),
            completed_at: at,
            notes: None,
            created_at: at,
        }
    }

    #[test]
    fn test_empty_history() {
        let empty: Vec<DateTime<Utc>> = Vec::new();
        assert_eq!(calculate_streak_data_at(&empty, now()), StreakData::default());
        assert_eq!(calculate_streak_data(&empty), StreakData::default());
    }

    #[test]
    fn test_single_completion_now() {
        let data = calculate_streak_data_at(&[now()], now());
        assert_eq!(
            data,
            StreakData {
                streak: 1,
                best_streak: 1,
                total: 1
            }
        );
    }

    #[test]
    fn test_single_completion_against_wall_clock() {
        let data = calculate_streak_data(&[Utc::now()]);
        assert_eq!(data.streak, 1);
        assert_eq!(data.best_streak, 1);
        assert_eq!(data.total, 1);
    }

    #[test]
    fn test_consecutive_days_ending_today() {
        let history = vec![now(), now() - days(1), now() - days(2)];
        let data = calculate_streak_data_at(&history, now());
        assert_eq!(
            data,
            StreakData {
                streak: 3,
                best_streak: 3,
                total: 3
            }
        );
    }

    #[test]
    fn test_lapsed_streak_keeps_best() {
        let history = vec![now() - days(5), now() - days(4), now() - days(3)];
        let data = calculate_streak_data_at(&history, now());
        assert_eq!(
            data,
            StreakData {
                streak: 0,
                best_streak: 3,
                total: 3
            }
        );
    }

    #[test]
    fn test_broken_then_resumed_run() {
        let day0 = now() - days(11);
        let history: Vec<DateTime<Utc>> = [0, 1, 2, 10, 11]
            .iter()
            .map(|&d| day0 + days(d))
            .collect();
        let data = calculate_streak_data_at(&history, day0 + days(11));
        assert_eq!(data.best_streak, 3);
        assert_eq!(data.streak, 2);
        assert_eq!(data.total, 5);
    }

    #[test]
    fn test_order_independence() {
        let day0 = now() - days(11);
        let mut history: Vec<Completion> = [0, 1, 2, 10, 11]
            .iter()
            .map(|&d| completion(day0 + days(d)))
            .collect();
        let expected = calculate_streak_data_at(&history, now());

        history.reverse();
        assert_eq!(calculate_streak_data_at(&history, now()), expected);

        let mut rng = rand::thread_rng();
        for _ in 0..10 {
            history.shuffle(&mut rng);
            assert_eq!(calculate_streak_data_at(&history, now()), expected);
        }
    }

    #[test]
    fn test_input_left_untouched() {
        let history = vec![
            completion(now()),
            completion(now() - days(2)),
            completion(now() - days(1)),
        ];
        let before = history.clone();
        let _ = calculate_streak_data_at(&history, now());
        assert_eq!(history, before);
    }

    #[test]
    fn test_gap_of_exactly_one_and_a_half_days_continues() {
        let last = now();
        let history = vec![last - Duration::hours(36), last];
        let data = calculate_streak_data_at(&history, last);
        assert_eq!(data.streak, 2);
        assert_eq!(data.best_streak, 2);
    }

    #[test]
    fn test_gap_just_over_one_and_a_half_days_resets() {
        let last = now();
        let history = vec![last - Duration::hours(36) - Duration::nanoseconds(1), last];
        let data = calculate_streak_data_at(&history, last);
        assert_eq!(data.streak, 1);
        assert_eq!(data.best_streak, 1);

        let history = vec![last - Duration::hours(36) - Duration::milliseconds(1), last];
        assert_eq!(calculate_streak_data_at(&history, last).streak, 1);
    }

    #[test]
    fn test_expiry_boundary() {
        let last = now() - Duration::hours(36);
        assert_eq!(calculate_streak_data_at(&[last], now()).streak, 1);

        let last = now() - Duration::hours(36) - Duration::nanoseconds(1);
        let data = calculate_streak_data_at(&[last], now());
        assert_eq!(data.streak, 0);
        assert_eq!(data.best_streak, 1);
    }

    #[test]
    fn test_future_completion_counts_as_active() {
        let data = calculate_streak_data_at(&[now() + days(3)], now());
        assert_eq!(data.streak, 1);
    }

    #[test]
    fn test_same_day_duplicates_each_extend_the_run() {
        let history = vec![now() - Duration::hours(1), now()];
        let data = calculate_streak_data_at(&history, now());
        assert_eq!(data.streak, 2);
        assert_eq!(data.total, 2);
    }

    #[test]
    fn test_is_completed_today() {
        let tz = Utc;
        assert!(is_completed_today_at(&[now()], now(), &tz));
        assert!(!is_completed_today_at(&[now() - Duration::hours(25)], now(), &tz));

        let midnight = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();
        assert!(is_completed_today_at(&[midnight], now(), &tz));

        let next_midnight = midnight + days(1);
        assert!(!is_completed_today_at(&[next_midnight], now(), &tz));

        let empty: Vec<Completion> = Vec::new();
        assert!(!is_completed_today(&empty, &tz));
        assert!(is_completed_today(&[Utc::now()], &tz));
    }

    #[test]
    fn test_is_completed_today_respects_timezone() {
        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        // 01:00 on 2024-03-10 in Tokyo, still the 9th in UTC.
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 16, 0, 0).unwrap();
        assert!(is_completed_today_at(&[at], now(), &tokyo));
        assert!(!is_completed_today_at(&[at], now(), &Utc));
    }

    #[test]
    fn test_get_completions_for_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let history = vec![
            completion(Utc.with_ymd_and_hms(2024, 3, 9, 23, 59, 59).unwrap()),
            completion(Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap()),
            completion(Utc.with_ymd_and_hms(2024, 3, 9, 0, 0, 0).unwrap()),
            completion(Utc.with_ymd_and_hms(2024, 3, 8, 23, 59, 59).unwrap()),
        ];

        let found = get_completions_for_date(&history, date, &Utc);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].id, history[0].id);
        assert_eq!(found[1].id, history[2].id);
    }

    #[test]
    fn test_day_bounds_in_offset_zone() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let new_york_winter = FixedOffset::west_opt(5 * 3600).unwrap();
        let (start, end) = day_bounds(date, &new_york_winter);
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 3, 10, 5, 0, 0).unwrap());
        assert_eq!(end - start, Duration::hours(24));
    }

    #[test]
    fn test_total_saturates_instead_of_wrapping() {
        assert_eq!(saturating_count(7), 7);
        assert_eq!(saturating_count(u32::MAX as usize), u32::MAX);
        #[cfg(target_pointer_width = "64")]
        assert_eq!(saturating_count(u32::MAX as usize + 1), u32::MAX);
    }
}
