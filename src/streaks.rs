//! Streak and per-day completion computations for a single habit.
//!
//! Everything here is a pure function of a habit's completion dates and a
//! "today" that the caller has already resolved in the owner's timezone.

use crate::calendar::{days_between, week_start};
use crate::models::{Completion, DayFlags, HabitId, HabitStats, HabitWeekPoint};
use chrono::{Duration, NaiveDate};
use std::collections::BTreeSet;

const HISTORY_WEEKS: i64 = 8;

/// Consecutive completed days ending at `today`.
///
/// When `today` has no entry yet the run ending yesterday still counts, so a
/// streak only breaks once a full day has been missed.
pub fn current_streak(completed: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let anchor = if completed.contains(&today) {
        today
    } else {
        today - Duration::days(1)
    };

    let mut streak = 0;
    let mut day = anchor;
    while completed.contains(&day) {
        streak += 1;
        day -= Duration::days(1);
    }
    streak
}

pub fn longest_streak(completed: &BTreeSet<NaiveDate>) -> u32 {
    let mut longest = 0;
    let mut run = 0;
    let mut previous: Option<NaiveDate> = None;

    // BTreeSet iterates ascending.
    for &date in completed {
        run = match previous {
            Some(prev) if date - prev == Duration::days(1) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        previous = Some(date);
    }
    longest
}

/// One record per date in `[start, end]`. The flags are independent of each
/// other and play no part in streak computation.
pub fn day_flags(
    completed: &BTreeSet<NaiveDate>,
    start: NaiveDate,
    end: NaiveDate,
    habit_created: NaiveDate,
    today: NaiveDate,
) -> Vec<DayFlags> {
    days_between(start, end)
        .into_iter()
        .map(|date| DayFlags {
            date,
            completed: completed.contains(&date),
            in_future: date > today,
            before_habit: date < habit_created,
        })
        .collect()
}

/// `completed / possible` as a percentage in `[0, 100]`; zero when nothing
/// was possible.
pub fn completion_percentage(completed: usize, possible: usize) -> f64 {
    if possible == 0 {
        return 0.0;
    }
    (completed as f64 / possible as f64 * 100.0).clamp(0.0, 100.0)
}

/// Logged completions for `habit_ids` inside `[week_start, week_end]`.
pub fn count_completions(
    completions: &BTreeSet<Completion>,
    habit_ids: &BTreeSet<HabitId>,
    week_start: NaiveDate,
    week_end: NaiveDate,
) -> usize {
    if week_end < week_start {
        return 0;
    }
    habit_ids
        .iter()
        .map(|&habit_id| {
            let low = Completion {
                habit_id,
                date: week_start,
            };
            let high = Completion {
                habit_id,
                date: week_end,
            };
            completions.range(low..=high).count()
        })
        .sum()
}

/// Share of possible habit-days completed in the window, where possible is
/// one slot per habit per day (seven per habit for a Monday-Sunday week).
pub fn weekly_completion_percentage(
    completions: &BTreeSet<Completion>,
    habit_ids: &BTreeSet<HabitId>,
    week_start: NaiveDate,
    week_end: NaiveDate,
) -> f64 {
    let days = days_between(week_start, week_end).len();
    let possible = habit_ids.len() * days;
    completion_percentage(
        count_completions(completions, habit_ids, week_start, week_end),
        possible,
    )
}

pub fn habit_stats(completed: &BTreeSet<NaiveDate>, today: NaiveDate) -> HabitStats {
    HabitStats {
        current_streak: current_streak(completed, today),
        longest_streak: longest_streak(completed),
        total_completions: completed.len(),
        completion_dates: completed.iter().copied().collect(),
    }
}

/// Completion rate for the last eight weeks, counting only days on which
/// the habit existed and that are not in the future. Weeks with no such
/// day are skipped.
pub fn habit_weekly_history(
    completed: &BTreeSet<NaiveDate>,
    habit_created: NaiveDate,
    today: NaiveDate,
) -> Vec<HabitWeekPoint> {
    let current_week = week_start(today);
    let mut points = Vec::new();

    for offset in (0..HISTORY_WEEKS).rev() {
        let start = current_week - Duration::weeks(offset);
        let mut valid_days = 0u8;
        let mut completed_days = 0u8;

        for day in days_between(start, start + Duration::days(6)) {
            if day < habit_created || day > today {
                continue;
            }
            valid_days += 1;
            if completed.contains(&day) {
                completed_days += 1;
            }
        }

        if valid_days == 0 {
            continue;
        }
        points.push(HabitWeekPoint {
            label: format!("W{}", HISTORY_WEEKS - offset),
            start_date: start,
            valid_days,
            completed_days,
            percentage: completion_percentage(completed_days.into(), valid_days.into()),
        });
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        // A Wednesday.
        NaiveDate::from_ymd_opt(2026, 3, 11).unwrap()
    }

    fn days_ago(days: i64) -> NaiveDate {
        today() - Duration::days(days)
    }

    fn set(offsets: &[i64]) -> BTreeSet<NaiveDate> {
        offsets.iter().map(|&offset| days_ago(offset)).collect()
    }

    #[test]
    fn empty_history_has_no_streaks() {
        let empty = BTreeSet::new();
        assert_eq!(current_streak(&empty, today()), 0);
        assert_eq!(longest_streak(&empty), 0);
    }

    #[test]
    fn current_streak_counts_through_today() {
        assert_eq!(current_streak(&set(&[0, 1, 2]), today()), 3);
        assert_eq!(current_streak(&set(&[0, 1, 3, 4]), today()), 2);
    }

    #[test]
    fn yesterday_keeps_streak_alive() {
        assert_eq!(current_streak(&set(&[1]), today()), 1);
        assert_eq!(current_streak(&set(&[1, 2, 3]), today()), 3);
    }

    #[test]
    fn missed_yesterday_breaks_streak() {
        assert_eq!(current_streak(&set(&[2]), today()), 0);
        assert_eq!(current_streak(&set(&[2, 3, 4, 5]), today()), 0);
    }

    #[test]
    fn future_entries_do_not_extend_current_streak() {
        let mut completed = set(&[0]);
        completed.insert(today() + Duration::days(1));
        assert_eq!(current_streak(&completed, today()), 1);
    }

    #[test]
    fn longest_streak_stops_at_gaps() {
        assert_eq!(longest_streak(&set(&[5, 4, 3, 1])), 3);
        assert_eq!(longest_streak(&set(&[9])), 1);
        assert_eq!(longest_streak(&set(&[10, 8, 7, 6, 5, 1, 0])), 4);
    }

    #[test]
    fn current_never_exceeds_longest() {
        let samples: [&[i64]; 5] = [&[], &[0], &[1, 2], &[0, 1, 2, 5, 6, 7, 8], &[3, 1, 0]];
        for sample in samples {
            let completed = set(sample);
            assert!(current_streak(&completed, today()) <= longest_streak(&completed));
        }
    }

    #[test]
    fn day_flags_mark_completed_days() {
        let completed = set(&[6, 4]);
        let flags = day_flags(&completed, days_ago(6), today(), days_ago(30), today());
        assert_eq!(flags.len(), 7);
        let done: Vec<_> = flags.iter().filter(|day| day.completed).map(|day| day.date).collect();
        assert_eq!(done, vec![days_ago(6), days_ago(4)]);
        assert!(flags.iter().all(|day| !day.in_future && !day.before_habit));
    }

    #[test]
    fn day_flags_are_independent() {
        let start = today() - Duration::days(2);
        let end = today() + Duration::days(2);
        let mut completed = set(&[2]);
        completed.insert(end);
        let flags = day_flags(&completed, start, end, today(), today());

        assert!(flags[0].completed && flags[0].before_habit && !flags[0].in_future);
        assert!(!flags[2].before_habit && !flags[2].in_future);
        assert!(!flags[3].completed && flags[3].in_future);
        assert!(flags[4].completed && flags[4].in_future);
    }

    #[test]
    fn percentage_without_habits_is_zero() {
        let completions = BTreeSet::new();
        let habits = BTreeSet::new();
        let pct = weekly_completion_percentage(&completions, &habits, days_ago(6), today());
        assert_eq!(pct, 0.0);
        assert_eq!(completion_percentage(3, 0), 0.0);
    }

    #[test]
    fn fully_completed_week_is_hundred_percent() {
        let habits: BTreeSet<HabitId> = [1, 2].into_iter().collect();
        let mut completions = BTreeSet::new();
        for habit_id in [1, 2, 3] {
            for offset in 0..7 {
                completions.insert(Completion {
                    habit_id,
                    date: days_ago(offset),
                });
            }
        }
        // Outside the window.
        completions.insert(Completion {
            habit_id: 1,
            date: days_ago(7),
        });

        let pct = weekly_completion_percentage(&completions, &habits, days_ago(6), today());
        assert_eq!(pct, 100.0);
        assert_eq!(count_completions(&completions, &habits, days_ago(6), today()), 14);
    }

    #[test]
    fn partial_week_percentage() {
        let habits: BTreeSet<HabitId> = [7].into_iter().collect();
        let completions: BTreeSet<Completion> = [0, 2]
            .into_iter()
            .map(|offset| Completion {
                habit_id: 7,
                date: days_ago(offset),
            })
            .collect();
        let pct = weekly_completion_percentage(&completions, &habits, days_ago(6), today());
        assert!((pct - 200.0 / 7.0).abs() < 1e-9);
    }

    #[test]
    fn history_skips_weeks_before_creation() {
        // Created on the Monday of the previous week.
        let created = week_start(today()) - Duration::weeks(1);
        let completed: BTreeSet<NaiveDate> = days_between(created, created + Duration::days(6))
            .into_iter()
            .collect();

        let history = habit_weekly_history(&completed, created, today());
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].label, "W7");
        assert_eq!(history[0].percentage, 100.0);
        assert_eq!(history[1].label, "W8");
        // Monday through Wednesday of the current week are valid.
        assert_eq!(history[1].valid_days, 3);
        assert_eq!(history[1].completed_days, 0);
    }

    #[test]
    fn stats_list_dates_ascending() {
        let stats = habit_stats(&set(&[0, 3, 1]), today());
        assert_eq!(stats.current_streak, 2);
        assert_eq!(stats.longest_streak, 2);
        assert_eq!(stats.total_completions, 3);
        assert_eq!(stats.completion_dates, vec![days_ago(3), days_ago(1), days_ago(0)]);
    }
}
