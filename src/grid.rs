use crate::calendar::{days_between, parse_date_or, week_label, week_start};
use crate::models::{Challenge, Completion, Grid, GridRow, Habit, HabitId, WeeklyProgress};
use crate::streaks::{completion_percentage, count_completions, day_flags};
use chrono::{Duration, NaiveDate};
use std::cmp::Ordering;
use std::collections::BTreeSet;

pub const MAX_GRID_DAYS: i64 = 366;
const MAX_WEEKS_BACK: i64 = 520;

/// Presentation order: highest `display_order` first, ties by id.
pub fn display_order_desc(a: &Habit, b: &Habit) -> Ordering {
    b.display_order
        .cmp(&a.display_order)
        .then_with(|| a.id.cmp(&b.id))
}

pub fn ordered_habits(habits: &[Habit]) -> Vec<&Habit> {
    let mut ordered: Vec<&Habit> = habits.iter().collect();
    ordered.sort_by(|a, b| display_order_desc(a, b));
    ordered
}

/// Dates logged for `habit_id` inside `[start, end]`.
pub fn completed_dates_in(
    completions: &BTreeSet<Completion>,
    habit_id: HabitId,
    start: NaiveDate,
    end: NaiveDate,
) -> BTreeSet<NaiveDate> {
    if end < start {
        return BTreeSet::new();
    }
    let low = Completion {
        habit_id,
        date: start,
    };
    let high = Completion {
        habit_id,
        date: end,
    };
    completions.range(low..=high).map(|entry| entry.date).collect()
}

/// Densifies the sparse completion set into one row per habit with one
/// cell per date of `[start, end]`.
pub fn build_grid(
    habits: &[Habit],
    start: NaiveDate,
    end: NaiveDate,
    completions: &BTreeSet<Completion>,
    today: NaiveDate,
) -> Grid {
    let rows = ordered_habits(habits)
        .into_iter()
        .map(|habit| {
            let completed = completed_dates_in(completions, habit.id, start, end);
            GridRow {
                habit_id: habit.id,
                title: habit.title.clone(),
                display_order: habit.display_order,
                days: day_flags(&completed, start, end, habit.created_date, today),
            }
        })
        .collect();

    Grid {
        start,
        end,
        today,
        dates: days_between(start, end),
        rows,
    }
}

/// Resolves the requested grid window. Without explicit bounds the window
/// is the Monday-Sunday week `week_offset` weeks back from the current one.
pub fn grid_window(
    start: Option<&str>,
    end: Option<&str>,
    week_offset: Option<i64>,
    today: NaiveDate,
) -> (NaiveDate, NaiveDate) {
    let default_start = selected_week(week_offset, today);
    let default_end = default_start + Duration::days(6);

    let mut start = parse_date_or(start, default_start);
    let mut end = parse_date_or(end, default_end);
    if end < start {
        std::mem::swap(&mut start, &mut end);
    }
    if (end - start).num_days() >= MAX_GRID_DAYS {
        end = start + Duration::days(MAX_GRID_DAYS - 1);
    }
    (start, end)
}

/// Monday of the week `week_offset` weeks relative to today's week. Future
/// weeks are not navigable, so positive offsets clamp to the current week.
pub fn selected_week(week_offset: Option<i64>, today: NaiveDate) -> NaiveDate {
    let offset = week_offset.unwrap_or(0).clamp(-MAX_WEEKS_BACK, 0);
    week_start(today) + Duration::weeks(offset)
}

/// Weekly completion rate of a challenge's habits, one Monday-Sunday bucket
/// per week from the challenge's creation week through the current week.
pub fn challenge_weekly_progress(
    challenge: &Challenge,
    habits: &[Habit],
    completions: &BTreeSet<Completion>,
    today: NaiveDate,
) -> Vec<WeeklyProgress> {
    let habit_ids: BTreeSet<HabitId> = habits
        .iter()
        .filter(|habit| habit.challenge_id == Some(challenge.id))
        .map(|habit| habit.id)
        .collect();

    let mut weeks = Vec::new();
    let mut bucket_start = week_start(challenge.created_date);
    while bucket_start <= today {
        let bucket_end = bucket_start + Duration::days(6);
        let completed = count_completions(completions, &habit_ids, bucket_start, bucket_end);
        let possible = habit_ids.len() * 7;
        weeks.push(WeeklyProgress {
            week: week_label(bucket_start),
            start_date: bucket_start,
            end_date: bucket_end,
            completed,
            possible,
            percentage: completion_percentage(completed, possible),
        });
        bucket_start += Duration::weeks(1);
    }
    weeks
}
