use crate::auth::{hash_password, normalize_username, verify_password, CurrentUser};
use crate::calendar::{parse_date_or, parse_timezone, week_start};
use crate::errors::{AppError, StoreError};
use crate::grid::{
    build_grid, challenge_weekly_progress, completed_dates_in, grid_window, selected_week,
};
use crate::models::{
    AppData, Challenge, ChallengeId, ChallengeProgressResponse, ChallengeRequest, Completion,
    CompletionRequest, CompletionResponse, Grid, GridQuery, Habit, HabitDetailResponse, HabitId,
    HabitListQuery, HabitListResponse, HabitRequest, HabitSummary, JournalEntry,
    JournalListResponse, JournalRequest, LoginRequest, MoveRequest, RegisterRequest,
    TimezoneRequest, UserResponse, WeekQuery,
};
use crate::state::AppState;
use crate::storage::persist_data;
use crate::store::HabitStore;
use crate::streaks::{day_flags, habit_stats, habit_weekly_history};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use std::collections::BTreeSet;
use tokio::task::spawn_blocking;
use tracing::{debug, info};

/// Applies `apply` to a copy of the dataset and swaps it in only once the
/// copy is on disk. A failed write leaves the in-memory state untouched.
async fn commit<T>(
    state: &AppState,
    apply: impl FnOnce(&mut AppData) -> Result<T, StoreError>,
) -> Result<T, AppError> {
    commit_changes(state, |data| apply(data).map(|value| (value, true))).await
}

/// Like `commit`, but skips the write when `apply` reports no change.
async fn commit_changes<T>(
    state: &AppState,
    apply: impl FnOnce(&mut AppData) -> Result<(T, bool), StoreError>,
) -> Result<T, AppError> {
    let mut data = state.data.lock().await;
    let mut next = data.clone();
    let (value, changed) = apply(&mut next)?;
    if changed {
        persist_data(&state.data_path, &next).await?;
        *data = next;
    }
    Ok(value)
}

// -- Users --

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    if normalize_username(&payload.username).is_empty() || payload.password.is_empty() {
        return Err(AppError::bad_request("both username and password are required"));
    }
    let timezone = match payload.timezone.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => valid_timezone(name)?,
        _ => state.default_timezone.clone(),
    };
    let password = payload.password;
    let password_hash = spawn_blocking(move || hash_password(&password))
        .await
        .map_err(AppError::internal)??;

    let user = commit(&state, |data| {
        data.register_user(&payload.username, password_hash, timezone, Utc::now())
    })
    .await?;

    info!(user_id = user.id, "registered {}", user.username_key);
    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let found = {
        let data = state.data.lock().await;
        data.find_user_by_username(&payload.username)
            .map(|user| (UserResponse::from(user), user.password_hash.clone()))
    };
    let rejected = || AppError::unauthorized("invalid username or password");
    let (user, stored_hash) = found.ok_or_else(rejected)?;

    let password = payload.password;
    let verified = spawn_blocking(move || verify_password(&password, &stored_hash))
        .await
        .map_err(AppError::internal)?;
    if !verified {
        return Err(rejected());
    }
    Ok(Json(user))
}

pub async fn me(current: CurrentUser) -> Json<UserResponse> {
    Json(UserResponse {
        id: current.id,
        username: current.username,
        timezone: current.timezone,
    })
}

pub async fn set_timezone(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(payload): Json<TimezoneRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let timezone = valid_timezone(&payload.timezone)?;
    let user = commit(&state, |data| data.set_timezone(current.id, timezone)).await?;
    Ok(Json(UserResponse::from(&user)))
}

// -- Habits --

pub async fn list_habits(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<HabitListQuery>,
) -> Result<Json<HabitListResponse>, AppError> {
    let today = current.today();
    let selected_date = parse_date_or(query.date.as_deref(), today);
    let monday = week_start(today);
    let sunday = monday + Duration::days(6);

    let data = state.data.lock().await;
    if let Some(challenge_id) = query.challenge_id {
        data.challenge_for(current.id, challenge_id)?;
    }
    let habits = data.list_habits(current.id, query.challenge_id);
    let week_completions = data.list_completions(&habit_ids(&habits), Some((monday, sunday)));

    let habits = habits
        .into_iter()
        .map(|habit| {
            let completed = data.completions.contains(&Completion {
                habit_id: habit.id,
                date: selected_date,
            });
            let week_logs = completed_dates_in(&week_completions, habit.id, monday, sunday)
                .into_iter()
                .collect();
            HabitSummary {
                habit,
                completed,
                week_logs,
            }
        })
        .collect();

    Ok(Json(HabitListResponse {
        habits,
        selected_date,
        today,
    }))
}

pub async fn create_habit(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(payload): Json<HabitRequest>,
) -> Result<(StatusCode, Json<Habit>), AppError> {
    let today = current.today();
    let habit = commit(&state, |data| {
        data.create_habit(
            current.id,
            &payload.title,
            payload.body.as_deref(),
            payload.challenge_id,
            Utc::now(),
            today,
        )
    })
    .await?;
    Ok((StatusCode::CREATED, Json(habit)))
}

pub async fn get_habit(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<HabitId>,
    Query(query): Query<WeekQuery>,
) -> Result<Json<HabitDetailResponse>, AppError> {
    let today = current.today();
    let data = state.data.lock().await;
    let habit = data.habit_for(current.id, id)?.clone();
    let completed = data.completion_dates(id);
    let challenge = habit
        .challenge_id
        .and_then(|challenge_id| data.challenge_for(current.id, challenge_id).ok())
        .cloned();

    let monday = selected_week(query.week_offset, today);
    let week = day_flags(
        &completed,
        monday,
        monday + Duration::days(6),
        habit.created_date,
        today,
    );

    Ok(Json(HabitDetailResponse {
        stats: habit_stats(&completed, today),
        history: habit_weekly_history(&completed, habit.created_date, today),
        habit,
        challenge,
        week,
        today,
    }))
}

pub async fn update_habit(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<HabitId>,
    Json(payload): Json<HabitRequest>,
) -> Result<Json<Habit>, AppError> {
    let habit = commit(&state, |data| {
        data.update_habit(
            current.id,
            id,
            &payload.title,
            payload.body.as_deref(),
            payload.challenge_id,
        )
    })
    .await?;
    Ok(Json(habit))
}

pub async fn delete_habit(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<HabitId>,
) -> Result<Json<Value>, AppError> {
    commit(&state, |data| data.delete_habit(current.id, id)).await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn complete_habit(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<HabitId>,
    payload: Option<Json<CompletionRequest>>,
) -> Result<Json<CompletionResponse>, AppError> {
    set_completion(&state, &current, id, payload, true).await
}

pub async fn undo_habit(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<HabitId>,
    payload: Option<Json<CompletionRequest>>,
) -> Result<Json<CompletionResponse>, AppError> {
    set_completion(&state, &current, id, payload, false).await
}

async fn set_completion(
    state: &AppState,
    current: &CurrentUser,
    habit_id: HabitId,
    payload: Option<Json<CompletionRequest>>,
    completed: bool,
) -> Result<Json<CompletionResponse>, AppError> {
    let request = payload.map(|Json(request)| request).unwrap_or_default();
    let date = parse_date_or(request.date.as_deref(), current.today());

    let changed = commit_changes(state, |data| {
        data.habit_for(current.id, habit_id)?;
        let changed = if completed {
            data.mark_complete(habit_id, date)
        } else {
            data.unmark_complete(habit_id, date)
        };
        Ok((changed, changed))
    })
    .await?;
    debug!(habit_id, %date, completed, changed, "completion updated");

    Ok(Json(CompletionResponse {
        habit_id,
        date,
        completed,
    }))
}

pub async fn move_habit(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<HabitId>,
    Json(request): Json<MoveRequest>,
) -> Result<Json<Value>, AppError> {
    let (moved, display_order) = commit_changes(&state, |data| {
        let moved = data.move_habit(current.id, id, request.direction)?;
        let display_order = data.habit_for(current.id, id)?.display_order;
        Ok(((moved, display_order), moved))
    })
    .await?;
    Ok(Json(json!({ "moved": moved, "display_order": display_order })))
}

// -- Grid --

pub async fn get_grid(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<GridQuery>,
) -> Result<Json<Grid>, AppError> {
    let today = current.today();
    let (start, end) = grid_window(
        query.start.as_deref(),
        query.end.as_deref(),
        query.week_offset,
        today,
    );

    let data = state.data.lock().await;
    if let Some(challenge_id) = query.challenge_id {
        data.challenge_for(current.id, challenge_id)?;
    }
    let habits = data.list_habits(current.id, query.challenge_id);
    let completions = data.list_completions(&habit_ids(&habits), Some((start, end)));
    Ok(Json(build_grid(&habits, start, end, &completions, today)))
}

// -- Challenges --

pub async fn list_challenges(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Json<Vec<Challenge>> {
    let data = state.data.lock().await;
    Json(data.list_challenges(current.id))
}

pub async fn create_challenge(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(payload): Json<ChallengeRequest>,
) -> Result<(StatusCode, Json<Challenge>), AppError> {
    let today = current.today();
    let challenge = commit(&state, |data| {
        data.create_challenge(
            current.id,
            &payload.title,
            payload.body.as_deref(),
            Utc::now(),
            today,
        )
    })
    .await?;
    Ok((StatusCode::CREATED, Json(challenge)))
}

pub async fn delete_challenge(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<ChallengeId>,
) -> Result<Json<Value>, AppError> {
    commit(&state, |data| data.delete_challenge(current.id, id)).await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn challenge_progress(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<ChallengeId>,
) -> Result<Json<ChallengeProgressResponse>, AppError> {
    let today = current.today();
    let data = state.data.lock().await;
    let challenge = data.challenge_for(current.id, id)?.clone();
    let habits = data.list_habits(current.id, Some(id));
    let ids = habit_ids(&habits);
    let completions = data.list_completions(&ids, None);

    Ok(Json(ChallengeProgressResponse {
        weeks: challenge_weekly_progress(&challenge, &habits, &completions, today),
        habit_ids: ids.into_iter().collect(),
        challenge,
    }))
}

// -- Journal --

pub async fn list_journal(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Json<JournalListResponse> {
    let data = state.data.lock().await;
    Json(JournalListResponse {
        entries: data.list_journal_entries(current.id),
    })
}

pub async fn create_journal_entry(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(payload): Json<JournalRequest>,
) -> Result<(StatusCode, Json<JournalEntry>), AppError> {
    let entry = commit(&state, |data| {
        data.create_journal_entry(current.id, &payload.content, Utc::now())
    })
    .await?;
    debug!(user_id = current.id, entry_id = entry.id, "journal entry saved");
    Ok((StatusCode::CREATED, Json(entry)))
}

fn habit_ids(habits: &[Habit]) -> BTreeSet<HabitId> {
    habits.iter().map(|habit| habit.id).collect()
}

fn valid_timezone(name: &str) -> Result<String, AppError> {
    match parse_timezone(name) {
        Some(tz) => Ok(tz.name().to_string()),
        None => Err(AppError::bad_request(format!("unknown timezone {name:?}"))),
    }
}
