use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub type UserId = u64;
pub type HabitId = u64;
pub type ChallengeId = u64;
pub type JournalEntryId = u64;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// Display form as entered at registration.
    pub username: String,
    /// Lowercased, trimmed key used for every lookup.
    pub username_key: String,
    pub password_hash: String,
    pub timezone: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    pub id: HabitId,
    pub title: String,
    pub body: Option<String>,
    pub owner_id: UserId,
    pub challenge_id: Option<ChallengeId>,
    pub created_at: DateTime<Utc>,
    /// Calendar date of creation in the owner's timezone at the time.
    pub created_date: NaiveDate,
    pub display_order: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: ChallengeId,
    pub title: String,
    pub body: Option<String>,
    pub owner_id: UserId,
    pub created_at: DateTime<Utc>,
    pub created_date: NaiveDate,
}

/// Presence of a pair means the habit was completed on that date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Completion {
    pub habit_id: HabitId,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppData {
    #[serde(default)]
    pub next_id: u64,
    #[serde(default)]
    pub users: BTreeMap<UserId, User>,
    #[serde(default)]
    pub habits: BTreeMap<HabitId, Habit>,
    #[serde(default)]
    pub challenges: BTreeMap<ChallengeId, Challenge>,
    #[serde(default)]
    pub completions: BTreeSet<Completion>,
    #[serde(default)]
    pub journal: BTreeMap<JournalEntryId, JournalEntry>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveDirection {
    #[default]
    Up,
    Down,
}

/// Structured reading of a journal entry. Entries are stored with the
/// neutral reading until an extractor is wired in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalInsights {
    pub emotions: Vec<String>,
    pub wins: Vec<String>,
    pub struggles: Vec<String>,
    pub energy_level: String,
}

impl Default for JournalInsights {
    fn default() -> Self {
        Self {
            emotions: Vec::new(),
            wins: Vec::new(),
            struggles: Vec::new(),
            energy_level: "medium".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: JournalEntryId,
    pub user_id: UserId,
    pub content: String,
    pub extracted_data: JournalInsights,
    pub created_at: DateTime<Utc>,
}

// -- Engine outputs --

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayFlags {
    pub date: NaiveDate,
    pub completed: bool,
    pub in_future: bool,
    pub before_habit: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct GridRow {
    pub habit_id: HabitId,
    pub title: String,
    pub display_order: i64,
    pub days: Vec<DayFlags>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Grid {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub today: NaiveDate,
    pub dates: Vec<NaiveDate>,
    pub rows: Vec<GridRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyProgress {
    pub week: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub completed: usize,
    pub possible: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HabitWeekPoint {
    pub label: String,
    pub start_date: NaiveDate,
    pub valid_days: u8,
    pub completed_days: u8,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HabitStats {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub total_completions: usize,
    pub completion_dates: Vec<NaiveDate>,
}

// -- Requests --

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub timezone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct TimezoneRequest {
    pub timezone: String,
}

#[derive(Debug, Deserialize)]
pub struct HabitRequest {
    pub title: String,
    pub body: Option<String>,
    pub challenge_id: Option<ChallengeId>,
}

#[derive(Debug, Deserialize)]
pub struct ChallengeRequest {
    pub title: String,
    pub body: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CompletionRequest {
    pub date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MoveRequest {
    #[serde(default)]
    pub direction: MoveDirection,
}

#[derive(Debug, Deserialize)]
pub struct JournalRequest {
    pub content: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct HabitListQuery {
    pub date: Option<String>,
    pub challenge_id: Option<ChallengeId>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WeekQuery {
    pub week_offset: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GridQuery {
    pub start: Option<String>,
    pub end: Option<String>,
    pub challenge_id: Option<ChallengeId>,
    pub week_offset: Option<i64>,
}

// -- Responses --

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: UserId,
    pub username: String,
    pub timezone: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            timezone: user.timezone.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HabitSummary {
    #[serde(flatten)]
    pub habit: Habit,
    pub completed: bool,
    pub week_logs: Vec<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct HabitListResponse {
    pub habits: Vec<HabitSummary>,
    pub selected_date: NaiveDate,
    pub today: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct HabitDetailResponse {
    pub habit: Habit,
    pub challenge: Option<Challenge>,
    pub stats: HabitStats,
    pub week: Vec<DayFlags>,
    pub history: Vec<HabitWeekPoint>,
    pub today: NaiveDate,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub habit_id: HabitId,
    pub date: NaiveDate,
    pub completed: bool,
}

#[derive(Debug, Serialize)]
pub struct JournalListResponse {
    pub entries: Vec<JournalEntry>,
}

#[derive(Debug, Serialize)]
pub struct ChallengeProgressResponse {
    pub challenge: Challenge,
    pub habit_ids: Vec<HabitId>,
    pub weeks: Vec<WeeklyProgress>,
}
