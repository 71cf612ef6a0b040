//! Persistence port for users, habits, challenges, the completion log and
//! journal entries.
//!
//! `AppData` is the only implementation: the whole dataset lives in memory
//! and `storage` writes it back to disk after each mutation.

use crate::auth::normalize_username;
use crate::errors::StoreError;
use crate::grid::display_order_desc;
use crate::models::{
    AppData, Challenge, ChallengeId, Completion, Habit, HabitId, JournalEntry, JournalInsights,
    MoveDirection, User, UserId,
};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeSet;

pub trait HabitStore {
    fn register_user(
        &mut self,
        username: &str,
        password_hash: String,
        timezone: String,
        now: DateTime<Utc>,
    ) -> Result<User, StoreError>;
    fn find_user_by_username(&self, username: &str) -> Option<&User>;
    fn user(&self, user_id: UserId) -> Result<&User, StoreError>;
    fn set_timezone(&mut self, user_id: UserId, timezone: String) -> Result<User, StoreError>;

    fn create_habit(
        &mut self,
        owner_id: UserId,
        title: &str,
        body: Option<&str>,
        challenge_id: Option<ChallengeId>,
        now: DateTime<Utc>,
        created_date: NaiveDate,
    ) -> Result<Habit, StoreError>;
    fn habit_for(&self, owner_id: UserId, habit_id: HabitId) -> Result<&Habit, StoreError>;
    fn update_habit(
        &mut self,
        owner_id: UserId,
        habit_id: HabitId,
        title: &str,
        body: Option<&str>,
        challenge_id: Option<ChallengeId>,
    ) -> Result<Habit, StoreError>;
    fn delete_habit(&mut self, owner_id: UserId, habit_id: HabitId) -> Result<(), StoreError>;
    /// Owner's habits, optionally narrowed to one challenge, highest
    /// `display_order` first.
    fn list_habits(&self, owner_id: UserId, challenge_id: Option<ChallengeId>) -> Vec<Habit>;

    fn list_completions(
        &self,
        habit_ids: &BTreeSet<HabitId>,
        range: Option<(NaiveDate, NaiveDate)>,
    ) -> BTreeSet<Completion>;
    fn completion_dates(&self, habit_id: HabitId) -> BTreeSet<NaiveDate>;
    /// Returns whether a new entry was written; a duplicate is a no-op.
    fn mark_complete(&mut self, habit_id: HabitId, date: NaiveDate) -> bool;
    /// Returns whether an entry was removed; a missing entry is a no-op.
    fn unmark_complete(&mut self, habit_id: HabitId, date: NaiveDate) -> bool;
    /// Swaps `display_order` with the adjacent habit of the same owner.
    /// Returns `false` when there is nothing to swap with.
    fn move_habit(
        &mut self,
        owner_id: UserId,
        habit_id: HabitId,
        direction: MoveDirection,
    ) -> Result<bool, StoreError>;

    fn create_challenge(
        &mut self,
        owner_id: UserId,
        title: &str,
        body: Option<&str>,
        now: DateTime<Utc>,
        created_date: NaiveDate,
    ) -> Result<Challenge, StoreError>;
    fn challenge_for(
        &self,
        owner_id: UserId,
        challenge_id: ChallengeId,
    ) -> Result<&Challenge, StoreError>;
    fn list_challenges(&self, owner_id: UserId) -> Vec<Challenge>;
    /// Deletes the challenge and detaches its habits.
    fn delete_challenge(
        &mut self,
        owner_id: UserId,
        challenge_id: ChallengeId,
    ) -> Result<(), StoreError>;

    fn create_journal_entry(
        &mut self,
        user_id: UserId,
        content: &str,
        now: DateTime<Utc>,
    ) -> Result<JournalEntry, StoreError>;
    /// Newest first.
    fn list_journal_entries(&self, user_id: UserId) -> Vec<JournalEntry>;
}

impl AppData {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn check_challenge(
        &self,
        owner_id: UserId,
        challenge_id: Option<ChallengeId>,
    ) -> Result<(), StoreError> {
        match challenge_id {
            Some(id) => self.challenge_for(owner_id, id).map(|_| ()),
            None => Ok(()),
        }
    }
}

fn required_title(title: &str) -> Result<String, StoreError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(StoreError::Invalid("title is required".into()));
    }
    Ok(title.to_string())
}

fn optional_body(body: Option<&str>) -> Option<String> {
    body.map(str::trim)
        .filter(|body| !body.is_empty())
        .map(str::to_string)
}

impl HabitStore for AppData {
    fn register_user(
        &mut self,
        username: &str,
        password_hash: String,
        timezone: String,
        now: DateTime<Utc>,
    ) -> Result<User, StoreError> {
        let username_key = normalize_username(username);
        if username_key.is_empty() {
            return Err(StoreError::Invalid("username is required".into()));
        }
        if self.find_user_by_username(&username_key).is_some() {
            return Err(StoreError::UsernameTaken(username_key));
        }

        let user = User {
            id: self.allocate_id(),
            username: username.trim().to_string(),
            username_key,
            password_hash,
            timezone,
            created_at: now,
        };
        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    fn find_user_by_username(&self, username: &str) -> Option<&User> {
        let key = normalize_username(username);
        self.users.values().find(|user| user.username_key == key)
    }

    fn user(&self, user_id: UserId) -> Result<&User, StoreError> {
        self.users
            .get(&user_id)
            .ok_or(StoreError::UserNotFound(user_id))
    }

    fn set_timezone(&mut self, user_id: UserId, timezone: String) -> Result<User, StoreError> {
        let user = self
            .users
            .get_mut(&user_id)
            .ok_or(StoreError::UserNotFound(user_id))?;
        user.timezone = timezone;
        Ok(user.clone())
    }

    fn create_habit(
        &mut self,
        owner_id: UserId,
        title: &str,
        body: Option<&str>,
        challenge_id: Option<ChallengeId>,
        now: DateTime<Utc>,
        created_date: NaiveDate,
    ) -> Result<Habit, StoreError> {
        let title = required_title(title)?;
        self.check_challenge(owner_id, challenge_id)?;

        let display_order = self
            .habits
            .values()
            .filter(|habit| habit.owner_id == owner_id)
            .map(|habit| habit.display_order)
            .max()
            .unwrap_or(0)
            + 1;

        let habit = Habit {
            id: self.allocate_id(),
            title,
            body: optional_body(body),
            owner_id,
            challenge_id,
            created_at: now,
            created_date,
            display_order,
        };
        self.habits.insert(habit.id, habit.clone());
        Ok(habit)
    }

    fn habit_for(&self, owner_id: UserId, habit_id: HabitId) -> Result<&Habit, StoreError> {
        let habit = self
            .habits
            .get(&habit_id)
            .ok_or(StoreError::HabitNotFound(habit_id))?;
        if habit.owner_id != owner_id {
            return Err(StoreError::Forbidden);
        }
        Ok(habit)
    }

    fn update_habit(
        &mut self,
        owner_id: UserId,
        habit_id: HabitId,
        title: &str,
        body: Option<&str>,
        challenge_id: Option<ChallengeId>,
    ) -> Result<Habit, StoreError> {
        self.habit_for(owner_id, habit_id)?;
        let title = required_title(title)?;
        self.check_challenge(owner_id, challenge_id)?;

        let habit = self
            .habits
            .get_mut(&habit_id)
            .ok_or(StoreError::HabitNotFound(habit_id))?;
        habit.title = title;
        habit.body = optional_body(body);
        habit.challenge_id = challenge_id;
        Ok(habit.clone())
    }

    fn delete_habit(&mut self, owner_id: UserId, habit_id: HabitId) -> Result<(), StoreError> {
        self.habit_for(owner_id, habit_id)?;
        self.habits.remove(&habit_id);
        self.completions.retain(|entry| entry.habit_id != habit_id);
        Ok(())
    }

    fn list_habits(&self, owner_id: UserId, challenge_id: Option<ChallengeId>) -> Vec<Habit> {
        let mut habits: Vec<Habit> = self
            .habits
            .values()
            .filter(|habit| habit.owner_id == owner_id)
            .filter(|habit| challenge_id.is_none() || habit.challenge_id == challenge_id)
            .cloned()
            .collect();
        habits.sort_by(display_order_desc);
        habits
    }

    fn list_completions(
        &self,
        habit_ids: &BTreeSet<HabitId>,
        range: Option<(NaiveDate, NaiveDate)>,
    ) -> BTreeSet<Completion> {
        self.completions
            .iter()
            .filter(|entry| habit_ids.contains(&entry.habit_id))
            .filter(|entry| match range {
                Some((start, end)) => entry.date >= start && entry.date <= end,
                None => true,
            })
            .copied()
            .collect()
    }

    fn completion_dates(&self, habit_id: HabitId) -> BTreeSet<NaiveDate> {
        self.completions
            .iter()
            .filter(|entry| entry.habit_id == habit_id)
            .map(|entry| entry.date)
            .collect()
    }

    fn mark_complete(&mut self, habit_id: HabitId, date: NaiveDate) -> bool {
        self.completions.insert(Completion { habit_id, date })
    }

    fn unmark_complete(&mut self, habit_id: HabitId, date: NaiveDate) -> bool {
        self.completions.remove(&Completion { habit_id, date })
    }

    fn move_habit(
        &mut self,
        owner_id: UserId,
        habit_id: HabitId,
        direction: MoveDirection,
    ) -> Result<bool, StoreError> {
        let current = self.habit_for(owner_id, habit_id)?.display_order;

        let siblings = self
            .habits
            .values()
            .filter(|habit| habit.owner_id == owner_id && habit.id != habit_id);
        let neighbour = match direction {
            MoveDirection::Up => siblings
                .filter(|habit| habit.display_order > current)
                .min_by_key(|habit| (habit.display_order, habit.id)),
            MoveDirection::Down => siblings
                .filter(|habit| habit.display_order < current)
                .max_by_key(|habit| (habit.display_order, std::cmp::Reverse(habit.id))),
        }
        .map(|habit| (habit.id, habit.display_order));

        let Some((neighbour_id, neighbour_order)) = neighbour else {
            return Ok(false);
        };
        if let Some(habit) = self.habits.get_mut(&habit_id) {
            habit.display_order = neighbour_order;
        }
        if let Some(habit) = self.habits.get_mut(&neighbour_id) {
            habit.display_order = current;
        }
        Ok(true)
    }

    fn create_challenge(
        &mut self,
        owner_id: UserId,
        title: &str,
        body: Option<&str>,
        now: DateTime<Utc>,
        created_date: NaiveDate,
    ) -> Result<Challenge, StoreError> {
        let title = required_title(title)?;
        let challenge = Challenge {
            id: self.allocate_id(),
            title,
            body: optional_body(body),
            owner_id,
            created_at: now,
            created_date,
        };
        self.challenges.insert(challenge.id, challenge.clone());
        Ok(challenge)
    }

    fn challenge_for(
        &self,
        owner_id: UserId,
        challenge_id: ChallengeId,
    ) -> Result<&Challenge, StoreError> {
        let challenge = self
            .challenges
            .get(&challenge_id)
            .ok_or(StoreError::ChallengeNotFound(challenge_id))?;
        if challenge.owner_id != owner_id {
            return Err(StoreError::Forbidden);
        }
        Ok(challenge)
    }

    fn list_challenges(&self, owner_id: UserId) -> Vec<Challenge> {
        // BTreeMap iteration keeps them ordered by id.
        self.challenges
            .values()
            .filter(|challenge| challenge.owner_id == owner_id)
            .cloned()
            .collect()
    }

    fn delete_challenge(
        &mut self,
        owner_id: UserId,
        challenge_id: ChallengeId,
    ) -> Result<(), StoreError> {
        self.challenge_for(owner_id, challenge_id)?;
        for habit in self.habits.values_mut() {
            if habit.challenge_id == Some(challenge_id) {
                habit.challenge_id = None;
            }
        }
        self.challenges.remove(&challenge_id);
        Ok(())
    }

    fn create_journal_entry(
        &mut self,
        user_id: UserId,
        content: &str,
        now: DateTime<Utc>,
    ) -> Result<JournalEntry, StoreError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(StoreError::Invalid("content is required".into()));
        }
        let entry = JournalEntry {
            id: self.allocate_id(),
            user_id,
            content: content.to_string(),
            extracted_data: JournalInsights::default(),
            created_at: now,
        };
        self.journal.insert(entry.id, entry.clone());
        Ok(entry)
    }

    fn list_journal_entries(&self, user_id: UserId) -> Vec<JournalEntry> {
        let mut entries: Vec<JournalEntry> = self
            .journal
            .values()
            .filter(|entry| entry.user_id == user_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, d).unwrap()
    }

    fn seeded() -> (AppData, UserId) {
        let mut data = AppData::default();
        let user = data
            .register_user("Alice", "hash".into(), "UTC".into(), now())
            .unwrap();
        (data, user.id)
    }

    fn add_habit(data: &mut AppData, owner: UserId, title: &str) -> Habit {
        data.create_habit(owner, title, None, None, now(), day(1)).unwrap()
    }

    #[test]
    fn usernames_are_case_insensitive() {
        let (mut data, id) = seeded();
        assert_eq!(data.find_user_by_username("  ALICE ").map(|user| user.id), Some(id));
        let err = data
            .register_user("alice", "other".into(), "UTC".into(), now())
            .unwrap_err();
        assert!(matches!(err, StoreError::UsernameTaken(_)));
        assert_eq!(data.user(id).unwrap().username, "Alice");
    }

    #[test]
    fn habits_get_increasing_display_order() {
        let (mut data, owner) = seeded();
        let first = add_habit(&mut data, owner, "read");
        let second = add_habit(&mut data, owner, "run");
        assert_eq!(first.display_order, 1);
        assert_eq!(second.display_order, 2);

        let listed: Vec<_> = data.list_habits(owner, None).into_iter().map(|h| h.id).collect();
        assert_eq!(listed, vec![second.id, first.id]);
    }

    #[test]
    fn blank_titles_are_rejected() {
        let (mut data, owner) = seeded();
        let err = data.create_habit(owner, "   ", None, None, now(), day(1)).unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
        let err = data.create_challenge(owner, "", None, now(), day(1)).unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
    }

    #[test]
    fn completion_writes_are_idempotent() {
        let (mut data, owner) = seeded();
        let habit = add_habit(&mut data, owner, "read");

        assert!(data.mark_complete(habit.id, day(2)));
        let once = data.completions.clone();
        assert!(!data.mark_complete(habit.id, day(2)));
        assert_eq!(data.completions, once);

        assert!(!data.unmark_complete(habit.id, day(3)));
        assert_eq!(data.completions, once);
        assert!(data.unmark_complete(habit.id, day(2)));
        assert!(data.completions.is_empty());
    }

    #[test]
    fn list_completions_filters_habits_and_range() {
        let (mut data, owner) = seeded();
        let a = add_habit(&mut data, owner, "a");
        let b = add_habit(&mut data, owner, "b");
        for d in [1, 3, 5] {
            data.mark_complete(a.id, day(d));
            data.mark_complete(b.id, day(d));
        }

        let only_a: BTreeSet<HabitId> = [a.id].into_iter().collect();
        assert_eq!(data.list_completions(&only_a, None).len(), 3);
        assert_eq!(data.list_completions(&only_a, Some((day(2), day(5)))).len(), 2);
        assert_eq!(data.completion_dates(b.id), BTreeSet::from([day(1), day(3), day(5)]));
    }

    #[test]
    fn move_swaps_with_adjacent_habit() {
        let (mut data, owner) = seeded();
        let ids: Vec<HabitId> = ["a", "b", "c"]
            .into_iter()
            .map(|title| add_habit(&mut data, owner, title).id)
            .collect();
        for (id, order) in ids.iter().zip([10, 20, 30]) {
            data.habits.get_mut(id).unwrap().display_order = order;
        }

        assert!(data.move_habit(owner, ids[1], MoveDirection::Up).unwrap());
        let orders: Vec<i64> = ids.iter().map(|id| data.habits[id].display_order).collect();
        assert_eq!(orders, vec![10, 30, 20]);

        assert!(data.move_habit(owner, ids[0], MoveDirection::Up).unwrap());
        let orders: Vec<i64> = ids.iter().map(|id| data.habits[id].display_order).collect();
        assert_eq!(orders, vec![20, 30, 10]);
    }

    #[test]
    fn move_at_edge_is_noop() {
        let (mut data, owner) = seeded();
        let low = add_habit(&mut data, owner, "low");
        let high = add_habit(&mut data, owner, "high");

        assert!(!data.move_habit(owner, high.id, MoveDirection::Up).unwrap());
        assert!(!data.move_habit(owner, low.id, MoveDirection::Down).unwrap());
        assert_eq!(data.habits[&low.id].display_order, 1);
        assert_eq!(data.habits[&high.id].display_order, 2);
    }

    #[test]
    fn move_ignores_other_owners() {
        let (mut data, owner) = seeded();
        let other = data
            .register_user("bob", "hash".into(), "UTC".into(), now())
            .unwrap();
        let mine = add_habit(&mut data, owner, "mine");
        let theirs = add_habit(&mut data, other.id, "theirs");
        data.habits.get_mut(&theirs.id).unwrap().display_order = 5;

        assert!(!data.move_habit(owner, mine.id, MoveDirection::Up).unwrap());
        assert!(matches!(
            data.move_habit(owner, theirs.id, MoveDirection::Down),
            Err(StoreError::Forbidden)
        ));
    }

    #[test]
    fn deleting_challenge_detaches_habits() {
        let (mut data, owner) = seeded();
        let challenge = data.create_challenge(owner, "june", None, now(), day(1)).unwrap();
        let habit = data
            .create_habit(owner, "read", Some(" pages "), Some(challenge.id), now(), day(1))
            .unwrap();
        assert_eq!(habit.body.as_deref(), Some("pages"));
        assert_eq!(data.list_habits(owner, Some(challenge.id)).len(), 1);

        data.delete_challenge(owner, challenge.id).unwrap();
        assert!(data.habits.contains_key(&habit.id));
        assert_eq!(data.habits[&habit.id].challenge_id, None);
        assert!(data.list_challenges(owner).is_empty());
    }

    #[test]
    fn deleting_habit_drops_its_log() {
        let (mut data, owner) = seeded();
        let keep = add_habit(&mut data, owner, "keep");
        let gone = add_habit(&mut data, owner, "gone");
        data.mark_complete(keep.id, day(2));
        data.mark_complete(gone.id, day(2));

        data.delete_habit(owner, gone.id).unwrap();
        assert_eq!(data.completions.len(), 1);
        assert!(matches!(data.habit_for(owner, gone.id), Err(StoreError::HabitNotFound(_))));
    }

    #[test]
    fn foreign_challenge_cannot_be_attached() {
        let (mut data, owner) = seeded();
        let other = data
            .register_user("carol", "hash".into(), "UTC".into(), now())
            .unwrap();
        let theirs = data.create_challenge(other.id, "theirs", None, now(), day(1)).unwrap();

        let err = data
            .create_habit(owner, "read", None, Some(theirs.id), now(), day(1))
            .unwrap_err();
        assert!(matches!(err, StoreError::Forbidden));
    }

    #[test]
    fn update_habit_trims_and_validates() {
        let (mut data, owner) = seeded();
        let other = data
            .register_user("dave", "hash".into(), "UTC".into(), now())
            .unwrap();
        let theirs = data.create_challenge(other.id, "theirs", None, now(), day(1)).unwrap();
        let habit = data
            .create_habit(owner, "read", Some("pages"), None, now(), day(1))
            .unwrap();

        let updated = data
            .update_habit(owner, habit.id, "  read more  ", Some("   "), None)
            .unwrap();
        assert_eq!(updated.title, "read more");
        assert_eq!(updated.body, None);
        assert_eq!(updated.display_order, habit.display_order);

        let err = data.update_habit(owner, habit.id, " ", None, None).unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
        let err = data
            .update_habit(owner, habit.id, "read", None, Some(theirs.id))
            .unwrap_err();
        assert!(matches!(err, StoreError::Forbidden));
        assert_eq!(data.habits[&habit.id].title, "read more");

        let err = data.update_habit(other.id, habit.id, "mine now", None, None).unwrap_err();
        assert!(matches!(err, StoreError::Forbidden));
    }

    #[test]
    fn journal_entries_are_trimmed_and_newest_first() {
        let (mut data, owner) = seeded();
        let other = data
            .register_user("erin", "hash".into(), "UTC".into(), now())
            .unwrap();

        let first = data.create_journal_entry(owner, "  slept well ", now()).unwrap();
        assert_eq!(first.content, "slept well");
        assert_eq!(first.extracted_data, JournalInsights::default());
        assert_eq!(first.extracted_data.energy_level, "medium");
        assert!(first.extracted_data.emotions.is_empty());

        let later = now() + chrono::Duration::hours(2);
        let second = data.create_journal_entry(owner, "long run", later).unwrap();
        data.create_journal_entry(other.id, "not yours", later).unwrap();

        let err = data.create_journal_entry(owner, " \n ", now()).unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));

        let ids: Vec<_> = data.list_journal_entries(owner).into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }
}
