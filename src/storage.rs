use crate::errors::AppError;
use crate::models::AppData;
use std::path::Path;
use tokio::fs;
use tracing::{error, info};

pub async fn load_data(path: &Path) -> AppData {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice::<AppData>(&bytes) {
            Ok(data) => {
                info!(
                    users = data.users.len(),
                    habits = data.habits.len(),
                    completions = data.completions.len(),
                    "loaded {}",
                    path.display()
                );
                data
            }
            Err(err) => {
                error!("failed to parse data file: {err}");
                AppData::default()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => AppData::default(),
        Err(err) => {
            error!("failed to read data file: {err}");
            AppData::default()
        }
    }
}

pub async fn persist_data(path: &Path, data: &AppData) -> Result<(), AppError> {
    let payload = serde_json::to_vec_pretty(data).map_err(AppError::internal)?;
    fs::write(path, payload).await.map_err(|err| {
        error!("failed to write data file: {err}");
        AppError::internal(err)
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::HabitStore;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn temp_path(name: &str) -> std::path::PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let file = format!("habit_tracker_{name}_{}_{nanos}.json", std::process::id());
        std::env::temp_dir().join(file)
    }

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let data = load_data(&temp_path("missing")).await;
        assert!(data.habits.is_empty());
        assert_eq!(data.next_id, 0);
    }

    #[tokio::test]
    async fn persisted_data_reloads() {
        let path = temp_path("reload");
        let now = Utc.with_ymd_and_hms(2026, 2, 2, 10, 0, 0).unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 2, 2).unwrap();

        let mut data = AppData::default();
        let user = data.register_user("dana", "hash".into(), "Europe/Berlin".into(), now).unwrap();
        let habit = data.create_habit(user.id, "stretch", None, None, now, day).unwrap();
        data.mark_complete(habit.id, day);
        persist_data(&path, &data).await.unwrap();

        let reloaded = load_data(&path).await;
        assert_eq!(reloaded.next_id, data.next_id);
        assert_eq!(reloaded.habits.get(&habit.id), Some(&habit));
        assert_eq!(reloaded.completion_dates(habit.id).len(), 1);
        assert_eq!(reloaded.find_user_by_username("DANA").map(|u| u.id), Some(user.id));

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn corrupt_file_loads_empty() {
        let path = temp_path("corrupt");
        std::fs::write(&path, b"{not json").unwrap();
        let data = load_data(&path).await;
        assert!(data.users.is_empty());
        let _ = std::fs::remove_file(&path);
    }
}
