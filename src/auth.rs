use crate::calendar::local_today;
use crate::errors::AppError;
use crate::models::{User, UserId};
use crate::state::AppState;
use crate::store::HabitStore;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use chrono::NaiveDate;

pub const USER_HEADER: &str = "x-user-id";

/// Lookup key for a username: surrounding whitespace dropped, lowercased.
pub fn normalize_username(raw: &str) -> String {
    raw.trim().to_lowercase()
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AppError::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))
}

pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// The resolved requester. Handlers receive it explicitly instead of
/// reading ambient request state.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: UserId,
    pub username: String,
    pub timezone: String,
}

impl CurrentUser {
    /// Today's date in the user's own timezone.
    pub fn today(&self) -> NaiveDate {
        local_today(&self.timezone)
    }
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            timezone: user.timezone.clone(),
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<UserId>().ok())
            .ok_or_else(|| AppError::unauthorized("authentication required"))?;

        let data = state.data.lock().await;
        let user = data
            .user(user_id)
            .map_err(|_| AppError::unauthorized("authentication required"))?;
        Ok(CurrentUser::from(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames_normalize_to_lowercase() {
        assert_eq!(normalize_username("  MixedCase "), "mixedcase");
        assert_eq!(normalize_username("   "), "");
    }

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("hunter22").unwrap();
        assert_ne!(hash, "hunter22");
        assert!(verify_password("hunter22", &hash));
        assert!(!verify_password("hunter23", &hash));
        assert!(!verify_password("hunter22", "not-a-hash"));
    }
}
