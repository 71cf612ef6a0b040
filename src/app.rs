use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/auth/register", post(handlers::register))
        .route("/api/auth/login", post(handlers::login))
        .route("/api/auth/me", get(handlers::me))
        .route("/api/auth/timezone", put(handlers::set_timezone))
        .route(
            "/api/habits",
            get(handlers::list_habits).post(handlers::create_habit),
        )
        .route(
            "/api/habits/:id",
            get(handlers::get_habit)
                .put(handlers::update_habit)
                .delete(handlers::delete_habit),
        )
        .route("/api/habits/:id/complete", post(handlers::complete_habit))
        .route("/api/habits/:id/undo", post(handlers::undo_habit))
        .route("/api/habits/:id/move", post(handlers::move_habit))
        .route("/api/grid", get(handlers::get_grid))
        .route(
            "/api/challenges",
            get(handlers::list_challenges).post(handlers::create_challenge),
        )
        .route("/api/challenges/:id", axum::routing::delete(handlers::delete_challenge))
        .route("/api/challenges/:id/progress", get(handlers::challenge_progress))
        .route(
            "/api/journal",
            get(handlers::list_journal).post(handlers::create_journal_entry),
        )
        .with_state(state)
}
