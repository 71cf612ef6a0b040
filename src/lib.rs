pub mod app;
pub mod auth;
pub mod calendar;
pub mod config;
pub mod errors;
pub mod grid;
pub mod handlers;
pub mod models;
pub mod state;
pub mod storage;
pub mod store;
pub mod streaks;

pub use app::router;
pub use config::Config;
pub use state::AppState;
pub use storage::load_data;
