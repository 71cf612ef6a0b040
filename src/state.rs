use crate::config::Config;
use crate::models::AppData;
use std::{path::PathBuf, sync::Arc};
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct AppState {
    pub data_path: PathBuf,
    pub default_timezone: String,
    pub data: Arc<Mutex<AppData>>,
}

impl AppState {
    pub fn new(config: &Config, data: AppData) -> Self {
        Self {
            data_path: config.data_path.clone(),
            default_timezone: config.default_timezone.clone(),
            data: Arc::new(Mutex::new(data)),
        }
    }
}
