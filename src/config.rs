use crate::calendar::parse_timezone;
use std::{env, net::SocketAddr, path::PathBuf};
use tracing::warn;

const DEFAULT_DATA_PATH: &str = "data/habits.json";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_TIMEZONE: &str = "UTC";

#[derive(Debug, Clone)]
pub struct Config {
    pub data_path: PathBuf,
    pub port: u16,
    pub default_timezone: String,
}

impl Config {
    pub fn from_env() -> Self {
        let data_path = env::var("APP_DATA_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_PATH));

        let port = env::var("PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        let default_timezone = match env::var("DEFAULT_TIMEZONE") {
            Ok(name) if parse_timezone(&name).is_some() => name.trim().to_string(),
            Ok(name) => {
                warn!("DEFAULT_TIMEZONE {name:?} is not an IANA zone, using {DEFAULT_TIMEZONE}");
                DEFAULT_TIMEZONE.to_string()
            }
            Err(_) => DEFAULT_TIMEZONE.to_string(),
        };

        Self {
            data_path,
            port,
            default_timezone,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}
