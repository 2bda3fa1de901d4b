use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::cache::{CLEANUP_INTERVAL, MENU_DATA_TTL};

/// Runtime mode driving how classified errors are reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub environment: Environment,
    pub database_url: String,
    pub bind_addr: String,
    pub menu_data_ttl_secs: u64,
    pub cache_cleanup_interval_secs: u64,
    pub warm_cache_on_start: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") => Environment::Production,
            _ => Environment::Development,
        };

        Ok(Config {
            environment,
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./menu.db".to_string()),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            menu_data_ttl_secs: env::var("MENU_DATA_TTL_SECS")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(MENU_DATA_TTL.as_secs()),
            cache_cleanup_interval_secs: env::var("CACHE_CLEANUP_INTERVAL_SECS")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(CLEANUP_INTERVAL.as_secs()),
            warm_cache_on_start: env::var("WARM_CACHE_ON_START")
                .map(|raw| raw == "1" || raw.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        })
    }

    pub fn menu_data_ttl(&self) -> Duration {
        Duration::from_secs(self.menu_data_ttl_secs)
    }

    pub fn cache_cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cache_cleanup_interval_secs)
    }
}
