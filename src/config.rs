use crate::errors::{JournalError, JournalResult};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server_port: u16,
    pub data_dir: PathBuf,
    pub static_dir: PathBuf,
    pub recent_trades_limit: usize,
    pub default_page_limit: usize,
    pub max_page_limit: usize,
}

impl AppConfig {
    pub fn from_env() -> JournalResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup. `from_env` passes the
    /// process environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> JournalResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let server_port = var_or("SERVER_PORT", "5000")
            .parse::<u16>()
            .map_err(|e| JournalError::Config(format!("SERVER_PORT: {e}")))?;

        let recent_trades_limit =
            parse_limit("RECENT_TRADES_LIMIT", &var_or("RECENT_TRADES_LIMIT", "10"))?;
        let default_page_limit =
            parse_limit("DEFAULT_PAGE_LIMIT", &var_or("DEFAULT_PAGE_LIMIT", "50"))?;
        let max_page_limit = parse_limit("MAX_PAGE_LIMIT", &var_or("MAX_PAGE_LIMIT", "200"))?;

        if default_page_limit > max_page_limit {
            return Err(JournalError::Config(format!(
                "DEFAULT_PAGE_LIMIT ({default_page_limit}) exceeds MAX_PAGE_LIMIT ({max_page_limit})"
            )));
        }

        Ok(Self {
            server_port,
            data_dir: PathBuf::from(var_or("DATA_DIR", "data")),
            static_dir: PathBuf::from(var_or("STATIC_DIR", "frontend/dist")),
            recent_trades_limit,
            default_page_limit,
            max_page_limit,
        })
    }
}

fn parse_limit(key: &str, raw: &str) -> JournalResult<usize> {
    let value = raw
        .parse::<usize>()
        .map_err(|e| JournalError::Config(format!("{key}: {e}")))?;
    if value == 0 {
        return Err(JournalError::Config(format!("{key} must be positive")));
    }
    Ok(value)
}
