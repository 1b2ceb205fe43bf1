use std::env;
use std::path::PathBuf;

use thiserror::Error;

const DEFAULT_PORT: u16 = 4000;
const DEFAULT_ARTIFACT_DIR: &str = "./cache";
const DEFAULT_LIMIT_BYTES: u64 = 3 * 1024 * 1024 * 1024;
const DEFAULT_TARGET_BYTES: u64 = 5 * 1024 * 1024 * 1024 / 2; // 2.5 GiB

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{0} is malformed: {1}")]
    Malformed(&'static str, String),
}

/// Process-wide settings, assembled once at startup. Any missing or
/// malformed required value is fatal — the caller is expected to exit with
/// this error's message rather than start the server half-configured.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_key: String,
    pub database_url: String,
    pub spotify_client_id: String,
    pub spotify_client_secret: String,
    pub spotify_refresh_token: String,
    pub port: u16,
    pub artifact_dir: PathBuf,
    pub cache_limit_bytes: u64,
    pub cache_target_bytes: u64,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = required("API_KEY")?;
        let database_url = required("NEON_CONNECTION_STRING")?;
        let spotify_client_id = required("SPOTIFY_CLIENT_ID")?;
        let spotify_client_secret = required("SPOTIFY_CLIENT_SECRET")?;
        let spotify_refresh_token = required("SPOTIFY_REFRESH_TOKEN")?;

        let port = optional_parsed("PORT", DEFAULT_PORT)?;
        let artifact_dir = env::var("ARTIFACT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_ARTIFACT_DIR));
        let cache_limit_bytes = optional_parsed("CACHE_LIMIT_BYTES", DEFAULT_LIMIT_BYTES)?;
        let cache_target_bytes = optional_parsed("CACHE_TARGET_BYTES", DEFAULT_TARGET_BYTES)?;

        if cache_target_bytes > cache_limit_bytes {
            return Err(ConfigError::Malformed(
                "CACHE_TARGET_BYTES",
                "must not exceed CACHE_LIMIT_BYTES".to_string(),
            ));
        }

        Ok(Self {
            api_key,
            database_url,
            spotify_client_id,
            spotify_client_secret,
            spotify_refresh_token,
            port,
            artifact_dir,
            cache_limit_bytes,
            cache_target_bytes,
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(name)),
    }
}

fn optional_parsed<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|_| ConfigError::Malformed(name, value)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Settings::from_env reads process-wide env vars; serialize tests that touch it.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_vars() {
        for var in [
            "API_KEY",
            "NEON_CONNECTION_STRING",
            "SPOTIFY_CLIENT_ID",
            "SPOTIFY_CLIENT_SECRET",
            "SPOTIFY_REFRESH_TOKEN",
            "PORT",
            "ARTIFACT_DIR",
            "CACHE_LIMIT_BYTES",
            "CACHE_TARGET_BYTES",
        ] {
            unsafe { env::remove_var(var) };
        }
    }

    #[test]
    fn missing_required_var_is_fatal() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_vars();
        let err = Settings::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Missing("API_KEY")));
    }

    #[test]
    fn defaults_apply_when_optional_vars_absent() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_vars();
        unsafe {
            env::set_var("API_KEY", "secret");
            env::set_var("NEON_CONNECTION_STRING", "postgres://localhost/db");
            env::set_var("SPOTIFY_CLIENT_ID", "id");
            env::set_var("SPOTIFY_CLIENT_SECRET", "secret");
            env::set_var("SPOTIFY_REFRESH_TOKEN", "token");
        }
        let settings = Settings::from_env().expect("should load with only required vars set");
        assert_eq!(settings.port, DEFAULT_PORT);
        assert_eq!(settings.cache_limit_bytes, DEFAULT_LIMIT_BYTES);
        assert_eq!(settings.cache_target_bytes, DEFAULT_TARGET_BYTES);
        clear_vars();
    }

    #[test]
    fn malformed_port_is_rejected() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_vars();
        unsafe {
            env::set_var("API_KEY", "secret");
            env::set_var("NEON_CONNECTION_STRING", "postgres://localhost/db");
            env::set_var("SPOTIFY_CLIENT_ID", "id");
            env::set_var("SPOTIFY_CLIENT_SECRET", "secret");
            env::set_var("SPOTIFY_REFRESH_TOKEN", "token");
            env::set_var("PORT", "not-a-number");
        }
        let err = Settings::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Malformed("PORT", _)));
        clear_vars();
    }
}
