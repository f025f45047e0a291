use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, bail};

/// Secrets that ship in examples and must never sign real tokens.
const PLACEHOLDER_SECRETS: &[&str] = &["", "changeme", "change-me", "secret", "dev-secret-change-me"];

/// Server configuration, read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub tmdb_api_key: String,
    pub tmdb_base_url: String,
    pub tmdb_language: String,
    pub genre_cache_ttl: Duration,
    /// Allowed CORS origins; empty means any.
    pub cors_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let jwt_secret = get("REEL_JWT_SECRET").unwrap_or_default();
        if PLACEHOLDER_SECRETS.contains(&jwt_secret.trim()) {
            bail!("REEL_JWT_SECRET must be set to a real secret");
        }

        let tmdb_api_key = get("TMDB_API_KEY").unwrap_or_default();
        if tmdb_api_key.trim().is_empty() {
            bail!("TMDB_API_KEY must be set");
        }

        Ok(Self {
            host: get("REEL_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse(&get, "REEL_PORT", 8005)?,
            db_path: PathBuf::from(get("REEL_DB_PATH").unwrap_or_else(|| "reel.db".into())),
            jwt_secret,
            token_ttl_hours: parse(&get, "REEL_TOKEN_TTL_HOURS", 24)?,
            tmdb_api_key,
            tmdb_base_url: get("TMDB_BASE_URL").unwrap_or_else(|| "https://api.themoviedb.org/3".into()),
            tmdb_language: get("TMDB_LANGUAGE").unwrap_or_else(|| "pt-BR".into()),
            genre_cache_ttl: Duration::from_secs(parse(&get, "REEL_GENRE_CACHE_TTL_SECS", 86_400)?),
            cors_origins: get("REEL_CORS_ORIGINS")
                .unwrap_or_default()
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect(),
        })
    }
}

fn parse<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {}: {:?}", key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = load(&[("REEL_JWT_SECRET", "s3cr3t-value"), ("TMDB_API_KEY", "key")]).unwrap();
        assert_eq!(config.port, 8005);
        assert_eq!(config.token_ttl_hours, 24);
        assert_eq!(config.tmdb_language, "pt-BR");
        assert_eq!(config.genre_cache_ttl, Duration::from_secs(86_400));
        assert!(config.cors_origins.is_empty());
    }

    #[test]
    fn placeholder_secret_is_refused() {
        assert!(load(&[("TMDB_API_KEY", "key")]).is_err());
        assert!(load(&[("REEL_JWT_SECRET", "changeme"), ("TMDB_API_KEY", "key")]).is_err());
    }

    #[test]
    fn bad_numbers_are_errors() {
        let res = load(&[
            ("REEL_JWT_SECRET", "s3cr3t-value"),
            ("TMDB_API_KEY", "key"),
            ("REEL_PORT", "eighty"),
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn origins_are_split() {
        let config = load(&[
            ("REEL_JWT_SECRET", "s3cr3t-value"),
            ("TMDB_API_KEY", "key"),
            ("REEL_CORS_ORIGINS", "http://localhost:3000, https://reel.app ,"),
        ])
        .unwrap();
        assert_eq!(config.cors_origins, vec!["http://localhost:3000", "https://reel.app"]);
    }
}
