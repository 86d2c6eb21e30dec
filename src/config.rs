use anyhow::{Context, Result, anyhow};
use std::{env, fmt::Display, str::FromStr};
use tracing::info;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub run_migrations: bool,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_register_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,
    pub log_dir: String,
    pub log_level: tracing::Level,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            database_max_connections: optional("DATABASE_MAX_CONNECTIONS", 10)?,
            run_migrations: optional("RUN_MIGRATIONS", true)?,
            access_token_ttl: optional("ACCESS_TOKEN_TTL", 900)?, // 15 min
            refresh_token_ttl: optional("REFRESH_TOKEN_TTL", 604_800)?, // 7 days

            rate_login_per_min: optional("RATE_LOGIN_PER_MIN", 60)?,
            rate_register_per_min: optional("RATE_REGISTER_PER_MIN", 30)?,
            rate_refresh_per_min: optional("RATE_REFRESH_PER_MIN", 30)?,
            rate_protected_per_min: optional("RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: optional("API_PREFIX", "/api".to_string())?,
            log_dir: optional("LOG_DIR", "logs".to_string())?,
            log_level: optional("LOG_LEVEL", tracing::Level::DEBUG)?,
        })
    }
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn optional<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => parse_value(key, &raw),
        Err(_) => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim()
        .parse()
        .map_err(|e| anyhow!("Invalid {key} value {raw:?}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numbers_and_levels() {
        let ttl: usize = parse_value("ACCESS_TOKEN_TTL", " 1200 ").unwrap();
        assert_eq!(ttl, 1200);

        let level: tracing::Level = parse_value("LOG_LEVEL", "warn").unwrap();
        assert_eq!(level, tracing::Level::WARN);
    }

    #[test]
    fn bad_value_names_the_key() {
        let err = parse_value::<u32>("RATE_LOGIN_PER_MIN", "lots").unwrap_err();
        assert!(err.to_string().contains("RATE_LOGIN_PER_MIN"));
    }
}
