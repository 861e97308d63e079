use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context};

const DEFAULT_AI_SERVICE_URL: &str = "http://ai-service:8000";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Runtime settings, read from the environment (and `.env` via dotenv).
#[derive(Debug, Clone)]
pub struct Config {
    pub ai_service_url: String,
    pub pg_host: String,
    pub pg_port: u16,
    pub pg_username: String,
    pub pg_password: String,
    pub pg_dbname: String,
    pub bind_addr: String,
    pub connect_attempts: u32,
    pub ai_image_timeout: Duration,
    pub ai_symptom_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Config, anyhow::Error> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Config, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| lookup(key).ok_or_else(|| anyhow!("{key} must be set"));

        Ok(Config {
            ai_service_url: lookup("AI_SERVICE_URL")
                .unwrap_or_else(|| DEFAULT_AI_SERVICE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            pg_host: required("PG_HOST")?,
            pg_port: parse_or(&lookup, "PG_PORT", 5432)?,
            pg_username: required("PG_USERNAME")?,
            pg_password: required("PG_PASSWORD")?,
            pg_dbname: required("PG_DBNAME")?,
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            connect_attempts: parse_or(&lookup, "CONNECT_ATTEMPTS", 5)?,
            ai_image_timeout: Duration::from_secs(parse_or(&lookup, "AI_IMAGE_TIMEOUT_SECS", 120)?),
            ai_symptom_timeout: Duration::from_secs(parse_or(&lookup, "AI_SYMPTOM_TIMEOUT_SECS", 60)?),
        })
    }

    pub fn pg_url(&self) -> String {
        format!(
            "postgresql://{}:{}@{}:{}/{}",
            self.pg_username, self.pg_password, self.pg_host, self.pg_port, self.pg_dbname
        )
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, anyhow::Error>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        None => Ok(default),
    }
}
