use anyhow::{Context, Result};

/// Runtime configuration for the surrounding process. The engine itself
/// never reads the environment; these values reach it as plain arguments.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub site_url: String,
    pub site_username: String,
    pub site_password: String,
    pub slack_webhook_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            site_url: std::env::var("SITE_URL")
                .unwrap_or_else(|_| "https://www.sssb.se/en".to_string()),
            site_username: require_env("SITE_USERNAME")?,
            site_password: require_env("SITE_PASSWORD")?,
            slack_webhook_url: std::env::var("SLACK_WEBHOOK_URL").ok(),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
