use std::time::Duration;

use serde::Deserialize;

use crate::db::models::Role;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub telegram_bot_token: String,
    pub database_url: String,

    /// Dashboard bind address
    pub web_host: String,
    pub web_port: u16,

    /// Credentials provisioned on first startup
    pub seed_users: Vec<SeedUser>,

    /// Abandoned intake conversations are dropped after this long.
    /// `None` keeps them until completion or /cancel.
    pub intake_idle_timeout: Option<Duration>,

    /// Mark the session cookie `Secure` (enable behind HTTPS)
    pub session_secure_cookie: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedUser {
    pub username: String,
    pub password: String,
    pub role: Role,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let telegram_bot_token = lookup("TELEGRAM_BOT_TOKEN")
            .ok_or_else(|| anyhow::anyhow!("TELEGRAM_BOT_TOKEN is not set"))?;

        let idle_secs: u64 = var_or("INTAKE_IDLE_TIMEOUT_SECS", "86400")
            .parse()
            .map_err(|e| anyhow::anyhow!("INTAKE_IDLE_TIMEOUT_SECS: {}", e))?;

        Ok(Self {
            telegram_bot_token,
            database_url: var_or("DATABASE_URL", "sqlite://data.db?mode=rwc"),
            web_host: var_or("WEB_HOST", "0.0.0.0"),
            web_port: var_or("WEB_PORT", "8000")
                .parse()
                .map_err(|e| anyhow::anyhow!("WEB_PORT: {}", e))?,
            seed_users: vec![
                SeedUser {
                    username: var_or("ADMIN_USERNAME", "admin"),
                    password: var_or("ADMIN_PASSWORD", "admin"),
                    role: Role::Admin,
                },
                SeedUser {
                    username: var_or("USER_USERNAME", "user"),
                    password: var_or("USER_PASSWORD", "user"),
                    role: Role::User,
                },
            ],
            intake_idle_timeout: (idle_secs > 0).then(|| Duration::from_secs(idle_secs)),
            session_secure_cookie: var_or("SESSION_SECURE_COOKIE", "false")
                .parse()
                .map_err(|e| anyhow::anyhow!("SESSION_SECURE_COOKIE: {}", e))?,
        })
    }

    pub fn web_addr(&self) -> String {
        format!("{}:{}", self.web_host, self.web_port)
    }
}
