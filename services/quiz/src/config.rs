//! Service configuration
//!
//! Values come from `QUIZ_*` environment variables layered over defaults
//! (`QUIZ_BIND_ADDR`, `QUIZ_STORE`, `QUIZ_BOT_TOKEN`,
//! `QUIZ_VERIFY_TELEGRAM_AUTH`, `QUIZ_ALLOW_DEMO_LOGINS`,
//! `QUIZ_SESSION_TTL_SECS`, `QUIZ_SESSION_SWEEP_SCHEDULE`). Database settings
//! live in [`common::database::DatabaseConfig`].

use anyhow::{Result, bail};
use config::{Config, Environment};
use serde::Deserialize;
use std::fmt;

use crate::identity::AuthPolicy;

/// Which store backs the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    /// Process-local, for browser testing without a database
    Memory,
}

#[derive(Clone, Deserialize)]
pub struct ServiceConfig {
    pub bind_addr: String,
    pub store: StoreBackend,
    pub bot_token: Option<String>,
    pub verify_telegram_auth: bool,
    pub allow_demo_logins: bool,
    pub session_ttl_secs: i64,
    /// Cron expression for the expired-session sweep; unset disables it
    pub session_sweep_schedule: Option<String>,
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("bind_addr", &self.bind_addr)
            .field("store", &self.store)
            .field("bot_token", &self.bot_token.as_ref().map(|_| "<redacted>"))
            .field("verify_telegram_auth", &self.verify_telegram_auth)
            .field("allow_demo_logins", &self.allow_demo_logins)
            .field("session_ttl_secs", &self.session_ttl_secs)
            .field("session_sweep_schedule", &self.session_sweep_schedule)
            .finish()
    }
}

impl ServiceConfig {
    /// Load the configuration from the environment and validate it
    pub fn from_env() -> Result<Self> {
        let config: ServiceConfig = Config::builder()
            .set_default("bind_addr", "0.0.0.0:3000")?
            .set_default("store", "postgres")?
            .set_default("verify_telegram_auth", true)?
            .set_default("allow_demo_logins", true)?
            .set_default("session_ttl_secs", 86_400_i64)?
            .add_source(Environment::with_prefix("QUIZ").try_parsing(true))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Reject combinations the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.verify_telegram_auth
            && self.bot_token.as_deref().is_none_or(|token| token.trim().is_empty())
        {
            bail!("QUIZ_BOT_TOKEN must be set while QUIZ_VERIFY_TELEGRAM_AUTH is enabled");
        }

        if self.session_ttl_secs <= 0 {
            bail!("QUIZ_SESSION_TTL_SECS must be positive");
        }

        Ok(())
    }

    /// Authentication policy derived from this configuration
    pub fn auth_policy(&self) -> AuthPolicy {
        AuthPolicy {
            bot_token: self.bot_token.clone(),
            verify_telegram_auth: self.verify_telegram_auth,
            allow_demo_logins: self.allow_demo_logins,
        }
    }

    /// Session lifetime
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.session_ttl_secs)
    }
}
