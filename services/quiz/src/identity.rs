//! Identity store: turns login requests into stored users
//!
//! Real logins are keyed by the Telegram id and upserted. Demo logins get a
//! freshly fabricated Telegram id from a reserved range so browser-only
//! testers can walk through the quiz without a Telegram context.

use chrono::Utc;
use common::error::DatabaseError;
use rand::Rng;
use serde::{Deserialize, Deserializer, de::Error as _};
use serde_json::{Map, Value};
use std::ops::RangeInclusive;
use tracing::{info, warn};

use crate::{
    error::{ApiError, ApiResult},
    models::{NewUser, User},
    repositories::QuizStore,
    telegram::{self, LoginPayload},
    validation::validate_username,
};

/// Demo ids sit above real Telegram ids and stay exact in JavaScript numbers
pub const DEMO_TELEGRAM_ID_RANGE: RangeInclusive<i64> = 9_000_000_000_000_000..=9_007_199_254_740_991;

const DEMO_INSERT_ATTEMPTS: usize = 8;

const DEFAULT_LANGUAGE_CODE: &str = "ru";

/// How logins are admitted
#[derive(Clone)]
pub struct AuthPolicy {
    pub bot_token: Option<String>,
    /// Require a valid Telegram signature on every non-demo login
    pub verify_telegram_auth: bool,
    pub allow_demo_logins: bool,
}

/// Login body, accepting the field spellings of both client variants
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(
        default,
        alias = "telegram_id",
        alias = "id",
        deserialize_with = "deserialize_flexible_i64"
    )]
    pub telegram_id: Option<i64>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default, alias = "first_name")]
    pub first_name: Option<String>,
    #[serde(default, alias = "last_name")]
    pub last_name: Option<String>,
    #[serde(default, alias = "photo_url")]
    pub photo_url: Option<String>,
    #[serde(default, alias = "language_code")]
    pub language_code: Option<String>,
    #[serde(
        default,
        alias = "auth_date",
        deserialize_with = "deserialize_flexible_i64"
    )]
    pub auth_date: Option<i64>,
    #[serde(default, alias = "is_demo")]
    pub is_demo: Option<bool>,
    /// Raw WebApp `initData` query string
    #[serde(default, alias = "init_data")]
    pub init_data: Option<String>,
}

/// Accept integers sent either as JSON numbers or numeric strings
fn deserialize_flexible_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| D::Error::custom("expected an integer")),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("expected an integer, got {:?}", s))),
        Some(other) => Err(D::Error::custom(format!(
            "expected an integer, got {}",
            other
        ))),
    }
}

/// Clients send `""` for unset profile fields
fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl LoginRequest {
    fn wants_demo(&self) -> bool {
        self.is_demo.unwrap_or(false) || (self.telegram_id.is_none() && self.init_data.is_none())
    }

    fn into_new_user(self) -> ApiResult<NewUser> {
        let telegram_id = self
            .telegram_id
            .ok_or_else(|| ApiError::Validation("Telegram ID is required".to_string()))?;
        if telegram_id <= 0 {
            return Err(ApiError::Validation(
                "Telegram ID must be a positive integer".to_string(),
            ));
        }

        let username = non_blank(self.username);
        if let Some(username) = &username {
            validate_username(username).map_err(ApiError::Validation)?;
        }

        Ok(NewUser {
            telegram_id,
            username,
            first_name: non_blank(self.first_name),
            last_name: non_blank(self.last_name),
            photo_url: non_blank(self.photo_url),
            language_code: non_blank(self.language_code)
                .or_else(|| Some(DEFAULT_LANGUAGE_CODE.to_string())),
            auth_date: self.auth_date,
        })
    }
}

fn demo_telegram_id() -> i64 {
    rand::thread_rng().gen_range(DEMO_TELEGRAM_ID_RANGE)
}

/// Upserts users and fabricates demo identities
#[derive(Clone)]
pub struct IdentityService<S> {
    store: S,
    policy: AuthPolicy,
}

impl<S: QuizStore> IdentityService<S> {
    /// Create a new identity service
    pub fn new(store: S, policy: AuthPolicy) -> Self {
        Self { store, policy }
    }

    /// Resolve a login body to a stored user
    ///
    /// Demo requests skip signature checks; every other request is verified
    /// against the bot token when the policy demands it.
    pub async fn authenticate(&self, body: &Map<String, Value>) -> ApiResult<User> {
        let request: LoginRequest = serde_json::from_value(Value::Object(body.clone()))
            .map_err(|e| ApiError::Validation(format!("Invalid login payload: {}", e)))?;

        if request.wants_demo() {
            if !self.policy.allow_demo_logins {
                return Err(ApiError::Validation("Telegram ID is required".to_string()));
            }
            return self.create_demo_user().await;
        }

        let new_user = match request.init_data.as_deref() {
            Some(init_data) => self.user_from_init_data(init_data)?,
            None => {
                if self.policy.verify_telegram_auth {
                    let payload = telegram::payload_from_json(body).ok_or_else(|| {
                        warn!("Rejected login payload with non-scalar fields");
                        ApiError::Unauthorized("Invalid authorization".to_string())
                    })?;
                    self.check_signature(&payload)?;
                }
                request.into_new_user()?
            }
        };

        self.upsert_user(&new_user).await
    }

    /// Insert or refresh a user keyed by Telegram id
    pub async fn upsert_user(&self, new_user: &NewUser) -> ApiResult<User> {
        let user = self.store.upsert_user(new_user).await?;
        info!(user_id = %user.id, telegram_id = user.telegram_id, "User authenticated");
        Ok(user)
    }

    /// Create a user under a fresh, unused demo Telegram id
    pub async fn create_demo_user(&self) -> ApiResult<User> {
        for _ in 0..DEMO_INSERT_ATTEMPTS {
            let candidate = NewUser {
                telegram_id: demo_telegram_id(),
                username: Some("demo_user".to_string()),
                first_name: Some("Demo".to_string()),
                last_name: Some("User".to_string()),
                photo_url: None,
                language_code: Some(DEFAULT_LANGUAGE_CODE.to_string()),
                auth_date: Some(Utc::now().timestamp()),
            };

            if let Some(user) = self.store.insert_user_if_absent(&candidate).await? {
                info!(user_id = %user.id, telegram_id = user.telegram_id, "Demo user created");
                return Ok(user);
            }

            warn!(
                telegram_id = candidate.telegram_id,
                "Demo Telegram id already taken, retrying"
            );
        }

        Err(ApiError::Database(DatabaseError::Conflict(
            "could not allocate an unused demo Telegram id".to_string(),
        )))
    }

    fn user_from_init_data(&self, init_data: &str) -> ApiResult<NewUser> {
        let Some(payload) = telegram::parse_init_data(init_data) else {
            return Err(if self.policy.verify_telegram_auth {
                ApiError::Unauthorized("Invalid authorization".to_string())
            } else {
                ApiError::Validation("Malformed init data".to_string())
            });
        };

        if self.policy.verify_telegram_auth {
            self.check_signature(&payload)?;
        }

        let user_json = payload
            .get("user")
            .ok_or_else(|| ApiError::Validation("Init data carries no user".to_string()))?;
        let mut request: LoginRequest = serde_json::from_str(user_json)
            .map_err(|e| ApiError::Validation(format!("Invalid init data user: {}", e)))?;
        request.auth_date = payload.get("auth_date").and_then(|v| v.parse().ok());

        request.into_new_user()
    }

    fn check_signature(&self, payload: &LoginPayload) -> ApiResult<()> {
        let Some(bot_token) = self.policy.bot_token.as_deref() else {
            warn!("Telegram login verification is enabled but no bot token is configured");
            return Err(ApiError::Unauthorized("Invalid authorization".to_string()));
        };

        telegram::check(payload, bot_token).map_err(|reason| {
            warn!(%reason, "Rejected Telegram login data");
            ApiError::Unauthorized("Invalid authorization".to_string())
        })
    }
}
