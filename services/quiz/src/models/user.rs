//! User model and related functionality

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// User entity, keyed naturally by the Telegram id
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub telegram_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub photo_url: Option<String>,
    pub language_code: Option<String>,
    /// Unix seconds claimed by Telegram at login time
    pub auth_date: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Upsert payload: the external id plus the display attributes it carries
///
/// Every attribute is written as given, so an absent value clears the stored
/// one on re-authentication.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewUser {
    pub telegram_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub photo_url: Option<String>,
    pub language_code: Option<String>,
    pub auth_date: Option<i64>,
}
