//! Session model and related functionality

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Session entity
///
/// Only the digest of the bearer token is persisted.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// A session is usable strictly before its expiry instant
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// New session creation payload
#[derive(Debug, Clone)]
pub struct NewSession {
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
}
