//! Session management
//!
//! Sessions are opaque bearer tokens with a fixed lifetime. Only the SHA-256
//! digest of a token is persisted; expiry is checked on every lookup, so the
//! optional sweep only reclaims space.

use anyhow::Result;
use chrono::{Duration, Utc};
use rand::{RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    error::ApiResult,
    models::{NewSession, Session, User},
    repositories::QuizStore,
};

const TOKEN_BYTES: usize = 32;

/// Freshly issued session; `token` is only ever handed to the client
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub session: Session,
}

/// Session that was found and is still active, with its owner
#[derive(Debug, Clone)]
pub struct ResolvedSession {
    pub session: Session,
    pub user: User,
}

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Digest under which a token is stored
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Session manager for issuing and resolving session tokens
#[derive(Clone)]
pub struct SessionManager<S> {
    store: S,
    ttl: Duration,
}

impl<S: QuizStore> SessionManager<S> {
    /// Create a new session manager
    pub fn new(store: S, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Create a new session for a user
    pub async fn create_session(&self, user_id: Uuid) -> ApiResult<IssuedSession> {
        let token = generate_token();
        let new_session = NewSession {
            user_id,
            token_hash: hash_token(&token),
            expires_at: Utc::now() + self.ttl,
        };

        let session = self.store.insert_session(&new_session).await?;
        info!(user_id = %user_id, session_id = %session.id, "Session created");

        Ok(IssuedSession { token, session })
    }

    /// Look up a token, treating expired sessions as absent
    pub async fn resolve_session(&self, token: &str) -> ApiResult<Option<ResolvedSession>> {
        if token.is_empty() {
            return Ok(None);
        }

        let found = self.store.find_session(&hash_token(token)).await?;

        Ok(found
            .filter(|(session, _)| session.is_active_at(Utc::now()))
            .map(|(session, user)| ResolvedSession { session, user }))
    }

    /// Delete every session past its expiry
    pub async fn cleanup_expired_sessions(&self) -> ApiResult<u64> {
        let removed = self.store.delete_expired_sessions(Utc::now()).await?;
        info!(removed, "Cleaned up expired sessions");
        Ok(removed)
    }

    /// Run `cleanup_expired_sessions` on a cron schedule
    ///
    /// The returned scheduler owns the job and must be kept alive.
    pub async fn start_expiry_sweep(&self, schedule: &str) -> Result<JobScheduler> {
        let sessions = self.clone();
        let scheduler = JobScheduler::new().await?;

        let job = Job::new_async(schedule, move |_, _| {
            let sessions = sessions.clone();
            Box::pin(async move {
                if let Err(e) = sessions.cleanup_expired_sessions().await {
                    error!("Expired session sweep failed: {}", e);
                }
            })
        })?;

        scheduler.add(job).await?;
        scheduler.start().await?;

        info!("Started expired session sweep with schedule: {}", schedule);
        Ok(scheduler)
    }
}
