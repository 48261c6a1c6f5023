//! In-process store
//!
//! Holds every record behind a single async mutex, which gives the same
//! atomicity the PostgreSQL unique constraints give `PgStore`. Data lives as
//! long as the process does.

use chrono::{DateTime, Utc};
use common::error::{DatabaseError, DatabaseResult};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::QuizStore;
use crate::models::{
    NewSession, NewTestResult, NewUser, Session, StatsSnapshot, TestResult, User,
};

#[derive(Debug, Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    users_by_telegram_id: HashMap<i64, Uuid>,
    sessions: HashMap<String, Session>,
    /// Insertion order doubles as completion order
    results: Vec<TestResult>,
}

impl MemoryState {
    fn insert_user(&mut self, user: &NewUser, now: DateTime<Utc>) -> User {
        let row = User {
            id: Uuid::new_v4(),
            telegram_id: user.telegram_id,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            photo_url: user.photo_url.clone(),
            language_code: user.language_code.clone(),
            auth_date: user.auth_date,
            created_at: now,
            updated_at: now,
        };
        self.users_by_telegram_id.insert(row.telegram_id, row.id);
        self.users.insert(row.id, row.clone());
        row
    }
}

/// Store keeping all records in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl QuizStore for MemoryStore {
    async fn upsert_user(&self, user: &NewUser) -> DatabaseResult<User> {
        let mut state = self.state.lock().await;
        let now = Utc::now();

        let existing = state.users_by_telegram_id.get(&user.telegram_id).copied();
        let row = match existing.and_then(|id| state.users.get_mut(&id)) {
            Some(row) => {
                row.username = user.username.clone();
                row.first_name = user.first_name.clone();
                row.last_name = user.last_name.clone();
                row.photo_url = user.photo_url.clone();
                row.language_code = user.language_code.clone();
                row.auth_date = user.auth_date;
                row.updated_at = now;
                row.clone()
            }
            None => state.insert_user(user, now),
        };

        Ok(row)
    }

    async fn insert_user_if_absent(&self, user: &NewUser) -> DatabaseResult<Option<User>> {
        let mut state = self.state.lock().await;

        if state.users_by_telegram_id.contains_key(&user.telegram_id) {
            return Ok(None);
        }

        Ok(Some(state.insert_user(user, Utc::now())))
    }

    async fn insert_session(&self, session: &NewSession) -> DatabaseResult<Session> {
        let mut state = self.state.lock().await;

        if !state.users.contains_key(&session.user_id) {
            return Err(DatabaseError::Conflict(format!(
                "session references unknown user {}",
                session.user_id
            )));
        }
        if state.sessions.contains_key(&session.token_hash) {
            return Err(DatabaseError::Conflict("duplicate session token".to_string()));
        }

        let row = Session {
            id: Uuid::new_v4(),
            user_id: session.user_id,
            token_hash: session.token_hash.clone(),
            created_at: Utc::now(),
            expires_at: session.expires_at,
        };
        state.sessions.insert(row.token_hash.clone(), row.clone());

        Ok(row)
    }

    async fn find_session(&self, token_hash: &str) -> DatabaseResult<Option<(Session, User)>> {
        let state = self.state.lock().await;

        Ok(state.sessions.get(token_hash).and_then(|session| {
            state
                .users
                .get(&session.user_id)
                .map(|user| (session.clone(), user.clone()))
        }))
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> DatabaseResult<u64> {
        let mut state = self.state.lock().await;

        let before = state.sessions.len();
        state.sessions.retain(|_, session| session.is_active_at(now));
        let removed = before - state.sessions.len();

        let live: Vec<Uuid> = state.sessions.values().map(|s| s.id).collect();
        for result in state.results.iter_mut() {
            if result.session_id.is_some_and(|id| !live.contains(&id)) {
                result.session_id = None;
            }
        }

        Ok(removed as u64)
    }

    async fn insert_result(&self, result: &NewTestResult) -> DatabaseResult<TestResult> {
        let mut state = self.state.lock().await;

        if !state.users.contains_key(&result.user_id) {
            return Err(DatabaseError::Conflict(format!(
                "result references unknown user {}",
                result.user_id
            )));
        }

        let row = TestResult {
            id: Uuid::new_v4(),
            user_id: result.user_id,
            session_id: result.session_id,
            score: result.score,
            result_type: result.result_type.clone(),
            result_title: result.result_title.clone(),
            result_description: result.result_description.clone(),
            answers: result.answers.clone(),
            completed_at: Utc::now(),
        };
        state.results.push(row.clone());

        Ok(row)
    }

    async fn list_results_for_user(&self, user_id: Uuid) -> DatabaseResult<Vec<TestResult>> {
        let state = self.state.lock().await;

        Ok(state
            .results
            .iter()
            .rev()
            .filter(|result| result.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn stats_snapshot(&self) -> DatabaseResult<StatsSnapshot> {
        let state = self.state.lock().await;

        let total_tests = state.results.len() as i64;
        let avg_score = if state.results.is_empty() {
            None
        } else {
            let sum: i64 = state.results.iter().map(|r| i64::from(r.score)).sum();
            Some(sum as f64 / total_tests as f64)
        };

        let mut result_distribution = BTreeMap::new();
        for result in &state.results {
            *result_distribution
                .entry(result.result_type.clone())
                .or_insert(0) += 1;
        }

        Ok(StatsSnapshot {
            total_users: state.users.len() as i64,
            total_tests,
            avg_score,
            result_distribution,
        })
    }

    async fn health_check(&self) -> DatabaseResult<bool> {
        Ok(true)
    }
}
