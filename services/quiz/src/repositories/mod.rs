//! Store seam for the quiz service
//!
//! Every component receives a [`QuizStore`] explicitly; nothing reaches for a
//! process-wide client. [`PgStore`] is the production backend and
//! [`MemoryStore`] keeps everything in the process for tests and local demos.

use chrono::{DateTime, Utc};
use common::error::DatabaseResult;
use uuid::Uuid;

use crate::models::{
    NewSession, NewTestResult, NewUser, Session, StatsSnapshot, TestResult, User,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Durable records behind the quiz service
///
/// Implementations must make `upsert_user` and `insert_user_if_absent` atomic
/// with respect to the unique Telegram id.
pub trait QuizStore: Clone + Send + Sync + 'static {
    /// Insert a user, or overwrite the display attributes of the existing row
    /// with the same Telegram id. The surrogate id never changes.
    fn upsert_user(&self, user: &NewUser) -> impl Future<Output = DatabaseResult<User>> + Send;

    /// Insert a user only when the Telegram id is unused; `None` on collision
    fn insert_user_if_absent(
        &self,
        user: &NewUser,
    ) -> impl Future<Output = DatabaseResult<Option<User>>> + Send;

    fn insert_session(
        &self,
        session: &NewSession,
    ) -> impl Future<Output = DatabaseResult<Session>> + Send;

    /// Look a session up by token digest, joined with the owner's current row.
    /// Expiry is not checked here.
    fn find_session(
        &self,
        token_hash: &str,
    ) -> impl Future<Output = DatabaseResult<Option<(Session, User)>>> + Send;

    fn delete_expired_sessions(
        &self,
        now: DateTime<Utc>,
    ) -> impl Future<Output = DatabaseResult<u64>> + Send;

    fn insert_result(
        &self,
        result: &NewTestResult,
    ) -> impl Future<Output = DatabaseResult<TestResult>> + Send;

    /// Results of one user, newest first
    fn list_results_for_user(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = DatabaseResult<Vec<TestResult>>> + Send;

    fn stats_snapshot(&self) -> impl Future<Output = DatabaseResult<StatsSnapshot>> + Send;

    fn health_check(&self) -> impl Future<Output = DatabaseResult<bool>> + Send;
}
