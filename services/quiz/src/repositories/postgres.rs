//! PostgreSQL backed store

use chrono::{DateTime, Utc};
use common::error::DatabaseResult;
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::info;
use uuid::Uuid;

use super::QuizStore;
use crate::models::{
    NewSession, NewTestResult, NewUser, Session, StatsSnapshot, TestResult, User,
};

const USER_COLUMNS: &str = "id, telegram_id, username, first_name, last_name, photo_url, \
                            language_code, auth_date, created_at, updated_at";

const RESULT_COLUMNS: &str = "id, user_id, session_id, score, result_type, result_title, \
                              result_description, answers, completed_at";

/// Store over a PostgreSQL connection pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new store over an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn user_from_joined_row(row: &PgRow) -> User {
    User {
        id: row.get("user_id"),
        telegram_id: row.get("telegram_id"),
        username: row.get("username"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        photo_url: row.get("photo_url"),
        language_code: row.get("language_code"),
        auth_date: row.get("auth_date"),
        created_at: row.get("user_created_at"),
        updated_at: row.get("user_updated_at"),
    }
}

impl QuizStore for PgStore {
    async fn upsert_user(&self, user: &NewUser) -> DatabaseResult<User> {
        info!(telegram_id = user.telegram_id, "Upserting user");

        let query = format!(
            r#"
            INSERT INTO users (id, telegram_id, username, first_name, last_name, photo_url,
                               language_code, auth_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (telegram_id) DO UPDATE SET
                username = EXCLUDED.username,
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                photo_url = EXCLUDED.photo_url,
                language_code = EXCLUDED.language_code,
                auth_date = EXCLUDED.auth_date,
                updated_at = NOW()
            RETURNING {USER_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, User>(&query)
            .bind(Uuid::new_v4())
            .bind(user.telegram_id)
            .bind(&user.username)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.photo_url)
            .bind(&user.language_code)
            .bind(user.auth_date)
            .fetch_one(&self.pool)
            .await?;

        Ok(row)
    }

    async fn insert_user_if_absent(&self, user: &NewUser) -> DatabaseResult<Option<User>> {
        let query = format!(
            r#"
            INSERT INTO users (id, telegram_id, username, first_name, last_name, photo_url,
                               language_code, auth_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (telegram_id) DO NOTHING
            RETURNING {USER_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, User>(&query)
            .bind(Uuid::new_v4())
            .bind(user.telegram_id)
            .bind(&user.username)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.photo_url)
            .bind(&user.language_code)
            .bind(user.auth_date)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn insert_session(&self, session: &NewSession) -> DatabaseResult<Session> {
        let row = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (id, user_id, token_hash, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, token_hash, created_at, expires_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(session.user_id)
        .bind(&session.token_hash)
        .bind(session.expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_session(&self, token_hash: &str) -> DatabaseResult<Option<(Session, User)>> {
        let row = sqlx::query(
            r#"
            SELECT s.id AS session_id, s.token_hash, s.created_at AS session_created_at,
                   s.expires_at, u.id AS user_id, u.telegram_id, u.username, u.first_name,
                   u.last_name, u.photo_url, u.language_code, u.auth_date,
                   u.created_at AS user_created_at, u.updated_at AS user_updated_at
            FROM sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| {
            let session = Session {
                id: row.get("session_id"),
                user_id: row.get("user_id"),
                token_hash: row.get("token_hash"),
                created_at: row.get("session_created_at"),
                expires_at: row.get("expires_at"),
            };
            (session, user_from_joined_row(&row))
        }))
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> DatabaseResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn insert_result(&self, result: &NewTestResult) -> DatabaseResult<TestResult> {
        let query = format!(
            r#"
            INSERT INTO test_results (id, user_id, session_id, score, result_type, result_title,
                                      result_description, answers)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {RESULT_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, TestResult>(&query)
            .bind(Uuid::new_v4())
            .bind(result.user_id)
            .bind(result.session_id)
            .bind(result.score)
            .bind(&result.result_type)
            .bind(&result.result_title)
            .bind(&result.result_description)
            .bind(&result.answers)
            .fetch_one(&self.pool)
            .await?;

        Ok(row)
    }

    async fn list_results_for_user(&self, user_id: Uuid) -> DatabaseResult<Vec<TestResult>> {
        let query = format!(
            r#"
            SELECT {RESULT_COLUMNS}
            FROM test_results
            WHERE user_id = $1
            ORDER BY completed_at DESC
            "#
        );

        let rows = sqlx::query_as::<_, TestResult>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn stats_snapshot(&self) -> DatabaseResult<StatsSnapshot> {
        let total_users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        let (total_tests, avg_score): (i64, Option<f64>) = sqlx::query_as(
            "SELECT COUNT(*), AVG(score)::DOUBLE PRECISION FROM test_results",
        )
        .fetch_one(&self.pool)
        .await?;

        let distribution: Vec<(String, i64)> = sqlx::query_as(
            "SELECT result_type, COUNT(*) FROM test_results GROUP BY result_type",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(StatsSnapshot {
            total_users,
            total_tests,
            avg_score,
            result_distribution: distribution.into_iter().collect(),
        })
    }

    async fn health_check(&self) -> DatabaseResult<bool> {
        common::database::health_check(&self.pool).await
    }
}
