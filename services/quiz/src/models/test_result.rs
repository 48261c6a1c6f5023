//! Quiz result model

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// A recorded quiz attempt; never updated after insertion
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct TestResult {
    pub id: Uuid,
    pub user_id: Uuid,
    pub session_id: Option<Uuid>,
    pub score: i32,
    pub result_type: String,
    pub result_title: Option<String>,
    pub result_description: Option<String>,
    /// Raw answers as submitted by the client
    pub answers: serde_json::Value,
    pub completed_at: DateTime<Utc>,
}

/// New result payload
#[derive(Debug, Clone)]
pub struct NewTestResult {
    pub user_id: Uuid,
    pub session_id: Option<Uuid>,
    pub score: i32,
    pub result_type: String,
    pub result_title: Option<String>,
    pub result_description: Option<String>,
    pub answers: serde_json::Value,
}
