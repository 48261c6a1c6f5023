//! Result recording and listing

use serde::Deserialize;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::{NewTestResult, TestResult},
    repositories::QuizStore,
    validation::{validate_result_type, validate_text},
};

const MAX_TITLE_CHARS: usize = 256;
const MAX_DESCRIPTION_CHARS: usize = 4096;

/// Result submission body
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRequest {
    /// Body-borne session token, used when no header carries one
    #[serde(default, alias = "session_id")]
    pub session_id: Option<String>,
    #[serde(default)]
    pub score: Option<i32>,
    #[serde(default, alias = "result_type")]
    pub result_type: Option<String>,
    #[serde(default, alias = "result_title")]
    pub result_title: Option<String>,
    #[serde(default, alias = "result_description")]
    pub result_description: Option<String>,
    #[serde(default)]
    pub answers: Option<Value>,
}

impl ResultRequest {
    fn into_new_result(self, user_id: Uuid, session_id: Option<Uuid>) -> ApiResult<NewTestResult> {
        let score = self
            .score
            .ok_or_else(|| ApiError::Validation("Score is required".to_string()))?;

        let result_type = self
            .result_type
            .ok_or_else(|| ApiError::Validation("Result type is required".to_string()))?;
        validate_result_type(&result_type).map_err(ApiError::Validation)?;

        validate_text("Result title", self.result_title.as_deref(), MAX_TITLE_CHARS)
            .map_err(ApiError::Validation)?;
        validate_text(
            "Result description",
            self.result_description.as_deref(),
            MAX_DESCRIPTION_CHARS,
        )
        .map_err(ApiError::Validation)?;

        let answers = match self.answers {
            None | Some(Value::Null) => Value::Array(Vec::new()),
            Some(answers @ Value::Array(_)) => answers,
            Some(_) => {
                return Err(ApiError::Validation("Answers must be an array".to_string()));
            }
        };

        Ok(NewTestResult {
            user_id,
            session_id,
            score,
            result_type,
            result_title: self.result_title,
            result_description: self.result_description,
            answers,
        })
    }
}

/// Insert-only recorder for quiz attempts
#[derive(Clone)]
pub struct ResultRecorder<S> {
    store: S,
}

impl<S: QuizStore> ResultRecorder<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Validate and persist one attempt for an already resolved session owner
    pub async fn record_result(
        &self,
        user_id: Uuid,
        session_id: Option<Uuid>,
        request: ResultRequest,
    ) -> ApiResult<TestResult> {
        let new_result = request.into_new_result(user_id, session_id)?;
        let result = self.store.insert_result(&new_result).await?;

        info!(
            user_id = %user_id,
            result_id = %result.id,
            result_type = %result.result_type,
            score = result.score,
            "Test result recorded"
        );
        Ok(result)
    }

    /// Results of one user, newest first
    pub async fn list_results(&self, user_id: Uuid) -> ApiResult<Vec<TestResult>> {
        let results = self.store.list_results_for_user(user_id).await?;
        info!(user_id = %user_id, count = results.len(), "Listed test results");
        Ok(results)
    }
}
