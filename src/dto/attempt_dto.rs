use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::result::TestResult;

/// One attempt at a test: question id -> chosen answer id. Questions left
/// unanswered are simply absent from the map.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SubmitAttemptPayload {
    #[serde(default)]
    pub answers: HashMap<Uuid, Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResultResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub test_id: Uuid,
    pub score: i64,
    pub question_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResultListResponse {
    pub items: Vec<ResultResponse>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ResultListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl From<TestResult> for ResultResponse {
    fn from(value: TestResult) -> Self {
        Self {
            id: value.id,
            user_id: value.user_id,
            test_id: value.test_id,
            score: value.score,
            question_count: value.question_count,
            created_at: value.created_at,
        }
    }
}
