use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Immutable record of one completed attempt. `question_count` is a
/// snapshot taken when the attempt was scored, so later edits to the test
/// do not change how the result reads.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TestResult {
    pub id: Uuid,
    pub user_id: Uuid,
    pub test_id: Uuid,
    pub score: i64,
    pub question_count: i64,
    pub created_at: DateTime<Utc>,
}
