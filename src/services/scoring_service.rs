use std::collections::HashMap;

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::answer::Answer;
use crate::models::question::Question;
use crate::models::result::TestResult;

#[derive(Clone)]
pub struct ScoringService {
    pool: SqlitePool,
}

impl ScoringService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Scores one attempt and records it. The score is the count of
    /// selections whose answer is the correct one; unanswered questions
    /// contribute nothing and are not an error. A selection naming a
    /// question outside this test, or an answer outside its question, is
    /// a hard failure and nothing is written. The Result insert and the
    /// pass-counter bump share one transaction.
    pub async fn score_attempt(
        &self,
        user_id: Uuid,
        test_id: Uuid,
        selections: &HashMap<Uuid, Uuid>,
    ) -> Result<TestResult> {
        // Existence check up front so an unknown test is 404, not a
        // silent zero-question score.
        sqlx::query("SELECT id FROM tests WHERE id = ?")
            .bind(test_id)
            .fetch_one(&self.pool)
            .await?;

        let questions = sqlx::query_as::<_, Question>(
            "SELECT * FROM questions WHERE test_id = ? ORDER BY position",
        )
        .bind(test_id)
        .fetch_all(&self.pool)
        .await?;

        for question_id in selections.keys() {
            if !questions.iter().any(|q| q.id == *question_id) {
                return Err(Error::BadRequest(format!(
                    "Question {} does not belong to test {}",
                    question_id, test_id
                )));
            }
        }

        let mut score: i64 = 0;
        for question in &questions {
            let Some(answer_id) = selections.get(&question.id) else {
                continue;
            };
            let answer = sqlx::query_as::<_, Answer>(
                "SELECT * FROM answers WHERE id = ? AND question_id = ?",
            )
            .bind(answer_id)
            .bind(question.id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| {
                Error::BadRequest(format!(
                    "Answer {} does not belong to question {}",
                    answer_id, question.id
                ))
            })?;

            if answer.is_correct {
                score += 1;
            }
        }

        let result = TestResult {
            id: Uuid::new_v4(),
            user_id,
            test_id,
            score,
            question_count: questions.len() as i64,
            created_at: Utc::now(),
        };

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"INSERT INTO results (id, user_id, test_id, score, question_count, created_at)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(result.id)
        .bind(result.user_id)
        .bind(result.test_id)
        .bind(result.score)
        .bind(result.question_count)
        .bind(result.created_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE tests SET passes_number = passes_number + 1, updated_at = ? WHERE id = ?")
            .bind(result.created_at)
            .bind(test_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(
            test_id = %test_id,
            user_id = %user_id,
            score = result.score,
            question_count = result.question_count,
            "attempt scored"
        );
        Ok(result)
    }

    pub async fn get_result(&self, result_id: Uuid) -> Result<TestResult> {
        let result = sqlx::query_as::<_, TestResult>("SELECT * FROM results WHERE id = ?")
            .bind(result_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(result)
    }

    pub async fn list_results_for_user(
        &self,
        user_id: Uuid,
        page: i64,
        per_page: i64,
    ) -> Result<(Vec<TestResult>, i64)> {
        let offset = (page - 1) * per_page;
        let results = sqlx::query_as::<_, TestResult>(
            r#"SELECT * FROM results WHERE user_id = ?
               ORDER BY created_at DESC
               LIMIT ? OFFSET ?"#,
        )
        .bind(user_id)
        .bind(per_page)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM results WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok((results, total))
    }
}
