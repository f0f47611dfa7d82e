use std::collections::HashSet;

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::dto::test_dto::{
    TestListQuery, TestListResponse, TestResponse, TestSubmission, TestTreeResponse,
};
use crate::error::{Error, Result};
use crate::models::answer::Answer;
use crate::models::question::Question;
use crate::models::test::Test;
use crate::services::test_validation::{validate_submission, TreeError, LETTERS};

/// What a tree save produced: either the committed tree with database
/// identifiers assigned, or the full error set plus the submission exactly
/// as it came in. A rejection means nothing was written.
#[derive(Debug)]
pub enum TreeOutcome {
    Saved(TestTreeResponse),
    Rejected {
        values: TestSubmission,
        errors: Vec<TreeError>,
    },
}

#[derive(Clone)]
pub struct TestService {
    pool: SqlitePool,
}

impl TestService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Validates and persists a brand-new tree. All levels are checked
    /// before the transaction opens; the commit phase cannot fail
    /// validation, so the tree either lands whole or not at all.
    pub async fn create_tree(
        &self,
        owner_id: Uuid,
        submission: TestSubmission,
    ) -> Result<TreeOutcome> {
        let errors = validate_submission(&submission);
        if !errors.is_empty() {
            return Ok(TreeOutcome::Rejected {
                values: submission,
                errors,
            });
        }

        let now = Utc::now();
        let test_id = Uuid::new_v4();

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"INSERT INTO tests (id, owner_id, name, description, passes_number, created_at, updated_at)
               VALUES (?, ?, ?, ?, 0, ?, ?)"#,
        )
        .bind(test_id)
        .bind(owner_id)
        .bind(submission.name.trim())
        .bind(&submission.description)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        for (position, question) in submission.questions.iter().filter(|q| !q.delete).enumerate() {
            let question_id = Uuid::new_v4();
            sqlx::query(
                r#"INSERT INTO questions (id, test_id, text, position, created_at, updated_at)
                   VALUES (?, ?, ?, ?, ?, ?)"#,
            )
            .bind(question_id)
            .bind(test_id)
            .bind(&question.text)
            .bind(position as i64)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            for (slot, answer) in question.answers.iter().enumerate() {
                sqlx::query(
                    r#"INSERT INTO answers (id, question_id, letter, text, is_correct, created_at, updated_at)
                       VALUES (?, ?, ?, ?, ?, ?, ?)"#,
                )
                .bind(Uuid::new_v4())
                .bind(question_id)
                .bind(LETTERS[slot])
                .bind(&answer.text)
                .bind(answer.is_correct)
                .bind(now)
                .bind(now)
                .execute(&mut *tx)
                .await?;
            }
        }
        tx.commit().await?;

        tracing::info!(test_id = %test_id, owner_id = %owner_id, "test tree created");
        Ok(TreeOutcome::Saved(self.get_tree(test_id).await?))
    }

    /// Validates and applies an edit to an existing tree. Submitted
    /// questions map to rows by id: known ids update, unknown or absent
    /// ids insert, `delete`-flagged ids are removed (cascading their
    /// answers). Answers address their rows by (question, letter). The
    /// ≥5 floor was already enforced against the post-deletion view, so
    /// no deletion applied here can breach it.
    pub async fn update_tree(
        &self,
        test_id: Uuid,
        editor_id: Uuid,
        submission: TestSubmission,
    ) -> Result<TreeOutcome> {
        let test = self.get_test(test_id).await?;
        if test.owner_id != editor_id {
            return Err(Error::Forbidden(
                "Only the owner can edit this test".to_string(),
            ));
        }

        let errors = validate_submission(&submission);
        if !errors.is_empty() {
            return Ok(TreeOutcome::Rejected {
                values: submission,
                errors,
            });
        }

        let existing: HashSet<Uuid> =
            sqlx::query_scalar::<_, Uuid>("SELECT id FROM questions WHERE test_id = ?")
                .bind(test_id)
                .fetch_all(&self.pool)
                .await?
                .into_iter()
                .collect();

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE tests SET name = ?, description = ?, updated_at = ? WHERE id = ?")
            .bind(submission.name.trim())
            .bind(&submission.description)
            .bind(now)
            .bind(test_id)
            .execute(&mut *tx)
            .await?;

        for question in submission.questions.iter().filter(|q| q.delete) {
            if let Some(question_id) = question.id {
                sqlx::query("DELETE FROM questions WHERE id = ? AND test_id = ?")
                    .bind(question_id)
                    .bind(test_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        for (position, question) in submission.questions.iter().filter(|q| !q.delete).enumerate() {
            match question.id.filter(|id| existing.contains(id)) {
                Some(question_id) => {
                    sqlx::query(
                        "UPDATE questions SET text = ?, position = ?, updated_at = ? WHERE id = ?",
                    )
                    .bind(&question.text)
                    .bind(position as i64)
                    .bind(now)
                    .bind(question_id)
                    .execute(&mut *tx)
                    .await?;

                    for (slot, answer) in question.answers.iter().enumerate() {
                        let updated = sqlx::query(
                            r#"UPDATE answers SET text = ?, is_correct = ?, updated_at = ?
                               WHERE question_id = ? AND letter = ?"#,
                        )
                        .bind(&answer.text)
                        .bind(answer.is_correct)
                        .bind(now)
                        .bind(question_id)
                        .bind(LETTERS[slot])
                        .execute(&mut *tx)
                        .await?;

                        if updated.rows_affected() == 0 {
                            sqlx::query(
                                r#"INSERT INTO answers (id, question_id, letter, text, is_correct, created_at, updated_at)
                                   VALUES (?, ?, ?, ?, ?, ?, ?)"#,
                            )
                            .bind(Uuid::new_v4())
                            .bind(question_id)
                            .bind(LETTERS[slot])
                            .bind(&answer.text)
                            .bind(answer.is_correct)
                            .bind(now)
                            .bind(now)
                            .execute(&mut *tx)
                            .await?;
                        }
                    }
                }
                None => {
                    let question_id = Uuid::new_v4();
                    sqlx::query(
                        r#"INSERT INTO questions (id, test_id, text, position, created_at, updated_at)
                           VALUES (?, ?, ?, ?, ?, ?)"#,
                    )
                    .bind(question_id)
                    .bind(test_id)
                    .bind(&question.text)
                    .bind(position as i64)
                    .bind(now)
                    .bind(now)
                    .execute(&mut *tx)
                    .await?;

                    for (slot, answer) in question.answers.iter().enumerate() {
                        sqlx::query(
                            r#"INSERT INTO answers (id, question_id, letter, text, is_correct, created_at, updated_at)
                               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
                        )
                        .bind(Uuid::new_v4())
                        .bind(question_id)
                        .bind(LETTERS[slot])
                        .bind(&answer.text)
                        .bind(answer.is_correct)
                        .bind(now)
                        .bind(now)
                        .execute(&mut *tx)
                        .await?;
                    }
                }
            }
        }
        tx.commit().await?;

        tracing::info!(test_id = %test_id, editor_id = %editor_id, "test tree updated");
        Ok(TreeOutcome::Saved(self.get_tree(test_id).await?))
    }

    pub async fn get_test(&self, test_id: Uuid) -> Result<Test> {
        let test = sqlx::query_as::<_, Test>("SELECT * FROM tests WHERE id = ?")
            .bind(test_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(test)
    }

    pub async fn get_tree(&self, test_id: Uuid) -> Result<TestTreeResponse> {
        let test = self.get_test(test_id).await?;

        let questions = sqlx::query_as::<_, Question>(
            "SELECT * FROM questions WHERE test_id = ? ORDER BY position",
        )
        .bind(test_id)
        .fetch_all(&self.pool)
        .await?;

        let answers = sqlx::query_as::<_, Answer>(
            r#"SELECT a.* FROM answers a
               JOIN questions q ON a.question_id = q.id
               WHERE q.test_id = ?
               ORDER BY q.position, a.letter"#,
        )
        .bind(test_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(TestTreeResponse::assemble(test, questions, answers))
    }

    pub async fn list_tests(&self, query: TestListQuery) -> Result<TestListResponse> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;
        let search = query.search.map(|s| format!("%{}%", s));

        let total: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM tests
               WHERE (? IS NULL OR owner_id = ?)
                 AND (? IS NULL OR name LIKE ? OR description LIKE ?)"#,
        )
        .bind(query.owner_id)
        .bind(query.owner_id)
        .bind(&search)
        .bind(&search)
        .bind(&search)
        .fetch_one(&self.pool)
        .await?;

        let total_pages = if per_page > 0 {
            (total + per_page - 1) / per_page
        } else {
            1
        };

        let tests = sqlx::query_as::<_, Test>(
            r#"SELECT * FROM tests
               WHERE (? IS NULL OR owner_id = ?)
                 AND (? IS NULL OR name LIKE ? OR description LIKE ?)
               ORDER BY created_at DESC
               LIMIT ? OFFSET ?"#,
        )
        .bind(query.owner_id)
        .bind(query.owner_id)
        .bind(&search)
        .bind(&search)
        .bind(&search)
        .bind(per_page)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(TestListResponse {
            items: tests.into_iter().map(TestResponse::from).collect(),
            total,
            page,
            per_page,
            total_pages,
        })
    }

    /// Deletes a test; questions, answers, comments and results follow via
    /// cascade.
    pub async fn delete_test(&self, test_id: Uuid, editor_id: Uuid) -> Result<()> {
        let test = self.get_test(test_id).await?;
        if test.owner_id != editor_id {
            return Err(Error::Forbidden(
                "Only the owner can delete this test".to_string(),
            ));
        }

        sqlx::query("DELETE FROM tests WHERE id = ?")
            .bind(test_id)
            .execute(&self.pool)
            .await?;

        tracing::info!(test_id = %test_id, "test deleted");
        Ok(())
    }
}
