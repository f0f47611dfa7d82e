use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::comment::Comment;

#[derive(Clone)]
pub struct CommentService {
    pool: SqlitePool,
}

impl CommentService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, test_id: Uuid, user_id: Uuid, text: String) -> Result<Comment> {
        // Surface an unknown test as 404 instead of a foreign-key failure.
        sqlx::query("SELECT id FROM tests WHERE id = ?")
            .bind(test_id)
            .fetch_one(&self.pool)
            .await?;

        let now = Utc::now();
        let comment = Comment {
            id: Uuid::new_v4(),
            test_id,
            user_id,
            text,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"INSERT INTO comments (id, test_id, user_id, text, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(comment.id)
        .bind(comment.test_id)
        .bind(comment.user_id)
        .bind(&comment.text)
        .bind(comment.created_at)
        .bind(comment.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(comment)
    }

    pub async fn list_for_test(&self, test_id: Uuid) -> Result<Vec<Comment>> {
        let comments = sqlx::query_as::<_, Comment>(
            "SELECT * FROM comments WHERE test_id = ? ORDER BY created_at DESC",
        )
        .bind(test_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(comments)
    }
}
