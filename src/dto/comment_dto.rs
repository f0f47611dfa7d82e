use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::comment::Comment;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCommentPayload {
    #[validate(length(min = 1))]
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentResponse {
    pub id: Uuid,
    pub test_id: Uuid,
    pub user_id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentListResponse {
    pub items: Vec<CommentResponse>,
}

impl From<Comment> for CommentResponse {
    fn from(value: Comment) -> Self {
        Self {
            id: value.id,
            test_id: value.test_id,
            user_id: value.user_id,
            text: value.text,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}
